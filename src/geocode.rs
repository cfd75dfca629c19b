//! Reverse geocoding and GPS-track matching.
//!
//! Coordinates are resolved to address parts through the Nominatim API, with
//! the user's country mappings applied so country names stay consistent with
//! the rest of their library. Track matching pairs photo timestamps with the
//! nearest point of a pre-parsed GPS track — parsing the track file itself is
//! the caller's concern.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CountryMapping;
use crate::handlers::offset_to_minutes;
use crate::rename::EXIF_DATE_FORMAT;

const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";

/// Nominatim fair-use policy: at most one request per second.
const REQUEST_SPACING_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// A coordinate enriched with address details. Lookup failures leave the
/// address fields empty rather than failing the batch.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub state: String,
    pub country: String,
    pub country_code: String,
}

pub struct ReverseGeocoder {
    client: Client,
    user_agent: String,
    endpoint: String,
}

impl ReverseGeocoder {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            user_agent: user_agent.into(),
            endpoint: NOMINATIM_ENDPOINT.to_string(),
        }
    }

    /// Point the geocoder at a different endpoint (tests, self-hosted mirror).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Resolve a batch of coordinates, spacing requests to honor the
    /// service's fair-use policy.
    pub async fn enrich(
        &self,
        coordinates: &[Coordinate],
        mappings: &[CountryMapping],
    ) -> Vec<ResolvedLocation> {
        let mut resolved = Vec::with_capacity(coordinates.len());

        for (i, coord) in coordinates.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(REQUEST_SPACING_MS)).await;
            }

            match self.lookup(*coord, mappings).await {
                Ok(location) => resolved.push(location),
                Err(e) => {
                    log::warn!(
                        "Reverse geocoding failed for {:.5},{:.5}: {e:#}",
                        coord.latitude,
                        coord.longitude
                    );
                    resolved.push(ResolvedLocation {
                        latitude: coord.latitude,
                        longitude: coord.longitude,
                        city: String::new(),
                        state: String::new(),
                        country: String::new(),
                        country_code: String::new(),
                    });
                }
            }
        }

        resolved
    }

    async fn lookup(
        &self,
        coord: Coordinate,
        mappings: &[CountryMapping],
    ) -> Result<ResolvedLocation> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header("User-Agent", &self.user_agent)
            .query(&[
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("format", "jsonv2".to_string()),
                ("accept-language", "en".to_string()),
            ])
            .send()
            .await
            .context("Nominatim request failed")?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("Failed to read Nominatim response")?;

        if !status.is_success() {
            anyhow::bail!("Nominatim error ({}): {}", status, text);
        }

        let json: Value =
            serde_json::from_str(&text).context("Failed to parse Nominatim response JSON")?;

        Ok(resolve_address(coord, &json, mappings))
    }
}

/// Extract city/state/country parts from a Nominatim response, falling back
/// through the administrative levels the service uses for smaller places.
pub fn resolve_address(
    coord: Coordinate,
    response: &Value,
    mappings: &[CountryMapping],
) -> ResolvedLocation {
    let address = &response["address"];
    let pick = |keys: &[&str]| -> String {
        keys.iter()
            .filter_map(|k| address[*k].as_str())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    };

    let city = pick(&["city", "town", "village"]);
    let state = pick(&["state", "province", "state_district"]);

    let nominatim_code = address["country_code"]
        .as_str()
        .unwrap_or_default()
        .to_uppercase();

    let (country, country_code) = match mappings
        .iter()
        .find(|m| m.code.to_uppercase() == nominatim_code)
    {
        Some(mapping) => (mapping.name.clone(), nominatim_code),
        // Code not configured: keep the service's country name, leave the
        // code out so nothing unvetted lands in the code field.
        None => (pick(&["country"]), String::new()),
    };

    ResolvedLocation {
        latitude: coord.latitude,
        longitude: coord.longitude,
        city,
        state,
        country,
        country_code,
    }
}

// ── GPS track matching ───────────────────────────────────────────────

/// One point of a pre-parsed, timestamped GPS track.
#[derive(Debug, Clone, Copy)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub time: DateTime<Utc>,
}

/// A photo's capture moment, as read from its metadata.
#[derive(Debug, Clone)]
pub struct PhotoTimestamp {
    pub filename: String,
    /// EXIF-format local timestamp, e.g. `"2023:05:01 14:30:05"`.
    pub date_time: String,
    /// UTC offset of the capture location, e.g. `"+02:00"`.
    pub offset_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackMatch {
    pub filename: String,
    /// `(latitude, longitude)` of the matched track point, or `None` when
    /// the photo's timestamp is unusable or no point is close enough.
    pub coordinates: Option<(f64, f64)>,
}

/// Resolve a photo's EXIF timestamp plus offset into an absolute instant.
pub fn parse_photo_time(date_time: &str, offset_time: &str) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(date_time, EXIF_DATE_FORMAT).ok()?;
    let minutes = offset_to_minutes(offset_time)?;
    let offset = FixedOffset::east_opt((minutes * 60) as i32)?;
    offset.from_local_datetime(&naive).single()
}

/// Match each photo to the nearest-in-time track point, but only when the
/// gap stays within `threshold`.
pub fn match_photos_to_track(
    points: &[TrackPoint],
    photos: &[PhotoTimestamp],
    threshold: Duration,
) -> Vec<TrackMatch> {
    let mut matches = Vec::with_capacity(photos.len());

    for photo in photos {
        let Some(taken_at) = parse_photo_time(&photo.date_time, &photo.offset_time) else {
            matches.push(TrackMatch {
                filename: photo.filename.clone(),
                coordinates: None,
            });
            continue;
        };
        let taken_at = taken_at.with_timezone(&Utc);

        let closest = points
            .iter()
            .min_by_key(|p| (p.time - taken_at).abs());

        let coordinates = closest.and_then(|point| {
            if (point.time - taken_at).abs() <= threshold {
                Some((point.latitude, point.longitude))
            } else {
                None
            }
        });

        matches.push(TrackMatch {
            filename: photo.filename.clone(),
            coordinates,
        });
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mappings() -> Vec<CountryMapping> {
        vec![CountryMapping {
            code: "pt".to_string(),
            name: "Portugal".to_string(),
        }]
    }

    #[test]
    fn address_uses_city_town_village_fallbacks() {
        let coord = Coordinate {
            latitude: 38.7,
            longitude: -9.1,
        };
        let response = json!({"address": {"town": "Sintra", "state": "Lisboa", "country_code": "pt"}});
        let resolved = resolve_address(coord, &response, &mappings());
        assert_eq!(resolved.city, "Sintra");
        assert_eq!(resolved.state, "Lisboa");
        assert_eq!(resolved.country, "Portugal");
        assert_eq!(resolved.country_code, "PT");
    }

    #[test]
    fn unmapped_country_keeps_name_but_not_code() {
        let coord = Coordinate {
            latitude: 48.8,
            longitude: 2.3,
        };
        let response =
            json!({"address": {"city": "Paris", "country": "France", "country_code": "fr"}});
        let resolved = resolve_address(coord, &response, &mappings());
        assert_eq!(resolved.country, "France");
        assert_eq!(resolved.country_code, "");
    }

    #[test]
    fn missing_address_resolves_to_empty_fields() {
        let coord = Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        };
        let resolved = resolve_address(coord, &json!({}), &[]);
        assert_eq!(resolved.city, "");
        assert_eq!(resolved.country, "");
    }

    // ── track matching ───────────────────────────────────────────────

    fn point(lat: f64, lon: f64, iso: &str) -> TrackPoint {
        TrackPoint {
            latitude: lat,
            longitude: lon,
            time: iso.parse().unwrap(),
        }
    }

    #[test]
    fn photo_time_combines_timestamp_and_offset() {
        let t = parse_photo_time("2023:05:01 14:30:00", "+02:00").unwrap();
        assert_eq!(
            t.with_timezone(&Utc),
            "2023-05-01T12:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn matches_nearest_point_within_threshold() {
        let points = vec![
            point(38.70, -9.10, "2023-05-01T12:00:00Z"),
            point(38.71, -9.11, "2023-05-01T12:29:00Z"),
            point(38.72, -9.12, "2023-05-01T13:00:00Z"),
        ];
        let photos = vec![PhotoTimestamp {
            filename: "a.jpg".to_string(),
            date_time: "2023:05:01 14:30:00".to_string(),
            offset_time: "+02:00".to_string(),
        }];

        let matches = match_photos_to_track(&points, &photos, Duration::minutes(5));
        assert_eq!(matches[0].coordinates, Some((38.71, -9.11)));
    }

    #[test]
    fn no_match_outside_threshold() {
        let points = vec![point(38.70, -9.10, "2023-05-01T09:00:00Z")];
        let photos = vec![PhotoTimestamp {
            filename: "a.jpg".to_string(),
            date_time: "2023:05:01 14:30:00".to_string(),
            offset_time: "+02:00".to_string(),
        }];

        let matches = match_photos_to_track(&points, &photos, Duration::minutes(30));
        assert_eq!(matches[0].coordinates, None);
    }

    #[test]
    fn unusable_timestamp_yields_no_coordinates() {
        let points = vec![point(38.70, -9.10, "2023-05-01T12:00:00Z")];
        let photos = vec![PhotoTimestamp {
            filename: "broken.jpg".to_string(),
            date_time: "not a date".to_string(),
            offset_time: "+02:00".to_string(),
        }];

        let matches = match_photos_to_track(&points, &photos, Duration::minutes(30));
        assert_eq!(matches[0].filename, "broken.jpg");
        assert_eq!(matches[0].coordinates, None);
    }

    #[test]
    fn empty_track_matches_nothing() {
        let photos = vec![PhotoTimestamp {
            filename: "a.jpg".to_string(),
            date_time: "2023:05:01 14:30:00".to_string(),
            offset_time: "+00:00".to_string(),
        }];
        let matches = match_photos_to_track(&[], &photos, Duration::minutes(30));
        assert_eq!(matches[0].coordinates, None);
    }
}
