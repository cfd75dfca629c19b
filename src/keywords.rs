//! Keyword favorites — a JSON-backed taxonomy ranked by usage and recency.
//!
//! Every save that carries keywords feeds [`KeywordStore::track_usage`], and
//! [`KeywordStore::suggest`] ranks matches so that frequently and recently
//! used keywords surface first.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::SortingSettings;

/// How many suggestions an empty query returns.
const RECENT_SUGGESTION_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub usage_count: i64,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeywordFile {
    #[serde(default)]
    keywords: BTreeMap<String, KeywordEntry>,
}

/// Usage-tracked keyword store persisted as JSON.
#[derive(Debug)]
pub struct KeywordStore {
    path: PathBuf,
    keywords: BTreeMap<String, KeywordEntry>,
}

impl KeywordStore {
    /// Load the store, starting empty when the file is missing or corrupt —
    /// a broken favorites file must never block a save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let keywords = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<KeywordFile>(&contents) {
                Ok(file) => file.keywords,
                Err(e) => {
                    log::warn!("Ignoring unreadable keyword store {}: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, keywords }
    }

    pub fn save(&self) -> Result<()> {
        let file = KeywordFile {
            keywords: self.keywords.clone(),
        };
        let contents =
            serde_json::to_string_pretty(&file).context("Failed to serialize keyword store")?;
        std::fs::write(&self.path, contents).context("Failed to write keyword store")?;
        Ok(())
    }

    /// Record one use of each keyword, creating entries as needed.
    pub fn track_usage(&mut self, keywords: &[String]) {
        let now = Utc::now();
        for keyword in keywords {
            let trimmed = keyword.trim();
            if trimmed.is_empty() {
                continue;
            }
            let entry = self.keywords.entry(trimmed.to_string()).or_default();
            entry.usage_count += 1;
            entry.last_used = Some(now);
        }
    }

    /// Ranked suggestions for a query.
    ///
    /// An empty query returns the most recently used keywords; otherwise
    /// matches are filtered case-insensitively and ranked by usage count plus
    /// a recency bonus.
    pub fn suggest(&self, query: &str, sorting: &SortingSettings) -> Vec<String> {
        if query.trim().is_empty() {
            let mut recent: Vec<(&String, &KeywordEntry)> = self.keywords.iter().collect();
            recent.sort_by(|a, b| b.1.last_used.cmp(&a.1.last_used));
            return recent
                .into_iter()
                .take(RECENT_SUGGESTION_LIMIT)
                .map(|(name, _)| name.clone())
                .collect();
        }

        smart_sort(&self.keywords, query, Utc::now(), sorting)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn get(&self, keyword: &str) -> Option<&KeywordEntry> {
        self.keywords.get(keyword)
    }
}

/// Filter `items` by substring match and sort by usage score: usage count
/// plus a flat bonus for anything used within the recency window. Ties fall
/// back to name order so the ranking is deterministic.
pub fn smart_sort(
    items: &BTreeMap<String, KeywordEntry>,
    query: &str,
    now: DateTime<Utc>,
    sorting: &SortingSettings,
) -> Vec<String> {
    let query = query.to_lowercase();
    let threshold = now - Duration::days(sorting.recency_days);

    let score = |entry: &KeywordEntry| -> i64 {
        let bonus = match entry.last_used {
            Some(last_used) if last_used > threshold => sorting.recency_bonus,
            _ => 0,
        };
        entry.usage_count + bonus
    };

    let mut matches: Vec<(&String, i64)> = items
        .iter()
        .filter(|(name, _)| name.to_lowercase().contains(&query))
        .map(|(name, entry)| (name, score(entry)))
        .collect();

    matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    matches.into_iter().map(|(name, _)| name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(usage_count: i64, last_used: Option<DateTime<Utc>>) -> KeywordEntry {
        KeywordEntry {
            usage_count,
            last_used,
        }
    }

    #[test]
    fn smart_sort_filters_by_substring() {
        let mut items = BTreeMap::new();
        items.insert("sunset".to_string(), entry(3, None));
        items.insert("sunrise".to_string(), entry(1, None));
        items.insert("mountain".to_string(), entry(9, None));

        let result = smart_sort(&items, "sun", Utc::now(), &SortingSettings::default());
        assert_eq!(result, vec!["sunset", "sunrise"]);
    }

    #[test]
    fn recent_use_outranks_raw_count() {
        let now = Utc::now();
        let mut items = BTreeMap::new();
        items.insert("old favorite".to_string(), entry(50, Some(now - Duration::days(30))));
        items.insert("new favorite".to_string(), entry(2, Some(now - Duration::days(1))));

        let result = smart_sort(&items, "favorite", now, &SortingSettings::default());
        // 2 + 100 bonus beats 50 with no bonus.
        assert_eq!(result, vec!["new favorite", "old favorite"]);
    }

    #[test]
    fn ties_break_alphabetically() {
        let mut items = BTreeMap::new();
        items.insert("beach".to_string(), entry(1, None));
        items.insert("alps".to_string(), entry(1, None));

        let result = smart_sort(&items, "", Utc::now(), &SortingSettings::default());
        assert_eq!(result, vec!["alps", "beach"]);
    }

    #[test]
    fn track_usage_creates_and_increments() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = KeywordStore::load(dir.path().join("keywords.json"));

        store.track_usage(&["sunset".to_string(), "  ".to_string()]);
        store.track_usage(&["sunset".to_string(), "beach".to_string()]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("sunset").unwrap().usage_count, 2);
        assert_eq!(store.get("beach").unwrap().usage_count, 1);
        assert!(store.get("sunset").unwrap().last_used.is_some());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keywords.json");

        let mut store = KeywordStore::load(&path);
        store.track_usage(&["sunset".to_string()]);
        store.save().unwrap();

        let reloaded = KeywordStore::load(&path);
        assert_eq!(reloaded.get("sunset").unwrap().usage_count, 1);
    }

    #[test]
    fn corrupt_store_starts_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keywords.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = KeywordStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn empty_query_returns_most_recent_first() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = KeywordStore::load(dir.path().join("keywords.json"));
        store.track_usage(&["first".to_string()]);
        store.track_usage(&["second".to_string()]);

        let suggestions = store.suggest("", &SortingSettings::default());
        assert_eq!(suggestions[0], "second");
    }
}
