use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use exif_desk::{
    config, exiftool, geocode, health, keywords, locations, metadata, pipeline, rename, schema,
    timeshift,
};

#[derive(Parser, Debug)]
#[command(
    name = "exif-desk",
    version,
    about = "Local photo metadata backend — schema-mapped EXIF/XMP/IPTC editing, keyword taxonomy, renaming, and batch health checks on top of ExifTool"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to settings file (default: settings.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default settings.json and exit
    #[arg(long)]
    init: bool,

    /// Show metadata fields with consolidation state
    #[arg(long)]
    show: bool,

    /// Set a field value, e.g. --set Creator=Alice (repeatable)
    #[arg(long, value_name = "FIELD=VALUE")]
    set: Vec<String>,

    /// Run the batch health check
    #[arg(long)]
    check: bool,

    /// Rename files from the configured pattern
    #[arg(long)]
    rename: bool,

    /// Shift DateTimeOriginal by [+|-][DD:]HH:MM:SS
    #[arg(long, value_name = "SHIFT")]
    shift: Option<String>,

    /// Suggest keywords for a query (use "" for recent keywords)
    #[arg(long, value_name = "QUERY")]
    suggest: Option<String>,

    /// Reverse-geocode a coordinate pair, e.g. --geocode 48.85,2.35
    #[arg(long, value_name = "LAT,LON")]
    geocode: Option<String>,

    /// List saved location presets and exit
    #[arg(long)]
    locations: bool,

    /// Save the --set location fields as a named preset
    #[arg(long, value_name = "NAME")]
    add_location: Option<String>,

    /// Apply a saved location preset to the selected files
    #[arg(long, value_name = "NAME")]
    use_location: Option<String>,

    /// List all application-level field names and exit
    #[arg(long)]
    fields: bool,

    /// Preview changes without writing to files
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let settings = config::Settings::default();
        let path = cli.config.as_deref();
        settings.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Settings::settings_path()?,
        };
        println!("Default settings written to {}", save_path.display());
        return Ok(());
    }

    // Handle --fields
    if cli.fields {
        for name in schema::schema().field_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let settings = config::Settings::load(cli.config.as_deref())?;
    let tool = exiftool::ExifTool::new(&settings.exiftool_path);

    // Handle --suggest
    if let Some(ref query) = cli.suggest {
        let store = keywords::KeywordStore::load(data_file(&cli, "keywords.json")?);
        for keyword in store.suggest(query, &settings.sorting) {
            println!("{keyword}");
        }
        return Ok(());
    }

    // Handle --geocode
    if let Some(ref spec) = cli.geocode {
        let coordinate = parse_coordinate(spec)?;
        let geocoder = geocode::ReverseGeocoder::new(&settings.geocoding_user_agent);
        let resolved = geocoder
            .enrich(&[coordinate], &settings.country_mappings)
            .await;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        } else {
            for location in &resolved {
                println!(
                    "{:.5},{:.5}: {} / {} / {} {}",
                    location.latitude,
                    location.longitude,
                    location.city,
                    location.state,
                    location.country,
                    location.country_code
                );
            }
        }
        return Ok(());
    }

    // Handle --locations
    if cli.locations {
        let store = locations::LocationStore::load(data_file(&cli, "locations.json")?);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(store.presets())?);
        } else {
            for preset in store.presets() {
                println!("{:<24} used {} time(s)", preset.name, preset.use_count);
                for (field, value) in &preset.data {
                    println!("  {field:<22} : {value}");
                }
            }
        }
        return Ok(());
    }

    // Handle --add-location
    if let Some(ref name) = cli.add_location {
        let new_values = parse_set_values(&cli.set)?;
        let data: std::collections::BTreeMap<String, String> = new_values
            .iter()
            .filter_map(|(field, value)| Some((field.clone(), value.as_str()?.to_string())))
            .collect();
        if data.is_empty() {
            anyhow::bail!("--add-location needs at least one --set FIELD=VALUE pair.");
        }
        let mut store = locations::LocationStore::load(data_file(&cli, "locations.json")?);
        let preset = store.add(name, data);
        store.save()?;
        println!("Saved location preset '{}' ({})", preset.name, preset.id);
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }
    log::info!("Found {} image(s)", images.len());

    // Handle --show (forces the read-only view even alongside other flags)
    if cli.show {
        show_metadata(&tool, &images, cli.json)?;
        return Ok(());
    }

    // Handle --check
    if cli.check {
        let reports = health::run_check(&tool, &images, &settings);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            print_health_reports(&reports);
        }
        let unhealthy = reports.iter().filter(|r| !r.is_healthy()).count();
        log::info!(
            "Health check: {} ok, {unhealthy} with findings",
            reports.len() - unhealthy
        );
        return Ok(());
    }

    // Handle --rename
    if cli.rename {
        if cli.dry_run {
            log::info!("DRY RUN — no files will be renamed");
        }
        let outcomes = rename::rename_batch(&tool, &images, &settings.rename, cli.dry_run);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        } else {
            for outcome in &outcomes {
                match &outcome.new {
                    Some(new) => println!("{:<10} {} -> {new}", outcome.status, outcome.original),
                    None => println!("{:<10} {} ({})", "Error", outcome.original, outcome.status),
                }
            }
        }
        return Ok(());
    }

    // Handle --shift
    if let Some(ref spec) = cli.shift {
        let spec = timeshift::ShiftSpec::parse(spec)?;
        let previews = timeshift::preview(&tool, &images, spec);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&previews)?);
        } else {
            for preview in &previews {
                println!("{:<32} {} -> {}", preview.filename, preview.original, preview.new);
            }
        }
        if cli.dry_run {
            return Ok(());
        }
        let written = timeshift::apply(&tool, &images, spec)?;
        log::info!("Shifted {written} file(s)");
        return Ok(());
    }

    // Handle --use-location
    if let Some(ref name) = cli.use_location {
        let mut store = locations::LocationStore::load(data_file(&cli, "locations.json")?);
        let preset = store
            .presets()
            .iter()
            .find(|p| p.name == *name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No location preset named '{name}'."))?;

        let mut new_values = serde_json::Map::new();
        for (field, value) in &preset.data {
            new_values.insert(field.clone(), serde_json::Value::String(value.clone()));
        }

        let results = pipeline::save_fields(&tool, &images, &new_values, None);
        let failed = results.iter().filter(|r| r.error.is_some()).count();
        for result in &results {
            match &result.error {
                Some(err) => println!("Error      {} ({err})", result.filename),
                None => println!("Saved      {}", result.filename),
            }
        }
        if failed < results.len() {
            store.mark_used(preset.id);
            if let Err(e) = store.save() {
                log::warn!("Failed to persist preset usage: {e:#}");
            }
        }
        log::info!("Done: {} saved, {failed} failed", results.len() - failed);
        return Ok(());
    }

    // Handle --set
    if !cli.set.is_empty() {
        let new_values = parse_set_values(&cli.set)?;
        if cli.dry_run {
            // Preview the tag assignments per file without applying them.
            for result in pipeline::read_files(&tool, &images) {
                match result.metadata {
                    Some(meta) => {
                        let args = metadata::build_args(&meta.raw_tags, &new_values);
                        println!("{}:", result.filename);
                        for arg in args {
                            println!("  {arg}");
                        }
                    }
                    None => println!("{}: unreadable", result.filename),
                }
            }
            return Ok(());
        }

        let mut store = keywords::KeywordStore::load(data_file(&cli, "keywords.json")?);
        let results = pipeline::save_fields(&tool, &images, &new_values, Some(&mut store));
        let failed = results.iter().filter(|r| r.error.is_some()).count();
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            for result in &results {
                match &result.error {
                    Some(err) => println!("Error      {} ({err})", result.filename),
                    None => println!("Saved      {}", result.filename),
                }
            }
        }
        log::info!("Done: {} saved, {failed} failed", results.len() - failed);
        return Ok(());
    }

    // Default action: show
    show_metadata(&tool, &images, cli.json)
}

/// Read the batch and display it, as a grouped table or as JSON.
fn show_metadata(tool: &exiftool::ExifTool, images: &[PathBuf], json: bool) -> Result<()> {
    let results = pipeline::read_files(tool, images);
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            print_file_metadata(result);
        }
    }
    Ok(())
}

/// Resolve a data file (keywords.json, locations.json) next to the settings
/// file, or next to the binary when no --config was given.
fn data_file(cli: &Cli, name: &str) -> Result<PathBuf> {
    let settings_path = match &cli.config {
        Some(p) => p.clone(),
        None => config::Settings::settings_path()?,
    };
    Ok(settings_path
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."))
        .join(name))
}

fn parse_coordinate(spec: &str) -> Result<geocode::Coordinate> {
    let (lat, lon) = spec
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("Expected LAT,LON, got '{spec}'"))?;
    Ok(geocode::Coordinate {
        latitude: lat.trim().parse()?,
        longitude: lon.trim().parse()?,
    })
}

/// Parse repeated `FIELD=VALUE` pairs into a save payload. The Keywords field
/// takes a semicolon-separated list.
fn parse_set_values(pairs: &[String]) -> Result<serde_json::Map<String, serde_json::Value>> {
    let mut new_values = serde_json::Map::new();
    for pair in pairs {
        let (field, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected FIELD=VALUE, got '{pair}'"))?;
        if schema::schema().get(field).is_none() {
            log::warn!("Unknown field '{field}' will be ignored");
        }
        let json_value = if field == "Keywords" {
            serde_json::Value::Array(
                value
                    .split(';')
                    .map(|k| serde_json::Value::String(k.trim().to_string()))
                    .collect(),
            )
        } else {
            serde_json::Value::String(value.to_string())
        };
        new_values.insert(field.to_string(), json_value);
    }
    Ok(new_values)
}

// ANSI color codes
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print one file's fields grouped the way the schema groups them, with a
/// marker on every unconsolidated field.
fn print_file_metadata(result: &pipeline::ReadResult) {
    println!();
    println!("{BOLD}File:{RESET} {}", result.filename);
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let meta = match &result.metadata {
        Some(meta) => meta,
        None => {
            println!("  {RED}(failed to read metadata){RESET}");
            return;
        }
    };

    for (group, field_names) in schema::schema().groups() {
        let rows: Vec<(&str, String, bool)> = field_names
            .iter()
            .filter_map(|name| {
                let field = meta.fields.get(*name)?;
                let rendered = render_value(&field.value)?;
                Some((*name, rendered, field.is_consolidated))
            })
            .collect();

        if rows.is_empty() {
            continue;
        }

        println!("  {BOLD}{group}{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (name, value, consolidated) in rows {
            let tag_col = format!("{name:<22}");
            if consolidated {
                println!("  {tag_col} : {value}");
            } else {
                println!("  {tag_col} : {value} {RED}!{RESET}");
            }
        }
        println!();
    }
}

/// Render a field value for display; `None` hides absent fields.
fn render_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) if items.is_empty() => None,
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|i| i.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        ),
        other => Some(other.to_string()),
    }
}

fn print_health_reports(reports: &[health::FileReport]) {
    for report in reports {
        println!();
        println!("{BOLD}File:{RESET} {}", report.filename);
        println!("{DIM}{}{RESET}", "─".repeat(72));
        print_check("consolidation", &report.consolidation);
        print_check("required", &report.required_fields);
        print_check("filename", &report.filename_check);
    }
}

fn print_check(name: &str, check: &health::CheckResult) {
    let tag_col = format!("{name:<14}");
    match check.status {
        health::CheckStatus::Ok => {
            println!("  {tag_col} {GREEN}ok{RESET}     {DIM}{}{RESET}", check.message)
        }
        health::CheckStatus::Error => {
            println!("  {tag_col} {RED}error{RESET}  {}", check.message)
        }
    }
}
