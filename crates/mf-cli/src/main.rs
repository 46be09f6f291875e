//! MarketFilter CLI
//!
//! CLI tool for checking filter rules against captured pages and managing
//! extension settings files.

use std::path::Path;
use std::time::Instant;

use clap::{Parser, Subcommand};

use mf_core::{ActiveStages, CategoryCatalog, FieldExtractor, FilterEngine, TextExtractor};

mod page;
mod settings_cmd;
mod store;
mod watch;

use page::{read_candidates, read_catalog, read_config};
use settings_cmd::{FilterAction, PresetAction, TrackAction};

#[derive(Parser)]
#[command(name = "mf-cli")]
#[command(about = "MarketFilter rule checker and settings tools")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a captured page against a filter config
    Evaluate {
        /// Captured page: JSON array of {title, text}
        #[arg(short, long)]
        page: String,

        /// Filter config JSON (defaults if omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Category catalog JSON (built-in if omitted)
        #[arg(long)]
        catalog: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the fields scraped from a piece of card text
    Extract {
        text: String,
    },

    /// Validate catalog, config, or settings files
    Validate {
        #[arg(long)]
        catalog: Option<String>,
        #[arg(long)]
        config: Option<String>,
        #[arg(long)]
        settings: Option<String>,
    },

    /// List categories
    Categories {
        #[arg(long)]
        catalog: Option<String>,
    },

    /// Edit the active filters in a settings file
    Filters {
        #[arg(short, long, default_value = "settings.json")]
        settings: String,
        #[command(subcommand)]
        action: FilterAction,
    },

    /// Manage saved filter presets
    Presets {
        #[arg(short, long, default_value = "settings.json")]
        settings: String,
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Manage tracked markets
    Track {
        #[arg(short, long, default_value = "settings.json")]
        settings: String,
        #[command(subcommand)]
        action: TrackAction,
    },

    /// Send a runtime message (e.g. '{"action":"getFilters"}') to the background handler
    Message {
        #[arg(short, long, default_value = "settings.json")]
        settings: String,
        #[arg(long)]
        catalog: Option<String>,
        json: String,
    },

    /// Re-evaluate a captured page whenever it or the config changes
    Watch {
        #[arg(short, long)]
        page: String,
        #[arg(short, long)]
        config: Option<String>,
        #[arg(long)]
        catalog: Option<String>,
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 250)]
        poll_ms: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Evaluate {
            page,
            config,
            catalog,
            json,
        } => cmd_evaluate(&page, config.as_deref(), catalog.as_deref(), json),
        Commands::Extract { text } => cmd_extract(&text),
        Commands::Validate {
            catalog,
            config,
            settings,
        } => cmd_validate(catalog.as_deref(), config.as_deref(), settings.as_deref()),
        Commands::Categories { catalog } => cmd_categories(catalog.as_deref()),
        Commands::Filters { settings, action } => settings_cmd::cmd_filters(&settings, action),
        Commands::Presets { settings, action } => settings_cmd::cmd_presets(&settings, action),
        Commands::Track { settings, action } => settings_cmd::cmd_track(&settings, action),
        Commands::Message {
            settings,
            catalog,
            json,
        } => settings_cmd::cmd_message(&settings, catalog.as_deref(), &json),
        Commands::Watch {
            page,
            config,
            catalog,
            poll_ms,
        } => watch::run_watch(watch::WatchOptions {
            page_path: page,
            config_path: config,
            catalog_path: catalog,
            poll_ms,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_evaluate(page: &str, config: Option<&str>, catalog: Option<&str>, json: bool) -> Result<(), String> {
    let candidates = read_candidates(Path::new(page))?;
    let config = read_config(config)?;
    let catalog = read_catalog(catalog);

    let start = Instant::now();
    let report = FilterEngine::new().evaluate(&candidates, &config, &catalog);
    let elapsed = start.elapsed();

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{}", out);
        return Ok(());
    }

    println!("Evaluated '{}'", page);
    println!("  Stages:      {:?}", ActiveStages::from_config(&config));
    println!("  Markets:     {}", report.scanned);
    println!("  Filtered:    {}", report.hidden_count);
    println!("  No title:    {}", report.malformed);
    println!("  Time:        {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    println!();

    for (candidate, decision) in candidates.iter().zip(&report.decisions) {
        let title = candidate.title.as_deref().unwrap_or("(no title)");
        match &decision.reason {
            Some(reason) => println!("  HIDE  #{:<4} {}  [{}]", decision.id, title, reason),
            None => println!("  show  #{:<4} {}", decision.id, title),
        }
    }

    Ok(())
}

fn cmd_extract(text: &str) -> Result<(), String> {
    let fields = TextExtractor.extract(&text.to_lowercase());
    let show = |v: Option<f64>| v.map_or_else(|| "(absent)".to_string(), |v| v.to_string());
    println!("  Price:       {}", show(fields.price));
    println!("  Volume:      {}", show(fields.volume_usd));
    println!("  Liquidity:   {}", show(fields.liquidity_usd));
    Ok(())
}

fn cmd_validate(catalog: Option<&str>, config: Option<&str>, settings: Option<&str>) -> Result<(), String> {
    if catalog.is_none() && config.is_none() && settings.is_none() {
        return Err("Nothing to validate: pass --catalog, --config or --settings".to_string());
    }

    if let Some(path) = catalog {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
        let parsed = CategoryCatalog::from_json(&content)
            .map_err(|e| format!("Invalid catalog '{}': {}", path, e))?;
        println!("Catalog '{}' is valid ({} categories)", path, parsed.len());
    }

    if let Some(path) = config {
        read_config(Some(path))?;
        println!("Filter config '{}' is valid", path);
    }

    if let Some(path) = settings {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
        let parsed = mf_core::ExtensionSettings::from_json(&content)
            .map_err(|e| format!("Invalid settings '{}': {}", path, e))?;
        parsed
            .filters
            .validate()
            .map_err(|e| format!("Invalid filters in '{}': {}", path, e))?;
        for (i, preset) in parsed.saved_filters.iter().enumerate() {
            preset
                .filters
                .validate()
                .map_err(|e| format!("Invalid preset #{} '{}': {}", i, preset.name, e))?;
        }
        println!(
            "Settings '{}' are valid ({} presets, {} tracked markets)",
            path,
            parsed.saved_filters.len(),
            parsed.tracked_markets.len()
        );
    }

    Ok(())
}

fn cmd_categories(catalog: Option<&str>) -> Result<(), String> {
    let catalog = read_catalog(catalog);
    if catalog.is_empty() {
        return Err("No categories loaded".to_string());
    }
    for category in catalog.iter() {
        let def = category.category();
        println!("  {:<14} {}", def.id, def.name);
        println!("      keywords: {}", def.keywords.join(", "));
        if !def.exclude_keywords.is_empty() {
            println!("      excludes: {}", def.exclude_keywords.join(", "));
        }
    }
    Ok(())
}
