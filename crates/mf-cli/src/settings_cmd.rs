use chrono::Utc;
use clap::Subcommand;

use mf_core::protocol::Background;
use mf_core::settings::{ExtensionSettings, SettingsStore, TrackedMarket};
use mf_core::{FilterConfig, PriceRange};

use crate::page::read_catalog;
use crate::store::JsonFileStore;

#[derive(Subcommand)]
pub enum FilterAction {
    /// Print the active filters
    Show,
    /// Hide markets containing a keyword
    AddKeyword { keyword: String },
    RemoveKeyword { keyword: String },
    /// Check or uncheck a category
    ToggleCategory { id: String },
    /// Restrict visible prices to MIN..=MAX percent
    Price { min: f64, max: f64 },
    /// Hide markets with volume below a USD amount (0 disables)
    Volume { threshold: f64 },
    /// Hide markets with liquidity below a USD amount (0 disables)
    Liquidity { threshold: f64 },
    Enable,
    Disable,
    /// Restore install defaults for the active filters
    Reset,
}

#[derive(Subcommand)]
pub enum PresetAction {
    List,
    /// Save the active filters under a name
    Save { name: String },
    /// Make a saved preset active
    Apply { index: usize },
    Delete { index: usize },
}

#[derive(Subcommand)]
pub enum TrackAction {
    List,
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        price: Option<String>,
    },
    Delete { index: usize },
}

fn load(store: &JsonFileStore) -> Result<ExtensionSettings, String> {
    store.load_or_default().map_err(|e| e.to_string())
}

fn save(store: &mut JsonFileStore, settings: &ExtensionSettings) -> Result<(), String> {
    store.save(settings).map_err(|e| e.to_string())
}

pub fn print_filters(config: &FilterConfig) {
    println!("Filters ({})", if config.enabled { "enabled" } else { "disabled" });
    println!("  Keywords:    {}", join_or_none(&config.keywords));
    println!("  Categories:  {}", join_or_none(&config.categories));
    println!("  Price:       {}% - {}%", config.price_range.min, config.price_range.max);
    println!("  Volume:      >= ${}", config.volume_threshold);
    println!("  Liquidity:   >= ${}", config.liquidity_threshold);
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

pub fn cmd_filters(path: &str, action: FilterAction) -> Result<(), String> {
    let mut store = JsonFileStore::new(path);
    let mut settings = load(&store)?;

    match action {
        FilterAction::Show => {
            print_filters(&settings.filters);
            return Ok(());
        }
        FilterAction::AddKeyword { keyword } => {
            if !settings.add_keyword(&keyword) {
                return Err(format!("Keyword '{}' is blank or already present", keyword.trim()));
            }
        }
        FilterAction::RemoveKeyword { keyword } => {
            if !settings.remove_keyword(&keyword) {
                return Err(format!("Keyword '{}' not found", keyword));
            }
        }
        FilterAction::ToggleCategory { id } => {
            if read_catalog(None).lookup(&id).is_none() {
                log::warn!("Category '{}' is not in the built-in catalog", id);
            }
            let selected = settings.toggle_category(&id);
            println!("Category '{}' {}", id, if selected { "selected" } else { "unselected" });
        }
        FilterAction::Price { min, max } => {
            let mut filters = settings.filters.clone();
            filters.price_range = PriceRange { min, max };
            settings.update_filters(filters).map_err(|e| e.to_string())?;
        }
        FilterAction::Volume { threshold } => {
            let mut filters = settings.filters.clone();
            filters.volume_threshold = threshold;
            settings.update_filters(filters).map_err(|e| e.to_string())?;
        }
        FilterAction::Liquidity { threshold } => {
            let mut filters = settings.filters.clone();
            filters.liquidity_threshold = threshold;
            settings.update_filters(filters).map_err(|e| e.to_string())?;
        }
        FilterAction::Enable => settings.set_enabled(true),
        FilterAction::Disable => settings.set_enabled(false),
        FilterAction::Reset => settings.filters = FilterConfig::default(),
    }

    save(&mut store, &settings)?;
    print_filters(&settings.filters);
    Ok(())
}

pub fn cmd_presets(path: &str, action: PresetAction) -> Result<(), String> {
    let mut store = JsonFileStore::new(path);
    let mut settings = load(&store)?;

    match action {
        PresetAction::List => {
            if settings.saved_filters.is_empty() {
                println!("No saved filter configurations");
            }
            for (i, preset) in settings.saved_filters.iter().enumerate() {
                println!(
                    "  [{}] {} ({}) - {} keywords, {} categories",
                    i,
                    preset.name,
                    preset.created_at.format("%Y-%m-%d %H:%M:%S"),
                    preset.filters.keywords.len(),
                    preset.filters.categories.len()
                );
            }
            return Ok(());
        }
        PresetAction::Save { name } => {
            let saved = settings.save_preset(&name, Utc::now()).map_err(|e| e.to_string())?;
            println!("Saved filter configuration '{}'", saved.name);
        }
        PresetAction::Apply { index } => {
            settings.apply_preset(index).map_err(|e| e.to_string())?;
            print_filters(&settings.filters);
        }
        PresetAction::Delete { index } => {
            let removed = settings.delete_preset(index).map_err(|e| e.to_string())?;
            println!("Deleted filter configuration '{}'", removed.name);
        }
    }

    save(&mut store, &settings)
}

pub fn cmd_track(path: &str, action: TrackAction) -> Result<(), String> {
    let mut store = JsonFileStore::new(path);
    let mut settings = load(&store)?;

    match action {
        TrackAction::List => {
            if settings.tracked_markets.is_empty() {
                println!("No tracked markets");
            }
            for (i, market) in settings.tracked_markets.iter().enumerate() {
                println!(
                    "  [{}] {} - Price: {} - Tracked: {}",
                    i,
                    market.title,
                    market.price.as_deref().unwrap_or("n/a"),
                    market.tracked_at.format("%Y-%m-%d %H:%M:%S")
                );
                println!("      {}", market.url);
            }
            return Ok(());
        }
        TrackAction::Add { title, url, price } => {
            println!("Tracking '{}'", title);
            settings.track_market(TrackedMarket {
                title,
                price,
                url,
                tracked_at: Utc::now(),
            });
        }
        TrackAction::Delete { index } => {
            let removed = settings.delete_tracked_market(index).map_err(|e| e.to_string())?;
            println!("Deleted tracked market '{}'", removed.title);
        }
    }

    save(&mut store, &settings)
}

/// Send one runtime message to the background handler, as the popup would.
pub fn cmd_message(path: &str, catalog: Option<&str>, json: &str) -> Result<(), String> {
    let store = JsonFileStore::new(path);
    let mut background = Background::new(store, Some(read_catalog(catalog)));
    let (response, forward) = background.handle_json(json).map_err(|e| e.to_string())?;

    println!("{}", response);
    if let Some(forward) = forward {
        let forward = serde_json::to_string(&forward).map_err(|e| e.to_string())?;
        println!("-> content script: {}", forward);
    }
    Ok(())
}
