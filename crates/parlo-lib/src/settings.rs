//! Settings persistence.
//!
//! One JSON file holds the whole configuration. Loading fills defaults for
//! every missing key (the schema is forward-compatible); the file is
//! rewritten at session start and on every settings commit, so older files
//! upgrade themselves in place.

use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use parlo_core::types::Settings;
use parlo_core::{Error, Result};

/// Settings as shared by the scheduler: snapshot reads at sentence
/// boundaries, whole-value writes from the settings surface.
pub type SharedSettings = Arc<RwLock<Settings>>;

/// Load settings, falling back to defaults when the file is missing or
/// malformed. Missing keys inside a valid file fill with their defaults.
pub fn load(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(settings) => {
                info!("loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("failed to parse {}: {e}, using defaults", path.display());
                Settings::default()
            }
        },
        Err(_) => {
            info!("no settings file at {}, using defaults", path.display());
            Settings::default()
        }
    }
}

/// Write settings out, write-then-rename so a crash mid-write never leaves
/// a truncated file behind.
pub fn save(path: &Path, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| Error::Persistence(format!("serialize settings: {e}")))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Persistence(format!("create {}: {e}", parent.display())))?;
    }

    let partial = path.with_extension("json.partial");
    std::fs::write(&partial, json)
        .map_err(|e| Error::Persistence(format!("write {}: {e}", partial.display())))?;
    std::fs::rename(&partial, path)
        .map_err(|e| Error::Persistence(format!("rename into {}: {e}", path.display())))?;
    Ok(())
}
