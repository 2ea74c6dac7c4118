//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione runtime del motore e il caricamento
//! del file di configurazione con le opzioni del chiamante.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di esecuzione (non di trasformazione)
//! - Fornisce validazione dei parametri
//! - Carica `PartialOptimusOptions` da un file JSON (default `.optimusrc.json`)
//! - Fallback sul file utente in `<config_dir>/optimus/optimusrc.json`
//!
//! ## Parametri di configurazione:
//! - `workers`: Numero massimo di unità di lavoro concorrenti (default: 2 × CPU)
//! - `sorted`: Ordine di raccolta deterministico (default: false, ordine del walk)
//!
//! ## Politica sul file di configurazione:
//! - File mancante: nessun override (log debug)
//! - File illeggibile o JSON malformato: nessun override (log warn), mai fatale
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     workers: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! let overrides = load_partial_options(Path::new(".optimusrc.json")).await;
//! ```

use crate::error::OptimizeError;
use crate::options::PartialOptimusOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = ".optimusrc.json";

/// Runtime configuration of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of files transformed or removed at the same time
    pub workers: usize,
    /// Sort collected paths by name so obfuscation indices are reproducible
    pub sorted: bool,
}

impl Default for Config {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);

        Self {
            workers: (cpus * 2).max(1),
            sorted: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.workers == 0 {
            return Err(OptimizeError::InvalidConfig(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Per-user fallback configuration file, if the platform has a config directory.
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("optimus").join("optimusrc.json"))
}

/// Load caller overrides from `path`.
///
/// Never fails: every problem degrades to "no overrides" so the preset
/// defaults apply.
pub async fn load_partial_options(path: &Path) -> Option<PartialOptimusOptions> {
    match read_partial_options(path).await {
        Ok(options) => options,
        Err(e) => {
            warn!("Ignoring configuration file {}: {}", path.display(), e);
            None
        }
    }
}

/// Like [`load_partial_options`], but when `path` is the default file name and it
/// does not exist, the per-user configuration file is tried as well.
pub async fn discover_partial_options(path: &Path) -> Option<PartialOptimusOptions> {
    if path.exists() || path != Path::new(DEFAULT_CONFIG_FILE) {
        return load_partial_options(path).await;
    }

    match user_config_file() {
        Some(user_file) if user_file.exists() => {
            debug!("Using user configuration file: {}", user_file.display());
            load_partial_options(&user_file).await
        }
        _ => {
            debug!("No configuration file found, using preset defaults");
            None
        }
    }
}

async fn read_partial_options(path: &Path) -> Result<Option<PartialOptimusOptions>, OptimizeError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Configuration file not found: {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(OptimizeError::ConfigResolution(e.to_string())),
    };

    let options = serde_json::from_str(&content)
        .map_err(|e| OptimizeError::ConfigResolution(e.to_string()))?;

    debug!("Loaded configuration file: {}", path.display());
    Ok(Some(options))
}
