//! # Optimus Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `options`: Modello delle opzioni, preset e risoluzione
//! - `config`: Configurazione runtime e caricamento del file utente
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `file_manager`: Raccolta dei file per pattern glob e primitive sul filesystem
//! - `processor`: Interfaccia verso i transformer (minificatori, offuscatore)
//! - `external_processor`: Transformer implementati con tool Node.js
//! - `tool_resolver`: Ricerca dei tool esterni
//! - `optimizer`: Orchestratore delle fasi
//! - `hook`: Integrazione con la build Ionic/Cordova
//! - `progress`: Progress tracking e statistiche
//! - `json_output`: Eventi JSON per l'uso da altri processi
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use optimus::{optimus, PartialOptimusOptions};
//!
//! let stats = optimus(Path::new("www"), Some(&PartialOptimusOptions::named("mobile"))).await?;
//! println!("{}", stats.format_summary());
//! ```

pub mod config;
pub mod error;
pub mod external_processor;
pub mod file_manager;
pub mod hook;
pub mod json_output;
pub mod optimizer;
pub mod options;
pub mod processor;
pub mod progress;
pub mod tool_resolver;

pub use config::Config;
pub use error::OptimizeError;
pub use external_processor::ExternalProcessor;
pub use optimizer::BundleOptimizer;
pub use options::{resolve, OptimusOptions, PartialOptimusOptions, Preset};
pub use processor::Processor;
pub use progress::OptimizationStats;

use std::path::Path;
use std::sync::Arc;

/// Resolve `partial` and run every phase over `root` with the Node.js tools.
pub async fn optimus(
    root: &Path,
    partial: Option<&PartialOptimusOptions>,
) -> Result<OptimizationStats, OptimizeError> {
    let optimizer = BundleOptimizer::new(Config::default(), Arc::new(ExternalProcessor::new()))?;
    optimizer.optimize(root, partial).await
}
