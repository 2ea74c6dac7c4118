//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare tutti gli errori possibili
//! - Porta con sé il contesto utile (path, operazione, root) per il report finale
//! - Integra con `thiserror` per Display e error chaining
//!
//! ## Categorie di errori:
//! - `ConfigResolution`: Configurazione malformata (mai fatale, si degrada ai preset)
//! - `Collection`: Root inesistente o illeggibile, pattern glob non valido
//! - `Transform`: Il transformer esterno ha rifiutato il contenuto di un file
//! - `Io`: Errori di lettura/scrittura/cancellazione
//! - `MissingDependency`: Tool esterno mancante (terser, csso, svgo, ...)
//! - `InvalidConfig`: Parametri runtime non validi
//! - `Task`: Un worker è andato in panic o è stato cancellato
//! - `PoolClosed`: Il semaforo dei worker è stato chiuso durante una fase
//!
//! ## Politica:
//! Tutti gli errori tranne `ConfigResolution` sono fatali per la `run` che li
//! ha prodotti: nessun retry, nessun rollback.
//!
//! ## Esempio:
//! ```rust,ignore
//! if !root.is_dir() {
//!     return Err(OptimizeError::collection(root, "not a directory"));
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Custom error types for bundle optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("Configuration error: {0}")]
    ConfigResolution(String),

    #[error("Cannot collect files under {root}: {reason}")]
    Collection { root: PathBuf, reason: String },

    #[error("Failed to {operation} {path}: {message}")]
    Transform {
        path: PathBuf,
        operation: &'static str,
        message: String,
    },

    #[error("IO error while trying to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Worker pool closed: {0}")]
    PoolClosed(#[from] tokio::sync::AcquireError),
}

impl OptimizeError {
    pub fn collection(root: &Path, reason: impl ToString) -> Self {
        Self::Collection {
            root: root.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wraps whatever the processor reported, keeping the whole cause chain in the message.
    pub fn transform(operation: &'static str, path: &Path, error: anyhow::Error) -> Self {
        Self::Transform {
            path: path.to_path_buf(),
            operation,
            message: format!("{:#}", error),
        }
    }

    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_message_keeps_context() {
        let error = OptimizeError::transform(
            "optimize js",
            Path::new("/www/main.js"),
            anyhow::anyhow!("Unexpected token").context("terser exited with status 1"),
        );

        let message = error.to_string();
        assert!(message.contains("optimize js"));
        assert!(message.contains("/www/main.js"));
        assert!(message.contains("Unexpected token"));
        assert!(error.is_transform());
    }

    #[test]
    fn test_io_error_has_source() {
        let error = OptimizeError::io(
            "read",
            Path::new("missing.css"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );

        assert!(std::error::Error::source(&error).is_some());
        assert!(!error.is_transform());
    }
}
