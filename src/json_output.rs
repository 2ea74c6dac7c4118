//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per chi invoca il
//! binario da un altro processo (script di build, CI).
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout
//! - Riusa `OptimizationStats` per il report finale
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio elaborazione di una root
//! - `complete`: Fine elaborazione di una root con statistiche
//! - `error`: Errore fatale su una root

use crate::progress::OptimizationStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio elaborazione di una root
    #[serde(rename = "start")]
    Start { root: PathBuf, preset: String },

    /// Root completata
    #[serde(rename = "complete")]
    Complete {
        root: PathBuf,
        stats: OptimizationStats,
        bytes_saved: u64,
        duration_seconds: f64,
    },

    /// Errore fatale
    #[serde(rename = "error")]
    Error { root: PathBuf, message: String },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(root: PathBuf, preset: impl Into<String>) -> Self {
        Self::Start {
            root,
            preset: preset.into(),
        }
    }

    pub fn complete(root: PathBuf, stats: OptimizationStats, duration_seconds: f64) -> Self {
        Self::Complete {
            root,
            bytes_saved: stats.total_bytes_saved(),
            stats,
            duration_seconds,
        }
    }

    pub fn error(root: PathBuf, message: impl ToString) -> Self {
        Self::Error {
            root,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_messages_are_tagged() {
        let start = serde_json::to_value(JsonMessage::start(PathBuf::from("www"), "mobile")).unwrap();
        assert_eq!(start, json!({ "type": "start", "root": "www", "preset": "mobile" }));

        let error = serde_json::to_value(JsonMessage::error(PathBuf::from("www"), "boom")).unwrap();
        assert_eq!(error["type"], "error");
        assert_eq!(error["message"], "boom");
    }

    #[test]
    fn test_complete_carries_stats() {
        let mut stats = OptimizationStats::new();
        stats.add_optimized(200, 50);
        stats.add_removed();

        let value: Value = serde_json::to_value(JsonMessage::complete(PathBuf::from("dist"), stats, 1.5)).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["bytes_saved"], 150);
        assert_eq!(value["stats"]["nodes_removed"], 1);
        assert_eq!(value["duration_seconds"], 1.5);
    }
}
