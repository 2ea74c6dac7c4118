//! # Progress Tracking Module
//!
//! Unifica statistiche e spinner in un singolo tracker thread-safe,
//! condiviso (clonato) tra tutti i task di una run.

use crate::{
    optimizer::task_optimizer::{Transform, TransformedFile},
    progress::{OptimizationStats, ProgressManager},
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tracker progress condiviso tra i worker di una run
#[derive(Clone)]
pub struct ProgressTracker {
    stats: Arc<Mutex<OptimizationStats>>,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    /// Crea un nuovo tracker sopra lo spinner dato
    pub fn new(progress_manager: ProgressManager) -> Self {
        Self {
            stats: Arc::new(Mutex::new(OptimizationStats::new())),
            progress_manager,
        }
    }

    /// Annuncia l'inizio di una fase
    pub fn start_phase(&self, phase: &str, units: usize) {
        self.progress_manager
            .set_message(&format!("{} ({} items)", phase, units));
    }

    /// Registra un file riscritto
    pub async fn file_transformed(&self, transform: Transform, file: &TransformedFile) {
        {
            let mut stats = self.stats.lock().await;
            match transform {
                Transform::ObfuscateJs { .. } => stats.add_obfuscated(),
                _ => stats.add_optimized(file.original_size, file.optimized_size),
            }
        }

        self.progress_manager.update(&format!(
            "{} {}",
            transform.operation(),
            display_name(&file.path)
        ));
    }

    /// Registra un nodo cancellato
    pub async fn node_removed(&self, path: &Path) {
        self.stats.lock().await.add_removed();
        self.progress_manager
            .update(&format!("remove {}", display_name(path)));
    }

    /// Registra le directory vuote eliminate dalla pulizia finale
    pub async fn dirs_cleaned(&self, count: usize) {
        self.stats.lock().await.add_cleaned(count);
    }

    /// Ottieni statistiche per report finale
    pub async fn get_stats(&self) -> OptimizationStats {
        self.stats.lock().await.clone()
    }

    /// Finalizza lo spinner
    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }

    /// Finalizza lo spinner segnalando il fallimento
    pub fn abandon(&self, message: &str) {
        self.progress_manager.abandon(message);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}
