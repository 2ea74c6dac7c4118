//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il feedback visivo e le statistiche di una run.
//!
//! ## Responsabilità:
//! - Spinner con `indicatif` per ogni root in elaborazione
//! - Tracking statistiche (file offuscati, ottimizzati, nodi rimossi, directory pulite)
//! - Calcolo byte risparmiati dalla fase di ottimizzazione
//! - Aggregazione delle statistiche di più root
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce lo spinner (nascosto in modalità libreria o JSON)
//! - `OptimizationStats`: Traccia statistiche cumulative
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:03] www: optimize css (12 files) styles/main.css
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let multi = MultiProgress::new();
//! let progress = ProgressManager::spinner_in(&multi, "www");
//! let mut stats = OptimizationStats::new();
//!
//! stats.add_optimized(original_size, new_size);
//! progress.set_message("optimize js: main.js");
//!
//! progress.finish(&stats.format_summary());
//! ```

use crate::file_manager::FileManager;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Manages progress reporting for one root
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Progress that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Create a spinner drawn together with the other roots' spinners
    pub fn spinner_in(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        Self::style(&bar, message);
        Self { bar }
    }

    fn style(bar: &ProgressBar, message: &str) {
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {prefix}: {msg}") {
            bar.set_style(style);
        }
        bar.set_prefix(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and mark the root as failed
    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

/// Statistics tracker for one or more runs
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStats {
    pub files_obfuscated: usize,
    pub files_optimized: usize,
    pub nodes_removed: usize,
    pub directories_cleaned: usize,
    /// Size of optimized files before optimization
    pub total_original_size: u64,
    /// Size of optimized files after optimization
    pub total_optimized_size: u64,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_obfuscated(&mut self) {
        self.files_obfuscated += 1;
    }

    pub fn add_optimized(&mut self, original_size: u64, new_size: u64) {
        self.files_optimized += 1;
        self.total_original_size += original_size;
        self.total_optimized_size += new_size;
    }

    pub fn add_removed(&mut self) {
        self.nodes_removed += 1;
    }

    pub fn add_cleaned(&mut self, directories: usize) {
        self.directories_cleaned += directories;
    }

    /// Fold another run's numbers into these
    pub fn merge(&mut self, other: &OptimizationStats) {
        self.files_obfuscated += other.files_obfuscated;
        self.files_optimized += other.files_optimized;
        self.nodes_removed += other.nodes_removed;
        self.directories_cleaned += other.directories_cleaned;
        self.total_original_size += other.total_original_size;
        self.total_optimized_size += other.total_optimized_size;
    }

    pub fn total_bytes_saved(&self) -> u64 {
        self.total_original_size.saturating_sub(self.total_optimized_size)
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved() as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Obfuscated: {} | Optimized: {} | Removed: {} | Cleaned dirs: {} | Total saved: {} ({:.2}%)",
            self.files_obfuscated,
            self.files_optimized,
            self.nodes_removed,
            self.directories_cleaned,
            FileManager::format_size(self.total_bytes_saved()),
            self.overall_reduction_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = OptimizationStats::new();
        stats.add_optimized(1000, 400);
        stats.add_optimized(1000, 600);
        stats.add_removed();
        stats.add_cleaned(2);

        assert_eq!(stats.files_optimized, 2);
        assert_eq!(stats.total_bytes_saved(), 1000);
        assert_eq!(stats.overall_reduction_percent(), 50.0);
        assert!(stats.format_summary().contains("Removed: 1"));
    }

    #[test]
    fn test_stats_growth_is_not_savings() {
        let mut stats = OptimizationStats::new();
        stats.add_optimized(10, 25);
        assert_eq!(stats.total_bytes_saved(), 0);
        assert_eq!(OptimizationStats::new().overall_reduction_percent(), 0.0);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = OptimizationStats::new();
        let mut www = OptimizationStats::new();
        www.add_obfuscated();
        www.add_optimized(100, 50);
        let mut platform = OptimizationStats::new();
        platform.add_removed();

        total.merge(&www);
        total.merge(&platform);

        assert_eq!(total.files_obfuscated, 1);
        assert_eq!(total.nodes_removed, 1);
        assert_eq!(total.total_bytes_saved(), 50);
    }

    #[test]
    fn test_hidden_progress_is_silent() {
        let progress = ProgressManager::hidden();
        progress.set_message("optimize js");
        progress.update("main.js");
        progress.finish("done");
    }
}
