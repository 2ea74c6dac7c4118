//! # Optimizer Module
//!
//! Modulo che separa le responsabilità in sottomoduli:
//! - `bundle_optimizer`: Orchestratore delle quattro fasi
//! - `task_optimizer`: Worker per singoli file
//! - `progress_tracker`: Statistiche e spinner condivisi tra i task

pub mod bundle_optimizer;
pub mod progress_tracker;
pub mod task_optimizer;

pub use bundle_optimizer::{BundleOptimizer, Phase};
pub use progress_tracker::ProgressTracker;
pub use task_optimizer::{TaskOptimizer, Transform, TransformedFile};
