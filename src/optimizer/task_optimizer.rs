//! # Task Optimizer Module
//!
//! Worker per la trasformazione di singoli file.
//! Separato dall'orchestratore principale: legge il file, lo passa al
//! `Processor` con le opzioni della categoria, lo riscrive sul posto.

use crate::{
    error::OptimizeError,
    file_manager::FileManager,
    options::OptimusOptions,
    processor::{operation, Processor},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// What to do with one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    OptimizeJs,
    OptimizeJson,
    OptimizeCss,
    OptimizeSvg,
    OptimizeHtml,
    /// `index` is the file's position in the obfuscation batch
    ObfuscateJs { index: usize },
}

impl Transform {
    pub fn operation(self) -> &'static str {
        match self {
            Self::OptimizeJs => operation::OPTIMIZE_JS,
            Self::OptimizeJson => operation::OPTIMIZE_JSON,
            Self::OptimizeCss => operation::OPTIMIZE_CSS,
            Self::OptimizeSvg => operation::OPTIMIZE_SVG,
            Self::OptimizeHtml => operation::OPTIMIZE_HTML,
            Self::ObfuscateJs { .. } => operation::OBFUSCATE_JS,
        }
    }
}

/// Result of a successful rewrite
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedFile {
    pub path: PathBuf,
    pub original_size: u64,
    pub optimized_size: u64,
}

/// Worker shared by every task of a run
#[derive(Clone)]
pub struct TaskOptimizer {
    processor: Arc<dyn Processor>,
    options: Arc<OptimusOptions>,
}

impl TaskOptimizer {
    pub fn new(processor: Arc<dyn Processor>, options: Arc<OptimusOptions>) -> Self {
        Self { processor, options }
    }

    pub fn options(&self) -> &OptimusOptions {
        &self.options
    }

    /// Read `path`, transform it and overwrite it in place
    pub async fn transform_file(&self, path: &Path, transform: Transform) -> Result<TransformedFile, OptimizeError> {
        let content = FileManager::read_text(path).await?;
        let original_size = content.len() as u64;

        let output = self
            .apply(transform, content)
            .await
            .map_err(|e| Self::classify(transform, path, e))?;

        FileManager::write_text(path, &output).await?;

        debug!(
            "{} {}: {} -> {}",
            transform.operation(),
            path.display(),
            FileManager::format_size(original_size),
            FileManager::format_size(output.len() as u64)
        );

        Ok(TransformedFile {
            path: path.to_path_buf(),
            original_size,
            optimized_size: output.len() as u64,
        })
    }

    async fn apply(&self, transform: Transform, content: String) -> anyhow::Result<String> {
        let optimize = &self.options.optimize;
        match transform {
            Transform::OptimizeJs => self.processor.optimize_js(content, &optimize.js.options).await,
            Transform::OptimizeJson => self.processor.optimize_json(content).await,
            Transform::OptimizeCss => self.processor.optimize_css(content, &optimize.css.options).await,
            Transform::OptimizeSvg => self.processor.optimize_svg(content, &optimize.svg.options).await,
            Transform::OptimizeHtml => self.processor.optimize_html(content, &optimize.html.options).await,
            Transform::ObfuscateJs { index } => {
                self.processor
                    .obfuscate_js(content, &self.options.obfuscate.js.options, index)
                    .await
            }
        }
    }

    /// A missing tool stays a `MissingDependency`, anything else is the file's transform failure
    fn classify(transform: Transform, path: &Path, error: anyhow::Error) -> OptimizeError {
        match error.downcast::<OptimizeError>() {
            Ok(missing @ OptimizeError::MissingDependency(_)) => missing,
            Ok(other) => OptimizeError::transform(transform.operation(), path, other.into()),
            Err(error) => OptimizeError::transform(transform.operation(), path, error),
        }
    }
}
