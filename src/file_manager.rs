//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sul filesystem della pipeline.
//!
//! ## Responsabilità:
//! - Raccolta ricorsiva dei nodi che corrispondono a un pattern glob
//! - Lettura e riscrittura in place del contenuto testuale dei file
//! - Cancellazione di file e directory (ricorsiva, tollerante ai nodi già spariti)
//! - Pulizia post-order delle directory rimaste vuote
//! - Copia ricorsiva di directory (backup per gli hook di build)
//! - Formattazione human-readable delle dimensioni
//!
//! ## Semantica dei pattern:
//! - Il pattern è confrontato col path relativo alla root come se fosse
//!   preceduto da `**/`: `*.css` trova i file a qualunque profondità
//! - Brace expansion supportata: `*.{js,cjs,mjs}`
//! - Un nodo nascosto (nome che inizia con `.`) corrisponde solo a pattern che
//!   iniziano con `.`; le directory nascoste non vengono attraversate
//! - La root stessa non è mai un risultato; i symlink non vengono seguiti
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::collect(&root, "*.{js,cjs,mjs}", NodeKind::File, CollectOrder::Walk)?;
//! for file in files {
//!     let content = FileManager::read_text(&file).await?;
//! }
//! ```

use crate::error::OptimizeError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::{DirEntry, WalkDir};

/// Which kind of filesystem node a collection may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Regular files only
    File,
    /// Files and directories
    Any,
}

/// Traversal order of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectOrder {
    /// Whatever order the filesystem returns
    #[default]
    Walk,
    /// Entries sorted by file name within each directory
    Sorted,
}

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find every node under `root` matching `pattern`, at any depth.
    pub fn collect(
        root: &Path,
        pattern: &str,
        kind: NodeKind,
        order: CollectOrder,
    ) -> Result<Vec<PathBuf>, OptimizeError> {
        let mut matrix = Self::collect_matrix(root, &[pattern], kind, order)?;
        Ok(matrix.pop().unwrap_or_default())
    }

    /// Run several independent queries in a single walk.
    ///
    /// Row `i` of the result holds exactly what `collect(root, patterns[i], ..)`
    /// would return; rows may overlap.
    pub fn collect_matrix<S: AsRef<str>>(
        root: &Path,
        patterns: &[S],
        kind: NodeKind,
        order: CollectOrder,
    ) -> Result<Vec<Vec<PathBuf>>, OptimizeError> {
        let metadata = std::fs::metadata(root).map_err(|e| OptimizeError::collection(root, e))?;
        if !metadata.is_dir() {
            return Err(OptimizeError::collection(root, "not a directory"));
        }

        let globs = Self::compile(root, patterns)?;
        let matches_hidden: Vec<bool> = patterns
            .iter()
            .map(|pattern| Self::targets_hidden(pattern.as_ref()))
            .collect();

        let mut walker = WalkDir::new(root).min_depth(1);
        if order == CollectOrder::Sorted {
            walker = walker.sort_by_file_name();
        }

        let mut matrix = vec![Vec::new(); patterns.len()];
        let mut entries = walker.into_iter();

        while let Some(entry) = entries.next() {
            let entry = entry.map_err(|e| OptimizeError::collection(root, e))?;
            let hidden = is_hidden(&entry);

            if hidden && entry.file_type().is_dir() {
                entries.skip_current_dir();
            }
            if kind == NodeKind::File && !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            for index in globs.matches(relative) {
                if hidden && !matches_hidden[index] {
                    continue;
                }
                matrix[index].push(entry.path().to_path_buf());
            }
        }

        Ok(matrix)
    }

    /// [`FileManager::collect`] on the blocking thread pool.
    pub async fn collect_async(
        root: &Path,
        pattern: &str,
        kind: NodeKind,
        order: CollectOrder,
    ) -> Result<Vec<PathBuf>, OptimizeError> {
        let root = root.to_path_buf();
        let pattern = pattern.to_string();

        tokio::task::spawn_blocking(move || Self::collect(&root, &pattern, kind, order)).await?
    }

    /// [`FileManager::collect_matrix`] on the blocking thread pool.
    pub async fn collect_matrix_async(
        root: &Path,
        patterns: Vec<String>,
        kind: NodeKind,
        order: CollectOrder,
    ) -> Result<Vec<Vec<PathBuf>>, OptimizeError> {
        let root = root.to_path_buf();

        tokio::task::spawn_blocking(move || Self::collect_matrix(&root, &patterns, kind, order)).await?
    }

    fn compile<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<GlobSet, OptimizeError> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let anchored = format!("**/{}", pattern.trim_start_matches("./").trim_start_matches('/'));
            let glob = GlobBuilder::new(&anchored)
                .literal_separator(true)
                .build()
                .map_err(|e| OptimizeError::collection(root, format!("invalid pattern {:?}: {}", pattern, e)))?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| OptimizeError::collection(root, e))
    }

    fn targets_hidden(pattern: &str) -> bool {
        pattern
            .rsplit('/')
            .next()
            .map_or(false, |segment| segment.starts_with('.'))
    }

    /// Read a file as UTF-8 text
    pub async fn read_text(path: &Path) -> Result<String, OptimizeError> {
        fs::read_to_string(path)
            .await
            .map_err(|e| OptimizeError::io("read", path, e))
    }

    /// Overwrite a file in place
    pub async fn write_text(path: &Path, content: &str) -> Result<(), OptimizeError> {
        fs::write(path, content)
            .await
            .map_err(|e| OptimizeError::io("write", path, e))
    }

    /// Delete a file or a whole directory tree.
    ///
    /// Returns `false` when the node was already gone, which happens when an
    /// ancestor matched another pattern and was removed concurrently.
    pub async fn remove_node(path: &Path) -> Result<bool, OptimizeError> {
        // a concurrent removal of a descendant can make remove_dir_all report NotFound
        // while the directory itself still exists
        for _ in 0..3 {
            let metadata = match fs::symlink_metadata(path).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(OptimizeError::io("inspect", path, e)),
            };

            let result = if metadata.is_dir() {
                fs::remove_dir_all(path).await
            } else {
                fs::remove_file(path).await
            };

            match result {
                Ok(()) => return Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(OptimizeError::io("remove", path, e)),
            }
        }

        Ok(fs::symlink_metadata(path).await.is_err())
    }

    /// Remove every directory under `root` (and `root` itself) that is empty once
    /// its children have been cleaned. Files are never touched.
    ///
    /// Returns the number of directories removed.
    pub fn remove_empty_dirs(root: &Path) -> Result<usize, OptimizeError> {
        let mut removed = 0;

        for entry in WalkDir::new(root).contents_first(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                OptimizeError::io("walk", &path, io::Error::from(e))
            })?;

            if !entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let mut children = std::fs::read_dir(path).map_err(|e| OptimizeError::io("list", path, e))?;

            if children.next().is_none() {
                std::fs::remove_dir(path).map_err(|e| OptimizeError::io("remove directory", path, e))?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Recursively copy `source` into `destination`, creating it if needed.
    pub fn copy_dir(source: &Path, destination: &Path) -> Result<u64, OptimizeError> {
        let mut copied = 0;

        for entry in WalkDir::new(source) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                OptimizeError::io("walk", &path, io::Error::from(e))
            })?;

            let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
            let target = destination.join(relative);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target).map_err(|e| OptimizeError::io("create directory", &target, e))?;
            } else {
                copied += std::fs::copy(entry.path(), &target)
                    .map_err(|e| OptimizeError::io("copy", entry.path(), e))?;
            }
        }

        Ok(copied)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map_or(false, |name| name.starts_with('.'))
}
