//! # Bundle Optimizer Main Orchestrator
//!
//! Orchestratore principale: esegue le quattro fasi su una root e delega
//! il lavoro sui singoli file a `TaskOptimizer`.
//!
//! ## Fasi (in ordine, ognuna completamente terminata prima della successiva):
//! 1. **Obfuscate**: `*.{js,cjs,mjs}`, ogni file con un indice distinto
//! 2. **Optimize**: js (+ json/webmanifest), css, svg, html in parallelo tra loro
//! 3. **Remove**: tutti i nodi che corrispondono ai pattern `remove`
//! 4. **Clean**: pulizia post-order delle directory rimaste vuote
//!
//! ## Concorrenza:
//! - Ogni file (o cancellazione) è un task in un `JoinSet`
//! - Un `Semaphore` con `Config::workers` permessi limita i task attivi
//! - Se un task fallisce i fratelli terminano comunque, poi viene restituito
//!   il primo errore e nessuna fase successiva parte

use crate::{
    config::Config,
    error::OptimizeError,
    file_manager::{CollectOrder, FileManager, NodeKind},
    options::{self, OptimusOptions, PartialOptimusOptions},
    optimizer::{
        progress_tracker::ProgressTracker,
        task_optimizer::{TaskOptimizer, Transform},
    },
    processor::Processor,
    progress::{OptimizationStats, ProgressManager},
};
use futures::future::join_all;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

const JS_PATTERN: &str = "*.{js,cjs,mjs}";
const JSON_PATTERN: &str = "*.{json,webmanifest}";
const CSS_PATTERN: &str = "*.css";
const SVG_PATTERN: &str = "*.svg";
const HTML_PATTERN: &str = "*.{htm,html}";

/// Ordered stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Obfuscate,
    Optimize,
    Remove,
    Clean,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Obfuscate => "obfuscate",
            Self::Optimize => "optimize",
            Self::Remove => "remove",
            Self::Clean => "clean",
        };
        f.write_str(name)
    }
}

type TaskResult = Result<(), OptimizeError>;

/// Orchestratore delle fasi, riutilizzabile su più root
pub struct BundleOptimizer {
    config: Config,
    processor: Arc<dyn Processor>,
    semaphore: Arc<Semaphore>,
}

impl BundleOptimizer {
    /// Crea nuova istanza dell'ottimizzatore
    pub fn new(config: Config, processor: Arc<dyn Processor>) -> Result<Self, OptimizeError> {
        config.validate()?;
        debug!("Bundle optimizer using {} workers", config.workers);

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.workers)),
            config,
            processor,
        })
    }

    /// Resolve `partial` against its preset, then run
    pub async fn optimize(
        &self,
        root: &Path,
        partial: Option<&PartialOptimusOptions>,
    ) -> Result<OptimizationStats, OptimizeError> {
        self.run(root, options::resolve(partial, None)).await
    }

    /// Run every phase over `root` without drawing progress
    pub async fn run(&self, root: &Path, options: OptimusOptions) -> Result<OptimizationStats, OptimizeError> {
        self.run_with_progress(root, options, ProgressManager::hidden()).await
    }

    /// Run every phase over `root`, reporting on `progress`
    pub async fn run_with_progress(
        &self,
        root: &Path,
        options: OptimusOptions,
        progress: ProgressManager,
    ) -> Result<OptimizationStats, OptimizeError> {
        let start_time = Instant::now();

        let metadata = tokio::fs::metadata(root)
            .await
            .map_err(|e| OptimizeError::collection(root, e))?;
        if !metadata.is_dir() {
            return Err(OptimizeError::collection(root, "not a directory"));
        }

        info!("Optimizing {} with preset '{}'", root.display(), options.name);
        self.processor.check_dependencies(&options);

        let tracker = ProgressTracker::new(progress);
        let worker = TaskOptimizer::new(self.processor.clone(), Arc::new(options));

        match self.run_phases(root, &worker, &tracker).await {
            Ok(()) => {
                let stats = tracker.get_stats().await;
                tracker.finish(&stats.format_summary());
                info!(
                    "Finished {} in {:.2}s: {}",
                    root.display(),
                    start_time.elapsed().as_secs_f64(),
                    stats.format_summary()
                );
                Ok(stats)
            }
            Err(e) => {
                tracker.abandon(&format!("failed: {}", e));
                Err(e)
            }
        }
    }

    async fn run_phases(&self, root: &Path, worker: &TaskOptimizer, tracker: &ProgressTracker) -> TaskResult {
        for phase in [Phase::Obfuscate, Phase::Optimize, Phase::Remove, Phase::Clean] {
            debug!("Phase {} on {}", phase, root.display());
            match phase {
                Phase::Obfuscate => self.obfuscate(root, worker, tracker).await?,
                Phase::Optimize => self.optimize_categories(root, worker, tracker).await?,
                Phase::Remove => self.remove(root, worker, tracker).await?,
                Phase::Clean => self.clean(root, tracker).await?,
            }
        }
        Ok(())
    }

    fn collect_order(&self) -> CollectOrder {
        if self.config.sorted {
            CollectOrder::Sorted
        } else {
            CollectOrder::Walk
        }
    }

    async fn collect_files(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>, OptimizeError> {
        FileManager::collect_async(root, pattern, NodeKind::File, self.collect_order()).await
    }

    async fn obfuscate(&self, root: &Path, worker: &TaskOptimizer, tracker: &ProgressTracker) -> TaskResult {
        if !worker.options().obfuscate.js.enabled {
            return Ok(());
        }

        let files = self.collect_files(root, JS_PATTERN).await?;
        tracker.start_phase(&Phase::Obfuscate.to_string(), files.len());

        // indices follow collection order and are fixed before any task starts
        let jobs = files
            .into_iter()
            .enumerate()
            .map(|(index, path)| (path, Transform::ObfuscateJs { index }))
            .collect();

        self.transform_all(jobs, worker, tracker).await
    }

    async fn optimize_categories(&self, root: &Path, worker: &TaskOptimizer, tracker: &ProgressTracker) -> TaskResult {
        let optimize = &worker.options().optimize;
        let mut categories = Vec::new();

        if optimize.js.enabled {
            categories.push((JS_PATTERN, Transform::OptimizeJs));
            categories.push((JSON_PATTERN, Transform::OptimizeJson));
        }
        if optimize.css.enabled {
            categories.push((CSS_PATTERN, Transform::OptimizeCss));
        }
        if optimize.svg.enabled {
            categories.push((SVG_PATTERN, Transform::OptimizeSvg));
        }
        if optimize.html.enabled {
            categories.push((HTML_PATTERN, Transform::OptimizeHtml));
        }

        let results = join_all(
            categories
                .into_iter()
                .map(|(pattern, transform)| self.optimize_category(root, pattern, transform, worker, tracker)),
        )
        .await;

        results.into_iter().collect()
    }

    async fn optimize_category(
        &self,
        root: &Path,
        pattern: &str,
        transform: Transform,
        worker: &TaskOptimizer,
        tracker: &ProgressTracker,
    ) -> TaskResult {
        let files = self.collect_files(root, pattern).await?;
        tracker.start_phase(transform.operation(), files.len());

        let jobs = files.into_iter().map(|path| (path, transform)).collect();
        self.transform_all(jobs, worker, tracker).await
    }

    async fn transform_all(
        &self,
        jobs: Vec<(PathBuf, Transform)>,
        worker: &TaskOptimizer,
        tracker: &ProgressTracker,
    ) -> TaskResult {
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();

        for (path, transform) in jobs {
            let permit = self.semaphore.clone().acquire_owned().await?;
            let worker = worker.clone();
            let tracker = tracker.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let file = worker.transform_file(&path, transform).await?;
                tracker.file_transformed(transform, &file).await;
                Ok(())
            });
        }

        Self::join_tasks(tasks).await
    }

    async fn remove(&self, root: &Path, worker: &TaskOptimizer, tracker: &ProgressTracker) -> TaskResult {
        let patterns = worker.options().remove.clone();
        if patterns.is_empty() {
            return Ok(());
        }

        let matrix = FileManager::collect_matrix_async(root, patterns, NodeKind::Any, self.collect_order()).await?;
        let targets = outermost(matrix.into_iter().flatten().collect());
        tracker.start_phase(&Phase::Remove.to_string(), targets.len());

        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        for path in targets {
            let permit = self.semaphore.clone().acquire_owned().await?;
            let tracker = tracker.clone();

            tasks.spawn(async move {
                let _permit = permit;
                if FileManager::remove_node(&path).await? {
                    tracker.node_removed(&path).await;
                }
                Ok(())
            });
        }

        Self::join_tasks(tasks).await
    }

    async fn clean(&self, root: &Path, tracker: &ProgressTracker) -> TaskResult {
        tracker.start_phase(&Phase::Clean.to_string(), 1);

        let root = root.to_path_buf();
        let removed = tokio::task::spawn_blocking(move || FileManager::remove_empty_dirs(&root)).await??;
        tracker.dirs_cleaned(removed).await;
        Ok(())
    }

    /// Wait for every task, then report the first failure
    async fn join_tasks(mut tasks: JoinSet<TaskResult>) -> TaskResult {
        let mut first_error = None;

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(OptimizeError::from).and_then(|result| result);
            if let Err(e) = outcome {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    error!("{}", e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Sort and deduplicate `paths`, dropping any path inside another one of the list
fn outermost(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort();
    paths.dedup();

    let mut kept: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if kept.last().map_or(true, |last| !path.starts_with(last)) {
            kept.push(path);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{PartialCategoryOptions, PartialObfuscateOptions, Preset};
    use crate::processor::testing::FakeProcessor;
    use std::fs;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(root: &Path, relative: &str) -> String {
        fs::read_to_string(root.join(relative)).unwrap()
    }

    fn optimizer(processor: Arc<FakeProcessor>) -> BundleOptimizer {
        let config = Config {
            workers: 4,
            sorted: true,
        };
        BundleOptimizer::new(config, processor).unwrap()
    }

    fn mobile_with_obfuscation() -> OptimusOptions {
        let mut options = Preset::Mobile.options().clone();
        options.obfuscate.js.enabled = true;
        options
    }

    #[tokio::test]
    async fn test_obfuscation_runs_before_minification() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.js", "var a = 1;");

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        let stats = assert_ok!(optimizer.run(dir.path(), mobile_with_obfuscation()).await);

        assert_eq!(read(dir.path(), "a.js"), "min[obf_0[var a = 1;]]");
        assert_eq!(stats.files_obfuscated, 1);
    }

    #[tokio::test]
    async fn test_obfuscation_indices_are_distinct() {
        let dir = TempDir::new().unwrap();
        for name in ["a.js", "b.cjs", "lib/c.mjs", "lib/deep/d.js", "e.js"] {
            write(dir.path(), name, "x();");
        }

        let processor = Arc::new(FakeProcessor::tagging());
        let mut options = Preset::Server.options().clone();
        options.obfuscate.js.enabled = true;
        assert_ok!(optimizer(processor.clone()).run(dir.path(), options).await);

        let mut indices = processor.indices.lock().unwrap().clone();
        indices.sort();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_sorted_obfuscation_indices_are_reproducible() {
        let expected = [
            ("a.js", 0),
            ("b.cjs", 1),
            ("e.js", 2),
            ("lib/c.mjs", 3),
            ("lib/deep/d.js", 4),
        ];

        for _ in 0..2 {
            let dir = TempDir::new().unwrap();
            for (name, _) in expected.iter().rev() {
                write(dir.path(), name, "x();");
            }

            let mut options = Preset::Server.options().clone();
            options.obfuscate.js.enabled = true;
            assert_ok!(optimizer(Arc::new(FakeProcessor::tagging())).run(dir.path(), options).await);

            for (name, index) in expected {
                assert_eq!(read(dir.path(), name), format!("obf_{}[x();]", index), "{}", name);
            }
        }
    }

    #[tokio::test]
    async fn test_scenario_mobile_bundle() {
        let dir = TempDir::new().unwrap();
        let source = "function add(a, b) {\n  // sum\n  return a + b;\n}\n";
        write(dir.path(), "a.js", source);
        write(dir.path(), "a.map", "{\"version\":3}");

        let optimizer = optimizer(Arc::new(FakeProcessor::minifying()));
        assert_ok!(optimizer.optimize(dir.path(), Some(&PartialOptimusOptions::named("mobile"))).await);

        let minified = read(dir.path(), "a.js");
        assert!(minified.len() <= source.len());
        assert!(!dir.path().join("a.map").exists());
    }

    #[tokio::test]
    async fn test_scenario_server_bundle() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", "# app");
        write(dir.path(), "test/x.js", "it();");
        write(dir.path(), "index.js", "module.exports = {};\n");

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        let stats = assert_ok!(optimizer.optimize(dir.path(), None).await);

        assert!(!dir.path().join("README.md").exists());
        assert!(!dir.path().join("test").exists());
        assert_eq!(read(dir.path(), "index.js"), "module.exports = {};\n");
        assert_eq!(stats.nodes_removed, 2);
        assert_eq!(stats.files_optimized, 0);
    }

    #[tokio::test]
    async fn test_scenario_empty_directory_is_cleaned() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        write(dir.path(), "index.js", "run();");

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        assert_ok!(optimizer.optimize(dir.path(), None).await);

        assert!(!dir.path().join("empty").exists());
        assert!(dir.path().join("index.js").exists());
    }

    #[tokio::test]
    async fn test_scenario_invalid_js_stops_the_run() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.js", "function broken() {");
        write(dir.path(), "bad.js.map", "{}");

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        let error = optimizer
            .run(dir.path(), Preset::Mobile.options().clone())
            .await
            .unwrap_err();

        assert!(error.is_transform());
        assert!(error.to_string().contains("bad.js"));
        assert!(dir.path().join("bad.js.map").exists());
        assert_eq!(read(dir.path(), "bad.js"), "function broken() {");
    }

    #[tokio::test]
    async fn test_removal_happens_before_cleanup() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "maps/app.js.map", "{}");
        write(dir.path(), "maps/nested/vendor.js.map", "{}");
        write(dir.path(), "index.html", "<p>hi</p>");

        let mut options = Preset::Mobile.options().clone();
        options.optimize.js.enabled = false;

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        let stats = assert_ok!(optimizer.run(dir.path(), options).await);

        assert!(!dir.path().join("maps").exists());
        assert_eq!(read(dir.path(), "index.html"), "html[<p>hi</p>]");
        assert_eq!(stats.directories_cleaned, 2);
    }

    #[tokio::test]
    async fn test_json_companions_follow_js_flag() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "manifest.webmanifest", "{\n  \"name\": \"app\"\n}\n");
        write(dir.path(), "i18n/en.json", "[ \"hello\" ]");

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        assert_ok!(optimizer.run(dir.path(), Preset::Mobile.options().clone()).await);
        assert_eq!(read(dir.path(), "manifest.webmanifest"), r#"{"name":"app"}"#);
        assert_eq!(read(dir.path(), "i18n/en.json"), r#"["hello"]"#);

        let untouched = TempDir::new().unwrap();
        write(untouched.path(), "data.json", "{ \"a\": 1 }");
        assert_ok!(optimizer.optimize(untouched.path(), None).await);
        assert_eq!(read(untouched.path(), "data.json"), "{ \"a\": 1 }");
    }

    #[tokio::test]
    async fn test_invalid_json_fails_the_run() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config.json", "{ \"a\": ");

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        let error = optimizer
            .run(dir.path(), Preset::Mobile.options().clone())
            .await
            .unwrap_err();
        assert!(error.is_transform());
    }

    #[tokio::test]
    async fn test_overlapping_removals_do_not_fail() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "test/fixtures/test/case.md", "fixture");
        write(dir.path(), "lib/index.js", "x();");

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        let stats = assert_ok!(optimizer.optimize(dir.path(), None).await);

        assert!(!dir.path().join("test").exists());
        assert!(dir.path().join("lib/index.js").exists());
        assert_eq!(stats.nodes_removed, 1);
    }

    #[tokio::test]
    async fn test_caller_options_layer_over_preset() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app.js", "go();");
        write(dir.path(), "notes.md", "keep me");

        let partial = PartialOptimusOptions {
            name: Some("server".to_string()),
            remove: Some(Vec::new()),
            obfuscate: Some(PartialObfuscateOptions {
                js: Some(PartialCategoryOptions {
                    enabled: Some(true),
                    options: None,
                }),
            }),
            ..Default::default()
        };

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        assert_ok!(optimizer.optimize(dir.path(), Some(&partial)).await);

        assert_eq!(read(dir.path(), "app.js"), "obf_0[go();]");
        assert!(dir.path().join("notes.md").exists());
    }

    #[tokio::test]
    async fn test_missing_root_is_collection_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("www");

        let optimizer = optimizer(Arc::new(FakeProcessor::tagging()));
        let error = optimizer.optimize(&missing, None).await.unwrap_err();
        assert!(matches!(error, OptimizeError::Collection { .. }));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let config = Config {
            workers: 0,
            sorted: false,
        };
        let result = BundleOptimizer::new(config, Arc::new(FakeProcessor::tagging()));
        assert!(matches!(result, Err(OptimizeError::InvalidConfig(_))));
    }

    #[test]
    fn test_outermost_drops_nested_paths() {
        let paths = vec![
            PathBuf::from("/r/test/fixtures/test"),
            PathBuf::from("/r/test"),
            PathBuf::from("/r/test-utils"),
            PathBuf::from("/r/test"),
            PathBuf::from("/r/a.md"),
        ];

        assert_eq!(
            outermost(paths),
            vec![
                PathBuf::from("/r/a.md"),
                PathBuf::from("/r/test"),
                PathBuf::from("/r/test-utils"),
            ]
        );
        assert_eq!(Phase::Remove.to_string(), "remove");
    }
}
