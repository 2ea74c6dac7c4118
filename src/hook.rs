//! # Build Hook Module
//!
//! Integrazione con la build di un'app ibrida (Ionic/Cordova).
//!
//! ## Responsabilità:
//! - Legge il contesto della build (directory, piattaforma, configurazione)
//! - Prima della build: backup di `platforms/<p>/platform_www`, poi ottimizza
//!   `www` e la directory di piattaforma in parallelo col preset `mobile`
//! - Dopo la build: ripristina la directory di piattaforma dal backup
//!
//! Il hook agisce solo per la configurazione `production`; per le altre
//! configurazioni non fa nulla.
//!
//! ## Esempio:
//! ```rust,ignore
//! let context = HookContext::from_env()?;
//! run_hook(&optimizer, &context, HookEvent::BeforeBuild, None).await?;
//! ```

use crate::{
    error::OptimizeError,
    file_manager::FileManager,
    optimizer::BundleOptimizer,
    options::{PartialOptimusOptions, Preset},
    progress::OptimizationStats,
};
use clap::ValueEnum;
use futures::future::join_all;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const BUILD_DIR_VAR: &str = "IONIC_CLI_HOOK_CTX_BUILD_DIR";
pub const BUILD_PLATFORM_VAR: &str = "IONIC_CLI_HOOK_CTX_BUILD_PLATFORM";
pub const BUILD_CONFIGURATION_VAR: &str = "IONIC_CLI_HOOK_CTX_BUILD_CONFIGURATION";

/// Build configuration the hook acts on
const PRODUCTION: &str = "production";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildPlatform {
    Android,
    Ios,
}

impl BuildPlatform {
    pub fn name(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Android, Self::Ios]
            .into_iter()
            .find(|platform| platform.name() == name)
    }
}

impl fmt::Display for BuildPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookEvent {
    BeforeBuild,
    AfterBuild,
}

/// Everything the hook needs to know about the running build
#[derive(Debug, Clone, PartialEq)]
pub struct HookContext {
    pub build_dir: PathBuf,
    pub platform: BuildPlatform,
    pub configuration: String,
}

impl HookContext {
    /// Read the context the build tool exports to its hooks
    pub fn from_env() -> Result<Self, OptimizeError> {
        let read = |name: &str| {
            env::var(name).map_err(|_| OptimizeError::InvalidConfig(format!("{} is not set", name)))
        };

        let platform = read(BUILD_PLATFORM_VAR)?;
        Ok(Self {
            build_dir: PathBuf::from(read(BUILD_DIR_VAR)?),
            platform: BuildPlatform::from_name(&platform)
                .ok_or_else(|| OptimizeError::InvalidConfig(format!("Unsupported build platform: {}", platform)))?,
            configuration: read(BUILD_CONFIGURATION_VAR)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.configuration == PRODUCTION
    }

    pub fn web_path(&self) -> PathBuf {
        self.build_dir.join("www")
    }

    /// `platforms/<platform>/platform_www` under the build directory
    pub fn platform_path(&self) -> PathBuf {
        self.build_dir
            .join("platforms")
            .join(self.platform.name())
            .join("platform_www")
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut backup = self.platform_path().into_os_string();
        backup.push("_backup");
        PathBuf::from(backup)
    }
}

/// Run the hook for `event`. Returns the combined stats when the engine ran.
pub async fn run_hook(
    optimizer: &BundleOptimizer,
    context: &HookContext,
    event: HookEvent,
    partial: Option<&PartialOptimusOptions>,
) -> Result<Option<OptimizationStats>, OptimizeError> {
    if !context.is_production() {
        debug!("Skipping {:?} hook for configuration '{}'", event, context.configuration);
        return Ok(None);
    }

    match event {
        HookEvent::BeforeBuild => before_build(optimizer, context, partial).await.map(Some),
        HookEvent::AfterBuild => after_build(context).await.map(|_| None),
    }
}

async fn before_build(
    optimizer: &BundleOptimizer,
    context: &HookContext,
    partial: Option<&PartialOptimusOptions>,
) -> Result<OptimizationStats, OptimizeError> {
    let platform = context.platform_path();
    let backup = context.backup_path();

    if tokio::fs::symlink_metadata(&backup).await.is_ok() {
        warn!("Replacing stale backup {}", backup.display());
        FileManager::remove_node(&backup).await?;
    }
    let bytes = copy_dir(&platform, &backup).await?;
    info!("Backed up {} ({})", platform.display(), FileManager::format_size(bytes));

    let mut options = partial.cloned().unwrap_or_default();
    if options.name.is_none() {
        options.name = Some(Preset::Mobile.name().to_string());
    }

    let roots = [context.web_path(), platform];
    let results = join_all(roots.iter().map(|root| optimizer.optimize(root, Some(&options)))).await;

    let mut total = OptimizationStats::new();
    for result in results {
        total.merge(&result?);
    }
    Ok(total)
}

async fn after_build(context: &HookContext) -> Result<(), OptimizeError> {
    let platform = context.platform_path();
    let backup = context.backup_path();

    if let Err(e) = tokio::fs::metadata(&backup).await {
        return Err(OptimizeError::io("restore from", &backup, e));
    }

    FileManager::remove_node(&platform).await?;
    copy_dir(&backup, &platform).await?;
    FileManager::remove_node(&backup).await?;

    info!("Restored {}", platform.display());
    Ok(())
}

async fn copy_dir(source: &Path, destination: &Path) -> Result<u64, OptimizeError> {
    let source = source.to_path_buf();
    let destination = destination.to_path_buf();

    tokio::task::spawn_blocking(move || FileManager::copy_dir(&source, &destination)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::processor::testing::FakeProcessor;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn context(build_dir: &Path, configuration: &str) -> HookContext {
        HookContext {
            build_dir: build_dir.to_path_buf(),
            platform: BuildPlatform::Android,
            configuration: configuration.to_string(),
        }
    }

    fn optimizer() -> BundleOptimizer {
        BundleOptimizer::new(Config::default(), Arc::new(FakeProcessor::tagging())).unwrap()
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let www = dir.path().join("www");
        let platform = dir.path().join("platforms/android/platform_www");
        fs::create_dir_all(&www).unwrap();
        fs::create_dir_all(&platform).unwrap();
        fs::write(www.join("main.js"), "boot();").unwrap();
        fs::write(www.join("main.js.map"), "{}").unwrap();
        fs::write(platform.join("cordova.js"), "cordova();").unwrap();
        dir
    }

    #[test]
    fn test_paths() {
        let context = context(Path::new("/app"), PRODUCTION);
        assert_eq!(context.web_path(), PathBuf::from("/app/www"));
        assert_eq!(
            context.platform_path(),
            PathBuf::from("/app/platforms/android/platform_www")
        );
        assert_eq!(
            context.backup_path(),
            PathBuf::from("/app/platforms/android/platform_www_backup")
        );
        assert_eq!(BuildPlatform::from_name("ios"), Some(BuildPlatform::Ios));
        assert_eq!(BuildPlatform::from_name("windows"), None);
    }

    #[tokio::test]
    async fn test_before_build_optimizes_both_roots() {
        let dir = project();
        let context = context(dir.path(), PRODUCTION);

        let stats = assert_ok!(run_hook(&optimizer(), &context, HookEvent::BeforeBuild, None).await);

        assert_eq!(stats.map(|s| s.files_optimized), Some(2));
        assert_eq!(fs::read_to_string(dir.path().join("www/main.js")).unwrap(), "min[boot();]");
        assert!(!dir.path().join("www/main.js.map").exists());
        assert_eq!(
            fs::read_to_string(context.platform_path().join("cordova.js")).unwrap(),
            "min[cordova();]"
        );
        assert_eq!(
            fs::read_to_string(context.backup_path().join("cordova.js")).unwrap(),
            "cordova();"
        );
    }

    #[tokio::test]
    async fn test_after_build_restores_platform() {
        let dir = project();
        let context = context(dir.path(), PRODUCTION);
        let optimizer = optimizer();

        assert_ok!(run_hook(&optimizer, &context, HookEvent::BeforeBuild, None).await);
        assert_ok!(run_hook(&optimizer, &context, HookEvent::AfterBuild, None).await);

        assert_eq!(
            fs::read_to_string(context.platform_path().join("cordova.js")).unwrap(),
            "cordova();"
        );
        assert!(!context.backup_path().exists());
    }

    #[tokio::test]
    async fn test_caller_name_wins_over_mobile() {
        let dir = project();
        let context = context(dir.path(), PRODUCTION);

        let partial = PartialOptimusOptions::named("server");
        assert_ok!(run_hook(&optimizer(), &context, HookEvent::BeforeBuild, Some(&partial)).await);

        assert_eq!(fs::read_to_string(dir.path().join("www/main.js")).unwrap(), "boot();");
    }

    #[tokio::test]
    async fn test_non_production_does_nothing() {
        let dir = project();
        let context = context(dir.path(), "development");

        let stats = assert_ok!(run_hook(&optimizer(), &context, HookEvent::BeforeBuild, None).await);

        assert!(stats.is_none());
        assert!(!context.backup_path().exists());
        assert_eq!(fs::read_to_string(dir.path().join("www/main.js")).unwrap(), "boot();");
    }

    #[tokio::test]
    async fn test_after_build_without_backup_keeps_platform() {
        let dir = project();
        let context = context(dir.path(), PRODUCTION);

        let result = run_hook(&optimizer(), &context, HookEvent::AfterBuild, None).await;

        assert!(matches!(result, Err(OptimizeError::Io { .. })));
        assert!(context.platform_path().join("cordova.js").exists());
    }
}
