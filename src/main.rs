//! # Optimus - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento delle opzioni (preset da flag o file di configurazione)
//! - Avvio dell'optimizer su tutte le root in parallelo, o del build hook
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (root, preset, file di configurazione, workers)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` se presente)
//! 3. Risolve le opzioni: `--name` vince sul file di configurazione
//! 4. Elabora ogni root in parallelo, riportando ogni fallimento
//! 5. Termina con exit code diverso da zero se almeno una root è fallita
//!
//! ## Esempio di utilizzo:
//! ```bash
//! optimus www platforms/android/platform_www --name mobile --verbose
//! optimus hook before-build --build-dir . --platform android --build-configuration production
//! optimus --check-tools
//! ```

use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::{Args as ClapArgs, Parser, Subcommand};
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use optimus::config::{discover_partial_options, Config, DEFAULT_CONFIG_FILE};
use optimus::hook::{self, BuildPlatform, HookContext, HookEvent};
use optimus::json_output::JsonMessage;
use optimus::progress::ProgressManager;
use optimus::tool_resolver::ToolPathResolver;
use optimus::{resolve, BundleOptimizer, ExternalProcessor, PartialOptimusOptions, Preset};

#[derive(Parser)]
#[command(name = "optimus", version)]
#[command(about = "Minify, obfuscate and strip web and mobile build output in place")]
struct Args {
    /// Directories to optimize
    paths: Vec<PathBuf>,

    /// The configuration file to use
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    configuration: PathBuf,

    /// Built-in preset to use, ignoring the configuration file
    #[arg(short, long, global = true, value_parser = PossibleValuesParser::new(Preset::ALL.map(Preset::name)))]
    name: Option<String>,

    /// Number of parallel workers
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Process files in name order, for reproducible obfuscation
    #[arg(long, global = true)]
    sorted: bool,

    /// Emit JSON events on stdout instead of progress spinners
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Report which Node.js tools were found and exit
    #[arg(long)]
    check_tools: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run as an Ionic/Cordova build hook
    Hook(HookArgs),
}

#[derive(ClapArgs)]
struct HookArgs {
    #[arg(value_enum)]
    event: HookEvent,

    /// Project directory (defaults to IONIC_CLI_HOOK_CTX_BUILD_DIR)
    #[arg(long)]
    build_dir: Option<PathBuf>,

    /// Target platform (defaults to IONIC_CLI_HOOK_CTX_BUILD_PLATFORM)
    #[arg(long, value_enum)]
    platform: Option<BuildPlatform>,

    /// Build configuration (defaults to IONIC_CLI_HOOK_CTX_BUILD_CONFIGURATION)
    #[arg(long)]
    build_configuration: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if args.check_tools {
        println!("{}", ToolPathResolver::new().get_tools_report());
        return Ok(());
    }

    let mut config = Config::default();
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.sorted = args.sorted;

    let partial = match &args.name {
        Some(name) => Some(PartialOptimusOptions::named(name.as_str())),
        None => discover_partial_options(&args.configuration).await,
    };

    let optimizer = BundleOptimizer::new(config, Arc::new(ExternalProcessor::new()))?;

    if let Some(Command::Hook(hook_args)) = &args.command {
        let context = hook_context(hook_args)?;
        if let Some(stats) = hook::run_hook(&optimizer, &context, hook_args.event, partial.as_ref()).await? {
            info!("{}", stats.format_summary());
        }
        return Ok(());
    }

    if args.paths.is_empty() {
        info!("No paths given, nothing to do");
        return Ok(());
    }

    let multi = if args.json {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::new()
    };

    let results = join_all(
        args.paths
            .iter()
            .map(|root| run_root(&optimizer, root, partial.as_ref(), &multi, args.json)),
    )
    .await;

    let failed = results.iter().filter(|succeeded| !**succeeded).count();
    if failed > 0 {
        anyhow::bail!("{} of {} paths failed", failed, results.len());
    }

    Ok(())
}

/// Optimize one root, reporting the outcome. Returns whether it succeeded.
async fn run_root(
    optimizer: &BundleOptimizer,
    root: &Path,
    partial: Option<&PartialOptimusOptions>,
    multi: &MultiProgress,
    json: bool,
) -> bool {
    let start_time = Instant::now();
    let options = resolve(partial, None);

    if json {
        JsonMessage::start(root.to_path_buf(), options.name.as_str()).emit();
    }

    let progress = if json {
        ProgressManager::hidden()
    } else {
        ProgressManager::spinner_in(multi, &root.display().to_string())
    };

    match optimizer.run_with_progress(root, options, progress).await {
        Ok(stats) => {
            if json {
                JsonMessage::complete(root.to_path_buf(), stats, start_time.elapsed().as_secs_f64()).emit();
            }
            true
        }
        Err(e) => {
            error!("❌ {}: {}", root.display(), e);
            if json {
                JsonMessage::error(root.to_path_buf(), &e).emit();
            }
            false
        }
    }
}

/// Hook context from flags, falling back to the build tool's environment
fn hook_context(args: &HookArgs) -> Result<HookContext> {
    let context = match (&args.build_dir, args.platform, &args.build_configuration) {
        (Some(build_dir), Some(platform), Some(configuration)) => HookContext {
            build_dir: build_dir.clone(),
            platform,
            configuration: configuration.clone(),
        },
        _ => {
            let mut context = HookContext::from_env()?;
            if let Some(build_dir) = &args.build_dir {
                context.build_dir = build_dir.clone();
            }
            if let Some(platform) = args.platform {
                context.platform = platform;
            }
            if let Some(configuration) = &args.build_configuration {
                context.configuration = configuration.clone();
            }
            context
        }
    };

    Ok(context)
}
