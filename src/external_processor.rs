//! # External Processor Module
//!
//! Questo modulo implementa `Processor` orchestrando i tool Node.js standard
//! come processi figli, senza reimplementare nessun minificatore.
//!
//! ## Tool utilizzati
//!
//! | Operazione     | Tool                    | Input        | Opzioni                       |
//! |----------------|-------------------------|--------------|-------------------------------|
//! | optimize js    | terser                  | stdin        | `--config-file <tmp>.json`    |
//! | optimize css   | csso (csso-cli)         | stdin        | flag derivati dal blob        |
//! | optimize svg   | svgo                    | stdin (`-i -`) | `--config <tmp>.mjs`        |
//! | optimize html  | html-minifier-terser    | stdin        | `--config-file <tmp>.json`    |
//! | obfuscate js   | javascript-obfuscator   | file temp    | `--config <tmp>.json`         |
//! | optimize json  | nativo (`serde_json`)   | -            | -                             |
//!
//! ## Gestione errori:
//! - Tool mancante: `OptimizeError::MissingDependency` con istruzioni `npm install`
//! - Exit code diverso da zero: errore con lo stderr del tool
//! - Output non UTF-8: errore
//!
//! ## Concorrenza:
//! - Ogni chiamata crea i propri file temporanei, nessuno stato condiviso
//! - stdin e stdout vengono gestiti in parallelo per evitare deadlock sulle pipe
//!
//! ## Esempio:
//! ```rust,ignore
//! let processor = ExternalProcessor::new();
//! let minified = processor.optimize_css(css, &options.optimize.css.options).await?;
//! ```

use crate::error::OptimizeError;
use crate::options::OptimusOptions;
use crate::processor::{obfuscation_options, Processor};
use crate::tool_resolver::{ToolPathResolver, TOOLS};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs the Node.js minifiers and obfuscator as child processes
pub struct ExternalProcessor {
    tools: HashMap<&'static str, PathBuf>,
}

impl ExternalProcessor {
    /// Resolve the tools from the process environment
    pub fn new() -> Self {
        Self::with_resolver(&ToolPathResolver::new())
    }

    pub fn with_resolver(resolver: &ToolPathResolver) -> Self {
        let tools = TOOLS
            .iter()
            .filter_map(|(tool, _)| resolver.resolve_tool(tool).map(|path| (*tool, path)))
            .collect();

        Self { tools }
    }

    fn tool(&self, name: &str) -> Result<&Path> {
        self.tools.get(name).map(PathBuf::as_path).ok_or_else(|| {
            OptimizeError::MissingDependency(format!(
                "{} (install with: {})",
                name,
                ToolPathResolver::install_instructions(name)
            ))
            .into()
        })
    }

    /// Write an option bag where a tool can read it
    fn write_config(options: &Value, suffix: &str, module: bool) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("optimus-")
            .suffix(suffix)
            .tempfile()
            .context("failed to create temporary config file")?;

        let json = serde_json::to_string(options)?;
        let content = if module {
            format!("export default {};\n", json)
        } else {
            json
        };

        std::io::Write::write_all(&mut file, content.as_bytes())
            .context("failed to write temporary config file")?;
        Ok(file)
    }

    /// Run `tool` with `args`, feeding `input` on stdin and returning stdout.
    async fn run_tool(&self, tool: &str, args: Vec<OsString>, input: Option<String>) -> Result<String> {
        let tool_path = self.tool(tool)?;
        debug!("Running {:?} {:?}", tool_path, args);

        let start_time = Instant::now();
        let mut child = Command::new(tool_path)
            .args(&args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", tool))?;

        let stdin = child.stdin.take();
        let writer = async move {
            if let (Some(mut stdin), Some(input)) = (stdin, input) {
                stdin.write_all(input.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let (written, output) = tokio::join!(writer, child.wait_with_output());
        let output = output.with_context(|| format!("failed to wait for {}", tool))?;
        let elapsed = start_time.elapsed();

        if !output.status.success() {
            anyhow::bail!(
                "{} failed ({}) after {:?}: {}",
                tool,
                output.status,
                elapsed,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        written.with_context(|| format!("failed to write input to {}", tool))?;

        debug!("{} completed successfully in {:?}", tool, elapsed);
        String::from_utf8(output.stdout).with_context(|| format!("{} produced non UTF-8 output", tool))
    }

    async fn terser(&self, content: String, options: &Value) -> Result<String> {
        let config = Self::write_config(options, ".json", false)?;
        let args = vec!["--config-file".into(), config.path().into()];
        self.run_tool("terser", args, Some(content)).await
    }

    async fn csso(&self, content: String, options: &Value) -> Result<String> {
        let args = csso_args(options).into_iter().map(OsString::from).collect();
        self.run_tool("csso", args, Some(content)).await
    }

    async fn svgo(&self, content: String, options: &Value) -> Result<String> {
        // svgo only loads JavaScript config modules
        let config = Self::write_config(options, ".mjs", true)?;
        let args = vec![
            "--config".into(),
            config.path().into(),
            "--input".into(),
            "-".into(),
            "--output".into(),
            "-".into(),
        ];
        self.run_tool("svgo", args, Some(content)).await
    }

    async fn html_minifier(&self, content: String, options: &Value) -> Result<String> {
        let config = Self::write_config(options, ".json", false)?;
        let args = vec!["--config-file".into(), config.path().into()];
        self.run_tool("html-minifier-terser", args, Some(content)).await
    }

    async fn javascript_obfuscator(&self, content: String, options: &Value, index: usize) -> Result<String> {
        let config = Self::write_config(&obfuscation_options(options, index), ".json", false)?;

        let mut input = tempfile::Builder::new()
            .prefix("optimus-")
            .suffix(".js")
            .tempfile()
            .context("failed to create temporary input file")?;
        std::io::Write::write_all(&mut input, content.as_bytes()).context("failed to write temporary input file")?;

        let output = tempfile::Builder::new()
            .prefix("optimus-")
            .suffix(".js")
            .tempfile()
            .context("failed to create temporary output file")?;

        let args = vec![
            input.path().into(),
            "--output".into(),
            output.path().into(),
            "--config".into(),
            config.path().into(),
        ];
        self.run_tool("javascript-obfuscator", args, None).await?;

        tokio::fs::read_to_string(output.path())
            .await
            .context("failed to read obfuscated output")
    }
}

impl Default for ExternalProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Map the csso option bag onto csso-cli flags.
///
/// Only the options csso-cli exposes are honoured; anything else is ignored
/// with a warning.
pub fn csso_args(options: &Value) -> Vec<String> {
    let mut args = Vec::new();
    let Some(map) = options.as_object() else {
        return args;
    };

    for (key, value) in map {
        match (key.as_str(), value) {
            ("comments", Value::Bool(false)) => args.extend(["--comments".to_string(), "none".to_string()]),
            ("comments", Value::Bool(true)) => args.extend(["--comments".to_string(), "exclamation".to_string()]),
            ("comments", Value::String(mode)) => args.extend(["--comments".to_string(), mode.clone()]),
            ("restructure", Value::Bool(false)) => args.push("--restructure-off".to_string()),
            ("restructure", Value::Bool(true)) => {}
            ("forceMediaMerge", Value::Bool(true)) => args.push("--force-media-merge".to_string()),
            ("forceMediaMerge", Value::Bool(false)) => {}
            ("debug", Value::Bool(true)) => args.push("--debug".to_string()),
            ("debug", Value::Bool(false)) => {}
            _ => warn!("csso option {} is not supported by csso-cli, ignoring", key),
        }
    }

    args
}

impl Processor for ExternalProcessor {
    fn optimize_js<'a>(&'a self, content: String, options: &'a Value) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.terser(content, options))
    }

    fn optimize_css<'a>(&'a self, content: String, options: &'a Value) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.csso(content, options))
    }

    fn optimize_svg<'a>(&'a self, content: String, options: &'a Value) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.svgo(content, options))
    }

    fn optimize_html<'a>(&'a self, content: String, options: &'a Value) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.html_minifier(content, options))
    }

    fn obfuscate_js<'a>(
        &'a self,
        content: String,
        options: &'a Value,
        index: usize,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.javascript_obfuscator(content, options, index))
    }

    fn check_dependencies(&self, options: &OptimusOptions) {
        let required = [
            (options.obfuscate.js.enabled, "javascript-obfuscator"),
            (options.optimize.js.enabled, "terser"),
            (options.optimize.css.enabled, "csso"),
            (options.optimize.svg.enabled, "svgo"),
            (options.optimize.html.enabled, "html-minifier-terser"),
        ];

        for (enabled, tool) in required {
            if !enabled {
                continue;
            }
            match self.tools.get(tool) {
                Some(path) => info!("✅ {} -> {}", tool, path.display()),
                None => warn!(
                    "❌ {} not found, matching files will fail (install with: {})",
                    tool,
                    ToolPathResolver::install_instructions(tool)
                ),
            }
        }
    }
}
