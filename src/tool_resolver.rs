//! # Tool Path Resolver
//!
//! This module handles finding the Node.js command-line transformers in
//! different environments:
//! - An explicit tools directory (`OPTIMUS_TOOLS_DIR`)
//! - Project-local installs (`node_modules/.bin`, searched upwards from the working directory)
//! - Globally installed tools on the system `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Every tool the external processor may call, with the npm package providing it
pub const TOOLS: &[(&str, &str)] = &[
    ("terser", "terser"),
    ("csso", "csso-cli"),
    ("svgo", "svgo"),
    ("html-minifier-terser", "html-minifier-terser"),
    ("javascript-obfuscator", "javascript-obfuscator"),
];

/// Tool path resolver for different deployment environments
#[derive(Debug, Clone)]
pub struct ToolPathResolver {
    /// Directories searched before the system PATH, in order
    search_dirs: Vec<PathBuf>,
    /// Whether the system PATH is searched at all
    use_system_path: bool,
}

impl ToolPathResolver {
    /// Create a new path resolver from the process environment
    pub fn new() -> Self {
        let mut search_dirs = Vec::new();

        if let Ok(tools_dir) = env::var("OPTIMUS_TOOLS_DIR") {
            let tools_path = PathBuf::from(tools_dir);
            debug!("Checking OPTIMUS_TOOLS_DIR environment variable: {:?}", tools_path);
            if tools_path.exists() {
                search_dirs.push(tools_path);
            } else {
                warn!("OPTIMUS_TOOLS_DIR does not exist: {:?}", tools_path);
            }
        }

        if let Ok(current_dir) = env::current_dir() {
            search_dirs.extend(Self::detect_node_bin_dirs(&current_dir));
        }

        Self {
            search_dirs,
            use_system_path: true,
        }
    }

    /// Resolver that only looks in the given directories, never the system PATH
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            use_system_path: false,
        }
    }

    /// Every `node_modules/.bin` from `start` up to the filesystem root
    fn detect_node_bin_dirs(start: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut search_dir = Some(start);

        // Max 10 levels up
        for _ in 0..10 {
            let Some(dir) = search_dir else { break };
            let bin_path = dir.join("node_modules").join(".bin");
            if bin_path.is_dir() {
                debug!("Found node tools directory: {:?}", bin_path);
                found.push(bin_path);
            }
            search_dir = dir.parent();
        }

        found
    }

    /// File names a tool may have on this platform
    fn candidate_names(tool_name: &str) -> Vec<String> {
        if cfg!(windows) {
            vec![
                format!("{}.cmd", tool_name),
                format!("{}.exe", tool_name),
                tool_name.to_string(),
            ]
        } else {
            vec![tool_name.to_string()]
        }
    }

    fn find_in(dir: &Path, tool_name: &str) -> Option<PathBuf> {
        Self::candidate_names(tool_name)
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        debug!("Resolving tool: {}", tool_name);

        for dir in &self.search_dirs {
            if let Some(path) = Self::find_in(dir, tool_name) {
                debug!("Using local tool: {} -> {:?}", tool_name, path);
                return Some(path);
            }
        }

        if let Some(system_path) = self.find_in_system_path(tool_name) {
            debug!("Using system tool: {} -> {:?}", tool_name, system_path);
            return Some(system_path);
        }

        None
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, tool_name: &str) -> Option<PathBuf> {
        if !self.use_system_path {
            return None;
        }

        env::split_paths(&env::var_os("PATH")?).find_map(|dir| Self::find_in(&dir, tool_name))
    }

    /// npm package that provides `tool_name`
    pub fn package_for(tool_name: &str) -> &str {
        TOOLS
            .iter()
            .find(|(tool, _)| *tool == tool_name)
            .map(|(_, package)| *package)
            .unwrap_or(tool_name)
    }

    /// Get installation instructions for a tool
    pub fn install_instructions(tool_name: &str) -> String {
        format!("npm install --save-dev {}", Self::package_for(tool_name))
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self) -> String {
        let mut report = String::from("Tool Path Resolver Report\n");
        report.push_str(&format!("Search directories: {:?}\n", self.search_dirs));
        report.push_str("\nTool Availability:\n");

        for (tool, _) in TOOLS {
            match self.resolve_tool(tool) {
                Some(path) => report.push_str(&format!("  ✅ {} -> {:?}\n", tool, path)),
                None => report.push_str(&format!(
                    "  ❌ {} (install with: {})\n",
                    tool,
                    Self::install_instructions(tool)
                )),
            }
        }

        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}
