//! Built-in option presets.

use super::{CategoryOptions, ObfuscateOptions, OptimizeOptions, OptimusOptions};
use serde_json::json;
use std::fmt;
use std::sync::OnceLock;

/// Artifacts of a TypeScript build that never belong in a packaged app
const MOBILE_REMOVE: &[&str] = &["*.map", "*.d.ts", "*.tsbuildinfo"];

/// Development-only files and directories stripped from a deployed server bundle
const SERVER_REMOVE: &[&str] = &[
    "*.coffee",
    "*.jst",
    "*.markdown",
    "*.md",
    "*.mkd",
    "*.swp",
    "*.tgz",
    "*.ts",
    "*.tsbuildinfo",
    ".*ignore",
    ".DS_Store",
    ".appveyor.yml",
    ".babelrc",
    ".circleci",
    ".coveralls.yml",
    ".documentup.json",
    ".editorconfig",
    ".eslintignore",
    ".eslintrc",
    ".eslintrc.js",
    ".eslintrc.json",
    ".eslintrc.yml",
    ".flowconfig",
    ".gitattributes",
    ".github",
    ".gitlab-ci.yml",
    ".htmllintrc",
    ".idea",
    ".jshintrc",
    ".lint",
    ".npmignore",
    ".npmrc",
    ".nyc_output",
    ".prettierrc",
    ".prettierrc.js",
    ".prettierrc.json",
    ".prettierrc.toml",
    ".prettierrc.yml",
    ".stylelintrc",
    ".stylelintrc.js",
    ".stylelintrc.json",
    ".stylelintrc.yaml",
    ".stylelintrc.yml",
    ".tern-project",
    ".travis.yml",
    ".vscode",
    ".yarn-integrity",
    ".yarn-metadata.json",
    ".yarnclean",
    ".yo-rc.json",
    "AUTHORS",
    "CHANGES",
    "CONTRIBUTORS",
    "Gruntfile.js",
    "Gulpfile.js",
    "Jenkinsfile",
    "LICENCE",
    "LICENCE-MIT",
    "LICENCE.BSD",
    "LICENCE.txt",
    "LICENSE",
    "LICENSE-MIT",
    "LICENSE.BSD",
    "LICENSE.txt",
    "Makefile",
    "__tests__",
    "_config.yml",
    "appveyor.yml",
    "assets",
    "changelog",
    "circle.yml",
    "codeship-services.yml",
    "codeship-steps.yml",
    "coverage",
    "doc",
    "docs",
    "eslint",
    "example",
    "examples",
    "gulpfile.js",
    "htmllint.js",
    "images",
    "jest.config.js",
    "karma.conf.js",
    "licence",
    "license",
    "powered-test",
    "prettier.config.js",
    "stylelint.config.js",
    "test",
    "tests",
    "tsconfig.json",
    "tslint.json",
    "wallaby.conf.js",
    "wallaby.js",
    "website",
    "wercker.yml",
];

/// A named, fully populated set of options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preset {
    /// Aggressive minification of a hybrid mobile app bundle
    Mobile,
    /// Payload trimming of a deployed server bundle, no code transformation
    #[default]
    Server,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::Mobile, Preset::Server];

    pub fn name(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Server => "server",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.name() == name)
    }

    pub fn options(self) -> &'static OptimusOptions {
        static MOBILE: OnceLock<OptimusOptions> = OnceLock::new();
        static SERVER: OnceLock<OptimusOptions> = OnceLock::new();

        match self {
            Self::Mobile => MOBILE.get_or_init(mobile),
            Self::Server => SERVER.get_or_init(server),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|pattern| pattern.to_string()).collect()
}

fn mobile() -> OptimusOptions {
    OptimusOptions {
        name: Preset::Mobile.name().to_string(),
        remove: patterns(MOBILE_REMOVE),
        optimize: OptimizeOptions {
            js: CategoryOptions {
                enabled: true,
                options: json!({
                    "format": { "comments": false },
                    "nameCache": {},
                }),
            },
            css: CategoryOptions {
                enabled: true,
                options: json!({
                    "comments": false,
                    "restructure": false,
                }),
            },
            svg: CategoryOptions {
                enabled: true,
                options: json!({
                    "multipass": true,
                    "plugins": [
                        {
                            "name": "preset-default",
                            "params": {
                                "overrides": {
                                    "cleanupAttrs": false,
                                    "cleanupEnableBackground": false,
                                    "cleanupIds": false,
                                    "cleanupNumericValues": false,
                                    "convertColors": false,
                                    "convertEllipseToCircle": false,
                                    "convertPathData": false,
                                    "convertShapeToPath": false,
                                    "mergePaths": false,
                                    "removeTitle": false,
                                    "removeUnknownsAndDefaults": false,
                                    "removeUselessStrokeAndFill": false,
                                    "removeViewBox": false,
                                    "removeXMLProcInst": false,
                                },
                            },
                        },
                    ],
                }),
            },
            html: CategoryOptions {
                enabled: true,
                options: json!({
                    "collapseWhitespace": true,
                    "removeComments": true,
                }),
            },
        },
        obfuscate: ObfuscateOptions {
            js: CategoryOptions {
                enabled: false,
                options: json!({ "optionsPreset": "default" }),
            },
        },
    }
}

fn server() -> OptimusOptions {
    OptimusOptions {
        name: Preset::Server.name().to_string(),
        remove: patterns(SERVER_REMOVE),
        optimize: OptimizeOptions {
            js: CategoryOptions::disabled(),
            css: CategoryOptions::disabled(),
            svg: CategoryOptions::disabled(),
            html: CategoryOptions::disabled(),
        },
        obfuscate: ObfuscateOptions {
            js: CategoryOptions::disabled(),
        },
    }
}
