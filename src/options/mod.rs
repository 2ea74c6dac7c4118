//! # Options Resolution Module
//!
//! Questo modulo definisce il modello dati delle opzioni e la loro risoluzione.
//!
//! ## Responsabilità:
//! - Definisce `OptimusOptions` (completamente risolto, immutabile)
//! - Definisce `PartialOptimusOptions` (ogni campo opzionale, arriva da CLI o file)
//! - Espone i preset built-in (`mobile`, `server`) tramite `Preset`
//! - Unisce le opzioni del chiamante con il preset campo per campo
//!
//! ## Regole di merge:
//! - Il preset è `partial.name`, altrimenti il nome esplicito, altrimenti `server`
//! - Ogni foglia dello schema (`name`, `remove`, ogni coppia `enabled`/`options`)
//!   prende il valore del chiamante se presente, altrimenti quello del preset
//! - Il blob `options` di ogni categoria è opaco: viene preso intero da una
//!   delle due parti, mai unito in profondità
//!
//! ## Esempio:
//! ```rust,ignore
//! let partial: PartialOptimusOptions = serde_json::from_str(r#"{"name": "mobile"}"#)?;
//! let options = resolve(Some(&partial), None);
//! assert!(options.optimize.js.enabled);
//! ```

mod presets;

pub use presets::Preset;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Enable flag plus the opaque option bag handed to a transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOptions {
    pub enabled: bool,
    pub options: Value,
}

impl CategoryOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            options: Value::Object(Default::default()),
        }
    }

    fn merged(partial: Option<&PartialCategoryOptions>, preset: &CategoryOptions) -> Self {
        Self {
            enabled: partial
                .and_then(|p| p.enabled)
                .unwrap_or(preset.enabled),
            options: partial
                .and_then(|p| p.options.clone())
                .unwrap_or_else(|| preset.options.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeOptions {
    pub js: CategoryOptions,
    pub css: CategoryOptions,
    pub svg: CategoryOptions,
    pub html: CategoryOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObfuscateOptions {
    pub js: CategoryOptions,
}

/// Fully resolved options for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimusOptions {
    /// Name of the preset (or caller-defined set) in effect
    pub name: String,
    /// Glob patterns of files and directories to delete
    pub remove: Vec<String>,
    pub optimize: OptimizeOptions,
    pub obfuscate: ObfuscateOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialCategoryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialOptimizeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub js: Option<PartialCategoryOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<PartialCategoryOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<PartialCategoryOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<PartialCategoryOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialObfuscateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub js: Option<PartialCategoryOptions>,
}

/// Caller overrides, as read from a configuration file or built from CLI flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialOptimusOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize: Option<PartialOptimizeOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfuscate: Option<PartialObfuscateOptions>,
}

impl PartialOptimusOptions {
    /// Overrides that only select a preset
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

impl From<CategoryOptions> for PartialCategoryOptions {
    fn from(category: CategoryOptions) -> Self {
        Self {
            enabled: Some(category.enabled),
            options: Some(category.options),
        }
    }
}

impl From<OptimusOptions> for PartialOptimusOptions {
    fn from(options: OptimusOptions) -> Self {
        let OptimusOptions {
            name,
            remove,
            optimize,
            obfuscate,
        } = options;

        Self {
            name: Some(name),
            remove: Some(remove),
            optimize: Some(PartialOptimizeOptions {
                js: Some(optimize.js.into()),
                css: Some(optimize.css.into()),
                svg: Some(optimize.svg.into()),
                html: Some(optimize.html.into()),
            }),
            obfuscate: Some(PartialObfuscateOptions {
                js: Some(obfuscate.js.into()),
            }),
        }
    }
}

/// Resolve caller overrides against a preset.
///
/// The preset is picked from `partial.name`, then `preset_name`; anything
/// unknown falls back to [`Preset::Server`]. Never fails: missing input simply
/// yields the preset.
pub fn resolve(partial: Option<&PartialOptimusOptions>, preset_name: Option<&str>) -> OptimusOptions {
    let name = partial
        .and_then(|p| p.name.as_deref())
        .or(preset_name);
    let preset = name.and_then(Preset::from_name).unwrap_or_default().options();

    let optimize = partial.and_then(|p| p.optimize.as_ref());
    let obfuscate = partial.and_then(|p| p.obfuscate.as_ref());

    OptimusOptions {
        name: partial
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| preset.name.clone()),
        remove: partial
            .and_then(|p| p.remove.clone())
            .unwrap_or_else(|| preset.remove.clone()),
        optimize: OptimizeOptions {
            js: CategoryOptions::merged(optimize.and_then(|o| o.js.as_ref()), &preset.optimize.js),
            css: CategoryOptions::merged(optimize.and_then(|o| o.css.as_ref()), &preset.optimize.css),
            svg: CategoryOptions::merged(optimize.and_then(|o| o.svg.as_ref()), &preset.optimize.svg),
            html: CategoryOptions::merged(optimize.and_then(|o| o.html.as_ref()), &preset.optimize.html),
        },
        obfuscate: ObfuscateOptions {
            js: CategoryOptions::merged(obfuscate.and_then(|o| o.js.as_ref()), &preset.obfuscate.js),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_partial_yields_preset() {
        for preset in Preset::ALL {
            let empty = PartialOptimusOptions::default();
            assert_eq!(&resolve(Some(&empty), Some(preset.name())), preset.options());
            assert_eq!(&resolve(None, Some(preset.name())), preset.options());
        }
    }

    #[test]
    fn test_unknown_or_missing_preset_falls_back_to_server() {
        assert_eq!(&resolve(None, None), Preset::Server.options());
        assert_eq!(&resolve(None, Some("desktop")), Preset::Server.options());
    }

    #[test]
    fn test_partial_name_wins_over_explicit_preset() {
        let partial = PartialOptimusOptions::named("mobile");
        let options = resolve(Some(&partial), Some("server"));
        assert_eq!(&options, Preset::Mobile.options());
    }

    #[test]
    fn test_custom_name_keeps_name_with_server_defaults() {
        let partial = PartialOptimusOptions::named("kiosk");
        let options = resolve(Some(&partial), None);

        assert_eq!(options.name, "kiosk");
        assert_eq!(options.remove, Preset::Server.options().remove);
        assert_eq!(options.optimize, Preset::Server.options().optimize);
    }

    #[test]
    fn test_single_leaf_override_is_independent() {
        let mobile = Preset::Mobile.options();
        let partial: PartialOptimusOptions = serde_json::from_value(json!({
            "name": "mobile",
            "optimize": { "css": { "enabled": false } }
        }))
        .unwrap();

        let options = resolve(Some(&partial), None);

        assert!(!options.optimize.css.enabled);
        // the opaque options bag of the same category still comes from the preset
        assert_eq!(options.optimize.css.options, mobile.optimize.css.options);
        assert_eq!(options.optimize.js, mobile.optimize.js);
        assert_eq!(options.optimize.svg, mobile.optimize.svg);
        assert_eq!(options.optimize.html, mobile.optimize.html);
        assert_eq!(options.obfuscate, mobile.obfuscate);
        assert_eq!(options.remove, mobile.remove);
    }

    #[test]
    fn test_options_blob_is_replaced_wholesale() {
        let partial: PartialOptimusOptions = serde_json::from_value(json!({
            "name": "mobile",
            "optimize": { "js": { "options": { "mangle": false } } }
        }))
        .unwrap();

        let options = resolve(Some(&partial), None);

        assert!(options.optimize.js.enabled);
        assert_eq!(options.optimize.js.options, json!({ "mangle": false }));
    }

    #[test]
    fn test_remove_override() {
        let partial = PartialOptimusOptions {
            remove: Some(vec!["*.log".to_string()]),
            ..Default::default()
        };

        let options = resolve(Some(&partial), Some("mobile"));
        assert_eq!(options.remove, vec!["*.log".to_string()]);
        assert_eq!(options.optimize, Preset::Mobile.options().optimize);
    }

    #[test]
    fn test_null_fields_count_as_absent() {
        let partial: PartialOptimusOptions = serde_json::from_value(json!({
            "name": "mobile",
            "remove": null,
            "optimize": { "svg": { "enabled": null, "options": null } }
        }))
        .unwrap();

        assert_eq!(&resolve(Some(&partial), None), Preset::Mobile.options());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let partial: PartialOptimusOptions = serde_json::from_value(json!({
            "name": "mobile",
            "remove": ["*.map"],
            "obfuscate": { "js": { "enabled": true } }
        }))
        .unwrap();
        let resolved = resolve(Some(&partial), None);

        for preset in Preset::ALL {
            let again = resolve(Some(&resolved.clone().into()), Some(preset.name()));
            assert_eq!(again, resolved);
        }
    }

    #[test]
    fn test_resolved_options_roundtrip_through_json() {
        let json = serde_json::to_value(Preset::Mobile.options()).unwrap();
        let partial: PartialOptimusOptions = serde_json::from_value(json).unwrap();
        assert_eq!(&resolve(Some(&partial), Some("server")), Preset::Mobile.options());
    }
}
