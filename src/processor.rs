//! # Processor Module
//!
//! Questo modulo definisce l'interfaccia verso i transformer esterni.
//!
//! ## Responsabilità:
//! - Definisce il trait `Processor`: una funzione `(contenuto, opzioni) -> contenuto`
//!   per ogni categoria (js, json, css, svg, html) più l'offuscamento js
//! - Fornisce la minificazione JSON nativa (ri-serializzazione senza perdita)
//! - Deriva le opzioni di offuscamento per-file dall'indice del file
//!
//! ## Contratto:
//! - Ogni chiamata è indipendente: nessuno stato condiviso tra chiamate concorrenti
//! - Il contenuto è una stringa opaca, mai interpretata dal motore
//! - Un errore del processor fa fallire l'intera fase (fail-fast)
//!
//! ## Implementazioni:
//! - `ExternalProcessor`: tool Node.js (terser, csso, svgo, ...) come processi figli
//! - Fake in-memory per i test

use crate::options::OptimusOptions;
use futures::future::BoxFuture;
use serde_json::Value;

/// Operation names used in logs and error messages
pub mod operation {
    pub const OPTIMIZE_JS: &str = "optimize js";
    pub const OPTIMIZE_JSON: &str = "optimize json";
    pub const OPTIMIZE_CSS: &str = "optimize css";
    pub const OPTIMIZE_SVG: &str = "optimize svg";
    pub const OPTIMIZE_HTML: &str = "optimize html";
    pub const OBFUSCATE_JS: &str = "obfuscate js";
}

/// Content transformers the engine delegates to.
///
/// Implementations must be callable concurrently from many tasks.
pub trait Processor: Send + Sync {
    fn optimize_js<'a>(&'a self, content: String, options: &'a Value) -> BoxFuture<'a, anyhow::Result<String>>;

    /// Re-serialize JSON without insignificant whitespace.
    fn optimize_json<'a>(&'a self, content: String) -> BoxFuture<'a, anyhow::Result<String>> {
        Box::pin(async move { minify_json(&content) })
    }

    fn optimize_css<'a>(&'a self, content: String, options: &'a Value) -> BoxFuture<'a, anyhow::Result<String>>;

    fn optimize_svg<'a>(&'a self, content: String, options: &'a Value) -> BoxFuture<'a, anyhow::Result<String>>;

    fn optimize_html<'a>(&'a self, content: String, options: &'a Value) -> BoxFuture<'a, anyhow::Result<String>>;

    /// Rename identifiers; `index` salts the generated names so two files never collide.
    fn obfuscate_js<'a>(
        &'a self,
        content: String,
        options: &'a Value,
        index: usize,
    ) -> BoxFuture<'a, anyhow::Result<String>>;

    /// Report, before a run starts, whether what `options` enables can be served.
    fn check_dependencies(&self, _options: &OptimusOptions) {}
}

/// Parse and re-serialize, keeping key order.
pub fn minify_json(content: &str) -> anyhow::Result<String> {
    let value: Value = serde_json::from_str(content)?;
    Ok(serde_json::to_string(&value)?)
}

/// Per-file obfuscator options: the caller's bag with `identifiersPrefix` set from `index`.
pub fn obfuscation_options(options: &Value, index: usize) -> Value {
    let mut merged = match options {
        Value::Object(map) => map.clone(),
        _ => Default::default(),
    };
    merged.insert("identifiersPrefix".to_string(), Value::String(format!("_{}", index)));
    Value::Object(merged)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minify_json_keeps_key_order() {
        let minified = minify_json("{\n  \"name\": \"app\",\n  \"icons\": [ 1, 2 ],\n  \"a\": null\n}\n").unwrap();
        assert_eq!(minified, r#"{"name":"app","icons":[1,2],"a":null}"#);
    }

    #[test]
    fn test_minify_json_rejects_invalid_input() {
        assert!(minify_json("{ \"name\": ").is_err());
    }

    #[test]
    fn test_obfuscation_options_sets_prefix() {
        let options = obfuscation_options(&json!({ "optionsPreset": "default" }), 3);
        assert_eq!(options, json!({ "optionsPreset": "default", "identifiersPrefix": "_3" }));

        let from_empty = obfuscation_options(&Value::Null, 0);
        assert_eq!(from_empty, json!({ "identifiersPrefix": "_0" }));
    }

    #[tokio::test]
    async fn test_default_json_method() {
        let processor = testing::FakeProcessor::tagging();
        let output = processor.optimize_json("[ 1,\n 2 ]".to_string()).await.unwrap();
        assert_eq!(output, "[1,2]");
    }
}
