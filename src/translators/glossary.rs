use crate::translators::Translator;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Offline backend backed by a JSON object of `"source text": "translation"`.
/// Languages are ignored.
pub struct GlossaryTranslator {
    entries: HashMap<String, String>,
}

impl GlossaryTranslator {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read glossary `{:?}`", path))?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Glossary `{:?}` must be a JSON object of strings", path))?;

        log::info!("Loaded glossary with {} entries from {:?}", entries.len(), path);
        Ok(Self::new(entries))
    }
}

impl Translator for GlossaryTranslator {
    fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
        self.entries
            .get(text)
            .cloned()
            .with_context(|| format!("No glossary entry for '{}'", text))
    }
}
