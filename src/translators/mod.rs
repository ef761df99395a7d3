use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

mod glossary;
mod google;
mod openai;

pub use glossary::GlossaryTranslator;
pub use google::GoogleTranslator;
pub use openai::OpenAiTranslator;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Text-to-text translation backend. Errors are treated as "keep the original"
/// by the walker, so implementations should fail rather than guess.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;
}

/// Backend settings gathered from the command line and environment.
#[derive(Debug, Clone, Default)]
pub struct TranslatorOptions {
    pub glossary: Option<PathBuf>,
    pub model: Option<String>,
    pub timeout: Option<Duration>,
}

impl TranslatorOptions {
    pub fn timeout(&self) -> Result<Duration> {
        if let Some(timeout) = self.timeout {
            return Ok(timeout);
        }
        match std::env::var("TRANSLATOR_TIMEOUT_SECS") {
            Ok(secs) => {
                let secs: u64 = secs
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid TRANSLATOR_TIMEOUT_SECS '{}'", secs))?;
                Ok(Duration::from_secs(secs))
            }
            Err(_) => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

pub fn get_translator(backend: &str, options: &TranslatorOptions) -> Result<Box<dyn Translator>> {
    match backend {
        "google" => Ok(Box::new(GoogleTranslator::new(options.timeout()?)?)),
        "openai" => Ok(Box::new(OpenAiTranslator::from_env(
            options.model.clone(),
            options.timeout()?,
        )?)),
        "glossary" => {
            let path = options
                .glossary
                .as_ref()
                .context("Glossary backend requires --glossary <FILE>")?;
            Ok(Box::new(GlossaryTranslator::load(path)?))
        }
        _ => anyhow::bail!("Unknown translation backend: {}", backend),
    }
}
