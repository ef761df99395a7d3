use crate::translators::Translator;
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// The web endpoint refuses longer inputs.
const MAX_CHARS: usize = 5000;

/// Google's public web translation endpoint (no API key).
pub struct GoogleTranslator {
    client: reqwest::blocking::Client,
    url: String,
}

impl GoogleTranslator {
    pub fn new(timeout: Duration) -> Result<Self> {
        let url = std::env::var("GOOGLE_TRANSLATE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, url })
    }
}

impl Translator for GoogleTranslator {
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        let chars = text.chars().count();
        if chars > MAX_CHARS {
            anyhow::bail!("Text of {} characters exceeds the {} character limit", chars, MAX_CHARS);
        }

        log::debug!("Google translate {} -> {}: {}", source, target, text);

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .context("Failed to call translation endpoint")?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            anyhow::bail!("Translation endpoint error ({}): {}", status, body);
        }

        let json: Value = serde_json::from_str(&body).context("Failed to parse translation response")?;
        parse_response(&json)
    }
}

/// The response is `[[["<translated>", "<source>", ...], ...], ...]`, one inner
/// entry per sentence.
fn parse_response(json: &Value) -> Result<String> {
    let segments = json
        .get(0)
        .and_then(|v| v.as_array())
        .context("Unexpected translation response shape")?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|v| v.as_str()))
        .collect();

    if translated.is_empty() {
        anyhow::bail!("Translation response contained no text");
    }
    Ok(translated)
}
