use crate::schema::AUTO_DETECT;
use crate::translators::Translator;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiTranslator {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiTranslator {
    pub fn from_env(model: Option<String>, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY not found in environment")?;

        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let model = model
            .or_else(|| std::env::var("TRANSLATOR_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

fn system_prompt(source: &str, target: &str) -> String {
    let from = if source == AUTO_DETECT {
        "whatever language it is written in".to_string()
    } else {
        format!("language code '{}'", source)
    };
    format!(
        "You are a translation engine. Translate the user's text from {} into language code '{}'. \
         Reply with the translation only, without quotes or commentary.",
        from, target
    )
}

impl Translator for OpenAiTranslator {
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        log::debug!("LLM translate {} -> {} (model: {}): {}", source, target, self.model, text);

        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt(source, target) },
                { "role": "user", "content": text }
            ],
            "temperature": 0
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .context("Failed to call LLM API")?;

        let status = response.status();
        let response_text = response.text()?;
        if !status.is_success() {
            anyhow::bail!("LLM API error ({}): {}", status, response_text);
        }

        let completion: ChatCompletion =
            serde_json::from_str(&response_text).context("Failed to parse LLM response")?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .context("LLM response contained no translation")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_mentions_languages() {
        let prompt = system_prompt("fr", "en");
        assert!(prompt.contains("'fr'"));
        assert!(prompt.contains("'en'"));

        let prompt = system_prompt(AUTO_DETECT, "ja");
        assert!(!prompt.contains("'auto'"));
        assert!(prompt.contains("'ja'"));
    }

    #[test]
    fn test_completion_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":" Hello \n"}}]}"#;
        let completion: ChatCompletion = serde_json::from_str(body).unwrap();
        assert_eq!(completion.choices[0].message.content.as_deref(), Some(" Hello \n"));
    }
}
