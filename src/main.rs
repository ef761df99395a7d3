mod document;
mod engine;
mod png;
mod schema;
mod translators;
mod walker;

use anyhow::{Context, Result};
use clap::Parser;
use engine::Engine;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use translators::{get_translator, TranslatorOptions};

#[derive(Parser)]
#[command(author, version, about = "Translate the text inside node-editor workflow files", long_about = None)]
struct Cli {
    /// Workflow to translate: a .json file or a .png with an embedded workflow
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Where to write the translated JSON [default: <input stem>.<target>.json]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Source language code, or "auto" to detect
    #[arg(short, long, default_value = schema::AUTO_DETECT)]
    source: String,

    /// Target language code
    #[arg(short, long, default_value = "en")]
    target: String,

    /// Skip the deep text scan (group/node titles, notes, prompts, widget fields)
    #[arg(long)]
    no_deep_scan: bool,

    /// Translation backend: google, openai or glossary [env: TRANSLATOR_BACKEND]
    #[arg(short, long)]
    backend: Option<String>,

    /// JSON object of "source text": "translation" pairs for the glossary backend
    #[arg(long, value_name = "FILE")]
    glossary: Option<PathBuf>,

    /// Model name for the openai backend [env: TRANSLATOR_MODEL]
    #[arg(long)]
    model: Option<String>,

    /// HTTP timeout per translation request [env: TRANSLATOR_TIMEOUT_SECS]
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
}

fn check_languages(source: &str, target: &str) -> Result<()> {
    if target == schema::AUTO_DETECT {
        anyhow::bail!("Target language cannot be '{}'", schema::AUTO_DETECT);
    }
    for code in [source, target] {
        if !schema::is_known_language(code) {
            log::warn!(
                "Language code '{}' is not one of {}; passing it through",
                code,
                schema::LANGUAGES.join(", ")
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    env_logger::init();
    let cli = Cli::parse();

    check_languages(&cli.source, &cli.target)?;

    let backend = cli
        .backend
        .clone()
        .or_else(|| std::env::var("TRANSLATOR_BACKEND").ok())
        .unwrap_or_else(|| "google".to_string());

    println!("🚀 Loading workflow from: {:?}", cli.input);
    let mut workflow = document::load(&cli.input).await?;
    let output = document::output_path(&cli.input, cli.output.as_deref(), &cli.target);

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("⏹  Interrupt received, stopping after the current pass");
                interrupted.store(true, Ordering::SeqCst);
            }
        });
    }

    let options = TranslatorOptions {
        glossary: cli.glossary.clone(),
        model: cli.model.clone(),
        timeout: cli.timeout.map(Duration::from_secs),
    };
    let (source, target, deep_scan) = (cli.source.clone(), cli.target.clone(), !cli.no_deep_scan);

    println!("🌐 Translating {} -> {} with the {} backend", source, target, backend);
    if deep_scan {
        println!("🔍 Deep text scan enabled");
    }

    // Blocking HTTP clients must live off the async runtime.
    let (workflow, summary) = tokio::task::spawn_blocking(move || {
        let translator = get_translator(&backend, &options)?;
        let engine = Engine::new(translator, source, target, deep_scan);
        let summary = engine.run(&mut workflow, &interrupted, &mut |translated| {
            println!("{}", translated);
        });
        Ok::<_, anyhow::Error>((workflow, summary))
    })
    .await
    .context("Translation task failed")??;

    if summary.interrupted {
        anyhow::bail!("Interrupted; no output was written");
    }

    document::save(&output, &workflow).await?;

    println!();
    println!("✅ Translated {} strings", summary.total());
    println!("💾 Saved to: {:?}", output);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_checks() {
        assert!(check_languages("auto", "en").is_ok());
        assert!(check_languages("fr", "xx-YY").is_ok());
        assert!(check_languages("fr", "auto").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["workflow-translator", "--input", "flow.json"]);
        assert_eq!(cli.source, "auto");
        assert_eq!(cli.target, "en");
        assert!(!cli.no_deep_scan);
        assert!(cli.backend.is_none());
    }
}
