use crate::png;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Loads a workflow from a `.json` file or from the metadata of a `.png` image.
pub async fn load(path: &Path) -> Result<Value> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Could not read file `{:?}`", path))?;
            serde_json::from_str(&content).context("Failed to parse workflow JSON")
        }
        Some("png") => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Could not read file `{:?}`", path))?;
            let (workflow, key) = png::extract_workflow(&bytes)?;
            log::info!("Found embedded workflow under PNG key '{}'", key);
            Ok(workflow)
        }
        _ => anyhow::bail!("Unsupported file type: {:?} (expected .json or .png)", path),
    }
}

/// Writes pretty-printed JSON with non-ASCII text left unescaped.
pub async fn save(path: &Path, document: &Value) -> Result<()> {
    let mut content = serde_json::to_string_pretty(document).context("Failed to serialize workflow")?;
    content.push('\n');

    tokio::fs::write(path, content.as_bytes())
        .await
        .with_context(|| format!("Failed to write file: {:?}", path))
}

/// Resolves where the translated workflow goes. An explicit path gets `.json`
/// appended when missing; otherwise `<stem>.<target>.json` next to the input.
pub fn output_path(input: &Path, output: Option<&Path>, target: &str) -> PathBuf {
    match output {
        Some(path) => {
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
            if is_json {
                path.to_path_buf()
            } else {
                let mut name = path.as_os_str().to_owned();
                name.push(".json");
                PathBuf::from(name)
            }
        }
        None => {
            let stem = input
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("workflow");
            input.with_file_name(format!("{}.{}.json", stem, target))
        }
    }
}
