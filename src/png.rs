use anyhow::{Context, Result};
use flate2::read::ZlibDecoder;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Metadata keys that editors use for an embedded workflow, in priority order.
pub const WORKFLOW_KEYS: &[&str] = &[
    "workflow",
    "workflow_json",
    "comfyui_workflow",
    "parameters",
    "prompt",
];

/// Reads every `tEXt`, `zTXt` and `iTXt` entry up to `IEND`. Later entries
/// with the same keyword win.
pub fn read_text_chunks(bytes: &[u8]) -> Result<HashMap<String, String>> {
    if bytes.len() < SIGNATURE.len() || bytes[..SIGNATURE.len()] != SIGNATURE {
        anyhow::bail!("Not a PNG file");
    }

    let mut text = HashMap::new();
    let mut pos = SIGNATURE.len();

    while pos + 8 <= bytes.len() {
        let length = u32::from_be_bytes(bytes[pos..pos + 4].try_into()?) as usize;
        let kind = &bytes[pos + 4..pos + 8];
        let data_start = pos + 8;
        let data_end = data_start
            .checked_add(length)
            .filter(|end| end + 4 <= bytes.len())
            .with_context(|| format!("Truncated PNG chunk at offset {}", pos))?;
        let data = &bytes[data_start..data_end];
        let crc = u32::from_be_bytes(bytes[data_end..data_end + 4].try_into()?);
        pos = data_end + 4;

        if kind == b"IEND" {
            break;
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(kind);
        hasher.update(data);
        if hasher.finalize() != crc {
            log::warn!("Skipping PNG chunk {} with bad CRC", String::from_utf8_lossy(kind));
            continue;
        }

        let entry = match kind {
            b"tEXt" => parse_text(data),
            b"zTXt" => parse_ztxt(data),
            b"iTXt" => parse_itxt(data),
            _ => continue,
        };
        match entry {
            Ok((key, value)) => {
                text.insert(key, value);
            }
            Err(e) => log::warn!("Skipping malformed {} chunk: {:#}", String::from_utf8_lossy(kind), e),
        }
    }

    Ok(text)
}

/// Finds the embedded workflow, returning it together with the metadata key it
/// was stored under.
pub fn extract_workflow(bytes: &[u8]) -> Result<(Value, String)> {
    let text = read_text_chunks(bytes)?;

    for &key in WORKFLOW_KEYS {
        let Some(raw) = text.get(key) else {
            continue;
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(workflow) => return Ok((workflow, key.to_string())),
            Err(e) => log::debug!("PNG metadata '{}' is not JSON: {}", key, e),
        }
    }

    anyhow::bail!("No embedded workflow JSON found in PNG")
}

fn split_nul(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let nul = data
        .iter()
        .position(|&b| b == 0)
        .context("Missing keyword separator")?;
    Ok((&data[..nul], &data[nul + 1..]))
}

/// Keywords and `tEXt` bodies are nominally Latin-1, but many writers emit UTF-8.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .context("Failed to inflate compressed text")?;
    Ok(out)
}

fn parse_text(data: &[u8]) -> Result<(String, String)> {
    let (key, value) = split_nul(data)?;
    Ok((decode_text(key), decode_text(value)))
}

fn parse_ztxt(data: &[u8]) -> Result<(String, String)> {
    let (key, rest) = split_nul(data)?;
    let (&method, compressed) = rest.split_first().context("Missing compression method")?;
    if method != 0 {
        anyhow::bail!("Unknown compression method {}", method);
    }
    Ok((decode_text(key), decode_text(&inflate(compressed)?)))
}

fn parse_itxt(data: &[u8]) -> Result<(String, String)> {
    let (key, rest) = split_nul(data)?;
    let [flag, method, rest @ ..] = rest else {
        anyhow::bail!("Missing compression fields");
    };
    let (_language, rest) = split_nul(rest)?;
    let (_translated_key, body) = split_nul(rest)?;

    let body = match (*flag, *method) {
        (0, _) => body.to_vec(),
        (1, 0) => inflate(body)?,
        (_, method) => anyhow::bail!("Unknown compression method {}", method),
    };
    let value = String::from_utf8(body).context("iTXt text is not UTF-8")?;
    Ok((decode_text(key), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(kind);
        hasher.update(data);

        let mut out = Vec::new();
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        out.extend_from_slice(&hasher.finalize().to_be_bytes());
        out
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn png(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        out.extend(chunk(b"IHDR", &[0, 0, 0, 1, 0, 0, 0, 1, 8, 2, 0, 0, 0]));
        for c in chunks {
            out.extend_from_slice(c);
        }
        out.extend(chunk(b"IEND", &[]));
        out
    }

    fn join(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    fn text_chunk(key: &str, value: &str) -> Vec<u8> {
        chunk(b"tEXt", &join(&[key.as_bytes(), &[0], value.as_bytes()]))
    }

    #[test]
    fn test_extracts_workflow_from_text_chunk() {
        let bytes = png(&[
            text_chunk("prompt", r#"{"1": {"class_type": "KSampler"}}"#),
            text_chunk("workflow", r#"{"nodes": [{"type": "Note"}]}"#),
        ]);

        let (workflow, key) = extract_workflow(&bytes).unwrap();
        assert_eq!(key, "workflow");
        assert_eq!(workflow["nodes"][0]["type"], "Note");
    }

    #[test]
    fn test_skips_candidates_that_are_not_json() {
        let bytes = png(&[
            text_chunk("parameters", "masterpiece, best quality\nSteps: 20"),
            text_chunk("prompt", r#"{"3": {"inputs": {"text": "猫"}}}"#),
        ]);

        let (workflow, key) = extract_workflow(&bytes).unwrap();
        assert_eq!(key, "prompt");
        assert_eq!(workflow["3"]["inputs"]["text"], "猫");
    }

    #[test]
    fn test_reads_compressed_and_international_chunks() {
        let ztxt = chunk(b"zTXt", &join(&[b"workflow_json", &[0, 0], &deflate(b"{\"a\": 1}")]));
        let itxt = chunk(
            b"iTXt",
            &join(&[
                b"comfyui_workflow",
                &[0, 1, 0],
                b"ja\0",
                b"\0",
                &deflate("{\"title\": \"猫\"}".as_bytes()),
            ]),
        );
        let text = read_text_chunks(&png(&[ztxt, itxt])).unwrap();

        assert_eq!(text["workflow_json"], "{\"a\": 1}");
        assert_eq!(text["comfyui_workflow"], "{\"title\": \"猫\"}");

        let (workflow, key) = extract_workflow(&png(&[chunk(
            b"iTXt",
            &join(&[b"workflow", &[0, 0, 0], b"\0\0", "{\"t\": \"é\"}".as_bytes()]),
        )]))
        .unwrap();
        assert_eq!(key, "workflow");
        assert_eq!(workflow["t"], "é");
    }

    #[test]
    fn test_latin1_text_fallback() {
        let bytes = png(&[chunk(b"tEXt", &join(&[b"Comment", &[0], &[0x43, 0x61, 0x66, 0xe9]]))]);
        let text = read_text_chunks(&bytes).unwrap();
        assert_eq!(text["Comment"], "Café");
    }

    #[test]
    fn test_bad_crc_chunk_is_skipped() {
        let mut bad = text_chunk("workflow", "{}");
        let last = bad.len() - 1;
        bad[last] ^= 0xff;
        let bytes = png(&[bad, text_chunk("prompt", "{\"ok\": true}")]);

        let (workflow, key) = extract_workflow(&bytes).unwrap();
        assert_eq!(key, "prompt");
        assert_eq!(workflow["ok"], true);
    }

    #[test]
    fn test_errors() {
        assert!(read_text_chunks(b"GIF89a").is_err());

        let err = extract_workflow(&png(&[text_chunk("Software", "paint")])).unwrap_err();
        assert!(err.to_string().contains("No embedded workflow"));

        let mut truncated = png(&[text_chunk("workflow", "{}")]);
        truncated.truncate(30);
        assert!(read_text_chunks(&truncated).is_err());
    }
}
