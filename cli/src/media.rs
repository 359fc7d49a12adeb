//! Backend media references.
//!
//! The backend hands out images, audio, and the story archive either as `data:` URLs
//! (`data:<mime>;base64,<payload>`) or as plain http(s) links.

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    Inline(DataUrl),
    Remote(Url),
}

impl MediaRef {
    pub fn parse(reference: &str) -> Result<Self> {
        let trimmed = reference.trim();
        if trimmed.starts_with("data:") {
            return parse_data_url(trimmed).map(Self::Inline);
        }
        let url = Url::parse(trimmed)
            .with_context(|| format!("unsupported media reference {}", preview(trimmed)))?;
        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            other => bail!("unsupported media scheme {other}"),
        }
    }
}

pub fn parse_data_url(reference: &str) -> Result<DataUrl> {
    let rest = reference.strip_prefix("data:").ok_or_else(|| anyhow!("not a data URL"))?;
    let (header, payload) =
        rest.split_once(',').ok_or_else(|| anyhow!("data URL is missing its payload"))?;
    let mut parts = header.split(';');
    let mime = parts.next().filter(|mime| !mime.is_empty()).unwrap_or("text/plain").to_string();
    let is_base64 = parts.any(|part| part.eq_ignore_ascii_case("base64"));
    if !is_base64 {
        bail!("only base64 data URLs are supported");
    }
    let bytes = STANDARD.decode(payload.trim()).context("invalid base64 payload in data URL")?;
    Ok(DataUrl { mime, bytes })
}

/// Loads the bytes behind a reference, fetching remote links with `http`.
pub async fn load_bytes(http: &reqwest::Client, reference: &str) -> Result<Vec<u8>> {
    match MediaRef::parse(reference)? {
        MediaRef::Inline(data) => Ok(data.bytes),
        MediaRef::Remote(url) => {
            let response = http
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("failed to fetch {url}"))?;
            if !response.status().is_success() {
                bail!("fetching {url} returned status {}", response.status());
            }
            let bytes = response.bytes().await.with_context(|| format!("failed to read {url}"))?;
            Ok(bytes.to_vec())
        }
    }
}

fn preview(reference: &str) -> String {
    let head: String = reference.chars().take(32).collect();
    if head.len() < reference.len() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base64_data_url() {
        let data = parse_data_url("data:audio/mpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(data.mime, "audio/mpeg");
        assert_eq!(data.bytes, b"hello");
    }

    #[test]
    fn defaults_mime_when_absent() {
        let data = parse_data_url("data:;base64,aGk=").unwrap();
        assert_eq!(data.mime, "text/plain");
        assert_eq!(data.bytes, b"hi");
    }

    #[test]
    fn rejects_non_base64_and_broken_payloads() {
        assert!(parse_data_url("data:text/plain,hello").is_err());
        assert!(parse_data_url("data:audio/mpeg;base64").is_err());
        assert!(parse_data_url("data:audio/mpeg;base64,@@@").is_err());
    }

    #[test]
    fn classifies_references() {
        assert!(matches!(
            MediaRef::parse("data:image/png;base64,AA==").unwrap(),
            MediaRef::Inline(_)
        ));
        assert!(matches!(
            MediaRef::parse("https://cdn.example.test/scene1.mp3").unwrap(),
            MediaRef::Remote(_)
        ));
        assert!(MediaRef::parse("ftp://example.test/file").is_err());
        assert!(MediaRef::parse("img2").is_err());
    }

    #[tokio::test]
    async fn load_bytes_decodes_inline_data() {
        let http = reqwest::Client::new();
        let bytes = load_bytes(&http, "data:application/zip;base64,UEsFBg==").await.unwrap();
        assert_eq!(bytes, vec![0x50, 0x4b, 0x05, 0x06]);
    }
}
