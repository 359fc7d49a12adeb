use crate::media;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

const ARCHIVE_STEM: &str = "story_files";
const ARCHIVE_EXTENSION: &str = "zip";

/// Saves the story archive somewhere the user can reach it.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn save(&self, reference: &str) -> Result<PathBuf>;
}

pub struct DirectorySink {
    http: reqwest::Client,
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(http: reqwest::Client, dir: PathBuf) -> Self {
        Self { http, dir }
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn save(&self, reference: &str) -> Result<PathBuf> {
        let bytes = media::load_bytes(&self.http, reference).await?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create download dir {}", self.dir.display()))?;
        let target = available_path(&self.dir);
        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("failed to write archive to {}", target.display()))?;
        info!(path = %target.display(), bytes = bytes.len(), "story archive saved");
        Ok(target)
    }
}

fn available_path(dir: &Path) -> PathBuf {
    let first = dir.join(format!("{ARCHIVE_STEM}.{ARCHIVE_EXTENSION}"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{ARCHIVE_STEM}-{n}.{ARCHIVE_EXTENSION}")))
        .find(|path| !path.exists())
        .unwrap_or(first)
}
