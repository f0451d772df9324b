// source.rs — Where header text comes from: the host's public repository
// at a tag, or a local checkout.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub const RAW_BASE_URL: &str = "https://raw.githubusercontent.com/blender/blender";

pub enum Source {
    Remote {
        tag: String,
        client: reqwest::blocking::Client,
    },
    Local(PathBuf),
}

impl Source {
    pub fn remote(tag: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("gen-layout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Source::Remote { tag: tag.to_string(), client })
    }

    /// Read `path` (relative to the repository root).
    pub fn read(&self, path: &str) -> Result<String> {
        match self {
            Source::Remote { tag, client } => {
                let url = format!("{RAW_BASE_URL}/{tag}/{path}");
                info!(%url, "fetching header");
                client
                    .get(&url)
                    .send()
                    .and_then(|r| r.error_for_status())
                    .and_then(|r| r.text())
                    .with_context(|| format!("fetching {url}"))
            }
            Source::Local(root) => {
                let file = root.join(path);
                info!(file = %file.display(), "reading header");
                std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))
            }
        }
    }
}
