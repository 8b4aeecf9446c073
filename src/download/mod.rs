// src/download/mod.rs

//! Installer downloads and the installer file cache
//!
//! This module provides functionality for:
//! - Fetching installer files with a one-shot user agent retry
//! - Expanding archive installers to reach nested installers
//! - Hashing installer files
//! - Tracking downloaded files per run (`InstallerCache`)

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Source of installer files
pub trait InstallerFetcher {
    /// Download `url` with the given user agent and return the local path
    fn fetch(&self, url: &str, user_agent: &str) -> Result<PathBuf>;

    /// Expand an archive installer and return the extraction directory
    fn expand_archive(&self, path: &Path) -> Result<PathBuf>;
}

/// Fetch with the primary user agent, retrying once with the fallback
pub fn fetch_with_fallback(fetcher: &dyn InstallerFetcher, url: &str, config: &FetchConfig) -> Result<PathBuf> {
    match fetcher.fetch(url, &config.primary_user_agent) {
        Ok(path) => Ok(path),
        Err(e) => {
            warn!("Download of {} failed ({}), retrying with fallback user agent", url, e);
            fetcher.fetch(url, &config.fallback_user_agent)
        }
    }
}

/// Uppercase hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode_upper(hasher.finalize()))
}

/// Extract a zip archive into `dest_dir`
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir)?;

    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        // Reject entries escaping the destination (Zip Slip)
        let relative = entry.enclosed_name().ok_or_else(|| {
            Error::ParseError(format!("Invalid path in archive: {}", entry.name()))
        })?;
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
    }

    debug!("Extracted {} entries from {}", archive.len(), archive_path.display());
    Ok(())
}

/// HTTP fetcher writing into a private temporary directory
///
/// Everything it downloads or extracts is removed when it is dropped.
pub struct HttpFetcher {
    client: Client,
    root: TempDir,
    counter: AtomicUsize,
}

impl HttpFetcher {
    /// Create a new fetcher
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {}", e)))?;

        let root = match &config.download_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                tempfile::Builder::new().prefix("manifold-").tempdir_in(dir)?
            }
            None => tempfile::Builder::new().prefix("manifold-").tempdir()?,
        };

        Ok(Self {
            client,
            root,
            counter: AtomicUsize::new(0),
        })
    }

    /// A fresh directory under the fetcher's root
    fn next_dir(&self) -> Result<PathBuf> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let dir = self.root.path().join(n.to_string());
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// File name for a downloaded URL, ignoring query and fragment
fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("installer")
        .replace("%20", " ")
}

impl InstallerFetcher for HttpFetcher {
    fn fetch(&self, url: &str, user_agent: &str) -> Result<PathBuf> {
        info!("Downloading {}", url);

        let mut response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let dest_path = self.next_dir()?.join(file_name_from_url(url));
        let mut file = File::create(&dest_path)?;
        io::copy(&mut response, &mut file)
            .map_err(|e| Error::DownloadError(format!("Failed to write downloaded data: {}", e)))?;

        debug!("Downloaded {} to {}", url, dest_path.display());
        Ok(dest_path)
    }

    fn expand_archive(&self, path: &Path) -> Result<PathBuf> {
        let dest = self.next_dir()?;
        extract_zip(path, &dest)?;
        Ok(dest)
    }
}

/// URL to local file map for installer downloads
///
/// The updater keeps one per run and releases the entries it added; a
/// caller may keep a longer-lived one to share downloads across runs.
#[derive(Debug, Default, Clone)]
pub struct InstallerCache {
    entries: HashMap<String, PathBuf>,
}

impl InstallerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&Path> {
        self.entries.get(url).map(PathBuf::as_path)
    }

    pub fn insert(&mut self, url: impl Into<String>, path: PathBuf) {
        self.entries.insert(url.into(), path);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget an entry and delete its file
    pub fn release(&mut self, url: &str) {
        if let Some(path) = self.entries.remove(url) {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove cached installer {}: {}", path.display(), e);
                }
            }
        }
    }
}
