//! Fetches and unpacks released template archives from GitHub.
//!
//! Release assets are named `spectrena-template-{agent}-{script}-v{version}.zip`
//! and downloaded straight from the release download URLs, so only version
//! resolution touches the rate-limited API.

use crate::progress;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;

/// Repository the template archives are published from.
const GITHUB_REPO: &str = "spectrena/spectrena";

/// Archive size cap (100 MB, far above any real template release).
const MAX_ARCHIVE_SIZE: u64 = 100 * 1024 * 1024;

/// Download chunk size.
const CHUNK_SIZE: usize = 64 * 1024;

/// Errors from fetching or unpacking a release.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("template not found at {url}\nCheck available releases for this agent/script combination")]
    NotFound { url: String },

    #[error("GitHub API request failed: {0}")]
    Api(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("unexpected API response: {0}")]
    InvalidResponse(String),

    #[error("invalid archive: {0}")]
    Archive(String),

    #[error("archive entry escapes the extraction directory: {name}")]
    UnsafeEntry { name: String },

    #[error("io error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<zip::result::ZipError> for FetchError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, serde::Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// Client for the template release channel.
pub struct ReleaseFetcher {
    agent: ureq::Agent,
    api_base: String,
    download_base: String,
}

impl ReleaseFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            api_base: "https://api.github.com".to_string(),
            download_base: "https://github.com".to_string(),
        }
    }

    /// Custom endpoints, for testing.
    #[cfg(test)]
    fn with_bases(api_base: impl Into<String>, download_base: impl Into<String>) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            api_base: api_base.into(),
            download_base: download_base.into(),
        }
    }

    /// Resolve the version to fetch. An explicit request is taken verbatim;
    /// otherwise the latest release tag is queried, falling back to the
    /// `latest` download alias when the API is unreachable.
    pub fn resolve_version(&self, requested: Option<&str>) -> String {
        if let Some(version) = requested {
            return version.to_string();
        }
        match self.query_latest() {
            Ok(tag) => tag.trim_start_matches('v').to_string(),
            Err(e) => {
                log::warn!("Could not query latest release ({e}); using the latest alias");
                "latest".to_string()
            }
        }
    }

    fn query_latest(&self) -> Result<String> {
        let url = format!("{}/repos/{GITHUB_REPO}/releases/latest", self.api_base);

        let release: LatestRelease = self
            .agent
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "spectrena")
            .call()
            .map_err(|e| FetchError::Api(e.to_string()))?
            .body_mut()
            .read_json()
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        if release.tag_name.is_empty() {
            return Err(FetchError::InvalidResponse(
                "release has no tag name".to_string(),
            ));
        }
        Ok(release.tag_name)
    }

    /// Asset file name for an agent/script flavor.
    pub fn archive_name(version: &str, agent: &str, script: &str) -> String {
        if version == "latest" {
            format!("spectrena-template-{agent}-{script}.zip")
        } else {
            format!("spectrena-template-{agent}-{script}-v{version}.zip")
        }
    }

    /// Direct download URL for the archive. The `latest` alias avoids the
    /// API entirely; versioned assets carry their version in the name.
    pub fn archive_url(&self, version: &str, agent: &str, script: &str) -> String {
        let name = Self::archive_name(version, agent, script);
        if version == "latest" {
            format!(
                "{}/{GITHUB_REPO}/releases/latest/download/{name}",
                self.download_base
            )
        } else {
            format!(
                "{}/{GITHUB_REPO}/releases/download/v{version}/{name}",
                self.download_base
            )
        }
    }

    /// Download the archive for an agent/script flavor into memory, with a
    /// progress bar when the server reports a length.
    pub fn download(&self, version: &str, agent: &str, script: &str) -> Result<Vec<u8>> {
        let url = self.archive_url(version, agent, script);
        log::debug!("Downloading {url}");

        let mut response = self.agent.get(&url).call().map_err(|e| match e {
            ureq::Error::StatusCode(404) => FetchError::NotFound { url: url.clone() },
            ureq::Error::StatusCode(code) => {
                FetchError::Download(format!("HTTP {code} from {url}"))
            }
            other => FetchError::Download(other.to_string()),
        })?;

        let total = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let bar = match total {
            Some(len) => progress::download_bar(len, "Downloading template"),
            None => progress::download_spinner("Downloading template"),
        };

        let mut reader = response.body_mut().as_reader();
        let mut buffer = Vec::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader
                .read(&mut chunk)
                .map_err(|e| FetchError::Download(e.to_string()))?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
            bar.inc(n as u64);
            if buffer.len() as u64 > MAX_ARCHIVE_SIZE {
                bar.abandon();
                return Err(FetchError::Download(format!(
                    "archive exceeds the {MAX_ARCHIVE_SIZE} byte limit"
                )));
            }
        }
        bar.finish_and_clear();

        Ok(buffer)
    }

    /// Unpack an archive into `dest`, stripping a single shared top-level
    /// directory when the whole archive lives under one.
    pub fn extract(archive: &[u8], dest: &Path) -> Result<()> {
        let mut zip = ZipArchive::new(io::Cursor::new(archive))?;
        let prefix = common_prefix(&mut zip)?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }

            let raw_name = entry.name().to_string();
            let Some(safe) = entry.enclosed_name() else {
                return Err(FetchError::UnsafeEntry { name: raw_name });
            };
            if safe.components().next().is_none()
                || safe.components().any(|c| !matches!(c, Component::Normal(_)))
            {
                return Err(FetchError::UnsafeEntry { name: raw_name });
            }

            let rel = match &prefix {
                Some(p) => match safe.strip_prefix(p) {
                    Ok(stripped) if stripped.components().next().is_some() => {
                        stripped.to_path_buf()
                    }
                    _ => continue,
                },
                None => safe,
            };

            let out_path = dest.join(&rel);
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
            }
            let mut out =
                fs::File::create(&out_path).map_err(|e| FetchError::io(&out_path, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| FetchError::io(&out_path, e))?;
        }

        Ok(())
    }
}

impl Default for ReleaseFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// The single top-level directory shared by every archive entry, if any.
/// Archives with a root-level file (or mixed roots) get no prefix stripped.
fn common_prefix<R: io::Read + io::Seek>(
    zip: &mut ZipArchive<R>,
) -> Result<Option<PathBuf>> {
    let mut prefix: Option<PathBuf> = None;
    for i in 0..zip.len() {
        let entry = zip.by_index(i)?;
        let Some(path) = entry.enclosed_name() else {
            continue;
        };
        let mut components = path.components();
        let Some(first) = components.next() else {
            continue;
        };
        // a root-level file means there is nothing to strip
        if components.next().is_none() && !entry.is_dir() {
            return Ok(None);
        }
        let first: PathBuf = PathBuf::from(first.as_os_str());
        match &prefix {
            None => prefix = Some(first),
            Some(p) if *p == first => {}
            Some(_) => return Ok(None),
        }
    }
    Ok(prefix)
}

// ============================================================================
// Agent and script detection
// ============================================================================

/// Marker directories checked in priority order.
const AGENT_MARKERS: &[(&str, &str)] = &[
    ("claude", ".claude"),
    ("cursor", ".cursor"),
    ("windsurf", ".windsurf"),
    ("cline", ".cline"),
    ("roo-cline", ".roo-cline"),
];

/// Infer the agent and script flavor from what the project already has.
/// A marker directory with a `commands/` subdirectory wins over a bare
/// marker; defaults are `claude` and `sh`.
pub fn detect_agent_and_script(project_root: &Path) -> (String, String) {
    let mut bare_match = None;
    let mut agent = None;
    for (name, marker) in AGENT_MARKERS {
        let dir = project_root.join(marker);
        if !dir.is_dir() {
            continue;
        }
        if dir.join("commands").is_dir() {
            agent = Some(*name);
            break;
        }
        if bare_match.is_none() {
            bare_match = Some(*name);
        }
    }
    let agent = agent.or(bare_match).unwrap_or("claude").to_string();

    let script = if has_powershell_scripts(project_root) {
        "ps"
    } else {
        "sh"
    };
    (agent, script.to_string())
}

fn has_powershell_scripts(project_root: &Path) -> bool {
    let scripts = crate::project::spectrena_dir(project_root).join("scripts");
    walkdir::WalkDir::new(scripts)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .any(|e| {
            e.file_type().is_file()
                && e.path().extension().is_some_and(|ext| ext == "ps1")
        })
}

// ============================================================================
// Tests
// ============================================================================
