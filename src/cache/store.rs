//! Disk-backed store for the last fetched weather document
//!
//! The store keeps exactly one artifact: the raw bytes of the last successful
//! fetch, prefixed by a header line holding the time it was stored. Each write
//! goes to its own temp file in the same directory, which is then renamed over
//! the artifact, so readers only ever see a complete payload even when several
//! processes share the cache directory.

use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::clock::{Clock, SystemClock};

/// File name of the persisted artifact
pub const ARTIFACT_FILE_NAME: &str = "weather_data.json";

/// Errors raised by the artifact store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the artifact file failed
    #[error("Cache I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The artifact file exists but its header cannot be understood
    #[error("Corrupt cache file {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// A cached payload together with the time it was stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Raw bytes of the remote document
    pub payload: Vec<u8>,
    /// When the payload was written to the store
    pub stored_at: DateTime<Utc>,
}

impl Artifact {
    /// Age of the artifact at `now`
    ///
    /// A `stored_at` in the future counts as zero age.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        age_between(self.stored_at, now)
    }

    /// Whether the artifact is still usable at `now` for the given window
    pub fn is_fresh_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age_at(now) <= window
    }
}

fn age_between(stored_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - stored_at).to_std().unwrap_or(Duration::ZERO)
}

/// Reads and writes the single cached artifact
///
/// Uses `~/.cache/weatherpoll/` on Linux by default (or the platform's
/// equivalent), overridable with [`ArtifactStore::with_dir`].
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Directory holding the artifact file
    dir: PathBuf,
    /// Time source used to stamp writes and compute ages
    clock: Arc<dyn Clock>,
}

impl ArtifactStore {
    /// Creates a store in the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "weatherpoll")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a store rooted at a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The clock this store stamps artifacts with
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Path of the artifact file
    pub fn path(&self) -> PathBuf {
        self.dir.join(ARTIFACT_FILE_NAME)
    }

    /// Reads the persisted artifact
    ///
    /// # Returns
    /// * `Ok(Some(Artifact))` if an artifact is stored
    /// * `Ok(None)` if nothing has been stored yet
    /// * `Err(StoreError)` if the file cannot be read or its header is invalid
    pub fn read(&self) -> Result<Option<Artifact>, StoreError> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let Some(split) = bytes.iter().position(|&b| b == b'\n') else {
            return Err(StoreError::Corrupt {
                path,
                reason: "missing header line".to_string(),
            });
        };
        let stored_at = parse_header(&bytes[..split]).map_err(|reason| StoreError::Corrupt {
            path: path.clone(),
            reason,
        })?;

        Ok(Some(Artifact {
            payload: bytes[split + 1..].to_vec(),
            stored_at,
        }))
    }

    /// Atomically replaces the artifact with `payload`, stamped with the current time
    ///
    /// Each write goes through its own uniquely named temp file in the cache
    /// directory, so concurrent writers never publish each other's partial
    /// files. On failure the previous artifact, if any, is left untouched.
    pub fn write(&self, payload: &[u8]) -> Result<Artifact, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let stored_at = self.clock.now();
        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        write_contents(temp.as_file_mut(), stored_at, payload).map_err(|source| {
            StoreError::Io {
                path: temp.path().to_path_buf(),
                source,
            }
        })?;

        // Dropping an unpersisted temp file removes it
        let path = self.path();
        temp.persist(&path).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e.error,
        })?;

        tracing::debug!(path = %path.display(), bytes = payload.len(), "stored artifact");

        Ok(Artifact {
            payload: payload.to_vec(),
            stored_at,
        })
    }

    /// Time since the artifact was stored, reading only the header line
    ///
    /// Returns `Ok(None)` if nothing has been stored.
    pub fn age(&self) -> Result<Option<Duration>, StoreError> {
        let path = self.path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let mut header = Vec::new();
        BufReader::new(file)
            .read_until(b'\n', &mut header)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        if header.pop() != Some(b'\n') {
            return Err(StoreError::Corrupt {
                path,
                reason: "missing header line".to_string(),
            });
        }

        let stored_at =
            parse_header(&header).map_err(|reason| StoreError::Corrupt { path, reason })?;
        Ok(Some(age_between(stored_at, self.clock.now())))
    }

    /// Removes the artifact
    ///
    /// Returns whether an artifact existed.
    pub fn clear(&self) -> Result<bool, StoreError> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

fn write_contents(file: &mut File, stored_at: DateTime<Utc>, payload: &[u8]) -> io::Result<()> {
    file.write_all(stored_at.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes())?;
    file.write_all(b"\n")?;
    file.write_all(payload)?;
    file.sync_all()
}

fn parse_header(header: &[u8]) -> Result<DateTime<Utc>, String> {
    let text = std::str::from_utf8(header).map_err(|e| format!("header is not UTF-8: {}", e))?;
    DateTime::parse_from_rfc3339(text.trim_end_matches('\r'))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{}': {}", text, e))
}
