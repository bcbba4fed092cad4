use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Error;

pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const QUERIES_DIR: &str = "queries";
const SUBTITLES_DIR: &str = "subtitles";

/// Disk cache for search responses and downloaded subtitle payloads.
///
/// Layout: `<root>/queries/<query hash>` holds a JSON response and
/// `<root>/subtitles/<subtitle id>` the decompressed subtitle bytes. Entries
/// expire by modification time; every read or write first sweeps out any
/// file under the root older than the TTL, so the root must be dedicated to
/// the cache. Failures never escape: a broken cache only costs a refetch.
#[derive(Debug)]
pub struct ResultCache {
    root: PathBuf,
    ttl: Duration,
    // Serializes sweeps and writes against each other for one cache root.
    lock: Mutex<()>,
}

impl ResultCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_ttl(root, CACHE_TTL)
    }

    pub fn with_ttl(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        let root = root.into();
        info!("Using cache directory {}", root.display());
        Self {
            root,
            ttl,
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn read_query(&self, query_hash: &str) -> Option<Value> {
        let _guard = self.lock.lock();
        self.sweep();
        let path = self.entry_path(QUERIES_DIR, query_hash);
        let content = read_entry(&path)?;

        match serde_json::from_slice(&content) {
            Ok(response) => {
                debug!("Query cache hit for {query_hash}");
                Some(response)
            }
            Err(e) => {
                self.discard(Error::Cache {
                    path,
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    pub fn write_query(&self, query_hash: &str, response: &Value) {
        let _guard = self.lock.lock();
        self.sweep();
        match serde_json::to_vec(response) {
            Ok(content) => self.write_entry(QUERIES_DIR, query_hash, &content),
            Err(e) => warn!("Not caching query {query_hash}: {e}"),
        }
    }

    pub fn read_payload(&self, subtitle_id: &str) -> Option<Vec<u8>> {
        let _guard = self.lock.lock();
        self.sweep();
        let content = read_entry(&self.entry_path(SUBTITLES_DIR, subtitle_id))?;
        debug!("Subtitle cache hit for {subtitle_id}");
        Some(content)
    }

    pub fn write_payload(&self, subtitle_id: &str, content: &[u8]) {
        let _guard = self.lock.lock();
        self.sweep();
        self.write_entry(SUBTITLES_DIR, subtitle_id, content);
    }

    /// Drop a cached query whose content turned out to be unusable.
    pub fn invalidate_query(&self, query_hash: &str) {
        let _guard = self.lock.lock();
        let path = self.entry_path(QUERIES_DIR, query_hash);
        self.discard(Error::Cache {
            path,
            reason: "response could not be parsed into results".to_string(),
        });
    }

    /// Delete every file under the root older than the TTL.
    ///
    /// The root is owned by the cache, so this walks all of it, not just the
    /// `queries` and `subtitles` directories.
    pub fn sweep(&self) {
        self.sweep_dir(&self.root, SystemTime::now());
    }

    fn sweep_dir(&self, dir: &Path, now: SystemTime) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                warn!("Failed to scan cache directory {}: {e}", dir.display());
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_dir() {
                self.sweep_dir(&path, now);
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age > self.ttl {
                info!("Deleting expired cache entry {}", path.display());
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Failed to delete {}: {e}", path.display());
                }
            }
        }
    }

    fn entry_path(&self, dir: &str, key: &str) -> PathBuf {
        self.root.join(dir).join(sanitize_key(key))
    }

    fn write_entry(&self, dir: &str, key: &str, content: &[u8]) {
        let path = self.entry_path(dir, key);
        let result = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(&path, content));
        if let Err(e) = result {
            warn!("Failed to write cache entry {}: {e}", path.display());
        }
    }

    fn discard(&self, error: Error) {
        warn!("{error}; discarding it");
        if let Error::Cache { path, .. } = error {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to delete {}: {e}", path.display());
                }
            }
        }
    }
}

fn read_entry(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Failed to read cache entry {}: {e}", path.display());
            None
        }
    }
}

/// Keys come from the network; keep them to a single path component.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
