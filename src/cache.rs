//! Generation cache for repeated sources within one build.
//!
//! Encoding dominates build time, and the same image is often referenced from
//! several documents. When `cacheEnabled` is set, [`ImageGenerator`](crate::imaging::ImageGenerator)
//! memoizes each request's [`DerivativeSet`] here and skips decoding and
//! encoding on a repeat.
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**: lookups combine
//!
//! - **`source_hash`**: SHA-256 of the source bytes. A changed image under
//!   the same path misses.
//! - **`params_hash`**: SHA-256 of everything that shapes the output: source
//!   location, widths, formats, encoder options, output directory, URL prefix
//!   and filename template. Any config change misses.
//!
//! A hit additionally requires every previously written file to still exist.
//! The cache lives in memory only; nothing is persisted between builds.

use crate::types::{DerivativeSet, GenerationRequest};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// SHA-256 of a byte slice, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of the output-shaping parameters of a request.
///
/// The source location is part of the key: local filenames carry the source
/// stem and remote ones an id derived from the URL, so two sources with
/// identical bytes still write different files.
pub fn hash_request_params(request: &GenerationRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"derivatives\0");
    for width in &request.widths {
        match width {
            crate::config::Width::Native => hasher.update(b"n"),
            crate::config::Width::Pixels(px) => {
                hasher.update(b"p");
                hasher.update(px.to_le_bytes());
            }
        }
    }
    hasher.update(b"\0");
    for format in &request.formats {
        hasher.update(format.as_bytes());
        hasher.update(b"\0");
    }
    // serde_json::Map is ordered, so this is stable
    hasher.update(serde_json::Value::Object(request.encoder_options.clone()).to_string());
    hasher.update(b"\0");
    hasher.update(request.output_dir.to_string_lossy().as_bytes());
    hasher.update(b"\0");
    hasher.update(request.url_prefix.as_bytes());
    hasher.update(b"\0");
    hasher.update(request.filename_format.template().as_bytes());
    hasher.update(b"\0");
    hasher.update(request.source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Combined lookup key.
pub fn cache_key(source_hash: &str, params_hash: &str) -> String {
    format!("{}:{}", source_hash, params_hash)
}

/// In-memory cache of generation results.
#[derive(Debug, Default)]
pub struct GenerationCache {
    entries: Mutex<HashMap<String, DerivativeSet>>,
    stats: Mutex<CacheStats>,
}

impl GenerationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previous result. Counts a hit or a miss.
    pub fn lookup(&self, key: &str) -> Option<DerivativeSet> {
        let found = self
            .entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
            .filter(|set| set.iter().all(|d| d.output_path.exists()));

        if let Ok(mut stats) = self.stats.lock() {
            match found {
                Some(_) => stats.hit(),
                None => stats.miss(),
            }
        }
        found
    }

    pub fn insert(&self, key: String, set: DerivativeSet) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, set);
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }
}

/// Summary of cache performance for a build run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.misses)
        }
    }
}
