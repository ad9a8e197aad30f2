//! Asset cache
//!
//! The host's counterpart of a caching service worker. Registration starts a
//! background prefetch of the page's remote assets into a directory and
//! returns at once; nothing waits on it and failures are only logged. The
//! module loader reads the cache when a network fetch fails.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::task::JoinHandle;

use crate::runtime::TOKIO;

const MAX_NAME_LEN: usize = 200;

pub(crate) fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

pub(crate) async fn fetch_text(url: &str) -> Result<String, reqwest::Error> {
    reqwest::get(url).await?.error_for_status()?.text().await
}

#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the cached copy of `url`.
    ///
    /// Every byte outside `[A-Za-z0-9-]` is percent-encoded, so distinct URLs
    /// never share a file and no name can be `.` or `..`. Long names are split
    /// into nested directories to stay under file name limits.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let mut encoded = String::with_capacity(url.len());
        for byte in url.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                encoded.push(byte as char);
            } else {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }

        let mut path = self.dir.clone();
        let mut rest = encoded.as_str();
        while rest.len() > MAX_NAME_LEN {
            let (head, tail) = rest.split_at(MAX_NAME_LEN);
            path.push(head);
            rest = tail;
        }
        path.push(rest);
        path
    }

    pub fn store(&self, url: &str, body: &str) -> io::Result<()> {
        let path = self.path_for(url);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, body)
    }

    pub fn lookup(&self, url: &str) -> Option<String> {
        fs::read_to_string(self.path_for(url)).ok()
    }
}

/// Prefetch `assets` into `cache` in the background.
///
/// Local paths are skipped. The returned handle is only useful to tests;
/// callers normally drop it.
pub fn register_asset_cache(cache: AssetCache, assets: Vec<String>) -> JoinHandle<usize> {
    log::info!(
        "[AssetCache] Registering {} asset(s) in {}",
        assets.len(),
        cache.dir().display()
    );

    TOKIO.spawn(async move {
        let mut cached = 0;
        for url in assets.iter().filter(|a| is_remote(a)) {
            match fetch_text(url).await {
                Ok(body) => match cache.store(url, &body) {
                    Ok(()) => {
                        log::debug!("[AssetCache] Cached {} ({} bytes)", url, body.len());
                        cached += 1;
                    }
                    Err(e) => log::warn!("[AssetCache] Failed to store {}: {}", url, e),
                },
                Err(e) => log::warn!("[AssetCache] Failed to fetch {}: {}", url, e),
            }
        }
        log::info!("[AssetCache] Registration finished, {} asset(s) cached", cached);
        cached
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn remote_detection() {
        assert!(is_remote("http://localhost:5173/main.js"));
        assert!(is_remote("https://cdn.example.com/app.js"));
        assert!(!is_remote("dist/main.js"));
        assert!(!is_remote("/srv/app/main.js"));
    }

    #[test_log::test]
    fn store_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::open(dir.path().join("nested")).unwrap();

        assert_eq!(cache.lookup("http://localhost:3000/main.js"), None);
        cache
            .store("http://localhost:3000/main.js", "console.log(1);")
            .unwrap();
        assert_eq!(
            cache.lookup("http://localhost:3000/main.js").as_deref(),
            Some("console.log(1);")
        );
    }

    #[test_log::test]
    fn cache_file_names_stay_inside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::open(dir.path()).unwrap();
        let path = cache.path_for("http://evil/../../etc/passwd");
        assert_eq!(path.parent(), Some(dir.path()));

        let dots = cache.path_for("..");
        assert_eq!(dots.parent(), Some(dir.path()));
        assert_eq!(dots.file_name().and_then(|n| n.to_str()), Some("%2E%2E"));
    }

    #[test_log::test]
    fn similar_urls_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::open(dir.path()).unwrap();

        assert_ne!(cache.path_for("http://a/b_c.js"), cache.path_for("http://a/b/c.js"));
        assert_ne!(cache.path_for("http://a/b.c"), cache.path_for("http://a/b_c"));

        cache.store("http://a/b_c.js", "underscore").unwrap();
        cache.store("http://a/b/c.js", "nested").unwrap();
        assert_eq!(cache.lookup("http://a/b_c.js").as_deref(), Some("underscore"));
        assert_eq!(cache.lookup("http://a/b/c.js").as_deref(), Some("nested"));
    }

    #[test_log::test]
    fn long_urls_are_split_into_directories() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::open(dir.path()).unwrap();
        let url = format!("http://localhost:3000/{}.js", "x".repeat(500));

        let path = cache.path_for(&url);
        assert!(path.starts_with(dir.path()));
        assert!(path.components().count() > dir.path().components().count() + 1);

        cache.store(&url, "long").unwrap();
        assert_eq!(cache.lookup(&url).as_deref(), Some("long"));
    }

    #[test_log::test]
    fn registration_skips_local_and_survives_failures() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::open(dir.path()).unwrap();

        let handle = register_asset_cache(
            cache.clone(),
            vec![
                "dist/main.js".to_string(),
                "http://127.0.0.1:1/unreachable.js".to_string(),
            ],
        );
        let cached = TOKIO.block_on(handle).unwrap();

        assert_eq!(cached, 0);
        assert_eq!(cache.lookup("http://127.0.0.1:1/unreachable.js"), None);
    }
}
