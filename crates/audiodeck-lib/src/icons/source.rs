//! Where icon bytes come from.

use std::io;
use std::path::{Path, PathBuf};

/// Reads raw icon files by name. The cache is the only caller.
pub trait IconSource: Send + Sync {
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Where `name` lives, for error messages.
    fn locate(&self, name: &str) -> PathBuf {
        PathBuf::from(name)
    }
}

/// Icons stored as files in a single directory.
#[derive(Debug, Clone)]
pub struct DirIconSource {
    dir: PathBuf,
}

impl DirIconSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirIconSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl IconSource for DirIconSource {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.locate(name))
    }

    fn locate(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

// ── Test stub ──

/// In-memory [`IconSource`] for unit and integration tests.
///
/// Counts reads per name. With `fail_on_repeat` set, a second read of the
/// same name returns an error, which proves a caller never went back to disk.
pub mod stub {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub struct MemoryIconSource {
        files: Mutex<HashMap<String, Vec<u8>>>,
        reads: Mutex<HashMap<String, usize>>,
        fail_on_repeat: AtomicBool,
    }

    impl MemoryIconSource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add or replace a file.
        pub fn insert(&self, name: &str, bytes: Vec<u8>) {
            if let Ok(mut files) = self.files.lock() {
                files.insert(name.to_string(), bytes);
            }
        }

        /// Delete a file; later reads report `NotFound`.
        pub fn remove(&self, name: &str) {
            if let Ok(mut files) = self.files.lock() {
                files.remove(name);
            }
        }

        /// Make any second read of the same name fail.
        pub fn fail_on_repeat(&self, enabled: bool) {
            self.fail_on_repeat.store(enabled, Ordering::SeqCst);
        }

        /// Number of `read` calls made for `name`, including failed ones.
        pub fn reads(&self, name: &str) -> usize {
            self.reads
                .lock()
                .map(|r| r.get(name).copied().unwrap_or(0))
                .unwrap_or(0)
        }

        /// Total `read` calls across all names.
        pub fn total_reads(&self) -> usize {
            self.reads.lock().map(|r| r.values().sum()).unwrap_or(0)
        }
    }

    impl IconSource for MemoryIconSource {
        fn read(&self, name: &str) -> io::Result<Vec<u8>> {
            let count = {
                let mut reads = self
                    .reads
                    .lock()
                    .map_err(|_| io::Error::other("read counter poisoned"))?;
                let n = reads.entry(name.to_string()).or_insert(0);
                *n += 1;
                *n
            };
            if count > 1 && self.fail_on_repeat.load(Ordering::SeqCst) {
                return Err(io::Error::other(format!("repeated read of {name}")));
            }
            let files = self
                .files
                .lock()
                .map_err(|_| io::Error::other("file table poisoned"))?;
            files
                .get(name)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
        }
    }
}
