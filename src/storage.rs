// Manages the documents tasks are read from and written back to.
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

pub const NOTE_EXTENSION: &str = "md";
pub const VAULT_LOCK_NAME: &str = ".nextact";

/// Identifies a document within its source: a `/`-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name without directories or the `.md` extension.
    pub fn name(&self) -> &str {
        let file = self.0.rsplit('/').next().unwrap_or(&self.0);
        match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && ext.eq_ignore_ascii_case(NOTE_EXTENSION) => {
                stem
            }
            _ => file,
        }
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where documents come from. Implementations must be safe to share between threads;
/// serializing writes to one document is the caller's concern.
pub trait DocumentSource: Send + Sync + fmt::Debug {
    fn list_documents(&self) -> Result<Vec<DocumentHandle>>;
    fn read_text(&self, handle: &DocumentHandle) -> Result<String>;
    fn write_text(&self, handle: &DocumentHandle, text: &str) -> Result<()>;
}

pub struct LocalStorage;

impl LocalStorage {
    /// Helper to get a sidecar lock file path
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive lock on the sidecar lock file of `file_path`.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {:?}", lock_path))?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }
}

/// A directory tree of Markdown notes.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(anyhow::anyhow!(
                "Vault directory '{}' does not exist",
                root.display()
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a handle to a path inside the vault, refusing anything that escapes it.
    fn resolve(&self, handle: &DocumentHandle) -> Result<PathBuf> {
        let relative = Path::new(handle.as_str());
        let safe = !handle.as_str().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(anyhow::anyhow!("Invalid document path '{}'", handle));
        }
        Ok(self.root.join(relative))
    }

    fn is_note(path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(NOTE_EXTENSION))
    }
}

impl DocumentSource for Vault {
    fn list_documents(&self) -> Result<Vec<DocumentHandle>> {
        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|e| {
            // Skip .obsidian, .git, .trash and friends
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        });

        let mut handles = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable vault entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !Self::is_note(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            handles.push(DocumentHandle::new(parts.join("/")));
        }
        handles.sort();
        Ok(handles)
    }

    fn read_text(&self, handle: &DocumentHandle) -> Result<String> {
        let path = self.resolve(handle)?;
        fs::read_to_string(&path).with_context(|| format!("Failed to read '{}'", handle))
    }

    fn write_text(&self, handle: &DocumentHandle, text: &str) -> Result<()> {
        let path = self.resolve(handle)?;
        LocalStorage::with_lock(&self.root.join(VAULT_LOCK_NAME), || {
            LocalStorage::atomic_write(&path, text)
                .with_context(|| format!("Failed to write '{}'", handle))
        })
    }
}

/// Documents held in memory. Used by tests and by embedders that own their storage.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: Mutex<BTreeMap<DocumentHandle, String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents<I, K, V>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = documents
            .into_iter()
            .map(|(k, v)| (DocumentHandle::new(k), v.into()))
            .collect();
        Self {
            documents: Mutex::new(map),
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<DocumentHandle, String>>> {
        self.documents
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory source lock poisoned"))
    }
}

impl DocumentSource for MemorySource {
    fn list_documents(&self) -> Result<Vec<DocumentHandle>> {
        Ok(self.guard()?.keys().cloned().collect())
    }

    fn read_text(&self, handle: &DocumentHandle) -> Result<String> {
        self.guard()?
            .get(handle)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No such document '{}'", handle))
    }

    fn write_text(&self, handle: &DocumentHandle, text: &str) -> Result<()> {
        self.guard()?.insert(handle.clone(), text.to_string());
        Ok(())
    }
}
