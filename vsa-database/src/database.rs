use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::model::document::StoreDocument;

/// Conventional location of the punishment store.
pub const DEFAULT_STORE_PATH: &str = "data/punishment_records.json";

/// Indexed punishment store backed by a single JSON document.
///
/// Every mutation rewrites the whole document through a temp file in the same
/// directory followed by an atomic rename, so readers never observe a partial file.
/// The store assumes it is the only writer of `path`.
#[derive(Debug)]
pub struct PunishmentStore {
    path: PathBuf,
    document: Mutex<StoreDocument>,
}

impl PunishmentStore {
    /// Open the store at `path`, creating it when missing.
    ///
    /// An unreadable document is renamed aside and replaced by an empty one.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let document = load_document(&path)?;

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn lock(&self) -> anyhow::Result<MutexGuard<'_, StoreDocument>> {
        self.document
            .lock()
            .map_err(|_| anyhow::anyhow!("punishment store lock poisoned"))
    }

    pub(crate) fn persist(&self, document: &StoreDocument) -> anyhow::Result<()> {
        atomic_write_json(&self.path, document)
    }
}

fn load_document(path: &Path) -> anyhow::Result<StoreDocument> {
    if !path.exists() {
        let document = StoreDocument::default();
        atomic_write_json(path, &document)?;
        info!(path = %path.display(), "created empty punishment store");
        return Ok(document);
    }

    match read_document(path) {
        Ok(document) => Ok(document),
        Err(source) => {
            let preserved = preserve_corrupt_file(path);
            warn!(
                ?source,
                path = %path.display(),
                preserved = ?preserved,
                "punishment store unreadable; starting from an empty store"
            );

            let document = StoreDocument::default();
            atomic_write_json(path, &document)?;
            Ok(document)
        }
    }
}

fn read_document(path: &Path) -> anyhow::Result<StoreDocument> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read punishment store `{}`", path.display()))?;
    let document = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse punishment store `{}`", path.display()))?;
    Ok(document)
}

/// Move an unreadable store out of the way so its contents survive the reset.
fn preserve_corrupt_file(path: &Path) -> Option<PathBuf> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs());
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let target = path.with_file_name(format!("{file_name}.corrupt-{stamp}"));

    match fs::rename(path, &target) {
        Ok(()) => Some(target),
        Err(source) => {
            warn!(?source, path = %path.display(), "failed to move corrupt punishment store aside");
            None
        }
    }
}

fn store_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write `document` to a uniquely named temp file next to `path` and flush it to disk.
///
/// The temp file is removed on drop unless it is persisted.
pub(crate) fn stage_document(path: &Path, document: &StoreDocument) -> anyhow::Result<NamedTempFile> {
    let dir = store_dir(path);
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create store directory `{}`", dir.display()))?;

    let mut staged = tempfile::Builder::new()
        .prefix("punish_")
        .suffix(".json")
        .tempfile_in(dir)
        .context("failed to create punishment store temp file")?;

    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        serde_json::to_writer(&mut writer, document)
            .context("failed to serialize punishment store")?;
        writer.flush().context("failed to flush punishment store")?;
    }
    staged
        .as_file()
        .sync_all()
        .context("failed to sync punishment store temp file")?;

    Ok(staged)
}

pub(crate) fn atomic_write_json(path: &Path, document: &StoreDocument) -> anyhow::Result<()> {
    let staged = stage_document(path, document)?;
    staged
        .persist(path)
        .with_context(|| format!("failed to replace punishment store `{}`", path.display()))?;
    Ok(())
}
