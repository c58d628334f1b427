//! Reference corpus of labelled perceptual hashes and nearest-neighbour lookup.

use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::config::KolamConfig;
use crate::error::{AnalysisError, Result};
use crate::phash::{ImageHash, perceptual_hash};

/// Coarse kolam style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KolamLabel {
    Pulli,
    Sikku,
    Freehand,
    Unknown,
}

impl fmt::Display for KolamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KolamLabel::Pulli => "Pulli",
            KolamLabel::Sikku => "Sikku",
            KolamLabel::Freehand => "Freehand",
            KolamLabel::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

const LABEL_HINTS: [(&[&str], KolamLabel); 3] = [
    (&["pulli"], KolamLabel::Pulli),
    (&["sikku", "kambi", "line"], KolamLabel::Sikku),
    (&["free", "hand"], KolamLabel::Freehand),
];

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

fn label_from_name(name: &str) -> Option<KolamLabel> {
    let name = name.to_ascii_lowercase();
    LABEL_HINTS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| name.contains(n)))
        .map(|&(_, label)| label)
}

/// Infers a label from the file name, then from the parent directory name.
pub fn infer_label(path: &Path) -> KolamLabel {
    let file_name = path.file_name().and_then(OsStr::to_str);
    let dir_name = path
        .parent()
        .and_then(Path::file_name)
        .and_then(OsStr::to_str);
    file_name
        .and_then(label_from_name)
        .or_else(|| dir_name.and_then(label_from_name))
        .unwrap_or(KolamLabel::Unknown)
}

fn is_image_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Depth-first walk over image files below `root`.
///
/// The root itself must be readable; unreadable subdirectories are skipped.
/// Visit order follows the filesystem and is not stable across platforms.
fn walk_images(root: &Path, mut visit: impl FnMut(&Path) -> ControlFlow<()>) -> Result<()> {
    let mut root_entries = Some(fs::read_dir(root).map_err(|source| {
        AnalysisError::DatasetUnavailable {
            root: root.to_path_buf(),
            source,
        }
    })?);

    // Directories are queued by path and opened on pop, so only one handle
    // is open at a time.
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match root_entries.take() {
            Some(entries) => entries,
            None => match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!("skipping {}: {e}", dir.display());
                    continue;
                }
            },
        };
        for entry in entries.filter_map(std::result::Result::ok) {
            let path = entry.path();
            let Ok(kind) = entry.file_type() else {
                continue;
            };
            if kind.is_dir() {
                pending.push(path);
            } else if kind.is_file() && is_image_file(&path) && visit(&path).is_break() {
                return Ok(());
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub path: PathBuf,
    pub label: KolamLabel,
    pub hash: ImageHash,
}

/// Best dataset entry for a query hash.
#[derive(Debug, Clone, Copy)]
pub struct NearestMatch<'a> {
    pub entry: &'a DatasetEntry,
    pub distance: u32,
    /// `1 - distance / (8 * query_len)`.
    pub similarity: f64,
}

/// Immutable collection of reference hashes, shared read-only by all requests.
#[derive(Debug, Clone, Default)]
pub struct DatasetIndex {
    entries: Vec<DatasetEntry>,
}

impl DatasetIndex {
    pub fn from_entries(entries: Vec<DatasetEntry>) -> Self {
        Self { entries }
    }

    /// Hashes up to `config.dataset_cap` images below `root`.
    ///
    /// Files that fail to decode are skipped and do not count toward the cap.
    pub fn build(root: &Path, config: &KolamConfig) -> Result<Self> {
        let mut entries = Vec::new();
        if config.dataset_cap > 0 {
            walk_images(root, |path| {
                let hashed = fs::read(path)
                    .map_err(|source| AnalysisError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
                    .and_then(|bytes| {
                        perceptual_hash(&bytes, config.phash_size, config.phash_low_size)
                    });
                match hashed {
                    Ok(hash) => entries.push(DatasetEntry {
                        path: path.to_path_buf(),
                        label: infer_label(path),
                        hash,
                    }),
                    Err(e) => tracing::warn!("skipping dataset file {}: {e}", path.display()),
                }
                if entries.len() >= config.dataset_cap {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })?;
        }
        tracing::info!("dataset index built from {}: {} entries", root.display(), entries.len());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Linear Hamming scan; the first entry at the minimum distance wins.
    pub fn nearest(&self, query: &ImageHash) -> Option<NearestMatch<'_>> {
        let mut best: Option<(&DatasetEntry, u32)> = None;
        for entry in &self.entries {
            let distance = query.distance(&entry.hash);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((entry, distance));
            }
        }
        let (entry, distance) = best?;
        let max_bits = query.bit_len();
        let similarity = if max_bits == 0 {
            0.0
        } else {
            1.0 - distance as f64 / max_bits as f64
        };
        Some(NearestMatch {
            entry,
            distance,
            similarity,
        })
    }
}

/// Host-owned handle that builds the index once and hands out shared references.
///
/// Concurrent first callers serialize on the build guard; only one build
/// runs and the others reuse its result. A failed build is not cached.
#[derive(Debug, Default)]
pub struct SharedDatasetIndex {
    index: OnceLock<DatasetIndex>,
    build_guard: Mutex<()>,
}

impl SharedDatasetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&DatasetIndex> {
        self.index.get()
    }

    pub fn get_or_build(&self, root: &Path, config: &KolamConfig) -> Result<&DatasetIndex> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let _guard = self
            .build_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let built = DatasetIndex::build(root, config)?;
        Ok(self.index.get_or_init(|| built))
    }
}
