use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::domain::language::Language;
use crate::domain::models::{subtitle_path_for, VideoFile};
use crate::media::tracks::{self, EmbeddedMatch};

const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi"];
const EXCLUDED_DIR: &str = "Plex Versions";

type EmbeddedProbe = fn(&Path, &Language) -> Result<Option<EmbeddedMatch>>;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub language: Language,
    /// Files modified longer ago than this are ignored.
    pub max_age: Option<Duration>,
    /// Inspect matroska tracks for the target language.
    pub embedded: bool,
}

/// Walks a folder and collects the videos that still need a subtitle.
pub struct FileScanner {
    root: PathBuf,
    options: ScanOptions,
    probe: EmbeddedProbe,
    qualified: Option<Vec<VideoFile>>,
}

impl FileScanner {
    pub fn new(root: impl Into<PathBuf>, options: ScanOptions) -> Self {
        Self {
            root: root.into(),
            options,
            probe: tracks::find_embedded_match,
            qualified: None,
        }
    }

    /// The walk runs once; later calls return the same list.
    pub fn qualified_files(&mut self) -> &[VideoFile] {
        if self.qualified.is_none() {
            let files = self.scan();
            if !files.is_empty() {
                info!("{} file(s) to be processed", files.len());
            }
            self.qualified = Some(files);
        }
        self.qualified.as_deref().unwrap_or_default()
    }

    fn scan(&self) -> Vec<VideoFile> {
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_pruned_dir(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Error walking directory");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            if let Some(file) = self.verify_file(&entry) {
                if !self.has_embedded_match(&file.path) {
                    files.push(file);
                }
            }
        }
        files
    }

    fn verify_file(&self, entry: &DirEntry) -> Option<VideoFile> {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();

        if file_name.starts_with('.') {
            info!("Skipping hidden file {file_name}");
            return None;
        }
        if entry.path_is_symlink() {
            info!("Skipping link file {}", path.display());
            return None;
        }
        if !has_video_extension(path) {
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("Could not read metadata of {}: {err}", path.display());
                return None;
            }
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        if let Some(max_age) = self.options.max_age {
            let too_old = SystemTime::now()
                .duration_since(modified)
                .map(|age| age > max_age)
                .unwrap_or(false);
            if too_old {
                return None;
            }
        }

        if subtitle_path_for(path, self.options.language.tag()).exists() {
            info!("Skipping externally subtitled file {}", path.display());
            return None;
        }

        debug!(size = metadata.len(), ?modified, "Qualified {}", path.display());
        Some(VideoFile {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified,
        })
    }

    fn has_embedded_match(&self, path: &Path) -> bool {
        let is_mkv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("mkv"))
            .unwrap_or(false);
        if !self.options.embedded || !is_mkv {
            return false;
        }

        match (self.probe)(path, &self.options.language) {
            Ok(Some(EmbeddedMatch::Audio)) => {
                info!("Internal audio found for {}", path.display());
                true
            }
            Ok(Some(EmbeddedMatch::Subtitle)) => {
                info!("Internal subtitle found for {}", path.display());
                true
            }
            Ok(None) => false,
            Err(err) => {
                debug!("Could not inspect tracks of {}: {err}", path.display());
                false
            }
        }
    }
}

fn is_pruned_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == EXCLUDED_DIR
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
