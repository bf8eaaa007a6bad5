use std::io::{Cursor, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{Error, Result};

const RAR_SIGNATURE: &[u8] = b"Rar!\x1a\x07";
const ZIP_SIGNATURES: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06"];
const FORCED_MARKERS: &[&str] = &["FORZADO", "FORCED"];

/// The subset of an archive the subtitle picker needs.
pub trait SubtitleArchive {
    fn names(&self) -> Vec<String>;
    fn read(&mut self, name: &str) -> Result<Vec<u8>>;
}

pub struct ZipSubtitleArchive {
    inner: ZipArchive<Cursor<Vec<u8>>>,
}

impl SubtitleArchive for ZipSubtitleArchive {
    fn names(&self) -> Vec<String> {
        self.inner.file_names().map(str::to_string).collect()
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.inner.by_name(name)?;
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        Ok(content)
    }
}

/// unrar only reads from disk, so the blob is spilled to a temporary file that
/// lives as long as the archive.
pub struct RarSubtitleArchive {
    file: NamedTempFile,
    names: Vec<String>,
}

impl RarSubtitleArchive {
    fn new(content: &[u8]) -> Result<Self> {
        let mut file = NamedTempFile::new()?;
        file.write_all(content)?;
        file.flush()?;

        let mut names = Vec::new();
        for entry in unrar::Archive::new(file.path()).open_for_listing()? {
            let entry = entry?;
            if entry.is_file() {
                names.push(entry.filename.to_string_lossy().into_owned());
            }
        }
        Ok(Self { file, names })
    }
}

impl SubtitleArchive for RarSubtitleArchive {
    fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut archive = unrar::Archive::new(self.file.path()).open_for_processing()?;
        while let Some(header) = archive.read_header()? {
            if header.entry().filename.to_string_lossy() == name {
                let (content, _) = header.read()?;
                return Ok(content);
            }
            archive = header.skip()?;
        }
        Err(Error::ParseResponse(format!("{name} not found in archive")))
    }
}

/// Detects the container by its signature.
pub fn open_archive(content: &[u8]) -> Result<Box<dyn SubtitleArchive>> {
    if content.starts_with(RAR_SIGNATURE) {
        debug!("Opening rar archive ({} bytes)", content.len());
        return Ok(Box::new(RarSubtitleArchive::new(content)?));
    }
    if ZIP_SIGNATURES.iter().any(|sig| content.starts_with(sig)) {
        debug!("Opening zip archive ({} bytes)", content.len());
        let inner = ZipArchive::new(Cursor::new(content.to_vec()))?;
        return Ok(Box::new(ZipSubtitleArchive { inner }));
    }
    Err(Error::ParseResponse(
        "Unsupported compressed format".to_string(),
    ))
}

fn is_forced(name: &str) -> bool {
    let name = name.to_uppercase();
    FORCED_MARKERS.iter().any(|marker| name.contains(marker))
}

fn is_hidden(name: &str) -> bool {
    Path::new(name)
        .file_name()
        .map(|file_name| file_name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Picks the subtitle entry to extract: the first `.srt` naming the release
/// group, otherwise the last non-forced `.srt`. Hidden entries never qualify.
pub fn pick_subtitle_entry<'a>(names: &'a [String], release_group: Option<&str>) -> Option<&'a str> {
    let release_group = release_group
        .filter(|group| !group.is_empty())
        .map(str::to_lowercase);

    let mut picked = None;
    for name in names {
        if is_hidden(name) || !name.to_lowercase().ends_with(".srt") || is_forced(name) {
            continue;
        }

        picked = Some(name.as_str());
        if let Some(group) = &release_group {
            if name.to_lowercase().contains(group.as_str()) {
                break;
            }
        }
    }
    picked
}

pub fn extract_subtitle(content: &[u8], release_group: Option<&str>) -> Result<Vec<u8>> {
    let mut archive = open_archive(content)?;
    let names = archive.names();
    let name = pick_subtitle_entry(&names, release_group).ok_or_else(|| {
        Error::ParseResponse("Subtitle in the compressed file not found".to_string())
    })?;
    debug!("Extracting {name}");
    archive.read(name)
}
