use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A video found by the scanner that still needs a subtitle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

impl VideoFile {
    /// Where a subtitle for this video is written: the video's extension is
    /// replaced by `<tag>.srt`, e.g. `show.mkv` -> `show.es.srt`.
    pub fn subtitle_path(&self, language_tag: &str) -> PathBuf {
        subtitle_path_for(&self.path, language_tag)
    }
}

pub fn subtitle_path_for(video_path: &Path, language_tag: &str) -> PathBuf {
    video_path.with_extension(format!("{language_tag}.srt"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoKind {
    Episode,
    Movie,
}

/// Metadata guessed from a file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoInfo {
    pub kind: Option<VideoKind>,
    pub title: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub year: Option<u32>,
    pub release_group: Option<String>,
}

impl VideoInfo {
    /// Release group with any trailing `[...]` tag removed.
    pub fn release_group_token(&self) -> Option<&str> {
        self.release_group
            .as_deref()
            .and_then(|group| group.split('[').next())
    }
}

/// A subtitle returned by the indexed (SOAP) service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedCandidate {
    pub id: String,
    pub size: u64,
    pub url: String,
    pub language: String,
    pub name: String,
    pub format: String,
    pub hash: String,
    pub rating: i64,
}

impl IndexedCandidate {
    pub fn is_valid(&self) -> bool {
        self.format == "srt"
    }
}

/// A subtitle listed on a search results page of the scraped service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedCandidate {
    pub page_link: String,
    pub description: String,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_path_replaces_extension() {
        assert_eq!(
            subtitle_path_for(Path::new("/tv/Show.S01E02.mkv"), "es"),
            PathBuf::from("/tv/Show.S01E02.es.srt")
        );
    }

    #[test]
    fn test_release_group_token() {
        let info = VideoInfo {
            release_group: Some("GROUPX[rarbg]".to_string()),
            ..Default::default()
        };
        assert_eq!(info.release_group_token(), Some("GROUPX"));
        assert_eq!(VideoInfo::default().release_group_token(), None);
    }
}
