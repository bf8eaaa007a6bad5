use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::domain::models::{VideoInfo, VideoKind};

static EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bs(\d{1,2})[ .]?e(\d{1,3})|\b(\d{1,2})x(\d{2,3})\b")
        .expect("episode pattern should be valid")
});
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("year pattern should be valid"));
static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(480p|576p|720p|1080p|2160p|hdtv|web-?dl|webrip|bluray|brrip|bdrip|dvdrip|x264|x265|h264|hevc)\b")
        .expect("quality pattern should be valid")
});
static RELEASE_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-([A-Za-z0-9]+(?:\[[^\]]*\])?)$").expect("release group pattern should be valid")
});

const KNOWN_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "srt", "sub"];

/// Extracts title/season/episode/year/release group from a file name.
pub trait MetadataGuesser {
    fn guess(&self, name: &str) -> VideoInfo;
}

/// Scene-style naming heuristics, e.g. `Show.S01E02.720p.HDTV.x264-GROUP.mkv`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameGuesser;

impl MetadataGuesser for FilenameGuesser {
    fn guess(&self, name: &str) -> VideoInfo {
        let stem = file_stem(name);
        let mut info = VideoInfo::default();
        let mut title_end = stem.len();

        if let Some(caps) = EPISODE_RE.captures(&stem) {
            let season = caps.get(1).or_else(|| caps.get(3));
            let episode = caps.get(2).or_else(|| caps.get(4));
            info.kind = Some(VideoKind::Episode);
            info.season = season.and_then(|m| m.as_str().parse().ok());
            info.episode = episode.and_then(|m| m.as_str().parse().ok());
            title_end = title_end.min(caps.get(0).map_or(stem.len(), |m| m.start()));
        } else {
            info.kind = Some(VideoKind::Movie);
        }

        // A year at the very start is part of the title ("2001 A Space Odyssey")
        if let Some(year) = YEAR_RE.find_iter(&stem).find(|m| m.start() > 0) {
            info.year = year.as_str().parse().ok();
            if info.kind == Some(VideoKind::Movie) {
                title_end = title_end.min(year.start());
            }
        }
        if let Some(quality) = QUALITY_RE.find(&stem) {
            title_end = title_end.min(quality.start());
        }

        if let Some(caps) = RELEASE_GROUP_RE.captures(&stem) {
            info.release_group = caps.get(1).map(|m| m.as_str().to_string());
            if info.release_group.is_some() && title_end == stem.len() {
                title_end = caps.get(0).map_or(stem.len(), |m| m.start());
            }
        }

        let title = clean_title(&stem[..title_end]);
        if !title.is_empty() {
            info.title = Some(title);
        }
        info
    }
}

fn file_stem(name: &str) -> String {
    let file_name = Path::new(name)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if KNOWN_EXTENSIONS.contains(&ext.to_lowercase().as_str()) => {
            stem.to_string()
        }
        _ => file_name,
    }
}

fn clean_title(raw: &str) -> String {
    raw.replace(['.', '_'], " ")
        .trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '(' || c == '[')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
