use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use crate::domain::language::Language;
use crate::media::ffmpeg;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<Stream>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    codec_type: Option<String>,
    tags: Option<Tags>,
}

#[derive(Debug, Deserialize)]
struct Tags {
    language: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub language: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedMatch {
    Audio,
    Subtitle,
}

/// Checks whether a matroska file already carries the target language,
/// either as its only audio track or as one of its subtitle tracks.
pub fn find_embedded_match(path: &Path, language: &Language) -> Result<Option<EmbeddedMatch>> {
    let json = ffmpeg::probe_streams(path)?;
    match_from_streams_json(&json, language)
}

fn match_from_streams_json(json: &[u8], language: &Language) -> Result<Option<EmbeddedMatch>> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let mut audio = Vec::new();
    let mut subtitles = Vec::new();
    for stream in probe.streams {
        let track = Track {
            language: stream.tags.as_ref().and_then(|t| t.language.clone()),
            name: stream.tags.as_ref().and_then(|t| t.title.clone()),
        };
        match stream.codec_type.as_deref() {
            Some("audio") => audio.push(track),
            Some("subtitle") => subtitles.push(track),
            _ => {}
        }
    }

    if audio.len() == 1 && tracks_match(&audio, language) {
        return Ok(Some(EmbeddedMatch::Audio));
    }
    if tracks_match(&subtitles, language) {
        return Ok(Some(EmbeddedMatch::Subtitle));
    }
    Ok(None)
}

/// A track with a language tag is judged by its 639-2/B code; a track without
/// one falls back to its name. Unknown values never match.
pub fn tracks_match(tracks: &[Track], language: &Language) -> bool {
    tracks.iter().any(|track| {
        let detected = match (&track.language, &track.name) {
            (Some(code), _) => Language::from_alpha3b(code),
            (None, Some(name)) => Language::from_name(name),
            (None, None) => None,
        };
        detected.as_ref() == Some(language)
    })
}
