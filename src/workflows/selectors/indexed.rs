use std::path::Path;

use super::Selector;
use crate::domain::models::{IndexedCandidate, VideoInfo};
use crate::error::{Error, Result};
use crate::infra::guess::MetadataGuesser;

/// Highest rating wins unless some candidate was made for the same release
/// group as the video.
pub struct IndexedSelector<'g> {
    pub guesser: &'g dyn MetadataGuesser,
}

impl Selector for IndexedSelector<'_> {
    type Candidate = IndexedCandidate;

    fn select<'a>(
        &self,
        candidates: &'a [IndexedCandidate],
        video: &VideoInfo,
        video_path: &Path,
    ) -> Result<&'a IndexedCandidate> {
        let mut ranked: Vec<&IndexedCandidate> = candidates.iter().collect();
        // Stable sort keeps response order among equal ratings
        ranked.sort_by(|a, b| b.rating.cmp(&a.rating));

        let best = *ranked
            .first()
            .ok_or_else(|| Error::subtitles_not_found(video_path))?;

        let Some(group) = video.release_group_token().map(str::to_lowercase) else {
            return Ok(best);
        };

        let same_group = ranked.into_iter().find(|candidate| {
            self.guesser
                .guess(&candidate.name)
                .release_group_token()
                .is_some_and(|remote| remote.to_lowercase() == group)
        });
        Ok(same_group.unwrap_or(best))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::guess::FilenameGuesser;

    fn candidate(id: &str, name: &str, rating: i64) -> IndexedCandidate {
        IndexedCandidate {
            id: id.to_string(),
            name: name.to_string(),
            rating,
            format: "srt".to_string(),
            ..Default::default()
        }
    }

    fn video(group: Option<&str>) -> VideoInfo {
        VideoInfo {
            release_group: group.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_highest_rating_first_on_ties() {
        let candidates = vec![
            candidate("1", "Show.S01E01-AAA.srt", 3),
            candidate("2", "Show.S01E01-BBB.srt", 7),
            candidate("3", "Show.S01E01-CCC.srt", 7),
        ];
        let selector = IndexedSelector { guesser: &FilenameGuesser };
        let chosen = selector
            .select(&candidates, &video(None), Path::new("show.mkv"))
            .unwrap();
        assert_eq!(chosen.id, "2");
    }

    #[test]
    fn test_release_group_overrides_rating() {
        let candidates = vec![
            candidate("1", "Show.S01E01.720p-OTHER.srt", 9),
            candidate("2", "Show.S01E01.720p-groupx[eztv].srt", 1),
            candidate("3", "Show.S01E01.1080p-GROUPX.srt", 4),
        ];
        let selector = IndexedSelector { guesser: &FilenameGuesser };
        let target = video(Some("GroupX[rarbg]"));

        let chosen = selector
            .select(&candidates, &target, Path::new("show.mkv"))
            .unwrap();
        assert_eq!(chosen.id, "3");

        // Same input, same answer
        let again = selector
            .select(&candidates, &target, Path::new("show.mkv"))
            .unwrap();
        assert_eq!(chosen, again);
    }

    #[test]
    fn test_unmatched_group_keeps_best_rating() {
        let candidates = vec![
            candidate("1", "Show.S01E01-AAA.srt", 2),
            candidate("2", "Show.S01E01-BBB.srt", 5),
        ];
        let selector = IndexedSelector { guesser: &FilenameGuesser };
        let chosen = selector
            .select(&candidates, &video(Some("ZZZ")), Path::new("show.mkv"))
            .unwrap();
        assert_eq!(chosen.id, "2");
    }

    #[test]
    fn test_empty_set_is_not_found() {
        let selector = IndexedSelector { guesser: &FilenameGuesser };
        let err = selector
            .select(&[], &video(None), Path::new("show.mkv"))
            .unwrap_err();
        assert!(matches!(err, Error::SubtitlesNotFound { .. }));
    }
}
