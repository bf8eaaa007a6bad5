use std::path::Path;

use super::Selector;
use crate::domain::models::{ScrapedCandidate, VideoInfo};
use crate::error::{Error, Result};

/// First listing whose description mentions the video's release group.
/// There is no fallback: without a match nothing is downloaded.
pub struct ScrapedSelector;

impl Selector for ScrapedSelector {
    type Candidate = ScrapedCandidate;

    fn select<'a>(
        &self,
        candidates: &'a [ScrapedCandidate],
        video: &VideoInfo,
        video_path: &Path,
    ) -> Result<&'a ScrapedCandidate> {
        let group = video
            .release_group_token()
            .filter(|group| !group.is_empty())
            .map(str::to_lowercase);

        group
            .and_then(|group| {
                candidates
                    .iter()
                    .find(|candidate| candidate.description.to_lowercase().contains(&group))
            })
            .ok_or_else(|| Error::subtitles_not_found(video_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(link: &str, description: &str) -> ScrapedCandidate {
        ScrapedCandidate {
            page_link: link.to_string(),
            description: description.to_string(),
            title: "Show".to_string(),
        }
    }

    fn video(group: Option<&str>) -> VideoInfo {
        VideoInfo {
            release_group: group.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_description_mentioning_group() {
        let candidates = vec![
            candidate("a", "sincronizados para la version WEB-DL"),
            candidate("b", "para la version 720p.hdtv-GroupX, gracias"),
            candidate("c", "groupx tambien"),
        ];
        let chosen = ScrapedSelector
            .select(&candidates, &video(Some("GROUPX[rarbg]")), Path::new("x.mkv"))
            .unwrap();
        assert_eq!(chosen.page_link, "b");
    }

    #[test]
    fn test_no_match_has_no_fallback() {
        let candidates = vec![candidate("a", "otra version")];
        let err = ScrapedSelector
            .select(&candidates, &video(Some("GROUPX")), Path::new("x.mkv"))
            .unwrap_err();
        assert!(matches!(err, Error::SubtitlesNotFound { .. }));

        let err = ScrapedSelector
            .select(&candidates, &video(None), Path::new("x.mkv"))
            .unwrap_err();
        assert!(matches!(err, Error::SubtitlesNotFound { .. }));
    }
}
