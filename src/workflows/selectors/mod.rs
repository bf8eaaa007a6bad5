use std::path::Path;

use crate::domain::models::VideoInfo;
use crate::error::Result;

/// Reduces a provider's search results to the one subtitle to download.
pub trait Selector {
    type Candidate;

    fn select<'a>(
        &self,
        candidates: &'a [Self::Candidate],
        video: &VideoInfo,
        video_path: &Path,
    ) -> Result<&'a Self::Candidate>;
}

pub mod indexed;
pub mod scraped;
