use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::REFERER;
use reqwest::Url;
use tracing::{debug, info};

use super::build_client;
use super::subdivx_page::{decode_latin1, parse_download_link, parse_search_page};
use crate::domain::models::{ScrapedCandidate, VideoFile, VideoInfo, VideoKind};
use crate::error::{Error, Result};
use crate::infra::guess::MetadataGuesser;
use crate::infra::proxy::ProxyPool;
use crate::media::archive;
use crate::workflows::selectors::scraped::ScrapedSelector;
use crate::workflows::selectors::Selector;

pub const DEFAULT_BASE_URL: &str = "https://www.subdivx.com/";
const USER_AGENT: &str = "SubtitlesDownloader/2.x";
/// Subtitles from this site are always Spanish.
const LANGUAGE_TAG: &str = "es";
const PAGE_SIZE: usize = 20;
const MAX_PAGES: u32 = 9;
pub const PAGE_THROTTLE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SubdivxSettings {
    pub base_url: String,
    pub timeout: Duration,
    /// Pause between result pages.
    pub throttle: Duration,
}

/// Scraper for the Subdivx search pages. One HTTP session, with one proxy,
/// lives as long as this value.
pub struct Subdivx<'a> {
    settings: SubdivxSettings,
    guesser: &'a dyn MetadataGuesser,
    client: Client,
}

impl<'a> Subdivx<'a> {
    pub fn open(
        settings: SubdivxSettings,
        proxy_pool: Option<&dyn ProxyPool>,
        guesser: &'a dyn MetadataGuesser,
    ) -> Result<Self> {
        let proxy = proxy_pool.map(|pool| pool.next());
        let client = build_client(settings.timeout, proxy.as_deref(), Some(USER_AGENT))?;
        Ok(Self {
            settings,
            guesser,
            client,
        })
    }

    fn fetch(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send()?;
        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "Bad status code: {}",
                response.status().as_u16()
            )));
        }
        Ok(response)
    }

    pub fn query(
        &self,
        keyword: &str,
        season: Option<u32>,
        episode: Option<u32>,
        year: Option<u32>,
    ) -> Result<Vec<ScrapedCandidate>> {
        let query = match (season, episode, year) {
            (Some(season), Some(episode), _) => format!("{keyword} S{season:02}E{episode:02}"),
            (_, _, Some(year)) => format!("{keyword} {year:4}"),
            _ => keyword.to_string(),
        };
        let search_link = format!("{}index.php", self.settings.base_url);

        let mut subtitles = Vec::new();
        let mut page = 1;
        loop {
            debug!("Searching \"{query}\" page {page}");
            let pg = page.to_string();
            let request = self.client.get(&search_link).query(&[
                ("buscar", query.as_str()),
                ("accion", "5"),
                ("oxdown", "1"),
                ("pg", pg.as_str()),
            ]);
            let response = self.fetch(request)?;
            let html = decode_latin1(&response.bytes()?);

            let page_subtitles = parse_search_page(&html).map_err(|e| {
                Error::ParseResponse(format!("Error parsing subtitles list: {e}"))
            })?;
            let full_page = page_subtitles.len() >= PAGE_SIZE;
            for mut subtitle in page_subtitles {
                subtitle.page_link = secure_link(&self.settings.base_url, &subtitle.page_link)?;
                subtitles.push(subtitle);
            }

            if !full_page || page >= MAX_PAGES {
                break;
            }
            page += 1;
            thread::sleep(self.settings.throttle);
        }

        Ok(subtitles)
    }

    pub fn search_subtitles(
        &self,
        video: &VideoFile,
        info: &VideoInfo,
    ) -> Result<Vec<ScrapedCandidate>> {
        info!("Searching subtitles for {}", video.path.display());

        let subtitles = match (info.kind, info.title.as_deref()) {
            (Some(VideoKind::Episode), Some(title)) => {
                self.query(title, info.season, info.episode, info.year)?
            }
            (Some(VideoKind::Movie), Some(title)) => self.query(title, None, None, info.year)?,
            _ => Vec::new(),
        };

        if subtitles.is_empty() {
            return Err(Error::subtitles_not_found(&video.path));
        }
        Ok(subtitles)
    }

    pub fn download_by_path(&self, video: &VideoFile) -> Result<PathBuf> {
        let info = self.guesser.guess(&video.path.to_string_lossy());
        let subtitles = self.search_subtitles(video, &info)?;
        let subtitle = ScrapedSelector.select(&subtitles, &info, &video.path)?;
        info!("Subtitle found: {}", subtitle.title);
        debug!("{}", subtitle.description);

        info!("Downloading subtitle for {}", video.path.display());
        let destination = video.subtitle_path(LANGUAGE_TAG);
        self.download(subtitle, &info, &destination)?;
        Ok(destination)
    }

    fn download(
        &self,
        subtitle: &ScrapedCandidate,
        info: &VideoInfo,
        destination: &std::path::Path,
    ) -> Result<()> {
        let page = self.fetch(self.client.get(&subtitle.page_link))?;
        let html = decode_latin1(&page.bytes()?);
        let link = parse_download_link(&html)?;
        let download_url = Url::parse(&subtitle.page_link)
            .and_then(|base| base.join(&link))
            .map_err(|e| Error::ParseResponse(format!("Invalid download link {link}: {e}")))?;

        let response = self.fetch(
            self.client
                .get(download_url)
                .header(REFERER, subtitle.page_link.as_str()),
        )?;
        let content = archive::extract_subtitle(&response.bytes()?, info.release_group_token())?;
        fs::write(destination, fix_line_endings(&content))?;
        Ok(())
    }
}

/// Listing links are plain http even though the site answers on https.
/// Relative links are resolved against the search base.
fn secure_link(base_url: &str, link: &str) -> Result<String> {
    let link = match link.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => link.to_string(),
    };
    Url::parse(base_url)
        .and_then(|base| base.join(&link))
        .map(String::from)
        .map_err(|e| Error::ParseResponse(format!("Invalid subtitle link {link}: {e}")))
}

fn fix_line_endings(content: &[u8]) -> Vec<u8> {
    let mut fixed = Vec::with_capacity(content.len());
    let mut bytes = content.iter().peekable();
    while let Some(&byte) = bytes.next() {
        if byte == b'\r' && bytes.peek() == Some(&&b'\n') {
            continue;
        }
        fixed.push(byte);
    }
    fixed
}
