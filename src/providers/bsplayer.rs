use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use rand::seq::SliceRandom;
use reqwest::blocking::Client;
use reqwest::header::{CONNECTION, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, error, info, warn};

use super::soap::{self, Element};
use super::{build_client, is_transport_failure};
use crate::domain::language::Language;
use crate::domain::models::{IndexedCandidate, VideoFile};
use crate::error::{Error, Result};
use crate::infra::guess::MetadataGuesser;
use crate::infra::proxy::ProxyPool;
use crate::media::fingerprint::Fingerprint;
use crate::workflows::selectors::indexed::IndexedSelector;
use crate::workflows::selectors::Selector;

const SUB_DOMAINS: [&str; 18] = [
    "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s101", "s102", "s103", "s104", "s105",
    "s106", "s107", "s108", "s109",
];
const API_USER_AGENT: &str = "BSPlayer/2.x (1022.12362)";
const DOWNLOAD_USER_AGENT: &str = "Mozilla/4.0 (compatible; Synapse)";
const APP_ID: &str = "BSPlayer v2.67";

const LOGIN: &str = "logIn";
const LOGOUT: &str = "logOut";
const SEARCH: &str = "searchSubtitles";

pub fn default_endpoints() -> Vec<String> {
    SUB_DOMAINS
        .iter()
        .map(|sub| format!("http://{sub}.api.bsplayer-subtitles.com/v1.php"))
        .collect()
}

#[derive(Debug, Clone)]
pub struct BsPlayerSettings {
    /// Equivalent mirrors; each request picks one at random.
    pub endpoints: Vec<String>,
    pub timeout: Duration,
    pub tries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    LoggedOut,
    LoggedIn { token: String },
}

/// Client for the BSPlayer subtitle index, a SOAP service keyed by the
/// content fingerprint of a video.
pub struct BsPlayer<'a> {
    settings: BsPlayerSettings,
    proxy_pool: Option<&'a dyn ProxyPool>,
    guesser: &'a dyn MetadataGuesser,
    proxy: Option<String>,
    client: Client,
    state: SessionState,
}

impl<'a> BsPlayer<'a> {
    pub fn new(
        settings: BsPlayerSettings,
        proxy_pool: Option<&'a dyn ProxyPool>,
        guesser: &'a dyn MetadataGuesser,
    ) -> Result<Self> {
        let client = build_client(settings.timeout, None, None)?;
        Ok(Self {
            settings,
            proxy_pool,
            guesser,
            proxy: None,
            client,
            state: SessionState::LoggedOut,
        })
    }

    /// Logs in, runs `body`, then logs out whatever `body` returned. An error
    /// from `body` wins over a logout error.
    pub fn run<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.login()?;
        let outcome = body(self);
        let logout = self.logout();
        match (outcome, logout) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(logout_err)) => {
                error!("Logout failed after an earlier error: {logout_err}");
                Err(err)
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.state, SessionState::LoggedIn { .. })
    }

    fn token(&self) -> Result<&str> {
        match &self.state {
            SessionState::LoggedIn { token } => Ok(token),
            SessionState::LoggedOut => Err(Error::NotLoggedIn),
        }
    }

    fn use_proxy(&mut self, proxy: Option<String>) -> Result<()> {
        self.client = build_client(self.settings.timeout, proxy.as_deref(), None)?;
        self.proxy = proxy;
        Ok(())
    }

    fn pick_endpoint(&self) -> Result<String> {
        self.settings
            .endpoints
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| Error::ServiceUnavailable("No BSPlayer endpoints configured".to_string()))
    }

    fn send(&self, endpoint: &str, function: &str, params: &[(&str, &str)]) -> reqwest::Result<String> {
        self.client
            .post(endpoint)
            .header(USER_AGENT, API_USER_AGENT)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header(CONNECTION, "close")
            .header(
                "SOAPAction",
                format!("\"http://api.bsplayer-subtitles.com/v1.php#{function}\""),
            )
            .body(soap::envelope(endpoint, function, params))
            .send()?
            .text()
    }

    /// Sends a call, retrying on connection failures and timeouts. A failing
    /// login also moves the session to the next proxy.
    fn api_request(&mut self, function: &str, params: &[(&str, &str)]) -> Result<Element> {
        info!("Sending request: {function}");

        for attempt in 1..=self.settings.tries {
            info!("Try number {attempt} for operation {function}");
            let endpoint = self.pick_endpoint()?;
            match self.send(&endpoint, function, params) {
                Ok(body) => return Element::parse(&body),
                Err(err) if is_transport_failure(&err) => {
                    warn!("{function} failed: {err}");
                    if function == LOGIN {
                        if let Some(pool) = self.proxy_pool {
                            self.use_proxy(Some(pool.next()))?;
                        }
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        error!("Too many tries {}", self.settings.tries);
        Err(Error::too_many_tries(function))
    }

    pub fn login(&mut self) -> Result<()> {
        if self.is_logged_in() {
            info!("Already logged in");
            return Ok(());
        }

        if let Some(pool) = self.proxy_pool {
            self.use_proxy(Some(pool.next()))?;
        }

        let root = self.api_request(
            LOGIN,
            &[("username", ""), ("password", ""), ("AppId", APP_ID)],
        )?;
        let result = root
            .descendant("return")
            .ok_or_else(|| Error::ParseResponse("Login response without result".to_string()))?;

        if result.child_text("status") == Some("OK") {
            let token = result.child_text("data").unwrap_or_default().to_string();
            self.state = SessionState::LoggedIn { token };
            info!("Logged in successfully");
            return Ok(());
        }

        error!("Error logging in");
        Err(Error::LoginFailed)
    }

    /// A single attempt: a transport failure here is reported, not retried.
    pub fn logout(&mut self) -> Result<()> {
        let token = match self.token() {
            Ok(token) => token.to_string(),
            Err(_) => {
                info!("Already logged out");
                return Ok(());
            }
        };

        info!("Sending request: {LOGOUT}");
        let endpoint = self.pick_endpoint()?;
        let body = self.send(&endpoint, LOGOUT, &[("handle", token.as_str())])?;
        let root = Element::parse(&body)?;

        if root.find(&["return", "status"]).map(|s| s.text.as_str()) == Some("OK") {
            info!("Logged out successfully");
            self.state = SessionState::LoggedOut;
            self.proxy = None;
            return Ok(());
        }

        error!("Error logging out");
        Err(Error::LogoutFailed)
    }

    pub fn search_subtitles(
        &mut self,
        video: &VideoFile,
        language: &Language,
    ) -> Result<Vec<IndexedCandidate>> {
        let token = self.token()?.to_string();

        let fingerprint = match Fingerprint::of_file(&video.path) {
            Ok(fingerprint) => fingerprint,
            Err(Error::SizeTooSmall) => {
                warn!("Probably not a video file: {}", video.path.display());
                return Err(Error::subtitles_not_found(&video.path));
            }
            Err(err) => return Err(err),
        };

        info!(
            "Searching subtitles for {} (size={} hash={fingerprint})",
            video.path.display(),
            video.size
        );
        let hash = fingerprint.to_string();
        let root = self.api_request(
            SEARCH,
            &[
                ("handle", token.as_str()),
                ("movieHash", hash.as_str()),
                ("languageId", language.alpha3()),
                ("imdbId", "*"),
            ],
        )?;

        let status = root
            .find(&["return", "result", "status"])
            .map(|status| status.text.as_str())
            .unwrap_or_default();
        match status {
            "OK" => {}
            "Not found" => return Err(Error::subtitles_not_found(&video.path)),
            other => return Err(Error::UnknownResult(other.to_string())),
        }

        let candidates: Vec<IndexedCandidate> = root
            .find_all(&["return", "data", "item"])
            .into_iter()
            .map(candidate_from_item)
            .filter(IndexedCandidate::is_valid)
            .collect();

        if candidates.is_empty() {
            return Err(Error::subtitles_not_found(&video.path));
        }
        info!("Subtitles found");
        Ok(candidates)
    }

    pub fn download_by_path(&mut self, video: &VideoFile, language: &Language) -> Result<PathBuf> {
        let candidates = self.search_subtitles(video, language)?;
        let info = self.guesser.guess(&video.path.to_string_lossy());
        let selector = IndexedSelector {
            guesser: self.guesser,
        };
        let chosen = selector.select(&candidates, &info, &video.path)?;
        info!(
            id = %chosen.id,
            language = %chosen.language,
            size = chosen.size,
            hash = %chosen.hash,
            "Chosen subtitle {} (rating {})",
            chosen.name,
            chosen.rating
        );

        info!("Downloading subtitle for {}", video.path.display());
        let destination = video.subtitle_path(language.tag());
        self.download(chosen, &destination)?;
        Ok(destination)
    }

    /// The download link is public: no token, but the session's proxy.
    fn download(&self, candidate: &IndexedCandidate, destination: &Path) -> Result<()> {
        debug!(proxy = ?self.proxy, "Fetching {}", candidate.url);
        let response = self
            .client
            .get(&candidate.url)
            .header(USER_AGENT, DOWNLOAD_USER_AGENT)
            .send()?;
        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "Bad status code: {}",
                response.status()
            )));
        }

        let body = response.bytes()?;
        if body.as_ref() == b"500" {
            return Err(Error::ServiceUnavailable(
                "Error while downloading subtitles".to_string(),
            ));
        }

        let mut content = Vec::new();
        GzDecoder::new(body.as_ref()).read_to_end(&mut content)?;
        fs::write(destination, content)?;
        Ok(())
    }
}

fn candidate_from_item(item: &Element) -> IndexedCandidate {
    let text = |name: &str| item.child_text(name).unwrap_or_default().trim().to_string();
    IndexedCandidate {
        id: text("subID"),
        size: text("subSize").parse().unwrap_or(0),
        url: text("subDownloadLink"),
        language: text("subLang"),
        name: text("subName"),
        format: text("subFormat"),
        hash: text("subHash"),
        rating: text("subRating").parse().unwrap_or(0),
    }
}

#[cfg(test)]
pub mod fixtures {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    pub fn status_response(function: &str, status: &str, data: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><SOAP-ENV:Envelope xmlns:SOAP-ENV=\"x\"><SOAP-ENV:Body>\
             <ns1:{function}Response xmlns:ns1=\"y\"><return><status>{status}</status>\
             <data>{data}</data></return></ns1:{function}Response></SOAP-ENV:Body></SOAP-ENV:Envelope>"
        )
    }

    pub fn search_response(status: &str, items: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><SOAP-ENV:Envelope xmlns:SOAP-ENV=\"x\"><SOAP-ENV:Body>\
             <ns1:searchSubtitlesResponse xmlns:ns1=\"y\"><return><result><status>{status}</status></result>\
             <data>{items}</data></return></ns1:searchSubtitlesResponse></SOAP-ENV:Body></SOAP-ENV:Envelope>"
        )
    }

    pub fn item(id: &str, name: &str, format: &str, rating: i64, url: &str) -> String {
        format!(
            "<item><subID>{id}</subID><subSize>10</subSize><subDownloadLink>{url}</subDownloadLink>\
             <subLang>spa</subLang><subName>{name}</subName><subFormat>{format}</subFormat>\
             <subHash>abc</subHash><subRating>{rating}</subRating></item>"
        )
    }

    pub fn gzip(content: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }
}
