use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::cli::Cli;
use crate::domain::language::Language;
use crate::infra::proxy::CyclicProxyPool;
use crate::providers::bsplayer::{default_endpoints, BsPlayerSettings};
use crate::providers::subdivx::{SubdivxSettings, DEFAULT_BASE_URL, PAGE_THROTTLE};
use crate::workflows::scanner::ScanOptions;

const SEARCH_FOLDER_ENV: &str = "SUBTITLES_SEARCH_FOLDER";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search_folder: PathBuf,
    /// Only files modified within this many days are searched.
    pub age_days: Option<u64>,
    /// Skip matroska files that already carry the language in a track.
    pub embedded: bool,
    pub language: String,
    pub rpc_timeout_secs: u64,
    pub rpc_tries: u32,
    pub scrape_timeout_secs: u64,
    pub verbose: bool,
    pub file_log: bool,
    pub file_log_folder: PathBuf,
    pub use_proxy: bool,
    /// `host:port` addresses handed out in turn to provider sessions.
    pub proxies: Vec<String>,
    pub rpc_endpoints: Vec<String>,
    pub scrape_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_folder: PathBuf::from("."),
            age_days: Some(5),
            embedded: true,
            language: "spa".to_string(),
            rpc_timeout_secs: 5,
            rpc_tries: 5,
            scrape_timeout_secs: 60,
            verbose: false,
            file_log: true,
            file_log_folder: PathBuf::from("logs"),
            use_proxy: true,
            proxies: Vec::new(),
            rpc_endpoints: default_endpoints(),
            scrape_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Reads the config file (if any), then the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path(), env::var(SEARCH_FOLDER_ENV).ok())
    }

    fn load_from(config_path: &Path, search_folder: Option<String>) -> Result<Self> {
        let mut settings = if config_path.exists() {
            debug!("Using config file {}", config_path.display());
            let content = fs::read_to_string(config_path)?;
            toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?
        } else {
            Settings::default()
        };

        if let Some(folder) = search_folder {
            settings.search_folder = PathBuf::from(folder);
        }
        Ok(settings)
    }

    /// A folder given on the command line means an ad-hoc run: every file
    /// regardless of age, embedded tracks checked, output on the console.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(folder) = &cli.folder {
            self.search_folder = folder.clone();
            self.age_days = None;
            self.embedded = true;
            self.verbose = true;
        }
        if cli.no_proxy {
            self.use_proxy = false;
        }
        if cli.verbose {
            self.verbose = true;
        }
    }

    pub fn language(&self) -> Result<Language> {
        match Language::from_code(&self.language) {
            Some(language) => Ok(language),
            None => bail!("Unknown language code: {}", self.language),
        }
    }

    pub fn scan_options(&self, language: Language) -> ScanOptions {
        ScanOptions {
            language,
            max_age: self
                .age_days
                .map(|days| Duration::from_secs(days * SECONDS_PER_DAY)),
            embedded: self.embedded,
        }
    }

    pub fn bsplayer_settings(&self) -> BsPlayerSettings {
        BsPlayerSettings {
            endpoints: self.rpc_endpoints.clone(),
            timeout: Duration::from_secs(self.rpc_timeout_secs),
            tries: self.rpc_tries,
        }
    }

    pub fn subdivx_settings(&self) -> SubdivxSettings {
        SubdivxSettings {
            base_url: self.scrape_base_url.clone(),
            timeout: Duration::from_secs(self.scrape_timeout_secs),
            throttle: PAGE_THROTTLE,
        }
    }

    /// `None` when proxying is off or no addresses are configured.
    pub fn proxy_pool(&self) -> Option<CyclicProxyPool> {
        if !self.use_proxy {
            return None;
        }
        CyclicProxyPool::new(self.proxies.clone())
    }

    pub fn log_folder(&self) -> Option<&Path> {
        self.file_log.then_some(self.file_log_folder.as_path())
    }
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("subtitles-downloader"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}
