use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info, info_span};

use crate::config::Settings;
use crate::domain::language::Language;
use crate::domain::models::VideoFile;
use crate::error::{self, Disposition, Error};
use crate::infra::guess::{FilenameGuesser, MetadataGuesser};
use crate::infra::proxy::ProxyPool;
use crate::providers::bsplayer::{BsPlayer, BsPlayerSettings};
use crate::providers::subdivx::{Subdivx, SubdivxSettings};
use crate::workflows::scanner::FileScanner;

/// Result of handing one file to a provider.
#[derive(Debug)]
pub enum FileOutcome {
    Downloaded(PathBuf),
    Skipped(Error),
    /// The provider cannot go on; the rest of the worklist is left alone.
    SessionFatal(Error),
}

impl From<error::Result<PathBuf>> for FileOutcome {
    fn from(result: error::Result<PathBuf>) -> Self {
        match result {
            Ok(path) => FileOutcome::Downloaded(path),
            Err(err) => match err.disposition() {
                Disposition::Skip => FileOutcome::Skipped(err),
                Disposition::AbortSession => FileOutcome::SessionFatal(err),
            },
        }
    }
}

/// Hands every file to `download` in order and drops the ones that got a
/// subtitle. Stops at the first session-fatal error.
pub fn process_worklist(
    worklist: &mut Vec<VideoFile>,
    mut download: impl FnMut(&VideoFile) -> error::Result<PathBuf>,
) -> error::Result<()> {
    let mut index = 0;
    while index < worklist.len() {
        let video = &worklist[index];
        match FileOutcome::from(download(video)) {
            FileOutcome::Downloaded(path) => {
                info!("Subtitle saved to {}", path.display());
                worklist.remove(index);
            }
            FileOutcome::Skipped(err) => {
                report_skip(video, &err);
                index += 1;
            }
            FileOutcome::SessionFatal(err) => return Err(err),
        }
    }
    Ok(())
}

fn report_skip(video: &VideoFile, err: &Error) {
    match err {
        Error::SubtitlesNotFound { .. } => error!("{err}"),
        Error::TooManyTries { .. } => {
            error!("Request failed - too many tries for {}", video.path.display())
        }
        _ => error!("{err} for {}", video.path.display()),
    }
}

fn report_pending(worklist: &[VideoFile]) {
    if !worklist.is_empty() {
        info!("{} file(s) still pending to be subtitled", worklist.len());
    }
}

pub fn run_bsplayer(
    worklist: &mut Vec<VideoFile>,
    settings: BsPlayerSettings,
    proxy_pool: Option<&dyn ProxyPool>,
    guesser: &dyn MetadataGuesser,
    language: &Language,
) {
    if worklist.is_empty() {
        return;
    }
    let span = info_span!("bsplayer");
    let _enter = span.enter();

    let result = BsPlayer::new(settings, proxy_pool, guesser).and_then(|mut bsplayer| {
        bsplayer.run(|bsplayer| {
            process_worklist(worklist, |video| bsplayer.download_by_path(video, language))
        })
    });
    match result {
        Ok(()) => {}
        Err(Error::TooManyTries { operation }) => {
            error!("Session failed - too many tries for {operation}")
        }
        Err(Error::LoginFailed | Error::LogoutFailed) => error!("BS.Player failed"),
        Err(err) => error!("Unknown error: {err}"),
    }
    report_pending(worklist);
}

pub fn run_subdivx(
    worklist: &mut Vec<VideoFile>,
    settings: SubdivxSettings,
    proxy_pool: Option<&dyn ProxyPool>,
    guesser: &dyn MetadataGuesser,
) {
    if worklist.is_empty() {
        return;
    }
    let span = info_span!("subdivx");
    let _enter = span.enter();

    let result = Subdivx::open(settings, proxy_pool, guesser).and_then(|subdivx| {
        process_worklist(worklist, |video| subdivx.download_by_path(video))
    });
    if let Err(err) = result {
        error!("Unknown error: {err}");
    }
    report_pending(worklist);
}

/// Scans the search folder and lets each provider try the files still
/// lacking a subtitle.
pub fn run(settings: &Settings) -> Result<()> {
    info!("Subtitles Downloader started");

    let language = settings.language()?;
    info!(
        "Looking for {} subtitles in {}",
        language.name(),
        settings.search_folder.display()
    );
    let mut scanner = FileScanner::new(&settings.search_folder, settings.scan_options(language));
    let mut worklist = scanner.qualified_files().to_vec();

    if !worklist.is_empty() {
        let proxy_pool = settings.proxy_pool();
        if let Some(pool) = &proxy_pool {
            info!("Using a pool of {} proxies", pool.len());
        }
        let proxy_pool = proxy_pool.as_ref().map(|pool| pool as &dyn ProxyPool);
        let guesser = FilenameGuesser;

        run_bsplayer(
            &mut worklist,
            settings.bsplayer_settings(),
            proxy_pool,
            &guesser,
            &language,
        );
        run_subdivx(
            &mut worklist,
            settings.subdivx_settings(),
            proxy_pool,
            &guesser,
        );
    }

    info!("Subtitles Downloader finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fingerprint::Fingerprint;
    use crate::providers::bsplayer::fixtures::{gzip, item, search_response, status_response};
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn video(path: &str) -> VideoFile {
        VideoFile {
            path: PathBuf::from(path),
            size: 0,
            modified: SystemTime::now(),
        }
    }

    fn paths(worklist: &[VideoFile]) -> Vec<&Path> {
        worklist.iter().map(|video| video.path.as_path()).collect()
    }

    #[test]
    fn test_outcome_from_result() {
        assert!(matches!(
            FileOutcome::from(Ok(PathBuf::from("a.es.srt"))),
            FileOutcome::Downloaded(_)
        ));
        assert!(matches!(
            FileOutcome::from(Err(Error::subtitles_not_found("a.mkv"))),
            FileOutcome::Skipped(_)
        ));
        assert!(matches!(
            FileOutcome::from(Err(Error::NotLoggedIn)),
            FileOutcome::SessionFatal(_)
        ));
    }

    #[test]
    fn test_successes_leave_the_worklist() {
        let mut worklist = vec![video("/a.mkv"), video("/b.mkv"), video("/c.mkv")];
        let mut seen = Vec::new();
        process_worklist(&mut worklist, |video| {
            seen.push(video.path.clone());
            if video.path == Path::new("/b.mkv") {
                Err(Error::ServiceUnavailable("Bad status code: 500".to_string()))
            } else {
                Ok(video.path.with_extension("es.srt"))
            }
        })
        .unwrap();

        assert_eq!(seen.len(), 3);
        assert_eq!(paths(&worklist), vec![Path::new("/b.mkv")]);
    }

    #[test]
    fn test_session_fatal_error_stops_processing() {
        let mut worklist = vec![video("/a.mkv"), video("/b.mkv"), video("/c.mkv")];
        let mut calls = 0;
        let result = process_worklist(&mut worklist, |video| {
            calls += 1;
            if video.path == Path::new("/a.mkv") {
                Ok(PathBuf::from("/a.es.srt"))
            } else {
                Err(Error::NotLoggedIn)
            }
        });

        assert!(matches!(result, Err(Error::NotLoggedIn)));
        assert_eq!(calls, 2);
        assert_eq!(
            paths(&worklist),
            vec![Path::new("/b.mkv"), Path::new("/c.mkv")]
        );
    }

    #[test]
    fn test_failed_login_keeps_worklist_for_next_provider() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).body_contains("<ns1:logIn>");
            then.status(200).body(status_response("logIn", "Error", ""));
        });
        let mut worklist = vec![video("/a.mkv"), video("/b.mkv")];

        run_bsplayer(
            &mut worklist,
            BsPlayerSettings {
                endpoints: vec![server.url("/v1.php")],
                timeout: Duration::from_secs(5),
                tries: 2,
            },
            None,
            &FilenameGuesser,
            &Language::from_code("spa").unwrap(),
        );
        assert_eq!(worklist.len(), 2);
    }

    #[test]
    fn test_end_to_end_indexed_download() {
        let temp_dir = TempDir::new().unwrap();
        let video_path = temp_dir.path().join("name.mkv");
        let content: Vec<u8> = (0..5 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        fs::write(&video_path, content).unwrap();
        let hash = Fingerprint::of_file(&video_path).unwrap().to_string();

        let rpc = MockServer::start();
        let login = rpc.mock(|when, then| {
            when.method(POST).body_contains("<ns1:logIn>");
            then.status(200).body(status_response("logIn", "OK", "tok"));
        });
        let items = format!(
            "{}{}",
            item("1", "name-X.srt", "srt", 4, &rpc.url("/sub/1.gz")),
            item("2", "name-X.sub", "sub", 9, &rpc.url("/sub/2.gz")),
        );
        rpc.mock(|when, then| {
            when.method(POST)
                .body_contains("<ns1:searchSubtitles>")
                .body_contains(format!("<movieHash>{hash}</movieHash>"));
            then.status(200).body(search_response("OK", &items));
        });
        let srt = rpc.mock(|when, then| {
            when.method(GET).path("/sub/1.gz");
            then.status(200).body(gzip(b"1\n00:00:01,000 --> 00:00:02,000\nHola\n"));
        });
        let logout = rpc.mock(|when, then| {
            when.method(POST).body_contains("<ns1:logOut>");
            then.status(200).body(status_response("logOut", "OK", ""));
        });

        let scrape = MockServer::start();
        let scrape_search = scrape.mock(|when, then| {
            when.method(GET).path("/index.php");
            then.status(200).body("<html></html>");
        });

        let settings = Settings {
            search_folder: temp_dir.path().to_path_buf(),
            age_days: None,
            embedded: false,
            file_log: false,
            use_proxy: false,
            rpc_tries: 1,
            rpc_endpoints: vec![rpc.url("/v1.php")],
            scrape_base_url: scrape.url("/"),
            ..Settings::default()
        };
        run(&settings).unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("name.es.srt")).unwrap(),
            "1\n00:00:01,000 --> 00:00:02,000\nHola\n"
        );
        login.assert_hits(1);
        srt.assert_hits(1);
        logout.assert_hits(1);
        // Nothing was left for the second provider
        scrape_search.assert_hits(0);
    }

    #[test]
    fn test_leftovers_go_to_scrape_provider() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Show.S01E02.720p-GROUPX.mkv"), vec![1u8; 1000]).unwrap();

        let rpc = MockServer::start();
        rpc.mock(|when, then| {
            when.method(POST).body_contains("<ns1:logIn>");
            then.status(200).body(status_response("logIn", "OK", "tok"));
        });
        let logout = rpc.mock(|when, then| {
            when.method(POST).body_contains("<ns1:logOut>");
            then.status(200).body(status_response("logOut", "OK", ""));
        });

        let scrape = MockServer::start();
        let scrape_search = scrape.mock(|when, then| {
            when.method(GET)
                .path("/index.php")
                .query_param("buscar", "Show S01E02");
            then.status(200).body("<html></html>");
        });

        let settings = Settings {
            search_folder: temp_dir.path().to_path_buf(),
            age_days: None,
            embedded: false,
            file_log: false,
            use_proxy: false,
            rpc_endpoints: vec![rpc.url("/v1.php")],
            scrape_base_url: scrape.url("/"),
            ..Settings::default()
        };
        run(&settings).unwrap();

        // Too small to fingerprint, so only the scraper can help
        logout.assert_hits(1);
        scrape_search.assert_hits(1);
        assert!(!temp_dir.path().join("Show.S01E02.720p-GROUPX.es.srt").exists());
    }
}
