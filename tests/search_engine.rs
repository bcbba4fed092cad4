use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;

use subfetch::{
    Credentials, Error, ResultCache, RpcTransport, SearchEngine, SearchOutcome, SubtitleSession,
};

const SRT: &[u8] = b"1\n00:00:01,000 --> 00:00:04,000\nI do what I do best.\n";

/// In-memory catalog that records every call it receives.
struct ScriptedCatalog {
    by_hash: Value,
    by_title: Value,
    payload: String,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedCatalog {
    fn new(by_hash: Value, by_title: Value) -> Self {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SRT).unwrap();
        Self {
            by_hash,
            by_title,
            payload: STANDARD.encode(encoder.finish().unwrap()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    fn searches(&self) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == "SearchSubtitles")
            .map(|(_, params)| params[1][0].clone())
            .collect()
    }
}

impl RpcTransport for ScriptedCatalog {
    fn call(&self, method: &str, params: Vec<Value>) -> subfetch::Result<Value> {
        self.calls.lock().push((method.to_string(), params.clone()));
        match method {
            "LogIn" => Ok(json!({"status": "200 OK", "token": "tok"})),
            "SearchSubtitles" if params[1][0].get("moviehash").is_some() => {
                Ok(self.by_hash.clone())
            }
            "SearchSubtitles" => Ok(self.by_title.clone()),
            "DownloadSubtitles" => Ok(json!({
                "status": "200 OK",
                "data": [{"idsubtitlefile": params[1][0], "data": self.payload}],
            })),
            _ => Ok(json!({"status": "200 OK"})),
        }
    }
}

fn record(id: &str, name: &str, lang: &str, rating: &str) -> Value {
    json!({
        "IDSubtitle": id,
        "IDSubtitleFile": format!("file-{id}"),
        "SubFileName": name,
        "SubLanguageID": lang,
        "SubFormat": "srt",
        "SubRating": rating,
        "SubSize": "4096",
    })
}

fn found(records: Vec<Value>) -> Value {
    json!({"status": "200 OK", "data": records})
}

fn nothing() -> Value {
    json!({"status": "200 OK", "data": false})
}

fn engine(catalog: &Arc<ScriptedCatalog>, cache_dir: &Path) -> SearchEngine {
    let session = SubtitleSession::new(catalog.clone(), Credentials::anonymous("test agent"));
    SearchEngine::new(session, ResultCache::new(cache_dir))
}

fn movie(dir: &Path, size: usize) -> PathBuf {
    let path = dir.join("Heat.1995.1080p.BluRay-GRP.mkv");
    fs::write(&path, vec![0u8; size]).unwrap();
    path
}

fn ids(outcome: &SearchOutcome) -> Vec<String> {
    outcome
        .query()
        .map(|q| q.results().iter().map(|c| c.id.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn test_found_by_hash() {
    let temp_dir = TempDir::new().unwrap();
    let movie = movie(temp_dir.path(), 131_072);
    let catalog = Arc::new(ScriptedCatalog::new(
        found(vec![
            record("1", "Heat.1995.720p.HDTV-XYZ.srt", "eng", "5.0"),
            record("2", "Heat.1995.720p.BluRay-GRP.srt", "eng", "1.0"),
        ]),
        nothing(),
    ));
    let engine = engine(&catalog, &temp_dir.path().join("cache"));

    let outcome = engine.search(&["en"], Some(movie.as_path()), None, false).unwrap();

    assert!(matches!(outcome, SearchOutcome::FoundByHash(_)));
    // 1.0 + 10 (release format) + 10 (group) beats 5.0
    assert_eq!(ids(&outcome), vec!["2", "1"]);
    assert_eq!(catalog.methods(), vec!["LogIn", "SearchSubtitles"]);
    let params = &catalog.searches()[0];
    assert_eq!(params["moviehash"], "0000000000020000");
    assert_eq!(params["moviebytesize"], "131072");
    assert_eq!(params["sublanguageid"], "eng");
}

#[test]
fn test_falls_back_to_parsed_title() {
    let temp_dir = TempDir::new().unwrap();
    let movie = movie(temp_dir.path(), 131_072);
    let catalog = Arc::new(ScriptedCatalog::new(
        nothing(),
        found(vec![
            record("7", "Heat.1995.DVDRip-ABC.srt", "eng", "6.0"),
            record("8", "Heat.2.2020.srt", "eng", "9.0"),
        ]),
    ));
    let engine = engine(&catalog, &temp_dir.path().join("cache"));

    let outcome = engine.search(&["en"], Some(movie.as_path()), None, false).unwrap();

    assert!(matches!(outcome, SearchOutcome::FoundByTitle(_)));
    // A different title parsed from the subtitle name is excluded.
    assert_eq!(ids(&outcome), vec!["7"]);
    let searches = catalog.searches();
    assert_eq!(searches.len(), 2);
    assert_eq!(searches[1]["query"], "Heat 1995");
}

#[test]
fn test_explicit_title_wins_over_parsed_one() {
    let temp_dir = TempDir::new().unwrap();
    let movie = movie(temp_dir.path(), 131_072);
    let catalog = Arc::new(ScriptedCatalog::new(nothing(), nothing()));
    let engine = engine(&catalog, &temp_dir.path().join("cache"));

    let outcome = engine
        .search(&["en"], Some(movie.as_path()), Some("Heat (1995)"), false)
        .unwrap();

    match outcome {
        SearchOutcome::NotFound(Some(query)) => {
            assert_eq!(query.parameters()["query"], "Heat (1995)");
            assert!(!query.has_results());
        }
        other => panic!("expected a title query with no results, got {other:?}"),
    }
}

#[test]
fn test_small_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let movie = movie(temp_dir.path(), 100);
    let catalog = Arc::new(ScriptedCatalog::new(
        found(vec![record("1", "Heat.1995.srt", "eng", "1.0")]),
        found(vec![record("2", "Heat.1995.srt", "eng", "1.0")]),
    ));
    let engine = engine(&catalog, &temp_dir.path().join("cache"));

    let result = engine.search(&["en"], Some(movie.as_path()), None, false);

    assert!(matches!(result, Err(Error::TooSmall { size: 100, .. })));
    assert!(catalog.searches().is_empty());
    assert!(catalog.methods().is_empty());
}

#[test]
fn test_missing_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(ScriptedCatalog::new(nothing(), nothing()));
    let engine = engine(&catalog, &temp_dir.path().join("cache"));

    let gone = temp_dir.path().join("gone.mkv");
    let result = engine.search(&["en"], Some(gone.as_path()), None, false);
    assert!(matches!(result, Err(Error::Io { .. })));
    assert!(catalog.methods().is_empty());
}

#[test]
fn test_title_search_ranks_by_language_then_score() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(ScriptedCatalog::new(
        nothing(),
        found(vec![
            record("en-low", "Heat.srt", "eng", "2.0"),
            record("he", "Heat.srt", "heb", "1.0"),
            record("fr", "Heat.srt", "fre", "9.9"),
            record("en-high", "Heat.srt", "eng", "8.0"),
        ]),
    ));
    let engine = engine(&catalog, &temp_dir.path().join("cache"));

    let query = engine.search_by_title(&["he", "en"], "Heat", None, false).unwrap();

    let ranked: Vec<&str> = query.results().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ranked, vec!["he", "en-high", "en-low", "fr"]);
}

#[test]
fn test_cached_query_skips_network_until_refresh() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("cache");
    let first = Arc::new(ScriptedCatalog::new(
        nothing(),
        found(vec![record("1", "Heat.srt", "eng", "1.0")]),
    ));
    engine(&first, &cache_dir)
        .search_by_title(&["en"], "Heat", None, false)
        .unwrap();

    // A fresh engine over the same cache directory.
    let second = Arc::new(ScriptedCatalog::new(nothing(), nothing()));
    let engine = engine(&second, &cache_dir);

    let cached = engine.search_by_title(&["eng"], "Heat", None, false).unwrap();
    assert_eq!(cached.results().len(), 1);
    assert!(second.methods().is_empty());

    let refreshed = engine.search_by_title(&["eng"], "Heat", None, true).unwrap();
    assert!(!refreshed.has_results());
    assert_eq!(second.methods(), vec!["LogIn", "SearchSubtitles"]);
}

#[test]
fn test_corrupt_cached_query_is_refetched() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("cache");
    let catalog = Arc::new(ScriptedCatalog::new(
        nothing(),
        found(vec![record("1", "Heat.srt", "eng", "1.0")]),
    ));
    let engine = engine(&catalog, &cache_dir);
    let query_hash = engine
        .search_by_title(&["en"], "Heat", None, false)
        .unwrap()
        .query_hash()
        .to_string();

    fs::write(cache_dir.join("queries").join(&query_hash), b"{\"data\": 5}").unwrap();

    let query = engine.search_by_title(&["en"], "Heat", None, false).unwrap();
    assert_eq!(query.results().len(), 1);
    assert_eq!(catalog.searches().len(), 2);
}

#[test]
fn test_download_decodes_and_caches() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("cache");
    let catalog = Arc::new(ScriptedCatalog::new(nothing(), nothing()));
    let engine = engine(&catalog, &cache_dir);

    assert_eq!(engine.download_subtitle("1951976245", false).unwrap(), SRT);
    assert_eq!(
        fs::read(cache_dir.join("subtitles").join("1951976245")).unwrap(),
        SRT
    );

    assert_eq!(engine.download_subtitle("1951976245", false).unwrap(), SRT);
    assert_eq!(catalog.methods(), vec!["LogIn", "DownloadSubtitles"]);

    engine.download_subtitle("1951976245", true).unwrap();
    assert_eq!(
        catalog.methods(),
        vec!["LogIn", "DownloadSubtitles", "DownloadSubtitles"]
    );
}

#[test]
fn test_download_without_data_is_parse_error() {
    struct Empty;
    impl RpcTransport for Empty {
        fn call(&self, method: &str, _params: Vec<Value>) -> subfetch::Result<Value> {
            match method {
                "LogIn" => Ok(json!({"status": "200 OK", "token": "tok"})),
                _ => Ok(json!({"status": "200 OK", "data": []})),
            }
        }
    }
    let temp_dir = TempDir::new().unwrap();
    let session = SubtitleSession::new(Arc::new(Empty), Credentials::anonymous("test agent"));
    let engine = SearchEngine::new(session, ResultCache::new(temp_dir.path()));

    assert!(matches!(
        engine.download_subtitle("1", false),
        Err(Error::Parse(_))
    ));
}

#[test]
fn test_rejected_search_fails_after_retries() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(ScriptedCatalog::new(
        nothing(),
        json!({"status": "503 Service Unavailable"}),
    ));
    let engine = engine(&catalog, &temp_dir.path().join("cache"));

    let err = engine
        .search_by_title(&["en"], "Heat", None, false)
        .unwrap_err();
    assert!(matches!(err, Error::Query { attempts: 3, .. }));
    assert_eq!(catalog.searches().len(), 3);
    assert_eq!(
        catalog.methods().iter().filter(|m| *m == "LogIn").count(),
        3
    );
}
