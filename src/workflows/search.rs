use std::io::Read;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domain::models::SearchOutcome;
use crate::error::{Error, Result};
use crate::infra::cache::ResultCache;
use crate::infra::rpc::{METHOD_DOWNLOAD, METHOD_SEARCH};
use crate::infra::session::SubtitleSession;
use crate::media::filename;
use crate::media::fingerprint::fingerprint;
use crate::workflows::query::{Query, ScoringWeights};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Finds and fetches subtitles, going to the network only on cache misses.
pub struct SearchEngine {
    session: SubtitleSession,
    cache: ResultCache,
    weights: ScoringWeights,
}

impl SearchEngine {
    pub fn new(session: SubtitleSession, cache: ResultCache) -> Self {
        Self {
            session,
            cache,
            weights: ScoringWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn session(&self) -> &SubtitleSession {
        &self.session
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn search_by_fingerprint<S: AsRef<str>>(
        &self,
        languages: &[S],
        path: &Path,
        refresh: bool,
    ) -> Result<Query> {
        let fingerprint = fingerprint(path)?;
        info!(
            "Searching by file hash {} ({} bytes)",
            fingerprint.hash, fingerprint.size
        );
        let mut query =
            Query::by_fingerprint(languages, &fingerprint, path).with_weights(self.weights);
        self.execute_query(&mut query, refresh)?;
        Ok(query)
    }

    pub fn search_by_title<S: AsRef<str>>(
        &self,
        languages: &[S],
        title: &str,
        movie_path: Option<&Path>,
        refresh: bool,
    ) -> Result<Query> {
        info!("Searching by title {title:?}");
        let mut query = Query::by_title(languages, title, movie_path).with_weights(self.weights);
        self.execute_query(&mut query, refresh)?;
        Ok(query)
    }

    /// Hash search first when a file is known, then title search.
    ///
    /// Without an explicit `title` the search term parsed from the file name
    /// is used. A file that cannot be fingerprinted is an error, not a miss.
    pub fn search<S: AsRef<str>>(
        &self,
        languages: &[S],
        path: Option<&Path>,
        title: Option<&str>,
        refresh: bool,
    ) -> Result<SearchOutcome> {
        let mut last = None;

        if let Some(path) = path {
            let query = self.search_by_fingerprint(languages, path, refresh)?;
            if query.has_results() {
                return Ok(SearchOutcome::FoundByHash(query));
            }
            info!("No results by file hash, falling back to title search");
            last = Some(query);
        }

        let term = title
            .map(str::to_string)
            .or_else(|| path.map(|p| filename::parse(&p.to_string_lossy()).search_term))
            .filter(|term| !term.trim().is_empty());
        let Some(term) = term else {
            debug!("No title to search for");
            return Ok(SearchOutcome::NotFound(last));
        };

        let query = self.search_by_title(languages, &term, path, refresh)?;
        if query.has_results() {
            Ok(SearchOutcome::FoundByTitle(query))
        } else {
            Ok(SearchOutcome::NotFound(Some(query)))
        }
    }

    /// Fill `query` from the cache, or from the catalog on a miss.
    pub fn execute_query(&self, query: &mut Query, refresh: bool) -> Result<()> {
        let query_hash = query.query_hash().to_string();

        if !refresh {
            if let Some(response) = self.cache.read_query(&query_hash) {
                match query.set_response(response) {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        warn!("Cached response for {query_hash} is unusable: {e}");
                        self.cache.invalidate_query(&query_hash);
                    }
                }
            }
        }

        let parameters = query.parameters_json();
        let reply = self.session.execute(|transport, token| {
            transport.call(METHOD_SEARCH, vec![json!(token), json!([parameters])])
        })?;
        query.set_response(reply)?;
        info!("Found {} candidate(s)", query.results().len());

        if let Some(response) = query.response() {
            self.cache.write_query(&query_hash, response);
        }
        Ok(())
    }

    /// Subtitle file content for a catalog subtitle id.
    pub fn download_subtitle(&self, subtitle_id: &str, refresh: bool) -> Result<Vec<u8>> {
        if !refresh {
            if let Some(content) = self.cache.read_payload(subtitle_id) {
                return Ok(content);
            }
        }

        info!("Downloading subtitle {subtitle_id}");
        let reply = self.session.execute(|transport, token| {
            transport.call(METHOD_DOWNLOAD, vec![json!(token), json!([subtitle_id])])
        })?;

        let encoded = reply
            .get("data")
            .and_then(|data| data.get(0))
            .and_then(|entry| entry.get("data"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Parse("download reply has no subtitle data".to_string()))?;
        let content = decode_payload(encoded)?;
        debug!("Subtitle {subtitle_id} is {} bytes", content.len());

        self.cache.write_payload(subtitle_id, &content);
        Ok(content)
    }
}

/// Base64 text wrapping a gzip (or bare zlib) stream.
pub fn decode_payload(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let compressed = STANDARD
        .decode(compact)
        .map_err(|e| Error::Parse(format!("subtitle data is not base64: {e}")))?;

    let mut content = Vec::new();
    let result = if compressed.starts_with(&GZIP_MAGIC) {
        GzDecoder::new(compressed.as_slice()).read_to_end(&mut content)
    } else {
        ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut content)
    };
    result.map_err(|e| Error::Parse(format!("subtitle data does not decompress: {e}")))?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    const SRT: &[u8] = b"1\n00:00:01,000 --> 00:00:02,000\nHello\n";

    #[test]
    fn test_decode_gzip_payload() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SRT).unwrap();
        let encoded = STANDARD.encode(encoder.finish().unwrap());

        assert_eq!(decode_payload(&encoded).unwrap(), SRT);
    }

    #[test]
    fn test_decode_zlib_payload_with_line_breaks() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SRT).unwrap();
        let encoded = STANDARD.encode(encoder.finish().unwrap());
        let wrapped = format!("{}\n{}", &encoded[..10], &encoded[10..]);

        assert_eq!(decode_payload(&wrapped).unwrap(), SRT);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_payload("not base64!"), Err(Error::Parse(_))));
        let plain = STANDARD.encode(b"plain text, not compressed");
        assert!(matches!(decode_payload(&plain), Err(Error::Parse(_))));
    }
}
