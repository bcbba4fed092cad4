use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::language::normalize_languages;
use crate::domain::models::{Candidate, FileFingerprint};
use crate::error::{Error, Result};
use crate::media::filename::{self, Category, FilenameMetadata};

/// Score assigned to candidates that must not be offered.
pub const EXCLUDED: f64 = -1.0;

/// Bonus per token a candidate shares with the movie file name.
///
/// The defaults are inherited tuning values, not derived ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub release_format: f64,
    pub group: f64,
    pub tv_term: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            release_format: 10.0,
            group: 10.0,
            tv_term: 100.0,
        }
    }
}

/// One search request, its cache key and its ranked results.
#[derive(Debug, Clone)]
pub struct Query {
    languages: Vec<String>,
    parameters: BTreeMap<String, String>,
    query_hash: String,
    movie_path: Option<PathBuf>,
    metadata: Option<FilenameMetadata>,
    weights: ScoringWeights,
    response: Option<Value>,
    results: Option<Vec<Candidate>>,
}

impl Query {
    pub fn by_fingerprint<S: AsRef<str>>(
        languages: &[S],
        fingerprint: &FileFingerprint,
        movie_path: &Path,
    ) -> Self {
        Self::new(
            languages,
            [
                ("moviehash", fingerprint.hash.clone()),
                ("moviebytesize", fingerprint.size.to_string()),
            ],
            Some(movie_path),
        )
    }

    pub fn by_title<S: AsRef<str>>(languages: &[S], title: &str, movie_path: Option<&Path>) -> Self {
        Self::new(languages, [("query", title.to_string())], movie_path)
    }

    fn new<S: AsRef<str>, const N: usize>(
        languages: &[S],
        fields: [(&str, String); N],
        movie_path: Option<&Path>,
    ) -> Self {
        let languages = normalize_languages(languages);
        let mut parameters = BTreeMap::new();
        parameters.insert("sublanguageid".to_string(), languages.join(","));
        for (key, value) in fields {
            parameters.insert(key.to_string(), value);
        }

        Self {
            query_hash: hash_parameters(&parameters),
            metadata: movie_path.map(|p| filename::parse(&p.to_string_lossy())),
            movie_path: movie_path.map(Path::to_path_buf),
            languages,
            parameters,
            weights: ScoringWeights::default(),
            response: None,
            results: None,
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Request body for the search call.
    pub fn parameters_json(&self) -> Value {
        Value::Object(
            self.parameters
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    pub fn query_hash(&self) -> &str {
        &self.query_hash
    }

    pub fn movie_path(&self) -> Option<&Path> {
        self.movie_path.as_deref()
    }

    pub fn metadata(&self) -> Option<&FilenameMetadata> {
        self.metadata.as_ref()
    }

    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    pub fn results(&self) -> &[Candidate] {
        self.results.as_deref().unwrap_or_default()
    }

    pub fn has_results(&self) -> bool {
        !self.results().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.results().get(index)
    }

    /// Attach a raw search reply and rank its records.
    ///
    /// Replacing an earlier response is allowed so a query can be refreshed.
    /// On error the query keeps its previous state.
    pub fn set_response(&mut self, response: Value) -> Result<()> {
        let records: &[Value] = match response.get("data") {
            Some(Value::Array(records)) => records.as_slice(),
            // The catalog answers `false` when nothing matched.
            None | Some(Value::Null) | Some(Value::Bool(false)) => &[],
            Some(other) => {
                return Err(Error::Parse(format!("search data is not a list: {other}")))
            }
        };

        let mut candidates = records
            .iter()
            .map(Candidate::from_record)
            .collect::<Result<Vec<_>>>()?;
        for candidate in &mut candidates {
            candidate.score = self.score(candidate);
        }
        candidates.retain(|c| c.score >= 0.0);

        let rank = |c: &Candidate| {
            self.languages
                .iter()
                .position(|l| *l == c.language)
                .unwrap_or(usize::MAX)
        };
        // Stable: equal candidates keep their reply order.
        candidates.sort_by(|a, b| rank(a).cmp(&rank(b)).then(b.score.total_cmp(&a.score)));

        self.results = Some(candidates);
        self.response = Some(response);
        Ok(())
    }

    pub fn score(&self, candidate: &Candidate) -> f64 {
        if !candidate.is_supported_format() {
            return EXCLUDED;
        }

        let Some(movie) = &self.metadata else {
            return candidate.rating;
        };

        if !candidate.metadata.title.eq_ignore_ascii_case(&movie.title)
            || candidate.metadata.get(Category::SeasonEpisode) != movie.get(Category::SeasonEpisode)
        {
            return EXCLUDED;
        }

        let overlap = |category| {
            shared_tokens(
                candidate.metadata.values(category),
                movie.values(category),
            )
        };
        let group_overlap = if candidate.metadata.group.is_empty() || movie.group.is_empty() {
            0
        } else {
            shared_tokens([candidate.metadata.group.as_str()], [movie.group.as_str()])
        };

        candidate.rating
            + self.weights.release_format * overlap(Category::ReleaseFormat) as f64
            + self.weights.group * group_overlap as f64
            + self.weights.tv_term * overlap(Category::TvTerm) as f64
    }
}

/// Digest of the sorted request fields; equal requests share a cache slot.
pub fn hash_parameters(parameters: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in parameters {
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn token_key(token: &str) -> String {
    token
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | '_' | ' ' | '\t' | '\n' | '[' | ']'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn shared_tokens<'a>(
    ours: impl IntoIterator<Item = &'a str>,
    theirs: impl IntoIterator<Item = &'a str>,
) -> usize {
    let ours: BTreeSet<String> = ours.into_iter().map(token_key).collect();
    let theirs: BTreeSet<String> = theirs.into_iter().map(token_key).collect();
    ours.intersection(&theirs).count()
}
