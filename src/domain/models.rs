use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::language::language_name;
use crate::error::{Error, Result};
use crate::media::filename::{self, FilenameMetadata};
use crate::workflows::query::Query;

pub const SUPPORTED_SUBTITLE_EXTENSIONS: &[&str] = &["asc", "sub", "srt", "smi", "ssa", "ass"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFingerprint {
    pub hash: String,
    pub size: u64,
}

/// One subtitle record returned by the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: String,
    pub file_id: String,
    pub file_name: String,
    pub language: String,
    pub format: String,
    pub rating: f64,
    pub size: u64,
    pub metadata: FilenameMetadata,
    /// Relevance; negative means excluded.
    pub score: f64,
}

impl Candidate {
    pub fn from_record(record: &Value) -> Result<Self> {
        let fields = record
            .as_object()
            .ok_or_else(|| Error::Parse(format!("subtitle record is not an object: {record}")))?;

        let file_name = text_field(fields, "SubFileName")?;
        let rating = text_field(fields, "SubRating")?;
        let rating: f64 = rating
            .parse()
            .map_err(|_| Error::Parse(format!("SubRating is not a number: {rating:?}")))?;
        let size = text_field(fields, "SubSize")?;
        let size: u64 = size
            .parse()
            .map_err(|_| Error::Parse(format!("SubSize is not a number: {size:?}")))?;

        Ok(Self {
            id: text_field(fields, "IDSubtitle")?,
            file_id: text_field(fields, "IDSubtitleFile")?,
            metadata: filename::parse(&file_name),
            file_name,
            language: text_field(fields, "SubLanguageID")?,
            format: text_field(fields, "SubFormat")?.to_lowercase(),
            rating,
            size,
            score: 0.0,
        })
    }

    pub fn is_supported_format(&self) -> bool {
        SUPPORTED_SUBTITLE_EXTENSIONS.contains(&self.format.as_str())
    }

    pub fn language_name(&self) -> &str {
        language_name(&self.language).unwrap_or(&self.language)
    }

    pub fn summary(&self) -> [String; 6] {
        [
            self.id.clone(),
            self.language_name().to_string(),
            self.file_name.clone(),
            self.format.clone(),
            format!("{:.1}", self.rating),
            format!("{:.2} KB", self.size as f64 / 1024.0),
        ]
    }
}

// The catalog sends most scalars as strings, but a bridge may not.
fn text_field(fields: &Map<String, Value>, key: &str) -> Result<String> {
    match fields.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(Error::Parse(format!("field {key} has unexpected value {other}"))),
        None => Err(Error::Parse(format!("missing field {key}"))),
    }
}

/// Which identification strategy produced the results.
#[derive(Debug)]
pub enum SearchOutcome {
    FoundByHash(Query),
    FoundByTitle(Query),
    /// Every strategy came back empty; holds the last query tried, if any.
    NotFound(Option<Query>),
}

impl SearchOutcome {
    pub fn query(&self) -> Option<&Query> {
        match self {
            Self::FoundByHash(q) | Self::FoundByTitle(q) => Some(q),
            Self::NotFound(q) => q.as_ref(),
        }
    }

    pub fn into_query(self) -> Option<Query> {
        match self {
            Self::FoundByHash(q) | Self::FoundByTitle(q) => Some(q),
            Self::NotFound(q) => q,
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Self::FoundByHash(_) => "file hash",
            Self::FoundByTitle(_) => "title",
            Self::NotFound(_) => "none",
        }
    }
}
