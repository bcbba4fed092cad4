//! Subtitle lookup against a remote catalog.
//!
//! A movie file is identified by its [fingerprint](media::fingerprint) or,
//! failing that, by the title parsed from its [name](media::filename).
//! [`SearchEngine`] runs the lookup through an authenticated
//! [`SubtitleSession`] and keeps replies in a [`ResultCache`].

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod media;
pub mod workflows;

pub use domain::models::{Candidate, FileFingerprint, SearchOutcome};
pub use error::{Error, Result};
pub use infra::cache::ResultCache;
pub use infra::rpc::{HttpRpcTransport, RpcTransport};
pub use infra::session::{Credentials, SubtitleSession};
pub use workflows::query::{Query, ScoringWeights};
pub use workflows::search::SearchEngine;
