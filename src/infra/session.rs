use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::infra::rpc::{reply_status, RpcTransport, METHOD_LOG_IN, METHOD_NO_OPERATION, STATUS_OK};

pub const DEFAULT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Interface language reported at login.
    pub language: String,
    pub user_agent: String,
}

impl Credentials {
    pub fn anonymous(user_agent: impl Into<String>) -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            language: "eng".to_string(),
            user_agent: user_agent.into(),
        }
    }
}

/// Authenticated access to the catalog.
///
/// Holds the session token behind a single lock. Any failed call discards
/// the token, so the next attempt logs in from scratch.
pub struct SubtitleSession {
    transport: Arc<dyn RpcTransport>,
    credentials: Credentials,
    token: Mutex<Option<String>>,
    attempts: usize,
}

impl SubtitleSession {
    pub fn new(transport: Arc<dyn RpcTransport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            token: Mutex::new(None),
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.lock().is_some()
    }

    /// Return a usable token, logging in if none is held.
    ///
    /// With `force_validate` an existing token is first checked with a
    /// no-op call and replaced if the catalog rejects it.
    pub fn login(&self, force_validate: bool) -> Result<String> {
        let mut token = self.token.lock();

        if let Some(current) = token.as_deref() {
            if !force_validate || self.validate(current) {
                return Ok(current.to_string());
            }
            info!("Session token is no longer valid, logging in again");
            *token = None;
        }

        let reply = self.transport.call(
            METHOD_LOG_IN,
            vec![
                json!(self.credentials.username),
                json!(self.credentials.password),
                json!(self.credentials.language),
                json!(self.credentials.user_agent),
            ],
        )?;

        match reply_status(&reply) {
            Some(STATUS_OK) => {}
            status => {
                return Err(Error::Auth(format!(
                    "login returned status {}",
                    status.unwrap_or("<missing>")
                )))
            }
        }

        let issued = reply
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth("login reply carried no token".to_string()))?;

        info!("Logged in to subtitle catalog");
        *token = Some(issued.to_string());
        Ok(issued.to_string())
    }

    pub fn logout(&self) {
        if self.token.lock().take().is_some() {
            debug!("Discarded session token");
        }
    }

    /// Discard the held token only if it is still `token`.
    ///
    /// A call that failed with an old token must not throw away a token
    /// another caller obtained in the meantime.
    pub fn logout_if(&self, token: &str) {
        let mut current = self.token.lock();
        if current.as_deref() == Some(token) {
            *current = None;
            debug!("Discarded session token");
        }
    }

    /// Run `call` with a valid token, retrying with a fresh login on failure.
    ///
    /// A reply whose status is not the success status counts as a failure.
    pub fn execute<F>(&self, call: F) -> Result<Value>
    where
        F: Fn(&dyn RpcTransport, &str) -> Result<Value>,
    {
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            let mut used = None;
            let result = self.login(false).and_then(|token| {
                let reply = call(self.transport.as_ref(), &token).and_then(check_status);
                used = Some(token);
                reply
            });

            match result {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    warn!("Attempt {attempt}/{} failed: {e}", self.attempts);
                    match used {
                        Some(token) => self.logout_if(&token),
                        None => self.logout(),
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(Error::Query {
            attempts: self.attempts,
            source: Box::new(
                last_error.unwrap_or_else(|| Error::Status("no attempt was made".to_string())),
            ),
        })
    }

    fn validate(&self, token: &str) -> bool {
        match self
            .transport
            .call(METHOD_NO_OPERATION, vec![json!(token)])
            .and_then(check_status)
        {
            Ok(_) => true,
            Err(e) => {
                warn!("Token validation failed: {e}");
                false
            }
        }
    }
}

fn check_status(reply: Value) -> Result<Value> {
    match reply_status(&reply) {
        Some(STATUS_OK) => Ok(reply),
        status => Err(Error::Status(status.unwrap_or("<missing>").to_string())),
    }
}
