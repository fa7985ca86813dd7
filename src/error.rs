//! Error types shared by the data, export and network layers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{service} authentication failed: {message}")]
    Auth {
        service: &'static str,
        message: String,
    },

    #[error("{service} request failed: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("{service} returned HTTP {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("unexpected {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("invalid game record {igdb_id}: {message}")]
    InvalidRecord { igdb_id: i64, message: String },

    #[error("GameTrack database not found: {0}")]
    DatabaseNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("nothing to do: pass --output-filename, --metrics-filename or --gh-repo")]
    NothingToDo,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn auth(service: &'static str, message: impl Into<String>) -> Self {
        Error::Auth {
            service,
            message: message.into(),
        }
    }

    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        Error::Decode {
            service,
            message: message.into(),
        }
    }

    /// Wrap a transport failure from the HTTP client
    pub fn network(service: &'static str, source: ureq::Error) -> Self {
        Error::Network {
            service,
            source: Box::new(source),
        }
    }

    /// Map a non-success HTTP status to `Auth` (401/403) or `Api`
    pub fn from_status(service: &'static str, status: u16, body: &str) -> Self {
        let message = summarize_body(body);
        match status {
            401 | 403 => Error::Auth { service, message },
            _ => Error::Api {
                service,
                status,
                message,
            },
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth { .. })
    }
}

/// GitHub and most JSON APIs put the reason in a `message` field
fn summarize_body(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().chars().take(200).collect(),
    }
}
