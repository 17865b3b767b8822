use thiserror::Error;

use crate::models::instrument::InstrumentId;

/// The unified error type every [`InstrumentStore`](crate::store::InstrumentStore) reports.
///
/// The variant decides the message shown to the user. Recovery is identical for
/// all of them: the client session rolls back its optimistic state and re-fetches.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The payload was rejected (HTTP 4xx other than 404, or failed pre-validation).
    #[error("Validation failed: {}", message.as_deref().unwrap_or("payload rejected"))]
    Validation {
        /// Server- or validator-supplied explanation, if any.
        message: Option<String>,
    },

    /// The instrument does not exist (HTTP 404).
    #[error("Instrument {id} not found")]
    NotFound {
        /// The id that was looked up.
        id: InstrumentId,
    },

    /// No usable response: connection failure, timeout, or an undecodable body.
    #[error("Transport failure: {message}")]
    Transport {
        /// Low-level description, for logs.
        message: String,
    },

    /// The server answered with a 5xx status.
    #[error("Server error {status}: {}", message.as_deref().unwrap_or("no details"))]
    Server {
        /// HTTP status code.
        status: u16,
        /// The server's `detail`, if it sent one.
        message: Option<String>,
    },
}

/// Result alias used by all store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Build a [`StoreError::Validation`] carrying `message`.
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation {
            message: Some(message.into()),
        }
    }

    /// Build a [`StoreError::Transport`] carrying `message`.
    pub fn transport(message: impl Into<String>) -> Self {
        StoreError::Transport {
            message: message.into(),
        }
    }

    /// `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Text suitable for showing to an end user.
    ///
    /// Server-supplied messages are passed through verbatim; otherwise a
    /// generic sentence per kind is used. Transport details never leak.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Validation { message: Some(m) } => m.clone(),
            StoreError::Validation { message: None } => {
                "The instrument data was rejected. Please review the fields and try again.".into()
            }
            StoreError::NotFound { id } => format!("Instrument {id} no longer exists."),
            StoreError::Transport { .. } => {
                "Could not reach the instrument service. Please try again.".into()
            }
            StoreError::Server {
                message: Some(m), ..
            } => m.clone(),
            StoreError::Server { message: None, .. } => {
                "The instrument service failed to process the request.".into()
            }
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_messages_pass_through() {
        let err = StoreError::validation("ISIN already exists");
        assert_eq!(err.user_message(), "ISIN already exists");
        let err = StoreError::Server {
            status: 500,
            message: Some("Error retrieving instruments: disk full".into()),
        };
        assert_eq!(err.user_message(), "Error retrieving instruments: disk full");
    }

    #[test]
    fn transport_details_stay_out_of_user_message() {
        let err = StoreError::transport("error sending request for url (http://x): connection refused");
        assert!(!err.user_message().contains("connection refused"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn not_found_names_the_id() {
        let err = StoreError::NotFound { id: InstrumentId(42) };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Instrument 42 not found");
    }
}
