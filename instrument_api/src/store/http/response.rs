use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::{errors::StoreError, models::instrument::InstrumentId};

/// Error envelope the server sends with any non-2xx status.
///
/// `detail` is a plain string for handled errors and an array of
/// `{loc, msg, type}` objects for request validation failures (422).
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct FieldError {
    #[serde(default)]
    loc: Vec<Value>,
    msg: String,
}

/// Human-readable message out of an error body, if one can be found.
pub fn server_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Array(items) => {
            let msgs: Vec<String> = items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<FieldError>(item).ok())
                .map(|fe| match fe.loc.last() {
                    Some(Value::String(field)) => format!("{field}: {}", fe.msg),
                    _ => fe.msg,
                })
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}

/// Map a non-success response onto the store error taxonomy.
///
/// `id` is the instrument the request addressed, used for 404s. A 404 on the
/// collection (no id) can't name an instrument and is treated as a server
/// fault.
pub fn classify_failure(status: StatusCode, body: &str, id: Option<InstrumentId>) -> StoreError {
    let message = server_message(body);
    match (status, id) {
        (StatusCode::NOT_FOUND, Some(id)) => StoreError::NotFound { id },
        (s, _) if s.is_client_error() && s != StatusCode::NOT_FOUND => StoreError::Validation { message },
        (s, _) => StoreError::Server {
            status: s.as_u16(),
            message,
        },
    }
}
