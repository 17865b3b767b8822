use serde::{Deserialize, Serialize};

use crate::models::enums::InstrumentType;

/// Default page size the server applies when `limit` is omitted.
pub const DEFAULT_LIMIT: u32 = 100;
/// Largest `limit` the server accepts.
pub const MAX_LIMIT: u32 = 1000;

/// Server-side parameters for the LIST call.
///
/// The server answers with a flat array and no total count, so callers that
/// need "all rows" ask for [`MAX_LIMIT`] and filter/paginate on the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    pub instrument_type: Option<InstrumentType>,
    pub sector: Option<String>,
    pub country: Option<String>,
    /// Maximum number of rows (1..=1000).
    pub limit: u32,
    /// Rows to skip.
    pub offset: u32,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            instrument_type: None,
            sector: None,
            country: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ListFilter {
    /// Query-string pairs, omitting unset filters. `limit` is clamped to the
    /// server's accepted range.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(t) = self.instrument_type {
            pairs.push(("instrument_type", t.as_str().to_string()));
        }
        if let Some(s) = &self.sector {
            pairs.push(("sector", s.clone()));
        }
        if let Some(c) = &self.country {
            pairs.push(("country", c.clone()));
        }
        pairs.push(("limit", self.limit.clamp(1, MAX_LIMIT).to_string()));
        pairs.push(("offset", self.offset.to_string()));
        pairs
    }
}
