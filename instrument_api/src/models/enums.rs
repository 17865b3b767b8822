use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of instrument types the service accepts.
///
/// Serialized with the exact spelling the REST API uses (`"Equity"`, `"ETF"`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstrumentType {
    Equity,
    Bond,
    #[serde(rename = "ETF")]
    Etf,
    Future,
}

impl InstrumentType {
    /// Every variant, in declaration order.
    pub const ALL: [InstrumentType; 4] = [
        InstrumentType::Equity,
        InstrumentType::Bond,
        InstrumentType::Etf,
        InstrumentType::Future,
    ];

    /// Wire spelling of the variant.
    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentType::Equity => "Equity",
            InstrumentType::Bond => "Bond",
            InstrumentType::Etf => "ETF",
            InstrumentType::Future => "Future",
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown instrument type `{0}` (expected one of Equity, Bond, ETF, Future)")]
pub struct UnknownInstrumentType(pub String);

impl FromStr for InstrumentType {
    type Err = UnknownInstrumentType;

    /// Case-insensitive, so CLI input like `etf` or `equity` works.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        InstrumentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownInstrumentType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_api() {
        let json = serde_json::to_string(&InstrumentType::Etf).unwrap();
        assert_eq!(json, "\"ETF\"");
        let back: InstrumentType = serde_json::from_str("\"Future\"").unwrap();
        assert_eq!(back, InstrumentType::Future);
        assert!(serde_json::from_str::<InstrumentType>("\"Option\"").is_err());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("etf".parse::<InstrumentType>().unwrap(), InstrumentType::Etf);
        assert_eq!(" Equity ".parse::<InstrumentType>().unwrap(), InstrumentType::Equity);
        assert!("stock".parse::<InstrumentType>().is_err());
    }
}
