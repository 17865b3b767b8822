//! Canonical in-memory representation of one financial instrument record.
//!
//! Three shapes travel over the wire:
//! - [`NewInstrument`]: the create payload (every client-editable field).
//! - [`InstrumentPatch`]: the update payload; only `Some` fields are sent and applied.
//! - [`Instrument`]: what the server returns, i.e. the editable fields plus the
//!   server-assigned id and timestamps.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enums::InstrumentType;

/// Identifier of an instrument.
///
/// Ids assigned by the server are strictly positive. The client uses strictly
/// negative values as placeholders while a create is in flight, so the two
/// spaces can never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(pub i64);

impl InstrumentId {
    /// `true` for client-side placeholder ids (never sent to the server).
    pub fn is_temporary(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every client-editable attribute of an instrument. Also the create payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewInstrument {
    /// Short trading name (e.g. "AAPL").
    pub short_name: String,
    /// Full legal name (e.g. "Apple Inc.").
    pub full_name: String,
    /// International Securities Identification Number (ISO 6166).
    pub isin: Option<String>,

    pub instrument_type: InstrumentType,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,

    /// Currency of the instrument's home market (ISO 4217).
    pub original_currency: String,
    /// Currency interest/dividends are paid in (ISO 4217).
    pub interest_currency: String,
    pub statistical_currency: Option<String>,

    /// Interest rate in percent (2.5 means 2.5%).
    pub interest_rate: Option<f64>,
    /// Interest payment period in days.
    pub interest_period: Option<i32>,

    pub last_price: Option<f64>,
    pub last_price_date: Option<NaiveDate>,

    pub issue_date: Option<NaiveDate>,
    /// Expiration / maturity date for derivatives and bonds.
    pub expiration_date: Option<NaiveDate>,
    pub first_call_date: Option<NaiveDate>,
    pub first_call_percentage: Option<f64>,

    pub coupon_date_0: Option<NaiveDate>,
    pub coupon_date_1: Option<NaiveDate>,
    pub coupon_date_2: Option<NaiveDate>,
    pub coupon_date_3: Option<NaiveDate>,

    pub preferred_exchange: Option<String>,
    /// Excluded exchanges. The API spells the field `restriced_exchange`.
    #[serde(rename = "restriced_exchange")]
    pub restricted_exchange: Option<String>,
    pub contract_size: Option<i64>,
    pub initial_margin: Option<f64>,

    pub telekurs_symbol: Option<String>,
    /// Reuters Instrument Code.
    pub reuters_symbol: Option<String>,
    pub yahoo_symbol: Option<String>,

    /// Sector allocation breakdown, JSON encoded by convention.
    pub sector_allocation: Option<String>,

    pub free_text_0: Option<String>,
    pub free_text_1: Option<String>,
    pub free_text_2: Option<String>,
    pub free_text_3: Option<String>,

    pub metadata_json: Option<String>,
}

impl NewInstrument {
    /// A payload with only the required fields set.
    pub fn new(
        short_name: impl Into<String>,
        full_name: impl Into<String>,
        instrument_type: InstrumentType,
        original_currency: impl Into<String>,
        interest_currency: impl Into<String>,
    ) -> Self {
        Self {
            short_name: short_name.into(),
            full_name: full_name.into(),
            isin: None,
            instrument_type,
            sector: None,
            industry: None,
            country: None,
            original_currency: original_currency.into(),
            interest_currency: interest_currency.into(),
            statistical_currency: None,
            interest_rate: None,
            interest_period: None,
            last_price: None,
            last_price_date: None,
            issue_date: None,
            expiration_date: None,
            first_call_date: None,
            first_call_percentage: None,
            coupon_date_0: None,
            coupon_date_1: None,
            coupon_date_2: None,
            coupon_date_3: None,
            preferred_exchange: None,
            restricted_exchange: None,
            contract_size: None,
            initial_margin: None,
            telekurs_symbol: None,
            reuters_symbol: None,
            yahoo_symbol: None,
            sector_allocation: None,
            free_text_0: None,
            free_text_1: None,
            free_text_2: None,
            free_text_3: None,
            metadata_json: None,
        }
    }

    /// Exchange-specific tickers that are set, in a fixed order.
    pub fn exchange_symbols(&self) -> impl Iterator<Item = &str> {
        [
            self.yahoo_symbol.as_deref(),
            self.reuters_symbol.as_deref(),
            self.telekurs_symbol.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// An instrument as returned by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    #[serde(rename = "instrument_id")]
    pub id: InstrumentId,

    #[serde(flatten)]
    pub attrs: NewInstrument,

    #[serde(with = "crate::models::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Instrument {
    /// Local stand-in for a create that hasn't been confirmed yet.
    pub fn speculative(id: InstrumentId, attrs: &NewInstrument, now: DateTime<Utc>) -> Self {
        Self {
            id,
            attrs: attrs.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A copy of `self` with `patch` applied and `updated_at` refreshed.
    ///
    /// An empty patch leaves the record untouched, timestamp included, which
    /// matches what the server does for a no-op update.
    pub fn merged(&self, patch: &InstrumentPatch, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        if patch.is_empty() {
            return next;
        }
        patch.apply_to(&mut next.attrs);
        next.updated_at = now;
        next
    }
}

/// Partial update payload. `None` means "leave as is"; only `Some` fields are sent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_type: Option<InstrumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistical_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_period: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_call_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_call_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_date_0: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_date_1: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_date_2: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_date_3: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_exchange: Option<String>,
    #[serde(rename = "restriced_exchange", skip_serializing_if = "Option::is_none")]
    pub restricted_exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telekurs_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reuters_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yahoo_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_allocation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_0: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_json: Option<String>,
}

// Copies every `Some` field of the patch onto the target. Required fields are
// plain values on the target, optional ones are wrapped back into `Some`.
macro_rules! apply_patch {
    ($patch:expr, $target:expr;
     required: [$($req:ident),* $(,)?];
     optional: [$($opt:ident),* $(,)?]) => {
        $( if let Some(v) = &$patch.$req { $target.$req = v.clone(); } )*
        $( if let Some(v) = &$patch.$opt { $target.$opt = Some(v.clone()); } )*
    };
}

impl InstrumentPatch {
    /// `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every set field onto `attrs`.
    pub fn apply_to(&self, attrs: &mut NewInstrument) {
        apply_patch!(self, attrs;
            required: [short_name, full_name, instrument_type, original_currency, interest_currency];
            optional: [
                isin, sector, industry, country, statistical_currency,
                interest_rate, interest_period, last_price, last_price_date,
                issue_date, expiration_date, first_call_date, first_call_percentage,
                coupon_date_0, coupon_date_1, coupon_date_2, coupon_date_3,
                preferred_exchange, restricted_exchange, contract_size, initial_margin,
                telekurs_symbol, reuters_symbol, yahoo_symbol, sector_allocation,
                free_text_0, free_text_1, free_text_2, free_text_3, metadata_json,
            ]
        );
    }
}
