//! Client-side list derivation: search, filter, sort, paginate, and facets.
//!
//! [`derive`] is a pure function of `(batch, params)`. The client session runs it
//! over the batch returned by LIST, and the in-memory store reuses
//! [`matches_filters`] for its own server-side filtering, so both sides agree on
//! what "matches" means.
//!
//! Facet policy: facets are collected from the **whole fetched batch**, before
//! free-text search and paging. The session sends the type/sector/country
//! filters to the store with LIST, so the batch is already narrowed by them and
//! so are its facets. Typing a search never shrinks the filter menu; picking a
//! sector does.

use std::{cmp::Ordering, collections::BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{
    enums::InstrumentType,
    instrument::Instrument,
    list_filter::{ListFilter, MAX_LIMIT},
};

/// Page size used when callers don't pick one.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Column to sort on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    ShortName,
    #[default]
    FullName,
    InstrumentType,
    Sector,
    Country,
    LastPrice,
    UpdatedAt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Everything the list screen can ask for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Free-text search; blank means "no search".
    pub query: Option<String>,
    pub instrument_type: Option<InstrumentType>,
    pub sector: Option<String>,
    pub country: Option<String>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    /// Zero-based page index.
    pub page: usize,
    pub page_size: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            query: None,
            instrument_type: None,
            sector: None,
            country: None,
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl QueryParams {
    /// The server-side part of these params: the exact-match filters plus a
    /// batch `limit`. Search, sort and paging stay on the client.
    pub fn to_list_filter(&self, limit: u32) -> ListFilter {
        ListFilter {
            instrument_type: self.instrument_type,
            sector: self.sector.clone(),
            country: self.country.clone(),
            limit: limit.clamp(1, MAX_LIMIT),
            offset: 0,
        }
    }

    fn search_needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

/// Distinct values available for the filter menus, each sorted ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub instrument_types: Vec<InstrumentType>,
    pub sectors: Vec<String>,
    pub countries: Vec<String>,
}

/// Result of [`derive`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// The requested page of matching rows.
    pub rows: Vec<Instrument>,
    /// Number of rows matching search + filters (not the unfiltered batch size).
    pub total: usize,
    pub facets: Facets,
}

/// Exact-match conjunction over the non-`None` filters.
pub fn matches_filters(
    item: &Instrument,
    instrument_type: Option<InstrumentType>,
    sector: Option<&str>,
    country: Option<&str>,
) -> bool {
    instrument_type.is_none_or(|t| item.attrs.instrument_type == t)
        && sector.is_none_or(|s| item.attrs.sector.as_deref() == Some(s))
        && country.is_none_or(|c| item.attrs.country.as_deref() == Some(c))
}

/// Case-insensitive substring match on symbol, name, ISIN and exchange
/// symbols. `needle` must already be lowercase.
pub fn matches_text(item: &Instrument, needle: &str) -> bool {
    let a = &item.attrs;
    std::iter::once(a.short_name.as_str())
        .chain(std::iter::once(a.full_name.as_str()))
        .chain(a.isin.as_deref())
        .chain(a.exchange_symbols())
        .any(|field| field.to_lowercase().contains(needle))
}

/// Collect facets from `batch`.
pub fn facets(batch: &[Instrument]) -> Facets {
    let mut types = BTreeSet::new();
    let mut sectors = BTreeSet::new();
    let mut countries = BTreeSet::new();

    for item in batch {
        types.insert(item.attrs.instrument_type);
        if let Some(s) = non_blank(item.attrs.sector.as_deref()) {
            sectors.insert(s.to_string());
        }
        if let Some(c) = non_blank(item.attrs.country.as_deref()) {
            countries.insert(c.to_string());
        }
    }

    let mut instrument_types: Vec<InstrumentType> = types.into_iter().collect();
    instrument_types.sort_by_key(|t| t.as_str());

    Facets {
        instrument_types,
        sectors: sectors.into_iter().collect(),
        countries: countries.into_iter().collect(),
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

/// Derive the visible page, the filtered total, and the facets from one batch.
pub fn derive(batch: &[Instrument], params: &QueryParams) -> QueryOutcome {
    let needle = params.search_needle();

    let mut matched: Vec<&Instrument> = batch
        .iter()
        .filter(|item| {
            matches_filters(
                item,
                params.instrument_type,
                params.sector.as_deref(),
                params.country.as_deref(),
            )
        })
        .filter(|item| needle.as_deref().is_none_or(|n| matches_text(item, n)))
        .collect();

    // `sort_by` is stable: equal keys keep batch order.
    matched.sort_by(|a, b| compare(a, b, params.sort_field, params.sort_direction));

    let total = matched.len();
    let start = params.page.saturating_mul(params.page_size);
    let rows = matched
        .into_iter()
        .skip(start)
        .take(params.page_size)
        .cloned()
        .collect();

    QueryOutcome {
        rows,
        total,
        facets: facets(batch),
    }
}

// Missing values sort last regardless of direction.
fn cmp_missing_last<T>(
    a: Option<T>,
    b: Option<T>,
    dir: SortDirection,
    cmp: impl FnOnce(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => dir.apply(cmp(&x, &y)),
    }
}

fn cmp_text(a: &&str, b: &&str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare(a: &Instrument, b: &Instrument, field: SortField, dir: SortDirection) -> Ordering {
    let (x, y) = (&a.attrs, &b.attrs);
    match field {
        SortField::Id => dir.apply(a.id.cmp(&b.id)),
        SortField::ShortName => dir.apply(cmp_text(&x.short_name.as_str(), &y.short_name.as_str())),
        SortField::FullName => dir.apply(cmp_text(&x.full_name.as_str(), &y.full_name.as_str())),
        SortField::InstrumentType => {
            dir.apply(x.instrument_type.as_str().cmp(y.instrument_type.as_str()))
        }
        SortField::Sector => cmp_missing_last(
            non_blank(x.sector.as_deref()),
            non_blank(y.sector.as_deref()),
            dir,
            cmp_text,
        ),
        SortField::Country => cmp_missing_last(
            non_blank(x.country.as_deref()),
            non_blank(y.country.as_deref()),
            dir,
            cmp_text,
        ),
        SortField::LastPrice => {
            cmp_missing_last(x.last_price, y.last_price, dir, |p, q| p.total_cmp(q))
        }
        SortField::UpdatedAt => dir.apply(a.updated_at.cmp(&b.updated_at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::instrument::{InstrumentId, NewInstrument};
    use chrono::{TimeZone, Utc};

    fn inst(id: i64, short: &str, full: &str, t: InstrumentType) -> Instrument {
        Instrument {
            id: InstrumentId(id),
            attrs: NewInstrument::new(short, full, t, "USD", "USD"),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, id as u32 % 60).unwrap(),
        }
    }

    fn batch() -> Vec<Instrument> {
        let mut apple = inst(1, "AAPL", "Apple Inc.", InstrumentType::Equity);
        apple.attrs.sector = Some("Technology".into());
        apple.attrs.country = Some("US".into());
        apple.attrs.isin = Some("US0378331005".into());
        apple.attrs.last_price = Some(150.25);

        let mut nestle = inst(2, "NESN", "Nestlé S.A.", InstrumentType::Equity);
        nestle.attrs.sector = Some("Consumer Staples".into());
        nestle.attrs.country = Some("CH".into());
        nestle.attrs.yahoo_symbol = Some("NESN.SW".into());

        let mut bund = inst(3, "DBR30", "Bundesrepublik 2030", InstrumentType::Bond);
        bund.attrs.country = Some("DE".into());
        bund.attrs.last_price = Some(98.1);

        let mut spy = inst(4, "SPY", "SPDR S&P 500 ETF", InstrumentType::Etf);
        spy.attrs.country = Some("US".into());
        spy.attrs.reuters_symbol = Some("SPY.P".into());
        spy.attrs.last_price = Some(510.0);

        vec![apple, nestle, bund, spy]
    }

    fn ids(rows: &[Instrument]) -> Vec<i64> {
        rows.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn search_is_case_insensitive_on_symbol() {
        let params = QueryParams {
            query: Some("aap".into()),
            ..Default::default()
        };
        let out = derive(&batch(), &params);
        assert_eq!(ids(&out.rows), vec![1]);
        assert_eq!(out.total, 1);
    }

    #[test]
    fn search_hits_name_isin_and_exchange_symbols() {
        let by = |q: &str| {
            let params = QueryParams {
                query: Some(q.into()),
                sort_field: SortField::Id,
                ..Default::default()
            };
            ids(&derive(&batch(), &params).rows)
        };
        assert_eq!(by("nestlé"), vec![2]);
        assert_eq!(by("us0378"), vec![1]);
        assert_eq!(by("nesn.sw"), vec![2]);
        assert_eq!(by("spy.p"), vec![4]);
        assert_eq!(by("   "), vec![1, 2, 3, 4]); // blank is no search
        assert!(by("zzz").is_empty());
    }

    #[test]
    fn filters_are_a_conjunction() {
        let params = QueryParams {
            instrument_type: Some(InstrumentType::Equity),
            country: Some("US".into()),
            ..Default::default()
        };
        let out = derive(&batch(), &params);
        assert_eq!(ids(&out.rows), vec![1]);

        let none = QueryParams {
            instrument_type: Some(InstrumentType::Bond),
            country: Some("US".into()),
            ..Default::default()
        };
        assert_eq!(derive(&batch(), &none).total, 0);
    }

    #[test]
    fn default_sort_is_full_name_ascending() {
        let out = derive(&batch(), &QueryParams::default());
        assert_eq!(ids(&out.rows), vec![1, 3, 2, 4]);
    }

    #[test]
    fn missing_values_sort_last_both_ways() {
        let mut params = QueryParams {
            sort_field: SortField::LastPrice,
            ..Default::default()
        };
        assert_eq!(ids(&derive(&batch(), &params).rows), vec![3, 1, 4, 2]);
        params.sort_direction = SortDirection::Desc;
        assert_eq!(ids(&derive(&batch(), &params).rows), vec![4, 1, 3, 2]);
    }

    #[test]
    fn ties_keep_batch_order() {
        let params = QueryParams {
            sort_field: SortField::InstrumentType,
            ..Default::default()
        };
        // Bond < ETF < Equity (wire spelling); the two equities keep 1 before 2.
        assert_eq!(ids(&derive(&batch(), &params).rows), vec![3, 4, 1, 2]);
    }

    #[test]
    fn pagination_reports_filtered_total() {
        let params = QueryParams {
            sort_field: SortField::Id,
            page: 1,
            page_size: 3,
            ..Default::default()
        };
        let out = derive(&batch(), &params);
        assert_eq!(ids(&out.rows), vec![4]);
        assert_eq!(out.total, 4);

        let past_end = QueryParams { page: 9, ..params.clone() };
        let out = derive(&batch(), &past_end);
        assert!(out.rows.is_empty());
        assert_eq!(out.total, 4);

        let zero = QueryParams { page_size: 0, ..params };
        assert!(derive(&batch(), &zero).rows.is_empty());
    }

    #[test]
    fn facets_come_from_whole_batch_sorted() {
        let params = QueryParams {
            instrument_type: Some(InstrumentType::Bond),
            ..Default::default()
        };
        let out = derive(&batch(), &params);
        assert_eq!(out.total, 1);
        assert_eq!(
            out.facets.instrument_types,
            vec![InstrumentType::Bond, InstrumentType::Etf, InstrumentType::Equity]
        );
        assert_eq!(out.facets.sectors, vec!["Consumer Staples", "Technology"]);
        assert_eq!(out.facets.countries, vec!["CH", "DE", "US"]);
    }

    #[test]
    fn list_filter_carries_only_server_side_parts() {
        let params = QueryParams {
            query: Some("apple".into()),
            sector: Some("Technology".into()),
            page: 3,
            ..Default::default()
        };
        let f = params.to_list_filter(5000);
        assert_eq!(f.sector.as_deref(), Some("Technology"));
        assert_eq!(f.limit, MAX_LIMIT);
        assert_eq!(f.offset, 0);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn pages_tile_the_filtered_rows(
            page_size in 1usize..6,
            country in prop::option::of(prop::sample::select(vec!["US", "CH", "DE"])),
        ) {
            let base = QueryParams {
                country: country.map(String::from),
                sort_field: SortField::Id,
                page_size,
                ..Default::default()
            };
            let total = derive(&batch(), &base).total;

            let mut seen = Vec::new();
            for page in 0..=(total / page_size) {
                let out = derive(&batch(), &QueryParams { page, ..base.clone() });
                prop_assert_eq!(out.total, total);
                prop_assert!(out.rows.len() <= page_size);
                seen.extend(ids(&out.rows));
            }
            let all = QueryParams { page_size: usize::MAX, ..base };
            prop_assert_eq!(seen, ids(&derive(&batch(), &all).rows));
        }
    }
}
