use crate::error::FetchError;
use crate::uf::StateCode;
use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Latest case snapshot of one municipality
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseRecord {
    pub municipality: String,
    pub confirmed: u64,
    pub deaths: u64,
    pub report_date: Option<NaiveDate>,
}

impl CaseRecord {
    pub fn new(municipality: impl Into<String>, confirmed: u64, deaths: u64) -> Self {
        Self {
            municipality: municipality.into(),
            confirmed,
            deaths,
            report_date: None,
        }
    }
}

/// Lookup from municipality name to its case record.
///
/// Rebuilt from scratch for every state; never updated in place.
#[derive(Clone, Debug, Default)]
pub struct CaseIndex {
    by_name: HashMap<String, CaseRecord>,
    updated_on: Option<NaiveDate>,
}

impl CaseIndex {
    /// Records without a municipality name are skipped (the API mixes in a
    /// state-level row). A repeated name keeps the last record seen.
    pub fn from_records(records: Vec<CaseRecord>) -> Self {
        let updated_on = records.first().and_then(|r| r.report_date);
        let mut by_name = HashMap::with_capacity(records.len());
        for record in records {
            if record.municipality.trim().is_empty() {
                continue;
            }
            by_name.insert(record.municipality.clone(), record);
        }
        Self { by_name, updated_on }
    }

    pub fn get(&self, name: &str) -> Option<&CaseRecord> {
        self.by_name.get(name)
    }

    /// Confirmed cases, 0 when the municipality has no record
    pub fn confirmed(&self, name: &str) -> u64 {
        self.get(name).map_or(0, |r| r.confirmed)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Report date of the snapshot's first row
    pub fn updated_on(&self) -> Option<NaiveDate> {
        self.updated_on
    }
}

/// Anything that can produce the latest case snapshot for a state.
pub trait CaseSource: Send + Sync {
    fn fetch_latest(&self, state: StateCode) -> Result<Vec<CaseRecord>, FetchError>;
}

#[derive(Deserialize)]
struct CasePage {
    results: Vec<CaseRow>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct CaseRow {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    confirmed: Option<i64>,
    #[serde(default)]
    deaths: Option<i64>,
    #[serde(default)]
    date: Option<NaiveDate>,
}

impl From<CaseRow> for CaseRecord {
    fn from(row: CaseRow) -> Self {
        Self {
            municipality: row.city.unwrap_or_default(),
            confirmed: row.confirmed.unwrap_or(0).max(0) as u64,
            deaths: row.deaths.unwrap_or(0).max(0) as u64,
            report_date: row.date,
        }
    }
}

/// Decode one page of `caso/data`. Returns the records and the next page URL.
pub fn parse_page(body: &mut [u8]) -> Result<(Vec<CaseRecord>, Option<String>), FetchError> {
    let page: CasePage = simd_json::serde::from_slice(body).map_err(|source| FetchError::Decode {
        what: "case page",
        source,
    })?;
    let records = page.results.into_iter().map(CaseRecord::from).collect();
    Ok((records, page.next.filter(|n| !n.is_empty())))
}

/// Brasil.IO `covid19` dataset client
pub struct BrasilIoClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    max_pages: usize,
}

impl BrasilIoClient {
    const MAX_PAGES: usize = 20;

    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("covid-map/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Http {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            max_pages: Self::MAX_PAGES,
        })
    }

    pub fn latest_url(&self, state: StateCode) -> String {
        format!("{}/caso/data/?state={}&is_last=True", self.base_url, state)
    }

    fn get_page(&self, url: &str) -> Result<(Vec<CaseRecord>, Option<String>), FetchError> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {token}"));
        }
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let response = request.send().map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let mut body = response.bytes().map_err(http_err)?.to_vec();
        parse_page(&mut body)
    }
}

impl CaseSource for BrasilIoClient {
    fn fetch_latest(&self, state: StateCode) -> Result<Vec<CaseRecord>, FetchError> {
        follow_pages(state, self.latest_url(state), self.max_pages, |url| self.get_page(url))
    }
}

/// Walk `next` links from `first`, reading at most `max_pages` pages.
/// A snapshot cut at the page limit is returned as is and logged.
fn follow_pages<F>(
    state: StateCode,
    first: String,
    max_pages: usize,
    mut get_page: F,
) -> Result<Vec<CaseRecord>, FetchError>
where
    F: FnMut(&str) -> Result<(Vec<CaseRecord>, Option<String>), FetchError>,
{
    let mut url = Some(first);
    let mut records = Vec::new();
    let mut pages = 0;

    while let Some(current) = url.take() {
        let (page, next) = get_page(&current)?;
        debug!(%state, rows = page.len(), "case page received");
        records.extend(page);
        pages += 1;
        if pages >= max_pages {
            if let Some(skipped) = next {
                warn!(
                    %state,
                    pages,
                    rows = records.len(),
                    next = %skipped,
                    "page limit reached, snapshot truncated"
                );
            }
            break;
        }
        url = next;
    }

    info!(%state, rows = records.len(), pages, "case snapshot fetched");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        let mut body = r#"{
            "count": 3,
            "next": null,
            "results": [
                {"city": null, "confirmed": 400, "deaths": 9, "date": "2020-05-10", "place_type": "state"},
                {"city": "Goiânia", "confirmed": 150, "deaths": 3, "date": "2020-05-10"},
                {"city": "Anápolis", "confirmed": null, "deaths": -1, "date": "2020-05-09"}
            ]
        }"#
        .as_bytes()
        .to_vec();
        let (records, next) = parse_page(&mut body).unwrap();
        assert!(next.is_none());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].municipality, "");
        assert_eq!(records[1].municipality, "Goiânia");
        assert_eq!(records[1].confirmed, 150);
        assert_eq!(records[1].deaths, 3);
        assert_eq!(records[2].confirmed, 0);
        assert_eq!(records[2].deaths, 0);
        assert_eq!(records[1].report_date, NaiveDate::from_ymd_opt(2020, 5, 10));
    }

    #[test]
    fn test_parse_page_next_link() {
        let mut body = br#"{"results": [], "next": "https://example.test/page2"}"#.to_vec();
        let (records, next) = parse_page(&mut body).unwrap();
        assert!(records.is_empty());
        assert_eq!(next.as_deref(), Some("https://example.test/page2"));
    }

    #[test]
    fn test_parse_page_rejects_garbage() {
        let mut body = b"<html>rate limited</html>".to_vec();
        assert!(matches!(parse_page(&mut body), Err(FetchError::Decode { .. })));
    }

    #[test]
    fn test_index_skips_unnamed() {
        let index = CaseIndex::from_records(vec![
            CaseRecord::new("", 400, 9),
            CaseRecord::new("Goiânia", 150, 3),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.confirmed("Goiânia"), 150);
    }

    #[test]
    fn test_index_last_duplicate_wins() {
        let index = CaseIndex::from_records(vec![
            CaseRecord::new("Goiânia", 10, 0),
            CaseRecord::new("Anápolis", 5, 0),
            CaseRecord::new("Goiânia", 42, 1),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("Goiânia").map(|r| r.confirmed), Some(42));
        assert_eq!(index.get("Goiânia").map(|r| r.deaths), Some(1));
    }

    #[test]
    fn test_index_absent_is_zero() {
        let index = CaseIndex::from_records(vec![CaseRecord::new("Goiânia", 150, 3)]);
        assert_eq!(index.confirmed("Anápolis"), 0);
        assert!(index.get("Anápolis").is_none());
    }

    #[test]
    fn test_updated_on_uses_first_row() {
        let mut first = CaseRecord::new("", 1, 0);
        first.report_date = NaiveDate::from_ymd_opt(2020, 6, 1);
        let index = CaseIndex::from_records(vec![first, CaseRecord::new("Goiânia", 1, 0)]);
        assert_eq!(index.updated_on(), NaiveDate::from_ymd_opt(2020, 6, 1));
    }

    fn paged(url: &str) -> Result<(Vec<CaseRecord>, Option<String>), FetchError> {
        let n: usize = url.trim_start_matches("page").parse().unwrap_or(0);
        Ok((vec![CaseRecord::new(format!("m{n}"), 1, 0)], Some(format!("page{}", n + 1))))
    }

    #[test]
    fn test_follow_pages_stops_at_limit() {
        let mut seen = Vec::new();
        let records = follow_pages(StateCode::GO, "page0".to_string(), 3, |url| {
            seen.push(url.to_string());
            paged(url)
        })
        .unwrap();
        assert_eq!(seen, vec!["page0", "page1", "page2"]);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_follow_pages_until_last() {
        let records = follow_pages(StateCode::GO, "page0".to_string(), 20, |url| {
            let (page, next) = paged(url)?;
            Ok((page, next.filter(|n| n != "page2")))
        })
        .unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.municipality.as_str()).collect();
        assert_eq!(names, vec!["m0", "m1"]);
    }

    #[test]
    fn test_follow_pages_propagates_error() {
        let result = follow_pages(StateCode::GO, "page0".to_string(), 20, |url| {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 429,
            })
        });
        assert!(matches!(result, Err(FetchError::Status { status: 429, .. })));
    }

    #[test]
    fn test_latest_url() {
        let client =
            BrasilIoClient::new("https://api.example.test/covid19/", None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.latest_url(StateCode::GO),
            "https://api.example.test/covid19/caso/data/?state=GO&is_last=True"
        );
    }
}
