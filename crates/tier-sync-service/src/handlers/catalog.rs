//! CSV catalog relay.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /catalog`.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    /// `raw` relays the CSV text unchanged.
    #[serde(default)]
    pub format: Option<String>,
}

/// Parsed catalog.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    /// One object per record, keyed by header.
    pub rows: Vec<BTreeMap<String, String>>,
}

/// Fetch the configured CSV and return it parsed or raw.
pub async fn catalog(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, ApiError> {
    let url = state
        .config
        .catalog_csv_url
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("catalog relay not configured".into()))?;
    let client = state
        .relay
        .as_ref()
        .ok_or_else(|| ApiError::Internal("relay HTTP client unavailable".into()))?;

    let response = client
        .get(url)
        .timeout(Duration::from_secs(state.config.request_timeout_seconds))
        .send()
        .await
        .map_err(|e| ApiError::ExternalService(format!("catalog fetch failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::ExternalService(format!(
            "catalog upstream returned HTTP {status}"
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| ApiError::ExternalService(format!("catalog read failed: {e}")))?;

    if query.format.as_deref() == Some("raw") {
        return Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], text).into_response());
    }

    let rows = parse_rows(&text)
        .map_err(|e| ApiError::ExternalService(format!("catalog is not valid CSV: {e}")))?;

    tracing::debug!(rows = rows.len(), "Catalog relayed");

    Ok(Json(CatalogResponse { rows }).into_response())
}

/// Parse CSV text with a header row into one map per record.
///
/// Short records leave the missing columns empty; extra fields are dropped.
///
/// # Errors
///
/// Returns the parser error for malformed input (e.g. invalid UTF-8).
pub fn parse_rows(text: &str) -> Result<Vec<BTreeMap<String, String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), record.get(i).unwrap_or_default().to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_keyed_by_header() {
        let rows = parse_rows("sku,name,price\nA1, Basil ,3.50\nB2,\"Thyme, dried\",2\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Basil");
        assert_eq!(rows[1]["name"], "Thyme, dried");
        assert_eq!(rows[1]["price"], "2");
    }

    #[test]
    fn short_records_are_padded() {
        let rows = parse_rows("sku,name,price\nA1,Basil\n").unwrap();
        assert_eq!(rows[0]["price"], "");
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse_rows("sku,name\n").unwrap().is_empty());
    }
}
