//! Spreadsheet append client
//!
//! Thin adapter over the Google Sheets `values:append` endpoint. Only the
//! one call the logging sink needs is implemented.

mod auth;
mod error;

pub use auth::{KeyError, ServiceAccountAuth};
pub use error::{SheetsError, SheetsErrorKind};

use crate::sink::LogRow;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Serialize;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
const COLUMN_RANGE: &str = "A:D";

/// Append-only tabular store
#[async_trait]
pub trait SheetClient: Send + Sync {
    /// Append one row; no batching
    async fn append_row(&self, row: &LogRow) -> Result<(), SheetsError>;
}

#[derive(Serialize)]
struct AppendBody {
    values: [[String; 4]; 1],
}

/// Google Sheets client authorized with a service account
pub struct GoogleSheetsClient {
    http: Client,
    auth: ServiceAccountAuth,
    spreadsheet_id: String,
    sheet_name: String,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(
        http: Client,
        auth: ServiceAccountAuth,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            base_url: SHEETS_BASE_URL.to_string(),
        }
    }

    /// `{base}/v4/spreadsheets/{id}/values/{sheet}!A:D:append`
    fn append_url(&self) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SheetsError::invalid_request(format!("Bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| SheetsError::invalid_request("Base URL cannot hold a path"))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                format!("{}!{COLUMN_RANGE}:append", self.sheet_name).as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }

    async fn post_append(&self, url: Url, token: &str, body: &AppendBody) -> Result<Response, SheetsError> {
        self.http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(SheetsError::from_transport)
    }
}

#[async_trait]
impl SheetClient for GoogleSheetsClient {
    async fn append_row(&self, row: &LogRow) -> Result<(), SheetsError> {
        let url = self.append_url()?;
        let body = AppendBody {
            values: [row.cells()],
        };

        let token = self.auth.access_token().await?;
        let mut response = self.post_append(url.clone(), &token, &body).await?;

        // The cached token was revoked or rotated; mint a new one and resend once
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Sheets rejected the cached access token, refreshing");
            self.auth.invalidate().await;
            let token = self.auth.access_token().await?;
            response = self.post_append(url, &token, &body).await?;
        }

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .map_err(|e| SheetsError::network(format!("Failed to read response: {e}")))?;
        Err(SheetsError::from_status(status, &body))
    }
}
