use chrono::Utc;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    ActivityEvent, Branding, BrandingUpsert, Client, EqFilter, FilterSet, Invoice, InvoiceStatus,
    LineItem, NewClient, NewInvoice, NewLineItem, NullFilter, OrderFilter, PageFilter, Profile,
    ProfileUpsert, RowFilter, SelectFilter,
};
use crate::RowbaseUrl;

/// Typed client for the Rowbase table endpoints. Tenant scoping is enforced
/// by row-level security on the backend; this client only attaches the
/// caller's bearer token.
#[derive(Debug, Clone)]
pub struct RowbaseClient {
    http: reqwest::Client,
    url: RowbaseUrl,
    api_key: String,
    access_token: Option<String>,
}

#[derive(Error, Debug)]
pub enum RowbaseFetchError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("TransportError: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ResponseError: {status}: {message}")]
    Response { status: u16, message: String },
    #[error("ParsingError: {0}")]
    Parsing(String),
    #[error("Expected exactly one row, got {0}")]
    UnexpectedRowCount(usize),
}

fn exactly_one<T>(rows: Vec<T>) -> Result<T, RowbaseFetchError> {
    if rows.len() == 1 {
        Ok(rows.into_iter().next().unwrap())
    } else {
        Err(RowbaseFetchError::UnexpectedRowCount(rows.len()))
    }
}

impl RowbaseClient {
    pub fn new(url: RowbaseUrl, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            api_key: api_key.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    pub(crate) fn base_url(&self) -> &RowbaseUrl {
        &self.url
    }

    fn table_url(&self, table: &str, filters: &impl RowFilter) -> RowbaseUrl {
        self.url
            .append_path(&format!("/rest/v1/{}", table))
            .with_filter(filters)
    }

    pub(crate) fn request(&self, method: Method, url: &RowbaseUrl) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(method, url.as_ref())
            .header("apikey", &self.api_key);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        request
    }

    pub(crate) async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RowbaseFetchError> {
        let response = request.send().await?;
        let status = response.status();
        if status == 401 || status == 403 {
            return Err(RowbaseFetchError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!("rowbase request failed: {} {}", status, message);
            return Err(RowbaseFetchError::Response {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RowbaseFetchError> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(|e| {
            RowbaseFetchError::Parsing(format!("Failed to parse response as JSON: {}", e))
        })
    }

    /// Send a mutation and drain the body without parsing it.
    pub(crate) async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(), RowbaseFetchError> {
        let response = self.send(request).await?;
        let _ = response.bytes().await;
        Ok(())
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &impl RowFilter,
    ) -> Result<Vec<T>, RowbaseFetchError> {
        let url = self.table_url(table, filters);
        self.fetch(self.request(Method::GET, &url)).await
    }

    /// Single-row-or-error fetch mode.
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &impl RowFilter,
    ) -> Result<T, RowbaseFetchError> {
        let rows = self.select(table, filters).await?;
        exactly_one(rows)
    }

    pub async fn insert<P: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        payload: &P,
    ) -> Result<T, RowbaseFetchError> {
        let url = self.url.append_path(&format!("/rest/v1/{}", table));
        let rows: Vec<T> = self
            .fetch(
                self.request(Method::POST, &url)
                    .header("Prefer", "return=representation")
                    .json(payload),
            )
            .await?;
        exactly_one(rows)
    }

    pub async fn upsert<P: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        payload: &P,
    ) -> Result<T, RowbaseFetchError> {
        let url = self.url.append_path(&format!("/rest/v1/{}", table));
        let rows: Vec<T> = self
            .fetch(
                self.request(Method::POST, &url)
                    .header("Prefer", "resolution=merge-duplicates,return=representation")
                    .json(payload),
            )
            .await?;
        exactly_one(rows)
    }

    /// Patch matching rows without asking for a representation back.
    pub async fn update<P: Serialize>(
        &self,
        table: &str,
        filters: &impl RowFilter,
        payload: &P,
    ) -> Result<(), RowbaseFetchError> {
        let url = self.table_url(table, filters);
        self.execute(self.request(Method::PATCH, &url).json(payload))
            .await
    }

    pub async fn delete(
        &self,
        table: &str,
        filters: &impl RowFilter,
    ) -> Result<(), RowbaseFetchError> {
        let url = self.table_url(table, filters);
        self.execute(self.request(Method::DELETE, &url)).await
    }

    // --- clients ---

    pub async fn fetch_clients(&self) -> Result<Vec<Client>, RowbaseFetchError> {
        self.select("clients", &OrderFilter::asc("name")).await
    }

    pub async fn fetch_client(&self, id: Uuid) -> Result<Client, RowbaseFetchError> {
        self.select_single("clients", &EqFilter::new("id", id))
            .await
    }

    pub async fn create_client(&self, client: &NewClient) -> Result<Client, RowbaseFetchError> {
        self.insert("clients", client).await
    }

    // --- invoices ---

    pub async fn fetch_invoices(&self) -> Result<Vec<Invoice>, RowbaseFetchError> {
        self.select("invoices", &OrderFilter::desc("number")).await
    }

    pub async fn fetch_invoice(&self, id: Uuid) -> Result<Invoice, RowbaseFetchError> {
        self.select_single("invoices", &EqFilter::new("id", id))
            .await
    }

    pub async fn fetch_line_items(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<LineItem>, RowbaseFetchError> {
        let filters = FilterSet::new()
            .with(EqFilter::new("invoice_id", invoice_id))
            .with(OrderFilter::asc("position"));
        self.select("line_items", &filters).await
    }

    pub async fn create_invoice(
        &self,
        invoice: &NewInvoice,
    ) -> Result<Invoice, RowbaseFetchError> {
        self.insert("invoices", invoice).await
    }

    pub async fn create_line_item(
        &self,
        item: &NewLineItem,
    ) -> Result<LineItem, RowbaseFetchError> {
        self.insert("line_items", item).await
    }

    pub async fn set_invoice_status(
        &self,
        id: Uuid,
        status: InvoiceStatus,
    ) -> Result<(), RowbaseFetchError> {
        #[derive(Serialize)]
        struct StatusPatch {
            status: InvoiceStatus,
        }
        self.update(
            "invoices",
            &EqFilter::new("id", id),
            &StatusPatch { status },
        )
        .await
    }

    pub async fn delete_invoice(&self, id: Uuid) -> Result<(), RowbaseFetchError> {
        self.delete("invoices", &EqFilter::new("id", id)).await
    }

    // --- activity ---

    /// One page of the feed, newest first, with the client name joined in.
    pub async fn fetch_activity_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ActivityEvent>, RowbaseFetchError> {
        let filters = FilterSet::new()
            .with(SelectFilter::columns("*,clients(name)"))
            .with(OrderFilter::desc("created_at"))
            .with(PageFilter::new(limit, offset));
        self.select("activity_events", &filters).await
    }

    /// Stamp every unread event read in one server call.
    pub async fn mark_all_activity_read(&self) -> Result<(), RowbaseFetchError> {
        #[derive(Serialize)]
        struct ReadPatch {
            read_at: chrono::DateTime<Utc>,
        }
        self.update(
            "activity_events",
            &NullFilter::is_null("read_at"),
            &ReadPatch {
                read_at: Utc::now(),
            },
        )
        .await
    }

    pub async fn delete_activity(&self, id: Uuid) -> Result<(), RowbaseFetchError> {
        self.delete("activity_events", &EqFilter::new("id", id))
            .await
    }

    // --- profile & branding ---

    pub async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>, RowbaseFetchError> {
        let rows: Vec<Profile> = self
            .select("profiles", &EqFilter::new("user_id", user_id))
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn upsert_profile(
        &self,
        profile: &ProfileUpsert,
    ) -> Result<Profile, RowbaseFetchError> {
        self.upsert("profiles", profile).await
    }

    pub async fn fetch_branding(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Branding>, RowbaseFetchError> {
        let rows: Vec<Branding> = self
            .select("branding", &EqFilter::new("user_id", user_id))
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn upsert_branding(
        &self,
        branding: &BrandingUpsert,
    ) -> Result<Branding, RowbaseFetchError> {
        self.upsert("branding", branding).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_accepts_a_single_row() {
        assert_eq!(exactly_one(vec![7]).unwrap(), 7);
    }

    #[test]
    fn exactly_one_rejects_empty_and_multiple() {
        assert!(matches!(
            exactly_one::<i32>(vec![]),
            Err(RowbaseFetchError::UnexpectedRowCount(0))
        ));
        assert!(matches!(
            exactly_one(vec![1, 2]),
            Err(RowbaseFetchError::UnexpectedRowCount(2))
        ));
    }
}
