use anyhow::{anyhow, Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Thin PostgREST client. Server-side reads authenticate with the service key.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
    page_size: usize,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_key: config.supabase_service_key.clone(),
            page_size: config.supabase_max_rows.max(1),
        }
    }

    fn get_headers(&self, extra: Option<HeaderMap>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)
            .context("anon key is not a valid header value")?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if !self.service_key.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", self.service_key))
                    .context("service key is not a valid header value")?,
            );
        }

        if let Some(extra) = extra {
            headers.extend(extra);
        }

        Ok(headers)
    }

    async fn send(&self, method: Method, path: &str, extra: Option<HeaderMap>) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let response = self.client
            .request(method, &url)
            .headers(self.get_headers(extra)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, None).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Exact row count for a filtered table path, read from `Content-Range`.
    pub async fn count(&self, path: &str) -> Result<u64> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self.send(Method::GET, path, Some(headers)).await?;
        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .ok_or_else(|| anyhow!("Count response is missing Content-Range"))?
            .to_str()
            .context("Content-Range is not valid ASCII")?
            .to_string();

        parse_content_range_total(&range)
    }

    /// Fetches every row behind `path` in `limit`/`offset` pages.
    ///
    /// The server caps each response at `max-rows`, so one request is not
    /// enough for unbounded reads. Paging stops on a short page or once the
    /// `Content-Range` total, when the server reports one, is reached.
    pub async fn get_all<T>(&self, path: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut rows: Vec<T> = Vec::new();

        loop {
            let page_path = format!(
                "{}{}limit={}&offset={}",
                path, separator, self.page_size, rows.len()
            );
            let response = self.send(Method::GET, &page_path, None).await?;
            let total = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(|range| parse_content_range_total(range).ok());

            let page: Vec<T> = response.json().await?;
            let page_len = page.len();
            rows.extend(page);
            debug!("Fetched page of {} rows ({} so far)", page_len, rows.len());

            let reached_total = total.is_some_and(|total| rows.len() as u64 >= total);
            if page_len < self.page_size || reached_total {
                break;
            }
        }

        Ok(rows)
    }

    /// Cheap round trip used for readiness checks.
    pub async fn ping(&self) -> Result<()> {
        self.send(Method::GET, "/rest/v1/", None).await?;
        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// Parses the total from `Content-Range` values like `0-24/150` or `*/0`.
pub fn parse_content_range_total(range: &str) -> Result<u64> {
    let total = range
        .rsplit_once('/')
        .map(|(_, total)| total.trim())
        .ok_or_else(|| anyhow!("Malformed Content-Range: {}", range))?;

    total
        .parse::<u64>()
        .with_context(|| format!("Content-Range has no exact total: {}", range))
}
