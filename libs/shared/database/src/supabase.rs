use anyhow::{Context, Result};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

use crate::error::PostgrestError;

/// PostgREST client for the VacQ tables. One instance is shared for the whole
/// process so requests reuse the same connection pool.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)
            .context("Invalid service key header value")?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))
                .context("Invalid service key header value")?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let (data, _) = self.send(method, path, body, extra_headers).await?;
        Ok(data)
    }

    /// GET that also asks for the exact row count of the filtered set, read
    /// back from the `Content-Range` header.
    pub async fn request_with_count<T>(&self, path: &str) -> Result<(T, Option<u64>)>
    where T: DeserializeOwned {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        self.send(Method::GET, path, None, Some(headers)).await
    }

    /// Calls a database function exposed under `/rest/v1/rpc/`.
    pub async fn rpc<T>(&self, function: &str, args: Value) -> Result<T>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, Some(args)).await
    }

    async fn send<T>(&self, method: Method, path: &str, body: Option<Value>,
                     extra_headers: Option<HeaderMap>) -> Result<(T, Option<u64>)>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let text = response.text().await?;

        if !status.is_success() {
            error!("API error ({}): {}", status, text);
            return Err(PostgrestError::from_response(status.as_u16(), &text).into());
        }

        let data = if text.trim().is_empty() {
            serde_json::from_value(Value::Null)?
        } else {
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to decode response from {}", path))?
        };

        Ok((data, total))
    }

    pub async fn get_user(&self, user_id: &Uuid) -> Result<Option<User>> {
        let path = format!("/rest/v1/users?id=eq.{}&limit=1", user_id);

        let result: Vec<User> = self.request(Method::GET, &path, None).await?;

        Ok(result.into_iter().next())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let path = format!(
            "/rest/v1/users?email=eq.{}&limit=1",
            urlencoding::encode(&email.trim().to_lowercase())
        );

        let result: Vec<User> = self.request(Method::GET, &path, None).await?;

        Ok(result.into_iter().next())
    }

    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

/// `0-24/57` -> 57, `*/0` -> 0, `0-24/*` -> None.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.parse().ok()
}
