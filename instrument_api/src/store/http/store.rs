use std::{num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Url, header};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use snafu::{OptionExt, ResultExt};
use tracing::{debug, instrument};

use crate::{
    errors::{StoreError, StoreResult},
    models::{
        instrument::{Instrument, InstrumentId, InstrumentPatch, NewInstrument},
        list_filter::ListFilter,
    },
    store::{
        ClientBuildSnafu, InstrumentStore, InvalidBaseUrlSnafu, InvalidTokenSnafu, StoreInitError,
        ZeroRateSnafu, http::response::classify_failure,
    },
};

/// Environment variable holding the optional bearer token.
pub const TOKEN_ENV_VAR: &str = "INSTRUMENTS_API_TOKEN";

/// Connection settings for [`HttpStore`].
#[derive(Debug, Clone)]
pub struct HttpStoreOptions {
    /// Scheme + host (+ port), e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Path prefix in front of `/instruments/`, e.g. `/api/v1`.
    pub api_prefix: String,
    pub timeout: Duration,
    pub requests_per_second: u32,
    pub token: Option<SecretString>,
}

impl Default for HttpStoreOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            timeout: Duration::from_secs(10),
            requests_per_second: 20,
            token: None,
        }
    }
}

impl HttpStoreOptions {
    /// Picks up the bearer token from [`TOKEN_ENV_VAR`] if it is set.
    pub fn with_token_from_env(mut self) -> Self {
        self.token = shared_utils::env::env_override(TOKEN_ENV_VAR).map(|t| SecretString::new(t.into()));
        self
    }
}

/// [`InstrumentStore`] backed by the instruments REST API.
pub struct HttpStore {
    client: Client,
    collection: Url,
    limiter: DefaultDirectRateLimiter,
}

impl HttpStore {
    /// Builds the HTTP client. No request is sent until the first operation.
    pub fn new(options: HttpStoreOptions) -> Result<Self, StoreInitError> {
        let raw = format!(
            "{}/{}/instruments/",
            options.base_url.trim_end_matches('/'),
            options.api_prefix.trim_matches('/')
        );
        let collection = Url::parse(&raw).map_err(|e| {
            InvalidBaseUrlSnafu {
                url: raw.clone(),
                message: e.to_string(),
            }
            .build()
        })?;
        if collection.cannot_be_a_base() {
            return InvalidBaseUrlSnafu {
                url: raw,
                message: "URL cannot be used as a base",
            }
            .fail();
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(token) = &options.token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .context(InvalidTokenSnafu)?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .context(ClientBuildSnafu)?;

        let rate = NonZeroU32::new(options.requests_per_second).context(ZeroRateSnafu)?;
        let limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            collection,
            limiter,
        })
    }

    /// The resolved collection URL (always ends in `/instruments/`).
    pub fn collection_url(&self) -> &Url {
        &self.collection
    }

    fn item_url(&self, id: InstrumentId) -> StoreResult<Url> {
        self.collection
            .join(&id.to_string())
            .map_err(|e| StoreError::transport(format!("bad item url for {id}: {e}")))
    }

    async fn send(&self, request: RequestBuilder, id: Option<InstrumentId>) -> StoreResult<reqwest::Response> {
        self.limiter.until_ready().await;
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(%status, body = %body, "instrument API returned an error");
        Err(classify_failure(status, &body, id))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        id: Option<InstrumentId>,
    ) -> StoreResult<T> {
        let response = self.send(request, id).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::transport(format!("failed to decode response: {e}")))
    }
}

#[async_trait]
impl InstrumentStore for HttpStore {
    #[instrument(skip(self), level = "debug")]
    async fn list(&self, filter: &ListFilter) -> StoreResult<Vec<Instrument>> {
        let request = self.client.get(self.collection.clone()).query(&filter.to_query_pairs());
        self.send_json(request, None).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, id: InstrumentId) -> StoreResult<Instrument> {
        let request = self.client.get(self.item_url(id)?);
        self.send_json(request, Some(id)).await
    }

    #[instrument(skip(self, dto), fields(short_name = %dto.short_name), level = "debug")]
    async fn create(&self, dto: &NewInstrument) -> StoreResult<Instrument> {
        let request = self.client.post(self.collection.clone()).json(dto);
        self.send_json(request, None).await
    }

    #[instrument(skip(self, patch), level = "debug")]
    async fn update(&self, id: InstrumentId, patch: &InstrumentPatch) -> StoreResult<Instrument> {
        let request = self.client.put(self.item_url(id)?).json(patch);
        self.send_json(request, Some(id)).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, id: InstrumentId) -> StoreResult<()> {
        let request = self.client.delete(self.item_url(id)?);
        self.send(request, Some(id)).await.map(|_| ())
    }
}
