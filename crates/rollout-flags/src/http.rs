// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP adapter for a JSON record service.
//!
//! Endpoints, relative to the base URL:
//!
//! | Operation        | Request                          | Response              |
//! |------------------|----------------------------------|-----------------------|
//! | fetch            | `GET records/{id}`               | `Record`              |
//! | save             | `PUT records/{id}` with `Record` | persisted `Record`    |
//! | query            | `POST records/query`             | `{"records": [...]}`  |
//! | current user id  | `GET users/current`              | `{"record_id": "…"}`  |
//!
//! Status codes map onto [`StoreError`]: 404 is `NotFound`, 401/403 are
//! `Unauthenticated`, 408/429/5xx are `Transient`, anything else is
//! `Internal`. Requests are never retried here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use rollout_flags_core::{Query, Record, RecordId, ZoneId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{FlagsError, Result, StoreError, StoreResult};
use crate::store::{Container, RecordStore};

/// SDK name for identification.
const SDK_NAME: &str = "rollout-flags-rust";
/// SDK version for identification.
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the HTTP record store.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
	/// Timeout for each HTTP request.
	pub request_timeout: Duration,
}

impl Default for HttpStoreConfig {
	fn default() -> Self {
		Self {
			request_timeout: Duration::from_secs(30),
		}
	}
}

/// Builder for [`HttpRecordStore`].
#[derive(Default)]
pub struct HttpRecordStoreBuilder {
	base_url: Option<String>,
	auth_token: Option<String>,
	config: HttpStoreConfig,
}

impl HttpRecordStoreBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the base URL of the record service, e.g. `https://records.example.com/api`.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());
		self
	}

	/// Sets the bearer token sent with every request.
	pub fn auth_token(mut self, token: impl Into<String>) -> Self {
		self.auth_token = Some(token.into());
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	pub fn config(mut self, config: HttpStoreConfig) -> Self {
		self.config = config;
		self
	}

	pub fn build(self) -> Result<HttpRecordStore> {
		let raw = self
			.base_url
			.ok_or_else(|| FlagsError::InvalidConfig("base URL is required".to_string()))?;
		let base_url = Url::parse(&raw)
			.map_err(|e| FlagsError::InvalidConfig(format!("invalid base URL '{raw}': {e}")))?;
		if base_url.cannot_be_a_base() {
			return Err(FlagsError::InvalidConfig(format!(
				"base URL '{raw}' cannot carry a path"
			)));
		}

		if matches!(self.auth_token.as_deref(), Some("")) {
			return Err(FlagsError::InvalidConfig(
				"auth token must not be empty".to_string(),
			));
		}

		let http_client = Client::builder()
			.user_agent(format!("{SDK_NAME}/{SDK_VERSION}"))
			.timeout(self.config.request_timeout)
			.build()
			.map_err(|e| FlagsError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

		info!(base_url = %base_url, sdk_name = SDK_NAME, sdk_version = SDK_VERSION, "Record store client initialized");

		Ok(HttpRecordStore {
			inner: Arc::new(Inner {
				base_url,
				auth_token: self.auth_token,
				http_client,
			}),
		})
	}
}

struct Inner {
	base_url: Url,
	auth_token: Option<String>,
	http_client: Client,
}

/// [`RecordStore`] and [`Container`] backed by a JSON-over-HTTP record service.
#[derive(Clone)]
pub struct HttpRecordStore {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for HttpRecordStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HttpRecordStore")
			.field("base_url", &self.inner.base_url.as_str())
			.field(
				"auth_token",
				&self.inner.auth_token.as_ref().map(|_| "[REDACTED]"),
			)
			.finish()
	}
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
	query: &'a Query,
	#[serde(skip_serializing_if = "Option::is_none")]
	zone: Option<&'a ZoneId>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
	records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct CurrentUserResponse {
	record_id: RecordId,
}

impl HttpRecordStore {
	pub fn builder() -> HttpRecordStoreBuilder {
		HttpRecordStoreBuilder::new()
	}

	fn url(&self, segments: &[&str]) -> StoreResult<Url> {
		let mut url = self.inner.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| StoreError::internal("base URL cannot carry a path"))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
		match &self.inner.auth_token {
			Some(token) => request.bearer_auth(token),
			None => request,
		}
	}

	async fn send<T: DeserializeOwned>(
		&self,
		request: RequestBuilder,
		missing: Option<&RecordId>,
	) -> StoreResult<T> {
		let response = self
			.authorize(request)
			.send()
			.await
			.map_err(transport_error)?;
		let response = check_status(response, missing).await?;
		response
			.json::<T>()
			.await
			.map_err(|e| StoreError::internal(format!("invalid response body: {e}")))
	}
}

fn transport_error(err: reqwest::Error) -> StoreError {
	if err.is_timeout() || err.is_connect() {
		warn!(error = %err, "Record store unreachable");
		StoreError::transient(err.to_string())
	} else {
		StoreError::internal(err.to_string())
	}
}

async fn check_status(response: Response, missing: Option<&RecordId>) -> StoreResult<Response> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let retry_after_secs = response
		.headers()
		.get("Retry-After")
		.and_then(|v| v.to_str().ok())
		.and_then(|s| s.parse().ok());
	let message = response.text().await.unwrap_or_default();

	Err(match status {
		StatusCode::NOT_FOUND => match missing {
			Some(id) => StoreError::NotFound { id: id.clone() },
			None => StoreError::internal(format!("endpoint not found: {message}")),
		},
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthenticated,
		StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => StoreError::Transient {
			message: format!("{status}: {message}"),
			retry_after_secs,
		},
		s if s.is_server_error() => StoreError::Transient {
			message: format!("{status}: {message}"),
			retry_after_secs,
		},
		_ => StoreError::internal(format!("unexpected status {status}: {message}")),
	})
}

#[async_trait]
impl RecordStore for HttpRecordStore {
	#[instrument(skip(self), fields(record_id = %id))]
	async fn fetch(&self, id: &RecordId) -> StoreResult<Record> {
		let url = self.url(&["records", id.as_str()])?;
		debug!(url = %url, "Fetching record");
		self.send(self.inner.http_client.get(url), Some(id)).await
	}

	#[instrument(skip(self, record), fields(record_id = %record.id))]
	async fn save(&self, record: Record) -> StoreResult<Record> {
		let url = self.url(&["records", record.id.as_str()])?;
		debug!(url = %url, "Saving record");
		let request = self.inner.http_client.put(url).json(&record);
		self.send(request, None).await
	}

	#[instrument(skip(self, query), fields(record_type = %query.record_type))]
	async fn query(&self, query: &Query, zone: Option<&ZoneId>) -> StoreResult<Vec<Record>> {
		let url = self.url(&["records", "query"])?;
		debug!(url = %url, zone = ?zone, "Querying records");
		let request = self
			.inner
			.http_client
			.post(url)
			.json(&QueryRequest { query, zone });
		let response: QueryResponse = self.send(request, None).await?;
		Ok(response.records)
	}
}

#[async_trait]
impl Container for HttpRecordStore {
	fn flagging_store(&self) -> Arc<dyn RecordStore> {
		Arc::new(self.clone())
	}

	#[instrument(skip(self))]
	async fn user_record_id(&self) -> StoreResult<RecordId> {
		let url = self.url(&["users", "current"])?;
		let response: CurrentUserResponse = self.send(self.inner.http_client.get(url), None).await?;
		Ok(response.record_id)
	}
}
