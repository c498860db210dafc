//! HTTP implementation of the catalog client.

use std::time::Duration;

use async_trait::async_trait;
use catsync_core::Credential;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotations::CLIENT_VERSION;
use crate::client::CatalogClient;
use crate::error::CatalogError;
use crate::retry::{RetryConfig, RetryExecutor};
use crate::types::{
    CatalogEntry, CatalogType, CatalogTypeAttribute, CreateEntryRequest, CreateTypeRequest,
    UpdateEntryRequest, UpdateTypeRequest,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size used when listing entries.
const ENTRIES_PAGE_SIZE: u32 = 250;

/// Catalog client over HTTP with retry and backoff.
pub struct HttpCatalogClient {
    client: Client,
    endpoint: String,
    api_key: Option<Credential>,
    retry: RetryExecutor,
}

impl HttpCatalogClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<Credential>,
    ) -> Result<Self, CatalogError> {
        Self::with_retry(endpoint, api_key, RetryConfig::default())
    }

    pub fn with_retry(
        endpoint: impl Into<String>,
        api_key: Option<Credential>,
        retry: RetryConfig,
    ) -> Result<Self, CatalogError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(CatalogError::InvalidEndpoint {
                endpoint,
                message: "must be an http(s) URL".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("catalog-importer/{CLIENT_VERSION}"))
            .build()
            .map_err(|e| CatalogError::Network {
                message: format!("building HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            retry: RetryExecutor::new(retry),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{path}", self.endpoint));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose());
        }
        builder
    }

    async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, CatalogError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.retry
            .execute(|| {
                // Build a fresh request per attempt; the future owns it.
                let mut builder = self.request(method.clone(), path);
                if let Some(body) = body {
                    builder = builder.json(body);
                }
                async move {
                    let response = builder.send().await.map_err(CatalogError::from_reqwest)?;
                    let response = check_status(response).await?;
                    response.json::<T>().await.map_err(CatalogError::from_reqwest)
                }
            })
            .await
    }

    async fn send_no_content(&self, method: Method, path: &str) -> Result<(), CatalogError> {
        self.retry
            .execute(|| {
                let builder = self.request(method.clone(), path);
                async move {
                    let response = builder.send().await.map_err(CatalogError::from_reqwest)?;
                    check_status(response).await.map(|_| ())
                }
            })
            .await
    }
}

async fn check_status(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(CatalogError::RateLimited);
    }

    let message = response.text().await.unwrap_or_default();
    Err(CatalogError::Api {
        status: status.as_u16(),
        message,
    })
}

#[derive(Deserialize)]
struct TypesEnvelope {
    catalog_types: Vec<CatalogType>,
}

#[derive(Deserialize)]
struct TypeEnvelope {
    catalog_type: CatalogType,
}

#[derive(Deserialize)]
struct EntriesEnvelope {
    catalog_entries: Vec<CatalogEntry>,
    #[serde(default)]
    pagination_meta: PaginationMeta,
}

#[derive(Default, Deserialize)]
struct PaginationMeta {
    #[serde(default)]
    after: Option<String>,
}

#[derive(Deserialize)]
struct EntryEnvelope {
    catalog_entry: CatalogEntry,
}

#[derive(Serialize)]
struct UpdateSchemaRequest {
    version: i64,
    attributes: Vec<CatalogTypeAttribute>,
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_types(&self) -> Result<Vec<CatalogType>, CatalogError> {
        let envelope: TypesEnvelope = self
            .send(Method::GET, "/v2/catalog_types", None::<&()>)
            .await?;
        Ok(envelope.catalog_types)
    }

    async fn create_type(&self, request: CreateTypeRequest) -> Result<CatalogType, CatalogError> {
        let envelope: TypeEnvelope = self
            .send(Method::POST, "/v2/catalog_types", Some(&request))
            .await?;
        Ok(envelope.catalog_type)
    }

    async fn update_type(
        &self,
        id: &str,
        request: UpdateTypeRequest,
    ) -> Result<CatalogType, CatalogError> {
        let envelope: TypeEnvelope = self
            .send(Method::PUT, &format!("/v2/catalog_types/{id}"), Some(&request))
            .await?;
        Ok(envelope.catalog_type)
    }

    async fn update_type_schema(
        &self,
        id: &str,
        version: i64,
        attributes: Vec<CatalogTypeAttribute>,
    ) -> Result<CatalogType, CatalogError> {
        let request = UpdateSchemaRequest {
            version,
            attributes,
        };
        let envelope: TypeEnvelope = self
            .send(
                Method::POST,
                &format!("/v2/catalog_types/{id}/actions/update_schema"),
                Some(&request),
            )
            .await?;
        Ok(envelope.catalog_type)
    }

    async fn destroy_type(&self, id: &str) -> Result<(), CatalogError> {
        self.send_no_content(Method::DELETE, &format!("/v2/catalog_types/{id}"))
            .await
    }

    async fn list_entries(&self, type_id: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut path = format!(
                "/v2/catalog_entries?catalog_type_id={type_id}&page_size={ENTRIES_PAGE_SIZE}"
            );
            if let Some(cursor) = &after {
                path.push_str(&format!("&after={cursor}"));
            }

            let envelope: EntriesEnvelope = self.send(Method::GET, &path, None::<&()>).await?;
            let page_len = envelope.catalog_entries.len();
            entries.extend(envelope.catalog_entries);

            debug!(type_id, page_len, total = entries.len(), "listed entries page");
            match envelope.pagination_meta.after {
                Some(cursor) if page_len > 0 => after = Some(cursor),
                _ => return Ok(entries),
            }
        }
    }

    async fn create_entry(
        &self,
        request: CreateEntryRequest,
    ) -> Result<CatalogEntry, CatalogError> {
        let envelope: EntryEnvelope = self
            .send(Method::POST, "/v2/catalog_entries", Some(&request))
            .await?;
        Ok(envelope.catalog_entry)
    }

    async fn update_entry(
        &self,
        id: &str,
        request: UpdateEntryRequest,
    ) -> Result<CatalogEntry, CatalogError> {
        let envelope: EntryEnvelope = self
            .send(Method::PUT, &format!("/v2/catalog_entries/{id}"), Some(&request))
            .await?;
        Ok(envelope.catalog_entry)
    }

    async fn destroy_entry(&self, id: &str) -> Result<(), CatalogError> {
        self.send_no_content(Method::DELETE, &format!("/v2/catalog_entries/{id}"))
            .await
    }
}
