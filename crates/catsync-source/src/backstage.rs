//! Backstage entities API source.
//!
//! Pages through the by-query endpoint until an empty page comes back. When
//! a token is configured it is either signed into a short-lived JWT per the
//! Backstage external-caller auth scheme, or sent as-is.

use std::time::Duration;

use base64::Engine as _;
use catsync_core::{Credential, SourceBackstage};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::entry::SourceEntry;
use crate::error::SourceError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifetime of a minted JWT, in seconds.
const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Serialize)]
struct Claims {
    sub: &'static str,
    exp: i64,
}

/// Pull all entities from Backstage, one source entry per returned object.
pub async fn load(config: &SourceBackstage) -> Result<Vec<SourceEntry>, SourceError> {
    let bearer = if config.token.is_empty() {
        None
    } else if config.should_sign_jwt() {
        Some(mint_jwt(&config.token)?)
    } else {
        Some(config.token.expose().to_string())
    };

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SourceError::Http {
            message: e.to_string(),
        })?;

    let origin = format!("backstage (endpoint={})", config.endpoint);
    let mut offset = config.offset;
    let mut entries = Vec::new();

    loop {
        let mut query: Vec<(&str, String)> = Vec::new();
        if !config.filters.is_empty() {
            query.push(("filter", config.filters.clone()));
        }
        if config.limit > 0 {
            query.push(("limit", config.limit.to_string()));
        }
        if offset > 0 {
            query.push(("offset", offset.to_string()));
        }

        let mut request = client.get(&config.endpoint).query(&query);
        if let Some(token) = &bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| SourceError::Http {
            message: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(SourceError::BackstageStatus {
                status: response.status().to_string(),
            });
        }

        let page: Vec<Value> = response.json().await.map_err(|e| SourceError::Http {
            message: e.to_string(),
        })?;
        if page.is_empty() {
            debug!(total = entries.len(), "backstage pagination complete");
            return Ok(entries);
        }

        offset += page.len() as u32;
        for item in page {
            let content = serde_json::to_vec(&item).map_err(|e| SourceError::Encode {
                message: e.to_string(),
            })?;
            entries.push(SourceEntry {
                origin: origin.clone(),
                filename: None,
                content,
            });
        }
    }
}

/// Mint a JWT valid for external Backstage authentication: the configured
/// token is a base64 HMAC-SHA256 secret, the subject is fixed and the token
/// expires in an hour.
///
/// https://backstage.io/docs/auth/service-to-service-auth/#usage-in-external-callers
fn mint_jwt(token: &Credential) -> Result<String, SourceError> {
    let secret = base64::engine::general_purpose::STANDARD
        .decode(token.expose())
        .map_err(|e| SourceError::TokenNotBase64 {
            message: e.to_string(),
        })?;

    let claims = Claims {
        sub: "backstage-server",
        exp: chrono::Utc::now().timestamp() + TOKEN_TTL_SECS,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(&secret),
    )
    .map_err(|e| SourceError::Jwt {
        message: e.to_string(),
    })
}
