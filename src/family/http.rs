// src/family/http.rs
// =============================================================================
// HTTP implementation of the family provider.
//
// Request:
//   GET {base}/family-group?ids=<id>,<id>,...&access_token=<token>
//
// Response:
//   { "results": [ { "focus": "...", "parents": [...], "relatives": [...] } ] }
//   or
//   { "error": { "type": "OAuthException", "message": "Invalid access token" } }
//
// Failure handling:
// - HTTP 401 or an OAuth error body  -> ScoutError::Auth (ends the run)
// - network errors / other HTTP codes -> ScoutError::ProviderUnavailable
// - a unit or relative that does not parse is skipped with a warning
// =============================================================================

use crate::error::{Result, ScoutError};
use crate::family::provider::FamilyProvider;
use crate::family::types::{FamilyUnit, ProfileId, Relative};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Marker the API puts in error bodies when a token has expired
const INVALID_TOKEN: &str = "Invalid access token";

pub struct HttpFamilyProvider {
    client: Client,
    base: Url,
}

impl HttpFamilyProvider {
    // Creates a provider rooted at base_url
    //
    // A trailing slash is added to the base path so that joining
    // "family-group" keeps any path prefix (e.g. /api/) intact.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base })
    }

    fn family_group_url(&self, ids: &[ProfileId], credential: &str) -> Result<Url> {
        let mut url = self.base.join("family-group")?;
        url.query_pairs_mut()
            .append_pair("ids", &ids.join(","))
            .append_pair("access_token", credential);
        Ok(url)
    }
}

#[async_trait]
impl FamilyProvider for HttpFamilyProvider {
    async fn fetch_family_group(
        &self,
        ids: &[ProfileId],
        credential: &str,
    ) -> Result<Vec<FamilyUnit>> {
        let url = self.family_group_url(ids, credential)?;
        tracing::debug!(batch = ids.len(), "Fetching family group");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ScoutError::Auth);
        }

        if !status.is_success() {
            // Error bodies can still carry the OAuth marker
            let body = response.text().await.unwrap_or_default();
            if body.contains(INVALID_TOKEN) || body.contains("OAuthException") {
                return Err(ScoutError::Auth);
            }
            return Err(ScoutError::ProviderUnavailable(format!("HTTP {}", status.as_u16())));
        }

        let body: Value = response.json().await?;
        parse_family_group(body)
    }
}

// Shape of a unit before its relatives are validated one by one
#[derive(Deserialize)]
struct RawUnit {
    #[serde(default)]
    focus: Option<ProfileId>,
    #[serde(default)]
    parents: Vec<ProfileId>,
    #[serde(default)]
    relatives: Vec<Value>,
}

// Turns a decoded response body into family units
fn parse_family_group(body: Value) -> Result<Vec<FamilyUnit>> {
    if let Some(error) = body.get("error") {
        return Err(classify_error_body(error));
    }

    let results = match body {
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(results)) => results,
            _ => return Err(ScoutError::MalformedUnit("response has no results array".into())),
        },
        _ => return Err(ScoutError::MalformedUnit("response is not an object".into())),
    };

    let mut units = Vec::with_capacity(results.len());
    for raw in results {
        let raw: RawUnit = match serde_json::from_value(raw) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %ScoutError::from(e), "Skipping family unit");
                continue;
            }
        };

        let relatives = raw
            .relatives
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Relative>(value) {
                Ok(relative) => Some(relative),
                Err(e) => {
                    tracing::warn!(error = %ScoutError::from(e), "Skipping relative");
                    None
                }
            })
            .collect();

        units.push(FamilyUnit {
            focus: raw.focus,
            parents: raw.parents,
            relatives,
        });
    }

    Ok(units)
}

fn classify_error_body(error: &Value) -> ScoutError {
    let kind = error.get("type").and_then(Value::as_str).unwrap_or("");
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .unwrap_or("unknown error");

    if kind == "OAuthException" || message.contains(INVALID_TOKEN) {
        ScoutError::Auth
    } else {
        ScoutError::ProviderUnavailable(message.to_string())
    }
}
