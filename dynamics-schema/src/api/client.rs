//! Dynamics 365 Web API client for metadata operations

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::metadata::{SchemaSnapshot, parse_entity_definitions};
use super::operations::{Operation, OperationResult};
use super::service::MetadataService;

pub const DEFAULT_API_VERSION: &str = "v9.2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// `$select`/`$expand` needed to build a [`SchemaSnapshot`]
const SNAPSHOT_QUERY: &str = "EntityDefinitions?$select=LogicalName,SchemaName\
&$expand=Attributes($select=LogicalName,SchemaName,AttributeType),\
Keys($select=LogicalName,SchemaName,KeyAttributes),\
ManyToOneRelationships($select=SchemaName,ReferencedEntity,ReferencingEntity),\
OneToManyRelationships($select=SchemaName,ReferencedEntity,ReferencingEntity),\
ManyToManyRelationships($select=SchemaName,Entity1LogicalName,Entity2LogicalName)";

/// Authenticated client for a single Dynamics 365 environment
///
/// Token acquisition happens elsewhere; the client only attaches the bearer token.
#[derive(Debug, Clone)]
pub struct DynamicsClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    access_token: String,
}

impl DynamicsClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::with_api_version(base_url, access_token, DEFAULT_API_VERSION)
    }

    pub fn with_api_version(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            access_token: access_token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path below the versioned API root
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/data/{}/{}",
            self.base_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
    }
}

#[async_trait]
impl MetadataService for DynamicsClient {
    async fn fetch_snapshot(&self) -> Result<SchemaSnapshot> {
        let url = self.api_url(SNAPSHOT_QUERY);
        log::debug!("GET {}", url);

        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .context("Failed to request entity definitions")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read entity definitions response")?;

        if !status.is_success() {
            anyhow::bail!(
                "Entity definitions request failed: {}",
                describe_error(status, &body)
            );
        }

        let json: Value =
            serde_json::from_str(&body).context("Entity definitions response is not JSON")?;
        let snapshot = parse_entity_definitions(&json)?;

        log::info!("Retrieved {} entity definitions", snapshot.len());
        Ok(snapshot)
    }

    async fn execute(&self, operation: &Operation) -> Result<OperationResult> {
        let url = self.api_url(&operation.path());
        let method = reqwest::Method::from_bytes(operation.http_method().as_bytes())
            .context("Invalid HTTP method")?;

        log::debug!(
            "{} {} ({})",
            operation.http_method(),
            url,
            operation.schema_name().unwrap_or("-")
        );

        let mut request = self
            .request(method, &url)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(operation.payload());

        if let Some(solution) = operation.solution_name() {
            request = request.header("MSCRM.SolutionUniqueName", solution);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {}", operation.operation_type()))?;

        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter(|(name, _)| name.as_str().eq_ignore_ascii_case("OData-EntityId"))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|err| err.to_string());
        if let Err(err) = &body {
            log::debug!("Failed to read response body for {}: {}", url, err);
        }

        if status.is_success() {
            let data = body.ok().and_then(|body| serde_json::from_str(&body).ok());
            let mut result = OperationResult::success(operation.clone(), data);
            result.status_code = Some(status.as_u16());
            result.headers = headers;
            Ok(result)
        } else {
            Ok(OperationResult::error(
                operation.clone(),
                rejection_message(status, body.as_deref()),
                Some(status.as_u16()),
            ))
        }
    }
}

/// Extract `error.message` from an OData error body
fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

/// Error text for a rejected operation; a body that could not be read is
/// reported alongside the status instead of being dropped
fn rejection_message(status: StatusCode, body: Result<&str, &String>) -> String {
    match body {
        Ok(body) => error_message(body).unwrap_or_else(|| status.to_string()),
        Err(err) => format!("{} (failed to read response body: {})", status, err),
    }
}

fn describe_error(status: StatusCode, body: &str) -> String {
    match error_message(body) {
        Some(message) => format!("{} ({})", message, status),
        None => status.to_string(),
    }
}
