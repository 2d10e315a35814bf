//! CKAN action API client
//!
//! Every action is a `POST {site_url}/api/3/action/{action}` with a JSON
//! body; responses carry the `{success, result, error}` envelope. Errors are
//! classified into [`CkanError`] so `Not Found Error` stays distinguishable.

use crate::adapters::ckan::models::{
    ActionEnvelope, ActionError, DatastoreCreate, DatastoreCreated, DatastoreSearch, FieldSpec,
    GeomColumns, Package, PackageCreate, Record,
};
use crate::adapters::ckan::service::DatasetService;
use crate::config::CkanConfig;
use crate::datasets::{GeospatialFields, PackageDescriptor};
use crate::domain::{CkanError, ResourceId, Result, SyncError};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// HTTP client for the CKAN action API
pub struct CkanClient {
    /// Site root without trailing slash
    site_url: String,

    client: Client,

    config: CkanConfig,
}

impl CkanClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: CkanConfig) -> Result<Self> {
        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("catalogue-sync/", env!("CARGO_PKG_VERSION")));

        if !config.tls_verify {
            tracing::warn!("TLS certificate verification disabled for CKAN");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            CkanError::ConnectionFailed(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            site_url: config.site_url.trim_end_matches('/').to_string(),
            client,
            config,
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/api/3/action/{action}", self.site_url)
    }

    /// Call an action and decode its `result`
    async fn call<P, T>(&self, action: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(action, "Calling CKAN action");

        let mut request = self.client.post(self.action_url(action)).json(params);
        if let Some(api_key) = &self.config.api_key {
            request = request.header(AUTHORIZATION, api_key.expose_secret().as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| CkanError::ConnectionFailed(format!("{action}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CkanError::InvalidResponse(format!("{action}: {e}")))?;

        let result = parse_response(action, status, &body)?;
        serde_json::from_value(result).map_err(|e| {
            SyncError::from(CkanError::InvalidResponse(format!(
                "{action}: unexpected result shape: {e}"
            )))
        })
    }
}

/// Unwrap the action envelope, classifying failures
fn parse_response(action: &str, status: StatusCode, body: &str) -> Result<serde_json::Value> {
    match serde_json::from_str::<ActionEnvelope>(body) {
        Ok(envelope) if envelope.success => envelope.result.ok_or_else(|| {
            CkanError::InvalidResponse(format!("{action}: response has no result")).into()
        }),
        Ok(envelope) => Err(classify_error(
            action,
            status,
            &envelope.error.unwrap_or_default(),
        )
        .into()),
        Err(_) if status.is_success() => Err(CkanError::InvalidResponse(format!(
            "{action}: response is not an action envelope"
        ))
        .into()),
        Err(_) => Err(classify_error(
            action,
            status,
            &ActionError {
                message: Some(truncate(body, 200)),
                ..ActionError::default()
            },
        )
        .into()),
    }
}

fn classify_error(action: &str, status: StatusCode, error: &ActionError) -> CkanError {
    let message = format!("{action}: {}", error.describe());

    match error.error_type.as_deref() {
        Some("Not Found Error") => CkanError::NotFound(message),
        Some("Authorization Error") => CkanError::Authorization(message),
        Some("Validation Error") => CkanError::Validation(message),
        _ if status == StatusCode::NOT_FOUND => CkanError::NotFound(message),
        _ if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED => {
            CkanError::Authorization(message)
        }
        _ if status.is_server_error() => CkanError::ServerError {
            status: status.as_u16(),
            message,
        },
        _ if status.is_client_error() => CkanError::ClientError {
            status: status.as_u16(),
            message,
        },
        _ => CkanError::ActionFailed {
            action: action.to_string(),
            message,
        },
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[async_trait]
impl DatasetService for CkanClient {
    async fn package_show(&self, name: &str) -> Result<Package> {
        self.call("package_show", &json!({ "id": name })).await
    }

    async fn package_create(&self, package: &PackageDescriptor) -> Result<Package> {
        let request = PackageCreate {
            package,
            resources: Vec::new(),
        };
        self.call("package_create", &request).await
    }

    async fn datastore_fields(&self, resource_id: &ResourceId) -> Result<Vec<FieldSpec>> {
        let search: DatastoreSearch = self
            .call(
                "datastore_search",
                &json!({ "resource_id": resource_id.as_str(), "limit": 0 }),
            )
            .await?;
        Ok(search.fields)
    }

    async fn datastore_create(&self, request: &DatastoreCreate) -> Result<ResourceId> {
        let created: DatastoreCreated = self.call("datastore_create", request).await?;
        ResourceId::new(created.resource_id).map_err(|e| CkanError::InvalidResponse(e).into())
    }

    async fn create_geom_columns(
        &self,
        resource_id: &ResourceId,
        fields: &GeospatialFields,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "create_geom_columns",
                &GeomColumns::new(resource_id.as_str(), fields),
            )
            .await?;
        Ok(())
    }

    async fn datastore_upsert(
        &self,
        resource_id: &ResourceId,
        records: Vec<Record>,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "datastore_upsert",
                &json!({
                    "resource_id": resource_id.as_str(),
                    "records": records,
                    "method": "upsert",
                    "force": true,
                }),
            )
            .await?;
        Ok(())
    }

    async fn datastore_delete(&self, resource_id: &ResourceId, filters: Record) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "datastore_delete",
                &json!({
                    "resource_id": resource_id.as_str(),
                    "filters": filters,
                    "force": true,
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_url_trims_slash() {
        let config = CkanConfig {
            site_url: "https://data.example.org/".to_string(),
            ..CkanConfig::default()
        };
        let client = CkanClient::new(config).unwrap();
        assert_eq!(
            client.action_url("package_show"),
            "https://data.example.org/api/3/action/package_show"
        );
    }

    #[test]
    fn test_parse_not_found_by_type() {
        let body = r#"{"success": false, "error": {"__type": "Not Found Error", "message": "Not found"}}"#;
        let err = parse_response("package_show", StatusCode::NOT_FOUND, body).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_not_found_by_status() {
        let err = parse_response("package_show", StatusCode::NOT_FOUND, "<html>").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_server_error() {
        let err = parse_response("datastore_upsert", StatusCode::BAD_GATEWAY, "bad gateway")
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Ckan(CkanError::ServerError { status: 502, .. })
        ));
    }

    #[test]
    fn test_parse_validation_error() {
        let body = r#"{"success": false, "error": {"__type": "Validation Error", "fields": ["bad"]}}"#;
        let err = parse_response("datastore_create", StatusCode::CONFLICT, body).unwrap_err();
        assert!(matches!(err, SyncError::Ckan(CkanError::Validation(_))));
    }

    #[test]
    fn test_success_without_envelope_is_invalid() {
        let err = parse_response("package_show", StatusCode::OK, "[]").unwrap_err();
        assert!(matches!(err, SyncError::Ckan(CkanError::InvalidResponse(_))));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ab", 3), "ab");
    }
}
