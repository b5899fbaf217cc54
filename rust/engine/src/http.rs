// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! REST client for the annotation backend.
//!
//! # Endpoints
//!
//! - `GET /api/todo/:model?sortBy=&filter=&manager=` - list annotations
//! - `POST /api/todo` - create an annotation
//! - `PUT /api/todo/:id` / `DELETE /api/todo/:id` - edit, delete
//! - `GET /api/manager` - assignable managers
//! - `GET /api/ifcs/name` - model catalog
//! - `GET /api/ifc/:id` / `DELETE /api/ifc/:id` - model content, delete

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use bimtodo_core::{
    AnnotationId, AnnotationRecord, EntityKind, Error, Manager, ModelSummary, NetworkError,
    PersistedModelId, QueryParams, Result, StatusClass,
};

use crate::config::EngineConfig;
use crate::store::{AnnotationPatch, AnnotationStore, ModelStore, NewAnnotation};

/// Annotation and model store backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: String,
    http: reqwest::Client,
}

impl HttpStore {
    /// Create a client for `config.api_url` with the configured timeout.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| NetworkError::transport("build http client", e.to_string()))?;
        Ok(Self::with_client(&config.api_url, http))
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends `request`. A 404 becomes `NotFound` for `missing` when given;
    /// any other non-2xx becomes a `Network` error carrying the body text.
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        missing: Option<(EntityKind, String)>,
    ) -> Result<Response> {
        let resp = request.send().await.map_err(|e| {
            tracing::warn!(operation, error = %e, "Backend unreachable");
            NetworkError::transport(operation, e.to_string())
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(
            operation,
            status = status.as_u16(),
            body = %body,
            "Backend rejected request"
        );
        Err(status_error(operation, status, missing, body))
    }

    async fn decode<T: DeserializeOwned>(operation: &'static str, resp: Response) -> Result<T> {
        resp.json::<T>().await.map_err(|e| {
            NetworkError::transport(operation, format!("invalid response body: {e}")).into()
        })
    }
}

/// Maps a non-2xx response. A 404 on a keyed call means the entity is gone;
/// everything else is a `Network` error classed by status.
fn status_error(
    operation: &'static str,
    status: StatusCode,
    missing: Option<(EntityKind, String)>,
    body: String,
) -> Error {
    match missing {
        Some((kind, id)) if status == StatusCode::NOT_FOUND => Error::not_found(kind, id),
        _ => NetworkError::new(operation, StatusClass::from_status(status.as_u16()), body).into(),
    }
}

#[async_trait]
impl AnnotationStore for HttpStore {
    async fn list(&self, query: &QueryParams) -> Result<Vec<AnnotationRecord>> {
        let request = self
            .http
            .get(self.url(&format!("/api/todo/{}", query.model_id)))
            .query(&query.to_query_pairs());
        let missing = Some((EntityKind::Model, query.model_id.to_string()));
        let resp = self.send("list annotations", request, missing).await?;
        Self::decode("list annotations", resp).await
    }

    async fn create(&self, fields: &NewAnnotation) -> Result<AnnotationRecord> {
        let request = self.http.post(self.url("/api/todo")).json(fields);
        let resp = self.send("create annotation", request, None).await?;
        Self::decode("create annotation", resp).await
    }

    async fn update(&self, id: AnnotationId, patch: &AnnotationPatch) -> Result<()> {
        let request = self.http.put(self.url(&format!("/api/todo/{id}"))).json(patch);
        self.send("update annotation", request, Some((EntityKind::Annotation, id.to_string())))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: AnnotationId) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/api/todo/{id}")));
        self.send("delete annotation", request, Some((EntityKind::Annotation, id.to_string())))
            .await?;
        Ok(())
    }

    async fn managers(&self) -> Result<Vec<Manager>> {
        let resp = self
            .send("list managers", self.http.get(self.url("/api/manager")), None)
            .await?;
        Self::decode("list managers", resp).await
    }
}

#[async_trait]
impl ModelStore for HttpStore {
    async fn list_names(&self) -> Result<Vec<ModelSummary>> {
        let resp = self
            .send("list models", self.http.get(self.url("/api/ifcs/name")), None)
            .await?;
        Self::decode("list models", resp).await
    }

    async fn fetch_content(&self, id: PersistedModelId) -> Result<Vec<u8>> {
        let request = self.http.get(self.url(&format!("/api/ifc/{id}")));
        let resp = self
            .send("fetch model", request, Some((EntityKind::Model, id.to_string())))
            .await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| NetworkError::transport("fetch model", e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, id: PersistedModelId) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/api/ifc/{id}")));
        self.send("delete model", request, Some((EntityKind::Model, id.to_string())))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let store = HttpStore::with_client("http://backend:3000/", reqwest::Client::new());
        assert_eq!(store.base_url(), "http://backend:3000");
        assert_eq!(store.url("/api/manager"), "http://backend:3000/api/manager");
    }

    #[test]
    fn keyed_404_is_not_found() {
        let err = status_error(
            "delete annotation",
            StatusCode::NOT_FOUND,
            Some((EntityKind::Annotation, "7".to_string())),
            String::new(),
        );
        assert_eq!(err, Error::not_found(EntityKind::Annotation, 7));
    }

    #[test]
    fn unkeyed_404_is_a_client_error() {
        let err = status_error("list managers", StatusCode::NOT_FOUND, None, "no route".into());
        match err {
            Error::Network(e) => {
                assert_eq!(e.class, StatusClass::Client(404));
                assert_eq!(e.message, "no route");
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[test]
    fn other_statuses_are_classed() {
        let missing = || Some((EntityKind::Annotation, "7".to_string()));

        let rejected = status_error(
            "update annotation",
            StatusCode::UNPROCESSABLE_ENTITY,
            missing(),
            "bad deadline".into(),
        );
        assert!(matches!(rejected, Error::Network(ref e) if e.class == StatusClass::Client(422)));
        assert!(!rejected.is_retryable());

        let down = status_error(
            "update annotation",
            StatusCode::SERVICE_UNAVAILABLE,
            missing(),
            String::new(),
        );
        assert!(matches!(down, Error::Network(ref e) if e.class == StatusClass::Server(503)));
        assert!(down.is_retryable());
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_retryable_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let store = HttpStore::with_client("http://127.0.0.1:9", reqwest::Client::new());
        let err = store.managers().await.unwrap_err();
        assert!(matches!(err, Error::Network(ref e) if e.class == StatusClass::Transport));
        assert!(err.is_retryable());
    }
}
