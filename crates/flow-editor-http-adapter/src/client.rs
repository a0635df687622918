//! reqwest client for the integration store

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use flow_editor::{IntegrationDocument, PersistenceClient, Step, StepDescriptorFetcher};

use crate::config::HttpAdapterConfig;
use crate::constants::paths;
use crate::error::{HttpAdapterError, Result};

/// Client for the integration store's REST API
#[derive(Debug, Clone)]
pub struct HttpIntegrationClient {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    /// Base URL, without a trailing slash
    base_url: String,
}

impl HttpIntegrationClient {
    pub fn new(config: &HttpAdapterConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(&HttpAdapterConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn integration_url(&self, id: &str) -> String {
        self.url(&format!("{}/{}", paths::INTEGRATIONS, id))
    }

    /// Turn a non-success response into a `Status` error
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(HttpAdapterError::Status { status, body })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| HttpAdapterError::Decode(e.to_string()))
    }

    /// Create an integration; the store assigns its ID
    pub async fn create(&self, document: &IntegrationDocument) -> Result<IntegrationDocument> {
        let response = self
            .http_client
            .post(self.url(paths::INTEGRATIONS))
            .json(document)
            .send()
            .await?;
        let created: IntegrationDocument = Self::decode(Self::check(response).await?).await?;
        log::debug!("Created integration {:?}", created.id);
        Ok(created)
    }

    pub async fn get(&self, id: &str) -> Result<IntegrationDocument> {
        let response = self.http_client.get(self.integration_url(id)).send().await?;
        Self::decode(Self::check(response).await?).await
    }

    /// Update a stored integration and read it back
    ///
    /// The store does not echo the document on update, so the new
    /// concurrency markers are fetched with a follow-up GET.
    pub async fn update(&self, id: &str, document: &IntegrationDocument) -> Result<IntegrationDocument> {
        let response = self
            .http_client
            .put(self.integration_url(id))
            .json(document)
            .send()
            .await?;
        Self::check(response).await?;
        log::debug!("Updated integration '{}'", id);
        self.get(id).await
    }

    pub async fn deploy_integration(&self, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.integration_url(id), paths::DEPLOYMENTS);
        let response = self.http_client.put(url).send().await?;
        Self::check(response).await?;
        log::debug!("Deployed integration '{}'", id);
        Ok(())
    }

    /// Ask the store to resolve descriptors for `steps`
    pub async fn fetch_descriptors(&self, steps: &[Step]) -> Result<Vec<Step>> {
        let response = self
            .http_client
            .post(self.url(paths::STEP_DESCRIPTORS))
            .json(steps)
            .send()
            .await?;
        let enriched: Vec<Step> = Self::decode(Self::check(response).await?).await?;
        if enriched.len() != steps.len() {
            return Err(HttpAdapterError::DescriptorCount {
                expected: steps.len(),
                actual: enriched.len(),
            });
        }
        Ok(enriched)
    }
}

#[async_trait]
impl PersistenceClient for HttpIntegrationClient {
    async fn update_or_create(&self, document: IntegrationDocument) -> flow_editor::Result<IntegrationDocument> {
        let stored = match document.id.as_deref() {
            Some(id) => self.update(id, &document).await?,
            None => self.create(&document).await?,
        };
        Ok(stored)
    }

    async fn deploy(&self, document: &IntegrationDocument) -> flow_editor::Result<()> {
        let id = document
            .id
            .as_deref()
            .ok_or_else(|| flow_editor::FlowEditorError::Deploy("integration has not been saved".to_string()))?;
        self.deploy_integration(id)
            .await
            .map_err(HttpAdapterError::into_deploy)
    }
}

#[async_trait]
impl StepDescriptorFetcher for HttpIntegrationClient {
    async fn fetch(&self, steps: Vec<Step>) -> flow_editor::Result<Vec<Step>> {
        self.fetch_descriptors(&steps)
            .await
            .map_err(HttpAdapterError::into_descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        routing::{post, put},
        Json, Router,
    };
    use flow_editor::{Connection, Flow, FlowEditor, FlowEditorError, FlowEvent, StepKind};
    use parking_lot::Mutex;

    /// Stand-in for the integration store
    #[derive(Default)]
    struct Backend {
        integrations: Mutex<HashMap<String, IntegrationDocument>>,
        deployments: Mutex<Vec<String>>,
    }

    type Shared = Arc<Backend>;

    async fn create_integration(
        State(backend): State<Shared>,
        Json(mut document): Json<IntegrationDocument>,
    ) -> (StatusCode, Json<IntegrationDocument>) {
        let mut integrations = backend.integrations.lock();
        let id = format!("int-{}", integrations.len() + 1);
        document.id = Some(id.clone());
        document.version = Some(1);
        document.updated_at = Some(1000);
        integrations.insert(id, document.clone());
        (StatusCode::CREATED, Json(document))
    }

    async fn update_integration(
        State(backend): State<Shared>,
        Path(id): Path<String>,
        Json(mut document): Json<IntegrationDocument>,
    ) -> StatusCode {
        let mut integrations = backend.integrations.lock();
        let Some(previous) = integrations.get(&id) else {
            return StatusCode::NOT_FOUND;
        };
        document.version = previous.version.map(|v| v + 1);
        document.updated_at = previous.updated_at.map(|t| t + 1);
        integrations.insert(id, document);
        StatusCode::NO_CONTENT
    }

    async fn get_integration(
        State(backend): State<Shared>,
        Path(id): Path<String>,
    ) -> std::result::Result<Json<IntegrationDocument>, (StatusCode, String)> {
        backend
            .integrations
            .lock()
            .get(&id)
            .cloned()
            .map(Json)
            .ok_or((StatusCode::NOT_FOUND, format!("no integration {}", id)))
    }

    async fn deploy_integration(State(backend): State<Shared>, Path(id): Path<String>) -> StatusCode {
        if !backend.integrations.lock().contains_key(&id) {
            return StatusCode::NOT_FOUND;
        }
        backend.deployments.lock().push(id);
        StatusCode::OK
    }

    /// Names every step after its kind
    async fn describe_steps(Json(steps): Json<Vec<Step>>) -> Json<Vec<Step>> {
        Json(
            steps
                .into_iter()
                .map(|step| Step {
                    name: step.step_kind.map(|k| k.to_string()),
                    ..step
                })
                .collect(),
        )
    }

    /// Loses the last step
    async fn truncate_steps(Json(mut steps): Json<Vec<Step>>) -> Json<Vec<Step>> {
        steps.pop();
        Json(steps)
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("Test store error: {}", e);
            }
        });
        format!("http://{}/api/v1", addr)
    }

    async fn start_store() -> (HttpIntegrationClient, Shared) {
        let _ = env_logger::builder().is_test(true).try_init();
        let backend = Shared::default();
        let api = Router::new()
            .route("/integrations", post(create_integration))
            .route("/integrations/:id", put(update_integration).get(get_integration))
            .route("/integrations/:id/deployments", put(deploy_integration))
            .route("/steps/descriptor", post(describe_steps))
            .with_state(backend.clone());
        let base_url = serve(Router::new().nest("/api/v1", api)).await;
        let client = HttpIntegrationClient::new(&HttpAdapterConfig::default().with_base_url(base_url)).unwrap();
        (client, backend)
    }

    fn endpoint(connector: &str) -> Step {
        Step::placeholder().with_connection(Connection::for_connector(connector))
    }

    fn sample_document() -> IntegrationDocument {
        IntegrationDocument::new("timer to http").with_flow(Flow::new("f").with_steps(vec![
            endpoint("timer"),
            Step::new(StepKind::Log),
            endpoint("http"),
        ]))
    }

    #[tokio::test]
    async fn test_create_then_update_reads_back_markers() {
        let (client, backend) = start_store().await;

        let created = client.update_or_create(sample_document()).await.unwrap();
        assert_eq!(created.id.as_deref(), Some("int-1"));
        assert_eq!(created.version, Some(1));

        let renamed = IntegrationDocument {
            name: "renamed".to_string(),
            ..created
        };
        let updated = client.update_or_create(renamed).await.unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.version, Some(2));
        assert_eq!(updated.updated_at, Some(1001));
        assert_eq!(backend.integrations.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (client, _) = start_store().await;

        match client.get("missing").await {
            Err(HttpAdapterError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "no integration missing");
            }
            other => panic!("Expected Status error, got {:?}", other),
        }

        let mut unknown = sample_document();
        unknown.id = Some("missing".to_string());
        let result = client.update_or_create(unknown).await;
        assert!(matches!(result, Err(FlowEditorError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_deploy() {
        let (client, backend) = start_store().await;

        let unsaved = client.deploy(&sample_document()).await;
        assert!(matches!(unsaved, Err(FlowEditorError::Deploy(_))));

        let saved = client.update_or_create(sample_document()).await.unwrap();
        client.deploy(&saved).await.unwrap();
        assert_eq!(*backend.deployments.lock(), vec!["int-1".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_descriptors_keeps_order() {
        let (client, _) = start_store().await;
        let steps = sample_document().flows[0].steps.clone();

        let enriched = client.fetch(steps.clone()).await.unwrap();
        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[1].name.as_deref(), Some("log"));
        let ids: Vec<_> = enriched.iter().map(|s| s.id.clone()).collect();
        let expected: Vec<_> = steps.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_descriptor_count_mismatch() {
        let base_url = serve(Router::new().route("/api/v1/steps/descriptor", post(truncate_steps))).await;
        let client = HttpIntegrationClient::new(&HttpAdapterConfig::default().with_base_url(base_url)).unwrap();
        let steps = sample_document().flows[0].steps.clone();

        let result = client.fetch_descriptors(&steps).await;
        assert!(matches!(
            result,
            Err(HttpAdapterError::DescriptorCount { expected: 3, actual: 2 })
        ));
        assert!(matches!(client.fetch(steps).await, Err(FlowEditorError::Descriptor(_))));
    }

    #[tokio::test]
    async fn test_editor_over_http() {
        let (client, backend) = start_store().await;
        let client = Arc::new(client);
        let editor = FlowEditor::new(client.clone(), client);
        editor.set_document(sample_document());

        editor
            .dispatch(FlowEvent::RemoveStep {
                position: 1,
                skip_reconcile: false,
            })
            .await
            .unwrap();
        assert_eq!(editor.start_step().and_then(|s| s.name).as_deref(), Some("endpoint"));

        editor.dispatch(FlowEvent::Save { publish: true }).await.unwrap();
        assert_eq!(editor.document().and_then(|d| d.id).as_deref(), Some("int-1"));
        assert!(!editor.is_dirty());
        assert_eq!(*backend.deployments.lock(), vec!["int-1".to_string()]);

        let stored = backend.integrations.lock().get("int-1").cloned().unwrap();
        assert_eq!(stored.flows[0].steps.len(), 2);
        assert!(stored.tags.contains("timer"));
    }
}
