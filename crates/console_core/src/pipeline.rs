//! Client for the remote test-generation service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use shared::{
    domain::{ArtifactTree, PushResult, Requirement},
    error::{ConsoleError, ConsoleResult, PipelineAction},
    protocol::{
        IndexRequest, PushRequest, ScenarioRequest, TestCaseRequest, INDEX_PATH, JIRA_PUSH_PATH,
        JIRA_REQUIREMENTS_PREFIX, SCENARIOS_PATH, TESTCASES_PATH,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::state::validate_http_url;

/// Upper bound per request kind. Test-case generation gets the longest budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub index: Duration,
    pub requirements: Duration,
    pub scenarios: Duration,
    pub testcases: Duration,
    pub push: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            index: Duration::from_secs(300),
            requirements: Duration::from_secs(120),
            scenarios: Duration::from_secs(300),
            testcases: Duration::from_secs(900),
            push: Duration::from_secs(600),
        }
    }
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            index: timeout,
            requirements: timeout,
            scenarios: timeout,
            testcases: timeout,
            push: timeout,
        }
    }

    pub fn for_action(&self, action: PipelineAction) -> Duration {
        match action {
            PipelineAction::BuildKnowledgeBase => self.index,
            PipelineAction::FetchRequirements => self.requirements,
            PipelineAction::CreateScenarios => self.scenarios,
            PipelineAction::CreateTestCases => self.testcases,
            PipelineAction::PushToJira => self.push,
        }
    }
}

/// The five calls the console makes. `api_base` travels with each call
/// because the operator can change it mid-session.
#[async_trait]
pub trait PipelineClient: Send + Sync {
    /// Opaque response; the console only stores it.
    async fn build_index(&self, api_base: &str, request: &IndexRequest) -> ConsoleResult<Value>;
    async fn fetch_requirements(
        &self,
        api_base: &str,
        issue_key: &str,
    ) -> ConsoleResult<Vec<Requirement>>;
    async fn generate_scenarios(
        &self,
        api_base: &str,
        request: &ScenarioRequest,
    ) -> ConsoleResult<ArtifactTree>;
    async fn generate_testcases(
        &self,
        api_base: &str,
        request: &TestCaseRequest,
    ) -> ConsoleResult<ArtifactTree>;
    async fn push_to_jira(&self, api_base: &str, request: &PushRequest)
        -> ConsoleResult<PushResult>;
}

#[derive(Clone)]
pub struct HttpPipelineClient {
    http: Client,
    timeouts: Timeouts,
}

impl Default for HttpPipelineClient {
    fn default() -> Self {
        Self::new(Timeouts::default())
    }
}

impl HttpPipelineClient {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            http: Client::new(),
            timeouts,
        }
    }

    async fn post<B, T>(
        &self,
        api_base: &str,
        path: &str,
        body: &B,
        action: PipelineAction,
    ) -> ConsoleResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = endpoint(api_base, path)?;
        let timeout = self.timeouts.for_action(action);
        debug!(%url, ?timeout, action = %action, "pipeline request");
        let text = execute(self.http.post(url).json(body).timeout(timeout), path, timeout).await?;
        decode_body(path, json_or_raw_text(&text))
    }
}

#[async_trait]
impl PipelineClient for HttpPipelineClient {
    async fn build_index(&self, api_base: &str, request: &IndexRequest) -> ConsoleResult<Value> {
        self.post(api_base, INDEX_PATH, request, PipelineAction::BuildKnowledgeBase)
            .await
    }

    async fn fetch_requirements(
        &self,
        api_base: &str,
        issue_key: &str,
    ) -> ConsoleResult<Vec<Requirement>> {
        let mut url = endpoint(api_base, JIRA_REQUIREMENTS_PREFIX)?;
        url.path_segments_mut()
            .map_err(|_| ConsoleError::validation(format!("'{api_base}' cannot be a base URL")))?
            .push(issue_key.trim());
        let path = url.path().to_string();
        let timeout = self.timeouts.requirements;
        debug!(%url, ?timeout, "pipeline request");

        let text = execute(self.http.get(url).timeout(timeout), &path, timeout).await?;
        match serde_json::from_str::<Value>(&text) {
            Ok(value @ Value::Array(_)) => decode_body(&path, value),
            _ => {
                debug!(path, "requirements response is not a list");
                Ok(Vec::new())
            }
        }
    }

    async fn generate_scenarios(
        &self,
        api_base: &str,
        request: &ScenarioRequest,
    ) -> ConsoleResult<ArtifactTree> {
        self.post(api_base, SCENARIOS_PATH, request, PipelineAction::CreateScenarios)
            .await
    }

    async fn generate_testcases(
        &self,
        api_base: &str,
        request: &TestCaseRequest,
    ) -> ConsoleResult<ArtifactTree> {
        self.post(api_base, TESTCASES_PATH, request, PipelineAction::CreateTestCases)
            .await
    }

    async fn push_to_jira(
        &self,
        api_base: &str,
        request: &PushRequest,
    ) -> ConsoleResult<PushResult> {
        self.post(api_base, JIRA_PUSH_PATH, request, PipelineAction::PushToJira)
            .await
    }
}

/// Appends `path` to `api_base`, keeping any prefix the base already has.
pub fn endpoint(api_base: &str, path: &str) -> ConsoleResult<Url> {
    let mut url = validate_http_url(api_base)?;
    url.path_segments_mut()
        .map_err(|_| ConsoleError::validation(format!("'{api_base}' cannot be a base URL")))?
        .pop_if_empty()
        .extend(path.split('/').filter(|segment| !segment.is_empty()));
    Ok(url)
}

async fn execute(request: RequestBuilder, path: &str, timeout: Duration) -> ConsoleResult<String> {
    let response = request.send().await.map_err(|err| {
        if err.is_timeout() {
            ConsoleError::transport(format!(
                "request to {path} timed out after {}s",
                timeout.as_secs()
            ))
        } else {
            ConsoleError::transport(format!("request to {path} failed: {err}"))
        }
    })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| ConsoleError::transport(format!("reading response from {path}: {err}")))?;

    if !status.is_success() {
        warn!(status = status.as_u16(), path, "pipeline request rejected");
        let detail = match serde_json::from_str::<Value>(&text) {
            Ok(value) => value.to_string(),
            Err(_) => text,
        };
        return Err(ConsoleError::transport(format!(
            "API Error {} at {path}: {detail}",
            status.as_u16()
        )));
    }

    Ok(text)
}

/// Non-JSON success bodies are kept as `{"raw_text": ...}`.
fn json_or_raw_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw_text": text }))
}

fn decode_body<T: DeserializeOwned>(path: &str, value: Value) -> ConsoleResult<T> {
    serde_json::from_value(value).map_err(|err| {
        ConsoleError::transport(format!("unexpected response shape from {path}: {err}"))
    })
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
