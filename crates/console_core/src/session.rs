//! Session orchestrator: gate, guard, call, merge.
//!
//! Every action borrows the caller's state and returns a new one inside an
//! [`Outcome`]. On error nothing is returned, so the caller keeps the state it
//! already had.

use std::{
    collections::HashSet,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};

use chrono::{Local, Utc};
use shared::{
    error::{ConsoleError, ConsoleResult, PipelineAction},
    protocol::{
        IndexRequest, PushRequest, ScenarioRequest, TestCaseRequest, DEFAULT_LABELS,
        MAX_SCENARIOS, MIN_SCENARIOS,
    },
};
use storage::{validate_draft_name, DraftStore};
use tracing::{info, warn};

use crate::{
    drafts::{decode, default_draft_name, encode},
    gates::{action_gate, Gate},
    pipeline::PipelineClient,
    state::WorkflowState,
    views::{scenario_count, testcase_count},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    /// Nothing failed, but the operator should look.
    Advisory(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) | Self::Advisory(message) => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub state: WorkflowState,
    pub notice: Notice,
    pub warnings: Vec<String>,
}

impl Outcome {
    fn success(state: WorkflowState, message: impl Into<String>) -> Self {
        Self {
            state,
            notice: Notice::Success(message.into()),
            warnings: Vec::new(),
        }
    }

    fn advisory(state: WorkflowState, message: impl Into<String>) -> Self {
        Self {
            state,
            notice: Notice::Advisory(message.into()),
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDraft {
    pub name: String,
    pub location: String,
    /// An earlier draft with the same name was overwritten.
    pub replaced: bool,
}

pub fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|label| label.to_string()).collect()
}

pub struct SessionOrchestrator {
    pipeline: Arc<dyn PipelineClient>,
    drafts: Arc<dyn DraftStore>,
    inflight: Mutex<HashSet<PipelineAction>>,
}

impl SessionOrchestrator {
    pub fn new(pipeline: Arc<dyn PipelineClient>, drafts: Arc<dyn DraftStore>) -> Self {
        Self {
            pipeline,
            drafts,
            inflight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_busy(&self, action: PipelineAction) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&action)
    }

    pub fn draft_location(&self, name: &str) -> String {
        self.drafts.location(name)
    }

    pub async fn build_knowledge_base(&self, state: &WorkflowState) -> ConsoleResult<Outcome> {
        let action = PipelineAction::BuildKnowledgeBase;
        let _guard = self.begin(state, action)?;
        let request = IndexRequest {
            tenant_id: state.settings.project_name.clone(),
            sources: state.sources.clone(),
        };

        let result = self
            .call(action, self.pipeline.build_index(&state.settings.api_base, &request))
            .await?;
        let next = state.clone().merge_index_result(result);
        Ok(Outcome::success(
            next,
            format!("Knowledge base built from {} source(s)", request.sources.len()),
        ))
    }

    /// Preview failures and empty previews are advisories; the state is
    /// returned unchanged and generation can still resolve requirements
    /// server-side.
    pub async fn fetch_requirements_preview(
        &self,
        state: &WorkflowState,
    ) -> ConsoleResult<Outcome> {
        let action = PipelineAction::FetchRequirements;
        let _guard = self.begin(state, action)?;
        let issue_key = state.issue_key().unwrap_or_default();

        let fetched = self
            .call(
                action,
                self.pipeline
                    .fetch_requirements(&state.settings.api_base, issue_key),
            )
            .await;

        match fetched {
            Ok(requirements) if requirements.is_empty() => Ok(Outcome::advisory(
                state.clone(),
                "No requirements found in Jira issue description.",
            )),
            Ok(requirements) => {
                let count = requirements.len();
                let next = state
                    .clone()
                    .merge_fetched_requirements(requirements, Utc::now());
                Ok(Outcome::success(next, format!("Fetched {count} requirement(s)")))
            }
            Err(err) => {
                let mut outcome = Outcome::advisory(
                    state.clone(),
                    "Could not preview requirements from the service. They can still be fetched server-side during generation.",
                );
                outcome.warnings.push(err.to_string());
                Ok(outcome)
            }
        }
    }

    /// Copies the fetched preview into the project configuration.
    pub fn use_fetched_requirements(&self, state: &WorkflowState) -> ConsoleResult<Outcome> {
        if state.fetched_requirements.is_empty() {
            return Err(ConsoleError::validation(
                "no fetched requirements to use; fetch a preview first",
            ));
        }
        let (next, warnings) = state
            .clone()
            .apply_requirements(&state.fetched_requirements)?;
        let mut outcome = Outcome::success(
            next,
            format!(
                "Applied {} requirement(s) to project settings",
                state.fetched_requirements.len()
            ),
        );
        outcome.warnings = warnings.into_iter().map(|warning| warning.message).collect();
        Ok(outcome)
    }

    pub async fn create_scenarios(
        &self,
        state: &WorkflowState,
        max_scenarios: u32,
    ) -> ConsoleResult<Outcome> {
        let action = PipelineAction::CreateScenarios;
        let _guard = self.begin(state, action)?;
        if !(MIN_SCENARIOS..=MAX_SCENARIOS).contains(&max_scenarios) {
            return Err(ConsoleError::validation(format!(
                "max scenarios must be between {MIN_SCENARIOS} and {MAX_SCENARIOS}, got {max_scenarios}"
            )));
        }
        let request = ScenarioRequest {
            tenant_id: state.settings.project_name.clone(),
            product_pack: state.project_config.clone(),
            max_scenarios,
            jira_issue_key: state.issue_key().map(str::to_string),
            fetch_requirements_from_jira: true,
        };

        let tree = self
            .call(
                action,
                self.pipeline
                    .generate_scenarios(&state.settings.api_base, &request),
            )
            .await?;
        let count = scenario_count(&tree);
        let next = state.clone().merge_artifact_tree(tree);
        if count == 0 {
            return Ok(Outcome::advisory(next, "The service returned no scenarios."));
        }
        Ok(Outcome::success(next, format!("Generated {count} scenario(s)")))
    }

    pub async fn create_testcases(&self, state: &WorkflowState) -> ConsoleResult<Outcome> {
        let action = PipelineAction::CreateTestCases;
        let _guard = self.begin(state, action)?;
        let request = TestCaseRequest {
            tenant_id: state.settings.project_name.clone(),
            product_pack: state.project_config.clone(),
            scenario_pack: state.artifact_tree.clone(),
            jira_issue_key: state.issue_key().map(str::to_string),
            fetch_requirements_from_jira: true,
        };

        let tree = self
            .call(
                action,
                self.pipeline
                    .generate_testcases(&state.settings.api_base, &request),
            )
            .await?;
        let count = testcase_count(&tree);
        let next = state.clone().merge_artifact_tree(tree);
        if count == 0 {
            return Ok(Outcome::advisory(next, "The service returned no test cases."));
        }
        Ok(Outcome::success(next, format!("Generated {count} test case(s)")))
    }

    pub async fn push_to_jira(
        &self,
        state: &WorkflowState,
        labels: &[String],
    ) -> ConsoleResult<Outcome> {
        let action = PipelineAction::PushToJira;
        let _guard = self.begin(state, action)?;
        let request = PushRequest {
            product_pack: state.project_config.clone(),
            scenario_pack: state.artifact_tree.clone(),
            label_prefix: labels.to_vec(),
        };

        let result = self
            .call(action, self.pipeline.push_to_jira(&state.settings.api_base, &request))
            .await?;
        let message = format!(
            "Pushed to Jira: {} scenario issue(s), {} test case issue(s)",
            result.scenario_keys.len(),
            result.testcase_keys.len()
        );
        Ok(Outcome::success(state.clone().merge_push_result(result), message))
    }

    /// Saves under `name`, or a timestamped default name when none is given.
    pub async fn save_draft(
        &self,
        state: &WorkflowState,
        name: Option<&str>,
    ) -> ConsoleResult<SavedDraft> {
        let name = match name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => default_draft_name(&state.settings.project_name, Local::now().naive_local()),
        };
        validate_draft_name(&name).map_err(|err| ConsoleError::validation(err.to_string()))?;

        let blob = encode(state, Utc::now())?;
        let replaced = self
            .drafts
            .put(&name, &blob)
            .await
            .map_err(|err| ConsoleError::Storage(format!("{err:#}")))?;
        if replaced {
            warn!(draft = %name, "overwrote existing draft");
        }
        info!(draft = %name, bytes = blob.len(), "draft saved");

        Ok(SavedDraft {
            location: self.drafts.location(&name),
            name,
            replaced,
        })
    }

    pub async fn load_draft(&self, state: &WorkflowState, name: &str) -> ConsoleResult<Outcome> {
        let name = name.trim();
        validate_draft_name(name).map_err(|err| ConsoleError::validation(err.to_string()))?;

        let blob = self
            .drafts
            .get(name)
            .await
            .map_err(|err| ConsoleError::Storage(format!("{err:#}")))?
            .ok_or_else(|| ConsoleError::DraftNotFound(name.to_string()))?;
        let document = decode(&blob)?;
        info!(draft = %name, schema_version = document.schema_version, "draft loaded");

        let message = match document.saved_at {
            Some(saved_at) => format!(
                "Loaded draft '{name}' (saved {})",
                saved_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ),
            None => format!("Loaded draft '{name}'"),
        };
        Ok(Outcome::success(state.clone().restore(document.state), message))
    }

    pub async fn list_drafts(&self) -> ConsoleResult<Vec<String>> {
        self.drafts
            .list()
            .await
            .map_err(|err| ConsoleError::Storage(format!("{err:#}")))
    }

    /// Clears the session, keeping project name, service address and mode.
    pub fn new_session(&self, state: &WorkflowState) -> WorkflowState {
        state.fresh_session()
    }

    fn begin(&self, state: &WorkflowState, action: PipelineAction) -> ConsoleResult<InflightGuard<'_>> {
        if let Gate::Closed(reason) = action_gate(state, action) {
            return Err(ConsoleError::gate_closed(action, reason));
        }
        InflightGuard::acquire(&self.inflight, action)
    }

    async fn call<T>(
        &self,
        action: PipelineAction,
        request: impl Future<Output = ConsoleResult<T>>,
    ) -> ConsoleResult<T> {
        let started = Instant::now();
        info!(action = %action, "pipeline call started");
        let result = request.await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(action = %action, elapsed_ms, "pipeline call finished"),
            Err(err) => warn!(action = %action, elapsed_ms, error = %err, "pipeline call failed"),
        }
        result
    }
}

/// Marks an action as in flight until dropped.
struct InflightGuard<'a> {
    inflight: &'a Mutex<HashSet<PipelineAction>>,
    action: PipelineAction,
}

impl<'a> InflightGuard<'a> {
    fn acquire(
        inflight: &'a Mutex<HashSet<PipelineAction>>,
        action: PipelineAction,
    ) -> ConsoleResult<Self> {
        let mut running = inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(action) {
            return Err(ConsoleError::Busy(action));
        }
        Ok(Self { inflight, action })
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.action);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
