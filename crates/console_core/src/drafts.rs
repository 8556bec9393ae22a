//! Draft document codec.
//!
//! A draft is a flat JSON object holding the persistable subset of the
//! workflow state plus `schema_version` and `saved_at`. Documents written
//! before versioning carry neither and are upgraded by [`migrate`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::{
    domain::{ArtifactTree, ProjectConfig, PushResult, Requirement, Source},
    error::{ConsoleError, ConsoleResult},
};
use tracing::{debug, warn};

use crate::state::{value_is_present, WorkflowState};

pub const DRAFT_SCHEMA_VERSION: u64 = 1;

/// The part of a session that survives save/load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub sources: Vec<Source>,
    pub last_index_result: Value,
    pub jira_issue_key: String,
    pub fetched_requirements: Vec<Requirement>,
    pub requirements_fetched_at: Option<DateTime<Utc>>,
    #[serde(rename = "product_pack")]
    pub project_config: ProjectConfig,
    #[serde(rename = "scenario_pack")]
    pub artifact_tree: ArtifactTree,
    #[serde(rename = "last_jira_result")]
    pub last_push_result: Option<PushResult>,
    pub kb_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftDocument {
    pub schema_version: u64,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub state: PersistedState,
}

impl WorkflowState {
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            sources: self.sources.clone(),
            last_index_result: self.last_index_result.clone(),
            jira_issue_key: self.jira_issue_key.clone(),
            fetched_requirements: self.fetched_requirements.clone(),
            requirements_fetched_at: self.requirements_fetched_at,
            project_config: self.project_config.clone(),
            artifact_tree: self.artifact_tree.clone(),
            last_push_result: self.last_push_result.clone(),
            kb_ready: self.kb_ready,
        }
    }

    /// Replaces every persisted field; session settings and stage are kept.
    pub fn restore(self, persisted: PersistedState) -> Self {
        Self {
            settings: self.settings,
            stage: self.stage,
            sources: persisted.sources,
            last_index_result: persisted.last_index_result,
            jira_issue_key: persisted.jira_issue_key,
            fetched_requirements: persisted.fetched_requirements,
            requirements_fetched_at: persisted.requirements_fetched_at,
            project_config: persisted.project_config,
            artifact_tree: persisted.artifact_tree,
            last_push_result: persisted.last_push_result,
            kb_ready: persisted.kb_ready,
        }
    }
}

pub fn encode(state: &WorkflowState, saved_at: DateTime<Utc>) -> ConsoleResult<String> {
    let document = DraftDocument {
        schema_version: DRAFT_SCHEMA_VERSION,
        saved_at: Some(saved_at),
        state: state.persisted(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn decode(blob: &str) -> ConsoleResult<DraftDocument> {
    let raw: Value = serde_json::from_str(blob)?;
    let migrated = migrate(raw)?;
    Ok(serde_json::from_value(migrated)?)
}

/// Brings any known draft layout up to [`DRAFT_SCHEMA_VERSION`].
///
/// Missing or null keys take their default values. Unversioned drafts used
/// empty `{}` placeholders for results that never arrived; those become null.
/// Current and newer documents keep their results as written.
pub fn migrate(raw: Value) -> ConsoleResult<Value> {
    let Value::Object(mut document) = raw else {
        return Err(ConsoleError::validation(
            "draft document must be a JSON object",
        ));
    };

    let version = match document.get("schema_version") {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().ok_or_else(|| {
            ConsoleError::validation(format!("unsupported schema_version {value}"))
        })?,
    };
    if version > DRAFT_SCHEMA_VERSION {
        warn!(
            version,
            supported = DRAFT_SCHEMA_VERSION,
            "draft was written by a newer console; loading known fields only"
        );
    } else if version < DRAFT_SCHEMA_VERSION {
        debug!(from = version, to = DRAFT_SCHEMA_VERSION, "migrating draft");
        document.insert("schema_version".into(), Value::from(DRAFT_SCHEMA_VERSION));
    }

    fill_defaults(&mut document)?;
    if version == 0 {
        for key in ["last_index_result", "last_jira_result"] {
            if document.get(key).is_some_and(|value| !value_is_present(value)) {
                document.insert(key.into(), Value::Null);
            }
        }
    }

    Ok(Value::Object(document))
}

fn fill_defaults(document: &mut Map<String, Value>) -> ConsoleResult<()> {
    let Value::Object(defaults) = serde_json::to_value(PersistedState::default())? else {
        return Ok(());
    };
    for (key, default) in defaults {
        let slot = document.entry(key).or_insert(Value::Null);
        if slot.is_null() {
            *slot = default;
        }
    }
    Ok(())
}

/// `draft_<project>_<YYYYmmdd_HHMMSS>`, with characters that cannot appear
/// in a draft name replaced by `_`.
pub fn default_draft_name(project_name: &str, at: NaiveDateTime) -> String {
    let project: String = project_name
        .trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let project = if project.is_empty() { "project".to_string() } else { project };
    format!("draft_{project}_{}", at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
#[path = "tests/drafts_tests.rs"]
mod tests;
