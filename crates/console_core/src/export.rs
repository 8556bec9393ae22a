//! Local downloads rendered from the current state.

use std::{fmt, str::FromStr};

use serde::Serialize;
use serde_json::json;
use shared::error::{ConsoleError, ConsoleResult};

use crate::{
    state::WorkflowState,
    views::{flatten_for_export, render_csv},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Sources,
    ProjectSettings,
    ScenarioPack,
    JiraResult,
    FlatTestCases,
}

impl ExportKind {
    pub const ALL: [ExportKind; 5] = [
        Self::Sources,
        Self::ProjectSettings,
        Self::ScenarioPack,
        Self::JiraResult,
        Self::FlatTestCases,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Sources => "sources.json",
            Self::ProjectSettings => "project_settings.json",
            Self::ScenarioPack => "scenario_pack.json",
            Self::JiraResult => "jira_result.json",
            Self::FlatTestCases => "flat_testcases.csv",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Self::Sources => "sources",
            Self::ProjectSettings => "settings",
            Self::ScenarioPack => "scenarios",
            Self::JiraResult => "jira",
            Self::FlatTestCases => "csv",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl FromStr for ExportKind {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug().eq_ignore_ascii_case(needle) || kind.file_name() == needle)
            .ok_or_else(|| {
                ConsoleError::validation(format!(
                    "unknown export '{s}'; use sources, settings, scenarios, jira or csv"
                ))
            })
    }
}

/// Renders one export. A push result export with nothing pushed yet yields
/// `None`.
pub fn render(state: &WorkflowState, kind: ExportKind) -> ConsoleResult<Option<String>> {
    let body = match kind {
        ExportKind::Sources => pretty(&json!({ "sources": state.sources }))?,
        ExportKind::ProjectSettings => pretty(&state.project_config)?,
        ExportKind::ScenarioPack => pretty(&state.artifact_tree)?,
        ExportKind::JiraResult => match &state.last_push_result {
            Some(result) => pretty(result)?,
            None => return Ok(None),
        },
        ExportKind::FlatTestCases => render_csv(&flatten_for_export(&state.artifact_tree)),
    };
    Ok(Some(body))
}

fn pretty<T: Serialize>(value: &T) -> ConsoleResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
