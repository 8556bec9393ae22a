//! Pure precondition checks over a state snapshot.
//!
//! Gates are optimistic: the service may still reject a request the console
//! considered ready, and that rejection is handled like any other failure.

use shared::{domain::ProjectConfig, error::PipelineAction};

use crate::{
    state::{Stage, WorkflowState},
    views::{requirements_count, scenario_count, testcase_count},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checklist {
    pub sources_ok: bool,
    pub kb_ok: bool,
    pub jira_ok: bool,
    pub requirements_ok: bool,
    pub scenarios_ok: bool,
    pub testcases_ok: bool,
}

impl Checklist {
    pub fn evaluate(state: &WorkflowState) -> Self {
        Self {
            sources_ok: !state.sources.is_empty(),
            kb_ok: state.kb_ready || state.has_index_result(),
            jira_ok: state.issue_key().is_some(),
            requirements_ok: !state.fetched_requirements.is_empty(),
            scenarios_ok: scenario_count(&state.artifact_tree) > 0,
            testcases_ok: testcase_count(&state.artifact_tree) > 0,
        }
    }

    pub fn items(&self) -> [(&'static str, bool); 6] {
        [
            ("Add documentation sources", self.sources_ok),
            ("Build knowledge base", self.kb_ok),
            ("Link Jira issue", self.jira_ok),
            ("Import requirements", self.requirements_ok),
            ("Generate scenarios", self.scenarios_ok),
            ("Generate test cases", self.testcases_ok),
        ]
    }

    pub fn completed(&self) -> usize {
        self.items().iter().filter(|(_, done)| *done).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Open,
    Closed(&'static str),
}

impl Gate {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    fn when(condition: bool, reason: &'static str) -> Self {
        if condition {
            Self::Open
        } else {
            Self::Closed(reason)
        }
    }
}

pub fn action_gate(state: &WorkflowState, action: PipelineAction) -> Gate {
    match action {
        PipelineAction::BuildKnowledgeBase => Gate::when(
            !state.sources.is_empty(),
            "add at least one documentation source first",
        ),
        PipelineAction::FetchRequirements => {
            Gate::when(state.issue_key().is_some(), "enter a Jira issue key first")
        }
        // Either the issue key lets the service resolve requirements itself, or
        // the console already carries them by value.
        PipelineAction::CreateScenarios => Gate::when(
            state.issue_key().is_some() || requirements_count(&state.project_config) > 0,
            "no requirements loaded and no Jira issue key to fetch them from",
        ),
        PipelineAction::CreateTestCases => Gate::when(
            scenario_count(&state.artifact_tree) > 0,
            "no scenarios yet; generate scenarios first",
        ),
        PipelineAction::PushToJira => Gate::when(
            scenario_count(&state.artifact_tree) > 0,
            "nothing to push; generate scenarios first",
        ),
    }
}

/// Gaps in the project configuration worth fixing before generation.
pub fn settings_issues(config: &ProjectConfig) -> Vec<&'static str> {
    let mut issues = Vec::new();
    if config.product.name.trim().is_empty() {
        issues.push("Product name is missing.");
    }
    if config.product.domain.trim().is_empty() {
        issues.push("Domain is missing.");
    }
    if config.output.jira.project_key.trim().is_empty() {
        issues.push("Jira project key is missing.");
    }
    issues
}

/// Non-blocking hints for the given stage.
pub fn stage_advisories(state: &WorkflowState, stage: Stage) -> Vec<String> {
    let checklist = Checklist::evaluate(state);
    let mut advisories = Vec::new();

    match stage {
        Stage::ConnectDocumentation => {
            if !checklist.sources_ok {
                advisories.push("No sources added yet. Add at least one PDF or web docs page.".into());
            } else if !checklist.kb_ok {
                advisories.push("Build the knowledge base after adding sources.".into());
            }
        }
        Stage::ImportRequirements => {
            if !checklist.kb_ok {
                advisories.push(
                    "Knowledge base not built yet. Go to stage 1 and build it first.".into(),
                );
            }
            if !checklist.jira_ok {
                advisories.push("Add a Jira issue key to link requirements.".into());
            }
        }
        Stage::ProjectSettings => {
            advisories.extend(settings_issues(&state.project_config).into_iter().map(String::from));
        }
        Stage::Scenarios => {
            if !checklist.kb_ok {
                advisories.push(
                    "Knowledge base not ready. Go back to stage 1 and build it first.".into(),
                );
            }
            let in_use = requirements_count(&state.project_config);
            match (in_use, state.issue_key()) {
                (0, Some(key)) => advisories.push(format!(
                    "No requirements loaded. The service will fetch them from Jira issue {key} during generation."
                )),
                (0, None) => advisories.push(
                    "No requirements loaded and no Jira issue key. Add a Jira issue key in stage 2."
                        .into(),
                ),
                _ => {}
            }
        }
        Stage::TestCases => {
            if !checklist.scenarios_ok {
                advisories.push("No scenarios found. Generate scenarios in stage 4 first.".into());
            }
        }
        Stage::Export => {
            if !checklist.scenarios_ok {
                advisories.push(
                    "Nothing to export yet. Generate scenarios (and test cases) first.".into(),
                );
            } else if !checklist.testcases_ok {
                advisories.push(
                    "You can push scenarios alone, but you will usually want test cases first (stage 5)."
                        .into(),
                );
            }
        }
    }

    advisories
}

#[cfg(test)]
#[path = "tests/gates_tests.rs"]
mod tests;
