use serde_json::json;
use shared::domain::{ArtifactTree, Requirement, Scenario, TestCase};

use super::*;

fn tree(test_cases_per_scenario: &[usize]) -> ArtifactTree {
    ArtifactTree {
        scenarios: test_cases_per_scenario
            .iter()
            .enumerate()
            .map(|(i, &count)| Scenario {
                scenario_id: format!("S{}", i + 1),
                test_cases: (0..count)
                    .map(|j| TestCase {
                        tc_id: format!("TC{}-{}", i + 1, j + 1),
                        ..TestCase::default()
                    })
                    .collect(),
                ..Scenario::default()
            })
            .collect(),
        ..ArtifactTree::default()
    }
}

#[test]
fn empty_state_opens_nothing_that_needs_inputs() {
    let state = WorkflowState::reset();
    let checklist = Checklist::evaluate(&state);
    assert_eq!(checklist, Checklist::default());
    assert_eq!(checklist.completed(), 0);

    for action in [
        PipelineAction::BuildKnowledgeBase,
        PipelineAction::FetchRequirements,
        PipelineAction::CreateScenarios,
        PipelineAction::CreateTestCases,
        PipelineAction::PushToJira,
    ] {
        assert!(!action_gate(&state, action).is_open(), "{action}");
    }
}

#[test]
fn index_result_alone_counts_as_knowledge_base() {
    let mut state = WorkflowState::reset();
    state.last_index_result = json!({"chunks": 10});
    assert!(Checklist::evaluate(&state).kb_ok);

    state.last_index_result = json!({});
    assert!(!Checklist::evaluate(&state).kb_ok);
}

#[test]
fn scenarios_open_with_issue_key_and_no_requirements() {
    let state = WorkflowState::reset().with_issue_key("RFID-9");
    assert_eq!(state.project_config.requirements.len(), 0);
    assert_eq!(
        action_gate(&state, PipelineAction::CreateScenarios),
        Gate::Open
    );
}

#[test]
fn scenarios_open_with_requirements_and_no_issue_key() {
    let (state, _) = WorkflowState::reset()
        .apply_requirements(&[Requirement::new("R1", "Tags are read once.")])
        .expect("apply");
    assert!(action_gate(&state, PipelineAction::CreateScenarios).is_open());
}

#[test]
fn blank_issue_key_does_not_count() {
    let mut state = WorkflowState::reset();
    state.jira_issue_key = "   ".into();
    assert!(!Checklist::evaluate(&state).jira_ok);
    assert!(!action_gate(&state, PipelineAction::CreateScenarios).is_open());
}

#[test]
fn downstream_actions_follow_scenario_count() {
    let state = WorkflowState::reset().merge_artifact_tree(tree(&[0, 0]));
    let checklist = Checklist::evaluate(&state);
    assert!(checklist.scenarios_ok);
    assert!(!checklist.testcases_ok);
    assert!(action_gate(&state, PipelineAction::CreateTestCases).is_open());
    assert!(action_gate(&state, PipelineAction::PushToJira).is_open());

    let state = state.merge_artifact_tree(tree(&[2]));
    assert!(Checklist::evaluate(&state).testcases_ok);
}

#[test]
fn settings_issues_flag_missing_basics() {
    let state = WorkflowState::reset();
    assert!(settings_issues(&state.project_config).is_empty());

    let state = state
        .set_config_field(crate::state::ConfigField::ProductName, "")
        .set_config_field(crate::state::ConfigField::JiraProjectKey, " ");
    assert_eq!(
        settings_issues(&state.project_config),
        vec!["Product name is missing.", "Jira project key is missing."]
    );
}

#[test]
fn scenario_advisory_mentions_service_side_fetch() {
    let state = WorkflowState::reset().with_issue_key("RFID-9");
    let advisories = stage_advisories(&state, Stage::Scenarios);
    assert!(advisories.iter().any(|a| a.contains("RFID-9")));
    assert!(advisories.iter().any(|a| a.contains("Knowledge base")));
}

#[test]
fn export_advisory_prefers_test_cases() {
    let state = WorkflowState::reset().merge_artifact_tree(tree(&[0]));
    let advisories = stage_advisories(&state, Stage::Export);
    assert_eq!(advisories.len(), 1);
    assert!(advisories[0].contains("test cases"));
}
