//! Plain-text views for the terminal.

use std::fmt::Write as _;

use console_core::{
    gates::{settings_issues, stage_advisories, Checklist},
    state::{Stage, WorkflowState},
    views::{requirements_count, scenario_count, testcase_count},
    Notice, Outcome, SavedDraft,
};
use serde::Serialize;
use shared::domain::{ProjectConfig, Reference, Requirement, Scenario, TestCase};

const REQUIREMENT_PREVIEW_LIMIT: usize = 50;
const REFERENCE_PREVIEW_LIMIT: usize = 5;

pub fn status(state: &WorkflowState) -> String {
    let checklist = Checklist::evaluate(state);
    let mut out = String::new();
    let _ = writeln!(out, "Project:  {}", state.settings.project_name);
    let _ = writeln!(out, "Service:  {}", state.settings.api_base);
    let _ = writeln!(
        out,
        "Stage:    {}{}",
        state.stage,
        if state.settings.developer_mode { "  [developer]" } else { "" }
    );
    let _ = writeln!(out, "Progress: {}/6", checklist.completed());
    for (label, done) in checklist.items() {
        let _ = writeln!(out, "  [{}] {label}", if done { "x" } else { " " });
    }
    let _ = writeln!(
        out,
        "Sources {} | Requirements in use {} | Scenarios {} | Test cases {}",
        state.sources.len(),
        requirements_count(&state.project_config),
        scenario_count(&state.artifact_tree),
        testcase_count(&state.artifact_tree)
    );
    if let Some(key) = state.issue_key() {
        let _ = writeln!(out, "Jira issue: {key}");
    }
    out
}

pub fn stage(state: &WorkflowState, stage: Stage) -> String {
    let mut out = format!("{stage}\n");
    for advisory in stage_advisories(state, stage) {
        let _ = writeln!(out, "  ! {advisory}");
    }
    out
}

pub fn stage_list(current: Stage) -> String {
    let mut out = String::new();
    for stage in Stage::ALL {
        let marker = if stage == current { ">" } else { " " };
        let _ = writeln!(out, "{marker} {stage}  ({})", stage.slug());
    }
    out
}

pub fn sources(state: &WorkflowState) -> String {
    if state.sources.is_empty() {
        return "No sources added yet. Add at least one PDF or web docs page.\n".into();
    }
    let mut out = String::new();
    for (i, source) in state.sources.iter().enumerate() {
        let tags: Vec<_> = source.tags.iter().map(String::as_str).collect();
        let _ = write!(out, "{:>3}. [{}] {}", i + 1, source.kind, source.url);
        if !tags.is_empty() {
            let _ = write!(out, "  tags: {}", tags.join(", "));
        }
        out.push('\n');
    }
    out
}

pub fn requirements(requirements: &[Requirement]) -> String {
    if requirements.is_empty() {
        return "No requirements imported.\n".into();
    }
    let mut out = String::new();
    for requirement in requirements.iter().take(REQUIREMENT_PREVIEW_LIMIT) {
        let _ = writeln!(out, "- {}: {}", requirement.label(), requirement.statement);
    }
    if requirements.len() > REQUIREMENT_PREVIEW_LIMIT {
        let _ = writeln!(
            out,
            "Showing first {REQUIREMENT_PREVIEW_LIMIT} of {}",
            requirements.len()
        );
    }
    out
}

pub fn project_settings(config: &ProjectConfig) -> String {
    let mut out = String::new();
    let product = &config.product;
    let _ = writeln!(out, "product.name             {}", product.name);
    let _ = writeln!(out, "product.vendor           {}", product.vendor.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "product.domain           {}", product.domain);
    let _ = writeln!(out, "product.version          {}", product.version.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "output.hierarchy         {}", config.output.hierarchy);
    let jira = &config.output.jira;
    let _ = writeln!(out, "jira.project_key         {}", jira.project_key);
    let _ = writeln!(out, "jira.scenario_issue_type {}", jira.scenario_issue_type);
    let _ = writeln!(out, "jira.testcase_issue_type {}", jira.testcase_issue_type);
    let _ = writeln!(out, "rules:");
    for line in config.business_rules.rules_text.lines() {
        let _ = writeln!(out, "  {line}");
    }
    let issues = settings_issues(config);
    if issues.is_empty() {
        out.push_str("Settings look good.\n");
    } else {
        for issue in issues {
            let _ = writeln!(out, "  ! {issue}");
        }
    }
    out
}

pub fn scenario_list(scenarios: &[&Scenario]) -> String {
    if scenarios.is_empty() {
        return "No matching scenarios.\n".into();
    }
    let mut out = String::new();
    for scenario in scenarios {
        let _ = writeln!(
            out,
            "{:<10} {} (refs {}, test cases {})",
            or_placeholder(&scenario.scenario_id, "(no-id)"),
            or_placeholder(&scenario.title, "(no-title)"),
            scenario.references.len(),
            scenario.test_cases.len()
        );
    }
    out
}

pub fn scenario_detail(scenario: &Scenario) -> String {
    let mut out = format!(
        "{} {}\n",
        or_placeholder(&scenario.scenario_id, "(no-id)"),
        or_placeholder(&scenario.title, "(no-title)")
    );
    if !scenario.objective.is_empty() {
        let _ = writeln!(out, "Objective: {}", scenario.objective);
    }
    bullet_section(&mut out, "Scope", &scenario.scope);
    bullet_section(&mut out, "Assumptions", &scenario.assumptions);
    if !scenario.references.is_empty() {
        let _ = writeln!(out, "References: {}", scenario.references.len());
    }
    out
}

pub fn testcase_list(test_cases: &[&TestCase]) -> String {
    if test_cases.is_empty() {
        return "No matching test cases.\n".into();
    }
    let mut out = String::new();
    for tc in test_cases {
        let _ = writeln!(
            out,
            "{:<10} [{}] {} ({})",
            or_placeholder(&tc.tc_id, "(no-id)"),
            tc.kind.map(|kind| kind.as_str()).unwrap_or("-"),
            or_placeholder(&tc.title, "(no-title)"),
            or_placeholder(&tc.priority, "-")
        );
    }
    out
}

pub fn testcase_detail(tc: &TestCase) -> String {
    let mut out = format!(
        "{} {}\n",
        or_placeholder(&tc.tc_id, "(no-id)"),
        or_placeholder(&tc.title, "(no-title)")
    );
    if let Some(kind) = tc.kind {
        let _ = writeln!(out, "Type: {kind}");
    }
    if !tc.priority.is_empty() {
        let _ = writeln!(out, "Priority: {}", tc.priority);
    }
    bullet_section(&mut out, "Preconditions", &tc.preconditions);
    numbered_section(&mut out, "Steps", &tc.steps);
    bullet_section(&mut out, "Expected results", &tc.expected_results);
    references(&mut out, &tc.references);
    out
}

fn references(out: &mut String, references: &[Reference]) {
    let _ = writeln!(out, "References: {}", references.len());
    for reference in references.iter().take(REFERENCE_PREVIEW_LIMIT) {
        let _ = writeln!(
            out,
            "  - {} • {}",
            reference.doc.as_deref().unwrap_or(""),
            reference.section.as_deref().unwrap_or("")
        );
    }
    if references.len() > REFERENCE_PREVIEW_LIMIT {
        let _ = writeln!(out, "  +{} more", references.len() - REFERENCE_PREVIEW_LIMIT);
    }
}

pub fn outcome(outcome: &Outcome) -> String {
    let mut out = match &outcome.notice {
        Notice::Success(message) => format!("ok: {message}\n"),
        Notice::Advisory(message) => format!("note: {message}\n"),
    };
    for warning in &outcome.warnings {
        let _ = writeln!(out, "  warning: {warning}");
    }
    out
}

pub fn saved_draft(saved: &SavedDraft) -> String {
    let mut out = format!("Saved draft '{}' to {}\n", saved.name, saved.location);
    if saved.replaced {
        out.push_str("  warning: an earlier draft with this name was overwritten\n");
    }
    out
}

pub fn draft_names(names: &[String]) -> String {
    if names.is_empty() {
        return "No drafts saved yet.\n".into();
    }
    names.iter().map(|name| format!("{name}\n")).collect()
}

pub fn push_summary(state: &WorkflowState) -> String {
    match &state.last_push_result {
        Some(result) => format!(
            "Created scenarios: {}\nCreated test cases: {}\n",
            result.scenario_keys.len(),
            result.testcase_keys.len()
        ),
        None => String::new(),
    }
}

/// Pretty JSON for developer mode.
pub fn raw<T: Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(json) => format!("{json}\n"),
        Err(err) => format!("(unrenderable: {err})\n"),
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn bullet_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

fn numbered_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "  {}. {item}", i + 1);
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
