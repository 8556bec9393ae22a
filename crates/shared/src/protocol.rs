use serde::{Deserialize, Serialize};

use crate::domain::{ArtifactTree, ProjectConfig, Source};

pub const INDEX_PATH: &str = "/v1/index";
pub const SCENARIOS_PATH: &str = "/v1/scenarios";
pub const TESTCASES_PATH: &str = "/v1/testcases";
pub const JIRA_PUSH_PATH: &str = "/v1/jira/push";
pub const JIRA_REQUIREMENTS_PREFIX: &str = "/v1/jira/requirements";

pub const MIN_SCENARIOS: u32 = 5;
pub const MAX_SCENARIOS: u32 = 60;
pub const DEFAULT_MAX_SCENARIOS: u32 = 20;

pub fn requirements_path(issue_key: &str) -> String {
    format!("{JIRA_REQUIREMENTS_PREFIX}/{issue_key}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub tenant_id: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub tenant_id: String,
    pub product_pack: ProjectConfig,
    pub max_scenarios: u32,
    pub jira_issue_key: Option<String>,
    pub fetch_requirements_from_jira: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseRequest {
    pub tenant_id: String,
    pub product_pack: ProjectConfig,
    pub scenario_pack: ArtifactTree,
    pub jira_issue_key: Option<String>,
    pub fetch_requirements_from_jira: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    pub product_pack: ProjectConfig,
    pub scenario_pack: ArtifactTree,
    pub label_prefix: Vec<String>,
}

pub const DEFAULT_LABELS: [&str; 2] = ["QA", "AutoGen"];

pub const LABEL_CHOICES: [&str; 8] = [
    "QA",
    "AutoGen",
    "RAG",
    "TestGen",
    "RFID",
    "Warehouse",
    "Security",
    "Performance",
];
