//! The session record every action reads from and returns.
//!
//! Mutating operations consume the state and hand back a new one, so a caller
//! that receives an error still owns the untouched previous state.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    domain::{
        parse_tags, ArtifactTree, ProjectConfig, PushResult, Requirement, Source, SourceKind,
    },
    error::{ConsoleError, ConsoleResult},
};
use url::Url;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_PROJECT_NAME: &str = "rfid-warehouse";

/// Transient knobs that belong to the operator's session, not to a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Sent to the service as `tenant_id`.
    pub project_name: String,
    pub api_base: String,
    pub developer_mode: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            project_name: DEFAULT_PROJECT_NAME.into(),
            api_base: DEFAULT_API_BASE.into(),
            developer_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    ConnectDocumentation,
    ImportRequirements,
    ProjectSettings,
    Scenarios,
    TestCases,
    Export,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Self::ConnectDocumentation,
        Self::ImportRequirements,
        Self::ProjectSettings,
        Self::Scenarios,
        Self::TestCases,
        Self::Export,
    ];

    pub fn number(self) -> usize {
        match self {
            Self::ConnectDocumentation => 1,
            Self::ImportRequirements => 2,
            Self::ProjectSettings => 3,
            Self::Scenarios => 4,
            Self::TestCases => 5,
            Self::Export => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ConnectDocumentation => "1) Connect Documentation",
            Self::ImportRequirements => "2) Connect Jira & Import Requirements",
            Self::ProjectSettings => "3) Project Settings (Business Rules + Jira Output)",
            Self::Scenarios => "4) Create Test Scenarios",
            Self::TestCases => "5) Create Detailed Test Cases",
            Self::Export => "6) Export / Push to Jira",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::ConnectDocumentation => "docs",
            Self::ImportRequirements => "requirements",
            Self::ProjectSettings => "settings",
            Self::Scenarios => "scenarios",
            Self::TestCases => "testcases",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().trim_end_matches(')');
        Self::ALL
            .into_iter()
            .find(|stage| {
                stage.number().to_string() == needle || stage.slug().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                ConsoleError::validation(format!(
                    "unknown stage '{s}'; use 1-6 or one of docs, requirements, settings, scenarios, testcases, export"
                ))
            })
    }
}

/// How the operator wants a new source typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    #[default]
    AutoDetect,
    Pdf,
    Web,
}

impl FromStr for SourceMode {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "auto-detect" => Ok(Self::AutoDetect),
            "pdf" => Ok(Self::Pdf),
            "web" => Ok(Self::Web),
            other => Err(ConsoleError::validation(format!(
                "unknown source type '{other}'; use auto, pdf or web"
            ))),
        }
    }
}

/// Editable scalar fields of the project configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    ProductName,
    Vendor,
    Domain,
    Version,
    RulesText,
    Hierarchy,
    JiraProjectKey,
    ScenarioIssueType,
    TestcaseIssueType,
}

impl ConfigField {
    pub const ALL: [ConfigField; 9] = [
        Self::ProductName,
        Self::Vendor,
        Self::Domain,
        Self::Version,
        Self::RulesText,
        Self::Hierarchy,
        Self::JiraProjectKey,
        Self::ScenarioIssueType,
        Self::TestcaseIssueType,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::ProductName => "product.name",
            Self::Vendor => "product.vendor",
            Self::Domain => "product.domain",
            Self::Version => "product.version",
            Self::RulesText => "rules",
            Self::Hierarchy => "output.hierarchy",
            Self::JiraProjectKey => "jira.project_key",
            Self::ScenarioIssueType => "jira.scenario_issue_type",
            Self::TestcaseIssueType => "jira.testcase_issue_type",
        }
    }
}

impl FromStr for ConfigField {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let keys: Vec<_> = Self::ALL.iter().map(|field| field.key()).collect();
                ConsoleError::validation(format!(
                    "unknown setting '{s}'; expected one of {}",
                    keys.join(", ")
                ))
            })
    }
}

/// A non-fatal finding about a requirement record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementWarning {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowState {
    pub settings: SessionSettings,
    pub stage: Stage,
    pub sources: Vec<Source>,
    /// Raw index response; opaque to the console.
    pub last_index_result: Value,
    pub jira_issue_key: String,
    pub fetched_requirements: Vec<Requirement>,
    pub requirements_fetched_at: Option<DateTime<Utc>>,
    pub project_config: ProjectConfig,
    pub artifact_tree: ArtifactTree,
    pub last_push_result: Option<PushResult>,
    pub kb_ready: bool,
}

impl WorkflowState {
    pub fn reset() -> Self {
        Self::default()
    }

    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Defaults for everything except the session settings and selected stage.
    pub fn fresh_session(&self) -> Self {
        Self {
            settings: self.settings.clone(),
            stage: self.stage,
            ..Self::default()
        }
    }

    /// Trimmed issue key, `None` when blank.
    pub fn issue_key(&self) -> Option<&str> {
        let key = self.jira_issue_key.trim();
        (!key.is_empty()).then_some(key)
    }

    pub fn has_index_result(&self) -> bool {
        value_is_present(&self.last_index_result)
    }

    pub fn select_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Adds a documentation link. The returned hint flags an explicit type that
    /// disagrees with the URL suffix; the source is still added as requested.
    pub fn add_source(
        mut self,
        url: &str,
        mode: SourceMode,
        tags: &str,
    ) -> ConsoleResult<(Self, Option<String>)> {
        let url = url.trim();
        validate_http_url(url)?;

        let inferred = SourceKind::infer_from_url(url);
        let (kind, hint) = match mode {
            SourceMode::AutoDetect => (inferred, None),
            SourceMode::Pdf if inferred != SourceKind::Pdf => (
                SourceKind::Pdf,
                Some("This doesn't look like a PDF URL. If it's a web page, use type web.".into()),
            ),
            SourceMode::Pdf => (SourceKind::Pdf, None),
            SourceMode::Web if inferred == SourceKind::Pdf => (
                SourceKind::Web,
                Some("This URL ends with .pdf; you may want type pdf.".into()),
            ),
            SourceMode::Web => (SourceKind::Web, None),
        };

        self.sources.push(Source {
            kind,
            url: url.to_string(),
            tags: parse_tags(tags),
        });
        Ok((self, hint))
    }

    pub fn add_sample_sources(mut self) -> Self {
        self.sources.extend([
            Source::new(
                SourceKind::Web,
                "https://example.com/rfid-docs/getting-started",
                &["sample", "web"],
            ),
            Source::new(
                SourceKind::Pdf,
                "https://example.com/rfid-product-guide.pdf",
                &["sample", "pdf"],
            ),
        ]);
        self
    }

    pub fn clear_sources(mut self) -> Self {
        self.sources.clear();
        self
    }

    pub fn with_issue_key(mut self, issue_key: &str) -> Self {
        self.jira_issue_key = issue_key.trim().to_string();
        self
    }

    pub fn clear_fetched_requirements(mut self) -> Self {
        self.fetched_requirements.clear();
        self
    }

    pub fn set_config_field(mut self, field: ConfigField, value: &str) -> Self {
        let config = &mut self.project_config;
        match field {
            ConfigField::ProductName => config.product.name = value.trim().to_string(),
            ConfigField::Vendor => config.product.vendor = optional_text(value),
            ConfigField::Domain => config.product.domain = value.trim().to_string(),
            ConfigField::Version => config.product.version = optional_text(value),
            ConfigField::RulesText => config.business_rules.rules_text = value.to_string(),
            ConfigField::Hierarchy => config.output.hierarchy = value.trim().to_string(),
            ConfigField::JiraProjectKey => {
                config.output.jira.project_key = value.trim().to_string()
            }
            ConfigField::ScenarioIssueType => {
                config.output.jira.scenario_issue_type = value.trim().to_string()
            }
            ConfigField::TestcaseIssueType => {
                config.output.jira.testcase_issue_type = value.trim().to_string()
            }
        }
        self
    }

    /// Copies `requirements` into the project configuration, replacing what was
    /// there. Records without a statement are rejected; records without an id
    /// are kept and reported.
    pub fn apply_requirements(
        mut self,
        requirements: &[Requirement],
    ) -> ConsoleResult<(Self, Vec<RequirementWarning>)> {
        let mut warnings = Vec::new();
        for (index, requirement) in requirements.iter().enumerate() {
            if requirement.statement.trim().is_empty() {
                return Err(ConsoleError::validation(format!(
                    "requirement #{} ({}) has an empty statement",
                    index + 1,
                    requirement.label()
                )));
            }
            if !requirement.has_id() {
                warnings.push(RequirementWarning {
                    index,
                    message: format!(
                        "requirement #{} has no id and is shown as '{}'",
                        index + 1,
                        requirement.label()
                    ),
                });
            }
        }

        self.project_config.requirements = requirements.to_vec();
        Ok((self, warnings))
    }

    pub fn merge_index_result(mut self, result: Value) -> Self {
        self.last_index_result = result;
        self.kb_ready = true;
        self
    }

    pub fn merge_fetched_requirements(
        mut self,
        requirements: Vec<Requirement>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        self.fetched_requirements = requirements;
        self.requirements_fetched_at = Some(fetched_at);
        self
    }

    /// Replaces the artifact tree wholesale. Scenario and test-case generation
    /// both land here; no local merging happens.
    pub fn merge_artifact_tree(mut self, tree: ArtifactTree) -> Self {
        self.artifact_tree = tree;
        self
    }

    pub fn merge_push_result(mut self, result: PushResult) -> Self {
        self.last_push_result = Some(result);
        self
    }
}

pub fn validate_http_url(raw: &str) -> ConsoleResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| ConsoleError::validation(format!("'{raw}' is not a valid URL: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return Err(ConsoleError::validation(format!(
            "'{raw}' must be an http/https URL with a host"
        )));
    }
    Ok(url)
}

/// Null, `{}`, `[]` and `""` all count as "nothing stored".
pub fn value_is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(text) => !text.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
