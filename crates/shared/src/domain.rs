use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Fields a remote payload carried that this console does not model. Kept so
/// artifacts survive the generation round trip unchanged.
pub type Extra = Map<String, Value>;

pub const PLACEHOLDER_REQUIREMENT_ID: &str = "REQ";

/// Reads an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Pdf,
    Web,
}

impl SourceKind {
    /// `.pdf` suffix (case-insensitive) means pdf, anything else is a web page.
    pub fn infer_from_url(url: &str) -> Self {
        if url.trim().to_ascii_lowercase().ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Web
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub url: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Source {
    pub fn new(kind: SourceKind, url: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            kind,
            url: url.into(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}

/// Splits `"rfid, warehouse,,security "` into trimmed, non-empty tags.
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub statement: String,
}

impl Requirement {
    pub fn new(id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            statement: statement.into(),
        }
    }

    pub fn label(&self) -> &str {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(PLACEHOLDER_REQUIREMENT_ID)
    }

    pub fn has_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub name: String,
    pub vendor: Option<String>,
    pub domain: String,
    pub version: Option<String>,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            name: "RFID Scanner".into(),
            vendor: Some("Zebra".into()),
            domain: "Warehouse RFID".into(),
            version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessRules {
    pub rules_text: String,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            rules_text: concat!(
                "Unauthorized = EPC not in allowed inventory OR duplicate EPC detected.\n",
                "If unauthorized: block transaction + raise alert.\n",
                "RFID retry count = 2.\n",
                "SLA: single-tag read <= 500ms.\n",
            )
            .into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraOutput {
    pub project_key: String,
    pub scenario_issue_type: String,
    pub testcase_issue_type: String,
}

impl Default for JiraOutput {
    fn default() -> Self {
        Self {
            project_key: "ABC".into(),
            scenario_issue_type: "Task".into(),
            testcase_issue_type: "Sub-task".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub hierarchy: String,
    pub jira: JiraOutput,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            hierarchy: "Scenario->TestCase".into(),
            jira: JiraOutput::default(),
        }
    }
}

/// The configuration bundle sent with every generation request. On the wire
/// the service calls it a product pack.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub product: Product,
    pub requirements: Vec<Requirement>,
    pub business_rules: BusinessRules,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestCaseType {
    Functional,
    Negative,
    Edge,
    Security,
    Performance,
    Recovery,
}

impl TestCaseType {
    pub const ALL: [TestCaseType; 6] = [
        Self::Functional,
        Self::Negative,
        Self::Edge,
        Self::Security,
        Self::Performance,
        Self::Recovery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Functional => "Functional",
            Self::Negative => "Negative",
            Self::Edge => "Edge",
            Self::Security => "Security",
            Self::Performance => "Performance",
            Self::Recovery => "Recovery",
        }
    }
}

impl fmt::Display for TestCaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestCaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown test case type '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCase {
    #[serde(deserialize_with = "null_as_default")]
    pub tc_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TestCaseType>,
    #[serde(deserialize_with = "null_as_default")]
    pub priority: String,
    #[serde(deserialize_with = "null_as_default")]
    pub preconditions: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub steps: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub expected_results: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub references: Vec<Reference>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    #[serde(deserialize_with = "null_as_default")]
    pub scenario_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub objective: String,
    #[serde(deserialize_with = "null_as_default")]
    pub scope: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub assumptions: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub references: Vec<Reference>,
    #[serde(deserialize_with = "null_as_default")]
    pub test_cases: Vec<TestCase>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Scenarios in the order the service produced them. The service calls it a
/// scenario pack; the test-case stage returns the same tree enriched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactTree {
    #[serde(deserialize_with = "null_as_default")]
    pub scenarios: Vec<Scenario>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushResult {
    #[serde(deserialize_with = "null_as_default")]
    pub scenario_keys: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub testcase_keys: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}
