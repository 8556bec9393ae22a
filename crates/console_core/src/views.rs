//! Read-only projections of the artifact tree.

use std::str::FromStr;

use shared::{
    domain::{ArtifactTree, ProjectConfig, Scenario, TestCase, TestCaseType},
    error::ConsoleError,
};

pub const CSV_HEADER: &str = "scenario_id,scenario_title,tc_id,tc_title,tc_type,priority";

pub fn scenario_count(tree: &ArtifactTree) -> usize {
    tree.scenarios.len()
}

pub fn testcase_count(tree: &ArtifactTree) -> usize {
    tree.scenarios
        .iter()
        .map(|scenario| scenario.test_cases.len())
        .sum()
}

pub fn requirements_count(config: &ProjectConfig) -> usize {
    config.requirements.len()
}

/// Case-insensitive match over title and objective. An empty keyword keeps
/// every scenario in its original order.
pub fn search_scenarios<'a>(tree: &'a ArtifactTree, keyword: &str) -> Vec<&'a Scenario> {
    let needle = keyword.to_lowercase();
    tree.scenarios
        .iter()
        .filter(|scenario| {
            needle.is_empty()
                || format!("{} {}", scenario.title, scenario.objective)
                    .to_lowercase()
                    .contains(&needle)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(TestCaseType),
}

impl TypeFilter {
    pub fn matches(self, test_case: &TestCase) -> bool {
        match self {
            Self::All => true,
            Self::Only(kind) => test_case.kind == Some(kind),
        }
    }
}

impl FromStr for TypeFilter {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<TestCaseType>()
            .map(Self::Only)
            .map_err(ConsoleError::Validation)
    }
}

pub fn filter_testcases<'a>(
    scenario: &'a Scenario,
    type_filter: TypeFilter,
    keyword: &str,
) -> Vec<&'a TestCase> {
    let needle = keyword.to_lowercase();
    scenario
        .test_cases
        .iter()
        .filter(|tc| type_filter.matches(tc))
        .filter(|tc| needle.is_empty() || tc.title.to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub scenario_id: String,
    pub scenario_title: String,
    pub tc_id: String,
    pub tc_title: String,
    pub tc_type: String,
    pub priority: String,
}

impl ExportRow {
    pub fn fields(&self) -> [&str; 6] {
        [
            &self.scenario_id,
            &self.scenario_title,
            &self.tc_id,
            &self.tc_title,
            &self.tc_type,
            &self.priority,
        ]
    }
}

/// One row per test case, in scenario order. Scenarios without test cases
/// contribute nothing.
pub fn flatten_for_export(tree: &ArtifactTree) -> Vec<ExportRow> {
    tree.scenarios
        .iter()
        .flat_map(|scenario| {
            scenario.test_cases.iter().map(move |tc| ExportRow {
                scenario_id: clean_cell(&scenario.scenario_id),
                scenario_title: clean_cell(&scenario.title),
                tc_id: clean_cell(&tc.tc_id),
                tc_title: clean_cell(&tc.title),
                tc_type: tc.kind.map(TestCaseType::as_str).unwrap_or_default().to_string(),
                priority: clean_cell(&tc.priority),
            })
        })
        .collect()
}

pub fn render_csv(rows: &[ExportRow]) -> String {
    std::iter::once(CSV_HEADER.to_string())
        .chain(rows.iter().map(|row| row.fields().join(",")))
        .collect::<Vec<_>>()
        .join("\n")
}

// Separators and line breaks would shift columns or split rows.
fn clean_cell(value: &str) -> String {
    value.replace([',', '\n', '\r'], " ")
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
