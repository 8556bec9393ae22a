use shared::domain::Reference;

use super::*;

fn reference(doc: &str, section: &str) -> Reference {
    Reference {
        doc: Some(doc.into()),
        section: Some(section.into()),
        ..Reference::default()
    }
}

#[test]
fn testcase_detail_lists_first_references_and_counts_the_rest() {
    let tc = TestCase {
        tc_id: "TC1".into(),
        title: "Single read".into(),
        references: (1..=7)
            .map(|i| reference("guide.pdf", &format!("3.{i}")))
            .collect(),
        ..TestCase::default()
    };

    let out = testcase_detail(&tc);
    assert!(out.contains("References: 7"));
    assert!(out.contains("  - guide.pdf • 3.1\n"));
    assert!(out.contains("  - guide.pdf • 3.5\n"));
    assert!(!out.contains("3.6"));
    assert!(out.contains("  +2 more"));
}

#[test]
fn testcase_detail_without_references_reports_zero() {
    let out = testcase_detail(&TestCase::default());
    assert!(out.starts_with("(no-id) (no-title)\n"));
    assert!(out.contains("References: 0"));
    assert!(!out.contains("more"));
}

#[test]
fn scenario_list_shows_reference_and_test_case_counts() {
    let scenario = Scenario {
        scenario_id: "S1".into(),
        title: "Read once".into(),
        references: vec![reference("guide.pdf", "2"), reference("faq", "")],
        test_cases: vec![TestCase::default()],
        ..Scenario::default()
    };

    let out = scenario_list(&[&scenario]);
    assert!(out.contains("Read once (refs 2, test cases 1)"), "{out}");
}
