use super::*;

fn test_case(id: &str, title: &str, kind: TestCaseType) -> TestCase {
    TestCase {
        tc_id: id.into(),
        title: title.into(),
        kind: Some(kind),
        priority: "P1".into(),
        ..TestCase::default()
    }
}

fn sample_tree() -> ArtifactTree {
    ArtifactTree {
        scenarios: vec![
            Scenario {
                scenario_id: "S1".into(),
                title: "Unauthorized tag, blocked".into(),
                objective: "Block EPCs outside inventory".into(),
                test_cases: vec![
                    test_case("TC1", "Reject unknown EPC", TestCaseType::Negative),
                    test_case("TC2", "Accept known EPC", TestCaseType::Functional),
                ],
                ..Scenario::default()
            },
            Scenario {
                scenario_id: "S2".into(),
                title: "Read latency".into(),
                objective: "Single-tag SLA".into(),
                ..Scenario::default()
            },
            Scenario {
                scenario_id: "S3".into(),
                title: "Reader restart".into(),
                objective: "Recover after power loss".into(),
                ..Scenario::default()
            },
        ],
        ..ArtifactTree::default()
    }
}

#[test]
fn counts_scenarios_and_nested_test_cases() {
    let tree = sample_tree();
    assert_eq!(scenario_count(&tree), 3);
    assert_eq!(testcase_count(&tree), 2);
    assert_eq!(testcase_count(&ArtifactTree::default()), 0);
}

#[test]
fn flatten_skips_scenarios_without_test_cases() {
    let rows = flatten_for_export(&sample_tree());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].scenario_id, "S1");
    assert_eq!(rows[0].scenario_title, "Unauthorized tag  blocked");
    assert_eq!(rows[1].tc_type, "Functional");
}

#[test]
fn csv_has_fixed_columns() {
    let mut tree = sample_tree();
    tree.scenarios[0].test_cases[0].title = "line one\nline, two".into();
    tree.scenarios[0].test_cases[1].kind = None;

    let csv = render_csv(&flatten_for_export(&tree));
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], CSV_HEADER);
    for line in &lines {
        assert_eq!(line.split(',').count(), 6, "{line}");
    }
    assert!(lines[2].contains(",TC2,Accept known EPC,,P1"));
}

#[test]
fn empty_tree_renders_header_only() {
    assert_eq!(render_csv(&flatten_for_export(&ArtifactTree::default())), CSV_HEADER);
}

#[test]
fn search_matches_title_or_objective_case_insensitively() {
    let tree = sample_tree();
    let ids = |found: Vec<&Scenario>| -> Vec<String> {
        found.iter().map(|s| s.scenario_id.clone()).collect()
    };

    assert_eq!(ids(search_scenarios(&tree, "")), vec!["S1", "S2", "S3"]);
    assert_eq!(ids(search_scenarios(&tree, "SLA")), vec!["S2"]);
    assert_eq!(ids(search_scenarios(&tree, "power")), vec!["S3"]);
    assert!(search_scenarios(&tree, "conveyor").is_empty());
}

#[test]
fn filters_compose_type_and_title_keyword() {
    let tree = sample_tree();
    let scenario = &tree.scenarios[0];

    assert_eq!(filter_testcases(scenario, TypeFilter::All, "").len(), 2);
    let negative = filter_testcases(scenario, TypeFilter::Only(TestCaseType::Negative), "");
    assert_eq!(negative.len(), 1);
    assert_eq!(negative[0].tc_id, "TC1");
    assert_eq!(filter_testcases(scenario, TypeFilter::All, "known").len(), 2);
    assert_eq!(filter_testcases(scenario, TypeFilter::All, "UNKNOWN").len(), 1);
    assert!(
        filter_testcases(scenario, TypeFilter::Only(TestCaseType::Security), "epc").is_empty()
    );
}

#[test]
fn parses_type_filter() {
    assert_eq!("All".parse::<TypeFilter>().expect("all"), TypeFilter::All);
    assert_eq!(
        "edge".parse::<TypeFilter>().expect("edge"),
        TypeFilter::Only(TestCaseType::Edge)
    );
    assert!("Usability".parse::<TypeFilter>().is_err());
}
