use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{ArtifactTree, PushResult, Requirement, Scenario, TestCase},
    protocol::DEFAULT_MAX_SCENARIOS,
};
use storage::MemoryDraftStore;
use tokio::sync::Notify;

use super::*;
use crate::state::{SessionSettings, Stage};

#[derive(Default)]
struct MockPipeline {
    requirements: Vec<Requirement>,
    tree: ArtifactTree,
    fail_with: Option<String>,
    hold_index: Option<Arc<Notify>>,
    calls: AtomicUsize,
    scenario_requests: Mutex<Vec<ScenarioRequest>>,
    push_requests: Mutex<Vec<PushRequest>>,
}

impl MockPipeline {
    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn returning_tree(tree: ArtifactTree) -> Self {
        Self {
            tree,
            ..Self::default()
        }
    }

    fn enter(&self) -> ConsoleResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(ConsoleError::transport(message.clone())),
            None => Ok(()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineClient for MockPipeline {
    async fn build_index(&self, _api_base: &str, request: &IndexRequest) -> ConsoleResult<Value> {
        self.enter()?;
        if let Some(hold) = &self.hold_index {
            hold.notified().await;
        }
        Ok(json!({"indexed": request.sources.len()}))
    }

    async fn fetch_requirements(
        &self,
        _api_base: &str,
        _issue_key: &str,
    ) -> ConsoleResult<Vec<Requirement>> {
        self.enter()?;
        Ok(self.requirements.clone())
    }

    async fn generate_scenarios(
        &self,
        _api_base: &str,
        request: &ScenarioRequest,
    ) -> ConsoleResult<ArtifactTree> {
        self.enter()?;
        self.scenario_requests
            .lock()
            .expect("lock")
            .push(request.clone());
        Ok(self.tree.clone())
    }

    async fn generate_testcases(
        &self,
        _api_base: &str,
        request: &TestCaseRequest,
    ) -> ConsoleResult<ArtifactTree> {
        self.enter()?;
        let mut tree = request.scenario_pack.clone();
        for scenario in &mut tree.scenarios {
            scenario.test_cases.push(TestCase {
                tc_id: format!("{}-TC1", scenario.scenario_id),
                ..TestCase::default()
            });
        }
        Ok(tree)
    }

    async fn push_to_jira(
        &self,
        _api_base: &str,
        request: &PushRequest,
    ) -> ConsoleResult<PushResult> {
        self.enter()?;
        self.push_requests.lock().expect("lock").push(request.clone());
        Ok(PushResult {
            scenario_keys: vec!["ABC-1".into()],
            testcase_keys: vec!["ABC-2".into()],
            ..PushResult::default()
        })
    }
}

fn orchestrator(pipeline: Arc<MockPipeline>) -> SessionOrchestrator {
    SessionOrchestrator::new(pipeline, Arc::new(MemoryDraftStore::new()))
}

fn three_scenarios() -> ArtifactTree {
    let scenario = |id: &str, test_cases: usize| Scenario {
        scenario_id: id.into(),
        title: format!("Scenario {id}"),
        test_cases: (0..test_cases)
            .map(|n| TestCase {
                tc_id: format!("{id}-TC{n}"),
                ..TestCase::default()
            })
            .collect(),
        ..Scenario::default()
    };
    ArtifactTree {
        scenarios: vec![scenario("S1", 2), scenario("S2", 0), scenario("S3", 0)],
        ..ArtifactTree::default()
    }
}

#[tokio::test]
async fn closed_gate_sends_nothing() {
    let pipeline = Arc::new(MockPipeline::default());
    let console = orchestrator(pipeline.clone());
    let state = WorkflowState::reset();

    let err = console
        .build_knowledge_base(&state)
        .await
        .expect_err("no sources");
    assert!(matches!(
        err,
        ConsoleError::GateClosed {
            action: PipelineAction::BuildKnowledgeBase,
            ..
        }
    ));
    assert!(console.create_testcases(&state).await.is_err());
    assert!(console.push_to_jira(&state, &default_labels()).await.is_err());
    assert_eq!(pipeline.calls(), 0);
}

#[tokio::test]
async fn index_marks_knowledge_base_ready() {
    let pipeline = Arc::new(MockPipeline::default());
    let console = orchestrator(pipeline.clone());
    let state = WorkflowState::reset().add_sample_sources();

    let outcome = console.build_knowledge_base(&state).await.expect("index");
    assert!(outcome.state.kb_ready);
    assert_eq!(outcome.state.last_index_result, json!({"indexed": 2}));
    assert!(matches!(outcome.notice, Notice::Success(_)));
    assert!(!state.kb_ready);
}

#[tokio::test]
async fn failed_call_leaves_state_untouched() {
    let pipeline = Arc::new(MockPipeline::failing("API Error 502 at /v1/index: bad gateway"));
    let console = orchestrator(pipeline.clone());
    let state = WorkflowState::reset().add_sample_sources();
    let before = state.clone();

    let err = console.build_knowledge_base(&state).await.expect_err("502");
    assert_eq!(err.to_string(), "API Error 502 at /v1/index: bad gateway");
    assert_eq!(state, before);
    assert_eq!(pipeline.calls(), 1);
    assert!(!console.is_busy(PipelineAction::BuildKnowledgeBase));
}

#[tokio::test]
async fn scenarios_use_issue_key_without_local_requirements() {
    let pipeline = Arc::new(MockPipeline::returning_tree(three_scenarios()));
    let console = orchestrator(pipeline.clone());
    let state = WorkflowState::reset().with_issue_key("RFID-9");

    let outcome = console
        .create_scenarios(&state, DEFAULT_MAX_SCENARIOS)
        .await
        .expect("scenarios");
    assert_eq!(outcome.state.artifact_tree, three_scenarios());

    let requests = pipeline.scenario_requests.lock().expect("lock");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].jira_issue_key.as_deref(), Some("RFID-9"));
    assert!(requests[0].fetch_requirements_from_jira);
    assert!(requests[0].product_pack.requirements.is_empty());
    assert_eq!(requests[0].tenant_id, "rfid-warehouse");
}

#[tokio::test]
async fn scenarios_send_null_issue_key_when_blank() {
    let pipeline = Arc::new(MockPipeline::returning_tree(three_scenarios()));
    let console = orchestrator(pipeline.clone());
    let (state, _) = WorkflowState::reset()
        .with_issue_key("   ")
        .apply_requirements(&[Requirement::new("R1", "Read once.")])
        .expect("apply");

    console.create_scenarios(&state, 5).await.expect("scenarios");
    let requests = pipeline.scenario_requests.lock().expect("lock");
    assert_eq!(requests[0].jira_issue_key, None);
    assert_eq!(requests[0].max_scenarios, 5);
}

#[tokio::test]
async fn max_scenarios_is_bounded() {
    let pipeline = Arc::new(MockPipeline::default());
    let console = orchestrator(pipeline.clone());
    let state = WorkflowState::reset().with_issue_key("RFID-9");

    for bad in [0, 4, 61] {
        let err = console
            .create_scenarios(&state, bad)
            .await
            .expect_err("out of range");
        assert!(matches!(err, ConsoleError::Validation(_)));
    }
    assert_eq!(pipeline.calls(), 0);
}

#[tokio::test]
async fn testcases_replace_tree_with_enriched_copy() {
    let pipeline = Arc::new(MockPipeline::default());
    let console = orchestrator(pipeline.clone());
    let state = WorkflowState::reset().merge_artifact_tree(three_scenarios());

    let outcome = console.create_testcases(&state).await.expect("testcases");
    assert_eq!(testcase_count(&outcome.state.artifact_tree), 5);
    assert_eq!(outcome.notice, Notice::Success("Generated 5 test case(s)".into()));
}

#[tokio::test]
async fn preview_outcomes_are_advisory_when_empty_or_failing() {
    let state = WorkflowState::reset().with_issue_key("RFID-9");

    let empty = orchestrator(Arc::new(MockPipeline::default()));
    let outcome = empty
        .fetch_requirements_preview(&state)
        .await
        .expect("empty preview");
    assert_eq!(
        outcome.notice,
        Notice::Advisory("No requirements found in Jira issue description.".into())
    );
    assert_eq!(outcome.state, state);

    let failing = orchestrator(Arc::new(MockPipeline::failing("connection refused")));
    let outcome = failing
        .fetch_requirements_preview(&state)
        .await
        .expect("failed preview");
    assert!(matches!(outcome.notice, Notice::Advisory(_)));
    assert_eq!(outcome.warnings, vec!["connection refused".to_string()]);
    assert_eq!(outcome.state, state);
}

#[tokio::test]
async fn preview_then_use_requirements() {
    let pipeline = Arc::new(MockPipeline {
        requirements: vec![
            Requirement::new("R1", "Reads finish within 500ms."),
            Requirement {
                id: None,
                statement: "Duplicates raise an alert.".into(),
            },
        ],
        ..MockPipeline::default()
    });
    let console = orchestrator(pipeline);
    let state = WorkflowState::reset().with_issue_key("RFID-9");

    let previewed = console
        .fetch_requirements_preview(&state)
        .await
        .expect("preview")
        .state;
    assert_eq!(previewed.fetched_requirements.len(), 2);
    assert!(previewed.requirements_fetched_at.is_some());
    assert!(previewed.project_config.requirements.is_empty());

    let applied = console.use_fetched_requirements(&previewed).expect("use");
    assert_eq!(applied.state.project_config.requirements.len(), 2);
    assert_eq!(applied.warnings.len(), 1);

    let err = console
        .use_fetched_requirements(&WorkflowState::reset())
        .expect_err("nothing fetched");
    assert!(matches!(err, ConsoleError::Validation(_)));
}

#[tokio::test]
async fn push_sends_labels_and_stores_result() {
    let pipeline = Arc::new(MockPipeline::default());
    let console = orchestrator(pipeline.clone());
    let state = WorkflowState::reset().merge_artifact_tree(three_scenarios());

    let outcome = console
        .push_to_jira(&state, &default_labels())
        .await
        .expect("push");
    let result = outcome.state.last_push_result.expect("push result");
    assert_eq!(result.scenario_keys, vec!["ABC-1"]);

    let requests = pipeline.push_requests.lock().expect("lock");
    assert_eq!(requests[0].label_prefix, vec!["QA", "AutoGen"]);
    assert_eq!(requests[0].scenario_pack, three_scenarios());
}

#[tokio::test]
async fn second_request_of_same_kind_is_busy() {
    let release = Arc::new(Notify::new());
    let pipeline = Arc::new(MockPipeline {
        hold_index: Some(release.clone()),
        ..MockPipeline::default()
    });
    let console = orchestrator(pipeline.clone());
    let state = WorkflowState::reset().add_sample_sources();

    let first = console.build_knowledge_base(&state);
    let second = async {
        while !console.is_busy(PipelineAction::BuildKnowledgeBase) {
            tokio::task::yield_now().await;
        }
        let result = console.build_knowledge_base(&state).await;
        release.notify_one();
        result
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.expect("first call").state.kb_ready);
    assert!(matches!(
        second,
        Err(ConsoleError::Busy(PipelineAction::BuildKnowledgeBase))
    ));
    assert_eq!(pipeline.calls(), 1);
    assert!(!console.is_busy(PipelineAction::BuildKnowledgeBase));
}

#[tokio::test]
async fn drafts_round_trip_and_report_overwrites() {
    let console = orchestrator(Arc::new(MockPipeline::default()));
    let state = WorkflowState::reset()
        .add_sample_sources()
        .with_issue_key("RFID-9")
        .merge_artifact_tree(three_scenarios());

    let saved = console
        .save_draft(&state, Some("rfid-sprint"))
        .await
        .expect("save");
    assert_eq!(saved.name, "rfid-sprint");
    assert!(!saved.replaced);
    assert_eq!(saved.location, "memory:rfid-sprint");
    assert!(
        console
            .save_draft(&state, Some("rfid-sprint"))
            .await
            .expect("save again")
            .replaced
    );

    let fresh = WorkflowState::reset().select_stage(Stage::Export);
    let loaded = console
        .load_draft(&fresh, "rfid-sprint")
        .await
        .expect("load");
    assert_eq!(loaded.state.sources, state.sources);
    assert_eq!(loaded.state.project_config, state.project_config);
    assert_eq!(loaded.state.artifact_tree, state.artifact_tree);
    assert_eq!(loaded.state.stage, Stage::Export);
    assert_eq!(console.list_drafts().await.expect("list"), vec!["rfid-sprint"]);
}

#[tokio::test]
async fn draft_names_are_defaulted_and_validated() {
    let console = orchestrator(Arc::new(MockPipeline::default()));
    let state = WorkflowState::reset();

    let saved = console.save_draft(&state, None).await.expect("default name");
    assert!(saved.name.starts_with("draft_rfid-warehouse_"), "{}", saved.name);

    let err = console
        .save_draft(&state, Some("../etc/passwd"))
        .await
        .expect_err("separator");
    assert!(matches!(err, ConsoleError::Validation(_)));

    let err = console
        .load_draft(&state, "never-saved")
        .await
        .expect_err("missing");
    assert!(matches!(err, ConsoleError::DraftNotFound(name) if name == "never-saved"));
}

#[test]
fn new_session_keeps_session_settings() {
    let console = orchestrator(Arc::new(MockPipeline::default()));
    let settings = SessionSettings {
        project_name: "dock-doors".into(),
        api_base: "http://testgen:9000".into(),
        developer_mode: true,
    };
    let state = WorkflowState::new(settings.clone())
        .add_sample_sources()
        .merge_artifact_tree(three_scenarios());

    let fresh = console.new_session(&state);
    assert_eq!(fresh.settings, settings);
    assert!(fresh.sources.is_empty());
    assert!(fresh.artifact_tree.scenarios.is_empty());
}
