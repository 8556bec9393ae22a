use std::sync::Arc;

use axum::{routing::post, Json, Router};
use console_core::{
    default_labels,
    export::{render, ExportKind},
    gates::{action_gate, Checklist},
    state::SourceMode,
    views::{flatten_for_export, testcase_count},
    HttpPipelineClient, SessionOrchestrator, SessionSettings, WorkflowState,
};
use serde_json::{json, Value};
use shared::error::PipelineAction;
use storage::DirDraftStore;
use tokio::net::TcpListener;

async fn spawn_service() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route(
            "/v1/index",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"indexed_sources": body["sources"].as_array().map(Vec::len)}))
            }),
        )
        .route(
            "/v1/scenarios",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["jira_issue_key"], "RFID-9");
                Json(json!({
                    "scenarios": [
                        {"scenario_id": "S1", "title": "Unauthorized EPC", "objective": "Block, alert"},
                        {"scenario_id": "S2", "title": "Retry reads"},
                        {"scenario_id": "S3", "title": "Latency SLA"}
                    ]
                }))
            }),
        )
        .route(
            "/v1/testcases",
            post(|Json(body): Json<Value>| async move {
                let mut pack = body["scenario_pack"].clone();
                pack["scenarios"][0]["test_cases"] = json!([
                    {"tc_id": "TC1", "title": "Reject unknown EPC", "type": "Negative", "priority": "P1"},
                    {"tc_id": "TC2", "title": "Alert raised", "type": "Security", "priority": "P2"}
                ]);
                Json(pack)
            }),
        )
        .route(
            "/v1/jira/push",
            post(|| async { Json(json!({"scenario_keys": ["ABC-10", "ABC-11", "ABC-12"], "testcase_keys": ["ABC-13", "ABC-14"]})) }),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn operator_walks_all_stages_and_restores_the_draft() {
    let api_base = spawn_service().await;
    let temp = tempfile::tempdir().expect("tempdir");
    let drafts = DirDraftStore::open(temp.path().join("ui_drafts"))
        .await
        .expect("draft dir");
    let console = SessionOrchestrator::new(
        Arc::new(HttpPipelineClient::default()),
        Arc::new(drafts),
    );

    let settings = SessionSettings {
        api_base,
        ..SessionSettings::default()
    };
    let (state, hint) = WorkflowState::new(settings)
        .add_source("https://ex.com/a", SourceMode::AutoDetect, "")
        .expect("source");
    assert!(hint.is_none());

    let state = console
        .build_knowledge_base(&state)
        .await
        .expect("index")
        .state;
    assert!(state.kb_ready);

    let state = state.with_issue_key("RFID-9");
    assert!(state.project_config.requirements.is_empty());
    assert!(action_gate(&state, PipelineAction::CreateScenarios).is_open());

    let state = console
        .create_scenarios(&state, 20)
        .await
        .expect("scenarios")
        .state;
    let state = console
        .create_testcases(&state)
        .await
        .expect("testcases")
        .state;
    assert_eq!(state.artifact_tree.scenarios.len(), 3);
    assert_eq!(testcase_count(&state.artifact_tree), 2);
    assert_eq!(flatten_for_export(&state.artifact_tree).len(), 2);

    let csv = render(&state, ExportKind::FlatTestCases)
        .expect("csv")
        .expect("csv body");
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("S1,Unauthorized EPC,TC1,Reject unknown EPC,Negative,P1"));

    let state = console
        .push_to_jira(&state, &default_labels())
        .await
        .expect("push")
        .state;
    let checklist = Checklist::evaluate(&state);
    assert_eq!(checklist.completed(), 5);
    assert!(!checklist.requirements_ok);

    let saved = console
        .save_draft(&state, Some("acceptance"))
        .await
        .expect("save");
    assert!(temp.path().join("ui_drafts/acceptance.json").exists());
    assert!(!saved.replaced);

    let restored = console
        .load_draft(&WorkflowState::reset(), "acceptance")
        .await
        .expect("load")
        .state;
    assert_eq!(restored.persisted(), state.persisted());
    assert_eq!(restored.sources, state.sources);
    assert_eq!(restored.project_config, state.project_config);
    assert_eq!(restored.artifact_tree, state.artifact_tree);
}
