//! Core of the test-generation operator console: session state, stage gates,
//! artifact views, draft codec and the pipeline orchestrator.

pub mod drafts;
pub mod export;
pub mod gates;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod views;

pub use drafts::{DraftDocument, PersistedState, DRAFT_SCHEMA_VERSION};
pub use gates::{action_gate, Checklist, Gate};
pub use pipeline::{HttpPipelineClient, PipelineClient, Timeouts};
pub use session::{default_labels, Notice, Outcome, SavedDraft, SessionOrchestrator};
pub use state::{SessionSettings, Stage, WorkflowState};
