use std::fmt;

use thiserror::Error;

/// Pipeline actions that may be in flight. At most one of each kind runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineAction {
    BuildKnowledgeBase,
    FetchRequirements,
    CreateScenarios,
    CreateTestCases,
    PushToJira,
}

impl PipelineAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BuildKnowledgeBase => "build_knowledge_base",
            Self::FetchRequirements => "fetch_requirements",
            Self::CreateScenarios => "create_scenarios",
            Self::CreateTestCases => "create_test_cases",
            Self::PushToJira => "push_to_jira",
        }
    }
}

impl fmt::Display for PipelineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{0}")]
    Transport(String),
    #[error("draft '{0}' not found")]
    DraftNotFound(String),
    #[error("{action} is unavailable: {reason}")]
    GateClosed {
        action: PipelineAction,
        reason: String,
    },
    #[error("{0} is already running")]
    Busy(PipelineAction),
    #[error("draft store failure: {0}")]
    Storage(String),
    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConsoleError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn gate_closed(action: PipelineAction, reason: impl Into<String>) -> Self {
        Self::GateClosed {
            action,
            reason: reason.into(),
        }
    }
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;
