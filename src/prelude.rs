//! Convenience re-exports for common use.

pub use crate::agent::{ChatAgent, ControlCommand, UserInput};
pub use crate::config::ThreadlineConfig;
pub use crate::error::{Result, ThreadlineError};
pub use crate::memory::{ConversationBuffer, JsonTurnStore, TranscriptStore, Turn};
pub use crate::provider::{create_provider, ModelProvider};
pub use crate::router::{Task, TaskRouter, TaskState};
pub use crate::session::{Session, SessionStore};
pub use crate::tools::{
    AgentTool, AgentToolParameters, BuiltinServices, Tool, ToolArguments, ToolRegistry,
};
pub use crate::types::{
    ContentPart, FinishReason, GenerateTextResult, GenerationSettings, ImageSource, ModelMessage,
    Role, StreamEventType, StreamTextResult, TextStreamDelta, Usage,
};
