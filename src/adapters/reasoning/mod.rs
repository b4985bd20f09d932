//! Reasoning backends.

pub mod mock;
pub mod openai;

pub use mock::{MockFailure, MockResponse, RecordedCall, ScriptedReasoning};
pub use openai::OpenAiReasoning;
