//! The orchestration core of Gridline.
//!
//! A query runs as a bounded loop:
//!
//! 1. **Append** the user's text to the conversation
//! 2. **Call the model** with the transcript, tool catalog, and system prompt
//! 3. **If tool calls**: validate and dispatch them in order, append the
//!    request and result turns, loop back to step 2
//! 4. **If text**: append it and return it as the answer
//!
//! The loop ends on a text answer, an empty response, or when the tool
//! round limit is reached.

pub mod dispatcher;
pub mod loop_runner;
pub mod session;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use dispatcher::ToolDispatcher;
pub use loop_runner::{AgentLoop, NO_RESPONSE, NO_RESPONSE_AFTER_TOOLS, ROUND_LIMIT_REACHED};
pub use session::Session;
pub use validator::{ValidationError, validate};
