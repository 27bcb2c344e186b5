//! Inter-agent message protocol.

mod message;

pub use message::{AgentMessage, MessageKind};
