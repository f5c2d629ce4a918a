//! These models represent the objects exchanged with a Foundry project
//!
//! Two families live here:
//! - the conversation side: roles, messages and the response an agent produces
//! - the project side: agents and their versioned definitions
//!
//! The wire request for a conversation is built from these in `responses`, so the
//! internal message model stays independent of the exact request shape.
pub mod agent;
pub mod message;
pub mod response;
pub mod role;
