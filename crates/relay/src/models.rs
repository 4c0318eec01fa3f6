//! These models represent the objects passed around during one query
//!
//! There are a few related formats we need to interact with:
//! - tool descriptors and call results, exchanged with the tool server over stdio or http
//! - openai-compatible messages/tools, sent from the agent to the model backend
//! - plain text, returned to the caller after sanitizing
//!
//! We always immediately convert those data models into the internal structs using
//! to/from helpers, so the agent loop never touches wire formats directly.
pub mod conversation;
pub mod message;
pub mod role;
pub mod tool;
