// src/chat/mod.rs
//! Chat view orchestration: the session list, the selected transcript and the
//! dashboard state machine that ties them to the responder.
pub mod dashboard;
pub mod messages;
pub mod sessions;

pub use dashboard::{Dashboard, DashboardView, SubmitOutcome, Welcome, SUGGESTIONS};
pub use messages::MessageList;
pub use sessions::SessionList;
