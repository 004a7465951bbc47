/// State management module
///
/// This module handles all wizard state, including:
/// - Shared data structures and the metadata descriptor (data.rs)
/// - Review grid pagination (page.rs)
/// - The per-session state threaded through every handler (session.rs)

pub mod data;
pub mod page;
pub mod session;
