//! Interactive documentation chat
//!
//! `ChatApp` holds the handlers for one user connection; the terminal
//! module connects them to stdin and stdout through the UI bus.

pub mod app;
pub mod examples;
pub mod terminal;

pub use app::{AppContext, ChatApp, ChatSession};
pub use terminal::{parse_line, read_input, TerminalRenderer};
