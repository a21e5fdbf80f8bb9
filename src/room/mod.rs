//! The chat room: membership and message log behind a single-writer loop
mod controller;
mod state;

pub mod client_id;
pub mod messages;
pub mod registry;

pub use client_id::ClientId;
pub use messages::{Accepted, ChatMessage, HistoryResponse, IntentKind, NewMessage};
pub use registry::ClientRegistry;
