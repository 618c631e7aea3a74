//! Real-time chat session client for the rental assistant backend.
//!
//! A session holds one WebSocket connection to the backend, renders every bot
//! turn into an append-only transcript (text bubbles, a transient set of quick
//! replies, property cards) and sends the user's typed text or chosen replies
//! back as `{"text": ...}` frames.
//!
//! - [`transport`]: the connection and its lifecycle
//! - [`protocol`]: inbound/outbound frames
//! - [`render`]: transcript entries built from frames
//! - [`options`]: the live quick-reply set
//! - [`session`]: the controller tying them together
//! - [`view`]: what a presentation host has to provide
//! - [`terminal`]: the host used by the `rentchat` binary

pub mod config;
pub mod logging;
pub mod options;
pub mod protocol;
pub mod render;
pub mod session;
pub mod terminal;
pub mod transport;
pub mod view;

pub use session::{SessionController, SessionEvent, UserAction};
pub use view::{ChatView, MemoryView};
