//! Conversation sessions: the turn driver, its events, and terminal output.

pub mod driver;
pub mod events;
pub mod printer;

pub use driver::{
    EventHandler, MessageOptions, Session, SessionConfig, SubscriptionId, DEFAULT_MODEL,
};
pub use events::{SessionEvent, SessionEventData};
pub use printer::StreamPrinter;
