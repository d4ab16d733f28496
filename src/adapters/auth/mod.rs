//! Auth provider adapters. Map bearer tokens to user ids.

pub mod session_adapter;

pub use session_adapter::{HttpSessionAdapter, StaticSessions};
