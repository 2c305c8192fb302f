//! Process supervision for a local LanguageTool server.
//!
//! This crate finds an installed LanguageTool and a Java runtime
//! ([`locate`]), spawns and supervises the server process on a free port
//! ([`supervisor`]), and tracks every spawned pid in a process-wide
//! registry so an embedding application can terminate stragglers at
//! shutdown ([`registry`]).

pub mod locate;
pub mod registry;
pub mod supervisor;

pub use locate::{Installation, LocateError};
pub use supervisor::{ServerCommand, StartupError, Supervisor};
