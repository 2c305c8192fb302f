//! Core domain types for the langtool client.
//!
//! This crate contains pure domain types with no IO and no async: the wire
//! model returned by a LanguageTool server, validated language tags, the
//! per-call check options, and the suggestion-application algorithm.
//! Everything here can be used from any layer of the workspace.

mod correct;
mod language;
mod matches;
mod options;

pub use correct::correct;
pub use language::{Language, LanguageSet, LanguageTag, UnsupportedLanguage};
pub use matches::{Category, CheckResponse, Context, Match, Replacement, Rule};
pub use options::CheckOptions;
