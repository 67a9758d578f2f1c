//! gocomplete: code completion for Go source.
//!
//! The completion engine lives in `gocomplete-core`. This crate adds what a
//! running tool needs around it: locating package archives in a Go
//! installation, persistent options, the shared reference-counted service,
//! JSON output and the line-protocol daemon behind `gocomplete serve`.

// Engine - re-exported from gocomplete-core
pub use gocomplete_core::{
    query_at_cursor, Completions, Context, Decl, DeclKind, LoadError, Locator, Scope,
    SyntaxError,
};

pub mod config;
pub mod env;
pub mod error;
pub mod output;
pub mod server;
pub mod service;
