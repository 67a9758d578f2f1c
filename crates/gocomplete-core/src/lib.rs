//! Completion engine for Go source.
//!
//! This crate provides the language machinery behind gocomplete:
//! - A tokenizer and declaration-level parser for Go
//! - Export-line preprocessing and archive export-data loading
//! - The declaration tree with merge and method attachment
//! - The symbol table caching loaded packages
//! - Lazy, cycle-guarded type inference
//! - Dotted-path completion queries
//!
//! Locating archives on disk is left to the caller through [`Locator`].
//!
//! ```no_run
//! use std::path::PathBuf;
//! use gocomplete_core::Context;
//!
//! let mut ctx = Context::new(|path: &str| -> Option<PathBuf> {
//!     Some(PathBuf::from(format!("/usr/lib/go/pkg/linux_amd64/{}.a", path)))
//! });
//! let out = ctx.complete("package main\nimport \"strings\"\n", "strings.Has")?;
//! for (display, insert) in out.iter() {
//!     println!("{display},,{insert}");
//! }
//! # Ok::<(), gocomplete_core::LoadError>(())
//! ```

pub mod archive;
pub mod complete;
pub mod context;
pub mod decl;
pub mod export;
pub mod infer;
pub mod syntax;

pub use archive::LoadError;
pub use complete::{query_at_cursor, Completions};
pub use context::{Context, Locator, Status};
pub use decl::{Decl, DeclKind};
pub use infer::{Scope, Typed};
pub use syntax::SyntaxError;
