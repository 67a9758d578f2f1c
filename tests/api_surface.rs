//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Engine (re-exported from gocomplete-core)
// ============================================================================

use gocomplete::{
    query_at_cursor, Completions, Context, Decl, DeclKind, LoadError, Locator, Scope,
    SyntaxError,
};

use gocomplete_core::archive::{parse_export_data, ExportData};
use gocomplete_core::context::Status;
use gocomplete_core::decl::{add_decls, member_decls, DeclMap, Unit, Visibility};
use gocomplete_core::export::{display_name, preprocess, ExportLine};
use gocomplete_core::infer::Typed;
use gocomplete_core::syntax::{parse_decl_list, parse_file, Expr, SourceFile, TypeExpr};

// ============================================================================
// Boundary
// ============================================================================

use gocomplete::config::{Config, ConfigError, KEYS};
use gocomplete::env::{host_goarch, host_goos, EnvError, GoEnvironment};
use gocomplete::error::{GocompleteError, OutputErrorCode};
use gocomplete::output::{
    emit_response, emit_response_compact, emit_text, Candidate, CompleteResponse,
    ConfigResponse, EnvResponse, ErrorInfo, ErrorResponse, OptionEntry, StatusResponse,
    SCHEMA_VERSION,
};
use gocomplete::server::{handle, respond, serve, Command, Request, Response};
use gocomplete::service::{Service, ServiceError, ServiceStatus};

// ============================================================================
// Test
// ============================================================================

#[test]
fn api_surface_compiles() {
    // The imports above form the public API contract.
    let _ = std::any::type_name::<Context>();
    let _ = std::any::type_name::<Completions>();
    let _ = std::any::type_name::<GoEnvironment>();
    let _ = std::any::type_name::<Service>();
    let _ = std::any::type_name::<GocompleteError>();
    let _ = std::any::type_name::<Request>();
}

#[test]
fn environment_is_a_locator() {
    fn assert_locator<L: Locator>() {}
    assert_locator::<GoEnvironment>();
}

#[test]
fn service_is_shareable_between_threads() {
    fn assert_sync<T: Send + Sync>() {}
    assert_sync::<Service>();
}

#[test]
fn schema_version_is_stable() {
    assert_eq!(SCHEMA_VERSION, "1");
}
