//! Tests for the error module.
//!
//! This module contains tests for error handling and error types.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data_structures::RouteError;
use crate::diagnostics::DiagnosticError;
use crate::error::config::ConfigError;
use crate::error::{
    Component, ErrorContext, ErrorReporter, RouterError, RouterResult, TracingErrorReporter,
};
use crate::route_file::RouteFile;

/// Test that error context can be created and displayed properly.
#[test]
fn test_error_context_display() {
    let error = RouterError::Custom("test error".to_string());
    let context = ErrorContext::new(error).with_details("additional details");

    assert_eq!(context.component, Component::Driver);
    assert_eq!(context.topic, None);
    assert_eq!(
        format!("{context}"),
        "Error in driver: test error\nDetails: additional details"
    );
}

/// Test that routing errors carry the offending topic into the context.
#[test]
fn test_error_context_names_topic() {
    let error = RouterError::from(RouteError::ConflictingRoute("device.".to_string()));
    let context = ErrorContext::new(error);

    assert_eq!(context.component, Component::RoutingTable);
    assert_eq!(context.topic.as_deref(), Some("device."));
    assert!(format!("{context}").starts_with("Error in routing table for topic 'device.':"));
}

/// Test that routing errors surfacing through diagnostics keep their topic.
#[test]
fn test_error_context_diagnostic_route_error() {
    let error = RouterError::from(DiagnosticError::from(RouteError::not_found("a.b")));
    let context = ErrorContext::new(error);

    assert_eq!(context.component, Component::Diagnostics);
    assert_eq!(context.topic.as_deref(), Some("a.b"));
}

/// Test that component attribution follows the error source.
#[test]
fn test_component_of() {
    let config = RouterError::from(ConfigError::ValidationError("bad".to_string()));
    assert_eq!(Component::of(&config), Component::Configuration);

    let parse = RouteFile::parse("[[route]]\ntopic = ").unwrap_err();
    assert_eq!(Component::of(&parse), Component::RouteFile);

    let capacity = RouterError::from(RouteError::CapacityExceeded { capacity: 1 });
    let context = ErrorContext::new(capacity).with_topic("metrics.cpu");
    assert_eq!(context.component, Component::RoutingTable);
    assert_eq!(context.topic.as_deref(), Some("metrics.cpu"));
}

/// Test that nested errors work correctly.
#[test]
fn test_nested_errors() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let router_error = RouterError::Io(io_error);

    let error_string = format!("{router_error}");
    assert!(error_string.contains("file not found"));
}

/// Test that component errors convert into the crate error.
#[test]
fn test_error_conversions() {
    let route: RouterError = RouteError::not_found("a.b").into();
    assert!(matches!(route, RouterError::Route(RouteError::NotFound(_))));
    assert!(route.to_string().starts_with("Routing error:"));

    let config: RouterError = ConfigError::ValidationError("bad".to_string()).into();
    assert!(matches!(config, RouterError::Config(_)));

    let diagnostic: RouterError = DiagnosticError::UnknownCommand("nope".to_string()).into();
    assert!(diagnostic.to_string().contains("nope"));

    let nested: RouterError = DiagnosticError::from(RouteError::OutOfMemory("test")).into();
    assert!(matches!(
        nested,
        RouterError::Diagnostic(DiagnosticError::Route(RouteError::OutOfMemory(_)))
    ));
}

/// Test that `?` propagates routing errors out of helpers.
#[test]
fn test_question_mark_propagation() {
    fn register(key: &str) -> RouterResult<()> {
        let file = RouteFile::parse(&format!(
            "[[route]]\ntopic = \"{key}\"\ndestination = \"x\"\n"
        ))?;
        let mut table = crate::data_structures::RoutingTable::new();
        file.apply(&mut table)?;
        Ok(())
    }

    assert!(register("a.b").is_ok());
    assert!(matches!(
        register("a..b"),
        Err(RouterError::Route(RouteError::InvalidKey { .. }))
    ));
}

/// Counting error reporter for testing.
#[derive(Debug, Default)]
struct CountingErrorReporter {
    reported_count: AtomicUsize,
}

impl CountingErrorReporter {
    fn reported_count(&self) -> usize {
        self.reported_count.load(Ordering::SeqCst)
    }
}

impl ErrorReporter for CountingErrorReporter {
    fn report(&self, _context: ErrorContext) {
        self.reported_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Test that reporters can be used through a trait object.
#[test]
fn test_custom_error_reporter() {
    let reporter = CountingErrorReporter::default();
    let reporters: [&dyn ErrorReporter; 2] = [&reporter, &TracingErrorReporter];

    for reporter in reporters {
        let error = RouterError::Custom("test error".to_string());
        reporter.report(ErrorContext::new(error));
    }

    assert_eq!(reporter.reported_count(), 1);
}

/// Test that the default tracing error reporter can be created.
#[test]
fn test_tracing_error_reporter() {
    let reporter = TracingErrorReporter;
    let error = RouterError::Custom("test error".to_string());
    let context = ErrorContext::new(error);

    // Just make sure this doesn't panic
    reporter.report(context);
}
