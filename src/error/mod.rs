//! Error module for the topic router.
//!
//! This module provides the crate-level error type that aggregates the errors
//! of every component, together with the context and reporting helpers used by
//! the command-line driver.

use std::fmt::{Display, Formatter};
use thiserror::Error;

use crate::data_structures::routing_table::RouteError;
use crate::diagnostics::DiagnosticError;

pub mod config;

/// Result type alias used throughout the topic router.
pub type RouterResult<T> = Result<T, RouterError>;

/// Core error enum for the topic router.
#[derive(Error, Debug)]
pub enum RouterError {
    /// Errors occurring during configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Errors reported by the routing table.
    #[error("Routing error: {0}")]
    Route(#[from] RouteError),

    /// Errors raised while executing a diagnostic command.
    #[error("Diagnostic error: {0}")]
    Diagnostic(#[from] DiagnosticError),

    /// IO errors that may occur during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed TOML input.
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML output could not be produced.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Custom error with message for cases where specific error types are not defined.
    #[error("{0}")]
    Custom(String),
}

impl RouterError {
    /// Returns the routing table error behind this error, if any.
    ///
    /// Routing errors raised while running a diagnostic command are found too.
    pub fn route_error(&self) -> Option<&RouteError> {
        match self {
            Self::Route(err) | Self::Diagnostic(DiagnosticError::Route(err)) => Some(err),
            _ => None,
        }
    }
}

/// Part of the router an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Configuration loading and validation.
    Configuration,
    /// Route registration, lookup and removal.
    RoutingTable,
    /// Diagnostic commands and log verbosity switching.
    Diagnostics,
    /// Reading and parsing route files.
    RouteFile,
    /// The command-line driver itself.
    Driver,
}

impl Component {
    /// Attributes `error` to the component that raised it.
    pub fn of(error: &RouterError) -> Self {
        match error {
            RouterError::Config(_) => Self::Configuration,
            RouterError::Route(_) => Self::RoutingTable,
            RouterError::Diagnostic(_) => Self::Diagnostics,
            RouterError::TomlDe(_) => Self::RouteFile,
            RouterError::Io(_)
            | RouterError::Serialization(_)
            | RouterError::TomlSer(_)
            | RouterError::Custom(_) => Self::Driver,
        }
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::RoutingTable => "routing table",
            Self::Diagnostics => "diagnostics",
            Self::RouteFile => "route file",
            Self::Driver => "driver",
        };
        f.write_str(name)
    }
}

/// An error together with the topic and command it was raised for.
#[derive(Debug)]
pub struct ErrorContext {
    /// The original error.
    pub error: RouterError,

    /// Component the error is attributed to.
    pub component: Component,

    /// Topic key being registered, resolved or removed, if any.
    pub topic: Option<String>,

    /// Free-form context, such as the command being executed.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wraps `error`, attributing it to a component.
    ///
    /// When the error comes from the routing table and names a key, that key
    /// becomes the context's topic.
    ///
    /// # Arguments
    ///
    /// * `error` - The error that occurred
    pub fn new(error: RouterError) -> Self {
        let component = Component::of(&error);
        let topic = error
            .route_error()
            .and_then(RouteError::key)
            .map(str::to_string);
        Self {
            error,
            component,
            topic,
            details: None,
        }
    }

    /// Sets the topic the error was raised for, replacing any inferred one.
    pub fn with_topic<S: Into<String>>(mut self, topic: S) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Adds detail information to the error context.
    pub fn with_details<S: Into<String>>(mut self, details: S) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error in {}", self.component)?;
        if let Some(topic) = &self.topic {
            write!(f, " for topic '{topic}'")?;
        }
        write!(f, ": {}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }
        Ok(())
    }
}

/// Sink for errors that end a command.
pub trait ErrorReporter: Send + Sync + std::fmt::Debug {
    /// Reports `context` once; the caller exits afterwards.
    fn report(&self, context: ErrorContext);
}

/// Reports errors as `tracing` events at error level.
#[derive(Default, Debug)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, context: ErrorContext) {
        tracing::error!(
            error = %context.error,
            component = %context.component,
            topic = context.topic.as_deref().unwrap_or("-"),
            details = context.details.as_deref().unwrap_or("-"),
            "Command failed"
        );
    }
}
