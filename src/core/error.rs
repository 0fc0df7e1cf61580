//! Error handling for graphsvg
//!
//! This module provides the error types raised while turning diagram source
//! into SVG, and the user-friendly reporting used by the CLI. It follows two
//! principles:
//! 1. **Strongly-typed errors** so callers (and tests) can react to a
//!    specific failure without matching on message text
//! 2. **User-friendly messages** with an actionable suggestion for operators
//!
//! # Architecture
//!
//! - [`GraphError`] - Enumerated error types for every failure in the render path
//! - [`ErrorKind`] - Coarse classification of a [`GraphError`]
//! - [`ErrorContext`] - Wrapper that adds a suggestion and details for display
//!
//! Library operations return [`anyhow::Result`]. Typed failures are raised as
//! [`GraphError`] and travel inside the [`anyhow::Error`]; use
//! [`GraphError::find`] to recover them from a chain that has picked up
//! context on the way out.
//!
//! # Propagation Policy
//!
//! Nothing here is retried automatically. Validation errors
//! ([`GraphError::InvalidRenderer`], [`GraphError::InvalidFormat`],
//! [`GraphError::InvalidOption`]) are raised before any process is spawned.
//! A [`GraphError::MissingDependency`] names the tool to install. A failed or
//! empty render never reaches the cache.
//!
//! # Examples
//!
//! ```rust,no_run
//! use graphsvg::core::{ErrorKind, GraphError, user_friendly_error};
//!
//! let err = anyhow::Error::from(GraphError::MissingDependency {
//!     tool: "dot".to_string(),
//!     renderer: "dot".to_string(),
//! });
//! assert_eq!(GraphError::find(&err).map(GraphError::kind), Some(ErrorKind::MissingDependency));
//!
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The main error type for graphsvg operations.
///
/// # Error Categories
///
/// ## Validation (raised before any process is spawned)
/// - [`InvalidRenderer`] - Renderer name outside the closed renderer set
/// - [`InvalidFormat`] - Unknown output format
/// - [`InvalidOption`] - Option value that cannot be coerced to its declared type
///
/// ## Toolchain
/// - [`MissingDependency`] - Resolved executable not found on the search path
/// - [`ConversionFailed`] - Renderer failed or produced no usable intermediate
/// - [`EmptyRender`] - Renderer exited successfully but wrote nothing
/// - [`Timeout`] - Renderer exceeded the configured time bound
///
/// ## Environment
/// - [`ConfigError`] - Invalid configuration file content
/// - [`IoError`] / [`TomlError`] - Conversions from library errors
///
/// [`InvalidRenderer`]: GraphError::InvalidRenderer
/// [`InvalidFormat`]: GraphError::InvalidFormat
/// [`InvalidOption`]: GraphError::InvalidOption
/// [`MissingDependency`]: GraphError::MissingDependency
/// [`ConversionFailed`]: GraphError::ConversionFailed
/// [`EmptyRender`]: GraphError::EmptyRender
/// [`Timeout`]: GraphError::Timeout
/// [`ConfigError`]: GraphError::ConfigError
/// [`IoError`]: GraphError::IoError
/// [`TomlError`]: GraphError::TomlError
#[derive(Error, Debug)]
pub enum GraphError {
    /// Renderer name is not one of the supported renderers
    #[error("Invalid renderer: '{name}'")]
    InvalidRenderer {
        /// The name that was requested
        name: String,
    },

    /// Output format is not one of `img object embed iframe url uri href`
    #[error("Invalid output format: '{format}'")]
    InvalidFormat {
        /// The format value that was requested
        format: String,
    },

    /// Option value could not be interpreted
    #[error("Invalid value for option '{name}': {reason}")]
    InvalidOption {
        /// Option name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// An executable needed for the render could not be found
    ///
    /// For TeX-family renders `tool` is either the engine itself or the
    /// DVI/XDV-to-SVG converter.
    #[error("Missing dependency: '{tool}' is required to render '{renderer}' diagrams")]
    MissingDependency {
        /// The executable that could not be found
        tool: String,
        /// The renderer that needed it
        renderer: String,
    },

    /// The renderer ran but did not produce usable output
    #[error("Failed to render '{renderer}' diagram: {reason}")]
    ConversionFailed {
        /// Renderer that failed
        renderer: String,
        /// Description of the failure (exit status, missing intermediate, stderr)
        reason: String,
    },

    /// The renderer exited successfully with no output
    #[error("Renderer '{renderer}' produced no output")]
    EmptyRender {
        /// Renderer that produced nothing
        renderer: String,
    },

    /// An external process did not finish in time and was killed
    #[error("'{program}' did not finish within {limit:?}")]
    Timeout {
        /// Program that was killed
        program: String,
        /// The bound that was exceeded
        limit: Duration,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Coarse classification of a [`GraphError`].
///
/// A [`GraphError::Timeout`] is reported as [`ErrorKind::ConversionFailed`]:
/// a killed renderer is a failed conversion from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown renderer name
    InvalidRenderer,
    /// Unknown output format
    InvalidFormat,
    /// Unusable option value
    InvalidOption,
    /// Executable not found
    MissingDependency,
    /// Renderer failed, timed out, or left no intermediate file
    ConversionFailed,
    /// Renderer produced no output
    EmptyRender,
    /// Configuration, filesystem or anything else
    Environment,
}

impl GraphError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRenderer {
                ..
            } => ErrorKind::InvalidRenderer,
            Self::InvalidFormat {
                ..
            } => ErrorKind::InvalidFormat,
            Self::InvalidOption {
                ..
            } => ErrorKind::InvalidOption,
            Self::MissingDependency {
                ..
            } => ErrorKind::MissingDependency,
            Self::ConversionFailed {
                ..
            }
            | Self::Timeout {
                ..
            } => ErrorKind::ConversionFailed,
            Self::EmptyRender {
                ..
            } => ErrorKind::EmptyRender,
            Self::ConfigError {
                ..
            }
            | Self::IoError(_)
            | Self::TomlError(_)
            | Self::Other {
                ..
            } => ErrorKind::Environment,
        }
    }

    /// Find the first [`GraphError`] in an [`anyhow::Error`] chain.
    ///
    /// Errors pick up `anyhow` context on their way out of the pipeline, so
    /// the typed error is not always the outermost one.
    pub fn find(error: &anyhow::Error) -> Option<&Self> {
        error.chain().find_map(|cause| cause.downcast_ref::<Self>())
    }

    /// Shorthand for [`GraphError::InvalidOption`].
    pub fn invalid_option(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`GraphError::ConversionFailed`].
    pub fn conversion_failed(renderer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConversionFailed {
            renderer: renderer.into(),
            reason: reason.into(),
        }
    }
}

impl Clone for GraphError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidRenderer {
                name,
            } => Self::InvalidRenderer {
                name: name.clone(),
            },
            Self::InvalidFormat {
                format,
            } => Self::InvalidFormat {
                format: format.clone(),
            },
            Self::InvalidOption {
                name,
                reason,
            } => Self::InvalidOption {
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::MissingDependency {
                tool,
                renderer,
            } => Self::MissingDependency {
                tool: tool.clone(),
                renderer: renderer.clone(),
            },
            Self::ConversionFailed {
                renderer,
                reason,
            } => Self::ConversionFailed {
                renderer: renderer.clone(),
                reason: reason.clone(),
            },
            Self::EmptyRender {
                renderer,
            } => Self::EmptyRender {
                renderer: renderer.clone(),
            },
            Self::Timeout {
                program,
                limit,
            } => Self::Timeout {
                program: program.clone(),
                limit: *limit,
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error and toml::de::Error are not Clone
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that pairs a [`GraphError`] with operator guidance.
///
/// Suggestions are displayed in green and details in yellow by
/// [`ErrorContext::display`]; the [`fmt::Display`] impl produces the same
/// content without colors for logs.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: GraphError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: GraphError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// The error chain is searched for a [`GraphError`]; when one is found it gets
/// a tailored suggestion. Otherwise the full chain is folded into the message.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(graph_error) = GraphError::find(&error) {
        let mut ctx = create_error_context(graph_error.clone());
        // Keep outer context ("while rendering foo.dot") visible
        if ctx.details.is_none() && error.chain().count() > 1 {
            ctx.details = Some(error.to_string());
        }
        return ctx;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(GraphError::Other {
                message: error.to_string(),
            })
            .with_suggestion("Check permissions on the site, cache and destination directories");
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(GraphError::Other {
        message,
    })
}

fn install_hint(tool: &str) -> &'static str {
    match tool {
        "dot" | "neato" | "twopi" | "circo" | "fdp" | "sfdp" | "patchwork" => {
            "Install Graphviz (e.g. 'apt install graphviz' or 'brew install graphviz')"
        }
        "dvisvgm" => "Install dvisvgm, usually shipped with TeX Live ('tlmgr install dvisvgm')",
        "mscgen" => "Install mscgen (e.g. 'apt install mscgen')",
        "plantuml" => "Install PlantUML and make sure a 'plantuml' launcher is on PATH",
        "shaape" => "Install shaape ('pip install shaape')",
        _ => "Install a TeX distribution such as TeX Live or MiKTeX",
    }
}

fn create_error_context(error: GraphError) -> ErrorContext {
    match &error {
        GraphError::InvalidRenderer {
            ..
        } => ErrorContext::new(error.clone()).with_suggestion(
            "Use one of: dot neato twopi circo fdp sfdp patchwork tex latex pdftex pdflatex \
             xetex xelatex luatex lualatex mscgen plantuml shaape",
        ),
        GraphError::InvalidFormat {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Use one of: img object embed iframe url uri href, or omit the format for inline SVG"),
        GraphError::MissingDependency {
            tool,
            ..
        } => {
            let hint = install_hint(tool);
            ErrorContext::new(error.clone())
                .with_suggestion(hint)
                .with_details(
                    "Executables are looked up on PATH unless overridden in the [renderers] table of graphs.toml",
                )
        }
        GraphError::ConversionFailed {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Run the renderer manually on the diagram source to see its diagnostics (use --verbose for the command line)"),
        GraphError::EmptyRender {
            ..
        } => ErrorContext::new(error.clone())
            .with_details("Empty results are never cached, so the next build will try again"),
        GraphError::Timeout {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Simplify the diagram or raise timeout_secs in graphs.toml"),
        GraphError::ConfigError {
            ..
        }
        | GraphError::TomlError(_) => ErrorContext::new(error.clone())
            .with_suggestion("Check the syntax and keys of graphs.toml"),
        _ => ErrorContext::new(error),
    }
}
