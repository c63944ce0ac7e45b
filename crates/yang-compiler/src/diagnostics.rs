//! Structured diagnostics for schema compilation.
//!
//! Every failure is a [`DiagnosticData`] variant carrying the facts of the
//! error, wrapped in a [`Diagnostic`] with severity and source location.
//! A failed load publishes its records in LIFO order, deepest first.

use crate::source::{SourceMap, SourceSpan};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// Structured data about a diagnostic.
#[derive(Debug, Error, Clone, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiagnosticData {
    // Input errors
    #[error("malformed XML: {message}")]
    MalformedXml { message: String, offset: usize },
    #[error("unknown statement `{keyword}` in `{parent}`")]
    UnknownStatement { keyword: String, parent: String },
    #[error("statement `{keyword}` is not allowed at this point, module statement order is header, linkage, meta, revision, body")]
    OutOfOrderStatement { keyword: String },
    #[error("missing required statement `{keyword}` in `{parent}`")]
    MissingRequired {
        keyword: &'static str,
        parent: String,
    },
    #[error("duplicate `{what}`{}", fmt_name(.name))]
    Duplicate { what: String, name: Option<String> },
    #[error("invalid argument of `{keyword}`: {message}")]
    InvalidArgument { keyword: String, message: String },
    #[error("`{value}` is not a valid YANG identifier")]
    InvalidIdentifier { value: String },
    #[error("`{value}` is not a valid revision date (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    // Reference errors
    #[error("cannot find {kind} `{name}`")]
    UnresolvedReference { kind: &'static str, name: String },
    #[error("dependency cycle, cannot make progress resolving {item}")]
    UnresolvedCycle { item: String },
    #[error("leafref path `{path}` is invalid: {message}")]
    BadLeafrefPath { path: String, message: String },
    #[error("identity `{identity}` has an invalid base `{base}`: {message}")]
    BadIdentityBase {
        identity: String,
        base: String,
        message: String,
    },
    #[error("cannot satisfy import of module `{module}`: {message}")]
    BadImport { module: String, message: String },

    // Semantic errors
    #[error("restriction of type `{type_name}` is not narrowing: {message}")]
    TypeRestrictionNotNarrowing { type_name: String, message: String },
    #[error("default value `{value}` is invalid: {message}")]
    DefaultValueInvalid { value: String, message: String },
    #[error("key `{key}` of list `{list}` does not refer to a child leaf")]
    KeyNotLeaf { list: String, key: String },
    #[error("key `{key}` of list `{list}` cannot be {action}")]
    KeyInList {
        list: String,
        key: String,
        action: &'static str,
    },
    #[error("mandatory node `{node}` is not allowed under the default case `{case}`")]
    MandatoryUnderDefaultCase { node: String, case: String },
    #[error("status of `{name}` widens the status of `{other}` ({message})")]
    WidenedStatus {
        name: String,
        other: String,
        message: String,
    },
    #[error("configuration node `{node}` is not allowed under the state-data node `{parent}`")]
    ConfigWUnderR { node: String, parent: String },
    #[error("deviation of `{target}` is invalid: {message}")]
    BadDeviation { target: String, message: String },
    #[error("grouping `{grouping}` is expanded within its own definition")]
    GroupingCycle { grouping: String },
}

fn fmt_name(name: &Option<String>) -> String {
    match name {
        Some(name) => format!(" `{name}`"),
        None => String::new(),
    }
}

/// One reported error or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Option<SourceSpan>,
    /// Schema-path breadcrumb of the statement being compiled, when known.
    pub path: Option<String>,
    pub data: DiagnosticData,
}

impl Diagnostic {
    pub fn error(data: DiagnosticData) -> Self {
        Self {
            severity: Severity::Error,
            span: None,
            path: None,
            data,
        }
    }

    pub fn warning(data: DiagnosticData) -> Self {
        Self {
            severity: Severity::Warning,
            span: None,
            path: None,
            data,
        }
    }

    pub fn with_span(mut self, span: impl Into<Option<SourceSpan>>) -> Self {
        self.span = span.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.data)?,
            Severity::Warning => write!(f, "warning: {}", self.data)?,
        }
        if let Some(path) = &self.path {
            write!(f, " (at {path})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// The diagnostics published by a failed (or noisy) load.
///
/// Errors appear in LIFO order: the deepest failure first, enclosing
/// context after it. Warnings keep their encounter order at the end.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub(crate) sources: SourceMap,
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub(crate) fn new(sources: SourceMap) -> Self {
        Self {
            sources,
            records: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    pub(crate) fn push_lifo(&mut self, diagnostic: Diagnostic) {
        self.records.insert(0, diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    /// The first (deepest) error record.
    pub fn first(&self) -> Option<&Diagnostic> {
        self.records.first()
    }

    /// Source documents for rendering, shared with the owning context.
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{record}")?;
            if let Some(span) = record.span {
                if let Some(file) = self.sources.get(&span.file) {
                    write!(f, " [{}:{}]", file.name(), span.start)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}
