//! Pretty-printable reports for diagnostics that reference YIN documents.

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::source::{FileId, SourceFile, SourceMap};
use ariadne::{Config, Label, Report, ReportKind};
use std::fmt;
use std::ops::Range;
use triomphe::Arc;

type MappedSpan = (FileId, Range<usize>);

/// Translate a byte-offset span into char offsets for use with ariadne.
fn map_span(sources: &SourceMap, diagnostic: &Diagnostic) -> Option<MappedSpan> {
    let span = diagnostic.span?;
    let source = sources.get(&span.file)?;
    Some((
        span.file,
        source.char_index(span.start)..source.char_index(span.end),
    ))
}

/// Renders one diagnostic with a labeled excerpt of the source document.
pub fn format_diagnostic(sources: &SourceMap, diagnostic: &Diagnostic) -> String {
    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let (file, range) = map_span(sources, diagnostic).unwrap_or((FileId::new(0), 0..0));
    let mut builder = Report::build(kind, file, range.start)
        .with_config(Config::default().with_color(false))
        .with_message(diagnostic.data.to_string());
    if range.start != range.end {
        builder = builder.with_label(Label::new((file, range)));
    }
    if let Some(path) = &diagnostic.path {
        builder = builder.with_note(format!("while compiling {path}"));
    }
    let report = builder.finish();
    let mut out = Vec::new();
    if report.write(Cache(sources), &mut out).is_err() {
        return diagnostic.to_string();
    }
    String::from_utf8(out).unwrap_or_else(|_| diagnostic.to_string())
}

impl Diagnostics {
    /// Renders every record with source excerpts.
    pub fn to_pretty(&self) -> String {
        let mut out = String::new();
        for record in self.iter() {
            out.push_str(&format_diagnostic(self.sources(), record));
            out.push('\n');
        }
        out
    }
}

struct Cache<'a>(&'a SourceMap);

impl ariadne::Cache<FileId> for Cache<'_> {
    type Storage = String;

    fn fetch(
        &mut self,
        file_id: &FileId,
    ) -> Result<&ariadne::Source<String>, Box<dyn fmt::Debug + '_>> {
        struct NotFound(FileId);
        impl fmt::Debug for NotFound {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "source file not found: {:?}", self.0)
            }
        }
        match self.0.get(file_id) {
            Some(source_file) => Ok(source_file.ariadne()),
            None => Err(Box::new(NotFound(*file_id))),
        }
    }

    fn display<'a>(&self, file_id: &'a FileId) -> Option<Box<dyn fmt::Display + 'a>> {
        struct Name(Arc<SourceFile>);
        impl fmt::Display for Name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.0.name())
            }
        }
        let source_file = self.0.get(file_id)?;
        Some(Box::new(Name(source_file.clone())))
    }
}
