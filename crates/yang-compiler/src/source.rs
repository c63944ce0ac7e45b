//! Source files and spans backing diagnostics.

use crate::collections::IndexMap;
use std::fmt;
use std::sync::OnceLock;
use triomphe::Arc;

/// Integer identifier for a source document registered in a context.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn to_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// A byte range within one source document.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(file: FileId, span: yin_parser::Span) -> Self {
        Self {
            file,
            start: span.start,
            end: span.end,
        }
    }
}

impl fmt::Debug for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}..{}", self.file, self.start, self.end)
    }
}

/// One registered source document.
pub struct SourceFile {
    name: String,
    text: String,
    ariadne: OnceLock<ariadne::Source<String>>,
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("len", &self.text.len())
            .finish()
    }
}

impl SourceFile {
    pub(crate) fn new(name: String, text: String) -> Self {
        Self {
            name,
            text,
            ariadne: OnceLock::new(),
        }
    }

    /// The display name given to the parse entry point.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn ariadne(&self) -> &ariadne::Source<String> {
        self.ariadne
            .get_or_init(|| ariadne::Source::from(self.text.clone()))
    }

    /// Maps a byte offset to a char offset, as ariadne expects.
    pub(crate) fn char_index(&self, byte: usize) -> usize {
        let byte = byte.min(self.text.len());
        self.text[..byte].chars().count()
    }
}

/// All source documents contributing to a context, keyed by [`FileId`].
pub type SourceMap = IndexMap<FileId, Arc<SourceFile>>;
