//! Smart pointer attaching source spans to parsed values.

use crate::source::SourceSpan;
use std::fmt;
use std::hash;
use triomphe::Arc;

/// Smart pointer to a parsed statement or value.
///
/// Thread-safe and reference-counted, carrying an optional [`SourceSpan`]
/// so diagnostics can point into the input document. The span is excluded
/// from equality and hashing: two nodes with the same content compare equal
/// wherever they were parsed.
#[derive(Hash, Eq, PartialEq)]
pub struct Node<T>(Arc<NodeInner<T>>);

#[derive(Clone)]
struct NodeInner<T> {
    span: Option<SourceSpan>,
    node: T,
}

impl<T> Node<T> {
    /// Creates a node for something parsed from the given source span.
    pub fn new_parsed(node: T, span: SourceSpan) -> Self {
        Self(Arc::new(NodeInner {
            span: Some(span),
            node,
        }))
    }

    /// Creates a node for something created programmatically.
    pub fn new_synthetic(node: T) -> Self {
        Self(Arc::new(NodeInner { span: None, node }))
    }

    pub fn span(&self) -> Option<SourceSpan> {
        self.0.span
    }

    /// Returns the given value wrapped at the same span as `self`.
    pub fn same_span<U>(&self, node: U) -> Node<U> {
        Node(Arc::new(NodeInner {
            span: self.0.span,
            node,
        }))
    }

    /// Returns whether two nodes point to the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns a mutable reference to `T`, cloning it if necessary.
    pub fn make_mut(&mut self) -> &mut T
    where
        T: Clone,
    {
        &mut Arc::make_mut(&mut self.0).node
    }

    /// Returns a mutable reference to `T` if this node is uniquely owned.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        Arc::get_mut(&mut self.0).map(|inner| &mut inner.node)
    }
}

impl<T> std::ops::Deref for Node<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0.node
    }
}

impl<T> AsRef<T> for Node<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = self.span() {
            write!(f, "@{:?} ", span)?;
        }
        self.0.node.fmt(f)
    }
}

impl<T: Eq> Eq for NodeInner<T> {}

impl<T: PartialEq> PartialEq for NodeInner<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node // span not included
    }
}

impl<T: hash::Hash> hash::Hash for NodeInner<T> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.node.hash(state) // span not included
    }
}
