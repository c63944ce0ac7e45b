//! The compiled schema graph.
//!
//! All schema nodes of a context live in one arena; cross-references are
//! arena indices, which breaks the cyclic ownership between parents,
//! children, and cross-module splices. A node's `module` is the namespace
//! it instantiates in; `origin_module`/`origin_doc` point at the document
//! whose text defined it, which is what prefixed names inside the node
//! resolve against (the two differ for nodes copied out of groupings).

use crate::ast::{self, QName, Status, YangVersion};
use crate::collections::{HashMap, IndexMap};
use crate::diagnostics::Diagnostic;
use crate::ident::Ident;
use crate::node::Node;
use crate::path::{PathStep, SchemaPath};
use crate::source::{FileId, SourceSpan};
use crate::types::Type;
use crate::xpath;
use bitflags::bitflags;
use generational_arena::Arena;
use triomphe::Arc;

pub(crate) mod augment;
pub(crate) mod builder;
pub(crate) mod deviation;
pub(crate) mod resolve;
pub(crate) mod uses;
pub(crate) mod validate;

/// Index of a module within its context.
pub type ModuleId = usize;

/// Handle to a schema node in the context's arena.
pub type NodeId = generational_arena::Index;

/// A module-qualified name: an identity, feature, or extension reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolRef {
    pub module: ModuleId,
    pub name: Ident,
}

pub type IdentityRef = SymbolRef;

bitflags! {
    /// Boolean attributes of a schema node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u16 {
        /// Effective `config false`; unset means config true (rw).
        const CONFIG_FALSE = 1 << 0;
        /// The config flag came from an explicit statement, not inheritance.
        const CONFIG_EXPLICIT = 1 << 1;
        const MANDATORY = 1 << 2;
        /// Leaf is a list key.
        const KEY = 1 << 3;
        /// Synthesized node: implicit case, or implicit rpc input/output.
        const IMPLICIT = 1 << 4;
        /// `ordered-by user`.
        const USER_ORDERED = 1 << 5;
        /// The status came from an explicit statement.
        const STATUS_EXPLICIT = 1 << 6;
        /// A deviation touched this node.
        const DEVIATED = 1 << 7;
    }
}

/// A `when` condition: source text plus its checked AST.
#[derive(Debug, Clone)]
pub struct WhenCond {
    pub source: String,
    pub ast: Option<xpath::Expr>,
    pub span: Option<SourceSpan>,
}

/// A `must` constraint.
#[derive(Debug, Clone)]
pub struct Must {
    pub source: String,
    pub ast: Option<xpath::Expr>,
    pub error_message: Option<String>,
    pub error_app_tag: Option<String>,
    pub span: Option<SourceSpan>,
}

/// An if-feature expression with feature references bound to modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfFeatureExpr {
    Ref(SymbolRef),
    Not(Box<IfFeatureExpr>),
    And(Box<IfFeatureExpr>, Box<IfFeatureExpr>),
    Or(Box<IfFeatureExpr>, Box<IfFeatureExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfFeature {
    pub source: String,
    pub expr: IfFeatureExpr,
}

/// A typedef in scope, remembering which document defined it.
#[derive(Debug, Clone)]
pub struct ScopedTypedef {
    pub stmt: Node<ast::TypedefStmt>,
    pub module: ModuleId,
    pub doc: usize,
}

/// An extension instance bound (or pending binding) to its definition.
#[derive(Debug, Clone)]
pub struct ExtensionInstance {
    /// Namespace URI and local name of the instance element.
    pub namespace: String,
    pub keyword: String,
    /// The defining module's extension, once bound.
    pub def: Option<SymbolRef>,
    /// Argument value, extracted per the definition's `argument` statement.
    pub argument: Option<String>,
    pub parent_keyword: &'static str,
    pub index: usize,
    /// The YIN subtree, kept verbatim. Nested unknown-namespace elements
    /// are extension instances of their own and stay inside this tree.
    pub yin: yin_parser::Element,
    pub span: Option<SourceSpan>,
}

/// The type of a leaf or leaf-list, before and after resolution.
#[derive(Debug, Clone)]
pub enum TypeSlot {
    Unresolved(Node<ast::TypeStmt>),
    Resolved(Arc<Type>),
}

impl TypeSlot {
    pub fn resolved(&self) -> Option<&Arc<Type>> {
        match self {
            TypeSlot::Resolved(ty) => Some(ty),
            TypeSlot::Unresolved(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContainerNode {
    pub presence: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LeafNode {
    pub ty: TypeSlot,
    pub default: Option<String>,
    pub units: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LeafListNode {
    pub ty: TypeSlot,
    pub defaults: Vec<String>,
    pub units: Option<String>,
    pub min_elements: u32,
    /// `None` means unbounded.
    pub max_elements: Option<u32>,
}

/// One `unique` constraint of a list.
#[derive(Debug, Clone)]
pub struct Unique {
    pub source: String,
    pub parts: Vec<SchemaPath>,
    pub resolved: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ListNode {
    /// Key names as declared, bound to modules but not yet to leafs.
    pub key_names: Vec<PathStep>,
    /// Key leafs in declaration order, filled by the resolver.
    pub keys: Vec<NodeId>,
    pub uniques: Vec<Unique>,
    pub min_elements: u32,
    pub max_elements: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChoiceNode {
    pub default_name: Option<Ident>,
    pub default_case: Option<NodeId>,
}

/// A `uses` node awaiting expansion; replaced by the grouping's children.
#[derive(Debug, Clone)]
pub struct UsesNode {
    pub grouping: QName,
    /// Groupings whose expansion produced this node, outermost first.
    /// Expanding any of them again underneath is a cycle.
    pub origin_chain: Vec<SymbolRef>,
    pub refines: Vec<Node<ast::RefineStmt>>,
    pub augments: Vec<Node<ast::AugmentStmt>>,
}

/// A module-level or uses-level augment. The node's children are spliced
/// into the target; the node itself is retained for diagnostics.
#[derive(Debug, Clone)]
pub struct AugmentNode {
    pub target_str: String,
    /// Absolute for module-level augments; relative (anchored at the uses
    /// site's parent) for uses-augments.
    pub target: SchemaPath,
    /// Anchor node for relative targets.
    pub anchor: Option<NodeId>,
    pub resolved: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Container(ContainerNode),
    Leaf(LeafNode),
    LeafList(LeafListNode),
    List(ListNode),
    Choice(ChoiceNode),
    Case,
    AnyData,
    AnyXml,
    Uses(UsesNode),
    Grouping,
    Rpc,
    Action,
    Input,
    Output,
    Notification,
    Augment(AugmentNode),
}

impl NodeKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            NodeKind::Container(_) => "container",
            NodeKind::Leaf(_) => "leaf",
            NodeKind::LeafList(_) => "leaf-list",
            NodeKind::List(_) => "list",
            NodeKind::Choice(_) => "choice",
            NodeKind::Case => "case",
            NodeKind::AnyData => "anydata",
            NodeKind::AnyXml => "anyxml",
            NodeKind::Uses(_) => "uses",
            NodeKind::Grouping => "grouping",
            NodeKind::Rpc => "rpc",
            NodeKind::Action => "action",
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::Notification => "notification",
            NodeKind::Augment(_) => "augment",
        }
    }
}

/// One node of the compiled schema graph.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub name: Ident,
    /// The namespace the node instantiates in.
    pub module: ModuleId,
    /// The document whose text defined the node (differs from `module`
    /// for grouping expansions and augment splices).
    pub origin_module: ModuleId,
    pub origin_doc: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    pub flags: NodeFlags,
    pub status: Status,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<WhenCond>,
    pub musts: Vec<Must>,
    pub if_features: Vec<IfFeature>,
    pub typedefs: IndexMap<Ident, ScopedTypedef>,
    pub groupings: IndexMap<Ident, NodeId>,
    pub extensions: Vec<ExtensionInstance>,
    pub span: Option<SourceSpan>,
}

impl SchemaNode {
    /// Effective config: `true` is rw, `false` is ro.
    pub fn config(&self) -> bool {
        !self.flags.contains(NodeFlags::CONFIG_FALSE)
    }

    pub fn mandatory(&self) -> bool {
        self.flags.contains(NodeFlags::MANDATORY)
    }

    pub fn is_key(&self) -> bool {
        self.flags.contains(NodeFlags::KEY)
    }

    /// Whether the node is a data-tree node (not a template or bookkeeping
    /// node).
    pub fn is_data(&self) -> bool {
        !matches!(
            self.kind,
            NodeKind::Uses(_) | NodeKind::Grouping | NodeKind::Augment(_)
        )
    }

    pub fn leaf(&self) -> Option<&LeafNode> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn type_slot(&self) -> Option<&TypeSlot> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(&leaf.ty),
            NodeKind::LeafList(leaf_list) => Some(&leaf_list.ty),
            _ => None,
        }
    }
}

/// The arena of schema nodes owned by a context.
#[derive(Debug, Default)]
pub struct SchemaGraph {
    nodes: Arena<SchemaNode>,
}

impl SchemaGraph {
    pub(crate) fn alloc(&mut self, node: SchemaNode) -> NodeId {
        self.nodes.insert(node)
    }

    pub(crate) fn remove(&mut self, id: NodeId) {
        self.nodes.remove(id);
    }

    /// Panics on a stale id; ids never escape the owning context.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id]
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node and every descendant, preorder.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let node = self.node(id);
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Parent chain from the node up to a top-level node.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            out.push(parent);
            current = self.node(parent).parent;
        }
        out
    }

    /// Finds a data child by name, restricted to a module when given.
    pub fn find_child(
        &self,
        children: &[NodeId],
        module: Option<ModuleId>,
        name: &str,
    ) -> Option<NodeId> {
        children.iter().copied().find(|&child| {
            let node = self.node(child);
            node.name == *name && module.map(|m| node.module == m).unwrap_or(true)
        })
    }

    /// Data-node path for diagnostics, e.g. `/mod:interfaces/interface`.
    pub fn path_string(&self, id: NodeId, modules: &[Module]) -> String {
        let mut ids = self.ancestors(id);
        ids.reverse();
        ids.push(id);
        let mut out = String::new();
        let mut prev_module = None;
        for id in ids {
            let node = self.node(id);
            out.push('/');
            if prev_module != Some(node.module) {
                out.push_str(&modules[node.module].name);
                out.push(':');
            }
            out.push_str(&node.name);
            prev_module = Some(node.module);
        }
        out
    }
}

/// Prefix bindings of one source document.
#[derive(Debug, Clone, Default)]
pub(crate) struct PrefixMap {
    map: HashMap<Ident, ModuleId>,
}

impl PrefixMap {
    pub(crate) fn bind(&mut self, prefix: Ident, module: ModuleId) {
        self.map.insert(prefix, module);
    }

    pub(crate) fn resolve(&self, prefix: &str) -> Option<ModuleId> {
        self.map.get(prefix).copied()
    }
}

#[derive(Debug, Clone)]
pub struct Import {
    pub module: ModuleId,
    pub prefix: Ident,
    pub revision: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Include {
    pub name: Ident,
    pub revision: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Identity {
    pub name: Ident,
    pub module: ModuleId,
    pub bases: Vec<SymbolRef>,
    /// Identities directly based on this one, filled by the resolver.
    pub derived: Vec<SymbolRef>,
    pub if_features: Vec<IfFeature>,
    pub status: Status,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone)]
pub struct Feature {
    pub name: Ident,
    pub if_features: Vec<IfFeature>,
    pub enabled: bool,
    pub status: Status,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone)]
pub struct ExtensionDef {
    pub name: Ident,
    /// Argument name and whether instances carry it as a subelement.
    pub argument: Option<(Ident, bool)>,
    pub status: Status,
    pub description: Option<String>,
}

/// A deviation declared by this module against some target node.
#[derive(Debug, Clone)]
pub struct Deviation {
    pub target_str: String,
    pub target: SchemaPath,
    pub deviates: Vec<Node<ast::DeviateStmt>>,
    pub span: Option<SourceSpan>,
    /// The deviated node, once resolved.
    pub resolved: Option<NodeId>,
    /// Detached copy of the target subtree taken before the first deviate
    /// was applied, for diagnostics and replay.
    pub original: Option<NodeId>,
}

/// A compiled module (or the compiled face of a submodule's owner).
#[derive(Debug)]
pub struct Module {
    pub name: Ident,
    pub namespace: String,
    pub prefix: Ident,
    pub version: YangVersion,
    /// The selected (newest) revision date.
    pub revision: Option<String>,
    /// All revision dates, in document order.
    pub revisions: Vec<String>,
    pub organization: Option<String>,
    pub contact: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub imports: Vec<Import>,
    pub includes: Vec<Include>,
    pub implemented: bool,
    pub deviated: bool,
    /// Top-level data nodes, rpcs, and notifications.
    pub children: Vec<NodeId>,
    pub identities: IndexMap<Ident, Identity>,
    pub features: IndexMap<Ident, Feature>,
    pub typedefs: IndexMap<Ident, ScopedTypedef>,
    pub extensions: IndexMap<Ident, ExtensionDef>,
    pub groupings: IndexMap<Ident, NodeId>,
    /// Augment bookkeeping nodes, retained after splicing.
    pub augments: Vec<NodeId>,
    pub deviations: Vec<Deviation>,
    pub extension_instances: Vec<ExtensionInstance>,
    /// Prefix scopes: index 0 is the module document, the rest are its
    /// submodules in include order.
    pub(crate) prefix_maps: Vec<PrefixMap>,
    pub file: FileId,
    /// Warnings recorded while loading this module.
    pub warnings: Vec<Diagnostic>,
}

impl Module {
    /// Resolves a prefix within one of this module's documents.
    pub(crate) fn resolve_prefix(&self, doc: usize, prefix: &str) -> Option<ModuleId> {
        self.prefix_maps.get(doc)?.resolve(prefix)
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn identity(&self, name: &str) -> Option<&Identity> {
        self.identities.get(name)
    }

    pub fn typedef(&self, name: &str) -> Option<&ScopedTypedef> {
        self.typedefs.get(name)
    }
}
