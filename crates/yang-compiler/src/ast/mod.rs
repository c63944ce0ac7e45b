//! Typed YANG statement structures read from YIN elements.
//!
//! These structs faithfully represent the statements of a `module` or
//! `submodule` document after cardinality, ordering, and argument-syntax
//! checks, but before any reference resolution: names that point at other
//! statements (`type`, `uses`, `base`, augment targets, …) are kept as
//! [`QName`]s or raw path strings and bound later by the resolver.

use crate::ident::Ident;
use crate::node::Node;
use std::fmt;

mod from_yin;

pub use self::from_yin::StatementReader;

/// A possibly prefixed reference to a named statement.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct QName {
    pub prefix: Option<Ident>,
    pub name: Ident,
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default)]
pub enum YangVersion {
    #[default]
    V1,
    V1_1,
}

impl fmt::Display for YangVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YangVersion::V1 => f.write_str("1"),
            YangVersion::V1_1 => f.write_str("1.1"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
pub enum Status {
    #[default]
    Current,
    Deprecated,
    Obsolete,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Current => f.write_str("current"),
            Status::Deprecated => f.write_str("deprecated"),
            Status::Obsolete => f.write_str("obsolete"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OrderedBy {
    System,
    User,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MaxElements {
    Unbounded,
    Count(u32),
}

/// An `if-feature` expression: `not`, `and`, `or` over feature names,
/// with the standard precedence `not` > `and` > `or`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FeatureExpr {
    Ref(QName),
    Not(Box<FeatureExpr>),
    And(Box<FeatureExpr>, Box<FeatureExpr>),
    Or(Box<FeatureExpr>, Box<FeatureExpr>),
}

impl FeatureExpr {
    /// Collects every feature reference in the expression.
    pub fn references<'a>(&'a self, out: &mut Vec<&'a QName>) {
        match self {
            FeatureExpr::Ref(name) => out.push(name),
            FeatureExpr::Not(inner) => inner.references(out),
            FeatureExpr::And(a, b) | FeatureExpr::Or(a, b) => {
                a.references(out);
                b.references(out);
            }
        }
    }
}

/// One `if-feature` statement: the raw argument plus its parsed expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IfFeatureStmt {
    pub source: String,
    pub expr: FeatureExpr,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WhenStmt {
    pub condition: String,
    pub description: Option<String>,
    pub reference: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MustStmt {
    pub condition: String,
    pub error_message: Option<String>,
    pub error_app_tag: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
}

/// An extension instance: an unknown-namespace element captured verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionInstanceStmt {
    /// Namespace URI of the instance element.
    pub namespace: String,
    /// Local name, matched against an `extension` definition.
    pub keyword: String,
    /// The argument, whether it came as an attribute or a subelement.
    pub argument: Option<String>,
    /// YANG keyword of the statement the instance appeared in.
    pub parent_keyword: &'static str,
    /// Position among the parent's extension instances.
    pub index: usize,
    /// The instance's YIN subtree, retained verbatim.
    pub yin: yin_parser::Element,
}

pub type ExtensionInstances = Vec<Node<ExtensionInstanceStmt>>;

/// A parsed `module` or `submodule` document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleStmt {
    pub name: Ident,
    pub is_submodule: bool,
    pub yang_version: YangVersion,
    /// `module` only.
    pub namespace: Option<String>,
    /// `module` only.
    pub prefix: Option<Ident>,
    /// `submodule` only.
    pub belongs_to: Option<Node<BelongsToStmt>>,
    pub imports: Vec<Node<ImportStmt>>,
    pub includes: Vec<Node<IncludeStmt>>,
    pub organization: Option<String>,
    pub contact: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub revisions: Vec<Node<RevisionStmt>>,
    pub body: Vec<BodyStmt>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BelongsToStmt {
    pub module: Ident,
    pub prefix: Ident,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportStmt {
    pub module: Ident,
    pub prefix: Ident,
    pub revision: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncludeStmt {
    pub module: Ident,
    pub revision: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionStmt {
    pub date: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub extensions: ExtensionInstances,
}

/// A body-section statement, in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyStmt {
    Typedef(Node<TypedefStmt>),
    Grouping(Node<GroupingStmt>),
    Data(DataStmt),
    Augment(Node<AugmentStmt>),
    Rpc(Node<RpcStmt>),
    Notification(Node<NotificationStmt>),
    Deviation(Node<DeviationStmt>),
    Extension(Node<ExtensionStmt>),
    Feature(Node<FeatureStmt>),
    Identity(Node<IdentityStmt>),
}

/// A data-definition statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataStmt {
    Container(Node<ContainerStmt>),
    Leaf(Node<LeafStmt>),
    LeafList(Node<LeafListStmt>),
    List(Node<ListStmt>),
    Choice(Node<ChoiceStmt>),
    Case(Node<CaseStmt>),
    AnyData(Node<AnyDataStmt>),
    AnyXml(Node<AnyDataStmt>),
    Uses(Node<UsesStmt>),
}

impl DataStmt {
    pub fn keyword(&self) -> &'static str {
        match self {
            DataStmt::Container(_) => "container",
            DataStmt::Leaf(_) => "leaf",
            DataStmt::LeafList(_) => "leaf-list",
            DataStmt::List(_) => "list",
            DataStmt::Choice(_) => "choice",
            DataStmt::Case(_) => "case",
            DataStmt::AnyData(_) => "anydata",
            DataStmt::AnyXml(_) => "anyxml",
            DataStmt::Uses(_) => "uses",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerStmt {
    pub name: Ident,
    pub presence: Option<String>,
    pub config: Option<bool>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<Node<WhenStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub musts: Vec<Node<MustStmt>>,
    pub typedefs: Vec<Node<TypedefStmt>>,
    pub groupings: Vec<Node<GroupingStmt>>,
    pub children: Vec<DataStmt>,
    pub actions: Vec<Node<RpcStmt>>,
    pub notifications: Vec<Node<NotificationStmt>>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafStmt {
    pub name: Ident,
    pub ty: Node<TypeStmt>,
    pub units: Option<String>,
    pub default: Option<String>,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<Node<WhenStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub musts: Vec<Node<MustStmt>>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafListStmt {
    pub name: Ident,
    pub ty: Node<TypeStmt>,
    pub units: Option<String>,
    /// YANG 1.1 only.
    pub defaults: Vec<String>,
    pub config: Option<bool>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<MaxElements>,
    pub ordered_by: Option<OrderedBy>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<Node<WhenStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub musts: Vec<Node<MustStmt>>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListStmt {
    pub name: Ident,
    pub key: Option<Node<KeyStmt>>,
    pub uniques: Vec<Node<UniqueStmt>>,
    pub config: Option<bool>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<MaxElements>,
    pub ordered_by: Option<OrderedBy>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<Node<WhenStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub musts: Vec<Node<MustStmt>>,
    pub typedefs: Vec<Node<TypedefStmt>>,
    pub groupings: Vec<Node<GroupingStmt>>,
    pub children: Vec<DataStmt>,
    pub actions: Vec<Node<RpcStmt>>,
    pub notifications: Vec<Node<NotificationStmt>>,
    pub extensions: ExtensionInstances,
}

/// The `key` statement: space-separated names of child leafs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyStmt {
    pub names: Vec<QName>,
}

/// One `unique` statement: a set of descendant leaf paths forming one
/// uniqueness constraint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UniqueStmt {
    pub paths: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceStmt {
    pub name: Ident,
    pub default: Option<Ident>,
    pub mandatory: Option<bool>,
    pub config: Option<bool>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<Node<WhenStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    /// Cases, or shorthand data nodes that get an implicit case.
    pub children: Vec<DataStmt>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseStmt {
    pub name: Ident,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<Node<WhenStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub children: Vec<DataStmt>,
    pub extensions: ExtensionInstances,
}

/// `anydata` (YANG 1.1) or `anyxml`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnyDataStmt {
    pub name: Ident,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<Node<WhenStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub musts: Vec<Node<MustStmt>>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsesStmt {
    pub grouping: QName,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<Node<WhenStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub refines: Vec<Node<RefineStmt>>,
    pub augments: Vec<Node<AugmentStmt>>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefineStmt {
    /// Descendant schema path into the expanded grouping.
    pub target: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub presence: Option<String>,
    pub defaults: Vec<String>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<MaxElements>,
    pub musts: Vec<Node<MustStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AugmentStmt {
    /// Absolute schema path for module-level augments, descendant path for
    /// uses-augments.
    pub target: String,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub when: Option<Node<WhenStmt>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub children: Vec<DataStmt>,
    pub actions: Vec<Node<RpcStmt>>,
    pub notifications: Vec<Node<NotificationStmt>>,
    pub extensions: ExtensionInstances,
}

/// An `rpc` or, inside a data node, an `action` (YANG 1.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcStmt {
    pub name: Ident,
    pub is_action: bool,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub typedefs: Vec<Node<TypedefStmt>>,
    pub groupings: Vec<Node<GroupingStmt>>,
    pub input: Option<Node<IoStmt>>,
    pub output: Option<Node<IoStmt>>,
    pub extensions: ExtensionInstances,
}

/// The `input` or `output` of an rpc or action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IoStmt {
    pub output: bool,
    pub musts: Vec<Node<MustStmt>>,
    pub typedefs: Vec<Node<TypedefStmt>>,
    pub groupings: Vec<Node<GroupingStmt>>,
    pub children: Vec<DataStmt>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationStmt {
    pub name: Ident,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub musts: Vec<Node<MustStmt>>,
    pub typedefs: Vec<Node<TypedefStmt>>,
    pub groupings: Vec<Node<GroupingStmt>>,
    pub children: Vec<DataStmt>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedefStmt {
    pub name: Ident,
    pub ty: Node<TypeStmt>,
    pub units: Option<String>,
    pub default: Option<String>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupingStmt {
    pub name: Ident,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub typedefs: Vec<Node<TypedefStmt>>,
    pub groupings: Vec<Node<GroupingStmt>>,
    pub children: Vec<DataStmt>,
    pub actions: Vec<Node<RpcStmt>>,
    pub notifications: Vec<Node<NotificationStmt>>,
    pub extensions: ExtensionInstances,
}

/// A `type` statement with its restriction substatements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeStmt {
    pub name: QName,
    pub fraction_digits: Option<u8>,
    pub range: Option<Node<RangeStmt>>,
    pub length: Option<Node<RangeStmt>>,
    pub patterns: Vec<Node<PatternStmt>>,
    pub enums: Vec<Node<EnumStmt>>,
    pub bits: Vec<Node<BitStmt>>,
    pub path: Option<Node<String>>,
    pub require_instance: Option<bool>,
    pub bases: Vec<Node<QName>>,
    pub union_types: Vec<Node<TypeStmt>>,
    pub extensions: ExtensionInstances,
}

/// A `range` or `length` restriction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RangeStmt {
    pub expr: String,
    pub error_message: Option<String>,
    pub error_app_tag: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatternStmt {
    pub value: String,
    /// `modifier invert-match` (YANG 1.1).
    pub invert_match: bool,
    pub error_message: Option<String>,
    pub error_app_tag: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumStmt {
    pub name: String,
    pub value: Option<i32>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    /// YANG 1.1 only.
    pub if_features: Vec<Node<IfFeatureStmt>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitStmt {
    pub name: Ident,
    pub position: Option<u32>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    /// YANG 1.1 only.
    pub if_features: Vec<Node<IfFeatureStmt>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureStmt {
    pub name: Ident,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityStmt {
    pub name: Ident,
    pub bases: Vec<Node<QName>>,
    pub if_features: Vec<Node<IfFeatureStmt>>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub extensions: ExtensionInstances,
}

/// An `extension` definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionStmt {
    pub name: Ident,
    pub argument: Option<ArgumentStmt>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArgumentStmt {
    pub name: Ident,
    /// Whether instances carry the argument as a subelement instead of an
    /// attribute.
    pub yin_element: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviationStmt {
    /// Absolute schema path of the deviated node.
    pub target: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub deviates: Vec<Node<DeviateStmt>>,
    pub extensions: ExtensionInstances,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DeviateKind {
    NotSupported,
    Add,
    Replace,
    Delete,
}

impl fmt::Display for DeviateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviateKind::NotSupported => f.write_str("not-supported"),
            DeviateKind::Add => f.write_str("add"),
            DeviateKind::Replace => f.write_str("replace"),
            DeviateKind::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviateStmt {
    pub kind: DeviateKind,
    pub ty: Option<Node<TypeStmt>>,
    pub units: Option<String>,
    pub musts: Vec<Node<MustStmt>>,
    pub uniques: Vec<Node<UniqueStmt>>,
    pub defaults: Vec<String>,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<MaxElements>,
    pub extensions: ExtensionInstances,
}
