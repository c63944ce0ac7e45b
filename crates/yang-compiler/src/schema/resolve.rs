//! The unresolved-items queue and its fixpoint driver.
//!
//! Anything the statement reader or builder cannot finish immediately is
//! enqueued as a [`Pending`] item carrying the target slot and the source
//! location. The driver runs passes over the FIFO: items that resolve are
//! done, items still blocked go to the back. A pass that resolves nothing
//! while the queue is non-empty means a dependency cycle, reported against
//! the first blocked item.

use super::*;
use crate::diagnostics::{Diagnostic, DiagnosticData};
use crate::types::{self, TypeCx, TypeKind, TypeScope};
use crate::Context;
use crate::ParseOptions;
use std::collections::VecDeque;
use triomphe::Arc as TriArc;

/// Deferred resolution work.
#[derive(Debug, Clone)]
pub(crate) enum Pending {
    /// Compile the type of a leaf or leaf-list.
    TypeDer { node: NodeId },
    /// Resolve the leafref paths inside an already compiled type.
    TypeLeafref { node: NodeId },
    /// Link an identity's bases and check for derivation cycles.
    IdentityBase { module: ModuleId, name: Ident },
    /// Expand a grouping into a `uses` site.
    Uses { node: NodeId },
    /// Splice an augment's children into its target.
    Augment { node: NodeId },
    /// Bind a list's keys to child leafs.
    ListKeys { node: NodeId },
    /// Bind a list's unique constraints to descendant leafs.
    ListUnique { node: NodeId },
    /// Bind a choice's default case.
    ChoiceDefault { node: NodeId },
    /// Check a feature's references and reference cycles.
    Feature { module: ModuleId, name: Ident },
    /// Syntax-check a `when` or `must` expression.
    XPathSyntax { node: NodeId, which: XPathWhich },
    /// Mark a module implemented (cross-module augment or deviation).
    ModImplement { module: ModuleId },
    /// Bind an extension instance to its definition.
    Extension { node: Option<NodeId>, index: usize },
    /// Validate a typedef's default against its own type.
    TypedefDefault {
        module: ModuleId,
        node: Option<NodeId>,
        name: Ident,
    },
    /// Validate a leaf/leaf-list default against the effective type.
    LeafDefault { node: NodeId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XPathWhich {
    When,
    Must(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct PendingItem {
    pub kind: Pending,
    pub span: Option<SourceSpan>,
}

pub(crate) enum Outcome {
    Done,
    Blocked,
}

/// Undo journal for one module load. Only mutations of state that predates
/// the load are journaled; everything created by the load is torn down via
/// `created`.
#[derive(Default)]
pub(crate) struct UndoLog {
    pub created: Vec<NodeId>,
    /// Children appended to pre-existing parents (augment splices).
    pub spliced: Vec<(NodeId, NodeId)>,
    /// Prior (implemented, deviated) of touched pre-existing modules.
    pub module_flags: Vec<(ModuleId, bool, bool)>,
    /// Derived-identity back-references added to pre-existing modules.
    pub derived_added: Vec<(SymbolRef, SymbolRef)>,
    /// Pre-mutation clones of pre-existing nodes (deviation targets).
    pub node_snapshots: Vec<(NodeId, Box<SchemaNode>)>,
    /// Top-level children unlinked from pre-existing modules, with the
    /// position they held.
    pub module_children_removed: Vec<(ModuleId, usize, NodeId)>,
}

impl UndoLog {
    pub(crate) fn rollback(self, ctx: &mut Context) {
        for (id, snapshot) in self.node_snapshots.into_iter().rev() {
            *ctx.graph.node_mut(id) = *snapshot;
        }
        for (parent, child) in self.spliced.into_iter().rev() {
            ctx.graph.node_mut(parent).children.retain(|&c| c != child);
        }
        for (module, pos, child) in self.module_children_removed.into_iter().rev() {
            let children = &mut ctx.modules[module].children;
            let pos = pos.min(children.len());
            children.insert(pos, child);
        }
        for (module, implemented, deviated) in self.module_flags.into_iter().rev() {
            ctx.modules[module].implemented = implemented;
            ctx.modules[module].deviated = deviated;
        }
        for (base, derived) in self.derived_added.into_iter().rev() {
            if let Some(identity) = ctx.modules[base.module].identities.get_mut(base.name.as_str())
            {
                identity.derived.retain(|d| d != &derived);
            }
        }
        for id in self.created {
            ctx.graph.remove(id);
        }
    }
}

/// State of one module load, threaded through build and resolution.
pub(crate) struct Load {
    pub module: ModuleId,
    pub options: ParseOptions,
    pub queue: VecDeque<PendingItem>,
    pub undo: UndoLog,
    pub warnings: Vec<Diagnostic>,
}

impl Load {
    pub(crate) fn new(module: ModuleId, options: ParseOptions) -> Self {
        Self {
            module,
            options,
            queue: VecDeque::new(),
            undo: UndoLog::default(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn enqueue(&mut self, kind: Pending, span: Option<SourceSpan>) {
        self.queue.push_back(PendingItem { kind, span });
    }

    /// Records the prior flags of a module the first time it is touched.
    pub(crate) fn journal_module_flags(&mut self, ctx: &Context, module: ModuleId) {
        if module != self.module
            && !self.undo.module_flags.iter().any(|(m, _, _)| *m == module)
        {
            let m = &ctx.modules[module];
            self.undo
                .module_flags
                .push((module, m.implemented, m.deviated));
        }
    }
}

/// Runs passes over the queue until it drains or stalls.
pub(crate) fn drain(ctx: &mut Context, load: &mut Load) -> Result<(), Diagnostic> {
    loop {
        if load.queue.is_empty() {
            return Ok(());
        }
        let mut progressed = false;
        let pass_len = load.queue.len();
        for _ in 0..pass_len {
            let item = load.queue.pop_front().expect("counted");
            log::debug!("resolving {:?}", item.kind);
            match try_resolve(ctx, load, &item)? {
                Outcome::Done => progressed = true,
                Outcome::Blocked => load.queue.push_back(item),
            }
        }
        if !load.queue.is_empty() && !progressed {
            let first = load.queue.front().expect("non-empty");
            return Err(Diagnostic::error(DiagnosticData::UnresolvedCycle {
                item: describe(ctx, &first.kind),
            })
            .with_span(first.span));
        }
    }
}

fn describe(ctx: &Context, kind: &Pending) -> String {
    match kind {
        Pending::TypeDer { node } | Pending::TypeLeafref { node } => {
            format!("the type of {}", ctx.graph.path_string(*node, &ctx.modules))
        }
        Pending::IdentityBase { module, name } => {
            format!("identity `{}:{name}`", ctx.modules[*module].name)
        }
        Pending::Uses { node } => match &ctx.graph.node(*node).kind {
            NodeKind::Uses(uses) => format!("uses `{}`", uses.grouping),
            _ => "uses".to_owned(),
        },
        Pending::Augment { node } => match &ctx.graph.node(*node).kind {
            NodeKind::Augment(augment) => format!("augment `{}`", augment.target_str),
            _ => "augment".to_owned(),
        },
        Pending::ListKeys { node } => {
            format!("the keys of {}", ctx.graph.path_string(*node, &ctx.modules))
        }
        Pending::ListUnique { node } => format!(
            "a unique constraint of {}",
            ctx.graph.path_string(*node, &ctx.modules)
        ),
        Pending::ChoiceDefault { node } => format!(
            "the default case of {}",
            ctx.graph.path_string(*node, &ctx.modules)
        ),
        Pending::Feature { module, name } => {
            format!("feature `{}:{name}`", ctx.modules[*module].name)
        }
        Pending::XPathSyntax { node, .. } => format!(
            "an XPath expression on {}",
            ctx.graph.path_string(*node, &ctx.modules)
        ),
        Pending::ModImplement { module } => {
            format!("implementing module `{}`", ctx.modules[*module].name)
        }
        Pending::Extension { .. } => "an extension instance".to_owned(),
        Pending::TypedefDefault { name, .. } => format!("the default of typedef `{name}`"),
        Pending::LeafDefault { node } => format!(
            "the default of {}",
            ctx.graph.path_string(*node, &ctx.modules)
        ),
    }
}

/// Whether items that can still create or move schema nodes remain queued.
/// While they do, a missing path target is "blocked", not an error.
fn structural_pending(load: &Load) -> bool {
    load.queue
        .iter()
        .any(|item| matches!(item.kind, Pending::Uses { .. } | Pending::Augment { .. }))
}

fn try_resolve(
    ctx: &mut Context,
    load: &mut Load,
    item: &PendingItem,
) -> Result<Outcome, Diagnostic> {
    match &item.kind {
        Pending::TypeDer { node } => resolve_type_der(ctx, load, *node, item.span),
        Pending::TypeLeafref { node } => resolve_type_leafref(ctx, load, *node, item.span),
        Pending::IdentityBase { module, name } => {
            resolve_identity_base(ctx, load, *module, name.clone(), item.span)
        }
        Pending::Uses { node } => uses::expand(ctx, load, *node, item.span),
        Pending::Augment { node } => augment::apply(ctx, load, *node, item.span),
        Pending::ListKeys { node } => resolve_list_keys(ctx, load, *node, item.span),
        Pending::ListUnique { node } => resolve_list_unique(ctx, load, *node, item.span),
        Pending::ChoiceDefault { node } => resolve_choice_default(ctx, load, *node, item.span),
        Pending::Feature { module, name } => {
            resolve_feature(ctx, load, *module, name.clone(), item.span)
        }
        Pending::XPathSyntax { node, which } => resolve_xpath(ctx, *node, *which),
        Pending::ModImplement { module } => {
            load.journal_module_flags(ctx, *module);
            ctx.modules[*module].implemented = true;
            Ok(Outcome::Done)
        }
        Pending::Extension { node, index } => resolve_extension(ctx, load, *node, *index),
        Pending::TypedefDefault { module, node, name } => {
            resolve_typedef_default(ctx, *module, *node, name.clone())
        }
        Pending::LeafDefault { node } => resolve_leaf_default(ctx, load, *node, item.span),
    }
}

fn resolve_type_der(
    ctx: &mut Context,
    load: &mut Load,
    node_id: NodeId,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let node = ctx.graph.node(node_id);
    let Some(TypeSlot::Unresolved(spec)) = node.type_slot() else {
        return Ok(Outcome::Done); // already resolved (deviation replay)
    };
    let spec = spec.clone();
    let scope = TypeScope {
        module: node.origin_module,
        doc: node.origin_doc,
        node: Some(node_id),
        in_grouping: false,
    };
    let mut cx = TypeCx::new(&ctx.graph, &ctx.modules, &mut ctx.dict);
    let ty = types::resolve_type(&mut cx, &scope, &spec)
        .map_err(|d| attach_span(d, span))?;
    let has_pointer = ty.has_pointer_type();
    let has_default = {
        let node = ctx.graph.node(node_id);
        match &node.kind {
            NodeKind::Leaf(leaf) => leaf.default.is_some() || ty.typedef_default.is_some(),
            NodeKind::LeafList(leaf_list) => {
                !leaf_list.defaults.is_empty() || ty.typedef_default.is_some()
            }
            _ => false,
        }
    };
    let slot = TypeSlot::Resolved(TriArc::new(ty));
    match &mut ctx.graph.node_mut(node_id).kind {
        NodeKind::Leaf(leaf) => leaf.ty = slot,
        NodeKind::LeafList(leaf_list) => leaf_list.ty = slot,
        _ => {}
    }
    if has_pointer {
        load.enqueue(Pending::TypeLeafref { node: node_id }, span);
    }
    if has_default {
        load.enqueue(Pending::LeafDefault { node: node_id }, span);
    }
    Ok(Outcome::Done)
}

fn resolve_type_leafref(
    ctx: &mut Context,
    load: &mut Load,
    node_id: NodeId,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let node = ctx.graph.node(node_id);
    let Some(slot) = node.type_slot() else {
        return Ok(Outcome::Done);
    };
    let Some(ty) = slot.resolved() else {
        return Ok(Outcome::Done);
    };
    let ty = ty.clone();
    match resolve_leafrefs_in(ctx, load, node_id, &ty) {
        Ok(true) => Ok(Outcome::Done),
        Ok(false) => Ok(Outcome::Blocked),
        Err(d) => Err(attach_span(d, span)),
    }
}

/// Resolves every leafref in a type tree. Returns `false` while blocked on
/// pending structural items.
fn resolve_leafrefs_in(
    ctx: &mut Context,
    load: &mut Load,
    node_id: NodeId,
    ty: &types::Type,
) -> Result<bool, Diagnostic> {
    match &ty.kind {
        TypeKind::Leafref { path, target, .. } => {
            if target.get().is_some() {
                return Ok(true);
            }
            match walk_leafref(ctx, node_id, path) {
                Ok(found) => {
                    let target_node = ctx.graph.node(found);
                    if !matches!(target_node.kind, NodeKind::Leaf(_) | NodeKind::LeafList(_)) {
                        return Err(Diagnostic::error(DiagnosticData::BadLeafrefPath {
                            path: path.source.clone(),
                            message: format!(
                                "the path terminates at a {}",
                                target_node.kind.keyword()
                            ),
                        }));
                    }
                    check_link_status(ctx, load, node_id, found)?;
                    let _ = target.set(found);
                    Ok(true)
                }
                Err(message) => {
                    if structural_pending(load) {
                        Ok(false)
                    } else {
                        Err(Diagnostic::error(DiagnosticData::BadLeafrefPath {
                            path: path.source.clone(),
                            message,
                        }))
                    }
                }
            }
        }
        TypeKind::Union { members, .. } => {
            let mut all = true;
            for member in members {
                all &= resolve_leafrefs_in(ctx, load, node_id, member)?;
            }
            Ok(all)
        }
        _ => Ok(true),
    }
}

/// Walks a leafref path from the referring node through the data tree,
/// with choice and case levels transparent.
fn walk_leafref(
    ctx: &Context,
    from: NodeId,
    path: &crate::path::LeafrefPath,
) -> Result<NodeId, String> {
    let from_node = ctx.graph.node(from);
    let mut context_module = from_node.module;
    let mut current: Option<NodeId>;
    if path.absolute {
        current = None;
        if let Some(first) = path.steps.first() {
            context_module = first.module.unwrap_or(from_node.origin_module);
        }
    } else {
        let mut cursor = Some(from);
        for i in 0..path.up {
            let start = match cursor {
                Some(id) => id,
                None => return Err("the path climbs above the top of the schema".to_owned()),
            };
            let mut parent = ctx.graph.node(start).parent;
            // Choice and case levels are invisible in the data tree.
            while let Some(p) = parent {
                if matches!(ctx.graph.node(p).kind, NodeKind::Choice(_) | NodeKind::Case) {
                    parent = ctx.graph.node(p).parent;
                } else {
                    break;
                }
            }
            if parent.is_none() && i + 1 != path.up {
                return Err("the path climbs above the top of the schema".to_owned());
            }
            cursor = parent;
        }
        current = cursor;
        context_module = match cursor {
            Some(id) => ctx.graph.node(id).module,
            None => from_node.module,
        };
    }
    walk_steps(ctx, current, context_module, &path.steps)
}

fn walk_steps(
    ctx: &Context,
    mut current: Option<NodeId>,
    mut context_module: ModuleId,
    steps: &[crate::path::LeafrefStep],
) -> Result<NodeId, String> {
    for step in steps {
        let module = step.module.unwrap_or(context_module);
        let children: &[NodeId] = match current {
            Some(id) => &ctx.graph.node(id).children,
            None => &ctx.modules[module].children,
        };
        let found = find_data_descendant(ctx, children, module, &step.name)
            .ok_or_else(|| format!("node `{}` not found", step.name))?;
        context_module = ctx.graph.node(found).module;
        current = Some(found);
    }
    current.ok_or_else(|| "empty path".to_owned())
}

/// Finds a named data node among children, drilling through the
/// data-invisible choice and case levels.
pub(crate) fn find_data_descendant(
    ctx: &Context,
    children: &[NodeId],
    module: ModuleId,
    name: &str,
) -> Option<NodeId> {
    for &child in children {
        let node = ctx.graph.node(child);
        match node.kind {
            NodeKind::Choice(_) | NodeKind::Case => {
                if let Some(found) = find_data_descendant(ctx, &node.children, module, name) {
                    return Some(found);
                }
            }
            NodeKind::Uses(_) | NodeKind::Grouping | NodeKind::Augment(_) => {}
            _ => {
                if node.name == *name && node.module == module {
                    return Some(child);
                }
            }
        }
    }
    None
}

/// Status compatibility when linking `from` to `to`: the target must be at
/// least as current as the source. Sources without an explicit status
/// inherit the target's with a warning; explicit violations are errors.
pub(crate) fn check_link_status(
    ctx: &mut Context,
    load: &mut Load,
    from: NodeId,
    to: NodeId,
) -> Result<(), Diagnostic> {
    let from_status = ctx.graph.node(from).status;
    let to_status = ctx.graph.node(to).status;
    if to_status <= from_status {
        return Ok(());
    }
    let from_name = ctx.graph.path_string(from, &ctx.modules);
    let to_name = ctx.graph.path_string(to, &ctx.modules);
    if ctx.graph.node(from).flags.contains(NodeFlags::STATUS_EXPLICIT) {
        return Err(Diagnostic::error(DiagnosticData::WidenedStatus {
            name: from_name,
            other: to_name,
            message: format!("a {from_status} node references a {to_status} node"),
        })
        .with_span(ctx.graph.node(from).span));
    }
    let span = ctx.graph.node(from).span;
    load.warnings.push(
        Diagnostic::warning(DiagnosticData::WidenedStatus {
            name: from_name,
            other: to_name,
            message: format!("status {to_status} is inherited from the reference target"),
        })
        .with_span(span),
    );
    ctx.graph.node_mut(from).status = to_status;
    Ok(())
}

fn resolve_identity_base(
    ctx: &mut Context,
    load: &mut Load,
    module: ModuleId,
    name: Ident,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let this = SymbolRef {
        module,
        name: name.clone(),
    };
    let bases = ctx.modules[module]
        .identities
        .get(name.as_str())
        .map(|identity| identity.bases.clone())
        .unwrap_or_default();
    for base in &bases {
        let exists = ctx.modules[base.module]
            .identities
            .get(base.name.as_str())
            .is_some();
        if !exists {
            return Err(Diagnostic::error(DiagnosticData::BadIdentityBase {
                identity: name.to_string(),
                base: base.name.to_string(),
                message: "no such identity".to_owned(),
            })
            .with_span(span));
        }
        // An identity may not transitively base itself: adding the edge
        // this -> base closes a cycle iff base already derives from this.
        if base == &this || types::value::identity_derived_from(&ctx.modules, base, &this) {
            return Err(Diagnostic::error(DiagnosticData::UnresolvedCycle {
                item: format!("identity `{name}`"),
            })
            .with_span(span));
        }
    }
    for base in bases {
        if base.module != load.module {
            load.undo.derived_added.push((base.clone(), this.clone()));
        }
        if let Some(identity) = ctx.modules[base.module].identities.get_mut(base.name.as_str()) {
            identity.derived.push(this.clone());
        }
    }
    Ok(Outcome::Done)
}

fn resolve_feature(
    ctx: &mut Context,
    _load: &mut Load,
    module: ModuleId,
    name: Ident,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let this = SymbolRef {
        module,
        name: name.clone(),
    };
    let exprs: Vec<IfFeature> = ctx.modules[module]
        .features
        .get(name.as_str())
        .map(|feature| feature.if_features.clone())
        .unwrap_or_default();
    let mut stack: Vec<SymbolRef> = Vec::new();
    for if_feature in &exprs {
        collect_feature_refs(&if_feature.expr, &mut stack);
    }
    let mut seen: Vec<SymbolRef> = Vec::new();
    while let Some(current) = stack.pop() {
        if seen.contains(&current) {
            continue;
        }
        let Some(feature) = ctx.modules[current.module].features.get(current.name.as_str())
        else {
            return Err(Diagnostic::error(DiagnosticData::UnresolvedReference {
                kind: "feature",
                name: current.name.to_string(),
            })
            .with_span(span));
        };
        if current == this {
            return Err(Diagnostic::error(DiagnosticData::UnresolvedCycle {
                item: format!("feature `{name}`"),
            })
            .with_span(span));
        }
        for if_feature in &feature.if_features {
            collect_feature_refs(&if_feature.expr, &mut stack);
        }
        seen.push(current);
    }
    Ok(Outcome::Done)
}

pub(crate) fn collect_feature_refs(expr: &IfFeatureExpr, out: &mut Vec<SymbolRef>) {
    match expr {
        IfFeatureExpr::Ref(sym) => out.push(sym.clone()),
        IfFeatureExpr::Not(inner) => collect_feature_refs(inner, out),
        IfFeatureExpr::And(a, b) | IfFeatureExpr::Or(a, b) => {
            collect_feature_refs(a, out);
            collect_feature_refs(b, out);
        }
    }
}

fn resolve_list_keys(
    ctx: &mut Context,
    load: &mut Load,
    node_id: NodeId,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let node = ctx.graph.node(node_id);
    let list_name = node.name.clone();
    let list_module = node.module;
    let NodeKind::List(list) = &node.kind else {
        return Ok(Outcome::Done);
    };
    let key_names = list.key_names.clone();
    let children = node.children.clone();
    let mut keys = Vec::new();
    for key in &key_names {
        let module = key.module.unwrap_or(list_module);
        let Some(found) = ctx.graph.find_child(&children, Some(module), &key.name) else {
            if structural_pending(load) {
                return Ok(Outcome::Blocked);
            }
            return Err(Diagnostic::error(DiagnosticData::KeyNotLeaf {
                list: list_name.to_string(),
                key: key.name.to_string(),
            })
            .with_span(span));
        };
        let child = ctx.graph.node(found);
        let NodeKind::Leaf(leaf) = &child.kind else {
            return Err(Diagnostic::error(DiagnosticData::KeyNotLeaf {
                list: list_name.to_string(),
                key: key.name.to_string(),
            })
            .with_span(span));
        };
        if leaf.default.is_some() {
            return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                keyword: "key".to_owned(),
                message: format!("key leaf `{}` must not have a default", key.name),
            })
            .with_span(span));
        }
        if keys.contains(&found) {
            return Err(Diagnostic::error(DiagnosticData::Duplicate {
                what: "key".to_owned(),
                name: Some(key.name.to_string()),
            })
            .with_span(span));
        }
        keys.push(found);
    }
    for &key in &keys {
        let flags = &mut ctx.graph.node_mut(key).flags;
        flags.insert(NodeFlags::KEY | NodeFlags::MANDATORY);
    }
    if let NodeKind::List(list) = &mut ctx.graph.node_mut(node_id).kind {
        list.keys = keys;
    }
    Ok(Outcome::Done)
}

fn resolve_list_unique(
    ctx: &mut Context,
    load: &mut Load,
    node_id: NodeId,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let node = ctx.graph.node(node_id);
    let list_module = node.module;
    let NodeKind::List(list) = &node.kind else {
        return Ok(Outcome::Done);
    };
    let uniques = list.uniques.clone();
    let mut resolved_sets = Vec::new();
    for unique in &uniques {
        let mut resolved = Vec::new();
        for part in &unique.parts {
            let mut current = node_id;
            for (i, step) in part.steps.iter().enumerate() {
                let module = step.module.unwrap_or(list_module);
                let children = ctx.graph.node(current).children.clone();
                let Some(found) = find_data_descendant(ctx, &children, module, &step.name) else {
                    if structural_pending(load) {
                        return Ok(Outcome::Blocked);
                    }
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "unique".to_owned(),
                        message: format!("descendant `{}` not found", step.name),
                    })
                    .with_span(span));
                };
                if i + 1 == part.steps.len()
                    && !matches!(ctx.graph.node(found).kind, NodeKind::Leaf(_))
                {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "unique".to_owned(),
                        message: format!("`{}` does not refer to a leaf", unique.source),
                    })
                    .with_span(span));
                }
                current = found;
            }
            resolved.push(current);
        }
        resolved_sets.push(resolved);
    }
    if let NodeKind::List(list) = &mut ctx.graph.node_mut(node_id).kind {
        for (unique, resolved) in list.uniques.iter_mut().zip(resolved_sets) {
            unique.resolved = resolved;
        }
    }
    Ok(Outcome::Done)
}

fn resolve_choice_default(
    ctx: &mut Context,
    load: &mut Load,
    node_id: NodeId,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let node = ctx.graph.node(node_id);
    let choice_name = node.name.clone();
    let mandatory = node.mandatory();
    let children = node.children.clone();
    let NodeKind::Choice(choice) = &node.kind else {
        return Ok(Outcome::Done);
    };
    let Some(default_name) = choice.default_name.clone() else {
        return Ok(Outcome::Done);
    };
    let Some(case) = ctx
        .graph
        .find_child(&children, None, &default_name)
        .filter(|&c| matches!(ctx.graph.node(c).kind, NodeKind::Case))
    else {
        if structural_pending(load) {
            return Ok(Outcome::Blocked);
        }
        return Err(Diagnostic::error(DiagnosticData::UnresolvedReference {
            kind: "case",
            name: default_name.to_string(),
        })
        .with_span(span));
    };
    if mandatory {
        return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "choice".to_owned(),
            message: format!(
                "choice `{choice_name}` cannot be mandatory and have a default case"
            ),
        })
        .with_span(span));
    }
    if let Some(offender) = first_mandatory_in_case(ctx, case) {
        return Err(Diagnostic::error(DiagnosticData::MandatoryUnderDefaultCase {
            node: ctx.graph.path_string(offender, &ctx.modules),
            case: default_name.to_string(),
        })
        .with_span(span));
    }
    if let NodeKind::Choice(choice) = &mut ctx.graph.node_mut(node_id).kind {
        choice.default_case = Some(case);
    }
    Ok(Outcome::Done)
}

/// A node that makes the case mandatory in the RFC 7950 sense.
pub(crate) fn first_mandatory_in_case(ctx: &Context, case: NodeId) -> Option<NodeId> {
    let mut stack: Vec<NodeId> = ctx.graph.node(case).children.to_vec();
    while let Some(id) = stack.pop() {
        let node = ctx.graph.node(id);
        match &node.kind {
            NodeKind::Leaf(_) | NodeKind::Choice(_) | NodeKind::AnyData | NodeKind::AnyXml => {
                if node.mandatory() {
                    return Some(id);
                }
            }
            NodeKind::List(list) => {
                if list.min_elements > 0 {
                    return Some(id);
                }
            }
            NodeKind::LeafList(leaf_list) => {
                if leaf_list.min_elements > 0 {
                    return Some(id);
                }
            }
            NodeKind::Container(container) => {
                // A non-presence container passes the obligation through.
                if container.presence.is_none() {
                    stack.extend(node.children.iter().copied());
                }
            }
            _ => {}
        }
    }
    None
}

fn resolve_xpath(
    ctx: &mut Context,
    node_id: NodeId,
    which: XPathWhich,
) -> Result<Outcome, Diagnostic> {
    let (source, span) = {
        let node = ctx.graph.node(node_id);
        match which {
            XPathWhich::When => match &node.when {
                Some(when) => (when.source.clone(), when.span),
                None => return Ok(Outcome::Done),
            },
            XPathWhich::Must(index) => match node.musts.get(index) {
                Some(must) => (must.source.clone(), must.span),
                None => return Ok(Outcome::Done),
            },
        }
    };
    let ast = crate::xpath::parse(&source).map_err(|e| {
        Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: match which {
                XPathWhich::When => "when".to_owned(),
                XPathWhich::Must(_) => "must".to_owned(),
            },
            message: e.to_string(),
        })
        .with_span(span)
    })?;
    let node = ctx.graph.node_mut(node_id);
    match which {
        XPathWhich::When => {
            if let Some(when) = &mut node.when {
                when.ast = Some(ast);
            }
        }
        XPathWhich::Must(index) => {
            if let Some(must) = node.musts.get_mut(index) {
                must.ast = Some(ast);
            }
        }
    }
    Ok(Outcome::Done)
}

fn resolve_extension(
    ctx: &mut Context,
    load: &mut Load,
    node: Option<NodeId>,
    index: usize,
) -> Result<Outcome, Diagnostic> {
    let instance = match node {
        Some(id) => ctx.graph.node(id).extensions.get(index).cloned(),
        None => ctx.modules[load.module].extension_instances.get(index).cloned(),
    };
    let Some(instance) = instance else {
        return Ok(Outcome::Done);
    };
    let Some(def_module) = ctx
        .modules
        .iter()
        .position(|m| m.namespace == instance.namespace)
    else {
        load.warnings.push(
            Diagnostic::warning(DiagnosticData::UnresolvedReference {
                kind: "extension namespace",
                name: instance.namespace.clone(),
            })
            .with_span(instance.span),
        );
        return Ok(Outcome::Done);
    };
    let Some(def) = ctx.modules[def_module].extensions.get(instance.keyword.as_str()) else {
        return Err(Diagnostic::error(DiagnosticData::UnresolvedReference {
            kind: "extension",
            name: format!("{}:{}", ctx.modules[def_module].name, instance.keyword),
        })
        .with_span(instance.span));
    };
    let argument = match &def.argument {
        Some((arg_name, yin_element)) => {
            let value = if *yin_element {
                instance
                    .yin
                    .children
                    .iter()
                    .find(|c| c.name == **arg_name && c.namespace == instance.yin.namespace)
                    .and_then(|c| c.text.clone())
            } else {
                instance.yin.attribute(arg_name).map(str::to_owned)
            };
            match value {
                Some(value) => Some(value),
                None => {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: instance.keyword.clone(),
                        message: format!("missing `{arg_name}` argument"),
                    })
                    .with_span(instance.span))
                }
            }
        }
        None => None,
    };
    let def_ref = SymbolRef {
        module: def_module,
        name: def.name.clone(),
    };
    let slot = match node {
        Some(id) => ctx.graph.node_mut(id).extensions.get_mut(index),
        None => ctx.modules[load.module].extension_instances.get_mut(index),
    };
    if let Some(slot) = slot {
        slot.def = Some(def_ref);
        slot.argument = argument;
    }
    Ok(Outcome::Done)
}

fn resolve_typedef_default(
    ctx: &mut Context,
    module: ModuleId,
    node: Option<NodeId>,
    name: Ident,
) -> Result<Outcome, Diagnostic> {
    let typedef = match node {
        Some(id) => ctx.graph.node(id).typedefs.get(name.as_str()).cloned(),
        None => ctx.modules[module].typedefs.get(name.as_str()).cloned(),
    };
    let Some(typedef) = typedef else {
        return Ok(Outcome::Done);
    };
    let Some(default) = typedef.stmt.default.clone() else {
        return Ok(Outcome::Done);
    };
    let scope = TypeScope {
        module: typedef.module,
        doc: typedef.doc,
        node,
        in_grouping: false,
    };
    let mut cx = TypeCx::new(&ctx.graph, &ctx.modules, &mut ctx.dict);
    let ty = types::resolve_type(&mut cx, &scope, &typedef.stmt.ty)?;
    if ty.has_pointer_type() {
        // A leafref default can only be judged at a leaf that instantiates
        // the typedef; the leaf-level check covers it.
        return Ok(Outcome::Done);
    }
    let value_cx = types::ValueCx {
        graph: &ctx.graph,
        modules: &ctx.modules,
        module: typedef.module,
        doc: typedef.doc,
    };
    types::validate_value(&value_cx, &ty, &default).map_err(|message| {
        Diagnostic::error(DiagnosticData::DefaultValueInvalid {
            value: default.clone(),
            message,
        })
        .with_span(typedef.stmt.span())
    })?;
    Ok(Outcome::Done)
}

fn resolve_leaf_default(
    ctx: &mut Context,
    load: &mut Load,
    node_id: NodeId,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let node = ctx.graph.node(node_id);
    let Some(slot) = node.type_slot() else {
        return Ok(Outcome::Done);
    };
    let Some(ty) = slot.resolved() else {
        return Ok(Outcome::Done);
    };
    let ty = ty.clone();
    if has_unresolved_leafref(&ty) {
        if structural_pending(load)
            || load
                .queue
                .iter()
                .any(|i| matches!(i.kind, Pending::TypeLeafref { .. }))
        {
            return Ok(Outcome::Blocked);
        }
        return Ok(Outcome::Done);
    }
    let defaults: Vec<(String, ModuleId, usize)> = {
        let node = ctx.graph.node(node_id);
        let own_origin = (node.origin_module, node.origin_doc);
        let mut list = Vec::new();
        match &node.kind {
            NodeKind::Leaf(leaf) => {
                if node.mandatory() && leaf.default.is_some() {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "default".to_owned(),
                        message: "a mandatory leaf cannot have a default".to_owned(),
                    })
                    .with_span(span));
                }
                if node.is_key() && leaf.default.is_some() {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "default".to_owned(),
                        message: "a list key cannot have a default".to_owned(),
                    })
                    .with_span(span));
                }
                match (&leaf.default, &ty.typedef_default) {
                    (Some(default), _) => {
                        list.push((default.clone(), own_origin.0, own_origin.1))
                    }
                    (None, Some(inherited)) => list.push((
                        inherited.value.clone(),
                        inherited.module,
                        inherited.doc,
                    )),
                    (None, None) => {}
                }
            }
            NodeKind::LeafList(leaf_list) => {
                for default in &leaf_list.defaults {
                    list.push((default.clone(), own_origin.0, own_origin.1));
                }
                if leaf_list.defaults.is_empty() {
                    if let Some(inherited) = &ty.typedef_default {
                        list.push((inherited.value.clone(), inherited.module, inherited.doc));
                    }
                }
            }
            _ => {}
        }
        list
    };
    for (default, module, doc) in defaults {
        let value_cx = types::ValueCx {
            graph: &ctx.graph,
            modules: &ctx.modules,
            module,
            doc,
        };
        types::validate_value(&value_cx, &ty, &default).map_err(|message| {
            Diagnostic::error(DiagnosticData::DefaultValueInvalid {
                value: default.clone(),
                message,
            })
            .with_span(span)
        })?;
    }
    Ok(Outcome::Done)
}

fn has_unresolved_leafref(ty: &types::Type) -> bool {
    match &ty.kind {
        TypeKind::Leafref { target, .. } => target.get().is_none(),
        TypeKind::Union { members, .. } => members.iter().any(has_unresolved_leafref),
        _ => false,
    }
}

fn attach_span(diagnostic: Diagnostic, span: Option<SourceSpan>) -> Diagnostic {
    if diagnostic.span.is_none() {
        diagnostic.with_span(span)
    } else {
        diagnostic
    }
}
