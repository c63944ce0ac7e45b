//! Grouping expansion at `uses` sites.
//!
//! The grouping's children are deep-copied into the place of the uses
//! node. Copies instantiate in the using module's namespace but keep their
//! origin document, so names inside them still resolve against the
//! grouping's text. Refines mutate the copy first, then uses-augments are
//! enqueued, then the copy's own deferred work (types, keys, nested uses)
//! is scheduled against the new parent context.

use super::builder::{self, BuildEnv};
use super::resolve::{Load, Outcome, Pending, XPathWhich};
use super::*;
use crate::diagnostics::{Diagnostic, DiagnosticData};
use crate::path;
use crate::Context;

pub(crate) fn expand(
    ctx: &mut Context,
    load: &mut Load,
    uses_id: NodeId,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let (uses, origin_module, origin_doc, inst_module, parent, uses_when, uses_if_features) = {
        let node = ctx.graph.node(uses_id);
        let NodeKind::Uses(uses) = &node.kind else {
            return Ok(Outcome::Done);
        };
        (
            uses.clone(),
            node.origin_module,
            node.origin_doc,
            node.module,
            node.parent,
            node.when.clone(),
            node.if_features.clone(),
        )
    };

    // The scope walk starts at the uses node itself: a copy of a nested
    // uses carries its grouping scope merged onto it.
    let grouping_id = find_grouping(ctx, &uses.grouping, origin_module, origin_doc, Some(uses_id))
        .ok_or_else(|| {
            Diagnostic::error(DiagnosticData::UnresolvedReference {
                kind: "grouping",
                name: uses.grouping.to_string(),
            })
            .with_span(span)
        })?;

    let grouping_key = SymbolRef {
        module: ctx.graph.node(grouping_id).module,
        name: ctx.graph.node(grouping_id).name.clone(),
    };
    if uses.origin_chain.contains(&grouping_key) {
        return Err(Diagnostic::error(DiagnosticData::GroupingCycle {
            grouping: grouping_key.name.to_string(),
        })
        .with_span(span));
    }
    let mut cursor = parent;
    while let Some(id) = cursor {
        if id == grouping_id {
            return Err(Diagnostic::error(DiagnosticData::GroupingCycle {
                grouping: grouping_key.name.to_string(),
            })
            .with_span(span));
        }
        cursor = ctx.graph.node(id).parent;
    }

    let mut chain = uses.origin_chain.clone();
    chain.push(grouping_key);

    // Deep-copy the grouping's children to the uses site.
    let template_children = ctx.graph.node(grouping_id).children.clone();
    let mut copies = Vec::new();
    for child in template_children {
        copies.push(copy_subtree(ctx, load, child, parent, inst_module, &chain));
    }

    // The grouping's lexical scope (its typedefs and groupings plus the
    // ones of its enclosing statements) stays visible to the copies.
    let scope_typedefs = collect_scope_typedefs(ctx, grouping_id);
    let scope_groupings = collect_scope_groupings(ctx, grouping_id);
    for &root in &copies {
        let node = ctx.graph.node_mut(root);
        for (name, typedef) in &scope_typedefs {
            if !node.typedefs.contains_key(name.as_str()) {
                node.typedefs.insert(name.clone(), typedef.clone());
            }
        }
        for (name, grouping) in &scope_groupings {
            if !node.groupings.contains_key(name.as_str()) {
                node.groupings.insert(name.clone(), *grouping);
            }
        }
    }

    // The uses' own condition and feature guards apply to every expanded
    // top-level node.
    for &root in &copies {
        let node = ctx.graph.node_mut(root);
        node.if_features.extend(uses_if_features.iter().cloned());
        if node.when.is_none() {
            node.when = uses_when.clone();
        }
    }

    // Splice the copies where the uses node stood.
    match parent {
        Some(parent_id) => {
            let children = &mut ctx.graph.node_mut(parent_id).children;
            let pos = children
                .iter()
                .position(|&c| c == uses_id)
                .expect("uses is a child of its parent");
            children.splice(pos..=pos, copies.iter().copied());
        }
        None => {
            let children = &mut ctx.modules[inst_module].children;
            let pos = children
                .iter()
                .position(|&c| c == uses_id)
                .expect("uses is a top-level child");
            children.splice(pos..=pos, copies.iter().copied());
        }
    }
    ctx.graph.remove(uses_id);

    // Re-inherit config and status from the splice point.
    let rpc_region = in_rpc_region(ctx, parent);
    let parent_config_false = parent
        .map(|p| ctx.graph.node(p).flags.contains(NodeFlags::CONFIG_FALSE))
        .unwrap_or(false);
    let parent_status = parent.map(|p| ctx.graph.node(p).status).unwrap_or_default();
    for &root in &copies {
        if !rpc_region {
            reinherit_config(ctx, root, parent_config_false);
        }
        reinherit_status(ctx, load, root, parent_status)?;
    }

    // Refines mutate the copied subtree before anything else sees it.
    for refine in &uses.refines {
        apply_refine(ctx, load, &copies, inst_module, origin_module, origin_doc, refine)?;
    }

    // Then uses-augments add and restructure.
    for augment in &uses.augments {
        let env = BuildEnv {
            module: inst_module,
            origin_module,
            origin_doc,
            in_grouping: false,
            in_rpc: rpc_region,
            origin_chain: chain.clone(),
        };
        let id = builder::build_augment_node(ctx, load, &env, augment, true, parent)?;
        ctx.modules[load.module].augments.push(id);
        load.enqueue(Pending::Augment { node: id }, augment.span());
    }

    // Schedule the copies' own deferred work.
    for &root in &copies {
        for id in ctx.graph.subtree(root) {
            schedule_copied_node(ctx, load, id);
        }
    }
    Ok(Outcome::Done)
}

fn find_grouping(
    ctx: &Context,
    name: &QName,
    origin_module: ModuleId,
    origin_doc: usize,
    parent: Option<NodeId>,
) -> Option<NodeId> {
    if let Some(prefix) = &name.prefix {
        let module = ctx.modules[origin_module].resolve_prefix(origin_doc, prefix)?;
        if module != origin_module {
            return ctx.modules[module].groupings.get(name.name.as_str()).copied();
        }
    }
    let mut cursor = parent;
    while let Some(id) = cursor {
        let node = ctx.graph.node(id);
        if let Some(&found) = node.groupings.get(name.name.as_str()) {
            return Some(found);
        }
        cursor = node.parent;
    }
    ctx.modules[origin_module]
        .groupings
        .get(name.name.as_str())
        .copied()
}

fn copy_subtree(
    ctx: &mut Context,
    load: &mut Load,
    src: NodeId,
    new_parent: Option<NodeId>,
    module: ModuleId,
    chain: &[SymbolRef],
) -> NodeId {
    let mut node = ctx.graph.node(src).clone();
    node.parent = new_parent;
    node.module = module;
    let children = std::mem::take(&mut node.children);
    match &mut node.kind {
        NodeKind::List(list) => {
            list.keys.clear();
            for unique in &mut list.uniques {
                unique.resolved.clear();
            }
        }
        NodeKind::Choice(choice) => choice.default_case = None,
        NodeKind::Uses(uses) => uses.origin_chain = chain.to_vec(),
        _ => {}
    }
    let id = ctx.graph.alloc(node);
    load.undo.created.push(id);
    for child in children {
        let copied = copy_subtree(ctx, load, child, Some(id), module, chain);
        ctx.graph.node_mut(id).children.push(copied);
    }
    id
}

fn collect_scope_typedefs(ctx: &Context, grouping: NodeId) -> Vec<(Ident, ScopedTypedef)> {
    let mut out: Vec<(Ident, ScopedTypedef)> = Vec::new();
    let mut cursor = Some(grouping);
    while let Some(id) = cursor {
        let node = ctx.graph.node(id);
        for (name, typedef) in &node.typedefs {
            if !out.iter().any(|(n, _)| n == name) {
                out.push((name.clone(), typedef.clone()));
            }
        }
        cursor = node.parent;
    }
    out
}

fn collect_scope_groupings(ctx: &Context, grouping: NodeId) -> Vec<(Ident, NodeId)> {
    let mut out: Vec<(Ident, NodeId)> = Vec::new();
    let mut cursor = Some(grouping);
    while let Some(id) = cursor {
        let node = ctx.graph.node(id);
        for (name, &template) in &node.groupings {
            if !out.iter().any(|(n, _)| n == name) {
                out.push((name.clone(), template));
            }
        }
        cursor = node.parent;
    }
    out
}

/// Whether the position sits inside an rpc, action, or notification tree,
/// where config is not applicable.
pub(crate) fn in_rpc_region(ctx: &Context, node: Option<NodeId>) -> bool {
    let mut cursor = node;
    while let Some(id) = cursor {
        let n = ctx.graph.node(id);
        if matches!(
            n.kind,
            NodeKind::Rpc
                | NodeKind::Action
                | NodeKind::Input
                | NodeKind::Output
                | NodeKind::Notification
        ) {
            return true;
        }
        cursor = n.parent;
    }
    false
}

/// Re-applies config inheritance below a splice point. Explicit settings
/// stay and root the propagation of their own value.
pub(crate) fn reinherit_config(ctx: &mut Context, root: NodeId, parent_false: bool) {
    let node = ctx.graph.node_mut(root);
    let effective_false = if node.flags.contains(NodeFlags::CONFIG_EXPLICIT) {
        node.flags.contains(NodeFlags::CONFIG_FALSE)
    } else {
        node.flags.set(NodeFlags::CONFIG_FALSE, parent_false);
        parent_false
    };
    let children = ctx.graph.node(root).children.clone();
    for child in children {
        reinherit_config(ctx, child, effective_false);
    }
}

/// Re-applies status inheritance below a splice point.
pub(crate) fn reinherit_status(
    ctx: &mut Context,
    load: &mut Load,
    root: NodeId,
    parent_status: Status,
) -> Result<(), Diagnostic> {
    let node = ctx.graph.node(root);
    let effective = if node.flags.contains(NodeFlags::STATUS_EXPLICIT) {
        if node.status < parent_status {
            return Err(Diagnostic::error(DiagnosticData::WidenedStatus {
                name: node.name.to_string(),
                other: String::new(),
                message: format!(
                    "a {} node cannot be placed under a {parent_status} node",
                    node.status
                ),
            })
            .with_span(node.span));
        }
        node.status
    } else {
        if node.status != parent_status && parent_status != Status::Current {
            let span = node.span;
            let name = node.name.to_string();
            load.warnings.push(
                Diagnostic::warning(DiagnosticData::WidenedStatus {
                    name,
                    other: String::new(),
                    message: format!("status {parent_status} is inherited from the parent"),
                })
                .with_span(span),
            );
        }
        ctx.graph.node_mut(root).status = parent_status;
        parent_status
    };
    let children = ctx.graph.node(root).children.clone();
    for child in children {
        reinherit_status(ctx, load, child, effective)?;
    }
    Ok(())
}

fn apply_refine(
    ctx: &mut Context,
    load: &mut Load,
    roots: &[NodeId],
    inst_module: ModuleId,
    origin_module: ModuleId,
    origin_doc: usize,
    refine: &Node<ast::RefineStmt>,
) -> Result<(), Diagnostic> {
    let parsed = {
        let modules = &ctx.modules;
        path::parse_schema_path(
            &refine.target,
            false,
            |prefix| modules[origin_module].resolve_prefix(origin_doc, prefix),
            &mut ctx.dict,
        )
        .map_err(|message| {
            Diagnostic::error(DiagnosticData::InvalidArgument {
                keyword: "refine".to_owned(),
                message,
            })
            .with_span(refine.span())
        })?
    };
    if parsed.absolute {
        return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "refine".to_owned(),
            message: "expected a descendant path".to_owned(),
        })
        .with_span(refine.span()));
    }

    // Walk the copied subtree.
    let mut candidates: Vec<NodeId> = roots.to_vec();
    let mut current: Option<NodeId> = None;
    for step in &parsed.steps {
        let module = step.module.unwrap_or(inst_module);
        let found = candidates.iter().copied().find(|&c| {
            let node = ctx.graph.node(c);
            node.name == step.name && node.module == module
        });
        let Some(found) = found else {
            return Err(Diagnostic::error(DiagnosticData::UnresolvedReference {
                kind: "refine target",
                name: refine.target.clone(),
            })
            .with_span(refine.span()));
        };
        candidates = ctx.graph.node(found).children.clone();
        current = Some(found);
    }
    let target = current.expect("paths have at least one step");

    let target_keyword = ctx.graph.node(target).kind.keyword();
    let cross_kind = |property: &str| {
        Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "refine".to_owned(),
            message: format!("`{property}` does not apply to a {target_keyword}"),
        })
        .with_span(refine.span())
    };

    if let Some(description) = &refine.description {
        ctx.graph.node_mut(target).description = Some(description.clone());
    }
    if let Some(reference) = &refine.reference {
        ctx.graph.node_mut(target).reference = Some(reference.clone());
    }
    if let Some(config) = refine.config {
        let flags = &mut ctx.graph.node_mut(target).flags;
        flags.insert(NodeFlags::CONFIG_EXPLICIT);
        flags.set(NodeFlags::CONFIG_FALSE, !config);
        let parent_false = ctx
            .graph
            .node(target)
            .parent
            .map(|p| ctx.graph.node(p).flags.contains(NodeFlags::CONFIG_FALSE))
            .unwrap_or(false);
        reinherit_config(ctx, target, parent_false);
    }
    if let Some(mandatory) = refine.mandatory {
        if !matches!(
            ctx.graph.node(target).kind,
            NodeKind::Leaf(_) | NodeKind::Choice(_) | NodeKind::AnyData | NodeKind::AnyXml
        ) {
            return Err(cross_kind("mandatory"));
        }
        ctx.graph
            .node_mut(target)
            .flags
            .set(NodeFlags::MANDATORY, mandatory);
    }
    if let Some(presence) = &refine.presence {
        match &mut ctx.graph.node_mut(target).kind {
            NodeKind::Container(container) => container.presence = Some(presence.clone()),
            _ => return Err(cross_kind("presence")),
        }
    }
    if !refine.defaults.is_empty() {
        let node = ctx.graph.node_mut(target);
        match &mut node.kind {
            NodeKind::Leaf(leaf) => {
                if refine.defaults.len() > 1 {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "refine".to_owned(),
                        message: "a leaf takes a single default".to_owned(),
                    })
                    .with_span(refine.span()));
                }
                leaf.default = Some(refine.defaults[0].clone());
            }
            NodeKind::LeafList(leaf_list) => {
                leaf_list.defaults = refine.defaults.clone();
            }
            NodeKind::Choice(choice) => {
                if refine.defaults.len() > 1 {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "refine".to_owned(),
                        message: "a choice takes a single default case".to_owned(),
                    })
                    .with_span(refine.span()));
                }
                choice.default_name = Some(ctx.dict.insert(&refine.defaults[0]));
                choice.default_case = None;
                load.enqueue(Pending::ChoiceDefault { node: target }, refine.span());
            }
            _ => return Err(cross_kind("default")),
        }
    }
    if let Some(min) = refine.min_elements {
        match &mut ctx.graph.node_mut(target).kind {
            NodeKind::List(list) => list.min_elements = min,
            NodeKind::LeafList(leaf_list) => leaf_list.min_elements = min,
            _ => return Err(cross_kind("min-elements")),
        }
    }
    if let Some(max) = refine.max_elements {
        let max = match max {
            ast::MaxElements::Unbounded => None,
            ast::MaxElements::Count(count) => Some(count),
        };
        match &mut ctx.graph.node_mut(target).kind {
            NodeKind::List(list) => list.max_elements = max,
            NodeKind::LeafList(leaf_list) => leaf_list.max_elements = max,
            _ => return Err(cross_kind("max-elements")),
        }
    }
    if !refine.musts.is_empty() {
        let start = ctx.graph.node(target).musts.len();
        let new_musts: Vec<Must> = refine
            .musts
            .iter()
            .map(|must| Must {
                source: must.condition.clone(),
                ast: None,
                error_message: must.error_message.clone(),
                error_app_tag: must.error_app_tag.clone(),
                span: must.span(),
            })
            .collect();
        ctx.graph.node_mut(target).musts.extend(new_musts);
        for index in start..ctx.graph.node(target).musts.len() {
            load.enqueue(
                Pending::XPathSyntax {
                    node: target,
                    which: XPathWhich::Must(index),
                },
                refine.span(),
            );
        }
    }
    if !refine.if_features.is_empty() {
        let env = BuildEnv {
            module: inst_module,
            origin_module,
            origin_doc,
            in_grouping: false,
            in_rpc: false,
            origin_chain: Vec::new(),
        };
        let bound = builder::bind_if_features(ctx, &env, &refine.if_features)?;
        ctx.graph.node_mut(target).if_features.extend(bound);
    }
    Ok(())
}

fn schedule_copied_node(ctx: &Context, load: &mut Load, id: NodeId) {
    let node = ctx.graph.node(id);
    let span = node.span;
    match &node.kind {
        NodeKind::Leaf(leaf) => {
            if matches!(leaf.ty, TypeSlot::Unresolved(_)) {
                load.enqueue(Pending::TypeDer { node: id }, span);
            }
        }
        NodeKind::LeafList(leaf_list) => {
            if matches!(leaf_list.ty, TypeSlot::Unresolved(_)) {
                load.enqueue(Pending::TypeDer { node: id }, span);
            }
        }
        NodeKind::List(list) => {
            if !list.key_names.is_empty() {
                load.enqueue(Pending::ListKeys { node: id }, span);
            }
            if !list.uniques.is_empty() {
                load.enqueue(Pending::ListUnique { node: id }, span);
            }
        }
        NodeKind::Choice(choice) => {
            if choice.default_name.is_some() && choice.default_case.is_none() {
                load.enqueue(Pending::ChoiceDefault { node: id }, span);
            }
        }
        NodeKind::Uses(_) => load.enqueue(Pending::Uses { node: id }, span),
        _ => {}
    }
    if node.when.as_ref().map(|w| w.ast.is_none()).unwrap_or(false) {
        load.enqueue(
            Pending::XPathSyntax {
                node: id,
                which: XPathWhich::When,
            },
            span,
        );
    }
    for (index, must) in node.musts.iter().enumerate() {
        if must.ast.is_none() {
            load.enqueue(
                Pending::XPathSyntax {
                    node: id,
                    which: XPathWhich::Must(index),
                },
                span,
            );
        }
    }
    for index in 0..node.extensions.len() {
        if node.extensions[index].def.is_none() {
            load.enqueue(
                Pending::Extension {
                    node: Some(id),
                    index,
                },
                span,
            );
        }
    }
}
