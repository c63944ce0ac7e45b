//! Final semantic checks over a freshly loaded module.
//!
//! Runs after the queue has drained and deviations were applied, so it
//! sees the tree a reader will see. Skipped entirely under the trusted
//! parse option.

use super::resolve::first_mandatory_in_case;
use super::uses::in_rpc_region;
use super::*;
use crate::diagnostics::{Diagnostic, DiagnosticData};
use crate::types::TypeKind;
use crate::Context;

pub(crate) fn check(ctx: &Context, load_module: ModuleId) -> Result<(), Diagnostic> {
    let mut roots: Vec<NodeId> = ctx.modules[load_module].children.clone();
    for &augment_id in &ctx.modules[load_module].augments {
        if let NodeKind::Augment(augment) = &ctx.graph.node(augment_id).kind {
            if augment.resolved.is_some() {
                // The spliced children live under a foreign parent now.
                roots.extend(ctx.graph.node(augment_id).children.iter().copied());
            }
        }
    }
    for deviation in &ctx.modules[load_module].deviations {
        if let Some(target) = deviation.resolved {
            if ctx.graph.contains(target) {
                roots.push(target);
            }
        }
    }

    check_sibling_names(ctx, &ctx.modules[load_module].children, None)?;
    for &root in &roots {
        if !ctx.graph.contains(root) {
            continue;
        }
        for id in ctx.graph.subtree(root) {
            check_node(ctx, id)?;
        }
    }
    Ok(())
}

fn check_node(ctx: &Context, id: NodeId) -> Result<(), Diagnostic> {
    let node = ctx.graph.node(id);
    let rpc_region = in_rpc_region(ctx, Some(id));

    // Config must narrow monotonically: rw under ro is an error.
    if !rpc_region {
        if let Some(parent) = node.parent {
            let parent_node = ctx.graph.node(parent);
            if parent_node.flags.contains(NodeFlags::CONFIG_FALSE)
                && !node.flags.contains(NodeFlags::CONFIG_FALSE)
            {
                return Err(Diagnostic::error(DiagnosticData::ConfigWUnderR {
                    node: ctx.graph.path_string(id, &ctx.modules),
                    parent: ctx.graph.path_string(parent, &ctx.modules),
                })
                .with_span(node.span));
            }
        }
    }

    check_sibling_names(ctx, &node.children, Some(id))?;

    for if_feature in &node.if_features {
        let mut refs = Vec::new();
        super::resolve::collect_feature_refs(&if_feature.expr, &mut refs);
        for sym in refs {
            if ctx.modules[sym.module].features.get(sym.name.as_str()).is_none() {
                return Err(Diagnostic::error(DiagnosticData::UnresolvedReference {
                    kind: "feature",
                    name: format!("{}:{}", ctx.modules[sym.module].name, sym.name),
                })
                .with_span(node.span));
            }
        }
    }

    match &node.kind {
        NodeKind::List(list) => {
            if !node.flags.contains(NodeFlags::CONFIG_FALSE)
                && !rpc_region
                && list.key_names.is_empty()
            {
                return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                    keyword: "key",
                    parent: ctx.graph.path_string(id, &ctx.modules),
                })
                .with_span(node.span));
            }
            if let Some(max) = list.max_elements {
                if list.min_elements > max {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "min-elements".to_owned(),
                        message: format!(
                            "min-elements {} exceeds max-elements {max}",
                            list.min_elements
                        ),
                    })
                    .with_span(node.span));
                }
            }
        }
        NodeKind::LeafList(leaf_list) => {
            if let Some(max) = leaf_list.max_elements {
                if leaf_list.min_elements > max {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "min-elements".to_owned(),
                        message: format!(
                            "min-elements {} exceeds max-elements {max}",
                            leaf_list.min_elements
                        ),
                    })
                    .with_span(node.span));
                }
            }
        }
        NodeKind::Leaf(leaf) => {
            if node.mandatory() && leaf.default.is_some() {
                return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                    keyword: "default".to_owned(),
                    message: "a mandatory leaf cannot have a default".to_owned(),
                })
                .with_span(node.span));
            }
            if node.is_key() && leaf.default.is_some() {
                return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                    keyword: "default".to_owned(),
                    message: "a list key cannot have a default".to_owned(),
                })
                .with_span(node.span));
            }
            if let TypeSlot::Resolved(ty) = &leaf.ty {
                check_leafref_targets(ctx, id, ty)?;
            }
        }
        NodeKind::Choice(choice) => {
            if node.mandatory() && choice.default_name.is_some() {
                return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                    keyword: "choice".to_owned(),
                    message: "a mandatory choice cannot have a default case".to_owned(),
                })
                .with_span(node.span));
            }
            if let Some(case) = choice.default_case {
                if let Some(offender) = first_mandatory_in_case(ctx, case) {
                    return Err(Diagnostic::error(
                        DiagnosticData::MandatoryUnderDefaultCase {
                            node: ctx.graph.path_string(offender, &ctx.modules),
                            case: ctx.graph.node(case).name.to_string(),
                        },
                    )
                    .with_span(node.span));
                }
            }
        }
        _ => {}
    }
    if let NodeKind::LeafList(leaf_list) = &node.kind {
        if let TypeSlot::Resolved(ty) = &leaf_list.ty {
            check_leafref_targets(ctx, id, ty)?;
        }
    }
    Ok(())
}

/// Resolved leafrefs must still point at linked leafs; a deviation may
/// have removed the target after resolution.
fn check_leafref_targets(
    ctx: &Context,
    _node: NodeId,
    ty: &crate::types::Type,
) -> Result<(), Diagnostic> {
    match &ty.kind {
        TypeKind::Leafref { path, target, .. } => {
            if let Some(&target) = target.get() {
                if !ctx.graph.contains(target) || !is_linked(ctx, target) {
                    return Err(Diagnostic::error(DiagnosticData::BadLeafrefPath {
                        path: path.source.clone(),
                        message: "the target node was removed from the schema".to_owned(),
                    }));
                }
            }
            Ok(())
        }
        TypeKind::Union { members, .. } => {
            for member in members {
                check_leafref_targets(ctx, _node, member)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Whether the node is reachable from its module's top level.
fn is_linked(ctx: &Context, id: NodeId) -> bool {
    let mut current = id;
    loop {
        if !ctx.graph.contains(current) {
            return false;
        }
        let node = ctx.graph.node(current);
        match node.parent {
            Some(parent) => {
                if !ctx.graph.contains(parent)
                    || !ctx.graph.node(parent).children.contains(&current)
                {
                    return false;
                }
                current = parent;
            }
            None => {
                return ctx.modules[node.module].children.contains(&current);
            }
        }
    }
}

/// Sibling data nodes must have unique names within their module; the
/// check sees through choice and case levels, which share their parent's
/// namespace.
fn check_sibling_names(
    ctx: &Context,
    children: &[NodeId],
    parent: Option<NodeId>,
) -> Result<(), Diagnostic> {
    let mut seen: Vec<(Ident, ModuleId)> = Vec::new();
    collect_visible(ctx, children, &mut seen, parent)
}

fn collect_visible(
    ctx: &Context,
    children: &[NodeId],
    seen: &mut Vec<(Ident, ModuleId)>,
    parent: Option<NodeId>,
) -> Result<(), Diagnostic> {
    for &child in children {
        let node = ctx.graph.node(child);
        match node.kind {
            NodeKind::Choice(_) => {
                record(seen, node)?;
                // Case names only need to be unique within their choice;
                // the nodes inside them share the outer namespace.
                let mut case_names: Vec<(Ident, ModuleId)> = Vec::new();
                for &case in &node.children {
                    let case_node = ctx.graph.node(case);
                    if matches!(case_node.kind, NodeKind::Case) {
                        record(&mut case_names, case_node)?;
                    }
                    collect_visible(ctx, &case_node.children, seen, parent)?;
                }
            }
            NodeKind::Case => {
                collect_visible(ctx, &node.children, seen, parent)?;
            }
            NodeKind::Uses(_) | NodeKind::Grouping | NodeKind::Augment(_) => {}
            _ => record(seen, node)?,
        }
    }
    Ok(())
}

fn record(seen: &mut Vec<(Ident, ModuleId)>, node: &SchemaNode) -> Result<(), Diagnostic> {
    let key = (node.name.clone(), node.module);
    if seen.contains(&key) {
        return Err(Diagnostic::error(DiagnosticData::Duplicate {
            what: "node".to_owned(),
            name: Some(node.name.to_string()),
        })
        .with_span(node.span));
    }
    seen.push(key);
    Ok(())
}
