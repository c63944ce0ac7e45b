//! Augment splicing.
//!
//! An augment node's children are re-parented under the resolved target;
//! the augment node itself stays behind as a bookkeeping record. Targets
//! are schema-node paths, so choice and case levels are named explicitly,
//! unlike in leafref paths.

use super::resolve::{Load, Outcome, Pending};
use super::uses::{in_rpc_region, reinherit_config, reinherit_status};
use super::*;
use crate::diagnostics::{Diagnostic, DiagnosticData};
use crate::Context;

pub(crate) fn apply(
    ctx: &mut Context,
    load: &mut Load,
    augment_id: NodeId,
    span: Option<SourceSpan>,
) -> Result<Outcome, Diagnostic> {
    let (target_path, target_str, anchor, children, self_module) = {
        let node = ctx.graph.node(augment_id);
        let NodeKind::Augment(augment) = &node.kind else {
            return Ok(Outcome::Done);
        };
        if augment.resolved.is_some() {
            return Ok(Outcome::Done);
        }
        (
            augment.target.clone(),
            augment.target_str.clone(),
            augment.anchor,
            node.children.clone(),
            node.module,
        )
    };

    let target = match walk_schema_path(ctx, self_module, &target_path, anchor) {
        Ok(target) => target,
        Err(_) if has_other_structural(load) => return Ok(Outcome::Blocked),
        Err(message) => {
            return Err(Diagnostic::error(DiagnosticData::UnresolvedReference {
                kind: "augment target",
                name: format!("{target_str} ({message})"),
            })
            .with_span(span))
        }
    };

    let target_node = ctx.graph.node(target);
    let target_is_choice = matches!(target_node.kind, NodeKind::Choice(_));
    if !matches!(
        target_node.kind,
        NodeKind::Container(_)
            | NodeKind::List(_)
            | NodeKind::Choice(_)
            | NodeKind::Case
            | NodeKind::Input
            | NodeKind::Output
            | NodeKind::Notification
    ) {
        return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "augment".to_owned(),
            message: format!("a {} cannot be augmented", target_node.kind.keyword()),
        })
        .with_span(span));
    }

    // Keys of a list target cannot appear among the augmented children.
    if let NodeKind::List(list) = &target_node.kind {
        let key_names: Vec<Ident> = list.key_names.iter().map(|k| k.name.clone()).collect();
        for &child in &children {
            let child_name = &ctx.graph.node(child).name;
            if key_names.iter().any(|k| k == child_name) {
                return Err(Diagnostic::error(DiagnosticData::KeyInList {
                    list: ctx.graph.node(target).name.to_string(),
                    key: child_name.to_string(),
                    action: "augmented",
                })
                .with_span(span));
            }
        }
    }

    for &child in &children {
        let child_name = ctx.graph.node(child).name.clone();
        let dup = ctx.graph.node(target).children.iter().any(|&c| {
            let existing = ctx.graph.node(c);
            existing.name == child_name && existing.module == self_module
        });
        if dup {
            return Err(Diagnostic::error(DiagnosticData::Duplicate {
                what: "node".to_owned(),
                name: Some(child_name.to_string()),
            })
            .with_span(span));
        }
    }

    let rpc_region = in_rpc_region(ctx, Some(target));
    let target_config_false = ctx
        .graph
        .node(target)
        .flags
        .contains(NodeFlags::CONFIG_FALSE);
    let target_status = ctx.graph.node(target).status;
    let target_module = ctx.graph.node(target).module;

    for &child in &children {
        // Augmenting a choice with a bare data node materializes an
        // implicit case around it.
        let spliced = if target_is_choice && !matches!(ctx.graph.node(child).kind, NodeKind::Case)
        {
            let name = ctx.graph.node(child).name.clone();
            let case = ctx.graph.alloc(SchemaNode {
                name,
                module: self_module,
                origin_module: ctx.graph.node(child).origin_module,
                origin_doc: ctx.graph.node(child).origin_doc,
                parent: Some(target),
                children: vec![child],
                kind: NodeKind::Case,
                flags: NodeFlags::IMPLICIT,
                status: ctx.graph.node(child).status,
                description: None,
                reference: None,
                when: None,
                musts: Vec::new(),
                if_features: Vec::new(),
                typedefs: IndexMap::default(),
                groupings: IndexMap::default(),
                extensions: Vec::new(),
                span: ctx.graph.node(child).span,
            });
            load.undo.created.push(case);
            ctx.graph.node_mut(child).parent = Some(case);
            case
        } else {
            ctx.graph.node_mut(child).parent = Some(target);
            child
        };
        ctx.graph.node_mut(target).children.push(spliced);
        load.undo.spliced.push((target, spliced));

        if !rpc_region {
            reinherit_config(ctx, spliced, target_config_false);
        }
        reinherit_status(ctx, load, spliced, target_status)?;
    }

    if let NodeKind::Augment(augment) = &mut ctx.graph.node_mut(augment_id).kind {
        augment.resolved = Some(target);
    }

    if target_module != load.module {
        load.enqueue(Pending::ModImplement { module: load.module }, span);
    }
    Ok(Outcome::Done)
}

fn has_other_structural(load: &Load) -> bool {
    load.queue
        .iter()
        .any(|item| matches!(item.kind, Pending::Uses { .. } | Pending::Augment { .. }))
}

/// Walks a schema-node path. Steps name every schema level explicitly,
/// including choice, case, input, and output.
pub(crate) fn walk_schema_path(
    ctx: &Context,
    self_module: ModuleId,
    path: &crate::path::SchemaPath,
    anchor: Option<NodeId>,
) -> Result<NodeId, String> {
    let mut current: Option<NodeId> = if path.absolute { None } else { anchor };
    for step in &path.steps {
        let module = step.module.unwrap_or(self_module);
        let children: &[NodeId] = match current {
            Some(id) => &ctx.graph.node(id).children,
            None => &ctx.modules[module].children,
        };
        let found = children
            .iter()
            .copied()
            .find(|&c| {
                let node = ctx.graph.node(c);
                node.name == step.name && node.module == module && node.is_data()
            })
            .ok_or_else(|| format!("node `{}` not found", step.name))?;
        current = Some(found);
    }
    current.ok_or_else(|| "empty path".to_owned())
}
