//! Deviation application.
//!
//! Runs strictly after the unresolved queue drains, in module-load order.
//! Each target is snapshotted before its first deviate so diagnostics can
//! show the original subtree; re-resolution work caused by a deviate
//! (a replaced type, a new default or must) goes back onto the queue and
//! the caller drains it once more.

use super::augment::walk_schema_path;
use super::resolve::{Load, Pending, XPathWhich};
use super::uses::reinherit_config;
use super::*;
use crate::ast::DeviateKind;
use crate::diagnostics::{Diagnostic, DiagnosticData};
use crate::Context;
use crate::ParseOptions;

pub(crate) fn apply_all(ctx: &mut Context, load: &mut Load) -> Result<(), Diagnostic> {
    if load.options.contains(ParseOptions::DISABLE_DEVIATIONS) {
        return Ok(());
    }
    for index in 0..ctx.modules[load.module].deviations.len() {
        let deviation = ctx.modules[load.module].deviations[index].clone();
        apply_one(ctx, load, index, &deviation)?;
    }
    Ok(())
}

fn apply_one(
    ctx: &mut Context,
    load: &mut Load,
    index: usize,
    deviation: &Deviation,
) -> Result<(), Diagnostic> {
    let bad = |message: String| {
        Diagnostic::error(DiagnosticData::BadDeviation {
            target: deviation.target_str.clone(),
            message,
        })
        .with_span(deviation.span)
    };

    let target = walk_schema_path(ctx, load.module, &deviation.target, None)
        .map_err(|message| bad(message))?;
    let target_module = ctx.graph.node(target).module;

    // Keep a detached copy of the original subtree for diagnostics.
    let original = snapshot_subtree(ctx, load, target);
    {
        let deviation = &mut ctx.modules[load.module].deviations[index];
        deviation.resolved = Some(target);
        deviation.original = Some(original);
    }

    for deviate in &deviation.deviates {
        match deviate.kind {
            DeviateKind::NotSupported => {
                if deviation.deviates.len() != 1 {
                    return Err(bad(
                        "deviate not-supported must be the only deviate of its target".to_owned(),
                    ));
                }
                if ctx.graph.node(target).is_key() {
                    return Err(bad("a list key cannot be removed".to_owned()));
                }
                unlink(ctx, load, target);
            }
            DeviateKind::Add => apply_add(ctx, load, target, deviate, &bad)?,
            DeviateKind::Replace => apply_replace(ctx, load, target, deviate, &bad)?,
            DeviateKind::Delete => apply_delete(ctx, load, target, deviate, &bad)?,
        }
    }

    ctx.graph.node_mut(target).flags.insert(NodeFlags::DEVIATED);
    load.journal_module_flags(ctx, target_module);
    ctx.modules[target_module].deviated = true;
    ctx.modules[load.module].implemented = true;
    Ok(())
}

/// Clones a subtree into detached nodes, preserving each node's module.
fn snapshot_subtree(ctx: &mut Context, load: &mut Load, root: NodeId) -> NodeId {
    let mut node = ctx.graph.node(root).clone();
    node.parent = None;
    let children = std::mem::take(&mut node.children);
    let id = ctx.graph.alloc(node);
    load.undo.created.push(id);
    for child in children {
        let copied = snapshot_subtree(ctx, load, child);
        ctx.graph.node_mut(copied).parent = Some(id);
        ctx.graph.node_mut(id).children.push(copied);
    }
    id
}

/// Journals a pre-existing node before its first mutation.
fn journal_node(ctx: &Context, load: &mut Load, id: NodeId) {
    if load.undo.created.contains(&id) {
        return;
    }
    if load.undo.node_snapshots.iter().any(|(n, _)| *n == id) {
        return;
    }
    load.undo
        .node_snapshots
        .push((id, Box::new(ctx.graph.node(id).clone())));
}

fn unlink(ctx: &mut Context, load: &mut Load, target: NodeId) {
    match ctx.graph.node(target).parent {
        Some(parent) => {
            journal_node(ctx, load, parent);
            ctx.graph.node_mut(parent).children.retain(|&c| c != target);
        }
        None => {
            let module = ctx.graph.node(target).module;
            if let Some(pos) = ctx.modules[module].children.iter().position(|&c| c == target) {
                ctx.modules[module].children.remove(pos);
                load.undo.module_children_removed.push((module, pos, target));
            }
        }
    }
}

fn apply_add(
    ctx: &mut Context,
    load: &mut Load,
    target: NodeId,
    deviate: &Node<ast::DeviateStmt>,
    bad: &impl Fn(String) -> Diagnostic,
) -> Result<(), Diagnostic> {
    journal_node(ctx, load, target);
    if deviate.ty.is_some() {
        return Err(bad("a type can only be replaced, not added".to_owned()));
    }
    if let Some(units) = &deviate.units {
        let slot = units_slot(ctx, target, bad)?;
        if slot.is_some() {
            return Err(bad("the target already has units".to_owned()));
        }
        set_units(ctx, target, Some(units.clone()));
    }
    if !deviate.defaults.is_empty() {
        add_defaults(ctx, load, target, &deviate.defaults, deviate.span(), bad)?;
    }
    if let Some(config) = deviate.config {
        if ctx
            .graph
            .node(target)
            .flags
            .contains(NodeFlags::CONFIG_EXPLICIT)
        {
            return Err(bad("the target already has an explicit config".to_owned()));
        }
        set_config(ctx, load, target, config);
    }
    if let Some(mandatory) = deviate.mandatory {
        if ctx.graph.node(target).mandatory() {
            return Err(bad("the target is already mandatory".to_owned()));
        }
        ctx.graph
            .node_mut(target)
            .flags
            .set(NodeFlags::MANDATORY, mandatory);
    }
    if let Some(min) = deviate.min_elements {
        set_min_elements(ctx, target, min, bad)?;
    }
    if let Some(max) = deviate.max_elements {
        set_max_elements(ctx, target, max, bad)?;
    }
    add_musts(ctx, load, target, &deviate.musts);
    add_uniques(ctx, load, target, &deviate.uniques, deviate.span(), bad)?;
    Ok(())
}

fn apply_replace(
    ctx: &mut Context,
    load: &mut Load,
    target: NodeId,
    deviate: &Node<ast::DeviateStmt>,
    bad: &impl Fn(String) -> Diagnostic,
) -> Result<(), Diagnostic> {
    journal_node(ctx, load, target);
    if let Some(ty) = &deviate.ty {
        replace_type(ctx, load, target, ty, bad)?;
    }
    if let Some(units) = &deviate.units {
        let slot = units_slot(ctx, target, bad)?;
        if slot.is_none() {
            return Err(bad("the target has no units to replace".to_owned()));
        }
        set_units(ctx, target, Some(units.clone()));
    }
    if !deviate.defaults.is_empty() {
        let node = ctx.graph.node(target);
        let exists = match &node.kind {
            NodeKind::Leaf(leaf) => leaf.default.is_some(),
            NodeKind::LeafList(leaf_list) => !leaf_list.defaults.is_empty(),
            NodeKind::Choice(choice) => choice.default_name.is_some(),
            _ => return Err(bad("the target kind takes no default".to_owned())),
        };
        if !exists {
            return Err(bad("the target has no default to replace".to_owned()));
        }
        clear_defaults(ctx, target);
        add_defaults(ctx, load, target, &deviate.defaults, deviate.span(), bad)?;
    }
    if let Some(config) = deviate.config {
        set_config(ctx, load, target, config);
    }
    if let Some(mandatory) = deviate.mandatory {
        ctx.graph
            .node_mut(target)
            .flags
            .set(NodeFlags::MANDATORY, mandatory);
    }
    if let Some(min) = deviate.min_elements {
        set_min_elements(ctx, target, min, bad)?;
    }
    if let Some(max) = deviate.max_elements {
        set_max_elements(ctx, target, max, bad)?;
    }
    if !deviate.musts.is_empty() || !deviate.uniques.is_empty() {
        return Err(bad("must and unique can only be added or deleted".to_owned()));
    }
    Ok(())
}

fn apply_delete(
    ctx: &mut Context,
    load: &mut Load,
    target: NodeId,
    deviate: &Node<ast::DeviateStmt>,
    bad: &impl Fn(String) -> Diagnostic,
) -> Result<(), Diagnostic> {
    journal_node(ctx, load, target);
    if deviate.ty.is_some() || deviate.config.is_some() || deviate.mandatory.is_some() {
        return Err(bad("this property cannot be deleted".to_owned()));
    }
    if let Some(units) = &deviate.units {
        let slot = units_slot(ctx, target, bad)?;
        if slot != Some(units.clone()) {
            return Err(bad(format!("the target has no units `{units}`")));
        }
        set_units(ctx, target, None);
    }
    for default in &deviate.defaults {
        let node = ctx.graph.node_mut(target);
        let removed = match &mut node.kind {
            NodeKind::Leaf(leaf) => {
                if leaf.default.as_deref() == Some(default.as_str()) {
                    leaf.default = None;
                    true
                } else {
                    false
                }
            }
            NodeKind::LeafList(leaf_list) => {
                let before = leaf_list.defaults.len();
                leaf_list.defaults.retain(|d| d != default);
                leaf_list.defaults.len() != before
            }
            NodeKind::Choice(choice) => {
                if choice.default_name.as_ref().map(|n| n.as_str()) == Some(default.as_str()) {
                    choice.default_name = None;
                    choice.default_case = None;
                    true
                } else {
                    false
                }
            }
            _ => false,
        };
        if !removed {
            return Err(bad(format!("the target has no default `{default}`")));
        }
    }
    for must in &deviate.musts {
        let node = ctx.graph.node_mut(target);
        let before = node.musts.len();
        node.musts.retain(|m| m.source != must.condition);
        if node.musts.len() == before {
            return Err(bad(format!("the target has no must `{}`", must.condition)));
        }
    }
    for unique in &deviate.uniques {
        let source = unique.paths.join(" ");
        let removed = match &mut ctx.graph.node_mut(target).kind {
            NodeKind::List(list) => {
                let before = list.uniques.len();
                list.uniques.retain(|u| u.source != source);
                list.uniques.len() != before
            }
            _ => return Err(bad("only a list has unique constraints".to_owned())),
        };
        if !removed {
            return Err(bad(format!("the target has no unique `{source}`")));
        }
    }
    Ok(())
}

fn units_slot(
    ctx: &Context,
    target: NodeId,
    bad: &impl Fn(String) -> Diagnostic,
) -> Result<Option<String>, Diagnostic> {
    match &ctx.graph.node(target).kind {
        NodeKind::Leaf(leaf) => Ok(leaf.units.clone()),
        NodeKind::LeafList(leaf_list) => Ok(leaf_list.units.clone()),
        _ => Err(bad("the target kind takes no units".to_owned())),
    }
}

fn set_units(ctx: &mut Context, target: NodeId, units: Option<String>) {
    match &mut ctx.graph.node_mut(target).kind {
        NodeKind::Leaf(leaf) => leaf.units = units,
        NodeKind::LeafList(leaf_list) => leaf_list.units = units,
        _ => {}
    }
}

fn add_defaults(
    ctx: &mut Context,
    load: &mut Load,
    target: NodeId,
    defaults: &[String],
    span: Option<SourceSpan>,
    bad: &impl Fn(String) -> Diagnostic,
) -> Result<(), Diagnostic> {
    match &ctx.graph.node(target).kind {
        NodeKind::Leaf(leaf) => {
            if defaults.len() > 1 {
                return Err(bad("a leaf takes a single default".to_owned()));
            }
            if leaf.default.is_some() {
                return Err(bad("the target already has a default".to_owned()));
            }
            if let NodeKind::Leaf(leaf) = &mut ctx.graph.node_mut(target).kind {
                leaf.default = Some(defaults[0].clone());
            }
            load.enqueue(Pending::LeafDefault { node: target }, span);
        }
        NodeKind::LeafList(_) => {
            if let NodeKind::LeafList(leaf_list) = &mut ctx.graph.node_mut(target).kind {
                leaf_list.defaults.extend(defaults.iter().cloned());
            }
            load.enqueue(Pending::LeafDefault { node: target }, span);
        }
        NodeKind::Choice(choice) => {
            if defaults.len() > 1 {
                return Err(bad("a choice takes a single default case".to_owned()));
            }
            if choice.default_name.is_some() {
                return Err(bad("the target already has a default case".to_owned()));
            }
            let interned = ctx.dict.insert(&defaults[0]);
            if let NodeKind::Choice(choice) = &mut ctx.graph.node_mut(target).kind {
                choice.default_name = Some(interned);
                choice.default_case = None;
            }
            load.enqueue(Pending::ChoiceDefault { node: target }, span);
        }
        _ => return Err(bad("the target kind takes no default".to_owned())),
    }
    Ok(())
}

fn clear_defaults(ctx: &mut Context, target: NodeId) {
    match &mut ctx.graph.node_mut(target).kind {
        NodeKind::Leaf(leaf) => leaf.default = None,
        NodeKind::LeafList(leaf_list) => leaf_list.defaults.clear(),
        NodeKind::Choice(choice) => {
            choice.default_name = None;
            choice.default_case = None;
        }
        _ => {}
    }
}

fn set_config(ctx: &mut Context, load: &mut Load, target: NodeId, config: bool) {
    // The whole subtree re-inherits, so journal it before flipping.
    for id in ctx.graph.subtree(target) {
        journal_node(ctx, load, id);
    }
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

fn set_min_elements(
    ctx: &mut Context,
    target: NodeId,
    min: u32,
    bad: &impl Fn(String) -> Diagnostic,
) -> Result<(), Diagnostic> {
    match &mut ctx.graph.node_mut(target).kind {
        NodeKind::List(list) => list.min_elements = min,
        NodeKind::LeafList(leaf_list) => leaf_list.min_elements = min,
        _ => return Err(bad("the target kind takes no min-elements".to_owned())),
    }
    Ok(())
}

fn set_max_elements(
    ctx: &mut Context,
    target: NodeId,
    max: ast::MaxElements,
    bad: &impl Fn(String) -> Diagnostic,
) -> Result<(), Diagnostic> {
    let max = match max {
        ast::MaxElements::Unbounded => None,
        ast::MaxElements::Count(count) => Some(count),
    };
    match &mut ctx.graph.node_mut(target).kind {
        NodeKind::List(list) => list.max_elements = max,
        NodeKind::LeafList(leaf_list) => leaf_list.max_elements = max,
        _ => return Err(bad("the target kind takes no max-elements".to_owned())),
    }
    Ok(())
}

fn add_musts(ctx: &mut Context, load: &mut Load, target: NodeId, musts: &[Node<ast::MustStmt>]) {
    let start = ctx.graph.node(target).musts.len();
    let new_musts: Vec<Must> = musts
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
        let span = ctx.graph.node(target).musts[index].span;
        load.enqueue(
            Pending::XPathSyntax {
                node: target,
                which: XPathWhich::Must(index),
            },
            span,
        );
    }
}

fn add_uniques(
    ctx: &mut Context,
    load: &mut Load,
    target: NodeId,
    uniques: &[Node<ast::UniqueStmt>],
    span: Option<SourceSpan>,
    bad: &impl Fn(String) -> Diagnostic,
) -> Result<(), Diagnostic> {
    if uniques.is_empty() {
        return Ok(());
    }
    if !matches!(ctx.graph.node(target).kind, NodeKind::List(_)) {
        return Err(bad("only a list takes unique constraints".to_owned()));
    }
    let deviating = load.module;
    let mut parsed = Vec::new();
    for unique in uniques {
        let mut parts = Vec::new();
        for part in &unique.paths {
            let path = {
                let modules = &ctx.modules;
                crate::path::parse_schema_path(
                    part,
                    false,
                    |prefix| modules[deviating].resolve_prefix(0, prefix),
                    &mut ctx.dict,
                )
                .map_err(|message| bad(message))?
            };
            parts.push(path);
        }
        parsed.push(Unique {
            source: unique.paths.join(" "),
            parts,
            resolved: Vec::new(),
        });
    }
    if let NodeKind::List(list) = &mut ctx.graph.node_mut(target).kind {
        list.uniques.extend(parsed);
    }
    load.enqueue(Pending::ListUnique { node: target }, span);
    Ok(())
}

fn replace_type(
    ctx: &mut Context,
    load: &mut Load,
    target: NodeId,
    ty: &Node<ast::TypeStmt>,
    bad: &impl Fn(String) -> Diagnostic,
) -> Result<(), Diagnostic> {
    let slot = TypeSlot::Unresolved(ty.clone());
    {
        let node = ctx.graph.node_mut(target);
        match &mut node.kind {
            NodeKind::Leaf(leaf) => leaf.ty = slot,
            NodeKind::LeafList(leaf_list) => leaf_list.ty = slot,
            _ => return Err(bad("the target kind takes no type".to_owned())),
        }
        // Names in the replacement type resolve against the deviating
        // module's document.
        node.origin_module = load.module;
        node.origin_doc = 0;
    }
    load.enqueue(Pending::TypeDer { node: target }, ty.span());
    Ok(())
}
