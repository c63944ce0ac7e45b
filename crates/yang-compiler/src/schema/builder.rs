//! Lowering: typed statements to schema-graph nodes.
//!
//! The builder allocates nodes, links them to their parents, computes
//! config and status inheritance, binds prefixes against the defining
//! document, and enqueues an unresolved item for everything that needs the
//! whole graph: types, uses expansions, augment targets, list keys, choice
//! defaults, XPath syntax, extension bindings, defaults.

use super::resolve::{Load, Pending, XPathWhich};
use super::*;
use crate::diagnostics::{Diagnostic, DiagnosticData};
use crate::path;
use crate::Context;

/// Where statements are being lowered right now.
#[derive(Clone)]
pub(crate) struct BuildEnv {
    /// Module the nodes instantiate in.
    pub module: ModuleId,
    /// Document whose text is being lowered (prefix scope).
    pub origin_module: ModuleId,
    pub origin_doc: usize,
    /// Grouping bodies are templates: types stay unresolved and no
    /// structural items are enqueued for them.
    pub in_grouping: bool,
    /// Config is not applicable under rpc, action, and notification.
    pub in_rpc: bool,
    pub origin_chain: Vec<SymbolRef>,
}

impl BuildEnv {
    pub(crate) fn document(module: ModuleId, doc: usize) -> Self {
        Self {
            module,
            origin_module: module,
            origin_doc: doc,
            in_grouping: false,
            in_rpc: false,
            origin_chain: Vec::new(),
        }
    }
}

/// Lowers the body of one module or submodule document.
pub(crate) fn build_document_body(
    ctx: &mut Context,
    load: &mut Load,
    stmt: &ast::ModuleStmt,
    doc: usize,
) -> Result<(), Diagnostic> {
    let env = BuildEnv::document(load.module, doc);

    for instance in &stmt.extensions {
        let index = ctx.modules[load.module].extension_instances.len();
        let converted = convert_extension(instance);
        ctx.modules[load.module].extension_instances.push(converted);
        load.enqueue(Pending::Extension { node: None, index }, instance.span());
    }

    for body in &stmt.body {
        match body {
            ast::BodyStmt::Typedef(typedef) => {
                register_typedef(ctx, load, &env, None, typedef)?;
            }
            ast::BodyStmt::Grouping(grouping) => {
                let id = build_grouping(ctx, load, &env, None, grouping)?;
                let name = grouping.name.clone();
                let module = &mut ctx.modules[load.module];
                if module.groupings.insert(name.clone(), id).is_some() {
                    return Err(duplicate("grouping", &name, grouping.span()));
                }
            }
            ast::BodyStmt::Data(data) => {
                let id = build_data(ctx, load, &env, None, data)?;
                attach_top_level(ctx, load, id)?;
            }
            ast::BodyStmt::Rpc(rpc) => {
                let id = build_rpc(ctx, load, &env, None, rpc)?;
                attach_top_level(ctx, load, id)?;
            }
            ast::BodyStmt::Notification(notification) => {
                let id = build_notification(ctx, load, &env, None, notification)?;
                attach_top_level(ctx, load, id)?;
            }
            ast::BodyStmt::Augment(augment) => {
                let id = build_augment_node(ctx, load, &env, augment, false, None)?;
                ctx.modules[load.module].augments.push(id);
                load.enqueue(Pending::Augment { node: id }, augment.span());
            }
            ast::BodyStmt::Deviation(deviation) => {
                register_deviation(ctx, load, &env, deviation)?;
            }
            ast::BodyStmt::Extension(extension) => {
                let def = ExtensionDef {
                    name: extension.name.clone(),
                    argument: extension
                        .argument
                        .as_ref()
                        .map(|arg| (arg.name.clone(), arg.yin_element)),
                    status: extension.status.unwrap_or_default(),
                    description: extension.description.clone(),
                };
                let module = &mut ctx.modules[load.module];
                if module.extensions.insert(extension.name.clone(), def).is_some() {
                    return Err(duplicate("extension", &extension.name, extension.span()));
                }
            }
            ast::BodyStmt::Feature(feature) => {
                let if_features = bind_if_features(ctx, &env, &feature.if_features)?;
                let compiled = Feature {
                    name: feature.name.clone(),
                    if_features,
                    enabled: false,
                    status: feature.status.unwrap_or_default(),
                    span: feature.span(),
                };
                let module = &mut ctx.modules[load.module];
                if module.features.insert(feature.name.clone(), compiled).is_some() {
                    return Err(duplicate("feature", &feature.name, feature.span()));
                }
                load.enqueue(
                    Pending::Feature {
                        module: load.module,
                        name: feature.name.clone(),
                    },
                    feature.span(),
                );
            }
            ast::BodyStmt::Identity(identity) => {
                let mut bases = Vec::new();
                for base in &identity.bases {
                    bases.push(bind_symbol(ctx, &env, base)?);
                }
                let if_features = bind_if_features(ctx, &env, &identity.if_features)?;
                let compiled = Identity {
                    name: identity.name.clone(),
                    module: load.module,
                    bases,
                    derived: Vec::new(),
                    if_features,
                    status: identity.status.unwrap_or_default(),
                    span: identity.span(),
                };
                let module = &mut ctx.modules[load.module];
                if module.identities.insert(identity.name.clone(), compiled).is_some() {
                    return Err(duplicate("identity", &identity.name, identity.span()));
                }
                load.enqueue(
                    Pending::IdentityBase {
                        module: load.module,
                        name: identity.name.clone(),
                    },
                    identity.span(),
                );
            }
        }
    }
    Ok(())
}

fn attach_top_level(ctx: &mut Context, load: &mut Load, id: NodeId) -> Result<(), Diagnostic> {
    let name = ctx.graph.node(id).name.clone();
    let exists = ctx.modules[load.module]
        .children
        .iter()
        .any(|&c| ctx.graph.node(c).name == name);
    if exists {
        return Err(duplicate("node", &name, ctx.graph.node(id).span));
    }
    ctx.modules[load.module].children.push(id);
    Ok(())
}

fn duplicate(what: &str, name: &Ident, span: Option<SourceSpan>) -> Diagnostic {
    Diagnostic::error(DiagnosticData::Duplicate {
        what: what.to_owned(),
        name: Some(name.to_string()),
    })
    .with_span(span)
}

pub(crate) fn bind_symbol(
    ctx: &Context,
    env: &BuildEnv,
    name: &Node<QName>,
) -> Result<SymbolRef, Diagnostic> {
    let module = match &name.prefix {
        Some(prefix) => ctx.modules[env.origin_module]
            .resolve_prefix(env.origin_doc, prefix)
            .ok_or_else(|| {
                Diagnostic::error(DiagnosticData::UnresolvedReference {
                    kind: "prefix",
                    name: prefix.to_string(),
                })
                .with_span(name.span())
            })?,
        None => env.module,
    };
    Ok(SymbolRef {
        module,
        name: name.name.clone(),
    })
}

pub(crate) fn bind_if_features(
    ctx: &Context,
    env: &BuildEnv,
    stmts: &[Node<ast::IfFeatureStmt>],
) -> Result<Vec<IfFeature>, Diagnostic> {
    let mut out = Vec::new();
    for stmt in stmts {
        let expr = bind_feature_expr(ctx, env, &stmt.expr, stmt.span())?;
        out.push(IfFeature {
            source: stmt.source.clone(),
            expr,
        });
    }
    Ok(out)
}

fn bind_feature_expr(
    ctx: &Context,
    env: &BuildEnv,
    expr: &ast::FeatureExpr,
    span: Option<SourceSpan>,
) -> Result<IfFeatureExpr, Diagnostic> {
    Ok(match expr {
        ast::FeatureExpr::Ref(name) => {
            let module = match &name.prefix {
                Some(prefix) => ctx.modules[env.origin_module]
                    .resolve_prefix(env.origin_doc, prefix)
                    .ok_or_else(|| {
                        Diagnostic::error(DiagnosticData::UnresolvedReference {
                            kind: "prefix",
                            name: prefix.to_string(),
                        })
                        .with_span(span)
                    })?,
                None => env.module,
            };
            IfFeatureExpr::Ref(SymbolRef {
                module,
                name: name.name.clone(),
            })
        }
        ast::FeatureExpr::Not(inner) => {
            IfFeatureExpr::Not(Box::new(bind_feature_expr(ctx, env, inner, span)?))
        }
        ast::FeatureExpr::And(a, b) => IfFeatureExpr::And(
            Box::new(bind_feature_expr(ctx, env, a, span)?),
            Box::new(bind_feature_expr(ctx, env, b, span)?),
        ),
        ast::FeatureExpr::Or(a, b) => IfFeatureExpr::Or(
            Box::new(bind_feature_expr(ctx, env, a, span)?),
            Box::new(bind_feature_expr(ctx, env, b, span)?),
        ),
    })
}

fn make_when(stmt: &Option<Node<ast::WhenStmt>>) -> Option<WhenCond> {
    stmt.as_ref().map(|when| WhenCond {
        source: when.condition.clone(),
        ast: None,
        span: when.span(),
    })
}

fn make_musts(stmts: &[Node<ast::MustStmt>]) -> Vec<Must> {
    stmts
        .iter()
        .map(|must| Must {
            source: must.condition.clone(),
            ast: None,
            error_message: must.error_message.clone(),
            error_app_tag: must.error_app_tag.clone(),
            span: must.span(),
        })
        .collect()
}

fn convert_extension(stmt: &Node<ast::ExtensionInstanceStmt>) -> ExtensionInstance {
    ExtensionInstance {
        namespace: stmt.namespace.clone(),
        keyword: stmt.keyword.clone(),
        def: None,
        argument: stmt.argument.clone(),
        parent_keyword: stmt.parent_keyword,
        index: stmt.index,
        yin: stmt.yin.clone(),
        span: stmt.span(),
    }
}

struct NodeSeed<'a> {
    name: Ident,
    kind: NodeKind,
    span: Option<SourceSpan>,
    config: Option<bool>,
    status: Option<Status>,
    mandatory: Option<bool>,
    description: &'a Option<String>,
    reference: &'a Option<String>,
    when: &'a Option<Node<ast::WhenStmt>>,
    if_features: &'a [Node<ast::IfFeatureStmt>],
    musts: &'a [Node<ast::MustStmt>],
    extensions: &'a [Node<ast::ExtensionInstanceStmt>],
}

/// Allocates a node, applies the common substatements, links it under its
/// parent, and enqueues the always-deferred work (XPath, extensions).
fn materialize(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    seed: NodeSeed<'_>,
) -> Result<NodeId, Diagnostic> {
    let if_features = bind_if_features(ctx, env, seed.if_features)?;
    let mut flags = NodeFlags::empty();
    if seed.mandatory == Some(true) {
        flags.insert(NodeFlags::MANDATORY);
    }

    // Config: explicit wins, otherwise inherited from the parent; not
    // applicable under rpc and notification trees.
    if !env.in_rpc {
        match seed.config {
            Some(explicit) => {
                flags.insert(NodeFlags::CONFIG_EXPLICIT);
                if !explicit {
                    flags.insert(NodeFlags::CONFIG_FALSE);
                }
            }
            None => {
                let inherited_false = parent
                    .map(|p| ctx.graph.node(p).flags.contains(NodeFlags::CONFIG_FALSE))
                    .unwrap_or(false);
                if inherited_false {
                    flags.insert(NodeFlags::CONFIG_FALSE);
                }
            }
        }
    }

    let parent_status = parent.map(|p| ctx.graph.node(p).status).unwrap_or_default();
    let status = match seed.status {
        Some(explicit) => {
            flags.insert(NodeFlags::STATUS_EXPLICIT);
            if explicit < parent_status {
                return Err(Diagnostic::error(DiagnosticData::WidenedStatus {
                    name: seed.name.to_string(),
                    other: parent
                        .map(|p| ctx.graph.node(p).name.to_string())
                        .unwrap_or_default(),
                    message: format!(
                        "a {explicit} node cannot be a child of a {parent_status} node"
                    ),
                })
                .with_span(seed.span));
            }
            explicit
        }
        None => {
            if parent_status != Status::Current {
                load.warnings.push(
                    Diagnostic::warning(DiagnosticData::WidenedStatus {
                        name: seed.name.to_string(),
                        other: parent
                            .map(|p| ctx.graph.node(p).name.to_string())
                            .unwrap_or_default(),
                        message: format!("status {parent_status} is inherited from the parent"),
                    })
                    .with_span(seed.span),
                );
            }
            parent_status
        }
    };

    let node = SchemaNode {
        name: seed.name.clone(),
        module: env.module,
        origin_module: env.origin_module,
        origin_doc: env.origin_doc,
        parent,
        children: Vec::new(),
        kind: seed.kind,
        flags,
        status,
        description: seed.description.clone(),
        reference: seed.reference.clone(),
        when: make_when(seed.when),
        musts: make_musts(seed.musts),
        if_features,
        typedefs: IndexMap::default(),
        groupings: IndexMap::default(),
        extensions: seed.extensions.iter().map(convert_extension).collect(),
        span: seed.span,
    };
    let id = ctx.graph.alloc(node);
    load.undo.created.push(id);

    if let Some(parent) = parent {
        let dup = ctx
            .graph
            .node(parent)
            .children
            .iter()
            .any(|&c| ctx.graph.node(c).name == seed.name && ctx.graph.node(c).module == env.module);
        if dup {
            return Err(duplicate("node", &seed.name, seed.span));
        }
        ctx.graph.node_mut(parent).children.push(id);
    }

    if ctx.graph.node(id).when.is_some() {
        load.enqueue(
            Pending::XPathSyntax {
                node: id,
                which: XPathWhich::When,
            },
            seed.span,
        );
    }
    for index in 0..ctx.graph.node(id).musts.len() {
        load.enqueue(
            Pending::XPathSyntax {
                node: id,
                which: XPathWhich::Must(index),
            },
            seed.span,
        );
    }
    for index in 0..ctx.graph.node(id).extensions.len() {
        load.enqueue(
            Pending::Extension {
                node: Some(id),
                index,
            },
            seed.span,
        );
    }
    Ok(id)
}

pub(crate) fn build_data(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &ast::DataStmt,
) -> Result<NodeId, Diagnostic> {
    match stmt {
        ast::DataStmt::Container(container) => build_container(ctx, load, env, parent, container),
        ast::DataStmt::Leaf(leaf) => build_leaf(ctx, load, env, parent, leaf),
        ast::DataStmt::LeafList(leaf_list) => build_leaf_list(ctx, load, env, parent, leaf_list),
        ast::DataStmt::List(list) => build_list(ctx, load, env, parent, list),
        ast::DataStmt::Choice(choice) => build_choice(ctx, load, env, parent, choice),
        ast::DataStmt::Case(case) => build_case(ctx, load, env, parent, case),
        ast::DataStmt::AnyData(anydata) => {
            build_any(ctx, load, env, parent, anydata, NodeKind::AnyData)
        }
        ast::DataStmt::AnyXml(anyxml) => build_any(ctx, load, env, parent, anyxml, NodeKind::AnyXml),
        ast::DataStmt::Uses(uses) => build_uses(ctx, load, env, parent, uses),
    }
}

fn build_container(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::ContainerStmt>,
) -> Result<NodeId, Diagnostic> {
    let id = materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.name.clone(),
            kind: NodeKind::Container(ContainerNode {
                presence: stmt.presence.clone(),
            }),
            span: stmt.span(),
            config: stmt.config,
            status: stmt.status,
            mandatory: None,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &stmt.when,
            if_features: &stmt.if_features,
            musts: &stmt.musts,
            extensions: &stmt.extensions,
        },
    )?;
    register_scoped(ctx, load, env, id, &stmt.typedefs, &stmt.groupings)?;
    for child in &stmt.children {
        build_data(ctx, load, env, Some(id), child)?;
    }
    for action in &stmt.actions {
        build_rpc(ctx, load, env, Some(id), action)?;
    }
    for notification in &stmt.notifications {
        build_notification(ctx, load, env, Some(id), notification)?;
    }
    Ok(id)
}

fn build_leaf(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::LeafStmt>,
) -> Result<NodeId, Diagnostic> {
    if env.in_grouping {
        check_pattern_syntax(&stmt.ty)?;
    }
    let id = materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.name.clone(),
            kind: NodeKind::Leaf(LeafNode {
                ty: TypeSlot::Unresolved(stmt.ty.clone()),
                default: stmt.default.clone(),
                units: stmt.units.clone(),
            }),
            span: stmt.span(),
            config: stmt.config,
            status: stmt.status,
            mandatory: stmt.mandatory,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &stmt.when,
            if_features: &stmt.if_features,
            musts: &stmt.musts,
            extensions: &stmt.extensions,
        },
    )?;
    if !env.in_grouping {
        load.enqueue(Pending::TypeDer { node: id }, stmt.span());
    }
    Ok(id)
}

fn build_leaf_list(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::LeafListStmt>,
) -> Result<NodeId, Diagnostic> {
    if env.in_grouping {
        check_pattern_syntax(&stmt.ty)?;
    }
    let mut flags_user_ordered = false;
    if stmt.ordered_by == Some(ast::OrderedBy::User) {
        flags_user_ordered = true;
    }
    let id = materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.name.clone(),
            kind: NodeKind::LeafList(LeafListNode {
                ty: TypeSlot::Unresolved(stmt.ty.clone()),
                defaults: stmt.defaults.clone(),
                units: stmt.units.clone(),
                min_elements: stmt.min_elements.unwrap_or(0),
                max_elements: max_elements(stmt.max_elements),
            }),
            span: stmt.span(),
            config: stmt.config,
            status: stmt.status,
            mandatory: None,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &stmt.when,
            if_features: &stmt.if_features,
            musts: &stmt.musts,
            extensions: &stmt.extensions,
        },
    )?;
    if flags_user_ordered {
        ctx.graph.node_mut(id).flags.insert(NodeFlags::USER_ORDERED);
    }
    if !env.in_grouping {
        load.enqueue(Pending::TypeDer { node: id }, stmt.span());
    }
    Ok(id)
}

fn max_elements(stmt: Option<ast::MaxElements>) -> Option<u32> {
    match stmt {
        Some(ast::MaxElements::Count(count)) => Some(count),
        Some(ast::MaxElements::Unbounded) | None => None,
    }
}

fn build_list(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::ListStmt>,
) -> Result<NodeId, Diagnostic> {
    let mut key_names = Vec::new();
    if let Some(key) = &stmt.key {
        for name in &key.names {
            let module = match &name.prefix {
                Some(prefix) => Some(
                    ctx.modules[env.origin_module]
                        .resolve_prefix(env.origin_doc, prefix)
                        .ok_or_else(|| {
                            Diagnostic::error(DiagnosticData::UnresolvedReference {
                                kind: "prefix",
                                name: prefix.to_string(),
                            })
                            .with_span(key.span())
                        })?,
                ),
                None => None,
            };
            key_names.push(path::PathStep {
                module,
                name: name.name.clone(),
            });
        }
    }
    let mut uniques = Vec::new();
    for unique in &stmt.uniques {
        let mut parts = Vec::new();
        for part in &unique.paths {
            let parsed = parse_descendant_path(ctx, env, part, unique.span())?;
            parts.push(parsed);
        }
        uniques.push(Unique {
            source: unique.paths.join(" "),
            parts,
            resolved: Vec::new(),
        });
    }

    let has_keys = !key_names.is_empty();
    let has_uniques = !uniques.is_empty();
    let id = materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.name.clone(),
            kind: NodeKind::List(ListNode {
                key_names,
                keys: Vec::new(),
                uniques,
                min_elements: stmt.min_elements.unwrap_or(0),
                max_elements: max_elements(stmt.max_elements),
            }),
            span: stmt.span(),
            config: stmt.config,
            status: stmt.status,
            mandatory: None,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &stmt.when,
            if_features: &stmt.if_features,
            musts: &stmt.musts,
            extensions: &stmt.extensions,
        },
    )?;
    if stmt.ordered_by == Some(ast::OrderedBy::User) {
        ctx.graph.node_mut(id).flags.insert(NodeFlags::USER_ORDERED);
    }
    register_scoped(ctx, load, env, id, &stmt.typedefs, &stmt.groupings)?;
    for child in &stmt.children {
        build_data(ctx, load, env, Some(id), child)?;
    }
    for action in &stmt.actions {
        build_rpc(ctx, load, env, Some(id), action)?;
    }
    for notification in &stmt.notifications {
        build_notification(ctx, load, env, Some(id), notification)?;
    }
    if !env.in_grouping {
        if has_keys {
            load.enqueue(Pending::ListKeys { node: id }, stmt.span());
        }
        if has_uniques {
            load.enqueue(Pending::ListUnique { node: id }, stmt.span());
        }
    }
    Ok(id)
}

fn parse_descendant_path(
    ctx: &mut Context,
    env: &BuildEnv,
    source: &str,
    span: Option<SourceSpan>,
) -> Result<SchemaPath, Diagnostic> {
    let parsed = {
        let modules = &ctx.modules;
        path::parse_schema_path(
            source,
            false,
            |prefix| modules[env.origin_module].resolve_prefix(env.origin_doc, prefix),
            &mut ctx.dict,
        )
    };
    let parsed = parsed.map_err(|message| {
        Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "unique".to_owned(),
            message,
        })
        .with_span(span)
    })?;
    if parsed.absolute {
        return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "unique".to_owned(),
            message: "expected a descendant path".to_owned(),
        })
        .with_span(span));
    }
    Ok(parsed)
}

fn build_choice(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::ChoiceStmt>,
) -> Result<NodeId, Diagnostic> {
    let id = materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.name.clone(),
            kind: NodeKind::Choice(ChoiceNode {
                default_name: stmt.default.clone(),
                default_case: None,
            }),
            span: stmt.span(),
            config: stmt.config,
            status: stmt.status,
            mandatory: stmt.mandatory,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &stmt.when,
            if_features: &stmt.if_features,
            musts: &[],
            extensions: &stmt.extensions,
        },
    )?;
    for child in &stmt.children {
        build_choice_child(ctx, load, env, id, child)?;
    }
    if stmt.default.is_some() && !env.in_grouping {
        load.enqueue(Pending::ChoiceDefault { node: id }, stmt.span());
    }
    Ok(id)
}

/// A choice child that is not a case gets an implicit one named after it.
pub(crate) fn build_choice_child(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    choice: NodeId,
    stmt: &ast::DataStmt,
) -> Result<NodeId, Diagnostic> {
    if let ast::DataStmt::Case(case) = stmt {
        return build_case(ctx, load, env, Some(choice), case);
    }
    let name = data_stmt_name(stmt);
    let case_id = materialize(
        ctx,
        load,
        env,
        Some(choice),
        NodeSeed {
            name,
            kind: NodeKind::Case,
            span: None,
            config: None,
            status: None,
            mandatory: None,
            description: &None,
            reference: &None,
            when: &None,
            if_features: &[],
            musts: &[],
            extensions: &[],
        },
    )?;
    ctx.graph.node_mut(case_id).flags.insert(NodeFlags::IMPLICIT);
    build_data(ctx, load, env, Some(case_id), stmt)?;
    Ok(case_id)
}

fn data_stmt_name(stmt: &ast::DataStmt) -> Ident {
    match stmt {
        ast::DataStmt::Container(s) => s.name.clone(),
        ast::DataStmt::Leaf(s) => s.name.clone(),
        ast::DataStmt::LeafList(s) => s.name.clone(),
        ast::DataStmt::List(s) => s.name.clone(),
        ast::DataStmt::Choice(s) => s.name.clone(),
        ast::DataStmt::Case(s) => s.name.clone(),
        ast::DataStmt::AnyData(s) | ast::DataStmt::AnyXml(s) => s.name.clone(),
        ast::DataStmt::Uses(s) => s.grouping.name.clone(),
    }
}

fn build_case(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::CaseStmt>,
) -> Result<NodeId, Diagnostic> {
    let id = materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.name.clone(),
            kind: NodeKind::Case,
            span: stmt.span(),
            config: None,
            status: stmt.status,
            mandatory: None,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &stmt.when,
            if_features: &stmt.if_features,
            musts: &[],
            extensions: &stmt.extensions,
        },
    )?;
    for child in &stmt.children {
        build_data(ctx, load, env, Some(id), child)?;
    }
    Ok(id)
}

fn build_any(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::AnyDataStmt>,
    kind: NodeKind,
) -> Result<NodeId, Diagnostic> {
    materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.name.clone(),
            kind,
            span: stmt.span(),
            config: stmt.config,
            status: stmt.status,
            mandatory: stmt.mandatory,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &stmt.when,
            if_features: &stmt.if_features,
            musts: &stmt.musts,
            extensions: &stmt.extensions,
        },
    )
}

fn build_uses(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::UsesStmt>,
) -> Result<NodeId, Diagnostic> {
    let id = materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.grouping.name.clone(),
            kind: NodeKind::Uses(UsesNode {
                grouping: stmt.grouping.clone(),
                origin_chain: env.origin_chain.clone(),
                refines: stmt.refines.clone(),
                augments: stmt.augments.clone(),
            }),
            span: stmt.span(),
            config: None,
            status: stmt.status,
            mandatory: None,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &stmt.when,
            if_features: &stmt.if_features,
            musts: &[],
            extensions: &stmt.extensions,
        },
    )?;
    if !env.in_grouping {
        load.enqueue(Pending::Uses { node: id }, stmt.span());
    }
    Ok(id)
}

pub(crate) fn build_rpc(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::RpcStmt>,
) -> Result<NodeId, Diagnostic> {
    let kind = if stmt.is_action {
        NodeKind::Action
    } else {
        NodeKind::Rpc
    };
    let id = materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.name.clone(),
            kind,
            span: stmt.span(),
            config: None,
            status: stmt.status,
            mandatory: None,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &None,
            if_features: &stmt.if_features,
            musts: &[],
            extensions: &stmt.extensions,
        },
    )?;
    let rpc_env = BuildEnv {
        in_rpc: true,
        ..env.clone()
    };
    register_scoped(ctx, load, &rpc_env, id, &stmt.typedefs, &stmt.groupings)?;
    build_io(ctx, load, &rpc_env, id, stmt.input.as_ref(), false)?;
    build_io(ctx, load, &rpc_env, id, stmt.output.as_ref(), true)?;
    Ok(id)
}

/// Builds `input` or `output`, synthesizing an implicit empty one when the
/// statement is absent.
fn build_io(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    rpc: NodeId,
    stmt: Option<&Node<ast::IoStmt>>,
    output: bool,
) -> Result<NodeId, Diagnostic> {
    let kind = if output {
        NodeKind::Output
    } else {
        NodeKind::Input
    };
    let name = ctx.dict.insert(if output { "output" } else { "input" });
    let empty_musts: Vec<Node<ast::MustStmt>> = Vec::new();
    let id = materialize(
        ctx,
        load,
        env,
        Some(rpc),
        NodeSeed {
            name,
            kind,
            span: stmt.and_then(|s| s.span()),
            config: None,
            status: None,
            mandatory: None,
            description: &None,
            reference: &None,
            when: &None,
            if_features: &[],
            musts: stmt.map(|s| s.musts.as_slice()).unwrap_or(&empty_musts),
            extensions: stmt.map(|s| s.extensions.as_slice()).unwrap_or(&[]),
        },
    )?;
    match stmt {
        Some(stmt) => {
            register_scoped(ctx, load, env, id, &stmt.typedefs, &stmt.groupings)?;
            for child in &stmt.children {
                build_data(ctx, load, env, Some(id), child)?;
            }
        }
        None => {
            ctx.graph.node_mut(id).flags.insert(NodeFlags::IMPLICIT);
        }
    }
    Ok(id)
}

pub(crate) fn build_notification(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::NotificationStmt>,
) -> Result<NodeId, Diagnostic> {
    let id = materialize(
        ctx,
        load,
        env,
        parent,
        NodeSeed {
            name: stmt.name.clone(),
            kind: NodeKind::Notification,
            span: stmt.span(),
            config: None,
            status: stmt.status,
            mandatory: None,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &None,
            if_features: &stmt.if_features,
            musts: &stmt.musts,
            extensions: &stmt.extensions,
        },
    )?;
    let env = BuildEnv {
        in_rpc: true,
        ..env.clone()
    };
    register_scoped(ctx, load, &env, id, &stmt.typedefs, &stmt.groupings)?;
    for child in &stmt.children {
        build_data(ctx, load, &env, Some(id), child)?;
    }
    Ok(id)
}

pub(crate) fn build_grouping(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    parent: Option<NodeId>,
    stmt: &Node<ast::GroupingStmt>,
) -> Result<NodeId, Diagnostic> {
    let grouping_env = BuildEnv {
        in_grouping: true,
        ..env.clone()
    };
    let id = materialize(
        ctx,
        load,
        &grouping_env,
        None,
        NodeSeed {
            name: stmt.name.clone(),
            kind: NodeKind::Grouping,
            span: stmt.span(),
            config: None,
            status: stmt.status,
            mandatory: None,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &None,
            if_features: &[],
            musts: &[],
            extensions: &stmt.extensions,
        },
    )?;
    // Groupings hang off their lexical parent for scope walks, but are not
    // among its data children.
    ctx.graph.node_mut(id).parent = parent;
    register_scoped(ctx, load, &grouping_env, id, &stmt.typedefs, &stmt.groupings)?;
    for child in &stmt.children {
        build_data(ctx, load, &grouping_env, Some(id), child)?;
    }
    for action in &stmt.actions {
        build_rpc(ctx, load, &grouping_env, Some(id), action)?;
    }
    for notification in &stmt.notifications {
        build_notification(ctx, load, &grouping_env, Some(id), notification)?;
    }
    Ok(id)
}

/// Registers the scoped typedefs and groupings of a statement on its node.
fn register_scoped(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    owner: NodeId,
    typedefs: &[Node<ast::TypedefStmt>],
    groupings: &[Node<ast::GroupingStmt>],
) -> Result<(), Diagnostic> {
    for typedef in typedefs {
        register_typedef(ctx, load, env, Some(owner), typedef)?;
    }
    for grouping in groupings {
        let id = build_grouping(ctx, load, env, Some(owner), grouping)?;
        let node = ctx.graph.node_mut(owner);
        if node.groupings.insert(grouping.name.clone(), id).is_some() {
            return Err(duplicate("grouping", &grouping.name, grouping.span()));
        }
    }
    Ok(())
}

fn register_typedef(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    owner: Option<NodeId>,
    stmt: &Node<ast::TypedefStmt>,
) -> Result<(), Diagnostic> {
    if crate::types::BuiltinType::from_name(&stmt.name).is_some() {
        return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "typedef".to_owned(),
            message: format!("`{}` is the name of a built-in type", stmt.name),
        })
        .with_span(stmt.span()));
    }
    if env.in_grouping {
        check_pattern_syntax(&stmt.ty)?;
    }
    let scoped = ScopedTypedef {
        stmt: stmt.clone(),
        module: env.origin_module,
        doc: env.origin_doc,
    };
    let inserted = match owner {
        Some(owner) => ctx
            .graph
            .node_mut(owner)
            .typedefs
            .insert(stmt.name.clone(), scoped),
        None => ctx.modules[load.module]
            .typedefs
            .insert(stmt.name.clone(), scoped),
    };
    if inserted.is_some() {
        return Err(duplicate("typedef", &stmt.name, stmt.span()));
    }
    if stmt.default.is_some() {
        load.enqueue(
            Pending::TypedefDefault {
                module: load.module,
                node: owner,
                name: stmt.name.clone(),
            },
            stmt.span(),
        );
    }
    Ok(())
}

/// Syntax-checks the patterns of a grouping-context type without keeping
/// the compiled automatons.
fn check_pattern_syntax(spec: &ast::TypeStmt) -> Result<(), Diagnostic> {
    for pattern in &spec.patterns {
        crate::types::resolve::syntax_check_pattern(pattern)?;
    }
    for member in &spec.union_types {
        check_pattern_syntax(member)?;
    }
    Ok(())
}

pub(crate) fn build_augment_node(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    stmt: &Node<ast::AugmentStmt>,
    relative: bool,
    anchor: Option<NodeId>,
) -> Result<NodeId, Diagnostic> {
    let target = {
        let modules = &ctx.modules;
        path::parse_schema_path(
            &stmt.target,
            !relative,
            |prefix| modules[env.origin_module].resolve_prefix(env.origin_doc, prefix),
            &mut ctx.dict,
        )
        .map_err(|message| {
            Diagnostic::error(DiagnosticData::InvalidArgument {
                keyword: "augment".to_owned(),
                message,
            })
            .with_span(stmt.span())
        })?
    };
    if relative && target.absolute {
        return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "augment".to_owned(),
            message: "a uses-augment target must be a descendant path".to_owned(),
        })
        .with_span(stmt.span()));
    }
    let name = ctx.dict.insert_owned(format!("augment:{}", stmt.target));
    let id = materialize(
        ctx,
        load,
        env,
        None,
        NodeSeed {
            name,
            kind: NodeKind::Augment(AugmentNode {
                target_str: stmt.target.clone(),
                target,
                anchor,
                resolved: None,
            }),
            span: stmt.span(),
            config: None,
            status: stmt.status,
            mandatory: None,
            description: &stmt.description,
            reference: &stmt.reference,
            when: &stmt.when,
            if_features: &stmt.if_features,
            musts: &[],
            extensions: &stmt.extensions,
        },
    )?;
    for child in &stmt.children {
        build_data(ctx, load, env, Some(id), child)?;
    }
    for action in &stmt.actions {
        build_rpc(ctx, load, env, Some(id), action)?;
    }
    for notification in &stmt.notifications {
        build_notification(ctx, load, env, Some(id), notification)?;
    }
    Ok(id)
}

fn register_deviation(
    ctx: &mut Context,
    load: &mut Load,
    env: &BuildEnv,
    stmt: &Node<ast::DeviationStmt>,
) -> Result<(), Diagnostic> {
    let target = {
        let modules = &ctx.modules;
        path::parse_schema_path(
            &stmt.target,
            true,
            |prefix| modules[env.origin_module].resolve_prefix(env.origin_doc, prefix),
            &mut ctx.dict,
        )
        .map_err(|message| {
            Diagnostic::error(DiagnosticData::BadDeviation {
                target: stmt.target.clone(),
                message,
            })
            .with_span(stmt.span())
        })?
    };
    ctx.modules[load.module].deviations.push(Deviation {
        target_str: stmt.target.clone(),
        target,
        deviates: stmt.deviates.clone(),
        span: stmt.span(),
        resolved: None,
        original: None,
    });
    Ok(())
}
