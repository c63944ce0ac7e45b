//! Module linkage: imports, submodules, revisions, features, identities,
//! and extension instances.

use crate::{load, load_err};
use pretty_assertions::assert_eq;
use yang_compiler::{Context, DiagnosticData, NodeFlags, NodeKind, ParseOptions};

#[test]
fn imports_are_loaded_through_the_module_source_hook() {
    let mut ctx = Context::new();
    ctx.set_module_source(Box::new(|name, _revision| match name {
        "dep" => Some(crate::yin(
            "dep",
            r#"<revision date="2024-05-01"/>
               <typedef name="label"><type name="string"/></typedef>"#,
        )),
        _ => None,
    }));
    let id = load(
        &mut ctx,
        "app",
        r#"<import module="dep"><prefix value="d"/></import>
           <leaf name="x"><type name="d:label"/></leaf>"#,
    );
    // The import pulled dep in as a non-implemented module.
    let dep = ctx.get_module("dep", None).unwrap();
    assert!(!dep.implemented);
    assert_eq!(dep.revision.as_deref(), Some("2024-05-01"));
    assert!(ctx.module(id).implemented);
    let x = ctx.find_path(Some(id), "/app:x").unwrap()[0];
    let ty = ctx.graph().node(x).type_slot().unwrap().resolved().unwrap();
    assert_eq!(ty.typedef.as_ref().unwrap().name, "label");
}

#[test]
fn missing_imports_fail_the_load() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "app",
        r#"<import module="nowhere"><prefix value="n"/></import>"#,
    );
    assert!(matches!(err, DiagnosticData::BadImport { .. }));
}

#[test]
fn circular_imports_are_detected() {
    let mut ctx = Context::new();
    ctx.set_module_source(Box::new(|name, _| match name {
        "a" => Some(crate::yin(
            "a",
            r#"<import module="b"><prefix value="b"/></import>"#,
        )),
        "b" => Some(crate::yin(
            "b",
            r#"<import module="a"><prefix value="a"/></import>"#,
        )),
        _ => None,
    }));
    let err = load_err(
        &mut ctx,
        "top",
        r#"<import module="a"><prefix value="a"/></import>"#,
    );
    assert!(matches!(err, DiagnosticData::BadImport { .. }));
}

#[test]
fn strict_revisions_enforce_the_import_date() {
    let dep = || {
        Some(crate::yin(
            "dep",
            r#"<revision date="2024-05-01"/>
               <typedef name="label"><type name="string"/></typedef>"#,
        ))
    };
    let importer = r#"<import module="dep">
                        <prefix value="d"/>
                        <revision-date date="2020-01-01"/>
                      </import>
                      <leaf name="x"><type name="d:label"/></leaf>"#;

    let mut lenient = Context::new();
    lenient.set_module_source(Box::new(move |name, _| (name == "dep").then(dep).flatten()));
    load(&mut lenient, "app", importer);

    let mut strict = Context::with_options(ParseOptions::STRICT_REVISIONS);
    strict.set_module_source(Box::new(move |name, _| (name == "dep").then(dep).flatten()));
    let err = load_err(&mut strict, "app", importer);
    assert!(matches!(err, DiagnosticData::BadImport { .. }));
}

#[test]
fn submodules_are_grafted_into_their_module() {
    let mut ctx = Context::new();
    ctx.set_module_source(Box::new(|name, _| {
        (name == "main-types").then(|| {
            r#"<submodule name="main-types" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <yang-version value="1.1"/>
                 <belongs-to module="main"><prefix value="m"/></belongs-to>
                 <typedef name="percent">
                   <type name="uint8"><range value="0..100"/></type>
                 </typedef>
                 <leaf name="load"><type name="percent"/></leaf>
               </submodule>"#
                .to_owned()
        })
    }));
    let id = load(
        &mut ctx,
        "main",
        r#"<include module="main-types"/>
           <leaf name="own"><type name="percent"/></leaf>"#,
    );
    let module = ctx.module(id);
    assert_eq!(module.includes.len(), 1);
    // Both the submodule's leaf and the module's own leaf compile.
    assert_eq!(module.children.len(), 2);
    let own = ctx.find_path(Some(id), "/main:own").unwrap()[0];
    let ty = ctx.graph().node(own).type_slot().unwrap().resolved().unwrap();
    assert_eq!(ty.typedef.as_ref().unwrap().name, "percent");
    assert!(ctx.find_path(Some(id), "/main:load").is_ok());
}

#[test]
fn submodules_cannot_be_loaded_directly() {
    let mut ctx = Context::new();
    let text = r#"<submodule name="s" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                    <belongs-to module="m"><prefix value="m"/></belongs-to>
                  </submodule>"#;
    let err = ctx
        .parse_yin(text, "s.yin", ParseOptions::empty())
        .unwrap_err();
    assert!(matches!(
        err.first().unwrap().data,
        DiagnosticData::InvalidArgument { .. }
    ));
}

#[test]
fn newest_revision_is_selected_and_duplicates_warn() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<revision date="2023-01-01"/>
           <revision date="2024-06-30"/>
           <revision date="2023-01-01"/>"#,
    );
    let module = ctx.module(id);
    assert_eq!(module.revision.as_deref(), Some("2024-06-30"));
    assert_eq!(module.revisions.len(), 2);
    assert!(module
        .warnings
        .iter()
        .any(|w| matches!(w.data, DiagnosticData::Duplicate { .. })));
}

#[test]
fn the_same_module_and_revision_cannot_load_twice() {
    let mut ctx = Context::new();
    let body = r#"<revision date="2024-01-01"/>"#;
    load(&mut ctx, "m", body);
    let err = load_err(&mut ctx, "m", body);
    assert!(matches!(err, DiagnosticData::Duplicate { .. }));

    // A different revision of the same module is fine.
    let id = load(&mut ctx, "m", r#"<revision date="2024-02-01"/>"#);
    assert_eq!(ctx.module(id).revision.as_deref(), Some("2024-02-01"));
    // The newest revision wins the unqualified lookup.
    assert_eq!(
        ctx.get_module("m", None).unwrap().revision.as_deref(),
        Some("2024-02-01")
    );
    assert_eq!(
        ctx.get_module("m", Some("2024-01-01")).unwrap().revision.as_deref(),
        Some("2024-01-01")
    );
}

#[test]
fn identity_derivation_links_both_directions() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "base",
        r#"<identity name="routing-protocol"/>"#,
    );
    let ext = load(
        &mut ctx,
        "ext",
        r#"<import module="base"><prefix value="b"/></import>
           <identity name="ospf"><base name="b:routing-protocol"/></identity>"#,
    );
    let base = ctx.get_module("base", None).unwrap();
    let root = base.identity("routing-protocol").unwrap();
    assert_eq!(root.derived.len(), 1);
    assert_eq!(root.derived[0].module, ext);
    assert_eq!(root.derived[0].name, "ospf");
    let ospf = ctx.module(ext).identity("ospf").unwrap();
    assert_eq!(ospf.bases.len(), 1);
}

#[test]
fn feature_reference_cycles_are_rejected() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<feature name="a"><if-feature name="b"/></feature>
           <feature name="b"><if-feature name="a"/></feature>"#,
    );
    assert!(matches!(err, DiagnosticData::UnresolvedCycle { .. }));
}

#[test]
fn unknown_feature_references_are_rejected() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<feature name="a"><if-feature name="ghost"/></feature>"#,
    );
    assert!(matches!(
        err,
        DiagnosticData::UnresolvedReference { kind: "feature", .. }
    ));
}

#[test]
fn rpcs_get_implicit_input_and_output() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<rpc name="reboot">
             <input>
               <leaf name="delay"><type name="uint32"/></leaf>
             </input>
           </rpc>"#,
    );
    let rpc = ctx.module(id).children[0];
    let node = ctx.graph().node(rpc);
    assert!(matches!(node.kind, NodeKind::Rpc));
    assert_eq!(node.children.len(), 2);
    let input = ctx.graph().node(node.children[0]);
    let output = ctx.graph().node(node.children[1]);
    assert!(matches!(input.kind, NodeKind::Input));
    assert!(!input.flags.contains(NodeFlags::IMPLICIT));
    assert!(matches!(output.kind, NodeKind::Output));
    assert!(output.flags.contains(NodeFlags::IMPLICIT));
}

#[test]
fn actions_and_notifications_live_under_data_nodes() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<container name="interface">
             <action name="reset">
               <input><leaf name="force"><type name="boolean"/></leaf></input>
             </action>
             <notification name="link-flap">
               <leaf name="count"><type name="uint32"/></leaf>
             </notification>
           </container>"#,
    );
    let container = ctx.module(id).children[0];
    let kinds: Vec<&str> = ctx
        .graph()
        .node(container)
        .children
        .iter()
        .map(|&c| ctx.graph().node(c).kind.keyword())
        .collect();
    assert_eq!(kinds, ["action", "notification"]);
}

#[test]
fn list_keys_become_mandatory_key_leafs() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<list name="user">
             <key value="name"/>
             <leaf name="name"><type name="string"/></leaf>
             <leaf name="uid"><type name="uint32"/></leaf>
           </list>"#,
    );
    let list = ctx.module(id).children[0];
    let NodeKind::List(list_node) = &ctx.graph().node(list).kind else {
        panic!("expected a list");
    };
    assert_eq!(list_node.keys.len(), 1);
    let key = ctx.graph().node(list_node.keys[0]);
    assert_eq!(key.name, "name");
    assert!(key.is_key());
    assert!(key.mandatory());
}

#[test]
fn key_must_name_a_child_leaf() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<list name="user">
             <key value="settings"/>
             <container name="settings"/>
           </list>"#,
    );
    assert!(matches!(err, DiagnosticData::KeyNotLeaf { .. }));
}

#[test]
fn config_lists_need_keys() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<list name="user">
             <leaf name="name"><type name="string"/></leaf>
           </list>"#,
    );
    assert!(matches!(
        err,
        DiagnosticData::MissingRequired { keyword: "key", .. }
    ));

    // State lists are fine without keys.
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "m",
        r#"<list name="session">
             <config value="false"/>
             <leaf name="peer"><type name="string"/></leaf>
           </list>"#,
    );
}

#[test]
fn unique_constraints_resolve_to_descendant_leafs() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<list name="server">
             <key value="name"/>
             <unique tag="address port"/>
             <leaf name="name"><type name="string"/></leaf>
             <leaf name="address"><type name="string"/></leaf>
             <leaf name="port"><type name="uint16"/></leaf>
           </list>"#,
    );
    let list = ctx.module(id).children[0];
    let NodeKind::List(list_node) = &ctx.graph().node(list).kind else {
        panic!("expected a list");
    };
    assert_eq!(list_node.uniques.len(), 1);
    assert_eq!(list_node.uniques[0].resolved.len(), 2);
}

#[test]
fn extension_instances_bind_to_their_definition() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "meta",
        r#"<extension name="docs-url">
             <argument name="uri"/>
           </extension>"#,
    );
    let app = load(
        &mut ctx,
        "app",
        r#"<import module="meta"><prefix value="x"/></import>
           <container name="c" xmlns:x="urn:test:meta">
             <x:docs-url uri="https://example.com/docs"/>
           </container>"#,
    );
    let c = ctx.find_path(Some(app), "/app:c").unwrap()[0];
    let node = ctx.graph().node(c);
    assert_eq!(node.extensions.len(), 1);
    let instance = &node.extensions[0];
    assert_eq!(instance.keyword, "docs-url");
    assert_eq!(instance.argument.as_deref(), Some("https://example.com/docs"));
    let def = instance.def.as_ref().expect("bound to its definition");
    assert_eq!(ctx.module(def.module).name, "meta");
}

#[test]
fn leafrefs_may_point_into_choices_transparently() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<choice name="address">
             <case name="v4">
               <leaf name="ipv4"><type name="string"/></leaf>
             </case>
           </choice>
           <leaf name="primary">
             <type name="leafref"><path value="/m:ipv4"/></type>
           </leaf>"#,
    );
    let primary = ctx.find_path(Some(id), "/m:primary").unwrap()[0];
    let ty = ctx.graph().node(primary).type_slot().unwrap().resolved().unwrap();
    let target = ty.leafref_target().unwrap();
    assert_eq!(ctx.graph().node(target).name, "ipv4");
}

#[test]
fn dangling_leafrefs_report_a_bad_path() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<leaf name="ref">
             <type name="leafref"><path value="../nothing"/></type>
           </leaf>"#,
    );
    assert!(matches!(err, DiagnosticData::BadLeafrefPath { .. }));
}
