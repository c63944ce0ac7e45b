//! Augment splicing and deviation rewriting.

use crate::{load, load_err};
use pretty_assertions::assert_eq;
use yang_compiler::{Context, DiagnosticData, NodeFlags, NodeKind, ParseOptions};

#[test]
fn augment_splices_into_a_foreign_container() {
    let mut ctx = Context::new();
    let base = load(
        &mut ctx,
        "base",
        r#"<container name="system">
             <leaf name="hostname"><type name="string"/></leaf>
           </container>"#,
    );
    let ext = load(
        &mut ctx,
        "ext",
        r#"<import module="base"><prefix value="b"/></import>
           <augment target-node="/b:system">
             <leaf name="location"><type name="string"/></leaf>
           </augment>"#,
    );
    let system = ctx.find_path(Some(base), "/base:system").unwrap()[0];
    let children = &ctx.graph().node(system).children;
    assert_eq!(children.len(), 2);
    let location = children[1];
    assert_eq!(ctx.graph().node(location).module, ext);
    assert_eq!(ctx.graph().node(location).parent, Some(system));
    // The augment bookkeeping node is retained.
    assert_eq!(ctx.module(ext).augments.len(), 1);
}

#[test]
fn augments_chain_onto_each_other() {
    let mut ctx = Context::new();
    load(&mut ctx, "base", r#"<container name="top"/>"#);
    // The second augment targets a node the first one creates; order in
    // the document is reversed to force a retry pass.
    load(
        &mut ctx,
        "ext",
        r#"<import module="base"><prefix value="b"/></import>
           <augment target-node="/b:top/ext:middle">
             <leaf name="deep"><type name="string"/></leaf>
           </augment>
           <augment target-node="/b:top">
             <container name="middle"/>
           </augment>"#,
    );
    let deep = ctx.find_path(None, "/base:top/ext:middle/deep").unwrap();
    assert_eq!(deep.len(), 1);
}

#[test]
fn augment_cannot_add_list_keys() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "base",
        r#"<list name="user">
             <key value="name"/>
             <leaf name="name"><type name="string"/></leaf>
           </list>"#,
    );
    let err = load_err(
        &mut ctx,
        "ext",
        r#"<import module="base"><prefix value="b"/></import>
           <augment target-node="/b:user">
             <leaf name="name"><type name="string"/></leaf>
           </augment>"#,
    );
    assert!(matches!(err, DiagnosticData::KeyInList { .. }));
}

#[test]
fn augmented_nodes_inherit_the_target_config() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "base",
        r#"<container name="state">
             <config value="false"/>
           </container>"#,
    );
    load(
        &mut ctx,
        "ext",
        r#"<import module="base"><prefix value="b"/></import>
           <augment target-node="/b:state">
             <leaf name="uptime"><type name="uint64"/></leaf>
           </augment>"#,
    );
    let uptime = ctx.find_path(None, "/base:state/ext:uptime").unwrap()[0];
    assert!(!ctx.graph().node(uptime).config());
}

#[test]
fn explicit_config_under_state_is_an_error() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<container name="state">
             <config value="false"/>
             <leaf name="x">
               <type name="string"/>
               <config value="true"/>
             </leaf>
           </container>"#,
    );
    assert!(matches!(err, DiagnosticData::ConfigWUnderR { .. }));
}

#[test]
fn deviate_not_supported_unlinks_the_target() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "base",
        r#"<container name="system">
             <leaf name="hostname"><type name="string"/></leaf>
             <leaf name="location"><type name="string"/></leaf>
           </container>"#,
    );
    load(
        &mut ctx,
        "dev",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:system/b:location">
             <deviate value="not-supported"/>
           </deviation>"#,
    );
    let system = ctx.find_path(None, "/base:system").unwrap()[0];
    let names: Vec<String> = ctx
        .graph()
        .node(system)
        .children
        .iter()
        .map(|&c| ctx.graph().node(c).name.to_string())
        .collect();
    assert_eq!(names, ["hostname"]);
    assert!(ctx.get_module("base", None).unwrap().deviated);
    // The original subtree is kept for diagnostics.
    let deviation = &ctx.get_module("dev", None).unwrap().deviations[0];
    let original = deviation.original.unwrap();
    assert_eq!(ctx.graph().node(original).name, "location");
}

#[test]
fn deviating_away_a_list_key_is_rejected() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "base",
        r#"<list name="user">
             <key value="name"/>
             <leaf name="name"><type name="string"/></leaf>
           </list>"#,
    );
    let err = load_err(
        &mut ctx,
        "dev",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:user/b:name">
             <deviate value="not-supported"/>
           </deviation>"#,
    );
    assert!(matches!(err, DiagnosticData::BadDeviation { .. }));
    // The failed load left the key in place.
    assert!(ctx.find_path(None, "/base:user/name").is_ok());
}

#[test]
fn deviate_add_rejects_existing_properties() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "base",
        r#"<leaf name="x">
             <type name="string"/>
             <default value="one"/>
           </leaf>"#,
    );
    let err = load_err(
        &mut ctx,
        "dev",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:x">
             <deviate value="add"><default value="two"/></deviate>
           </deviation>"#,
    );
    assert!(matches!(err, DiagnosticData::BadDeviation { .. }));
}

#[test]
fn deviate_replace_requires_the_property() {
    let mut ctx = Context::new();
    load(&mut ctx, "base", r#"<leaf name="x"><type name="string"/></leaf>"#);
    let err = load_err(
        &mut ctx,
        "dev",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:x">
             <deviate value="replace"><units name="seconds"/></deviate>
           </deviation>"#,
    );
    assert!(matches!(err, DiagnosticData::BadDeviation { .. }));
}

#[test]
fn deviate_replace_type_revalidates_the_default() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "base",
        r#"<leaf name="x">
             <type name="string"/>
             <default value="hello"/>
           </leaf>"#,
    );
    let err = load_err(
        &mut ctx,
        "dev",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:x">
             <deviate value="replace"><type name="uint8"/></deviate>
           </deviation>"#,
    );
    assert!(matches!(err, DiagnosticData::DefaultValueInvalid { .. }));

    // With a compatible replacement the default revalidates fine.
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "base",
        r#"<leaf name="x">
             <type name="string"/>
             <default value="250"/>
           </leaf>"#,
    );
    load(
        &mut ctx,
        "dev",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:x">
             <deviate value="replace"><type name="uint16"/></deviate>
           </deviation>"#,
    );
    let x = ctx.find_path(None, "/base:x").unwrap()[0];
    let node = ctx.graph().node(x);
    assert!(node.flags.contains(NodeFlags::DEVIATED));
    let ty = node.type_slot().unwrap().resolved().unwrap();
    assert_eq!(ty.base, yang_compiler::BuiltinType::Uint16);
}

#[test]
fn disable_deviations_parses_but_does_not_apply() {
    let mut ctx = Context::with_options(ParseOptions::DISABLE_DEVIATIONS);
    load(
        &mut ctx,
        "base",
        r#"<leaf name="x">
             <type name="string"/>
             <must condition="true()"/>
           </leaf>"#,
    );
    load(
        &mut ctx,
        "dev",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:x">
             <deviate value="delete"><must condition="true()"/></deviate>
           </deviation>"#,
    );
    let x = ctx.find_path(None, "/base:x").unwrap()[0];
    assert_eq!(ctx.graph().node(x).musts.len(), 1);
    assert_eq!(ctx.get_module("dev", None).unwrap().deviations.len(), 1);
    assert!(!ctx.get_module("base", None).unwrap().deviated);
}

#[test]
fn deviations_apply_in_module_load_order() {
    let mut ctx = Context::new();
    load(&mut ctx, "base", r#"<leaf name="x"><type name="string"/></leaf>"#);
    load(
        &mut ctx,
        "dev1",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:x">
             <deviate value="add"><default value="from-dev1"/></deviate>
           </deviation>"#,
    );
    load(
        &mut ctx,
        "dev2",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:x">
             <deviate value="replace"><default value="from-dev2"/></deviate>
           </deviation>"#,
    );
    let x = ctx.find_path(None, "/base:x").unwrap()[0];
    let NodeKind::Leaf(leaf) = &ctx.graph().node(x).kind else {
        panic!("expected a leaf");
    };
    assert_eq!(leaf.default.as_deref(), Some("from-dev2"));
}

#[test]
fn choice_default_and_mandatory_are_exclusive() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<choice name="c">
             <default value="a"/>
             <mandatory value="true"/>
             <case name="a">
               <leaf name="x"><type name="string"/></leaf>
             </case>
           </choice>"#,
    );
    assert!(matches!(err, DiagnosticData::InvalidArgument { .. }));
}

#[test]
fn mandatory_under_the_default_case_is_rejected() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<choice name="c">
             <default value="a"/>
             <case name="a">
               <leaf name="x">
                 <type name="string"/>
                 <mandatory value="true"/>
               </leaf>
             </case>
           </choice>"#,
    );
    assert!(matches!(err, DiagnosticData::MandatoryUnderDefaultCase { .. }));
}
