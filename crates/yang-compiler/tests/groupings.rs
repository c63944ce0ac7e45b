//! Grouping expansion, refines, and uses-augments.

use crate::{load, load_err};
use pretty_assertions::assert_eq;
use yang_compiler::{Context, DiagnosticData, NodeFlags, NodeKind};

#[test]
fn uses_is_replaced_by_the_grouping_children() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<grouping name="pair">
             <leaf name="first"><type name="string"/></leaf>
             <leaf name="second"><type name="string"/></leaf>
           </grouping>
           <container name="c">
             <leaf name="before"><type name="string"/></leaf>
             <uses name="pair"/>
             <leaf name="after"><type name="string"/></leaf>
           </container>"#,
    );
    let c = ctx.find_path(Some(id), "/m:c").unwrap()[0];
    let names: Vec<String> = ctx
        .graph()
        .node(c)
        .children
        .iter()
        .map(|&child| ctx.graph().node(child).name.to_string())
        .collect();
    // The copies take the uses' position in sibling order.
    assert_eq!(names, ["before", "first", "second", "after"]);
    for &child in &ctx.graph().node(c).children {
        assert!(!matches!(ctx.graph().node(child).kind, NodeKind::Uses(_)));
    }
}

#[test]
fn nested_uses_expand_transitively() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<grouping name="inner">
             <leaf name="deep"><type name="string"/></leaf>
           </grouping>
           <grouping name="outer">
             <container name="wrap"><uses name="inner"/></container>
           </grouping>
           <container name="c"><uses name="outer"/></container>"#,
    );
    let deep = ctx.find_path(Some(id), "/m:c/wrap/deep").unwrap();
    assert_eq!(deep.len(), 1);
}

#[test]
fn mutually_recursive_groupings_are_a_cycle() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<grouping name="g1"><uses name="g2"/></grouping>
           <grouping name="g2"><uses name="g1"/></grouping>
           <container name="c"><uses name="g1"/></container>"#,
    );
    assert!(matches!(err, DiagnosticData::GroupingCycle { .. }));
}

#[test]
fn refines_mutate_the_copy() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<grouping name="g">
             <leaf name="name"><type name="string"/></leaf>
             <container name="box"/>
           </grouping>
           <container name="c">
             <uses name="g">
               <refine target-node="name">
                 <mandatory value="true"/>
                 <must condition="string-length(.) &gt; 0"/>
               </refine>
               <refine target-node="box">
                 <presence value="box is configured"/>
               </refine>
             </uses>
           </container>"#,
    );
    let name = ctx.find_path(Some(id), "/m:c/name").unwrap()[0];
    let node = ctx.graph().node(name);
    assert!(node.mandatory());
    assert_eq!(node.musts.len(), 1);
    assert!(node.musts[0].ast.is_some());

    let boxed = ctx.find_path(Some(id), "/m:c/box").unwrap()[0];
    let NodeKind::Container(container) = &ctx.graph().node(boxed).kind else {
        panic!("expected a container");
    };
    assert_eq!(container.presence.as_deref(), Some("box is configured"));

    // The template is untouched.
    let template = ctx.module(id).groupings.get("g").copied().unwrap();
    let template_name = ctx.graph().node(template).children[0];
    assert!(!ctx.graph().node(template_name).mandatory());
}

#[test]
fn cross_kind_refines_fail() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<grouping name="g">
             <leaf name="name"><type name="string"/></leaf>
           </grouping>
           <container name="c">
             <uses name="g">
               <refine target-node="name"><presence value="no"/></refine>
             </uses>
           </container>"#,
    );
    assert!(matches!(err, DiagnosticData::InvalidArgument { .. }));
}

#[test]
fn refine_default_revalidates_against_the_type() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<grouping name="g">
             <leaf name="count">
               <type name="uint8"><range value="0..10"/></type>
             </leaf>
           </grouping>
           <container name="c">
             <uses name="g">
               <refine target-node="count"><default value="99"/></refine>
             </uses>
           </container>"#,
    );
    assert!(matches!(err, DiagnosticData::DefaultValueInvalid { .. }));
}

#[test]
fn uses_augment_extends_the_expansion() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<grouping name="g">
             <container name="settings">
               <leaf name="speed"><type name="uint32"/></leaf>
             </container>
           </grouping>
           <container name="c">
             <uses name="g">
               <augment target-node="settings">
                 <leaf name="duplex"><type name="boolean"/></leaf>
               </augment>
             </uses>
           </container>"#,
    );
    let duplex = ctx.find_path(Some(id), "/m:c/settings/duplex").unwrap();
    assert_eq!(duplex.len(), 1);
}

#[test]
fn grouping_scoped_typedefs_travel_with_the_copies() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<grouping name="g">
             <typedef name="tiny">
               <type name="uint8"><range value="0..3"/></type>
             </typedef>
             <leaf name="n"><type name="tiny"/></leaf>
           </grouping>
           <container name="c"><uses name="g"/></container>"#,
    );
    let n = ctx.find_path(Some(id), "/m:c/n").unwrap()[0];
    let ty = ctx.graph().node(n).type_slot().unwrap().resolved().unwrap();
    assert_eq!(ty.typedef.as_ref().unwrap().name, "tiny");
}

#[test]
fn cross_module_uses_instantiate_in_the_using_namespace() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "lib",
        r#"<grouping name="endpoint">
             <leaf name="address"><type name="string"/></leaf>
           </grouping>"#,
    );
    let user = load(
        &mut ctx,
        "app",
        r#"<import module="lib"><prefix value="l"/></import>
           <container name="server"><uses name="l:endpoint"/></container>"#,
    );
    let address = ctx.find_path(Some(user), "/app:server/address").unwrap()[0];
    let node = ctx.graph().node(address);
    assert_eq!(node.module, user);
    assert!(node.type_slot().unwrap().resolved().is_some());
}

#[test]
fn uses_guards_spread_to_the_expanded_nodes() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<feature name="metrics"/>
           <grouping name="g">
             <leaf name="counter"><type name="uint64"/></leaf>
           </grouping>
           <container name="c">
             <uses name="g"><if-feature name="metrics"/></uses>
           </container>"#,
    );
    let counter = ctx.find_path(Some(id), "/m:c/counter").unwrap()[0];
    assert_eq!(ctx.graph().node(counter).if_features.len(), 1);
    assert!(!ctx.if_features_enabled(counter));
    ctx.enable_feature(id, "metrics").unwrap();
    assert!(ctx.if_features_enabled(counter));
}

#[test]
fn implicit_cases_wrap_choice_shorthands() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<container name="c">
             <choice name="transport">
               <default value="tcp"/>
               <container name="tcp">
                 <leaf name="port"><type name="uint16"/></leaf>
               </container>
               <case name="tls">
                 <leaf name="cert"><type name="string"/></leaf>
               </case>
             </choice>
           </container>"#,
    );
    let choice = {
        let c = ctx.find_path(Some(id), "/m:c").unwrap()[0];
        ctx.graph().node(c).children[0]
    };
    let node = ctx.graph().node(choice);
    let NodeKind::Choice(choice_node) = &node.kind else {
        panic!("expected a choice");
    };
    assert_eq!(node.children.len(), 2);
    let implicit = node.children[0];
    assert!(matches!(ctx.graph().node(implicit).kind, NodeKind::Case));
    assert!(ctx.graph().node(implicit).flags.contains(NodeFlags::IMPLICIT));
    assert_eq!(choice_node.default_case, Some(implicit));
}
