//! End-to-end compilation scenarios.

use crate::{load, load_err};
use pretty_assertions::assert_eq;
use yang_compiler::{
    BuiltinType, Context, DiagnosticData, NodeKind, ParseOptions, TypeKind,
};

#[test]
fn simple_leaf_with_string_pattern() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<leaf name="name">
             <type name="string"><pattern value="[a-z]+"/></type>
             <default value="abc"/>
           </leaf>"#,
    );
    let leaf_id = ctx.module(id).children[0];
    let leaf = ctx.graph().node(leaf_id);
    let NodeKind::Leaf(leaf_node) = &leaf.kind else {
        panic!("expected a leaf");
    };
    let ty = leaf_node.ty.resolved().expect("type is compiled");
    assert_eq!(ty.base, BuiltinType::String);
    assert!(ty.typedef.is_none());
    let TypeKind::String { patterns, .. } = &ty.kind else {
        panic!("expected a string kind");
    };
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].source, "[a-z]+");
    assert!(patterns[0].matches("abc"));
    assert!(!patterns[0].matches("Abc"));

    // The same module with a non-matching default fails.
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<leaf name="name">
             <type name="string"><pattern value="[a-z]+"/></type>
             <default value="Abc"/>
           </leaf>"#,
    );
    assert!(matches!(
        err,
        DiagnosticData::DefaultValueInvalid { ref value, .. } if value == "Abc"
    ));
}

#[test]
fn leafref_resolved_across_augment() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "a",
        r#"<container name="x">
             <leaf name="id"><type name="string"/></leaf>
           </container>"#,
    );
    let b = load(
        &mut ctx,
        "b",
        r#"<import module="a"><prefix value="a"/></import>
           <augment target-node="/a:x">
             <leaf name="ref">
               <type name="leafref"><path value="../id"/></type>
             </leaf>
           </augment>"#,
    );

    // The spliced leaf hangs under a:x and its leafref found a:x/id.
    let x = ctx.find_path(None, "/a:x").unwrap()[0];
    let ref_leaf = ctx
        .graph()
        .node(x)
        .children
        .iter()
        .copied()
        .find(|&c| ctx.graph().node(c).name == "ref")
        .expect("augmented leaf is spliced");
    assert_eq!(ctx.graph().node(ref_leaf).module, b);
    let NodeKind::Leaf(leaf) = &ctx.graph().node(ref_leaf).kind else {
        panic!("expected a leaf");
    };
    let target = leaf
        .ty
        .resolved()
        .unwrap()
        .leafref_target()
        .expect("leafref resolved");
    assert_eq!(ctx.graph().node(target).name, "id");
    assert!(ctx.module(b).implemented);
}

#[test]
fn grouping_with_pending_leafref() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<grouping name="g">
             <leaf name="p">
               <type name="leafref"><path value="../q"/></type>
             </leaf>
             <leaf name="q"><type name="string"/></leaf>
           </grouping>
           <container name="c"><uses name="g"/></container>"#,
    );
    let c = ctx.find_path(Some(id), "/m:c").unwrap()[0];
    let children = &ctx.graph().node(c).children;
    assert_eq!(children.len(), 2);
    let p = ctx.find_path(Some(id), "/m:c/p").unwrap()[0];
    let q = ctx.find_path(Some(id), "/m:c/q").unwrap()[0];
    let NodeKind::Leaf(leaf) = &ctx.graph().node(p).kind else {
        panic!("expected a leaf");
    };
    let target = leaf.ty.resolved().unwrap().leafref_target().unwrap();
    assert_eq!(target, q);
    // The grouping template itself keeps its type unresolved.
    let template = ctx.module(id).groupings.get("g").copied().unwrap();
    let template_p = ctx.graph().node(template).children[0];
    assert!(ctx.graph().node(template_p).type_slot().unwrap().resolved().is_none());
}

#[test]
fn deviation_deletes_a_must() {
    let base = r#"<leaf name="x">
                    <type name="string"/>
                    <must condition="true()"/>
                  </leaf>"#;

    let mut ctx = Context::new();
    load(&mut ctx, "base", base);
    load(
        &mut ctx,
        "dev",
        r#"<import module="base"><prefix value="b"/></import>
           <deviation target-node="/b:x">
             <deviate value="delete">
               <must condition="true()"/>
             </deviate>
           </deviation>"#,
    );
    let x = ctx.find_path(None, "/base:x").unwrap()[0];
    assert!(ctx.graph().node(x).musts.is_empty());
    assert!(ctx.get_module("base", None).unwrap().deviated);

    // Without the deviation the must stays.
    let mut plain = Context::new();
    load(&mut plain, "base", base);
    let x = plain.find_path(None, "/base:x").unwrap()[0];
    assert_eq!(plain.graph().node(x).musts.len(), 1);
    assert_eq!(plain.graph().node(x).musts[0].source, "true()");
    assert!(!plain.get_module("base", None).unwrap().deviated);
}

#[test]
fn cyclic_identities_report_a_cycle() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<identity name="a"><base name="b"/></identity>
           <identity name="b"><base name="a"/></identity>"#,
    );
    assert!(matches!(
        err,
        DiagnosticData::UnresolvedCycle { ref item } if item.contains("identity `a`")
    ));
}

#[test]
fn out_of_order_module_statements() {
    let mut ctx = Context::new();
    let text = r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                    <prefix value="m"/>
                    <revision date="2024-01-01"/>
                    <namespace uri="urn:test:m"/>
                  </module>"#;
    let err = ctx
        .parse_yin(text, "m.yin", ParseOptions::empty())
        .unwrap_err();
    assert!(matches!(
        &err.first().unwrap().data,
        DiagnosticData::OutOfOrderStatement { keyword } if keyword == "namespace"
    ));
}

#[test]
fn loading_twice_gives_structurally_equal_graphs() {
    let body = r#"<grouping name="endpoint">
                    <leaf name="address"><type name="string"/></leaf>
                    <leaf name="port">
                      <type name="uint16"><range value="1..65535"/></type>
                    </leaf>
                  </grouping>
                  <container name="server">
                    <uses name="endpoint"/>
                    <list name="client">
                      <key value="name"/>
                      <leaf name="name"><type name="string"/></leaf>
                    </list>
                  </container>"#;
    let mut first = Context::new();
    let a = load(&mut first, "m", body);
    let mut second = Context::new();
    let b = load(&mut second, "m", body);
    let left = first.module(a).children.clone();
    let right = second.module(b).children.clone();
    assert_eq!(left.len(), right.len());
    for (l, r) in left.iter().zip(right.iter()) {
        assert_node_eq(&first, *l, &second, *r);
    }
}

fn assert_node_eq(
    a: &Context,
    an: yang_compiler::NodeId,
    b: &Context,
    bn: yang_compiler::NodeId,
) {
    let left = a.graph().node(an);
    let right = b.graph().node(bn);
    assert_eq!(left.name, right.name);
    assert_eq!(left.kind.keyword(), right.kind.keyword());
    assert_eq!(left.flags, right.flags);
    assert_eq!(left.status, right.status);
    assert_eq!(left.children.len(), right.children.len());
    match (left.type_slot(), right.type_slot()) {
        (Some(l), Some(r)) => {
            let l = l.resolved().expect("resolved");
            let r = r.resolved().expect("resolved");
            assert_eq!(l.base, r.base);
            assert_eq!(l.name(), r.name());
        }
        (None, None) => {}
        _ => panic!("node kinds diverge"),
    }
    for (l, r) in left.children.iter().zip(right.children.iter()) {
        assert_node_eq(a, *l, b, *r);
    }
}
