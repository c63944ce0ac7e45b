//! Type engine behavior: derivation chains, narrowing, boundaries.

use crate::{load, load_err};
use pretty_assertions::assert_eq;
use yang_compiler::{BuiltinType, Context, DiagnosticData, NodeKind, TypeKind};

fn leaf_type(ctx: &Context, path: &str) -> yang_compiler::Type {
    let id = ctx.find_path(None, path).unwrap()[0];
    let NodeKind::Leaf(leaf) = &ctx.graph().node(id).kind else {
        panic!("expected a leaf at {path}");
    };
    (**leaf.ty.resolved().expect("resolved")).clone()
}

#[test]
fn typedef_chains_compose_restrictions() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "m",
        r#"<typedef name="percent">
             <type name="uint8"><range value="0..100"/></type>
           </typedef>
           <typedef name="high-percent">
             <type name="percent"><range value="90..100"/></type>
           </typedef>
           <leaf name="level"><type name="high-percent"/></leaf>"#,
    );
    let ty = leaf_type(&ctx, "/m:level");
    assert_eq!(ty.base, BuiltinType::Uint8);
    assert_eq!(ty.typedef.as_ref().unwrap().name, "high-percent");
    let TypeKind::Numeric { range } = &ty.kind else {
        panic!("expected a numeric kind");
    };
    let range = range.as_ref().unwrap();
    assert_eq!(range.parts.len(), 1);
}

#[test]
fn widening_restriction_is_rejected() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<typedef name="small">
             <type name="int32"><range value="0..10"/></type>
           </typedef>
           <leaf name="x">
             <type name="small"><range value="0..20"/></type>
           </leaf>"#,
    );
    assert!(matches!(
        err,
        DiagnosticData::TypeRestrictionNotNarrowing { .. }
    ));
}

#[test]
fn fraction_digits_boundaries() {
    for digits in ["1", "18"] {
        let mut ctx = Context::new();
        load(
            &mut ctx,
            "m",
            &format!(
                r#"<leaf name="x">
                     <type name="decimal64"><fraction-digits value="{digits}"/></type>
                   </leaf>"#
            ),
        );
    }
    for digits in ["0", "19"] {
        let mut ctx = Context::new();
        let err = load_err(
            &mut ctx,
            "m",
            &format!(
                r#"<leaf name="x">
                     <type name="decimal64"><fraction-digits value="{digits}"/></type>
                   </leaf>"#
            ),
        );
        assert!(matches!(err, DiagnosticData::InvalidArgument { .. }));
    }
}

#[test]
fn decimal64_requires_fraction_digits_at_direct_derivation() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<leaf name="x"><type name="decimal64"/></leaf>"#,
    );
    assert!(matches!(
        err,
        DiagnosticData::MissingRequired { keyword: "fraction-digits", .. }
    ));

    // Derived types inherit them and may not re-declare them.
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "m",
        r#"<typedef name="volts">
             <type name="decimal64"><fraction-digits value="2"/></type>
           </typedef>
           <leaf name="x">
             <type name="volts"><range value="0.00..12.50"/></type>
             <default value="5.25"/>
           </leaf>"#,
    );
    let ty = leaf_type(&ctx, "/m:x");
    let TypeKind::Decimal64 { fraction_digits, .. } = ty.kind else {
        panic!("expected decimal64");
    };
    assert_eq!(fraction_digits, 2);
}

#[test]
fn enumeration_values_and_restriction() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "m",
        r#"<typedef name="speed">
             <type name="enumeration">
               <enum name="slow"/>
               <enum name="fast"><value value="10"/></enum>
               <enum name="turbo"/>
             </type>
           </typedef>
           <leaf name="x">
             <type name="speed">
               <enum name="slow"/>
               <enum name="turbo"/>
             </type>
             <default value="turbo"/>
           </leaf>"#,
    );
    let ty = leaf_type(&ctx, "/m:x");
    let TypeKind::Enumeration { enums } = &ty.kind else {
        panic!("expected an enumeration");
    };
    assert_eq!(enums.len(), 2);
    assert_eq!(enums[0].value, 0);
    // Auto-assignment continues after the highest explicit value.
    assert_eq!(enums[1].name, "turbo");
    assert_eq!(enums[1].value, 11);

    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<typedef name="speed">
             <type name="enumeration"><enum name="slow"/></type>
           </typedef>
           <leaf name="x">
             <type name="speed"><enum name="warp"/></type>
           </leaf>"#,
    );
    assert!(matches!(
        err,
        DiagnosticData::TypeRestrictionNotNarrowing { .. }
    ));
}

#[test]
fn bits_keep_their_positions_when_restricted() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "m",
        r#"<typedef name="caps">
             <type name="bits">
               <bit name="read"/>
               <bit name="write"><position value="4"/></bit>
               <bit name="exec"/>
             </type>
           </typedef>
           <leaf name="x">
             <type name="caps"><bit name="exec"/></type>
             <default value="exec"/>
           </leaf>"#,
    );
    let ty = leaf_type(&ctx, "/m:x");
    let TypeKind::Bits { bits } = &ty.kind else {
        panic!("expected bits");
    };
    assert_eq!(bits.len(), 1);
    assert_eq!(bits[0].position, 5);
}

#[test]
fn union_members_mark_pointer_types() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        "m",
        r#"<leaf name="target"><type name="string"/></leaf>
           <leaf name="x">
             <type name="union">
               <type name="int32"/>
               <type name="leafref"><path value="../target"/></type>
             </type>
           </leaf>
           <leaf name="y">
             <type name="union">
               <type name="int32"/>
               <type name="string"/>
             </type>
             <default value="17"/>
           </leaf>"#,
    );
    let ty = leaf_type(&ctx, "/m:x");
    assert!(ty.has_pointer_type());
    let ty = leaf_type(&ctx, "/m:y");
    assert!(!ty.has_pointer_type());
}

#[test]
fn identityref_defaults_must_derive_from_a_base() {
    let body = r#"<identity name="address-family"/>
                  <identity name="ipv4"><base name="address-family"/></identity>
                  <leaf name="af">
                    <type name="identityref"><base name="address-family"/></type>
                    <default value="DEFAULT"/>
                  </leaf>"#;
    let mut ctx = Context::new();
    load(&mut ctx, "m", &body.replace("DEFAULT", "ipv4"));

    let mut ctx = Context::new();
    let err = load_err(&mut ctx, "m", &body.replace("DEFAULT", "address-family"));
    assert!(matches!(err, DiagnosticData::DefaultValueInvalid { .. }));
}

#[test]
fn min_and_max_elements_boundaries_coexist() {
    let mut ctx = Context::new();
    let id = load(
        &mut ctx,
        "m",
        r#"<leaf-list name="tags">
             <type name="string"/>
             <min-elements value="0"/>
             <max-elements value="unbounded"/>
           </leaf-list>"#,
    );
    let node = ctx.graph().node(ctx.module(id).children[0]);
    let NodeKind::LeafList(leaf_list) = &node.kind else {
        panic!("expected a leaf-list");
    };
    assert_eq!(leaf_list.min_elements, 0);
    assert_eq!(leaf_list.max_elements, None);
}

#[test]
fn typedef_default_is_validated_and_inherited() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<typedef name="port">
             <type name="uint16"><range value="1..65535"/></type>
             <default value="0"/>
           </typedef>"#,
    );
    assert!(matches!(err, DiagnosticData::DefaultValueInvalid { .. }));

    // An inherited default is re-validated against the leaf's narrowing.
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<typedef name="port">
             <type name="uint16"/>
             <default value="22"/>
           </typedef>
           <leaf name="p">
             <type name="port"><range value="1024..65535"/></type>
           </leaf>"#,
    );
    assert!(matches!(err, DiagnosticData::DefaultValueInvalid { .. }));
}

#[test]
fn typedef_cycles_are_reported() {
    let mut ctx = Context::new();
    let err = load_err(
        &mut ctx,
        "m",
        r#"<typedef name="a"><type name="b"/></typedef>
           <typedef name="b"><type name="a"/></typedef>
           <leaf name="x"><type name="a"/></leaf>"#,
    );
    assert!(matches!(err, DiagnosticData::UnresolvedCycle { .. }));
}

#[test]
fn unions_reject_leafref_members_in_yang_1_0() {
    let mut ctx = Context::new();
    let text = r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                    <yang-version value="1"/>
                    <namespace uri="urn:test:m"/>
                    <prefix value="m"/>
                    <leaf name="x">
                      <type name="union">
                        <type name="string"/>
                        <type name="empty"/>
                      </type>
                    </leaf>
                  </module>"#;
    let err = ctx
        .parse_yin(text, "m.yin", yang_compiler::ParseOptions::empty())
        .unwrap_err();
    assert!(matches!(
        err.first().unwrap().data,
        DiagnosticData::InvalidArgument { .. }
    ));
}
