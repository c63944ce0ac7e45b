//! Type derivation: walking typedef chains and composing restrictions.
//!
//! Every derivation step must narrow its parent. The walker starts from the
//! `type` statement on a leaf (or typedef under validation), follows named
//! typedefs through their lexical scopes down to a built-in, and folds the
//! restrictions of each step into the compiled [`Type`].

use super::*;
use crate::ast;
use crate::diagnostics::{Diagnostic, DiagnosticData};
use crate::ident::Dictionary;
use crate::node::Node;
use crate::path;
use crate::schema::{Module, ModuleId, SchemaGraph, ScopedTypedef, SymbolRef};
use crate::source::SourceSpan;

/// Read-only view of the context plus the dictionary, for type resolution.
pub(crate) struct TypeCx<'a> {
    pub graph: &'a SchemaGraph,
    pub modules: &'a [Module],
    pub dict: &'a mut Dictionary,
    /// Typedefs on the current derivation walk, for cycle detection.
    visiting: Vec<(ModuleId, Ident)>,
}

impl<'a> TypeCx<'a> {
    pub(crate) fn new(
        graph: &'a SchemaGraph,
        modules: &'a [Module],
        dict: &'a mut Dictionary,
    ) -> Self {
        Self {
            graph,
            modules,
            dict,
            visiting: Vec::new(),
        }
    }
}

/// Where a `type` statement is being resolved.
#[derive(Clone)]
pub(crate) struct TypeScope {
    /// Module owning the statement text (the grouping's module for copies).
    pub module: ModuleId,
    /// Document index within that module, for prefix binding.
    pub doc: usize,
    /// Node to start nested-typedef lookup from.
    pub node: Option<NodeId>,
    /// Inside a grouping body patterns are syntax-checked but not compiled.
    pub in_grouping: bool,
}

pub(crate) fn resolve_type(
    cx: &mut TypeCx<'_>,
    scope: &TypeScope,
    spec: &Node<ast::TypeStmt>,
) -> Result<Type, Diagnostic> {
    let span = spec.span();
    let name = &spec.name;
    let target_module = match &name.prefix {
        Some(prefix) => {
            let module = cx.modules[scope.module]
                .resolve_prefix(scope.doc, prefix)
                .ok_or_else(|| {
                    Diagnostic::error(DiagnosticData::UnresolvedReference {
                        kind: "prefix",
                        name: prefix.to_string(),
                    })
                    .with_span(span)
                })?;
            Some(module)
        }
        None => None,
    };

    match target_module {
        Some(module) if module != scope.module => {
            let Some(typedef) = cx.modules[module].typedefs.get(name.name.as_str()).cloned()
            else {
                return Err(unresolved_type(name, span));
            };
            derive_from_typedef(cx, scope, typedef, None, spec, span)
        }
        // Own-module scope: built-ins first (typedefs may not shadow
        // them), then the lexical scope chain, then the module table.
        _ => {
            if let Some(builtin) = BuiltinType::from_name(&name.name) {
                return derive_from_builtin(cx, scope, builtin, spec, span);
            }
            if let Some((typedef, found_at)) = lookup_typedef(cx, scope, &name.name) {
                return derive_from_typedef(cx, scope, typedef, found_at, spec, span);
            }
            Err(unresolved_type(name, span))
        }
    }
}

fn unresolved_type(name: &ast::QName, span: Option<SourceSpan>) -> Diagnostic {
    Diagnostic::error(DiagnosticData::UnresolvedReference {
        kind: "typedef or built-in type",
        name: name.to_string(),
    })
    .with_span(span)
}

/// Finds a typedef by walking the node scope chain, then the module table.
fn lookup_typedef(
    cx: &TypeCx<'_>,
    scope: &TypeScope,
    name: &str,
) -> Option<(ScopedTypedef, Option<NodeId>)> {
    let mut current = scope.node;
    while let Some(id) = current {
        let node = cx.graph.node(id);
        if let Some(typedef) = node.typedefs.get(name) {
            return Some((typedef.clone(), Some(id)));
        }
        current = node.parent;
    }
    cx.modules[scope.module]
        .typedefs
        .get(name)
        .cloned()
        .map(|t| (t, None))
}

fn derive_from_typedef(
    cx: &mut TypeCx<'_>,
    scope: &TypeScope,
    typedef: ScopedTypedef,
    found_at: Option<NodeId>,
    spec: &Node<ast::TypeStmt>,
    span: Option<SourceSpan>,
) -> Result<Type, Diagnostic> {
    let key = (typedef.module, typedef.stmt.name.clone());
    if cx.visiting.contains(&key) {
        return Err(Diagnostic::error(DiagnosticData::UnresolvedCycle {
            item: format!("typedef `{}`", typedef.stmt.name),
        })
        .with_span(span));
    }
    cx.visiting.push(key);
    let inner_scope = TypeScope {
        module: typedef.module,
        doc: typedef.doc,
        node: found_at,
        in_grouping: scope.in_grouping,
    };
    let parent = resolve_type(cx, &inner_scope, &typedef.stmt.ty);
    cx.visiting.pop();
    let mut parent = parent?;

    parent.typedef = Some(TypedefRef {
        module: cx.modules[typedef.module].name.clone(),
        name: typedef.stmt.name.clone(),
    });
    if let Some(default) = &typedef.stmt.default {
        parent.typedef_default = Some(InheritedDefault {
            value: default.clone(),
            module: typedef.module,
            doc: typedef.doc,
        });
    }
    apply_restrictions(cx, scope, parent, spec, false, span)
}

fn derive_from_builtin(
    cx: &mut TypeCx<'_>,
    scope: &TypeScope,
    builtin: BuiltinType,
    spec: &Node<ast::TypeStmt>,
    span: Option<SourceSpan>,
) -> Result<Type, Diagnostic> {
    let kind = match builtin {
        BuiltinType::Binary => TypeKind::Binary { length: None },
        BuiltinType::Bits => TypeKind::Bits { bits: Vec::new() },
        BuiltinType::Boolean => TypeKind::Boolean,
        BuiltinType::Decimal64 => TypeKind::Decimal64 {
            fraction_digits: 0,
            range: None,
        },
        BuiltinType::Empty => TypeKind::Empty,
        BuiltinType::Enumeration => TypeKind::Enumeration { enums: Vec::new() },
        BuiltinType::Identityref => TypeKind::Identityref { bases: Vec::new() },
        BuiltinType::InstanceIdentifier => TypeKind::InstanceIdentifier {
            require_instance: true,
        },
        BuiltinType::Leafref => TypeKind::Leafref {
            path: path::LeafrefPath {
                source: String::new(),
                absolute: false,
                up: 0,
                steps: Vec::new(),
            },
            require_instance: true,
            target: std::sync::OnceLock::new(),
        },
        BuiltinType::String => TypeKind::String {
            length: None,
            patterns: Vec::new(),
        },
        BuiltinType::Union => TypeKind::Union {
            members: Vec::new(),
            has_pointer_type: false,
        },
        _ => TypeKind::Numeric { range: None },
    };
    let base = Type {
        base: builtin,
        typedef: None,
        typedef_default: None,
        kind,
    };
    apply_restrictions(cx, scope, base, spec, true, span)
}

/// Folds one `type` statement's restrictions into the parent type.
fn apply_restrictions(
    cx: &mut TypeCx<'_>,
    scope: &TypeScope,
    parent: Type,
    spec: &Node<ast::TypeStmt>,
    direct: bool,
    span: Option<SourceSpan>,
) -> Result<Type, Diagnostic> {
    let base = parent.base;
    let type_name = parent.name().to_owned();
    let invalid = |message: String| {
        Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "type".to_owned(),
            message,
        })
        .with_span(span)
    };
    let not_narrowing = |message: String| {
        Diagnostic::error(DiagnosticData::TypeRestrictionNotNarrowing {
            type_name: type_name.clone(),
            message,
        })
        .with_span(span)
    };

    // Restrictions only valid for specific bases.
    if spec.range.is_some() && !(base.is_integer() || base == BuiltinType::Decimal64) {
        return Err(invalid(format!("`{}` takes no range", base.name())));
    }
    if spec.length.is_some() && !matches!(base, BuiltinType::String | BuiltinType::Binary) {
        return Err(invalid(format!("`{}` takes no length", base.name())));
    }
    if !spec.patterns.is_empty() && base != BuiltinType::String {
        return Err(invalid(format!("`{}` takes no patterns", base.name())));
    }
    if !spec.enums.is_empty() && base != BuiltinType::Enumeration {
        return Err(invalid(format!("`{}` takes no enums", base.name())));
    }
    if !spec.bits.is_empty() && base != BuiltinType::Bits {
        return Err(invalid(format!("`{}` takes no bits", base.name())));
    }
    if spec.path.is_some() && base != BuiltinType::Leafref {
        return Err(invalid(format!("`{}` takes no path", base.name())));
    }
    if !spec.bases.is_empty() && base != BuiltinType::Identityref {
        return Err(invalid(format!("`{}` takes no base", base.name())));
    }
    if !spec.union_types.is_empty() && base != BuiltinType::Union {
        return Err(invalid(format!("`{}` takes no member types", base.name())));
    }
    if spec.fraction_digits.is_some() && base != BuiltinType::Decimal64 {
        return Err(invalid(format!("`{}` takes no fraction-digits", base.name())));
    }
    if spec.require_instance.is_some()
        && !matches!(base, BuiltinType::Leafref | BuiltinType::InstanceIdentifier)
    {
        return Err(invalid(format!("`{}` takes no require-instance", base.name())));
    }

    let kind = match parent.kind {
        TypeKind::Numeric { range } => {
            let bounds = base.integer_bounds().expect("numeric base");
            let effective = effective_restriction(&range, bounds);
            let range = match &spec.range {
                Some(stmt) => Some(restrict(
                    stmt,
                    &effective,
                    NumberKind::of_integer(base),
                    &not_narrowing,
                )?),
                None => range,
            };
            TypeKind::Numeric { range }
        }
        TypeKind::Decimal64 {
            fraction_digits,
            range,
        } => {
            let fraction_digits = match (direct, spec.fraction_digits) {
                (true, Some(digits)) => digits,
                (true, None) => {
                    return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                        keyword: "fraction-digits",
                        parent: "type decimal64".to_owned(),
                    })
                    .with_span(span))
                }
                (false, None) => fraction_digits,
                (false, Some(_)) => {
                    return Err(invalid(
                        "fraction-digits is only allowed at the derivation from decimal64"
                            .to_owned(),
                    ))
                }
            };
            let bounds = (
                Number::Decimal {
                    value: i64::MIN,
                    fraction_digits,
                },
                Number::Decimal {
                    value: i64::MAX,
                    fraction_digits,
                },
            );
            let effective = effective_restriction(&range, bounds);
            let range = match &spec.range {
                Some(stmt) => Some(restrict(
                    stmt,
                    &effective,
                    NumberKind::Decimal(fraction_digits),
                    &not_narrowing,
                )?),
                None => range,
            };
            TypeKind::Decimal64 {
                fraction_digits,
                range,
            }
        }
        TypeKind::String { length, patterns } => {
            let bounds = (Number::Unsigned(0), Number::Unsigned(u64::MAX));
            let effective = effective_restriction(&length, bounds);
            let length = match &spec.length {
                Some(stmt) => {
                    Some(restrict(stmt, &effective, NumberKind::Unsigned, &not_narrowing)?)
                }
                None => length,
            };
            let mut patterns = patterns;
            for stmt in &spec.patterns {
                patterns.push(compile_pattern_stmt(stmt, scope.in_grouping)?);
            }
            TypeKind::String { length, patterns }
        }
        TypeKind::Binary { length } => {
            let bounds = (Number::Unsigned(0), Number::Unsigned(u64::MAX));
            let effective = effective_restriction(&length, bounds);
            let length = match &spec.length {
                Some(stmt) => {
                    Some(restrict(stmt, &effective, NumberKind::Unsigned, &not_narrowing)?)
                }
                None => length,
            };
            TypeKind::Binary { length }
        }
        TypeKind::Enumeration { enums } => {
            let enums = if direct {
                if spec.enums.is_empty() {
                    return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                        keyword: "enum",
                        parent: "type enumeration".to_owned(),
                    })
                    .with_span(span));
                }
                assign_enum_values(&spec.enums, span)?
            } else if spec.enums.is_empty() {
                enums
            } else {
                restrict_enums(&enums, &spec.enums, &not_narrowing)?
            };
            TypeKind::Enumeration { enums }
        }
        TypeKind::Bits { bits } => {
            let bits = if direct {
                if spec.bits.is_empty() {
                    return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                        keyword: "bit",
                        parent: "type bits".to_owned(),
                    })
                    .with_span(span));
                }
                assign_bit_positions(&spec.bits, span)?
            } else if spec.bits.is_empty() {
                bits
            } else {
                restrict_bits(&bits, &spec.bits, &not_narrowing)?
            };
            TypeKind::Bits { bits }
        }
        TypeKind::Identityref { bases } => {
            let bases = if direct {
                if spec.bases.is_empty() {
                    return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                        keyword: "base",
                        parent: "type identityref".to_owned(),
                    })
                    .with_span(span));
                }
                let mut out = Vec::new();
                for base in &spec.bases {
                    out.push(resolve_identity_base(cx, scope, base)?);
                }
                out
            } else {
                if !spec.bases.is_empty() {
                    return Err(invalid("an identityref cannot be restricted".to_owned()));
                }
                bases
            };
            TypeKind::Identityref { bases }
        }
        TypeKind::Leafref {
            path: old_path,
            require_instance,
            target,
        } => {
            if direct && spec.path.is_none() {
                return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                    keyword: "path",
                    parent: "type leafref".to_owned(),
                })
                .with_span(span));
            }
            if !direct && spec.path.is_some() {
                return Err(invalid("a leafref path cannot be replaced".to_owned()));
            }
            let path = match &spec.path {
                Some(path_stmt) => {
                    let modules = cx.modules;
                    let module = scope.module;
                    let doc = scope.doc;
                    path::parse_leafref_path(
                        path_stmt,
                        |prefix| modules[module].resolve_prefix(doc, prefix),
                        cx.dict,
                    )
                    .map_err(|message| {
                        Diagnostic::error(DiagnosticData::BadLeafrefPath {
                            path: path_stmt.as_ref().clone(),
                            message,
                        })
                        .with_span(path_stmt.span())
                    })?
                }
                None => old_path,
            };
            TypeKind::Leafref {
                path,
                require_instance: spec.require_instance.unwrap_or(require_instance),
                target,
            }
        }
        TypeKind::Union {
            members,
            has_pointer_type,
        } => {
            let (members, has_pointer_type) = if direct {
                if spec.union_types.is_empty() {
                    return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                        keyword: "type",
                        parent: "type union".to_owned(),
                    })
                    .with_span(span));
                }
                let mut out = Vec::new();
                for member in &spec.union_types {
                    let member_ty = resolve_type(cx, scope, member)?;
                    if cx.modules[scope.module].version == ast::YangVersion::V1
                        && matches!(member_ty.base, BuiltinType::Leafref | BuiltinType::Empty)
                    {
                        return Err(invalid(format!(
                            "a YANG version 1 union cannot contain `{}`",
                            member_ty.base.name()
                        )));
                    }
                    out.push(member_ty);
                }
                let pointer = out.iter().any(Type::has_pointer_type);
                (out, pointer)
            } else {
                (members, has_pointer_type)
            };
            TypeKind::Union {
                members,
                has_pointer_type,
            }
        }
        TypeKind::InstanceIdentifier { require_instance } => TypeKind::InstanceIdentifier {
            require_instance: spec.require_instance.unwrap_or(require_instance),
        },
        TypeKind::Boolean => TypeKind::Boolean,
        TypeKind::Empty => TypeKind::Empty,
    };

    Ok(Type {
        base,
        typedef: parent.typedef,
        typedef_default: parent.typedef_default,
        kind,
    })
}

fn resolve_identity_base(
    cx: &mut TypeCx<'_>,
    scope: &TypeScope,
    base: &Node<ast::QName>,
) -> Result<SymbolRef, Diagnostic> {
    let module = match &base.prefix {
        Some(prefix) => cx.modules[scope.module]
            .resolve_prefix(scope.doc, prefix)
            .ok_or_else(|| {
                Diagnostic::error(DiagnosticData::UnresolvedReference {
                    kind: "prefix",
                    name: prefix.to_string(),
                })
                .with_span(base.span())
            })?,
        None => scope.module,
    };
    if cx.modules[module].identities.get(base.name.as_str()).is_none() {
        return Err(Diagnostic::error(DiagnosticData::UnresolvedReference {
            kind: "identity",
            name: base.as_ref().to_string(),
        })
        .with_span(base.span()));
    }
    Ok(SymbolRef {
        module,
        name: base.name.clone(),
    })
}

fn compile_pattern_stmt(
    stmt: &Node<ast::PatternStmt>,
    in_grouping: bool,
) -> Result<Pattern, Diagnostic> {
    let compiled = compile_pattern(&stmt.value).map_err(|e| {
        Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "pattern".to_owned(),
            message: e.to_string(),
        })
        .with_span(stmt.span())
    })?;
    Ok(Pattern {
        source: stmt.value.clone(),
        invert_match: stmt.invert_match,
        error_message: stmt.error_message.clone(),
        error_app_tag: stmt.error_app_tag.clone(),
        // Inside groupings the compiled automaton is discarded; the copy
        // at the expansion site compiles again.
        regex: (!in_grouping).then_some(compiled),
    })
}

/// Checks a pattern's syntax without keeping the automaton.
pub(crate) fn syntax_check_pattern(stmt: &Node<ast::PatternStmt>) -> Result<(), Diagnostic> {
    compile_pattern(&stmt.value).map(|_| ()).map_err(|e| {
        Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "pattern".to_owned(),
            message: e.to_string(),
        })
        .with_span(stmt.span())
    })
}

#[derive(Clone, Copy)]
enum NumberKind {
    Signed,
    Unsigned,
    Decimal(u8),
}

impl NumberKind {
    fn of_integer(base: BuiltinType) -> NumberKind {
        match base {
            BuiltinType::Int8 | BuiltinType::Int16 | BuiltinType::Int32 | BuiltinType::Int64 => {
                NumberKind::Signed
            }
            _ => NumberKind::Unsigned,
        }
    }

    fn parse(self, text: &str) -> Result<Number, String> {
        match self {
            NumberKind::Signed => text
                .parse()
                .map(Number::Signed)
                .map_err(|_| format!("`{text}` is not a valid integer")),
            NumberKind::Unsigned => text
                .parse()
                .map(Number::Unsigned)
                .map_err(|_| format!("`{text}` is not a valid unsigned integer")),
            NumberKind::Decimal(digits) => parse_decimal(text, digits),
        }
    }
}

/// Parses a decimal64 literal into its scaled-integer representation.
pub(crate) fn parse_decimal(text: &str, fraction_digits: u8) -> Result<Number, String> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(format!("`{text}` is not a decimal value"));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(format!("`{text}` is not a decimal value"));
    }
    if frac_part.len() > fraction_digits as usize {
        return Err(format!(
            "`{text}` has more than {fraction_digits} fraction digits"
        ));
    }
    let mut value: i128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse::<i128>().map_err(|_| "value out of range")?
    };
    value *= 10i128.pow(fraction_digits as u32);
    if !frac_part.is_empty() {
        let mut frac: i128 = frac_part.parse().map_err(|_| "value out of range")?;
        frac *= 10i128.pow((fraction_digits as usize - frac_part.len()) as u32);
        value += frac;
    }
    if negative {
        value = -value;
    }
    let value = i64::try_from(value).map_err(|_| format!("`{text}` is out of range"))?;
    Ok(Number::Decimal {
        value,
        fraction_digits,
    })
}

fn effective_restriction(explicit: &Option<Restriction>, bounds: (Number, Number)) -> Restriction {
    match explicit {
        Some(restriction) => restriction.clone(),
        None => Restriction {
            parts: vec![RangePart {
                min: bounds.0,
                max: bounds.1,
            }],
            ..Default::default()
        },
    }
}

/// Parses a range/length expression and checks it narrows the parent.
fn restrict(
    stmt: &Node<ast::RangeStmt>,
    parent: &Restriction,
    kind: NumberKind,
    not_narrowing: &impl Fn(String) -> Diagnostic,
) -> Result<Restriction, Diagnostic> {
    let span = stmt.span();
    let parse_bound = |text: &str| -> Result<Number, String> {
        match text {
            "min" => Ok(parent.parts.first().expect("non-empty parent").min),
            "max" => Ok(parent.parts.last().expect("non-empty parent").max),
            _ => kind.parse(text),
        }
    };
    let mut parts = Vec::new();
    for part in stmt.expr.split('|') {
        let part = part.trim();
        if part.is_empty() {
            return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                keyword: "range".to_owned(),
                message: "empty range part".to_owned(),
            })
            .with_span(span));
        }
        let (min, max) = match part.split_once("..") {
            Some((lo, hi)) => {
                let min = parse_bound(lo.trim()).map_err(arg_error(span))?;
                let max = parse_bound(hi.trim()).map_err(arg_error(span))?;
                (min, max)
            }
            None => {
                let value = parse_bound(part).map_err(arg_error(span))?;
                (value, value)
            }
        };
        if !min.le(max) {
            return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                keyword: "range".to_owned(),
                message: format!("`{part}` is not an ascending interval"),
            })
            .with_span(span));
        }
        if let Some(prev) = parts.last() {
            let prev: &RangePart = prev;
            if !prev.max.le(min) || prev.max == min {
                return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                    keyword: "range".to_owned(),
                    message: "range parts must be disjoint and ascending".to_owned(),
                })
                .with_span(span));
            }
        }
        parts.push(RangePart { min, max });
    }
    let restriction = Restriction {
        parts,
        error_message: stmt.error_message.clone(),
        error_app_tag: stmt.error_app_tag.clone(),
    };
    if !restriction.is_subset_of(parent) {
        return Err(not_narrowing(format!(
            "`{}` is not a subset of the parent restriction",
            stmt.expr
        ))
        .with_span(span));
    }
    Ok(restriction)
}

fn arg_error(span: Option<SourceSpan>) -> impl Fn(String) -> Diagnostic {
    move |message| {
        Diagnostic::error(DiagnosticData::InvalidArgument {
            keyword: "range".to_owned(),
            message,
        })
        .with_span(span)
    }
}

/// Assigns enum values at the direct derivation from the built-in.
fn assign_enum_values(
    stmts: &[Node<ast::EnumStmt>],
    span: Option<SourceSpan>,
) -> Result<Vec<EnumValue>, Diagnostic> {
    let mut enums: Vec<EnumValue> = Vec::new();
    let mut highest: Option<i32> = None;
    for stmt in stmts {
        if enums.iter().any(|e| e.name == stmt.name) {
            return Err(Diagnostic::error(DiagnosticData::Duplicate {
                what: "enum".to_owned(),
                name: Some(stmt.name.clone()),
            })
            .with_span(stmt.span()));
        }
        let value = match stmt.value {
            Some(value) => value,
            None => match highest {
                Some(i32::MAX) => {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "enum".to_owned(),
                        message: "no next enum value left to assign".to_owned(),
                    })
                    .with_span(span))
                }
                Some(highest) => highest + 1,
                None => 0,
            },
        };
        if enums.iter().any(|e| e.value == value) {
            return Err(Diagnostic::error(DiagnosticData::Duplicate {
                what: "enum value".to_owned(),
                name: Some(value.to_string()),
            })
            .with_span(stmt.span()));
        }
        highest = Some(highest.map_or(value, |h| h.max(value)));
        enums.push(EnumValue {
            name: stmt.name.clone(),
            value,
        });
    }
    Ok(enums)
}

/// Restricts an enumeration: the listed names must exist upstream and keep
/// their values.
fn restrict_enums(
    parent: &[EnumValue],
    stmts: &[Node<ast::EnumStmt>],
    not_narrowing: &impl Fn(String) -> Diagnostic,
) -> Result<Vec<EnumValue>, Diagnostic> {
    let mut enums = Vec::new();
    for stmt in stmts {
        let Some(inherited) = parent.iter().find(|e| e.name == stmt.name) else {
            return Err(
                not_narrowing(format!("enum `{}` does not exist in the base type", stmt.name))
                    .with_span(stmt.span()),
            );
        };
        if let Some(value) = stmt.value {
            if value != inherited.value {
                return Err(not_narrowing(format!(
                    "enum `{}` must keep the value {} of the base type",
                    stmt.name, inherited.value
                ))
                .with_span(stmt.span()));
            }
        }
        enums.push(inherited.clone());
    }
    Ok(enums)
}

fn assign_bit_positions(
    stmts: &[Node<ast::BitStmt>],
    span: Option<SourceSpan>,
) -> Result<Vec<Bit>, Diagnostic> {
    let mut bits: Vec<Bit> = Vec::new();
    let mut highest: Option<u32> = None;
    for stmt in stmts {
        if bits.iter().any(|b| b.name == stmt.name) {
            return Err(Diagnostic::error(DiagnosticData::Duplicate {
                what: "bit".to_owned(),
                name: Some(stmt.name.to_string()),
            })
            .with_span(stmt.span()));
        }
        let position = match stmt.position {
            Some(position) => position,
            None => match highest {
                Some(u32::MAX) => {
                    return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                        keyword: "bit".to_owned(),
                        message: "no next bit position left to assign".to_owned(),
                    })
                    .with_span(span))
                }
                Some(highest) => highest + 1,
                None => 0,
            },
        };
        if bits.iter().any(|b| b.position == position) {
            return Err(Diagnostic::error(DiagnosticData::Duplicate {
                what: "bit position".to_owned(),
                name: Some(position.to_string()),
            })
            .with_span(stmt.span()));
        }
        highest = Some(highest.map_or(position, |h| h.max(position)));
        bits.push(Bit {
            name: stmt.name.clone(),
            position,
        });
    }
    Ok(bits)
}

fn restrict_bits(
    parent: &[Bit],
    stmts: &[Node<ast::BitStmt>],
    not_narrowing: &impl Fn(String) -> Diagnostic,
) -> Result<Vec<Bit>, Diagnostic> {
    let mut bits = Vec::new();
    for stmt in stmts {
        let Some(inherited) = parent.iter().find(|b| b.name == stmt.name) else {
            return Err(
                not_narrowing(format!("bit `{}` does not exist in the base type", stmt.name))
                    .with_span(stmt.span()),
            );
        };
        if let Some(position) = stmt.position {
            if position != inherited.position {
                return Err(not_narrowing(format!(
                    "bit `{}` must keep the position {} of the base type",
                    stmt.name, inherited.position
                ))
                .with_span(stmt.span()));
            }
        }
        bits.push(inherited.clone());
    }
    Ok(bits)
}
