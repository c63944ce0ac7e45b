//! Canonical value checking against compiled types.
//!
//! Used for `default` arguments on leafs, leaf-lists, and typedefs, and
//! re-run when a deviation replaces a type. The error is a plain message;
//! callers wrap it into `DefaultValueInvalid` with their own location.

use super::*;
use crate::schema::{Module, ModuleId, SchemaGraph, SymbolRef};
use base64::Engine;

/// Lookup context for values that reference other schema entities.
pub(crate) struct ValueCx<'a> {
    pub graph: &'a SchemaGraph,
    pub modules: &'a [Module],
    /// Module and document the value was written in, for prefix binding.
    pub module: ModuleId,
    pub doc: usize,
}

pub(crate) fn validate_value(cx: &ValueCx<'_>, ty: &Type, value: &str) -> Result<(), String> {
    match &ty.kind {
        TypeKind::Numeric { range } => {
            let kind_err = || format!("`{value}` is not a valid {}", ty.base.name());
            let (min, max) = ty.base.integer_bounds().expect("numeric base");
            let number = match min {
                Number::Signed(_) => value
                    .parse::<i64>()
                    .map(Number::Signed)
                    .map_err(|_| kind_err())?,
                _ => value
                    .parse::<u64>()
                    .map(Number::Unsigned)
                    .map_err(|_| kind_err())?,
            };
            if !(min.le(number) && number.le(max)) {
                return Err(format!("{value} is out of the {} range", ty.base.name()));
            }
            check_range(range, number, value)
        }
        TypeKind::Decimal64 {
            fraction_digits,
            range,
        } => {
            let number = super::resolve::parse_decimal(value, *fraction_digits)?;
            check_range(range, number, value)
        }
        TypeKind::String { length, patterns } => {
            let chars = value.chars().count() as u64;
            check_range(length, Number::Unsigned(chars), value)?;
            for pattern in patterns {
                if !pattern.matches(value) {
                    return Err(match &pattern.error_message {
                        Some(message) => message.clone(),
                        None => format!(
                            "`{value}` does not match the pattern `{}`",
                            pattern.source
                        ),
                    });
                }
            }
            Ok(())
        }
        TypeKind::Binary { length } => {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(value.trim())
                .map_err(|_| format!("`{value}` is not valid base64"))?;
            check_range(length, Number::Unsigned(decoded.len() as u64), value)
        }
        TypeKind::Boolean => match value {
            "true" | "false" => Ok(()),
            _ => Err(format!("`{value}` is not a boolean")),
        },
        TypeKind::Empty => Err("a value of type empty carries no content".to_owned()),
        TypeKind::Enumeration { enums } => {
            if enums.iter().any(|e| e.name == value) {
                Ok(())
            } else {
                Err(format!("`{value}` is not an enum of the type"))
            }
        }
        TypeKind::Bits { bits } => {
            let mut seen = Vec::new();
            for name in value.split_whitespace() {
                if !bits.iter().any(|b| b.name == *name) {
                    return Err(format!("`{name}` is not a bit of the type"));
                }
                if seen.contains(&name) {
                    return Err(format!("bit `{name}` appears twice"));
                }
                seen.push(name);
            }
            Ok(())
        }
        TypeKind::Identityref { bases } => {
            let value_ref = parse_identity_value(cx, value)?;
            for base in bases {
                if identity_derived_from(cx.modules, &value_ref, base) {
                    return Ok(());
                }
            }
            Err(format!(
                "identity `{value}` is not derived from a base of the identityref"
            ))
        }
        TypeKind::Leafref { target, .. } => {
            let Some(&target) = target.get() else {
                return Err("the leafref path is not resolved".to_owned());
            };
            let node = cx.graph.node(target);
            let Some(slot) = node.type_slot() else {
                return Err("the leafref target has no type".to_owned());
            };
            match slot.resolved() {
                Some(target_ty) => validate_value(cx, target_ty, value),
                None => Err("the leafref target type is not resolved".to_owned()),
            }
        }
        TypeKind::InstanceIdentifier { .. } => {
            let expr = crate::xpath::parse(value).map_err(|e| e.to_string())?;
            match expr {
                crate::xpath::Expr::Path(path) if path.absolute => Ok(()),
                _ => Err(format!("`{value}` is not an absolute instance path")),
            }
        }
        TypeKind::Union { members, .. } => {
            for member in members {
                if validate_value(cx, member, value).is_ok() {
                    return Ok(());
                }
            }
            Err(format!("`{value}` does not match any member of the union"))
        }
    }
}

fn check_range(restriction: &Option<Restriction>, number: Number, value: &str) -> Result<(), String> {
    match restriction {
        Some(restriction) if !restriction.contains(number) => Err(match &restriction.error_message
        {
            Some(message) => message.clone(),
            None => format!("{value} is outside the allowed values"),
        }),
        _ => Ok(()),
    }
}

fn parse_identity_value(cx: &ValueCx<'_>, value: &str) -> Result<SymbolRef, String> {
    let (prefix, name) = match value.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, value),
    };
    let module = match prefix {
        Some(prefix) => cx.modules[cx.module]
            .resolve_prefix(cx.doc, prefix)
            .ok_or_else(|| format!("unknown prefix `{prefix}`"))?,
        None => cx.module,
    };
    let identity = cx.modules[module]
        .identities
        .get(name)
        .ok_or_else(|| format!("cannot find identity `{value}`"))?;
    Ok(SymbolRef {
        module,
        name: identity.name.clone(),
    })
}

/// Whether `identity` transitively derives from `base` (self excluded).
pub(crate) fn identity_derived_from(
    modules: &[Module],
    identity: &SymbolRef,
    base: &SymbolRef,
) -> bool {
    let mut stack = vec![identity.clone()];
    let mut seen = Vec::new();
    while let Some(current) = stack.pop() {
        if seen.contains(&current) {
            continue;
        }
        let Some(def) = modules[current.module].identities.get(current.name.as_str()) else {
            seen.push(current);
            continue;
        };
        for parent in &def.bases {
            if parent == base {
                return true;
            }
            stack.push(parent.clone());
        }
        seen.push(current);
    }
    false
}
