//! Schema-node paths: augment/deviation targets, `unique`/`refine`
//! descendants, and leafref path arguments.
//!
//! Prefixes are bound to modules while parsing, through a resolver closure
//! supplied by the caller (each source document has its own prefix scope);
//! the names themselves stay symbolic until the resolver walks the graph.

use crate::ident::{Dictionary, Ident};
use crate::schema::ModuleId;
use crate::xpath;

/// A parsed schema-node-id: `/p:a/b/c` or a descendant `a/b/c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPath {
    pub absolute: bool,
    pub steps: Vec<PathStep>,
}

/// One step of a schema path. `module` is `None` for unprefixed names,
/// which belong to the module the path appeared in (bound by the walker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub module: Option<ModuleId>,
    pub name: Ident,
}

/// A parsed leafref path argument.
///
/// Relative paths climb `up` levels from the leaf's parent before
/// descending; predicates are syntax-checked and retained as source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafrefPath {
    pub source: String,
    pub absolute: bool,
    pub up: usize,
    pub steps: Vec<LeafrefStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafrefStep {
    pub module: Option<ModuleId>,
    pub name: Ident,
    pub predicates: Vec<String>,
}

pub(crate) fn valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Parses a schema-node-id (RFC 7950 section 6.5).
pub(crate) fn parse_schema_path(
    source: &str,
    require_absolute: bool,
    resolve_prefix: impl Fn(&str) -> Option<ModuleId>,
    dict: &mut Dictionary,
) -> Result<SchemaPath, String> {
    let source = source.trim();
    if source.is_empty() {
        return Err("empty schema path".to_owned());
    }
    let (absolute, rest) = match source.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, source),
    };
    if require_absolute && !absolute {
        return Err("expected an absolute schema path".to_owned());
    }
    let mut steps = Vec::new();
    for segment in rest.split('/') {
        if segment.is_empty() {
            return Err("empty step in schema path".to_owned());
        }
        steps.push(parse_step(segment, &resolve_prefix, dict)?);
    }
    Ok(SchemaPath { absolute, steps })
}

fn parse_step(
    segment: &str,
    resolve_prefix: &impl Fn(&str) -> Option<ModuleId>,
    dict: &mut Dictionary,
) -> Result<PathStep, String> {
    let (prefix, name) = match segment.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, segment),
    };
    if !valid_identifier(name) {
        return Err(format!("`{name}` is not a valid node identifier"));
    }
    let module = match prefix {
        Some(prefix) => Some(
            resolve_prefix(prefix).ok_or_else(|| format!("unknown prefix `{prefix}`"))?,
        ),
        None => None,
    };
    Ok(PathStep {
        module,
        name: dict.insert(name),
    })
}

/// Parses a leafref path-arg (RFC 7950 section 9.9.2).
pub(crate) fn parse_leafref_path(
    source: &str,
    resolve_prefix: impl Fn(&str) -> Option<ModuleId>,
    dict: &mut Dictionary,
) -> Result<LeafrefPath, String> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err("empty path".to_owned());
    }
    let (absolute, rest) = match trimmed.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let segments = split_steps(rest)?;
    let mut up = 0usize;
    let mut steps = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        if segment == ".." {
            if i != up || absolute {
                return Err("`..` is only allowed at the start of a relative path".to_owned());
            }
            up += 1;
            continue;
        }
        steps.push(parse_leafref_step(segment, &resolve_prefix, dict)?);
    }
    if !absolute && up == 0 {
        return Err("a relative path must start with `..`".to_owned());
    }
    if steps.is_empty() {
        return Err("the path names no node".to_owned());
    }
    Ok(LeafrefPath {
        source: source.to_owned(),
        absolute,
        up,
        steps,
    })
}

fn parse_leafref_step(
    segment: &str,
    resolve_prefix: &impl Fn(&str) -> Option<ModuleId>,
    dict: &mut Dictionary,
) -> Result<LeafrefStep, String> {
    let (name_part, predicates) = match segment.find('[') {
        Some(bracket) => {
            let (name_part, preds) = segment.split_at(bracket);
            (name_part, split_predicates(preds)?)
        }
        None => (segment, Vec::new()),
    };
    for predicate in &predicates {
        xpath::parse(predicate).map_err(|e| format!("bad predicate: {e}"))?;
    }
    let step = parse_step(name_part, resolve_prefix, dict)?;
    Ok(LeafrefStep {
        module: step.module,
        name: step.name,
        predicates,
    })
}

/// Splits on `/` outside predicate brackets.
fn split_steps(source: &str) -> Result<Vec<String>, String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in source.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.checked_sub(1).ok_or("unbalanced `]`")?;
                current.push(c);
            }
            '/' if depth == 0 => {
                if current.is_empty() {
                    return Err("empty step in path".to_owned());
                }
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if depth != 0 {
        return Err("unbalanced `[`".to_owned());
    }
    if current.is_empty() {
        return Err("path ends with `/`".to_owned());
    }
    segments.push(current);
    Ok(segments)
}

/// Extracts the bracketed predicate sources of one step.
fn split_predicates(source: &str) -> Result<Vec<String>, String> {
    let mut predicates = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in source.chars() {
        match c {
            '[' => {
                if depth > 0 {
                    current.push(c);
                }
                depth += 1;
            }
            ']' => {
                depth = depth.checked_sub(1).ok_or("unbalanced `]`")?;
                if depth == 0 {
                    predicates.push(std::mem::take(&mut current));
                } else {
                    current.push(c);
                }
            }
            _ if depth > 0 => current.push(c),
            c if c.is_whitespace() => {}
            other => return Err(format!("unexpected `{other}` between predicates")),
        }
    }
    if depth != 0 {
        return Err("unbalanced `[`".to_owned());
    }
    Ok(predicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_prefixes(_: &str) -> Option<ModuleId> {
        None
    }

    #[test]
    fn relative_paths_count_their_ups() {
        let mut dict = Dictionary::new();
        let path = parse_leafref_path("../../config/name", no_prefixes, &mut dict).unwrap();
        assert!(!path.absolute);
        assert_eq!(path.up, 2);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[1].name, "name");
    }

    #[test]
    fn predicates_do_not_break_step_splitting() {
        let mut dict = Dictionary::new();
        let path = parse_leafref_path(
            "/interfaces/interface[name = current()/../ifname]/enabled",
            no_prefixes,
            &mut dict,
        )
        .unwrap();
        assert!(path.absolute);
        assert_eq!(path.steps.len(), 3);
        assert_eq!(path.steps[1].predicates.len(), 1);
        assert!(path.steps[1].predicates[0].contains("current()"));
    }

    #[test]
    fn up_after_a_named_step_is_rejected() {
        let mut dict = Dictionary::new();
        assert!(parse_leafref_path("../a/../b", no_prefixes, &mut dict).is_err());
    }

    #[test]
    fn relative_path_requires_leading_up() {
        let mut dict = Dictionary::new();
        assert!(parse_leafref_path("a/b", no_prefixes, &mut dict).is_err());
    }

    #[test]
    fn unknown_prefixes_are_reported() {
        let mut dict = Dictionary::new();
        let err = parse_schema_path("/x:a", true, no_prefixes, &mut dict).unwrap_err();
        assert!(err.contains("unknown prefix"));
    }

    #[test]
    fn bad_predicate_syntax_is_reported() {
        let mut dict = Dictionary::new();
        let err =
            parse_leafref_path("../a[name = ]", no_prefixes, &mut dict).unwrap_err();
        assert!(err.contains("bad predicate"));
    }
}
