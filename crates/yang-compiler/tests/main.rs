mod groupings;
mod modifiers;
mod modules;
mod scenarios;
mod types;

use yang_compiler::{Context, ModuleId, ParseOptions};

/// Wraps a YANG 1.1 module body in YIN boilerplate. The module prefix is
/// the module name, so tests can write `name:node` references directly.
pub fn yin(name: &str, body: &str) -> String {
    format!(
        r#"<module name="{name}" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
  <yang-version value="1.1"/>
  <namespace uri="urn:test:{name}"/>
  <prefix value="{name}"/>
  {body}
</module>"#
    )
}

pub fn load(ctx: &mut Context, name: &str, body: &str) -> ModuleId {
    try_load(ctx, name, body).unwrap_or_else(|e| panic!("loading `{name}` failed:\n{e}"))
}

pub fn try_load(
    ctx: &mut Context,
    name: &str,
    body: &str,
) -> Result<ModuleId, yang_compiler::Diagnostics> {
    ctx.parse_yin(&yin(name, body), &format!("{name}.yin"), ParseOptions::empty())
}

/// The first error of a load that is expected to fail.
pub fn load_err(ctx: &mut Context, name: &str, body: &str) -> yang_compiler::DiagnosticData {
    match try_load(ctx, name, body) {
        Ok(_) => panic!("loading `{name}` unexpectedly succeeded"),
        Err(diagnostics) => diagnostics.first().expect("at least one record").data.clone(),
    }
}
