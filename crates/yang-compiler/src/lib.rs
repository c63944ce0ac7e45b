#![doc = include_str!("../README.md")]

pub mod ast;
mod collections;
pub mod diagnostics;
mod ident;
mod node;
mod path;
mod report;
pub mod schema;
mod source;
pub mod types;
pub mod xpath;

pub use self::diagnostics::{Diagnostic, DiagnosticData, Diagnostics, Severity};
pub use self::ident::{Dictionary, Ident};
pub use self::node::Node;
pub use self::path::{LeafrefPath, SchemaPath};
pub use self::report::format_diagnostic;
pub use self::schema::{
    Feature, Identity, Module, ModuleId, NodeFlags, NodeId, NodeKind, SchemaGraph, SchemaNode,
};
pub use self::source::{FileId, SourceFile, SourceMap, SourceSpan};
pub use self::types::{BuiltinType, Type, TypeKind};

use self::ast::StatementReader;
use self::schema::resolve::Load;
use self::schema::{builder, deviation, resolve, validate, IfFeatureExpr, Import, Include, PrefixMap};
use bitflags::bitflags;
use triomphe::Arc;

bitflags! {
    /// Options controlling one parse operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParseOptions: u8 {
        /// Skip semantic validation; the caller vouches for the input.
        const TRUSTED = 1 << 0;
        /// Imports naming a revision-date must match it exactly.
        const STRICT_REVISIONS = 1 << 1;
        /// Parse deviation statements but do not apply them.
        const DISABLE_DEVIATIONS = 1 << 2;
        /// Do not attempt to load `ietf-yang-library` through the
        /// module-source hook.
        const NO_YANG_LIBRARY = 1 << 3;
    }
}

/// Resolves a module name (and optional revision) to YIN document text.
/// Installed by the caller; imports, includes, and the yang-library
/// auto-load go through it.
pub type ModuleSourceHook = Box<dyn Fn(&str, Option<&str>) -> Option<String> + Send + Sync>;

/// A session: the registry of loaded modules and everything they own.
///
/// Compilation is single-threaded per context; a compiled context is
/// read-only and can be consulted from many threads.
pub struct Context {
    pub(crate) dict: Dictionary,
    pub(crate) sources: SourceMap,
    pub(crate) graph: SchemaGraph,
    pub(crate) modules: Vec<Module>,
    default_options: ParseOptions,
    module_source: Option<ModuleSourceHook>,
    /// Modules currently being loaded, for import-cycle detection.
    loading: Vec<String>,
    yang_library_tried: bool,
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<Context>();
    assert_sync::<Context>();
};

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::empty())
    }

    /// Creates a context whose options apply to every parse.
    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            dict: Dictionary::new(),
            sources: SourceMap::default(),
            graph: SchemaGraph::default(),
            modules: Vec::new(),
            default_options: options,
            module_source: None,
            loading: Vec::new(),
            yang_library_tried: false,
        }
    }

    /// Installs the hook that resolves module names to document text.
    pub fn set_module_source(&mut self, hook: ModuleSourceHook) {
        self.module_source = Some(hook);
    }

    /// Parses and compiles one YIN module.
    ///
    /// On failure the context is unchanged (apart from the registered
    /// source text) and the returned diagnostics list the error records
    /// deepest-first, followed by any warnings gathered on the way.
    pub fn parse_yin(
        &mut self,
        text: &str,
        name: &str,
        options: ParseOptions,
    ) -> Result<ModuleId, Diagnostics> {
        let options = options | self.default_options;
        self.autoload_yang_library(options);
        match self.load_document(text, name, options, true) {
            Ok(id) => {
                for warning in &self.modules[id].warnings {
                    log::warn!("{warning}");
                }
                Ok(id)
            }
            Err(error) => {
                let mut diagnostics = Diagnostics::new(self.sources.clone());
                diagnostics.push_lifo(error);
                Err(diagnostics)
            }
        }
    }

    /// Looks up a loaded module; without a revision the newest one wins.
    pub fn get_module(&self, name: &str, revision: Option<&str>) -> Option<&Module> {
        self.get_module_id(name, revision).map(|id| &self.modules[id])
    }

    pub fn get_module_id(&self, name: &str, revision: Option<&str>) -> Option<ModuleId> {
        match revision {
            Some(revision) => self
                .modules
                .iter()
                .position(|m| m.name == *name && m.revision.as_deref() == Some(revision)),
            None => self
                .modules
                .iter()
                .enumerate()
                .filter(|(_, m)| m.name == *name)
                .max_by(|(_, a), (_, b)| a.revision.cmp(&b.revision))
                .map(|(id, _)| id),
        }
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id]
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    /// Data path of a node for diagnostics, e.g. `/m:a/b`.
    pub fn schema_path(&self, node: NodeId) -> String {
        self.graph.path_string(node, &self.modules)
    }

    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// Marks a module as implemented (its data nodes are instantiated).
    pub fn set_implemented(&mut self, id: ModuleId) {
        self.modules[id].implemented = true;
    }

    pub fn enable_feature(&mut self, id: ModuleId, name: &str) -> Result<(), Diagnostic> {
        self.set_feature(id, name, true)
    }

    pub fn disable_feature(&mut self, id: ModuleId, name: &str) -> Result<(), Diagnostic> {
        self.set_feature(id, name, false)
    }

    fn set_feature(&mut self, id: ModuleId, name: &str, enabled: bool) -> Result<(), Diagnostic> {
        match self.modules[id].features.get_mut(name) {
            Some(feature) => {
                feature.enabled = enabled;
                Ok(())
            }
            None => Err(Diagnostic::error(DiagnosticData::UnresolvedReference {
                kind: "feature",
                name: name.to_owned(),
            })),
        }
    }

    /// Whether all if-feature guards of a node are satisfied by the
    /// currently enabled features.
    pub fn if_features_enabled(&self, node: NodeId) -> bool {
        self.graph
            .node(node)
            .if_features
            .iter()
            .all(|guard| self.eval_feature_expr(&guard.expr))
    }

    fn eval_feature_expr(&self, expr: &IfFeatureExpr) -> bool {
        match expr {
            IfFeatureExpr::Ref(sym) => self.modules[sym.module]
                .features
                .get(sym.name.as_str())
                .map(|f| f.enabled)
                .unwrap_or(false),
            IfFeatureExpr::Not(inner) => !self.eval_feature_expr(inner),
            IfFeatureExpr::And(a, b) => self.eval_feature_expr(a) && self.eval_feature_expr(b),
            IfFeatureExpr::Or(a, b) => self.eval_feature_expr(a) || self.eval_feature_expr(b),
        }
    }

    /// Finds schema nodes by an absolute path of `module-name:node`
    /// steps, e.g. `/example:system/hostname`. Unprefixed steps stay in
    /// the previous step's module; the first step needs a prefix unless a
    /// starting module is given.
    pub fn find_path(
        &self,
        module: Option<ModuleId>,
        path: &str,
    ) -> Result<Vec<NodeId>, Diagnostic> {
        let bad = |message: String| {
            Diagnostic::error(DiagnosticData::InvalidArgument {
                keyword: "path".to_owned(),
                message,
            })
        };
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| bad("expected an absolute path".to_owned()))?;
        let mut current_module = module;
        let mut current: Option<NodeId> = None;
        for segment in rest.split('/') {
            if segment.is_empty() {
                return Err(bad("empty step in path".to_owned()));
            }
            let (module_name, name) = match segment.split_once(':') {
                Some((module_name, name)) => (Some(module_name), name),
                None => (None, segment),
            };
            if let Some(module_name) = module_name {
                current_module = Some(self.get_module_id(module_name, None).ok_or_else(|| {
                    Diagnostic::error(DiagnosticData::UnresolvedReference {
                        kind: "module",
                        name: module_name.to_owned(),
                    })
                })?);
            }
            let Some(step_module) = current_module else {
                return Err(bad(format!("step `{segment}` needs a module prefix")));
            };
            let children: &[NodeId] = match current {
                Some(id) => &self.graph.node(id).children,
                None => &self.modules[step_module].children,
            };
            let found = children
                .iter()
                .copied()
                .find(|&c| {
                    let node = self.graph.node(c);
                    node.name == *name && node.module == step_module && node.is_data()
                })
                .ok_or_else(|| {
                    Diagnostic::error(DiagnosticData::UnresolvedReference {
                        kind: "schema node",
                        name: segment.to_owned(),
                    })
                })?;
            current = Some(found);
            current_module = Some(self.graph.node(found).module);
        }
        Ok(current.into_iter().collect())
    }

    fn autoload_yang_library(&mut self, options: ParseOptions) {
        if self.yang_library_tried || options.contains(ParseOptions::NO_YANG_LIBRARY) {
            return;
        }
        self.yang_library_tried = true;
        if self.get_module_id("ietf-yang-library", None).is_some() {
            return;
        }
        let text = match &self.module_source {
            Some(hook) => hook("ietf-yang-library", None),
            None => return,
        };
        let Some(text) = text else { return };
        if let Err(error) = self.load_document(&text, "ietf-yang-library.yin", options, true) {
            log::warn!("cannot load ietf-yang-library: {error}");
        }
    }

    /// Loads one module document, recursively satisfying its imports.
    fn load_document(
        &mut self,
        text: &str,
        source_name: &str,
        options: ParseOptions,
        implement: bool,
    ) -> Result<ModuleId, Diagnostic> {
        let file = FileId::new(self.sources.len());
        self.sources.insert(
            file,
            Arc::new(SourceFile::new(source_name.to_owned(), text.to_owned())),
        );
        let root = yin_parser::parse(text).map_err(|e| {
            Diagnostic::error(DiagnosticData::MalformedXml {
                message: e.message,
                offset: e.offset,
            })
            .with_span(SourceSpan {
                file,
                start: e.offset,
                end: e.offset,
            })
        })?;
        let stmt = StatementReader::new(&mut self.dict, file).read_document(root)?;
        if stmt.is_submodule {
            return Err(Diagnostic::error(DiagnosticData::InvalidArgument {
                keyword: "submodule".to_owned(),
                message: format!(
                    "submodule `{}` can only be loaded through its module's include",
                    stmt.name
                ),
            })
            .with_span(stmt.span()));
        }
        let selected_revision = newest_revision(&stmt);
        if self
            .get_module_id(&stmt.name, selected_revision.as_deref())
            .is_some()
        {
            return Err(Diagnostic::error(DiagnosticData::Duplicate {
                what: "module".to_owned(),
                name: Some(stmt.name.to_string()),
            })
            .with_span(stmt.span()));
        }

        let mut pre_warnings = Vec::new();
        self.loading.push(stmt.name.to_string());
        let linkage = self.resolve_linkage(&stmt, options, &mut pre_warnings);
        self.loading.pop();
        let (imports, submodules) = linkage?;

        let module_id = self.install_module(&stmt, file, imports, &submodules, implement)?;
        let mut load = Load::new(module_id, options);
        load.warnings.append(&mut pre_warnings);

        let result = self.compile(&mut load, &stmt, &submodules);
        match result {
            Ok(()) => {
                let mut warnings = std::mem::take(&mut load.warnings);
                self.modules[module_id].warnings.append(&mut warnings);
                Ok(module_id)
            }
            Err(error) => {
                // Every node allocated by this load is in the undo log;
                // rolling back also unsplices and restores foreign state.
                load.undo.rollback(self);
                debug_assert_eq!(module_id, self.modules.len() - 1);
                self.modules.pop();
                Err(error)
            }
        }
    }

    /// Imports and includes: everything that must exist before the body
    /// of the module can be lowered.
    #[allow(clippy::type_complexity)]
    fn resolve_linkage(
        &mut self,
        stmt: &ast::ModuleStmt,
        options: ParseOptions,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<(Vec<(Import, Option<SourceSpan>)>, Vec<(Node<ast::ModuleStmt>, Vec<Import>)>), Diagnostic>
    {
        let mut imports = Vec::new();
        for import in &stmt.imports {
            let id = self.resolve_import(import, options, warnings)?;
            imports.push((
                Import {
                    module: id,
                    prefix: import.prefix.clone(),
                    revision: import.revision.clone(),
                },
                import.span(),
            ));
        }

        let mut submodules = Vec::new();
        for include in &stmt.includes {
            let sub_stmt = self.load_submodule(include, &stmt.name, options, warnings)?;
            let mut sub_imports = Vec::new();
            for import in &sub_stmt.imports {
                let id = self.resolve_import(import, options, warnings)?;
                sub_imports.push(Import {
                    module: id,
                    prefix: import.prefix.clone(),
                    revision: import.revision.clone(),
                });
            }
            submodules.push((sub_stmt, sub_imports));
        }
        Ok((imports, submodules))
    }

    fn resolve_import(
        &mut self,
        import: &Node<ast::ImportStmt>,
        options: ParseOptions,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<ModuleId, Diagnostic> {
        if let Some(id) = self.get_module_id(&import.module, import.revision.as_deref()) {
            return Ok(id);
        }
        if import.revision.is_some() {
            if let Some(id) = self.get_module_id(&import.module, None) {
                if options.contains(ParseOptions::STRICT_REVISIONS) {
                    return Err(Diagnostic::error(DiagnosticData::BadImport {
                        module: import.module.to_string(),
                        message: format!(
                            "revision {} is required but {} is loaded",
                            import.revision.as_deref().unwrap_or(""),
                            self.modules[id].revision.as_deref().unwrap_or("none")
                        ),
                    })
                    .with_span(import.span()));
                }
                warnings.push(
                    Diagnostic::warning(DiagnosticData::BadImport {
                        module: import.module.to_string(),
                        message: format!(
                            "using revision {} instead of the requested {}",
                            self.modules[id].revision.as_deref().unwrap_or("none"),
                            import.revision.as_deref().unwrap_or("")
                        ),
                    })
                    .with_span(import.span()),
                );
                return Ok(id);
            }
        }
        if self.loading.iter().any(|n| n == import.module.as_str()) {
            return Err(Diagnostic::error(DiagnosticData::BadImport {
                module: import.module.to_string(),
                message: "circular import".to_owned(),
            })
            .with_span(import.span()));
        }
        let text = match &self.module_source {
            Some(hook) => hook(&import.module, import.revision.as_deref()),
            None => None,
        };
        let Some(text) = text else {
            return Err(Diagnostic::error(DiagnosticData::BadImport {
                module: import.module.to_string(),
                message: "the module is not loaded and no source for it is available".to_owned(),
            })
            .with_span(import.span()));
        };
        let id = self.load_document(&text, &format!("{}.yin", import.module), options, false)?;
        if self.modules[id].name != import.module {
            return Err(Diagnostic::error(DiagnosticData::BadImport {
                module: import.module.to_string(),
                message: format!("the source provided module `{}`", self.modules[id].name),
            })
            .with_span(import.span()));
        }
        Ok(id)
    }

    fn load_submodule(
        &mut self,
        include: &Node<ast::IncludeStmt>,
        owner: &Ident,
        options: ParseOptions,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<Node<ast::ModuleStmt>, Diagnostic> {
        let text = match &self.module_source {
            Some(hook) => hook(&include.module, include.revision.as_deref()),
            None => None,
        };
        let Some(text) = text else {
            return Err(Diagnostic::error(DiagnosticData::BadImport {
                module: include.module.to_string(),
                message: "no source for the included submodule is available".to_owned(),
            })
            .with_span(include.span()));
        };
        let file = FileId::new(self.sources.len());
        self.sources.insert(
            file,
            Arc::new(SourceFile::new(
                format!("{}.yin", include.module),
                text.clone(),
            )),
        );
        let root = yin_parser::parse(&text).map_err(|e| {
            Diagnostic::error(DiagnosticData::MalformedXml {
                message: e.message,
                offset: e.offset,
            })
            .with_span(SourceSpan {
                file,
                start: e.offset,
                end: e.offset,
            })
        })?;
        let stmt = StatementReader::new(&mut self.dict, file).read_document(root)?;
        if !stmt.is_submodule {
            return Err(Diagnostic::error(DiagnosticData::BadImport {
                module: include.module.to_string(),
                message: "the included source is not a submodule".to_owned(),
            })
            .with_span(include.span()));
        }
        let belongs_to = stmt.belongs_to.as_ref().expect("checked by the reader");
        if belongs_to.module != *owner {
            return Err(Diagnostic::error(DiagnosticData::BadImport {
                module: include.module.to_string(),
                message: format!(
                    "the submodule belongs to `{}`, not `{owner}`",
                    belongs_to.module
                ),
            })
            .with_span(include.span()));
        }
        if let Some(required) = &include.revision {
            let newest = newest_revision(&stmt);
            if newest.as_deref() != Some(required.as_str()) {
                let diagnostic = Diagnostic::error(DiagnosticData::BadImport {
                    module: include.module.to_string(),
                    message: format!(
                        "revision {required} is required but the submodule has {}",
                        newest.as_deref().unwrap_or("none")
                    ),
                })
                .with_span(include.span());
                if options.contains(ParseOptions::STRICT_REVISIONS) {
                    return Err(diagnostic);
                }
                warnings.push(Diagnostic {
                    severity: Severity::Warning,
                    ..diagnostic
                });
            }
        }
        Ok(stmt)
    }

    /// Creates the module record with its prefix scopes.
    fn install_module(
        &mut self,
        stmt: &ast::ModuleStmt,
        file: FileId,
        imports: Vec<(Import, Option<SourceSpan>)>,
        submodules: &[(Node<ast::ModuleStmt>, Vec<Import>)],
        implement: bool,
    ) -> Result<ModuleId, Diagnostic> {
        let module_id = self.modules.len();
        let prefix = stmt.prefix.clone().expect("checked by the reader");

        let mut revisions: Vec<String> = Vec::new();
        let mut warnings = Vec::new();
        for revision in &stmt.revisions {
            if revisions.contains(&revision.date) {
                warnings.push(
                    Diagnostic::warning(DiagnosticData::Duplicate {
                        what: "revision".to_owned(),
                        name: Some(revision.date.clone()),
                    })
                    .with_span(revision.span()),
                );
            } else {
                revisions.push(revision.date.clone());
            }
        }
        let selected = revisions.iter().max().cloned();

        let mut main_map = PrefixMap::default();
        main_map.bind(prefix.clone(), module_id);
        let mut flat_imports = Vec::new();
        for (import, span) in imports {
            if main_map.resolve(&import.prefix).is_some() {
                return Err(Diagnostic::error(DiagnosticData::Duplicate {
                    what: "prefix".to_owned(),
                    name: Some(import.prefix.to_string()),
                })
                .with_span(span));
            }
            main_map.bind(import.prefix.clone(), import.module);
            flat_imports.push(import);
        }
        let mut prefix_maps = vec![main_map];
        for (sub_stmt, sub_imports) in submodules {
            let mut map = PrefixMap::default();
            let belongs_to = sub_stmt.belongs_to.as_ref().expect("checked by the reader");
            map.bind(belongs_to.prefix.clone(), module_id);
            for import in sub_imports {
                map.bind(import.prefix.clone(), import.module);
                flat_imports.push(import.clone());
            }
            prefix_maps.push(map);
        }

        let includes = stmt
            .includes
            .iter()
            .map(|include| Include {
                name: include.module.clone(),
                revision: include.revision.clone(),
            })
            .collect();

        self.modules.push(Module {
            name: stmt.name.clone(),
            namespace: stmt.namespace.clone().expect("checked by the reader"),
            prefix,
            version: stmt.yang_version,
            revision: selected,
            revisions,
            organization: stmt.organization.clone(),
            contact: stmt.contact.clone(),
            description: stmt.description.clone(),
            reference: stmt.reference.clone(),
            imports: flat_imports,
            includes,
            implemented: implement,
            deviated: false,
            children: Vec::new(),
            identities: collections::IndexMap::default(),
            features: collections::IndexMap::default(),
            typedefs: collections::IndexMap::default(),
            extensions: collections::IndexMap::default(),
            groupings: collections::IndexMap::default(),
            augments: Vec::new(),
            deviations: Vec::new(),
            extension_instances: Vec::new(),
            prefix_maps,
            file,
            warnings,
        });
        Ok(module_id)
    }

    /// Lowering, resolution, deviations, and validation for one load.
    fn compile(
        &mut self,
        load: &mut Load,
        stmt: &ast::ModuleStmt,
        submodules: &[(Node<ast::ModuleStmt>, Vec<Import>)],
    ) -> Result<(), Diagnostic> {
        builder::build_document_body(self, load, stmt, 0)?;
        for (doc, (sub_stmt, _)) in submodules.iter().enumerate() {
            builder::build_document_body(self, load, sub_stmt, doc + 1)?;
        }
        resolve::drain(self, load)?;
        deviation::apply_all(self, load)?;
        // Deviations re-enqueue replaced types, new defaults, and added
        // constraints.
        resolve::drain(self, load)?;
        if !load.options.contains(ParseOptions::TRUSTED) {
            validate::check(self, load.module)?;
        }
        Ok(())
    }
}

fn newest_revision(stmt: &ast::ModuleStmt) -> Option<String> {
    stmt.revisions
        .iter()
        .map(|revision| revision.date.clone())
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_minimal_module_compiles() {
        let mut ctx = Context::new();
        let id = ctx
            .parse_yin(
                r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                     <namespace uri="urn:m"/>
                     <prefix value="m"/>
                     <leaf name="x"><type name="string"/></leaf>
                   </module>"#,
                "m.yin",
                ParseOptions::empty(),
            )
            .unwrap();
        let module = ctx.module(id);
        assert_eq!(module.name, "m");
        assert!(module.implemented);
        assert_eq!(module.children.len(), 1);
        let leaf = ctx.graph().node(module.children[0]);
        assert_eq!(leaf.name, "x");
        assert!(leaf.config());
    }

    #[test]
    fn a_failed_load_leaves_the_context_unchanged() {
        let mut ctx = Context::new();
        let err = ctx.parse_yin(
            r#"<module name="broken" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <namespace uri="urn:broken"/>
                 <prefix value="b"/>
                 <leaf name="x"><type name="no-such-type"/></leaf>
               </module>"#,
            "broken.yin",
            ParseOptions::empty(),
        );
        assert!(err.is_err());
        assert!(ctx.get_module("broken", None).is_none());
        assert!(ctx.graph().is_empty());
    }

    #[test]
    fn find_path_walks_module_qualified_steps() {
        let mut ctx = Context::new();
        let id = ctx
            .parse_yin(
                r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                     <namespace uri="urn:m"/>
                     <prefix value="m"/>
                     <container name="a">
                       <container name="b">
                         <leaf name="c"><type name="boolean"/></leaf>
                       </container>
                     </container>
                   </module>"#,
                "m.yin",
                ParseOptions::empty(),
            )
            .unwrap();
        let found = ctx.find_path(None, "/m:a/b/c").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(ctx.graph().node(found[0]).name, "c");
        assert_eq!(ctx.schema_path(found[0]), "/m:a/b/c");
        assert!(ctx.find_path(Some(id), "/a/b/nope").is_err());
    }
}
