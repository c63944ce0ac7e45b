//! The statement reader: YIN elements to typed statement structures.
//!
//! Dispatches on the local name of each YIN element, enforces statement
//! cardinality and the module-level ordering groups of RFC 7950, validates
//! identifier and date syntax, and captures unknown-namespace children as
//! extension instances. Reference arguments stay symbolic; binding them is
//! the resolver's job.

use super::*;
use crate::diagnostics::{Diagnostic, DiagnosticData};
use crate::ident::Dictionary;
use crate::source::{FileId, SourceSpan};
use yin_parser::Element;

type ReadResult<T> = Result<T, Diagnostic>;

/// Reads one YIN document into a [`ModuleStmt`].
pub struct StatementReader<'a> {
    dict: &'a mut Dictionary,
    file: FileId,
    version: YangVersion,
}

/// Module-statement ordering groups, in mandated ascending order.
fn module_stmt_rank(keyword: &str) -> u8 {
    match keyword {
        "yang-version" | "namespace" | "prefix" | "belongs-to" => 0,
        "import" | "include" => 1,
        "organization" | "contact" | "description" | "reference" => 2,
        "revision" => 3,
        _ => 4,
    }
}

fn is_data_keyword(keyword: &str) -> bool {
    matches!(
        keyword,
        "container"
            | "leaf"
            | "leaf-list"
            | "list"
            | "choice"
            | "case"
            | "anydata"
            | "anyxml"
            | "uses"
    )
}

impl<'a> StatementReader<'a> {
    pub fn new(dict: &'a mut Dictionary, file: FileId) -> Self {
        Self {
            dict,
            file,
            version: YangVersion::V1,
        }
    }

    /// Reads a whole `module` or `submodule` document.
    pub fn read_document(&mut self, root: Element) -> ReadResult<Node<ModuleStmt>> {
        if !root.is_yin() || !matches!(root.name.as_str(), "module" | "submodule") {
            return Err(self.err(
                DiagnosticData::UnknownStatement {
                    keyword: root.name.clone(),
                    parent: "document".to_owned(),
                },
                &root,
            ));
        }
        self.read_module(root)
    }

    fn span(&self, elem: &Element) -> SourceSpan {
        SourceSpan::new(self.file, elem.span)
    }

    fn err(&self, data: DiagnosticData, elem: &Element) -> Diagnostic {
        Diagnostic::error(data).with_span(self.span(elem))
    }

    /// The statement argument carried as an attribute.
    fn arg(&self, elem: &Element, attr: &'static str) -> ReadResult<String> {
        elem.attribute(attr).map(str::to_owned).ok_or_else(|| {
            self.err(
                DiagnosticData::InvalidArgument {
                    keyword: elem.name.clone(),
                    message: format!("missing `{attr}` attribute"),
                },
                elem,
            )
        })
    }

    /// The statement argument carried as a `<text>`/`<value>` subelement.
    fn text_arg(&self, elem: &Element, wrapper: &str) -> ReadResult<String> {
        let child = elem.child(wrapper).ok_or_else(|| {
            self.err(
                DiagnosticData::InvalidArgument {
                    keyword: elem.name.clone(),
                    message: format!("missing `{wrapper}` subelement"),
                },
                elem,
            )
        })?;
        Ok(child.text.clone().unwrap_or_default())
    }

    fn identifier(&mut self, elem: &Element, value: &str) -> ReadResult<Ident> {
        if !valid_identifier(value) {
            return Err(self.err(
                DiagnosticData::InvalidIdentifier {
                    value: value.to_owned(),
                },
                elem,
            ));
        }
        Ok(self.dict.insert(value))
    }

    fn qname(&mut self, elem: &Element, value: &str) -> ReadResult<QName> {
        let (prefix, name) = match value.split_once(':') {
            Some((prefix, name)) => (Some(prefix), name),
            None => (None, value),
        };
        let prefix = match prefix {
            Some(p) => Some(self.identifier(elem, p)?),
            None => None,
        };
        Ok(QName {
            prefix,
            name: self.identifier(elem, name)?,
        })
    }

    fn boolean(&self, elem: &Element, value: &str) -> ReadResult<bool> {
        match value {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.invalid_arg(elem, format!("expected `true` or `false`, got `{value}`"))),
        }
    }

    fn status(&self, elem: &Element, value: &str) -> ReadResult<Status> {
        match value {
            "current" => Ok(Status::Current),
            "deprecated" => Ok(Status::Deprecated),
            "obsolete" => Ok(Status::Obsolete),
            _ => Err(self.invalid_arg(elem, format!("`{value}` is not a status"))),
        }
    }

    fn uint32(&self, elem: &Element, value: &str) -> ReadResult<u32> {
        value
            .parse()
            .map_err(|_| self.invalid_arg(elem, format!("`{value}` is not a 32-bit unsigned integer")))
    }

    fn invalid_arg(&self, elem: &Element, message: String) -> Diagnostic {
        self.err(
            DiagnosticData::InvalidArgument {
                keyword: elem.name.clone(),
                message,
            },
            elem,
        )
    }

    fn unknown(&self, child: &Element, parent: &Element) -> Diagnostic {
        self.err(
            DiagnosticData::UnknownStatement {
                keyword: child.name.clone(),
                parent: parent.name.clone(),
            },
            child,
        )
    }

    fn set_once<T>(
        &self,
        slot: &mut Option<T>,
        value: T,
        keyword: &str,
        elem: &Element,
    ) -> ReadResult<()> {
        if slot.is_some() {
            return Err(self.err(
                DiagnosticData::Duplicate {
                    what: keyword.to_owned(),
                    name: None,
                },
                elem,
            ));
        }
        *slot = Some(value);
        Ok(())
    }

    fn require_v11(&self, elem: &Element) -> ReadResult<()> {
        if self.version == YangVersion::V1 {
            return Err(self.err(
                DiagnosticData::UnknownStatement {
                    keyword: elem.name.clone(),
                    parent: "YANG version 1 module".to_owned(),
                },
                elem,
            ));
        }
        Ok(())
    }

    fn extension_instance(
        &mut self,
        elem: Element,
        parent_keyword: &'static str,
        index: usize,
    ) -> ReadResult<Node<ExtensionInstanceStmt>> {
        let Some(namespace) = elem.namespace.clone() else {
            return Err(self.err(
                DiagnosticData::UnknownStatement {
                    keyword: elem.name.clone(),
                    parent: parent_keyword.to_owned(),
                },
                &elem,
            ));
        };
        let span = self.span(&elem);
        Ok(Node::new_parsed(
            ExtensionInstanceStmt {
                namespace,
                keyword: elem.name.clone(),
                argument: None,
                parent_keyword,
                index,
                yin: elem,
            },
            span,
        ))
    }

    fn read_module(&mut self, mut root: Element) -> ReadResult<Node<ModuleStmt>> {
        let span = self.span(&root);
        let is_submodule = root.name == "submodule";
        let parent_keyword: &'static str = if is_submodule { "submodule" } else { "module" };
        let name_arg = self.arg(&root, "name")?;
        let name = self.identifier(&root, &name_arg)?;

        let mut stmt = ModuleStmt {
            name,
            is_submodule,
            yang_version: YangVersion::V1,
            namespace: None,
            prefix: None,
            belongs_to: None,
            imports: Vec::new(),
            includes: Vec::new(),
            organization: None,
            contact: None,
            description: None,
            reference: None,
            revisions: Vec::new(),
            body: Vec::new(),
            extensions: Vec::new(),
        };

        // First pass over the header so the version gates below see the
        // declared yang-version even though it is read in document order.
        if let Some(version_elem) = root.child("yang-version") {
            let value = self.arg(version_elem, "value")?;
            self.version = match value.as_str() {
                "1" => YangVersion::V1,
                "1.1" => YangVersion::V1_1,
                _ => {
                    return Err(
                        self.invalid_arg(version_elem, format!("`{value}` is not a YANG version"))
                    )
                }
            };
        }
        stmt.yang_version = self.version;

        let mut max_rank = 0u8;
        let mut yang_version_seen = false;
        let mut namespace_field: Option<String> = None;
        let mut prefix_field: Option<Ident> = None;
        for child in root.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, parent_keyword, stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            let rank = module_stmt_rank(&child.name);
            if rank < max_rank {
                return Err(self.err(
                    DiagnosticData::OutOfOrderStatement {
                        keyword: child.name.clone(),
                    },
                    &child,
                ));
            }
            max_rank = max_rank.max(rank);
            match child.name.as_str() {
                "yang-version" => {
                    if yang_version_seen {
                        return Err(self.err(
                            DiagnosticData::Duplicate {
                                what: "yang-version".to_owned(),
                                name: None,
                            },
                            &child,
                        ));
                    }
                    yang_version_seen = true;
                }
                "namespace" => {
                    if is_submodule {
                        return Err(self.unknown(&child, &root));
                    }
                    let uri = self.arg(&child, "uri")?;
                    self.set_once(&mut namespace_field, uri, "namespace", &child)?;
                }
                "prefix" => {
                    if is_submodule {
                        return Err(self.unknown(&child, &root));
                    }
                    let value = self.arg(&child, "value")?;
                    let prefix = self.identifier(&child, &value)?;
                    self.set_once(&mut prefix_field, prefix, "prefix", &child)?;
                }
                "belongs-to" => {
                    if !is_submodule {
                        return Err(self.unknown(&child, &root));
                    }
                    let belongs_to = self.read_belongs_to(child)?;
                    let mut slot = stmt.belongs_to.take();
                    self.set_once_node(&mut slot, belongs_to, "belongs-to")?;
                    stmt.belongs_to = slot;
                }
                "import" => {
                    let import = self.read_import(child)?;
                    stmt.imports.push(import);
                }
                "include" => {
                    let include = self.read_include(child)?;
                    stmt.includes.push(include);
                }
                "organization" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.organization, text, "organization", &child)?;
                }
                "contact" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.contact, text, "contact", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "revision" => {
                    let revision = self.read_revision(child)?;
                    stmt.revisions.push(revision);
                }
                _ => {
                    let body = self.read_body_stmt(child, &root)?;
                    stmt.body.push(body);
                }
            }
        }
        stmt.namespace = namespace_field;
        stmt.prefix = prefix_field;

        if is_submodule {
            if stmt.belongs_to.is_none() {
                return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                    keyword: "belongs-to",
                    parent: format!("submodule {}", stmt.name),
                })
                .with_span(span));
            }
        } else {
            if stmt.namespace.is_none() {
                return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                    keyword: "namespace",
                    parent: format!("module {}", stmt.name),
                })
                .with_span(span));
            }
            if stmt.prefix.is_none() {
                return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                    keyword: "prefix",
                    parent: format!("module {}", stmt.name),
                })
                .with_span(span));
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn set_once_node<T>(
        &self,
        slot: &mut Option<Node<T>>,
        value: Node<T>,
        keyword: &str,
    ) -> ReadResult<()> {
        if slot.is_some() {
            let span = value.span();
            return Err(Diagnostic::error(DiagnosticData::Duplicate {
                what: keyword.to_owned(),
                name: None,
            })
            .with_span(span));
        }
        *slot = Some(value);
        Ok(())
    }

    fn read_body_stmt(&mut self, child: Element, parent: &Element) -> ReadResult<BodyStmt> {
        Ok(match child.name.as_str() {
            "typedef" => BodyStmt::Typedef(self.read_typedef(child)?),
            "grouping" => BodyStmt::Grouping(self.read_grouping(child)?),
            "augment" => BodyStmt::Augment(self.read_augment(child)?),
            "rpc" => BodyStmt::Rpc(self.read_rpc(child, false)?),
            "notification" => BodyStmt::Notification(self.read_notification(child)?),
            "deviation" => BodyStmt::Deviation(self.read_deviation(child)?),
            "extension" => BodyStmt::Extension(self.read_extension_def(child)?),
            "feature" => BodyStmt::Feature(self.read_feature(child)?),
            "identity" => BodyStmt::Identity(self.read_identity(child)?),
            name if is_data_keyword(name) && name != "case" => {
                BodyStmt::Data(self.read_data_stmt(child)?)
            }
            _ => return Err(self.unknown(&child, parent)),
        })
    }

    fn read_data_stmt(&mut self, child: Element) -> ReadResult<DataStmt> {
        Ok(match child.name.as_str() {
            "container" => DataStmt::Container(self.read_container(child)?),
            "leaf" => DataStmt::Leaf(self.read_leaf(child)?),
            "leaf-list" => DataStmt::LeafList(self.read_leaf_list(child)?),
            "list" => DataStmt::List(self.read_list(child)?),
            "choice" => DataStmt::Choice(self.read_choice(child)?),
            "case" => DataStmt::Case(self.read_case(child)?),
            "anydata" => {
                self.require_v11(&child)?;
                DataStmt::AnyData(self.read_anydata(child)?)
            }
            "anyxml" => DataStmt::AnyXml(self.read_anydata(child)?),
            "uses" => DataStmt::Uses(self.read_uses(child)?),
            _ => unreachable!("caller checked the keyword"),
        })
    }

    fn read_belongs_to(&mut self, mut elem: Element) -> ReadResult<Node<BelongsToStmt>> {
        let span = self.span(&elem);
        let module_arg = self.arg(&elem, "module")?;
        let module = self.identifier(&elem, &module_arg)?;
        let mut prefix = None;
        for child in elem.take_children() {
            if !child.is_yin() {
                continue;
            }
            match child.name.as_str() {
                "prefix" => {
                    let value = self.arg(&child, "value")?;
                    let p = self.identifier(&child, &value)?;
                    self.set_once(&mut prefix, p, "prefix", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        let prefix = prefix.ok_or_else(|| {
            self.err(
                DiagnosticData::MissingRequired {
                    keyword: "prefix",
                    parent: "belongs-to".to_owned(),
                },
                &elem,
            )
        })?;
        Ok(Node::new_parsed(BelongsToStmt { module, prefix }, span))
    }

    fn read_import(&mut self, mut elem: Element) -> ReadResult<Node<ImportStmt>> {
        let span = self.span(&elem);
        let module_arg = self.arg(&elem, "module")?;
        let module = self.identifier(&elem, &module_arg)?;
        let mut stmt = ImportStmt {
            module,
            prefix: self.dict.insert(""),
            revision: None,
            description: None,
            reference: None,
            extensions: Vec::new(),
        };
        let mut prefix = None;
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "import", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "prefix" => {
                    let value = self.arg(&child, "value")?;
                    let p = self.identifier(&child, &value)?;
                    self.set_once(&mut prefix, p, "prefix", &child)?;
                }
                "revision-date" => {
                    let date = self.arg(&child, "date")?;
                    self.check_date(&child, &date)?;
                    self.set_once(&mut stmt.revision, date, "revision-date", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        stmt.prefix = prefix.ok_or_else(|| {
            self.err(
                DiagnosticData::MissingRequired {
                    keyword: "prefix",
                    parent: format!("import {}", stmt.module),
                },
                &elem,
            )
        })?;
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_include(&mut self, mut elem: Element) -> ReadResult<Node<IncludeStmt>> {
        let span = self.span(&elem);
        let module_arg = self.arg(&elem, "module")?;
        let module = self.identifier(&elem, &module_arg)?;
        let mut stmt = IncludeStmt {
            module,
            revision: None,
            description: None,
            reference: None,
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "include", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "revision-date" => {
                    let date = self.arg(&child, "date")?;
                    self.check_date(&child, &date)?;
                    self.set_once(&mut stmt.revision, date, "revision-date", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn check_date(&self, elem: &Element, value: &str) -> ReadResult<()> {
        if valid_date(value) {
            Ok(())
        } else {
            Err(self.err(
                DiagnosticData::InvalidDate {
                    value: value.to_owned(),
                },
                elem,
            ))
        }
    }

    fn read_revision(&mut self, mut elem: Element) -> ReadResult<Node<RevisionStmt>> {
        let span = self.span(&elem);
        let date = self.arg(&elem, "date")?;
        self.check_date(&elem, &date)?;
        let mut stmt = RevisionStmt {
            date,
            description: None,
            reference: None,
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "revision", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_when(&mut self, mut elem: Element) -> ReadResult<Node<WhenStmt>> {
        let span = self.span(&elem);
        let condition = self.arg(&elem, "condition")?;
        let mut stmt = WhenStmt {
            condition,
            description: None,
            reference: None,
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                continue;
            }
            match child.name.as_str() {
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_must(&mut self, mut elem: Element) -> ReadResult<Node<MustStmt>> {
        let span = self.span(&elem);
        let condition = self.arg(&elem, "condition")?;
        let mut stmt = MustStmt {
            condition,
            error_message: None,
            error_app_tag: None,
            description: None,
            reference: None,
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                continue;
            }
            match child.name.as_str() {
                "error-message" => {
                    let text = self.text_arg(&child, "value")?;
                    self.set_once(&mut stmt.error_message, text, "error-message", &child)?;
                }
                "error-app-tag" => {
                    let value = self.arg(&child, "value")?;
                    self.set_once(&mut stmt.error_app_tag, value, "error-app-tag", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_if_feature(&mut self, elem: &Element) -> ReadResult<Node<IfFeatureStmt>> {
        let span = self.span(elem);
        let source = self.arg(elem, "name")?;
        let expr = self.parse_feature_expr(elem, &source)?;
        Ok(Node::new_parsed(IfFeatureStmt { source, expr }, span))
    }

    /// Parses an if-feature-expr: `not` > `and` > `or`, parenthesized.
    fn parse_feature_expr(&mut self, elem: &Element, source: &str) -> ReadResult<FeatureExpr> {
        let tokens = tokenize_feature_expr(source)
            .map_err(|message| self.invalid_arg(elem, message))?;
        let mut pos = 0;
        let expr = self.feature_or(elem, &tokens, &mut pos)?;
        if pos != tokens.len() {
            return Err(self.invalid_arg(
                elem,
                format!("unexpected `{}` in if-feature expression", tokens[pos]),
            ));
        }
        Ok(expr)
    }

    fn feature_or(
        &mut self,
        elem: &Element,
        tokens: &[String],
        pos: &mut usize,
    ) -> ReadResult<FeatureExpr> {
        let mut expr = self.feature_and(elem, tokens, pos)?;
        while tokens.get(*pos).map(String::as_str) == Some("or") {
            *pos += 1;
            let rhs = self.feature_and(elem, tokens, pos)?;
            expr = FeatureExpr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn feature_and(
        &mut self,
        elem: &Element,
        tokens: &[String],
        pos: &mut usize,
    ) -> ReadResult<FeatureExpr> {
        let mut expr = self.feature_factor(elem, tokens, pos)?;
        while tokens.get(*pos).map(String::as_str) == Some("and") {
            *pos += 1;
            let rhs = self.feature_factor(elem, tokens, pos)?;
            expr = FeatureExpr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn feature_factor(
        &mut self,
        elem: &Element,
        tokens: &[String],
        pos: &mut usize,
    ) -> ReadResult<FeatureExpr> {
        let token = tokens.get(*pos).ok_or_else(|| {
            self.invalid_arg(elem, "if-feature expression ends unexpectedly".to_owned())
        })?;
        match token.as_str() {
            "not" => {
                *pos += 1;
                let inner = self.feature_factor(elem, tokens, pos)?;
                Ok(FeatureExpr::Not(Box::new(inner)))
            }
            "(" => {
                *pos += 1;
                let inner = self.feature_or(elem, tokens, pos)?;
                if tokens.get(*pos).map(String::as_str) != Some(")") {
                    return Err(
                        self.invalid_arg(elem, "missing `)` in if-feature expression".to_owned())
                    );
                }
                *pos += 1;
                Ok(inner)
            }
            ")" => Err(self.invalid_arg(elem, "unexpected `)` in if-feature expression".to_owned())),
            name => {
                *pos += 1;
                let qname = self.qname(elem, name)?;
                Ok(FeatureExpr::Ref(qname))
            }
        }
    }

    fn read_container(&mut self, mut elem: Element) -> ReadResult<Node<ContainerStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = ContainerStmt {
            name,
            presence: None,
            config: None,
            status: None,
            description: None,
            reference: None,
            when: None,
            if_features: Vec::new(),
            musts: Vec::new(),
            typedefs: Vec::new(),
            groupings: Vec::new(),
            children: Vec::new(),
            actions: Vec::new(),
            notifications: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "container", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "presence" => {
                    let value = self.arg(&child, "value")?;
                    self.set_once(&mut stmt.presence, value, "presence", &child)?;
                }
                "config" => {
                    let value = self.arg(&child, "value")?;
                    let config = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.config, config, "config", &child)?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "when" => {
                    let when = self.read_when(child)?;
                    let mut slot = stmt.when.take();
                    self.set_once_node(&mut slot, when, "when")?;
                    stmt.when = slot;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "must" => stmt.musts.push(self.read_must(child)?),
                "typedef" => stmt.typedefs.push(self.read_typedef(child)?),
                "grouping" => stmt.groupings.push(self.read_grouping(child)?),
                "action" => {
                    self.require_v11(&child)?;
                    stmt.actions.push(self.read_rpc(child, true)?);
                }
                "notification" => {
                    self.require_v11(&child)?;
                    stmt.notifications.push(self.read_notification(child)?);
                }
                name if is_data_keyword(name) && name != "case" => {
                    stmt.children.push(self.read_data_stmt(child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_leaf(&mut self, mut elem: Element) -> ReadResult<Node<LeafStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut ty = None;
        let mut stmt = LeafStmt {
            name: name.clone(),
            ty: Node::new_synthetic(empty_type_stmt(self.dict)),
            units: None,
            default: None,
            config: None,
            mandatory: None,
            status: None,
            description: None,
            reference: None,
            when: None,
            if_features: Vec::new(),
            musts: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "leaf", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "type" => {
                    let t = self.read_type(child)?;
                    self.set_once_node(&mut ty, t, "type")?;
                }
                "units" => {
                    let value = self.arg(&child, "name")?;
                    self.set_once(&mut stmt.units, value, "units", &child)?;
                }
                "default" => {
                    let value = self.arg(&child, "value")?;
                    self.set_once(&mut stmt.default, value, "default", &child)?;
                }
                "config" => {
                    let value = self.arg(&child, "value")?;
                    let config = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.config, config, "config", &child)?;
                }
                "mandatory" => {
                    let value = self.arg(&child, "value")?;
                    let mandatory = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.mandatory, mandatory, "mandatory", &child)?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "when" => {
                    let when = self.read_when(child)?;
                    let mut slot = stmt.when.take();
                    self.set_once_node(&mut slot, when, "when")?;
                    stmt.when = slot;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "must" => stmt.musts.push(self.read_must(child)?),
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        stmt.ty = ty.ok_or_else(|| {
            Diagnostic::error(DiagnosticData::MissingRequired {
                keyword: "type",
                parent: format!("leaf {name}"),
            })
            .with_span(span)
        })?;
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_leaf_list(&mut self, mut elem: Element) -> ReadResult<Node<LeafListStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut ty = None;
        let mut stmt = LeafListStmt {
            name: name.clone(),
            ty: Node::new_synthetic(empty_type_stmt(self.dict)),
            units: None,
            defaults: Vec::new(),
            config: None,
            min_elements: None,
            max_elements: None,
            ordered_by: None,
            status: None,
            description: None,
            reference: None,
            when: None,
            if_features: Vec::new(),
            musts: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "leaf-list", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "type" => {
                    let t = self.read_type(child)?;
                    self.set_once_node(&mut ty, t, "type")?;
                }
                "units" => {
                    let value = self.arg(&child, "name")?;
                    self.set_once(&mut stmt.units, value, "units", &child)?;
                }
                "default" => {
                    self.require_v11(&child)?;
                    stmt.defaults.push(self.arg(&child, "value")?);
                }
                "config" => {
                    let value = self.arg(&child, "value")?;
                    let config = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.config, config, "config", &child)?;
                }
                "min-elements" => {
                    let value = self.arg(&child, "value")?;
                    let min = self.uint32(&child, &value)?;
                    self.set_once(&mut stmt.min_elements, min, "min-elements", &child)?;
                }
                "max-elements" => {
                    let max = self.read_max_elements(&child)?;
                    self.set_once(&mut stmt.max_elements, max, "max-elements", &child)?;
                }
                "ordered-by" => {
                    let ordered_by = self.read_ordered_by(&child)?;
                    self.set_once(&mut stmt.ordered_by, ordered_by, "ordered-by", &child)?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "when" => {
                    let when = self.read_when(child)?;
                    let mut slot = stmt.when.take();
                    self.set_once_node(&mut slot, when, "when")?;
                    stmt.when = slot;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "must" => stmt.musts.push(self.read_must(child)?),
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        stmt.ty = ty.ok_or_else(|| {
            Diagnostic::error(DiagnosticData::MissingRequired {
                keyword: "type",
                parent: format!("leaf-list {name}"),
            })
            .with_span(span)
        })?;
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_max_elements(&self, elem: &Element) -> ReadResult<MaxElements> {
        let value = self.arg(elem, "value")?;
        if value == "unbounded" {
            return Ok(MaxElements::Unbounded);
        }
        let count = self.uint32(elem, &value)?;
        if count == 0 {
            return Err(self.invalid_arg(elem, "max-elements must be positive".to_owned()));
        }
        Ok(MaxElements::Count(count))
    }

    fn read_ordered_by(&self, elem: &Element) -> ReadResult<OrderedBy> {
        let value = self.arg(elem, "value")?;
        match value.as_str() {
            "system" => Ok(OrderedBy::System),
            "user" => Ok(OrderedBy::User),
            _ => Err(self.invalid_arg(elem, format!("`{value}` is not an ordered-by mode"))),
        }
    }

    fn read_list(&mut self, mut elem: Element) -> ReadResult<Node<ListStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = ListStmt {
            name,
            key: None,
            uniques: Vec::new(),
            config: None,
            min_elements: None,
            max_elements: None,
            ordered_by: None,
            status: None,
            description: None,
            reference: None,
            when: None,
            if_features: Vec::new(),
            musts: Vec::new(),
            typedefs: Vec::new(),
            groupings: Vec::new(),
            children: Vec::new(),
            actions: Vec::new(),
            notifications: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "list", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "key" => {
                    let key = self.read_key(&child)?;
                    let mut slot = stmt.key.take();
                    self.set_once_node(&mut slot, key, "key")?;
                    stmt.key = slot;
                }
                "unique" => stmt.uniques.push(self.read_unique(&child)?),
                "config" => {
                    let value = self.arg(&child, "value")?;
                    let config = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.config, config, "config", &child)?;
                }
                "min-elements" => {
                    let value = self.arg(&child, "value")?;
                    let min = self.uint32(&child, &value)?;
                    self.set_once(&mut stmt.min_elements, min, "min-elements", &child)?;
                }
                "max-elements" => {
                    let max = self.read_max_elements(&child)?;
                    self.set_once(&mut stmt.max_elements, max, "max-elements", &child)?;
                }
                "ordered-by" => {
                    let ordered_by = self.read_ordered_by(&child)?;
                    self.set_once(&mut stmt.ordered_by, ordered_by, "ordered-by", &child)?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "when" => {
                    let when = self.read_when(child)?;
                    let mut slot = stmt.when.take();
                    self.set_once_node(&mut slot, when, "when")?;
                    stmt.when = slot;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "must" => stmt.musts.push(self.read_must(child)?),
                "typedef" => stmt.typedefs.push(self.read_typedef(child)?),
                "grouping" => stmt.groupings.push(self.read_grouping(child)?),
                "action" => {
                    self.require_v11(&child)?;
                    stmt.actions.push(self.read_rpc(child, true)?);
                }
                "notification" => {
                    self.require_v11(&child)?;
                    stmt.notifications.push(self.read_notification(child)?);
                }
                name if is_data_keyword(name) && name != "case" => {
                    stmt.children.push(self.read_data_stmt(child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_key(&mut self, elem: &Element) -> ReadResult<Node<KeyStmt>> {
        let span = self.span(elem);
        let value = self.arg(elem, "value")?;
        let mut names = Vec::new();
        for part in value.split_whitespace() {
            names.push(self.qname(elem, part)?);
        }
        if names.is_empty() {
            return Err(self.invalid_arg(elem, "key must name at least one leaf".to_owned()));
        }
        Ok(Node::new_parsed(KeyStmt { names }, span))
    }

    fn read_unique(&mut self, elem: &Element) -> ReadResult<Node<UniqueStmt>> {
        let span = self.span(elem);
        let value = self.arg(elem, "tag")?;
        let paths: Vec<String> = value.split_whitespace().map(str::to_owned).collect();
        if paths.is_empty() {
            return Err(self.invalid_arg(elem, "unique must name at least one leaf".to_owned()));
        }
        Ok(Node::new_parsed(UniqueStmt { paths }, span))
    }

    fn read_choice(&mut self, mut elem: Element) -> ReadResult<Node<ChoiceStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = ChoiceStmt {
            name,
            default: None,
            mandatory: None,
            config: None,
            status: None,
            description: None,
            reference: None,
            when: None,
            if_features: Vec::new(),
            children: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "choice", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "default" => {
                    let value = self.arg(&child, "value")?;
                    let case = self.identifier(&child, &value)?;
                    self.set_once(&mut stmt.default, case, "default", &child)?;
                }
                "mandatory" => {
                    let value = self.arg(&child, "value")?;
                    let mandatory = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.mandatory, mandatory, "mandatory", &child)?;
                }
                "config" => {
                    let value = self.arg(&child, "value")?;
                    let config = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.config, config, "config", &child)?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "when" => {
                    let when = self.read_when(child)?;
                    let mut slot = stmt.when.take();
                    self.set_once_node(&mut slot, when, "when")?;
                    stmt.when = slot;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "case" | "container" | "leaf" | "leaf-list" | "list" | "anydata" | "anyxml"
                | "choice" => {
                    if matches!(child.name.as_str(), "anydata" | "choice") {
                        self.require_v11(&child)?;
                    }
                    stmt.children.push(self.read_data_stmt(child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_case(&mut self, mut elem: Element) -> ReadResult<Node<CaseStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = CaseStmt {
            name,
            status: None,
            description: None,
            reference: None,
            when: None,
            if_features: Vec::new(),
            children: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "case", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "when" => {
                    let when = self.read_when(child)?;
                    let mut slot = stmt.when.take();
                    self.set_once_node(&mut slot, when, "when")?;
                    stmt.when = slot;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                name if is_data_keyword(name) && name != "case" => {
                    stmt.children.push(self.read_data_stmt(child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_anydata(&mut self, mut elem: Element) -> ReadResult<Node<AnyDataStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let keyword: &'static str = if elem.name == "anydata" {
            "anydata"
        } else {
            "anyxml"
        };
        let mut stmt = AnyDataStmt {
            name,
            config: None,
            mandatory: None,
            status: None,
            description: None,
            reference: None,
            when: None,
            if_features: Vec::new(),
            musts: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, keyword, stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "config" => {
                    let value = self.arg(&child, "value")?;
                    let config = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.config, config, "config", &child)?;
                }
                "mandatory" => {
                    let value = self.arg(&child, "value")?;
                    let mandatory = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.mandatory, mandatory, "mandatory", &child)?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "when" => {
                    let when = self.read_when(child)?;
                    let mut slot = stmt.when.take();
                    self.set_once_node(&mut slot, when, "when")?;
                    stmt.when = slot;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "must" => stmt.musts.push(self.read_must(child)?),
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_uses(&mut self, mut elem: Element) -> ReadResult<Node<UsesStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let grouping = self.qname(&elem, &name_arg)?;
        let mut stmt = UsesStmt {
            grouping,
            status: None,
            description: None,
            reference: None,
            when: None,
            if_features: Vec::new(),
            refines: Vec::new(),
            augments: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "uses", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "when" => {
                    let when = self.read_when(child)?;
                    let mut slot = stmt.when.take();
                    self.set_once_node(&mut slot, when, "when")?;
                    stmt.when = slot;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "refine" => stmt.refines.push(self.read_refine(child)?),
                "augment" => stmt.augments.push(self.read_augment(child)?),
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_refine(&mut self, mut elem: Element) -> ReadResult<Node<RefineStmt>> {
        let span = self.span(&elem);
        let target = self.arg(&elem, "target-node")?;
        let mut stmt = RefineStmt {
            target,
            description: None,
            reference: None,
            config: None,
            mandatory: None,
            presence: None,
            defaults: Vec::new(),
            min_elements: None,
            max_elements: None,
            musts: Vec::new(),
            if_features: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "refine", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "config" => {
                    let value = self.arg(&child, "value")?;
                    let config = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.config, config, "config", &child)?;
                }
                "mandatory" => {
                    let value = self.arg(&child, "value")?;
                    let mandatory = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.mandatory, mandatory, "mandatory", &child)?;
                }
                "presence" => {
                    let value = self.arg(&child, "value")?;
                    self.set_once(&mut stmt.presence, value, "presence", &child)?;
                }
                "default" => stmt.defaults.push(self.arg(&child, "value")?),
                "min-elements" => {
                    let value = self.arg(&child, "value")?;
                    let min = self.uint32(&child, &value)?;
                    self.set_once(&mut stmt.min_elements, min, "min-elements", &child)?;
                }
                "max-elements" => {
                    let max = self.read_max_elements(&child)?;
                    self.set_once(&mut stmt.max_elements, max, "max-elements", &child)?;
                }
                "must" => stmt.musts.push(self.read_must(child)?),
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_augment(&mut self, mut elem: Element) -> ReadResult<Node<AugmentStmt>> {
        let span = self.span(&elem);
        let target = self.arg(&elem, "target-node")?;
        let mut stmt = AugmentStmt {
            target,
            status: None,
            description: None,
            reference: None,
            when: None,
            if_features: Vec::new(),
            children: Vec::new(),
            actions: Vec::new(),
            notifications: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "augment", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "when" => {
                    let when = self.read_when(child)?;
                    let mut slot = stmt.when.take();
                    self.set_once_node(&mut slot, when, "when")?;
                    stmt.when = slot;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "action" => {
                    self.require_v11(&child)?;
                    stmt.actions.push(self.read_rpc(child, true)?);
                }
                "notification" => {
                    self.require_v11(&child)?;
                    stmt.notifications.push(self.read_notification(child)?);
                }
                name if is_data_keyword(name) => {
                    stmt.children.push(self.read_data_stmt(child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_rpc(&mut self, mut elem: Element, is_action: bool) -> ReadResult<Node<RpcStmt>> {
        let span = self.span(&elem);
        let keyword: &'static str = if is_action { "action" } else { "rpc" };
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = RpcStmt {
            name,
            is_action,
            status: None,
            description: None,
            reference: None,
            if_features: Vec::new(),
            typedefs: Vec::new(),
            groupings: Vec::new(),
            input: None,
            output: None,
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, keyword, stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "typedef" => stmt.typedefs.push(self.read_typedef(child)?),
                "grouping" => stmt.groupings.push(self.read_grouping(child)?),
                "input" => {
                    let io = self.read_io(child, false)?;
                    let mut slot = stmt.input.take();
                    self.set_once_node(&mut slot, io, "input")?;
                    stmt.input = slot;
                }
                "output" => {
                    let io = self.read_io(child, true)?;
                    let mut slot = stmt.output.take();
                    self.set_once_node(&mut slot, io, "output")?;
                    stmt.output = slot;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_io(&mut self, mut elem: Element, output: bool) -> ReadResult<Node<IoStmt>> {
        let span = self.span(&elem);
        let keyword: &'static str = if output { "output" } else { "input" };
        let mut stmt = IoStmt {
            output,
            musts: Vec::new(),
            typedefs: Vec::new(),
            groupings: Vec::new(),
            children: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, keyword, stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "must" => {
                    self.require_v11(&child)?;
                    stmt.musts.push(self.read_must(child)?);
                }
                "typedef" => stmt.typedefs.push(self.read_typedef(child)?),
                "grouping" => stmt.groupings.push(self.read_grouping(child)?),
                name if is_data_keyword(name) && name != "case" => {
                    stmt.children.push(self.read_data_stmt(child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_notification(&mut self, mut elem: Element) -> ReadResult<Node<NotificationStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = NotificationStmt {
            name,
            status: None,
            description: None,
            reference: None,
            if_features: Vec::new(),
            musts: Vec::new(),
            typedefs: Vec::new(),
            groupings: Vec::new(),
            children: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "notification", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "must" => {
                    self.require_v11(&child)?;
                    stmt.musts.push(self.read_must(child)?);
                }
                "typedef" => stmt.typedefs.push(self.read_typedef(child)?),
                "grouping" => stmt.groupings.push(self.read_grouping(child)?),
                name if is_data_keyword(name) && name != "case" => {
                    stmt.children.push(self.read_data_stmt(child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_typedef(&mut self, mut elem: Element) -> ReadResult<Node<TypedefStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut ty = None;
        let mut stmt = TypedefStmt {
            name: name.clone(),
            ty: Node::new_synthetic(empty_type_stmt(self.dict)),
            units: None,
            default: None,
            status: None,
            description: None,
            reference: None,
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "typedef", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "type" => {
                    let t = self.read_type(child)?;
                    self.set_once_node(&mut ty, t, "type")?;
                }
                "units" => {
                    let value = self.arg(&child, "name")?;
                    self.set_once(&mut stmt.units, value, "units", &child)?;
                }
                "default" => {
                    let value = self.arg(&child, "value")?;
                    self.set_once(&mut stmt.default, value, "default", &child)?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        stmt.ty = ty.ok_or_else(|| {
            Diagnostic::error(DiagnosticData::MissingRequired {
                keyword: "type",
                parent: format!("typedef {name}"),
            })
            .with_span(span)
        })?;
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_grouping(&mut self, mut elem: Element) -> ReadResult<Node<GroupingStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = GroupingStmt {
            name,
            status: None,
            description: None,
            reference: None,
            typedefs: Vec::new(),
            groupings: Vec::new(),
            children: Vec::new(),
            actions: Vec::new(),
            notifications: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "grouping", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "typedef" => stmt.typedefs.push(self.read_typedef(child)?),
                "grouping" => stmt.groupings.push(self.read_grouping(child)?),
                "action" => {
                    self.require_v11(&child)?;
                    stmt.actions.push(self.read_rpc(child, true)?);
                }
                "notification" => {
                    self.require_v11(&child)?;
                    stmt.notifications.push(self.read_notification(child)?);
                }
                name if is_data_keyword(name) && name != "case" => {
                    stmt.children.push(self.read_data_stmt(child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_type(&mut self, mut elem: Element) -> ReadResult<Node<TypeStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.qname(&elem, &name_arg)?;
        let mut stmt = TypeStmt {
            name,
            fraction_digits: None,
            range: None,
            length: None,
            patterns: Vec::new(),
            enums: Vec::new(),
            bits: Vec::new(),
            path: None,
            require_instance: None,
            bases: Vec::new(),
            union_types: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "type", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "fraction-digits" => {
                    let value = self.arg(&child, "value")?;
                    let digits: u8 = value.parse().map_err(|_| {
                        self.invalid_arg(&child, format!("`{value}` is not an integer"))
                    })?;
                    if !(1..=18).contains(&digits) {
                        return Err(self.invalid_arg(
                            &child,
                            format!("fraction-digits must be between 1 and 18, got {digits}"),
                        ));
                    }
                    self.set_once(&mut stmt.fraction_digits, digits, "fraction-digits", &child)?;
                }
                "range" => {
                    let range = self.read_range(child)?;
                    let mut slot = stmt.range.take();
                    self.set_once_node(&mut slot, range, "range")?;
                    stmt.range = slot;
                }
                "length" => {
                    let length = self.read_range(child)?;
                    let mut slot = stmt.length.take();
                    self.set_once_node(&mut slot, length, "length")?;
                    stmt.length = slot;
                }
                "pattern" => stmt.patterns.push(self.read_pattern(child)?),
                "enum" => stmt.enums.push(self.read_enum(child)?),
                "bit" => stmt.bits.push(self.read_bit(child)?),
                "path" => {
                    let value = self.arg(&child, "value")?;
                    let path = Node::new_parsed(value, self.span(&child));
                    let mut slot = stmt.path.take();
                    self.set_once_node(&mut slot, path, "path")?;
                    stmt.path = slot;
                }
                "require-instance" => {
                    let value = self.arg(&child, "value")?;
                    let require = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.require_instance, require, "require-instance", &child)?;
                }
                "base" => {
                    let value = self.arg(&child, "name")?;
                    let base = self.qname(&child, &value)?;
                    if self.version == YangVersion::V1 && !stmt.bases.is_empty() {
                        return Err(self.invalid_arg(
                            &child,
                            "multiple bases require YANG 1.1".to_owned(),
                        ));
                    }
                    stmt.bases.push(Node::new_parsed(base, self.span(&child)));
                }
                "type" => stmt.union_types.push(self.read_type(child)?),
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_range(&mut self, mut elem: Element) -> ReadResult<Node<RangeStmt>> {
        let span = self.span(&elem);
        let expr = self.arg(&elem, "value")?;
        let mut stmt = RangeStmt {
            expr,
            error_message: None,
            error_app_tag: None,
            description: None,
            reference: None,
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                continue;
            }
            match child.name.as_str() {
                "error-message" => {
                    let text = self.text_arg(&child, "value")?;
                    self.set_once(&mut stmt.error_message, text, "error-message", &child)?;
                }
                "error-app-tag" => {
                    let value = self.arg(&child, "value")?;
                    self.set_once(&mut stmt.error_app_tag, value, "error-app-tag", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_pattern(&mut self, mut elem: Element) -> ReadResult<Node<PatternStmt>> {
        let span = self.span(&elem);
        let value = self.arg(&elem, "value")?;
        let mut stmt = PatternStmt {
            value,
            invert_match: false,
            error_message: None,
            error_app_tag: None,
            description: None,
            reference: None,
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                continue;
            }
            match child.name.as_str() {
                "modifier" => {
                    self.require_v11(&child)?;
                    let value = self.arg(&child, "value")?;
                    if value != "invert-match" {
                        return Err(self.invalid_arg(
                            &child,
                            format!("`{value}` is not a pattern modifier"),
                        ));
                    }
                    if stmt.invert_match {
                        return Err(self.err(
                            DiagnosticData::Duplicate {
                                what: "modifier".to_owned(),
                                name: None,
                            },
                            &child,
                        ));
                    }
                    stmt.invert_match = true;
                }
                "error-message" => {
                    let text = self.text_arg(&child, "value")?;
                    self.set_once(&mut stmt.error_message, text, "error-message", &child)?;
                }
                "error-app-tag" => {
                    let value = self.arg(&child, "value")?;
                    self.set_once(&mut stmt.error_app_tag, value, "error-app-tag", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_enum(&mut self, mut elem: Element) -> ReadResult<Node<EnumStmt>> {
        let span = self.span(&elem);
        let name = self.arg(&elem, "name")?;
        if name.is_empty() || name.trim() != name {
            return Err(self.invalid_arg(
                &elem,
                "enum name must be non-empty without leading or trailing whitespace".to_owned(),
            ));
        }
        let mut stmt = EnumStmt {
            name,
            value: None,
            status: None,
            description: None,
            reference: None,
            if_features: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                continue;
            }
            match child.name.as_str() {
                "value" => {
                    let value = self.arg(&child, "value")?;
                    let value: i32 = value.parse().map_err(|_| {
                        self.invalid_arg(&child, format!("`{value}` is not a 32-bit integer"))
                    })?;
                    self.set_once(&mut stmt.value, value, "value", &child)?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "if-feature" => {
                    self.require_v11(&child)?;
                    stmt.if_features.push(self.read_if_feature(&child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_bit(&mut self, mut elem: Element) -> ReadResult<Node<BitStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = BitStmt {
            name,
            position: None,
            status: None,
            description: None,
            reference: None,
            if_features: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                continue;
            }
            match child.name.as_str() {
                "position" => {
                    let value = self.arg(&child, "value")?;
                    let position = self.uint32(&child, &value)?;
                    self.set_once(&mut stmt.position, position, "position", &child)?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "if-feature" => {
                    self.require_v11(&child)?;
                    stmt.if_features.push(self.read_if_feature(&child)?);
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_feature(&mut self, mut elem: Element) -> ReadResult<Node<FeatureStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = FeatureStmt {
            name,
            if_features: Vec::new(),
            status: None,
            description: None,
            reference: None,
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "feature", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "if-feature" => stmt.if_features.push(self.read_if_feature(&child)?),
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_identity(&mut self, mut elem: Element) -> ReadResult<Node<IdentityStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = IdentityStmt {
            name,
            bases: Vec::new(),
            if_features: Vec::new(),
            status: None,
            description: None,
            reference: None,
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "identity", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "base" => {
                    let value = self.arg(&child, "name")?;
                    let base = self.qname(&child, &value)?;
                    if self.version == YangVersion::V1 && !stmt.bases.is_empty() {
                        return Err(self.invalid_arg(
                            &child,
                            "multiple bases require YANG 1.1".to_owned(),
                        ));
                    }
                    stmt.bases.push(Node::new_parsed(base, self.span(&child)));
                }
                "if-feature" => {
                    self.require_v11(&child)?;
                    stmt.if_features.push(self.read_if_feature(&child)?);
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_extension_def(&mut self, mut elem: Element) -> ReadResult<Node<ExtensionStmt>> {
        let span = self.span(&elem);
        let name_arg = self.arg(&elem, "name")?;
        let name = self.identifier(&elem, &name_arg)?;
        let mut stmt = ExtensionStmt {
            name,
            argument: None,
            status: None,
            description: None,
            reference: None,
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "extension", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "argument" => {
                    let value = self.arg(&child, "name")?;
                    let arg_name = self.identifier(&child, &value)?;
                    let yin_element = match child.child("yin-element") {
                        Some(sub) => {
                            let value = self.arg(sub, "value")?;
                            self.boolean(sub, &value)?
                        }
                        None => false,
                    };
                    self.set_once(
                        &mut stmt.argument,
                        ArgumentStmt {
                            name: arg_name,
                            yin_element,
                        },
                        "argument",
                        &child,
                    )?;
                }
                "status" => {
                    let value = self.arg(&child, "value")?;
                    let status = self.status(&child, &value)?;
                    self.set_once(&mut stmt.status, status, "status", &child)?;
                }
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_deviation(&mut self, mut elem: Element) -> ReadResult<Node<DeviationStmt>> {
        let span = self.span(&elem);
        let target = self.arg(&elem, "target-node")?;
        let mut stmt = DeviationStmt {
            target,
            description: None,
            reference: None,
            deviates: Vec::new(),
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "deviation", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            match child.name.as_str() {
                "description" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.description, text, "description", &child)?;
                }
                "reference" => {
                    let text = self.text_arg(&child, "text")?;
                    self.set_once(&mut stmt.reference, text, "reference", &child)?;
                }
                "deviate" => stmt.deviates.push(self.read_deviate(child)?),
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        if stmt.deviates.is_empty() {
            return Err(Diagnostic::error(DiagnosticData::MissingRequired {
                keyword: "deviate",
                parent: format!("deviation {}", stmt.target),
            })
            .with_span(span));
        }
        Ok(Node::new_parsed(stmt, span))
    }

    fn read_deviate(&mut self, mut elem: Element) -> ReadResult<Node<DeviateStmt>> {
        let span = self.span(&elem);
        let value = self.arg(&elem, "value")?;
        let kind = match value.as_str() {
            "not-supported" => DeviateKind::NotSupported,
            "add" => DeviateKind::Add,
            "replace" => DeviateKind::Replace,
            "delete" => DeviateKind::Delete,
            _ => return Err(self.invalid_arg(&elem, format!("`{value}` is not a deviate kind"))),
        };
        let mut stmt = DeviateStmt {
            kind,
            ty: None,
            units: None,
            musts: Vec::new(),
            uniques: Vec::new(),
            defaults: Vec::new(),
            config: None,
            mandatory: None,
            min_elements: None,
            max_elements: None,
            extensions: Vec::new(),
        };
        for child in elem.take_children() {
            if !child.is_yin() {
                let inst = self.extension_instance(child, "deviate", stmt.extensions.len())?;
                stmt.extensions.push(inst);
                continue;
            }
            if kind == DeviateKind::NotSupported {
                return Err(self.invalid_arg(
                    &child,
                    "deviate not-supported takes no substatements".to_owned(),
                ));
            }
            match child.name.as_str() {
                "type" => {
                    let t = self.read_type(child)?;
                    let mut slot = stmt.ty.take();
                    self.set_once_node(&mut slot, t, "type")?;
                    stmt.ty = slot;
                }
                "units" => {
                    let value = self.arg(&child, "name")?;
                    self.set_once(&mut stmt.units, value, "units", &child)?;
                }
                "must" => stmt.musts.push(self.read_must(child)?),
                "unique" => stmt.uniques.push(self.read_unique(&child)?),
                "default" => stmt.defaults.push(self.arg(&child, "value")?),
                "config" => {
                    let value = self.arg(&child, "value")?;
                    let config = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.config, config, "config", &child)?;
                }
                "mandatory" => {
                    let value = self.arg(&child, "value")?;
                    let mandatory = self.boolean(&child, &value)?;
                    self.set_once(&mut stmt.mandatory, mandatory, "mandatory", &child)?;
                }
                "min-elements" => {
                    let value = self.arg(&child, "value")?;
                    let min = self.uint32(&child, &value)?;
                    self.set_once(&mut stmt.min_elements, min, "min-elements", &child)?;
                }
                "max-elements" => {
                    let max = self.read_max_elements(&child)?;
                    self.set_once(&mut stmt.max_elements, max, "max-elements", &child)?;
                }
                _ => return Err(self.unknown(&child, &elem)),
            }
        }
        Ok(Node::new_parsed(stmt, span))
    }
}

fn empty_type_stmt(dict: &mut Dictionary) -> TypeStmt {
    TypeStmt {
        name: QName {
            prefix: None,
            name: dict.insert("string"),
        },
        fraction_digits: None,
        range: None,
        length: None,
        patterns: Vec::new(),
        enums: Vec::new(),
        bits: Vec::new(),
        path: None,
        require_instance: None,
        bases: Vec::new(),
        union_types: Vec::new(),
        extensions: Vec::new(),
    }
}

use crate::path::valid_identifier;

fn valid_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| value[range].bytes().all(|b| b.is_ascii_digit());
    if !digits(0..4) || !digits(5..7) || !digits(8..10) {
        return false;
    }
    let month: u8 = value[5..7].parse().unwrap_or(0);
    let day: u8 = value[8..10].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

fn tokenize_feature_expr(source: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in source.chars() {
        match c {
            '(' | ')' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') => {
                current.push(c);
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    if tokens.is_empty() {
        return Err("empty if-feature expression".to_owned());
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(src: &str) -> Result<Node<ModuleStmt>, Diagnostic> {
        let mut dict = Dictionary::new();
        let root = yin_parser::parse(src).expect("well-formed XML");
        StatementReader::new(&mut dict, FileId::new(0)).read_document(root)
    }

    #[test]
    fn reads_a_minimal_module() {
        let module = read(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <yang-version value="1.1"/>
                 <namespace uri="urn:m"/>
                 <prefix value="m"/>
                 <leaf name="x"><type name="string"/></leaf>
               </module>"#,
        )
        .unwrap();
        assert_eq!(module.yang_version, YangVersion::V1_1);
        assert_eq!(module.namespace.as_deref(), Some("urn:m"));
        assert_eq!(module.body.len(), 1);
    }

    #[test]
    fn revision_before_namespace_is_out_of_order() {
        let err = read(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <prefix value="m"/>
                 <revision date="2024-01-01"/>
                 <namespace uri="urn:m"/>
               </module>"#,
        )
        .unwrap_err();
        assert!(matches!(
            err.data,
            DiagnosticData::OutOfOrderStatement { ref keyword } if keyword == "namespace"
        ));
    }

    #[test]
    fn duplicate_substatement_is_rejected() {
        let err = read(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <namespace uri="urn:m"/>
                 <prefix value="m"/>
                 <leaf name="x">
                   <type name="string"/>
                   <type name="int32"/>
                 </leaf>
               </module>"#,
        )
        .unwrap_err();
        assert!(matches!(err.data, DiagnosticData::Duplicate { .. }));
    }

    #[test]
    fn leaf_without_type_is_missing_required() {
        let err = read(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <namespace uri="urn:m"/>
                 <prefix value="m"/>
                 <leaf name="x"/>
               </module>"#,
        )
        .unwrap_err();
        assert!(matches!(
            err.data,
            DiagnosticData::MissingRequired { keyword: "type", .. }
        ));
    }

    #[test]
    fn bad_identifiers_are_rejected() {
        let err = read(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <namespace uri="urn:m"/>
                 <prefix value="m"/>
                 <container name="9lives"/>
               </module>"#,
        )
        .unwrap_err();
        assert!(matches!(err.data, DiagnosticData::InvalidIdentifier { .. }));
    }

    #[test]
    fn anydata_requires_yang_1_1() {
        let err = read(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <namespace uri="urn:m"/>
                 <prefix value="m"/>
                 <anydata name="blob"/>
               </module>"#,
        )
        .unwrap_err();
        assert!(matches!(err.data, DiagnosticData::UnknownStatement { .. }));
    }

    #[test]
    fn if_feature_expressions_parse_with_precedence() {
        let module = read(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <yang-version value="1.1"/>
                 <namespace uri="urn:m"/>
                 <prefix value="m"/>
                 <container name="c">
                   <if-feature name="a or b and not c"/>
                 </container>
               </module>"#,
        )
        .unwrap();
        let BodyStmt::Data(DataStmt::Container(container)) = &module.body[0] else {
            panic!("expected container");
        };
        // `or` binds loosest: a or (b and (not c))
        let FeatureExpr::Or(lhs, rhs) = &container.if_features[0].expr else {
            panic!("expected or at the top");
        };
        assert!(matches!(**lhs, FeatureExpr::Ref(_)));
        assert!(matches!(**rhs, FeatureExpr::And(_, _)));
    }

    #[test]
    fn invalid_revision_date_is_rejected() {
        let err = read(
            r#"<module name="m" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
                 <namespace uri="urn:m"/>
                 <prefix value="m"/>
                 <revision date="2024-13-01"/>
               </module>"#,
        )
        .unwrap_err();
        assert!(matches!(err.data, DiagnosticData::InvalidDate { .. }));
    }
}
