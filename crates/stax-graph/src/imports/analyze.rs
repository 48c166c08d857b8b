use indexmap::IndexSet;

use super::tokenize::{RawImportStatement, StatementKind, Token};

/// A named binding: `imported as local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedImport {
    pub imported: String,
    pub local: String,
}

impl NamedImport {
    pub fn new(imported: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            imported: imported.into(),
            local: local.into(),
        }
    }
}

/// Everything one logical import of `specifier` binds, regardless of how
/// many statements requested it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportDefinition {
    pub specifier: String,
    /// Local names bound to the default export.
    pub defaults: IndexSet<String>,
    /// Local names bound to the module namespace.
    pub namespaces: IndexSet<String>,
    pub named: IndexSet<NamedImport>,
    /// Some binding was declared with `let` or `var` and may be reassigned.
    pub mutable_bindings: bool,
}

impl ImportDefinition {
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            ..Default::default()
        }
    }

    pub fn with_default(mut self, local: impl Into<String>) -> Self {
        self.defaults.insert(local.into());
        self
    }

    pub fn with_namespace(mut self, local: impl Into<String>) -> Self {
        self.namespaces.insert(local.into());
        self
    }

    pub fn with_named(mut self, imported: impl Into<String>, local: impl Into<String>) -> Self {
        self.add_named(NamedImport::new(imported, local));
        self
    }

    fn add_named(&mut self, named: NamedImport) {
        if named.imported == "default" {
            self.defaults.insert(named.local);
        } else {
            self.named.insert(named);
        }
    }

    /// True if the import binds nothing and only runs the module.
    pub fn is_side_effect_only(&self) -> bool {
        self.defaults.is_empty() && self.namespaces.is_empty() && self.named.is_empty()
    }

    pub fn is_relative(&self) -> bool {
        is_relative_specifier(&self.specifier)
    }

    /// Union `other`'s bindings into `self`, keeping first-seen order.
    pub fn merge(&mut self, other: ImportDefinition) {
        self.defaults.extend(other.defaults);
        self.namespaces.extend(other.namespaces);
        self.named.extend(other.named);
        self.mutable_bindings |= other.mutable_bindings;
    }

    /// Keyword the rewritten bindings are declared with.
    pub fn binding_keyword(&self) -> &'static str {
        if self.mutable_bindings { "let" } else { "const" }
    }
}

/// `./x`, `../x`, `.` and `..` are relative; everything else is a package.
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Classification of one raw statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzedImport {
    Definition(ImportDefinition),
    /// Erased at compile time; produces no runtime load.
    TypeOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed import statement `{statement}`: {reason}")]
pub struct MalformedImport {
    pub statement: String,
    pub reason: &'static str,
}

/// Classify a raw statement produced by the tokenizer.
pub fn analyze_raw_import_statement(
    statement: &RawImportStatement<'_>,
) -> Result<AnalyzedImport, MalformedImport> {
    let malformed = |reason| MalformedImport {
        statement: statement.text.to_string(),
        reason,
    };
    let mut cursor = Cursor {
        tokens: &statement.tokens,
        pos: 0,
    };

    match statement.kind {
        StatementKind::Import => analyze_import(&mut cursor).map_err(malformed),
        StatementKind::Require => analyze_require(&mut cursor).map_err(malformed),
    }
}

struct Cursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'a> Cursor<'_, 'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'a>> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: Token<'_>) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        match self.next()? {
            Token::Ident(name) => Some(name),
            _ => None,
        }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

fn analyze_import(cursor: &mut Cursor<'_, '_>) -> Result<AnalyzedImport, &'static str> {
    if !cursor.eat(Token::Ident("import")) {
        return Err("expected `import`");
    }

    // import "x"
    if let Some(Token::Str(specifier)) = cursor.peek() {
        cursor.next();
        return Ok(AnalyzedImport::Definition(ImportDefinition::new(specifier)));
    }

    // `import type X from`, `import type { X } from`, `import type * as X from`;
    // but `import type from "x"` binds a default named `type`.
    if cursor.peek() == Some(Token::Ident("type")) {
        let next = cursor.peek_at(1);
        let is_default_named_type = next == Some(Token::Ident("from"))
            && matches!(cursor.peek_at(2), Some(Token::Str(_)));
        if !is_default_named_type && next.is_some() && next != Some(Token::Punct(',')) {
            return Ok(AnalyzedImport::TypeOnly);
        }
    }

    let mut definition = ImportDefinition::default();
    let mut type_only_named = 0usize;

    if let Some(Token::Ident(name)) = cursor.peek() {
        if name != "from" || cursor.peek_at(1) == Some(Token::Ident("from")) {
            cursor.next();
            definition.defaults.insert(name.to_string());
            if !cursor.eat(Token::Punct(',')) && cursor.peek() != Some(Token::Ident("from")) {
                return Err("expected `,` or `from` after default binding");
            }
        }
    }

    match cursor.peek() {
        Some(Token::Punct('*')) => {
            cursor.next();
            if !cursor.eat(Token::Ident("as")) {
                return Err("expected `as` after `*`");
            }
            let local = cursor.ident().ok_or("expected namespace name")?;
            definition.namespaces.insert(local.to_string());
        }
        Some(Token::Punct('{')) => {
            cursor.next();
            loop {
                if cursor.eat(Token::Punct('}')) {
                    break;
                }
                let mut is_type = false;
                if cursor.peek() == Some(Token::Ident("type"))
                    && matches!(cursor.peek_at(1), Some(Token::Ident(_) | Token::Str(_)))
                    && cursor.peek_at(1) != Some(Token::Ident("as"))
                {
                    cursor.next();
                    is_type = true;
                }

                let imported = match cursor.next() {
                    Some(Token::Ident(name)) | Some(Token::Str(name)) => name,
                    _ => return Err("expected a named import"),
                };
                let local = if cursor.eat(Token::Ident("as")) {
                    cursor.ident().ok_or("expected a local name after `as`")?
                } else if matches!(cursor.tokens.get(cursor.pos - 1), Some(Token::Str(_))) {
                    return Err("string imports need an `as` alias");
                } else {
                    imported
                };

                if is_type {
                    type_only_named += 1;
                } else {
                    definition.add_named(NamedImport::new(imported, local));
                }

                if !cursor.eat(Token::Punct(',')) && cursor.peek() != Some(Token::Punct('}')) {
                    return Err("expected `,` or `}` in import list");
                }
            }
        }
        _ => {}
    }

    if !cursor.eat(Token::Ident("from")) {
        return Err("expected `from`");
    }
    let specifier = match cursor.next() {
        Some(Token::Str(specifier)) => specifier,
        _ => return Err("expected a module specifier"),
    };
    if !cursor.is_done() {
        return Err("unexpected tokens after the module specifier");
    }

    if type_only_named > 0 && definition.is_side_effect_only() {
        return Ok(AnalyzedImport::TypeOnly);
    }

    definition.specifier = specifier.to_string();
    Ok(AnalyzedImport::Definition(definition))
}

fn analyze_require(cursor: &mut Cursor<'_, '_>) -> Result<AnalyzedImport, &'static str> {
    let mut definition = ImportDefinition::default();

    match cursor.peek() {
        Some(Token::Ident(keyword @ ("const" | "let" | "var"))) => {
            cursor.next();
            definition.mutable_bindings = keyword != "const";
            match cursor.next() {
                Some(Token::Ident(name)) => {
                    definition.namespaces.insert(name.to_string());
                }
                Some(Token::Punct('{')) => loop {
                    if cursor.eat(Token::Punct('}')) {
                        break;
                    }
                    let imported = cursor.ident().ok_or("expected a property name")?;
                    let local = if cursor.eat(Token::Punct(':')) {
                        cursor.ident().ok_or("expected a binding after `:`")?
                    } else {
                        imported
                    };
                    definition.add_named(NamedImport::new(imported, local));
                    if !cursor.eat(Token::Punct(',')) && cursor.peek() != Some(Token::Punct('}')) {
                        return Err("expected `,` or `}` in destructuring pattern");
                    }
                },
                _ => return Err("expected a binding"),
            }
            if !cursor.eat(Token::Punct('=')) {
                return Err("expected `=`");
            }
        }
        Some(Token::Ident("require")) => {}
        _ => return Err("expected `require`"),
    }

    if !cursor.eat(Token::Ident("require")) || !cursor.eat(Token::Punct('(')) {
        return Err("expected `require(`");
    }
    let specifier = match cursor.next() {
        Some(Token::Str(specifier)) => specifier,
        _ => return Err("expected a module specifier"),
    };
    if !cursor.eat(Token::Punct(')')) {
        return Err("expected `)`");
    }

    definition.specifier = specifier.to_string();
    Ok(AnalyzedImport::Definition(definition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::tokenize_imports;

    fn analyze(source: &str) -> AnalyzedImport {
        let scan = tokenize_imports(source);
        assert_eq!(scan.statements.len(), 1, "expected one statement in {source:?}");
        analyze_raw_import_statement(&scan.statements[0]).unwrap()
    }

    fn definition(source: &str) -> ImportDefinition {
        match analyze(source) {
            AnalyzedImport::Definition(def) => def,
            AnalyzedImport::TypeOnly => panic!("{source:?} was classified type-only"),
        }
    }

    #[test]
    fn test_side_effect() {
        let def = definition("import './setup';");
        assert_eq!(def.specifier, "./setup");
        assert!(def.is_side_effect_only());
        assert!(def.is_relative());
    }

    #[test]
    fn test_default_and_named() {
        let def = definition("import React, { useState, useEffect as effect } from 'react';");
        assert_eq!(def.specifier, "react");
        assert!(def.defaults.contains("React"));
        assert!(def.named.contains(&NamedImport::new("useState", "useState")));
        assert!(def.named.contains(&NamedImport::new("useEffect", "effect")));
        assert!(!def.is_relative());
    }

    #[test]
    fn test_default_alias_in_braces_is_default() {
        let def = definition("import { default as App } from './App';");
        assert!(def.defaults.contains("App"));
        assert!(def.named.is_empty());
    }

    #[test]
    fn test_namespace() {
        let def = definition("import def, * as all from \"./all\"");
        assert!(def.defaults.contains("def"));
        assert!(def.namespaces.contains("all"));
    }

    #[test]
    fn test_string_named_import() {
        let def = definition("import { \"kebab-name\" as kebab } from './k';");
        assert!(def.named.contains(&NamedImport::new("kebab-name", "kebab")));
    }

    #[test]
    fn test_type_only() {
        assert_eq!(analyze("import type { Props } from './types';"), AnalyzedImport::TypeOnly);
        assert_eq!(analyze("import type Props from './types';"), AnalyzedImport::TypeOnly);
        assert_eq!(analyze("import { type A, type B } from './types';"), AnalyzedImport::TypeOnly);
    }

    #[test]
    fn test_mixed_type_specifiers_keep_runtime_ones() {
        let def = definition("import { type A, run } from './mixed';");
        assert_eq!(def.named.len(), 1);
        assert!(def.named.contains(&NamedImport::new("run", "run")));
    }

    #[test]
    fn test_default_named_type() {
        let def = definition("import type from './type';");
        assert!(def.defaults.contains("type"));
    }

    #[test]
    fn test_require_forms() {
        let def = definition("const path = require('path');");
        assert!(def.namespaces.contains("path"));

        let def = definition("const { join, resolve: r } = require(\"path\")");
        assert!(def.named.contains(&NamedImport::new("join", "join")));
        assert!(def.named.contains(&NamedImport::new("resolve", "r")));

        let def = definition("require('./polyfill');");
        assert!(def.is_side_effect_only());
        assert_eq!(def.specifier, "./polyfill");
    }

    #[test]
    fn test_require_declaration_keyword() {
        assert!(!definition("const c = require('./c.js');").mutable_bindings);
        assert!(definition("let c = require('./c.js');").mutable_bindings);
        assert!(definition("var { a } = require('./c.js');").mutable_bindings);

        let mut merged = definition("const c = require('./c.js');");
        merged.merge(definition("let d = require('./c.js');"));
        assert_eq!(merged.binding_keyword(), "let");
    }

    #[test]
    fn test_malformed_named_list() {
        let scan = tokenize_imports("import { a as } from './a';");
        let err = analyze_raw_import_statement(&scan.statements[0]).unwrap_err();
        assert!(err.to_string().contains("malformed import statement"));
    }

    #[test]
    fn test_relative_specifier() {
        assert!(is_relative_specifier("./a"));
        assert!(is_relative_specifier("../a"));
        assert!(is_relative_specifier(".."));
        assert!(!is_relative_specifier(".hidden"));
        assert!(!is_relative_specifier("@scope/pkg"));
        assert!(!is_relative_specifier("/abs"));
    }
}
