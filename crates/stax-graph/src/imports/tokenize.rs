//! Statement-level import scanner.
//!
//! This is not a JavaScript parser. It walks the source once, skipping over
//! strings, template literals, comments and regular expressions, and only
//! looks at statements that begin at nesting depth zero with `import`,
//! `require(...)` or a `const|let|var` declaration initialized by
//! `require(...)`.
//!
//! Anything that starts like an import but does not have the expected shape
//! is recorded in [`ImportScan::skipped`] and left untouched.

use std::ops::Range;

/// A lexical token inside an import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Identifier or keyword.
    Ident(&'a str),
    /// String literal contents, without quotes and without unescaping.
    Str(&'a str),
    /// Single punctuation character.
    Punct(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `import ... from "x"` or `import "x"`
    Import,
    /// `const x = require("x")` or `require("x")`
    Require,
}

/// One recognized statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImportStatement<'a> {
    pub kind: StatementKind,
    /// Exact source text, including a trailing `;` when present.
    pub text: &'a str,
    pub tokens: Vec<Token<'a>>,
    /// Byte range of `text` in the source.
    pub span: Range<usize>,
    /// First and last line (1-based, inclusive).
    pub lines: (usize, usize),
}

/// The whole lines occupied by the recognized statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBlock {
    pub start_line: usize,
    pub end_line: usize,
    /// From the start of `start_line` to the end of `end_line`, excluding
    /// the final line break.
    pub span: Range<usize>,
}

/// Result of scanning one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportScan<'a> {
    pub statements: Vec<RawImportStatement<'a>>,
    /// Byte ranges of statements that began like an import but were malformed.
    pub skipped: Vec<Range<usize>>,
    pub block: Option<ImportBlock>,
}

/// Scan `source` for top-level import and require statements.
///
/// ```
/// use stax_graph::imports::tokenize_imports;
///
/// let scan = tokenize_imports("import a from \"./a\";\nconsole.log(a);\n");
/// assert_eq!(scan.statements.len(), 1);
/// assert_eq!(scan.block.unwrap().start_line, 1);
/// ```
pub fn tokenize_imports(source: &str) -> ImportScan<'_> {
    let mut scanner = Scanner::new(source);
    scanner.run();

    let lines = LineIndex::new(source);
    let mut statements = scanner.statements;
    for statement in &mut statements {
        statement.lines = (
            lines.line_of(statement.span.start),
            lines.line_of(statement.span.end.saturating_sub(1)),
        );
    }

    let block = match (statements.first(), statements.last()) {
        (Some(first), Some(last)) => {
            let start_line = first.lines.0;
            let end_line = last.lines.1;
            Some(ImportBlock {
                start_line,
                end_line,
                span: lines.line_start(start_line)..lines.line_end(end_line),
            })
        }
        _ => None,
    };

    ImportScan {
        statements,
        skipped: scanner.skipped,
        block,
    }
}

/// Line span of the import block, if the module has any imports.
pub fn locate_import_block(source: &str) -> Option<ImportBlock> {
    tokenize_imports(source).block
}

struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(memchr::memchr_iter(b'\n', source.as_bytes()).map(|i| i + 1));
        Self { source, starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    fn line_start(&self, line: usize) -> usize {
        self.starts.get(line - 1).copied().unwrap_or(self.source.len())
    }

    fn line_end(&self, line: usize) -> usize {
        match self.starts.get(line) {
            Some(next) => {
                let end = next - 1;
                if end > 0 && self.source.as_bytes()[end - 1] == b'\r' {
                    end - 1
                } else {
                    end
                }
            }
            None => self.source.len(),
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Keywords after which a `/` starts a regular expression.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
    "do", "else", "yield", "await",
];

enum Attempt<'a> {
    /// Not an import statement at all; continue scanning normally.
    NotImport,
    Found(RawImportStatement<'a>),
    Malformed(Range<usize>),
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    last_significant: Option<u8>,
    last_word: Option<&'a str>,
    newline_since_significant: bool,
    statements: Vec<RawImportStatement<'a>>,
    skipped: Vec<Range<usize>>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            depth: 0,
            last_significant: None,
            last_word: None,
            newline_since_significant: false,
            statements: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn significant(&mut self, b: u8) {
        self.last_significant = Some(b);
        self.last_word = None;
        self.newline_since_significant = false;
    }

    fn at_statement_start(&self) -> bool {
        if self.depth != 0 {
            return false;
        }
        match self.last_significant {
            None => true,
            Some(b'.') => false,
            Some(b';') | Some(b'}') => true,
            Some(_) => self.newline_since_significant,
        }
    }

    fn regex_allowed(&self) -> bool {
        if let Some(word) = self.last_word {
            return REGEX_KEYWORDS.contains(&word);
        }
        match self.last_significant {
            None => true,
            Some(b) => b"(,=:[!&|?{};+-*%<>~^".contains(&b),
        }
    }

    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                b'\n' => {
                    self.newline_since_significant = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(),
                b'/' if self.regex_allowed() => {
                    self.skip_regex();
                    self.significant(b'/');
                }
                b'\'' | b'"' => {
                    self.skip_string(b);
                    self.significant(b);
                }
                b'`' => {
                    self.skip_template();
                    self.significant(b'`');
                }
                b'{' | b'(' | b'[' => {
                    self.depth += 1;
                    self.pos += 1;
                    self.significant(b);
                }
                b'}' | b')' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    self.pos += 1;
                    self.significant(b);
                }
                b if is_ident_start(b) => self.word(),
                _ => {
                    self.pos += 1;
                    self.significant(b);
                }
            }
        }
    }

    fn word(&mut self) {
        let start = self.pos;
        let statement_start = self.at_statement_start();
        self.pos = self.ident_end(start);
        let word = &self.src[start..self.pos];

        if statement_start {
            let attempt = match word {
                "import" => self.try_import(start),
                "const" | "let" | "var" => self.try_require_declaration(start),
                "require" => self.try_bare_require(start),
                _ => Attempt::NotImport,
            };
            match attempt {
                Attempt::Found(statement) => {
                    self.pos = statement.span.end;
                    self.statements.push(statement);
                    self.significant(b';');
                    return;
                }
                Attempt::Malformed(range) => {
                    // the rest of the line belongs to the broken statement
                    let end = memchr::memchr(b'\n', &self.bytes[range.end..])
                        .map(|offset| range.end + offset)
                        .unwrap_or(self.bytes.len());
                    let range = range.start..end;
                    tracing::debug!(start = range.start, "skipping malformed import statement");
                    self.pos = range.end.max(self.pos);
                    self.skipped.push(range);
                    self.significant(b';');
                    return;
                }
                Attempt::NotImport => {}
            }
        }

        self.last_significant = self.bytes.get(self.pos - 1).copied();
        self.last_word = Some(word);
        self.newline_since_significant = false;
    }

    fn ident_end(&self, start: usize) -> usize {
        let mut end = start;
        while end < self.bytes.len() && is_ident_char(self.bytes[end]) {
            end += 1;
        }
        // Only split on UTF-8 boundaries.
        while !self.src.is_char_boundary(end) {
            end += 1;
        }
        end
    }

    fn skip_line_comment(&mut self) {
        match memchr::memchr(b'\n', &self.bytes[self.pos..]) {
            Some(offset) => self.pos += offset,
            None => self.pos = self.bytes.len(),
        }
    }

    fn skip_block_comment(&mut self) {
        let body = &self.bytes[self.pos + 2..];
        let end = memchr::memmem::find(body, b"*/")
            .map(|offset| self.pos + 2 + offset + 2)
            .unwrap_or(self.bytes.len());
        if memchr::memchr(b'\n', &self.bytes[self.pos..end]).is_some() {
            self.newline_since_significant = true;
        }
        self.pos = end;
    }

    /// Skip a quoted string starting at `self.pos`. Stops at an unescaped
    /// closing quote or, for unterminated strings, at the end of the line.
    fn skip_string(&mut self, quote: u8) {
        self.pos = string_end(self.bytes, self.pos, quote);
    }

    fn skip_regex(&mut self) {
        let mut in_class = false;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => return,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    while self.pos < self.bytes.len() && is_ident_char(self.bytes[self.pos]) {
                        self.pos += 1;
                    }
                    return;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    fn skip_template(&mut self) {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    return;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_interpolation();
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    /// Skip code inside `${ ... }` up to and including the matching `}`.
    fn skip_interpolation(&mut self) {
        let mut depth = 1usize;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                b'\'' | b'"' => self.skip_string(b),
                b'`' => self.skip_template(),
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(),
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => self.pos += 1,
            }
        }
    }

    fn statement(
        &self,
        kind: StatementKind,
        start: usize,
        end: usize,
        tokens: Vec<Token<'a>>,
    ) -> RawImportStatement<'a> {
        RawImportStatement {
            kind,
            text: &self.src[start..end],
            tokens,
            span: start..end,
            lines: (0, 0),
        }
    }

    fn try_import(&self, start: usize) -> Attempt<'a> {
        let mut lexer = StatementLexer::new(self.src, self.pos);
        let mut tokens = vec![Token::Ident("import")];

        match lexer.peek() {
            Some((Token::Punct('(' | '.'), _)) => return Attempt::NotImport,
            None => return Attempt::Malformed(start..self.bytes.len()),
            _ => {}
        }

        let mut after_from = false;
        loop {
            let Some((token, range)) = lexer.next() else {
                return Attempt::Malformed(start..self.bytes.len());
            };
            match token {
                Token::Str(_) if after_from || tokens.len() == 1 => {
                    tokens.push(token);
                    let end = lexer.finish_import(range.end);
                    return Attempt::Found(self.statement(StatementKind::Import, start, end, tokens));
                }
                Token::Ident("from") if !inside_braces(&tokens) => {
                    after_from = true;
                    tokens.push(token);
                }
                Token::Ident(_) | Token::Str(_) | Token::Punct('{' | '}' | ',' | '*') => {
                    if after_from {
                        return Attempt::Malformed(start..range.end);
                    }
                    tokens.push(token);
                }
                Token::Punct(_) => return Attempt::Malformed(start..range.end),
            }
        }
    }

    fn try_require_declaration(&self, start: usize) -> Attempt<'a> {
        let mut lexer = StatementLexer::new(self.src, self.pos);
        let keyword = &self.src[start..self.pos];
        let mut tokens = vec![Token::Ident(keyword)];

        // binding: identifier or a flat object pattern
        match lexer.next() {
            Some((token @ Token::Ident(_), _)) => tokens.push(token),
            Some((Token::Punct('{'), _)) => {
                tokens.push(Token::Punct('{'));
                loop {
                    match lexer.next() {
                        Some((Token::Punct('}'), _)) => {
                            tokens.push(Token::Punct('}'));
                            break;
                        }
                        Some((token @ (Token::Ident(_) | Token::Punct(',' | ':')), _)) => {
                            tokens.push(token)
                        }
                        _ => return Attempt::NotImport,
                    }
                }
            }
            _ => return Attempt::NotImport,
        }

        if !matches!(lexer.next(), Some((Token::Punct('='), _))) {
            return Attempt::NotImport;
        }
        tokens.push(Token::Punct('='));

        match lexer.next() {
            Some((Token::Ident("require"), _)) => {}
            _ => return Attempt::NotImport,
        }
        self.finish_require_call(start, lexer, tokens)
    }

    fn try_bare_require(&self, start: usize) -> Attempt<'a> {
        let lexer = StatementLexer::new(self.src, self.pos);
        self.finish_require_call(start, lexer, Vec::new())
    }

    /// Expects `( "specifier" )` followed by the end of the statement.
    fn finish_require_call(
        &self,
        start: usize,
        mut lexer: StatementLexer<'a>,
        mut tokens: Vec<Token<'a>>,
    ) -> Attempt<'a> {
        tokens.push(Token::Ident("require"));
        if !matches!(lexer.next(), Some((Token::Punct('('), _))) {
            return Attempt::NotImport;
        }
        let specifier = match lexer.next() {
            Some((token @ Token::Str(_), _)) => token,
            _ => return Attempt::NotImport,
        };
        let close = match lexer.next() {
            Some((Token::Punct(')'), range)) => range,
            _ => return Attempt::NotImport,
        };
        tokens.extend([Token::Punct('('), specifier, Token::Punct(')')]);

        match lexer.peek() {
            None => {}
            Some((Token::Punct(';'), range)) => {
                return Attempt::Found(self.statement(
                    StatementKind::Require,
                    start,
                    range.end,
                    tokens,
                ));
            }
            Some((_, range)) if lexer.line_break_between(close.end, range.start) => {}
            Some(_) => return Attempt::NotImport,
        }
        Attempt::Found(self.statement(StatementKind::Require, start, close.end, tokens))
    }
}

fn inside_braces(tokens: &[Token<'_>]) -> bool {
    let open = tokens.iter().filter(|t| **t == Token::Punct('{')).count();
    let close = tokens.iter().filter(|t| **t == Token::Punct('}')).count();
    open > close
}

fn string_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'\n' => return pos,
            b if b == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

/// Token stream over a single statement, skipping whitespace and comments.
struct StatementLexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> StatementLexer<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos,
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.bytes.get(self.pos) {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.pos += 1,
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    self.pos = memchr::memchr(b'\n', &self.bytes[self.pos..])
                        .map(|offset| self.pos + offset)
                        .unwrap_or(self.bytes.len());
                }
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    self.pos = memchr::memmem::find(&self.bytes[self.pos + 2..], b"*/")
                        .map(|offset| self.pos + 2 + offset + 2)
                        .unwrap_or(self.bytes.len());
                }
                _ => return,
            }
        }
    }

    fn next(&mut self) -> Option<(Token<'a>, Range<usize>)> {
        self.skip_trivia();
        let start = self.pos;
        let b = *self.bytes.get(start)?;

        let token = if b == b'\'' || b == b'"' {
            let end = string_end(self.bytes, start, b);
            self.pos = end;
            if end < start + 2 || self.bytes[end - 1] != b {
                // unterminated
                return Some((Token::Punct('"'), start..end));
            }
            Token::Str(&self.src[start + 1..end - 1])
        } else if is_ident_start(b) {
            let mut end = start;
            while end < self.bytes.len() && is_ident_char(self.bytes[end]) {
                end += 1;
            }
            while !self.src.is_char_boundary(end) {
                end += 1;
            }
            self.pos = end;
            Token::Ident(&self.src[start..end])
        } else {
            let ch = self.src[start..].chars().next()?;
            self.pos = start + ch.len_utf8();
            Token::Punct(ch)
        };

        Some((token, start..self.pos))
    }

    fn peek(&self) -> Option<(Token<'a>, Range<usize>)> {
        let mut copy = StatementLexer::new(self.src, self.pos);
        copy.next()
    }

    fn line_break_between(&self, from: usize, to: usize) -> bool {
        memchr::memchr(b'\n', &self.bytes[from..to]).is_some()
    }

    /// Consume import attributes (`with { ... }` / `assert { ... }`) and a
    /// trailing semicolon after the module specifier ending at `end`.
    fn finish_import(&mut self, mut end: usize) -> usize {
        if let Some((Token::Ident("with" | "assert"), range)) = self.peek() {
            if !self.line_break_between(end, range.start) || self.attributes_follow(range.end) {
                self.next();
                if let Some((Token::Punct('{'), _)) = self.peek() {
                    while let Some((token, range)) = self.next() {
                        end = range.end;
                        if token == Token::Punct('}') {
                            break;
                        }
                    }
                }
            }
        }

        if let Some((Token::Punct(';'), range)) = self.peek() {
            self.next();
            end = range.end;
        }
        end
    }

    fn attributes_follow(&self, pos: usize) -> bool {
        let copy = StatementLexer::new(self.src, pos);
        matches!(copy.peek(), Some((Token::Punct('{'), _)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<&str> {
        tokenize_imports(source)
            .statements
            .iter()
            .map(|s| s.text)
            .collect()
    }

    #[test]
    fn test_no_imports() {
        let scan = tokenize_imports("const x = 1;\nexport default x;\n");
        assert!(scan.statements.is_empty());
        assert!(scan.block.is_none());
    }

    #[test]
    fn test_import_forms() {
        let source = r#"import "./side.css";
import a from "./a";
import * as ns from './ns';
import b, { c, d as e } from "./bc";
import {
    f,
    g,
} from "./fg";
"#;
        let scan = tokenize_imports(source);
        assert_eq!(scan.statements.len(), 5);
        assert_eq!(scan.statements[4].lines, (5, 8));

        let block = scan.block.unwrap();
        assert_eq!((block.start_line, block.end_line), (1, 8));
        assert_eq!(&source[block.span.clone()], source.trim_end());
    }

    #[test]
    fn test_dynamic_import_and_meta_are_ignored() {
        let source = "const m = await import(\"./lazy\");\nconsole.log(import.meta.url);\n";
        assert!(texts(source).is_empty());
    }

    #[test]
    fn test_nested_imports_are_ignored() {
        let source = "function f() {\n  const x = require(\"./inner\");\n}\n";
        assert!(texts(source).is_empty());
    }

    #[test]
    fn test_strings_comments_and_templates_hide_imports() {
        let source = r#"// import a from "./a"
/* import b from "./b" */
const s = "import c from './c'";
const t = `
import d from "./d" ${ "}" }
`;
import real from "./real";
"#;
        assert_eq!(texts(source), vec![r#"import real from "./real";"#]);
    }

    #[test]
    fn test_regex_with_quote_does_not_derail() {
        let source = "const re = /\"/g;\nimport a from \"./a\";\n";
        assert_eq!(texts(source), vec!["import a from \"./a\";"]);
    }

    #[test]
    fn test_require_forms() {
        let source = r#"const fs = require("fs");
let { join, resolve: r } = require('path')
require("./setup");
const notImport = compute("x");
"#;
        let scan = tokenize_imports(source);
        assert_eq!(scan.statements.len(), 3);
        assert!(scan.statements.iter().all(|s| s.kind == StatementKind::Require));
        assert_eq!(scan.statements[1].text, "let { join, resolve: r } = require('path')");
        assert!(scan.skipped.is_empty());
    }

    #[test]
    fn test_require_chain_is_not_an_import() {
        let source = "const x = require(\"y\").z;\n";
        assert!(texts(source).is_empty());
    }

    #[test]
    fn test_malformed_is_skipped() {
        let source = "import x = require(\"legacy\");\nimport ok from \"./ok\";\n";
        let scan = tokenize_imports(source);
        assert_eq!(scan.statements.len(), 1);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.statements[0].text, "import ok from \"./ok\";");
    }

    #[test]
    fn test_attributes_are_part_of_statement() {
        let source = "import data from \"./data.json\" with { type: \"json\" };\n";
        assert_eq!(texts(source), vec![source.trim_end()]);
    }

    #[test]
    fn test_member_import_is_not_statement() {
        let source = "loader.import(\"./x\");\n";
        assert!(texts(source).is_empty());
    }

    #[test]
    fn test_block_spans_interleaved_code() {
        let source = "import a from \"./a\";\nconst x = 1;\nimport b from \"./b\";\nrun();\n";
        let block = locate_import_block(source).unwrap();
        assert_eq!((block.start_line, block.end_line), (1, 3));
        assert!(source[block.span].ends_with("import b from \"./b\";"));
    }

    #[test]
    fn test_crlf_line_end() {
        let source = "import a from \"./a\";\r\nrun();\r\n";
        let block = locate_import_block(source).unwrap();
        assert_eq!(&source[block.span], "import a from \"./a\";");
    }

    #[test]
    fn test_asi_without_semicolons() {
        let source = "import a from \"./a\"\nimport b from \"./b\"\nconsole.log(a, b)\n";
        assert_eq!(texts(source), vec!["import a from \"./a\"", "import b from \"./b\""]);
    }
}
