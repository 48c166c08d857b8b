//! Rendering of deferred loads and replacement of the import block.
//!
//! Pure text functions: no filesystem, no graph. The builder decides what each
//! import points at and hands a [`LoadTarget`] per merged definition.

use super::analyze::ImportDefinition;
use super::tokenize::ImportScan;

/// What a merged import is rewritten to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    /// A compiled project module fetched with dynamic `import()`.
    Module { slot: usize, specifier: String },
    /// A project module fetched through a runtime-provided resolver function.
    WrappedModule {
        slot: usize,
        function: String,
        key: String,
    },
    /// Slot `index` of the externals bundle at `bundle_url`.
    External { index: usize, bundle_url: String },
    /// A copied asset; bindings receive its URL, resolved against the
    /// importing module's URL.
    Asset { url: String },
    /// An asset resolved through a runtime-provided resolver function.
    WrappedAsset { function: String, key: String },
    /// Statement text re-emitted unchanged.
    Verbatim(String),
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Binding statements destructuring `object` according to `definition`.
fn bind_object(object: &str, definition: &ImportDefinition, out: &mut Vec<String>) {
    let keyword = definition.binding_keyword();
    for local in &definition.defaults {
        out.push(format!("{} {} = {}.default;", keyword, local, object));
    }
    for local in &definition.namespaces {
        out.push(format!("{} {} = {};", keyword, local, object));
    }
    if !definition.named.is_empty() {
        let fields: Vec<String> = definition
            .named
            .iter()
            .map(|named| {
                if named.imported == named.local {
                    named.local.clone()
                } else if is_identifier(&named.imported) {
                    format!("{}: {}", named.imported, named.local)
                } else {
                    format!("{}: {}", quote(&named.imported), named.local)
                }
            })
            .collect();
        out.push(format!("{} {{ {} }} = {};", keyword, fields.join(", "), object));
    }
}

/// Bind every default and namespace name to the value of `expression`.
///
/// Named bindings have no meaning for an asset and are not emitted.
fn bind_value(expression: &str, definition: &ImportDefinition, out: &mut Vec<String>) {
    let keyword = definition.binding_keyword();
    let mut locals = definition.defaults.iter().chain(definition.namespaces.iter());
    if let Some(first) = locals.next() {
        out.push(format!("{} {} = {};", keyword, first, expression));
        for other in locals {
            out.push(format!("{} {} = {};", keyword, other, first));
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn load_module(binding: &str, load: &str, definition: &ImportDefinition, out: &mut Vec<String>) {
    if definition.is_side_effect_only() {
        out.push(format!("{};", load));
    } else {
        out.push(format!("const {} = {};", binding, load));
        bind_object(binding, definition, out);
    }
}

/// Render the statements replacing `definition`.
///
/// ```
/// use stax_graph::imports::{render_deferred_load, ImportDefinition, LoadTarget};
///
/// let def = ImportDefinition::new("./a.ts").with_default("a");
/// let text = render_deferred_load(
///     &LoadTarget::Module { slot: 0, specifier: "./a.js".into() },
///     &def,
/// );
/// assert_eq!(
///     text,
///     "const __stax_module0 = await import(\"./a.js\");\nconst a = __stax_module0.default;"
/// );
/// ```
pub fn render_deferred_load(target: &LoadTarget, definition: &ImportDefinition) -> String {
    let mut out = Vec::new();
    match target {
        LoadTarget::Module { slot, specifier } => {
            let binding = format!("__stax_module{}", slot);
            let load = format!("await import({})", quote(specifier));
            load_module(&binding, &load, definition, &mut out);
        }
        LoadTarget::WrappedModule {
            slot,
            function,
            key,
        } => {
            let binding = format!("__stax_module{}", slot);
            let load = format!("await {}({})", function, quote(key));
            load_module(&binding, &load, definition, &mut out);
        }
        LoadTarget::External { index, bundle_url } => {
            let binding = format!("__stax_external{}", index);
            let load = format!(
                "(await import({})).externalModule{}",
                quote(bundle_url),
                index
            );
            if definition.is_side_effect_only() {
                out.push(format!("await import({});", quote(bundle_url)));
            } else {
                out.push(format!("const {} = {};", binding, load));
                bind_object(&binding, definition, &mut out);
            }
        }
        LoadTarget::Asset { url } => {
            let expression = format!("new URL({}, import.meta.url).href", quote(url));
            bind_value(&expression, definition, &mut out);
        }
        LoadTarget::WrappedAsset { function, key } => {
            let expression = format!("await {}({})", function, quote(key));
            bind_value(&expression, definition, &mut out);
        }
        LoadTarget::Verbatim(text) => out.push(text.clone()),
    }
    out.join("\n")
}

/// Replace the import block of `source` with `rendered`.
///
/// Text inside the block that is not one of the recognized statements
/// (interleaved code, comments, skipped malformed statements) is kept and
/// placed after `rendered`. Everything outside the block is untouched.
pub fn replace_import_block(source: &str, scan: &ImportScan<'_>, rendered: &str) -> String {
    let Some(block) = &scan.block else {
        return source.to_string();
    };

    let mut preserved: Vec<&str> = Vec::new();
    let mut cursor = block.span.start;
    for statement in &scan.statements {
        let gap = &source[cursor..statement.span.start.max(cursor)];
        if !gap.trim().is_empty() {
            preserved.push(gap.trim());
        }
        cursor = statement.span.end.max(cursor);
    }
    let tail = &source[cursor.min(block.span.end)..block.span.end];
    if !tail.trim().is_empty() {
        preserved.push(tail.trim());
    }

    let mut output = String::with_capacity(source.len() + rendered.len());
    output.push_str(&source[..block.span.start]);
    output.push_str(rendered);
    for text in preserved {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(text);
    }
    output.push_str(&source[block.span.end..]);
    output
}
