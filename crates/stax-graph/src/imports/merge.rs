use indexmap::IndexMap;

use super::analyze::ImportDefinition;

/// Combine definitions that target the same specifier.
///
/// Specifiers keep the position of their first occurrence; bindings are
/// unioned without duplicates. The resulting order drives slot numbering, so
/// it depends only on the input order.
pub fn merge_import_definitions<I>(definitions: I) -> IndexMap<String, ImportDefinition>
where
    I: IntoIterator<Item = ImportDefinition>,
{
    let mut merged: IndexMap<String, ImportDefinition> = IndexMap::new();
    for definition in definitions {
        match merged.get_mut(&definition.specifier) {
            Some(existing) => existing.merge(definition),
            None => {
                merged.insert(definition.specifier.clone(), definition);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::NamedImport;

    #[test]
    fn test_same_specifier_is_merged() {
        let merged = merge_import_definitions(vec![
            ImportDefinition::new("./a").with_default("A"),
            ImportDefinition::new("react").with_named("useState", "useState"),
            ImportDefinition::new("./a").with_named("helper", "helper"),
            ImportDefinition::new("./a").with_default("A"),
        ]);

        let keys: Vec<_> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["./a", "react"]);

        let a = &merged["./a"];
        assert_eq!(a.defaults.len(), 1);
        assert!(a.named.contains(&NamedImport::new("helper", "helper")));
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_import_definitions(Vec::new()).is_empty());
    }
}
