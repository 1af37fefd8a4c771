//! Expression strings bundled with their placeholder bindings.

use std::collections::HashMap;

use dynakit_model::AttributeValue;

use super::lexer::name_refs;
use super::validation::ExpressionError;

/// An expression string plus the name and value maps it references.
///
/// Every `#name` and `:value` placeholder occurring in `expression` has exactly
/// one entry in the matching map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledExpression {
    /// The expression text.
    pub expression: String,
    /// `#placeholder -> attribute name`
    pub names: HashMap<String, String>,
    /// `:placeholder -> value`
    pub values: HashMap<String, AttributeValue>,
}

impl CompiledExpression {
    /// Wrap an expression that needs no placeholders.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            ..Self::default()
        }
    }

    /// Add a name binding.
    #[must_use]
    pub fn with_name(mut self, placeholder: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(placeholder.into(), name.into());
        self
    }

    /// Add a value binding.
    #[must_use]
    pub fn with_value(
        mut self,
        placeholder: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.values.insert(placeholder.into(), value.into());
        self
    }

    /// Build from a resolver's full name map, keeping only referenced names.
    pub(crate) fn from_parts(
        expression: String,
        all_names: &HashMap<String, String>,
        values: HashMap<String, AttributeValue>,
    ) -> Self {
        let names = name_refs(&expression)
            .filter_map(|placeholder| {
                all_names
                    .get(placeholder)
                    .map(|name| (placeholder.to_owned(), name.clone()))
            })
            .collect();
        Self {
            expression,
            names,
            values,
        }
    }

    /// Fold this expression's bindings into shared request maps.
    ///
    /// Identical re-bindings are accepted; a placeholder bound to something
    /// different fails with [`ExpressionError::PlaceholderConflict`].
    pub fn merge_into(
        &self,
        names: &mut HashMap<String, String>,
        values: &mut HashMap<String, AttributeValue>,
    ) -> Result<(), ExpressionError> {
        merge_map(names, &self.names)?;
        merge_map(values, &self.values)
    }
}

pub(crate) fn merge_map<V: Clone + PartialEq>(
    target: &mut HashMap<String, V>,
    source: &HashMap<String, V>,
) -> Result<(), ExpressionError> {
    for (key, value) in source {
        match target.get(key) {
            Some(existing) if existing != value => {
                return Err(ExpressionError::PlaceholderConflict {
                    placeholder: key.clone(),
                });
            }
            Some(_) => {}
            None => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_keep_only_referenced_names() {
        let all = HashMap::from([
            ("#n0".to_owned(), "name".to_owned()),
            ("#n1".to_owned(), "status".to_owned()),
        ]);
        let compiled = CompiledExpression::from_parts("#n1 = :v".to_owned(), &all, HashMap::new());
        assert_eq!(compiled.names.len(), 1);
        assert_eq!(compiled.names["#n1"], "status");
    }

    #[test]
    fn test_should_merge_identical_bindings() {
        let a = CompiledExpression::new("#n0 = :x")
            .with_name("#n0", "name")
            .with_value(":x", 1);
        let mut names = HashMap::from([("#n0".to_owned(), "name".to_owned())]);
        let mut values = HashMap::new();
        a.merge_into(&mut names, &mut values).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(values[":x"], AttributeValue::N("1".to_owned()));
    }

    #[test]
    fn test_should_reject_conflicting_bindings() {
        let a = CompiledExpression::new("#n0 = :x").with_name("#n0", "status");
        let mut names = HashMap::from([("#n0".to_owned(), "name".to_owned())]);
        let mut values = HashMap::new();
        assert_eq!(
            a.merge_into(&mut names, &mut values),
            Err(ExpressionError::PlaceholderConflict {
                placeholder: "#n0".to_owned()
            })
        );
    }
}
