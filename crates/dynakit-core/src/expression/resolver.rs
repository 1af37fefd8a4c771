//! Attribute-name escaping.
//!
//! DynamoDB refuses reserved words and names with special characters as bare
//! identifiers in expressions. The resolver swaps such names for `#n{K}`
//! placeholders and records the mapping, reusing the placeholder whenever the
//! same name comes up again.

use std::collections::{HashMap, HashSet};

use super::lexer::{Lexer, TokenKind};
use super::reserved::is_reserved;

/// Resolver behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    passthrough: HashSet<String>,
}

impl ResolverConfig {
    /// Names listed here are emitted verbatim even when they would normally be
    /// escaped. Intended for exercising engines that accept reserved words.
    #[must_use]
    pub fn with_passthrough<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passthrough: names.into_iter().map(Into::into).collect(),
        }
    }

    fn is_passthrough(&self, segment: &str) -> bool {
        self.passthrough.contains(segment)
    }
}

/// Maps attribute names to `#n{K}` placeholders where escaping is required.
#[derive(Debug, Clone, Default)]
pub struct ExpressionAttributeResolver {
    config: ResolverConfig,
    by_name: HashMap<String, String>,
    names: HashMap<String, String>,
}

impl ExpressionAttributeResolver {
    /// Create a resolver with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with an explicit configuration.
    #[must_use]
    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Resolve a possibly dotted path, escaping each segment independently.
    ///
    /// Segments that need no escaping are returned unchanged.
    pub fn resolve(&mut self, path: &str) -> String {
        path.split('.')
            .map(|segment| self.resolve_segment(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Resolve and join several projection paths with `", "`.
    pub fn process_projection_expression<S: AsRef<str>>(&mut self, fields: &[S]) -> String {
        fields
            .iter()
            .map(|f| self.resolve(f.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Escape every bare identifier of a free-form expression that needs it.
    ///
    /// Placeholders, grammar keywords, function names and punctuation are left
    /// untouched, as is all whitespace.
    pub fn process_key_condition_expression(&mut self, expression: &str) -> String {
        Lexer::new(expression)
            .map(|token| match token.kind {
                TokenKind::Identifier => self.resolve_segment(token.text),
                _ => token.text.to_owned(),
            })
            .collect()
    }

    /// Placeholder-to-name map of everything assigned so far.
    #[must_use]
    pub fn assigned_names(&self) -> &HashMap<String, String> {
        &self.names
    }

    /// Same as [`Self::assigned_names`], but absent instead of empty.
    #[must_use]
    pub fn get_all_assigned_names(&self) -> Option<HashMap<String, String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }

    pub(crate) fn resolve_segment(&mut self, segment: &str) -> String {
        // A trailing list index (`items[0]`) belongs to the grammar, not the name.
        let (name, index) = segment
            .find('[')
            .map_or((segment, ""), |at| segment.split_at(at));
        if name.is_empty() || !needs_escaping(name) || self.config.is_passthrough(name) {
            return segment.to_owned();
        }

        format!("{}{index}", self.placeholder_for(name))
    }

    /// Reference a single attribute name taken literally, never as a path.
    ///
    /// Plain identifiers behave as in [`Self::resolve`]; anything else always
    /// gets a placeholder.
    pub(crate) fn resolve_literal(&mut self, name: &str) -> String {
        let plain = name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain {
            self.resolve_segment(name)
        } else {
            self.placeholder_for(name)
        }
    }

    fn placeholder_for(&mut self, name: &str) -> String {
        if let Some(existing) = self.by_name.get(name) {
            return existing.clone();
        }
        let fresh = format!("#n{}", self.names.len());
        self.by_name.insert(name.to_owned(), fresh.clone());
        self.names.insert(fresh.clone(), name.to_owned());
        fresh
    }
}

fn needs_escaping(name: &str) -> bool {
    is_reserved(name) || name.contains(['-', ' '])
}
