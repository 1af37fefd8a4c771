//! Scan-mode condition builder.
//!
//! Conditions compile into filter fragments as they are added. One resolver and
//! one `:value{n}` counter are shared by every fragment, custom ones included,
//! so placeholders never repeat within a build.

use std::collections::HashMap;

use dynakit_model::AttributeValue;
use dynakit_model::input::ScanInput;
use dynakit_model::stream::Item;
use dynakit_model::types::Select;

use super::condition::{Condition, ConditionList, ConditionValue, Operator, ValueBinder};
use super::lexer::{Lexer, TokenKind};
use super::resolver::{ExpressionAttributeResolver, ResolverConfig};
use super::validation::{
    ExpressionError, MAX_CONDITIONS, invalid_value, validate_field_name, validate_limit,
    validate_projection_path, validate_value,
};

const NO_NAMES: [(&str, &str); 0] = [];
const NO_VALUES: [(&str, AttributeValue); 0] = [];

/// Upper bound DynamoDB places on `TotalSegments`.
pub const MAX_TOTAL_SEGMENTS: u32 = 1_000_000;

/// Accumulates filter conditions and modifiers for a `Scan` request.
#[derive(Debug, Clone)]
pub struct ScanBuilder {
    conditions: ConditionList,
    fragments: Vec<String>,
    resolver: ExpressionAttributeResolver,
    binder: ValueBinder,
    index_name: Option<String>,
    limit: Option<usize>,
    select: Option<Vec<String>>,
    consistent_read: Option<bool>,
    start_key: Option<Item>,
    segment: Option<(u32, u32)>,
}

/// The compiled form of a [`ScanBuilder`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOptions {
    /// Structured conditions, in the order they were added.
    pub conditions: Vec<Condition>,
    /// Every fragment joined with `" AND "`; `None` for an unconditional scan.
    pub filter: Option<String>,
    /// `#placeholder -> attribute name` for the filter and projection.
    pub expression_names: HashMap<String, String>,
    /// `:placeholder -> value` for the filter.
    pub expression_values: HashMap<String, AttributeValue>,
    /// Compiled projection.
    pub projection: Option<String>,
    /// Secondary index to scan.
    pub index_name: Option<String>,
    /// Page size.
    pub limit: Option<usize>,
    /// Requested attribute paths, as given.
    pub select: Option<Vec<String>>,
    /// Strongly consistent read.
    pub consistent_read: Option<bool>,
    /// Key to resume after.
    pub start_key: Option<Item>,
    /// Parallel-scan segment read by this worker.
    pub segment: Option<u32>,
    /// Parallel-scan segment count.
    pub total_segments: Option<u32>,
}

impl Default for ScanBuilder {
    fn default() -> Self {
        Self::with_resolver_config(ResolverConfig::default())
    }
}

impl ScanBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty builder whose resolver uses `config`.
    #[must_use]
    pub fn with_resolver_config(config: ResolverConfig) -> Self {
        Self {
            conditions: ConditionList::default(),
            fragments: Vec::new(),
            resolver: ExpressionAttributeResolver::with_config(config),
            binder: ValueBinder::new(":value", 0),
            index_name: None,
            limit: None,
            select: None,
            consistent_read: None,
            start_key: None,
            segment: None,
        }
    }

    single_value_condition! {
        /// `field = value`
        equals => Equals,
        /// `field <> value`
        not_equals => NotEquals,
        /// `field > value`; the value must be a finite number.
        greater_than => GreaterThan,
        /// `field < value`; the value must be a finite number.
        less_than => LessThan,
        /// `contains(field, value)`
        contains => Contains,
        /// `begins_with(field, value)`; the value must be a string.
        begins_with => BeginsWith,
    }

    /// `field IN (values…)`; the list must not be empty.
    pub fn is_in<I, V>(self, field: &str, values: I) -> Result<Self, ExpressionError>
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(field, Operator::In, ConditionValue::List(values))
    }

    /// `field BETWEEN start AND end`; requires `start <= end`.
    pub fn between(
        self,
        field: &str,
        start: impl Into<AttributeValue>,
        end: impl Into<AttributeValue>,
    ) -> Result<Self, ExpressionError> {
        self.push(
            field,
            Operator::Between,
            ConditionValue::Range(start.into(), end.into()),
        )
    }

    /// `attribute_exists(field)`
    pub fn attribute_exists(self, field: &str) -> Result<Self, ExpressionError> {
        self.push_function("attribute_exists", field)
    }

    /// `attribute_not_exists(field)`
    pub fn attribute_not_exists(self, field: &str) -> Result<Self, ExpressionError> {
        self.push_function("attribute_not_exists", field)
    }

    /// Add a hand-written fragment that references no placeholders.
    pub fn filter(self, expression: &str) -> Result<Self, ExpressionError> {
        self.filter_with_bindings(expression, NO_NAMES, NO_VALUES)
    }

    /// Add a hand-written fragment with its own `:placeholder` values.
    pub fn filter_with_values<I, K, V>(
        self,
        expression: &str,
        values: I,
    ) -> Result<Self, ExpressionError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.filter_with_bindings(expression, NO_NAMES, values)
    }

    /// Add a hand-written fragment with its own `#name` and `:value`
    /// placeholders.
    ///
    /// The caller's `:placeholders` are renamed onto the shared `:value{n}`
    /// counter. Each `#placeholder` is replaced by whatever the shared resolver
    /// uses for the attribute it maps to, and bare identifiers go through the
    /// resolver too. Every referenced placeholder must be supplied and every
    /// supplied one must be referenced. The fragment is parenthesized so its
    /// own `OR`s stay local.
    pub fn filter_with_bindings<N, NK, NV, I, K, V>(
        mut self,
        expression: &str,
        names: N,
        values: I,
    ) -> Result<Self, ExpressionError>
    where
        N: IntoIterator<Item = (NK, NV)>,
        NK: Into<String>,
        NV: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.check_capacity()?;
        if expression.trim().is_empty() {
            return Err(invalid_value("filter", "expression must not be empty"));
        }

        let mut supplied_names = HashMap::new();
        for (placeholder, name) in names {
            let placeholder = with_sigil(placeholder.into(), '#');
            let name = name.into();
            if name.is_empty() {
                return Err(invalid_value(&placeholder, "attribute name must not be empty"));
            }
            supplied_names.insert(placeholder, name);
        }

        let mut supplied = HashMap::new();
        for (placeholder, value) in values {
            let placeholder = with_sigil(placeholder.into(), ':');
            let value = value.into();
            validate_value(&placeholder, &value)?;
            supplied.insert(placeholder, value);
        }

        let mut renamed: HashMap<&str, String> = HashMap::new();
        let mut rewritten = String::with_capacity(expression.len() + 8);
        for token in Lexer::new(expression) {
            match token.kind {
                TokenKind::ValueRef => {
                    if let Some(placeholder) = renamed.get(token.text) {
                        rewritten.push_str(placeholder);
                        continue;
                    }
                    let value = supplied.get(token.text).cloned().ok_or_else(|| {
                        ExpressionError::MissingValue {
                            placeholder: token.text.to_owned(),
                        }
                    })?;
                    let placeholder = self.binder.bind(value);
                    rewritten.push_str(&placeholder);
                    renamed.insert(token.text, placeholder);
                }
                TokenKind::NameRef => {
                    let name = supplied_names.get(token.text).ok_or_else(|| {
                        ExpressionError::MissingName {
                            placeholder: token.text.to_owned(),
                        }
                    })?;
                    rewritten.push_str(&self.resolver.resolve_literal(name));
                    renamed.insert(token.text, String::new());
                }
                TokenKind::Identifier => {
                    rewritten.push_str(&self.resolver.resolve_segment(token.text));
                }
                _ => rewritten.push_str(token.text),
            }
        }

        if let Some(unused) = supplied
            .keys()
            .chain(supplied_names.keys())
            .find(|k| !renamed.contains_key(k.as_str()))
        {
            return Err(invalid_value(
                unused,
                "supplied placeholder is not referenced by the filter",
            ));
        }

        self.fragments.push(format!("({rewritten})"));
        Ok(self)
    }

    /// Scan a secondary index.
    #[must_use]
    pub fn using_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    /// Cap the page size; `1..=1000`.
    pub fn with_limit(mut self, limit: usize) -> Result<Self, ExpressionError> {
        validate_limit(limit)?;
        self.limit = Some(limit);
        Ok(self)
    }

    /// Return only these attribute paths.
    pub fn select_fields<I, S>(mut self, fields: I) -> Result<Self, ExpressionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        for field in &fields {
            validate_projection_path(field)?;
        }
        self.select = (!fields.is_empty()).then_some(fields);
        Ok(self)
    }

    /// Request a strongly consistent read.
    #[must_use]
    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = Some(consistent);
        self
    }

    /// Resume after this key.
    #[must_use]
    pub fn with_start_key(mut self, key: Item) -> Self {
        self.start_key = Some(key);
        self
    }

    /// Read one segment of a parallel scan.
    pub fn with_parallel_scan(
        mut self,
        total_segments: u32,
        segment: u32,
    ) -> Result<Self, ExpressionError> {
        if total_segments == 0 || total_segments > MAX_TOTAL_SEGMENTS || segment >= total_segments
        {
            return Err(ExpressionError::InvalidSegment {
                segment,
                total_segments,
            });
        }
        self.segment = Some((segment, total_segments));
        Ok(self)
    }

    /// Number of fragments added so far.
    #[must_use]
    pub fn condition_count(&self) -> usize {
        self.fragments.len()
    }

    /// Join the fragments and compile the projection. Never fails.
    #[must_use]
    pub fn build(&self) -> ScanOptions {
        let mut resolver = self.resolver.clone();
        let projection = self
            .select
            .as_ref()
            .map(|fields| resolver.process_projection_expression(fields));
        let filter = (!self.fragments.is_empty()).then(|| self.fragments.join(" AND "));

        tracing::debug!(
            fragments = self.fragments.len(),
            values = self.binder.values().len(),
            names = resolver.assigned_names().len(),
            "compiled scan"
        );

        ScanOptions {
            conditions: self.conditions.as_slice().to_vec(),
            filter,
            expression_names: resolver.assigned_names().clone(),
            expression_values: self.binder.values().clone(),
            projection,
            index_name: self.index_name.clone(),
            limit: self.limit,
            select: self.select.clone(),
            consistent_read: self.consistent_read,
            start_key: self.start_key.clone(),
            segment: self.segment.map(|(segment, _)| segment),
            total_segments: self.segment.map(|(_, total)| total),
        }
    }

    fn check_capacity(&self) -> Result<(), ExpressionError> {
        if self.fragments.len() >= MAX_CONDITIONS {
            return Err(ExpressionError::TooManyConditions {
                limit: MAX_CONDITIONS,
            });
        }
        Ok(())
    }

    fn push(
        mut self,
        field: &str,
        operator: Operator,
        value: ConditionValue,
    ) -> Result<Self, ExpressionError> {
        self.check_capacity()?;
        let condition = Condition::new(field, operator, value)?;
        let fragment = condition.render(&mut self.resolver, &mut self.binder);
        self.conditions.push(condition)?;
        self.fragments.push(fragment);
        Ok(self)
    }

    fn push_function(mut self, function: &str, field: &str) -> Result<Self, ExpressionError> {
        self.check_capacity()?;
        validate_field_name(field)?;
        let name = self.resolver.resolve(field);
        self.fragments.push(format!("{function}({name})"));
        Ok(self)
    }
}

fn with_sigil(mut placeholder: String, sigil: char) -> String {
    if !placeholder.starts_with(sigil) {
        placeholder.insert(0, sigil);
    }
    placeholder
}

impl ScanOptions {
    /// Turn into a request for `table_name`.
    #[must_use]
    pub fn into_input(self, table_name: impl Into<String>) -> ScanInput {
        ScanInput {
            table_name: table_name.into(),
            index_name: self.index_name,
            filter_expression: self.filter,
            projection_expression: self.projection,
            expression_attribute_names: self.expression_names,
            expression_attribute_values: self.expression_values,
            limit: self.limit.and_then(|l| i32::try_from(l).ok()),
            exclusive_start_key: self.start_key.unwrap_or_default(),
            segment: self.segment.and_then(|s| i32::try_from(s).ok()),
            total_segments: self.total_segments.and_then(|t| i32::try_from(t).ok()),
            select: self.select.as_ref().map(|_| Select::SpecificAttributes),
            consistent_read: self.consistent_read,
        }
    }
}
