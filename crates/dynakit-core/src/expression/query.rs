//! Query-mode condition builder.
//!
//! The first condition added is always the key condition. It is compiled with
//! its own fixed placeholders (`:keyValue`, `:start`, `:end`) so it can never
//! collide with the `:value{n}` placeholders of the filter built from the
//! remaining conditions.

use std::collections::HashMap;

use dynakit_model::AttributeValue;
use dynakit_model::input::QueryInput;
use dynakit_model::stream::Item;
use dynakit_model::types::Select;

use super::compiled::CompiledExpression;
use super::condition::{Condition, ConditionList, ConditionValue, Operator, ValueBinder};
use super::resolver::{ExpressionAttributeResolver, ResolverConfig};
use super::validation::{ExpressionError, validate_limit, validate_projection_path};

/// Accumulates conditions and modifiers for a `Query` request.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    conditions: ConditionList,
    index_name: Option<String>,
    limit: Option<usize>,
    select: Option<Vec<String>>,
    scan_forward: Option<bool>,
    consistent_read: Option<bool>,
    start_key: Option<Item>,
    resolver_config: ResolverConfig,
}

/// The compiled form of a [`QueryBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Every condition, in the order it was added.
    pub conditions: Vec<Condition>,
    /// Secondary index to query.
    pub index_name: Option<String>,
    /// Page size.
    pub limit: Option<usize>,
    /// Requested attribute paths, as given.
    pub select: Option<Vec<String>>,
    /// The key condition compiled from the first condition.
    pub key_condition: CompiledExpression,
    /// Filter compiled from every later condition.
    pub filter: Option<CompiledExpression>,
    /// Projection compiled from `select`.
    pub projection: Option<CompiledExpression>,
    /// Ascending (`true`) or descending sort-key order.
    pub scan_forward: Option<bool>,
    /// Strongly consistent read.
    pub consistent_read: Option<bool>,
    /// Key to resume after.
    pub start_key: Option<Item>,
}

impl QueryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit name-resolver configuration.
    #[must_use]
    pub fn with_resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver_config = config;
        self
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

    /// Query a secondary index.
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

    /// Sort-key order of the results.
    #[must_use]
    pub fn scan_forward(mut self, forward: bool) -> Self {
        self.scan_forward = Some(forward);
        self
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

    /// Number of conditions added so far.
    #[must_use]
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Compile the key condition, filter and projection.
    pub fn build(&self) -> Result<QueryOptions, ExpressionError> {
        let conditions = self.conditions.as_slice();
        let Some((key, rest)) = conditions.split_first() else {
            return Err(ExpressionError::NoConditions);
        };

        let mut resolver = ExpressionAttributeResolver::with_config(self.resolver_config.clone());

        let (expression, values) = compile_key_condition(key, &mut resolver)?;
        let key_condition =
            CompiledExpression::from_parts(expression, resolver.assigned_names(), values);

        let filter = if rest.is_empty() {
            None
        } else {
            let mut binder = ValueBinder::new(":value", 0);
            let fragments: Vec<String> = rest
                .iter()
                .map(|c| c.render(&mut resolver, &mut binder))
                .collect();
            Some(CompiledExpression::from_parts(
                fragments.join(" AND "),
                resolver.assigned_names(),
                binder.into_values(),
            ))
        };

        let projection = self.select.as_ref().map(|fields| {
            let expression = resolver.process_projection_expression(fields);
            CompiledExpression::from_parts(expression, resolver.assigned_names(), HashMap::new())
        });

        tracing::debug!(
            key_condition = %key_condition.expression,
            filters = rest.len(),
            names = resolver.assigned_names().len(),
            "compiled query"
        );

        Ok(QueryOptions {
            conditions: conditions.to_vec(),
            index_name: self.index_name.clone(),
            limit: self.limit,
            select: self.select.clone(),
            key_condition,
            filter,
            projection,
            scan_forward: self.scan_forward,
            consistent_read: self.consistent_read,
            start_key: self.start_key.clone(),
        })
    }

    fn push(
        mut self,
        field: &str,
        operator: Operator,
        value: ConditionValue,
    ) -> Result<Self, ExpressionError> {
        let condition = Condition::new(field, operator, value)?;
        self.conditions.push(condition)?;
        Ok(self)
    }
}

fn compile_key_condition(
    condition: &Condition,
    resolver: &mut ExpressionAttributeResolver,
) -> Result<(String, HashMap<String, AttributeValue>), ExpressionError> {
    if !condition.operator.is_key_operator() {
        return Err(ExpressionError::UnsupportedKeyCondition {
            operator: condition.operator,
        });
    }

    let name = resolver.resolve(&condition.field);
    let mut binder = ValueBinder::new(":keyValue", 0);
    let expression = match (&condition.value, condition.operator) {
        (ConditionValue::Range(start, end), Operator::Between) => {
            let start = binder.bind_as(":start".to_owned(), start.clone());
            let end = binder.bind_as(":end".to_owned(), end.clone());
            format!("{name} BETWEEN {start} AND {end}")
        }
        (ConditionValue::Single(value), op) => {
            let placeholder = binder.bind_as(":keyValue".to_owned(), value.clone());
            match op {
                Operator::BeginsWith => format!("begins_with({name}, {placeholder})"),
                Operator::LessThan => format!("{name} < {placeholder}"),
                Operator::GreaterThan => format!("{name} > {placeholder}"),
                _ => format!("{name} = {placeholder}"),
            }
        }
        _ => {
            return Err(ExpressionError::UnsupportedKeyCondition {
                operator: condition.operator,
            });
        }
    };
    Ok((expression, binder.into_values()))
}

impl QueryOptions {
    /// Turn into a request for `table_name`, merging every name and value map.
    pub fn into_input(self, table_name: impl Into<String>) -> Result<QueryInput, ExpressionError> {
        let mut names = HashMap::new();
        let mut values = HashMap::new();
        self.key_condition.merge_into(&mut names, &mut values)?;
        if let Some(filter) = &self.filter {
            filter.merge_into(&mut names, &mut values)?;
        }
        if let Some(projection) = &self.projection {
            projection.merge_into(&mut names, &mut values)?;
        }

        Ok(QueryInput {
            table_name: table_name.into(),
            index_name: self.index_name,
            key_condition_expression: self.key_condition.expression,
            filter_expression: self.filter.map(|f| f.expression),
            projection_expression: self.projection.map(|p| p.expression),
            expression_attribute_names: names,
            expression_attribute_values: values,
            scan_index_forward: self.scan_forward,
            limit: self.limit.and_then(|l| i32::try_from(l).ok()),
            exclusive_start_key: self.start_key.unwrap_or_default(),
            select: self.select.as_ref().map(|_| Select::SpecificAttributes),
            consistent_read: self.consistent_read,
        })
    }
}
