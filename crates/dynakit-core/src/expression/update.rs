//! Update-expression compiler.
//!
//! Operations are recorded in call order and compiled into a single
//! `SET … REMOVE … ADD … DELETE …` expression. Groups always appear in that
//! order; actions inside a group keep their call order. Value placeholders are
//! `:val{n}` with `n` counting from 1 across the whole expression.

use std::collections::{HashMap, HashSet};

use dynakit_model::AttributeValue;
use dynakit_model::input::UpdateItemInput;
use dynakit_model::stream::Item;
use dynakit_model::types::ReturnValue;

use super::compiled::{CompiledExpression, merge_map};
use super::condition::ValueBinder;
use super::resolver::{ExpressionAttributeResolver, ResolverConfig};
use super::validation::{
    ExpressionError, MAX_UPDATES, invalid_value, validate_field_name, validate_number,
    validate_set, validate_value,
};

/// The clause an update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOperation {
    /// Assign a value.
    Set,
    /// Delete the attribute.
    Remove,
    /// Add to a number or union into a set.
    Add,
    /// Subtract elements from a set.
    Delete,
}

impl UpdateOperation {
    /// Clause keyword.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::Remove => "REMOVE",
            Self::Add => "ADD",
            Self::Delete => "DELETE",
        }
    }

    const CLAUSE_ORDER: [Self; 4] = [Self::Set, Self::Remove, Self::Add, Self::Delete];
}

/// Operand of a [`FieldUpdate`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    /// A value used as-is.
    Plain(AttributeValue),
    /// Elements appended to a list, creating it when absent.
    AppendList(Vec<AttributeValue>),
    /// Elements prepended to a list, creating it when absent.
    PrependList(Vec<AttributeValue>),
}

/// One recorded update.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    /// Attribute name.
    pub field: String,
    /// Operand; `None` for `REMOVE`.
    pub value: Option<UpdateValue>,
    /// Clause.
    pub operation: UpdateOperation,
}

/// A compiled update, ready for `UpdateItem`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledUpdate {
    /// The `SET … REMOVE … ADD … DELETE …` expression.
    pub update_expression: String,
    /// Condition guarding the update, if any.
    pub condition_expression: Option<String>,
    /// `#placeholder -> attribute name`
    pub names: HashMap<String, String>,
    /// `:placeholder -> value`
    pub values: HashMap<String, AttributeValue>,
}

impl CompiledUpdate {
    /// Turn into a request. `return_values` is passed through untouched.
    #[must_use]
    pub fn into_input(
        self,
        table_name: impl Into<String>,
        key: Item,
        return_values: Option<ReturnValue>,
    ) -> UpdateItemInput {
        UpdateItemInput {
            table_name: table_name.into(),
            key,
            update_expression: self.update_expression,
            condition_expression: self.condition_expression,
            expression_attribute_names: self.names,
            expression_attribute_values: self.values,
            return_values,
        }
    }
}

/// Records updates to one item.
#[derive(Debug, Clone, Default)]
pub struct UpdateOperationBuilder {
    updates: Vec<FieldUpdate>,
    resolver_config: ResolverConfig,
}

impl UpdateOperationBuilder {
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

    /// `SET field = value`
    pub fn set(self, field: &str, value: impl Into<AttributeValue>) -> Result<Self, ExpressionError> {
        let value = value.into();
        validate_value(field, &value)?;
        self.push(field, UpdateOperation::Set, Some(UpdateValue::Plain(value)))
    }

    /// `REMOVE field`
    pub fn remove(self, field: &str) -> Result<Self, ExpressionError> {
        self.push(field, UpdateOperation::Remove, None)
    }

    /// `ADD field value`; the value must be a number or a set.
    pub fn add(self, field: &str, value: impl Into<AttributeValue>) -> Result<Self, ExpressionError> {
        let value = value.into();
        if value.as_n().is_some() {
            validate_number(field, &value)?;
        } else {
            validate_set(field, &value)
                .map_err(|_| invalid_value(field, "ADD expects a number or a set"))?;
        }
        self.push(field, UpdateOperation::Add, Some(UpdateValue::Plain(value)))
    }

    /// `DELETE field value`; the value must be a set.
    pub fn delete(
        self,
        field: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<Self, ExpressionError> {
        let value = value.into();
        validate_set(field, &value)?;
        self.push(field, UpdateOperation::Delete, Some(UpdateValue::Plain(value)))
    }

    /// Atomically add `by` to a number.
    pub fn increment(
        self,
        field: &str,
        by: impl Into<AttributeValue>,
    ) -> Result<Self, ExpressionError> {
        let by = by.into();
        validate_number(field, &by)?;
        self.push(field, UpdateOperation::Add, Some(UpdateValue::Plain(by)))
    }

    /// Atomically subtract `by` from a number.
    pub fn decrement(
        self,
        field: &str,
        by: impl Into<AttributeValue>,
    ) -> Result<Self, ExpressionError> {
        let by = by.into();
        validate_number(field, &by)?;
        let negated = match by {
            AttributeValue::N(n) => AttributeValue::N(negate(&n)),
            other => other,
        };
        self.push(field, UpdateOperation::Add, Some(UpdateValue::Plain(negated)))
    }

    /// Append to a list. A list argument contributes its elements; anything
    /// else is appended as one element.
    pub fn append_to_list(
        self,
        field: &str,
        item: impl Into<AttributeValue>,
    ) -> Result<Self, ExpressionError> {
        let items = list_items(field, item.into())?;
        self.push(field, UpdateOperation::Set, Some(UpdateValue::AppendList(items)))
    }

    /// Prepend to a list, with the same argument rules as [`Self::append_to_list`].
    pub fn prepend_to_list(
        self,
        field: &str,
        item: impl Into<AttributeValue>,
    ) -> Result<Self, ExpressionError> {
        let items = list_items(field, item.into())?;
        self.push(field, UpdateOperation::Set, Some(UpdateValue::PrependList(items)))
    }

    /// The recorded updates, in call order.
    #[must_use]
    pub fn build(&self) -> Vec<FieldUpdate> {
        self.updates.clone()
    }

    /// Compile into one update expression.
    pub fn compile(&self) -> Result<CompiledUpdate, ExpressionError> {
        if self.updates.is_empty() {
            return Err(ExpressionError::NoUpdates);
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.updates.iter().find(|u| !seen.insert(u.field.as_str())) {
            return Err(ExpressionError::OverlappingUpdate {
                field: dup.field.clone(),
            });
        }

        let mut resolver = ExpressionAttributeResolver::with_config(self.resolver_config.clone());
        let mut binder = ValueBinder::new(":val", 1);
        let mut clauses = Vec::with_capacity(UpdateOperation::CLAUSE_ORDER.len());
        for operation in UpdateOperation::CLAUSE_ORDER {
            let actions: Vec<String> = self
                .updates
                .iter()
                .filter(|u| u.operation == operation)
                .map(|u| render_action(u, &mut resolver, &mut binder))
                .collect();
            if !actions.is_empty() {
                clauses.push(format!("{} {}", operation.as_str(), actions.join(", ")));
            }
        }

        let compiled = CompiledUpdate {
            update_expression: clauses.join(" "),
            condition_expression: None,
            names: resolver.assigned_names().clone(),
            values: binder.into_values(),
        };
        tracing::debug!(
            update_expression = %compiled.update_expression,
            updates = self.updates.len(),
            values = compiled.values.len(),
            "compiled update"
        );
        Ok(compiled)
    }

    /// Compile and attach a condition.
    ///
    /// The condition's names and values are merged without renumbering; a
    /// placeholder bound differently on both sides is a
    /// [`ExpressionError::PlaceholderConflict`].
    pub fn compile_with_condition(
        &self,
        condition: &CompiledExpression,
    ) -> Result<CompiledUpdate, ExpressionError> {
        let mut compiled = self.compile()?;
        merge_map(&mut compiled.names, &condition.names)?;
        merge_map(&mut compiled.values, &condition.values)?;
        compiled.condition_expression = Some(condition.expression.clone());
        Ok(compiled)
    }

    /// Number of updates recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Whether no update has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    fn push(
        mut self,
        field: &str,
        operation: UpdateOperation,
        value: Option<UpdateValue>,
    ) -> Result<Self, ExpressionError> {
        validate_field_name(field)?;
        if self.updates.len() >= MAX_UPDATES {
            return Err(ExpressionError::TooManyUpdates { limit: MAX_UPDATES });
        }
        self.updates.push(FieldUpdate {
            field: field.to_owned(),
            value,
            operation,
        });
        Ok(self)
    }
}

fn render_action(
    update: &FieldUpdate,
    resolver: &mut ExpressionAttributeResolver,
    binder: &mut ValueBinder,
) -> String {
    let name = resolver.resolve(&update.field);
    match (&update.value, update.operation) {
        (None, _) => name,
        (Some(UpdateValue::Plain(value)), UpdateOperation::Set) => {
            format!("{name} = {}", binder.bind(value.clone()))
        }
        (Some(UpdateValue::Plain(value)), _) => {
            format!("{name} {}", binder.bind(value.clone()))
        }
        (Some(UpdateValue::AppendList(items)), _) => {
            let (empty, items) = bind_list(binder, items);
            format!("{name} = list_append(if_not_exists({name}, {empty}), {items})")
        }
        (Some(UpdateValue::PrependList(items)), _) => {
            let (empty, items) = bind_list(binder, items);
            format!("{name} = list_append({items}, if_not_exists({name}, {empty}))")
        }
    }
}

/// One counter tick yields both the `:empty{n}` fallback and the `:items{n}` operand.
fn bind_list(binder: &mut ValueBinder, items: &[AttributeValue]) -> (String, String) {
    let n = binder.tick();
    let empty = binder.bind_as(format!(":empty{n}"), AttributeValue::L(Vec::new()));
    let items = binder.bind_as(format!(":items{n}"), AttributeValue::L(items.to_vec()));
    (empty, items)
}

fn list_items(field: &str, item: AttributeValue) -> Result<Vec<AttributeValue>, ExpressionError> {
    let items = match item {
        AttributeValue::L(items) => items,
        other => vec![other],
    };
    if items.is_empty() {
        return Err(ExpressionError::EmptyList {
            field: field.to_owned(),
        });
    }
    for item in &items {
        validate_value(field, item)?;
    }
    Ok(items)
}

fn negate(number: &str) -> String {
    match number.strip_prefix('-') {
        Some(abs) => abs.to_owned(),
        None => format!("-{}", number.strip_prefix('+').unwrap_or(number)),
    }
}
