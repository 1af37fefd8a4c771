//! Structured conditions and their rendering into expression fragments.

use std::collections::HashMap;
use std::fmt;

use dynakit_model::AttributeValue;

use super::resolver::ExpressionAttributeResolver;
use super::validation::{
    ExpressionError, MAX_CONDITIONS, MAX_IN_OPERANDS, validate_field_name, validate_number,
    validate_range, validate_string, validate_value,
};

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `field = value`
    Equals,
    /// `field <> value`
    NotEquals,
    /// `field > value`
    GreaterThan,
    /// `field < value`
    LessThan,
    /// `contains(field, value)`
    Contains,
    /// `begins_with(field, value)`
    BeginsWith,
    /// `field IN (v1, v2, …)`
    In,
    /// `field BETWEEN start AND end`
    Between,
}

impl Operator {
    /// Upper-case name of the operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::GreaterThan => "GREATER_THAN",
            Self::LessThan => "LESS_THAN",
            Self::Contains => "CONTAINS",
            Self::BeginsWith => "BEGINS_WITH",
            Self::In => "IN",
            Self::Between => "BETWEEN",
        }
    }

    /// Whether DynamoDB accepts this operator on a sort key.
    #[must_use]
    pub fn is_key_operator(&self) -> bool {
        matches!(
            self,
            Self::Equals | Self::LessThan | Self::GreaterThan | Self::BeginsWith | Self::Between
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operand side of a [`Condition`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// One value.
    Single(AttributeValue),
    /// Inclusive bounds for `BETWEEN`.
    Range(AttributeValue, AttributeValue),
    /// Candidates for `IN`.
    List(Vec<AttributeValue>),
}

/// One `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Attribute name.
    pub field: String,
    /// Operand.
    pub value: ConditionValue,
    /// Comparison.
    pub operator: Operator,
}

impl Condition {
    /// Validate and assemble a condition.
    ///
    /// The operand shape must match the operator: `Range` for `Between`,
    /// `List` for `In`, `Single` otherwise.
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value: ConditionValue,
    ) -> Result<Self, ExpressionError> {
        let field = field.into();
        validate_field_name(&field)?;

        match (operator, &value) {
            (Operator::Equals | Operator::NotEquals | Operator::Contains, ConditionValue::Single(v)) => {
                validate_value(&field, v)?;
            }
            (Operator::GreaterThan | Operator::LessThan, ConditionValue::Single(v)) => {
                validate_number(&field, v)?;
            }
            (Operator::BeginsWith, ConditionValue::Single(v)) => {
                validate_string(&field, v)?;
            }
            (Operator::Between, ConditionValue::Range(start, end)) => {
                validate_range(&field, start, end)?;
            }
            (Operator::In, ConditionValue::List(values)) => {
                if values.is_empty() {
                    return Err(ExpressionError::EmptyList { field });
                }
                if values.len() > MAX_IN_OPERANDS {
                    return Err(ExpressionError::InvalidValue {
                        field,
                        reason: format!("IN accepts at most {MAX_IN_OPERANDS} values"),
                    });
                }
                for v in values {
                    validate_value(&field, v)?;
                }
            }
            (op, _) => {
                return Err(ExpressionError::InvalidValue {
                    field,
                    reason: format!("operand shape does not fit {op}"),
                });
            }
        }

        Ok(Self {
            field,
            value,
            operator,
        })
    }

    /// Render as a fragment, binding operands through `binder`.
    pub(crate) fn render(
        &self,
        resolver: &mut ExpressionAttributeResolver,
        binder: &mut ValueBinder,
    ) -> String {
        let name = resolver.resolve(&self.field);
        match (&self.value, self.operator) {
            (ConditionValue::Single(v), Operator::Equals) => {
                format!("{name} = {}", binder.bind(v.clone()))
            }
            (ConditionValue::Single(v), Operator::NotEquals) => {
                format!("{name} <> {}", binder.bind(v.clone()))
            }
            (ConditionValue::Single(v), Operator::GreaterThan) => {
                format!("{name} > {}", binder.bind(v.clone()))
            }
            (ConditionValue::Single(v), Operator::LessThan) => {
                format!("{name} < {}", binder.bind(v.clone()))
            }
            (ConditionValue::Single(v), Operator::Contains) => {
                format!("contains({name}, {})", binder.bind(v.clone()))
            }
            (ConditionValue::Single(v), Operator::BeginsWith) => {
                format!("begins_with({name}, {})", binder.bind(v.clone()))
            }
            (ConditionValue::Range(start, end), _) => {
                let start = binder.bind(start.clone());
                let end = binder.bind(end.clone());
                format!("{name} BETWEEN {start} AND {end}")
            }
            (ConditionValue::List(values), _) => {
                let placeholders: Vec<String> =
                    values.iter().map(|v| binder.bind(v.clone())).collect();
                format!("{name} IN ({})", placeholders.join(", "))
            }
            // `Condition::new` guarantees operand shape; a hand-built mismatch
            // still renders as the single-value operator it names.
            (ConditionValue::Single(v), Operator::In | Operator::Between) => {
                format!("{name} = {}", binder.bind(v.clone()))
            }
        }
    }
}

/// An append-only, capped list of validated conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ConditionList {
    items: Vec<Condition>,
}

impl ConditionList {
    pub(crate) fn push(&mut self, condition: Condition) -> Result<(), ExpressionError> {
        if self.items.len() >= MAX_CONDITIONS {
            return Err(ExpressionError::TooManyConditions {
                limit: MAX_CONDITIONS,
            });
        }
        self.items.push(condition);
        Ok(())
    }

    pub(crate) fn as_slice(&self) -> &[Condition] {
        &self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

/// Allocates value placeholders from one monotonically increasing counter.
#[derive(Debug, Clone)]
pub(crate) struct ValueBinder {
    prefix: &'static str,
    next: usize,
    values: HashMap<String, AttributeValue>,
}

impl ValueBinder {
    /// Placeholders will be `{prefix}{start}`, `{prefix}{start + 1}`, ….
    pub(crate) fn new(prefix: &'static str, start: usize) -> Self {
        Self {
            prefix,
            next: start,
            values: HashMap::new(),
        }
    }

    /// Reserve the next counter value without binding anything.
    pub(crate) fn tick(&mut self) -> usize {
        let n = self.next;
        self.next += 1;
        n
    }

    pub(crate) fn bind(&mut self, value: AttributeValue) -> String {
        let n = self.tick();
        let placeholder = format!("{}{n}", self.prefix);
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    /// Bind under an explicit placeholder.
    pub(crate) fn bind_as(&mut self, placeholder: String, value: AttributeValue) -> String {
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    pub(crate) fn values(&self) -> &HashMap<String, AttributeValue> {
        &self.values
    }

    pub(crate) fn into_values(self) -> HashMap<String, AttributeValue> {
        self.values
    }
}
