//! Expression compilation.
//!
//! Builders turn typed conditions and updates into the expression strings and
//! placeholder maps that DynamoDB requests carry:
//!
//! - [`QueryBuilder`] compiles a key condition plus an optional filter.
//! - [`ScanBuilder`] compiles a filter from structured and hand-written parts.
//! - [`UpdateOperationBuilder`] compiles one combined update expression.
//!
//! Attribute names that collide with the reserved vocabulary are escaped by
//! [`ExpressionAttributeResolver`].

/// Generates the single-operand condition methods shared by both builders.
macro_rules! single_value_condition {
    ($(#[$doc:meta] $name:ident => $op:ident),+ $(,)?) => {
        $(
            #[$doc]
            pub fn $name(
                self,
                field: &str,
                value: impl Into<AttributeValue>,
            ) -> Result<Self, ExpressionError> {
                self.push(field, Operator::$op, ConditionValue::Single(value.into()))
            }
        )+
    };
}

mod compiled;
mod condition;
mod lexer;
mod query;
pub mod reserved;
mod resolver;
mod scan;
mod update;
pub mod validation;

pub use compiled::CompiledExpression;
pub use condition::{Condition, ConditionValue, Operator};
pub use query::{QueryBuilder, QueryOptions};
pub use reserved::is_reserved;
pub use resolver::{ExpressionAttributeResolver, ResolverConfig};
pub use scan::{ScanBuilder, ScanOptions};
pub use update::{CompiledUpdate, FieldUpdate, UpdateOperation, UpdateOperationBuilder, UpdateValue};
pub use validation::ExpressionError;
