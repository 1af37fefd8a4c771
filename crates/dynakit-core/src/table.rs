//! Table-scoped execution of built expressions.

use dynakit_model::output::{ItemPage, UpdateItemOutput};
use dynakit_model::stream::Item;
use dynakit_model::types::ReturnValue;
use tracing::debug;

use crate::engine::ItemEngine;
use crate::expression::{CompiledExpression, QueryBuilder, ScanBuilder, UpdateOperationBuilder};

/// Binds an [`ItemEngine`] to one table and runs builders against it.
///
/// Builders are compiled before any request is sent, so a validation failure
/// never reaches the engine.
#[derive(Debug, Clone)]
pub struct TableClient<E> {
    engine: E,
    table_name: String,
}

impl<E: ItemEngine> TableClient<E> {
    /// Create a client for `table_name`.
    pub fn new(engine: E, table_name: impl Into<String>) -> Self {
        Self {
            engine,
            table_name: table_name.into(),
        }
    }

    /// The table this client targets.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Compile and run a query.
    pub async fn query(&self, builder: &QueryBuilder) -> crate::Result<ItemPage> {
        let input = builder.build()?.into_input(&self.table_name)?;
        debug!(
            table = %self.table_name,
            key_condition = %input.key_condition_expression,
            "query"
        );
        Ok(self.engine.query(input).await?)
    }

    /// Compile and run a scan.
    pub async fn scan(&self, builder: &ScanBuilder) -> crate::Result<ItemPage> {
        let input = builder.build().into_input(&self.table_name);
        debug!(
            table = %self.table_name,
            filter = ?input.filter_expression,
            segment = ?input.segment,
            "scan"
        );
        Ok(self.engine.scan(input).await?)
    }

    /// Compile and apply an update to the item identified by `key`.
    pub async fn update(
        &self,
        key: Item,
        updates: &UpdateOperationBuilder,
        condition: Option<&CompiledExpression>,
        return_values: Option<ReturnValue>,
    ) -> crate::Result<UpdateItemOutput> {
        let compiled = match condition {
            Some(condition) => updates.compile_with_condition(condition)?,
            None => updates.compile()?,
        };
        let input = compiled.into_input(&self.table_name, key, return_values);
        debug!(
            table = %self.table_name,
            update = %input.update_expression,
            "update item"
        );
        Ok(self.engine.update_item(input).await?)
    }
}
