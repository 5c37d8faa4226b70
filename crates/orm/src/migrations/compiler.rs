//! Schema Compiler - Turns change operations into dialect SQL
//!
//! Compilation is all-or-nothing: every operation of a document is validated
//! before any statement is built, and the result is one transaction-wrapped
//! [`SqlScript`].

use std::sync::Arc;

use crate::dialect::{IndexDrop, SqlDialect, SqlScript};
use crate::error::{OrmError, OrmResult};
use super::definitions::{AlterTable, ChangeOperation, ColumnDefinition, CreateTable, DropTable, ForeignKeyDefinition, MigrationDirection, MigrationDocument};

/// Compiles migration documents for one dialect
#[derive(Debug, Clone)]
pub struct SchemaCompiler {
    dialect: Arc<dyn SqlDialect>,
}

impl SchemaCompiler {
    pub fn new(dialect: Arc<dyn SqlDialect>) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &Arc<dyn SqlDialect> {
        &self.dialect
    }

    /// Compile the forward section, or the `rollback` section when `rollback` is set
    pub fn compile_schema(&self, document: &MigrationDocument, rollback: bool) -> OrmResult<SqlScript> {
        let direction = if rollback { MigrationDirection::Down } else { MigrationDirection::Up };
        self.compile(document.operations(direction)?)
    }

    /// Compile a list of operations into one transaction-wrapped script
    pub fn compile(&self, operations: &[ChangeOperation]) -> OrmResult<SqlScript> {
        validate_operations(operations)?;

        let mut statements = Vec::new();
        for operation in operations {
            match operation {
                ChangeOperation::Create(op) => statements.extend(self.create_table(op)),
                ChangeOperation::Alter(op) => statements.extend(self.alter_table(op)),
                ChangeOperation::Drop(op) => statements.push(self.drop_table(op)),
            }
        }

        Ok(self.dialect.transaction_wrap(statements))
    }

    fn create_table(&self, op: &CreateTable) -> Vec<String> {
        let d = &self.dialect;

        let mut definitions: Vec<String> = op.columns.iter().map(|c| d.column_definition(c)).collect();
        definitions.extend(op.foreign_keys.iter().map(|fk| d.foreign_key_clause(fk)));

        let mut table_sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            d.quote_identifier(&op.table),
            definitions.join(", ")
        );
        if let Some(options) = d.table_options(op) {
            table_sql.push(' ');
            table_sql.push_str(&options);
        }
        table_sql.push(';');

        let mut statements = vec![table_sql];
        statements.extend(op.indexes.iter().map(|index| d.create_index(&op.table, index)));
        statements
    }

    fn alter_table(&self, op: &AlterTable) -> Vec<String> {
        let d = &self.dialect;
        let changes = &op.changes;

        let mut clauses = Vec::new();
        let mut standalone = Vec::new();

        clauses.extend(changes.add.iter().map(|c| d.add_column_clause(c)));
        clauses.extend(changes.modify.iter().map(|c| d.modify_column_clause(c)));
        clauses.extend(changes.drop.iter().map(|c| d.drop_column_clause(c)));
        clauses.extend(changes.add_foreign_keys.iter().map(|fk| d.add_foreign_key_clause(fk)));
        clauses.extend(changes.drop_foreign_keys.iter().map(|fk| d.drop_foreign_key_clause(fk)));

        for index in &changes.drop_index {
            match d.drop_index(&op.table, index) {
                IndexDrop::InAlter(clause) => clauses.push(clause),
                IndexDrop::Standalone(statement) => standalone.push(statement),
            }
        }

        let mut statements = Vec::new();
        if clauses.is_empty() {
            tracing::debug!(target: "tabula::migrate", "No column changes for table '{}'", op.table);
        } else {
            statements.push(format!(
                "ALTER TABLE {} {};",
                d.quote_identifier(&op.table),
                clauses.join(", ")
            ));
        }
        statements.extend(standalone);
        statements
    }

    fn drop_table(&self, op: &DropTable) -> String {
        self.dialect.drop_table(op)
    }
}

/// Reject a document before any SQL is produced
pub fn validate_operations(operations: &[ChangeOperation]) -> OrmResult<()> {
    for (position, operation) in operations.iter().enumerate() {
        let invalid = |reason: String| {
            OrmError::InvalidDocument(format!(
                "operation #{} ({} '{}'): {}",
                position + 1,
                operation.action(),
                operation.table(),
                reason
            ))
        };

        if operation.table().trim().is_empty() {
            return Err(invalid("`table` must not be empty".to_string()));
        }

        match operation {
            ChangeOperation::Create(op) => {
                if op.columns.is_empty() {
                    return Err(invalid("create requires at least one column".to_string()));
                }
                op.columns.iter().try_for_each(validate_column).map_err(invalid)?;
                op.foreign_keys.iter().try_for_each(validate_foreign_key).map_err(invalid)?;
                for index in &op.indexes {
                    if index.columns.is_empty() {
                        return Err(invalid("index requires at least one column".to_string()));
                    }
                }
            }
            ChangeOperation::Alter(op) => {
                let changes = &op.changes;
                changes.add.iter().chain(&changes.modify).try_for_each(validate_column).map_err(invalid)?;
                changes.add_foreign_keys.iter().try_for_each(validate_foreign_key).map_err(invalid)?;
                let names = changes.drop.iter().chain(&changes.drop_foreign_keys).chain(&changes.drop_index);
                if names.into_iter().any(|name| name.trim().is_empty()) {
                    return Err(invalid("dropped names must not be empty".to_string()));
                }
            }
            ChangeOperation::Drop(_) => {}
        }
    }

    Ok(())
}

fn validate_column(column: &ColumnDefinition) -> Result<(), String> {
    if column.name.trim().is_empty() {
        return Err("column `name` must not be empty".to_string());
    }
    if column.column_type.trim().is_empty() {
        return Err(format!("column '{}' has no `type`", column.name));
    }
    Ok(())
}

fn validate_foreign_key(fk: &ForeignKeyDefinition) -> Result<(), String> {
    let fields = [&fk.name, &fk.column, &fk.reference_table, &fk.reference_column];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(format!("foreign key '{}' has empty fields", fk.name));
    }
    Ok(())
}
