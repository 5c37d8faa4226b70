//! MySQL dialect

use crate::backends::DatabaseBackendType;
use crate::migrations::definitions::{ColumnDefinition, CreateTable, DefaultValue, DropTable};
use super::{IndexDrop, SqlDialect};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    fn quote_text(value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }
}

impl SqlDialect for MySqlDialect {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::MySQL
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn map_column_type(&self, logical_type: &str) -> String {
        match logical_type.to_lowercase().as_str() {
            "int" => "INT".to_string(),
            "varchar" | "varchar(255)" => "VARCHAR(255)".to_string(),
            "varchar(100)" => "VARCHAR(100)".to_string(),
            "smallint" => "SMALLINT".to_string(),
            "timestamp" => "TIMESTAMP".to_string(),
            "date" => "DATE".to_string(),
            _ => logical_type.to_string(),
        }
    }

    fn format_default(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
            DefaultValue::OnUpdateTimestamp => "CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP".to_string(),
            DefaultValue::Text(s) => Self::quote_text(s),
            DefaultValue::Number(n) => n.to_string(),
            DefaultValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        }
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn begin_keyword(&self) -> &'static str {
        "START TRANSACTION"
    }

    fn auto_increment_clause(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    fn column_definition(&self, column: &ColumnDefinition) -> String {
        let mut def = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.map_column_type(&column.column_type)
        );

        // UNSIGNED is a type attribute and must follow the type directly
        if column.unsigned {
            def.push_str(" UNSIGNED");
        }
        if column.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if column.auto_increment {
            def.push(' ');
            def.push_str(self.auto_increment_clause());
        }
        if column.unique {
            def.push_str(" UNIQUE");
        }
        if column.is_not_null() {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            def.push_str(&format!(" DEFAULT {}", self.format_default(default)));
        }

        def
    }

    fn table_options(&self, op: &CreateTable) -> Option<String> {
        let mut options = Vec::new();
        if let Some(engine) = op.engine.as_deref().filter(|e| !e.is_empty()) {
            options.push(format!("ENGINE={}", engine));
        }
        if let Some(charset) = op.charset.as_deref().filter(|c| !c.is_empty()) {
            options.push(format!("DEFAULT CHARSET={}", charset));
        }

        if options.is_empty() {
            None
        } else {
            Some(options.join(" "))
        }
    }

    fn modify_column_clause(&self, column: &ColumnDefinition) -> String {
        format!("MODIFY COLUMN {}", self.column_definition(column))
    }

    fn drop_foreign_key_clause(&self, name: &str) -> String {
        format!("DROP FOREIGN KEY {}", self.quote_identifier(name))
    }

    fn drop_index(&self, _table: &str, name: &str) -> IndexDrop {
        IndexDrop::InAlter(format!("DROP INDEX {}", self.quote_identifier(name)))
    }

    fn drop_table(&self, op: &DropTable) -> String {
        let mut sql = "DROP TABLE".to_string();
        if op.drop_if_exists {
            sql.push_str(" IF EXISTS");
        }
        sql.push(' ');
        sql.push_str(&self.quote_identifier(&op.table));
        if op.ignore_foreign_and_cascade {
            sql.push_str(" CASCADE");
        }
        sql.push(';');
        sql
    }

    fn insert_default_values(&self, table: &str) -> String {
        format!("INSERT INTO {} () VALUES ()", self.quote_identifier(table))
    }

    fn random_row_query(&self, table: &str, column: &str) -> String {
        format!(
            "SELECT {} FROM {} ORDER BY RAND() LIMIT 1",
            self.quote_identifier(column),
            self.quote_identifier(table)
        )
    }

    fn ledger_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                id INT AUTO_INCREMENT PRIMARY KEY, \
                migration VARCHAR(255) NOT NULL, \
                batch INT DEFAULT 1 NOT NULL, \
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\
            )",
            table
        )
    }

    fn ledger_batch_column_sql(&self, table: &str) -> String {
        format!("SHOW COLUMNS FROM {} LIKE 'batch'", table)
    }
}
