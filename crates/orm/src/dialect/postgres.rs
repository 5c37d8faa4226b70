//! PostgreSQL dialect

use crate::backends::DatabaseBackendType;
use crate::migrations::definitions::{ColumnDefinition, DefaultValue, DropTable};
use super::{quote_literal, IndexDrop, SqlDialect};

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::PostgreSQL
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn map_column_type(&self, logical_type: &str) -> String {
        match logical_type.to_lowercase().as_str() {
            "int" => "INTEGER".to_string(),
            "varchar" => "VARCHAR".to_string(),
            "varchar(255)" => "VARCHAR(255)".to_string(),
            "varchar(100)" => "VARCHAR(100)".to_string(),
            "smallint" => "SMALLINT".to_string(),
            "timestamp" => "TIMESTAMP".to_string(),
            "date" => "DATE".to_string(),
            _ => logical_type.to_string(),
        }
    }

    fn format_default(&self, value: &DefaultValue) -> String {
        match value {
            // PostgreSQL has no ON UPDATE clause for defaults
            DefaultValue::CurrentTimestamp | DefaultValue::OnUpdateTimestamp => "CURRENT_TIMESTAMP".to_string(),
            DefaultValue::Text(s) => quote_literal(s),
            DefaultValue::Number(n) => n.to_string(),
            DefaultValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    // a bound TEXT parameter is not implicitly cast to date or numeric columns
    fn untyped_literal(&self, text: &str) -> Option<String> {
        Some(quote_literal(text))
    }

    fn begin_keyword(&self) -> &'static str {
        "BEGIN"
    }

    fn auto_increment_clause(&self) -> &'static str {
        "GENERATED ALWAYS AS IDENTITY"
    }

    fn column_definition(&self, column: &ColumnDefinition) -> String {
        let mut def = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.map_column_type(&column.column_type)
        );

        if column.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        // an identity column cannot also carry a default
        if column.auto_increment {
            def.push(' ');
            def.push_str(self.auto_increment_clause());
        } else if let Some(default) = &column.default {
            def.push_str(&format!(" DEFAULT {}", self.format_default(default)));
        }
        if column.unique {
            def.push_str(" UNIQUE");
        }
        if column.is_not_null() {
            def.push_str(" NOT NULL");
        }

        def
    }

    fn modify_column_clause(&self, column: &ColumnDefinition) -> String {
        let name = self.quote_identifier(&column.name);
        let mut clauses = vec![format!(
            "ALTER COLUMN {} TYPE {}",
            name,
            self.map_column_type(&column.column_type)
        )];

        match column.nullable {
            Some(false) => clauses.push(format!("ALTER COLUMN {} SET NOT NULL", name)),
            Some(true) => clauses.push(format!("ALTER COLUMN {} DROP NOT NULL", name)),
            None => {}
        }
        if let Some(default) = &column.default {
            clauses.push(format!("ALTER COLUMN {} SET DEFAULT {}", name, self.format_default(default)));
        }

        clauses.join(", ")
    }

    fn drop_foreign_key_clause(&self, name: &str) -> String {
        format!("DROP CONSTRAINT {}", self.quote_identifier(name))
    }

    fn drop_index(&self, _table: &str, name: &str) -> IndexDrop {
        IndexDrop::Standalone(format!("DROP INDEX IF EXISTS {};", self.quote_identifier(name)))
    }

    fn drop_table(&self, op: &DropTable) -> String {
        let mut sql = "DROP TABLE".to_string();
        // IF EXISTS is added when dropIfExists is false on this backend
        if !op.drop_if_exists {
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

    fn random_row_query(&self, table: &str, column: &str) -> String {
        format!(
            "SELECT {} FROM {} ORDER BY random() LIMIT 1",
            self.quote_identifier(column),
            self.quote_identifier(table)
        )
    }

    fn ledger_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                id SERIAL PRIMARY KEY, \
                migration VARCHAR(255) NOT NULL, \
                batch INT DEFAULT 1 NOT NULL, \
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\
            )",
            table
        )
    }

    fn ledger_batch_column_sql(&self, table: &str) -> String {
        format!(
            "SELECT column_name FROM information_schema.columns WHERE table_name = {} AND column_name = 'batch'",
            quote_literal(table)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::definitions::{ForeignKeyDefinition, IndexDefinition, ReferentialAction};

    #[test]
    fn test_type_mapping() {
        let d = PostgresDialect;
        assert_eq!(d.map_column_type("int"), "INTEGER");
        assert_eq!(d.map_column_type("varchar"), "VARCHAR");
        assert_eq!(d.map_column_type("jsonb"), "jsonb");
        assert_eq!(d.map_column_type("NUMERIC(10,2)"), "NUMERIC(10,2)");
    }

    #[test]
    fn test_untyped_text_is_inlined() {
        assert_eq!(PostgresDialect.untyped_literal("2024-01-01"), Some("'2024-01-01'".to_string()));
        assert_eq!(PostgresDialect.untyped_literal("O'Hara"), Some("'O''Hara'".to_string()));
    }

    #[test]
    fn test_identity_column_skips_default() {
        let mut column = ColumnDefinition::new("id", "int");
        column.primary_key = true;
        column.auto_increment = true;
        column.default = Some(DefaultValue::Number(1.into()));

        assert_eq!(
            PostgresDialect.column_definition(&column),
            "\"id\" INTEGER PRIMARY KEY GENERATED ALWAYS AS IDENTITY"
        );
    }

    #[test]
    fn test_column_clause_order() {
        let mut column = ColumnDefinition::new("email", "varchar(255)");
        column.unique = true;
        column.nullable = Some(false);
        column.default = Some(DefaultValue::Text("none".to_string()));
        column.unsigned = true;

        assert_eq!(
            PostgresDialect.column_definition(&column),
            "\"email\" VARCHAR(255) DEFAULT 'none' UNIQUE NOT NULL"
        );
    }

    #[test]
    fn test_timestamp_markers() {
        let d = PostgresDialect;
        assert_eq!(d.format_default(&DefaultValue::CurrentTimestamp), "CURRENT_TIMESTAMP");
        assert_eq!(d.format_default(&DefaultValue::OnUpdateTimestamp), "CURRENT_TIMESTAMP");
    }

    #[test]
    fn test_foreign_key_with_actions() {
        let fk = ForeignKeyDefinition {
            name: "fk_posts_user".to_string(),
            column: "user_id".to_string(),
            reference_table: "users".to_string(),
            reference_column: "id".to_string(),
            on_delete: Some(ReferentialAction::Cascade),
            on_update: None,
        };

        assert_eq!(
            PostgresDialect.foreign_key_clause(&fk),
            "CONSTRAINT \"fk_posts_user\" FOREIGN KEY (\"user_id\") REFERENCES \"users\" (\"id\") ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_drop_table_if_exists_is_inverted() {
        let d = PostgresDialect;
        let mut op = DropTable {
            table: "users".to_string(),
            drop_if_exists: false,
            ignore_foreign_and_cascade: true,
        };
        assert_eq!(d.drop_table(&op), "DROP TABLE IF EXISTS \"users\" CASCADE;");

        op.drop_if_exists = true;
        op.ignore_foreign_and_cascade = false;
        assert_eq!(d.drop_table(&op), "DROP TABLE \"users\";");
    }

    #[test]
    fn test_index_and_placeholders() {
        let d = PostgresDialect;
        let index = IndexDefinition {
            name: Some("users_email_unique".to_string()),
            columns: vec!["email".to_string()],
            unique: true,
        };

        assert_eq!(
            d.create_index("users", &index),
            "CREATE UNIQUE INDEX \"users_email_unique\" ON \"users\" (\"email\");"
        );
        assert_eq!(d.placeholder(1), "$1");
        assert_eq!(d.placeholder(12), "$12");
        assert_eq!(
            d.drop_index("users", "users_email_unique"),
            IndexDrop::Standalone("DROP INDEX IF EXISTS \"users_email_unique\";".to_string())
        );
    }

    #[test]
    fn test_random_row_query() {
        assert_eq!(
            PostgresDialect.random_row_query("users", "id"),
            "SELECT \"id\" FROM \"users\" ORDER BY random() LIMIT 1"
        );
    }
}
