//! PostgreSQL dialect: key-expression translation and statement generation.

mod keyexpr;
mod statements;

pub use keyexpr::translate_key;
pub use statements::{
    create_index_sql, create_table_sql, insert_sql, render_statement, truncate_sql,
};
