mod database;
mod jobboard_schema;
mod versioned_schema;

pub use database::{
    is_unique_violation, lock_conn, open_database, open_in_memory_database, parse_text_column,
    row_id, SharedConnection,
};
pub use jobboard_schema::VERSIONED_SCHEMAS;
pub use versioned_schema::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};
