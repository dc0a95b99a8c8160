pub mod sqlite_pool;

pub use sqlite_pool::{
    check_db_health, create_db_pool, mask_database_path, DatabaseConfig, DbConnection, DbPool,
    MIGRATIONS,
};
