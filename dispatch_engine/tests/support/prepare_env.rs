use dispatch_engine::{DispatchDatabase, SqliteDatabase};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub fn random_db_path() -> String {
    format!("sqlite://{}/mdg_it_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

/// A fresh, migrated database at `url`.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("🚀️ Database {url} was not dropped: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    debug!("🚀️ Created database: {url}");
    db
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.pool().close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Failed to drop database {url}: {e}");
    }
}
