//! Brings the assessment database schema up to date.
//!
//! The embedded migrations create `users`, the `faculties` > `departments` >
//! `majors` catalog, `students` (one per NPM and one per user) and the
//! `registry_institutions` mirror used to place registry students. Each
//! catalog table is seeded with an id 1 `unknown` row, which is where students
//! land when the registry has nothing to say about them. After migrating, the
//! runner checks those rows are present.
//!
//! ```text
//! cargo run -p assessment-api --bin migrate            # DATABASE_URL
//! cargo run -p assessment-api --bin migrate -- --test  # DATABASE_URL with a _test database
//! ```

use std::error::Error;
use std::path::Path;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assessment_api::db::schema::{departments, faculties, majors};
use assessment_api::models::catalog::DEFAULT_CATALOG_ID;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

type BoxError = Box<dyn Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path(Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"));
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "migrate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let test_run = std::env::args().skip(1).any(|arg| arg == "--test");
    let database_url = if test_run {
        test_database_url(&database_url)
    } else {
        database_url
    };

    let mut conn = PgConnection::establish(&database_url)?;

    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    if applied.is_empty() {
        tracing::info!("assessment schema already up to date");
    }
    for version in &applied {
        tracing::info!(%version, "applied migration");
    }
    let applied = applied.len();

    ensure_default_catalog(&mut conn)?;
    tracing::info!(applied, test_run, "migrations complete");
    Ok(())
}

/// Fail unless every catalog table still has its `unknown` placement row.
fn ensure_default_catalog(conn: &mut PgConnection) -> Result<(), BoxError> {
    let present = [
        (
            "faculties",
            faculties::table.find(DEFAULT_CATALOG_ID).count().get_result::<i64>(conn)?,
        ),
        (
            "departments",
            departments::table.find(DEFAULT_CATALOG_ID).count().get_result::<i64>(conn)?,
        ),
        (
            "majors",
            majors::table.find(DEFAULT_CATALOG_ID).count().get_result::<i64>(conn)?,
        ),
    ];

    match present.iter().find(|(_, rows)| *rows == 0) {
        Some((table, _)) => Err(format!("{table} is missing its default catalog row").into()),
        None => Ok(()),
    }
}

/// Point `database_url` at `<name>_test`, leaving query parameters in place.
fn test_database_url(database_url: &str) -> String {
    let (base, query) = match database_url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (database_url, None),
    };
    let Some((server, name)) = base.rsplit_once('/') else {
        return database_url.to_string();
    };
    if name.is_empty() || name.ends_with("_test") {
        return database_url.to_string();
    }

    match query {
        Some(query) => format!("{server}/{name}_test?{query}"),
        None => format!("{server}/{name}_test"),
    }
}
