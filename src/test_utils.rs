#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use crate::auth::hash_password;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::Router;
    use chrono::Utc;
    use compute::Settings;
    use migration::{Migrator, MigratorTrait};
    use model::entities::{ingredient, tag, user};
    use moka::future::Cache;
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    pub const TEST_PASSWORD: &str = "correct-horse-battery";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Create AppState for testing, with a small catalog already loaded
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;

        for (name, color, slug) in [
            ("Breakfast", "#E26C2D", "breakfast"),
            ("Lunch", "#49B64E", "lunch"),
            ("Dinner", "#8775D2", "dinner"),
        ] {
            tag::ActiveModel {
                name: Set(name.to_string()),
                color: Set(color.to_string()),
                slug: Set(slug.to_string()),
                ..Default::default()
            }
            .insert(&db)
            .await
            .expect("Failed to create test tag");
        }

        for (name, unit) in [("salt", "g"), ("sugar", "g"), ("milk", "ml"), ("egg", "pcs")] {
            ingredient::ActiveModel {
                name: Set(name.to_string()),
                measurement_unit: Set(unit.to_string()),
                ..Default::default()
            }
            .insert(&db)
            .await
            .expect("Failed to create test ingredient");
        }

        AppState {
            db,
            cache: Cache::new(100),
            settings: Arc::new(Settings::default()),
        }
    }

    /// Insert a user directly, bypassing the registration endpoint
    pub async fn create_test_user(
        db: &DatabaseConnection,
        username: &str,
        is_admin: bool,
    ) -> user::Model {
        user::ActiveModel {
            email: Set(format!("{}@example.com", username)),
            username: Set(username.to_string()),
            first_name: Set("Test".to_string()),
            last_name: Set("User".to_string()),
            password_hash: Set(hash_password(TEST_PASSWORD).expect("Failed to hash password")),
            is_admin: Set(is_admin),
            date_joined: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test user")
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level comes from RUST_LOG and defaults to WARN.
    pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        create_router(setup_test_app_state().await)
    }
}
