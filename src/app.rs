//! Application wiring: database, module registry, HTTP server.

use anyhow::Context;
use axum::Router;
use libris_db::Database;
use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// Connected database plus the initialized, migrated module registry
pub struct App {
    pub db: Database,
    pub registry: ModuleRegistry,
}

impl App {
    /// Connect, register modules, initialize them and apply pending migrations
    pub async fn bootstrap(settings: &Settings) -> anyhow::Result<Self> {
        let db = Database::connect(&settings.database)
            .await
            .context("failed to open database")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &db);

        registry.init_all(&InitCtx { settings }).await?;

        let applied = db
            .run_migrations(&registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, "database schema up to date");

        Ok(Self { db, registry })
    }

    pub fn router(&self, settings: &Settings) -> Router {
        libris_http::build_router(&self.registry, settings)
    }
}

/// Apply pending migrations and exit. Returns the number applied.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = Database::connect(&settings.database)
        .await
        .context("failed to open database")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &db);

    let applied = db
        .run_migrations(&registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    db.close().await;

    Ok(applied)
}

/// Run the HTTP service until a shutdown signal arrives
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let app = App::bootstrap(settings).await?;
    let ctx = InitCtx { settings };

    app.registry.start_all(&ctx).await?;

    let served =
        libris_http::start_server(&app.registry, settings, libris_http::shutdown_signal()).await;

    app.registry.stop_all().await?;
    app.db.close().await;

    tracing::info!("libris-app shut down");
    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use libris_kernel::settings::DatabaseSettings;
    use tower::ServiceExt;

    fn memory_settings() -> Settings {
        Settings {
            database: DatabaseSettings {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn bootstrapped_app_serves_books_from_sqlite() {
        let settings = memory_settings();
        let app = App::bootstrap(&settings).await.unwrap();
        let router = app.router(&settings);

        let created = router
            .clone()
            .oneshot(
                Request::post("/books/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"title": "Dune", "author": "Frank Herbert"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let fetched = router
            .clone()
            .oneshot(Request::get("/books/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
        let bytes = to_bytes(fetched.into_body(), usize::MAX).await.unwrap();
        let book: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(book["title"], "Dune");

        let docs = router
            .oneshot(
                Request::get("/docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = to_bytes(docs.into_body(), usize::MAX).await.unwrap();
        let spec: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(spec["paths"]["/books/{id}"]["delete"].is_object());
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            database: DatabaseSettings {
                url: format!("sqlite://{}", dir.path().join("libris.db").display()),
                max_connections: 2,
            },
            ..Settings::default()
        };

        assert_eq!(migrate(&settings).await.unwrap(), 1);
        assert_eq!(migrate(&settings).await.unwrap(), 0);
    }
}
