pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use libris_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use models::{AUTHOR_MAX_LEN, TITLE_MAX_LEN};
use service::BookRecordService;
use store::BookStore;

/// Schema for the `books` table.
///
/// `AUTOINCREMENT` keeps SQLite from handing out the id of a deleted row.
pub const BOOKS_MIGRATIONS: &[Migration] = &[Migration {
    id: "001_create_books",
    up: r#"
        CREATE TABLE books (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            title      TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 80),
            author     TEXT NOT NULL CHECK (length(author) BETWEEN 1 AND 40),
            date_added TEXT NOT NULL
        );
        "#,
}];

/// Book records: create, read, update, delete
pub struct BooksModule {
    service: Arc<BookRecordService>,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self {
            service: Arc::new(BookRecordService::new(store)),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Book" }
                    }
                }
            })
        };
        let book_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/BookInput" }
                }
            }
        });
        let id_param = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        }]);

        Some(json!({
            "paths": {
                "/books/": {
                    "post": {
                        "summary": "Add a new book",
                        "tags": ["Books"],
                        "requestBody": book_body,
                        "responses": {
                            "201": book_response("Book created"),
                            "400": error_response("Missing or invalid fields"),
                            "500": error_response("Internal server error")
                        }
                    }
                },
                "/books/{id}": {
                    "parameters": id_param,
                    "get": {
                        "summary": "Fetch a book by its id",
                        "tags": ["Books"],
                        "responses": {
                            "200": book_response("The book"),
                            "404": error_response("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Update a book",
                        "tags": ["Books"],
                        "requestBody": book_body,
                        "responses": {
                            "200": book_response("The updated book"),
                            "400": error_response("Missing or invalid fields"),
                            "404": error_response("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "responses": {
                            "204": { "description": "Book deleted" },
                            "404": error_response("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "integer",
                                "format": "int64",
                                "description": "Unique identifier for the book"
                            },
                            "title": {
                                "type": "string",
                                "maxLength": TITLE_MAX_LEN,
                                "description": "The book title"
                            },
                            "author": {
                                "type": "string",
                                "maxLength": AUTHOR_MAX_LEN,
                                "description": "The book author"
                            },
                            "date_added": {
                                "type": "string",
                                "format": "date-time",
                                "description": "When the book was added"
                            }
                        },
                        "required": ["id", "title", "author", "date_added"]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": {
                            "title": {
                                "type": "string",
                                "minLength": 1,
                                "maxLength": TITLE_MAX_LEN,
                                "description": "The book title"
                            },
                            "author": {
                                "type": "string",
                                "minLength": 1,
                                "maxLength": AUTHOR_MAX_LEN,
                                "description": "The book author"
                            }
                        },
                        "required": ["title", "author"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        BOOKS_MIGRATIONS.to_vec()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module over the given store
pub fn create_module(store: Arc<dyn BookStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
