//! HTTP handlers for the books module.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use libris_http::AppError;
use serde_json::Value;

use super::models::Book;
use super::service::BookRecordService;

type ServiceState = State<Arc<BookRecordService>>;

/// Routes served by the books module
pub fn router(service: Arc<BookRecordService>) -> Router {
    Router::new()
        .route("/books", post(create_book))
        .route("/books/", post(create_book))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(service)
}

/// Ids that do not parse as integers name no record
fn book_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        tracing::debug!(error = %rejection, "unparseable book id");
        AppError::not_found("book not found")
    })
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

async fn create_book(
    State(service): ServiceState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let payload = json_body(payload)?;
    let book = service.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book(
    State(service): ServiceState,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(id)?;
    Ok(Json(service.get(id).await?))
}

async fn update_book(
    State(service): ServiceState,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(id)?;
    let payload = json_body(payload)?;
    Ok(Json(service.update(id, &payload).await?))
}

async fn delete_book(
    State(service): ServiceState,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = book_id(id)?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::store::MemoryBookStore;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        response::Response,
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(BookRecordService::new(Arc::new(
            MemoryBookStore::new(),
        ))))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_returns_created_record() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/books/",
                json!({"title": "Dune", "author": "Frank Herbert"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["title"], "Dune");
        assert_eq!(body["author"], "Frank Herbert");
        assert!(body["date_added"].is_string());
    }

    #[tokio::test]
    async fn create_without_trailing_slash() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/books",
                json!({"title": "Dune", "author": "Frank Herbert"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn create_with_missing_field_is_bad_request() {
        let response = app()
            .oneshot(json_request("POST", "/books/", json!({"title": "Dune"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(
            body["error"]["details"],
            json!([{"field": "author", "error": "required"}])
        );
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/books/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": "))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn non_integer_id_is_not_found() {
        let response = app()
            .oneshot(empty_request("GET", "/books/dune"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let response = app()
            .oneshot(json_request(
                "PUT",
                "/books/9",
                json!({"title": "Dune", "author": "Frank Herbert"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn update_missing_with_invalid_body_is_not_found() {
        let response = app()
            .oneshot(json_request("PUT", "/books/99", json!({"title": "x"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let app = app();

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/books/",
                json!({"title": "Dune", "author": "Frank Herbert"}),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = body_json(created).await;

        let fetched = app
            .clone()
            .oneshot(empty_request("GET", "/books/1"))
            .await
            .unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
        assert_eq!(body_json(fetched).await, created);

        let updated = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/books/1",
                json!({"title": "Dune Messiah", "author": "Frank Herbert"}),
            ))
            .await
            .unwrap();
        assert_eq!(updated.status(), StatusCode::OK);
        let updated = body_json(updated).await;
        assert_eq!(updated["id"], 1);
        assert_eq!(updated["title"], "Dune Messiah");
        assert_eq!(updated["date_added"], created["date_added"]);

        let deleted = app
            .clone()
            .oneshot(empty_request("DELETE", "/books/1"))
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        let bytes = to_bytes(deleted.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());

        let gone = app
            .clone()
            .oneshot(empty_request("GET", "/books/1"))
            .await
            .unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);

        let deleted_again = app
            .oneshot(empty_request("DELETE", "/books/1"))
            .await
            .unwrap();
        assert_eq!(deleted_again.status(), StatusCode::NOT_FOUND);
    }
}
