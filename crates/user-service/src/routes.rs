//! 路由配置

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// 用户 REST 路由，挂载在 `/api/v1` 下
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::create_user))
        .route("/users/{id}", get(handlers::get_user))
}

/// 业务路由与存活探针
///
/// 就绪探针依赖数据库连接，由 `main` 追加。
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/health", get(handlers::health_check))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use cloudnative_shared::kafka::topics;
    use cloudnative_shared::test_utils::RecordingPublisher;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::service::UserService;
    use crate::testing::InMemoryUserRepository;

    fn app() -> (Router, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            publisher.clone(),
        );
        let app = router().with_state(AppState::new(Arc::new(service)));
        (app, publisher)
    }

    fn post_user(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/users")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_user() {
        let (app, publisher) = app();

        let response = app
            .clone()
            .oneshot(post_user(json!({"name": "Alice", "email": "alice@example.com"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["code"], "SUCCESS");
        assert_eq!(body["data"]["email"], "alice@example.com");
        let id = body["data"]["id"].as_i64().unwrap();

        let response = app
            .oneshot(get_request(&format!("/api/v1/users/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["name"], "Alice");
        assert!(body["data"]["createdAt"].is_string());

        assert_eq!(publisher.count(topics::USER_EVENTS), 1);
    }

    #[tokio::test]
    async fn test_create_invalid_user_returns_400() {
        let (app, publisher) = app();

        let response = app
            .oneshot(post_user(json!({"name": "", "email": "nope"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("name"));
        assert!(message.contains("email"));
        assert!(publisher.messages().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_returns_envelope() {
        let (app, _) = app();

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/users")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_duplicate_email_returns_409() {
        let (app, _) = app();
        let body = json!({"name": "Alice", "email": "alice@example.com"});

        app.clone().oneshot(post_user(body.clone())).await.unwrap();
        let response = app.oneshot(post_user(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["code"], "EMAIL_ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn test_unknown_user_returns_404() {
        let (app, _) = app();

        let response = app.oneshot(get_request("/api/v1/users/999")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "USER_NOT_FOUND");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_non_numeric_id_returns_400() {
        let (app, _) = app();

        let response = app.oneshot(get_request("/api/v1/users/abc")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();

        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }
}
