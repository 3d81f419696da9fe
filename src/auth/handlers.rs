use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{SignUpRequest, UserResponse},
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<UserResponse>), AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection, "sign-up body rejected");
        AppError::MalformedBody(rejection.body_text())
    })?;

    let signed_up = services::sign_up(state.users.as_ref(), &state.keys, payload).await?;

    let mut headers = HeaderMap::new();
    state
        .cookie
        .set(&mut headers, &signed_up.token)
        .context("build session cookie")?;

    info!(user_id = %signed_up.user.id, email = %signed_up.user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(UserResponse::from(signed_up.user)),
    ))
}

/// Placeholder until credential verification lands.
#[instrument]
pub async fn sign_in() -> AppError {
    info!("sign-in requested but not implemented");
    AppError::NotImplemented("sign-in")
}

/// Placeholder that still drops the session cookie.
#[instrument(skip(state))]
pub async fn sign_out(State(state): State<AppState>) -> impl IntoResponse {
    info!(cookie = state.cookie.name(), "sign-out requested but not implemented");
    let mut headers = HeaderMap::new();
    if let Err(e) = state.cookie.clear(&mut headers) {
        error!(error = %e, "failed to build clearing cookie");
    }
    (headers, AppError::NotImplemented("sign-out"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{CONTENT_TYPE, SET_COOKIE},
            Request,
        },
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        app::build_app,
        auth::{
            jwt::TOKEN_TTL,
            password::verify_password,
            repo::memory::MemoryUserStore,
        },
        config::{AppConfig, Environment},
    };

    fn app_with(store: Arc<MemoryUserStore>, env: Environment) -> (Router, AppState) {
        let state = AppState::from_parts(store, Arc::new(AppConfig::for_tests(env)));
        (build_app(state.clone()), state)
    }

    async fn post_json(app: Router, uri: &str, body: String) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn json_body(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn cookie_value(res: &axum::response::Response) -> String {
        res.headers()
            .get(SET_COOKIE)
            .expect("set-cookie present")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn sign_up_returns_created_user_and_sets_cookie() {
        let store = Arc::new(MemoryUserStore::default());
        let (app, state) = app_with(store.clone(), Environment::Development);

        let res = post_json(
            app,
            "/api/auth/sign-up",
            json!({ "name": "Ada", "email": "Ada@Example.com", "password": "analytical-engine" })
                .to_string(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let cookie = cookie_value(&res);
        assert!(cookie.starts_with(&format!("{}=", state.cookie.name())));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(!cookie.contains("Secure"));

        let body = json_body(res).await;
        assert_eq!(body["name"], "Ada");
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["role"], "user");
        assert!(body["id"].is_string());
        assert!(body["createdAt"].is_string());
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("password_hash").is_none());

        let stored = store.get("ada@example.com").expect("persisted");
        assert_ne!(stored.password_hash, "analytical-engine");
        assert!(verify_password("analytical-engine", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn cookie_expires_long_before_embedded_token() {
        let store = Arc::new(MemoryUserStore::default());
        let (app, state) = app_with(store, Environment::Development);

        let res = post_json(
            app,
            "/api/auth/sign-up",
            json!({ "name": "Ada", "email": "ada@example.com", "password": "analytical-engine" })
                .to_string(),
        )
        .await;
        let cookie = cookie_value(&res);
        assert!(cookie.contains("Max-Age=900"));

        let token = cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, v)| v.to_string())
            .unwrap();
        let claims = state.keys.verify(&token).expect("token valid");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL.whole_seconds());
        assert_eq!(TOKEN_TTL.whole_seconds(), 86_400);
    }

    #[tokio::test]
    async fn cookie_is_secure_in_production() {
        let store = Arc::new(MemoryUserStore::default());
        let (app, _) = app_with(store, Environment::Production);
        let res = post_json(
            app,
            "/api/auth/sign-up",
            json!({ "name": "Ada", "email": "ada@example.com", "password": "analytical-engine" })
                .to_string(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert!(cookie_value(&res).ends_with("; Secure"));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_without_new_record() {
        let store = Arc::new(MemoryUserStore::default());
        let (app, _) = app_with(store.clone(), Environment::Development);
        let body =
            json!({ "name": "Ada", "email": "ada@example.com", "password": "analytical-engine" });

        let first = post_json(app.clone(), "/api/auth/sign-up", body.to_string()).await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = post_json(app, "/api/auth/sign-up", body.to_string()).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert!(second.headers().get(SET_COOKIE).is_none());
        assert_eq!(
            json_body(second).await,
            json!({ "error": "email already registered" })
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn malformed_payloads_are_rejected_without_record() {
        let store = Arc::new(MemoryUserStore::default());
        let (app, _) = app_with(store.clone(), Environment::Development);

        let cases = [
            json!({ "name": "Ada", "password": "analytical-engine" }).to_string(),
            json!({ "name": "Ada", "email": "ada@example.com", "password": "short" }).to_string(),
            json!({ "name": "Ada", "email": "not-an-email", "password": "analytical-engine" })
                .to_string(),
            json!({ "name": "Ada", "email": "ada@example.com", "password": "analytical-engine", "role": "admin" })
                .to_string(),
            "{ not json".to_string(),
            "42".to_string(),
        ];
        for body in cases {
            let res = post_json(app.clone(), "/api/auth/sign-up", body.clone()).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body: {body}");
            assert!(res.headers().get(SET_COOKIE).is_none());
            let json = json_body(res).await;
            assert!(json["error"].is_string());
            assert!(json.get("details").is_some());
        }
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn store_outage_is_500_without_detail() {
        let store = Arc::new(MemoryUserStore::default());
        store.go_offline();
        let (app, _) = app_with(store, Environment::Development);
        let res = post_json(
            app,
            "/api/auth/sign-up",
            json!({ "name": "Ada", "email": "ada@example.com", "password": "analytical-engine" })
                .to_string(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(res).await, json!({ "error": "internal server error" }));
    }

    #[tokio::test]
    async fn sign_in_is_a_stable_placeholder() {
        let store = Arc::new(MemoryUserStore::default());
        let (app, _) = app_with(store, Environment::Development);
        for _ in 0..2 {
            let res = post_json(
                app.clone(),
                "/api/auth/sign-in",
                json!({ "email": "ada@example.com", "password": "whatever" }).to_string(),
            )
            .await;
            assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
            assert!(res.headers().get(SET_COOKIE).is_none());
            assert_eq!(
                json_body(res).await,
                json!({ "error": "not implemented", "details": "sign-in is not implemented yet" })
            );
        }
    }

    #[tokio::test]
    async fn sign_out_is_a_placeholder_that_clears_cookie() {
        let store = Arc::new(MemoryUserStore::default());
        let (app, _) = app_with(store, Environment::Development);
        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/sign-out")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
        assert!(cookie_value(&res).contains("Max-Age=0"));
        assert_eq!(
            json_body(res).await,
            json!({ "error": "not implemented", "details": "sign-out is not implemented yet" })
        );
    }
}
