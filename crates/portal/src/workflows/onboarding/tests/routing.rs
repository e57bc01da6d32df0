use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::{build_router, register_profile};
use crate::workflows::onboarding::domain::Identity;
use crate::workflows::onboarding::sessions::SessionStore;

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn setup_step_denies_unauthenticated_callers() {
    let (router, state) = build_router();
    register_profile(&state.service, "routing-anon");

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/setup/academic",
            None,
            json!({
                "university": "Constructor University",
                "degree": "bachelor_of_science",
                "major": "CS",
                "graduation_year": 2027,
            }),
        ))
        .await
        .expect("router dispatch");

    // denied before any section logic runs
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn identity_without_profile_is_forbidden() {
    let (router, state) = build_router();
    let token = state.sessions.issue(Identity {
        username: "profile-less".to_string(),
        is_admin: false,
    });

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/setup")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_issues_a_token_and_points_at_setup() {
    let (router, _) = build_router();

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/register",
            None,
            json!({
                "username": "http-reg",
                "password": "correct-horse-battery",
                "password_confirmation": "correct-horse-battery",
                "first_name": "Huber",
                "last_name": "Ackerman",
                "date_of_birth": "2000-01-15",
                "gender": "Prefer Not to Answer",
                "email": "http-reg@example.org",
                "country_of_residence": "Germany",
                "consent": {
                    "event_terms": true,
                    "code_of_conduct": true,
                    "contest_terms": true,
                },
            }),
        ))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json(response).await;
    assert_eq!(payload.get("next"), Some(&json!("/api/v1/setup")));
    assert!(payload
        .get("token")
        .and_then(Value::as_str)
        .is_some_and(|token| !token.is_empty()));
}

#[tokio::test]
async fn setup_dispatcher_presents_steps_and_redirects_resubmissions() {
    let (router, state) = build_router();
    register_profile(&state.service, "http-walker");
    let token = state.sessions.issue(
        state
            .service
            .authenticate("http-walker", "correct-horse-battery")
            .expect("login succeeds"),
    );

    // the dispatcher starts at the first registered section
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/setup")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload.get("status"), Some(&json!("pending")));
    assert_eq!(
        payload.pointer("/section/kind"),
        Some(&json!("academic"))
    );
    assert_eq!(payload.get("submit"), Some(&json!("/api/v1/setup/academic")));

    let academic_body = json!({
        "university": "Constructor University",
        "degree": "bachelor_of_science",
        "major": "CS",
        "graduation_year": 2027,
    });

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/setup/academic",
            Some(&token),
            academic_body.clone(),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/api/v1/setup")
    );

    // submitting the same step again routes back to the dispatcher
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/setup/academic",
            Some(&token),
            academic_body,
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // and the dispatcher has moved on to the next section
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/setup")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router dispatch");
    let payload = read_json(response).await;
    assert_eq!(
        payload.pointer("/section/kind"),
        Some(&json!("application"))
    );
}

#[tokio::test]
async fn unknown_setup_slug_is_not_found() {
    let (router, state) = build_router();
    register_profile(&state.service, "http-unknown");
    let token = state.sessions.issue(
        state
            .service
            .authenticate("http-unknown", "correct-horse-battery")
            .expect("login succeeds"),
    );

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/setup/mystery",
            Some(&token),
            json!({}),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_redirects_until_setup_completes() {
    let (router, state) = build_router();
    let profile = register_profile(&state.service, "http-editor");
    let token = state.sessions.issue(
        state
            .service
            .authenticate("http-editor", "correct-horse-battery")
            .expect("login succeeds"),
    );

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/edit")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    for payload in [
        super::common::academic(),
        super::common::application(),
        super::common::organizational(),
        super::common::cv_document(),
    ] {
        state
            .service
            .submit_section(&profile, payload)
            .expect("submission succeeds");
    }

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/edit")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload.get("username"), Some(&json!("http-editor")));
}

#[tokio::test]
async fn cv_download_enforces_ownership() {
    let (router, state) = build_router();
    let profile = register_profile(&state.service, "cv-owner");
    register_profile(&state.service, "cv-snoop");

    state
        .service
        .submit_section(&profile, super::common::cv_document())
        .expect("cv submission succeeds");

    let owner_token = state.sessions.issue(
        state
            .service
            .authenticate("cv-owner", "correct-horse-battery")
            .expect("login succeeds"),
    );
    let snoop_token = state.sessions.issue(
        state
            .service
            .authenticate("cv-snoop", "correct-horse-battery")
            .expect("login succeeds"),
    );
    let admin_token = state.sessions.issue(Identity {
        username: "admin".to_string(),
        is_admin: true,
    });

    let request = |token: &str| {
        Request::builder()
            .method("GET")
            .uri("/cvs/cv-owner.pdf")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request builds")
    };

    let response = router
        .clone()
        .oneshot(request(&owner_token))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok()),
        Some("attachment; filename=\"cv-owner.pdf\"")
    );

    let response = router
        .clone()
        .oneshot(request(&snoop_token))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(request(&admin_token))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let (router, state) = build_router();
    register_profile(&state.service, "http-login");

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/login",
            None,
            json!({ "username": "http-login", "password": "wrong" }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/login",
            None,
            json!({ "username": "http-login", "password": "correct-horse-battery" }),
        ))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload.get("is_admin"), Some(&json!(false)));
}
