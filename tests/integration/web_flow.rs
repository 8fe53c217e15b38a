//! End-to-end form posts against the demo router

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use postback::config::PersistenceConfig;
use postback::page::{STATE_FIELD, VALIDATION_FIELD};
use postback::web::handlers::EVENT_FIELD;
use postback::web::{build_router, WebAppState};
use tower::ServiceExt;

fn app() -> Router {
    build_router(WebAppState::new(&PersistenceConfig::default()))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn hidden(html: &str, name: &str) -> String {
    let marker = format!(r#"name="{name}" value=""#);
    let start = html.find(&marker).expect("hidden field present") + marker.len();
    let end = start + html[start..].find('"').unwrap();
    html[start..end].to_string()
}

/// Minimal form encoding for the characters our fields contain.
fn encode(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' => c.to_string(),
            ' ' => "+".to_string(),
            other => {
                let mut buf = [0u8; 4];
                other
                    .encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{b:02X}"))
                    .collect()
            }
        })
        .collect()
}

async fn post(app: Router, html: &str, extra: &[(&str, &str)]) -> axum::response::Response {
    let mut pairs = vec![
        (STATE_FIELD.to_string(), hidden(html, STATE_FIELD)),
        (VALIDATION_FIELD.to_string(), hidden(html, VALIDATION_FIELD)),
    ];
    pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    let body = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_counter_round_trips_through_http() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;

    let response = post(app(), &page, &[(EVENT_FIELD, "form$inc|10")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains(r#"<output id="count">10</output>"#));

    let response = post(
        app(),
        &page,
        &[("form$name", "Grace Hopper"), (EVENT_FIELD, "form$greet")],
    )
    .await;
    let page = body_text(response).await;
    assert!(page.contains("Hello, Grace Hopper"));
    assert!(page.contains(r#"<output id="count">10</output>"#));

    let response = post(app(), &page, &[(EVENT_FIELD, "form$flip")]).await;
    let page = body_text(response).await;
    assert!(page.contains(r#"<output id="toggle">on</output>"#));
    assert!(page.contains("Hello, Grace Hopper"));
}

#[tokio::test]
async fn test_fabricated_interaction_rerenders_unchanged_page() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let page = body_text(response).await;

    let response = post(app(), &page, &[(EVENT_FIELD, "form$inc|999")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let page = body_text(response).await;
    assert!(page.contains(r#"<output id="count">0</output>"#));
    assert!(page.contains("nothing was changed"));

    let response = post(app(), &page, &[(EVENT_FIELD, "form$inc|10")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(r#"<output id="count">10</output>"#));
}

#[tokio::test]
async fn test_validation_can_be_disabled() {
    let config = PersistenceConfig {
        event_validation: false,
        ..PersistenceConfig::default()
    };
    let app = build_router(WebAppState::new(&config));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let page = body_text(response).await;
    assert!(!page.contains(VALIDATION_FIELD));

    let body = format!(
        "{STATE_FIELD}={}&{EVENT_FIELD}=form%24inc%7C999",
        encode(&hidden(&page, STATE_FIELD))
    );
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(r#"<output id="count">999</output>"#));
}
