use super::pages;
use super::{AppError, AppState};
use crate::inbox::scan_imap;
use crate::statistics::StatEvent;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::Form;
use base64::Engine;
use serde::{Deserialize, Serialize};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
pub struct UrlForm {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(alias = "text")]
    pub email_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub is_phishing: bool,
    pub label: &'static str,
    pub probability: f64,
    pub phishing_probability: f64,
    pub risk_level: crate::risk::RiskLevel,
}

#[derive(Debug, Deserialize)]
pub struct InboxForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub limit: Option<String>,
}

/// Byte comparison whose running time depends only on the lengths
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Accepts `X-API-Key: <key>` or Basic auth whose password is the key
pub fn authenticate(headers: &HeaderMap, api_key: Option<&str>) -> bool {
    let Some(expected) = api_key else {
        return true;
    };

    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return constant_time_eq(key.as_bytes(), expected.as_bytes());
    }

    if let Some(auth_header) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        let credentials = auth_header
            .trim()
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("basic"));
        if let Some((_, encoded)) = credentials {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok());
            if let Some((_, password)) = decoded.as_deref().and_then(|d| d.split_once(':')) {
                return constant_time_eq(password.as_bytes(), expected.as_bytes());
            }
        }
    }

    false
}

pub async fn detect_url_form() -> Html<String> {
    Html(pages::detect_url_page("", None))
}

pub async fn detect_url_submit(
    State(state): State<AppState>,
    Form(form): Form<UrlForm>,
) -> Result<Html<String>, AppError> {
    let url = form.url.trim();
    if url.is_empty() {
        return Ok(Html(pages::detect_url_page(&form.url, None)));
    }

    let verdict = state.detector.check_url(url)?;
    log::info!(
        "URL check: {} -> {} ({:.2}%)",
        url,
        verdict.label,
        verdict.probability
    );
    state.stats.record_event(StatEvent::UrlChecked {
        is_phishing: verdict.is_phishing,
    });
    Ok(Html(pages::detect_url_page(url, Some(&verdict))))
}

pub async fn check_phishing(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, AppError> {
    if !authenticate(&headers, state.config.server.api_key.as_deref()) {
        log::warn!("Rejected unauthenticated API request");
        return Err(AppError::Unauthorized);
    }

    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let text = request.email_text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("email_text is required".to_string()));
    }

    let verdict = state.detector.check_text(&text)?;
    log::info!(
        "Text check ({} chars) -> {} ({:.2}%)",
        text.len(),
        verdict.label,
        verdict.probability
    );
    state.stats.record_event(StatEvent::TextChecked {
        is_phishing: verdict.is_phishing,
    });

    Ok(Json(CheckResponse {
        is_phishing: verdict.is_phishing,
        label: verdict.label,
        probability: verdict.probability,
        phishing_probability: verdict.phishing_probability,
        risk_level: verdict.risk_level,
    }))
}

pub async fn scan_inbox_form() -> Html<String> {
    Html(pages::scan_inbox_page("", None, None))
}

pub async fn scan_inbox_submit(
    State(state): State<AppState>,
    Form(form): Form<InboxForm>,
) -> Response {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        let page = pages::scan_inbox_page(email, Some("Email address and password are required"), None);
        return (StatusCode::BAD_REQUEST, Html(page)).into_response();
    }

    let limit = match form.limit.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                let page = pages::scan_inbox_page(email, Some("Messages must be a positive number"), None);
                return (StatusCode::BAD_REQUEST, Html(page)).into_response();
            }
        },
    };

    match scan_imap(
        state.detector.clone(),
        &state.config.inbox,
        email,
        &form.password,
        limit,
    )
    .await
    {
        Ok(report) => {
            state.stats.record_event(StatEvent::InboxScanned {
                scanned: report.scanned,
                flagged: report.flagged,
            });
            Html(pages::scan_inbox_page(email, None, Some(&report))).into_response()
        }
        Err(e) => {
            log::warn!("Inbox scan failed: {e:#}");
            state.stats.record_event(StatEvent::InboxFailed);
            let message = format!("Inbox scan failed: {e}");
            let page = pages::scan_inbox_page(email, Some(&message), None);
            (StatusCode::BAD_GATEWAY, Html(page)).into_response()
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let metadata = state.detector.model().metadata();
    Json(serde_json::json!({
        "status": "ok",
        "model_loaded": true,
        "model_trained_at": metadata.trained_at,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn stats(State(state): State<AppState>) -> Json<crate::statistics::GlobalStats> {
    Json(state.stats.get_stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::detector::tests::detector;
    use crate::web::router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state_with(config: Config) -> AppState {
        AppState::new(detector(), config)
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::post("/api/check-phishing/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_renders_form() {
        let app = router(state_with(Config::default()));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("name=\"url\""));
        assert!(!body.contains("id=\"result\""));
    }

    #[tokio::test]
    async fn test_url_form_submission() {
        let state = state_with(Config::default());
        let app = router(state.clone());
        let response = app
            .oneshot(
                Request::post("/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("url=http%3A%2F%2F10.0.0.1%2Fsecure%2Flogin%2Fverify"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("id=\"result\""));
        assert!(body.contains("Phishing / Suspicious"));
        assert_eq!(state.stats.get_stats().urls.checks, 1);
    }

    #[tokio::test]
    async fn test_blank_url_has_no_prediction() {
        let app = router(state_with(Config::default()));
        let response = app
            .oneshot(
                Request::post("/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("url=+++"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_string(response).await.contains("id=\"result\""));
    }

    #[tokio::test]
    async fn test_check_phishing_json() {
        let app = router(state_with(Config::default()));
        let response = app
            .oneshot(json_request(
                r#"{"email_text": "Urgent: verify your account password or it will be suspended"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value["is_phishing"], true);
        assert_eq!(value["label"], "Phishing / Suspicious");
        assert!(value["probability"].as_f64().unwrap() >= 50.0);
    }

    #[tokio::test]
    async fn test_check_phishing_accepts_text_alias() {
        let app = router(state_with(Config::default()));
        let response = app
            .oneshot(json_request(r#"{"text": "Lunch on Friday with the team?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value["is_phishing"], false);
        assert_eq!(value["risk_level"], "low");
    }

    #[tokio::test]
    async fn test_check_phishing_bad_requests() {
        let app = router(state_with(Config::default()));
        let response = app.clone().oneshot(json_request(r#"{"email_text": "  "}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("email_text is required"));

        let response = app.oneshot(json_request("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let mut config = Config::default();
        config.server.api_key = Some("s3cret".to_string());
        let app = router(state_with(config));

        let response = app
            .clone()
            .oneshot(json_request(r#"{"email_text": "hello"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut request = json_request(r#"{"email_text": "hello team"}"#);
        request
            .headers_mut()
            .insert(API_KEY_HEADER, "s3cret".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_authenticate_variants() {
        let mut headers = HeaderMap::new();
        assert!(authenticate(&headers, None));
        assert!(!authenticate(&headers, Some("key")));

        let encoded = base64::engine::general_purpose::STANDARD.encode("anyone:key");
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Basic {encoded}").parse().unwrap(),
        );
        assert!(authenticate(&headers, Some("key")));
        assert!(!authenticate(&headers, Some("other")));

        let mut wrong = HeaderMap::new();
        wrong.insert(API_KEY_HEADER, "nope".parse().unwrap());
        assert!(!authenticate(&wrong, Some("key")));
    }

    #[test]
    fn test_basic_scheme_is_case_insensitive() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("anyone:key");
        for scheme in ["basic", "BASIC", "Basic"] {
            let mut headers = HeaderMap::new();
            headers.insert(
                axum::http::header::AUTHORIZATION,
                format!("{scheme} {encoded}").parse().unwrap(),
            );
            assert!(authenticate(&headers, Some("key")), "scheme {scheme}");
        }

        let mut bearer = HeaderMap::new();
        bearer.insert(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {encoded}").parse().unwrap(),
        );
        assert!(!authenticate(&bearer, Some("key")));
    }

    #[test]
    fn test_key_comparison() {
        assert!(constant_time_eq(b"secret-key", b"secret-key"));
        assert!(!constant_time_eq(b"secret-key", b"secret-kez"));
        assert!(!constant_time_eq(b"secret", b"secret-key"));
        assert!(constant_time_eq(b"", b""));

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, "secret-key".parse().unwrap());
        assert!(authenticate(&headers, Some("secret-key")));
        assert!(!authenticate(&headers, Some("secret-key-longer")));
    }

    #[tokio::test]
    async fn test_inbox_form_validation() {
        let app = router(state_with(Config::default()));
        let response = app
            .clone()
            .oneshot(Request::get("/scan-inbox/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::post("/scan-inbox/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("email=me%40example.com&password="))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("password are required"));
    }

    #[tokio::test]
    async fn test_health_and_stats() {
        let app = router(state_with(Config::default()));
        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["model_loaded"], true);

        let response = app
            .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value["urls"]["checks"], 0);
    }
}
