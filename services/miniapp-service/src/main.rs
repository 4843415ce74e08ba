mod art;
mod base_url;
mod html;
mod manifest;
mod og;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use pd_canvas_client::CanvasClient;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use base_url::BaseUrls;
use manifest::AccountAssociation;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) canvas: Arc<CanvasClient>,
    pub(crate) base_urls: BaseUrls,
    pub(crate) association: AccountAssociation,
    pub(crate) template_path: Arc<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let template_path =
        std::env::var("HTML_TEMPLATE_PATH").unwrap_or_else(|_| "static/index.html".to_owned());

    let state = AppState {
        canvas: Arc::new(CanvasClient::new()),
        base_urls: BaseUrls::from_env(),
        association: AccountAssociation::from_env(),
        template_path: Arc::new(template_path),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    info!("miniapp-service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/", get(html::dynamic_html))
        .route("/api/html", get(html::dynamic_html))
        .route("/api/art/image", get(art::art_image))
        .route("/api/farcaster.json", get(manifest::farcaster_manifest))
        .route("/api/og", get(og::og_image))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "miniapp-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "miniapp-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Canvas selection for the artwork proxy: explicit `day` wins, otherwise
/// the current canvas is resolved on-chain.
pub(crate) async fn resolve_day(
    state: &AppState,
    day: Option<&str>,
) -> Result<u64, Response> {
    match day {
        Some(raw) => parse_day(raw),
        None => state.canvas.current_canvas_id().await.map_err(|err| {
            warn!("failed to resolve current canvas: {err}");
            bad_gateway("failed to resolve current canvas").into_response()
        }),
    }
}

pub(crate) fn parse_day(raw: &str) -> Result<u64, Response> {
    raw.parse::<u64>()
        .map_err(|_| bad_request("invalid day parameter").into_response())
}

pub(crate) fn canvas_title(canvas_id: Option<u64>) -> String {
    match canvas_id {
        Some(id) => format!("PaintDay - Canvas #{id}"),
        None => "PaintDay".to_owned(),
    }
}

pub(crate) fn canvas_description(canvas_id: Option<u64>) -> String {
    match canvas_id {
        Some(id) => format!(
            "Mint Canvas #{id} - Collaborative on-chain art canvas on Base. Earn protocol fees from referrals."
        ),
        None => "Mint and contribute pixels to collaborative on-chain art canvases on Base. Earn protocol fees from referrals.".to_owned(),
    }
}

pub(crate) fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

pub(crate) fn bad_gateway(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

pub(crate) fn internal_error(err: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt as _;

    fn test_state() -> AppState {
        AppState {
            canvas: Arc::new(CanvasClient::with_endpoints(
                "http://127.0.0.1:1/rpc",
                "http://127.0.0.1:1/graphql",
                "http://127.0.0.1:1/art",
            )),
            base_urls: BaseUrls::for_tests(None, None),
            association: AccountAssociation::default(),
            template_path: Arc::new("static/index.html".to_owned()),
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn health_and_version_respond() {
        let app = router(test_state());

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("miniapp-service"));

        let response = app
            .oneshot(Request::get("/version").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_day_is_a_client_error() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::get("/api/art/image?day=tomorrow")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("invalid day parameter"));
    }

    #[test]
    fn titles_and_descriptions_are_day_keyed() {
        assert_eq!(canvas_title(Some(700)), "PaintDay - Canvas #700");
        assert_eq!(canvas_title(None), "PaintDay");
        assert!(canvas_description(Some(700)).contains("Canvas #700"));
        assert!(!canvas_description(None).contains('#'));
    }
}
