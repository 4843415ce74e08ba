//! Mini-app host manifest (`/api/farcaster.json`).
//!
//! Fixed-shape document: the signed account association plus app metadata,
//! with the splash/og image keyed by the current canvas.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use crate::art::DayQuery;
use crate::{AppState, canvas_description, canvas_title, parse_day};

const MANIFEST_CACHE: &str = "public, max-age=300, s-maxage=300, stale-while-revalidate=86400";

/// Domain-association proof, signed out-of-band for the deployed domain and
/// supplied through the environment.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct AccountAssociation {
    pub(crate) header: String,
    pub(crate) payload: String,
    pub(crate) signature: String,
}

impl AccountAssociation {
    pub(crate) fn from_env() -> Self {
        Self {
            header: std::env::var("MANIFEST_ASSOCIATION_HEADER").unwrap_or_default(),
            payload: std::env::var("MANIFEST_ASSOCIATION_PAYLOAD").unwrap_or_default(),
            signature: std::env::var("MANIFEST_ASSOCIATION_SIGNATURE").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ManifestDocument {
    #[serde(rename = "accountAssociation")]
    account_association: AccountAssociation,
    miniapp: MiniappMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MiniappMetadata {
    version: &'static str,
    name: String,
    icon_url: String,
    home_url: String,
    splash_image_url: String,
    splash_background_color: &'static str,
    subtitle: &'static str,
    description: String,
    primary_category: &'static str,
    tags: [&'static str; 5],
    required_chains: [&'static str; 1],
    noindex: bool,
    og_title: String,
    og_description: String,
    og_image_url: String,
}

pub(crate) async fn farcaster_manifest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DayQuery>,
) -> Response {
    let base_url = state.base_urls.resolve(&headers);

    let canvas_id = match query.day.as_deref() {
        Some(raw) => match parse_day(raw) {
            Ok(day) => Some(day),
            Err(response) => return response,
        },
        // Manifest stays servable even when the chain read fails; the image
        // just falls back to the static one.
        None => match state.canvas.current_canvas_id().await {
            Ok(day) => Some(day),
            Err(err) => {
                warn!("manifest falling back to static image: {err}");
                None
            }
        },
    };

    let image_url = match canvas_id {
        Some(day) => format!("{base_url}/api/art/image?day={day}"),
        None => format!("{base_url}/og-image.png"),
    };

    let document = ManifestDocument {
        account_association: state.association.clone(),
        miniapp: MiniappMetadata {
            version: "1",
            name: canvas_title(canvas_id),
            icon_url: format!("{base_url}/logo.png"),
            home_url: format!("{base_url}/"),
            splash_image_url: image_url.clone(),
            splash_background_color: pd_referral::embed::SPLASH_BACKGROUND,
            subtitle: "Collaborative on-chain art",
            description: canvas_description(canvas_id),
            primary_category: "art-creativity",
            tags: ["art", "base", "mint", "nft", "onchain"],
            required_chains: ["eip155:8453"],
            noindex: false,
            og_title: canvas_title(canvas_id),
            og_description: canvas_description(canvas_id),
            og_image_url: image_url,
        },
    };

    (
        [(header::CACHE_CONTROL, MANIFEST_CACHE)],
        Json(document),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_serializes_host_facing_keys() {
        let document = ManifestDocument {
            account_association: AccountAssociation::default(),
            miniapp: MiniappMetadata {
                version: "1",
                name: canvas_title(Some(700)),
                icon_url: "https://paintday.app/logo.png".to_owned(),
                home_url: "https://paintday.app/".to_owned(),
                splash_image_url: "https://paintday.app/api/art/image?day=700".to_owned(),
                splash_background_color: "#000000",
                subtitle: "Collaborative on-chain art",
                description: canvas_description(Some(700)),
                primary_category: "art-creativity",
                tags: ["art", "base", "mint", "nft", "onchain"],
                required_chains: ["eip155:8453"],
                noindex: false,
                og_title: canvas_title(Some(700)),
                og_description: canvas_description(Some(700)),
                og_image_url: "https://paintday.app/api/art/image?day=700".to_owned(),
            },
        };

        let json = serde_json::to_value(&document).expect("json");
        assert_eq!(json["miniapp"]["name"], "PaintDay - Canvas #700");
        assert_eq!(json["miniapp"]["requiredChains"][0], "eip155:8453");
        assert_eq!(
            json["miniapp"]["splashImageUrl"],
            "https://paintday.app/api/art/image?day=700"
        );
        assert!(json["accountAssociation"]["header"].is_string());
    }
}
