//! Artwork image proxy.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

use crate::{AppState, bad_gateway, resolve_day};

/// Browser cache one hour, edge cache a day, stale allowed while refreshing.
const IMAGE_CACHE: &str = "public, max-age=3600, s-maxage=86400, stale-while-revalidate";

#[derive(Debug, Deserialize)]
pub(crate) struct DayQuery {
    pub(crate) day: Option<String>,
}

pub(crate) async fn art_image(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Response {
    let day = match resolve_day(&state, query.day.as_deref()).await {
        Ok(day) => day,
        Err(response) => return response,
    };

    match state.canvas.fetch_artwork(day).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, IMAGE_CACHE),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => {
            warn!("artwork proxy failed for day {day}: {err}");
            bad_gateway("failed to fetch artwork").into_response()
        }
    }
}
