//! Social-preview image: a 1200×630 composition of the canvas artwork,
//! app title, and canvas number, rendered as SVG.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use crate::art::DayQuery;
use crate::{AppState, parse_day};

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 630;
const OG_CACHE: &str = "public, max-age=300, s-maxage=300, stale-while-revalidate=86400";

pub(crate) async fn og_image(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Response {
    let canvas_id = match query.day.as_deref() {
        Some(raw) => match parse_day(raw) {
            Ok(day) => day,
            Err(response) => return response,
        },
        None => match state.canvas.current_canvas_id().await {
            Ok(day) => day,
            Err(err) => {
                warn!("og image falling back to canvas 0: {err}");
                0
            }
        },
    };

    // The preview still renders (title on black) when the artwork is
    // unavailable.
    let artwork = match state.canvas.fetch_artwork(canvas_id).await {
        Ok(bytes) => Some(STANDARD.encode(bytes)),
        Err(err) => {
            warn!("og image rendering without artwork for day {canvas_id}: {err}");
            None
        }
    };

    let svg = compose_svg(canvas_id, artwork.as_deref());
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, OG_CACHE),
        ],
        svg,
    )
        .into_response()
}

fn compose_svg(canvas_id: u64, artwork_b64: Option<&str>) -> String {
    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">
<defs>
<linearGradient id="shade" x1="0" y1="0" x2="0" y2="1">
<stop offset="0" stop-color="#000000" stop-opacity="0.7"/>
<stop offset="0.5" stop-color="#000000" stop-opacity="0.3"/>
<stop offset="1" stop-color="#000000" stop-opacity="0.7"/>
</linearGradient>
</defs>
<rect width="{WIDTH}" height="{HEIGHT}" fill="#000000"/>
"##
    );

    if let Some(b64) = artwork_b64 {
        svg.push_str(&format!(
            r#"<image href="data:image/png;base64,{b64}" x="0" y="0" width="{WIDTH}" height="{HEIGHT}" preserveAspectRatio="xMidYMid slice"/>
"#
        ));
    }

    svg.push_str(&format!(
        r##"<rect width="{WIDTH}" height="{HEIGHT}" fill="url(#shade)"/>
<text x="600" y="280" text-anchor="middle" font-family="sans-serif" font-size="72" font-weight="bold" fill="#ffffff">PaintDay</text>
<text x="600" y="370" text-anchor="middle" font-family="sans-serif" font-size="48" fill="#ffffff">Canvas #{canvas_id}</text>
<text x="600" y="440" text-anchor="middle" font-family="sans-serif" font-size="32" fill="#cccccc">Collaborative on-chain art canvas on Base</text>
</svg>
"##
    ));

    svg
}
