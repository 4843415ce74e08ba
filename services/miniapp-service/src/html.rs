//! Dynamic HTML: rewrites the static template's title/description/OG/
//! Twitter/share-embed meta tags in place for the requested canvas.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use pd_referral::embed::{
    DEFAULT_BUTTON_TITLE, EmbedAction, EmbedButton, MiniappEmbed, SPLASH_BACKGROUND,
};
use tracing::warn;

use crate::art::DayQuery;
use crate::{AppState, canvas_description, canvas_title, internal_error, parse_day};

const HTML_CACHE: &str = "public, max-age=300, s-maxage=300, stale-while-revalidate=86400";

pub(crate) async fn dynamic_html(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DayQuery>,
) -> Response {
    let template = match tokio::fs::read_to_string(state.template_path.as_str()).await {
        Ok(template) => template,
        Err(err) => {
            warn!("failed to read html template: {err}");
            return internal_error("failed to load page template").into_response();
        }
    };

    let canvas_id = match query.day.as_deref() {
        Some(raw) => match parse_day(raw) {
            Ok(day) => Some(day),
            Err(response) => return response,
        },
        // Serve the generic template rather than failing the page when the
        // chain read is down.
        None => match state.canvas.current_canvas_id().await {
            Ok(day) => Some(day),
            Err(err) => {
                warn!("serving generic html; current canvas unavailable: {err}");
                None
            }
        },
    };

    let base_url = state.base_urls.resolve(&headers);
    let html = rewrite_template(&template, &base_url, canvas_id);

    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, HTML_CACHE),
        ],
        html,
    )
        .into_response()
}

fn rewrite_template(template: &str, base_url: &str, canvas_id: Option<u64>) -> String {
    let title = canvas_title(canvas_id);
    let description = canvas_description(canvas_id);
    let og_image_url = match canvas_id {
        Some(day) => format!("{base_url}/api/og?day={day}"),
        None => format!("{base_url}/api/og"),
    };

    let mut html = replace_between(template, "<title>", "</title>", &title);
    html = replace_between(
        &html,
        r#"<meta name="description" content=""#,
        "\"",
        &description,
    );
    html = replace_between(
        &html,
        r#"<meta property="og:title" content=""#,
        "\"",
        &title,
    );
    html = replace_between(
        &html,
        r#"<meta property="og:description" content=""#,
        "\"",
        &description,
    );
    html = replace_between(
        &html,
        r#"<meta property="og:image" content=""#,
        "\"",
        &og_image_url,
    );
    html = replace_between(
        &html,
        r#"<meta name="twitter:title" content=""#,
        "\"",
        &title,
    );
    html = replace_between(
        &html,
        r#"<meta name="twitter:description" content=""#,
        "\"",
        &description,
    );
    html = replace_between(
        &html,
        r#"<meta name="twitter:image" content=""#,
        "\"",
        &og_image_url,
    );

    let embed = MiniappEmbed {
        version: "1".to_owned(),
        image_url: og_image_url.clone(),
        button: EmbedButton {
            title: DEFAULT_BUTTON_TITLE.to_owned(),
            action: EmbedAction {
                action_type: "launch_miniapp".to_owned(),
                url: base_url.to_owned(),
                name: title.clone(),
                splash_image_url: og_image_url,
                splash_background_color: SPLASH_BACKGROUND.to_owned(),
            },
        },
    };
    // The embed JSON sits inside single-quoted attributes.
    let miniapp_json = embed.to_json().replace('\'', "&apos;");
    let frame_json = embed.frame_variant().to_json().replace('\'', "&apos;");
    html = replace_between(&html, "<meta name=\"fc:miniapp\" content='", "'", &miniapp_json);
    html = replace_between(&html, "<meta name=\"fc:frame\" content='", "'", &frame_json);

    html
}

/// Replace the text between the first `start`/`end` pair. Leaves the
/// document untouched when the pair is absent.
fn replace_between(html: &str, start: &str, end: &str, replacement: &str) -> String {
    let Some(at) = html.find(start) else {
        return html.to_owned();
    };
    let content_start = at + start.len();
    let Some(len) = html[content_start..].find(end) else {
        return html.to_owned();
    };
    format!(
        "{}{}{}",
        &html[..content_start],
        replacement,
        &html[content_start + len..]
    )
}
