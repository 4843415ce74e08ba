//! Canvas data loading and rendering: artwork, stats, leaderboard.
//!
//! The page has nothing meaningful to show without this data, so a fetch
//! failure renders as a blocking error panel with the raw message.

use pd_api_types::CanvasSnapshot;
use pd_canvas_client::{CanvasClient, artwork_url, format_address, format_eth};

use crate::dom::{self, Elements};
use crate::mint;
use crate::state;

const LEADERBOARD_LIMIT: usize = 10;

pub async fn load_canvas(els: &Elements) {
    let generation = state::bump_generation();
    let client = CanvasClient::new();

    let canvas_id = match client.current_canvas_id().await {
        Ok(id) => id,
        Err(err) => {
            if state::generation_is(generation) {
                show_error(els, &err.to_string());
            }
            return;
        }
    };

    let snapshot = match client.canvas_snapshot(canvas_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            if state::generation_is(generation) {
                show_error(els, &err.to_string());
            }
            return;
        }
    };

    // A newer reload owns the DOM now.
    if !state::generation_is(generation) {
        return;
    }

    state::set_canvas(canvas_id);
    render(els, canvas_id, &snapshot);
}

fn show_error(els: &Elements, message: &str) {
    gloo_console::error!("canvas data unavailable:", message);
    dom::hide(&els.loading);
    dom::hide(&els.app);
    dom::set_text(
        &els.error_panel,
        &format!("Failed to load canvas data. Please try again later. Error: {message}"),
    );
    dom::show(&els.error_panel);
}

fn render(els: &Elements, canvas_id: u64, snapshot: &CanvasSnapshot) {
    els.artwork_img.set_src(&artwork_url(&dom::origin(), canvas_id));
    els.artwork_img
        .set_alt(&format!("Canvas #{canvas_id}"));
    dom::set_text(&els.canvas_badge, &format!("Canvas #{canvas_id}"));

    dom::set_text(&els.stat_mints, &snapshot.total_mints.to_string());
    dom::set_text(
        &els.stat_earned,
        &format!("{} ETH", format_eth(&snapshot.total_earned_wei)),
    );
    dom::set_text(&els.stat_pixels, &snapshot.pixels_count.to_string());

    render_contributors(els, snapshot);
    mint::render_labels(els, canvas_id);

    dom::hide(&els.error_panel);
    dom::hide(&els.loading);
    dom::show(&els.app);
}

fn render_contributors(els: &Elements, snapshot: &CanvasSnapshot) {
    if snapshot.contributions.is_empty() {
        dom::hide(&els.contributors);
        return;
    }

    dom::clear_children(&els.contributors_list);
    for (index, contribution) in snapshot
        .contributions
        .iter()
        .take(LEADERBOARD_LIMIT)
        .enumerate()
    {
        let item = dom::create("li");
        dom::add_class(&item, "contributor");

        let rank = dom::create("span");
        dom::add_class(&rank, "rank");
        dom::set_text(&rank, &format!("#{}", index + 1));

        let account = dom::create("span");
        dom::add_class(&account, "mono");
        dom::set_text(&account, &format_address(&contribution.account));

        let pixels = dom::create("span");
        dom::add_class(&pixels, "pixels");
        dom::set_text(&pixels, &format!("{} pixels", contribution.pixels_count));

        let _ = item.append_child(&rank);
        let _ = item.append_child(&account);
        let _ = item.append_child(&pixels);
        let _ = els.contributors_list.append_child(&item);
    }
    dom::show(&els.contributors);
}
