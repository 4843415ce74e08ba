//! Share flow: referral link to the clipboard plus rich-embed meta tags so
//! the host renders a launch card for the copied link.

use pd_api_types::Notice;
use pd_referral::build_share_link;
use pd_referral::embed::MiniappEmbed;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::dom::{self, Elements};
use crate::notices;
use crate::state;

pub async fn on_share(els: &Elements) {
    // Prefer the explicit referral the viewer arrived with; otherwise the
    // share link carries their own account so rewards route back to them.
    let referral = state::referral().or_else(|| {
        state::coordinator()
            .map(|coordinator| coordinator.state())
            .and_then(|auth_state| auth_state.effective_address)
    });
    let Some(referral) = referral else {
        notices::toast(
            els,
            &Notice::warning("Connect a wallet or sign in to get your referral link"),
        );
        return;
    };

    let origin = dom::origin();
    let link = build_share_link(&origin, &referral);

    inject_embed_meta(&link, &origin);

    let clipboard = dom::window().navigator().clipboard();
    match JsFuture::from(clipboard.write_text(&link)).await {
        Ok(_) => notices::toast(els, &Notice::success("Share link copied")),
        Err(err) => {
            gloo_console::warn!("clipboard write failed", err);
            notices::toast(els, &Notice::info(format!("Share link: {link}")));
        }
    }
}

/// Overwrite any existing share-embed meta tags with ones pointing at the
/// referral link, so sharing the page itself carries the referral.
fn inject_embed_meta(link: &str, origin: &str) {
    let og_image = match state::canvas_id() {
        Some(day) => format!("{origin}/api/og?day={day}"),
        None => format!("{origin}/api/og"),
    };
    let name = match state::canvas_id() {
        Some(day) => format!("PaintDay - Canvas #{day}"),
        None => "PaintDay".to_owned(),
    };

    // Local origins cannot produce a shareable embed; the link still works.
    let embed = match MiniappEmbed::new(link, &og_image, &name, Some(origin)) {
        Ok(embed) => embed,
        Err(err) => {
            gloo_console::warn!("share embed unavailable:", err.to_string());
            return;
        }
    };

    let Some(document) = dom::window().document() else {
        return;
    };
    let Some(head) = document.head() else {
        return;
    };

    if let Ok(existing) = document.query_selector_all("meta[name=\"fc:miniapp\"], meta[name=\"fc:frame\"]") {
        for index in 0..existing.length() {
            if let Some(node) = existing.item(index) {
                if let Ok(el) = node.dyn_into::<web_sys::Element>() {
                    el.remove();
                }
            }
        }
    }

    let miniapp = dom::create("meta");
    let _ = miniapp.set_attribute("name", "fc:miniapp");
    let _ = miniapp.set_attribute("content", &embed.to_json());
    let _ = head.append_child(&miniapp);

    let frame = dom::create("meta");
    let _ = frame.set_attribute("name", "fc:frame");
    let _ = frame.set_attribute("content", &embed.frame_variant().to_json());
    let _ = head.append_child(&frame);
}
