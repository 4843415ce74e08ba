//! Identity card: viewer info when signed in, sign-in button otherwise.

use pd_api_types::AuthState;

use crate::dom::{self, Elements};
use crate::state;

pub fn render(els: &Elements, auth_state: &AuthState) {
    match &auth_state.user {
        Some(user) => {
            dom::set_text(&els.auth_name, user.label());
            let mut line = format!("FID: {}", user.fid);
            if let Some(username) = &user.username {
                line.push_str(&format!(" \u{2022} @{username}"));
            }
            dom::set_text(&els.auth_fid, &line);
            match &user.pfp_url {
                Some(url) => els.auth_avatar.set_src(url),
                None => els.auth_avatar.set_src(""),
            }
            dom::show(&els.auth_user);
            dom::hide(els.sign_in_btn.as_ref());
        }
        None => {
            dom::hide(&els.auth_user);
            dom::show(els.sign_in_btn.as_ref());
        }
    }
}

pub async fn on_sign_in(els: &Elements) {
    let Some(coordinator) = state::coordinator() else {
        return;
    };

    let _ = els.sign_in_btn.set_attribute("disabled", "");
    dom::set_text(els.sign_in_btn.as_ref(), "Connecting\u{2026}");

    coordinator.sign_in().await;

    let _ = els.sign_in_btn.remove_attribute("disabled");
    dom::set_text(els.sign_in_btn.as_ref(), "Sign in");
}
