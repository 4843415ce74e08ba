//! Wallet card: connected-account view, connector menu, network banner.

use pd_api_types::AuthState;
use pd_canvas_client::format_address;
use pd_mint::{CHAIN_LABEL, REQUIRED_CHAIN_ID};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::spawn_local;

use crate::dom::{self, Elements};
use crate::mint;
use crate::state;

pub fn render(els: &Elements, auth_state: &AuthState) {
    let session = &auth_state.wallet;

    if let Some(address) = session.address() {
        dom::set_text(&els.wallet_address, &format_address(address));
        let network = if session.wrong_network(REQUIRED_CHAIN_ID) {
            "Wrong network"
        } else {
            CHAIN_LABEL
        };
        dom::set_text(&els.wallet_network, network);
        dom::show(&els.wallet_connected);
        dom::hide(&els.wallet_menu);
    } else {
        dom::hide(&els.wallet_connected);
        dom::show(&els.wallet_menu);
        dom::hide(&els.connector_menu);
    }

    // The wrong-network warning stays visible until the chain resolves or
    // the wallet disconnects.
    if session.wrong_network(REQUIRED_CHAIN_ID) {
        dom::set_text(
            &els.network_banner,
            &format!("Please switch to {CHAIN_LABEL} to mint"),
        );
        dom::show(&els.network_banner);
    } else {
        dom::hide(&els.network_banner);
    }

    mint::set_enabled(els, session.is_connected());
}

/// Advisory hint: a signed-in identity with an embedded wallet address and
/// no active session can connect the embedded connector.
pub fn render_suggestion(els: &Elements) {
    let suggestion = state::coordinator().and_then(|c| c.connector_suggestion());
    match suggestion {
        Some(connector) => {
            dom::set_text(
                &els.connect_hint,
                &format!("Connect {} to mint with your account", connector.display_name),
            );
            dom::show(&els.connect_hint);
        }
        None => dom::hide(&els.connect_hint),
    }
}

pub fn toggle_menu(els: &Elements) {
    let hidden = els.connector_menu.class_list().contains("hidden");
    if hidden {
        render_menu(els);
        dom::show(&els.connector_menu);
    } else {
        dom::hide(&els.connector_menu);
    }
}

fn render_menu(els: &Elements) {
    let Some(wallet) = state::wallet() else {
        return;
    };
    dom::clear_children(&els.connector_menu);

    let connectors = wallet.list_connectors();
    if connectors.is_empty() {
        let empty = dom::create("p");
        dom::add_class(&empty, "hint");
        dom::set_text(&empty, "No wallet available in this browser");
        let _ = els.connector_menu.append_child(&empty);
        return;
    }

    for connector in connectors {
        let button = dom::create("button");
        dom::add_class(&button, "btn");
        dom::add_class(
            &button,
            if connector.embedded {
                "btn-primary"
            } else {
                "btn-outline"
            },
        );
        dom::set_text(&button, &connector.display_name);

        let els2 = els.clone();
        let connector_id = connector.id.clone();
        let cb = Closure::wrap(Box::new(move |_: web_sys::MouseEvent| {
            let els3 = els2.clone();
            let id = connector_id.clone();
            dom::hide(&els3.connector_menu);
            spawn_local(async move {
                if let Some(wallet) = state::wallet() {
                    wallet.connect(&id).await;
                }
            });
        }) as Box<dyn FnMut(_)>);
        let _ = button.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref());
        cb.forget();

        let _ = els.connector_menu.append_child(&button);
    }
}

pub async fn on_disconnect(els: &Elements) {
    if let Some(wallet) = state::wallet() {
        wallet.disconnect().await;
    }
    render_suggestion(els);
}
