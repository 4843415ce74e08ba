//! Event binding.
//!
//! Wires all UI event listeners once after init. To add new events, add
//! closures here and (if async) spawn via `wasm_bindgen_futures::spawn_local`.

use crate::auth;
use crate::dom::Elements;
use crate::mint;
use crate::share;
use crate::wallet;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Helper: attach async click handler to an HtmlElement.
macro_rules! on_click_async {
    ($el:expr, $els:expr, $handler:expr) => {{
        let els = $els.clone();
        let cb = Closure::wrap(Box::new(move |_: web_sys::MouseEvent| {
            let els2 = els.clone();
            wasm_bindgen_futures::spawn_local(async move {
                $handler(&els2).await;
            });
        }) as Box<dyn FnMut(_)>);
        $el.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())
            .unwrap();
        cb.forget();
    }};
}

/// Helper: attach sync click handler.
macro_rules! on_click {
    ($el:expr, $cb:expr) => {{
        let cb = Closure::wrap(Box::new($cb) as Box<dyn FnMut(web_sys::MouseEvent)>);
        $el.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())
            .unwrap();
        cb.forget();
    }};
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(els: &Elements) {
    // ── Auth ──
    on_click_async!(els.sign_in_btn, els, auth::on_sign_in);

    // ── Wallet ──
    {
        let els2 = els.clone();
        on_click!(els.connect_btn, move |_: web_sys::MouseEvent| {
            wallet::toggle_menu(&els2);
        });
    }
    on_click_async!(els.disconnect_btn, els, wallet::on_disconnect);

    // ── Mint ──
    {
        let els2 = els.clone();
        on_click!(els.qty_minus, move |_: web_sys::MouseEvent| {
            mint::on_qty_delta(&els2, -1);
        });
    }
    {
        let els2 = els.clone();
        on_click!(els.qty_plus, move |_: web_sys::MouseEvent| {
            mint::on_qty_delta(&els2, 1);
        });
    }
    {
        let els2 = els.clone();
        let cb = Closure::wrap(Box::new(move |_: web_sys::Event| {
            mint::update_price(&els2);
        }) as Box<dyn FnMut(_)>);
        els.qty_input
            .add_event_listener_with_callback("input", cb.as_ref().unchecked_ref())
            .unwrap();
        cb.forget();
    }
    on_click_async!(els.mint_btn, els, mint::on_mint);

    // ── Share ──
    on_click_async!(els.share_btn, els, share::on_share);
}
