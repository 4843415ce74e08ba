//! PaintDay mini-app frontend.
//!
//! Pure Rust + WASM presentation layer. Each concern lives in its own
//! module; the core auth/wallet/mint flow comes from the `pd-*` crates and
//! this crate only binds it to the page.

pub mod auth;
pub mod canvas;
pub mod dom;
pub mod events;
pub mod host;
pub mod mint;
pub mod notices;
pub mod provider;
pub mod share;
pub mod state;
pub mod wallet;

use pd_auth::AuthCoordinator;
use pd_host_identity::{HostSdk, IdentityAdapter, NullHost, ProcessFlags};
use pd_mint::{CHAIN_LABEL, REQUIRED_CHAIN_ID};
use pd_wallet_session::WalletSessionManager;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    // Improve panic messages in the browser console
    console_error_panic_hook::set_once();

    init().await
}

/// Main initialisation sequence.
async fn init() -> Result<(), JsValue> {
    let els = dom::Elements::bind()?;

    let href = dom::window()
        .location()
        .href()
        .unwrap_or_default();

    // Referral context is immutable for the page lifetime.
    let referral = pd_referral::extract_from_url(&href);
    if let Some(value) = &referral {
        dom::set_text(&els.referral_line, &format!("Referred by: {value}"));
        dom::show(&els.referral_line);
    }
    state::set_referral(referral);

    // `miniApp=true` or a `/mini` path forces the host handshake even when
    // detection says we are outside the host.
    let forced = host_forced(&href);
    let host: Rc<dyn HostSdk> = match host::JsHostSdk::detect(forced) {
        Some(sdk) => Rc::new(sdk),
        None => Rc::new(NullHost),
    };

    let flags = Rc::new(ProcessFlags::new());
    let identity = Rc::new(IdentityAdapter::new(host, flags));
    let notice_sink = Rc::new(notices::DomNoticeSink::new(els.clone()));
    let wallet_provider = Rc::new(provider::JsWalletProvider::detect());
    let wallet = Rc::new(WalletSessionManager::new(
        wallet_provider.clone(),
        REQUIRED_CHAIN_ID,
        CHAIN_LABEL,
        notice_sink.clone(),
    ));
    // Externally-triggered wallet mutations (account/network switches in the
    // wallet itself) flow into the session manager.
    provider::bind_session_events(&wallet_provider, wallet.clone());

    // Host-side context changes replace the resolved identity wholesale.
    {
        let identity2 = identity.clone();
        identity.host().subscribe_context_changed(Box::new(move || {
            let identity3 = identity2.clone();
            spawn_local(async move {
                identity3.resolve_context().await;
            });
        }));
    }

    let coordinator = AuthCoordinator::new(identity, wallet.clone(), notice_sink);

    {
        let els = els.clone();
        coordinator.subscribe(Box::new(move |auth_state| {
            auth::render(&els, auth_state);
            wallet::render(&els, auth_state);
        }));
    }

    state::set_services(coordinator.clone(), wallet);

    events::bind_events(&els);
    auth::render(&els, &coordinator.state());
    wallet::render(&els, &coordinator.state());
    mint::update_price(&els);

    {
        let els = els.clone();
        spawn_local(async move {
            coordinator.start().await;
            wallet::render_suggestion(&els);
        });
    }

    {
        let els = els.clone();
        spawn_local(async move {
            canvas::load_canvas(&els).await;
        });
    }

    Ok(())
}

/// Recognized host-forcing URL shapes.
fn host_forced(href: &str) -> bool {
    let Ok(parsed) = url::Url::parse(href) else {
        return false;
    };
    if parsed.path().starts_with("/mini") {
        return true;
    }
    parsed
        .query_pairs()
        .any(|(key, value)| key == "miniApp" && value == "true")
}
