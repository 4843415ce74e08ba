//! Mint controls: quantity stepper, price line, submission flow.

use pd_api_types::{MintRequest, Notice};
use pd_canvas_client::format_eth;
use pd_mint::{MintError, UNIT_PRICE_WEI, submit_mint};
use pd_referral::{FALLBACK_REWARD_ADDRESS, resolve_mint_target};

use crate::dom::{self, Elements};
use crate::notices;
use crate::state;

pub fn quantity(els: &Elements) -> u64 {
    let qty = els.qty_input.value().trim().parse::<u64>().unwrap_or(1).max(1);
    els.qty_input.set_value(&qty.to_string());
    qty
}

/// The stepper never goes below one.
pub fn on_qty_delta(els: &Elements, delta: i64) {
    let current = quantity(els) as i64;
    let next = (current + delta).max(1) as u64;
    els.qty_input.set_value(&next.to_string());
    update_price(els);
}

pub fn update_price(els: &Elements) {
    let qty = quantity(els);
    let total = UNIT_PRICE_WEI * u128::from(qty);
    dom::set_text(
        &els.price_line,
        &format!(
            "{qty} \u{00d7} {} ETH = {} ETH",
            format_eth(&UNIT_PRICE_WEI.to_string()),
            format_eth(&total.to_string())
        ),
    );
}

pub fn render_labels(els: &Elements, canvas_id: u64) {
    dom::set_text(els.mint_btn.as_ref(), &format!("Mint Canvas #{canvas_id}"));
    update_price(els);
}

pub fn set_enabled(els: &Elements, enabled: bool) {
    if enabled {
        let _ = els.mint_btn.remove_attribute("disabled");
    } else {
        let _ = els.mint_btn.set_attribute("disabled", "");
    }
}

pub async fn on_mint(els: &Elements) {
    let Some(wallet) = state::wallet() else {
        return;
    };
    let Some(canvas_id) = state::canvas_id() else {
        return;
    };

    let request = MintRequest {
        canvas_id,
        quantity: quantity(els),
        unit_price_wei: UNIT_PRICE_WEI,
        mint_target: resolve_mint_target(state::referral().as_deref(), FALLBACK_REWARD_ADDRESS),
    };

    let _ = els.mint_btn.set_attribute("disabled", "");
    dom::set_text(els.mint_btn.as_ref(), "Minting\u{2026}");

    match submit_mint(&wallet, &request).await {
        Ok(tx_hash) => {
            notices::toast(
                els,
                &Notice::success(format!("Mint submitted: {}", short_hash(&tx_hash))),
            );
        }
        Err(MintError::Rejected) => {
            // Soft, auto-dismissing: the user changed their mind, nothing
            // went wrong.
            notices::toast(els, &Notice::info("Transaction cancelled"));
        }
        Err(MintError::NotConnected) => {
            notices::toast(els, &Notice::error("Connect your wallet to mint"));
        }
        Err(err) => {
            notices::toast(els, &Notice::error(format!("Mint failed: {err}")));
        }
    }

    // The mint UI stays interactive for a retry.
    render_labels(els, canvas_id);
    set_enabled(els, wallet.session().is_connected());
}

fn short_hash(hash: &str) -> String {
    if hash.len() <= 14 {
        return hash.to_owned();
    }
    format!("{}\u{2026}{}", &hash[..10], &hash[hash.len() - 4..])
}
