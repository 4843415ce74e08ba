//! Global application state.
//!
//! `RefCell`-wrapped `thread_local!` storage (WASM is single-threaded). The
//! render generation guards DOM updates that race a newer reload: bump it
//! when a flow restarts, check it after every await.

use pd_auth::AuthCoordinator;
use pd_wallet_session::WalletSessionManager;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
pub struct AppState {
    pub coordinator: Option<Rc<AuthCoordinator>>,
    pub wallet: Option<Rc<WalletSessionManager>>,
    pub referral: Option<String>,
    pub canvas_id: Option<u64>,
    pub generation: u64,
}

thread_local! {
    static STATE: RefCell<AppState> = RefCell::new(AppState::default());
}

pub fn with<F, R>(f: F) -> R
where
    F: FnOnce(&AppState) -> R,
{
    STATE.with(|s| f(&s.borrow()))
}

pub fn with_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut AppState) -> R,
{
    STATE.with(|s| f(&mut s.borrow_mut()))
}

// ── Convenience accessors ──

pub fn set_services(coordinator: Rc<AuthCoordinator>, wallet: Rc<WalletSessionManager>) {
    with_mut(|s| {
        s.coordinator = Some(coordinator);
        s.wallet = Some(wallet);
    });
}

pub fn coordinator() -> Option<Rc<AuthCoordinator>> {
    with(|s| s.coordinator.clone())
}

pub fn wallet() -> Option<Rc<WalletSessionManager>> {
    with(|s| s.wallet.clone())
}

pub fn set_referral(referral: Option<String>) {
    with_mut(|s| s.referral = referral);
}

pub fn referral() -> Option<String> {
    with(|s| s.referral.clone())
}

pub fn set_canvas(canvas_id: u64) {
    with_mut(|s| s.canvas_id = Some(canvas_id));
}

pub fn canvas_id() -> Option<u64> {
    with(|s| s.canvas_id)
}

pub fn bump_generation() -> u64 {
    with_mut(|s| {
        s.generation += 1;
        s.generation
    })
}

pub fn generation_is(generation: u64) -> bool {
    with(|s| s.generation == generation)
}
