//! Auth coordinator.
//!
//! Reconciles the host identity adapter and the wallet session manager into
//! one derived [`AuthState`], decides which connect flow runs on startup,
//! and publishes every transition to explicit subscribers. The identity and
//! wallet axes vary independently once resolved: anonymous, identity-only,
//! identity+wallet, or wallet-only.

use pd_api_types::{AuthState, ConnectorDescriptor, Notice, NoticeSink, User};
use pd_host_identity::{IdentityAdapter, SignInOutcome};
use pd_wallet_session::WalletSessionManager;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Uninitialized,
    Resolving,
    Ready,
}

type StateListener = Box<dyn Fn(&AuthState)>;

pub struct AuthCoordinator {
    identity: Rc<IdentityAdapter>,
    wallet: Rc<WalletSessionManager>,
    notices: Rc<dyn NoticeSink>,
    phase: Cell<AuthPhase>,
    subscribers: RefCell<Vec<(Uuid, StateListener)>>,
}

impl AuthCoordinator {
    /// Wires itself to both state sources; any identity or session change
    /// republishes the derived state.
    pub fn new(
        identity: Rc<IdentityAdapter>,
        wallet: Rc<WalletSessionManager>,
        notices: Rc<dyn NoticeSink>,
    ) -> Rc<Self> {
        let coordinator = Rc::new(Self {
            identity,
            wallet,
            notices,
            phase: Cell::new(AuthPhase::Uninitialized),
            subscribers: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&coordinator);
        coordinator.identity.subscribe(Box::new(move |_| {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.publish();
            }
        }));

        let weak = Rc::downgrade(&coordinator);
        coordinator.wallet.subscribe(Box::new(move |_| {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.publish();
            }
        }));

        coordinator
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase.get()
    }

    pub fn identity(&self) -> &Rc<IdentityAdapter> {
        &self.identity
    }

    pub fn wallet(&self) -> &Rc<WalletSessionManager> {
        &self.wallet
    }

    /// Derived snapshot, recomputed from both sources on every call.
    pub fn state(&self) -> AuthState {
        AuthState::derive(self.identity.current_user(), self.wallet.session())
    }

    /// Startup sequence. Inside the host: one global quick-auth attempt
    /// (silent on failure). Outside: passive context resolution only. Either
    /// way the embedded wallet auto-connect runs once and the rest of the UI
    /// is never blocked.
    pub async fn start(&self) {
        self.phase.set(AuthPhase::Resolving);
        self.publish();

        self.identity.initialize().await;

        if self.identity.detect_host_environment().await {
            if let Some(user) = self.identity.quick_authenticate().await {
                self.notices
                    .notice(Notice::success(format!("Welcome, {}!", user.label())));
            }
        } else if self.identity.resolve_context().await.is_none() {
            debug!("no ambient session outside the host");
        }

        self.wallet.auto_connect().await;

        self.phase.set(AuthPhase::Ready);
        self.publish();
    }

    /// User-triggered sign-in; its outcome short-circuits whatever the
    /// startup checks resolved. Cancellation and failure differ only in the
    /// message shown.
    pub async fn sign_in(&self) -> Option<User> {
        match self.identity.explicit_sign_in().await {
            SignInOutcome::SignedIn(user) => {
                self.notices
                    .notice(Notice::success(format!("Welcome, {}!", user.label())));
                Some(user)
            }
            SignInOutcome::Cancelled => {
                self.notices.notice(Notice::error("Sign-in was cancelled"));
                None
            }
            SignInOutcome::Failed => {
                self.notices.notice(Notice::error("Failed to sign in"));
                None
            }
        }
    }

    /// Advisory: when the signed-in identity carries an embedded wallet
    /// address and no connector session is active, suggest the embedded
    /// connector. Never forces a connect.
    pub fn connector_suggestion(&self) -> Option<ConnectorDescriptor> {
        let state = self.state();
        if state.wallet.is_connected() {
            return None;
        }
        state.user.as_ref()?.custody_address.as_ref()?;
        self.wallet.list_connectors().into_iter().find(|c| c.embedded)
    }

    pub fn subscribe(&self, listener: StateListener) -> Uuid {
        let id = Uuid::new_v4();
        self.subscribers.borrow_mut().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.subscribers.borrow_mut().retain(|(entry, _)| *entry != id);
    }

    fn publish(&self) {
        let state = self.state();
        for (_, listener) in self.subscribers.borrow().iter() {
            listener(&state);
        }
    }
}
