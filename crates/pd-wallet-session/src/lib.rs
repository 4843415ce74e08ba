//! Wallet session manager.
//!
//! Tracks the wallet provider's connection state, enforces the
//! correct-network invariant, and exposes connect/disconnect/switch
//! operations. Connection failures surface as notices and never leave
//! partial state behind.

use anyhow::Result;
use async_trait::async_trait;
use pd_api_types::{ConnectionState, ConnectorDescriptor, Notice, NoticeSink, WalletSession};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};
use uuid::Uuid;

/// `eth_sendTransaction` wire shape: 0x-hex strings throughout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub to: String,
    pub data: String,
    pub value: String,
}

/// Error surfaced by a wallet provider. Carries whatever the underlying
/// wallet reported so user rejection stays recognizable regardless of which
/// wallet produced it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<i64>,
    pub name: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            name: None,
            message: message.into(),
        }
    }
}

/// Capability interface of the browser wallet layer.
#[async_trait(?Send)]
pub trait WalletProvider {
    fn connectors(&self) -> Vec<ConnectorDescriptor>;

    /// Returns the connected account address and active chain id.
    async fn connect(&self, connector_id: &str) -> Result<(String, u64)>;

    async fn disconnect(&self) -> Result<()>;

    async fn switch_chain(&self, chain_id: u64) -> Result<()>;

    async fn send_transaction(&self, tx: &PreparedTransaction) -> Result<String, ProviderError>;
}

type SessionListener = Box<dyn Fn(&WalletSession)>;

pub struct WalletSessionManager {
    provider: Rc<dyn WalletProvider>,
    required_chain: u64,
    chain_label: String,
    session: RefCell<WalletSession>,
    auto_connect_attempted: Cell<bool>,
    chain_switch_attempted: Cell<bool>,
    notices: Rc<dyn NoticeSink>,
    listeners: RefCell<Vec<(Uuid, SessionListener)>>,
}

impl WalletSessionManager {
    pub fn new(
        provider: Rc<dyn WalletProvider>,
        required_chain: u64,
        chain_label: impl Into<String>,
        notices: Rc<dyn NoticeSink>,
    ) -> Self {
        let connectors = order_connectors(provider.connectors());
        Self {
            provider,
            required_chain,
            chain_label: chain_label.into(),
            session: RefCell::new(WalletSession {
                state: ConnectionState::Disconnected,
                connectors,
            }),
            auto_connect_attempted: Cell::new(false),
            chain_switch_attempted: Cell::new(false),
            notices,
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn required_chain(&self) -> u64 {
        self.required_chain
    }

    pub fn session(&self) -> WalletSession {
        self.session.borrow().clone()
    }

    pub fn wrong_network(&self) -> bool {
        self.session.borrow().wrong_network(self.required_chain)
    }

    /// Connector list for the connect menu: the embedded connector first
    /// (stable otherwise), and the generic unnamed injected entry dropped
    /// when a more specific connector covers the same capability.
    pub fn list_connectors(&self) -> Vec<ConnectorDescriptor> {
        let connectors = order_connectors(self.provider.connectors());
        self.session.borrow_mut().connectors = connectors.clone();
        connectors
    }

    pub async fn connect(&self, connector_id: &str) -> bool {
        self.set_state(ConnectionState::Connecting);

        match self.provider.connect(connector_id).await {
            Ok((address, chain_id)) => {
                // New connection transition: the automatic chain switch may
                // fire again.
                self.chain_switch_attempted.set(false);
                self.set_state(ConnectionState::Connected { address, chain_id });
                self.ensure_correct_chain().await;
                true
            }
            Err(err) => {
                warn!("wallet connect failed: {err}");
                self.notices.notice(Notice::error("Failed to connect wallet"));
                self.set_state(ConnectionState::Disconnected);
                false
            }
        }
    }

    pub async fn disconnect(&self) {
        if let Err(err) = self.provider.disconnect().await {
            debug!("provider disconnect reported: {err}");
        }
        self.set_state(ConnectionState::Disconnected);
        self.notices.notice(Notice::success("Wallet disconnected"));
    }

    /// Once connected to the wrong chain, request a switch exactly once per
    /// connection transition. On failure the warning stays visible (sticky)
    /// until the chain resolves or the wallet disconnects.
    pub async fn ensure_correct_chain(&self) {
        if !self.wrong_network() {
            return;
        }
        if self.chain_switch_attempted.get() {
            return;
        }
        self.chain_switch_attempted.set(true);

        match self.provider.switch_chain(self.required_chain).await {
            Ok(()) => {
                if let ConnectionState::Connected { chain_id, .. } =
                    &mut self.session.borrow_mut().state
                {
                    *chain_id = self.required_chain;
                }
                self.notices
                    .notice(Notice::success(format!("Switched to {}", self.chain_label)));
                self.publish();
            }
            Err(err) => {
                warn!("automatic chain switch failed: {err}");
                self.notices.notice(
                    Notice::warning(format!(
                        "Please switch to {} manually",
                        self.chain_label
                    ))
                    .sticky(),
                );
            }
        }
    }

    /// Connect the embedded connector if one is available, at most once per
    /// page load. Never retried afterwards, so an explicit disconnect does
    /// not start a connect loop.
    pub async fn auto_connect(&self) -> bool {
        if self.session.borrow().is_connected() || self.auto_connect_attempted.get() {
            return false;
        }
        let Some(embedded) = self
            .provider
            .connectors()
            .into_iter()
            .find(|c| c.embedded)
        else {
            return false;
        };
        self.auto_connect_attempted.set(true);
        self.connect(&embedded.id).await
    }

    /// Externally-triggered chain change (user switched networks in their
    /// wallet). Does not re-arm the automatic switch.
    pub fn on_chain_changed(&self, chain_id: u64) {
        let mut session = self.session.borrow_mut();
        if let ConnectionState::Connected { chain_id: current, .. } = &mut session.state {
            *current = chain_id;
            drop(session);
            self.publish();
        }
    }

    /// Externally-triggered account change; `None` means the wallet
    /// disconnected on its own.
    pub fn on_accounts_changed(&self, account: Option<String>) {
        match account {
            Some(address) => {
                let mut session = self.session.borrow_mut();
                if let ConnectionState::Connected { address: current, .. } = &mut session.state {
                    *current = address;
                    drop(session);
                    self.publish();
                }
            }
            None => self.set_state(ConnectionState::Disconnected),
        }
    }

    pub async fn send_transaction(
        &self,
        tx: &PreparedTransaction,
    ) -> Result<String, ProviderError> {
        self.provider.send_transaction(tx).await
    }

    pub fn subscribe(&self, listener: SessionListener) -> Uuid {
        let id = Uuid::new_v4();
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.listeners.borrow_mut().retain(|(entry, _)| *entry != id);
    }

    fn set_state(&self, state: ConnectionState) {
        self.session.borrow_mut().state = state;
        self.publish();
    }

    fn publish(&self) {
        let snapshot = self.session.borrow().clone();
        for (_, listener) in self.listeners.borrow().iter() {
            listener(&snapshot);
        }
    }
}

fn is_generic_injected(connector: &ConnectorDescriptor) -> bool {
    connector.id == "injected" && connector.display_name == "Injected"
}

fn order_connectors(mut connectors: Vec<ConnectorDescriptor>) -> Vec<ConnectorDescriptor> {
    if connectors.iter().any(|c| !is_generic_injected(c)) {
        connectors.retain(|c| !is_generic_injected(c));
    }
    connectors.sort_by_key(|c| !c.embedded);
    connectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pd_api_types::NoticeLevel;

    #[derive(Default)]
    struct RecordingSink {
        notices: RefCell<Vec<Notice>>,
    }

    impl NoticeSink for RecordingSink {
        fn notice(&self, notice: Notice) {
            self.notices.borrow_mut().push(notice);
        }
    }

    struct FakeProvider {
        connectors: Vec<ConnectorDescriptor>,
        connect_result: RefCell<Result<(String, u64)>>,
        switch_ok: Cell<bool>,
        switch_calls: Cell<u32>,
        connect_calls: Cell<u32>,
    }

    impl FakeProvider {
        fn new(connectors: Vec<ConnectorDescriptor>) -> Self {
            Self {
                connectors,
                connect_result: RefCell::new(Ok(("0xabc".to_owned(), 8453))),
                switch_ok: Cell::new(true),
                switch_calls: Cell::new(0),
                connect_calls: Cell::new(0),
            }
        }
    }

    #[async_trait(?Send)]
    impl WalletProvider for FakeProvider {
        fn connectors(&self) -> Vec<ConnectorDescriptor> {
            self.connectors.clone()
        }

        async fn connect(&self, _connector_id: &str) -> Result<(String, u64)> {
            self.connect_calls.set(self.connect_calls.get() + 1);
            match &*self.connect_result.borrow() {
                Ok(ok) => Ok(ok.clone()),
                Err(err) => Err(anyhow!("{err}")),
            }
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn switch_chain(&self, _chain_id: u64) -> Result<()> {
            self.switch_calls.set(self.switch_calls.get() + 1);
            if self.switch_ok.get() {
                Ok(())
            } else {
                Err(anyhow!("switch rejected"))
            }
        }

        async fn send_transaction(
            &self,
            _tx: &PreparedTransaction,
        ) -> Result<String, ProviderError> {
            Ok("0xhash".to_owned())
        }
    }

    fn connector(id: &str, name: &str, embedded: bool) -> ConnectorDescriptor {
        ConnectorDescriptor {
            id: id.to_owned(),
            display_name: name.to_owned(),
            embedded,
        }
    }

    fn manager(provider: Rc<FakeProvider>, sink: Rc<RecordingSink>) -> WalletSessionManager {
        WalletSessionManager::new(provider, 8453, "Base", sink)
    }

    #[test]
    fn connector_list_puts_embedded_first_and_drops_generic_injected() {
        let provider = Rc::new(FakeProvider::new(vec![
            connector("injected", "Injected", false),
            connector("walletConnect", "WalletConnect", false),
            connector("hostEmbedded", "Host Wallet", true),
        ]));
        let mgr = manager(provider, Rc::new(RecordingSink::default()));

        let ids: Vec<String> = mgr.list_connectors().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["hostEmbedded", "walletConnect"]);
    }

    #[test]
    fn lone_generic_injected_connector_is_kept() {
        let provider = Rc::new(FakeProvider::new(vec![connector(
            "injected", "Injected", false,
        )]));
        let mgr = manager(provider, Rc::new(RecordingSink::default()));
        assert_eq!(mgr.list_connectors().len(), 1);
    }

    #[tokio::test]
    async fn failed_connect_leaves_no_partial_state_and_notifies() {
        let provider = Rc::new(FakeProvider::new(vec![connector(
            "walletConnect",
            "WalletConnect",
            false,
        )]));
        *provider.connect_result.borrow_mut() = Err(anyhow!("user closed modal"));
        let sink = Rc::new(RecordingSink::default());
        let mgr = manager(provider, sink.clone());

        assert!(!mgr.connect("walletConnect").await);
        assert_eq!(mgr.session().state, ConnectionState::Disconnected);

        let notices = sink.notices.borrow();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn chain_switch_fires_once_per_connection_transition() {
        let provider = Rc::new(FakeProvider::new(vec![connector(
            "walletConnect",
            "WalletConnect",
            false,
        )]));
        // Wallet lands on mainnet; switch request itself is refused.
        *provider.connect_result.borrow_mut() = Ok(("0xabc".to_owned(), 1));
        provider.switch_ok.set(false);
        let sink = Rc::new(RecordingSink::default());
        let mgr = manager(provider.clone(), sink.clone());

        assert!(mgr.connect("walletConnect").await);
        assert_eq!(provider.switch_calls.get(), 1);
        assert!(mgr.wrong_network());

        // Still on the wrong chain: no automatic refire without a
        // disconnect/reconnect cycle.
        mgr.ensure_correct_chain().await;
        mgr.ensure_correct_chain().await;
        assert_eq!(provider.switch_calls.get(), 1);

        // The warning stays sticky.
        assert!(
            sink.notices
                .borrow()
                .iter()
                .any(|n| n.sticky && n.level == NoticeLevel::Warning)
        );

        // Reconnecting re-arms the one-shot switch.
        mgr.disconnect().await;
        assert!(mgr.connect("walletConnect").await);
        assert_eq!(provider.switch_calls.get(), 2);
    }

    #[tokio::test]
    async fn successful_chain_switch_updates_session() {
        let provider = Rc::new(FakeProvider::new(vec![connector(
            "walletConnect",
            "WalletConnect",
            false,
        )]));
        *provider.connect_result.borrow_mut() = Ok(("0xabc".to_owned(), 1));
        let mgr = manager(provider, Rc::new(RecordingSink::default()));

        assert!(mgr.connect("walletConnect").await);
        assert_eq!(mgr.session().chain_id(), Some(8453));
        assert!(!mgr.wrong_network());
    }

    #[tokio::test]
    async fn auto_connect_attempts_embedded_connector_exactly_once() {
        let provider = Rc::new(FakeProvider::new(vec![
            connector("walletConnect", "WalletConnect", false),
            connector("hostEmbedded", "Host Wallet", true),
        ]));
        let mgr = manager(provider.clone(), Rc::new(RecordingSink::default()));

        assert!(mgr.auto_connect().await);
        assert_eq!(provider.connect_calls.get(), 1);

        // Explicit disconnect must not trigger a reconnect loop.
        mgr.disconnect().await;
        assert!(!mgr.auto_connect().await);
        assert_eq!(provider.connect_calls.get(), 1);
    }

    #[tokio::test]
    async fn auto_connect_is_noop_without_embedded_connector() {
        let provider = Rc::new(FakeProvider::new(vec![connector(
            "walletConnect",
            "WalletConnect",
            false,
        )]));
        let mgr = manager(provider.clone(), Rc::new(RecordingSink::default()));

        assert!(!mgr.auto_connect().await);
        assert_eq!(provider.connect_calls.get(), 0);
        // The one-shot attempt is only spent when an embedded connector exists.
        assert!(!mgr.auto_connect_attempted.get());
    }

    #[tokio::test]
    async fn external_account_and_chain_events_update_session() {
        let provider = Rc::new(FakeProvider::new(vec![connector(
            "walletConnect",
            "WalletConnect",
            false,
        )]));
        let mgr = manager(provider, Rc::new(RecordingSink::default()));
        assert!(mgr.connect("walletConnect").await);

        mgr.on_chain_changed(1);
        assert_eq!(mgr.session().chain_id(), Some(1));
        assert!(mgr.wrong_network());

        mgr.on_accounts_changed(Some("0xdef".to_owned()));
        assert_eq!(mgr.session().address(), Some("0xdef"));

        mgr.on_accounts_changed(None);
        assert_eq!(mgr.session().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn session_changes_reach_subscribers() {
        let provider = Rc::new(FakeProvider::new(vec![connector(
            "walletConnect",
            "WalletConnect",
            false,
        )]));
        let mgr = manager(provider, Rc::new(RecordingSink::default()));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_listener = seen.clone();
        let id = mgr.subscribe(Box::new(move |session: &WalletSession| {
            seen_in_listener.borrow_mut().push(session.is_connected());
        }));

        mgr.connect("walletConnect").await;
        assert_eq!(*seen.borrow(), vec![false, true]); // connecting, connected

        mgr.unsubscribe(id);
        mgr.disconnect().await;
        assert_eq!(seen.borrow().len(), 2);
    }
}
