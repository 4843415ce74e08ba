use serde::{Deserialize, Serialize};

/// Identity resolved from the mini-app host (quick-auth, explicit sign-in,
/// or ambient context). Immutable snapshot, replaced wholesale on
/// re-resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub fid: u64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
    pub custody_address: Option<String>,
}

impl User {
    /// Name shown in the UI: display name, else username, else a generic label.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Mini-app user")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected { address: String, chain_id: u64 },
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectorDescriptor {
    pub id: String,
    pub display_name: String,
    /// True for the host-embedded connector (the social platform's wallet).
    pub embedded: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletSession {
    pub state: ConnectionState,
    pub connectors: Vec<ConnectorDescriptor>,
}

impl WalletSession {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    pub fn address(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Connected { address, .. } => Some(address),
            _ => None,
        }
    }

    pub fn chain_id(&self) -> Option<u64> {
        match &self.state {
            ConnectionState::Connected { chain_id, .. } => Some(*chain_id),
            _ => None,
        }
    }

    pub fn wrong_network(&self, required_chain: u64) -> bool {
        matches!(&self.state, ConnectionState::Connected { chain_id, .. } if *chain_id != required_chain)
    }
}

/// Derived authentication snapshot published by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub wallet: WalletSession,
    pub effective_address: Option<String>,
}

impl AuthState {
    /// The only constructor: `effective_address` is recomputed from the two
    /// inputs on every derivation, never cached.
    pub fn derive(user: Option<User>, wallet: WalletSession) -> Self {
        let effective_address = wallet
            .address()
            .map(ToOwned::to_owned)
            .or_else(|| user.as_ref().and_then(|u| u.custody_address.clone()));
        Self {
            user,
            wallet,
            effective_address,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible notification. Transient notices auto-dismiss; sticky notices
/// stay until the condition that raised them resolves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub sticky: bool,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
            sticky: false,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
            sticky: false,
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
            sticky: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
            sticky: false,
        }
    }

    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }
}

/// Sink for user-visible notifications. The UI renders toasts and banners;
/// tests record.
pub trait NoticeSink {
    fn notice(&self, notice: Notice);
}

/// Sink that drops every notice. Useful where no UI is attached.
#[derive(Default)]
pub struct NullNoticeSink;

impl NoticeSink for NullNoticeSink {
    fn notice(&self, _notice: Notice) {}
}

/// One mint attempt. Constructed fresh per attempt, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MintRequest {
    pub canvas_id: u64,
    pub quantity: u64,
    pub unit_price_wei: u128,
    /// Opaque referral token resolved from the URL or the connected address.
    pub mint_target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contribution {
    pub account: String,
    pub pixels_count: u64,
}

/// Read-only canvas statistics, refreshed on a pull basis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanvasSnapshot {
    pub id: u64,
    pub total_mints: u64,
    /// Wei, decimal string (exceeds u64 in practice).
    pub total_earned_wei: String,
    pub pixels_count: u64,
    /// Ordered by pixel count descending.
    pub contributions: Vec<Contribution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_custody(address: Option<&str>) -> User {
        User {
            fid: 11831,
            username: Some("painter".to_owned()),
            display_name: None,
            pfp_url: None,
            custody_address: address.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn effective_address_prefers_connected_wallet() {
        let wallet = WalletSession {
            state: ConnectionState::Connected {
                address: "0xwallet".to_owned(),
                chain_id: 8453,
            },
            connectors: Vec::new(),
        };
        let state = AuthState::derive(Some(user_with_custody(Some("0xcustody"))), wallet);
        assert_eq!(state.effective_address.as_deref(), Some("0xwallet"));
    }

    #[test]
    fn effective_address_falls_back_to_custody_address() {
        let state = AuthState::derive(
            Some(user_with_custody(Some("0xcustody"))),
            WalletSession::default(),
        );
        assert_eq!(state.effective_address.as_deref(), Some("0xcustody"));
    }

    #[test]
    fn effective_address_absent_without_either_source() {
        let state = AuthState::derive(Some(user_with_custody(None)), WalletSession::default());
        assert_eq!(state.effective_address, None);

        let state = AuthState::derive(None, WalletSession::default());
        assert_eq!(state.effective_address, None);
    }

    #[test]
    fn wrong_network_only_while_connected() {
        let mut wallet = WalletSession::default();
        assert!(!wallet.wrong_network(8453));

        wallet.state = ConnectionState::Connected {
            address: "0xwallet".to_owned(),
            chain_id: 1,
        };
        assert!(wallet.wrong_network(8453));
        assert!(!wallet.wrong_network(1));
    }

    #[test]
    fn user_label_fallback_order() {
        let mut user = user_with_custody(None);
        user.display_name = Some("The Painter".to_owned());
        assert_eq!(user.label(), "The Painter");

        user.display_name = None;
        assert_eq!(user.label(), "painter");

        user.username = None;
        assert_eq!(user.label(), "Mini-app user");
    }
}
