//! Identity adapter over the mini-app host SDK.
//!
//! Normalizes the host's session/quick-auth/explicit-sign-in outcomes into
//! one [`User`] shape. Expected failures never cross the public boundary:
//! operations return `None`/`false` and log.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use pd_api_types::User;
use rand::{Rng, distributions::Alphanumeric};
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Whether the host implements event subscription. A first-class capability
/// value; hosts either support it fully or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSupport {
    Supported,
    Unsupported,
}

/// Outcome of the host's silent quick-auth. Newer hosts return the decoded
/// viewer alongside the token; older ones return only the token.
#[derive(Debug, Clone)]
pub struct QuickAuthGrant {
    pub token: String,
    pub user: Option<User>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    #[error("sign-in rejected by user")]
    Rejected,
    #[error("sign-in failed: {0}")]
    Other(String),
}

/// Capability interface of the mini-app host runtime.
#[async_trait(?Send)]
pub trait HostSdk {
    /// Host-ready handshake. Fails when no host is present.
    async fn ready(&self) -> Result<()>;

    /// Whether the page runs inside the mini-app host.
    async fn in_host(&self) -> Result<bool>;

    /// Ambient viewer session, if the host already considers the viewer
    /// authenticated.
    async fn viewer_context(&self) -> Result<Option<User>>;

    /// Silent token-based authentication, host-embedded contexts only.
    async fn quick_auth(&self) -> Result<QuickAuthGrant>;

    /// Interactive sign-in with a caller-supplied nonce.
    async fn sign_in(&self, nonce: &str) -> Result<User, SignInError>;

    fn event_support(&self) -> EventSupport;

    /// Register a callback for host-side context changes. No-op unless
    /// [`HostSdk::event_support`] reports [`EventSupport::Supported`].
    fn subscribe_context_changed(&self, _callback: Box<dyn Fn()>) {}
}

/// Stand-in used when no host runtime is present on the page.
#[derive(Default)]
pub struct NullHost;

#[async_trait(?Send)]
impl HostSdk for NullHost {
    async fn ready(&self) -> Result<()> {
        Err(anyhow!("mini-app host not present"))
    }

    async fn in_host(&self) -> Result<bool> {
        Ok(false)
    }

    async fn viewer_context(&self) -> Result<Option<User>> {
        Ok(None)
    }

    async fn quick_auth(&self) -> Result<QuickAuthGrant> {
        Err(anyhow!("mini-app host not present"))
    }

    async fn sign_in(&self, _nonce: &str) -> Result<User, SignInError> {
        Err(SignInError::Other("mini-app host not present".to_owned()))
    }

    fn event_support(&self) -> EventSupport {
        EventSupport::Unsupported
    }
}

/// Process-wide once-flags. Set once per page load, never reset; read-checked
/// before every attempt. Constructed once at startup and shared by `Rc`;
/// a full page reload is the only way the process restarts.
#[derive(Default)]
pub struct ProcessFlags {
    init_outcome: Cell<Option<bool>>,
    quick_auth_attempted: Cell<bool>,
}

impl ProcessFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_outcome(&self) -> Option<bool> {
        self.init_outcome.get()
    }

    fn record_init(&self, ok: bool) {
        self.init_outcome.set(Some(ok));
    }

    /// Check-and-set for the global quick-auth attempt. Returns false when an
    /// attempt was already made this page load.
    pub fn begin_quick_auth(&self) -> bool {
        if self.quick_auth_attempted.get() {
            return false;
        }
        self.quick_auth_attempted.set(true);
        true
    }

    pub fn quick_auth_attempted(&self) -> bool {
        self.quick_auth_attempted.get()
    }
}

/// Outcome of an explicit, user-triggered sign-in. Cancellation and failure
/// both resolve to "no identity"; they differ only in the message shown.
#[derive(Debug, Clone)]
pub enum SignInOutcome {
    SignedIn(User),
    Cancelled,
    Failed,
}

type IdentityListener = Box<dyn Fn(Option<&User>)>;

pub struct IdentityAdapter {
    host: Rc<dyn HostSdk>,
    flags: Rc<ProcessFlags>,
    current: RefCell<Option<User>>,
    listeners: RefCell<Vec<(Uuid, IdentityListener)>>,
}

impl IdentityAdapter {
    pub fn new(host: Rc<dyn HostSdk>, flags: Rc<ProcessFlags>) -> Self {
        Self {
            host,
            flags,
            current: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn host(&self) -> &Rc<dyn HostSdk> {
        &self.host
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.borrow().clone()
    }

    /// Host-ready handshake, at most once per page load. Subsequent calls
    /// return the cached outcome without side effects. Safe to call before
    /// the host environment exists.
    pub async fn initialize(&self) -> bool {
        if let Some(outcome) = self.flags.init_outcome() {
            return outcome;
        }
        let ok = match self.host.ready().await {
            Ok(()) => true,
            Err(err) => {
                debug!("host handshake failed: {err}");
                false
            }
        };
        self.flags.record_init(ok);
        ok
    }

    pub async fn detect_host_environment(&self) -> bool {
        self.initialize().await;
        match self.host.in_host().await {
            Ok(in_host) => in_host,
            Err(err) => {
                debug!("host detection failed: {err}");
                false
            }
        }
    }

    /// Passive read of the ambient session. No interactive prompt.
    pub async fn resolve_context(&self) -> Option<User> {
        self.initialize().await;
        match self.host.viewer_context().await {
            Ok(Some(user)) => {
                self.set_user(Some(user.clone()));
                Some(user)
            }
            Ok(None) => None,
            Err(err) => {
                debug!("context resolution failed: {err}");
                None
            }
        }
    }

    /// Silent login inside the host. Attempted at most once per page load
    /// globally, even when invoked from multiple independent UI regions; the
    /// shared attempted flag (separate from the init flag) enforces this.
    pub async fn quick_authenticate(&self) -> Option<User> {
        if !self.flags.begin_quick_auth() {
            debug!("quick-auth already attempted this page load");
            return None;
        }
        self.initialize().await;

        let grant = match self.host.quick_auth().await {
            Ok(grant) => grant,
            Err(err) => {
                debug!("quick-auth unavailable: {err}");
                return None;
            }
        };

        let user = match grant.user {
            Some(user) => user,
            None => match decode_identity_token(&grant.token) {
                Ok(user) => user,
                Err(err) => {
                    debug!("failed to decode quick-auth token payload: {err}");
                    return None;
                }
            },
        };

        self.set_user(Some(user.clone()));
        Some(user)
    }

    /// Interactive sign-in with a fresh random nonce per call. Always
    /// short-circuits whatever the ambient checks resolved.
    pub async fn explicit_sign_in(&self) -> SignInOutcome {
        self.initialize().await;
        let nonce = fresh_nonce();
        match self.host.sign_in(&nonce).await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                SignInOutcome::SignedIn(user)
            }
            Err(SignInError::Rejected) => {
                info!("sign-in rejected by user");
                SignInOutcome::Cancelled
            }
            Err(SignInError::Other(message)) => {
                warn!("sign-in failed: {message}");
                SignInOutcome::Failed
            }
        }
    }

    /// Subscribe to identity changes. Fired whenever the resolved identity
    /// is replaced, so independent UI regions react without prop drilling.
    pub fn subscribe(&self, listener: IdentityListener) -> Uuid {
        let id = Uuid::new_v4();
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.listeners.borrow_mut().retain(|(entry, _)| *entry != id);
    }

    fn set_user(&self, user: Option<User>) {
        if *self.current.borrow() == user {
            return;
        }
        *self.current.borrow_mut() = user.clone();
        for (_, listener) in self.listeners.borrow().iter() {
            listener(user.as_ref());
        }
    }
}

fn fresh_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    #[serde(default)]
    fid: Option<u64>,
    /// Older tokens carry the fid as the standard subject claim, as either
    /// a number or a decimal string.
    #[serde(default)]
    sub: Option<SubjectClaim>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
    #[serde(default, rename = "pfpUrl")]
    pfp_url: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubjectClaim {
    Number(u64),
    Text(String),
}

impl SubjectClaim {
    fn as_fid(&self) -> Option<u64> {
        match self {
            SubjectClaim::Number(fid) => Some(*fid),
            SubjectClaim::Text(text) => text.parse().ok(),
        }
    }
}

/// Decode the identity fields carried in a quick-auth token payload.
///
/// The host already authenticated this token before handing it over, so the
/// signature is not re-verified here; only the claims are read.
pub fn decode_identity_token(token: &str) -> Result<User> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<IdentityClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|err| anyhow!("invalid quick-auth token: {err}"))?;

    let claims = data.claims;
    let fid = claims
        .fid
        .or_else(|| claims.sub.as_ref().and_then(SubjectClaim::as_fid))
        .unwrap_or(0);
    Ok(User {
        fid,
        username: claims.username,
        display_name: claims.display_name,
        pfp_url: claims.pfp_url,
        custody_address: claims.address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use std::cell::Cell;

    fn viewer() -> User {
        User {
            fid: 11831,
            username: Some("painter".to_owned()),
            display_name: Some("The Painter".to_owned()),
            pfp_url: None,
            custody_address: Some("0x00000000000000000000000000000000000000aa".to_owned()),
        }
    }

    fn unsigned_token(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.sig")
    }

    /// Host double that counts handshakes and quick-auth attempts.
    #[derive(Default)]
    struct CountingHost {
        ready_calls: Cell<u32>,
        ready_ok: bool,
        quick_auth_calls: Cell<u32>,
        grant: Option<QuickAuthGrant>,
        sign_in_result: Cell<Option<Result<User, SignInError>>>,
    }

    #[async_trait(?Send)]
    impl HostSdk for CountingHost {
        async fn ready(&self) -> Result<()> {
            self.ready_calls.set(self.ready_calls.get() + 1);
            if self.ready_ok {
                Ok(())
            } else {
                Err(anyhow!("no host"))
            }
        }

        async fn in_host(&self) -> Result<bool> {
            Ok(self.ready_ok)
        }

        async fn viewer_context(&self) -> Result<Option<User>> {
            Ok(None)
        }

        async fn quick_auth(&self) -> Result<QuickAuthGrant> {
            self.quick_auth_calls.set(self.quick_auth_calls.get() + 1);
            self.grant.clone().ok_or_else(|| anyhow!("not authenticated"))
        }

        async fn sign_in(&self, _nonce: &str) -> Result<User, SignInError> {
            self.sign_in_result
                .take()
                .unwrap_or(Err(SignInError::Other("no result configured".to_owned())))
        }

        fn event_support(&self) -> EventSupport {
            EventSupport::Unsupported
        }
    }

    fn adapter_with(host: CountingHost) -> (IdentityAdapter, Rc<CountingHost>) {
        let host = Rc::new(host);
        let adapter = IdentityAdapter::new(host.clone(), Rc::new(ProcessFlags::new()));
        (adapter, host)
    }

    #[tokio::test]
    async fn initialize_runs_handshake_exactly_once() {
        let (adapter, host) = adapter_with(CountingHost {
            ready_ok: true,
            ..CountingHost::default()
        });

        assert!(adapter.initialize().await);
        assert!(adapter.initialize().await);
        assert!(adapter.initialize().await);
        assert_eq!(host.ready_calls.get(), 1);
    }

    #[tokio::test]
    async fn initialize_caches_failure_outside_host() {
        let (adapter, host) = adapter_with(CountingHost::default());

        assert!(!adapter.initialize().await);
        assert!(!adapter.initialize().await);
        assert_eq!(host.ready_calls.get(), 1);
    }

    #[tokio::test]
    async fn quick_auth_attempted_at_most_once_globally() {
        let flags = Rc::new(ProcessFlags::new());
        let host: Rc<CountingHost> = Rc::new(CountingHost {
            ready_ok: true,
            grant: Some(QuickAuthGrant {
                token: String::new(),
                user: Some(viewer()),
            }),
            ..CountingHost::default()
        });

        // Two independently mounted UI regions sharing the process flags.
        let first = IdentityAdapter::new(host.clone(), flags.clone());
        let second = IdentityAdapter::new(host.clone(), flags.clone());

        assert!(first.quick_authenticate().await.is_some());
        assert!(second.quick_authenticate().await.is_none());
        assert!(first.quick_authenticate().await.is_none());
        assert_eq!(host.quick_auth_calls.get(), 1);
    }

    #[tokio::test]
    async fn quick_auth_decodes_token_when_grant_omits_user() {
        let token = unsigned_token(serde_json::json!({
            "fid": 11831,
            "username": "painter",
            "displayName": "The Painter",
            "pfpUrl": "https://img.example/pfp.png",
        }));
        let (adapter, _) = adapter_with(CountingHost {
            ready_ok: true,
            grant: Some(QuickAuthGrant { token, user: None }),
            ..CountingHost::default()
        });

        let user = adapter.quick_authenticate().await.expect("identity");
        assert_eq!(user.fid, 11831);
        assert_eq!(user.username.as_deref(), Some("painter"));
        assert_eq!(user.display_name.as_deref(), Some("The Painter"));
        assert_eq!(adapter.current_user(), Some(user));
    }

    #[tokio::test]
    async fn quick_auth_fails_silently_on_malformed_token() {
        let (adapter, _) = adapter_with(CountingHost {
            ready_ok: true,
            grant: Some(QuickAuthGrant {
                token: "not-a-token".to_owned(),
                user: None,
            }),
            ..CountingHost::default()
        });

        assert!(adapter.quick_authenticate().await.is_none());
        assert_eq!(adapter.current_user(), None);
    }

    #[tokio::test]
    async fn sign_in_distinguishes_cancellation_from_failure() {
        let (adapter, host) = adapter_with(CountingHost {
            ready_ok: true,
            ..CountingHost::default()
        });

        host.sign_in_result.set(Some(Err(SignInError::Rejected)));
        assert!(matches!(
            adapter.explicit_sign_in().await,
            SignInOutcome::Cancelled
        ));

        host.sign_in_result
            .set(Some(Err(SignInError::Other("boom".to_owned()))));
        assert!(matches!(
            adapter.explicit_sign_in().await,
            SignInOutcome::Failed
        ));

        host.sign_in_result.set(Some(Ok(viewer())));
        assert!(matches!(
            adapter.explicit_sign_in().await,
            SignInOutcome::SignedIn(_)
        ));
        assert_eq!(adapter.current_user(), Some(viewer()));
    }

    #[tokio::test]
    async fn identity_change_notifies_subscribers_once_per_change() {
        let (adapter, host) = adapter_with(CountingHost {
            ready_ok: true,
            ..CountingHost::default()
        });

        let seen = Rc::new(Cell::new(0u32));
        let seen_in_listener = seen.clone();
        adapter.subscribe(Box::new(move |_| {
            seen_in_listener.set(seen_in_listener.get() + 1);
        }));

        host.sign_in_result.set(Some(Ok(viewer())));
        adapter.explicit_sign_in().await;
        assert_eq!(seen.get(), 1);

        // Same identity again: no change, no notification.
        host.sign_in_result.set(Some(Ok(viewer())));
        adapter.explicit_sign_in().await;
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn decode_identity_token_defaults_missing_fid_to_zero() {
        let token = unsigned_token(serde_json::json!({ "username": "painter" }));
        let user = decode_identity_token(&token).expect("claims");
        assert_eq!(user.fid, 0);
        assert_eq!(user.username.as_deref(), Some("painter"));
    }

    #[test]
    fn decode_identity_token_reads_fid_from_subject_claim() {
        let token = unsigned_token(serde_json::json!({ "sub": "11831" }));
        assert_eq!(decode_identity_token(&token).expect("claims").fid, 11831);

        let token = unsigned_token(serde_json::json!({ "sub": 11831 }));
        assert_eq!(decode_identity_token(&token).expect("claims").fid, 11831);
    }

    #[test]
    fn fresh_nonce_is_random_per_call() {
        let a = fresh_nonce();
        let b = fresh_nonce();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
