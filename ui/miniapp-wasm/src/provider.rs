//! EIP-1193 wallet provider binding.
//!
//! Two provider sources: the host SDK's embedded wallet and the page's
//! injected `window.ethereum`. Both are detected once at startup; connector
//! descriptors are capability-tagged so the session manager can order and
//! filter them.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect};
use pd_api_types::ConnectorDescriptor;
use pd_wallet_session::{PreparedTransaction, ProviderError, WalletProvider, WalletSessionManager};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::dom;
use crate::host::HOST_GLOBAL;

pub const HOST_CONNECTOR_ID: &str = "hostEmbedded";
pub const INJECTED_CONNECTOR_ID: &str = "injected";

pub struct JsWalletProvider {
    host_provider: Option<Object>,
    injected: Option<Object>,
    active: RefCell<Option<Object>>,
}

impl JsWalletProvider {
    pub fn detect() -> Self {
        let window = dom::window();

        let host_provider = Reflect::get(window.as_ref(), &JsValue::from_str(HOST_GLOBAL))
            .ok()
            .filter(|sdk| sdk.is_object())
            .and_then(|sdk| Reflect::get(&sdk, &JsValue::from_str("wallet")).ok())
            .and_then(|wallet| Reflect::get(&wallet, &JsValue::from_str("ethProvider")).ok())
            .and_then(|provider| provider.dyn_into::<Object>().ok());

        let injected = Reflect::get(window.as_ref(), &JsValue::from_str("ethereum"))
            .ok()
            .and_then(|provider| provider.dyn_into::<Object>().ok());

        Self {
            host_provider,
            injected,
            active: RefCell::new(None),
        }
    }

    fn provider_for(&self, connector_id: &str) -> Option<Object> {
        match connector_id {
            HOST_CONNECTOR_ID => self.host_provider.clone(),
            INJECTED_CONNECTOR_ID => self.injected.clone(),
            _ => None,
        }
    }

    fn active_provider(&self) -> Result<Object, ProviderError> {
        self.active
            .borrow()
            .clone()
            .ok_or_else(|| ProviderError::message("no wallet provider connected"))
    }

    async fn request(
        provider: &Object,
        method: &str,
        params: serde_json::Value,
    ) -> Result<JsValue, ProviderError> {
        let request: Function = Reflect::get(provider, &JsValue::from_str("request"))
            .map_err(|err| provider_error(&err))?
            .dyn_into()
            .map_err(|_| ProviderError::message("provider has no request function"))?;

        let args = serde_wasm_bindgen::to_value(&serde_json::json!({
            "method": method,
            "params": params,
        }))
        .map_err(|err| ProviderError::message(err.to_string()))?;

        let returned = request
            .call1(provider, &args)
            .map_err(|err| provider_error(&err))?;

        match returned.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .map_err(|err| provider_error(&err)),
            Err(value) => Ok(value),
        }
    }

    async fn account_of(provider: &Object) -> Result<String, ProviderError> {
        let accounts =
            Self::request(provider, "eth_accounts", serde_json::json!([])).await?;
        first_account(&accounts)
            .ok_or_else(|| ProviderError::message("no account connected"))
    }
}

#[async_trait(?Send)]
impl WalletProvider for JsWalletProvider {
    fn connectors(&self) -> Vec<ConnectorDescriptor> {
        let mut connectors = Vec::new();
        if self.host_provider.is_some() {
            connectors.push(ConnectorDescriptor {
                id: HOST_CONNECTOR_ID.to_owned(),
                display_name: "Host Wallet".to_owned(),
                embedded: true,
            });
        }
        if self.injected.is_some() {
            connectors.push(ConnectorDescriptor {
                id: INJECTED_CONNECTOR_ID.to_owned(),
                display_name: "Injected".to_owned(),
                embedded: false,
            });
        }
        connectors
    }

    async fn connect(&self, connector_id: &str) -> Result<(String, u64)> {
        let provider = self
            .provider_for(connector_id)
            .ok_or_else(|| anyhow!("unknown connector: {connector_id}"))?;

        let accounts =
            Self::request(&provider, "eth_requestAccounts", serde_json::json!([]))
                .await
                .map_err(|err| anyhow!("{err}"))?;
        let address = first_account(&accounts)
            .ok_or_else(|| anyhow!("wallet returned no accounts"))?;

        let chain_hex = Self::request(&provider, "eth_chainId", serde_json::json!([]))
            .await
            .map_err(|err| anyhow!("{err}"))?
            .as_string()
            .ok_or_else(|| anyhow!("wallet returned no chain id"))?;
        let chain_id = parse_chain_id(&chain_hex)?;

        *self.active.borrow_mut() = Some(provider);
        Ok((address, chain_id))
    }

    async fn disconnect(&self) -> Result<()> {
        *self.active.borrow_mut() = None;
        Ok(())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        let provider = self.active_provider().map_err(|err| anyhow!("{err}"))?;
        Self::request(
            &provider,
            "wallet_switchEthereumChain",
            serde_json::json!([{ "chainId": format!("0x{chain_id:x}") }]),
        )
        .await
        .map_err(|err| anyhow!("{err}"))?;
        Ok(())
    }

    async fn send_transaction(&self, tx: &PreparedTransaction) -> Result<String, ProviderError> {
        let provider = self.active_provider()?;
        let from = Self::account_of(&provider).await?;

        let result = Self::request(
            &provider,
            "eth_sendTransaction",
            serde_json::json!([{
                "from": from,
                "to": tx.to,
                "value": tx.value,
                "data": tx.data,
            }]),
        )
        .await?;

        result
            .as_string()
            .ok_or_else(|| ProviderError::message("wallet returned no transaction hash"))
    }
}

/// Route the providers' own `accountsChanged`/`chainChanged` notifications
/// into the session manager. A provider without an `on` function simply
/// never reports external changes.
pub fn bind_session_events(provider: &JsWalletProvider, wallet: Rc<WalletSessionManager>) {
    for source in [provider.host_provider.as_ref(), provider.injected.as_ref()]
        .into_iter()
        .flatten()
    {
        bind_events_on(source, wallet.clone());
    }
}

fn bind_events_on(provider: &Object, wallet: Rc<WalletSessionManager>) {
    let Ok(on) = Reflect::get(provider, &JsValue::from_str("on")) else {
        return;
    };
    let Ok(on) = on.dyn_into::<Function>() else {
        return;
    };

    let wallet_accounts = wallet.clone();
    let accounts_cb = Closure::wrap(Box::new(move |accounts: JsValue| {
        wallet_accounts.on_accounts_changed(first_account(&accounts));
    }) as Box<dyn FnMut(JsValue)>);
    let _ = on.call2(
        provider,
        &JsValue::from_str("accountsChanged"),
        accounts_cb.as_ref().unchecked_ref(),
    );
    accounts_cb.forget();

    let chain_cb = Closure::wrap(Box::new(move |chain: JsValue| {
        let Some(hex) = chain.as_string() else {
            return;
        };
        match parse_chain_id(&hex) {
            Ok(chain_id) => wallet.on_chain_changed(chain_id),
            Err(err) => gloo_console::warn!("ignoring chain change:", err.to_string()),
        }
    }) as Box<dyn FnMut(JsValue)>);
    let _ = on.call2(
        provider,
        &JsValue::from_str("chainChanged"),
        chain_cb.as_ref().unchecked_ref(),
    );
    chain_cb.forget();
}

fn first_account(accounts: &JsValue) -> Option<String> {
    if !Array::is_array(accounts) {
        return None;
    }
    Array::from(accounts).get(0).as_string()
}

fn parse_chain_id(hex: &str) -> Result<u64> {
    let trimmed = hex.trim_start_matches("0x");
    u64::from_str_radix(trimmed, 16).map_err(|_| anyhow!("invalid chain id: {hex}"))
}

fn provider_error(err: &JsValue) -> ProviderError {
    let (code, name, message) = js_error_parts(err);
    ProviderError { code, name, message }
}

/// Pull `code`/`name`/`message` out of a JS error object, whatever its
/// concrete class.
pub(crate) fn js_error_parts(err: &JsValue) -> (Option<i64>, Option<String>, String) {
    let code = Reflect::get(err, &JsValue::from_str("code"))
        .ok()
        .and_then(|value| value.as_f64())
        .map(|value| value as i64);
    let name = Reflect::get(err, &JsValue::from_str("name"))
        .ok()
        .and_then(|value| value.as_string());
    let message = Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|value| value.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    (code, name, message)
}
