//! Mini-app host SDK binding.
//!
//! The host runtime injects a single global object before this module loads.
//! Presence and event support are decided once at startup; afterwards the
//! object is held to the full [`HostSdk`] capability interface.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use pd_api_types::User;
use pd_host_identity::{EventSupport, HostSdk, QuickAuthGrant, SignInError};
use serde::Deserialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::dom;
use crate::provider::js_error_parts;

pub const HOST_GLOBAL: &str = "miniAppHost";

pub struct JsHostSdk {
    sdk: Object,
    events: EventSupport,
    forced: bool,
}

impl JsHostSdk {
    /// Bind to the host global if it exists. `forced` treats the page as
    /// host-embedded even when the host's own detection would say otherwise.
    pub fn detect(forced: bool) -> Option<Self> {
        let window = dom::window();
        let value = Reflect::get(window.as_ref(), &JsValue::from_str(HOST_GLOBAL)).ok()?;
        if value.is_undefined() || value.is_null() {
            if forced {
                gloo_console::warn!("host initialization forced, but no host runtime is present");
            }
            return None;
        }
        let sdk: Object = value.dyn_into().ok()?;
        let events = if Reflect::get(&sdk, &JsValue::from_str("on"))
            .map(|on| on.is_function())
            .unwrap_or(false)
        {
            EventSupport::Supported
        } else {
            EventSupport::Unsupported
        };
        Some(Self { sdk, events, forced })
    }

    async fn call0(&self, method: &str) -> Result<JsValue> {
        let function: Function = Reflect::get(&self.sdk, &JsValue::from_str(method))
            .map_err(|err| host_error(method, &err))?
            .dyn_into()
            .map_err(|_| anyhow!("host has no {method} function"))?;
        let returned = function
            .call0(&self.sdk)
            .map_err(|err| host_error(method, &err))?;
        resolve(returned).await.map_err(|err| host_error(method, &err))
    }

    async fn call1(&self, method: &str, arg: &JsValue) -> Result<JsValue, JsValue> {
        let function: Function = Reflect::get(&self.sdk, &JsValue::from_str(method))?
            .dyn_into()
            .map_err(|_| JsValue::from_str(&format!("host has no {method} function")))?;
        let returned = function.call1(&self.sdk, arg)?;
        resolve(returned).await
    }
}

async fn resolve(value: JsValue) -> Result<JsValue, JsValue> {
    match value.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

fn host_error(method: &str, err: &JsValue) -> anyhow::Error {
    let (_, _, message) = js_error_parts(err);
    anyhow!("host {method} failed: {message}")
}

#[derive(Debug, Default, Deserialize)]
struct UserWire {
    #[serde(default)]
    fid: Option<u64>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
    #[serde(default, rename = "pfpUrl")]
    pfp_url: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

impl From<UserWire> for User {
    fn from(wire: UserWire) -> Self {
        User {
            fid: wire.fid.unwrap_or(0),
            username: wire.username,
            display_name: wire.display_name,
            pfp_url: wire.pfp_url,
            custody_address: wire.address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContextWire {
    #[serde(default)]
    user: Option<UserWire>,
}

#[derive(Debug, Default, Deserialize)]
struct QuickAuthWire {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    payload: Option<UserWire>,
}

#[async_trait(?Send)]
impl HostSdk for JsHostSdk {
    async fn ready(&self) -> Result<()> {
        self.call0("ready").await?;
        Ok(())
    }

    async fn in_host(&self) -> Result<bool> {
        if self.forced {
            return Ok(true);
        }
        let value = self.call0("isInMiniApp").await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn viewer_context(&self) -> Result<Option<User>> {
        let value = self.call0("context").await?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        let context: ContextWire = serde_wasm_bindgen::from_value(value)
            .map_err(|err| anyhow!("unexpected host context shape: {err}"))?;
        Ok(context.user.map(User::from))
    }

    async fn quick_auth(&self) -> Result<QuickAuthGrant> {
        let value = self.call0("quickAuth").await?;
        let grant: QuickAuthWire = serde_wasm_bindgen::from_value(value)
            .map_err(|err| anyhow!("unexpected quick-auth shape: {err}"))?;
        Ok(QuickAuthGrant {
            token: grant.token.unwrap_or_default(),
            user: grant.payload.map(User::from),
        })
    }

    async fn sign_in(&self, nonce: &str) -> Result<User, SignInError> {
        let args = serde_wasm_bindgen::to_value(&serde_json::json!({
            "nonce": nonce,
            "acceptAuthAddress": true,
        }))
        .map_err(|err| SignInError::Other(err.to_string()))?;

        if let Err(err) = self.call1("signIn", &args).await {
            let (code, name, message) = js_error_parts(&err);
            if name.as_deref() == Some("RejectedByUser") || code == Some(4001) {
                return Err(SignInError::Rejected);
            }
            return Err(SignInError::Other(message));
        }

        // Identity fields come from the context after a successful sign-in.
        match self.viewer_context().await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Ok(UserWire::default().into()),
            Err(err) => Err(SignInError::Other(err.to_string())),
        }
    }

    fn event_support(&self) -> EventSupport {
        self.events
    }

    fn subscribe_context_changed(&self, callback: Box<dyn Fn()>) {
        if self.events != EventSupport::Supported {
            return;
        }
        let Ok(on) = Reflect::get(&self.sdk, &JsValue::from_str("on")) else {
            return;
        };
        let Ok(on) = on.dyn_into::<Function>() else {
            return;
        };
        let closure = Closure::wrap(Box::new(move |_: JsValue| callback()) as Box<dyn FnMut(JsValue)>);
        let _ = on.call2(
            &self.sdk,
            &JsValue::from_str("contextChanged"),
            closure.as_ref().unchecked_ref(),
        );
        closure.forget();
    }
}
