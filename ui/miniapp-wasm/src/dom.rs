//! DOM element bindings.
//!
//! All elements are resolved once at startup. To add new UI elements, add a
//! field here and bind it in `Elements::bind()`.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement, HtmlInputElement, Window};

pub fn window() -> Window {
    web_sys::window().expect("no window")
}

fn doc() -> Document {
    window().document().expect("no document")
}

pub fn by_id(id: &str) -> Option<Element> {
    doc().get_element_by_id(id)
}

fn req<T: JsCast>(id: &str) -> Result<T, JsValue> {
    by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("element #{id} has the wrong type")))
}

#[derive(Clone)]
pub struct Elements {
    pub notices: Element,
    pub network_banner: Element,
    pub error_panel: Element,
    pub loading: Element,
    pub app: Element,
    pub referral_line: Element,

    pub auth_user: Element,
    pub auth_avatar: HtmlImageElement,
    pub auth_name: Element,
    pub auth_fid: Element,
    pub sign_in_btn: HtmlElement,

    pub wallet_connected: Element,
    pub wallet_address: Element,
    pub wallet_network: Element,
    pub disconnect_btn: HtmlElement,
    pub wallet_menu: Element,
    pub connect_btn: HtmlElement,
    pub connector_menu: Element,
    pub connect_hint: Element,

    pub artwork_img: HtmlImageElement,
    pub canvas_badge: Element,
    pub stat_mints: Element,
    pub stat_earned: Element,
    pub stat_pixels: Element,
    pub contributors: Element,
    pub contributors_list: Element,

    pub qty_input: HtmlInputElement,
    pub qty_minus: HtmlElement,
    pub qty_plus: HtmlElement,
    pub price_line: Element,
    pub mint_btn: HtmlElement,
    pub share_btn: HtmlElement,
}

impl Elements {
    pub fn bind() -> Result<Self, JsValue> {
        Ok(Self {
            notices: req("notices")?,
            network_banner: req("networkBanner")?,
            error_panel: req("errorPanel")?,
            loading: req("loading")?,
            app: req("app")?,
            referral_line: req("referralLine")?,

            auth_user: req("authUser")?,
            auth_avatar: req("authAvatar")?,
            auth_name: req("authName")?,
            auth_fid: req("authFid")?,
            sign_in_btn: req("signInBtn")?,

            wallet_connected: req("walletConnected")?,
            wallet_address: req("walletAddress")?,
            wallet_network: req("walletNetwork")?,
            disconnect_btn: req("disconnectBtn")?,
            wallet_menu: req("walletMenu")?,
            connect_btn: req("connectBtn")?,
            connector_menu: req("connectorMenu")?,
            connect_hint: req("connectHint")?,

            artwork_img: req("artworkImg")?,
            canvas_badge: req("canvasBadge")?,
            stat_mints: req("statMints")?,
            stat_earned: req("statEarned")?,
            stat_pixels: req("statPixels")?,
            contributors: req("contributors")?,
            contributors_list: req("contributorsList")?,

            qty_input: req("qtyInput")?,
            qty_minus: req("qtyMinus")?,
            qty_plus: req("qtyPlus")?,
            price_line: req("priceLine")?,
            mint_btn: req("mintBtn")?,
            share_btn: req("shareBtn")?,
        })
    }
}

// ── Helpers ──

pub fn create(tag: &str) -> Element {
    doc().create_element(tag).expect("create element")
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn add_class(el: &Element, cls: &str) {
    let _ = el.class_list().add_1(cls);
}

pub fn remove_class(el: &Element, cls: &str) {
    let _ = el.class_list().remove_1(cls);
}

pub fn show(el: &Element) {
    remove_class(el, "hidden");
}

pub fn hide(el: &Element) {
    add_class(el, "hidden");
}

pub fn set_hidden(el: &Element, hidden: bool) {
    if hidden {
        hide(el);
    } else {
        show(el);
    }
}

pub fn clear_children(el: &Element) {
    el.set_inner_html("");
}

pub fn origin() -> String {
    window().location().origin().unwrap_or_default()
}
