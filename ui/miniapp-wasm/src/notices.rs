//! Notice rendering.
//!
//! Transient notices show as auto-dismissing toasts; sticky notices go to
//! the persistent banner and stay until the raising condition clears.

use gloo_timers::future::TimeoutFuture;
use pd_api_types::{Notice, NoticeLevel, NoticeSink};
use wasm_bindgen_futures::spawn_local;

use crate::dom::{self, Elements};

const TOAST_MILLIS: u32 = 4000;

pub struct DomNoticeSink {
    els: Elements,
}

impl DomNoticeSink {
    pub fn new(els: Elements) -> Self {
        Self { els }
    }
}

impl NoticeSink for DomNoticeSink {
    fn notice(&self, notice: Notice) {
        if notice.sticky {
            dom::set_text(&self.els.network_banner, &notice.text);
            dom::show(&self.els.network_banner);
            return;
        }
        toast(&self.els, &notice);
    }
}

pub fn toast(els: &Elements, notice: &Notice) {
    let class = match notice.level {
        NoticeLevel::Info => "notice-info",
        NoticeLevel::Success => "notice-success",
        NoticeLevel::Warning => "notice-warning",
        NoticeLevel::Error => "notice-error",
    };

    let el = dom::create("div");
    dom::add_class(&el, "notice");
    dom::add_class(&el, class);
    dom::set_text(&el, &notice.text);
    let _ = els.notices.append_child(&el);

    spawn_local(async move {
        TimeoutFuture::new(TOAST_MILLIS).await;
        el.remove();
    });
}
