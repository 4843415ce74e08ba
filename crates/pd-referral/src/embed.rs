//! Rich share-embed metadata for the mini-app host.
//!
//! The embed JSON goes into `fc:miniapp` meta tags (and a backward-compatible
//! `fc:frame` variant); the host renders it as a launch card when the link is
//! shared.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "PaintDay";
pub const SPLASH_BACKGROUND: &str = "#000000";
pub const DEFAULT_BUTTON_TITLE: &str = "\u{1F3A8} Mint Canvas";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MiniappEmbed {
    pub version: String,
    pub image_url: String,
    pub button: EmbedButton,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbedButton {
    pub title: String,
    pub action: EmbedAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbedAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub url: String,
    pub name: String,
    pub splash_image_url: String,
    pub splash_background_color: String,
}

impl MiniappEmbed {
    /// Embed for a share/launch URL. Every URL is normalized to an absolute
    /// HTTPS URL first; a non-shareable URL is an error, not a silent broken
    /// card.
    pub fn new(url: &str, image_url: &str, name: &str, fallback_origin: Option<&str>) -> Result<Self> {
        let image_url = ensure_absolute_https(image_url, fallback_origin)?;
        let url = ensure_absolute_https(url, fallback_origin)?;
        Ok(Self {
            version: "1".to_owned(),
            image_url: image_url.clone(),
            button: EmbedButton {
                title: DEFAULT_BUTTON_TITLE.to_owned(),
                action: EmbedAction {
                    action_type: "launch_miniapp".to_owned(),
                    url,
                    name: name.to_owned(),
                    splash_image_url: image_url,
                    splash_background_color: SPLASH_BACKGROUND.to_owned(),
                },
            },
        })
    }

    /// Older host clients only understand the `launch_frame` action type.
    pub fn frame_variant(&self) -> Self {
        let mut frame = self.clone();
        frame.button.action.action_type = "launch_frame".to_owned();
        frame
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Normalize to an absolute HTTPS URL. Hosts reject relative URLs, localhost,
/// and raw IP addresses in embeds, so those fail here instead of producing a
/// card that never renders.
pub fn ensure_absolute_https(url: &str, fallback_origin: Option<&str>) -> Result<String> {
    let absolute = if url.starts_with("https://") {
        url.to_owned()
    } else if url.starts_with("http://") {
        bail!("embed urls must be https: {url}");
    } else {
        let Some(origin) = fallback_origin else {
            bail!("cannot resolve relative url {url}: no origin available");
        };
        if !origin.starts_with("https://") {
            bail!("embed origin must be https: {origin}");
        }
        let origin = origin.trim_end_matches('/');
        if url.starts_with('/') {
            format!("{origin}{url}")
        } else {
            format!("{origin}/{url}")
        }
    };

    let parsed = Url::parse(&absolute)?;
    let host = parsed.host_str().unwrap_or_default();
    if host == "localhost" || host.parse::<std::net::IpAddr>().is_ok() {
        bail!("embed urls cannot point at localhost or IP addresses: {absolute}");
    }
    Ok(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_serializes_with_host_facing_keys() {
        let embed = MiniappEmbed::new(
            "https://paintday.app/?ref=0xABC",
            "https://paintday.app/api/og?day=700",
            "PaintDay - Canvas #700",
            None,
        )
        .expect("embed");

        let json: serde_json::Value = serde_json::from_str(&embed.to_json()).expect("json");
        assert_eq!(json["version"], "1");
        assert_eq!(json["imageUrl"], "https://paintday.app/api/og?day=700");
        assert_eq!(json["button"]["action"]["type"], "launch_miniapp");
        assert_eq!(
            json["button"]["action"]["splashBackgroundColor"],
            SPLASH_BACKGROUND
        );
    }

    #[test]
    fn frame_variant_only_changes_action_type() {
        let embed = MiniappEmbed::new(
            "https://paintday.app/",
            "https://paintday.app/api/og",
            APP_NAME,
            None,
        )
        .expect("embed");
        let frame = embed.frame_variant();

        assert_eq!(frame.button.action.action_type, "launch_frame");
        assert_eq!(frame.image_url, embed.image_url);
        assert_eq!(frame.button.action.url, embed.button.action.url);
    }

    #[test]
    fn relative_urls_resolve_against_https_origin() {
        let url = ensure_absolute_https("/api/og?day=700", Some("https://paintday.app")).unwrap();
        assert_eq!(url, "https://paintday.app/api/og?day=700");

        assert!(ensure_absolute_https("/api/og", None).is_err());
        assert!(ensure_absolute_https("/api/og", Some("http://paintday.app")).is_err());
    }

    #[test]
    fn localhost_and_ip_hosts_are_rejected() {
        assert!(ensure_absolute_https("https://localhost/api/og", None).is_err());
        assert!(ensure_absolute_https("https://127.0.0.1/api/og", None).is_err());
        assert!(ensure_absolute_https("http://paintday.app/api/og", None).is_err());
        assert!(ensure_absolute_https("https://paintday.app/api/og", None).is_ok());
    }
}
