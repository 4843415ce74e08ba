//! Referral resolution and outbound share links/embeds.
//!
//! A referral is an opaque token (typically an address) read from the page
//! URL or synthesized from the connected account. It is immutable for the
//! page lifetime and feeds both the mint transaction and the share link.

pub mod embed;

use url::Url;

/// Accepted query parameter names, in priority order.
const REFERRAL_PARAMS: [&str; 2] = ["ref", "referrer"];

/// Referral rewards always need a valid destination; this address receives
/// them when no explicit referrer resolved.
pub const FALLBACK_REWARD_ADDRESS: &str = "0xa9f1e2c3b44dd064259bd2b8a38b3f6f58cc0a1e";

/// Read the referral token from a full page URL. First present of the
/// accepted parameter names wins; empty values count as absent.
pub fn extract_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    extract_from_pairs(parsed.query_pairs())
}

/// Same extraction over a raw query string (no leading `?`).
pub fn extract_from_query(query: &str) -> Option<String> {
    extract_from_pairs(url::form_urlencoded::parse(query.as_bytes()))
}

fn extract_from_pairs<'a>(
    pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
) -> Option<String> {
    let pairs: Vec<(String, String)> = pairs
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    for name in REFERRAL_PARAMS {
        if let Some((_, value)) = pairs.iter().find(|(k, _)| k == name) {
            if !value.is_empty() {
                return Some(value.clone());
            }
        }
    }
    None
}

/// Build the outbound share link. Visiting the result recovers the same
/// referral via [`extract_from_url`].
pub fn build_share_link(origin: &str, referral: &str) -> String {
    let origin = origin.trim_end_matches('/');
    let encoded: String = url::form_urlencoded::byte_serialize(referral.as_bytes()).collect();
    format!("{origin}/?ref={encoded}")
}

/// Mint reward target: the URL-supplied referral verbatim when present and
/// non-empty, else the fixed fallback recipient.
pub fn resolve_mint_target(referral: Option<&str>, fallback: &str) -> String {
    match referral {
        Some(value) if !value.is_empty() => value.to_owned(),
        _ => fallback.to_owned(),
    }
}
