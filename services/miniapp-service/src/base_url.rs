//! Deployment base-URL resolution.
//!
//! Order: explicit deployment URL env var, then the branch-preview URL env
//! var, then the request's protocol+host. Env values may omit the scheme;
//! https is assumed for anything that is not localhost.

use axum::http::HeaderMap;
use axum::http::header::HOST;

#[derive(Clone)]
pub(crate) struct BaseUrls {
    deployment: Option<String>,
    branch: Option<String>,
}

impl BaseUrls {
    pub(crate) fn from_env() -> Self {
        Self {
            deployment: env_url("DEPLOYMENT_URL"),
            branch: env_url("BRANCH_DEPLOYMENT_URL"),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(deployment: Option<&str>, branch: Option<&str>) -> Self {
        Self {
            deployment: deployment.map(ToOwned::to_owned),
            branch: branch.map(ToOwned::to_owned),
        }
    }

    pub(crate) fn resolve(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.deployment {
            return with_scheme(url);
        }
        if let Some(url) = &self.branch {
            return with_scheme(url);
        }

        let host = headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let protocol = if host.contains("localhost") {
            "http"
        } else {
            "https"
        };
        format!("{protocol}://{host}")
    }
}

fn env_url(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_owned()
    } else {
        format!("https://{url}")
    }
}
