//! CORS policy
//!
//! `FRONTEND_URL` is a comma-separated list of origins. Each entry is `*`,
//! an exact origin, or an origin with a `*` wildcard in the host
//! (`https://*.vercel.app`); `true` is an alias for `*`. Entries may be
//! quoted and are compared case-insensitively. Credentials are allowed, so
//! the policy always echoes a concrete origin instead of `*`.

use axum::http::{header, HeaderValue, Method};
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

#[derive(Debug, Clone)]
enum OriginRule {
    Any,
    Exact(String),
    Pattern(Regex),
}

#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    rules: Vec<OriginRule>,
}

impl OriginPolicy {
    pub fn parse(raw: &str) -> Self {
        let rules = raw
            .split(',')
            .map(normalize_entry)
            .filter(|s| !s.is_empty())
            .filter_map(|entry| {
                if entry == "*" || entry == "true" {
                    return Some(OriginRule::Any);
                }
                if !entry.contains('*') {
                    return Some(OriginRule::Exact(entry));
                }
                let pattern = format!("^{}$", regex::escape(&entry).replace(r"\*", "[^/]+"));
                match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                    Ok(re) => Some(OriginRule::Pattern(re)),
                    Err(e) => {
                        warn!("[Cors] Ignoring origin pattern {}: {}", entry, e);
                        None
                    }
                }
            })
            .collect();
        Self { rules }
    }

    /// An empty policy allows every origin.
    pub fn allows(&self, origin: &str) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        let origin = origin.trim().trim_end_matches('/').to_lowercase();
        self.rules.iter().any(|rule| match rule {
            OriginRule::Any => true,
            OriginRule::Exact(exact) => *exact == origin,
            OriginRule::Pattern(re) => re.is_match(&origin),
        })
    }
}

fn normalize_entry(entry: &str) -> String {
    entry
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
        .trim_end_matches('/')
        .to_lowercase()
}

pub fn cors_layer(policy: OriginPolicy) -> CorsLayer {
    let policy = Arc::new(policy);
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts| {
                origin.to_str().map(|o| policy.allows(o)).unwrap_or(false)
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60))
}
