//! URL helpers shared by the harvester and the orchestrator.

use url::Url;

use super::constants::PAGE_PLACEHOLDER;

/// Resolve `href` against `base`, returning an absolute http(s) URL.
///
/// Fragments are stripped so `/a-1#comments` and `/a-1` collapse to one entry.
/// Returns `None` for `javascript:`, `mailto:`, `data:` and unparseable hrefs.
#[must_use]
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Check if a URL is an absolute http(s) address
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Render a listing page address by substituting the page number.
#[must_use]
pub fn render_listing_url(template: &str, page: u32) -> String {
    template.replace(PAGE_PLACEHOLDER, &page.to_string())
}

/// Host of `url` without a leading `www.`, used as the default include token.
#[must_use]
pub fn host_token(url: &str) -> Option<String> {
    let parsed = Url::parse(&url.replace(PAGE_PLACEHOLDER, "1")).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}
