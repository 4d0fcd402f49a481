//! Candidate video link harvesting from listing pages

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::collections::btree_set;
use std::sync::LazyLock;
use url::Url;

use crate::utils::constants::DEFAULT_EXCLUDE_TOKENS;
use crate::utils::url_utils::resolve_href;

static HREF_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("BUG: hardcoded CSS selector 'a[href]' is invalid"));

/// Substring rules deciding whether a resolved link is a video page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFilter {
    /// Every kept link contains this, usually the site host
    pub include_token: String,
    /// No kept link contains any of these
    pub exclude_tokens: Vec<String>,
}

impl LinkFilter {
    /// Filter with the default exclusions (`english`, `weekly`, `monthly`, `today`)
    pub fn new(include_token: impl Into<String>) -> Self {
        Self {
            include_token: include_token.into(),
            exclude_tokens: DEFAULT_EXCLUDE_TOKENS.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn with_exclude_tokens(mut self, tokens: Vec<String>) -> Self {
        self.exclude_tokens = tokens;
        self
    }

    /// Video pages are slugged (`/en/abc-123`), so a kept link must carry a dash.
    #[must_use]
    pub fn accepts(&self, url: &str) -> bool {
        url.contains(self.include_token.as_str())
            && url.contains('-')
            && !self.exclude_tokens.iter().any(|token| url.contains(token.as_str()))
    }
}

/// Collect the filtered absolute links of one listing page.
///
/// Hrefs that do not resolve to an http(s) URL are skipped. Running this
/// twice over the same markup yields the same set.
#[must_use]
pub fn harvest_links(html: &str, base: &Url, filter: &LinkFilter) -> BTreeSet<String> {
    let document = Html::parse_document(html);

    document
        .select(&HREF_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_href(base, href))
        .filter(|url| filter.accepts(url))
        .collect()
}

/// Sorted, duplicate-free union of harvested links
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    links: BTreeSet<String>,
}

impl LinkSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every link of `batch`, returning how many were new
    pub fn merge(&mut self, batch: impl IntoIterator<Item = String>) -> usize {
        let before = self.links.len();
        self.links.extend(batch);
        self.links.len() - before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    #[must_use]
    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    /// Links in sorted order
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.links.iter()
    }
}

impl FromIterator<String> for LinkSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for LinkSet {
    type Item = String;
    type IntoIter = btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}
