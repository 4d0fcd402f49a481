//! Metadata extraction from rendered video pages.
//!
//! Extraction runs in stages over the parsed document, each stage only
//! filling fields that are still empty:
//! 1. the first `<h1>` as the title
//! 2. labelled metadata rows (`<div class="text-secondary"><span>Genre:</span> ...`)
//! 3. a regex scan of the document text for `Code:` and `Release date:`
//! 4. a thumbnail from `<video poster>` or the cover template
//!
//! `<meta name="description">` then overrides the description. A page that
//! lacks any of these simply yields empty fields.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

use super::schema::VideoMetadata;
use crate::utils::constants::{
    CODE_PLACEHOLDER, DEFAULT_LABEL_SELECTOR, DEFAULT_ROW_SELECTOR, DEFAULT_THUMBNAIL_TEMPLATE,
};
use crate::utils::url_utils::resolve_href;

static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("BUG: hardcoded CSS selector 'h1' is invalid"));

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("BUG: hardcoded CSS selector 'a' is invalid"));

static VIDEO_POSTER_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("video[poster]").expect("BUG: hardcoded CSS selector 'video[poster]' is invalid")
});

static META_DESCRIPTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"]"#)
        .expect("BUG: hardcoded CSS selector 'meta[name=description]' is invalid")
});

static DEFAULT_ROW: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(DEFAULT_ROW_SELECTOR).expect("BUG: default row selector is invalid")
});

static DEFAULT_LABEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(DEFAULT_LABEL_SELECTOR).expect("BUG: default label selector is invalid")
});

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,]+").expect("BUG: separator regex is invalid"));

static CODE_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Code:[\s\x{a0}]*([A-Za-z0-9-]+)").expect("BUG: code regex is invalid")
});

static RELEASE_DATE_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Release date:[\s\x{a0}]*([\d-]+)").expect("BUG: release date regex is invalid")
});

/// Invalid extractor configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractorError {
    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Thumbnail template '{0}' has no {{code}} placeholder")]
    MissingCodePlaceholder(String),
}

/// Metadata field a row label maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowField {
    Code,
    ReleaseDate,
    Actress,
    Genre,
    Maker,
    Director,
    Label,
}

impl RowField {
    /// Map a normalized label by substring containment, first rule wins
    fn from_label(label: &str) -> Option<Self> {
        if label.contains("code") {
            Some(Self::Code)
        } else if label.contains("release") || label.contains("date") {
            Some(Self::ReleaseDate)
        } else if label.contains("actress") {
            Some(Self::Actress)
        } else if label.contains("genre") {
            Some(Self::Genre)
        } else if label.contains("maker") {
            Some(Self::Maker)
        } else if label.contains("director") {
            Some(Self::Director)
        } else if label.contains("label") {
            Some(Self::Label)
        } else {
            None
        }
    }

    fn slot(self, metadata: &mut VideoMetadata) -> &mut String {
        match self {
            Self::Code => &mut metadata.code,
            Self::ReleaseDate => &mut metadata.release_date,
            Self::Actress => &mut metadata.actress,
            Self::Genre => &mut metadata.genre,
            Self::Maker => &mut metadata.maker,
            Self::Director => &mut metadata.director,
            Self::Label => &mut metadata.label,
        }
    }
}

/// Staged metadata extractor with configurable row markup
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    row_selector: Selector,
    label_selector: Selector,
    thumbnail_template: String,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self {
            row_selector: DEFAULT_ROW.clone(),
            label_selector: DEFAULT_LABEL.clone(),
            thumbnail_template: DEFAULT_THUMBNAIL_TEMPLATE.to_string(),
        }
    }
}

impl MetadataExtractor {
    pub fn new(row_selector: &str, label_selector: &str, thumbnail_template: &str) -> Result<Self, ExtractorError> {
        if !thumbnail_template.contains(CODE_PLACEHOLDER) {
            return Err(ExtractorError::MissingCodePlaceholder(thumbnail_template.to_string()));
        }
        Ok(Self {
            row_selector: parse_selector(row_selector)?,
            label_selector: parse_selector(label_selector)?,
            thumbnail_template: thumbnail_template.to_string(),
        })
    }

    /// Extract every metadata field available in `html`.
    ///
    /// `page_url` resolves relative poster addresses.
    #[must_use]
    pub fn extract(&self, html: &str, page_url: &str) -> VideoMetadata {
        let document = Html::parse_document(html);
        let mut metadata = VideoMetadata::default();

        if let Some(h1) = document.select(&H1_SELECTOR).next() {
            metadata.title = collapse_whitespace(&h1.text().collect::<String>());
        }

        self.apply_rows(&document, &mut metadata);

        if metadata.code.is_empty() {
            apply_text_fallback(&document, &mut metadata);
        }

        if metadata.thumbnail_url.is_empty() {
            metadata.thumbnail_url = poster_url(&document, page_url)
                .or_else(|| self.render_thumbnail(&metadata.code))
                .unwrap_or_default();
        }

        if let Some(meta) = document.select(&META_DESCRIPTION_SELECTOR).next() {
            metadata.description = meta.value().attr("content").unwrap_or_default().trim().to_string();
        }

        metadata
    }

    fn apply_rows(&self, document: &Html, metadata: &mut VideoMetadata) {
        for row in document.select(&self.row_selector) {
            let Some((label, value)) = self.read_row(row) else {
                continue;
            };
            let Some(field) = RowField::from_label(&label) else {
                continue;
            };

            let slot = field.slot(metadata);
            if slot.is_empty() {
                *slot = value;
            }
        }
    }

    /// Normalized `(label, value)` of one row, or `None` when either is empty
    fn read_row(&self, row: ElementRef<'_>) -> Option<(String, String)> {
        let label_el = row.select(&self.label_selector).next()?;
        let label = label_el
            .text()
            .collect::<String>()
            .trim()
            .trim_end_matches(':')
            .trim()
            .to_lowercase();
        if label.is_empty() {
            return None;
        }

        let label_id = label_el.id();
        let link_texts: Vec<String> = row
            .select(&ANCHOR_SELECTOR)
            .filter(|a| !a.ancestors().any(|n| n.id() == label_id))
            .map(|a| a.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();

        let value = if link_texts.is_empty() {
            let remaining: Vec<&str> = row
                .descendants()
                .filter(|node| !node.ancestors().any(|a| a.id() == label_id))
                .filter_map(|node| node.value().as_text().map(|t| &**t))
                .collect();
            collapse_separators(&remaining.join(" "))
        } else {
            link_texts.join(", ")
        };

        (!value.is_empty()).then_some((label, value))
    }

    fn render_thumbnail(&self, code: &str) -> Option<String> {
        (!code.is_empty()).then(|| self.thumbnail_template.replace(CODE_PLACEHOLDER, &code.to_lowercase()))
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractorError> {
    Selector::parse(selector).map_err(|e| ExtractorError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn apply_text_fallback(document: &Html, metadata: &mut VideoMetadata) {
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");

    if let Some(code) = CODE_FALLBACK.captures(&text).and_then(|c| c.get(1)) {
        metadata.code = code.as_str().trim().to_string();
    }
    if metadata.release_date.is_empty()
        && let Some(date) = RELEASE_DATE_FALLBACK.captures(&text).and_then(|c| c.get(1))
    {
        metadata.release_date = date.as_str().trim().to_string();
    }
}

fn poster_url(document: &Html, page_url: &str) -> Option<String> {
    let poster = document
        .select(&VIDEO_POSTER_SELECTOR)
        .next()?
        .value()
        .attr("poster")?
        .trim();
    if poster.is_empty() {
        return None;
    }
    let base = Url::parse(page_url).ok()?;
    resolve_href(&base, poster)
}

/// Collapse runs of whitespace and commas into `", "` and trim the ends
fn collapse_separators(text: &str) -> String {
    SEPARATOR_RUN
        .replace_all(text, ", ")
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
