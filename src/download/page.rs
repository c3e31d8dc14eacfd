//! Track links from music pages.
//!
//! A page extractor turns fetched markup into [`TrackReference`]s. Extractors are
//! looked up through an [`ExtractorRegistry`] by URL, the same way download
//! sources are picked; the play-list layout below is the catch-all.

use std::sync::Arc;

use select::document::Document;
use select::node::Node;
use select::predicate::{Class, Name, Predicate};
use url::Url;

use crate::core::utils::format_display_name;

/// A direct audio resource found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReference {
    /// Absolute resource URL
    pub url: String,
    /// "Artist - Title", empty when the page has no description for the item
    pub display_name: String,
}

impl TrackReference {
    pub fn new(url: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: display_name.into(),
        }
    }
}

/// Result of scraping a page that was fetched successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// At least one track, in document order
    Found(Vec<TrackReference>),
    /// The page has no recognizable track items
    Empty,
}

impl ScrapeOutcome {
    pub fn from_tracks(tracks: Vec<TrackReference>) -> Self {
        if tracks.is_empty() {
            ScrapeOutcome::Empty
        } else {
            ScrapeOutcome::Found(tracks)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ScrapeOutcome::Found(tracks) => tracks.len(),
            ScrapeOutcome::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_tracks(self) -> Vec<TrackReference> {
        match self {
            ScrapeOutcome::Found(tracks) => tracks,
            ScrapeOutcome::Empty => Vec::new(),
        }
    }
}

/// Site-specific markup adapter.
pub trait PageLinkExtractor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Whether this extractor understands pages at `url`
    fn supports_url(&self, url: &Url) -> bool;

    /// Track references in document order. Relative links resolve against `base_url`.
    fn extract(&self, markup: &str, base_url: &Url) -> Vec<TrackReference>;

    fn scrape(&self, markup: &str, base_url: &Url) -> ScrapeOutcome {
        ScrapeOutcome::from_tracks(self.extract(markup, base_url))
    }
}

/// Play-list layout:
///
/// ```html
/// <li class="item">
///   <ul><li class="play" data-url="/get/123.mp3"></li></ul>
///   <div class="desc"><span class="artist">A</span><span class="track">T</span></div>
/// </li>
/// ```
///
/// Every `li.play` with a non-empty `data-url` yields one reference. The name
/// comes from the enclosing `li.item`'s `div.desc` when there is one.
#[derive(Debug, Default, Clone)]
pub struct PlayListExtractor;

impl PlayListExtractor {
    pub fn new() -> Self {
        Self
    }

    fn enclosing_item<'a>(node: &Node<'a>) -> Option<Node<'a>> {
        let mut current = node.parent();
        while let Some(parent) = current {
            if parent.is(Name("li").and(Class("item"))) {
                return Some(parent);
            }
            current = parent.parent();
        }
        None
    }

    fn describe(item: &Node<'_>) -> String {
        let Some(desc) = item.find(Name("div").and(Class("desc"))).next() else {
            return String::new();
        };
        let span_text = |class: &'static str| {
            desc.find(Name("span").and(Class(class)))
                .next()
                .map(|n| collapse_whitespace(&n.text()))
                .unwrap_or_default()
        };
        format_display_name(&span_text("artist"), &span_text("track"))
    }
}

impl PageLinkExtractor for PlayListExtractor {
    fn name(&self) -> &str {
        "play-list"
    }

    fn supports_url(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }

    fn extract(&self, markup: &str, base_url: &Url) -> Vec<TrackReference> {
        let document = Document::from(markup);

        document
            .find(Name("li").and(Class("play")))
            .filter_map(|play| {
                let raw = play.attr("data-url").map(str::trim).filter(|s| !s.is_empty())?;
                let Some(url) = resolve_resource_url(base_url, raw) else {
                    log::debug!("Skipping unresolvable track link: {}", raw);
                    return None;
                };
                let display_name = Self::enclosing_item(&play)
                    .map(|item| Self::describe(&item))
                    .unwrap_or_default();
                Some(TrackReference::new(url, display_name))
            })
            .collect()
    }
}

/// Resolves `raw` against `base`, keeping only http(s) results
pub fn resolve_resource_url(base: &Url, raw: &str) -> Option<String> {
    let resolved = base.join(raw).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Routes page URLs to extractors.
///
/// Extractors are tried in registration order; the first one that supports the
/// URL wins.
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn PageLinkExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self { extractors: Vec::new() }
    }

    pub fn register(&mut self, extractor: Arc<dyn PageLinkExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn resolve(&self, url: &Url) -> Option<Arc<dyn PageLinkExtractor>> {
        self.extractors.iter().find(|e| e.supports_url(url)).cloned()
    }

    /// Registry with the built-in play-list layout as the only (fallback) extractor
    pub fn default_registry() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PlayListExtractor::new()));
        registry
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::default_registry()
    }
}
