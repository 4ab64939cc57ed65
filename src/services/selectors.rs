//! Link discovery on listing pages.
//!
//! Listing layouts drift over time, so links are located with a ladder of
//! selectors: narrow content-area selectors first, then anything inside the
//! article, then any link on the page. The first rung that matches wins.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{CandidateLink, ListingsConfig, SourceType};
use crate::utils::normalize_whitespace;

/// One rung of the ladder.
#[derive(Debug, Clone)]
pub struct LinkStrategy {
    source: String,
    selector: Selector,
}

impl LinkStrategy {
    pub fn parse(source: &str) -> Result<Self> {
        let selector =
            Selector::parse(source).map_err(|e| AppError::selector(source, format!("{e:?}")))?;
        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    /// Selector text this rung was built from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Elements this rung matches, in document order.
    pub fn apply<'d>(&self, document: &'d Html) -> Vec<ElementRef<'d>> {
        document.select(&self.selector).collect()
    }
}

/// Elements found by the first matching rung.
#[derive(Debug)]
pub struct LadderMatch<'d> {
    /// Zero-based index of the rung that matched
    pub rung: usize,
    pub elements: Vec<ElementRef<'d>>,
}

/// Ordered list of link strategies.
#[derive(Debug, Clone)]
pub struct LinkLadder {
    strategies: Vec<LinkStrategy>,
}

impl LinkLadder {
    /// Build a ladder from selector strings, in priority order.
    pub fn new<S: AsRef<str>>(selectors: &[S]) -> Result<Self> {
        if selectors.is_empty() {
            return Err(AppError::config("link selector ladder is empty"));
        }
        let strategies = selectors
            .iter()
            .map(|s| LinkStrategy::parse(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { strategies })
    }

    pub fn from_config(config: &ListingsConfig) -> Result<Self> {
        Self::new(&config.link_selectors)
    }

    pub fn strategies(&self) -> &[LinkStrategy] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Try each rung in order and return the first non-empty match.
    pub fn select<'d>(&self, document: &'d Html) -> Option<LadderMatch<'d>> {
        self.strategies
            .iter()
            .enumerate()
            .find_map(|(rung, strategy)| {
                let elements = strategy.apply(document);
                if elements.is_empty() {
                    log::debug!("Link selector '{}' matched nothing", strategy.as_str());
                    None
                } else {
                    Some(LadderMatch { rung, elements })
                }
            })
    }
}

/// Build a candidate from a link element.
///
/// Elements without visible text, without an `href`, or whose `href` only
/// points at an in-page anchor yield `None`.
pub fn candidate_from(element: &ElementRef<'_>, source_type: SourceType) -> Option<CandidateLink> {
    let visible_text = normalize_whitespace(&element.text().collect::<String>());
    if visible_text.is_empty() {
        return None;
    }

    let href = element.value().attr("href")?.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    Some(CandidateLink {
        visible_text,
        href: href.to_string(),
        source_type,
    })
}
