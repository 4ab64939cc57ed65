// src/services/listings.rs

//! Listing page harvester.
//!
//! Each configured listing page is fetched once. Links are discovered with
//! the [`LinkLadder`], dated from their visible text, deduplicated, and then
//! followed to their final download URL.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    CrawlerConfig, DocumentRequest, ListingSource, ListingsConfig, MeetingDocumentRecord,
    SourceType,
};
use crate::services::classify::{listing_category, listing_title};
use crate::services::selectors::{LinkLadder, candidate_from};
use crate::storage::{RecordSink, emit_record};
use crate::utils::date::parse_link_date;
use crate::utils::http::Fetcher;
use crate::utils::resolve_url;

/// Counters for one listings run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListingRunStats {
    pub pages: usize,
    pub failed_pages: usize,
    /// Link elements selected on listing pages
    pub links: usize,
    /// Links whose text parsed as a date
    pub dated_links: usize,
    pub duplicates: usize,
    /// Documents that could not be resolved
    pub failed_documents: usize,
    pub records: usize,
}

impl ListingRunStats {
    fn merge(&mut self, other: &ListingRunStats) {
        self.pages += other.pages;
        self.failed_pages += other.failed_pages;
        self.links += other.links;
        self.dated_links += other.dated_links;
        self.duplicates += other.duplicates;
        self.failed_documents += other.failed_documents;
        self.records += other.records;
    }
}

/// URLs already queued during one page pass.
#[derive(Debug, Default)]
pub struct SeenUrls(HashSet<String>);

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` the first time `url` is offered.
    pub fn admit(&mut self, url: &str) -> bool {
        if self.0.contains(url) {
            log::debug!("Skipping duplicate document URL: {}", url);
            false
        } else {
            self.0.insert(url.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of scanning one listing page.
#[derive(Debug, Default)]
pub struct ListingScan {
    pub requests: Vec<DocumentRequest>,
    /// Ladder rung that produced the links
    pub rung: usize,
    pub links: usize,
    pub dated_links: usize,
    pub duplicates: usize,
}

/// Harvester for HTML listing pages.
pub struct ListingHarvester<'a> {
    fetcher: &'a dyn Fetcher,
    crawler: &'a CrawlerConfig,
    ladder: LinkLadder,
    strict_sink: bool,
}

impl<'a> ListingHarvester<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        crawler: &'a CrawlerConfig,
        listings: &ListingsConfig,
    ) -> Result<Self> {
        Ok(Self {
            fetcher,
            crawler,
            ladder: LinkLadder::from_config(listings)?,
            strict_sink: false,
        })
    }

    /// Propagate sink failures instead of logging them.
    pub fn strict_sink(mut self, strict: bool) -> Self {
        self.strict_sink = strict;
        self
    }

    /// Harvest every source page. Pages are independent of each other.
    pub async fn run(
        &self,
        sources: &[ListingSource],
        sink: &dyn RecordSink,
    ) -> Result<ListingRunStats> {
        log::info!("Harvesting {} listing pages", sources.len());

        let results =
            futures::future::join_all(sources.iter().map(|source| self.harvest_page(source, sink)))
                .await;

        let mut stats = ListingRunStats::default();
        for result in results {
            stats.merge(&result?);
        }

        log::info!(
            "Listings done: {} pages ({} failed), {} dated links, {} duplicates, {} records",
            stats.pages,
            stats.failed_pages,
            stats.dated_links,
            stats.duplicates,
            stats.records
        );
        Ok(stats)
    }

    /// Fetch one listing page and emit a record per resolved document.
    pub async fn harvest_page(
        &self,
        source: &ListingSource,
        sink: &dyn RecordSink,
    ) -> Result<ListingRunStats> {
        let mut stats = ListingRunStats::default();
        log::info!("Fetching {} listing: {}", source.source_type, source.url);

        let response = match self
            .fetcher
            .fetch(&source.url, &[])
            .await
            .and_then(|r| r.ensure_success())
        {
            Ok(response) => response,
            Err(error) => {
                stats.failed_pages += 1;
                log::error!("Failed to fetch listing {}: {}", source.url, error);
                return Ok(stats);
            }
        };

        let scan = match self.scan(&response.body, &response.url, source.source_type) {
            Ok(scan) => scan,
            Err(error) => {
                stats.failed_pages += 1;
                log::error!("CRITICAL: {}", error);
                return Ok(stats);
            }
        };
        stats.pages += 1;
        stats.links = scan.links;
        stats.dated_links = scan.dated_links;
        stats.duplicates = scan.duplicates;

        let delay = Duration::from_millis(self.crawler.request_delay_ms);
        let mut resolved = stream::iter(scan.requests)
            .map(|request| self.resolve_document(request))
            .buffer_unordered(self.crawler.max_concurrent.max(1));

        while let Some(result) = resolved.next().await {
            match result {
                Ok(record) => {
                    emit_record(sink, record, self.strict_sink).await?;
                    stats.records += 1;
                }
                Err(error) => {
                    stats.failed_documents += 1;
                    log::warn!("Failed to resolve document: {}", error);
                }
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(stats)
    }

    /// Find dated, deduplicated document links on a listing page.
    ///
    /// Relative links are resolved against `page_url`, the final URL of the
    /// listing response.
    pub fn scan(&self, body: &str, page_url: &str, source_type: SourceType) -> Result<ListingScan> {
        let base = Url::parse(page_url)?;
        let document = Html::parse_document(body);

        let Some(found) = self.ladder.select(&document) else {
            return Err(AppError::crawl(page_url, "no links found with any selector"));
        };
        if self.ladder.len() > 1 && found.rung + 1 == self.ladder.len() {
            log::warn!(
                "Using page-wide link selector for {}, results may include navigation links",
                page_url
            );
        }

        let mut scan = ListingScan {
            rung: found.rung,
            links: found.elements.len(),
            ..ListingScan::default()
        };
        let mut seen = SeenUrls::new();

        for element in &found.elements {
            let Some(candidate) = candidate_from(element, source_type) else {
                continue;
            };
            let Some(date) = parse_link_date(&candidate.visible_text) else {
                log::debug!("No date in link text '{}'", candidate.visible_text);
                continue;
            };
            scan.dated_links += 1;

            let Some(url) = resolve_url(&base, &candidate.href) else {
                log::debug!("Unresolvable href '{}' on {}", candidate.href, page_url);
                continue;
            };
            if !seen.admit(&url) {
                scan.duplicates += 1;
                continue;
            }

            log::info!("Queued {} document {} ({})", source_type, url, date);
            scan.requests.push(DocumentRequest {
                url,
                date,
                link_text: candidate.visible_text,
                source_type,
            });
        }

        if scan.dated_links == 0 {
            log::warn!("No dated links on {}", page_url);
        }
        Ok(scan)
    }

    /// Follow a document link and build its record from the final URL.
    async fn resolve_document(&self, request: DocumentRequest) -> Result<MeetingDocumentRecord> {
        let response = self
            .fetcher
            .resolve(&request.url, &[])
            .await
            .and_then(|r| r.ensure_success())
            .map_err(|e| AppError::crawl(&request.url, e.to_string()))?;

        log::debug!("Resolved {} -> {}", request.url, response.url);
        Ok(MeetingDocumentRecord::new(
            request.date,
            listing_title(&request.link_text),
            listing_category(request.source_type),
            response.url,
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Category;
    use crate::storage::MemorySink;
    use crate::utils::http::stub::StubFetcher;

    const LISTING: &str = "https://www.example.gov/board/minutes";

    fn crawler() -> CrawlerConfig {
        CrawlerConfig {
            request_delay_ms: 0,
            ..CrawlerConfig::default()
        }
    }

    fn source(source_type: SourceType) -> ListingSource {
        ListingSource {
            url: LISTING.to_string(),
            source_type,
        }
    }

    fn content_page(links: &str) -> String {
        format!(
            r#"<html><body>
            <nav><a href="/">Home</a></nav>
            <article><div class="field-content"><p>{links}</p></div></article>
            </body></html>"#
        )
    }

    #[test]
    fn test_seen_urls() {
        let mut seen = SeenUrls::new();
        assert!(seen.admit("https://a.example/1"));
        assert!(!seen.admit("https://a.example/1"));
        assert!(seen.admit("https://a.example/2"));
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn test_workshop_link_end_to_end() {
        let page = content_page(
            r#"<a href="/docs/pop?docid=1">March 3, 2023 (Workshop)</a>
            <a href="/contact">Contact us</a>"#,
        );
        let fetcher = StubFetcher::new().page(LISTING, &page).redirect(
            "https://www.example.gov/docs/pop?docid=1",
            "https://files.example.gov/minutes-2023-03-03.pdf",
        );
        let sink = MemorySink::new();
        let crawler = crawler();
        let harvester =
            ListingHarvester::new(&fetcher, &crawler, &ListingsConfig::default()).unwrap();

        let stats = harvester
            .run(&[source(SourceType::Minutes)], &sink)
            .await
            .unwrap();

        assert_eq!(stats.pages, 1);
        assert_eq!(stats.links, 2);
        assert_eq!(stats.dated_links, 1);
        assert_eq!(
            sink.records(),
            vec![MeetingDocumentRecord::new(
                NaiveDate::from_ymd_opt(2023, 3, 3).unwrap(),
                "Board Workshop",
                Category::Minutes,
                "https://files.example.gov/minutes-2023-03-03.pdf",
            )]
        );
    }

    #[tokio::test]
    async fn test_duplicate_links_fetched_once() {
        let doc = "https://www.example.gov/docs/pop?docid=9";
        let page = content_page(&format!(
            r#"<a href="{doc}">Jan. 5, 2024</a>
            <a href="/docs/pop?docid=9">January 5, 2024</a>"#
        ));
        let fetcher = StubFetcher::new()
            .page(LISTING, &page)
            .redirect(doc, "https://files.example.gov/9.pdf");
        let sink = MemorySink::new();
        let crawler = crawler();
        let harvester =
            ListingHarvester::new(&fetcher, &crawler, &ListingsConfig::default()).unwrap();

        let stats = harvester
            .run(&[source(SourceType::AgendaPacket)], &sink)
            .await
            .unwrap();

        assert_eq!(fetcher.count(doc), 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.records()[0].category, Category::Other);
        assert_eq!(sink.records()[0].meeting_title, "Board Meeting");
    }

    #[test]
    fn test_scan_dates_and_filters() {
        let fetcher = StubFetcher::new();
        let crawler = crawler();
        let harvester =
            ListingHarvester::new(&fetcher, &crawler, &ListingsConfig::default()).unwrap();
        let page = content_page(
            r##"<a href="a.pdf">Feb 14, 2024</a>
            <a href="b.pdf">June 2022</a>
            <a href="c.pdf">12/01/2021 (Special)</a>
            <a href="#">March 3, 2023</a>
            <a href="d.pdf">Annual report</a>"##,
        );

        let scan = harvester.scan(&page, LISTING, SourceType::Minutes).unwrap();

        let dates: Vec<_> = scan.requests.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
                NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2021, 12, 1).unwrap(),
            ]
        );
        assert_eq!(scan.requests[0].url, "https://www.example.gov/board/a.pdf");
        assert_eq!(scan.links, 5);
        assert_eq!(scan.rung, 0);
    }

    #[test]
    fn test_scan_falls_back_to_page_links() {
        let fetcher = StubFetcher::new();
        let crawler = crawler();
        let harvester =
            ListingHarvester::new(&fetcher, &crawler, &ListingsConfig::default()).unwrap();

        let scan = harvester
            .scan(
                r#"<div><a href="/m/1.pdf">April 2, 2024</a></div>"#,
                LISTING,
                SourceType::Minutes,
            )
            .unwrap();

        assert_eq!(scan.rung, 2);
        assert_eq!(scan.requests.len(), 1);
        assert_eq!(scan.requests[0].url, "https://www.example.gov/m/1.pdf");
    }

    #[tokio::test]
    async fn test_page_without_links_is_failure() {
        let fetcher = StubFetcher::new().page(LISTING, "<article><p>Coming soon</p></article>");
        let sink = MemorySink::new();
        let crawler = crawler();
        let harvester =
            ListingHarvester::new(&fetcher, &crawler, &ListingsConfig::default()).unwrap();

        let stats = harvester
            .harvest_page(&source(SourceType::Minutes), &sink)
            .await
            .unwrap();

        assert_eq!(stats.failed_pages, 1);
        assert_eq!(fetcher.requested(), vec![LISTING.to_string()]);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_failed_resolution_skips_only_that_document() {
        let page = content_page(
            r#"<a href="/docs/1">May 1, 2024</a>
            <a href="/docs/2">May 2, 2024</a>
            <a href="/docs/3">May 3, 2024</a>"#,
        );
        let fetcher = StubFetcher::new()
            .page(LISTING, &page)
            .redirect("https://www.example.gov/docs/1", "https://files.example.gov/1.pdf")
            .fail("https://www.example.gov/docs/2");
        let sink = MemorySink::new();
        let crawler = crawler();
        let harvester =
            ListingHarvester::new(&fetcher, &crawler, &ListingsConfig::default()).unwrap();

        let stats = harvester
            .harvest_page(&source(SourceType::Minutes), &sink)
            .await
            .unwrap();

        // docs/3 has no route and answers 404
        assert_eq!(stats.failed_documents, 2);
        assert_eq!(stats.records, 1);
        assert_eq!(sink.records()[0].url, "https://files.example.gov/1.pdf");
    }

    #[tokio::test]
    async fn test_unreachable_listing_does_not_stop_others() {
        let other = "https://www.example.gov/board/packets";
        let page = content_page(r#"<a href="/p/1.pdf">May 1, 2024</a>"#);
        let fetcher = StubFetcher::new()
            .fail(LISTING)
            .page(other, &page)
            .redirect("https://www.example.gov/p/1.pdf", "https://www.example.gov/p/1.pdf");
        let sink = MemorySink::new();
        let crawler = crawler();
        let harvester =
            ListingHarvester::new(&fetcher, &crawler, &ListingsConfig::default()).unwrap();

        let sources = vec![
            source(SourceType::Minutes),
            ListingSource {
                url: other.to_string(),
                source_type: SourceType::AgendaPacket,
            },
        ];
        let stats = harvester.run(&sources, &sink).await.unwrap();

        assert_eq!(stats.failed_pages, 1);
        assert_eq!(stats.pages, 1);
        assert_eq!(sink.records().len(), 1);
    }
}
