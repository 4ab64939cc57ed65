// src/services/events.rs

//! Events API harvester.
//!
//! Walks the paginated events endpoint inside a [`DateWindow`], turning each
//! published file of each event into a [`MeetingDocumentRecord`].

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, Category, EventPage, EventRecord, MeetingDocumentRecord};
use crate::services::classify::{classify_file_type, file_url};
use crate::services::window::DateWindow;
use crate::storage::{RecordSink, emit_record};
use crate::utils::date::parse_api_date;
use crate::utils::http::{Fetcher, Headers};

/// Title used when an event has no name.
pub const UNTITLED_EVENT: &str = "N/A";

/// Counters for one API run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApiRunStats {
    /// Pages parsed successfully
    pub pages: usize,
    /// Pages that failed to fetch or parse
    pub failed_pages: usize,
    pub events: usize,
    pub events_skipped: usize,
    pub files_skipped: usize,
    pub records: usize,
}

/// Pagination state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PageState {
    Init,
    Fetching(String),
    Done,
}

/// Context owned by a single API run.
///
/// Only the harvester advances the page counter.
#[derive(Debug)]
pub struct ApiRun {
    /// Pages requested so far
    page_count: usize,
    max_pages: usize,
    /// Headers of the first request, reused for every page
    headers: Headers,
    stats: ApiRunStats,
}

impl ApiRun {
    pub fn new(max_pages: usize, headers: Headers) -> Self {
        Self {
            page_count: 0,
            max_pages,
            headers,
            stats: ApiRunStats::default(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn stats(&self) -> &ApiRunStats {
        &self.stats
    }

    /// Count a page request and return its 1-based number.
    fn begin_page(&mut self) -> usize {
        self.page_count += 1;
        self.page_count
    }

    fn page_budget_left(&self) -> bool {
        self.page_count < self.max_pages
    }
}

/// Harvester for the paginated events API.
pub struct EventHarvester<'a> {
    fetcher: &'a dyn Fetcher,
    config: &'a ApiConfig,
    strict_sink: bool,
}

impl<'a> EventHarvester<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, config: &'a ApiConfig) -> Self {
        Self {
            fetcher,
            config,
            strict_sink: false,
        }
    }

    /// Propagate sink failures instead of logging them.
    pub fn strict_sink(mut self, strict: bool) -> Self {
        self.strict_sink = strict;
        self
    }

    /// Headers sent with the first page and reused for the rest.
    pub fn request_headers(&self) -> Headers {
        let portal = self.config.portal_url.trim_end_matches('/');
        vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
            ("Origin".to_string(), portal.to_string()),
            ("Referer".to_string(), format!("{portal}/")),
        ]
    }

    /// Harvest every page of the window around `now`.
    pub async fn run(&self, now: DateTime<Utc>, sink: &dyn RecordSink) -> Result<ApiRunStats> {
        let window =
            DateWindow::around(now, self.config.lookback_days, self.config.lookahead_days)?;
        log::info!(
            "Event window: {} .. {} ({} pages max)",
            window.start,
            window.end,
            self.config.max_pages
        );

        let mut run = ApiRun::new(self.config.max_pages, self.request_headers());
        let mut state = PageState::Init;
        loop {
            state = match state {
                PageState::Init => PageState::Fetching(window.query_url(&self.config.base_url)),
                PageState::Fetching(url) => self.process_page(&url, &mut run, sink).await?,
                PageState::Done => break,
            };
        }

        log::info!(
            "Events API done: {} pages, {} events ({} skipped), {} records",
            run.stats.pages,
            run.stats.events,
            run.stats.events_skipped,
            run.stats.records
        );
        Ok(run.stats)
    }

    /// Fetch and emit one page, then decide where to go next.
    async fn process_page(
        &self,
        url: &str,
        run: &mut ApiRun,
        sink: &dyn RecordSink,
    ) -> Result<PageState> {
        let page_number = run.begin_page();
        log::info!("Parsing page {}: {}", page_number, url);

        let page = match self.load_page(url, &run.headers).await {
            Ok(page) => page,
            Err(error) => {
                run.stats.failed_pages += 1;
                log::error!("Stopping events run at page {}: {}", page_number, error);
                return Ok(PageState::Done);
            }
        };
        run.stats.pages += 1;

        if page.entries().is_empty() {
            log::info!("No events on page {} ({})", page_number, url);
        }

        for (index, event) in page.events().enumerate() {
            run.stats.events += 1;
            let event = match event {
                Ok(event) => event,
                Err(error) => {
                    run.stats.events_skipped += 1;
                    log::warn!(
                        "Malformed event #{} on page {}, skipping: {}",
                        index,
                        page_number,
                        error
                    );
                    continue;
                }
            };
            let Some(records) = self.normalize_event(&event, &mut run.stats) else {
                run.stats.events_skipped += 1;
                continue;
            };
            for record in records {
                emit_record(sink, record, self.strict_sink).await?;
                run.stats.records += 1;
            }
        }

        Ok(Self::next_state(&page, run))
    }

    fn next_state(page: &EventPage, run: &ApiRun) -> PageState {
        if !run.page_budget_left() {
            log::info!("Reached max_pages limit ({}), stopping", run.max_pages());
            return PageState::Done;
        }
        match page.continuation() {
            Some(next) => {
                log::info!("Following pagination link to: {}", next);
                PageState::Fetching(next.to_string())
            }
            None => {
                log::info!("No more pages (no continuation link)");
                PageState::Done
            }
        }
    }

    async fn load_page(&self, url: &str, headers: &[(String, String)]) -> Result<EventPage> {
        let response = self.fetcher.fetch(url, headers).await?.ensure_success()?;
        EventPage::parse(&response.body).map_err(|e| {
            let preview: String = response.body.chars().take(500).collect();
            AppError::crawl(url, format!("malformed JSON ({e}), body: {preview}"))
        })
    }

    /// Turn one event into records.
    ///
    /// Returns `None` when the event itself is unusable; individual files
    /// without an id are skipped and counted in `stats`.
    pub fn normalize_event(
        &self,
        event: &EventRecord,
        stats: &mut ApiRunStats,
    ) -> Option<Vec<MeetingDocumentRecord>> {
        let Some(start) = event.start() else {
            log::warn!("Event missing 'startDateTime': {:?}", event);
            return None;
        };
        let Some(date) = parse_api_date(start) else {
            log::error!(
                "Could not parse date '{}' for event {:?}",
                start,
                event.event_name
            );
            return None;
        };

        let title = event
            .event_name
            .as_deref()
            .unwrap_or(UNTITLED_EVENT)
            .to_string();

        let Some(event_id) = event.event_id() else {
            log::warn!(
                "Event '{}' on {} is missing an 'id', skipping its files",
                title,
                date
            );
            return None;
        };

        if event.file_entries().is_empty() {
            log::debug!("No published files for event '{}' ({})", title, event_id);
        }

        let mut records = Vec::new();
        for file in event.files() {
            let file = match file {
                Ok(file) => file,
                Err(error) => {
                    stats.files_skipped += 1;
                    log::warn!(
                        "Malformed file entry on event '{}' ({}), skipping: {}",
                        title,
                        event_id,
                        error
                    );
                    continue;
                }
            };
            let Some(file_id) = file.id() else {
                stats.files_skipped += 1;
                log::warn!(
                    "File of event '{}' ({}) has no valid 'fileId' (type '{}'), skipping",
                    title,
                    event_id,
                    file.type_hint()
                );
                continue;
            };

            let category = classify_file_type(file.type_hint());
            if category == Category::Other && !file.type_hint().is_empty() {
                log::info!(
                    "File type '{}' (event {}, file {}) categorized as 'other'",
                    file.type_hint(),
                    event_id,
                    file_id
                );
            }

            records.push(MeetingDocumentRecord::new(
                date,
                title.clone(),
                category,
                file_url(&self.config.portal_url, &event_id, &file_id),
            ));
        }
        Some(records)
    }
}
