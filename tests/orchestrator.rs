//! Orchestrator behavior against a stubbed Widget Driver: caching, retry
//! bounds, session hygiene, input validation, and the placeholder rule.

use async_trait::async_trait;
use slot_scout::{
    AppointmentType, DriverError, DriverResult, ElementHandle, ElementLocator, OrchestratorConfig,
    PatientType, Slot, SlotCache, SlotQueryOrchestrator, SlotRequest, WidgetDriver, WidgetSelectors,
    WidgetSession,
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type ElementSpec = (String, Vec<(String, String)>);

fn el(text: &str) -> ElementSpec {
    (text.to_string(), Vec::new())
}

fn el_attr(text: &str, name: &str, value: &str) -> ElementSpec {
    (text.to_string(), vec![(name.to_string(), value.to_string())])
}

/// Canned DOM state: selector -> elements, plus scoped entries keyed by
/// (scope selector, scope index, child selector)
#[derive(Clone, Default)]
struct StubPage {
    toplevel: HashMap<String, Vec<ElementSpec>>,
    nested: HashMap<(String, usize, String), Vec<ElementSpec>>,
}

impl StubPage {
    fn with(mut self, selector: &str, elements: Vec<ElementSpec>) -> Self {
        self.toplevel.insert(selector.to_string(), elements);
        self
    }

    fn with_nested(
        mut self,
        scope: &str,
        index: usize,
        selector: &str,
        elements: Vec<ElementSpec>,
    ) -> Self {
        self.nested
            .insert((scope.to_string(), index, selector.to_string()), elements);
        self
    }
}

/// A fully navigable widget page: two date columns plus a calendar where
/// day 25 is visible
fn widget_page() -> StubPage {
    StubPage::default()
        .with("text='New Patient'", vec![el("New Patient")])
        .with("text='Returning Patient'", vec![el("Returning Patient")])
        .with("text='Continue'", vec![el("Continue")])
        .with("text='Select a Reason'", vec![el("Select a Reason")])
        .with(
            "text='New Patient Exam - 60 min'",
            vec![el("New Patient Exam - 60 min")],
        )
        .with(".ib-booking-column", vec![el(""), el("")])
        .with_nested(".ib-booking-column", 0, ".ib-booking-day", vec![el("Wed")])
        .with_nested(".ib-booking-column", 0, ".ib-booking-dateNum", vec![el("25")])
        .with_nested(
            ".ib-booking-column",
            0,
            ".ib-booking-time span[time]",
            vec![
                el_attr("9:00 AM", "time", "2024-09-25T09:00:00"),
                el("10:00 AM"),
                el(""),
            ],
        )
        .with_nested(".ib-booking-column", 1, ".ib-booking-day", vec![el("Thu")])
        .with_nested(".ib-booking-column", 1, ".ib-booking-dateNum", vec![el("26")])
        .with_nested(
            ".ib-booking-column",
            1,
            ".ib-booking-time span[time]",
            vec![el_attr("11:00 AM", "time", "2024-09-26T11:00:00")],
        )
        .with("span.ib-booking-dateNum", vec![el("25"), el("26")])
        .with(
            "div.ib-booking-active + div.ib-booking-times span.ib-booking-active",
            vec![el_attr("9:00 AM", "time", "2024-09-25T09:00:00")],
        )
}

fn widget_page_with_dates(cells: &[&str]) -> StubPage {
    widget_page().with(
        "span.ib-booking-dateNum",
        cells.iter().map(|c| el(c)).collect(),
    )
}

#[derive(Default)]
struct CallLog {
    opens: AtomicUsize,
    closes: AtomicUsize,
    gotos: AtomicUsize,
    screenshots: AtomicUsize,
}

#[derive(Clone, Copy, PartialEq)]
enum FailureMode {
    None,
    NavigationTimeout,
    /// Navigation completes but the page answers with this HTTP status
    HttpStatus(u16),
}

#[derive(Clone)]
struct StubDriver {
    pages: Arc<Vec<StubPage>>,
    mode: FailureMode,
    calls: Arc<CallLog>,
}

impl StubDriver {
    fn new(page: StubPage) -> Self {
        Self::with_pages(vec![page])
    }

    /// Successive pages model what the calendar shows after each
    /// next-month click
    fn with_pages(pages: Vec<StubPage>) -> Self {
        Self {
            pages: Arc::new(pages),
            mode: FailureMode::None,
            calls: Arc::new(CallLog::default()),
        }
    }

    fn failing_navigation() -> Self {
        Self {
            pages: Arc::new(vec![StubPage::default()]),
            mode: FailureMode::NavigationTimeout,
            calls: Arc::new(CallLog::default()),
        }
    }

    fn failing_with_status(status: u16) -> Self {
        Self {
            pages: Arc::new(vec![StubPage::default()]),
            mode: FailureMode::HttpStatus(status),
            calls: Arc::new(CallLog::default()),
        }
    }

    fn opens(&self) -> usize {
        self.calls.opens.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.calls.closes.load(Ordering::SeqCst)
    }

    fn gotos(&self) -> usize {
        self.calls.gotos.load(Ordering::SeqCst)
    }

    fn screenshots(&self) -> usize {
        self.calls.screenshots.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WidgetDriver for StubDriver {
    type Session = StubSession;

    async fn open_page(&self) -> DriverResult<StubSession> {
        self.calls.opens.fetch_add(1, Ordering::SeqCst);
        Ok(StubSession {
            pages: Arc::clone(&self.pages),
            current: 0,
            mode: self.mode,
            calls: Arc::clone(&self.calls),
        })
    }
}

struct StubSession {
    pages: Arc<Vec<StubPage>>,
    current: usize,
    mode: FailureMode,
    calls: Arc<CallLog>,
}

impl StubSession {
    fn page(&self) -> &StubPage {
        &self.pages[self.current]
    }

    fn handles(&self, specs: &[ElementSpec], selector: &str) -> Vec<ElementHandle> {
        specs
            .iter()
            .enumerate()
            .map(|(index, (text, attrs))| {
                let attrs: BTreeMap<String, String> = attrs.iter().cloned().collect();
                ElementHandle::new(ElementLocator::new(selector, index), text.clone(), attrs)
            })
            .collect()
    }
}

#[async_trait]
impl WidgetSession for StubSession {
    async fn goto(&mut self, _url: &str, _timeout: Duration) -> DriverResult<u16> {
        self.calls.gotos.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FailureMode::NavigationTimeout => {
                Err(DriverError::Timeout("page never settled".to_string()))
            }
            FailureMode::HttpStatus(status) => Ok(status),
            FailureMode::None => Ok(200),
        }
    }

    async fn wait_for_visible(&mut self, selector: &str, _timeout: Duration) -> DriverResult<()> {
        if self.page().toplevel.contains_key(selector) {
            Ok(())
        } else {
            Err(DriverError::Timeout(format!("no element {selector}")))
        }
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        if selector == ".ib-booking-calendar-next" {
            if self.current + 1 < self.pages.len() {
                self.current += 1;
            }
            return Ok(());
        }
        if self.page().toplevel.contains_key(selector) {
            Ok(())
        } else {
            Err(DriverError::Fault(format!("element not found: {selector}")))
        }
    }

    async fn click_element(&mut self, _locator: &ElementLocator) -> DriverResult<()> {
        Ok(())
    }

    async fn wait_for_quiescence(&mut self, _timeout: Duration) -> DriverResult<()> {
        Ok(())
    }

    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        let specs = self.page().toplevel.get(selector).cloned().unwrap_or_default();
        Ok(self.handles(&specs, selector))
    }

    async fn query_within(
        &mut self,
        scope: &ElementLocator,
        selector: &str,
    ) -> DriverResult<Vec<ElementHandle>> {
        let key = (scope.selector.clone(), scope.index, selector.to_string());
        let specs = self.page().nested.get(&key).cloned().unwrap_or_default();
        Ok(self.handles(&specs, selector))
    }

    async fn screenshot(&mut self, _path: &Path) -> DriverResult<()> {
        self.calls.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn test_config() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.snapshot_dir = std::env::temp_dir().join("slot-scout-tests");
    config
}

fn unfiltered_request() -> SlotRequest {
    SlotRequest::new(PatientType::NewPatient, AppointmentType::NewAppointment)
}

#[tokio::test]
async fn test_resolve_extracts_slots_with_placeholder_rule() {
    let driver = StubDriver::new(widget_page());
    let orchestrator = SlotQueryOrchestrator::new(driver.clone(), test_config());

    let slots = orchestrator.resolve(&unfiltered_request()).await;

    assert_eq!(slots.len(), 4);
    assert_eq!(
        slots[0],
        Slot::new("Wed 25", "9:00 AM", Some("2024-09-25T09:00:00".to_string()))
    );
    // Readable text but no machine attribute keeps the text
    assert_eq!(slots[1].time, "10:00 AM");
    assert_eq!(slots[1].machine_datetime, None);
    // Neither text nor attribute becomes a placeholder
    assert_eq!(slots[2].time, "\u{00A0}");
    assert_eq!(slots[2].machine_datetime, None);
    assert_eq!(slots[3].date, "Thu 26");
}

#[tokio::test]
async fn test_second_identical_resolve_is_served_from_cache() {
    let driver = StubDriver::new(widget_page());
    let orchestrator = SlotQueryOrchestrator::new(driver.clone(), test_config());

    let first = orchestrator.resolve(&unfiltered_request()).await;
    let second = orchestrator.resolve(&unfiltered_request()).await;

    assert_eq!(first, second);
    assert_eq!(driver.opens(), 1, "second resolve must not touch the driver");
    assert_eq!(driver.gotos(), 1);
    assert_eq!(driver.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deterministic_failure_exhausts_retries_with_backoff() {
    let driver = StubDriver::failing_navigation();
    let orchestrator = SlotQueryOrchestrator::new(driver.clone(), test_config());

    let start = tokio::time::Instant::now();
    let slots = orchestrator.resolve(&unfiltered_request()).await;

    assert!(slots.is_empty());
    assert_eq!(driver.opens(), 3);
    assert_eq!(driver.closes(), 3);
    // One diagnostic snapshot per failed attempt, before teardown
    assert_eq!(driver.screenshots(), 3);
    // Two backoff sleeps: 1 unit then 2
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_non_success_status_exhausts_retries() {
    let driver = StubDriver::failing_with_status(503);
    let orchestrator = SlotQueryOrchestrator::new(driver.clone(), test_config());

    let slots = orchestrator.resolve(&unfiltered_request()).await;

    assert!(slots.is_empty());
    assert_eq!(driver.opens(), 3);
    assert_eq!(driver.closes(), 3);
    assert_eq!(driver.screenshots(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_session_released_when_flow_fails_partway() {
    // Navigation succeeds, but the Continue control never appears
    let page = StubPage::default().with("text='New Patient'", vec![el("New Patient")]);
    let driver = StubDriver::new(page);
    let orchestrator = SlotQueryOrchestrator::new(driver.clone(), test_config());

    let slots = orchestrator.resolve(&unfiltered_request()).await;

    assert!(slots.is_empty());
    assert_eq!(driver.opens(), driver.closes());
    assert_eq!(driver.opens(), 3);
    // Each failed attempt leaves a snapshot of the stuck page
    assert_eq!(driver.screenshots(), 3);
}

#[tokio::test]
async fn test_unknown_input_never_opens_a_session() {
    let driver = StubDriver::new(widget_page());
    let mut selectors = WidgetSelectors::default();
    selectors
        .patient_options
        .remove(&PatientType::ReturningPatient);

    let orchestrator = SlotQueryOrchestrator::with_parts(
        driver.clone(),
        test_config(),
        selectors,
        SlotCache::new(),
    );

    let request = SlotRequest::new(PatientType::ReturningPatient, AppointmentType::NewAppointment);
    let slots = orchestrator.resolve(&request).await;

    assert!(slots.is_empty());
    assert_eq!(driver.gotos(), 0);
    assert_eq!(driver.opens(), 0);
    // A caller error is not a UI fault; nothing to snapshot
    assert_eq!(driver.screenshots(), 0);
}

#[tokio::test]
async fn test_date_filtered_queries_do_not_share_cache_entries() {
    let driver = StubDriver::new(widget_page());
    let orchestrator = SlotQueryOrchestrator::new(driver.clone(), test_config());

    let all = orchestrator.resolve(&unfiltered_request()).await;
    assert_eq!(all.len(), 4);
    assert_eq!(driver.gotos(), 1);

    let filtered_request = unfiltered_request().with_date("2024-09-25".parse().unwrap());
    let filtered = orchestrator.resolve(&filtered_request).await;
    assert_eq!(driver.gotos(), 2, "filtered query must not hit the unfiltered entry");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].date, "2024-09-25");
    assert_ne!(all, filtered);

    // The unfiltered entry survives untouched
    let all_again = orchestrator.resolve(&unfiltered_request()).await;
    assert_eq!(all_again, all);
    assert_eq!(driver.gotos(), 2);

    // Filtered results are never cached
    orchestrator.resolve(&filtered_request).await;
    assert_eq!(driver.gotos(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_calendar_pages_forward_to_find_the_requested_day() {
    let first_month = widget_page_with_dates(&["27", "28"]);
    let second_month = widget_page();
    let driver = StubDriver::with_pages(vec![first_month, second_month]);
    let orchestrator = SlotQueryOrchestrator::new(driver.clone(), test_config());

    let request = unfiltered_request().with_date("2024-09-25".parse().unwrap());
    let slots = orchestrator.resolve(&request).await;

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].time, "9:00 AM");
    assert_eq!(driver.opens(), 1, "paging happens within one attempt");
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_day_exhausts_paging_then_retries() {
    let driver = StubDriver::new(widget_page_with_dates(&["27", "28"]));
    let orchestrator = SlotQueryOrchestrator::new(driver.clone(), test_config());

    let request = unfiltered_request().with_date("2024-09-25".parse().unwrap());
    let slots = orchestrator.resolve(&request).await;

    assert!(slots.is_empty());
    assert_eq!(driver.opens(), 3);
    assert_eq!(driver.closes(), 3);
}

#[tokio::test]
async fn test_missing_slot_region_is_empty_success_and_cached() {
    // Flow completes but the widget renders no slot grid at all
    let page = StubPage::default()
        .with("text='New Patient'", vec![el("New Patient")])
        .with("text='Continue'", vec![el("Continue")])
        .with("text='Select a Reason'", vec![el("Select a Reason")])
        .with(
            "text='New Patient Exam - 60 min'",
            vec![el("New Patient Exam - 60 min")],
        );
    let driver = StubDriver::new(page);
    let orchestrator = SlotQueryOrchestrator::new(driver.clone(), test_config());

    let slots = orchestrator.resolve(&unfiltered_request()).await;
    assert!(slots.is_empty());
    assert_eq!(driver.opens(), 1, "empty extraction is success, not a retry");
    // Still leaves one snapshot so "no slots" can be told from "no grid"
    assert_eq!(driver.screenshots(), 1);

    // Empty is a valid result and is cached like any other
    orchestrator.resolve(&unfiltered_request()).await;
    assert_eq!(driver.opens(), 1);
    assert_eq!(driver.screenshots(), 1);
}
