//! Widget Driver capability.
//!
//! The orchestrator never touches a browser directly; it drives the booking
//! widget through the capability traits defined here:
//! - [`WidgetDriver`]: opens a fresh page session
//! - [`WidgetSession`]: one live browser context (navigation, waits, clicks,
//!   element queries, diagnostic screenshots)
//! - [`ElementHandle`]: a materialized element snapshot with its text and
//!   attributes, plus an opaque locator so scoped re-query and clicking work
//!
//! Handles are materialized eagerly at query time: CDP node borrows cannot
//! be held across suspension points, so the session reads text and
//! attributes up front and hands back plain data.
//!
//! Every call may fail with [`Timeout`] or [`Fault`].
//!
//! [`Timeout`]: crate::error::DriverError::Timeout
//! [`Fault`]: crate::error::DriverError::Fault

pub mod chrome;
pub mod config;

pub use chrome::{ChromeDriver, ChromeSession};
pub use config::DriverOptions;

use crate::error::DriverResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Opaque position of a materialized element within the page, usable for
/// scoped re-query and for clicking the element it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementLocator {
    /// Selector the element was enumerated under
    pub selector: String,
    /// Index within that enumeration
    pub index: usize,
    /// Enclosing element when the enumeration was scoped
    pub scope: Option<Box<ElementLocator>>,
}

impl ElementLocator {
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
            scope: None,
        }
    }

    pub fn within(mut self, scope: ElementLocator) -> Self {
        self.scope = Some(Box::new(scope));
        self
    }
}

/// A snapshot of one rendered element: its text content and attributes as
/// they were at query time
#[derive(Debug, Clone)]
pub struct ElementHandle {
    locator: ElementLocator,
    text: String,
    attributes: BTreeMap<String, String>,
}

impl ElementHandle {
    pub fn new(
        locator: ElementLocator,
        text: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            locator,
            text: text.into(),
            attributes,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn locator(&self) -> &ElementLocator {
        &self.locator
    }
}

/// Factory for page sessions. One driver may open many sessions; each
/// session is exclusively owned by its caller until closed.
#[async_trait]
pub trait WidgetDriver: Send + Sync {
    type Session: WidgetSession;

    /// Open a fresh browser context with a single page
    async fn open_page(&self) -> DriverResult<Self::Session>;
}

/// One live browser context. Methods take `&mut self`: a session is owned
/// by exactly one flow attempt and must not be used after [`close`].
///
/// [`close`]: WidgetSession::close
#[async_trait]
pub trait WidgetSession: Send {
    /// Navigate to a URL and wait for the load to settle, returning the
    /// HTTP status of the navigation response
    async fn goto(&mut self, url: &str, timeout: Duration) -> DriverResult<u16>;

    /// Wait until an element matching the selector is rendered and visible
    async fn wait_for_visible(&mut self, selector: &str, timeout: Duration) -> DriverResult<()>;

    /// Click the first element matching the selector
    async fn click(&mut self, selector: &str) -> DriverResult<()>;

    /// Click a previously enumerated element by its locator
    async fn click_element(&mut self, locator: &ElementLocator) -> DriverResult<()>;

    /// Wait until the page stops reacting to the last action
    async fn wait_for_quiescence(&mut self, timeout: Duration) -> DriverResult<()>;

    /// Enumerate all elements matching the selector
    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<ElementHandle>>;

    /// Enumerate elements matching `selector` inside the scope element
    async fn query_within(
        &mut self,
        scope: &ElementLocator,
        selector: &str,
    ) -> DriverResult<Vec<ElementHandle>>;

    /// Capture a PNG screenshot of the current page state
    async fn screenshot(&mut self, path: &Path) -> DriverResult<()>;

    /// Tear down the browser context. The session must not be used after.
    async fn close(&mut self) -> DriverResult<()>;
}
