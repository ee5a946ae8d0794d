//! Chrome-backed Widget Driver.
//!
//! This is the vendor-facing glue: it bridges the capability traits onto a
//! `headless_chrome` browser. DOM interaction goes through evaluated
//! JavaScript so element state can be materialized in one round trip, and
//! the blocking CDP calls are moved off the async runtime with
//! `spawn_blocking`.
//!
//! Selectors are CSS, with one convention on top: `text='...'` matches the
//! first leaf element whose trimmed text equals the quoted string (the form
//! the booking widget's clickable labels are addressed by).

use crate::driver::config::DriverOptions;
use crate::driver::{ElementHandle, ElementLocator, WidgetDriver, WidgetSession};
use crate::error::{DriverError, DriverResult};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, Tab};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settle window after the document reports readiness; the widget keeps
/// reacting briefly after readyState flips
const QUIESCENCE_SETTLE: Duration = Duration::from_millis(500);

const NAV_STATUS_EXPR: &str = "(() => { const e = performance.getEntriesByType('navigation')[0]; \
     return e && e.responseStatus ? e.responseStatus : 0; })()";

/// Driver that launches one Chrome instance per page session
#[derive(Debug, Clone)]
pub struct ChromeDriver {
    options: DriverOptions,
}

impl ChromeDriver {
    pub fn new(options: DriverOptions) -> Self {
        Self { options }
    }
}

impl Default for ChromeDriver {
    fn default() -> Self {
        Self::new(DriverOptions::default())
    }
}

#[async_trait]
impl WidgetDriver for ChromeDriver {
    type Session = ChromeSession;

    async fn open_page(&self) -> DriverResult<ChromeSession> {
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || ChromeSession::launch(options))
            .await
            .map_err(|e| DriverError::Fault(format!("driver task failed: {e}")))?
    }
}

/// One live Chrome context: a browser process plus a single page
pub struct ChromeSession {
    /// Keeps the browser process alive; killed when the session drops
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    fn launch(options: DriverOptions) -> DriverResult<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts
            .ignore_default_args
            .push(OsStr::new("--enable-automation"));
        launch_opts
            .args
            .push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // The default idle timeout (30s) is shorter than the widget's slow
        // waits and would drop the browser mid-flow
        launch_opts.idle_browser_timeout = Duration::from_secs(600);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.sandbox = options.sandbox;

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }
        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        let browser =
            Browser::new(launch_opts).map_err(|e| DriverError::Fault(format!("launch failed: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::Fault(format!("failed to create tab: {e}")))?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    async fn with_tab<T, F>(&self, f: F) -> DriverResult<T>
    where
        F: FnOnce(&Tab) -> DriverResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| DriverError::Fault(format!("driver task failed: {e}")))?
    }
}

#[async_trait]
impl WidgetSession for ChromeSession {
    async fn goto(&mut self, url: &str, timeout: Duration) -> DriverResult<u16> {
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)
                .map_err(|e| classify("navigation failed", e))?;
            tab.wait_until_navigated()
                .map_err(|e| classify("navigation did not settle", e))?;

            // Older Chrome builds do not expose responseStatus; 0 means the
            // probe came back empty and the navigation already succeeded.
            let status = eval_value(tab, NAV_STATUS_EXPR)?.as_u64().unwrap_or(0) as u16;
            Ok(if status == 0 { 200 } else { status })
        })
        .await
    }

    async fn wait_for_visible(&mut self, selector: &str, timeout: Duration) -> DriverResult<()> {
        let expr = visible_expr(selector);
        let what = format!("element {selector}");
        self.with_tab(move |tab| poll_until(tab, &expr, timeout, &what)).await
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        let expr = click_expr(&locate_expr(selector));
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            if eval_value(tab, &expr)?.as_bool().unwrap_or(false) {
                Ok(())
            } else {
                Err(DriverError::Fault(format!("element not found: {selector}")))
            }
        })
        .await
    }

    async fn click_element(&mut self, locator: &ElementLocator) -> DriverResult<()> {
        let expr = click_expr(&element_expr(locator));
        let locator = locator.clone();
        self.with_tab(move |tab| {
            if eval_value(tab, &expr)?.as_bool().unwrap_or(false) {
                Ok(())
            } else {
                Err(DriverError::Fault(format!(
                    "element no longer present: {}[{}]",
                    locator.selector, locator.index
                )))
            }
        })
        .await
    }

    async fn wait_for_quiescence(&mut self, timeout: Duration) -> DriverResult<()> {
        self.with_tab(move |tab| {
            poll_until(
                tab,
                "document.readyState === 'complete'",
                timeout,
                "page quiescence",
            )?;
            std::thread::sleep(QUIESCENCE_SETTLE);
            Ok(())
        })
        .await
    }

    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        let expr = collect_expr("document", selector);
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let raw = parse_collected(&eval_value(tab, &expr)?)?;
            Ok(raw
                .into_iter()
                .enumerate()
                .map(|(index, el)| {
                    ElementHandle::new(ElementLocator::new(&selector, index), el.text, el.attrs)
                })
                .collect())
        })
        .await
    }

    async fn query_within(
        &mut self,
        scope: &ElementLocator,
        selector: &str,
    ) -> DriverResult<Vec<ElementHandle>> {
        let expr = collect_expr(&element_expr(scope), selector);
        let selector = selector.to_string();
        let scope = scope.clone();
        self.with_tab(move |tab| {
            let raw = parse_collected(&eval_value(tab, &expr)?)?;
            Ok(raw
                .into_iter()
                .enumerate()
                .map(|(index, el)| {
                    ElementHandle::new(
                        ElementLocator::new(&selector, index).within(scope.clone()),
                        el.text,
                        el.attrs,
                    )
                })
                .collect())
        })
        .await
    }

    async fn screenshot(&mut self, path: &Path) -> DriverResult<()> {
        let path: PathBuf = path.to_path_buf();
        self.with_tab(move |tab| {
            let data = tab
                .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(|e| classify("screenshot failed", e))?;
            std::fs::write(&path, data)
                .map_err(|e| DriverError::Fault(format!("could not write {}: {e}", path.display())))
        })
        .await
    }

    async fn close(&mut self) -> DriverResult<()> {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || {
            // Closing the tab is enough; the browser process goes down with
            // the session drop.
            tab.close(false)
                .map(|_| ())
                .map_err(|e| classify("tab close failed", e))
        })
        .await
        .map_err(|e| DriverError::Fault(format!("driver task failed: {e}")))?
    }
}

#[derive(Debug, Deserialize)]
struct CollectedElement {
    #[serde(default)]
    text: String,
    #[serde(default)]
    attrs: BTreeMap<String, String>,
}

fn parse_collected(value: &serde_json::Value) -> DriverResult<Vec<CollectedElement>> {
    let json = value
        .as_str()
        .ok_or_else(|| DriverError::Fault("element query returned no payload".to_string()))?;
    serde_json::from_str(json)
        .map_err(|e| DriverError::Fault(format!("malformed element payload: {e}")))
}

fn eval_value(tab: &Tab, expr: &str) -> DriverResult<serde_json::Value> {
    let object = tab
        .evaluate(expr, false)
        .map_err(|e| classify("evaluate failed", e))?;
    Ok(object.value.unwrap_or(serde_json::Value::Null))
}

fn poll_until(tab: &Tab, expr: &str, timeout: Duration, what: &str) -> DriverResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if eval_value(tab, expr)?.as_bool().unwrap_or(false) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(DriverError::Timeout(format!("timed out waiting for {what}")));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Sort a driver failure into timeout vs generic fault.
///
/// headless_chrome reports everything through `anyhow::Error`, but its wait
/// deadline failures carry a concrete `util::Timeout` somewhere in the chain;
/// the message heuristic only covers errors phrased by other layers.
fn classify(context: &str, err: anyhow::Error) -> DriverError {
    let message = format!("{context}: {err}");
    if err.downcast_ref::<headless_chrome::util::Timeout>().is_some() {
        return DriverError::Timeout(message);
    }
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("timeout") || lowered.contains("timed out") {
        DriverError::Timeout(message)
    } else {
        DriverError::Fault(message)
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn parse_text_selector(selector: &str) -> Option<&str> {
    selector.strip_prefix("text='")?.strip_suffix('\'')
}

/// JS expression evaluating to the first matching element or null
fn locate_expr(selector: &str) -> String {
    match parse_text_selector(selector) {
        Some(text) => format!(
            "(() => {{ const t = {}; \
             for (const el of document.querySelectorAll('*')) {{ \
               if (el.children.length === 0 && el.textContent.trim() === t) return el; \
             }} return null; }})()",
            js_string(text)
        ),
        None => format!("document.querySelector({})", js_string(selector)),
    }
}

/// JS expression resolving a locator (possibly scoped) to an element or null
fn element_expr(locator: &ElementLocator) -> String {
    let lookup = format!("querySelectorAll({})[{}]", js_string(&locator.selector), locator.index);
    match &locator.scope {
        None => format!("document.{lookup}"),
        Some(scope) => format!("((s) => s ? s.{lookup} : null)({})", element_expr(scope)),
    }
}

fn visible_expr(selector: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return false; \
         const r = el.getBoundingClientRect(); return r.width > 0 && r.height > 0; }})()",
        locate_expr(selector)
    )
}

fn click_expr(element: &str) -> String {
    format!(
        "(() => {{ const el = {element}; if (!el) return false; \
         el.scrollIntoView({{block: 'center'}}); el.click(); return true; }})()"
    )
}

fn collect_expr(root: &str, selector: &str) -> String {
    format!(
        "((root) => {{ if (!root) return '[]'; \
         const els = Array.from(root.querySelectorAll({})); \
         return JSON.stringify(els.map(el => {{ \
           const attrs = {{}}; \
           for (const n of el.getAttributeNames()) attrs[n] = el.getAttribute(n); \
           return {{ text: el.textContent, attrs }}; \
         }})); }})({root})",
        js_string(selector)
    )
}
