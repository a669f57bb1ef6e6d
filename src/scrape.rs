//! Headless-browser scraping of rendered pages.
//!
//! A fixed sequence: launch Chrome, navigate, wait for a marker element that
//! signals the page finished rendering, extract something from the DOM and
//! close the browser. Nothing is retried.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info};
use serde::Serialize;

use crate::error::{Error, Result};

/// The page scraped by default.
pub const TARGET_URL: &str = "http://127.0.0.1:5500/test.html";

/// The element the page adds once it is done rendering.
pub const DONE_SELECTOR: &str = "#done";

/// The browser window size, which is also the screenshot size.
pub const WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// How long to wait for selectors when nothing else is configured. Long
/// enough to never trigger in practice.
pub const WAIT_FOREVER: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Where and how to scrape.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// The page to navigate to.
    pub url: String,
    /// The selector that marks the page as done.
    pub done_selector: String,
    /// The browser window size, `None` for Chrome's default.
    pub window_size: Option<(u32, u32)>,
    /// How long selector waits may take.
    pub wait_timeout: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            url: TARGET_URL.to_string(),
            done_selector: DONE_SELECTOR.to_string(),
            window_size: Some(WINDOW_SIZE),
            wait_timeout: WAIT_FOREVER,
        }
    }
}

/// What to pull out of the page once it is done.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// The first element matching a selector.
    Element(String),
    /// The `id` of every element matching a selector, in document order.
    Identifiers(String),
    /// A PNG screenshot of the viewport, written to a file.
    Screenshot(PathBuf),
}

/// A description of a DOM element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementHandle {
    /// The element's tag name.
    pub tag_name: String,
    /// The DevTools backend node id.
    pub backend_node_id: u32,
    /// Flattened `name, value` attribute pairs.
    pub attributes: Vec<String>,
}

/// The outcome of one scrape run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeResult {
    /// A single element.
    Element(ElementHandle),
    /// Element identifiers in document order.
    Identifiers(Vec<String>),
    /// A screenshot written to disk.
    Screenshot {
        /// Where the PNG was written.
        path: PathBuf,
        /// The size of the PNG in bytes.
        bytes: usize,
    },
}

impl ScrapeResult {
    /// Serialize the result for logging.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// A running headless Chrome. The browser process ends when the session is
/// dropped.
pub struct BrowserSession {
    browser: Browser,
}

impl BrowserSession {
    /// Launch a headless browser.
    pub fn launch(config: &ScrapeConfig) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(config.window_size)
            .build()
            .map_err(|e| Error::Browser(format!("failed to build launch options: {}", e)))?;

        Ok(Self {
            browser: Browser::new(options)?,
        })
    }

    /// Open a new tab and navigate it to the configured page.
    pub fn open(&self, config: &ScrapeConfig) -> Result<Arc<Tab>> {
        let tab = self.browser.new_tab()?;
        tab.set_default_timeout(config.wait_timeout);
        tab.navigate_to(&config.url)?.wait_until_navigated()?;

        Ok(tab)
    }

    /// Shut the browser down.
    pub fn close(self) {
        drop(self.browser);
    }
}

/// Block until an element matching `selector` exists.
pub fn wait_for_selector(tab: &Tab, selector: &str) -> Result<()> {
    tab.wait_for_element(selector)?;
    Ok(())
}

/// Run `extraction` against the current state of `tab`.
pub fn extract(tab: &Tab, extraction: &Extraction) -> Result<ScrapeResult> {
    match extraction {
        Extraction::Element(selector) => {
            let element = tab.wait_for_element(selector)?;
            Ok(ScrapeResult::Element(ElementHandle {
                tag_name: element.tag_name.clone(),
                backend_node_id: element.backend_node_id,
                attributes: element.attributes.clone().unwrap_or_default(),
            }))
        }
        Extraction::Identifiers(selector) => {
            let remote = tab.evaluate(&identifiers_script(selector), false)?;
            parse_identifiers(remote.value).map(ScrapeResult::Identifiers)
        }
        Extraction::Screenshot(path) => {
            let png = tab.capture_screenshot(
                Page::CaptureScreenshotFormatOption::Png,
                None,
                None,
                true,
            )?;
            fs::write(path, &png)?;
            Ok(ScrapeResult::Screenshot {
                path: path.clone(),
                bytes: png.len(),
            })
        }
    }
}

/// Launch, navigate, wait for the done marker, extract and close.
pub fn scrape(config: &ScrapeConfig, extraction: &Extraction) -> Result<ScrapeResult> {
    let mut stage = Instant::now();
    let mut lap = |name: &str| {
        debug!("{} took {:?}", name, stage.elapsed());
        stage = Instant::now();
    };

    let session = BrowserSession::launch(config)?;
    lap("launch");
    let tab = session.open(config)?;
    lap("navigation");
    wait_for_selector(&tab, &config.done_selector)?;
    lap("waiting for done marker");
    let result = extract(&tab, extraction)?;
    lap("extraction");

    drop(tab);
    session.close();
    lap("close");

    info!("{}", result.to_json());
    Ok(result)
}

/// A script mapping every element matching `selector` to its id, returned as
/// a JSON string so it survives the trip back from the browser as a primitive.
fn identifiers_script(selector: &str) -> String {
    let quoted = serde_json::Value::String(selector.to_string()).to_string();
    format!(
        "JSON.stringify(Array.from(document.querySelectorAll({}), e => e.id))",
        quoted
    )
}

fn parse_identifiers(value: Option<serde_json::Value>) -> Result<Vec<String>> {
    let value = match value {
        Some(serde_json::Value::String(json)) => serde_json::from_str(&json),
        Some(other) => serde_json::from_value(other),
        None => return Err(Error::Browser("no value returned from evaluation".into())),
    };

    value.map_err(|e| Error::Browser(format!("unexpected identifier list: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_config_targets_fixed_page() {
        let config = ScrapeConfig::default();
        assert_eq!(config.url, "http://127.0.0.1:5500/test.html");
        assert_eq!(config.done_selector, "#done");
        assert_eq!(config.wait_timeout, WAIT_FOREVER);
        assert_eq!(config.window_size, Some((1920, 1080)));
    }

    #[test]
    fn identifiers_script_quotes_selector() {
        assert_eq!(
            identifiers_script(r#"div[data-x="a"]"#),
            r#"JSON.stringify(Array.from(document.querySelectorAll("div[data-x=\"a\"]"), e => e.id))"#
        );
    }

    #[test]
    fn identifiers_keep_document_order() {
        let ids = parse_identifiers(Some(json!(r#"["b","a",""]"#))).unwrap();
        assert_eq!(ids, vec!["b", "a", ""]);

        let ids = parse_identifiers(Some(json!(["x", "y"]))).unwrap();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn missing_or_malformed_identifiers_fail() {
        assert!(matches!(parse_identifiers(None), Err(Error::Browser(_))));
        assert!(matches!(
            parse_identifiers(Some(json!("{\"a\":1}"))),
            Err(Error::Browser(_))
        ));
    }

    #[test]
    fn results_serialize_for_logging() {
        let result = ScrapeResult::Identifiers(vec!["a".into(), "b".into()]);
        assert_eq!(result.to_json(), r#"{"identifiers":["a","b"]}"#);

        let result = ScrapeResult::Element(ElementHandle {
            tag_name: "IMG".into(),
            backend_node_id: 7,
            attributes: vec!["src".into(), "out.png".into()],
        });
        assert_eq!(
            result.to_json(),
            r#"{"element":{"tag_name":"IMG","backend_node_id":7,"attributes":["src","out.png"]}}"#
        );
    }
}
