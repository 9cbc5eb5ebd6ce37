use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::locator::Locator;
use crate::page::{Page, PageElement};
use crate::utils::error::{AppError, Result};

const VISIBILITY_CHECK: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}"#;

fn browser_error(context: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Browser(format!("{}: {}", context, e))
}

/// headless_chrome signals "nothing matched" with these two errors; anything
/// else means the session itself is in trouble.
fn is_absent(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NoElementFound>().is_some() || e.downcast_ref::<Timeout>().is_some()
}

fn lookup_error(locator: &Locator, e: anyhow::Error, absent: AppError) -> AppError {
    if is_absent(&e) {
        absent
    } else {
        browser_error(&format!("Lookup of {} failed", locator), e)
    }
}

/// A single headless Chrome process with one tab. Dropping the session
/// closes the browser.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch(config: &ScraperConfig) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((config.window_width, config.window_height)))
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-background-timer-throttling"),
                OsStr::new("--disable-backgrounding-occluded-windows"),
                OsStr::new("--disable-renderer-backgrounding"),
            ])
            .build()
            .map_err(|e| browser_error("Failed to create launch options", e))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser =
            Browser::new(launch_options).map_err(|e| browser_error("Failed to launch browser", e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| browser_error("Failed to create tab", e))?;
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| browser_error("Failed to set user agent", e))?;

        info!(headless = config.headless, "Browser session started");

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn first_match(&self, locator: &Locator, timeout: Duration) -> Result<Element<'_>> {
        let found = match locator {
            Locator::Css(selector) => self.tab.wait_for_element_with_custom_timeout(selector, timeout),
            Locator::XPath(xpath) => self.tab.wait_for_xpath_with_custom_timeout(xpath, timeout),
            Locator::Text { tag, needle } => self
                .tab
                .wait_for_xpath_with_custom_timeout(&Locator::text_xpath(tag, needle, false), timeout),
        };
        found.map_err(|e| {
            lookup_error(
                locator,
                e,
                AppError::Timeout {
                    selector: locator.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                },
            )
        })
    }
}

impl Page for ChromeSession {
    type Element<'a> = ChromeElement<'a>;

    fn goto(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| browser_error("Navigation failed", e))?
            .wait_until_navigated()
            .map_err(|e| browser_error("Page load failed", e))?;
        Ok(())
    }

    fn is_visible(&self, locator: &Locator, timeout: Duration) -> Result<bool> {
        let element = match self.first_match(locator, timeout) {
            Ok(element) => element,
            Err(AppError::Timeout { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        let visible = element
            .call_js_fn(VISIBILITY_CHECK, vec![], false)
            .map_err(|e| browser_error("Visibility check failed", e))?;
        Ok(visible
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    fn click(&self, locator: &Locator) -> Result<()> {
        let found = match locator {
            Locator::Css(selector) => self.tab.find_element(selector),
            Locator::XPath(xpath) => self.tab.find_element_by_xpath(xpath),
            Locator::Text { tag, needle } => self
                .tab
                .find_element_by_xpath(&Locator::text_xpath(tag, needle, false)),
        };
        let element = found.map_err(|e| {
            lookup_error(
                locator,
                e,
                AppError::ElementNotFound {
                    selector: locator.to_string(),
                },
            )
        })?;
        element
            .click()
            .map_err(|e| browser_error("Click failed", e))?;
        Ok(())
    }

    fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        self.first_match(locator, timeout).map(|_| ())
    }

    fn find_all(&self, locator: &Locator) -> Result<Vec<ChromeElement<'_>>> {
        let found = match locator {
            Locator::Css(selector) => self.tab.find_elements(selector),
            Locator::XPath(xpath) => self.tab.find_elements_by_xpath(xpath),
            Locator::Text { tag, needle } => self
                .tab
                .find_elements_by_xpath(&Locator::text_xpath(tag, needle, false)),
        };
        match found {
            Ok(elements) => Ok(elements.into_iter().map(ChromeElement).collect()),
            Err(e) if is_absent(&e) => {
                debug!("No elements for {}", locator);
                Ok(Vec::new())
            }
            Err(e) => Err(browser_error(&format!("Lookup of {} failed", locator), e)),
        }
    }
}

pub struct ChromeElement<'a>(Element<'a>);

impl PageElement for ChromeElement<'_> {
    type Child<'s>
        = ChromeElement<'s>
    where
        Self: 's;

    fn find<'s>(&'s self, locator: &Locator) -> Result<ChromeElement<'s>> {
        let found = match locator {
            Locator::Css(selector) => self.0.find_element(selector),
            Locator::XPath(xpath) => self.0.find_element_by_xpath(xpath),
            Locator::Text { tag, needle } => self
                .0
                .find_element_by_xpath(&Locator::text_xpath(tag, needle, true)),
        };
        found.map(ChromeElement).map_err(|e| {
            lookup_error(
                locator,
                e,
                AppError::ElementNotFound {
                    selector: locator.to_string(),
                },
            )
        })
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.0
            .get_attribute_value(name)
            .map_err(|e| browser_error("Attribute read failed", e))
    }

    fn text(&self) -> Result<Option<String>> {
        self.0
            .get_inner_text()
            .map(Some)
            .map_err(|e| browser_error("Text read failed", e))
    }
}
