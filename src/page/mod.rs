//! Rendering sessions.
//!
//! The harvester owns exactly one session per run and lends it to the
//! extractor and the consent handler for the duration of one source.

use std::time::Duration;

use crate::locator::Locator;
use crate::utils::error::Result;

pub mod chrome;
pub mod html;

pub use chrome::ChromeSession;
pub use html::HtmlPage;

pub trait Page {
    type Element<'a>: PageElement
    where
        Self: 'a;

    /// Load `url` and block until the navigation settles.
    fn goto(&self, url: &str) -> Result<()>;

    /// Whether `locator` matches a visible element within `timeout`.
    fn is_visible(&self, locator: &Locator, timeout: Duration) -> Result<bool>;

    fn click(&self, locator: &Locator) -> Result<()>;

    /// Block until at least one element matches. Exceeding `timeout` yields `AppError::Timeout`.
    fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()>;

    /// All current matches; no match is an empty vector, not an error.
    fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element<'_>>>;
}

pub trait PageElement {
    type Child<'s>: PageElement
    where
        Self: 's;

    /// First descendant matching `locator`, borrowed from this element.
    fn find<'s>(&'s self, locator: &Locator) -> Result<Self::Child<'s>>;

    fn attribute(&self, name: &str) -> Result<Option<String>>;

    fn text(&self) -> Result<Option<String>>;
}
