use std::time::Duration;

use tracing::{debug, info};

use crate::config::ConsentConfig;
use crate::locator::Locator;
use crate::page::Page;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    Dismissed { matcher: String },
    NotFound,
    /// No candidate fired and at least one of them failed along the way.
    ErrorIgnored { errors: Vec<String> },
}

impl ConsentOutcome {
    pub fn fired(&self) -> bool {
        matches!(self, ConsentOutcome::Dismissed { .. })
    }
}

/// Best-effort dismissal of cookie banners. Never fails its caller.
#[derive(Debug, Clone)]
pub struct ConsentHandler {
    candidates: Vec<Locator>,
    timeout: Duration,
    pause: Duration,
}

impl ConsentHandler {
    pub fn new(candidates: Vec<Locator>, timeout: Duration, pause: Duration) -> Self {
        Self {
            candidates,
            timeout,
            pause,
        }
    }

    pub fn from_config(config: &ConsentConfig) -> Result<Self> {
        let candidates = config
            .selectors
            .iter()
            .map(|s| Locator::parse(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(
            candidates,
            Duration::from_millis(config.timeout_ms),
            Duration::from_millis(config.pause_ms),
        ))
    }

    pub fn dismiss<P: Page>(&self, page: &P) -> ConsentOutcome {
        let mut errors = Vec::new();

        for candidate in &self.candidates {
            match page.is_visible(candidate, self.timeout) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!("Consent check of {} failed: {}", candidate, e);
                    errors.push(format!("{}: {}", candidate, e));
                    continue;
                }
            }

            match page.click(candidate) {
                Ok(()) => {
                    info!("Cookies accepted via {}", candidate);
                    if !self.pause.is_zero() {
                        std::thread::sleep(self.pause);
                    }
                    return ConsentOutcome::Dismissed {
                        matcher: candidate.to_string(),
                    };
                }
                Err(e) => {
                    debug!("Consent click {} failed: {}", candidate, e);
                    errors.push(format!("{}: {}", candidate, e));
                }
            }
        }

        if errors.is_empty() {
            debug!("No cookie banner found or already accepted");
            ConsentOutcome::NotFound
        } else {
            ConsentOutcome::ErrorIgnored { errors }
        }
    }
}
