//! Candidate scanning: find thumbnail-like elements, intercept their hover
//! events, and scrub preview markers.

use crate::intercept::EventInterceptor;
use crate::scrub::AttributeScrubber;
use crate::selectors::CANDIDATE_SELECTORS;
use crate::selectors::timings;
use sf_dom::Page;
use sf_dom::Selector;

/// Runs the per-pass suppression work and throttles how often it happens.
#[derive(Debug)]
pub struct ScanCoordinator {
    interceptor: EventInterceptor,
    scrubber: AttributeScrubber,
    candidates: Vec<String>,
    last_scan_start: Option<u64>,
    min_interval: u64,
    processed_total: u64,
    accepted_scans: u64,
}

impl ScanCoordinator {
    pub fn new() -> Self {
        Self::with_candidates(&CANDIDATE_SELECTORS)
    }

    pub fn with_candidates(candidates: &[&str]) -> Self {
        Self {
            interceptor: EventInterceptor::new(),
            scrubber: AttributeScrubber::new(),
            candidates: candidates.iter().map(|s| (*s).to_owned()).collect(),
            last_scan_start: None,
            min_interval: timings::SCAN_MIN_INTERVAL_MS,
            processed_total: 0,
            accepted_scans: 0,
        }
    }

    /// One suppression pass. Unforced scans are dropped when the previous one
    /// started less than the throttle interval ago; forced scans always run.
    /// Returns whether the scan ran.
    pub fn scan(&mut self, page: &mut Page, force: bool, now: u64) -> bool {
        if !force {
            let too_soon = self
                .last_scan_start
                .is_some_and(|start| now.saturating_sub(start) < self.min_interval);
            if too_soon {
                return false;
            }
        }
        self.last_scan_start = Some(now);
        self.accepted_scans = self.accepted_scans.saturating_add(1);

        let mut matched = 0_u64;
        let mut newly_attached = 0_u64;
        for raw in &self.candidates {
            let selector = match Selector::parse(raw) {
                Ok(selector) => selector,
                Err(error) => {
                    // One bad selector must not sink the pass.
                    log::warn!("skipping candidate selector `{raw}`: {error}");
                    continue;
                }
            };

            for node in page.document.query_selector_all(&selector) {
                matched = matched.saturating_add(1);
                match self.interceptor.attach(page, node) {
                    Ok(true) => newly_attached = newly_attached.saturating_add(1),
                    Ok(false) => {}
                    Err(error) => log::warn!("listener attach failed: {error}"),
                }
            }
        }
        self.processed_total = self.processed_total.saturating_add(matched);

        if let Err(error) = self.scrubber.scrub(page) {
            log::warn!("attribute scrub failed: {error}");
        }

        log::debug!(
            "scan complete: {matched} candidates, {newly_attached} newly intercepted"
        );
        true
    }

    /// The standing periodic pass: markers only, no listener work.
    pub fn sweep(&mut self, page: &mut Page) {
        if let Err(error) = self.scrubber.scrub(page) {
            log::warn!("attribute sweep failed: {error}");
        }
    }

    pub fn interceptor(&self) -> &EventInterceptor {
        &self.interceptor
    }

    pub fn interceptor_mut(&mut self) -> &mut EventInterceptor {
        &mut self.interceptor
    }

    pub fn scrubber(&self) -> &AttributeScrubber {
        &self.scrubber
    }

    pub fn processed_total(&self) -> u64 {
        self.processed_total
    }

    pub fn accepted_scans(&self) -> u64 {
        self.accepted_scans
    }
}

impl Default for ScanCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
