//! Marker attribute removal.

use crate::selectors::MARKER_ATTRIBUTES;
use sf_dom::Page;
use sf_dom::Selector;

/// Strips the attributes the host uses to flag active previews.
#[derive(Debug, Default)]
pub struct AttributeScrubber {
    removed_total: u64,
}

impl AttributeScrubber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every marker attribute from every element carrying one.
    /// Returns how many attributes were removed in this pass.
    pub fn scrub(&mut self, page: &mut Page) -> sf_core::EngineResult<u64> {
        let mut removed = 0_u64;
        for name in MARKER_ATTRIBUTES {
            let selector = Selector::parse(&format!("[{name}]"))?;
            for node in page.document.query_selector_all(&selector) {
                if page.document.remove_attribute(node, name)? {
                    removed = removed.saturating_add(1);
                }
            }
        }

        if removed > 0 {
            log::debug!("removed {removed} preview marker attributes");
        }
        self.removed_total = self.removed_total.saturating_add(removed);
        Ok(removed)
    }

    pub fn removed_total(&self) -> u64 {
        self.removed_total
    }
}
