//! Hover event interception on candidate elements.

use sf_dom::EventHandler;
use sf_dom::EventType;
use sf_dom::ListenerOptions;
use sf_dom::NodeId;
use sf_dom::Page;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

/// Attaches one capturing handler for every hover-family event to candidate
/// elements, at most once per element, and counts what it swallows.
pub struct EventInterceptor {
    processed: HashSet<NodeId>,
    blocked: Rc<Cell<u64>>,
    handler: EventHandler,
}

impl EventInterceptor {
    pub fn new() -> Self {
        let blocked = Rc::new(Cell::new(0_u64));
        let counter = Rc::clone(&blocked);
        let handler: EventHandler = Rc::new(move |state| {
            counter.set(counter.get().saturating_add(1));
            state.stop_propagation();
            state.stop_immediate_propagation();
            state.prevent_default();
        });
        Self {
            processed: HashSet::new(),
            blocked,
            handler,
        }
    }

    /// Attaches the shared handler to `node` for all hover events. Returns
    /// true only the first time a node is processed.
    pub fn attach(&mut self, page: &mut Page, node: NodeId) -> sf_core::EngineResult<bool> {
        if self.processed.contains(&node) {
            return Ok(false);
        }

        for event in EventType::HOVER {
            page.document.add_event_listener(
                node,
                event,
                ListenerOptions::capturing(),
                Rc::clone(&self.handler),
            )?;
        }
        self.processed.insert(node);
        Ok(true)
    }

    /// Detaches the shared handler from `node` and forgets it was processed.
    pub fn detach(&mut self, page: &mut Page, node: NodeId) -> sf_core::EngineResult<()> {
        if !self.processed.remove(&node) {
            return Ok(());
        }
        for event in EventType::HOVER {
            page.document
                .remove_event_listener(node, event, true, &self.handler)?;
        }
        Ok(())
    }

    /// Forgets every processed element. Listeners on still-live nodes stay
    /// attached and keep blocking; forgetting only permits re-processing
    /// after the host replaces its subtrees.
    pub fn reset(&mut self) {
        self.processed.clear();
    }

    pub fn is_processed(&self, node: NodeId) -> bool {
        self.processed.contains(&node)
    }

    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    pub fn blocked_count(&self) -> u64 {
        self.blocked.get()
    }
}

impl Default for EventInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventInterceptor")
            .field("processed", &self.processed.len())
            .field("blocked", &self.blocked.get())
            .finish()
    }
}
