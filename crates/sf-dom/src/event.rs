//! Event types, listener options, and per-dispatch event state.

use crate::document::NodeId;
use std::rc::Rc;

/// Hover-related event types the host page fires on candidate elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventType {
    MouseEnter,
    MouseLeave,
    MouseMove,
    MouseOver,
    MouseOut,
    PointerEnter,
    PointerLeave,
    PointerMove,
    PointerOver,
    PointerOut,
}

impl EventType {
    /// Every hover event the interceptor swallows.
    pub const HOVER: [EventType; 10] = [
        EventType::MouseEnter,
        EventType::MouseLeave,
        EventType::MouseMove,
        EventType::MouseOver,
        EventType::MouseOut,
        EventType::PointerEnter,
        EventType::PointerLeave,
        EventType::PointerMove,
        EventType::PointerOver,
        EventType::PointerOut,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::MouseEnter => "mouseenter",
            EventType::MouseLeave => "mouseleave",
            EventType::MouseMove => "mousemove",
            EventType::MouseOver => "mouseover",
            EventType::MouseOut => "mouseout",
            EventType::PointerEnter => "pointerenter",
            EventType::PointerLeave => "pointerleave",
            EventType::PointerMove => "pointermove",
            EventType::PointerOver => "pointerover",
            EventType::PointerOut => "pointerout",
        }
    }
}

/// Mutable state threaded through one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventState {
    pub event: EventType,
    pub target: NodeId,
    propagation_stopped: bool,
    immediate_stopped: bool,
    default_prevented: bool,
}

impl EventState {
    pub fn new(event: EventType, target: NodeId) -> Self {
        Self {
            event,
            target,
            propagation_stopped: false,
            immediate_stopped: false,
            default_prevented: false,
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_stopped = true;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn immediate_stopped(&self) -> bool {
        self.immediate_stopped
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub(crate) fn restore_default(&mut self, prevented: bool) {
        self.default_prevented = prevented;
    }
}

/// Listener callback. Handlers only see the event state; identity (`Rc`
/// pointer) is what deduplication and removal compare.
pub type EventHandler = Rc<dyn Fn(&mut EventState)>;

/// Registration options mirroring `addEventListener`'s capture/passive pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerOptions {
    pub capture: bool,
    pub passive: bool,
}

impl ListenerOptions {
    /// Capture-phase, non-passive: the interceptor's registration shape.
    pub fn capturing() -> Self {
        Self {
            capture: true,
            passive: false,
        }
    }
}

pub(crate) struct ListenerSlot {
    pub(crate) event: EventType,
    pub(crate) options: ListenerOptions,
    pub(crate) handler: EventHandler,
}

impl std::fmt::Debug for ListenerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSlot")
            .field("event", &self.event)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::EventState;
    use super::EventType;

    #[test]
    fn hover_set_covers_mouse_and_pointer_variants() {
        assert_eq!(EventType::HOVER.len(), 10);
        assert!(EventType::HOVER.contains(&EventType::MouseOver));
        assert!(EventType::HOVER.contains(&EventType::PointerMove));
    }

    #[test]
    fn immediate_stop_implies_propagation_stop() {
        let mut state = EventState::new(EventType::MouseOver, 7);
        state.stop_immediate_propagation();
        assert!(state.propagation_stopped());
        assert!(state.immediate_stopped());
        assert!(!state.default_prevented());
    }
}
