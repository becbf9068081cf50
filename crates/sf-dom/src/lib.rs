//! In-memory model of a dynamically-rendered host page.
//!
//! The suppression engine has no control over the real page's code or update
//! cadence, so everything it relies on is modeled explicitly here: a DOM
//! arena with selector queries, mutation observers with per-observer record
//! queues, capture-phase event dispatch, an optional untyped host API
//! namespace, and the host's global navigation events.

pub mod api;
pub mod document;
pub mod event;
pub mod observer;
pub mod page;
pub mod selector;

pub use api::FunctionSlot;
pub use api::HostApiSurface;
pub use document::Document;
pub use document::NodeId;
pub use event::EventHandler;
pub use event::EventState;
pub use event::EventType;
pub use event::ListenerOptions;
pub use observer::MutationKind;
pub use observer::MutationRecord;
pub use observer::ObserveOptions;
pub use observer::ObserverId;
pub use page::Page;
pub use selector::Selector;
