//! Hover-preview suppression for dynamically rendered host pages: a
//! stylesheet injector, hover event interception, marker scrubbing, host
//! API patching, and the reconciliation loop that keeps them applied as
//! the page rerenders and soft-navigates.

pub mod controller;
pub mod engine;
pub mod intercept;
pub mod patch;
pub mod scan;
pub mod scrub;
pub mod selectors;
pub mod style;

pub use controller::Command;
pub use controller::Controller;
pub use controller::ControllerState;
pub use controller::ControllerStatus;
pub use controller::SuppressionStats;
pub use engine::DebounceKey;
pub use engine::EngineState;
pub use engine::ReconcileAction;
pub use engine::ReconciliationEngine;
pub use engine::TimerAction;
pub use intercept::EventInterceptor;
pub use patch::HostApiPatcher;
pub use patch::PatcherPhase;
pub use scan::ScanCoordinator;
pub use scrub::AttributeScrubber;
pub use style::STYLE_ELEMENT_ID;
pub use style::StyleInjector;
pub use style::build_stylesheet;
