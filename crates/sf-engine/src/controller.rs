//! The controller: settings lifecycle, user commands, and status reporting
//! layered over the engine.

use crate::engine::ReconciliationEngine;
use sf_core::EngineResult;
use sf_core::VerbosityHandle;
use sf_dom::Page;
use sf_store::PreferenceStore;
use sf_store::Settings;
use sf_store::load_settings;
use sf_store::persist_settings;
use sf_update::UpdateCheck;
use sf_update::UpdateNotifier;
use sf_update::UpdateOutcome;
use sf_update::UpdateTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Created,
    Running,
    Stopped,
}

/// User-issued toggle commands, surfaced through the host menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePreviews,
    ToggleHoverEffects,
    ToggleAnimations,
    ToggleDebug,
}

/// Counters aggregated across the suppression components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuppressionStats {
    pub thumbnails_processed: u64,
    pub events_blocked: u64,
    pub attributes_removed: u64,
    pub scans_accepted: u64,
}

/// Snapshot for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerStatus {
    pub state: ControllerState,
    pub location: String,
    pub settings: Settings,
    pub stats: SuppressionStats,
}

/// Top-level coordinator: loads settings, starts the engine, executes
/// commands, and answers status queries.
pub struct Controller {
    state: ControllerState,
    settings: Settings,
    store: Box<dyn PreferenceStore>,
    engine: ReconciliationEngine,
    verbosity: Option<VerbosityHandle>,
    update: UpdateCheck,
}

impl Controller {
    pub fn new(store: Box<dyn PreferenceStore>, update: UpdateCheck) -> Self {
        Self {
            state: ControllerState::Created,
            settings: Settings::default(),
            store,
            engine: ReconciliationEngine::new(),
            verbosity: None,
            update,
        }
    }

    /// Wires the diagnostic verbosity toggle so the debug setting controls
    /// log output.
    pub fn with_verbosity(mut self, handle: VerbosityHandle) -> Self {
        self.verbosity = Some(handle);
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Loads settings, persists the merged document back, and starts the
    /// engine. A second start while running is a logged no-op.
    pub fn start(&mut self, page: &mut Page, now: u64) -> EngineResult<()> {
        if self.state == ControllerState::Running {
            log::warn!("start requested while already running, ignoring");
            return Ok(());
        }

        self.settings = load_settings(self.store.as_ref());
        self.apply_verbosity();

        // Write the validated document back so stale or partial storage
        // converges on the full shape.
        if let Err(error) = persist_settings(self.store.as_mut(), &self.settings) {
            log::warn!("could not persist merged settings: {error}");
        }

        self.engine.start(page, &self.settings, now)?;
        self.state = ControllerState::Running;
        log::info!("controller running");
        Ok(())
    }

    /// One cooperative step. No-op unless running.
    pub fn tick(&mut self, page: &mut Page, now: u64) {
        if self.state != ControllerState::Running {
            return;
        }
        self.engine.tick(page, &self.settings, now);
    }

    /// Tears the engine down. Idempotent.
    pub fn stop(&mut self, page: &mut Page) {
        if self.state != ControllerState::Running {
            return;
        }
        self.engine.teardown(page);
        self.state = ControllerState::Stopped;
        log::info!("controller stopped");
    }

    /// Flips one toggle, persists, and applies the consequence. Returns the
    /// toggle's new value. Persistence failures are logged, not fatal.
    pub fn execute(&mut self, command: Command, page: &mut Page) -> bool {
        let new_value = match command {
            Command::TogglePreviews => {
                self.settings.disable_previews = !self.settings.disable_previews;
                self.settings.disable_previews
            }
            Command::ToggleHoverEffects => {
                self.settings.disable_hover_effects = !self.settings.disable_hover_effects;
                self.settings.disable_hover_effects
            }
            Command::ToggleAnimations => {
                self.settings.disable_animations = !self.settings.disable_animations;
                self.settings.disable_animations
            }
            Command::ToggleDebug => {
                self.settings.debug = !self.settings.debug;
                self.settings.debug
            }
        };

        if let Err(error) = persist_settings(self.store.as_mut(), &self.settings) {
            log::error!("could not persist settings after {command:?}: {error}");
        }

        match command {
            Command::ToggleDebug => self.apply_verbosity(),
            _ => self.engine.refresh_style(page, &self.settings),
        }
        log::info!("{command:?} -> {new_value}");
        new_value
    }

    /// Runs the configured update check once.
    pub fn check_for_updates(
        &self,
        transport: &dyn UpdateTransport,
        notifier: &mut dyn UpdateNotifier,
    ) -> UpdateOutcome {
        self.update.run(transport, notifier)
    }

    pub fn status(&self, page: &Page) -> ControllerStatus {
        let scanner = self.engine.scanner();
        ControllerStatus {
            state: self.state,
            location: page.location().to_owned(),
            settings: self.settings,
            stats: SuppressionStats {
                thumbnails_processed: scanner.processed_total(),
                events_blocked: scanner.interceptor().blocked_count(),
                attributes_removed: scanner.scrubber().removed_total(),
                scans_accepted: scanner.accepted_scans(),
            },
        }
    }

    fn apply_verbosity(&self) {
        if let Some(handle) = &self.verbosity {
            handle.set(self.settings.debug);
        }
    }
}
