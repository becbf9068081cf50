//! The reconciliation engine: wires observers, debounced re-scans, the
//! periodic sweep, and the host API patcher to one page.

use crate::patch::HostApiPatcher;
use crate::scan::ScanCoordinator;
use crate::selectors::NAVIGATION_EVENTS;
use crate::selectors::OBSERVED_ATTRIBUTES;
use crate::selectors::timings;
use crate::style::StyleInjector;
use sf_core::EngineError;
use sf_core::EngineResult;
use sf_dom::MutationRecord;
use sf_dom::ObserveOptions;
use sf_dom::ObserverId;
use sf_dom::Page;
use sf_sched::Debouncer;
use sf_sched::TimerId;
use sf_sched::TimerRegistry;
use sf_store::Settings;

/// Engine lifecycle. Starting is legal from either non-observing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Uninitialized,
    Observing,
    TornDown,
}

/// Debounce channels. Mutation bursts and navigation settling collapse
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebounceKey {
    Mutation,
    Navigation,
}

/// Deferred work scheduled through the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Rescan { force: bool },
    NavigationSettled,
}

/// Deferred work scheduled through the timer registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    ApiPoll,
    ApiPollTimeout,
    AttributeSweep,
}

/// Owns every suppression component and drives them from `tick`.
#[derive(Debug)]
pub struct ReconciliationEngine {
    state: EngineState,
    scanner: ScanCoordinator,
    style: StyleInjector,
    patcher: HostApiPatcher,
    timers: TimerRegistry<TimerAction>,
    debouncer: Debouncer<DebounceKey, ReconcileAction>,
    dom_observer: Option<ObserverId>,
    nav_observer: Option<ObserverId>,
    sweep_timer: Option<TimerId>,
    last_location: String,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self {
            state: EngineState::Uninitialized,
            scanner: ScanCoordinator::new(),
            style: StyleInjector::new(),
            patcher: HostApiPatcher::new(),
            timers: TimerRegistry::new(),
            debouncer: Debouncer::new(),
            dom_observer: None,
            nav_observer: None,
            sweep_timer: None,
            last_location: String::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn scanner(&self) -> &ScanCoordinator {
        &self.scanner
    }

    pub fn patcher_phase(&self) -> crate::patch::PatcherPhase {
        self.patcher.phase()
    }

    /// Begins observing `page`: installs observers, applies the stylesheet,
    /// arms the API patcher, and runs the first forced scan.
    pub fn start(&mut self, page: &mut Page, settings: &Settings, now: u64) -> EngineResult<()> {
        if self.state == EngineState::Observing {
            return Err(EngineError::new(
                "engine.already_observing",
                "start called while already observing",
            ));
        }
        if self.timers.is_shut_down() {
            self.timers = TimerRegistry::new();
        }
        if self.debouncer.is_shut_down() {
            self.debouncer = Debouncer::new();
        }

        self.last_location = page.location().to_owned();

        // Inject and scan before observing so our own setup writes do not
        // come back as mutation records.
        self.style.apply(page, settings)?;
        self.patcher.arm(page, &mut self.timers, now);
        self.scanner.scan(page, true, now);

        let root = page.document.root();
        self.dom_observer = Some(page.document.observe(
            root,
            ObserveOptions {
                child_list: true,
                subtree: true,
                attributes: true,
                attribute_filter: OBSERVED_ATTRIBUTES.iter().map(|s| (*s).to_owned()).collect(),
                character_data: false,
            },
        )?);

        // Soft navigations rewrite the document title before anything else
        // settles, so the title node doubles as a navigation beacon. Hosts
        // without a title node announce navigation through body churn
        // instead, which arrives as child-list mutation.
        let (nav_target, nav_options) = match page.document.title_node() {
            Some(title) => (
                title,
                ObserveOptions {
                    character_data: true,
                    subtree: true,
                    ..ObserveOptions::default()
                },
            ),
            None => {
                log::warn!("document has no title node, watching body churn for navigation");
                (
                    page.document.body(),
                    ObserveOptions {
                        child_list: true,
                        subtree: true,
                        ..ObserveOptions::default()
                    },
                )
            }
        };
        self.nav_observer = Some(page.document.observe(nav_target, nav_options)?);

        self.sweep_timer =
            self.timers
                .set_interval(TimerAction::AttributeSweep, timings::SWEEP_INTERVAL_MS, now);

        self.state = EngineState::Observing;
        log::info!("engine observing at {}", self.last_location);
        Ok(())
    }

    /// One cooperative step: drain signals, then fire whatever is due.
    /// Failures inside a tick are logged, never propagated.
    pub fn tick(&mut self, page: &mut Page, settings: &Settings, now: u64) {
        if self.state != EngineState::Observing {
            return;
        }

        for event in page.take_host_events() {
            if NAVIGATION_EVENTS.contains(&event.as_str()) {
                self.check_navigation(page, now);
            } else {
                log::debug!("ignoring unrelated host event `{event}`");
            }
        }

        if let Some(id) = self.nav_observer {
            if !page.document.take_records(id).is_empty() {
                self.check_navigation(page, now);
            }
        }

        if let Some(id) = self.dom_observer {
            let records = page.document.take_records(id);
            if self.any_foreign_record(&records) {
                self.debouncer.debounce(
                    DebounceKey::Mutation,
                    ReconcileAction::Rescan { force: false },
                    timings::MUTATION_DEBOUNCE_MS,
                    now,
                );
            }
        }

        for action in self.timers.fire_due(now) {
            self.run_timer_action(page, action);
        }
        for (_, action) in self.debouncer.fire_due(now) {
            self.run_reconcile_action(page, settings, action, now);
        }
    }

    /// Re-applies the stylesheet after a settings change.
    pub fn refresh_style(&mut self, page: &mut Page, settings: &Settings) {
        if let Err(error) = self.style.apply(page, settings) {
            log::error!("stylesheet refresh failed: {error}");
        }
    }

    /// Stops observing and unwinds everything. Idempotent.
    pub fn teardown(&mut self, page: &mut Page) {
        if self.state != EngineState::Observing {
            return;
        }

        if let Some(id) = self.dom_observer.take() {
            page.document.disconnect(id);
        }
        if let Some(id) = self.nav_observer.take() {
            page.document.disconnect(id);
        }
        if let Some(id) = self.sweep_timer.take() {
            self.timers.cancel(id);
        }
        self.patcher.release(&mut self.timers);
        self.timers.shutdown();
        self.debouncer.shutdown();
        if let Err(error) = self.style.teardown(page) {
            log::error!("stylesheet teardown failed: {error}");
        }
        self.scanner.interceptor_mut().reset();

        self.state = EngineState::TornDown;
        log::info!("engine torn down");
    }

    // Location comparison makes duplicate navigation signals free: only the
    // first one for a given URL does any work.
    fn check_navigation(&mut self, page: &mut Page, now: u64) {
        if page.location() == self.last_location {
            return;
        }
        self.last_location = page.location().to_owned();
        log::info!("navigation detected: {}", self.last_location);

        // Forget processed elements right away; the settle pass re-applies
        // suppression once the new view stops churning.
        self.scanner.interceptor_mut().reset();
        self.debouncer.debounce(
            DebounceKey::Navigation,
            ReconcileAction::NavigationSettled,
            timings::NAVIGATION_SETTLE_MS,
            now,
        );
    }

    // Our own stylesheet writes come back as mutation records; re-scanning
    // on those would self-trigger.
    fn any_foreign_record(&self, records: &[MutationRecord]) -> bool {
        records
            .iter()
            .any(|record| Some(record.target) != self.style.element())
    }

    fn run_timer_action(&mut self, page: &mut Page, action: TimerAction) {
        match action {
            TimerAction::ApiPoll => self.patcher.on_poll(page, &mut self.timers),
            TimerAction::ApiPollTimeout => self.patcher.on_timeout(&mut self.timers),
            TimerAction::AttributeSweep => self.scanner.sweep(page),
        }
    }

    fn run_reconcile_action(
        &mut self,
        page: &mut Page,
        settings: &Settings,
        action: ReconcileAction,
        now: u64,
    ) {
        match action {
            ReconcileAction::Rescan { force } => {
                self.scanner.scan(page, force, now);
            }
            ReconcileAction::NavigationSettled => {
                if let Err(error) = self.style.apply(page, settings) {
                    log::error!("stylesheet re-apply failed: {error}");
                }
                self.patcher.rearm(page, &mut self.timers, now);
                self.scanner.scan(page, true, now);
            }
        }
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::EngineState;
    use super::ReconciliationEngine;
    use crate::patch::PatcherPhase;
    use crate::selectors::timings;
    use crate::style::STYLE_ELEMENT_ID;
    use sf_dom::HostApiSurface;
    use sf_dom::NodeId;
    use sf_dom::Page;
    use sf_store::Settings;

    fn started() -> (ReconciliationEngine, Page, Settings) {
        let mut page = Page::new("https://host.example/");
        let settings = Settings::default();
        let mut engine = ReconciliationEngine::new();
        engine
            .start(&mut page, &settings, 0)
            .unwrap_or_else(|_| unreachable!());
        (engine, page, settings)
    }

    fn add_thumbnail(page: &mut Page) -> NodeId {
        let thumb = page.document.create_element("ytd-thumbnail");
        let body = page.document.body();
        page.document
            .append_child(body, thumb)
            .unwrap_or_else(|_| unreachable!());
        thumb
    }

    #[test]
    fn start_injects_styles_scans_and_rejects_double_start() {
        let (mut engine, mut page, settings) = started();
        assert_eq!(engine.state(), EngineState::Observing);
        assert!(page.document.get_element_by_id(STYLE_ELEMENT_ID).is_some());
        assert_eq!(engine.scanner().accepted_scans(), 1);

        let again = engine.start(&mut page, &settings, 1);
        assert!(again.is_err_and(|error| error.code == "engine.already_observing"));
    }

    #[test]
    fn mutation_bursts_collapse_into_one_scan() {
        let (mut engine, mut page, settings) = started();
        let scans_before = engine.scanner().accepted_scans();

        // Fifty inserts in quick succession, one tick each.
        for index in 0..50_u64 {
            add_thumbnail(&mut page);
            engine.tick(&mut page, &settings, 1 + index);
        }
        assert_eq!(engine.scanner().accepted_scans(), scans_before);

        // Quiet period elapses: exactly one re-scan fires.
        engine.tick(
            &mut page,
            &settings,
            50 + timings::MUTATION_DEBOUNCE_MS + timings::SCAN_MIN_INTERVAL_MS,
        );
        assert_eq!(engine.scanner().accepted_scans(), scans_before + 1);
    }

    #[test]
    fn navigation_resets_then_forces_a_scan_after_settle() {
        let (mut engine, mut page, settings) = started();
        let thumb = add_thumbnail(&mut page);
        engine.tick(&mut page, &settings, timings::MUTATION_DEBOUNCE_MS + 1);
        engine.tick(
            &mut page,
            &settings,
            timings::MUTATION_DEBOUNCE_MS + timings::SCAN_MIN_INTERVAL_MS + 2,
        );
        assert!(engine.scanner().interceptor().is_processed(thumb));

        let t0 = 1_000;
        page.navigate("https://host.example/watch?v=abc", "Watching")
            .unwrap_or_else(|_| unreachable!());
        page.emit_host_event("yt-navigate-finish");
        engine.tick(&mut page, &settings, t0);

        // Reset happens at detection time, before the settle pass.
        assert!(!engine.scanner().interceptor().is_processed(thumb));

        let scans_before = engine.scanner().accepted_scans();
        engine.tick(&mut page, &settings, t0 + timings::NAVIGATION_SETTLE_MS);
        assert_eq!(engine.scanner().accepted_scans(), scans_before + 1);
        assert!(engine.scanner().interceptor().is_processed(thumb));
    }

    #[test]
    fn duplicate_navigation_signals_for_one_url_are_ignored() {
        let (mut engine, mut page, settings) = started();

        page.navigate("https://host.example/feed", "Feed")
            .unwrap_or_else(|_| unreachable!());
        page.emit_host_event("yt-navigate-start");
        page.emit_host_event("yt-navigate-finish");
        page.emit_host_event("yt-page-data-updated");
        engine.tick(&mut page, &settings, 100);

        // All three signals landed in one debounce window; one settle pass.
        let scans_before = engine.scanner().accepted_scans();
        engine.tick(&mut page, &settings, 100 + timings::NAVIGATION_SETTLE_MS);
        assert_eq!(engine.scanner().accepted_scans(), scans_before + 1);

        // A repeated signal for the same location does nothing further.
        page.emit_host_event("yt-navigate-finish");
        engine.tick(&mut page, &settings, 2_000);
        engine.tick(&mut page, &settings, 2_000 + timings::NAVIGATION_SETTLE_MS);
        assert_eq!(engine.scanner().accepted_scans(), scans_before + 1);
    }

    #[test]
    fn title_rewrite_detects_navigation_without_host_events() {
        let (mut engine, mut page, settings) = started();

        page.navigate("https://host.example/results?q=x", "Search results")
            .unwrap_or_else(|_| unreachable!());
        engine.tick(&mut page, &settings, 10);

        let scans_before = engine.scanner().accepted_scans();
        engine.tick(&mut page, &settings, 10 + timings::NAVIGATION_SETTLE_MS);
        assert_eq!(engine.scanner().accepted_scans(), scans_before + 1);
    }

    #[test]
    fn titleless_pages_detect_navigation_through_body_churn() {
        let mut page = Page::without_title("https://host.example/");
        let settings = Settings::default();
        let thumb = add_thumbnail(&mut page);
        let mut engine = ReconciliationEngine::new();
        engine
            .start(&mut page, &settings, 0)
            .unwrap_or_else(|_| unreachable!());
        assert!(engine.scanner().interceptor().is_processed(thumb));

        // Silent location change: no title node, no host event. The rerender
        // that follows is what the fallback observer must catch.
        page.navigate("https://host.example/watch?v=abc", "ignored")
            .unwrap_or_else(|_| unreachable!());
        add_thumbnail(&mut page);
        engine.tick(&mut page, &settings, 100);
        assert!(!engine.scanner().interceptor().is_processed(thumb));

        // Drain the insert's own debounced re-scan, then count the settle pass.
        engine.tick(&mut page, &settings, 100 + timings::MUTATION_DEBOUNCE_MS);
        let scans_before = engine.scanner().accepted_scans();
        engine.tick(&mut page, &settings, 100 + timings::NAVIGATION_SETTLE_MS);
        assert_eq!(engine.scanner().accepted_scans(), scans_before + 1);
        assert!(engine.scanner().interceptor().is_processed(thumb));
    }

    #[test]
    fn sweep_fires_on_its_interval() {
        let (mut engine, mut page, settings) = started();
        let thumb = add_thumbnail(&mut page);

        // Let the insert's debounced scan pass, then re-mark the element.
        engine.tick(&mut page, &settings, timings::MUTATION_DEBOUNCE_MS + 1);
        engine.tick(
            &mut page,
            &settings,
            timings::MUTATION_DEBOUNCE_MS + timings::SCAN_MIN_INTERVAL_MS + 2,
        );
        page.document
            .set_attribute(thumb, "moving", "true")
            .unwrap_or_else(|_| unreachable!());

        engine.tick(&mut page, &settings, timings::SWEEP_INTERVAL_MS);
        assert!(!page.document.has_attribute(thumb, "moving"));
    }

    #[test]
    fn navigation_rearms_the_api_patcher() {
        let (mut engine, mut page, settings) = started();
        engine.tick(&mut page, &settings, timings::API_POLL_TIMEOUT_MS);
        engine.tick(&mut page, &settings, timings::API_POLL_TIMEOUT_MS + 1);

        page.install_api(HostApiSurface::new().with_function("player.showPreview"));
        let t0 = timings::API_POLL_TIMEOUT_MS + 100;
        page.navigate("https://host.example/watch?v=xyz", "Watching")
            .unwrap_or_else(|_| unreachable!());
        page.emit_host_event("yt-navigate-finish");
        engine.tick(&mut page, &settings, t0);
        engine.tick(&mut page, &settings, t0 + timings::NAVIGATION_SETTLE_MS);

        assert!(
            page.api()
                .is_some_and(|api| api.is_neutered("player.showPreview"))
        );
    }

    #[test]
    fn own_stylesheet_writes_do_not_schedule_scans() {
        let (mut engine, mut page, mut settings) = started();
        engine.tick(&mut page, &settings, timings::MUTATION_DEBOUNCE_MS + 1);

        let scans_before = engine.scanner().accepted_scans();
        settings.disable_animations = false;
        engine.refresh_style(&mut page, &settings);

        for step in 0..5_u64 {
            engine.tick(&mut page, &settings, 500 + step * 100);
        }
        assert_eq!(engine.scanner().accepted_scans(), scans_before);
    }

    #[test]
    fn teardown_unwinds_and_is_idempotent() {
        let (mut engine, mut page, settings) = started();
        engine.teardown(&mut page);
        assert_eq!(engine.state(), EngineState::TornDown);
        assert!(page.document.get_element_by_id(STYLE_ELEMENT_ID).is_none());

        engine.teardown(&mut page);
        assert_eq!(engine.state(), EngineState::TornDown);

        // A torn-down engine ignores ticks entirely.
        add_thumbnail(&mut page);
        let scans_before = engine.scanner().accepted_scans();
        engine.tick(&mut page, &settings, 10_000);
        engine.tick(&mut page, &settings, 20_000);
        assert_eq!(engine.scanner().accepted_scans(), scans_before);
    }

    #[test]
    fn restart_after_teardown_is_allowed() {
        let (mut engine, mut page, settings) = started();
        engine.teardown(&mut page);

        let restarted = engine.start(&mut page, &settings, 50_000);
        assert!(restarted.is_ok());
        assert_eq!(engine.state(), EngineState::Observing);
        assert!(page.document.get_element_by_id(STYLE_ELEMENT_ID).is_some());
        assert_eq!(engine.patcher_phase(), PatcherPhase::Polling);
    }
}
