//! Host API patching: poll for the host namespace, then neuter its
//! preview entry points and force the gating flags off.

use crate::engine::TimerAction;
use crate::selectors::PREVIEW_FLAGS;
use crate::selectors::PREVIEW_FUNCTIONS;
use crate::selectors::timings;
use sf_dom::Page;
use sf_sched::TimerId;
use sf_sched::TimerRegistry;

/// Lifecycle of one patch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatcherPhase {
    #[default]
    Idle,
    Polling,
    Patched,
    TimedOut,
}

/// Waits for the host API surface to appear and patches it exactly once per
/// arming. Navigation re-arms, since hosts rebuild the namespace.
#[derive(Debug, Default)]
pub struct HostApiPatcher {
    phase: PatcherPhase,
    poll_timer: Option<TimerId>,
    timeout_timer: Option<TimerId>,
}

impl HostApiPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PatcherPhase {
        self.phase
    }

    /// Starts polling for the host API. Patches immediately when the surface
    /// is already installed. No-op while already patched or polling.
    pub fn arm(&mut self, page: &mut Page, timers: &mut TimerRegistry<TimerAction>, now: u64) {
        match self.phase {
            PatcherPhase::Patched | PatcherPhase::Polling => return,
            PatcherPhase::Idle | PatcherPhase::TimedOut => {}
        }

        if try_patch(page) {
            self.phase = PatcherPhase::Patched;
            return;
        }

        self.poll_timer = timers.set_interval(
            TimerAction::ApiPoll,
            timings::API_POLL_INTERVAL_MS,
            now,
        );
        self.timeout_timer = timers.set_timeout(
            TimerAction::ApiPollTimeout,
            timings::API_POLL_TIMEOUT_MS,
            now,
        );
        self.phase = PatcherPhase::Polling;
        log::debug!("host API not present yet, polling");
    }

    /// Drops any previous outcome and arms again.
    pub fn rearm(&mut self, page: &mut Page, timers: &mut TimerRegistry<TimerAction>, now: u64) {
        self.release(timers);
        self.arm(page, timers, now);
    }

    /// One poll tick. Patches and stops polling once the surface appears.
    pub fn on_poll(&mut self, page: &mut Page, timers: &mut TimerRegistry<TimerAction>) {
        if self.phase != PatcherPhase::Polling {
            return;
        }
        if try_patch(page) {
            self.cancel_timers(timers);
            self.phase = PatcherPhase::Patched;
        }
    }

    /// The poll deadline passed without the surface appearing.
    pub fn on_timeout(&mut self, timers: &mut TimerRegistry<TimerAction>) {
        if self.phase != PatcherPhase::Polling {
            return;
        }
        self.cancel_timers(timers);
        self.phase = PatcherPhase::TimedOut;
        log::warn!(
            "host API did not appear within {}ms, continuing without the patch",
            timings::API_POLL_TIMEOUT_MS
        );
    }

    /// Cancels outstanding timers and returns to idle.
    pub fn release(&mut self, timers: &mut TimerRegistry<TimerAction>) {
        self.cancel_timers(timers);
        self.phase = PatcherPhase::Idle;
    }

    fn cancel_timers(&mut self, timers: &mut TimerRegistry<TimerAction>) {
        if let Some(id) = self.poll_timer.take() {
            timers.cancel(id);
        }
        if let Some(id) = self.timeout_timer.take() {
            timers.cancel(id);
        }
    }
}

// Neuters every known preview function and forces every gating flag off.
// Absent entries are skipped; the host may not expose all of them.
fn try_patch(page: &mut Page) -> bool {
    let Some(api) = page.api_mut() else {
        return false;
    };

    let mut neutered = 0_usize;
    for path in PREVIEW_FUNCTIONS {
        if api.neuter_function(path) {
            neutered += 1;
        }
    }
    for flag in PREVIEW_FLAGS {
        api.write_flag(flag, false);
    }

    log::info!("host API patched ({neutered} preview functions neutered)");
    true
}

#[cfg(test)]
mod tests {
    use super::HostApiPatcher;
    use super::PatcherPhase;
    use crate::engine::TimerAction;
    use crate::selectors::timings;
    use sf_dom::HostApiSurface;
    use sf_dom::Page;
    use sf_sched::TimerRegistry;

    #[test]
    fn patches_immediately_when_api_is_present() {
        let mut page = Page::new("https://host.example/");
        page.install_api(
            HostApiSurface::new()
                .with_function("thumbnails.startMoving")
                .with_flag("PREVIEW_ENABLED", true),
        );
        let mut timers = TimerRegistry::new();
        let mut patcher = HostApiPatcher::new();

        patcher.arm(&mut page, &mut timers, 0);
        assert_eq!(patcher.phase(), PatcherPhase::Patched);
        assert_eq!(timers.pending(), 0);

        let api = page.api().unwrap_or_else(|| unreachable!());
        assert!(api.is_neutered("thumbnails.startMoving"));
        assert_eq!(api.flag("PREVIEW_ENABLED"), Some(false));
        assert_eq!(api.flag("web_player_show_preview"), Some(false));
    }

    #[test]
    fn polls_until_the_api_appears() {
        let mut page = Page::new("https://host.example/");
        let mut timers = TimerRegistry::new();
        let mut patcher = HostApiPatcher::new();

        patcher.arm(&mut page, &mut timers, 0);
        assert_eq!(patcher.phase(), PatcherPhase::Polling);
        assert_eq!(timers.pending(), 2);

        patcher.on_poll(&mut page, &mut timers);
        assert_eq!(patcher.phase(), PatcherPhase::Polling);

        page.install_api(HostApiSurface::new().with_function("player.showPreview"));
        patcher.on_poll(&mut page, &mut timers);
        assert_eq!(patcher.phase(), PatcherPhase::Patched);
        assert_eq!(timers.pending(), 0);
        assert!(
            page.api()
                .is_some_and(|api| api.is_neutered("player.showPreview"))
        );
    }

    #[test]
    fn gives_up_at_the_timeout() {
        let mut page = Page::new("https://host.example/");
        let mut timers = TimerRegistry::new();
        let mut patcher = HostApiPatcher::new();

        patcher.arm(&mut page, &mut timers, 0);
        patcher.on_timeout(&mut timers);
        assert_eq!(patcher.phase(), PatcherPhase::TimedOut);
        assert_eq!(timers.pending(), 0);

        // A later navigation re-arms from the timed-out state.
        patcher.rearm(&mut page, &mut timers, timings::API_POLL_TIMEOUT_MS + 1);
        assert_eq!(patcher.phase(), PatcherPhase::Polling);
    }

    #[test]
    fn arm_while_patched_is_a_no_op() {
        let mut page = Page::new("https://host.example/");
        page.install_api(HostApiSurface::new());
        let mut timers = TimerRegistry::new();
        let mut patcher = HostApiPatcher::new();

        patcher.arm(&mut page, &mut timers, 0);
        assert_eq!(patcher.phase(), PatcherPhase::Patched);

        patcher.arm(&mut page, &mut timers, 5);
        assert_eq!(patcher.phase(), PatcherPhase::Patched);
        assert_eq!(timers.pending(), 0);
    }
}
