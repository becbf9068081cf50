//! The externally-owned page: document, location, host API, host events.

use crate::api::HostApiSurface;
use crate::document::Document;
use sf_core::EngineResult;
use std::collections::VecDeque;

/// One host page. The host (tests, the demo driver, eventually a real
/// embedding) mutates it; the engine only observes and patches.
#[derive(Debug)]
pub struct Page {
    pub document: Document,
    location: String,
    api: Option<HostApiSurface>,
    emitted: VecDeque<String>,
}

impl Page {
    pub fn new(location: &str) -> Self {
        Self {
            document: Document::new(),
            location: location.to_owned(),
            api: None,
            emitted: VecDeque::new(),
        }
    }

    /// Page whose document never renders a title node.
    pub fn without_title(location: &str) -> Self {
        Self {
            document: Document::without_title(),
            location: location.to_owned(),
            api: None,
            emitted: VecDeque::new(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// SPA route change: the location and title move, the document does not
    /// reload. Hosts without a title node change location silently; their
    /// body churn is what observers see.
    pub fn navigate(&mut self, location: &str, title: &str) -> EngineResult<()> {
        self.location = location.to_owned();
        if self.document.title_node().is_some() {
            self.document.set_title(title)?;
        }
        Ok(())
    }

    /// Host-dispatched global event (e.g. the SPA router announcing a view
    /// change).
    pub fn emit_host_event(&mut self, name: &str) {
        self.emitted.push_back(name.to_owned());
    }

    pub fn take_host_events(&mut self) -> Vec<String> {
        self.emitted.drain(..).collect()
    }

    pub fn install_api(&mut self, api: HostApiSurface) {
        self.api = Some(api);
    }

    /// Hosts may tear the namespace down (navigation rebuilds it later).
    pub fn remove_api(&mut self) {
        self.api = None;
    }

    pub fn api(&self) -> Option<&HostApiSurface> {
        self.api.as_ref()
    }

    pub fn api_mut(&mut self) -> Option<&mut HostApiSurface> {
        self.api.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::Page;
    use crate::api::HostApiSurface;

    #[test]
    fn navigation_updates_location_and_title() {
        let mut page = Page::new("https://host.example/feed");
        let moved = page.navigate("https://host.example/watch?v=1", "Watching");
        assert!(moved.is_ok());
        assert_eq!(page.location(), "https://host.example/watch?v=1");

        let title = page.document.title_node();
        assert!(title.is_some_and(|id| page.document.text(id) == Some("Watching")));
    }

    #[test]
    fn titleless_pages_navigate_silently() {
        let mut page = Page::without_title("https://host.example/");
        assert!(page.navigate("https://host.example/next", "ignored").is_ok());
        assert_eq!(page.location(), "https://host.example/next");
    }

    #[test]
    fn host_events_drain_in_order() {
        let mut page = Page::new("https://host.example/");
        page.emit_host_event("yt-navigate-start");
        page.emit_host_event("yt-navigate-finish");

        assert_eq!(
            page.take_host_events(),
            vec!["yt-navigate-start".to_owned(), "yt-navigate-finish".to_owned()]
        );
        assert!(page.take_host_events().is_empty());
    }

    #[test]
    fn api_surface_can_come_and_go() {
        let mut page = Page::new("https://host.example/");
        assert!(page.api().is_none());

        page.install_api(HostApiSurface::new().with_flag("PREVIEW_ENABLED", true));
        assert!(page.api().is_some());

        page.remove_api();
        assert!(page.api_mut().is_none());
    }
}
