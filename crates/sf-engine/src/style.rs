//! Stylesheet construction and injection.

use crate::selectors::PREVIEW_SELECTORS;
use sf_dom::NodeId;
use sf_dom::Page;
use sf_store::Settings;

/// Id of the injected `<style>` element.
pub const STYLE_ELEMENT_ID: &str = "stillframe-suppression-styles";

/// Preview surfaces the selector table cannot express as bare selectors:
/// flagged thumbnails, their inner preview children, and per-layout overlay
/// variants.
const PREVIEW_EXTRA_SELECTORS: [&str; 8] = [
    "ytd-thumbnail[moving]",
    "ytd-thumbnail .moving-thumbnail",
    "ytd-thumbnail .rich-thumbnail",
    ".ytp-videowall-still-image",
    ".compact-video-renderer .thumbnail-overlay",
    ".video-renderer .thumbnail-overlay",
    ".ytd-shorts .thumbnail-overlay",
    "#shorts-player .thumbnail-overlay",
];

const PREVIEW_BLOCK_DECLARATIONS: &str = "\
    display: none !important; opacity: 0 !important; visibility: hidden !important;\n\
    pointer-events: none !important; width: 0 !important; height: 0 !important;\n\
    position: absolute !important; left: -9999px !important; top: -9999px !important;\n";

const HOVER_EFFECT_RULES: &str = "\
ytd-thumbnail img, .thumbnail img, #img.ytd-thumbnail, .video-thumbnail img {\n\
    transition: none !important; transform: none !important;\n\
}\n\
ytd-thumbnail:hover img, .thumbnail:hover img, .video-thumbnail:hover img {\n\
    transform: none !important; scale: 1 !important; filter: none !important;\n\
}\n\
ytd-thumbnail:hover, .thumbnail:hover {\n\
    transform: none !important; box-shadow: none !important;\n\
}\n";

const ANIMATION_RULES: &str = "\
ytd-thumbnail, ytd-thumbnail *, .thumbnail, .thumbnail *, .video-thumbnail, .video-thumbnail * {\n\
    animation: none !important; transition: none !important;\n\
}\n\
.thumbnail-loading, .thumbnail-spinner { display: none !important; }\n";

/// Assembles the stylesheet text for the enabled toggles. Disabled toggles
/// contribute nothing, so all-off yields an empty sheet.
pub fn build_stylesheet(settings: &Settings) -> String {
    let mut css = String::new();
    if settings.disable_previews {
        css.push_str(&preview_block());
    }
    if settings.disable_hover_effects {
        css.push_str(HOVER_EFFECT_RULES);
    }
    if settings.disable_animations {
        css.push_str(ANIMATION_RULES);
    }
    css
}

// Hides every selector in the shared preview table, so the stylesheet and
// the scan-side tables cannot drift apart.
fn preview_block() -> String {
    let selectors: Vec<&str> = PREVIEW_SELECTORS
        .iter()
        .chain(PREVIEW_EXTRA_SELECTORS.iter())
        .copied()
        .collect();
    format!("{} {{\n{}}}\n", selectors.join(",\n"), PREVIEW_BLOCK_DECLARATIONS)
}

/// Owns the injected style element and keeps its text in sync with settings.
#[derive(Debug, Default)]
pub struct StyleInjector {
    element: Option<NodeId>,
}

impl StyleInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures the style element exists and carries the current stylesheet.
    /// Writes only when the text actually changes.
    pub fn apply(&mut self, page: &mut Page, settings: &Settings) -> sf_core::EngineResult<()> {
        let element = self.ensure_element(page)?;
        let css = build_stylesheet(settings);
        if page.document.text(element) != Some(css.as_str()) {
            page.document.set_text(element, &css)?;
            log::debug!("suppression stylesheet updated ({} bytes)", css.len());
        }
        Ok(())
    }

    /// Removes the injected element. Safe to call when nothing is injected.
    pub fn teardown(&mut self, page: &mut Page) -> sf_core::EngineResult<()> {
        if let Some(element) = self.element.take() {
            if let Some(parent) = page.document.parent(element) {
                page.document.remove_child(parent, element)?;
                log::debug!("suppression stylesheet removed");
            }
        }
        Ok(())
    }

    pub fn element(&self) -> Option<NodeId> {
        self.element
    }

    // Re-creates the element if the host tore it out of the tree.
    fn ensure_element(&mut self, page: &mut Page) -> sf_core::EngineResult<NodeId> {
        if let Some(element) = self.element {
            if page.document.is_connected(element) {
                return Ok(element);
            }
            log::debug!("style element was detached by the host, re-creating");
        }

        let element = page.document.create_element("style");
        page.document
            .set_attribute(element, "id", STYLE_ELEMENT_ID)?;
        page.document.append_child(page.document.head(), element)?;
        self.element = Some(element);
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::StyleInjector;
    use super::build_stylesheet;
    use crate::selectors::PREVIEW_SELECTORS;
    use sf_dom::Page;
    use sf_store::Settings;

    #[test]
    fn only_enabled_toggles_contribute_rules() {
        let only_previews = Settings {
            disable_previews: true,
            disable_hover_effects: false,
            disable_animations: false,
            debug: false,
        };
        let css = build_stylesheet(&only_previews);
        assert!(css.contains("ytd-moving-thumbnail-renderer"));
        assert!(!css.contains(":hover"));
        assert!(!css.contains("animation: none"));

        let all_off = Settings {
            disable_previews: false,
            disable_hover_effects: false,
            disable_animations: false,
            debug: false,
        };
        assert!(build_stylesheet(&all_off).is_empty());
    }

    #[test]
    fn preview_block_hides_every_tabled_selector() {
        let css = build_stylesheet(&Settings::default());
        for selector in PREVIEW_SELECTORS {
            assert!(css.contains(selector), "missing `{selector}`");
        }
    }

    #[test]
    fn apply_is_idempotent_on_write_count() {
        let mut page = Page::new("https://host.example/");
        let mut injector = StyleInjector::new();
        let settings = Settings::default();

        assert!(injector.apply(&mut page, &settings).is_ok());
        let writes_after_first = page.document.write_ops();

        assert!(injector.apply(&mut page, &settings).is_ok());
        assert_eq!(page.document.write_ops(), writes_after_first);
    }

    #[test]
    fn detached_element_is_recreated() {
        let mut page = Page::new("https://host.example/");
        let mut injector = StyleInjector::new();
        let settings = Settings::default();

        assert!(injector.apply(&mut page, &settings).is_ok());
        let first = injector.element().unwrap_or_else(|| unreachable!());

        let head = page.document.head();
        assert!(page.document.remove_child(head, first).is_ok());

        assert!(injector.apply(&mut page, &settings).is_ok());
        let second = injector.element().unwrap_or_else(|| unreachable!());
        assert_ne!(first, second);
        assert!(page.document.is_connected(second));
    }

    #[test]
    fn teardown_removes_the_element_and_is_idempotent() {
        let mut page = Page::new("https://host.example/");
        let mut injector = StyleInjector::new();

        assert!(injector.apply(&mut page, &Settings::default()).is_ok());
        assert!(injector.teardown(&mut page).is_ok());
        assert!(injector.element().is_none());
        assert!(injector.teardown(&mut page).is_ok());
    }
}
