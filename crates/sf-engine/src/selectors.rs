//! Selector and attribute tables the suppression passes work from, plus the
//! timing constants that pace them.

/// Elements that can grow a hover preview and need listeners attached.
pub const CANDIDATE_SELECTORS: [&str; 10] = [
    "a#thumbnail",
    "ytd-thumbnail",
    ".thumbnail",
    ".video-thumbnail",
    ".compact-video-renderer .thumbnail",
    ".video-renderer .thumbnail",
    "a.ytd-thumbnail",
    "#thumbnail.ytd-thumbnail",
    ".ytp-videowall-still-image",
    ".rich-thumbnail",
];

/// Preview surfaces the stylesheet hides outright.
pub const PREVIEW_SELECTORS: [&str; 10] = [
    "ytd-moving-thumbnail-renderer",
    "ytd-video-preview",
    ".ytp-preview",
    ".html5-video-preview",
    ".ytp-hover-overlay",
    ".ytp-videowall-still",
    ".rich-thumbnail-renderer",
    ".thumbnail-overlay-container",
    ".thumbnail-hover-overlay",
    ".video-thumbnail-overlay",
];

/// Attributes the host writes to flag an element as actively previewing.
pub const MARKER_ATTRIBUTES: [&str; 4] = ["moving", "data-preview", "data-hover-preview", "preview-enabled"];

/// Host events that signal a soft navigation.
pub const NAVIGATION_EVENTS: [&str; 4] = [
    "yt-navigate-start",
    "yt-navigate-finish",
    "yt-page-data-updated",
    "spfdone",
];

/// Attribute names worth observing for mutations; anything else churns too
/// much to be useful.
pub const OBSERVED_ATTRIBUTES: [&str; 7] = [
    "moving",
    "class",
    "id",
    "href",
    "src",
    "data-preview",
    "style",
];

/// Dotted paths of host API functions that start previews.
pub const PREVIEW_FUNCTIONS: [&str; 4] = [
    "thumbnails.startMoving",
    "thumbnails.stopMoving",
    "player.handleInlinePreviewHover",
    "player.showPreview",
];

/// Host experiment flags that gate previews.
pub const PREVIEW_FLAGS: [&str; 7] = [
    "web_player_show_preview",
    "enable_thumbnail_preview",
    "web_thumbnail_hover_preview",
    "web_player_enable_storyboard_hover_preview",
    "web_player_inline_prev_hover_endscreen_enable_thumbnail_preview",
    "PREVIEW_ENABLED",
    "HOVER_PREVIEW_ENABLED",
];

/// Pacing constants, all in milliseconds of engine-clock time.
pub mod timings {
    /// Mutation bursts collapse into one re-scan after this quiet window.
    pub const MUTATION_DEBOUNCE_MS: u64 = 50;
    /// Unforced scans are dropped if one started more recently than this.
    pub const SCAN_MIN_INTERVAL_MS: u64 = 100;
    /// Delay between navigation detection and the forced re-application pass.
    pub const NAVIGATION_SETTLE_MS: u64 = 300;
    /// Period of the standing marker-attribute sweep.
    pub const SWEEP_INTERVAL_MS: u64 = 3000;
    /// Period of the host API poll while waiting for it to appear.
    pub const API_POLL_INTERVAL_MS: u64 = 100;
    /// Give up waiting for the host API after this long.
    pub const API_POLL_TIMEOUT_MS: u64 = 10_000;
}
