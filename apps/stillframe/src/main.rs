//! Demo driver: builds a synthetic host page, runs the controller against a
//! scripted rerender-and-navigate timeline, and prints what got suppressed.

use sf_core::DiagnosticSink;
use sf_dom::EventType;
use sf_dom::HostApiSurface;
use sf_dom::NodeId;
use sf_dom::Page;
use sf_engine::Command;
use sf_engine::Controller;
use sf_store::FilePreferenceStore;
use sf_update::UpdateCheck;
use std::path::PathBuf;

const TICK_STEP_MS: u64 = 25;

fn main() {
    let verbosity = match DiagnosticSink::install("stillframe") {
        Ok(handle) => handle,
        Err(error) => {
            eprintln!("Stillframe startup error: {error}");
            return;
        }
    };

    let storage_root = default_storage_root();
    log::info!("preferences at {}", storage_root.display());
    let store = FilePreferenceStore::new(storage_root);
    let mut controller = Controller::new(Box::new(store), update_check()).with_verbosity(verbosity);

    let mut page = Page::new("https://host.example/");
    page.install_api(
        HostApiSurface::new()
            .with_function("thumbnails.startMoving")
            .with_function("player.showPreview")
            .with_flag("web_player_show_preview", true),
    );

    let mut now = 0_u64;
    if let Err(error) = controller.start(&mut page, now) {
        eprintln!("Stillframe startup error: {error}");
        return;
    }

    // Initial render: a feed of thumbnails, some already flagged as
    // previewing.
    let mut thumbnails = Vec::new();
    for index in 0..8 {
        let thumb = add_thumbnail(&mut page, index);
        if index % 3 == 0 {
            let _ = page.document.set_attribute(thumb, "moving", "true");
        }
        thumbnails.push(thumb);
    }
    now = run_until(&mut controller, &mut page, now, 500);

    // The host fires hover events at the intercepted elements.
    for &thumb in &thumbnails {
        let _ = page.document.dispatch_event(thumb, EventType::MouseOver);
        let _ = page.document.dispatch_event(thumb, EventType::MouseEnter);
    }

    // Soft navigation to a watch page, followed by a fresh rerender burst.
    let _ = page.navigate("https://host.example/watch?v=demo", "Watching: demo");
    page.emit_host_event("yt-navigate-finish");
    now = run_until(&mut controller, &mut page, now, 200);
    for index in 8..20 {
        add_thumbnail(&mut page, index);
    }
    now = run_until(&mut controller, &mut page, now, 4_000);

    let _ = controller.execute(Command::ToggleDebug, &mut page);
    let status = controller.status(&page);
    println!("Stillframe status");
    println!("  state:               {:?}", status.state);
    println!("  location:            {}", status.location);
    println!("  settings:            {:?}", status.settings);
    println!("  scans accepted:      {}", status.stats.scans_accepted);
    println!("  thumbnails seen:     {}", status.stats.thumbnails_processed);
    println!("  hover events eaten:  {}", status.stats.events_blocked);
    println!("  markers scrubbed:    {}", status.stats.attributes_removed);
    if let Some(api) = page.api() {
        println!(
            "  API patched:         {}",
            api.is_neutered("player.showPreview")
        );
    }

    controller.stop(&mut page);
}

fn add_thumbnail(page: &mut Page, index: usize) -> NodeId {
    let thumb = page.document.create_element("ytd-thumbnail");
    let _ = page
        .document
        .set_attribute(thumb, "href", &format!("/watch?v={index}"));
    let body = page.document.body();
    let _ = page.document.append_child(body, thumb);
    thumb
}

// Advances the engine clock in small steps so debounces and intervals fire
// at realistic points.
fn run_until(controller: &mut Controller, page: &mut Page, from: u64, duration: u64) -> u64 {
    let until = from.saturating_add(duration);
    let mut now = from;
    while now < until {
        now = (now + TICK_STEP_MS).min(until);
        controller.tick(page, now);
    }
    now
}

fn update_check() -> UpdateCheck {
    UpdateCheck {
        name: "Stillframe".to_owned(),
        current_version: env!("CARGO_PKG_VERSION").to_owned(),
        update_url: "https://release.example/stillframe/latest.txt".to_owned(),
        download_url: "https://release.example/stillframe/latest.txt".to_owned(),
    }
}

fn default_storage_root() -> PathBuf {
    if let Some(override_root) = std::env::var_os("STILLFRAME_STORAGE_DIR") {
        return PathBuf::from(override_root);
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".stillframe")
}
