//! Renderer Confinement
//!
//! The renderer lives on the UI thread and is not `Send`. Only the UI loop
//! may call into it, and it must never do so while holding the window
//! collection lock.

use architectural_enforcement::{assert_clean, production_sources, scan, SourceFile};

const RENDERER_METHODS: [&str; 4] = [".set_fraction(", ".pulse(", ".set_subtitle(", ".take_dismissed("];

fn is_renderer_home(file: &SourceFile) -> bool {
    file.is("alert/ui_loop.rs") || file.is("alert/render.rs")
}

#[test]
fn test_sources_are_found() {
    let files = production_sources();
    assert!(files.iter().any(|f| f.is("alert/ui_loop.rs")));
    assert!(files.iter().any(|f| f.is("daemon/src/server.rs")));
}

#[test]
fn test_renderer_only_called_from_ui_loop() {
    let files = production_sources();
    let violations = scan(&files, "Renderer call outside the UI loop", is_renderer_home, |code| {
        RENDERER_METHODS.iter().any(|m| code.contains(m))
            || code.contains("renderer.open(")
            || code.contains("renderer.close(")
    });

    assert_clean(
        &violations,
        "Queue an idle callback through the AlertManager instead of calling the renderer.",
    );
}

#[test]
fn test_renderer_not_called_under_collection_lock() {
    let files = production_sources();
    let violations = scan(
        &files,
        "Renderer call on the same line as a lock",
        |file| !file.is("alert/ui_loop.rs"),
        |code| code.contains(".lock()") && code.contains("renderer"),
    );

    assert_clean(
        &violations,
        "Copy what you need out of the collection, release the lock, then call the renderer.",
    );
}
