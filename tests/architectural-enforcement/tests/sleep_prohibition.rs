//! Sleep Prohibition
//!
//! Production code is driven by timers and channels. A blocking sleep on a
//! runtime worker stalls every request scheduled on it, and on the UI
//! thread it freezes every alert window.

use architectural_enforcement::{assert_clean, production_sources, scan};

#[test]
fn test_no_blocking_sleep_in_production_code() {
    let files = production_sources();
    let violations = scan(&files, "Blocking sleep", |_| false, |code| {
        code.contains("thread::sleep")
    });

    assert_clean(
        &violations,
        "Use tokio::time::sleep in async code or a crossbeam tick on the UI thread.",
    );
}
