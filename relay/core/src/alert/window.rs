//! Alert Window State
//!
//! The tracked runtime state of one displayed (or about to be displayed)
//! alert, plus the pure helpers that drive its progress indicator.
//!
//! # Lifecycle
//!
//! ```text
//!   Created ──realize──▶ Active ──expire / dismiss / shutdown──▶ Inactive ──sweep──▶ (removed)
//!      │                                                            ▲
//!      └──────────────dismiss / shutdown / render failure───────────┘
//! ```
//!
//! `Inactive` is entered at most once. Every transition is performed on the
//! UI thread; other threads only request one.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Unique identifier for an alert window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertId(u64);

impl AlertId {
    /// Allocate the next identifier
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alert-{}", self.0)
    }
}

/// How an alert counts down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Dismisses itself after the given duration
    Timed(Duration),
    /// Stays until dismissed or shut down
    Perpetual,
}

/// Why a window left the active state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InactiveReason {
    /// The countdown reached its deadline
    Expired,
    /// The user (or an API caller) dismissed it
    Dismissed,
    /// The process is shutting down
    Shutdown,
    /// The renderer could not create the window
    RenderFailed,
}

/// Lifecycle state of an alert window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Enqueued for realization on the UI thread
    Created,
    /// Visible and counting down (or pulsing)
    Active,
    /// Retired; awaiting the next sweep
    Inactive(InactiveReason),
}

/// Tracked state of one alert window
#[derive(Debug, Clone, PartialEq)]
pub struct AlertWindow {
    /// Window identifier
    pub id: AlertId,
    /// Message shown in the window
    pub message: String,
    /// Icon identifier shown in the window
    pub icon: String,
    /// Countdown behavior
    pub countdown: Countdown,
    /// Current lifecycle state
    pub state: WindowState,
    /// When the window was realized on the UI thread
    pub created_at: Option<Instant>,
}

impl AlertWindow {
    pub(crate) fn new(id: AlertId, message: String, icon: String, countdown: Countdown) -> Self {
        Self {
            id,
            message,
            icon,
            countdown,
            state: WindowState::Created,
            created_at: None,
        }
    }

    /// Instant at which a timed window expires
    ///
    /// `None` for perpetual windows and windows not yet realized.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        match (self.countdown, self.created_at) {
            (Countdown::Timed(timeout), Some(created)) => Some(created + timeout),
            _ => None,
        }
    }

    /// Whether the window is visible
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == WindowState::Active
    }

    /// Whether the window has been retired
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        matches!(self.state, WindowState::Inactive(_))
    }
}

// =============================================================================
// Collection
// =============================================================================

/// Windows tracked by the manager, oldest first
///
/// Once closed, the collection refuses new windows. Closing and inserting
/// both happen under the same lock, so no window can slip in after the UI
/// thread's final sweep.
#[derive(Debug, Default)]
pub struct WindowCollection {
    entries: Vec<AlertWindow>,
    closed: bool,
}

impl WindowCollection {
    /// Whether the UI loop has shut the collection
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Append a window unless the collection is closed
    ///
    /// Hands the window back when it was refused.
    pub fn insert(&mut self, window: AlertWindow) -> Result<(), AlertWindow> {
        if self.closed {
            return Err(window);
        }
        self.entries.push(window);
        Ok(())
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }
}

impl Deref for WindowCollection {
    type Target = Vec<AlertWindow>;

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl DerefMut for WindowCollection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entries
    }
}

/// Fraction of the countdown remaining, clamped to `[0, 1]`
#[must_use]
pub fn progress_fraction(elapsed: Duration, timeout: Duration) -> f64 {
    if timeout.is_zero() {
        return 0.0;
    }
    (1.0 - elapsed.as_secs_f64() / timeout.as_secs_f64()).clamp(0.0, 1.0)
}

/// Human-friendly age of a window, used as its subtitle
#[must_use]
pub fn humanize_age(age: Duration) -> String {
    let secs = age.as_secs();
    let (amount, unit) = match secs {
        0..=4 => return "just now".to_string(),
        5..=59 => (secs, "second"),
        60..=3599 => (secs / 60, "minute"),
        3600..=86_399 => (secs / 3600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    if amount == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{amount} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_ids_are_unique() {
        let a = AlertId::next();
        let b = AlertId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("alert-"));
    }

    #[test]
    fn test_progress_fraction_is_clamped() {
        let timeout = Duration::from_millis(1000);
        assert!((progress_fraction(Duration::ZERO, timeout) - 1.0).abs() < f64::EPSILON);
        assert!((progress_fraction(Duration::from_millis(500), timeout) - 0.5).abs() < 1e-9);
        assert!(progress_fraction(Duration::from_secs(5), timeout).abs() < f64::EPSILON);
        assert!(progress_fraction(Duration::from_secs(1), Duration::ZERO).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deadline_follows_creation_time() {
        let mut window = AlertWindow::new(
            AlertId::next(),
            "hi".to_string(),
            "dialog-information".to_string(),
            Countdown::Timed(Duration::from_millis(1000)),
        );
        assert_eq!(window.deadline(), None);

        let created = Instant::now();
        window.created_at = Some(created);
        assert_eq!(window.deadline(), Some(created + Duration::from_secs(1)));

        window.countdown = Countdown::Perpetual;
        assert_eq!(window.deadline(), None);
    }

    #[test]
    fn test_closed_collection_refuses_windows() {
        let window = |message: &str| {
            AlertWindow::new(
                AlertId::next(),
                message.to_string(),
                "dialog-information".to_string(),
                Countdown::Perpetual,
            )
        };
        let mut windows = WindowCollection::default();
        assert!(windows.insert(window("early")).is_ok());

        windows.close();
        let refused = windows.insert(window("late")).unwrap_err();
        assert_eq!(refused.message, "late");
        assert!(windows.is_closed());
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn test_humanize_age() {
        assert_eq!(humanize_age(Duration::from_secs(2)), "just now");
        assert_eq!(humanize_age(Duration::from_secs(30)), "30 seconds ago");
        assert_eq!(humanize_age(Duration::from_secs(60)), "1 minute ago");
        assert_eq!(humanize_age(Duration::from_secs(7200)), "2 hours ago");
        assert_eq!(humanize_age(Duration::from_secs(86_400 * 3)), "3 days ago");
    }
}
