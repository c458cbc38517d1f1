use chrono::{Local, NaiveDateTime};

/// Source of the current time for new messages.
///
/// Timestamps are naive local time, the same clock the transcript is shown
/// in. Tests substitute a deterministic implementation.
pub trait Clock: Send + Sync {
    /// Returns the current local time.
    fn now(&self) -> NaiveDateTime;
}

/// The wall clock of the machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
