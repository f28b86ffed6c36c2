/// Seconds-resolution countdown for one attempt.
///
/// `remaining` only ever decreases and stops at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total: u32,
    remaining: u32,
}

impl Countdown {
    /// Returns `None` for a zero-length countdown.
    #[must_use]
    pub fn new(total_seconds: u32) -> Option<Self> {
        (total_seconds > 0).then_some(Self {
            total: total_seconds,
            remaining: total_seconds,
        })
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Consume one second and return what is left.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// `mm:ss`; minutes are not capped at 59.
    #[must_use]
    pub fn label(&self) -> String {
        format_seconds(self.remaining)
    }

    /// Share of the time still left, in `[0.0, 1.0]`.
    #[must_use]
    pub fn fraction_remaining(&self) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.remaining as f32 / self.total as f32;
        fraction.clamp(0.0, 1.0)
    }
}

#[must_use]
pub fn format_seconds(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
