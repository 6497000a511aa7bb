/// Time primitives.
///
/// All scheduling in the viewer is expressed against this timebase so that
/// hosts can drive it from a wall clock while tests drive it explicitly.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64); // seconds

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn from_millis(ms: f64) -> Self {
        Time(ms / 1000.0)
    }

    pub fn seconds(self) -> f64 {
        self.0
    }

    /// The instant `seconds` after `self`.
    pub fn after(self, seconds: f64) -> Self {
        Time(self.0 + seconds.max(0.0))
    }

    /// Elapsed seconds since `earlier`, never negative.
    pub fn since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn after_never_moves_backwards() {
        let t = Time(2.0);
        assert_eq!(t.after(0.5), Time(2.5));
        assert_eq!(t.after(-3.0), t);
    }

    #[test]
    fn since_is_clamped() {
        assert_eq!(Time(5.0).since(Time(3.5)), 1.5);
        assert_eq!(Time(1.0).since(Time(3.0)), 0.0);
        assert_eq!(Time::from_millis(300.0), Time(0.3));
    }
}
