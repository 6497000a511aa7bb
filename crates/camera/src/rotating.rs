use std::f64::consts::TAU;

use foundation::math::Quat;
use foundation::time::Time;

/// Turntable behaviour: spins the model's root, never the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatingModel {
    rate_rad_per_s: f64,
    angle_rad: f64,
    // Set while enabled; elapsed time is measured from here.
    last_tick: Option<Time>,
}

impl RotatingModel {
    pub fn new(rate_rad_per_s: f64) -> Self {
        Self {
            rate_rad_per_s: if rate_rad_per_s.is_finite() {
                rate_rad_per_s
            } else {
                0.0
            },
            angle_rad: 0.0,
            last_tick: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.last_tick.is_some()
    }

    pub fn angle_rad(&self) -> f64 {
        self.angle_rad
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.angle_rad)
    }

    pub fn set_enabled(&mut self, enabled: bool, now: Time) {
        match (enabled, self.last_tick) {
            (true, None) => self.last_tick = Some(now),
            (false, Some(_)) => self.last_tick = None,
            _ => {}
        }
    }

    pub fn toggle(&mut self, now: Time) -> bool {
        let enabled = !self.is_enabled();
        self.set_enabled(enabled, now);
        enabled
    }

    /// Advances the angle by the time elapsed since the previous tick.
    pub fn advance(&mut self, now: Time) -> f64 {
        if let Some(last) = self.last_tick {
            let dt = now.since(last);
            self.angle_rad = (self.angle_rad + dt * self.rate_rad_per_s).rem_euclid(TAU);
            self.last_tick = Some(now);
        }
        self.angle_rad
    }
}

#[cfg(test)]
mod tests {
    use super::RotatingModel;
    use foundation::time::Time;
    use std::f64::consts::TAU;

    #[test]
    fn rotates_only_while_enabled() {
        let mut m = RotatingModel::new(1.0);
        m.advance(Time(5.0));
        assert_eq!(m.angle_rad(), 0.0);

        m.set_enabled(true, Time(5.0));
        m.set_enabled(true, Time(6.0));
        assert!((m.advance(Time(7.0)) - 2.0).abs() < 1e-12);

        m.set_enabled(false, Time(7.0));
        m.advance(Time(9.0));
        assert!((m.angle_rad() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn angle_wraps() {
        let mut m = RotatingModel::new(1.0);
        m.toggle(Time(0.0));
        let a = m.advance(Time(TAU + 0.5));
        assert!((a - 0.5).abs() < 1e-9);
    }

    #[test]
    fn reenabling_does_not_jump() {
        let mut m = RotatingModel::new(1.0);
        assert!(m.toggle(Time(0.0)));
        m.advance(Time(1.0));
        assert!(!m.toggle(Time(1.0)));
        assert!(m.toggle(Time(100.0)));
        assert!((m.advance(Time(100.5)) - 1.5).abs() < 1e-12);
    }
}
