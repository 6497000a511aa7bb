use crate::math::Vec3;

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    /// An inverted box that absorbs the first point it is grown by.
    pub fn empty() -> Self {
        Aabb3 {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn include_point(&mut self, p: Vec3) {
        let p = [p.x, p.y, p.z];
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a[0], a[1], a[2]),
            Vec3::new(b[0], a[1], a[2]),
            Vec3::new(a[0], b[1], a[2]),
            Vec3::new(b[0], b[1], a[2]),
            Vec3::new(a[0], a[1], b[2]),
            Vec3::new(b[0], a[1], b[2]),
            Vec3::new(a[0], b[1], b[2]),
            Vec3::new(b[0], b[1], b[2]),
        ]
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        )
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        Vec3::new(
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        )
    }

    /// Radius of the sphere enclosing the box.
    pub fn radius(&self) -> f64 {
        self.size().length() * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb3;
    use crate::math::Vec3;

    #[test]
    fn grows_from_empty() {
        let mut b = Aabb3::empty();
        assert!(b.is_empty());
        b.include_point(Vec3::new(1.0, -2.0, 3.0));
        b.include_point(Vec3::new(-1.0, 2.0, 0.0));
        assert!(!b.is_empty());
        assert_eq!(b.min, [-1.0, -2.0, 0.0]);
        assert_eq!(b.max, [1.0, 2.0, 3.0]);
        assert_eq!(b.center(), Vec3::new(0.0, 0.0, 1.5));
    }

    #[test]
    fn empty_box_has_zero_size() {
        assert_eq!(Aabb3::empty().size(), Vec3::ZERO);
    }
}
