use super::FloatType;

/// Open range of ray parameters in which an intersection is accepted.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Interval {
    pub min: FloatType,
    pub max: FloatType,
}

impl Interval {
    pub fn new(min: FloatType, max: FloatType) -> Interval {
        Interval { min, max }
    }

    /// Everything strictly beyond `min`.
    pub fn beyond(min: FloatType) -> Interval {
        Interval::new(min, FloatType::INFINITY)
    }

    /// Returns true if t is strictly within the interval (min, max).
    pub fn surrounds(&self, t: FloatType) -> bool {
        self.min < t && t < self.max
    }

    /// Same interval, with the upper end pulled in to `max`.
    pub fn closer_than(&self, max: FloatType) -> Interval {
        Interval::new(self.min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn surrounds_is_exclusive() {
        let interval = Interval::new(0.0, 10.0);
        assert!(interval.surrounds(5.0));
        assert!(!interval.surrounds(0.0));
        assert!(!interval.surrounds(10.0));
    }

    #[test]
    fn beyond_is_unbounded() {
        let interval = Interval::beyond(1.0);
        assert!(interval.surrounds(1e30));
        assert!(!interval.surrounds(FloatType::INFINITY));
    }
}
