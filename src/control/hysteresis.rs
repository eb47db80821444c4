//! Relative-change gate for jittery analog inputs.

/// Accepts a reading only when it moved far enough from the last accepted
/// one.
///
/// With accepted value `v` and threshold `t`, a reading `w` passes when
/// `|w - v| / max(|v|, floor) >= t`. The floor keeps small jitter around
/// zero inside the band; with a zero floor and `v` zero, any other reading
/// passes. The very first reading always passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisGate {
    threshold: f32,
    floor: f32,
    accepted: Option<f32>,
}

impl HysteresisGate {
    pub fn new(threshold: f32) -> Self {
        Self::with_floor(threshold, 0.0)
    }

    /// Gate whose relative band never shrinks below `threshold * floor`.
    pub fn with_floor(threshold: f32, floor: f32) -> Self {
        Self {
            threshold,
            floor: floor.max(0.0),
            accepted: None,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Last accepted value.
    pub fn accepted(&self) -> Option<f32> {
        self.accepted
    }

    /// True if `reading` would be accepted.
    pub fn passes(&self, reading: f32) -> bool {
        match self.accepted {
            None => true,
            Some(v) => {
                let scale = v.abs().max(self.floor);
                if scale == 0.0 {
                    reading != v
                } else {
                    (reading - v).abs() / scale >= self.threshold
                }
            }
        }
    }

    /// Offer a reading; returns it if accepted.
    pub fn offer(&mut self, reading: f32) -> Option<f32> {
        if reading.is_nan() || !self.passes(reading) {
            return None;
        }
        self.accepted = Some(reading);
        Some(reading)
    }

    /// Forget the accepted value.
    pub fn reset(&mut self) {
        self.accepted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_reading_accepted() {
        let mut gate = HysteresisGate::new(0.2);
        assert_eq!(gate.offer(100.0), Some(100.0));
        assert_eq!(gate.accepted(), Some(100.0));
    }

    #[test]
    fn test_band() {
        let mut gate = HysteresisGate::new(0.2);
        gate.offer(100.0);
        assert_eq!(gate.offer(119.0), None);
        assert_eq!(gate.offer(81.0), None);
        assert_eq!(gate.offer(120.0), Some(120.0));
        // Band follows the accepted value.
        assert_eq!(gate.offer(100.0), None);
        assert_eq!(gate.offer(96.0), Some(96.0));
    }

    #[test]
    fn test_zero_accepted_value() {
        let mut gate = HysteresisGate::new(0.2);
        gate.offer(0.0);
        assert_eq!(gate.offer(0.0), None);
        assert_eq!(gate.offer(1.0), Some(1.0));
    }

    #[test]
    fn test_floor_absorbs_jitter_at_zero() {
        let mut gate = HysteresisGate::with_floor(0.2, 100.0);
        assert_eq!(gate.offer(0.0), Some(0.0));
        for reading in [1.0, 0.0, 1.0, 19.0, 0.0] {
            assert_eq!(gate.offer(reading), None);
        }
        assert_eq!(gate.offer(20.0), Some(20.0));
        // Above the floor the band is relative again.
        gate.offer(1000.0);
        assert_eq!(gate.offer(1199.0), None);
        assert_eq!(gate.offer(1200.0), Some(1200.0));
    }

    #[test]
    fn test_reset() {
        let mut gate = HysteresisGate::new(0.5);
        gate.offer(10.0);
        assert_eq!(gate.offer(11.0), None);
        gate.reset();
        assert_eq!(gate.offer(11.0), Some(11.0));
    }

    proptest! {
        #[test]
        fn prop_boundary(v in 1.0f32..1000.0, w in 0.0f32..2000.0, t in 0.05f32..0.9) {
            let mut gate = HysteresisGate::new(t);
            gate.offer(v);
            let accepted = gate.offer(w).is_some();
            prop_assert_eq!(accepted, (w - v).abs() / v >= t);
        }
    }
}
