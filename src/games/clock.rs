use crate::games::types::Multiplier;

/// Default exponential growth rate: 2.00x after ~11.55s
pub const DEFAULT_GROWTH_RATE_PER_MS: f64 = 0.00006;

/// Maps elapsed round time to the live multiplier.
///
/// The underlying curve `e^(rate * t)` is continuous and strictly increasing;
/// values are floored to hundredths, so `multiplier_at` never decreases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplierClock {
    growth_rate_per_ms: f64,
}

impl MultiplierClock {
    pub fn new(growth_rate_per_ms: f64) -> Self {
        Self { growth_rate_per_ms }
    }

    pub fn growth_rate_per_ms(&self) -> f64 {
        self.growth_rate_per_ms
    }

    /// Multiplier reached after `elapsed_ms` of running time
    pub fn multiplier_at(&self, elapsed_ms: u64) -> Multiplier {
        let value = (Multiplier::SCALE as f64) * (self.growth_rate_per_ms * elapsed_ms as f64).exp();
        if !value.is_finite() || value >= u64::MAX as f64 {
            return Multiplier::from_hundredths(u64::MAX);
        }
        Multiplier::from_hundredths((value.floor() as u64).max(Multiplier::SCALE))
    }

    /// First millisecond at which the curve reaches `target`.
    pub fn elapsed_for(&self, target: Multiplier) -> u64 {
        if target <= Multiplier::ONE {
            return 0;
        }

        let ratio = target.hundredths() as f64 / Multiplier::SCALE as f64;
        let mut elapsed = (ratio.ln() / self.growth_rate_per_ms).ceil().max(0.0) as u64;

        // Float error can land one or two ticks off in either direction.
        while elapsed > 0 && self.multiplier_at(elapsed - 1) >= target {
            elapsed -= 1;
        }
        while self.multiplier_at(elapsed) < target {
            elapsed += 1;
        }
        elapsed
    }
}

impl Default for MultiplierClock {
    fn default() -> Self {
        Self::new(DEFAULT_GROWTH_RATE_PER_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_one() {
        let clock = MultiplierClock::default();
        assert_eq!(clock.multiplier_at(0), Multiplier::ONE);
        assert_eq!(clock.elapsed_for(Multiplier::ONE), 0);
    }

    #[test]
    fn test_monotonic() {
        let clock = MultiplierClock::default();
        let mut last = clock.multiplier_at(0);
        for ms in (0..120_000).step_by(37) {
            let current = clock.multiplier_at(ms);
            assert!(current >= last, "multiplier decreased at {}ms", ms);
            last = current;
        }
        assert!(last > Multiplier::from_hundredths(1000));
    }

    #[test]
    fn test_doubling_time() {
        let clock = MultiplierClock::default();
        let elapsed = clock.elapsed_for(Multiplier::from_hundredths(200));
        // ln(2) / 0.00006 = 11552.45ms
        assert!((11_550..=11_555).contains(&elapsed), "elapsed = {}", elapsed);
    }

    #[test]
    fn test_elapsed_for_is_first_crossing() {
        let clock = MultiplierClock::default();
        for hundredths in [101, 150, 199, 200, 250, 777, 10_000, 123_456] {
            let target = Multiplier::from_hundredths(hundredths);
            let t = clock.elapsed_for(target);
            assert!(clock.multiplier_at(t) >= target);
            assert!(t == 0 || clock.multiplier_at(t - 1) < target);
        }
    }

    #[test]
    fn test_custom_growth_rate() {
        let fast = MultiplierClock::new(0.001);
        let slow = MultiplierClock::default();
        let target = Multiplier::from_hundredths(300);
        assert!(fast.elapsed_for(target) < slow.elapsed_for(target));
    }
}
