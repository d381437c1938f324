//! Random, permanent robot failures injected by the belt controller.

use rand::Rng;

/// Converts a per-second failure probability into per-tick trials.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FailureModel {
    enabled: bool,
    probability_per_second: f64,
}

impl FailureModel {
    pub fn new(enabled: bool, probability_per_second: f64) -> Self {
        Self {
            enabled,
            probability_per_second,
        }
    }

    /// A model that never fails anything.
    pub fn disabled() -> Self {
        Self::new(false, 0.0)
    }

    /// Whether trials are drawn at all.
    pub fn is_active(&self) -> bool {
        self.enabled && self.probability_per_second > 0.0
    }

    /// Probability that one robot fails during a tick of `dt` seconds.
    pub fn per_tick_probability(&self, dt: f64) -> f64 {
        if !self.is_active() {
            return 0.0;
        }
        (self.probability_per_second * dt).clamp(0.0, 1.0)
    }

    /// One Bernoulli trial for a single robot over one tick.
    pub fn sample<R: Rng>(&self, rng: &mut R, dt: f64) -> bool {
        let p = self.per_tick_probability(dt);
        p > 0.0 && rng.gen_bool(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn disabled_model_never_fails() {
        let model = FailureModel::new(false, 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(model.per_tick_probability(0.05), 0.0);
        assert!((0..10_000).all(|_| !model.sample(&mut rng, 0.05)));
    }

    #[test]
    fn zero_probability_never_fails() {
        let model = FailureModel::new(true, 0.0);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(!model.is_active());
        assert!((0..10_000).all(|_| !model.sample(&mut rng, 1.0)));
    }

    #[test]
    fn per_tick_probability_scales_with_dt() {
        let model = FailureModel::new(true, 0.2);
        assert!((model.per_tick_probability(0.05) - 0.01).abs() < 1e-12);
        // Clamped so long ticks stay a valid probability.
        assert_eq!(model.per_tick_probability(10.0), 1.0);
    }

    #[test]
    fn certain_failure_over_full_second_tick() {
        let model = FailureModel::new(true, 1.0);
        let mut rng = StdRng::seed_from_u64(42);
        assert!((0..100).all(|_| model.sample(&mut rng, 1.0)));
    }

    #[test]
    fn empirical_rate_matches_per_tick_probability() {
        let model = FailureModel::new(true, 1.0);
        let mut rng = StdRng::seed_from_u64(1234);
        let trials = 20_000;
        let hits = (0..trials).filter(|_| model.sample(&mut rng, 0.05)).count();
        let rate = hits as f64 / trials as f64;
        assert!((rate - 0.05).abs() < 0.01, "rate={rate}");
    }
}
