// pilot-ledger-rs/src/sampler.rs
// Per-event uniform sampling.

use rand::Rng;
use telemetry_types::ConfigError;

/// Decides independently for each candidate event whether it is kept.
///
/// The rate is validated once at construction; `admit` never revisits
/// configuration. Draws are uniform over `[0.0, 1.0)` and compared with
/// strict `<`, so a rate of 1.0 admits every event and a rate of 0.0
/// admits none, exactly.
#[derive(Debug, Clone)]
pub struct Sampler {
    rate: f64,
}

impl Sampler {
    pub fn new(rate: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::InvalidValue(format!(
                "sample rate must be within [0.0, 1.0], got {rate}"
            )));
        }
        Ok(Self { rate })
    }

    /// Draw once and decide. No memoization, no per-session stickiness.
    pub fn admit(&self) -> bool {
        rand::thread_rng().gen::<f64>() < self.rate
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_rates() {
        assert!(Sampler::new(-0.01).is_err());
        assert!(Sampler::new(1.01).is_err());
        assert!(Sampler::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rate_one_admits_everything() {
        let sampler = Sampler::new(1.0).unwrap();
        assert!((0..1_000).all(|_| sampler.admit()));
    }

    #[test]
    fn test_rate_zero_admits_nothing() {
        let sampler = Sampler::new(0.0).unwrap();
        assert!(!(0..1_000).any(|_| sampler.admit()));
    }

    #[test]
    fn test_admitted_fraction_tracks_the_rate() {
        let sampler = Sampler::new(0.3).unwrap();
        let trials = 20_000;
        let admitted = (0..trials).filter(|_| sampler.admit()).count();
        let fraction = admitted as f64 / trials as f64;
        // ~6 standard deviations of slack at this sample size.
        assert!(
            (fraction - 0.3).abs() < 0.02,
            "admitted fraction {fraction} strayed too far from 0.3"
        );
    }
}
