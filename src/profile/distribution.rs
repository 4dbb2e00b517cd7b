//! Payload-length distributions.
//!
//! Per-class statistical models of payload sizes, derived from empirical
//! observations of real application traffic.

use rand::Rng;
use rand_distr::{Distribution as _, Normal, Pareto};

/// A statistical model producing payload lengths for one traffic class.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadDistribution {
    /// Two Gaussian modes: small header-like payloads and large data-like ones.
    Bimodal {
        /// Mean of the small mode, bytes
        small_mean: f64,
        /// Standard deviation of the small mode
        small_std_dev: f64,
        /// Probability of drawing from the small mode
        small_weight: f64,
        /// Mean of the large mode, bytes
        large_mean: f64,
        /// Standard deviation of the large mode
        large_std_dev: f64,
    },
    /// Pareto heavy tail, modeling file-transfer-like sizes.
    HeavyTailed {
        /// Minimum value (Pareto scale, x_m)
        scale: f64,
        /// Tail index (Pareto shape, alpha)
        shape: f64,
    },
}

impl PayloadDistribution {
    /// Draw one payload length.
    ///
    /// Always returns a strictly positive value; degenerate parameters
    /// collapse to the mode mean or scale instead of failing.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let raw = match self {
            Self::Bimodal {
                small_mean,
                small_std_dev,
                small_weight,
                large_mean,
                large_std_dev,
            } => {
                let (mean, std_dev) = if rng.gen::<f64>() < *small_weight {
                    (*small_mean, *small_std_dev)
                } else {
                    (*large_mean, *large_std_dev)
                };
                match Normal::new(mean, std_dev) {
                    Ok(normal) => normal.sample(rng),
                    Err(_) => mean,
                }
            }
            Self::HeavyTailed { scale, shape } => match Pareto::new(*scale, *shape) {
                Ok(pareto) => pareto.sample(rng),
                Err(_) => *scale,
            },
        };

        raw.max(1.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bimodal_sampling() {
        let dist = PayloadDistribution::Bimodal {
            small_mean: 100.0,
            small_std_dev: 20.0,
            small_weight: 0.8,
            large_mean: 1000.0,
            large_std_dev: 150.0,
        };

        let mut rng = rand::thread_rng();
        let mut small = 0usize;
        let mut large = 0usize;
        for _ in 0..1000 {
            let sample = dist.sample(&mut rng);
            assert!(sample >= 1);
            if sample < 500 {
                small += 1;
            } else {
                large += 1;
            }
        }

        // Both modes should be represented, the small one dominating.
        assert!(small > large);
        assert!(large > 0);
    }

    #[test]
    fn test_heavy_tailed_sampling() {
        let dist = PayloadDistribution::HeavyTailed {
            scale: 500.0,
            shape: 1.5,
        };

        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let sample = dist.sample(&mut rng);
            // Pareto samples never fall below the scale parameter.
            assert!(sample >= 500);
        }
    }

    #[test]
    fn test_degenerate_parameters() {
        let dist = PayloadDistribution::Bimodal {
            small_mean: 100.0,
            small_std_dev: -1.0,
            small_weight: 1.0,
            large_mean: 1000.0,
            large_std_dev: 150.0,
        };

        let mut rng = rand::thread_rng();
        assert_eq!(dist.sample(&mut rng), 100);

        let dist = PayloadDistribution::HeavyTailed {
            scale: 500.0,
            shape: -2.0,
        };
        assert_eq!(dist.sample(&mut rng), 500);
    }

    #[test]
    fn test_sample_strictly_positive() {
        let dist = PayloadDistribution::Bimodal {
            small_mean: 1.0,
            small_std_dev: 50.0,
            small_weight: 1.0,
            large_mean: 1.0,
            large_std_dev: 50.0,
        };

        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            assert!(dist.sample(&mut rng) >= 1);
        }
    }
}
