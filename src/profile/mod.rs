//! Traffic profiles and payload sampling.
//!
//! A [`Profile`] bundles the shape parameters of one traffic archetype:
//! cell size bounds, cover-traffic cadence, send jitter, a weighted mix of
//! traffic classes with per-class payload-length distributions, and a
//! smoothed load estimate updated on every sample.
//!
//! Built-in profiles mirror empirical observations of the traffic they
//! mimic: web browsing is bimodal (small requests, larger responses),
//! video streaming leans on sustained near-MTU segments, file download is
//! heavy-tailed.

mod distribution;

pub use distribution::PayloadDistribution;

use std::time::Duration;

use rand::Rng;

use crate::framing::CELL_HEADER_LEN;

/// Traffic archetypes the engine can mimic or detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficClass {
    /// Interactive web browsing: mostly small request/response payloads
    WebBrowsing,
    /// Video streaming: sustained large segments with small control traffic
    VideoStreaming,
    /// Bulk file transfer: heavy-tailed large payloads
    FileDownload,
}

impl TrafficClass {
    /// Every class the engine knows about, in canonical order.
    pub const ALL: [TrafficClass; 3] = [
        TrafficClass::WebBrowsing,
        TrafficClass::VideoStreaming,
        TrafficClass::FileDownload,
    ];

    /// Position of this class in [`TrafficClass::ALL`].
    pub fn index(self) -> usize {
        match self {
            TrafficClass::WebBrowsing => 0,
            TrafficClass::VideoStreaming => 1,
            TrafficClass::FileDownload => 2,
        }
    }
}

/// One entry of a profile's traffic mix.
#[derive(Debug, Clone)]
struct ClassMix {
    class: TrafficClass,
    weight: f64,
    distribution: PayloadDistribution,
}

/// Shape parameters of one traffic archetype.
///
/// Exactly one profile is active per engine at a time; switching replaces
/// the copies held by the framer and scheduler under the manager's lock.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Smallest cell the profile will emit, bytes
    pub min_cell_size: usize,
    /// Largest cell the profile will emit, bytes (exclusive sampling bound)
    pub max_cell_size: usize,
    /// Cadence of cover-traffic probes
    pub probing_interval: Duration,
    /// Upper bound of the per-cell send jitter
    pub latency_jitter: Duration,
    /// EWMA smoothing factor for the load estimate
    pub smoothing: f64,
    /// Ordered traffic mix; the iteration order fixes the sampling CDF
    mix: Vec<ClassMix>,
    /// Smoothed load estimate in [0, 1]
    load: f64,
}

fn web_distribution() -> PayloadDistribution {
    PayloadDistribution::Bimodal {
        small_mean: 100.0,
        small_std_dev: 20.0,
        small_weight: 0.8,
        large_mean: 1000.0,
        large_std_dev: 150.0,
    }
}

fn video_distribution() -> PayloadDistribution {
    PayloadDistribution::Bimodal {
        small_mean: 64.0,
        small_std_dev: 10.0,
        small_weight: 0.2,
        large_mean: 1300.0,
        large_std_dev: 50.0,
    }
}

fn file_distribution() -> PayloadDistribution {
    PayloadDistribution::HeavyTailed {
        scale: 500.0,
        shape: 1.5,
    }
}

impl Profile {
    /// Interactive web browsing traffic.
    pub fn web_browsing() -> Self {
        Self {
            min_cell_size: 64,
            max_cell_size: 1400,
            probing_interval: Duration::from_secs(15),
            latency_jitter: Duration::from_millis(20),
            smoothing: 0.1,
            mix: vec![ClassMix {
                class: TrafficClass::WebBrowsing,
                weight: 1.0,
                distribution: web_distribution(),
            }],
            load: 0.0,
        }
    }

    /// Video streaming traffic.
    pub fn video_streaming() -> Self {
        Self {
            min_cell_size: 64,
            max_cell_size: 1400,
            probing_interval: Duration::from_secs(10),
            latency_jitter: Duration::from_millis(10),
            smoothing: 0.2,
            mix: vec![ClassMix {
                class: TrafficClass::VideoStreaming,
                weight: 1.0,
                distribution: video_distribution(),
            }],
            load: 0.0,
        }
    }

    /// Bulk file download traffic.
    pub fn file_download() -> Self {
        Self {
            min_cell_size: 64,
            max_cell_size: 1400,
            probing_interval: Duration::from_secs(30),
            latency_jitter: Duration::from_millis(50),
            smoothing: 0.05,
            mix: vec![ClassMix {
                class: TrafficClass::FileDownload,
                weight: 1.0,
                distribution: file_distribution(),
            }],
            load: 0.0,
        }
    }

    /// Blended meta-profile mixing all classes; the adaptive default.
    pub fn dynamic() -> Self {
        Self {
            min_cell_size: 64,
            max_cell_size: 1400,
            probing_interval: Duration::from_secs(15),
            latency_jitter: Duration::from_millis(20),
            smoothing: 0.1,
            mix: vec![
                ClassMix {
                    class: TrafficClass::WebBrowsing,
                    weight: 0.7,
                    distribution: web_distribution(),
                },
                ClassMix {
                    class: TrafficClass::VideoStreaming,
                    weight: 0.2,
                    distribution: video_distribution(),
                },
                ClassMix {
                    class: TrafficClass::FileDownload,
                    weight: 0.1,
                    distribution: file_distribution(),
                },
            ],
            load: 0.0,
        }
    }

    /// The single-class profile representing `class`.
    pub fn for_class(class: TrafficClass) -> Self {
        match class {
            TrafficClass::WebBrowsing => Self::web_browsing(),
            TrafficClass::VideoStreaming => Self::video_streaming(),
            TrafficClass::FileDownload => Self::file_download(),
        }
    }

    /// Draw a traffic class from the profile's weighted mix.
    ///
    /// Inverse-CDF sampling over the mix in its fixed order; cumulative
    /// floating-point slack falls back to the head class.
    pub fn sample_traffic_class(&self) -> TrafficClass {
        if self.mix.len() == 1 {
            return self.mix[0].class;
        }

        let draw = rand::thread_rng().gen::<f64>();
        let mut cumulative = 0.0;
        for entry in &self.mix {
            cumulative += entry.weight;
            if draw <= cumulative {
                return entry.class;
            }
        }

        self.mix
            .first()
            .map(|entry| entry.class)
            .unwrap_or(TrafficClass::WebBrowsing)
    }

    /// Draw the next payload length and fold it into the load estimate.
    ///
    /// The result is clamped to `[1, max_cell_size - CELL_HEADER_LEN]`;
    /// sampling never fails.
    pub fn next_payload_length(&mut self) -> usize {
        let class = self.sample_traffic_class();
        let mut rng = rand::thread_rng();
        let sampled = self
            .mix
            .iter()
            .find(|entry| entry.class == class)
            .map(|entry| entry.distribution.sample(&mut rng))
            .unwrap_or(1);

        let cap = self.max_cell_size.saturating_sub(CELL_HEADER_LEN).max(1);
        let length = sampled.clamp(1, cap);
        self.update_load(length);
        length
    }

    /// Draw the next total cell size, uniform in `[min_cell_size, max_cell_size)`.
    pub fn next_cell_size(&self) -> usize {
        if self.max_cell_size <= self.min_cell_size {
            return self.min_cell_size;
        }
        rand::thread_rng().gen_range(self.min_cell_size..self.max_cell_size)
    }

    /// The highest-weight class of the mix.
    ///
    /// Used for padding shaping and as the label under which observation
    /// history is attributed when switching away from this profile.
    pub fn primary_class(&self) -> TrafficClass {
        let mut entries = self.mix.iter();
        let mut best = match entries.next() {
            Some(entry) => entry,
            None => return TrafficClass::WebBrowsing,
        };
        for entry in entries {
            if entry.weight > best.weight {
                best = entry;
            }
        }
        best.class
    }

    /// Current smoothed load estimate in `[0, 1]`.
    pub fn load(&self) -> f64 {
        self.load
    }

    /// Exponentially weighted moving average over normalized payload sizes.
    fn update_load(&mut self, latest: usize) {
        let normalized = latest as f64 / self.max_cell_size as f64;
        self.load = self.load * (1.0 - self.smoothing) + normalized * self.smoothing;
    }
}
