//! Spot detection on simulated frames

pub mod local_maxima;

pub use local_maxima::{
    p10_index, PreFilter, SpotDetector, SpotDetectorConfig, SpotRegion, SpotStatistics,
};
