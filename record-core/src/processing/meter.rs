use std::sync::atomic::{AtomicU32, Ordering};

use crate::models::device::Amplitude;

/// Meter floor, representing digital silence.
pub const DB_FLOOR: f32 = -160.0;

/// Real-time peak level meter shared between the capture thread and any
/// thread polling amplitudes.
///
/// Readings are decibels relative to full scale, stored as f32 bit
/// patterns in atomics. The max reading is monotonic between `reset`
/// calls.
pub struct LevelMeter {
    current_bits: AtomicU32,
    max_bits: AtomicU32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            current_bits: AtomicU32::new(DB_FLOOR.to_bits()),
            max_bits: AtomicU32::new(DB_FLOOR.to_bits()),
        }
    }

    /// Scan a batch for its peak absolute value and publish the reading.
    ///
    /// Empty batches are a no-op. Called from the capture thread;
    /// readers may poll concurrently.
    pub fn process_samples(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let mut peak = 0.0f32;
        for &sample in samples {
            let magnitude = sample.abs();
            if magnitude > peak {
                peak = magnitude;
            }
        }

        // Avoid log(0) for all-silent batches.
        let db = if peak > 0.0 { 20.0 * peak.log10() } else { DB_FLOOR };
        self.current_bits.store(db.to_bits(), Ordering::Relaxed);

        let mut observed = self.max_bits.load(Ordering::Relaxed);
        while db > f32::from_bits(observed) {
            match self.max_bits.compare_exchange_weak(
                observed,
                db.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => observed = actual,
            }
        }
    }

    pub fn current_db(&self) -> f32 {
        f32::from_bits(self.current_bits.load(Ordering::Relaxed))
    }

    pub fn max_db(&self) -> f32 {
        f32::from_bits(self.max_bits.load(Ordering::Relaxed))
    }

    pub fn amplitude(&self) -> Amplitude {
        Amplitude {
            current: self.current_db(),
            max: self.max_db(),
        }
    }

    /// Drop both readings back to the floor.
    pub fn reset(&self) {
        self.current_bits.store(DB_FLOOR.to_bits(), Ordering::Relaxed);
        self.max_bits.store(DB_FLOOR.to_bits(), Ordering::Relaxed);
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}
