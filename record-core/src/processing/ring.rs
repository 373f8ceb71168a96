use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Single-producer/single-consumer lock-free ring buffer of audio samples.
///
/// The allocation is rounded up to a power of two so index arithmetic is
/// a mask. Indices are free-running counters; the difference between
/// them is the number of unread samples.
///
/// Contract: exactly one thread calls `write`, exactly one (possibly
/// different) thread calls `read`. Concurrent calls of the *same*
/// operation are not allowed.
///
/// Backpressure policy: on overflow `write` returns false and the batch
/// is dropped. The engine favors low latency and continuity over
/// completeness, so a slow consumer loses samples instead of stalling
/// the producer.
pub struct RingTransport {
    buffer: Box<[UnsafeCell<f32>]>,
    mask: usize,
    write_index: AtomicUsize,
    read_index: AtomicUsize,
}

// SAFETY: the SPSC contract above guarantees each slot is written by at
// most one thread while the other only reads slots already published
// through the release store of `write_index` (paired with an acquire
// load on the reader side).
unsafe impl Send for RingTransport {}
unsafe impl Sync for RingTransport {}

impl RingTransport {
    /// Create a transport holding at least `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let size = capacity.max(1).next_power_of_two();
        let buffer = (0..size).map(|_| UnsafeCell::new(0.0f32)).collect();
        Self {
            buffer,
            mask: size - 1,
            write_index: AtomicUsize::new(0),
            read_index: AtomicUsize::new(0),
        }
    }

    /// Usable capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Copy `data` into the buffer. Fails if the batch exceeds the total
    /// capacity or the currently free space; never blocks.
    ///
    /// Producer thread only.
    pub fn write(&self, data: &[f32]) -> bool {
        if data.len() > self.capacity() {
            return false;
        }

        let write = self.write_index.load(Ordering::Relaxed);
        let read = self.read_index.load(Ordering::Acquire);
        let free = self.capacity() - write.wrapping_sub(read);
        if data.len() > free {
            return false;
        }

        for (i, &sample) in data.iter().enumerate() {
            // SAFETY: slots in [write, write + len) are unpublished, so the
            // consumer never touches them until the release store below.
            unsafe {
                *self.buffer[write.wrapping_add(i) & self.mask].get() = sample;
            }
        }

        self.write_index.store(write.wrapping_add(data.len()), Ordering::Release);
        true
    }

    /// Copy up to `out.len()` available samples into `out`, returning the
    /// number actually read (0 if empty); never blocks.
    ///
    /// Consumer thread only.
    pub fn read(&self, out: &mut [f32]) -> usize {
        let read = self.read_index.load(Ordering::Relaxed);
        let write = self.write_index.load(Ordering::Acquire);
        let available = write.wrapping_sub(read);
        let to_read = out.len().min(available);

        for (i, slot) in out.iter_mut().take(to_read).enumerate() {
            // SAFETY: slots in [read, read + to_read) were published by the
            // acquire load above and are not rewritten until consumed.
            unsafe {
                *slot = *self.buffer[read.wrapping_add(i) & self.mask].get();
            }
        }

        self.read_index.store(read.wrapping_add(to_read), Ordering::Release);
        to_read
    }

    /// Number of samples currently buffered.
    pub fn available(&self) -> usize {
        let read = self.read_index.load(Ordering::Acquire);
        let write = self.write_index.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Discard all buffered samples. Consumer thread only.
    pub fn clear(&self) {
        let write = self.write_index.load(Ordering::Acquire);
        self.read_index.store(write, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn write_then_read_preserves_order() {
        let ring = RingTransport::new(16);
        let data: Vec<f32> = (0..10).map(|i| i as f32).collect();
        assert!(ring.write(&data));

        let mut out = vec![0.0; 10];
        assert_eq!(ring.read(&mut out), 10);
        assert_eq!(out, data);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn full_capacity_round_trip() {
        let ring = RingTransport::new(8);
        let data: Vec<f32> = (0..ring.capacity()).map(|i| i as f32 * 0.5).collect();
        assert!(ring.write(&data));
        assert_eq!(ring.available(), ring.capacity());

        let mut out = vec![0.0; ring.capacity()];
        assert_eq!(ring.read(&mut out), ring.capacity());
        assert_eq!(out, data);
    }

    #[test]
    fn capacity_rounds_up_to_power_of_two() {
        let ring = RingTransport::new(5);
        assert_eq!(ring.capacity(), 8);
        let ring = RingTransport::new(8);
        assert_eq!(ring.capacity(), 8);
    }

    #[test]
    fn overflow_is_rejected_not_partial() {
        let ring = RingTransport::new(4);
        assert!(ring.write(&[1.0, 2.0, 3.0]));
        // Only one slot free: a two-sample batch is dropped whole.
        assert!(!ring.write(&[4.0, 5.0]));
        assert_eq!(ring.available(), 3);
        // The drop did not corrupt buffered data.
        let mut out = vec![0.0; 3];
        ring.read(&mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn oversized_batch_always_fails() {
        let ring = RingTransport::new(4);
        let batch = vec![0.0; ring.capacity() + 1];
        assert!(!ring.write(&batch));
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn read_from_empty_returns_zero() {
        let ring = RingTransport::new(4);
        let mut out = vec![0.0; 4];
        assert_eq!(ring.read(&mut out), 0);
    }

    #[test]
    fn wraparound_keeps_order() {
        let ring = RingTransport::new(4);
        let mut out = vec![0.0; 4];

        assert!(ring.write(&[1.0, 2.0, 3.0]));
        assert_eq!(ring.read(&mut out[..2]), 2);

        // Crosses the physical end of the allocation.
        assert!(ring.write(&[4.0, 5.0, 6.0]));
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn clear_discards_buffered_samples() {
        let ring = RingTransport::new(8);
        ring.write(&[1.0, 2.0, 3.0]);
        ring.clear();
        assert_eq!(ring.available(), 0);
        let mut out = vec![0.0; 8];
        assert_eq!(ring.read(&mut out), 0);
    }

    #[test]
    fn available_never_exceeds_capacity() {
        let ring = RingTransport::new(8);
        for _ in 0..10 {
            ring.write(&[0.5; 3]);
            assert!(ring.available() <= ring.capacity());
        }
    }

    #[test]
    fn spsc_streaming_across_threads() {
        let ring = Arc::new(RingTransport::new(1024));
        let total = 100_000usize;

        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let mut sent = 0usize;
                while sent < total {
                    let n = (total - sent).min(128);
                    let chunk: Vec<f32> = (sent..sent + n).map(|i| i as f32).collect();
                    if ring.write(&chunk) {
                        sent += n;
                    } else {
                        thread::yield_now();
                    }
                }
            })
        };

        let mut received = 0usize;
        let mut buf = vec![0.0f32; 256];
        while received < total {
            let n = ring.read(&mut buf);
            for &sample in &buf[..n] {
                assert_eq!(sample, received as f32);
                received += 1;
            }
            if n == 0 {
                thread::yield_now();
            }
        }

        producer.join().unwrap();
        assert_eq!(ring.available(), 0);
    }
}
