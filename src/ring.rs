//! Lock-free single-producer/single-consumer frame ring.
//!
//! This is the realtime/worker handoff point for both the egress and the
//! ingress audio path. One side is always the host's realtime IO thread; the
//! other is always a transport worker. Neither side may block the other:
//! writes are capped to free space, reads are capped to available data, and
//! both overflow and underflow are silent — the caller sees a short count,
//! never an error.
//!
//! Ordering follows the canonical Lamport/Vyukov SPSC discipline: each side
//! reads the *other* index with `Acquire`, its own with `Relaxed`, and
//! publishes its own index with `Release` only after the data copy has
//! completed. `head`/`tail` are wrapped in `CachePadded` so the producer and
//! consumer don't thrash a shared cache line on every cycle.

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed-capacity circular buffer of interleaved audio frames.
///
/// `capacity_frames` frames of `channels` `f32` samples each are preallocated
/// at construction and never resized. `head` and `tail` are frame indices
/// that increase monotonically without wrapping; the physical slot for frame
/// index `i` is `(i % capacity_frames)`.
pub struct FrameRing {
    channels: usize,
    capacity_frames: u64,
    storage: UnsafeCell<Vec<f32>>,
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
}

// SAFETY: `storage` is only ever touched by the producer (via `write`) in the
// range it owns (`[head, head+written)` mod capacity, before publishing
// `head`) and by the consumer (via `read`) in the range it owns (`[tail,
// tail+got)` mod capacity, before publishing `tail`). Those ranges never
// overlap because `head` and `tail` are only advanced after their respective
// copy completes, so the two sides never alias the same slot concurrently.
unsafe impl Sync for FrameRing {}

impl FrameRing {
    /// Create a new ring with room for `capacity_frames` frames of
    /// `channels` interleaved samples each. The backing storage is zeroed.
    pub fn new(capacity_frames: usize, channels: usize) -> Self {
        assert!(capacity_frames > 0, "ring capacity must be non-zero");
        assert!(channels > 0, "channel count must be non-zero");
        Self {
            channels,
            capacity_frames: capacity_frames as u64,
            storage: UnsafeCell::new(vec![0.0f32; capacity_frames * channels]),
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
        }
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames as usize
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames currently queued for the consumer. Wait-free; safe to call
    /// from either side, though only the consumer's own view is exact at the
    /// instant of the call for the other side.
    pub fn available(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        (head - tail) as usize
    }

    /// Free frame slots left for the producer.
    pub fn free(&self) -> usize {
        self.capacity_frames as usize - self.available()
    }

    /// Copy up to `src.len() / channels` frames from `src` into the ring.
    /// Returns the number of frames actually written, capped by free space.
    /// `src` must hold complete interleaved frames (`src.len()` a multiple
    /// of `channels`); any trailing partial frame is ignored. Producer-only:
    /// calling this from two threads concurrently is undefined.
    pub fn write(&self, src: &[f32]) -> usize {
        let k = src.len() / self.channels;
        if k == 0 {
            return 0;
        }

        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Relaxed);
        let free = (self.capacity_frames - (head - tail)) as usize;
        let written = k.min(free);
        if written == 0 {
            return 0;
        }

        let cap = self.capacity_frames as usize;
        let start = (head % self.capacity_frames) as usize;
        let first = written.min(cap - start);
        let second = written - first;
        let ch = self.channels;

        // SAFETY: only the producer writes, and only into the region
        // [head, head+written) mod capacity, which the consumer cannot have
        // claimed yet because `head` has not been published past it. We go
        // through the Vec's data pointer rather than a `&mut Vec<f32>`/`&Vec<f32>`
        // so this store never asserts exclusivity over the whole backing Vec
        // while the consumer may hold a concurrent `&Vec<f32>` of its own.
        unsafe {
            let base = (*self.storage.get()).as_mut_ptr();
            let dst = std::slice::from_raw_parts_mut(base.add(start * ch), first * ch);
            dst.copy_from_slice(&src[..first * ch]);
            if second > 0 {
                let dst = std::slice::from_raw_parts_mut(base, second * ch);
                dst.copy_from_slice(&src[first * ch..(first + second) * ch]);
            }
        }

        self.head.store(head + written as u64, Ordering::Release);
        written
    }

    /// Copy up to `dst.len() / channels` frames out of the ring into `dst`.
    /// Returns the number of frames actually read, capped by availability.
    /// Consumer-only, symmetric to `write`.
    pub fn read(&self, dst: &mut [f32]) -> usize {
        let k = dst.len() / self.channels;
        if k == 0 {
            return 0;
        }

        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        let available = (head - tail) as usize;
        let got = k.min(available);
        if got == 0 {
            return 0;
        }

        let cap = self.capacity_frames as usize;
        let start = (tail % self.capacity_frames) as usize;
        let first = got.min(cap - start);
        let second = got - first;
        let ch = self.channels;

        // SAFETY: only the consumer reads, and only from [tail, tail+got)
        // mod capacity, which the producer has already published via `head`.
        // Goes through the Vec's data pointer rather than a `&Vec<f32>` so
        // this load never asserts shared access to the whole backing Vec
        // while the producer may hold a concurrent `&mut Vec<f32>` of its own.
        unsafe {
            let base = (*self.storage.get()).as_ptr();
            let src_slice = std::slice::from_raw_parts(base.add(start * ch), first * ch);
            dst[..first * ch].copy_from_slice(src_slice);
            if second > 0 {
                let src_slice = std::slice::from_raw_parts(base, second * ch);
                dst[first * ch..(first + second) * ch].copy_from_slice(src_slice);
            }
        }

        self.tail.store(tail + got as u64, Ordering::Release);
        got
    }

    /// Like `read`, but zero-fills any frames beyond what was available
    /// instead of leaving `dst` short. Returns the number of frames that
    /// came from the ring (the rest is the silent padding for underrun,
    /// §4.3's defined underrun behavior).
    pub fn read_or_silence(&self, dst: &mut [f32]) -> usize {
        let got = self.read(dst);
        let ch = self.channels;
        if got * ch < dst.len() {
            dst[got * ch..].fill(0.0);
        }
        got
    }

    #[cfg(test)]
    fn head_tail(&self) -> (u64, u64) {
        (
            self.head.load(Ordering::SeqCst),
            self.tail.load(Ordering::SeqCst),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrips_in_order() {
        let ring = FrameRing::new(16, 2);
        let src: Vec<f32> = (0..8).map(|i| i as f32).collect(); // 4 stereo frames
        assert_eq!(ring.write(&src), 4);
        assert_eq!(ring.available(), 4);

        let mut dst = vec![0.0f32; 8];
        assert_eq!(ring.read(&mut dst), 4);
        assert_eq!(dst, src);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn zero_length_calls_return_zero() {
        let ring = FrameRing::new(8, 2);
        assert_eq!(ring.write(&[]), 0);
        assert_eq!(ring.read(&mut []), 0);
    }

    #[test]
    fn overflow_drops_excess_and_returns_short_count() {
        let ring = FrameRing::new(8, 1);
        let src = vec![1.0f32; 9]; // 9 mono frames into an 8-frame ring
        assert_eq!(ring.write(&src), 8);
        let (head, tail) = ring.head_tail();
        assert_eq!(head - tail, 8);

        // a subsequent push has no room left
        assert_eq!(ring.write(&[1.0]), 0);
    }

    #[test]
    fn underflow_returns_short_count_and_caller_pads() {
        let ring = FrameRing::new(8, 2);
        let mut dst = vec![9.0f32; 8]; // 4 stereo frames requested, ring empty
        let got = ring.read_or_silence(&mut dst);
        assert_eq!(got, 0);
        assert!(dst.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn partial_underflow_zero_fills_the_remainder() {
        let ring = FrameRing::new(8, 1);
        assert_eq!(ring.write(&[1.0, 2.0, 3.0]), 3);

        let mut dst = vec![-1.0f32; 5];
        let got = ring.read_or_silence(&mut dst);
        assert_eq!(got, 3);
        assert_eq!(dst, vec![1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn wraparound_splits_into_two_copies() {
        let ring = FrameRing::new(4, 1);
        assert_eq!(ring.write(&[1.0, 2.0, 3.0]), 3);
        let mut dst = vec![0.0f32; 2];
        assert_eq!(ring.read(&mut dst), 2); // tail now at 2, head at 3

        // head=3, tail=2: writing 3 more frames should wrap around the end
        assert_eq!(ring.write(&[4.0, 5.0, 6.0]), 3); // head -> 6, capacity allows (6-2)=4 <= cap? free = 4-(3-2)=3
        let mut rest = vec![0.0f32; 4];
        assert_eq!(ring.read(&mut rest), 4);
        assert_eq!(rest, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn trailing_partial_frame_is_ignored() {
        let ring = FrameRing::new(8, 2);
        // 5 floats = 2 complete stereo frames + one dangling sample
        assert_eq!(ring.write(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2);
        assert_eq!(ring.available(), 2);
    }

    #[test]
    fn invariant_tail_le_head_le_tail_plus_capacity_holds_under_churn() {
        let ring = FrameRing::new(8, 1);
        let mut produced = 0u64;
        let mut consumed = 0u64;
        for round in 0..50 {
            let batch: Vec<f32> = (0..5).map(|i| (round * 5 + i) as f32).collect();
            produced += ring.write(&batch) as u64;
            let (head, tail) = ring.head_tail();
            assert!(tail <= head && head <= tail + 8);

            let mut out = vec![0.0f32; 3];
            consumed += ring.read(&mut out) as u64;
            let (head, tail) = ring.head_tail();
            assert!(tail <= head && head <= tail + 8);
        }
        assert!(consumed <= produced);
    }
}
