//! Atomic gain/mute state shared between the facade and the codec boundary.
//!
//! There is no native atomic `f32`, so the gain is stored as the bit pattern
//! of an `f32` inside an `AtomicU32` (`f32::to_bits` / `f32::from_bits`).
//! Both load and store use relaxed ordering: volume is read on the codec's
//! per-frame boundary, not mid-frame, so no synchronization with other state
//! is required (§5 of the concurrency model).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Lower bound of the decibel range. Anything quieter collapses to this
/// floor rather than going to negative infinity at zero gain.
pub const MIN_DB: f32 = -96.0;

/// Convert a linear scalar in `[0.0, 1.0]` to decibels, clamped to `MIN_DB`.
pub fn scalar_to_db(scalar: f32) -> f32 {
    if scalar <= 0.0 {
        MIN_DB
    } else {
        (20.0 * scalar.log10()).max(MIN_DB)
    }
}

/// Convert a decibel value to a linear scalar. Values at or below `MIN_DB`
/// map to exactly zero.
pub fn db_to_scalar(db: f32) -> f32 {
    if db <= MIN_DB {
        0.0
    } else {
        10f32.powf(db / 20.0)
    }
}

/// Atomic gain and mute state for one device.
pub struct VolumeControl {
    gain_bits: AtomicU32,
    muted: AtomicBool,
}

impl VolumeControl {
    pub fn new(initial_scalar: f32) -> Self {
        Self {
            gain_bits: AtomicU32::new(initial_scalar.clamp(0.0, 1.0).to_bits()),
            muted: AtomicBool::new(false),
        }
    }

    pub fn get_scalar(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::Relaxed))
    }

    pub fn set_scalar(&self, scalar: f32) {
        let clamped = scalar.clamp(0.0, 1.0);
        self.gain_bits.store(clamped.to_bits(), Ordering::Relaxed);
    }

    pub fn get_db(&self) -> f32 {
        scalar_to_db(self.get_scalar())
    }

    pub fn set_db(&self, db: f32) {
        self.set_scalar(db_to_scalar(db.clamp(MIN_DB, 0.0)));
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// The gain to apply right now: zero when muted, the stored scalar
    /// otherwise. This is the single value the codec boundary snapshots
    /// once per codec frame.
    pub fn effective_gain(&self) -> f32 {
        if self.is_muted() {
            0.0
        } else {
            self.get_scalar()
        }
    }
}

impl Default for VolumeControl {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_clamp_above_one() {
        let v = VolumeControl::default();
        v.set_scalar(1.5);
        assert_eq!(v.get_scalar(), 1.0);
    }

    #[test]
    fn db_clamp_floors_at_min_db() {
        let v = VolumeControl::default();
        v.set_db(-200.0);
        assert_eq!(v.get_scalar(), 0.0);
    }

    #[test]
    fn mute_forces_effective_gain_to_zero_without_touching_stored_scalar() {
        let v = VolumeControl::new(0.8);
        v.set_muted(true);
        assert_eq!(v.effective_gain(), 0.0);
        assert_eq!(v.get_scalar(), 0.8);
        v.set_muted(false);
        assert_eq!(v.effective_gain(), 0.8);
    }

    #[test]
    fn db_scalar_round_trip_within_tolerance() {
        let samples = [-96.0, -40.0, -20.0, -6.0, -0.5, 0.0];
        for &db in &samples {
            let scalar = db_to_scalar(db);
            let back = scalar_to_db(scalar);
            assert!(
                (back - db).abs() < 1e-3,
                "round trip for {db} dB gave {back} dB"
            );
        }
    }

    #[test]
    fn zero_scalar_maps_to_min_db() {
        assert_eq!(scalar_to_db(0.0), MIN_DB);
    }
}
