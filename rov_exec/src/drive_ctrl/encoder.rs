//! # Quadrature encoder
//!
//! Decodes the two channels of an incremental encoder at 4x resolution. The edge handler is the
//! only writer of the position count and does a fixed amount of lock-free work, so it can be
//! driven from an interrupt or a GPIO event thread. All other access is through atomic loads.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Direction of each transition, indexed by `(prev_state << 2) | curr_state` where a state is
/// `(A << 1) | B`.
///
/// Transitions which skip a state cannot be resolved and count as no movement.
const TRANSITION_TABLE: [i8; 16] = [
    0, -1, 1, 0, //
    1, 0, 0, -1, //
    -1, 0, 0, 1, //
    0, 1, -1, 0, //
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A quadrature encoder count.
#[derive(Debug)]
pub struct QuadEncoder {
    position: AtomicI32,
    last_state: AtomicU8,
    last_sampled: AtomicI32,
    reversed: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl QuadEncoder {
    /// Create a new encoder given the current level of each channel.
    pub fn new(a: bool, b: bool, reversed: bool) -> Self {
        Self {
            position: AtomicI32::new(0),
            last_state: AtomicU8::new(state_of(a, b)),
            last_sampled: AtomicI32::new(0),
            reversed,
        }
    }

    /// Handle a transition on either channel.
    ///
    /// `a` and `b` are the levels of the channels after the edge.
    #[inline]
    pub fn on_edge(&self, a: bool, b: bool) {
        let curr = state_of(a, b);
        let prev = self.last_state.swap(curr, Ordering::AcqRel);

        let mut dir = TRANSITION_TABLE[((prev << 2) | curr) as usize] as i32;
        if self.reversed {
            dir = -dir;
        }

        if dir != 0 {
            // Atomic adds wrap on overflow
            self.position.fetch_add(dir, Ordering::AcqRel);
        }
    }

    /// Net count since creation or the last reset.
    pub fn get_position(&self) -> i32 {
        self.position.load(Ordering::Acquire)
    }

    /// Count since the previous call, moving the sampling baseline to the current position.
    ///
    /// Only the owner of the velocity loop may call this, as every call consumes the delta.
    pub fn get_position_delta(&self) -> i32 {
        let pos = self.position.load(Ordering::Acquire);
        let prev = self.last_sampled.swap(pos, Ordering::AcqRel);
        pos.wrapping_sub(prev)
    }

    /// Zero the position and the sampling baseline. Calibration only.
    pub fn reset(&self) {
        self.position.store(0, Ordering::Release);
        self.last_sampled.store(0, Ordering::Release);
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

#[inline]
fn state_of(a: bool, b: bool) -> u8 {
    ((a as u8) << 1) | (b as u8)
}

#[cfg(test)]
mod test {
    use super::*;

    /// Channel levels in forward order.
    const FORWARD: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];

    fn step_forward(enc: &QuadEncoder, n: usize, phase: &mut usize) {
        for _ in 0..n {
            *phase = (*phase + 1) % 4;
            let (a, b) = FORWARD[*phase];
            enc.on_edge(a, b);
        }
    }

    fn step_backward(enc: &QuadEncoder, n: usize, phase: &mut usize) {
        for _ in 0..n {
            *phase = (*phase + 3) % 4;
            let (a, b) = FORWARD[*phase];
            enc.on_edge(a, b);
        }
    }

    #[test]
    fn test_net_count() {
        // Start at 00, the last entry of the forward sequence
        let enc = QuadEncoder::new(false, false, false);
        let mut phase = 3;

        step_forward(&enc, 10, &mut phase);
        assert_eq!(enc.get_position(), 10);

        step_backward(&enc, 4, &mut phase);
        assert_eq!(enc.get_position(), 6);

        step_backward(&enc, 20, &mut phase);
        assert_eq!(enc.get_position(), -14);
    }

    #[test]
    fn test_invalid_transitions_ignored() {
        let enc = QuadEncoder::new(false, false, false);

        // 00 -> 11 skips a state
        enc.on_edge(true, true);
        assert_eq!(enc.get_position(), 0);

        // 11 -> 11 is no change
        enc.on_edge(true, true);
        assert_eq!(enc.get_position(), 0);

        // 11 -> 01 is a valid forward step from the new state
        enc.on_edge(false, true);
        assert_eq!(enc.get_position(), 1);
    }

    #[test]
    fn test_reversed() {
        let enc = QuadEncoder::new(false, false, true);
        let mut phase = 3;
        step_forward(&enc, 8, &mut phase);
        assert_eq!(enc.get_position(), -8);
        assert!(enc.is_reversed());
    }

    #[test]
    fn test_delta() {
        let enc = QuadEncoder::new(false, false, false);
        let mut phase = 3;

        step_forward(&enc, 5, &mut phase);
        assert_eq!(enc.get_position_delta(), 5);
        assert_eq!(enc.get_position_delta(), 0);

        step_backward(&enc, 7, &mut phase);
        assert_eq!(enc.get_position_delta(), -7);
        assert_eq!(enc.get_position(), -2);
    }

    #[test]
    fn test_delta_across_wrap() {
        let enc = QuadEncoder::new(false, false, false);
        enc.position.store(i32::MAX - 1, Ordering::Release);
        enc.last_sampled.store(i32::MAX - 1, Ordering::Release);

        let mut phase = 3;
        step_forward(&enc, 3, &mut phase);
        assert_eq!(enc.get_position(), i32::MIN + 1);
        assert_eq!(enc.get_position_delta(), 3);
    }

    #[test]
    fn test_reset() {
        let enc = QuadEncoder::new(false, false, false);
        let mut phase = 3;
        step_forward(&enc, 5, &mut phase);
        enc.reset();
        assert_eq!(enc.get_position(), 0);
        assert_eq!(enc.get_position_delta(), 0);
    }
}
