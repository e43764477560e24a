//! Scheduled parameter ramps.

/*
Parameter Automation
====================

Every mutation that touches signal-path gain, frequency, detune, or a filter
coefficient goes through this primitive instead of an instantaneous write.
A direct write moves the waveform in one sample and is audible as a click;
a short linear ramp is not.

Vocabulary
----------

  anchor      Capturing the parameter's CURRENT value at the ramp's start
              time. If a previous ramp is still in flight, the anchor samples
              it mid-slope rather than jumping to its target.

  ramp        A linear transition from the anchored value to the target over
              a fixed duration.

  resolve     Evaluating the parameter at a given engine time. The render
              thread resolves per sample (or per block for filter
              coefficients); the control thread never resolves.

The Two Phases
--------------

    ramp_to(target, start, duration)
      phase 1:  start_value = value_at(start)     <- anchor, never skipped
      phase 2:  segment = start_value -> target over [start, start+duration]

Skipping phase 1 and writing `start_value = previous_target` discontinuously
truncates an in-flight ramp - the classic source of zipper noise when a user
drags a control quickly. The anchor makes back-to-back ramps chain smoothly:
each new ramp takes off from wherever the old one actually was.

Threading
---------

The struct is plain data owned by the render side. The control thread only
*requests* changes (through the command queue); the render thread calls
`ramp_to` with its own clock. `value_at` is pure, so resolving the same time
twice is deterministic.
*/

use crate::MIN_TIME;

/// Standard ramp length for UI-driven parameter changes.
pub const PARAM_RAMP_SECS: f64 = 0.05;
/// Shorter ramp for velocity, which tracks key presses and must feel tight.
pub const VELOCITY_RAMP_SECS: f64 = 0.01;

/// A parameter slot holding one scheduled linear segment.
#[derive(Debug, Clone, Copy)]
pub struct AutomatedParam {
    start_value: f32,
    target_value: f32,
    start_time: f64,
    end_time: f64,
}

impl AutomatedParam {
    pub fn new(value: f32) -> Self {
        Self {
            start_value: value,
            target_value: value,
            start_time: 0.0,
            end_time: 0.0,
        }
    }

    /// Resolve the parameter at engine time `time` (seconds).
    #[inline]
    pub fn value_at(&self, time: f64) -> f32 {
        if time <= self.start_time {
            return self.start_value;
        }
        if time >= self.end_time {
            return self.target_value;
        }
        let progress = (time - self.start_time) / (self.end_time - self.start_time);
        self.start_value + (self.target_value - self.start_value) * progress as f32
    }

    /// Anchor the current value at `start_time`, then ramp linearly to
    /// `target` over `duration` seconds.
    pub fn ramp_to(&mut self, target: f32, start_time: f64, duration: f64) {
        // Phase 1: anchor. Captures an in-flight ramp mid-slope.
        self.start_value = self.value_at(start_time);

        // Phase 2: schedule the segment.
        self.start_time = start_time;
        self.end_time = start_time + duration.max(MIN_TIME as f64);
        self.target_value = target;
    }

    /// Immediate write. Only for construction and reset paths that are not
    /// on a live signal path.
    pub fn set_now(&mut self, value: f32, time: f64) {
        self.start_value = value;
        self.target_value = value;
        self.start_time = time;
        self.end_time = time;
    }

    /// The value this parameter is heading toward (or resting at).
    pub fn target(&self) -> f32 {
        self.target_value
    }

    /// True while a ramp segment is still in progress at `time`.
    pub fn is_ramping(&self, time: f64) -> bool {
        time < self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_value_everywhere() {
        let p = AutomatedParam::new(0.7);
        assert_eq!(p.value_at(0.0), 0.7);
        assert_eq!(p.value_at(100.0), 0.7);
    }

    #[test]
    fn ramp_hits_endpoints() {
        let mut p = AutomatedParam::new(0.0);
        p.ramp_to(1.0, 1.0, 0.5);

        assert_eq!(p.value_at(0.5), 0.0, "before the ramp starts");
        assert_eq!(p.value_at(1.0), 0.0, "at the start time");
        assert!((p.value_at(1.25) - 0.5).abs() < 1e-6, "midpoint");
        assert_eq!(p.value_at(1.5), 1.0, "at the end time");
        assert_eq!(p.value_at(9.0), 1.0, "after the ramp");
    }

    #[test]
    fn anchor_captures_in_flight_ramp() {
        let mut p = AutomatedParam::new(0.0);
        p.ramp_to(1.0, 0.0, 1.0);

        // Halfway through the first ramp, redirect to 0.0.
        let mid = p.value_at(0.5);
        assert!((mid - 0.5).abs() < 1e-6);
        p.ramp_to(0.0, 0.5, 1.0);

        // The new segment must take off from the anchored mid value, not
        // from the old target.
        assert!((p.value_at(0.5) - mid).abs() < 1e-6);
        assert!(p.value_at(0.6) < mid);
        assert_eq!(p.value_at(1.5), 0.0);
    }

    #[test]
    fn chained_ramps_are_continuous() {
        let mut p = AutomatedParam::new(0.2);
        let mut t = 0.0;
        let mut last = p.value_at(t);

        // Spam re-targeting mid-ramp; the resolved value must never jump.
        for i in 0..100 {
            let target = if i % 2 == 0 { 1.0 } else { 0.0 };
            p.ramp_to(target, t, 0.05);
            for _ in 0..10 {
                t += 0.001;
                let v = p.value_at(t);
                assert!(
                    (v - last).abs() <= 0.025,
                    "discontinuity at t={t}: {last} -> {v}"
                );
                last = v;
            }
        }
        // Final resolved value settles on the last requested target.
        assert_eq!(p.target(), 0.0);
        assert_eq!(p.value_at(t + 1.0), 0.0);
    }

    #[test]
    fn set_now_is_immediate() {
        let mut p = AutomatedParam::new(0.0);
        p.ramp_to(1.0, 0.0, 1.0);
        p.set_now(0.3, 0.5);
        assert_eq!(p.value_at(0.5), 0.3);
        assert_eq!(p.value_at(2.0), 0.3);
        assert!(!p.is_ramping(0.5));
    }

    #[test]
    fn zero_duration_is_clamped_not_divided() {
        let mut p = AutomatedParam::new(0.0);
        p.ramp_to(1.0, 1.0, 0.0);
        // Degenerate duration still resolves without NaN.
        assert!(p.value_at(1.0 + MIN_TIME as f64).is_finite());
        assert_eq!(p.value_at(2.0), 1.0);
    }
}
