//! Fixed-timestep accumulator
//!
//! Decouples variable frame time from the simulation step: frame deltas are
//! banked, and whole steps are withdrawn while enough time is available.
//! Leftover time carries over to the next frame.

/// Accumulator clock for the fixed-step driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTimestep {
    step: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(step: f32) -> Self {
        Self { step, accumulator: 0.0 }
    }

    /// Seconds simulated by one substep.
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Banked time not yet simulated.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Change the step length. Banked time is kept.
    pub fn set_step(&mut self, step: f32) {
        self.step = step;
    }

    /// Bank a frame delta. Returns false (and banks nothing) for negative or
    /// non-finite input.
    pub fn accumulate(&mut self, delta: f32) -> bool {
        if !delta.is_finite() || delta < 0.0 {
            return false;
        }
        self.accumulator += delta;
        true
    }

    /// Withdraw one step if enough time is banked.
    pub fn consume(&mut self) -> bool {
        if self.step > 0.0 && self.accumulator >= self.step {
            self.accumulator -= self.step;
            true
        } else {
            false
        }
    }

    /// Drop all banked time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(clock: &mut FixedTimestep, delta: f32) -> usize {
        clock.accumulate(delta);
        let mut steps = 0;
        while clock.consume() {
            steps += 1;
        }
        steps
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut clock = FixedTimestep::new(0.25);
        assert_eq!(run(&mut clock, 0.125), 0);
        assert_eq!(clock.accumulator(), 0.125);
        assert_eq!(run(&mut clock, 0.125), 1);
        assert_eq!(clock.accumulator(), 0.0);
        assert_eq!(run(&mut clock, 0.625), 2);
        assert_eq!(clock.accumulator(), 0.125);
    }

    #[test]
    fn test_total_steps_match_total_time() {
        let mut clock = FixedTimestep::new(0.0625);
        let deltas = [0.03125, 0.25, 0.015625, 0.5, 0.0, 0.109375];
        let total: f32 = deltas.iter().sum();
        let steps: usize = deltas.iter().map(|&d| run(&mut clock, d)).sum();
        assert_eq!(steps, (total / 0.0625).floor() as usize);
    }

    #[test]
    fn test_rejects_bad_deltas() {
        let mut clock = FixedTimestep::new(0.5);
        assert!(!clock.accumulate(-1.0));
        assert!(!clock.accumulate(f32::NAN));
        assert!(!clock.accumulate(f32::INFINITY));
        assert_eq!(clock.accumulator(), 0.0);
    }

    #[test]
    fn test_zero_step_never_consumes() {
        let mut clock = FixedTimestep::new(0.0);
        clock.accumulate(10.0);
        assert!(!clock.consume());
    }
}
