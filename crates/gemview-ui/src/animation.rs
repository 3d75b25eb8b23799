//! Animation primitives: easing functions and eased values.

/// Standard easing functions.
///
/// Input `t` is clamped to `[0.0, 1.0]`. Output is the eased value.
pub mod easing {
    /// Linear easing (no acceleration).
    pub fn linear(t: f32) -> f32 {
        t.clamp(0.0, 1.0)
    }

    /// Quadratic ease-in (slow start).
    pub fn ease_in_quad(t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        t * t
    }

    /// Quadratic ease-out (slow end).
    pub fn ease_out_quad(t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        t * (2.0 - t)
    }

    /// Cubic ease-out (slow end, sharper than quad).
    pub fn ease_out_cubic(t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let t1 = t - 1.0;
        t1 * t1 * t1 + 1.0
    }

    /// Cubic ease-in-out (smooth start and end).
    pub fn ease_in_out_cubic(t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        if t < 0.5 {
            4.0 * t * t * t
        } else {
            (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
        }
    }
}

/// An easing curve.
pub type EasingFn = fn(f32) -> f32;

/// An animated scalar.
///
/// Holds where the animation started, where it is heading, and when. The
/// current value is a pure function of the timestamp, so rendering code
/// only ever reads `value_at(now)` and never mutates the animation.
#[derive(Debug, Clone, Copy)]
pub struct Anim {
    from: f32,
    to: f32,
    start_ms: u64,
    due_ms: u64,
    easing: EasingFn,
}

impl Default for Anim {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Anim {
    /// A finished animation resting at `value`.
    pub fn new(value: f32) -> Self {
        Self {
            from: value,
            to: value,
            start_ms: 0,
            due_ms: 0,
            easing: easing::linear,
        }
    }

    /// Jump to `value` immediately, cancelling any running transition.
    pub fn init(&mut self, value: f32) {
        *self = Self::new(value);
    }

    /// Start a linear transition from the current value to `value`.
    pub fn set_value(&mut self, value: f32, now: u64, duration_ms: u32) {
        self.set_value_with(value, now, duration_ms, easing::linear);
    }

    /// Start an eased transition (slow start and end).
    pub fn set_value_eased(&mut self, value: f32, now: u64, duration_ms: u32) {
        self.set_value_with(value, now, duration_ms, easing::ease_in_out_cubic);
    }

    /// Start a transition with an explicit easing curve. A zero duration
    /// jumps straight to the target.
    pub fn set_value_with(&mut self, value: f32, now: u64, duration_ms: u32, easing: EasingFn) {
        if duration_ms == 0 {
            self.init(value);
            return;
        }
        self.from = self.value_at(now);
        self.to = value;
        self.start_ms = now;
        self.due_ms = now + u64::from(duration_ms);
        self.easing = easing;
    }

    /// Freeze the animation at its current value.
    pub fn stop(&mut self, now: u64) {
        let v = self.value_at(now);
        self.init(v);
    }

    /// Progress through the transition in `[0, 1]`.
    pub fn pos(&self, now: u64) -> f32 {
        if now >= self.due_ms || self.due_ms <= self.start_ms {
            return 1.0;
        }
        if now <= self.start_ms {
            return 0.0;
        }
        (now - self.start_ms) as f32 / (self.due_ms - self.start_ms) as f32
    }

    pub fn value_at(&self, now: u64) -> f32 {
        let t = (self.easing)(self.pos(now));
        self.from + (self.to - self.from) * t
    }

    /// Where the animation ends up.
    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn is_finished(&self, now: u64) -> bool {
        now >= self.due_ms
    }
}
