use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Participant stepped by a [`Timeline`] at a fixed rate.
pub trait Advance {
    /// Advances by one (scaled) fixed step.
    fn advance(&mut self, dt: Duration);

    /// Paused participants are skipped by the timeline.
    fn is_paused(&self) -> bool {
        false
    }
}

/// Participant told how far the timeline is between two fixed steps.
pub trait Animate {
    /// `interpolation` is in `[0, 1)`: the fraction of a step left over.
    fn animate(&mut self, interpolation: f64);
}

pub type SharedAdvance = Arc<Mutex<dyn Advance + Send>>;
pub type SharedAnimate = Arc<Mutex<dyn Animate + Send>>;

/// Timeline configuration.
#[derive(Debug, Clone)]
pub struct TimelineSettings {
    /// Length of one fixed step in real time.
    pub time_step: Duration,
    /// Multiplier applied to the step handed to participants.
    pub timescale: f64,
    /// Frame deltas above this are clamped, so a stall does not trigger a
    /// burst of catch-up steps.
    pub max_frame_delta: Duration,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            time_step: Duration::from_secs_f64(1.0 / 60.0),
            timescale: 1.0,
            max_frame_delta: Duration::from_millis(250),
        }
    }
}

/// Fixed-step simulation clock.
///
/// Frame time accumulates; each whole step advances every tracked
/// participant once, then animatables receive the leftover fraction.
pub struct Timeline {
    settings: TimelineSettings,
    participants: Vec<SharedAdvance>,
    animatables: Vec<SharedAnimate>,
    accumulated: Duration,
    elapsed: Duration,
    steps: u64,
    paused: bool,
}

impl Timeline {
    pub fn new(settings: TimelineSettings) -> Self {
        Self {
            settings,
            participants: Vec::new(),
            animatables: Vec::new(),
            accumulated: Duration::ZERO,
            elapsed: Duration::ZERO,
            steps: 0,
            paused: false,
        }
    }

    #[inline]
    pub fn settings(&self) -> &TimelineSettings {
        &self.settings
    }

    pub fn set_timescale(&mut self, timescale: f64) {
        self.settings.timescale = timescale.max(0.0);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Scaled simulation time, in seconds.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Total fixed steps taken.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Fraction of a step currently accumulated.
    pub fn interpolation(&self) -> f64 {
        self.accumulated.as_secs_f64() / self.settings.time_step.as_secs_f64()
    }

    pub fn track(&mut self, participant: SharedAdvance) -> bool {
        if self.participants.iter().any(|p| Arc::ptr_eq(p, &participant)) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    pub fn untrack(&mut self, participant: &SharedAdvance) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| !Arc::ptr_eq(p, participant));
        before != self.participants.len()
    }

    pub fn track_animate(&mut self, animatable: SharedAnimate) -> bool {
        if self.animatables.iter().any(|a| Arc::ptr_eq(a, &animatable)) {
            return false;
        }
        self.animatables.push(animatable);
        true
    }

    pub fn untrack_animate(&mut self, animatable: &SharedAnimate) -> bool {
        let before = self.animatables.len();
        self.animatables.retain(|a| !Arc::ptr_eq(a, animatable));
        before != self.animatables.len()
    }

    #[inline]
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Feeds one frame's real time. Returns the number of fixed steps taken.
    pub fn advance(&mut self, frame_delta: Duration) -> u32 {
        if self.paused {
            return 0;
        }

        let step = self.settings.time_step;
        if step.is_zero() {
            log::warn!("timeline time step is zero; not advancing");
            return 0;
        }

        self.accumulated += frame_delta.min(self.settings.max_frame_delta);

        let scaled = step.mul_f64(self.settings.timescale);
        let mut taken = 0u32;
        while self.accumulated >= step {
            for participant in &self.participants {
                let mut participant = participant.lock();
                if !participant.is_paused() {
                    participant.advance(scaled);
                }
            }
            self.accumulated -= step;
            self.elapsed += scaled;
            self.steps += 1;
            taken += 1;
        }

        let interpolation = self.interpolation();
        for animatable in &self.animatables {
            animatable.lock().animate(interpolation);
        }

        taken
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(TimelineSettings::default())
    }
}
