// Playback controller: which frame is on screen and when to move on.

use crate::loader::Dataset;

/// Playback phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    /// First frame on screen, waiting out the start delay.
    Init,
    Playing,
    /// Last frame reached with repeat off.
    Finished,
}

/// (min, max) of the frame on screen, per panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameLimits {
    pub density: (f64, f64),
    pub field: (f64, f64),
}

/// Min and max of a frame, ignoring NaN. An all-NaN or empty frame gives (0, 0).
pub fn value_range(data: &[f64]) -> (f64, f64) {
    let mut vmin = f64::INFINITY;
    let mut vmax = f64::NEG_INFINITY;
    for &v in data {
        if v < vmin {
            vmin = v;
        }
        if v > vmax {
            vmax = v;
        }
    }
    if vmin > vmax {
        return (0.0, 0.0);
    }
    (vmin, vmax)
}

/// Color and axis limits for frame `index`, taken from that frame alone.
pub fn frame_limits(dataset: &Dataset, index: usize) -> FrameLimits {
    FrameLimits {
        density: value_range(dataset.density_frame(index)),
        field: value_range(dataset.field_frame(index)),
    }
}

pub struct PlaybackState {
    frame_count: usize,
    pub current_frame: usize,
    pub phase: Phase,
    fps: f64,
    repeat: bool,
    delay_remaining: f64,
    accumulator: f64,
    frames_shown: usize,
}

impl PlaybackState {
    pub fn new(frame_count: usize, fps: f64, start_delay: f64, repeat: bool) -> Self {
        Self {
            frame_count,
            current_frame: 0,
            phase: Phase::Init,
            fps: fps.max(0.0),
            repeat,
            delay_remaining: start_delay.max(0.0),
            accumulator: 0.0,
            frames_shown: usize::from(frame_count > 0),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Number of frame changes presented so far, counting the initial frame.
    pub fn frames_shown(&self) -> usize {
        self.frames_shown
    }

    /// Advance the clock by `dt_seconds`. Returns true if the frame changed.
    pub fn tick(&mut self, dt_seconds: f64) -> bool {
        if self.frame_count == 0 {
            return false;
        }
        let mut dt = dt_seconds;
        if self.phase == Phase::Init {
            if dt < self.delay_remaining {
                self.delay_remaining -= dt;
                return false;
            }
            dt -= self.delay_remaining;
            self.delay_remaining = 0.0;
            self.phase = Phase::Playing;
        }
        if self.phase != Phase::Playing {
            return false;
        }

        let prev = self.current_frame;
        self.accumulator += dt * self.fps;
        while self.accumulator >= 1.0 && self.phase == Phase::Playing {
            self.accumulator -= 1.0;
            self.step();
        }
        self.current_frame != prev
    }

    fn step(&mut self) {
        if self.current_frame + 1 < self.frame_count {
            self.current_frame += 1;
        } else if self.repeat {
            self.current_frame = 0;
        } else {
            self.phase = Phase::Finished;
            self.accumulator = 0.0;
            return;
        }
        self.frames_shown += 1;
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }
}
