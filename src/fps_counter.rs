// src/fps_counter.rs
use std::time::Instant;

/// Rolling frame-time tracker. Records the last N frame times and logs an
/// averaged rate periodically at debug level.
pub struct FpsCounter {
    frame_ms: [f32; 120],
    cursor: usize,
    last_instant: Instant,
    frames: u64,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frame_ms: [0.0; 120],
            cursor: 0,
            last_instant: Instant::now(),
            frames: 0,
        }
    }

    /// Record a frame boundary; returns the delta time in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last_instant).as_secs_f32();
        self.last_instant = now;

        self.frame_ms[self.cursor] = dt * 1000.0;
        self.cursor = (self.cursor + 1) % self.frame_ms.len();
        self.frames += 1;
        if self.frames % 300 == 0 {
            let (fps, ms) = self.averaged();
            log::debug!(target: "frame", "{fps:.1} fps ({ms:.2} ms)");
        }
        dt
    }

    /// Averaged (fps, frame ms) over the filled part of the window.
    pub fn averaged(&self) -> (f32, f32) {
        let filled: Vec<f32> = self.frame_ms.iter().copied().filter(|&v| v > 0.0).collect();
        if filled.is_empty() {
            return (0.0, 0.0);
        }
        let avg_ms = filled.iter().sum::<f32>() / filled.len() as f32;
        (1000.0 / avg_ms, avg_ms)
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
