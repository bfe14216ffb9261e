use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::types::AdapterProfile;

/// Frame rate applied on software rasterizers unless the user picked one.
pub const SOFTWARE_FPS_CAP: f32 = 15.0;

/// High-level behaviour requested by the caller.
///
/// The render policy decides whether frames should animate continuously,
/// be evaluated at a fixed timestamp, or be exported to disk.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Run the render loop continuously, optionally clamping the frame rate.
    Animate {
        /// Optional requested frames-per-second cap.
        target_fps: Option<f32>,
    },
    /// Keep the window open on a frozen frame.
    Still {
        /// Timestamp to evaluate the field at (seconds).
        time: f32,
    },
    /// Evaluate one frame on the CPU and write it to disk as PNG.
    Export {
        /// Timestamp to evaluate the field at (seconds).
        time: f32,
        /// Destination path for the exported file.
        path: PathBuf,
    },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { target_fps: None }
    }
}

impl RenderPolicy {
    /// Caps an uncapped animation on software adapters. Returns the applied
    /// cap, if any.
    pub fn apply_software_cap(&mut self, profile: &AdapterProfile) -> Option<f32> {
        match self {
            RenderPolicy::Animate { target_fps } if target_fps.is_none() && profile.is_software() => {
                *target_fps = Some(SOFTWARE_FPS_CAP);
                Some(SOFTWARE_FPS_CAP)
            }
            _ => None,
        }
    }
}

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
///
/// Keeps counting while a backdrop is stopped, so resuming jumps ahead rather
/// than replaying the paused interval.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
    frame: u64,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self { time, frame: 0 }
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.time, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Builds a time source suited to the requested render policy.
pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate { .. } => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time } | RenderPolicy::Export { time, .. } => {
            Box::new(FixedTimeSource::new(*time))
        }
    }
}

/// Gates redraws according to the render policy.
///
/// Animations redraw whenever the FPS interval has elapsed (always when
/// uncapped). Stills draw once and again only after [`invalidate`].
///
/// [`invalidate`]: FrameScheduler::invalidate
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    single_frame: bool,
    last_frame: Option<Instant>,
    dirty: bool,
}

impl FrameScheduler {
    pub fn new(policy: &RenderPolicy) -> Self {
        let (interval, single_frame) = match policy {
            RenderPolicy::Animate { target_fps } => (
                target_fps
                    .filter(|fps| fps.is_finite() && *fps > 0.0)
                    .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps))),
                false,
            ),
            RenderPolicy::Still { .. } | RenderPolicy::Export { .. } => (None, true),
        };
        Self {
            interval,
            single_frame,
            last_frame: None,
            dirty: true,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        if self.single_frame {
            return self.dirty;
        }
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
        self.dirty = false;
    }

    /// When the next frame becomes due, if the scheduler is waiting on a clock.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.single_frame {
            return None;
        }
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }

    /// Forces the next frame of a still to be drawn (e.g. after a resize).
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn reset(&mut self) {
        self.last_frame = None;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn software() -> AdapterProfile {
        AdapterProfile {
            name: "llvmpipe".into(),
            backend: wgpu::Backend::Vulkan,
            device_type: wgpu::DeviceType::Cpu,
            max_texture_dimension: 8192,
        }
    }

    #[test]
    fn fixed_source_repeats_its_time() {
        let mut source = FixedTimeSource::new(12.0);
        assert_eq!(source.sample().seconds, 12.0);
        let second = source.sample();
        assert_eq!(second.seconds, 12.0);
        assert_eq!(second.frame_index, 1);
    }

    #[test]
    fn system_source_is_monotonic() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert!(second.seconds >= first.seconds);
        assert_eq!(second.frame_index, first.frame_index + 1);
    }

    #[test]
    fn capped_scheduler_waits_for_interval() {
        let mut scheduler = FrameScheduler::new(&RenderPolicy::Animate {
            target_fps: Some(10.0),
        });
        let start = Instant::now();
        assert!(scheduler.ready_for_frame(start));
        scheduler.mark_rendered(start);
        assert!(!scheduler.ready_for_frame(start + Duration::from_millis(50)));
        assert!(scheduler.ready_for_frame(start + Duration::from_millis(100)));
        assert_eq!(
            scheduler.next_deadline(),
            Some(start + Duration::from_millis(100))
        );
    }

    #[test]
    fn capped_interval_has_no_rounding_drift() {
        for (fps, millis) in [(10.0, 100), (4.0, 250), (50.0, 20)] {
            let scheduler = FrameScheduler::new(&RenderPolicy::Animate {
                target_fps: Some(fps),
            });
            assert_eq!(scheduler.interval(), Some(Duration::from_millis(millis)));
        }
    }

    #[test]
    fn uncapped_scheduler_is_always_ready() {
        let mut scheduler = FrameScheduler::new(&RenderPolicy::default());
        let now = Instant::now();
        scheduler.mark_rendered(now);
        assert!(scheduler.ready_for_frame(now));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn still_scheduler_draws_once_until_invalidated() {
        let mut scheduler = FrameScheduler::new(&RenderPolicy::Still { time: 3.0 });
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered(now);
        assert!(!scheduler.ready_for_frame(now + Duration::from_secs(5)));
        scheduler.invalidate();
        assert!(scheduler.ready_for_frame(now));
    }

    #[test]
    fn software_cap_only_applies_to_uncapped_animation() {
        let mut uncapped = RenderPolicy::default();
        assert_eq!(uncapped.apply_software_cap(&software()), Some(SOFTWARE_FPS_CAP));
        assert_eq!(
            uncapped,
            RenderPolicy::Animate {
                target_fps: Some(SOFTWARE_FPS_CAP)
            }
        );

        let mut user = RenderPolicy::Animate {
            target_fps: Some(60.0),
        };
        assert_eq!(user.apply_software_cap(&software()), None);

        let mut still = RenderPolicy::Still { time: 1.0 };
        assert_eq!(still.apply_software_cap(&software()), None);
    }
}
