//! # PLAYFIELD Frame Loop
//!
//! One display refresh:
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. BEGIN FRAME                                                      │
//! │    └─ Compute `now` from the clock                                  │
//! │                                                                     │
//! │ 2. PHYSICS (Session::frame)                                         │
//! │    ├─ Drain pointer events                                          │
//! │    ├─ Apply acceleration, integrate                                 │
//! │    ├─ Pairwise, then boundary collisions                            │
//! │    └─ Settling                                                      │
//! │                                                                     │
//! │ 3. RENDER                                                           │
//! │    └─ RenderAdapter reads the frame view                            │
//! │                                                                     │
//! │ 4. END FRAME                                                        │
//! │    └─ Record stats, wait for the next deadline (realtime only)      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::{Duration, Instant};

use playfield_engine::{EngineError, EngineResult, RenderAdapter, Session, SessionFrame};
use playfield_shared::constants::TARGET_FPS;
use tracing::{debug, warn};

/// Frame time above which a frame is logged as slow.
pub const MAX_FRAME_TIME: Duration = Duration::from_millis(33);

/// Where frame timestamps come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    /// `now = frame × frame_time`; no waiting. Deterministic, for headless runs.
    Fixed,
    /// Wall clock since the loop started; frames wait for their deadline.
    Realtime,
}

/// Configuration for the frame loop.
#[derive(Clone, Debug)]
pub struct FrameLoopConfig {
    /// Target frames per second.
    pub target_fps: u32,
    /// Clock source.
    pub clock: ClockMode,
    /// Log frames over [`MAX_FRAME_TIME`].
    pub enable_timing_logs: bool,
}

impl Default for FrameLoopConfig {
    fn default() -> Self {
        Self {
            target_fps: TARGET_FPS,
            clock: ClockMode::Fixed,
            enable_timing_logs: true,
        }
    }
}

impl FrameLoopConfig {
    /// Duration of one frame at the target rate.
    #[must_use]
    pub fn frame_time(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.target_fps.max(1)))
    }
}

/// Frame timing and event statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Total frame time in microseconds.
    pub total_us: u64,
    /// Physics step time in microseconds.
    pub physics_us: u64,
    /// Render time in microseconds.
    pub render_us: u64,
    /// Frame number.
    pub frame: u64,
    /// Pointer events drained.
    pub pointer_events: u32,
    /// Wall hits.
    pub wall_hits: u32,
    /// Pair collisions.
    pub collisions: u32,
    /// Particles that settled.
    pub settled: u32,
    /// Particles retired.
    pub retired: u32,
}

/// Start time of frame `frames`, saturating at `u64::MAX` nanoseconds.
fn frame_deadline(frame_time: Duration, frames: u64) -> Duration {
    let nanos = frame_time.as_nanos().saturating_mul(u128::from(frames));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Drives a [`Session`] at a fixed rate.
pub struct FrameLoop<M> {
    session: Session<M>,
    config: FrameLoopConfig,
    frame_count: u64,
    started: Instant,
    stats_accumulator: FrameStatsAccumulator,
}

impl<M> FrameLoop<M> {
    /// Starts `session` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for a zero frame rate, or
    /// [`EngineError::SessionStopped`] if the session was already stopped.
    pub fn new(mut session: Session<M>, config: FrameLoopConfig) -> EngineResult<Self> {
        if config.target_fps == 0 {
            return Err(EngineError::InvalidConfig("target_fps must be positive".to_string()));
        }
        session.start()?;
        Ok(Self {
            session,
            config,
            frame_count: 0,
            started: Instant::now(),
            stats_accumulator: FrameStatsAccumulator::new(),
        })
    }

    /// Timestamp for the next frame.
    fn now(&self) -> Duration {
        match self.config.clock {
            ClockMode::Fixed => frame_deadline(self.config.frame_time(), self.frame_count + 1),
            ClockMode::Realtime => self.started.elapsed(),
        }
    }

    /// Runs one frame and renders it through `adapter`.
    ///
    /// # Errors
    ///
    /// Propagates [`Session::frame`] errors; nothing is rendered then.
    pub fn tick<R>(&mut self, adapter: &mut R) -> EngineResult<(SessionFrame<M>, FrameStats)>
    where
        R: RenderAdapter<M> + ?Sized,
    {
        let frame_start = Instant::now();
        let now = self.now();

        let physics_start = Instant::now();
        let output = self.session.frame(now)?;
        let physics_us = physics_start.elapsed().as_micros() as u64;

        let render_start = Instant::now();
        adapter.render(&self.session.simulation().view());
        let render_us = render_start.elapsed().as_micros() as u64;

        let report = &output.report;
        let stats = FrameStats {
            total_us: frame_start.elapsed().as_micros() as u64,
            physics_us,
            render_us,
            frame: report.frame,
            pointer_events: output.pointer.len() as u32,
            wall_hits: report.wall_hits() as u32,
            collisions: report.collisions() as u32,
            settled: report.settled().count() as u32,
            retired: report.retired.len() as u32,
        };
        self.end_frame(stats);
        Ok((output, stats))
    }

    /// Runs `frames` frames, calling `between` before each one.
    ///
    /// `between` gets the session and the frame index; use it to spawn or
    /// queue input. In realtime mode each frame waits for its deadline.
    ///
    /// # Errors
    ///
    /// Stops at the first error from `between` or the session.
    pub fn run<R, F>(&mut self, frames: u64, adapter: &mut R, mut between: F) -> EngineResult<()>
    where
        R: RenderAdapter<M> + ?Sized,
        F: FnMut(&mut Session<M>, u64) -> EngineResult<()>,
    {
        let frame_time = self.config.frame_time();
        for index in 0..frames {
            between(&mut self.session, index)?;
            self.tick(adapter)?;

            if self.config.clock == ClockMode::Realtime {
                let deadline = frame_deadline(frame_time, self.frame_count);
                let elapsed = self.started.elapsed();
                if let Some(wait) = deadline.checked_sub(elapsed) {
                    std::thread::sleep(wait);
                }
            }
        }
        Ok(())
    }

    fn end_frame(&mut self, stats: FrameStats) {
        self.frame_count += 1;
        self.stats_accumulator.record(stats);

        if self.config.enable_timing_logs && stats.total_us > MAX_FRAME_TIME.as_micros() as u64 {
            warn!(
                frame = self.frame_count,
                total_ms = stats.total_us as f64 / 1000.0,
                target_ms = self.config.frame_time().as_micros() as f64 / 1000.0,
                "frame exceeded budget"
            );
        } else {
            debug!(frame = self.frame_count, total_us = stats.total_us, "frame");
        }
    }

    /// Frames run so far.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The session.
    #[must_use]
    pub fn session(&self) -> &Session<M> {
        &self.session
    }

    /// The session, for spawning and input.
    pub fn session_mut(&mut self) -> &mut Session<M> {
        &mut self.session
    }

    /// Accumulated statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats_accumulator
    }

    /// Stops the session (releasing its resources) and returns it.
    #[must_use]
    pub fn finish(mut self) -> Session<M> {
        self.session.stop();
        self.session
    }
}

impl<M> std::fmt::Debug for FrameLoop<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of physics times.
    pub physics_us_sum: u64,
    /// Sum of render times.
    pub render_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded [`MAX_FRAME_TIME`].
    pub frames_over_budget: u64,
    /// Wall hits across all frames.
    pub wall_hits: u64,
    /// Pair collisions across all frames.
    pub collisions: u64,
    /// Particles settled across all frames.
    pub settled: u64,
    /// Particles retired across all frames.
    pub retired: u64,
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            physics_us_sum: 0,
            render_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
            wall_hits: 0,
            collisions: 0,
            settled: 0,
            retired: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.physics_us_sum += stats.physics_us;
        self.render_us_sum += stats.render_us;
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);
        self.wall_hits += u64::from(stats.wall_hits);
        self.collisions += u64::from(stats.collisions);
        self.settled += u64::from(stats.settled);
        self.retired += u64::from(stats.retired);

        if stats.total_us > MAX_FRAME_TIME.as_micros() as u64 {
            self.frames_over_budget += 1;
        }
    }

    /// Average frame time in milliseconds.
    #[must_use]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Average physics time in milliseconds.
    #[must_use]
    pub fn avg_physics_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.physics_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Share of frames over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Prints a summary of the statistics.
    pub fn print_summary(&self) {
        let min = if self.frames_recorded == 0 { 0 } else { self.min_frame_us };
        println!("┌─ TIMING ───────────────────────────────────────────────────────┐");
        println!("│ Frames Recorded:    {}", self.frames_recorded);
        println!("│ Average Frame:      {:.3} ms", self.avg_frame_ms());
        println!("│ Average Physics:    {:.3} ms", self.avg_physics_ms());
        println!(
            "│ Min / Max Frame:    {:.3} / {:.3} ms",
            min as f64 / 1000.0,
            self.max_frame_us as f64 / 1000.0
        );
        println!(
            "│ Over Budget:        {} frames ({:.1}%)",
            self.frames_over_budget,
            self.over_budget_ratio() * 100.0
        );
        println!("└────────────────────────────────────────────────────────────────┘");
        println!("┌─ EVENTS ───────────────────────────────────────────────────────┐");
        println!("│ Wall Hits:          {}", self.wall_hits);
        println!("│ Collisions:         {}", self.collisions);
        println!("│ Settled:            {}", self.settled);
        println!("│ Retired:            {}", self.retired);
        println!("└────────────────────────────────────────────────────────────────┘");
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playfield_engine::{EngineConfig, FrameView, PointerEvent, Simulation, Space, Spawn, Vec2};

    fn session() -> Session<()> {
        let mut sim = Simulation::new(EngineConfig::default(), Space::rect(200.0, 200.0)).unwrap();
        sim.spawn(Spawn::circle(10.0, Vec2::new(50.0, 50.0), ())).unwrap();
        Session::new(sim)
    }

    #[test]
    fn test_frame_loop_starts_session() {
        let frame_loop = FrameLoop::new(session(), FrameLoopConfig::default()).unwrap();
        assert_eq!(frame_loop.frame_count(), 0);
        assert_eq!(frame_loop.session().state(), playfield_engine::SessionState::Running);
    }

    #[test]
    fn test_zero_fps_rejected() {
        let config = FrameLoopConfig {
            target_fps: 0,
            ..FrameLoopConfig::default()
        };
        assert!(matches!(
            FrameLoop::new(session(), config),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_fixed_clock_advances_by_frame_time() {
        let mut frame_loop = FrameLoop::new(session(), FrameLoopConfig::default()).unwrap();
        let mut rendered = Vec::new();
        let mut adapter = |view: &FrameView<'_, ()>| rendered.push((view.frame, view.now));
        frame_loop.run(3, &mut adapter, |_, _| Ok(())).unwrap();

        assert_eq!(frame_loop.frame_count(), 3);
        let step = FrameLoopConfig::default().frame_time();
        assert_eq!(rendered, vec![(1, step), (2, step * 2), (3, step * 3)]);
    }

    #[test]
    fn test_frame_deadline_past_u32_frames() {
        let frames = u64::from(u32::MAX) + 2;
        assert_eq!(
            frame_deadline(Duration::from_millis(1), frames),
            Duration::from_millis(frames)
        );
        assert_eq!(
            frame_deadline(Duration::from_secs(1), u64::MAX),
            Duration::from_nanos(u64::MAX)
        );
    }

    #[test]
    fn test_pointer_events_counted() {
        let mut frame_loop = FrameLoop::new(session(), FrameLoopConfig::default()).unwrap();
        let sender = frame_loop.session().pointer_sender();
        assert!(sender.send(PointerEvent::Down {
            position: Vec2::new(60.0, 60.0),
            at: Duration::ZERO,
        }));
        let (output, stats) = frame_loop.tick(&mut |_: &FrameView<'_, ()>| {}).unwrap();
        assert_eq!(stats.pointer_events, 1);
        assert_eq!(output.pointer.len(), 1);
        assert_eq!(frame_loop.stats().frames_recorded, 1);
    }

    #[test]
    fn test_between_error_stops_run() {
        let mut frame_loop = FrameLoop::new(session(), FrameLoopConfig::default()).unwrap();
        let result = frame_loop.run(10, &mut |_: &FrameView<'_, ()>| {}, |_, index| {
            if index == 2 {
                Err(EngineError::SessionStopped)
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(frame_loop.frame_count(), 2);
    }

    #[test]
    fn test_finish_stops_session() {
        let frame_loop = FrameLoop::new(session(), FrameLoopConfig::default()).unwrap();
        let session = frame_loop.finish();
        assert_eq!(session.state(), playfield_engine::SessionState::Stopped);
    }

    #[test]
    fn test_stats_accumulator() {
        let mut acc = FrameStatsAccumulator::new();
        for i in 0..100 {
            acc.record(FrameStats {
                total_us: 10_000 + (i * 100),
                physics_us: 5_000,
                render_us: 2_000,
                frame: i,
                wall_hits: 2,
                ..FrameStats::default()
            });
        }
        assert_eq!(acc.frames_recorded, 100);
        assert_eq!(acc.wall_hits, 200);
        assert_eq!(acc.frames_over_budget, 0);
        assert!(acc.avg_frame_ms() > 10.0 && acc.avg_frame_ms() < 20.0);
        assert!((acc.avg_physics_ms() - 5.0).abs() < 1e-9);
    }
}
