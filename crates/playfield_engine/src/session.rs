//! # Simulation Session
//!
//! Ties one [`Simulation`] to the lifetime of the page hosting it.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──start()──> Running ──stop()/drop──> Stopped
//! ```
//!
//! Host resources (camera streams, sensor subscriptions, audio contexts)
//! are handed to the session when acquired. Stopping releases each of them
//! exactly once, newest first. `Drop` stops the session, so a page that
//! errors out or unwinds still lets go of the camera.
//!
//! Pointer input is produced on the host side through a [`PointerSender`]
//! and drained at the start of every frame.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use playfield_shared::constants::POINTER_QUEUE_CAPACITY;

use crate::drag::{PointerEvent, PointerOutcome};
use crate::error::{EngineError, EngineResult};
use crate::render::RenderAdapter;
use crate::simulation::{FrameReport, Simulation};

/// A hardware or OS handle a page holds while it runs.
pub trait HostResource {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Lets go of the handle. Called at most once.
    fn release(&mut self);
}

/// Session lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet started.
    Idle,
    /// Frames are being produced.
    Running,
    /// Resources released; terminal.
    Stopped,
}

/// Host-side handle for queueing pointer input.
#[derive(Clone, Debug)]
pub struct PointerSender {
    sender: Sender<PointerEvent>,
}

impl PointerSender {
    /// Queues an event without blocking.
    ///
    /// Returns `false` if the queue is full or the session is gone; the
    /// event is dropped.
    #[inline]
    pub fn send(&self, event: PointerEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("pointer queue full, event dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Output of one session frame.
#[derive(Debug)]
pub struct SessionFrame<M> {
    /// Outcomes of the pointer events drained before physics.
    pub pointer: Vec<PointerOutcome>,
    /// Physics report.
    pub report: FrameReport<M>,
}

/// A simulation bound to a page's lifetime and its host resources.
pub struct Session<M> {
    simulation: Simulation<M>,
    state: SessionState,
    resources: Vec<Box<dyn HostResource>>,
    pointer_tx: Sender<PointerEvent>,
    pointer_rx: Receiver<PointerEvent>,
}

impl<M> Session<M> {
    /// Wraps a simulation in an idle session.
    #[must_use]
    pub fn new(simulation: Simulation<M>) -> Self {
        let (pointer_tx, pointer_rx) = bounded(POINTER_QUEUE_CAPACITY);
        Self {
            simulation,
            state: SessionState::Idle,
            resources: Vec::new(),
            pointer_tx,
            pointer_rx,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The simulation.
    #[must_use]
    pub fn simulation(&self) -> &Simulation<M> {
        &self.simulation
    }

    /// The simulation, for spawning and resets.
    pub fn simulation_mut(&mut self) -> &mut Simulation<M> {
        &mut self.simulation
    }

    /// Handle for queueing pointer input.
    #[must_use]
    pub fn pointer_sender(&self) -> PointerSender {
        PointerSender {
            sender: self.pointer_tx.clone(),
        }
    }

    /// Number of held host resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Hands a host resource to the session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionStopped`] if the session has stopped;
    /// the resource is released immediately.
    pub fn acquire(&mut self, mut resource: Box<dyn HostResource>) -> EngineResult<()> {
        if self.state == SessionState::Stopped {
            warn!(resource = resource.name(), "acquired after stop, releasing");
            resource.release();
            return Err(EngineError::SessionStopped);
        }
        debug!(resource = resource.name(), "host resource acquired");
        self.resources.push(resource);
        Ok(())
    }

    /// Starts producing frames.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionStopped`] if the session has stopped.
    pub fn start(&mut self) -> EngineResult<()> {
        match self.state {
            SessionState::Stopped => Err(EngineError::SessionStopped),
            SessionState::Running => Ok(()),
            SessionState::Idle => {
                info!(particles = self.simulation.len(), "session started");
                self.state = SessionState::Running;
                Ok(())
            }
        }
    }

    /// Stops the session and releases every host resource, newest first.
    ///
    /// Calling this again is a no-op.
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.state = SessionState::Stopped;
        while let Some(mut resource) = self.resources.pop() {
            debug!(resource = resource.name(), "releasing host resource");
            resource.release();
        }
        // Discard input queued after the last frame.
        while self.pointer_rx.try_recv().is_ok() {}
        info!(frames = self.simulation.frame(), "session stopped");
    }

    /// Drains pointer input, then steps the simulation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotRunning`] before `start()` and
    /// [`EngineError::SessionStopped`] after `stop()`.
    pub fn frame(&mut self, now: Duration) -> EngineResult<SessionFrame<M>> {
        match self.state {
            SessionState::Idle => return Err(EngineError::SessionNotRunning),
            SessionState::Stopped => return Err(EngineError::SessionStopped),
            SessionState::Running => {}
        }

        let mut pointer = Vec::new();
        while let Ok(event) = self.pointer_rx.try_recv() {
            pointer.push(self.simulation.pointer(event));
        }

        let report = self.simulation.step(now);
        Ok(SessionFrame { pointer, report })
    }

    /// Runs [`Session::frame`] and hands the result to `adapter`.
    ///
    /// # Errors
    ///
    /// As [`Session::frame`]; the adapter is not called on error.
    pub fn frame_with<R>(&mut self, now: Duration, adapter: &mut R) -> EngineResult<SessionFrame<M>>
    where
        R: RenderAdapter<M> + ?Sized,
    {
        let frame = self.frame(now)?;
        adapter.render(&self.simulation.view());
        Ok(frame)
    }
}

impl<M> fmt::Debug for Session<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("resources", &self.resources.iter().map(|r| r.name()).collect::<Vec<_>>())
            .field("particles", &self.simulation.len())
            .finish()
    }
}

impl<M> Drop for Session<M> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::particle::Spawn;
    use crate::space::Space;
    use playfield_shared::Vec2;
    use std::sync::{Arc, Mutex};

    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl HostResource for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn release(&mut self) {
            self.log.lock().unwrap().push(self.name);
        }
    }

    fn session() -> Session<()> {
        let sim = Simulation::new(EngineConfig::default(), Space::rect(100.0, 100.0)).unwrap();
        Session::new(sim)
    }

    #[test]
    fn test_stop_releases_in_reverse_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut s = session();
        for name in ["camera", "accelerometer", "audio"] {
            s.acquire(Box::new(Probe { name, log: log.clone() })).unwrap();
        }
        s.start().unwrap();

        s.stop();
        s.stop();
        drop(s);

        assert_eq!(*log.lock().unwrap(), vec!["audio", "accelerometer", "camera"]);
    }

    #[test]
    fn test_drop_releases() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let mut s = session();
            s.acquire(Box::new(Probe { name: "camera", log: log.clone() })).unwrap();
        }
        assert_eq!(*log.lock().unwrap(), vec!["camera"]);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut s = session();
        assert!(matches!(s.frame(Duration::ZERO), Err(EngineError::SessionNotRunning)));
        s.start().unwrap();
        assert!(s.frame(Duration::ZERO).is_ok());
        s.stop();
        assert!(matches!(s.start(), Err(EngineError::SessionStopped)));
        assert!(matches!(s.frame(Duration::ZERO), Err(EngineError::SessionStopped)));
    }

    #[test]
    fn test_pointer_queue_drained_before_physics() {
        let mut s = session();
        let id = s
            .simulation_mut()
            .spawn(Spawn::circle(10.0, Vec2::new(40.0, 40.0), ()))
            .unwrap();
        s.start().unwrap();

        let tx = s.pointer_sender();
        assert!(tx.send(PointerEvent::Down {
            position: Vec2::new(50.0, 50.0),
            at: Duration::ZERO,
        }));
        let frame = s.frame(Duration::from_millis(16)).unwrap();

        assert_eq!(frame.pointer, vec![PointerOutcome::Grabbed(id)]);
        // Held particles ignore gravity.
        assert_eq!(s.simulation().particle(id).map(|p| p.position()), Some(Vec2::new(40.0, 40.0)));
    }
}
