use std::error::Error as StdError;
use std::time::{Duration, Instant};

use moireconfig::AnimationSettings;
use pattern::PatternParameters;

/// Interval between animation ticks when nothing else is configured.
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(17);

#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    #[error("animation cadence must be greater than zero")]
    InvalidCadence,
    #[error("animation tick {tick} failed: {source}")]
    TickFailed {
        tick: u64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Radians added to each phase per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSteps {
    pub phase1_step: f64,
    pub phase2_step: f64,
}

impl Default for PhaseSteps {
    fn default() -> Self {
        Self {
            phase1_step: 1.5,
            phase2_step: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running { next_due: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The driver is stopped; nothing happened.
    Idle,
    /// Running, but the next tick is not due yet.
    NotDue { remaining: Duration },
    /// One tick fired. `coalesced` counts whole intervals that were missed
    /// and folded into this tick.
    Ticked { tick: u64, coalesced: u32 },
}

/// Periodic phase animation.
///
/// The driver never sleeps or spawns anything: the caller polls it with the
/// current time and it decides whether a tick is due. A late poll fires a
/// single tick no matter how many intervals were missed.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    state: DriverState,
    cadence: Duration,
    steps: PhaseSteps,
    ticks: u64,
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self {
            state: DriverState::Idle,
            cadence: DEFAULT_CADENCE,
            steps: PhaseSteps::default(),
            ticks: 0,
        }
    }
}

impl AnimationDriver {
    pub fn new(cadence: Duration, steps: PhaseSteps) -> Result<Self, AnimationError> {
        let mut driver = Self::default();
        driver.set_cadence(cadence)?;
        driver.set_steps(steps);
        Ok(driver)
    }

    pub fn from_settings(settings: &AnimationSettings) -> Result<Self, AnimationError> {
        Self::new(
            settings.cadence,
            PhaseSteps {
                phase1_step: settings.phase1_step,
                phase2_step: settings.phase2_step,
            },
        )
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DriverState::Running { .. })
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn steps(&self) -> PhaseSteps {
        self.steps
    }

    /// Ticks fired since the driver was created.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Starts ticking; the first tick is due one cadence after `now`.
    /// Returns `false` if the driver was already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = DriverState::Running {
            next_due: now + self.cadence,
        };
        tracing::debug!(cadence = ?self.cadence, "animation started");
        true
    }

    /// Stops ticking. Returns `false` if the driver was already idle.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = DriverState::Idle;
        tracing::debug!(ticks = self.ticks, "animation stopped");
        true
    }

    pub fn set_steps(&mut self, steps: PhaseSteps) {
        self.steps = steps;
    }

    /// Takes effect from the next scheduled tick onward.
    pub fn set_cadence(&mut self, cadence: Duration) -> Result<(), AnimationError> {
        if cadence.is_zero() {
            return Err(AnimationError::InvalidCadence);
        }
        self.cadence = cadence;
        Ok(())
    }

    /// Fires a tick if one is due: advances both phases, then renders
    /// synchronously with the updated parameters.
    ///
    /// A failing `render` stops the driver. The error is returned from this
    /// call only; later polls report [`TickOutcome::Idle`].
    pub fn poll<F, E>(
        &mut self,
        now: Instant,
        params: &mut PatternParameters,
        render: F,
    ) -> Result<TickOutcome, AnimationError>
    where
        F: FnOnce(&PatternParameters) -> Result<(), E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let next_due = match self.state {
            DriverState::Idle => return Ok(TickOutcome::Idle),
            DriverState::Running { next_due } => next_due,
        };
        if now < next_due {
            return Ok(TickOutcome::NotDue {
                remaining: next_due - now,
            });
        }

        let late = now - next_due;
        let coalesced =
            u32::try_from(late.as_nanos() / self.cadence.as_nanos()).unwrap_or(u32::MAX);
        if coalesced > 0 {
            tracing::trace!(coalesced, "coalesced missed animation ticks");
        }

        self.ticks += 1;
        let tick = self.ticks;
        params.advance_phases(self.steps.phase1_step, self.steps.phase2_step);

        if let Err(err) = render(params) {
            self.state = DriverState::Idle;
            let source = err.into();
            tracing::warn!(tick, error = %source, "animation tick failed; stopping");
            return Err(AnimationError::TickFailed { tick, source });
        }

        self.state = DriverState::Running {
            next_due: now + self.cadence,
        };
        Ok(TickOutcome::Ticked { tick, coalesced })
    }
}
