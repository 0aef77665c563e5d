use crate::error::{PlanError, Result};
use crate::store::Store;
use crate::types::{Decision, Iteration, Timestep};

/// Read access to prior results, scoped to one `(timestep, iteration)`.
pub trait ResultsView {
    fn current_timestep(&self) -> Timestep;

    /// Fails with [`PlanError::NoPreviousTimestep`] at the first timestep of
    /// the run.
    fn previous_timestep(&self) -> Result<Timestep>;

    fn decision_iteration(&self) -> Iteration;

    /// Ordered timesteps of the run.
    fn timesteps(&self) -> &[Timestep];

    /// Post-decision state written for `(timestep, iteration)`.
    fn get_state(&self, timestep: Timestep, iteration: Iteration) -> Result<Vec<Decision>>;
}

/// [`ResultsView`] backed by a [`Store`].
pub struct ResultsHandle<'a, S: Store + ?Sized> {
    store: &'a S,
    run: &'a str,
    timesteps: &'a [Timestep],
    current_timestep: Timestep,
    decision_iteration: Iteration,
}

impl<'a, S: Store + ?Sized> ResultsHandle<'a, S> {
    pub fn new(
        store: &'a S,
        run: &'a str,
        timesteps: &'a [Timestep],
        current_timestep: Timestep,
        decision_iteration: Iteration,
    ) -> Self {
        Self {
            store,
            run,
            timesteps,
            current_timestep,
            decision_iteration,
        }
    }

    pub fn run(&self) -> &str {
        self.run
    }
}

impl<S: Store + ?Sized> ResultsView for ResultsHandle<'_, S> {
    fn current_timestep(&self) -> Timestep {
        self.current_timestep
    }

    fn previous_timestep(&self) -> Result<Timestep> {
        let index = self
            .timesteps
            .iter()
            .position(|&t| t == self.current_timestep)
            .ok_or(PlanError::TimestepNotModelled(self.current_timestep))?;
        if index == 0 {
            return Err(PlanError::NoPreviousTimestep(self.current_timestep));
        }
        Ok(self.timesteps[index - 1])
    }

    fn decision_iteration(&self) -> Iteration {
        self.decision_iteration
    }

    fn timesteps(&self) -> &[Timestep] {
        self.timesteps
    }

    fn get_state(&self, timestep: Timestep, iteration: Iteration) -> Result<Vec<Decision>> {
        let entries = self.store.read_state(self.run, timestep, iteration)?;
        Ok(entries.iter().filter_map(|e| e.to_decision()).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
