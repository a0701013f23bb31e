use crate::{DiffEqErrors, state::OdeState};

/// When the solver records the state.
///
/// - `Steps`: the initial state and every accepted step.
/// - `At`: exactly the given times. The stepper shortens steps so it lands on
///   each one, and stops after the last one without extrapolating past it.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SaveTimes {
    #[default]
    Steps,
    At(Vec<f64>),
}

impl SaveTimes {
    /// Checks the save times are finite, strictly ascending and inside `tspan`.
    pub(crate) fn validate(&self, tspan: (f64, f64)) -> Result<(), DiffEqErrors> {
        if let SaveTimes::At(times) = self {
            let inside = times
                .iter()
                .all(|t| t.is_finite() && *t >= tspan.0 && *t <= tspan.1);
            let ascending = times.windows(2).all(|w| w[1] > w[0]);
            if !inside || !ascending {
                return Err(DiffEqErrors::InvalidSaveTimes);
            }
        }
        Ok(())
    }

    pub(crate) fn capacity(&self) -> usize {
        match self {
            SaveTimes::Steps => 64,
            SaveTimes::At(times) => times.len(),
        }
    }
}

/// In-memory solver output. Each entry stores the time and state value at that time.
#[derive(Debug, Clone, Default)]
pub struct MemoryResult<State>
where
    State: OdeState,
{
    /// Recorded times.
    pub t: Vec<f64>,
    /// Recorded states.
    pub y: Vec<State>,
}

impl<State: OdeState> MemoryResult<State> {
    /// Constructs a new memory result buffer with an initial capacity `n`.
    pub fn new(n: usize) -> Self {
        Self {
            t: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
        }
    }

    pub(crate) fn insert(&mut self, t: f64, x: &State) {
        self.t.push(t);
        self.y.push(x.clone());
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &State)> {
        self.t.iter().copied().zip(self.y.iter())
    }

    pub fn last(&self) -> Option<(f64, &State)> {
        Some((*self.t.last()?, self.y.last()?))
    }
}
