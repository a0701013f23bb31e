use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::state::AttitudeState;

/// One output row: time, body rates and attitude.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub angular_velocity: [f64; 3],
    /// Scalar first.
    pub quaternion: [f64; 4],
}

impl Sample {
    pub fn new(time: f64, state: &AttitudeState) -> Self {
        Self {
            time,
            angular_velocity: [state.omega[0], state.omega[1], state.omega[2]],
            quaternion: state.q.to_array(),
        }
    }
}

/// JSON payload returned for a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationData {
    pub simulation_data: Vec<Sample>,
}

impl From<Vec<Sample>> for SimulationData {
    fn from(simulation_data: Vec<Sample>) -> Self {
        Self { simulation_data }
    }
}

const CSV_HEADER: [&str; 8] = ["t", "w[0]", "w[1]", "w[2]", "q[0]", "q[1]", "q[2]", "q[3]"];

/// Writes the samples as CSV, one row per sample.
pub fn write_csv<W: Write>(samples: &[Sample], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for sample in samples {
        let row = std::iter::once(sample.time)
            .chain(sample.angular_velocity)
            .chain(sample.quaternion)
            .map(|v| v.to_string());
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
