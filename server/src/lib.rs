pub mod api;

use std::{fs::File, io::BufReader, path::Path};

use spacecraft::SimulationConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigErrors {
    #[error("could not open config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Reads a RON simulation config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<SimulationConfig, ConfigErrors> {
    match path {
        Some(path) => {
            let file = File::open(path)?;
            let config = ron::de::from_reader(BufReader::new(file))?;
            tracing::info!(path = %path.display(), "loaded simulation config");
            Ok(config)
        }
        None => Ok(SimulationConfig::default()),
    }
}
