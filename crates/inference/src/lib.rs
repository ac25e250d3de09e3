use anyhow::{Context, Result};
use std::path::Path;
use tch::Device;

pub mod generator;
pub mod server;

// Re-export common types
pub use generator::{Generator, GeneratorError};

/// Rebuild the model for a finished job and load its best-loss checkpoint.
pub fn load_model(dir: &Path, job_id: &str, device: Device) -> Result<muse_core::MuseLstm> {
    let config = muse_core::checkpoint::load_config(dir, job_id)
        .with_context(|| format!("Failed to read model config for job {}", job_id))?;

    let mut vs = tch::nn::VarStore::new(device);
    let model = muse_core::MuseLstm::new(&vs.root(), &config);
    muse_core::checkpoint::load(&mut vs, dir, job_id)
        .with_context(|| format!("Failed to load checkpoint for job {}", job_id))?;

    Ok(model)
}
