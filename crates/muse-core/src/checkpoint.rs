//! Per-job persistence of model weights and shape.
//!
//! One checkpoint per job id, overwritten in place; the training loop only
//! calls `save` when the epoch's loss beats the best seen so far.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tch::nn;

use crate::config::ModelConfig;

/// Weights checkpoint path for one training job.
pub fn weights_path(dir: &Path, job_id: &str) -> PathBuf {
    dir.join(format!("weights-{}.ot", job_id))
}

/// Model-shape sidecar path for one training job.
pub fn config_path(dir: &Path, job_id: &str) -> PathBuf {
    dir.join(format!("config-{}.json", job_id))
}

pub fn save(vs: &nn::VarStore, dir: &Path, job_id: &str) -> Result<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    let path = weights_path(dir, job_id);
    vs.save(&path)
        .with_context(|| format!("Failed to save checkpoint to {:?}", path))?;
    Ok(path)
}

pub fn load(vs: &mut nn::VarStore, dir: &Path, job_id: &str) -> Result<()> {
    let path = weights_path(dir, job_id);
    vs.load(&path)
        .with_context(|| format!("Failed to load checkpoint from {:?}", path))?;
    Ok(())
}

pub fn save_config(config: &ModelConfig, dir: &Path, job_id: &str) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    let path = config_path(dir, job_id);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

pub fn load_config(dir: &Path, job_id: &str) -> Result<ModelConfig> {
    let path = config_path(dir, job_id);
    let json = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(serde_json::from_str(&json)?)
}
