//! HTTP surface and per-job pipeline orchestration.
//!
//! A request never blocks beyond the upload save itself; parsing, training
//! and generation all run on blocking worker threads. Each job owns its
//! folder under the data dir and its row in the shared job table.

use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tch::Device;

use muse_core::ModelConfig;
use notation::{elements, midi, sequence, NotesData};
use trainer::{JobStatus, JobTable, NoteDataset, StopOutcome, Trainer, TrainerConfig};

use crate::generator::Generator;

/// Tokens generated per request unless the caller asks otherwise.
const GENERATE_STEPS: usize = 150;

#[derive(Clone)]
pub struct AppState {
    pub jobs: JobTable,
    pub data_dir: Arc<PathBuf>,
    pub device: Device,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/status/:job_id", get(status_handler))
        .route("/stop/:job_id", post(stop_handler))
        .route("/generate/:job_id", get(generate_handler))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .with_state(state)
}

fn mint_job_id() -> String {
    let mut rng = rand::thread_rng();
    (0..12)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect::<String>()
        .to_lowercase()
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<serde_json::Value>) {
    let job_id = mint_job_id();
    let upload_dir = state.data_dir.join(&job_id).join("midi");

    if let Err(e) = tokio::fs::create_dir_all(&upload_dir).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Failed to create job folder: {}", e) })),
        );
    }

    let mut saved = 0usize;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("upload-{}.mid", saved));
                // Client-supplied names keep only their final component.
                let name = Path::new(&name)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("upload.mid")
                    .to_string();

                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "error": format!("Upload failed: {}", e) })),
                        )
                    }
                };
                if let Err(e) = tokio::fs::write(upload_dir.join(&name), &bytes).await {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": format!("Failed to save {}: {}", name, e) })),
                    );
                }
                saved += 1;
            }
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("Upload failed: {}", e) })),
                )
            }
        }
    }

    if saved == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No files uploaded" })),
        );
    }

    state
        .jobs
        .insert(&job_id, JobStatus::Starting, "Upload accepted; preparing corpus");
    tracing::info!("Job {} accepted with {} files", job_id, saved);

    let task_state = state.clone();
    let task_job_id = job_id.clone();
    tokio::spawn(async move {
        run_pipeline(task_state, task_job_id).await;
    });

    (StatusCode::ACCEPTED, Json(json!({ "job_id": job_id })))
}

async fn status_handler(
    State(state): State<AppState>,
    UrlPath(job_id): UrlPath<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.jobs.get(&job_id) {
        Some(record) => (
            StatusCode::OK,
            Json(json!({ "status": record.status, "message": record.message })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Job not found" })),
        ),
    }
}

async fn stop_handler(
    State(state): State<AppState>,
    UrlPath(job_id): UrlPath<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.jobs.request_stop(&job_id) {
        StopOutcome::Accepted => (
            StatusCode::OK,
            Json(json!({
                "status": JobStatus::Stopping,
                "message": "Stop requested; the job will halt at the next epoch boundary"
            })),
        ),
        StopOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Job not found" })),
        ),
        StopOutcome::NotTraining(status) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": format!("Job is not currently training (status: {})", status)
            })),
        ),
    }
}

#[derive(Deserialize)]
struct GenerateParams {
    steps: Option<usize>,
}

async fn generate_handler(
    State(state): State<AppState>,
    UrlPath(job_id): UrlPath<String>,
    Query(params): Query<GenerateParams>,
) -> Response {
    match state.jobs.get(&job_id) {
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Job not found" })),
            )
                .into_response()
        }
        Some(record) if record.status != JobStatus::Complete => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": format!("Job is not complete (status: {})", record.status)
                })),
            )
                .into_response()
        }
        Some(_) => {}
    }

    let steps = params.steps.unwrap_or(GENERATE_STEPS);
    let result = tokio::task::spawn_blocking({
        let state = state.clone();
        let job_id = job_id.clone();
        move || generate_midi(&state, &job_id, steps)
    })
    .await;

    match result {
        Ok(Ok(bytes)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "audio/midi"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"ai_composition.mid\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) => {
            tracing::error!("Generation for job {} failed: {:#}", job_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("{:#}", e) })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Generation task for job {} panicked: {}", job_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal error during generation" })),
            )
                .into_response()
        }
    }
}

/// Full per-job pipeline. Every failure path, panics included, lands in the
/// job record as `failed`; nothing escapes the task.
async fn run_pipeline(state: AppState, job_id: String) {
    let jobs = state.jobs.clone();
    let result = tokio::task::spawn_blocking({
        let state = state.clone();
        let job_id = job_id.clone();
        move || train_job(&state, &job_id)
    })
    .await;

    match result {
        Ok(Ok(stopped)) => {
            let message = if stopped {
                "Training stopped by user; best model saved"
            } else {
                "Training complete"
            };
            jobs.set(&job_id, JobStatus::Complete, message);
            tracing::info!("Job {} complete", job_id);
        }
        Ok(Err(e)) => {
            tracing::error!("Job {} failed: {:#}", job_id, e);
            jobs.set(&job_id, JobStatus::Failed, &format!("{:#}", e));
        }
        Err(e) => {
            tracing::error!("Job {} panicked: {}", job_id, e);
            jobs.set(&job_id, JobStatus::Failed, "Internal error during training");
        }
    }
}

/// Blocking stage: parse, persist, window, train. Returns whether a stop
/// request halted training before the epoch budget ran out.
fn train_job(state: &AppState, job_id: &str) -> anyhow::Result<bool> {
    let jobs = &state.jobs;
    let job_dir = state.data_dir.join(job_id);

    jobs.set(job_id, JobStatus::Processing, "Parsing MIDI files");
    let parsed = midi::parse_midi_folder(&job_dir.join("midi"))?;
    let notes = elements::extract_tokens(&parsed);
    let data = NotesData::new(notes)?;
    data.save(job_dir.join("notes_data.json"))?;

    let vocab = data.vocab();
    let (network_input, network_output) =
        sequence::prepare_sequences(&data.notes, &vocab, sequence::SEQUENCE_LENGTH)?;

    let model_config = ModelConfig {
        n_vocab: data.n_vocab as i64,
        sequence_length: sequence::SEQUENCE_LENGTH as i64,
        ..ModelConfig::default()
    };
    let trainer_config = TrainerConfig {
        checkpoint_dir: job_dir.to_string_lossy().into_owned(),
        ..TrainerConfig::default()
    };

    let dataset = NoteDataset::new(
        &network_input,
        &network_output,
        data.n_vocab as i64,
        state.device,
    );

    jobs.set(job_id, JobStatus::Training, "Training in progress");
    let mut trainer = Trainer::new(model_config, trainer_config, state.device)?;
    trainer.train(&dataset, job_id, jobs)?;

    Ok(jobs.stop_requested(job_id))
}

/// Blocking stage of a generate request: load the job's model and data,
/// decode, render.
fn generate_midi(state: &AppState, job_id: &str, steps: usize) -> anyhow::Result<Vec<u8>> {
    let job_dir = state.data_dir.join(job_id);
    let data = NotesData::load(job_dir.join("notes_data.json"))?;
    let vocab = data.vocab();

    let model = crate::load_model(&job_dir, job_id, state.device)?;
    let generator = Generator::new(Arc::new(model), state.device);
    let tokens = generator.generate(&data.notes, &vocab, steps)?;

    Ok(midi::render_tokens(&tokens)?)
}
