use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tch::Device;

use inference::server::{app, AppState};
use trainer::JobTable;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let device = Device::cuda_if_available();
    println!("Using device: {:?}", device);

    let data_dir =
        PathBuf::from(std::env::var("MUSE_DATA_DIR").unwrap_or_else(|_| "jobs".to_string()));
    std::fs::create_dir_all(&data_dir)?;
    println!("Job data in {:?}", data_dir);

    let state = AppState {
        jobs: JobTable::new(),
        data_dir: Arc::new(data_dir),
        device,
    };

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8000));
    println!("Music generation server listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
