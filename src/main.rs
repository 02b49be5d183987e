use std::{error::Error, sync::Arc};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::lib::{
    config::Settings,
    worker::types::{TaskServer, Worker},
};

mod lib {
    pub mod command;
    pub mod config;
    pub mod image;
    pub mod sync;
    pub mod tasks;
    pub mod worker;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::parse();
    info!(settings = ?settings, "starting image sync service");

    let worker = Arc::new(Worker::new(settings.clone()));
    let server = TaskServer::new(worker, &settings.host, settings.port);
    server.start_server().await?;

    Ok(())
}
