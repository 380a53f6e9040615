mod cli;
mod infra;
mod report;
mod routes;
mod server;

use schema_insight::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
