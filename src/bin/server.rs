use anyhow::Result;
use clap::Parser;

use plo_poker::server::run_server;
use plo_poker::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    plo_poker::server::logging::init_tracing();
    let config = ServerConfig::parse();
    run_server(config).await
}
