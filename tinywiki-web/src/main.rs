use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = tinywiki_web::cli::Cli::parse();
    tinywiki_web::run_with_cli(cli).await
}
