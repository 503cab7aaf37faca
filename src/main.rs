use clap::Parser;

use adtrack::cli::{Cli, Commands};
use adtrack::config::init_config;
use adtrack::runtime::modes;
use adtrack::system::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = init_config(cli.config.as_deref());

    // guard 需要存活到进程退出，保证非阻塞日志写完
    let _guard = init_logging(&config.logging)?;

    match cli.command {
        None | Some(Commands::Serve) => modes::run_server().await,
        Some(command) => {
            if let Err(e) = modes::run_cli(command).await {
                eprintln!("{}", e);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
