use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, info};

mod log;
mod utils;

const NAME: &str = "whipogg";

#[derive(Parser)]
#[command(name = NAME, version)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg: ingest::config::Config = utils::load(NAME, args.config);

    log::set(&cfg.log.level);
    cfg.validate()?;
    debug!("config : {:?}", cfg);

    std::fs::create_dir_all(&cfg.recorder.dir)
        .map_err(|e| anyhow::anyhow!("{}: {}", cfg.recorder.dir.display(), e))?;

    let listener = TcpListener::bind(cfg.http.listen).await?;
    info!(
        "Running WHIP server at http://{}/, recording to {}",
        listener.local_addr()?,
        cfg.recorder.dir.display()
    );

    ingest::serve(cfg, listener, utils::shutdown_signal()).await;
    info!("Server shutdown");
    Ok(())
}
