use std::sync::Arc;

use clap::Parser;
use tracing::info;

use stepgraph_engine::{
    agents::code_review,
    config::Config,
    metrics,
    server::Server,
    workflow::load_graph_specs,
    Result,
};

#[derive(Parser)]
#[command(author, version, about = "Serve the graph execution engine over HTTP", long_about = None)]
struct Cli {
    /// Address to listen on (overrides SERVER_ADDR)
    #[arg(short, long)]
    addr: Option<String>,

    /// Log level (debug, info, warn, error); overrides LOG_LEVEL
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load()?;
    if let Some(addr) = cli.addr {
        config.server.addr = addr;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    // Initialize logging
    let log_filter = format!("stepgraph_engine={},tower_http=info,info", config.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .init();
    info!("Loaded configuration: {:?}", config);

    metrics::register_metrics();

    let engine = code_review::build_engine().with_default_max_steps(config.engine.max_steps);

    if config.engine.sample_graph {
        let graph_id = engine.register_spec(&code_review::sample_graph(), false).await;
        info!("Sample graph created with id: {}", graph_id);
    }

    if let Some(path) = &config.engine.graphs_file {
        for spec in load_graph_specs(path)? {
            let graph_id = engine.register_spec(&spec, false).await;
            info!(
                "Graph '{}' from {} registered with id: {}",
                spec.name.as_deref().unwrap_or("unnamed"),
                path.display(),
                graph_id
            );
        }
    }

    let server = Server::new(Arc::new(engine));

    info!("Starting server on {}", config.server.addr);
    server.start(&config.server.addr).await?;

    Ok(())
}
