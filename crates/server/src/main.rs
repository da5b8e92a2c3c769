use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use stashdb_common::{DEFAULT_HOST, DEFAULT_PORT, MAX_CONNECTIONS};
use stashdb_storage::{GetPolicy, Store};

#[derive(Parser, Debug)]
#[command(name = "stashdb-server", about = "StashDB: typed in-memory key-value store")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
    /// GET também esconde chaves expiradas (por padrão só KEYS e INDEX)
    #[arg(long)]
    strict_get: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stashdb_server=info".into()),
        )
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let store = Store::with_get_policy(if args.strict_get {
        GetPolicy::Strict
    } else {
        GetPolicy::Lenient
    });

    let listener = TcpListener::bind(&addr).await?;
    info!(
        "StashDB escutando em {addr} (get: {:?}, max conexões: {})",
        store.get_policy(),
        args.max_connections
    );

    stashdb_server::run(listener, store, args.max_connections, signal::ctrl_c()).await
}
