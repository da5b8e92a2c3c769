use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tracing::{error, info};

use stashdb_storage::Store;

use crate::{Connection, handle_connection};

/// Aceita conexões até `shutdown` completar.
///
/// No máximo `max_connections` conexões simultâneas; as demais esperam na
/// fila do listener. Ao encerrar, as conexões abertas são avisadas pelo
/// canal de broadcast.
pub async fn run(
    listener: TcpListener,
    store: Store,
    max_connections: usize,
    shutdown: impl Future,
) -> anyhow::Result<()> {
    let semaphore = Arc::new(Semaphore::new(max_connections));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    tokio::pin!(shutdown);

    loop {
        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => permit?,
            _ = &mut shutdown => break,
        };

        let (socket, addr) = tokio::select! {
            result = listener.accept() => match result {
                Ok(v) => v,
                Err(e) => {
                    error!("erro ao aceitar conexão: {e}");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        info!("nova conexão: {addr}");
        let store = store.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();

        tokio::spawn(async move {
            let conn = Connection::new(socket);
            if let Err(e) = handle_connection(conn, store, &mut shutdown_rx).await {
                error!("erro na conexão {addr}: {e}");
            }
            info!("conexão encerrada: {addr}");
            drop(permit);
        });
    }

    info!("shutdown signal recebido");
    drop(shutdown_tx);
    Ok(())
}
