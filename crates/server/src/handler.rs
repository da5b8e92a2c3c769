use tokio::sync::broadcast;
use tracing::{debug, warn};

use stashdb_common::{ConnectionError, ProtocolError};
use stashdb_protocol::{Command, Frame, Reply};
use stashdb_storage::{Entry, Store};

use crate::Connection;

/// Loop principal de tratamento de uma conexão.
pub async fn handle_connection(
    mut conn: Connection,
    store: Store,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let frame = tokio::select! {
            result = conn.read_frame() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let frame = match frame {
            Some(f) => f,
            None => return Ok(()), // EOF
        };

        if frame.is_blank() {
            continue;
        }

        let reply = match Command::from_frame(&frame) {
            Ok(cmd) => {
                debug!("comando recebido: {cmd:?}");
                execute_command(&cmd, &store)
            }
            Err(e) => Reply::error(e),
        };

        conn.write_frame(&encode_reply(&reply)).await?;
    }
}

/// Executa um comando contra o store e monta a resposta.
///
/// Erros do store viram `{"error": ...}`; o store nunca os registra.
pub fn execute_command(cmd: &Command, store: &Store) -> Reply {
    match cmd {
        Command::Ping => Reply::ok(),
        Command::Set { key, value, ttl } => match store.set(key.clone(), value.clone(), *ttl) {
            Ok(entry) => value_reply(&entry),
            Err(e) => Reply::error(e),
        },
        Command::Get { key } => match store.get(key) {
            Ok(entry) => value_reply(&entry),
            Err(e) => Reply::error(e),
        },
        Command::Remove { key } => {
            store.remove(key);
            Reply::ok()
        }
        Command::Keys => Reply::Keys { keys: store.keys() },
        Command::Index { key, index } => match store.get_at_index(key, index) {
            Ok(element) => Reply::Element { element },
            Err(e) => Reply::error(e),
        },
    }
}

fn value_reply(entry: &Entry) -> Reply {
    Reply::Value {
        kind: entry.value.type_name().to_string(),
        data: entry.value.to_element(),
        expires: entry.expires_unix_ms().unwrap_or(0),
    }
}

fn encode_reply(reply: &Reply) -> Frame {
    reply.to_frame().unwrap_or_else(|e: ProtocolError| {
        warn!("falha ao serializar resposta: {e}");
        Frame::from(r#"{"error":"falha ao serializar resposta"}"#)
    })
}
