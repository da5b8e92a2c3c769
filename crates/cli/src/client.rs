//! Cliente remoto: espelha as operações do store sobre TCP.

use bytes::{Buf, BytesMut};
use std::future::Future;
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Duration;
use tracing::debug;

use stashdb_common::{ConnectionError, Element, INITIAL_BUFFER_CAPACITY, ProtocolError};
use stashdb_protocol::{Command, Frame, Reply};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Erro devolvido pelo servidor (`{"error": ...}`).
    #[error("{0}")]
    Server(String),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("timeout após {0:?}")]
    Timeout(Duration),
    #[error("resposta inesperada: {0:?}")]
    UnexpectedReply(Reply),
    /// Uma requisição anterior falhou no meio do caminho; a resposta dela
    /// pode ainda chegar. Só volta a funcionar após `reconnect`.
    #[error("conexão inutilizada por falha anterior, reconecte")]
    Poisoned,
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Connection(ConnectionError::Io(e))
    }
}

/// Valor tipado como devolvido por SET/GET.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub kind: String,
    pub data: Element,
    /// Milissegundos Unix; 0 = sem expiração.
    pub expires: u64,
}

pub struct Client {
    addr: String,
    stream: TcpStream,
    buffer: BytesMut,
    timeout: Option<Duration>,
    poisoned: bool,
}

impl Client {
    /// Conecta em `addr`. `timeout` vale para a conexão e para cada requisição.
    pub async fn connect(addr: &str, timeout: Option<Duration>) -> Result<Client, ClientError> {
        let stream = with_timeout(timeout, async {
            Ok::<_, ClientError>(TcpStream::connect(addr).await?)
        }).await?;
        Ok(Client {
            addr: addr.to_string(),
            stream,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            timeout,
            poisoned: false,
        })
    }

    /// Abre uma conexão nova no mesmo endereço, descartando o buffer antigo.
    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        let fresh = Client::connect(&self.addr, self.timeout).await?;
        *self = fresh;
        Ok(())
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        match self.request(&Command::Ping).await? {
            Reply::Ok { .. } => Ok(()),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn set(
        &mut self,
        key: &str,
        value: Element,
        ttl_ms: i64,
    ) -> Result<StoredValue, ClientError> {
        let cmd = Command::Set {
            key: key.to_string(),
            value,
            ttl: ttl_ms,
        };
        stored_value(self.request(&cmd).await?)
    }

    pub async fn get(&mut self, key: &str) -> Result<StoredValue, ClientError> {
        let cmd = Command::Get {
            key: key.to_string(),
        };
        stored_value(self.request(&cmd).await?)
    }

    pub async fn remove(&mut self, key: &str) -> Result<(), ClientError> {
        let cmd = Command::Remove {
            key: key.to_string(),
        };
        match self.request(&cmd).await? {
            Reply::Ok { .. } => Ok(()),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn keys(&mut self) -> Result<Vec<String>, ClientError> {
        match self.request(&Command::Keys).await? {
            Reply::Keys { keys } => Ok(keys),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    pub async fn get_at_index(
        &mut self,
        key: &str,
        index: impl Into<Element>,
    ) -> Result<Element, ClientError> {
        let cmd = Command::Index {
            key: key.to_string(),
            index: index.into(),
        };
        match self.request(&cmd).await? {
            Reply::Element { element } => Ok(element),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    /// Envia um comando e espera a resposta. Erros do servidor viram
    /// `ClientError::Server`.
    ///
    /// Timeout ou erro de I/O no meio da troca deixa a conexão
    /// dessincronizada: o cliente passa a recusar requisições até
    /// `reconnect`.
    pub async fn request(&mut self, cmd: &Command) -> Result<Reply, ClientError> {
        if self.poisoned {
            return Err(ClientError::Poisoned);
        }
        debug!("enviando {}", cmd.name());
        let frame = cmd.to_frame()?;
        let timeout = self.timeout;
        let reply = match with_timeout(timeout, self.round_trip(&frame)).await {
            Err(e @ (ClientError::Timeout(_) | ClientError::Connection(_))) => {
                debug!("conexão com {} inutilizada: {e}", self.addr);
                self.poisoned = true;
                return Err(e);
            }
            result => result?,
        };
        match reply {
            Reply::Error { error } => Err(ClientError::Server(error)),
            reply => Ok(reply),
        }
    }

    async fn round_trip(&mut self, frame: &Frame) -> Result<Reply, ClientError> {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;

        loop {
            let mut cursor = Cursor::new(&self.buffer[..]);
            match Frame::parse(&mut cursor) {
                Ok(frame) => {
                    let len = cursor.position() as usize;
                    self.buffer.advance(len);
                    return Ok(Reply::from_frame(&frame)?);
                }
                Err(ProtocolError::Incomplete) => {}
                Err(e) => return Err(e.into()),
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(ConnectionError::ConnectionReset.into());
            }
        }
    }
}

fn stored_value(reply: Reply) -> Result<StoredValue, ClientError> {
    match reply {
        Reply::Value {
            kind,
            data,
            expires,
        } => Ok(StoredValue {
            kind,
            data,
            expires,
        }),
        other => Err(ClientError::UnexpectedReply(other)),
    }
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ClientError::Timeout(limit))?,
        None => fut.await,
    }
}
