/// Erros de framing/decodificação do protocolo JSON por linha.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame incompleto")]
    Incomplete,
    #[error("frame excede tamanho máximo ({0} bytes)")]
    FrameTooLarge(usize),
    #[error("JSON inválido: {0}")]
    InvalidJson(String),
}

/// Erros do store tipado. Nenhum é transitório: todos vêm da entrada do
/// chamador ou de uma chave ausente.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("TTL inválido: deve ser >= 0")]
    InvalidTtl,
    #[error("tipo de valor inválido: esperado string, lista ou mapa")]
    InvalidValueType,
    #[error("chave não encontrada")]
    KeyNotFound,
    #[error("acesso por índice inválido")]
    IndexAccess,
    #[error("tipo de índice ilegal")]
    IllegalIndexType,
    #[error("subchave não é um inteiro")]
    NonIntegerSubkey,
    #[error("erro de conversão: valor não corresponde ao tipo armazenado")]
    ConversionError,
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Erros de decodificação/validação de comandos.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("comando desconhecido: {0}")]
    Unknown(String),
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
}
