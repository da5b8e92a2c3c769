use serde::{Deserialize, Serialize};
use stashdb_common::{Element, ProtocolError};

use crate::Frame;

/// Resposta do servidor, um objeto JSON por frame.
///
/// Sem tag explícita: cada variante é reconhecida pelos seus campos, e a
/// ordem das variantes define a prioridade na desserialização.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// `{"error":"mensagem"}`
    Error { error: String },
    /// `{"type":"list","data":[...],"expires":1700000000000}`; 0 = sem TTL.
    Value {
        #[serde(rename = "type")]
        kind: String,
        data: Element,
        expires: u64,
    },
    /// `{"element":...}`
    Element { element: Element },
    /// `{"keys":[...]}`
    Keys { keys: Vec<String> },
    /// `{"ok":true}`
    Ok { ok: bool },
}

impl Reply {
    pub fn error(message: impl ToString) -> Self {
        Reply::Error {
            error: message.to_string(),
        }
    }

    pub fn ok() -> Self {
        Reply::Ok { ok: true }
    }

    pub fn from_frame(frame: &Frame) -> Result<Reply, ProtocolError> {
        frame.to_json()
    }

    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        Frame::from_json(self)
    }
}
