use serde::{Deserialize, Serialize};
use stashdb_common::{CommandError, Element, ProtocolError};

use crate::Frame;

/// Operações aceitas pelo servidor, uma por frame.
///
/// No fio: objeto JSON com o campo `op`, por exemplo
/// `{"op":"set","key":"k","value":["a"],"ttl":1000}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Command {
    Ping,
    Set {
        key: String,
        /// Ausente vira `null`, que o store rejeita como tipo inválido.
        #[serde(default)]
        value: Element,
        /// Milissegundos; 0 = sem expiração.
        #[serde(default)]
        ttl: i64,
    },
    Get {
        key: String,
    },
    Remove {
        key: String,
    },
    Keys,
    Index {
        key: String,
        index: Element,
    },
}

const KNOWN_OPS: &[&str] = &["ping", "set", "get", "remove", "keys", "index"];

impl Command {
    /// Faz o parse de um Frame em um Command.
    pub fn from_frame(frame: &Frame) -> Result<Command, CommandError> {
        let raw: serde_json::Value = frame
            .to_json()
            .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;

        let op = raw
            .get("op")
            .and_then(|op| op.as_str())
            .ok_or_else(|| CommandError::InvalidArgument("campo 'op' ausente".into()))?;
        if !KNOWN_OPS.contains(&op) {
            return Err(CommandError::Unknown(op.to_string()));
        }

        serde_json::from_value(raw).map_err(|e| CommandError::InvalidArgument(e.to_string()))
    }

    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        Frame::from_json(self)
    }

    /// Nome da operação, para logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Set { .. } => "set",
            Command::Get { .. } => "get",
            Command::Remove { .. } => "remove",
            Command::Keys => "keys",
            Command::Index { .. } => "index",
        }
    }
}
