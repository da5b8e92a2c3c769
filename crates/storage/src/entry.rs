use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

use stashdb_common::{Element, StorageError};

/// Tipo do valor armazenado.
///
/// Listas e mapas ficam atrás de `Arc`: ler uma entrada não copia os
/// elementos.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    List(Arc<[Element]>),
    Map(Arc<HashMap<String, Element>>),
}

impl Value {
    /// Nome do tipo como aparece no protocolo.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Result<&str, StorageError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(StorageError::ConversionError),
        }
    }

    pub fn as_list(&self) -> Result<&[Element], StorageError> {
        match self {
            Value::List(items) => Ok(items),
            _ => Err(StorageError::ConversionError),
        }
    }

    pub fn as_map(&self) -> Result<&HashMap<String, Element>, StorageError> {
        match self {
            Value::Map(map) => Ok(map),
            _ => Err(StorageError::ConversionError),
        }
    }

    /// Converte de volta para um `Element` (mesma forma do JSON de entrada).
    pub fn to_element(&self) -> Element {
        match self {
            Value::String(s) => Element::Str(s.clone()),
            Value::List(items) => Element::List(items.to_vec()),
            Value::Map(map) => Element::Map(map.as_ref().clone()),
        }
    }
}

/// Classificação da entrada do SET: só string, lista ou mapa viram valor.
impl TryFrom<Element> for Value {
    type Error = StorageError;

    fn try_from(input: Element) -> Result<Self, Self::Error> {
        match input {
            Element::Str(s) => Ok(Value::String(s)),
            Element::List(items) => Ok(Value::List(items.into())),
            Element::Map(map) => Ok(Value::Map(Arc::new(map))),
            Element::Null
            | Element::Bool(_)
            | Element::Int(_)
            | Element::UInt(_)
            | Element::Float(_) => {
                Err(StorageError::InvalidValueType)
            }
        }
    }
}

/// Entrada no store: valor + TTL opcional.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub value: Value,
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: Value, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expirada quando o instante de expiração já foi atingido.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|t| now >= t).unwrap_or(false)
    }

    /// Instante de expiração em milissegundos Unix, se houver TTL.
    pub fn expires_unix_ms(&self) -> Option<u64> {
        let deadline = self.expires_at?;
        let now = Instant::now();
        let wall = SystemTime::now();
        let at = if deadline >= now {
            wall.checked_add(deadline - now)
        } else {
            wall.checked_sub(now - deadline)
        }?;
        at.duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_millis() as u64)
    }
}
