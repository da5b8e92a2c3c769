//! Acesso indexado dentro de listas e mapas.
//!
//! Listas aceitam índice inteiro ou string numérica (base 10), com índices
//! negativos contando a partir do fim (-1 é o último). Mapas aceitam apenas
//! subchave string. Strings escalares nunca são indexáveis.

use stashdb_common::{Element, StorageError};

use crate::entry::Value;

impl Value {
    /// Retorna o elemento na posição/subchave `index`.
    pub fn element_at(&self, index: &Element) -> Result<Element, StorageError> {
        match self {
            Value::String(_) => Err(StorageError::IndexAccess),
            Value::List(items) => {
                let i = index_to_int(index)?;
                let pos = normalize(i, items.len()).ok_or(StorageError::IndexAccess)?;
                Ok(items[pos].clone())
            }
            Value::Map(map) => {
                let Element::Str(subkey) = index else {
                    return Err(StorageError::IllegalIndexType);
                };
                map.get(subkey).cloned().ok_or(StorageError::IndexAccess)
            }
        }
    }
}

/// Coerção de índice para listas.
fn index_to_int(index: &Element) -> Result<i64, StorageError> {
    match index {
        Element::Int(i) => Ok(*i),
        // Acima de i64::MAX nenhuma lista chega; fora dos limites.
        Element::UInt(u) => i64::try_from(*u).map_err(|_| StorageError::IndexAccess),
        Element::Str(s) => s.parse().map_err(|_| StorageError::NonIntegerSubkey),
        _ => Err(StorageError::IllegalIndexType),
    }
}

/// Resolve índices negativos e verifica os limites `[0, len)`.
fn normalize(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let pos = if index < 0 { len + index } else { index };
    if (0..len).contains(&pos) {
        Some(pos as usize)
    } else {
        None
    }
}
