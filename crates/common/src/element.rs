use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Payload não tipado: elementos de listas/mapas, entrada do SET e índice
/// do acesso indexado. O store nunca inspeciona o conteúdo além do nível
/// superior.
///
/// Serializa como JSON puro (sem tag). A ordem das variantes importa para
/// a desserialização: `Int` é tentado antes de `UInt`, que vem antes de
/// `Float`. Assim inteiros acima de `i64::MAX` caem em `UInt` sem perder
/// precisão; só números com parte fracionária ou fora de `u64` viram `Float`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Element {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    List(Vec<Element>),
    Map(HashMap<String, Element>),
}

impl Element {
    /// Nome curto do formato, usado nos logs do store.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Null => "null",
            Element::Bool(_) => "bool",
            Element::Int(_) | Element::UInt(_) => "int",
            Element::Float(_) => "float",
            Element::Str(_) => "string",
            Element::List(_) => "list",
            Element::Map(_) => "map",
        }
    }
}

impl From<&str> for Element {
    fn from(s: &str) -> Self {
        Element::Str(s.to_string())
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Element::Str(s)
    }
}

impl From<i64> for Element {
    fn from(n: i64) -> Self {
        Element::Int(n)
    }
}

impl From<i32> for Element {
    fn from(n: i32) -> Self {
        Element::Int(n.into())
    }
}

impl From<f64> for Element {
    fn from(n: f64) -> Self {
        Element::Float(n)
    }
}

impl From<bool> for Element {
    fn from(b: bool) -> Self {
        Element::Bool(b)
    }
}

impl From<Vec<Element>> for Element {
    fn from(items: Vec<Element>) -> Self {
        Element::List(items)
    }
}

impl From<HashMap<String, Element>> for Element {
    fn from(map: HashMap<String, Element>) -> Self {
        Element::Map(map)
    }
}
