use std::sync::Arc;

use dashmap::DashMap;
use tokio::time::{Duration, Instant};
use tracing::debug;

use stashdb_common::{Element, StorageError};

use crate::entry::{Entry, Value};

/// Como o `get` trata entradas expiradas.
///
/// `keys` e `get_at_index` sempre escondem entradas expiradas. O `get`
/// simples historicamente devolve a entrada mesmo expirada; `Strict`
/// alinha o `get` com as outras leituras.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GetPolicy {
    #[default]
    Lenient,
    Strict,
}

/// Estado compartilhado entre todas as conexões.
struct SharedState {
    data: DashMap<String, Entry>,
    get_policy: GetPolicy,
}

/// Handle para o store tipado in-memory.
///
/// Clonar é barato: todos os clones apontam para o mesmo `DashMap`, e cada
/// operação é atômica por chave. Expiração é preguiçosa: entradas vencidas
/// continuam no mapa até serem sobrescritas ou removidas.
#[derive(Clone)]
pub struct Store {
    shared: Arc<SharedState>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_get_policy(GetPolicy::default())
    }

    pub fn with_get_policy(get_policy: GetPolicy) -> Self {
        Store {
            shared: Arc::new(SharedState {
                data: DashMap::new(),
                get_policy,
            }),
        }
    }

    pub fn get_policy(&self) -> GetPolicy {
        self.shared.get_policy
    }

    /// Grava `input` em `key`, substituindo qualquer entrada anterior.
    ///
    /// `ttl_ms == 0` nunca expira; negativo é rejeitado.
    pub fn set(&self, key: String, input: Element, ttl_ms: i64) -> Result<Entry, StorageError> {
        if ttl_ms < 0 {
            return Err(StorageError::InvalidTtl);
        }
        let kind = input.kind();
        let value = Value::try_from(input).inspect_err(|_| {
            debug!("SET {key} rejeitado: valor do tipo {kind}");
        })?;

        // TTL grande demais para representar equivale a nunca expirar.
        let expires_at = if ttl_ms > 0 {
            Instant::now().checked_add(Duration::from_millis(ttl_ms as u64))
        } else {
            None
        };

        debug!("SET {key} ({}, ttl={ttl_ms}ms)", value.type_name());
        let entry = Entry::new(value, expires_at);
        self.shared.data.insert(key, entry.clone());
        Ok(entry)
    }

    pub fn get(&self, key: &str) -> Result<Entry, StorageError> {
        let entry = self.shared.data.get(key).ok_or(StorageError::KeyNotFound)?;
        if self.shared.get_policy == GetPolicy::Strict && entry.is_expired() {
            return Err(StorageError::KeyNotFound);
        }
        Ok(entry.value().clone())
    }

    /// Remove `key`. Idempotente: retorna se havia algo para remover.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.shared.data.remove(key).is_some();
        if removed {
            debug!("chave removida: {key}");
        }
        removed
    }

    /// Chaves não expiradas, sem ordem definida. Não remove as expiradas.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.shared
            .data
            .iter()
            .filter(|item| !item.value().is_expired_at(now))
            .map(|item| item.key().clone())
            .collect()
    }

    pub fn get_at_index(&self, key: &str, index: &Element) -> Result<Element, StorageError> {
        let entry = self.shared.data.get(key).ok_or(StorageError::KeyNotFound)?;
        if entry.is_expired() {
            return Err(StorageError::KeyNotFound);
        }
        entry.value.element_at(index)
    }

    /// Número de entradas fisicamente presentes, incluindo as expiradas.
    pub fn len(&self) -> usize {
        self.shared.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.data.is_empty()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn list(items: &[&str]) -> Element {
        Element::List(items.iter().map(|s| Element::from(*s)).collect())
    }

    fn map(pairs: &[(&str, &str)]) -> Element {
        Element::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Element::from(*v)))
                .collect(),
        )
    }

    fn fixture() -> Store {
        let store = Store::new();
        store.set("string".into(), Element::from("String"), 0).unwrap();
        store.set("list".into(), list(&["One", "Two", "Three"]), 0).unwrap();
        store.set("list2".into(), list(&["One", "Two", "Three"]), 0).unwrap();
        store
            .set("map".into(), map(&[("One", "42"), ("Two", "")]), 0)
            .unwrap();
        store
    }

    #[test]
    fn get_at_index_table() {
        let store = fixture();
        let cases: Vec<(&str, Element, Result<Element, StorageError>)> = vec![
            ("", Element::from("invalid"), Err(StorageError::KeyNotFound)),
            ("string", Element::from("invalid"), Err(StorageError::IndexAccess)),
            ("list", Element::from("1"), Ok(Element::from("Two"))),
            ("list", Element::Int(1), Ok(Element::from("Two"))),
            ("list", Element::from("0"), Ok(Element::from("One"))),
            ("list", Element::Int(0), Ok(Element::from("One"))),
            ("list", Element::from("-1"), Ok(Element::from("Three"))),
            ("list", Element::Int(-1), Ok(Element::from("Three"))),
            ("list", Element::from("-2"), Ok(Element::from("Two"))),
            ("list", Element::Int(-2), Ok(Element::from("Two"))),
            ("list", Element::from("-5"), Err(StorageError::IndexAccess)),
            ("list", Element::Int(-5), Err(StorageError::IndexAccess)),
            ("list", Element::Int(3), Err(StorageError::IndexAccess)),
            ("list", Element::from(""), Err(StorageError::NonIntegerSubkey)),
            ("list2", Element::Float(-42.55), Err(StorageError::IllegalIndexType)),
            ("map", Element::from("One"), Ok(Element::from("42"))),
            ("map", Element::from("Two"), Ok(Element::from(""))),
            ("map", Element::from("Three"), Err(StorageError::IndexAccess)),
            ("map", Element::Int(1), Err(StorageError::IllegalIndexType)),
        ];

        for (key, index, expected) in cases {
            assert_eq!(
                store.get_at_index(key, &index),
                expected,
                "key={key} index={index:?}"
            );
        }
    }

    #[test]
    fn get_policy_is_shared_by_clones() {
        assert_eq!(Store::new().get_policy(), GetPolicy::Lenient);
        let store = Store::with_get_policy(GetPolicy::Strict);
        assert_eq!(store.clone().get_policy(), GetPolicy::Strict);
    }

    #[test]
    fn rejected_set_leaves_previous_entry() {
        let store = Store::new();
        store.set("k".into(), Element::from("v"), 0).unwrap();
        assert_eq!(
            store.set("k".into(), Element::UInt(u64::MAX), 0),
            Err(StorageError::InvalidValueType)
        );
        assert_eq!(store.get("k").unwrap().value, Value::String("v".into()));
    }

    #[test]
    fn set_tags_by_shape() {
        let store = Store::new();

        let entry = store.set("string".into(), Element::from("Something"), 0).unwrap();
        assert_eq!(entry.value, Value::String("Something".into()));
        assert_eq!(entry.expires_at, None);

        let items = vec![Element::Int(1), Element::Int(2), Element::from("a")];
        let entry = store
            .set("list".into(), Element::List(items.clone()), 0)
            .unwrap();
        assert_eq!(entry.value.as_list().unwrap(), items.as_slice());

        let entry = store
            .set("map".into(), map(&[("a", "str")]), 0)
            .unwrap();
        assert_eq!(entry.value.type_name(), "map");
    }

    #[test]
    fn set_rejects_shapeless_input() {
        let store = Store::new();
        assert_eq!(
            store.set("nil".into(), Element::Null, 0),
            Err(StorageError::InvalidValueType)
        );
        assert_eq!(
            store.set("err".into(), Element::Int(7), 0),
            Err(StorageError::InvalidValueType)
        );
        assert_eq!(
            store.set("err".into(), Element::Bool(false), 0),
            Err(StorageError::InvalidValueType)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn set_rejects_negative_ttl() {
        let store = Store::new();
        assert_eq!(
            store.set("k".into(), Element::from("v"), -1),
            Err(StorageError::InvalidTtl)
        );
        assert!(store.get("k").is_err());
    }

    #[test]
    fn set_replaces_existing_entry() {
        let store = Store::new();
        store.set("k".into(), list(&["a"]), 0).unwrap();
        store.set("k".into(), Element::from("s"), 0).unwrap();
        assert_eq!(store.get("k").unwrap().value, Value::String("s".into()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_missing_key() {
        let store = fixture();
        assert_eq!(store.get("invalid"), Err(StorageError::KeyNotFound));
        assert_eq!(
            store.get("str").map(|e| e.value),
            Err(StorageError::KeyNotFound)
        );
        assert_eq!(
            store.get("string").unwrap().value,
            Value::String("String".into())
        );
    }

    #[test]
    fn keys_lists_everything_live() {
        let store = fixture();
        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["list", "list2", "map", "string"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = fixture();
        assert!(!store.remove("invalid"));
        assert!(store.remove("string"));
        assert!(!store.remove("string"));
        assert!(store.remove("list"));
        assert!(store.remove("map"));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("list2").unwrap().value.as_list().unwrap().len(),
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_hidden_from_keys_and_index() {
        let store = Store::new();
        store.set("list".into(), list(&["a", "b"]), 50).unwrap();
        store.set("forever".into(), list(&["x"]), 0).unwrap();

        assert_eq!(
            store.get_at_index("list", &Element::Int(0)),
            Ok(Element::from("a"))
        );

        tokio::time::advance(Duration::from_millis(50)).await;

        assert_eq!(store.keys(), vec!["forever".to_string()]);
        assert_eq!(
            store.get_at_index("list", &Element::Int(0)),
            Err(StorageError::KeyNotFound)
        );
        // Expiração preguiçosa: a entrada continua no mapa.
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn lenient_get_returns_stale_entry() {
        let store = Store::new();
        store.set("k".into(), Element::from("v"), 10).unwrap();
        tokio::time::advance(Duration::from_millis(20)).await;

        let entry = store.get("k").unwrap();
        assert!(entry.is_expired());
        assert_eq!(entry.value, Value::String("v".into()));
        assert!(store.keys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn strict_get_hides_stale_entry() {
        let store = Store::with_get_policy(GetPolicy::Strict);
        store.set("k".into(), Element::from("v"), 10).unwrap();
        assert!(store.get("k").is_ok());

        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(store.get("k"), Err(StorageError::KeyNotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_revives_expired_key() {
        let store = Store::new();
        store.set("k".into(), Element::from("old"), 10).unwrap();
        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(store.keys().is_empty());

        store.set("k".into(), Element::from("new"), 0).unwrap();
        assert_eq!(store.keys(), vec!["k".to_string()]);
        assert!(!store.get("k").unwrap().is_expired());
    }

    #[test]
    fn clones_share_state() {
        let store = Store::new();
        let other = store.clone();
        other
            .set("k".into(), Element::Map(HashMap::new()), 0)
            .unwrap();
        assert_eq!(store.keys(), vec!["k".to_string()]);
    }

    #[test]
    fn concurrent_writers() {
        let store = Store::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store
                            .set(format!("k:{t}:{i}"), Element::from("v"), 0)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.keys().len(), 400);
    }
}
