use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

/// Mutable key/value context shared by the units of one group run.
///
/// Clones are handles to the same map. Use [`SharedContext::fork`] to hand a
/// nested group its own copy seeded with the current values.
#[derive(Clone, Default)]
pub struct SharedContext {
    values: Arc<Mutex<Map<String, Value>>>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.lock().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Shallow copy: later writes on either side are not visible to the other.
    pub fn fork(&self) -> Self {
        Self {
            values: Arc::new(Mutex::new(self.lock().clone())),
        }
    }

    pub fn snapshot(&self) -> Value {
        Value::Object(self.lock().clone())
    }

    /// Whether both handles point at the same map.
    pub fn same_as(&self, other: &SharedContext) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedContext").field(&self.snapshot()).finish()
    }
}
