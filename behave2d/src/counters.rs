use std::collections::BTreeMap;

/// Session-wide totals such as score or collected experience.
///
/// Missing counters read as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    values: BTreeMap<String, i64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> i64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    /// Add `delta` and return the new value.
    pub fn add(&mut self, name: &str, delta: i64) -> i64 {
        let value = self.values.entry(name.to_string()).or_insert(0);
        *value = value.saturating_add(delta);
        *value
    }

    /// Overwrite a counter, returning the previous value.
    pub fn set(&mut self, name: &str, value: i64) -> i64 {
        self.values.insert(name.to_string(), value).unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
