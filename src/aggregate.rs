use ahash::RandomState;
use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
}

impl Aggregate {
    #[inline]
    pub fn new(value: f64) -> Self {
        Aggregate { min: value, max: value, sum: value, count: 1 }
    }

    #[inline]
    pub fn observe(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    #[inline]
    pub fn combine(&mut self, other: &Aggregate) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Key to aggregate mapping. Used both for one worker's local table and for
/// the merged global table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: HashMap<Box<str>, Aggregate, RandomState>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn observe(&mut self, key: &str, value: f64) {
        match self.entries.get_mut(key) {
            Some(entry) => entry.observe(value),
            None => {
                self.entries.insert(key.into(), Aggregate::new(value));
            }
        }
    }

    /// Folds one aggregate into the entry for `key`, taking ownership of the
    /// key only when the entry is new.
    #[inline]
    pub fn absorb(&mut self, key: Box<str>, aggregate: Aggregate) {
        self.entries
            .entry(key)
            .and_modify(|e| e.combine(&aggregate))
            .or_insert(aggregate);
    }

    pub fn get(&self, key: &str) -> Option<&Aggregate> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of observations across every key.
    pub fn observations(&self) -> u64 {
        self.entries.values().map(|a| a.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Aggregate)> {
        self.entries.iter().map(|(k, v)| (&**k, v))
    }
}

impl IntoIterator for Table {
    type Item = (Box<str>, Aggregate);
    type IntoIter = hashbrown::hash_map::IntoIter<Box<str>, Aggregate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

pub type LocalTable = Table;
pub type GlobalTable = Table;
