use std::collections::HashMap;

use crate::variable::UniformKey;

/// Insertion-ordered map keyed by `(name, variant)`.
///
/// Lookups go through a hash index; iteration follows insertion order so saves and pushes are
/// stable.
#[derive(Debug, Clone)]
pub struct KeyedSet<T> {
    entries: Vec<(UniformKey, T)>,
    index: HashMap<UniformKey, usize>,
}

impl<T> Default for KeyedSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> KeyedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &UniformKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &UniformKey) -> Option<&T> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &UniformKey) -> Option<&mut T> {
        let i = *self.index.get(key)?;
        Some(&mut self.entries[i].1)
    }

    /// Insert or replace. A replaced entry keeps its position.
    pub fn insert(&mut self, key: UniformKey, item: T) -> Option<T> {
        if let Some(&i) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[i].1, item));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, item));
        None
    }

    pub fn remove(&mut self, key: &UniformKey) -> Option<T> {
        let i = self.index.remove(key)?;
        let (_, item) = self.entries.remove(i);
        for (k, _) in &self.entries[i..] {
            if let Some(slot) = self.index.get_mut(k) {
                *slot -= 1;
            }
        }
        Some(item)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UniformKey, &T)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&UniformKey, &mut T)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    /// Remove everything, yielding entries in order.
    pub fn drain(&mut self) -> Vec<(UniformKey, T)> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }
}
