// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lazily generated per-key vectors.
//!
//! [`GeneratorMap::get`] hands out exactly one vector per key for the life
//! of the map. Lookups of known keys go through the `DashMap` shards only.
//! A miss takes the map's generation lock, looks again, and only then runs
//! the generator, so two threads racing on the same new key always end up
//! with the same `Arc`.

use std::{path::Path, sync::Arc};

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    atomic::AtomicVector,
    config::RandomIndexConfig,
    error::{check_lengths, Result, StoreError},
    generator::{RandomIndexGenerator, VectorGenerator},
    snapshot::{self, SnapshotKind},
    sync_compat::Mutex,
    vector::Vector,
};

/// Shared handle to a generated vector.
pub type SharedVector<V> = Arc<AtomicVector<V>>;

#[derive(Serialize)]
struct MapSnapshotRef<'a, V> {
    vector_length: usize,
    entries: Vec<(&'a str, &'a AtomicVector<V>)>,
}

#[derive(Deserialize)]
struct MapSnapshot<V> {
    vector_length: usize,
    entries: Vec<(String, V)>,
}

/// Key to vector map whose values are created by a [`VectorGenerator`] on
/// first access and never replaced.
///
/// ```
/// use semantic_store::{GeneratorMap, SparseVector};
///
/// let map = GeneratorMap::new(SparseVector::new, 10);
/// let first = map.get("cat");
/// first.set(3, 1.0).unwrap();
/// let second = map.get("cat");
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(second.get(3).unwrap(), 1.0);
/// ```
pub struct GeneratorMap<G: VectorGenerator> {
    generator: G,
    vector_length: usize,
    entries: DashMap<String, SharedVector<G::Vector>>,
    generation: Mutex<()>,
}

impl<G: VectorGenerator> GeneratorMap<G> {
    /// Map whose vectors are `vector_length` long.
    pub fn new(generator: G, vector_length: usize) -> Self {
        Self {
            generator,
            vector_length,
            entries: DashMap::new(),
            generation: Mutex::new(()),
        }
    }

    /// Vector for `key`, generating it if this is the first request.
    pub fn get(&self, key: &str) -> SharedVector<G::Vector> {
        if let Some(existing) = self.entries.get(key) {
            return Arc::clone(existing.value());
        }

        let _generation = self.generation.lock();
        // Someone may have generated it while we waited for the lock.
        if let Some(existing) = self.entries.get(key) {
            return Arc::clone(existing.value());
        }

        let vector = Arc::new(AtomicVector::new(
            self.generator.generate(self.vector_length),
        ));
        self.entries.insert(key.to_owned(), Arc::clone(&vector));
        tracing::trace!(key, length = self.vector_length, "generated vector");
        vector
    }

    /// Whether `key` already has a vector. Never generates one.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn vector_length(&self) -> usize {
        self.vector_length
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Keys with a generated vector, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort_unstable();
        keys
    }

    /// Drop the vector for `key`. A later [`get`](Self::get) generates a
    /// new one. Handles already given out stay valid.
    pub fn remove(&self, key: &str) -> Option<SharedVector<G::Vector>> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Vectors are owned by the generator; inserting one is not allowed.
    ///
    /// # Errors
    ///
    /// Always returns `Unsupported`.
    pub fn put(&self, _key: &str, _vector: G::Vector) -> Result<()> {
        Err(StoreError::Unsupported("put on a generator map"))
    }

    /// # Errors
    ///
    /// Always returns `Unsupported`.
    pub fn put_all<I>(&self, _entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, G::Vector)>,
    {
        Err(StoreError::Unsupported("put_all on a generator map"))
    }

    /// Write every generated vector to `path`.
    ///
    /// Meant for checkpointing between runs; writers running at the same
    /// time may or may not be captured.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if the file cannot be written.
    pub fn save_map<P: AsRef<Path>>(&self, path: P) -> Result<()>
    where
        G::Vector: Serialize,
    {
        let mut handles: Vec<(String, SharedVector<G::Vector>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        handles.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let body = MapSnapshotRef {
            vector_length: self.vector_length,
            entries: handles.iter().map(|(k, v)| (k.as_str(), &**v)).collect(),
        };
        snapshot::write(
            path,
            SnapshotKind::GeneratorMap,
            body.entries.len() as u64,
            &body,
        )?;
        Ok(())
    }

    /// Restore a map saved by [`save_map`](Self::save_map). Keys missing
    /// from the file are generated by `generator` as usual.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if the file is missing or malformed, and
    /// `DimensionMismatch` if a stored vector has the wrong length.
    pub fn load_map<P: AsRef<Path>>(path: P, generator: G) -> Result<Self>
    where
        G::Vector: DeserializeOwned,
    {
        let (header, body): (_, MapSnapshot<G::Vector>) =
            snapshot::read(path, SnapshotKind::GeneratorMap)?;
        header.check_entry_count(body.entries.len())?;
        let map = Self::new(generator, body.vector_length);
        for (key, vector) in body.entries {
            check_lengths(body.vector_length, vector.length())?;
            map.entries.insert(key, Arc::new(AtomicVector::new(vector)));
        }
        Ok(map)
    }
}

impl GeneratorMap<RandomIndexGenerator> {
    /// Map of random index vectors of `config.vector_length`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn random_index(config: RandomIndexConfig) -> Result<Self> {
        let length = config.vector_length;
        Ok(Self::new(RandomIndexGenerator::new(config)?, length))
    }
}

impl<G: VectorGenerator> std::fmt::Debug for GeneratorMap<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorMap")
            .field("vector_length", &self.vector_length)
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}
