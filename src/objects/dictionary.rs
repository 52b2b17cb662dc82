use crate::error::{PdfError, Result};
use crate::objects::{DataKind, Name, Object, ObjectCollection, Reference, Variant};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// An ordered mapping from [`Name`] to PDF values.
///
/// Keys are stored sorted by raw bytes, which gives deterministic iteration,
/// O(log n) lookup, and lockstep equality. Empty names are legal keys. The
/// dictionary carries its own dirty and immutable flags, like [`Array`].
///
/// [`Array`]: crate::objects::Array
#[derive(Debug, Default)]
pub struct Dictionary {
    entries: BTreeMap<Name, Object>,
    dirty: bool,
    immutable: bool,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the value under `key`, returning a reference to the
    /// stored value.
    pub fn insert(
        &mut self,
        key: impl Into<Name>,
        value: impl Into<Object>,
    ) -> Result<&mut Object> {
        self.assert_mutable()?;
        self.dirty = true;
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(value.into());
                Ok(occupied.into_mut())
            }
            Entry::Vacant(vacant) => Ok(vacant.insert(value.into())),
        }
    }

    /// Remove the value under `key`. Returns whether a value was removed.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Result<bool> {
        self.assert_mutable()?;
        let removed = self.entries.remove(key.as_ref()).is_some();
        if removed {
            self.dirty = true;
        }
        Ok(removed)
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Object> {
        self.entries.get(key.as_ref())
    }

    pub fn get_mut(&mut self, key: impl AsRef<[u8]>) -> Option<&mut Object> {
        self.entries.get_mut(key.as_ref())
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.entries.contains_key(key.as_ref())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.assert_mutable()?;
        if !self.entries.is_empty() {
            self.entries.clear();
            self.dirty = true;
        }
        Ok(())
    }

    /// Entries in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Name, &mut Object)> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.entries.keys()
    }

    /// The value under `key`, with a `Reference` value transparently
    /// resolved through `objects`. `Ok(None)` when the key is absent; a
    /// dangling reference fails with `InvalidHandle`.
    pub fn find<'a>(
        &'a self,
        key: impl AsRef<[u8]>,
        objects: &'a ObjectCollection,
    ) -> Result<Option<&'a Object>> {
        let value = match self.get(key) {
            Some(value) => value,
            None => return Ok(None),
        };
        match value.body()? {
            Variant::Reference(r) => objects
                .resolve(*r)
                .map(|indirect| Some(indirect.object()))
                .ok_or_else(|| PdfError::InvalidHandle(format!("unresolvable reference {}", r))),
            _ => Ok(Some(value)),
        }
    }

    /// Like [`find`], but when `key` is absent the `/Parent` chain is walked
    /// upward, as page-tree attribute inheritance requires. Reference cycles
    /// in the chain terminate the walk.
    ///
    /// [`find`]: Dictionary::find
    pub fn find_with_parent<'a>(
        &'a self,
        key: impl AsRef<[u8]>,
        objects: &'a ObjectCollection,
    ) -> Result<Option<&'a Object>> {
        let key = key.as_ref();
        let mut visited: Vec<Reference> = Vec::new();
        let mut current = self;
        loop {
            if let Some(found) = current.find(key, objects)? {
                return Ok(Some(found));
            }
            let parent = match current.get("Parent") {
                Some(parent) => parent,
                None => return Ok(None),
            };
            let parent_object = match parent.body()? {
                Variant::Reference(r) => {
                    if visited.contains(r) {
                        return Ok(None);
                    }
                    visited.push(*r);
                    objects
                        .resolve(*r)
                        .map(|indirect| indirect.object())
                        .ok_or_else(|| {
                            PdfError::InvalidHandle(format!("unresolvable reference {}", r))
                        })?
                }
                Variant::Dictionary(_) => parent,
                _ => return Ok(None),
            };
            current = match parent_object.body()? {
                Variant::Dictionary(d) => d,
                _ => return Ok(None),
            };
        }
    }

    // Typed convenience getters with defaults.

    pub fn get_integer_or(&self, key: impl AsRef<[u8]>, default: i64) -> i64 {
        self.get(key)
            .and_then(|o| match o.kind() {
                Ok(DataKind::Integer) => o.as_integer().ok(),
                _ => None,
            })
            .unwrap_or(default)
    }

    pub fn get_real_or(&self, key: impl AsRef<[u8]>, default: f64) -> f64 {
        self.get(key)
            .and_then(|o| match o.kind() {
                Ok(DataKind::Integer) | Ok(DataKind::Real) => o.as_real().ok(),
                _ => None,
            })
            .unwrap_or(default)
    }

    pub fn get_bool_or(&self, key: impl AsRef<[u8]>, default: bool) -> bool {
        self.get(key)
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(default)
    }

    /// The name under `key`, or the empty name when absent or of another
    /// kind.
    pub fn get_name_or_default(&self, key: impl AsRef<[u8]>) -> Name {
        self.get(key)
            .and_then(|o| o.as_name().ok().cloned())
            .unwrap_or_default()
    }

    /// Whether the dictionary itself or any value is dirty.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.entries.values().any(|value| value.is_dirty())
    }

    /// Set the dirty flag; clearing propagates to all values.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
        if !dirty {
            for value in self.entries.values_mut() {
                value.set_dirty(false);
            }
        }
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Set or clear the immutable flag on the dictionary and all values.
    pub fn set_immutable(&mut self, immutable: bool) {
        self.immutable = immutable;
        for value in self.entries.values_mut() {
            value.set_immutable(immutable);
        }
    }

    fn assert_mutable(&self) -> Result<()> {
        if self.immutable {
            Err(PdfError::ChangeOnImmutable)
        } else {
            Ok(())
        }
    }

    /// Lockstep comparison over both sorted maps, exiting on the first
    /// difference.
    pub fn equals(&self, other: &Dictionary) -> Result<bool> {
        if self.entries.len() != other.entries.len() {
            return Ok(false);
        }
        for ((key_a, value_a), (key_b, value_b)) in self.entries.iter().zip(other.entries.iter()) {
            if key_a != key_b {
                return Ok(false);
            }
            if !value_a.equals(value_b)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Deep copy with clean flags.
    pub fn try_clone(&self) -> Result<Dictionary> {
        let mut entries = BTreeMap::new();
        for (key, value) in &self.entries {
            entries.insert(key.clone(), value.try_clone()?);
        }
        Ok(Dictionary {
            entries,
            dirty: false,
            immutable: false,
        })
    }
}

impl FromIterator<(Name, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Name, Object)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            dirty: false,
            immutable: false,
        }
    }
}
