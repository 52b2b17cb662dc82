use crate::error::{PdfError, Result};
use crate::objects::{Object, ObjectCollection, Variant};

/// An ordered sequence of PDF values.
///
/// The array carries its own dirty and immutable flags; mutation flows
/// through the array's API so the flags stay truthful, and dirtiness of any
/// element makes the array dirty.
#[derive(Debug, Default)]
pub struct Array {
    items: Vec<Object>,
    dirty: bool,
    immutable: bool,
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            dirty: false,
            immutable: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Object> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.items.get_mut(index)
    }

    pub fn push(&mut self, value: impl Into<Object>) -> Result<()> {
        self.assert_mutable()?;
        self.items.push(value.into());
        self.dirty = true;
        Ok(())
    }

    pub fn insert(&mut self, index: usize, value: impl Into<Object>) -> Result<()> {
        self.assert_mutable()?;
        if index > self.items.len() {
            return Err(PdfError::ValueOutOfRange(format!(
                "insert at {} in array of {}",
                index,
                self.items.len()
            )));
        }
        self.items.insert(index, value.into());
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Object> {
        self.assert_mutable()?;
        if index >= self.items.len() {
            return Err(PdfError::ValueOutOfRange(format!(
                "remove at {} in array of {}",
                index,
                self.items.len()
            )));
        }
        self.dirty = true;
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) -> Result<()> {
        self.assert_mutable()?;
        if !self.items.is_empty() {
            self.items.clear();
            self.dirty = true;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.items.iter_mut()
    }

    /// The element at `index`, with a `Reference` element transparently
    /// resolved through `objects`. A dangling reference fails with
    /// `InvalidHandle`.
    pub fn find_at<'a>(
        &'a self,
        index: usize,
        objects: &'a ObjectCollection,
    ) -> Result<&'a Object> {
        let item = self.items.get(index).ok_or_else(|| {
            PdfError::ValueOutOfRange(format!(
                "index {} in array of {}",
                index,
                self.items.len()
            ))
        })?;
        match item.body()? {
            Variant::Reference(r) => objects
                .resolve(*r)
                .map(|indirect| indirect.object())
                .ok_or_else(|| PdfError::InvalidHandle(format!("unresolvable reference {}", r))),
            _ => Ok(item),
        }
    }

    /// Whether the array itself or any element is dirty.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.items.iter().any(|item| item.is_dirty())
    }

    /// Set the dirty flag; clearing propagates to all elements.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
        if !dirty {
            for item in &mut self.items {
                item.set_dirty(false);
            }
        }
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Set or clear the immutable flag on the array and all elements.
    pub fn set_immutable(&mut self, immutable: bool) {
        self.immutable = immutable;
        for item in &mut self.items {
            item.set_immutable(immutable);
        }
    }

    fn assert_mutable(&self) -> Result<()> {
        if self.immutable {
            Err(PdfError::ChangeOnImmutable)
        } else {
            Ok(())
        }
    }

    /// Element-wise deep comparison with early exit.
    pub fn equals(&self, other: &Array) -> Result<bool> {
        if self.items.len() != other.items.len() {
            return Ok(false);
        }
        for (a, b) in self.items.iter().zip(other.items.iter()) {
            if !a.equals(b)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Deep copy with clean flags.
    pub fn try_clone(&self) -> Result<Array> {
        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            items.push(item.try_clone()?);
        }
        Ok(Array {
            items,
            dirty: false,
            immutable: false,
        })
    }
}

impl From<Vec<Object>> for Array {
    fn from(items: Vec<Object>) -> Self {
        Self {
            items,
            dirty: false,
            immutable: false,
        }
    }
}

impl FromIterator<Object> for Array {
    fn from_iter<T: IntoIterator<Item = Object>>(iter: T) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}
