use crate::error::{PdfError, Result};
use crate::objects::{IndirectObject, Object, Reference, Variant};
use std::collections::HashMap;

/// The owner of all indirect objects of a document.
///
/// Allocates fresh references with a monotonically growing object number,
/// keeps insertion order for deterministic serialization, and is the single
/// source of truth for dereferencing.
#[derive(Debug, Default)]
pub struct ObjectCollection {
    objects: Vec<IndirectObject>,
    index: HashMap<Reference, usize>,
    next_number: u32,
}

impl ObjectCollection {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            index: HashMap::new(),
            next_number: 1,
        }
    }

    /// Allocate a fresh reference (generation 0) without inserting an
    /// object. Numbers are never reused.
    pub fn allocate(&mut self) -> Reference {
        let reference = Reference::new(self.next_number, 0);
        self.next_number += 1;
        reference
    }

    /// Create an indirect object from `value` under a freshly allocated
    /// reference, returning that reference.
    pub fn create(&mut self, value: impl Into<Variant>) -> Reference {
        let reference = self.allocate();
        let indirect = IndirectObject::new(reference, Object::new(value.into()));
        self.index.insert(reference, self.objects.len());
        self.objects.push(indirect);
        reference
    }

    /// Adopt an externally built indirect object. Its reference must not
    /// collide with an owned object.
    pub fn insert(&mut self, object: IndirectObject) -> Result<()> {
        let reference = object.reference();
        if self.index.contains_key(&reference) {
            return Err(PdfError::InternalLogic(format!(
                "duplicate indirect object {}",
                reference
            )));
        }
        if reference.number() >= self.next_number {
            self.next_number = reference.number() + 1;
        }
        self.index.insert(reference, self.objects.len());
        self.objects.push(object);
        Ok(())
    }

    pub fn resolve(&self, reference: Reference) -> Option<&IndirectObject> {
        self.index
            .get(&reference)
            .and_then(|&slot| self.objects.get(slot))
    }

    pub fn resolve_mut(&mut self, reference: Reference) -> Option<&mut IndirectObject> {
        match self.index.get(&reference) {
            Some(&slot) => self.objects.get_mut(slot),
            None => None,
        }
    }

    pub fn contains(&self, reference: Reference) -> bool {
        self.index.contains_key(&reference)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &IndirectObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut IndirectObject> {
        self.objects.iter_mut()
    }

    /// The highest owned object number, for cross-reference sizing.
    pub fn max_number(&self) -> u32 {
        self.objects
            .iter()
            .map(|o| o.reference().number())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_allocates_monotonically() {
        let mut objects = ObjectCollection::new();
        let a = objects.create(Variant::Integer(1));
        let b = objects.create(Variant::Integer(2));

        assert_eq!(a, Reference::new(1, 0));
        assert_eq!(b, Reference::new(2, 0));
        assert_eq!(objects.len(), 2);
        assert_eq!(objects.max_number(), 2);
    }

    #[test]
    fn test_resolve() {
        let mut objects = ObjectCollection::new();
        let r = objects.create(Variant::from("value"));

        let found = objects.resolve(r).unwrap();
        assert_eq!(found.object().as_string().unwrap().as_bytes(), b"value");

        assert!(objects.resolve(Reference::new(99, 0)).is_none());
        assert!(objects.resolve(Reference::new(r.number(), 1)).is_none());
    }

    #[test]
    fn test_resolve_mut() {
        let mut objects = ObjectCollection::new();
        let r = objects.create(Variant::Integer(1));

        objects.resolve_mut(r).unwrap().set_integer(2).unwrap();
        assert_eq!(objects.resolve(r).unwrap().object().as_integer().unwrap(), 2);
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut objects = ObjectCollection::new();
        let r = objects.create(Variant::Integer(1));

        let duplicate = IndirectObject::new(r, Object::from(2i64));
        assert!(matches!(
            objects.insert(duplicate),
            Err(PdfError::InternalLogic(_))
        ));
    }

    #[test]
    fn test_insert_adopts_numbering() {
        let mut objects = ObjectCollection::new();
        objects
            .insert(IndirectObject::new(Reference::new(7, 0), Object::from(1i64)))
            .unwrap();

        // Fresh allocations continue past the adopted number.
        let next = objects.create(Variant::Integer(2));
        assert_eq!(next, Reference::new(8, 0));
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let mut objects = ObjectCollection::new();
        objects
            .insert(IndirectObject::new(Reference::new(5, 0), Object::from(5i64)))
            .unwrap();
        objects
            .insert(IndirectObject::new(Reference::new(2, 0), Object::from(2i64)))
            .unwrap();

        let numbers: Vec<u32> = objects.iter().map(|o| o.reference().number()).collect();
        assert_eq!(numbers, vec![5, 2]);
    }

    #[test]
    fn test_allocate_never_reuses() {
        let mut objects = ObjectCollection::new();
        let a = objects.allocate();
        let b = objects.allocate();
        assert_ne!(a, b);
        assert_eq!(b.number(), a.number() + 1);
    }
}
