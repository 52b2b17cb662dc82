use crate::error::{PdfError, Result};
use crate::objects::{Array, DataKind, Dictionary, Name, PdfString, Reference, Variant};
use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;

/// A delayed-load hook: materializes the value body on first access.
pub type DelayedLoader = Box<dyn FnOnce() -> Result<Variant>>;

/// A PDF value: a [`Variant`] body plus the dirty and immutable bookkeeping
/// and an optional delayed-load hook.
///
/// The body is materialized at most once. Every accessor and mutator runs
/// the hook first if it has not run yet; a reentrant load on the same value
/// is a caller error and fails with `InternalLogic`. An `Object` constructed
/// with a hook whose hook has failed (or that was never given a body at all)
/// reports `InvalidHandle` on access.
///
/// `dirty` is set by every successful mutation; for container bodies it also
/// reflects the dirtiness of any child. `immutable` forbids mutation of the
/// value and, once propagated, of its descendants.
pub struct Object {
    body: OnceCell<Variant>,
    loader: RefCell<Option<DelayedLoader>>,
    loading: Cell<bool>,
    dirty: bool,
    immutable: bool,
}

impl Object {
    pub fn new(variant: Variant) -> Self {
        let body = OnceCell::new();
        // A freshly created cell accepts exactly one value.
        let _ = body.set(variant);
        Self {
            body,
            loader: RefCell::new(None),
            loading: Cell::new(false),
            dirty: false,
            immutable: false,
        }
    }

    /// An object whose body is produced by `loader` on first access.
    pub fn delayed(loader: DelayedLoader) -> Self {
        Self {
            body: OnceCell::new(),
            loader: RefCell::new(Some(loader)),
            loading: Cell::new(false),
            dirty: false,
            immutable: false,
        }
    }

    /// The data kind, materializing the body if needed.
    pub fn kind(&self) -> Result<DataKind> {
        Ok(self.body()?.kind())
    }

    /// The body, materializing it if needed. Runs the delayed-load hook at
    /// most once.
    pub(crate) fn body(&self) -> Result<&Variant> {
        if let Some(variant) = self.body.get() {
            return Ok(variant);
        }
        if self.loading.get() {
            return Err(PdfError::InternalLogic(
                "reentrant delayed load on the same object".to_string(),
            ));
        }
        let loader = self.loader.borrow_mut().take().ok_or_else(|| {
            PdfError::InvalidHandle("object has no value and no loader".to_string())
        })?;
        self.loading.set(true);
        let loaded = loader();
        self.loading.set(false);
        let variant = loaded?;
        let _ = self.body.set(variant);
        match self.body.get() {
            Some(variant) => Ok(variant),
            None => Err(PdfError::InternalLogic(
                "delayed load produced no body".to_string(),
            )),
        }
    }

    pub(crate) fn body_mut(&mut self) -> Result<&mut Variant> {
        self.body()?;
        match self.body.get_mut() {
            Some(variant) => Ok(variant),
            None => Err(PdfError::InternalLogic(
                "loaded body unavailable for mutation".to_string(),
            )),
        }
    }

    /// The body if it is already materialized. Never triggers the hook.
    pub(crate) fn loaded_body(&self) -> Option<&Variant> {
        self.body.get()
    }

    // Accessors. Kind mismatches fail with `InvalidDataType`; the numeric
    // accessors are lenient across Integer and Real.

    pub fn as_bool(&self) -> Result<bool> {
        match self.body()? {
            Variant::Bool(b) => Ok(*b),
            other => Err(mismatch("Bool", other.kind())),
        }
    }

    /// Integer value. A `Real` body converts by truncation toward zero;
    /// a magnitude that does not fit a signed 64-bit integer fails with
    /// `ValueOutOfRange`.
    pub fn as_integer(&self) -> Result<i64> {
        match self.body()? {
            Variant::Integer(i) => Ok(*i),
            Variant::Real(r) => real_to_integer(*r),
            other => Err(mismatch("Integer or Real", other.kind())),
        }
    }

    /// Real value. An `Integer` body converts.
    pub fn as_real(&self) -> Result<f64> {
        match self.body()? {
            Variant::Real(r) => Ok(*r),
            Variant::Integer(i) => Ok(*i as f64),
            other => Err(mismatch("Real or Integer", other.kind())),
        }
    }

    pub fn as_string(&self) -> Result<&PdfString> {
        match self.body()? {
            Variant::String(s) => Ok(s),
            other => Err(mismatch("String", other.kind())),
        }
    }

    pub fn as_name(&self) -> Result<&Name> {
        match self.body()? {
            Variant::Name(n) => Ok(n),
            other => Err(mismatch("Name", other.kind())),
        }
    }

    pub fn as_array(&self) -> Result<&Array> {
        match self.body()? {
            Variant::Array(a) => Ok(a),
            other => Err(mismatch("Array", other.kind())),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Array> {
        let found = self.kind()?;
        match self.body_mut()? {
            Variant::Array(a) => Ok(a),
            _ => Err(PdfError::InvalidDataType(format!(
                "expected Array, found {}",
                found.name()
            ))),
        }
    }

    pub fn as_dictionary(&self) -> Result<&Dictionary> {
        match self.body()? {
            Variant::Dictionary(d) => Ok(d),
            other => Err(mismatch("Dictionary", other.kind())),
        }
    }

    pub fn as_dictionary_mut(&mut self) -> Result<&mut Dictionary> {
        let found = self.kind()?;
        match self.body_mut()? {
            Variant::Dictionary(d) => Ok(d),
            _ => Err(PdfError::InvalidDataType(format!(
                "expected Dictionary, found {}",
                found.name()
            ))),
        }
    }

    pub fn as_reference(&self) -> Result<Reference> {
        match self.body()? {
            Variant::Reference(r) => Ok(*r),
            other => Err(mismatch("Reference", other.kind())),
        }
    }

    pub fn as_raw_data(&self) -> Result<&[u8]> {
        match self.body()? {
            Variant::RawData(d) => Ok(d),
            other => Err(mismatch("RawData", other.kind())),
        }
    }

    // Mutators. Each requires kind compatibility and mutability, and sets
    // the dirty flag.

    pub fn set_bool(&mut self, value: bool) -> Result<()> {
        self.assert_mutable()?;
        match self.body_mut()? {
            Variant::Bool(b) => *b = value,
            other => return Err(invalid_set("Bool", other.kind())),
        }
        self.dirty = true;
        Ok(())
    }

    /// Set the numeric value. On a `Real` body the integer is stored as a
    /// double.
    pub fn set_integer(&mut self, value: i64) -> Result<()> {
        self.assert_mutable()?;
        match self.body_mut()? {
            Variant::Integer(i) => *i = value,
            Variant::Real(r) => *r = value as f64,
            other => return Err(invalid_set("Integer or Real", other.kind())),
        }
        self.dirty = true;
        Ok(())
    }

    /// Set the numeric value. On an `Integer` body the real is stored
    /// truncated toward zero.
    pub fn set_real(&mut self, value: f64) -> Result<()> {
        self.assert_mutable()?;
        match self.body_mut()? {
            Variant::Real(r) => *r = value,
            Variant::Integer(i) => *i = real_to_integer(value)?,
            other => return Err(invalid_set("Real or Integer", other.kind())),
        }
        self.dirty = true;
        Ok(())
    }

    /// Replace the string. The new value's hex flag must match the body's.
    pub fn set_string(&mut self, value: PdfString) -> Result<()> {
        self.assert_mutable()?;
        match self.body_mut()? {
            Variant::String(s) if s.is_hex() == value.is_hex() => *s = value,
            Variant::String(s) => {
                let expected = if s.is_hex() { "HexString" } else { "String" };
                return Err(PdfError::InvalidDataType(format!(
                    "cannot set a {} value on a {} object",
                    if value.is_hex() { "HexString" } else { "String" },
                    expected
                )));
            }
            other => return Err(invalid_set("String", other.kind())),
        }
        self.dirty = true;
        Ok(())
    }

    pub fn set_name(&mut self, value: Name) -> Result<()> {
        self.assert_mutable()?;
        match self.body_mut()? {
            Variant::Name(n) => *n = value,
            other => return Err(invalid_set("Name", other.kind())),
        }
        self.dirty = true;
        Ok(())
    }

    pub fn set_reference(&mut self, value: Reference) -> Result<()> {
        self.assert_mutable()?;
        match self.body_mut()? {
            Variant::Reference(r) => *r = value,
            other => return Err(invalid_set("Reference", other.kind())),
        }
        self.dirty = true;
        Ok(())
    }

    // Dirty and immutable bookkeeping.

    /// Whether this value or, for container bodies, any child has been
    /// mutated. Never triggers a delayed load.
    pub fn is_dirty(&self) -> bool {
        if self.dirty {
            return true;
        }
        match self.loaded_body() {
            Some(Variant::Array(a)) => a.is_dirty(),
            Some(Variant::Dictionary(d)) => d.is_dirty(),
            _ => false,
        }
    }

    /// Set the dirty flag. Clearing propagates into Array and Dictionary
    /// children; setting affects only this value.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
        if !dirty {
            match self.body.get_mut() {
                Some(Variant::Array(a)) => a.set_dirty(false),
                Some(Variant::Dictionary(d)) => d.set_dirty(false),
                _ => {}
            }
        }
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Set or clear the immutable flag, propagating into container
    /// children.
    pub fn set_immutable(&mut self, immutable: bool) {
        self.immutable = immutable;
        match self.body.get_mut() {
            Some(Variant::Array(a)) => a.set_immutable(immutable),
            Some(Variant::Dictionary(d)) => d.set_immutable(immutable),
            _ => {}
        }
    }

    pub(crate) fn assert_mutable(&self) -> Result<()> {
        if self.immutable {
            Err(PdfError::ChangeOnImmutable)
        } else {
            Ok(())
        }
    }

    /// Deep comparison. The comparison is driven by this value's kind; a
    /// kind mismatch yields `false`, with Integer and Real comparing through
    /// the lenient numeric accessors. Comparing a `RawData` value fails with
    /// `InvalidDataType`. Both sides are materialized.
    pub fn equals(&self, other: &Object) -> Result<bool> {
        match self.body()? {
            Variant::Null => Ok(matches!(other.body()?, Variant::Null)),
            Variant::Bool(b) => match mismatch_is_false(other.as_bool())? {
                Some(o) => Ok(*b == o),
                None => Ok(false),
            },
            Variant::Integer(_) => {
                let value = self.as_integer()?;
                match mismatch_is_false(other.as_integer())? {
                    Some(o) => Ok(value == o),
                    None => Ok(false),
                }
            }
            Variant::Real(_) => {
                let value = self.as_real()?;
                match mismatch_is_false(other.as_real())? {
                    Some(o) => Ok(value == o),
                    None => Ok(false),
                }
            }
            Variant::String(s) => match mismatch_is_false(other.as_string())? {
                Some(o) => Ok(s == o),
                None => Ok(false),
            },
            Variant::Name(n) => match mismatch_is_false(other.as_name())? {
                Some(o) => Ok(n == o),
                None => Ok(false),
            },
            Variant::Array(a) => match mismatch_is_false(other.as_array())? {
                Some(o) => a.equals(o),
                None => Ok(false),
            },
            Variant::Dictionary(d) => match mismatch_is_false(other.as_dictionary())? {
                Some(o) => d.equals(o),
                None => Ok(false),
            },
            Variant::Reference(r) => match mismatch_is_false(other.as_reference())? {
                Some(o) => Ok(*r == o),
                None => Ok(false),
            },
            Variant::RawData(_) => Err(PdfError::InvalidDataType(
                "cannot compare a RawData value".to_string(),
            )),
        }
    }

    /// Deep copy. Materializes the body first; the copy is clean and
    /// mutable.
    pub fn try_clone(&self) -> Result<Object> {
        Ok(Object::new(self.body()?.try_clone()?))
    }
}

fn real_to_integer(value: f64) -> Result<i64> {
    // 2^63 as f64; the truncated value must lie in [-2^63, 2^63).
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    let truncated = value.trunc();
    if truncated >= -BOUND && truncated < BOUND {
        Ok(truncated as i64)
    } else {
        Err(PdfError::ValueOutOfRange(format!(
            "{} does not fit a 64-bit integer",
            value
        )))
    }
}

fn mismatch(expected: &str, found: DataKind) -> PdfError {
    PdfError::InvalidDataType(format!("expected {}, found {}", expected, found.name()))
}

fn invalid_set(expected: &str, found: DataKind) -> PdfError {
    PdfError::InvalidDataType(format!(
        "cannot set {} on a {} object",
        expected,
        found.name()
    ))
}

/// Collapse a kind mismatch into `None`; any other error propagates.
fn mismatch_is_false<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(PdfError::InvalidDataType(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl From<Variant> for Object {
    fn from(variant: Variant) -> Self {
        Object::new(variant)
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::new(Variant::from(value))
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Object::new(Variant::from(value))
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::new(Variant::from(value))
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Object::new(Variant::from(value))
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Object::new(Variant::from(value))
    }
}

impl From<PdfString> for Object {
    fn from(value: PdfString) -> Self {
        Object::new(Variant::from(value))
    }
}

impl From<Name> for Object {
    fn from(value: Name) -> Self {
        Object::new(Variant::from(value))
    }
}

impl From<Array> for Object {
    fn from(value: Array) -> Self {
        Object::new(Variant::from(value))
    }
}

impl From<Dictionary> for Object {
    fn from(value: Dictionary) -> Self {
        Object::new(Variant::from(value))
    }
}

impl From<Reference> for Object {
    fn from(value: Reference) -> Self {
        Object::new(Variant::from(value))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Object");
        match self.loaded_body() {
            Some(body) => s.field("body", body),
            None => s.field("body", &"<delayed>"),
        };
        s.field("dirty", &self.dirty)
            .field("immutable", &self.immutable)
            .finish()
    }
}
