//! The encryption capability consumed by the writer.
//!
//! The writer transforms string and stream content through an [`Encrypt`]
//! implementation when one is supplied; each indirect object's content is
//! keyed by that object's reference. The encryption algorithms themselves
//! live outside this crate.

use crate::error::Result;
use crate::objects::Reference;

/// Encrypts the content bytes of strings and streams.
pub trait Encrypt {
    /// Transform `data` for the indirect object identified by `reference`.
    fn encrypt(&self, data: &[u8], reference: Reference) -> Result<Vec<u8>>;
}

/// An encryptor bound to the indirect object currently being written.
#[derive(Clone, Copy)]
pub struct EncryptContext<'a> {
    encrypt: &'a dyn Encrypt,
    reference: Reference,
}

impl<'a> EncryptContext<'a> {
    pub fn new(encrypt: &'a dyn Encrypt, reference: Reference) -> Self {
        Self { encrypt, reference }
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.encrypt.encrypt(data, self.reference)
    }

    pub fn reference(&self) -> Reference {
        self.reference
    }
}
