//! # pdforge
//!
//! The core of a PDF manipulation library: the PDF object model, a
//! byte-exact serializer, and a TrueType/OpenType font subsetter.
//!
//! ## Features
//!
//! - **Object model**: the eight primitive PDF data types, heterogeneous
//!   arrays and sorted dictionaries, unified under a variant with dirty,
//!   immutable and delayed-load bookkeeping
//! - **Indirect objects**: identities, streams with filter chains, and a
//!   collection that allocates references and resolves them
//! - **Serialization**: compact and clean write modes producing output any
//!   conforming PDF consumer reads back
//! - **Parsing**: a variant-level parser covering every serializable value
//! - **Font subsetting**: glyph closure over compound glyphs, renumbering,
//!   and checksum-correct TrueType output suitable for CIDFont embedding
//!
//! ## Quick Start
//!
//! ```rust
//! use pdforge::{Dictionary, Name, Object, WriteMode, object_to_bytes, Result};
//!
//! # fn main() -> Result<()> {
//! let mut page = Dictionary::new();
//! page.insert("Type", Name::from("Page"))?;
//! page.insert("Rotate", 90i64)?;
//!
//! let bytes = object_to_bytes(&Object::from(page), WriteMode::COMPACT)?;
//! assert_eq!(bytes, b"<</Type/Page/Rotate 90>>");
//! # Ok(())
//! # }
//! ```
//!
//! Subsetting a font:
//!
//! ```rust,no_run
//! use pdforge::io::MemoryInputDevice;
//! use pdforge::fonts::TrueTypeSubsetter;
//!
//! # fn main() -> pdforge::Result<()> {
//! let font_program = std::fs::read("font.ttf")?;
//! let mut device = MemoryInputDevice::new(font_program);
//! let subset = TrueTypeSubsetter::build_subset(&mut device, &[17, 42])?;
//! # Ok(())
//! # }
//! ```

pub mod encryption;
pub mod error;
pub mod fonts;
pub mod io;
pub mod objects;
pub mod parser;
pub mod writer;

pub use encryption::{Encrypt, EncryptContext};
pub use error::{PdfError, Result};
pub use objects::{
    Array, DataKind, Dictionary, IndirectObject, Name, Object, ObjectCollection, PdfString,
    Reference, Stream, Variant,
};
pub use parser::parse_object;
pub use writer::{object_to_bytes, PdfWriter, WriteMode};
