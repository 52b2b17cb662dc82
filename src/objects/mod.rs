//! The PDF object model: primitive data types, their variant, the
//! containers, and the indirect-object layer.

mod array;
mod collection;
mod dictionary;
mod indirect;
mod name;
mod object;
mod reference;
mod stream;
mod string;
mod variant;

pub use array::Array;
pub use collection::ObjectCollection;
pub use dictionary::Dictionary;
pub use indirect::IndirectObject;
pub use name::Name;
pub use object::{DelayedLoader, Object};
pub use reference::Reference;
pub use stream::Stream;
pub use string::PdfString;
pub use variant::{DataKind, Variant};
