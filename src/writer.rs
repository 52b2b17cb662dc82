//! Byte-exact serialization of PDF values, indirect objects and whole
//! object collections.
//!
//! Two write modes exist as an independent bitfield. `COMPACT` omits every
//! byte of optional whitespace: a token that opens with a regular character
//! (booleans, `null`, numbers, references) is preceded by a single space
//! only when the previously emitted byte is itself a regular character and
//! the two tokens would otherwise concatenate. Tokens that open with a
//! delimiter (`/`, `(`, `<`, `[`, `<<`) never need one. `CLEAN`
//! pretty-prints dictionaries one entry per line.

use crate::encryption::{Encrypt, EncryptContext};
use crate::error::{PdfError, Result};
use crate::io::OutputDevice;
use crate::objects::{
    Array, Dictionary, IndirectObject, Name, Object, ObjectCollection, PdfString, Reference,
    Variant,
};
use bitflags::bitflags;
use std::io::Write;

bitflags! {
    /// Serialization mode bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WriteMode: u32 {
        /// Pretty-print with newlines after dictionary entries.
        const CLEAN = 0x01;
        /// Omit all optional whitespace.
        const COMPACT = 0x02;
    }
}

/// Serializes values to a byte sink.
///
/// The writer is stateless across objects; within one write it tracks the
/// last emitted byte to decide compact-mode token separation.
pub struct PdfWriter<W: Write> {
    device: OutputDevice<W>,
    mode: WriteMode,
}

impl<W: Write> PdfWriter<W> {
    pub fn new(sink: W, mode: WriteMode) -> Self {
        Self {
            device: OutputDevice::new(sink),
            mode,
        }
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.device.position()
    }

    pub fn into_inner(self) -> W {
        self.device.into_inner()
    }

    /// Serialize a single value.
    pub fn write_object(&mut self, object: &Object, encrypt: Option<&EncryptContext>) -> Result<()> {
        self.write_body(object, encrypt, None)
    }

    fn write_body(
        &mut self,
        object: &Object,
        encrypt: Option<&EncryptContext>,
        key_stop: Option<&Name>,
    ) -> Result<()> {
        match object.body()? {
            Variant::Null => self.write_token(b"null"),
            Variant::Bool(true) => self.write_token(b"true"),
            Variant::Bool(false) => self.write_token(b"false"),
            Variant::Integer(i) => self.write_token(i.to_string().as_bytes()),
            Variant::Real(r) => self.write_real(*r),
            Variant::String(s) => self.write_string(s, encrypt),
            Variant::Name(n) => self.write_name(n),
            Variant::Array(a) => self.write_array(a, encrypt),
            Variant::Dictionary(d) => self.write_dictionary(d, encrypt, key_stop),
            Variant::Reference(r) => self.write_reference(*r),
            Variant::RawData(data) => self.device.write_all(data),
        }
    }

    /// Emit a token that opens with a regular character, separating it from
    /// a preceding regular character when needed.
    fn write_token(&mut self, token: &[u8]) -> Result<()> {
        if let Some(last) = self.device.last_byte() {
            if is_regular_char(last) {
                self.device.write_all(b" ")?;
            }
        }
        self.device.write_all(token)
    }

    fn write_real(&mut self, value: f64) -> Result<()> {
        // Fixed-point, C locale. Compact mode drops trailing zeros and a
        // bare trailing point; a result that trims away entirely becomes 0.
        let formatted = format!("{:.6}", value);
        if self.mode.contains(WriteMode::COMPACT) && formatted.contains('.') {
            let trimmed = formatted.trim_end_matches('0');
            let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
            if trimmed.is_empty() {
                return self.write_token(b"0");
            }
            return self.write_token(trimmed.as_bytes());
        }
        self.write_token(formatted.as_bytes())
    }

    pub(crate) fn write_name(&mut self, name: &Name) -> Result<()> {
        self.device.write_all(b"/")?;
        self.device.write_all(&name.escaped())
    }

    fn write_string(
        &mut self,
        string: &PdfString,
        encrypt: Option<&EncryptContext>,
    ) -> Result<()> {
        let bytes = match encrypt {
            Some(context) => context.encrypt(string.as_bytes())?,
            None => string.as_bytes().to_vec(),
        };
        if string.is_hex() {
            self.device.write_all(b"<")?;
            self.device.write_all(&PdfString::escaped_hex(&bytes))?;
            self.device.write_all(b">")
        } else {
            self.device.write_all(b"(")?;
            self.device.write_all(&PdfString::escaped_literal(&bytes))?;
            self.device.write_all(b")")
        }
    }

    fn write_reference(&mut self, reference: Reference) -> Result<()> {
        self.write_token(
            format!("{} {} R", reference.number(), reference.generation()).as_bytes(),
        )
    }

    fn write_array(&mut self, array: &Array, encrypt: Option<&EncryptContext>) -> Result<()> {
        let clean = self.mode.contains(WriteMode::CLEAN);
        let open: &[u8] = if clean { b"[ " } else { b"[" };
        self.device.write_all(open)?;
        for item in array.iter() {
            self.write_body(item, encrypt, None)?;
            if clean {
                self.device.write_all(b" ")?;
            }
        }
        self.device.write_all(b"]")
    }

    /// Serialize a dictionary. `/Type` is written first when present; the
    /// remaining keys follow in sorted order. When `key_stop` is given,
    /// emission halts (without the closing `>>`) upon reaching that key;
    /// the trailer writer uses this to stop before a self-referential entry.
    pub fn write_dictionary(
        &mut self,
        dictionary: &Dictionary,
        encrypt: Option<&EncryptContext>,
        key_stop: Option<&Name>,
    ) -> Result<()> {
        self.write_dictionary_entries(dictionary, encrypt, key_stop, None)
    }

    fn write_dictionary_entries(
        &mut self,
        dictionary: &Dictionary,
        encrypt: Option<&EncryptContext>,
        key_stop: Option<&Name>,
        length_override: Option<i64>,
    ) -> Result<()> {
        let clean = self.mode.contains(WriteMode::CLEAN);
        let type_key = Name::from("Type");
        let length_key = Name::from("Length");

        let open: &[u8] = if clean { b"<<\n" } else { b"<<" };
        self.device.write_all(open)?;

        if key_stop == Some(&type_key) {
            return Ok(());
        }

        if let Some(type_value) = dictionary.get("Type") {
            self.write_name(&type_key)?;
            if clean {
                self.device.write_all(b" ")?;
            }
            self.write_body(type_value, encrypt, None)?;
            if clean {
                self.device.write_all(b"\n")?;
            }
        }

        let mut wrote_length = false;
        for (key, value) in dictionary.iter() {
            if *key == type_key {
                continue;
            }
            if let Some(length) = length_override {
                if !wrote_length && *key > length_key {
                    self.write_length_entry(length, clean)?;
                    wrote_length = true;
                }
                if *key == length_key {
                    continue;
                }
            }
            if key_stop == Some(key) {
                return Ok(());
            }
            self.write_name(key)?;
            if clean {
                self.device.write_all(b" ")?;
            }
            self.write_body(value, encrypt, None)?;
            if clean {
                self.device.write_all(b"\n")?;
            }
        }
        if let Some(length) = length_override {
            if !wrote_length {
                self.write_length_entry(length, clean)?;
            }
        }

        self.device.write_all(b">>")
    }

    fn write_length_entry(&mut self, length: i64, clean: bool) -> Result<()> {
        self.write_name(&Name::from("Length"))?;
        if clean {
            self.device.write_all(b" ")?;
        }
        self.write_token(length.to_string().as_bytes())?;
        if clean {
            self.device.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Serialize an indirect object: header, payload, stream and trailer
    /// keywords. Stream content passes through the encryptor when one is
    /// supplied, and `/Length` always reflects the emitted byte count.
    pub fn write_indirect(
        &mut self,
        object: &IndirectObject,
        encrypt: Option<&dyn Encrypt>,
    ) -> Result<()> {
        let reference = object.reference();
        let context = encrypt.map(|e| EncryptContext::new(e, reference));
        self.device.write_all(
            format!("{} {} obj\n", reference.number(), reference.generation()).as_bytes(),
        )?;

        if let Some(stream) = object.stream() {
            let dictionary = match object.object().body()? {
                Variant::Dictionary(d) => d,
                other => {
                    return Err(PdfError::InvalidDataType(format!(
                        "stream attached to a {} object",
                        other.kind().name()
                    )))
                }
            };
            let payload = match &context {
                Some(context) => context.encrypt(stream.raw())?,
                None => stream.raw().to_vec(),
            };
            self.write_dictionary_entries(
                dictionary,
                context.as_ref(),
                None,
                Some(payload.len() as i64),
            )?;
            self.device.write_all(b"\nstream\n")?;
            self.device.write_all(&payload)?;
            self.device.write_all(b"\nendstream")?;
        } else {
            self.write_body(object.object(), context.as_ref(), None)?;
        }

        self.device.write_all(b"\nendobj\n")
    }

    /// Serialize a whole collection as a PDF file: header, every object in
    /// insertion order, the cross-reference table, and the trailer completed
    /// with `/Size`. Dirty flags of written objects are cleared on success.
    pub fn write_document(
        &mut self,
        objects: &mut ObjectCollection,
        trailer: &Dictionary,
        encrypt: Option<&dyn Encrypt>,
    ) -> Result<()> {
        self.device.write_all(b"%PDF-1.7\n")?;
        // Binary comment so transports treat the file as binary
        self.device.write_all(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])?;

        let mut offsets: Vec<(u32, u16, u64)> = Vec::with_capacity(objects.len());
        for object in objects.iter() {
            let reference = object.reference();
            offsets.push((reference.number(), reference.generation(), self.position()));
            self.write_indirect(object, encrypt)?;
        }

        let xref_position = self.position();
        let max_number = objects.max_number();
        self.device.write_all(b"xref\n")?;
        self.device
            .write_all(format!("0 {}\n", max_number + 1).as_bytes())?;
        self.device.write_all(b"0000000000 65535 f \n")?;
        for number in 1..=max_number {
            match offsets.iter().find(|(n, _, _)| *n == number) {
                Some((_, generation, offset)) => {
                    self.device
                        .write_all(format!("{:010} {:05} n \n", offset, generation).as_bytes())?;
                }
                None => {
                    // Gap in the numbering; emit a free entry
                    self.device.write_all(b"0000000000 00000 f \n")?;
                }
            }
        }

        let mut full_trailer = trailer.try_clone()?;
        full_trailer.insert("Size", (max_number + 1) as i64)?;
        self.device.write_all(b"trailer\n")?;
        self.write_dictionary(&full_trailer, None, None)?;
        self.device
            .write_all(format!("\nstartxref\n{}\n%%EOF\n", xref_position).as_bytes())?;
        self.device.flush()?;

        for object in objects.iter_mut() {
            object.set_dirty(false);
        }
        Ok(())
    }
}

/// Serialize one value to bytes, the round-trip counterpart of
/// [`crate::parser::parse_object`].
pub fn object_to_bytes(object: &Object, mode: WriteMode) -> Result<Vec<u8>> {
    let mut writer = PdfWriter::new(Vec::new(), mode);
    writer.write_object(object, None)?;
    Ok(writer.into_inner())
}

/// A byte after which a following regular character would merge into the
/// same token. Whitespace and the self-terminating delimiters end a token;
/// `/` and `%` open one that keeps consuming, so they count as regular
/// (a digit after a bare `/` would otherwise join the name).
fn is_regular_char(b: u8) -> bool {
    !matches!(
        b,
        b'\0' | b'\t' | b'\n' | 0x0C | b'\r' | b' '
            | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::DataKind;

    fn compact(object: &Object) -> String {
        String::from_utf8(object_to_bytes(object, WriteMode::COMPACT).unwrap()).unwrap()
    }

    fn clean(object: &Object) -> String {
        String::from_utf8(object_to_bytes(object, WriteMode::CLEAN).unwrap()).unwrap()
    }

    #[test]
    fn test_compact_primitives() {
        assert_eq!(compact(&Object::from(true)), "true");
        assert_eq!(compact(&Object::from(false)), "false");
        assert_eq!(compact(&Object::new(Variant::Null)), "null");
        assert_eq!(compact(&Object::from(42i64)), "42");
        assert_eq!(compact(&Object::from(-7i64)), "-7");
    }

    #[test]
    fn test_compact_real_formatting() {
        assert_eq!(compact(&Object::from(1.5)), "1.5");
        assert_eq!(compact(&Object::from(1.0)), "1");
        assert_eq!(compact(&Object::from(0.0)), "0");
        assert_eq!(compact(&Object::from(-0.25)), "-0.25");
        assert_eq!(compact(&Object::from(100.0)), "100");
        assert_eq!(compact(&Object::from(0.5)), "0.5");
    }

    #[test]
    fn test_clean_real_keeps_fixed_point() {
        assert_eq!(clean(&Object::from(1.5)), "1.500000");
    }

    #[test]
    fn test_name_escaping() {
        assert_eq!(
            compact(&Object::from(Name::new(vec![0x20, b'/']))),
            "/#20#2F"
        );
        assert_eq!(compact(&Object::from(Name::from("Type"))), "/Type");
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(
            compact(&Object::from(PdfString::from("a(b)"))),
            "(a\\(b\\))"
        );
        assert_eq!(
            compact(&Object::from(PdfString::hex(vec![0xAB, 0x01]))),
            "<AB01>"
        );
    }

    #[test]
    fn test_empty_dictionary() {
        assert_eq!(compact(&Object::from(Dictionary::new())), "<<>>");
    }

    #[test]
    fn test_type_first_dictionary_ordering() {
        let mut dict = Dictionary::new();
        dict.insert("Parent", Reference::new(1, 0)).unwrap();
        dict.insert("Type", Name::from("Page")).unwrap();
        let mut kids = Array::new();
        kids.push(Reference::new(2, 0)).unwrap();
        kids.push(Reference::new(3, 0)).unwrap();
        dict.insert("Kids", kids).unwrap();

        assert_eq!(
            compact(&Object::from(dict)),
            "<</Type/Page/Kids[2 0 R 3 0 R]/Parent 1 0 R>>"
        );
    }

    #[test]
    fn test_empty_name_key_is_separated_from_value() {
        let mut dict = Dictionary::new();
        dict.insert(Name::from(""), 1i64).unwrap();
        // Without the separator the value digit would join the name token
        assert_eq!(compact(&Object::from(dict)), "<</ 1>>");
    }

    #[test]
    fn test_compact_array_spacing() {
        let mut array = Array::new();
        array.push(1i64).unwrap();
        array.push(2i64).unwrap();
        array.push(Name::from("N")).unwrap();
        array.push(3i64).unwrap();

        // Adjacent numbers need one separator; names self-delimit
        assert_eq!(compact(&Object::from(array)), "[1 2/N 3]");
    }

    #[test]
    fn test_compact_nested_containers() {
        let mut inner = Array::new();
        inner.push(true).unwrap();
        inner.push(Variant::Null).unwrap();

        let mut outer = Array::new();
        outer.push(inner).unwrap();
        outer.push(1.25).unwrap();

        assert_eq!(compact(&Object::from(outer)), "[[true null]1.25]");
    }

    #[test]
    fn test_clean_dictionary_layout() {
        let mut dict = Dictionary::new();
        dict.insert("A", 1i64).unwrap();
        dict.insert("B", Name::from("N")).unwrap();

        assert_eq!(clean(&Object::from(dict)), "<<\n/A 1\n/B /N\n>>");
    }

    #[test]
    fn test_key_stop_halts_emission() {
        let mut dict = Dictionary::new();
        dict.insert("Root", Reference::new(1, 0)).unwrap();
        dict.insert("Size", 4i64).unwrap();
        dict.insert("Prev", 100i64).unwrap();

        let mut writer = PdfWriter::new(Vec::new(), WriteMode::COMPACT);
        let stop = Name::from("Size");
        writer.write_dictionary(&dict, None, Some(&stop)).unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();

        // Keys sort Prev < Root < Size; emission stops before Size with no
        // closing marker.
        assert_eq!(out, "<</Prev 100/Root 1 0 R");
    }

    #[test]
    fn test_key_stop_on_type_stops_immediately() {
        let mut dict = Dictionary::new();
        dict.insert("Type", Name::from("Catalog")).unwrap();
        dict.insert("Pages", Reference::new(2, 0)).unwrap();

        let mut writer = PdfWriter::new(Vec::new(), WriteMode::COMPACT);
        let stop = Name::from("Type");
        writer.write_dictionary(&dict, None, Some(&stop)).unwrap();
        assert_eq!(writer.into_inner(), b"<<");
    }

    #[test]
    fn test_raw_data_written_verbatim() {
        let object = Object::new(Variant::RawData(b"17 0 R".to_vec()));
        assert_eq!(compact(&object), "17 0 R");
    }

    #[test]
    fn test_unloaded_object_fails_with_invalid_handle() {
        let object = Object::delayed(Box::new(|| {
            Err(PdfError::InvalidHandle("no backing data".to_string()))
        }));
        let result = object_to_bytes(&object, WriteMode::COMPACT);
        assert!(matches!(result, Err(PdfError::InvalidHandle(_))));
    }

    #[test]
    fn test_write_indirect_with_stream() {
        let mut dict = Dictionary::new();
        dict.insert("Type", Name::from("XObject")).unwrap();
        let mut indirect = IndirectObject::new(Reference::new(6, 0), Object::from(dict));
        indirect.set_stream_data(b"BT ET".to_vec()).unwrap();

        let mut writer = PdfWriter::new(Vec::new(), WriteMode::COMPACT);
        writer.write_indirect(&indirect, None).unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();

        assert_eq!(
            out,
            "6 0 obj\n<</Type/XObject/Length 5>>\nstream\nBT ET\nendstream\nendobj\n"
        );
    }

    #[test]
    fn test_write_indirect_injects_length_in_sorted_position() {
        let mut dict = Dictionary::new();
        dict.insert("Filter", Name::from("FlateDecode")).unwrap();
        dict.insert("Subtype", Name::from("Form")).unwrap();
        let mut indirect = IndirectObject::new(Reference::new(2, 0), Object::from(dict));
        // Bypass the helper so the dictionary carries no Length entry
        indirect.stream_mut().unwrap().set_data(vec![0xAA; 3]);

        let mut writer = PdfWriter::new(Vec::new(), WriteMode::COMPACT);
        writer.write_indirect(&indirect, None).unwrap();
        let out = writer.into_inner();
        let text = String::from_utf8_lossy(&out);

        assert!(text.starts_with("2 0 obj\n<</Filter/FlateDecode/Length 3/Subtype/Form>>"));
    }

    #[test]
    fn test_write_indirect_plain_value() {
        let indirect = IndirectObject::new(Reference::new(3, 0), Object::from(7i64));
        let mut writer = PdfWriter::new(Vec::new(), WriteMode::COMPACT);
        writer.write_indirect(&indirect, None).unwrap();
        assert_eq!(writer.into_inner(), b"3 0 obj\n7\nendobj\n");
    }

    struct XorEncrypt(u8);

    impl Encrypt for XorEncrypt {
        fn encrypt(&self, data: &[u8], reference: Reference) -> crate::error::Result<Vec<u8>> {
            let key = self.0 ^ (reference.number() as u8);
            Ok(data.iter().map(|b| b ^ key).collect())
        }
    }

    #[test]
    fn test_string_content_is_encrypted() {
        let encryptor = XorEncrypt(0xFF);
        let context = EncryptContext::new(&encryptor, Reference::new(0, 0));

        let mut writer = PdfWriter::new(Vec::new(), WriteMode::COMPACT);
        writer
            .write_object(&Object::from(PdfString::hex(vec![0x00])), Some(&context))
            .unwrap();
        assert_eq!(writer.into_inner(), b"<FF>");
    }

    #[test]
    fn test_stream_content_is_encrypted_and_length_follows() {
        let mut indirect = IndirectObject::new(
            Reference::new(1, 0),
            Object::from(Dictionary::new()),
        );
        indirect.set_stream_data(vec![0x00, 0x00]).unwrap();

        let encryptor = XorEncrypt(0x00);
        let mut writer = PdfWriter::new(Vec::new(), WriteMode::COMPACT);
        writer.write_indirect(&indirect, Some(&encryptor)).unwrap();
        let out = writer.into_inner();
        let text = String::from_utf8_lossy(&out);

        // Key for object 1 is 0x01, so the two zero bytes become 0x01 0x01
        assert!(text.contains("/Length 2"));
        let expected: &[u8] = b"stream\n\x01\x01\nendstream";
        assert!(out.windows(expected.len()).any(|w| w == expected));
    }

    #[test]
    fn test_write_document_layout_and_dirty_clearing() {
        let mut objects = ObjectCollection::new();
        let pages = objects.create(Variant::Dictionary(Dictionary::new()));
        let mut catalog = Dictionary::new();
        catalog.insert("Type", Name::from("Catalog")).unwrap();
        catalog.insert("Pages", pages).unwrap();
        let root = objects.create(Variant::Dictionary(catalog));

        let mut trailer = Dictionary::new();
        trailer.insert("Root", root).unwrap();

        let mut writer = PdfWriter::new(Vec::new(), WriteMode::COMPACT);
        writer.write_document(&mut objects, &trailer, None).unwrap();
        let out = writer.into_inner();
        let text = String::from_utf8_lossy(&out);

        assert!(text.starts_with("%PDF-1.7\n"));
        assert!(text.contains("1 0 obj"));
        assert!(text.contains("2 0 obj"));
        assert!(text.contains("xref\n0 3\n0000000000 65535 f \n"));
        assert!(text.contains("trailer\n"));
        assert!(text.contains("/Size 3"));
        assert!(text.trim_end().ends_with("%%EOF"));

        // The xref offset points at the xref keyword. The offset is a file
        // byte position, so it must be checked against the raw bytes (the
        // binary comment makes text indices diverge).
        let startxref = text.find("startxref\n").unwrap();
        let offset: usize = text[startxref + 10..]
            .lines()
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(&out[offset..offset + 4], b"xref");

        for object in objects.iter() {
            assert!(!object.is_dirty());
        }
    }

    #[test]
    fn test_write_document_fills_numbering_gaps() {
        let mut objects = ObjectCollection::new();
        objects
            .insert(IndirectObject::new(Reference::new(3, 0), Object::from(1i64)))
            .unwrap();

        let mut writer = PdfWriter::new(Vec::new(), WriteMode::COMPACT);
        writer
            .write_document(&mut objects, &Dictionary::new(), None)
            .unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();

        assert!(text.contains("xref\n0 4\n"));
        // Objects 1 and 2 are free entries
        assert_eq!(text.matches("0000000000 00000 f \n").count(), 2);
    }

    #[test]
    fn test_mode_bits_are_independent() {
        let both = WriteMode::CLEAN | WriteMode::COMPACT;
        assert!(both.contains(WriteMode::CLEAN));
        assert!(both.contains(WriteMode::COMPACT));
        assert_eq!(WriteMode::empty().bits(), 0);
    }

    #[test]
    fn test_kind_survives_write() {
        let object = Object::from(1.5);
        let _ = compact(&object);
        assert_eq!(object.kind().unwrap(), DataKind::Real);
        assert!(!object.is_dirty());
    }
}
