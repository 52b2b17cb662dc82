use crate::error::{PdfError, Result};
use crate::objects::{Name, Object, PdfString, Reference, Stream, Variant};

/// An addressable PDF object: a value with an identity and an optional
/// stream.
///
/// Indirect objects are the unit of persistence; everything else reaches
/// them through their [`Reference`]. Value setters delegate to the inner
/// [`Object`]. A stream may only be attached to a dictionary value.
#[derive(Debug)]
pub struct IndirectObject {
    reference: Reference,
    object: Object,
    stream: Option<Stream>,
}

impl IndirectObject {
    pub fn new(reference: Reference, object: Object) -> Self {
        Self {
            reference,
            object,
            stream: None,
        }
    }

    pub fn reference(&self) -> Reference {
        self.reference
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.object
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream(&self) -> Option<&Stream> {
        self.stream.as_ref()
    }

    /// The stream, created empty on first use. Only a dictionary value can
    /// carry a stream.
    pub fn stream_mut(&mut self) -> Result<&mut Stream> {
        if self.stream.is_none() {
            match self.object.body()? {
                Variant::Dictionary(_) => {}
                other => {
                    return Err(PdfError::InvalidDataType(format!(
                        "cannot attach a stream to a {} object",
                        other.kind().name()
                    )))
                }
            }
            self.stream = Some(Stream::new());
        }
        match self.stream.as_mut() {
            Some(stream) => Ok(stream),
            None => Err(PdfError::InternalLogic("stream vanished".to_string())),
        }
    }

    /// Replace the stream payload with unfiltered bytes, keeping the
    /// dictionary's `/Length` and `/Filter` entries consistent.
    pub fn set_stream_data(&mut self, data: Vec<u8>) -> Result<()> {
        self.object.assert_mutable()?;
        let length = data.len() as i64;
        self.stream_mut()?.set_data(data);
        let dict = self.object.as_dictionary_mut()?;
        dict.insert("Length", length)?;
        dict.remove("Filter")?;
        Ok(())
    }

    /// Replace the stream payload with flate-compressed bytes, keeping the
    /// dictionary's `/Length` and `/Filter` entries consistent.
    pub fn set_stream_data_flate(&mut self, data: &[u8]) -> Result<()> {
        self.object.assert_mutable()?;
        let stream = self.stream_mut()?;
        stream.set_data_flate(data)?;
        let length = stream.len() as i64;
        let dict = self.object.as_dictionary_mut()?;
        dict.insert("Length", length)?;
        dict.insert("Filter", Name::from("FlateDecode"))?;
        Ok(())
    }

    /// The decoded stream payload, or `None` when no stream is attached.
    pub fn decoded_stream(&self) -> Result<Option<Vec<u8>>> {
        match &self.stream {
            Some(stream) => Ok(Some(stream.decoded()?)),
            None => Ok(None),
        }
    }

    // Value setters, delegating to the inner object.

    pub fn set_bool(&mut self, value: bool) -> Result<()> {
        self.object.set_bool(value)
    }

    pub fn set_integer(&mut self, value: i64) -> Result<()> {
        self.object.set_integer(value)
    }

    pub fn set_real(&mut self, value: f64) -> Result<()> {
        self.object.set_real(value)
    }

    pub fn set_string(&mut self, value: PdfString) -> Result<()> {
        self.object.set_string(value)
    }

    pub fn set_name(&mut self, value: Name) -> Result<()> {
        self.object.set_name(value)
    }

    pub fn set_reference(&mut self, value: Reference) -> Result<()> {
        self.object.set_reference(value)
    }

    /// Whether the value or the stream has been mutated.
    pub fn is_dirty(&self) -> bool {
        self.object.is_dirty() || self.stream.as_ref().is_some_and(|s| s.is_dirty())
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.object.set_dirty(dirty);
        if let Some(stream) = self.stream.as_mut() {
            stream.set_dirty(dirty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Dictionary;

    fn dict_object() -> IndirectObject {
        IndirectObject::new(Reference::new(1, 0), Object::from(Dictionary::new()))
    }

    #[test]
    fn test_identity_and_value() {
        let mut indirect = IndirectObject::new(Reference::new(4, 2), Object::from(10i64));
        assert_eq!(indirect.reference(), Reference::new(4, 2));
        assert_eq!(indirect.object().as_integer().unwrap(), 10);

        indirect.set_integer(11).unwrap();
        assert_eq!(indirect.object().as_integer().unwrap(), 11);
        assert!(indirect.is_dirty());
    }

    #[test]
    fn test_stream_requires_dictionary_value() {
        let mut indirect = IndirectObject::new(Reference::new(1, 0), Object::from(5i64));
        assert!(matches!(
            indirect.stream_mut(),
            Err(PdfError::InvalidDataType(_))
        ));
        assert!(!indirect.has_stream());
    }

    #[test]
    fn test_set_stream_data_updates_dictionary() {
        let mut indirect = dict_object();
        indirect.set_stream_data(vec![1, 2, 3, 4]).unwrap();

        assert!(indirect.has_stream());
        assert_eq!(indirect.stream().unwrap().raw(), &[1, 2, 3, 4]);

        let dict = indirect.object().as_dictionary().unwrap();
        assert_eq!(dict.get("Length").unwrap().as_integer().unwrap(), 4);
        assert!(!dict.contains_key("Filter"));
    }

    #[test]
    fn test_set_stream_data_flate_round_trip() {
        let payload = b"content stream content stream".to_vec();
        let mut indirect = dict_object();
        indirect.set_stream_data_flate(&payload).unwrap();

        let dict = indirect.object().as_dictionary().unwrap();
        assert_eq!(
            dict.get_name_or_default("Filter"),
            Name::from("FlateDecode")
        );
        assert_eq!(
            dict.get("Length").unwrap().as_integer().unwrap(),
            indirect.stream().unwrap().len() as i64
        );

        assert_eq!(indirect.decoded_stream().unwrap().unwrap(), payload);
    }

    #[test]
    fn test_stream_dirty_flows_into_object_dirtiness() {
        let mut indirect = dict_object();
        indirect.set_stream_data(vec![1]).unwrap();
        assert!(indirect.is_dirty());

        indirect.set_dirty(false);
        assert!(!indirect.is_dirty());

        indirect.stream_mut().unwrap().set_data(vec![2]);
        assert!(indirect.is_dirty());
    }

    #[test]
    fn test_no_stream_decodes_to_none() {
        let indirect = dict_object();
        assert!(indirect.decoded_stream().unwrap().is_none());
    }
}
