use thiserror::Error;

/// Errors raised by the object model, the writer, the variant parser and the
/// font subsetter.
///
/// The taxonomy is closed: every failure in this crate maps onto one of these
/// variants and is propagated to the caller unchanged. There is no internal
/// recovery.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value of one kind was read or mutated as another kind.
    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    /// A null, dangling or uninitialized handle where a value was required.
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Mutation attempted on an immutable value.
    #[error("Change on immutable object")]
    ChangeOnImmutable,

    /// Numeric overflow on narrowing, or a parameter outside its allowed set.
    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    /// Truncated input.
    #[error("Unexpected end of input")]
    UnexpectedEof,

    /// The font program cannot be handled by the subsetter.
    #[error("Unsupported font format: {0}")]
    UnsupportedFontFormat(String),

    /// An image format this library does not decode.
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    /// A stream filter this library does not apply.
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// An invariant violation; a bug in the caller or in this library,
    /// distinct from malformed user data.
    #[error("Internal logic error: {0}")]
    InternalLogic(String),

    /// An optional feature that is not compiled in.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Malformed PDF syntax encountered by the variant parser.
    #[error("Parse error at offset {position}: {message}")]
    ParseError { position: u64, message: String },
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PdfError::InvalidDataType("expected Bool, found Name".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid data type: expected Bool, found Name"
        );

        let error = PdfError::ChangeOnImmutable;
        assert_eq!(error.to_string(), "Change on immutable object");

        let error = PdfError::ParseError {
            position: 17,
            message: "unbalanced parenthesis".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Parse error at offset 17: unbalanced parenthesis"
        );
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = PdfError::from(io_error);

        match error {
            PdfError::Io(ref err) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_all_variants_have_messages() {
        let errors = vec![
            PdfError::InvalidDataType("t".to_string()),
            PdfError::InvalidHandle("h".to_string()),
            PdfError::ChangeOnImmutable,
            PdfError::ValueOutOfRange("v".to_string()),
            PdfError::UnexpectedEof,
            PdfError::UnsupportedFontFormat("f".to_string()),
            PdfError::UnsupportedImageFormat("i".to_string()),
            PdfError::UnsupportedFilter("x".to_string()),
            PdfError::InternalLogic("l".to_string()),
            PdfError::NotImplemented("n".to_string()),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfError>();
    }
}
