//! Attachment file-type policy.
//!
//! Posts accept documents only: PDF, plain text, and Word files.

use crate::error::{ClientError, ClientResult};

pub const ALLOWED_ATTACHMENT_EXTENSIONS: [&str; 4] = ["pdf", "txt", "doc", "docx"];

pub const ALLOWED_ATTACHMENT_CONTENT_TYPES: [&str; 4] = [
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Content type for an allowed attachment extension, `None` otherwise.
pub fn content_type_for_file_name(file_name: &str) -> Option<&'static str> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();

    ALLOWED_ATTACHMENT_EXTENSIONS
        .iter()
        .position(|allowed| *allowed == extension)
        .map(|index| ALLOWED_ATTACHMENT_CONTENT_TYPES[index])
}

/// Check a file against the attachment policy.
///
/// A declared content type, when given, must be one of the allowed types;
/// otherwise the type is derived from the extension. Returns the content type
/// to send with the upload.
pub fn validate_attachment(
    file_name: &str,
    declared_content_type: Option<&str>,
) -> ClientResult<String> {
    if file_name.trim().is_empty() {
        return Err(ClientError::Validation(
            "Attachment file name cannot be empty".to_string(),
        ));
    }

    let content_type = match declared_content_type.map(str::trim) {
        Some(declared) if !declared.is_empty() => {
            let declared = declared.to_ascii_lowercase();
            ALLOWED_ATTACHMENT_CONTENT_TYPES
                .iter()
                .find(|allowed| **allowed == declared)
                .copied()
        }
        _ => content_type_for_file_name(file_name),
    };

    content_type.map(str::to_string).ok_or_else(|| {
        ClientError::Validation(format!(
            "'{}' is not allowed. Only PDF, TXT, DOC, and DOCX files are allowed for attachments.",
            file_name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(
            content_type_for_file_name("notes.pdf"),
            Some("application/pdf")
        );
        assert_eq!(content_type_for_file_name("README.TXT"), Some("text/plain"));
        assert_eq!(
            content_type_for_file_name("thesis.docx"),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        );
        assert_eq!(content_type_for_file_name("photo.png"), None);
        assert_eq!(content_type_for_file_name("Makefile"), None);
    }

    #[test]
    fn test_validate_attachment_declared_type() {
        assert_eq!(
            validate_attachment("upload.bin", Some("application/pdf")).unwrap(),
            "application/pdf"
        );
        assert!(validate_attachment("notes.pdf", Some("image/png")).is_err());
    }

    #[test]
    fn test_validate_attachment_rejects() {
        let err = validate_attachment("archive.zip", None).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(err.to_string().contains("archive.zip"));
        assert!(validate_attachment("  ", None).is_err());
    }
}
