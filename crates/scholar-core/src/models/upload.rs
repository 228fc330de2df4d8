use bytes::Bytes;

/// A local file selected for attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub file_name: String,
    /// Declared content type, sent with the object-storage PUT
    pub content_type: String,
    pub data: Bytes,
}

impl AttachmentFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Upload progress for one in-flight submission.
///
/// Lives only for the duration of a single submission and is never persisted.
#[derive(Debug)]
pub struct UploadSession<'a> {
    pub file: &'a AttachmentFile,
    pub presigned_url: Option<String>,
    pub attachment_url: Option<String>,
    pub post_id: Option<String>,
    pub uploaded: bool,
}

impl<'a> UploadSession<'a> {
    pub fn new(file: &'a AttachmentFile) -> Self {
        Self {
            file,
            presigned_url: None,
            attachment_url: None,
            post_id: None,
            uploaded: false,
        }
    }
}
