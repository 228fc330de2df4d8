use serde::{Deserialize, Serialize};

/// Display type of an attachment, inferred from its file extension.
///
/// Best-effort metadata only: the backend makes no guarantee about content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Pdf,
    Document,
}

impl AttachmentKind {
    pub fn from_file_name(name: &str) -> Self {
        if name.to_ascii_lowercase().ends_with(".pdf") {
            AttachmentKind::Pdf
        } else {
            AttachmentKind::Document
        }
    }
}

/// Reference to a file stored in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
    pub kind: AttachmentKind,
}

impl Attachment {
    /// Build an attachment from its storage URL. The display name is the last
    /// path segment, or `"attachment"` when the URL ends in a slash.
    pub fn from_url(url: &str) -> Self {
        let name = url
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or("attachment")
            .to_string();
        let kind = AttachmentKind::from_file_name(&name);
        Attachment {
            name,
            url: url.to_string(),
            kind,
        }
    }
}
