//! Test fixtures: backend post payloads and attachment blobs.

use scholar_core::models::AttachmentFile;
use serde_json::{json, Value};

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF";

pub fn pdf_file(name: &str) -> AttachmentFile {
    AttachmentFile::new(name, "application/pdf", PDF_BYTES.to_vec())
}

/// A post record as stored by the backend.
pub fn post_record(id: &str, category: &str, created_at: &str) -> Value {
    json!({
        "postId": id,
        "postContent": format!("Content of {}", id),
        "selectedCategory": category,
        "attachmentUrls": [format!(
            "https://scholar-hub-doc.s3.us-east-1.amazonaws.com/posts/{}/attachments/{}.pdf",
            id, id
        )],
        "createdAt": created_at,
    })
}

pub fn posts_payload(records: Vec<Value>) -> Value {
    let count = records.len();
    json!({ "posts": records, "count": count })
}
