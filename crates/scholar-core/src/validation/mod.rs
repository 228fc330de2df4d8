//! Validation modules
//!
//! Input checks that run before any network activity.

pub mod attachment;
pub mod forms;

pub use attachment::{
    content_type_for_file_name, validate_attachment, ALLOWED_ATTACHMENT_CONTENT_TYPES,
    ALLOWED_ATTACHMENT_EXTENSIONS,
};
pub use forms::{validate_otp, validate_post_content, SignInForm, SignUpForm, OTP_LENGTH};
