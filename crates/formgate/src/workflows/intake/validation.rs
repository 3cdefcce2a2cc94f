use std::path::Path;

use super::domain::{ApplicantSubmission, UploadedDocument};

/// Ceiling enforced on each uploaded file.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

const CV_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];
const RECEIPT_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

/// Validation errors raised during intake.
#[derive(Debug, thiserror::Error)]
pub enum IntakeViolation {
    #[error("full name is required")]
    MissingFullName,
    #[error("a valid email address is required")]
    InvalidEmail,
    #[error("phone number is required")]
    MissingPhone,
    #[error("home address is required")]
    MissingAddress,
    #[error("unsupported CV format '{extension}', upload PDF, DOC, or DOCX")]
    UnsupportedCvFormat { extension: String },
    #[error("unsupported receipt format '{extension}', upload PDF, JPG, or PNG")]
    UnsupportedReceiptFormat { extension: String },
    #[error("{document} file size must be less than 5MB")]
    FileTooLarge { document: &'static str },
}

/// Checks a submission against the form rules and normalizes its fields.
#[derive(Debug, Clone, Default)]
pub struct SubmissionGuard;

impl SubmissionGuard {
    pub fn validate(
        &self,
        mut submission: ApplicantSubmission,
    ) -> Result<ApplicantSubmission, IntakeViolation> {
        submission.full_name = required_text(&submission.full_name)
            .ok_or(IntakeViolation::MissingFullName)?;
        submission.phone =
            required_text(&submission.phone).ok_or(IntakeViolation::MissingPhone)?;
        submission.address =
            required_text(&submission.address).ok_or(IntakeViolation::MissingAddress)?;
        submission.email = validated_email(&submission.email)?;

        check_document(&mut submission.cv, "CV", &CV_EXTENSIONS, |extension| {
            IntakeViolation::UnsupportedCvFormat { extension }
        })?;

        if let Some(receipt) = submission.receipt.as_mut() {
            check_document(receipt, "receipt", &RECEIPT_EXTENSIONS, |extension| {
                IntakeViolation::UnsupportedReceiptFormat { extension }
            })?;
        }

        Ok(submission)
    }
}

fn required_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn validated_email(raw: &str) -> Result<String, IntakeViolation> {
    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(IntakeViolation::InvalidEmail);
    }
    Ok(trimmed.to_string())
}

fn extension_of(document: &UploadedDocument) -> String {
    Path::new(&document.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

fn check_document(
    document: &mut UploadedDocument,
    name: &'static str,
    allowed: &[&str],
    unsupported: impl FnOnce(String) -> IntakeViolation,
) -> Result<(), IntakeViolation> {
    let extension = extension_of(document);
    if !allowed.contains(&extension.as_str()) {
        return Err(unsupported(extension));
    }

    if document.size_bytes > MAX_UPLOAD_BYTES {
        return Err(IntakeViolation::FileTooLarge { document: name });
    }

    document.content_type = Some(
        mime_guess::from_path(&document.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    );
    Ok(())
}
