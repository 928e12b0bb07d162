//! Multipart upload parsing and validation.

use std::path::Path;

use axum::extract::Multipart;
use bytes::Bytes;

use super::models::DEFAULT_DOMAIN;
use crate::core::errors::ApiError;

pub const ALLOWED_EXTENSIONS: [&str; 5] = [".pdf", ".docx", ".doc", ".txt", ".rtf"];

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Raw form as received; see [`UploadForm::validate`].
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub saw_file_field: bool,
    pub document_type: Option<String>,
    pub court_level: Option<String>,
    pub legal_area: Option<String>,
}

#[derive(Debug)]
pub struct ValidatedUpload {
    pub files: Vec<UploadedFile>,
    pub document_type: String,
    pub court_level: Option<String>,
    pub legal_area: Option<String>,
}

impl ValidatedUpload {
    pub fn legal_area_or_default(&self) -> &str {
        self.legal_area.as_deref().unwrap_or(DEFAULT_DOMAIN)
    }
}

impl UploadForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "files" | "file" => {
                    form.saw_file_field = true;
                    let raw_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    // parts without a filename are skipped, like empty file inputs
                    if let Some(filename) = raw_name.as_deref().and_then(sanitize_filename) {
                        form.files.push(UploadedFile {
                            filename,
                            content_type,
                            bytes,
                        });
                    }
                }
                "document_type" => form.document_type = text_value(field).await?,
                "court_level" => form.court_level = text_value(field).await?,
                "legal_area" => form.legal_area = text_value(field).await?,
                other => tracing::debug!("Ignoring unknown upload field '{}'", other),
            }
        }

        Ok(form)
    }

    /// Checks required fields and every file extension before anything is stored.
    pub fn validate(self) -> Result<ValidatedUpload, ApiError> {
        let document_type = self.document_type.ok_or_else(|| {
            ApiError::BadRequest("Pflichtfeld 'document_type' fehlt".to_string())
        })?;
        if !self.saw_file_field {
            return Err(ApiError::BadRequest(
                "Pflichtfeld 'files' fehlt".to_string(),
            ));
        }

        for file in &self.files {
            let ext = file_extension(&file.filename);
            if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                return Err(ApiError::BadRequest(format!(
                    "Dateityp {} nicht unterstützt",
                    ext
                )));
            }
        }

        Ok(ValidatedUpload {
            files: self.files,
            document_type,
            court_level: self.court_level,
            legal_area: self.legal_area,
        })
    }
}

async fn text_value(field: axum::extract::multipart::Field<'_>) -> Result<Option<String>, ApiError> {
    let text = field.text().await.map_err(multipart_error)?;
    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
}

/// Lowercased suffix including the dot; empty when there is none.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Keeps only the final path component so client paths cannot shape storage keys.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            content_type: None,
            bytes: Bytes::from_static(b"%PDF-1.7"),
        }
    }

    fn form(files: Vec<UploadedFile>) -> UploadForm {
        UploadForm {
            files,
            saw_file_field: true,
            document_type: Some("urteil".to_string()),
            court_level: None,
            legal_area: None,
        }
    }

    #[test]
    fn extensions_are_lowercased_with_dot() {
        assert_eq!(file_extension("Urteil.PDF"), ".pdf");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(".bashrc"), "");
    }

    #[test]
    fn filenames_are_reduced_to_their_last_component() {
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(
            sanitize_filename("C:\\Akten\\urteil.pdf").as_deref(),
            Some("urteil.pdf")
        );
        assert_eq!(sanitize_filename("  "), None);
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
    }

    #[test]
    fn accepts_every_allowed_extension() {
        let upload = form(vec![
            file("a.pdf"),
            file("b.DOCX"),
            file("c.doc"),
            file("d.txt"),
            file("e.rtf"),
        ])
        .validate()
        .unwrap();
        assert_eq!(upload.files.len(), 5);
        assert_eq!(upload.legal_area_or_default(), "general");
    }

    #[test]
    fn rejects_unsupported_extension_with_message() {
        let err = form(vec![file("ok.pdf"), file("bild.png")])
            .validate()
            .unwrap_err();
        assert_eq!(err.message(), "Dateityp .png nicht unterstützt");

        let err = form(vec![file("ohne_endung")]).validate().unwrap_err();
        assert_eq!(err.message(), "Dateityp  nicht unterstützt");
    }

    #[test]
    fn requires_document_type_and_files() {
        let mut missing_type = form(vec![file("a.pdf")]);
        missing_type.document_type = None;
        assert!(matches!(missing_type.validate(), Err(ApiError::BadRequest(_))));

        let mut no_files = form(vec![]);
        no_files.saw_file_field = false;
        assert!(no_files.validate().is_err());

        // a files field whose parts were all nameless is still a valid, empty upload
        let upload = form(vec![]).validate().unwrap();
        assert!(upload.files.is_empty());
    }
}
