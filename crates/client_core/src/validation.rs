use std::{collections::BTreeMap, fmt};

pub const MAX_MEDIA_BYTES: u64 = 10 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Field-level form errors. Keyed by the wire field name (`title`, `intro`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(field, message)| (*field, message.as_str()))
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (index, (field, message)) in self.fields.iter().enumerate() {
            let sep = if index == 0 { ": " } else { "; " };
            write!(f, "{sep}{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Empty or whitespace-only optional text is sent as absent.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|v| !is_blank(v)).map(str::to_string)
}

pub fn validate_list(title: &str, intro: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if is_blank(title) {
        errors.add("title", "Title is required");
    }
    if is_blank(intro) {
        errors.add("intro", "Intro is required");
    }
    errors.into_result()
}

pub fn validate_entry(rank: u32, title: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if rank < 1 {
        errors.add("rank", "Rank must be a positive number");
    }
    if is_blank(title) {
        errors.add("title", "Title is required");
    }
    errors.into_result()
}

pub fn validate_post(title: &str, excerpt: &str, body: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if is_blank(title) {
        errors.add("title", "Title is required");
    }
    if is_blank(excerpt) {
        errors.add("excerpt", "Excerpt is required");
    }
    if is_blank(body) {
        errors.add("body", "Body is required");
    }
    errors.into_result()
}

pub fn validate_suggestion(
    title: &str,
    description: &str,
    submitter_email: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if is_blank(title) {
        errors.add("title", "Title must not be blank");
    }
    if is_blank(description) {
        errors.add("description", "Description must not be blank");
    }
    if let Some(email) = submitter_email.filter(|e| !is_blank(e)) {
        if !looks_like_email(email.trim()) {
            errors.add("submitterEmail", "Email must be valid");
        }
    }
    errors.into_result()
}

pub fn validate_media_upload(content_type: &str, size_bytes: u64) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let normalized = content_type.trim().to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&normalized.as_str()) {
        errors.add(
            "file",
            "File must be an image (JPEG, PNG, GIF or WebP)",
        );
    }
    if size_bytes == 0 {
        errors.add("file", "File is empty");
    } else if size_bytes > MAX_MEDIA_BYTES {
        errors.add("file", "File size must not exceed 10MB");
    }
    errors.into_result()
}

fn looks_like_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_requires_trimmed_title_and_intro() {
        let errors = validate_list("   ", "\n").expect_err("blank fields");
        assert_eq!(errors.get("title"), Some("Title is required"));
        assert_eq!(errors.get("intro"), Some("Intro is required"));
        assert!(validate_list("Top 10", "Why these ten").is_ok());
    }

    #[test]
    fn entry_rank_must_be_positive() {
        let errors = validate_entry(0, "Thing").expect_err("rank zero");
        assert_eq!(errors.get("rank"), Some("Rank must be a positive number"));
        assert!(errors.get("title").is_none());
    }

    #[test]
    fn suggestion_email_is_optional_but_checked() {
        assert!(validate_suggestion("Best trains", "All of them", None).is_ok());
        assert!(validate_suggestion("Best trains", "All of them", Some("  ")).is_ok());
        assert!(validate_suggestion("Best trains", "d", Some("rail@example.org")).is_ok());
        for bad in ["rail", "rail@", "@example.org", "rail@example", "a@b@c.d", "r ail@x.io"] {
            let errors = validate_suggestion("t", "d", Some(bad)).expect_err(bad);
            assert_eq!(errors.get("submitterEmail"), Some("Email must be valid"));
        }
    }

    #[test]
    fn media_upload_checks_type_and_size() {
        assert!(validate_media_upload("image/PNG", 1024).is_ok());
        assert!(validate_media_upload("image/webp", MAX_MEDIA_BYTES).is_ok());
        assert!(validate_media_upload("application/pdf", 10).is_err());
        let too_big = validate_media_upload("image/jpeg", MAX_MEDIA_BYTES + 1).expect_err("size");
        assert_eq!(too_big.get("file"), Some("File size must not exceed 10MB"));
        assert!(validate_media_upload("image/gif", 0).is_err());
    }

    #[test]
    fn display_lists_every_field() {
        let errors = validate_post("", "", "body").expect_err("missing");
        assert_eq!(
            errors.to_string(),
            "validation failed: excerpt: Excerpt is required; title: Title is required"
        );
    }
}
