//! Model-job field enums and validation rules.

use crate::error::CoreError;

/// Maximum length of the free-text `notes` field.
pub const NOTES_MAX_LEN: usize = 500;

/// Provenance of the reference imagery for a job. Immutable after
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Scanner,
    Upload,
    Api,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scanner => "scanner",
            Self::Upload => "upload",
            Self::Api => "api",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "scanner" => Ok(Self::Scanner),
            "upload" => Ok(Self::Upload),
            "api" => Ok(Self::Api),
            other => Err(CoreError::Validation(format!(
                "Unknown source type '{other}'. Must be one of: scanner, upload, api"
            ))),
        }
    }
}

/// Which external adapter governs a job. Mutable only until a provider
/// task has been submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// The Meshy image-to-3D API (the only implemented adapter).
    Meshy,
    /// No adapter; the job is advanced entirely by direct edits.
    Manual,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meshy => "meshy",
            Self::Manual => "manual",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "meshy" => Ok(Self::Meshy),
            "manual" => Ok(Self::Manual),
            other => Err(CoreError::Validation(format!(
                "Unknown provider '{other}'. Must be one of: meshy, manual"
            ))),
        }
    }
}

/// Validate the free-text notes field against [`NOTES_MAX_LEN`].
pub fn validate_notes(notes: &str) -> Result<(), CoreError> {
    if notes.chars().count() > NOTES_MAX_LEN {
        return Err(CoreError::Validation(format!(
            "Notes must be at most {NOTES_MAX_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_type_round_trips() {
        for st in [SourceType::Scanner, SourceType::Upload, SourceType::Api] {
            assert_eq!(SourceType::from_name(st.as_str()).unwrap(), st);
        }
        assert!(SourceType::from_name("camera").is_err());
    }

    #[test]
    fn provider_round_trips() {
        assert_eq!(Provider::from_name("meshy").unwrap(), Provider::Meshy);
        assert_eq!(Provider::from_name("manual").unwrap(), Provider::Manual);
        assert!(Provider::from_name("openai").is_err());
    }

    #[test]
    fn notes_cap_is_character_based() {
        assert!(validate_notes(&"a".repeat(NOTES_MAX_LEN)).is_ok());
        assert!(validate_notes(&"a".repeat(NOTES_MAX_LEN + 1)).is_err());
        // Multi-byte characters count once each.
        assert!(validate_notes(&"é".repeat(NOTES_MAX_LEN)).is_ok());
    }
}
