use thiserror::Error;

/// Failures of the external storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("stored style data version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// The stored value exists but cannot be read as style data.
    pub fn is_unreadable_value(&self) -> bool {
        matches!(
            self,
            StorageError::Corrupt(_) | StorageError::UnsupportedVersion { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum LiveStyleError {
    /// An editing or save command ran with nothing picked.
    #[error("no element selected")]
    NoElementSelected,

    #[error("no saved styles for page {page_key:?}")]
    NothingSaved { page_key: String },

    #[error("malformed style data: {0}")]
    MalformedImport(#[from] serde_json::Error),

    #[error("style data version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("clipboard write failed: {0}")]
    Clipboard(String),

    #[error("the style editor is already active on this page")]
    AlreadyActive,

    #[error("the style editor is not active")]
    NotActive,
}

impl LiveStyleError {
    /// Errors caused by what the user asked for, reported through an alert
    /// rather than propagated as failures of the tool.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            LiveStyleError::NoElementSelected
                | LiveStyleError::NothingSaved { .. }
                | LiveStyleError::MalformedImport(_)
                | LiveStyleError::UnsupportedVersion { .. }
        )
    }

    /// Invalid transfer text, whatever the exact cause.
    pub fn is_malformed_data(&self) -> bool {
        matches!(
            self,
            LiveStyleError::MalformedImport(_) | LiveStyleError::UnsupportedVersion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(LiveStyleError::NoElementSelected.is_user_facing());
        assert!(LiveStyleError::UnsupportedVersion { found: 3, supported: 1 }.is_malformed_data());
        let storage = LiveStyleError::from(StorageError::Backend("down".into()));
        assert!(!storage.is_user_facing());
        assert_eq!(storage.to_string(), "storage backend error: down");
    }

    #[test]
    fn test_stored_version_errors_are_not_user_facing() {
        let err = LiveStyleError::from(StorageError::UnsupportedVersion {
            found: 2,
            supported: 1,
        });
        assert!(!err.is_user_facing());
        assert!(!err.is_malformed_data());
        assert!(matches!(err, LiveStyleError::Storage(ref inner) if inner.is_unreadable_value()));
    }

    #[test]
    fn test_nothing_saved_display_names_page() {
        let err = LiveStyleError::NothingSaved {
            page_key: "example.com/".into(),
        };
        assert!(err.to_string().contains("example.com/"));
    }
}
