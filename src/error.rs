use thiserror::Error;

use crate::model::feature::FeatureId;

/// Errors reported by the feature lifecycle and the proximity query engine.
///
/// Each variant is a distinct kind the caller can branch on: fix the input,
/// give up, or retry later.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// Malformed coordinates, name, id, buffer or radius.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The addressed feature does not exist in the store.
    #[error("Feature not found: {0}")]
    NotFound(FeatureId),

    /// The spatial store failed to complete a read or write.
    #[error("Spatial store unavailable: {0}")]
    StoreUnavailable(String),
}

impl FeatureError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Only store failures may succeed when repeated unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, FeatureError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::FeatureError;
    use crate::model::feature::FeatureId;

    #[rstest]
    #[case(FeatureError::validation("lat out of range"), false)]
    #[case(FeatureError::NotFound(FeatureId::new()), false)]
    #[case(FeatureError::store_unavailable("lock poisoned"), true)]
    fn test_is_retryable(#[case] error: FeatureError, #[case] expected: bool) {
        assert_eq!(expected, error.is_retryable());
    }

    #[test]
    fn test_not_found_message_names_the_id() {
        let id = FeatureId::new();
        let message = FeatureError::NotFound(id).to_string();
        assert!(message.contains(&id.to_string()));
    }
}
