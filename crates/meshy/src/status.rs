//! Mapping from the provider's status vocabulary to domain buckets.

/// Domain bucket for a provider-reported task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Terminal success: artifacts are ready to fetch.
    Succeeded,
    /// Terminal failure.
    Failed,
    /// Anything else: still queued or running.
    InProgress,
}

/// Terms the vendor (across API versions) uses for terminal success.
const SUCCESS_TERMS: &[&str] = &["succeeded", "completed"];

/// Terms the vendor uses for terminal failure.
const FAILURE_TERMS: &[&str] = &["failed", "error", "canceled", "cancelled"];

/// Map a raw provider status string into a [`TaskOutcome`].
///
/// Case-insensitive; unknown or empty statuses are treated as still in
/// progress rather than errors, so a new vendor intermediate state
/// never strands a job in `erro`.
pub fn map_provider_status(raw: &str) -> TaskOutcome {
    let normalized = raw.trim().to_ascii_lowercase();
    if SUCCESS_TERMS.contains(&normalized.as_str()) {
        TaskOutcome::Succeeded
    } else if FAILURE_TERMS.contains(&normalized.as_str()) {
        TaskOutcome::Failed
    } else {
        TaskOutcome::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_synonyms_map_to_succeeded() {
        assert_eq!(map_provider_status("SUCCEEDED"), TaskOutcome::Succeeded);
        assert_eq!(map_provider_status("completed"), TaskOutcome::Succeeded);
        assert_eq!(map_provider_status(" Completed "), TaskOutcome::Succeeded);
    }

    #[test]
    fn failure_synonyms_map_to_failed() {
        for term in ["FAILED", "Error", "CANCELED", "cancelled"] {
            assert_eq!(map_provider_status(term), TaskOutcome::Failed, "{term}");
        }
    }

    #[test]
    fn everything_else_is_in_progress() {
        for term in ["PENDING", "IN_PROGRESS", "queued", "", "something-new"] {
            assert_eq!(map_provider_status(term), TaskOutcome::InProgress, "{term}");
        }
    }
}
