//! Repository implementations, one per table family

pub mod user;
pub mod event;
pub mod assignment;
pub mod registration;
pub mod result;
pub mod announcement;
pub mod carousel;
pub mod feedback;
pub mod interaction;

pub use user::UserRepository;
pub use event::EventRepository;
pub use assignment::AssignmentRepository;
pub use registration::RegistrationRepository;
pub use result::ResultRepository;
pub use announcement::AnnouncementRepository;
pub use carousel::CarouselRepository;
pub use feedback::FeedbackRepository;
pub use interaction::InteractionRepository;

/// Resolve a client `ordering` value (`field` or `-field`) against a whitelist
/// of `(field, column)` pairs. Unknown values fall back to `default`.
pub(crate) fn order_clause(ordering: Option<&str>, allowed: &[(&str, &str)], default: &str) -> String {
    let Some(raw) = ordering.map(str::trim).filter(|o| !o.is_empty()) else {
        return default.to_string();
    };
    let (field, direction) = match raw.strip_prefix('-') {
        Some(field) => (field, "DESC"),
        None => (raw, "ASC"),
    };
    allowed
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, column)| format!("{} {}", column, direction))
        .unwrap_or_else(|| default.to_string())
}

/// Optional search term turned into an ILIKE pattern
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(crate::utils::helpers::like_pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: &[(&str, &str)] = &[("created_at", "e.created_at"), ("view_count", "e.view_count")];

    #[test]
    fn test_order_clause_whitelist() {
        assert_eq!(order_clause(Some("-view_count"), ALLOWED, "e.id"), "e.view_count DESC");
        assert_eq!(order_clause(Some("created_at"), ALLOWED, "e.id"), "e.created_at ASC");
        assert_eq!(order_clause(Some("password; DROP"), ALLOWED, "e.id"), "e.id");
        assert_eq!(order_clause(None, ALLOWED, "e.id"), "e.id");
    }

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern(Some("  ")), None);
        assert_eq!(search_pattern(Some("run")).as_deref(), Some("%run%"));
    }
}
