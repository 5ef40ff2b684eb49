//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod user;
pub mod event;
pub mod registration;
pub mod result;
pub mod announcement;
pub mod carousel;
pub mod feedback;
pub mod interaction;

use serde::Serialize;

// Re-export commonly used models
pub use user::{User, UserType, Gender, RegisterUserRequest, UpdateUserRequest, ChangePasswordRequest, UserFilter};
pub use event::{Event, EventView, EventDetail, EventLevel, EventStatus, OrganizerInfo, CreateEventRequest, UpdateEventRequest, EventFilter, EventAssignment, RefereeEventAccess};
pub use registration::{Registration, RegistrationStatus, PaymentStatus, CreateRegistrationRequest, ParticipantDetails, RegistrationFilter, BulkOutcome};
pub use result::{CompetitionResult, RoundType, CreateResultRequest, UpdateResultRequest, ResultFilter, ImportRowError, ImportSummary};
pub use announcement::{Announcement, AnnouncementType, Priority, CreateAnnouncementRequest, UpdateAnnouncementRequest, AnnouncementFilter};
pub use carousel::{Carousel, CarouselPosition, CreateCarouselRequest, UpdateCarouselRequest, CarouselFilter};
pub use feedback::{Feedback, FeedbackType, FeedbackStatus, FeedbackStatistics, CreateFeedbackRequest, UpdateFeedbackRequest, FeedbackFilter};
pub use interaction::{TargetType, TargetParams, Like, Favorite, FavoriteView, Comment, CommentView, CreateCommentRequest, CommentFilter, InteractionFilter};

/// One page of a list endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, limit: i64, offset: i64) -> Self {
        Self {
            count,
            page: offset / limit.max(1) + 1,
            page_size: limit,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_numbering() {
        let page = Page::new(vec![1, 2], 42, 20, 40);
        assert_eq!(page.page, 3);
        assert_eq!(page.map(|v| v * 10).results, vec![10, 20]);
    }
}
