//! Database service layer
//!
//! This module provides a high-level interface to database operations

use std::collections::HashMap;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use crate::database::DatabasePool;
use crate::database::repositories::{
    AnnouncementRepository, AssignmentRepository, CarouselRepository, EventRepository,
    FeedbackRepository, InteractionRepository, RegistrationRepository, ResultRepository,
    UserRepository,
};
use crate::models::*;
use crate::models::interaction::FavoriteView;
use crate::utils::errors::SportsHubError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub users: UserRepository,
    pub events: EventRepository,
    pub assignments: AssignmentRepository,
    pub registrations: RegistrationRepository,
    pub results: ResultRepository,
    pub announcements: AnnouncementRepository,
    pub carousels: CarouselRepository,
    pub feedback: FeedbackRepository,
    pub interactions: InteractionRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            assignments: AssignmentRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            results: ResultRepository::new(pool.clone()),
            announcements: AnnouncementRepository::new(pool.clone()),
            carousels: CarouselRepository::new(pool.clone()),
            feedback: FeedbackRepository::new(pool.clone()),
            interactions: InteractionRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, SportsHubError> {
        Ok(self.pool.begin().await?)
    }

    /// Event with derived status, registration availability and organizer
    pub async fn event_detail(&self, id: i64, now: DateTime<Utc>) -> Result<EventDetail, SportsHubError> {
        let event = self.events.get(id).await?;
        let organizer_info = self.users.organizer_info(event.organizer_id).await?;

        Ok(EventDetail {
            display_status: event.display_status(now),
            registration_count: event.current_participants,
            can_register: event.can_register(now),
            organizer_info,
            event,
        })
    }

    /// Favorites with event summaries attached where the target is an event
    pub async fn favorites_with_events(&self, page: Page<Favorite>) -> Result<Page<FavoriteView>, SportsHubError> {
        let event_ids: Vec<i64> = page
            .results
            .iter()
            .filter(|f| f.target_type == TargetType::Event)
            .map(|f| f.target_id)
            .collect();

        let mut infos: HashMap<i64, _> = self
            .interactions
            .favorite_event_info(&event_ids)
            .await?
            .into_iter()
            .map(|info| (info.id, info))
            .collect();

        Ok(page.map(|favorite| {
            let event_info = match favorite.target_type {
                TargetType::Event => infos.remove(&favorite.target_id),
                _ => None,
            };
            FavoriteView { favorite, event_info }
        }))
    }

    /// Comment with one level of replies
    pub async fn comment_with_replies(&self, id: i64, approved_only: bool) -> Result<CommentView, SportsHubError> {
        let comment = self.interactions.get_comment(id).await?;
        let replies = self.interactions.replies(id, approved_only).await?;

        Ok(CommentView { comment, replies })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connection::{create_lazy_pool, DatabaseConfig};

    #[tokio::test]
    async fn test_database_service_creation() {
        let config = DatabaseConfig {
            url: "postgresql://nobody@127.0.0.1:1/none".to_string(),
            ..DatabaseConfig::default()
        };
        let pool = create_lazy_pool(&config).unwrap();
        let service = DatabaseService::new(pool);
        assert_eq!(service.pool().size(), 0);
    }
}
