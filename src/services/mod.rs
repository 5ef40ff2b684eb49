//! Services module
//!
//! This module contains business logic services

pub mod announcements;
pub mod auth;
pub mod carousel;
pub mod events;
pub mod feedback;
pub mod interactions;
pub mod redis;
pub mod registration;
pub mod results;
pub mod spreadsheet;
pub mod user;
pub mod wordcloud;

// Re-export commonly used services
pub use announcements::AnnouncementService;
pub use auth::{AuthContext, AuthService, Permission};
pub use carousel::CarouselService;
pub use events::EventService;
pub use feedback::FeedbackService;
pub use interactions::InteractionService;
pub use redis::RedisService;
pub use registration::RegistrationService;
pub use results::ResultService;
pub use user::UserService;
pub use wordcloud::WordCloudBroadcaster;

use serde::Serialize;
use crate::config::Settings;
use crate::database::{health_check, DatabaseService};
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Debug, Clone)]
pub struct ServiceFactory {
    pub db: DatabaseService,
    pub redis: RedisService,
    pub users: UserService,
    pub events: EventService,
    pub registrations: RegistrationService,
    pub results: ResultService,
    pub announcements: AnnouncementService,
    pub carousel: CarouselService,
    pub feedback: FeedbackService,
    pub interactions: InteractionService,
    pub wordcloud: WordCloudBroadcaster,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, db: DatabaseService) -> Result<Self> {
        let redis = RedisService::new(&settings.redis)?;
        let auth = AuthService::new(&settings.auth);
        Ok(Self::with_parts(settings, db, redis, auth))
    }

    /// Assemble from prebuilt parts; tests use this to lower the hash cost
    pub fn with_parts(settings: &Settings, db: DatabaseService, redis: RedisService, auth: AuthService) -> Self {
        let wordcloud = WordCloudBroadcaster::new(db.clone(), redis.clone(), settings.wordcloud.clone());

        Self {
            users: UserService::new(db.users.clone(), auth, redis.clone()),
            events: EventService::new(db.clone(), settings.uploads.clone()),
            registrations: RegistrationService::new(db.clone()),
            results: ResultService::new(db.clone()),
            announcements: AnnouncementService::new(db.announcements.clone()),
            carousel: CarouselService::new(db.carousels.clone()),
            feedback: FeedbackService::new(db.feedback.clone()),
            interactions: InteractionService::new(db.clone(), wordcloud.clone()),
            wordcloud,
            redis,
            db,
        }
    }

    /// Health check for backing stores
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = health_check(self.db.pool()).await.is_ok();
        let redis_healthy = self.redis.health_check().await;

        ServiceHealthStatus {
            database_healthy,
            redis_healthy,
            wordcloud_subscribers: self.wordcloud.subscriber_count(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub redis_healthy: bool,
    pub wordcloud_subscribers: usize,
}

impl ServiceHealthStatus {
    /// Redis is optional; only the database is critical
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if !self.redis_healthy {
            issues.push("Redis connection failed".to_string());
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_outage_is_not_critical() {
        let status = ServiceHealthStatus {
            database_healthy: true,
            redis_healthy: false,
            wordcloud_subscribers: 0,
        };
        assert!(status.is_healthy());
        assert_eq!(status.get_issues(), vec!["Redis connection failed".to_string()]);
    }

    #[test]
    fn test_database_outage_is_critical() {
        let status = ServiceHealthStatus {
            database_healthy: false,
            redis_healthy: true,
            wordcloud_subscribers: 0,
        };
        assert!(!status.is_healthy());
        assert_eq!(status.get_issues().len(), 1);
    }
}
