use crate::{
    entities::{feedback, Feedback},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Visitor feedback collected through the public contact endpoint
pub struct FeedbackService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl FeedbackService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn submit(&self, input: SubmitFeedbackInput) -> Result<feedback::Model, ServiceError> {
        input.validate()?;

        let feedback_id = Uuid::new_v4();
        let model = feedback::ActiveModel {
            id: Set(feedback_id),
            name: Set(input.name),
            email: Set(input.email),
            message: Set(input.message),
            is_valid: Set(false),
            created_at: Set(Utc::now()),
        };
        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::FeedbackReceived(feedback_id))
            .await;
        Ok(created)
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<feedback::Model>, u64), ServiceError> {
        let paginator = Feedback::find()
            .order_by_desc(feedback::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Marks a message as reviewed by staff
    pub async fn mark_reviewed(&self, feedback_id: Uuid) -> Result<feedback::Model, ServiceError> {
        let entry = Feedback::find_by_id(feedback_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Feedback {} not found", feedback_id))
            })?;

        let mut active: feedback::ActiveModel = entry.into();
        active.is_valid = Set(true);
        Ok(active.update(&*self.db).await?)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitFeedbackInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_feedback_validates() {
        let input = SubmitFeedbackInput {
            name: "Aisha".to_string(),
            email: "aisha@example.com".to_string(),
            message: "The roll-on arrived quickly, thanks!".to_string(),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn bad_email_fails_validation() {
        let input = SubmitFeedbackInput {
            name: "Aisha".to_string(),
            email: "aisha-at-example".to_string(),
            message: "hello".to_string(),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn empty_message_fails_validation() {
        let input = SubmitFeedbackInput {
            name: "Aisha".to_string(),
            email: "aisha@example.com".to_string(),
            message: String::new(),
        };
        assert!(input.validate().is_err());
    }
}
