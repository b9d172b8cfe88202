//! 用户业务逻辑
//!
//! 创建流程：去空白 -> 参数校验 -> 邮箱查重 -> 持久化 -> 发布 `user.created`。
//! 事件在用户写入成功之后才发布；发布失败时用户已落库，错误原样返回给调用方，
//! 不在本层重试。

use std::sync::Arc;

use cloudnative_shared::events::UserCreatedEvent;
use cloudnative_shared::kafka::{EventPublisher, publish_event};
use cloudnative_shared::observability::metrics;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::dto::CreateUserRequest;
use crate::error::{Result, UserError};
use crate::models::{NewUser, User};
use crate::repository::UserRepositoryTrait;

pub struct UserService {
    repo: Arc<dyn UserRepositoryTrait>,
    publisher: Arc<dyn EventPublisher>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepositoryTrait>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { repo, publisher }
    }

    /// 创建用户并发布 `user.created` 事件
    #[instrument(skip(self, request))]
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User> {
        let request = request.trimmed();
        request.validate()?;

        if self.repo.find_by_email(&request.email).await?.is_some() {
            warn!(email = %request.email, "邮箱已被注册");
            return Err(UserError::EmailAlreadyExists(request.email));
        }

        let user = self
            .repo
            .create(&NewUser {
                name: request.name,
                email: request.email,
            })
            .await?;

        let event = UserCreatedEvent::new(user.id, &user.name, &user.email, user.created_at);
        publish_event(self.publisher.as_ref(), &event)
            .await
            .map_err(UserError::EventPublish)?;

        metrics::record_user_created(user.email_domain());
        info!(user_id = user.id, event_id = %event.event_id, "用户已创建");

        Ok(user)
    }

    /// 按 ID 查询用户
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(UserError::UserNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepositoryTrait;
    use crate::testing::InMemoryUserRepository;
    use chrono::Utc;
    use cloudnative_shared::kafka::topics;
    use cloudnative_shared::test_utils::RecordingPublisher;

    fn service_with(
        repo: Arc<dyn UserRepositoryTrait>,
    ) -> (UserService, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::new());
        (UserService::new(repo, publisher.clone()), publisher)
    }

    #[tokio::test]
    async fn test_create_user_persists_and_publishes() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let (service, publisher) = service_with(repo.clone());

        let user = service
            .create_user(&CreateUserRequest::new("Alice", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(repo.len(), 1);

        let events: Vec<UserCreatedEvent> = publisher.events(topics::USER_EVENTS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, "1");
        assert_eq!(events[0].email, "alice@example.com");
        assert_eq!(events[0].name, "Alice");
        assert_eq!(events[0].event_type, "user.created");
        assert_eq!(publisher.messages()[0].key, "1");
    }

    #[tokio::test]
    async fn test_create_user_trims_input() {
        let (service, _) = service_with(Arc::new(InMemoryUserRepository::new()));

        let user = service
            .create_user(&CreateUserRequest::new("  Bob  ", " bob@example.com "))
            .await
            .unwrap();

        assert_eq!(user.name, "Bob");
        assert_eq!(user.email, "bob@example.com");
    }

    #[tokio::test]
    async fn test_blank_name_rejected_without_side_effects() {
        let mut repo = MockUserRepositoryTrait::new();
        repo.expect_find_by_email().never();
        repo.expect_create().never();
        let (service, publisher) = service_with(Arc::new(repo));

        let result = service
            .create_user(&CreateUserRequest::new("  ", "alice@example.com"))
            .await;

        assert!(matches!(result, Err(UserError::Validation(ref m)) if m.contains("name")));
        assert!(publisher.messages().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_email_rejected() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let (service, publisher) = service_with(repo.clone());

        let result = service
            .create_user(&CreateUserRequest::new("Alice", "alice.example.com"))
            .await;

        assert!(matches!(result, Err(UserError::Validation(ref m)) if m.contains("email")));
        assert!(repo.is_empty());
        assert!(publisher.messages().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (service, publisher) = service_with(Arc::new(InMemoryUserRepository::new()));
        let request = CreateUserRequest::new("Alice", "alice@example.com");

        service.create_user(&request).await.unwrap();
        let result = service.create_user(&request).await;

        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
        assert_eq!(publisher.count(topics::USER_EVENTS), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_is_surfaced() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let publisher = Arc::new(RecordingPublisher::failing());
        let service = UserService::new(repo.clone(), publisher);

        let result = service
            .create_user(&CreateUserRequest::new("Alice", "alice@example.com"))
            .await;

        assert!(matches!(result, Err(UserError::EventPublish(_))));
        // 用户已落库，不回滚
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_database_error_propagates() {
        let mut repo = MockUserRepositoryTrait::new();
        repo.expect_find_by_email()
            .returning(|_| Err(UserError::Database(sqlx::Error::PoolTimedOut)));
        let (service, _) = service_with(Arc::new(repo));

        let result = service
            .create_user(&CreateUserRequest::new("Alice", "alice@example.com"))
            .await;

        assert!(matches!(result, Err(UserError::Database(_))));
    }

    #[tokio::test]
    async fn test_get_user() {
        let mut repo = MockUserRepositoryTrait::new();
        repo.expect_find_by_id()
            .withf(|id| *id == 42)
            .returning(|id| {
                Ok(Some(User {
                    id,
                    name: "Alice".to_string(),
                    email: "alice@example.com".to_string(),
                    created_at: Utc::now(),
                }))
            });
        repo.expect_find_by_id()
            .withf(|id| *id != 42)
            .returning(|_| Ok(None));
        let (service, _) = service_with(Arc::new(repo));

        assert_eq!(service.get_user(42).await.unwrap().name, "Alice");
        assert!(matches!(
            service.get_user(7).await,
            Err(UserError::UserNotFound(7))
        ));
    }
}
