//! 订单业务逻辑
//!
//! 处理流程：事件类型校验 -> 解析 userId -> 认领事件 -> 创建占位订单
//! -> 发布 `order.processed`。
//!
//! 认领在写订单之前完成，并发重投的同一事件只有一方能认领成功。
//! 订单写入失败时撤销认领；发布失败时保留认领，重投不会产生第二笔订单。

use std::sync::Arc;

use cloudnative_shared::events::{OrderProcessedEvent, UserCreatedEvent, event_types};
use cloudnative_shared::idempotency::IdempotencyStore;
use cloudnative_shared::kafka::{EventPublisher, publish_event};
use cloudnative_shared::observability::metrics;
use tracing::{info, instrument, warn};

use crate::error::{OrderError, Result};
use crate::models::{NewOrder, Order, OrderStatus};
use crate::repository::OrderRepositoryTrait;

/// 幂等记录中的消费者名，与消费组同名
pub const CONSUMER_NAME: &str = "order-service";

/// 占位订单金额
pub const PLACEHOLDER_AMOUNT: f64 = 100.0;

pub struct OrderService {
    repo: Arc<dyn OrderRepositoryTrait>,
    idempotency: Arc<dyn IdempotencyStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn OrderRepositoryTrait>,
        idempotency: Arc<dyn IdempotencyStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repo,
            idempotency,
            publisher,
        }
    }

    /// 为新用户创建占位订单
    #[instrument(skip(self, event), fields(event_id = %event.event_id, user_id = %event.user_id))]
    pub async fn on_user_created(&self, event: &UserCreatedEvent) -> Result<Order> {
        if event.event_type != event_types::USER_CREATED {
            return Err(OrderError::UnsupportedEventType {
                event_type: event.event_type.clone(),
            });
        }

        let user_id: i64 = event.user_id.parse().map_err(|_| {
            OrderError::InvalidEvent(format!("userId 不是数字: {}", event.user_id))
        })?;

        if !self
            .idempotency
            .mark_processed(CONSUMER_NAME, &event.event_id)
            .await?
        {
            return Err(OrderError::AlreadyProcessed {
                event_id: event.event_id.clone(),
            });
        }

        let created = self
            .repo
            .create(&NewOrder {
                user_id,
                total_amount: PLACEHOLDER_AMOUNT,
                status: OrderStatus::Pending,
            })
            .await;

        let order = match created {
            Ok(order) => order,
            Err(e) => {
                if let Err(release_err) = self
                    .idempotency
                    .release(CONSUMER_NAME, &event.event_id)
                    .await
                {
                    // 认领未撤销，该事件重投时会被当作重复跳过
                    warn!(error = %release_err, "撤销事件认领失败");
                }
                return Err(e);
            }
        };

        metrics::record_order_created(order.status.as_str());

        let processed = OrderProcessedEvent::new(
            order.id,
            order.user_id.to_string(),
            order.total_amount,
            order.status.as_str(),
            order.created_at,
        );
        publish_event(self.publisher.as_ref(), &processed)
            .await
            .map_err(OrderError::EventPublish)?;

        info!(order_id = order.id, "订单已创建");
        Ok(order)
    }

    /// 查询用户的全部订单，按 ID 升序
    #[instrument(skip(self))]
    pub async fn get_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        self.repo.list_by_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockOrderRepositoryTrait;
    use crate::testing::InMemoryOrderRepository;
    use chrono::Utc;
    use cloudnative_shared::idempotency::MemoryIdempotencyStore;
    use cloudnative_shared::kafka::topics;
    use cloudnative_shared::test_utils::{RecordingPublisher, TestDataGenerator};

    struct Fixture {
        service: OrderService,
        repo: Arc<InMemoryOrderRepository>,
        publisher: Arc<RecordingPublisher>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let service = OrderService::new(
            repo.clone(),
            Arc::new(MemoryIdempotencyStore::new()),
            publisher.clone(),
        );
        Fixture {
            service,
            repo,
            publisher,
        }
    }

    #[tokio::test]
    async fn test_user_created_creates_pending_order() {
        let f = fixture();
        let event = TestDataGenerator::user_created_event(5);

        let order = f.service.on_user_created(&event).await.unwrap();

        assert_eq!(order.user_id, 5);
        assert_eq!(order.total_amount, PLACEHOLDER_AMOUNT);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(f.repo.all().len(), 1);

        let events: Vec<OrderProcessedEvent> = f.publisher.events(topics::ORDER_EVENTS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].order_id, order.id.to_string());
        assert_eq!(events[0].user_id, "5");
        assert_eq!(events[0].total_amount, 100.0);
        assert_eq!(events[0].status, "PENDING");
        assert_eq!(f.publisher.messages()[0].key, order.id.to_string());
    }

    #[tokio::test]
    async fn test_redelivered_event_creates_single_order() {
        let f = fixture();
        let event = TestDataGenerator::user_created_event(5);

        f.service.on_user_created(&event).await.unwrap();
        let second = f.service.on_user_created(&event).await;

        assert!(matches!(second, Err(OrderError::AlreadyProcessed { .. })));
        assert_eq!(f.repo.all().len(), 1);
        assert_eq!(f.publisher.count(topics::ORDER_EVENTS), 1);
    }

    #[tokio::test]
    async fn test_distinct_events_create_distinct_orders() {
        let f = fixture();

        f.service
            .on_user_created(&TestDataGenerator::user_created_event(5))
            .await
            .unwrap();
        f.service
            .on_user_created(&TestDataGenerator::user_created_event(5))
            .await
            .unwrap();

        let orders = f.service.get_orders_by_user(5).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders[0].id < orders[1].id);
        assert!(f.service.get_orders_by_user(6).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_event_type_rejected() {
        let f = fixture();
        let mut event = TestDataGenerator::user_created_event(5);
        event.event_type = "order.processed".to_string();

        let result = f.service.on_user_created(&event).await;

        assert!(matches!(result, Err(OrderError::UnsupportedEventType { .. })));
        assert!(f.repo.all().is_empty());
    }

    #[tokio::test]
    async fn test_non_numeric_user_id_rejected() {
        let f = fixture();
        let mut event = TestDataGenerator::user_created_event(5);
        event.user_id = "user-5".to_string();

        let result = f.service.on_user_created(&event).await;

        assert!(matches!(result, Err(OrderError::InvalidEvent(_))));
        assert!(f.publisher.messages().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_event_marked() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let idempotency = Arc::new(MemoryIdempotencyStore::new());
        let publisher = Arc::new(RecordingPublisher::failing());
        let service = OrderService::new(repo.clone(), idempotency.clone(), publisher.clone());
        let event = TestDataGenerator::user_created_event(9);

        let result = service.on_user_created(&event).await;
        assert!(matches!(result, Err(OrderError::EventPublish(_))));

        // 重投不会再建订单
        publisher.set_failing(false);
        let retry = service.on_user_created(&event).await;
        assert!(matches!(retry, Err(OrderError::AlreadyProcessed { .. })));
        assert_eq!(repo.all().len(), 1);
    }

    #[tokio::test]
    async fn test_repository_failure_does_not_mark_event() {
        let mut repo = MockOrderRepositoryTrait::new();
        repo.expect_create()
            .times(1)
            .returning(|_| Err(OrderError::Database(sqlx::Error::PoolTimedOut)));
        let idempotency = Arc::new(MemoryIdempotencyStore::new());
        let service = OrderService::new(
            Arc::new(repo),
            idempotency.clone(),
            Arc::new(RecordingPublisher::new()),
        );
        let event = TestDataGenerator::user_created_event(1);

        let result = service.on_user_created(&event).await;

        assert!(matches!(result, Err(OrderError::Database(_))));
        assert!(idempotency.is_empty());
    }

    /// 写入前让出执行权，使并发调用在写入阶段交错
    struct YieldingRepository(InMemoryOrderRepository);

    #[async_trait::async_trait]
    impl OrderRepositoryTrait for YieldingRepository {
        async fn create(&self, order: &NewOrder) -> Result<Order> {
            tokio::task::yield_now().await;
            self.0.create(order).await
        }

        async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
            self.0.list_by_user(user_id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_redelivery_creates_single_order() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = OrderService::new(
            Arc::new(YieldingRepository(InMemoryOrderRepository::new())),
            Arc::new(MemoryIdempotencyStore::new()),
            publisher.clone(),
        );
        let event = TestDataGenerator::user_created_event(8);

        let (first, second) = tokio::join!(
            service.on_user_created(&event),
            service.on_user_created(&event)
        );

        let created = [&first, &second].iter().filter(|r| r.is_ok()).count();
        let skipped = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(OrderError::AlreadyProcessed { .. })))
            .count();
        assert_eq!((created, skipped), (1, 1));
        assert_eq!(service.get_orders_by_user(8).await.unwrap().len(), 1);
        assert_eq!(publisher.count(topics::ORDER_EVENTS), 1);
    }

    #[tokio::test]
    async fn test_repository_failure_allows_redelivery() {
        let mut repo = MockOrderRepositoryTrait::new();
        let mut calls = 0;
        repo.expect_create().times(2).returning(move |new_order| {
            calls += 1;
            if calls == 1 {
                return Err(OrderError::Database(sqlx::Error::PoolTimedOut));
            }
            let now = Utc::now();
            Ok(Order {
                id: 1,
                user_id: new_order.user_id,
                total_amount: new_order.total_amount,
                status: new_order.status,
                created_at: now,
                updated_at: now,
            })
        });
        let service = OrderService::new(
            Arc::new(repo),
            Arc::new(MemoryIdempotencyStore::new()),
            Arc::new(RecordingPublisher::new()),
        );
        let event = TestDataGenerator::user_created_event(1);

        assert!(service.on_user_created(&event).await.is_err());
        let order = service.on_user_created(&event).await.unwrap();

        assert_eq!(order.user_id, 1);
    }

    #[tokio::test]
    async fn test_get_orders_by_user_uses_repository() {
        let mut repo = MockOrderRepositoryTrait::new();
        repo.expect_list_by_user()
            .withf(|user_id| *user_id == 3)
            .returning(|user_id| {
                let now = Utc::now();
                Ok(vec![Order {
                    id: 1,
                    user_id,
                    total_amount: 100.0,
                    status: OrderStatus::Pending,
                    created_at: now,
                    updated_at: now,
                }])
            });
        let service = OrderService::new(
            Arc::new(repo),
            Arc::new(MemoryIdempotencyStore::new()),
            Arc::new(RecordingPublisher::new()),
        );

        let orders = service.get_orders_by_user(3).await.unwrap();
        assert_eq!(orders.len(), 1);
    }
}
