pub mod handlers;

pub use handlers::*;

use crate::service::{LedgerService, NotificationCenter};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// 共享状态: 账本服务 + 通知中心 (均在启动时构造并注入)
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
    pub notifications: NotificationCenter,
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    let transaction_routes = Router::new()
        .route("/api/transactions", get(handlers::list_transactions))
        .route("/api/transactions/summary", get(handlers::transaction_summary))
        .route("/api/transactions/export", get(handlers::export_transactions))
        .route("/api/transactions/refresh", post(handlers::refresh_transactions))
        .route("/api/transactions/summarize", post(handlers::summarize_payload));

    let notification_routes = Router::new()
        .route(
            "/api/notifications",
            get(handlers::list_notifications).post(handlers::publish_notification),
        )
        .route("/api/notifications/:id", delete(handlers::dismiss_notification));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(transaction_routes)
        .merge(notification_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DebitCredit, DocumentSource, PaymentStatus, Transaction, TransactionScope,
    };
    use crate::service::ledger::tests::MemorySource;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use bigdecimal::BigDecimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn sample_state() -> AppState {
        let source = MemorySource::default();
        let mut paid = Transaction::new("t1", DocumentSource::Invoice);
        paid.amount = Some(BigDecimal::from(100));
        paid.debit_credit = Some(DebitCredit::Credit);
        paid.payment_status = Some(PaymentStatus::Paid);
        paid.transaction_date = Some("2024-03-05".into());

        let mut pending = Transaction::new("t2", DocumentSource::Receipt);
        pending.amount = Some(BigDecimal::from(40));
        pending.debit_credit = Some(DebitCredit::Debit);
        pending.payment_status = Some(PaymentStatus::Pending);
        pending.transaction_date = Some("2024-03-20".into());

        source
            .data
            .lock()
            .unwrap()
            .insert(TransactionScope::user("u1"), vec![paid, pending]);

        AppState {
            ledger: Arc::new(LedgerService::new(Arc::new(source))),
            notifications: NotificationCenter::new(None),
        }
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health() {
        let (status, body) = call(router(sample_state()), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn list_applies_query_filters() {
        let (status, body) = call(
            router(sample_state()),
            get_request(
                "/api/transactions?user_id=u1&status=pending&start=2024-03-20&end=2024-03-20",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["transactions"][0]["id"], "t2");
    }

    #[tokio::test]
    async fn summary_uses_camel_case_fields() {
        let (status, body) =
            call(router(sample_state()), get_request("/api/transactions/summary?user_id=u1")).await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        let summary = &body["summary"];
        assert_eq!(summary["transactionCount"], 2);
        assert_eq!(summary["byStatus"]["paid"], 1);
        assert_eq!(summary["byStatus"]["pending"], 1);
        assert!(summary.get("byMonth").is_some());
    }

    #[tokio::test]
    async fn summary_honours_query_filters() {
        let (status, body) = call(
            router(sample_state()),
            get_request("/api/transactions/summary?user_id=u1&status=paid"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        let summary = &body["summary"];
        assert_eq!(summary["transactionCount"], 1);
        assert_eq!(summary["byStatus"]["paid"], 1);
        assert!(summary["byStatus"].get("pending").is_none());
        assert!(summary["bySource"].get("receipt").is_none());
    }

    #[tokio::test]
    async fn summarize_degrades_malformed_fields() {
        let payload = json!([
            {"amount": "abc", "debit_credit": "credit", "document_source": "receipt"},
            {"amount": 10, "payment_status": 3, "transaction_date": 20240305,
             "debit_credit": "credit", "document_source": "receipt"}
        ]);
        let (status, body) =
            call(router(sample_state()), post_json("/api/transactions/summarize", payload)).await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["summary"]["transactionCount"], 2);
        assert_eq!(body["summary"]["byStatus"]["unknown"], 2);
        assert_eq!(body["summary"]["byMonth"], json!({}));
    }

    #[tokio::test]
    async fn unknown_scope_is_not_found() {
        let (status, _) =
            call(router(sample_state()), get_request("/api/transactions?user_id=nobody")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summarize_rejects_non_array_payload() {
        let (status, body) = call(
            router(sample_state()),
            post_json("/api/transactions/summarize", json!({"amount": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn summarize_accepts_array_payload() {
        let payload = json!([
            {"amount": 10, "debit_credit": "credit", "document_source": "receipt"},
            {"amount": null, "debit_credit": "debit", "document_source": "receipt"}
        ]);
        let (status, body) =
            call(router(sample_state()), post_json("/api/transactions/summarize", payload)).await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["summary"]["transactionCount"], 2);
        assert_eq!(body["summary"]["byStatus"]["unknown"], 2);
    }

    #[tokio::test]
    async fn refresh_publishes_notification() {
        let state = sample_state();
        let notifications = state.notifications.clone();

        let (status, _) = call(
            router(state),
            post_json("/api/transactions/refresh", json!({"user_id": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let current = notifications.current();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].message.as_deref(), Some("Loaded 2 transactions"));
    }

    #[tokio::test]
    async fn export_returns_csv() {
        let (status, body) = call(
            router(sample_state()),
            get_request("/api/transactions/export?user_id=u1&source=invoice"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let text = String::from_utf8(body).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("t1,invoice,2024-03-05,100,"));
    }

    #[tokio::test]
    async fn dismiss_unknown_notification_is_not_found() {
        let state = sample_state();
        let id = state
            .notifications
            .publish(crate::models::NewNotification::success("hello"));
        let app = router(state);

        let delete = |id: u64| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/notifications/{}", id))
                .body(Body::empty())
                .unwrap()
        };

        let (status, _) = call(app.clone(), delete(id)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(app, delete(id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
