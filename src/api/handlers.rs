use crate::api::AppState;
use crate::db::export_to_csv;
use crate::error::{AppError, Result};
use crate::models::{
    NewNotification, Notification, Transaction, TransactionScope, TransactionSummary,
};
use crate::service::{summarize, summarize_json, TransactionFilter};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 查询参数: 作用域 + 可选过滤条件
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub user_id: String,
    pub client_id: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TransactionQuery {
    fn scope(&self) -> TransactionScope {
        TransactionScope {
            user_id: self.user_id.clone(),
            client_id: self.client_id.clone(),
        }
    }

    fn filter(&self) -> TransactionFilter {
        TransactionFilter {
            source: self.source.clone(),
            status: self.status.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// 交易列表响应体
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub success: bool,
    pub count: usize,
    pub transactions: Vec<Transaction>,
}

/// 汇总响应体
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub message: String,
    pub summary: TransactionSummary,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub id: u64,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 交易列表 (按来源/状态/日期过滤)
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionListResponse>> {
    let snapshot = state.ledger.snapshot(&query.scope()).await?;
    let transactions = query.filter().apply(snapshot.transactions());

    Ok(Json(TransactionListResponse {
        success: true,
        count: transactions.len(),
        transactions,
    }))
}

/// 作用域交易的汇总
///
/// 无过滤条件时直接返回快照上缓存的汇总, 否则对过滤结果重新汇总。
pub async fn transaction_summary(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<SummaryResponse>> {
    let snapshot = state.ledger.snapshot(&query.scope()).await?;
    let filter = query.filter();

    let summary = if filter.is_empty() {
        snapshot.summary().clone()
    } else {
        summarize(&filter.apply(snapshot.transactions()))
    };

    Ok(Json(SummaryResponse {
        success: true,
        message: format!(
            "Summary of {} transactions as of {}",
            summary.transaction_count,
            snapshot.fetched_at().to_rfc3339()
        ),
        summary,
    }))
}

/// 导出过滤后的交易为 CSV
pub async fn export_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Response> {
    let snapshot = state.ledger.snapshot(&query.scope()).await?;
    let transactions = query.filter().apply(snapshot.transactions());

    let mut body = Vec::new();
    export_to_csv(&mut body, &transactions)?;
    tracing::info!("Exported {} transactions for {}", transactions.len(), query.scope());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"transactions.csv\""),
        ],
        body,
    )
        .into_response())
}

/// 重新拉取作用域数据并返回新的汇总
pub async fn refresh_transactions(
    State(state): State<AppState>,
    Json(scope): Json<TransactionScope>,
) -> Result<Json<SummaryResponse>> {
    let snapshot = state.ledger.refresh(&scope).await?;
    let count = snapshot.transactions().len();

    state.notifications.publish(
        NewNotification::success("Transactions refreshed")
            .with_message(format!("Loaded {} transactions", count)),
    );

    Ok(Json(SummaryResponse {
        success: true,
        message: format!("Successfully refreshed {} transactions", count),
        summary: snapshot.summary().clone(),
    }))
}

/// 汇总请求体中的交易数组 (不经过缓存)
pub async fn summarize_payload(
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<SummaryResponse>> {
    let summary = summarize_json(&payload)?;

    Ok(Json(SummaryResponse {
        success: true,
        message: format!("Summarized {} transactions", summary.transaction_count),
        summary,
    }))
}

pub async fn list_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.notifications.current())
}

pub async fn publish_notification(
    State(state): State<AppState>,
    Json(new): Json<NewNotification>,
) -> (StatusCode, Json<PublishResponse>) {
    let id = state.notifications.publish(new);
    (StatusCode::CREATED, Json(PublishResponse { id }))
}

pub async fn dismiss_notification(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    if state.notifications.dismiss(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("notification {}", id)))
    }
}
