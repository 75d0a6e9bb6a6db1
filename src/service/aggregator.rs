use crate::error::{AppError, Result};
use crate::models::{DebitCredit, Transaction, TransactionSummary};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

/// 缺省付款状态在汇总中的桶名
pub const UNKNOWN_STATUS: &str = "unknown";

/// 解析交易日期
///
/// 支持 `YYYY-MM-DD`, RFC 3339 时间戳 (换算到 UTC) 以及 Postgres 文本格式的
/// 时间戳。无法解析时返回 `None`。
pub fn parse_transaction_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.date());
    }
    None
}

fn transaction_day(tx: &Transaction) -> Option<NaiveDate> {
    tx.transaction_date.as_deref().and_then(parse_transaction_date)
}

/// 汇总交易列表
///
/// 单次遍历:
/// - credit 计入总收入, debit 计入总支出, 其他方向两者都不计
/// - 每笔金额都计入来源桶 (与借贷方向无关)
/// - 付款状态缺省时计入 "unknown" 桶
/// - 日期可解析时按 "YYYY-MM" 计入月份桶
///
/// 缺失金额按 0 处理。不修改输入, 不会失败。
pub fn summarize(transactions: &[Transaction]) -> TransactionSummary {
    let zero = BigDecimal::zero();
    let mut summary = TransactionSummary::empty();

    for tx in transactions {
        let amount = tx.amount.as_ref().unwrap_or(&zero);

        match tx.debit_credit {
            Some(DebitCredit::Credit) => summary.total_income += amount,
            Some(DebitCredit::Debit) => summary.total_expenses += amount,
            _ => {}
        }

        *summary
            .by_source
            .entry(tx.document_source.as_str().to_string())
            .or_insert_with(BigDecimal::zero) += amount;

        let status = tx
            .payment_status
            .as_ref()
            .map(|s| s.as_str())
            .unwrap_or(UNKNOWN_STATUS);
        *summary.by_status.entry(status.to_string()).or_insert(0) += 1;

        match transaction_day(tx) {
            Some(day) => {
                *summary
                    .by_month
                    .entry(day.format("%Y-%m").to_string())
                    .or_insert_with(BigDecimal::zero) += amount;
            }
            None => {
                if let Some(raw) = &tx.transaction_date {
                    tracing::trace!(
                        "Transaction {} has unparseable date {:?}, skipping month bucket",
                        tx.id,
                        raw
                    );
                }
            }
        }
    }

    summary.net_amount = &summary.total_income - &summary.total_expenses;
    summary.transaction_count = transactions.len();
    summary
}

/// 按日期区间过滤 (两端都包含), 无有效日期的交易被排除, 保持原顺序
pub fn filter_by_date_range(
    transactions: &[Transaction],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| matches!(transaction_day(tx), Some(day) if start <= day && day <= end))
        .cloned()
        .collect()
}

/// 按来源精确匹配, 未知来源返回空列表
pub fn filter_by_source(transactions: &[Transaction], source: &str) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| tx.document_source.as_str() == source)
        .cloned()
        .collect()
}

/// 按原始付款状态精确匹配
///
/// 注意: 与 [`summarize`] 不同, 这里不把缺省状态归为 "unknown",
/// 所以状态缺省的交易永远不会被匹配。
pub fn filter_by_status(transactions: &[Transaction], status: &str) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| tx.payment_status.as_ref().is_some_and(|s| s.as_str() == status))
        .cloned()
        .collect()
}

/// 汇总未经类型校验的 JSON 输入
///
/// 非数组输入, 或数组元素不是对象, 属于调用方违约, 返回 `InvalidArgument`。
/// 对象内字段宽松解码 (见 [`Transaction::from_json_lenient`]): 类型不符的字段
/// 视为缺失, 按汇总规则降级, 不会导致失败。
pub fn summarize_json(payload: &serde_json::Value) -> Result<TransactionSummary> {
    let items = payload.as_array().ok_or_else(|| {
        AppError::InvalidArgument(format!(
            "expected an array of transactions, got {}",
            json_kind(payload)
        ))
    })?;

    let transactions = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            Transaction::from_json_lenient(item).ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "transaction at index {} is {}, expected an object",
                    idx,
                    json_kind(item)
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(summarize(&transactions))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// 列表视图的组合过滤条件 (来自查询参数)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub source: Option<String>,
    pub status: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.status.is_none() && self.start.is_none() && self.end.is_none()
    }

    /// 依次应用来源、状态、日期过滤; 只给出一端时另一端不设限
    pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        let mut result = transactions.to_vec();
        if let Some(source) = &self.source {
            result = filter_by_source(&result, source);
        }
        if let Some(status) = &self.status {
            result = filter_by_status(&result, status);
        }
        if self.start.is_some() || self.end.is_some() {
            let start = self.start.unwrap_or(NaiveDate::MIN);
            let end = self.end.unwrap_or(NaiveDate::MAX);
            result = filter_by_date_range(&result, start, end);
        }
        result
    }
}
