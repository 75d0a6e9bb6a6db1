use crate::error::Result;
use crate::models::{Transaction, TransactionScope};
use bigdecimal::BigDecimal;
use sqlx::{FromRow, PgPool};
use std::io::Write;
use std::time::{Duration, Instant};

/// 交易表原始行 (枚举列按文本读取, 再转换为领域类型)
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: String,
    pub document_source: String,
    pub transaction_date: Option<String>,
    pub amount: Option<BigDecimal>,
    pub currency: Option<String>,
    pub debit_credit: Option<String>,
    pub payment_status: Option<String>,
    pub description: Option<String>,
    pub counterparty: Option<String>,
    pub reference_number: Option<String>,
    pub invoice_number: Option<String>,
    pub due_date: Option<String>,
    pub payment_method: Option<String>,
    pub line_items: Option<serde_json::Value>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: row.id,
            document_source: row.document_source.into(),
            transaction_date: row.transaction_date,
            amount: row.amount,
            currency: row.currency,
            debit_credit: row.debit_credit.map(Into::into),
            payment_status: row.payment_status.map(Into::into),
            description: row.description,
            counterparty: row.counterparty,
            reference_number: row.reference_number,
            invoice_number: row.invoice_number,
            due_date: row.due_date,
            payment_method: row.payment_method,
            line_items: row.line_items,
        }
    }
}

/// 查询作用域内的全部交易 (最新在前)
pub async fn list_transactions(
    pool: &PgPool,
    scope: &TransactionScope,
) -> std::result::Result<Vec<Transaction>, sqlx::Error> {
    let start_time = Instant::now();

    let query = sqlx::query_as::<_, TransactionRow>(
        r#"
        SELECT id::text AS id,
               document_source,
               transaction_date::text AS transaction_date,
               amount,
               currency,
               debit_credit,
               payment_status,
               description,
               counterparty,
               reference_number,
               invoice_number,
               due_date::text AS due_date,
               payment_method,
               line_items
        FROM transactions
        WHERE user_id::text = $1
          AND ($2::text IS NULL OR client_id::text = $2)
        ORDER BY transactions.transaction_date DESC NULLS LAST, transactions.created_at DESC
        "#
    )
    .bind(&scope.user_id)
    .bind(scope.client_id.as_deref())
    .fetch_all(pool);

    // 添加超时控制: 30秒
    match tokio::time::timeout(Duration::from_secs(30), query).await {
        Ok(Ok(rows)) => {
            tracing::debug!(
                "查询交易 {} 条 ({}), 耗时: {:?}",
                rows.len(),
                scope,
                start_time.elapsed()
            );
            Ok(rows.into_iter().map(Transaction::from).collect())
        }
        Ok(Err(e)) => {
            tracing::error!(
                "查询交易失败 ({}), 耗时: {:?}, 错误: {:?}",
                scope,
                start_time.elapsed(),
                e
            );
            Err(e)
        }
        Err(_) => {
            tracing::error!("查询交易超时 (>30秒), {}", scope);
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

const CSV_HEADER: [&str; 13] = [
    "id",
    "document_source",
    "transaction_date",
    "amount",
    "currency",
    "debit_credit",
    "payment_status",
    "description",
    "counterparty",
    "reference_number",
    "invoice_number",
    "due_date",
    "payment_method",
];

/// 导出交易到 CSV (缺失值输出为空)
pub fn export_to_csv<W: Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    for tx in transactions {
        let amount = tx.amount.as_ref().map(|v| v.to_string()).unwrap_or_default();
        writer.write_record([
            tx.id.as_str(),
            tx.document_source.as_str(),
            tx.transaction_date.as_deref().unwrap_or_default(),
            amount.as_str(),
            tx.currency.as_deref().unwrap_or_default(),
            tx.debit_credit.as_ref().map(|d| d.as_str()).unwrap_or_default(),
            tx.payment_status.as_ref().map(|s| s.as_str()).unwrap_or_default(),
            tx.description.as_deref().unwrap_or_default(),
            tx.counterparty.as_deref().unwrap_or_default(),
            tx.reference_number.as_deref().unwrap_or_default(),
            tx.invoice_number.as_deref().unwrap_or_default(),
            tx.due_date.as_deref().unwrap_or_default(),
            tx.payment_method.as_deref().unwrap_or_default(),
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DebitCredit, DocumentSource, PaymentStatus};

    #[test]
    fn row_conversion_maps_enum_columns() {
        let row = TransactionRow {
            id: "42".into(),
            document_source: "invoice".into(),
            transaction_date: Some("2024-03-05".into()),
            amount: Some(BigDecimal::from(100)),
            currency: Some("USD".into()),
            debit_credit: Some("credit".into()),
            payment_status: None,
            description: None,
            counterparty: Some("Acme LLC".into()),
            reference_number: None,
            invoice_number: Some("INV-7".into()),
            due_date: None,
            payment_method: None,
            line_items: None,
        };

        let tx = Transaction::from(row);
        assert_eq!(tx.document_source, DocumentSource::Invoice);
        assert_eq!(tx.debit_credit, Some(DebitCredit::Credit));
        assert_eq!(tx.payment_status, None);
        assert_eq!(tx.invoice_number.as_deref(), Some("INV-7"));
    }

    #[test]
    fn csv_export_writes_header_and_blank_optionals() {
        let mut tx = Transaction::new("t1", DocumentSource::Receipt);
        tx.amount = Some("12.50".parse().unwrap());
        tx.payment_status = Some(PaymentStatus::Overdue);
        tx.description = Some("Office, supplies".into());

        let mut out = Vec::new();
        export_to_csv(&mut out, &[tx]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "t1,receipt,,12.50,,,overdue,\"Office, supplies\",,,,,"
        );
        assert!(lines.next().is_none());
    }
}
