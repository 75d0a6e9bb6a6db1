use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// 来源字段缺失或类型不符时使用的来源名
pub const UNKNOWN_SOURCE: &str = "unknown";

/// 交易来源文档类型
///
/// 后端存储中的取值为字符串，无法识别的取值原样保留在 `Other` 中，
/// 既不报错也不丢失。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentSource {
    BankStatement,
    Invoice,
    Receipt,
    Other(String),
}

impl DocumentSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::BankStatement => "bank_statement",
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for DocumentSource {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "bank_statement" => Self::BankStatement,
            "invoice" => Self::Invoice,
            "receipt" => Self::Receipt,
            _ => Self::Other(raw),
        }
    }
}

impl From<DocumentSource> for String {
    fn from(source: DocumentSource) -> Self {
        match source {
            DocumentSource::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 借贷方向: credit 记为收入, debit 记为支出
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DebitCredit {
    Debit,
    Credit,
    Other(String),
}

impl DebitCredit {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for DebitCredit {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "debit" => Self::Debit,
            "credit" => Self::Credit,
            _ => Self::Other(raw),
        }
    }
}

impl From<DebitCredit> for String {
    fn from(direction: DebitCredit) -> Self {
        match direction {
            DebitCredit::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// 付款状态
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cleared,
    Overdue,
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cleared => "cleared",
            Self::Overdue => "overdue",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => Self::Pending,
            "paid" => Self::Paid,
            "cleared" => Self::Cleared,
            "overdue" => Self::Overdue,
            _ => Self::Other(raw),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 交易记录 (从银行流水/发票/收据中提取, 只读)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: String,
    pub document_source: DocumentSource,
    /// 原始日期字符串, 解析失败时不参与按月/按日期统计
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub debit_credit: Option<DebitCredit>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,

    // 以下为展示字段, 不参与汇总
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub line_items: Option<Value>,
}

impl Transaction {
    /// 构造只含汇总必需字段的交易, 其余展示字段为空
    pub fn new(id: impl Into<String>, document_source: DocumentSource) -> Self {
        Self {
            id: id.into(),
            document_source,
            transaction_date: None,
            amount: None,
            currency: None,
            debit_credit: None,
            payment_status: None,
            description: None,
            counterparty: None,
            reference_number: None,
            invoice_number: None,
            due_date: None,
            payment_method: None,
            line_items: None,
        }
    }

    /// 宽松解码单条 JSON 交易
    ///
    /// 只有非对象输入返回 `None`。对象内类型不符的字段一律视为缺失:
    /// 非字符串日期不参与按月统计, 无法解析的金额按 0 计, 非字符串状态
    /// 归入 "unknown"。来源缺失时记为 "unknown"。
    pub fn from_json_lenient(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let id = match obj.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let document_source = text_field(obj, "document_source")
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
            .into();

        Some(Self {
            id,
            document_source,
            transaction_date: text_field(obj, "transaction_date"),
            amount: obj.get("amount").and_then(decimal_value),
            currency: text_field(obj, "currency"),
            debit_credit: text_field(obj, "debit_credit").map(Into::into),
            payment_status: text_field(obj, "payment_status").map(Into::into),
            description: text_field(obj, "description"),
            counterparty: text_field(obj, "counterparty"),
            reference_number: text_field(obj, "reference_number"),
            invoice_number: text_field(obj, "invoice_number"),
            due_date: text_field(obj, "due_date"),
            payment_method: text_field(obj, "payment_method"),
            line_items: obj.get("line_items").filter(|v| !v.is_null()).cloned(),
        })
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// 金额可以是 JSON 数字或数字字符串, 其他情况视为缺失
fn decimal_value(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// 交易的获取范围: 某个用户, 可选限定到一个客户
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionScope {
    pub user_id: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl TransactionScope {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            client_id: None,
        }
    }

    pub fn client(user_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            client_id: Some(client_id.into()),
        }
    }
}

impl fmt::Display for TransactionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.client_id {
            Some(client_id) => write!(f, "user={} client={}", self.user_id, client_id),
            None => write!(f, "user={}", self.user_id),
        }
    }
}
