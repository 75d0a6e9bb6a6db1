use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 交易汇总 (按需计算, 不持久化)
///
/// 映射使用 `BTreeMap`, 比较与序列化只依赖内容, 与输入顺序无关。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_income: BigDecimal,
    pub total_expenses: BigDecimal,
    pub net_amount: BigDecimal,
    pub transaction_count: usize,
    pub by_source: BTreeMap<String, BigDecimal>,   // 来源 -> 金额合计
    pub by_status: BTreeMap<String, usize>,        // 状态 (缺省为 "unknown") -> 笔数
    pub by_month: BTreeMap<String, BigDecimal>,    // "YYYY-MM" -> 金额合计
}

impl TransactionSummary {
    pub fn empty() -> Self {
        Self {
            total_income: BigDecimal::zero(),
            total_expenses: BigDecimal::zero(),
            net_amount: BigDecimal::zero(),
            transaction_count: 0,
            by_source: BTreeMap::new(),
            by_status: BTreeMap::new(),
            by_month: BTreeMap::new(),
        }
    }
}

impl Default for TransactionSummary {
    fn default() -> Self {
        Self::empty()
    }
}
