use crate::db::queries;
use crate::error::Result;
use crate::models::{Transaction, TransactionScope, TransactionSummary};
use crate::service::aggregator;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use sqlx::PgPool;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

/// 交易数据来源 (整表拉取, 无分页/增量同步)
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch(&self, scope: &TransactionScope) -> Result<Vec<Transaction>>;
}

/// Postgres 交易来源
pub struct PgTransactionSource {
    pool: PgPool,
}

impl PgTransactionSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionSource for PgTransactionSource {
    async fn fetch(&self, scope: &TransactionScope) -> Result<Vec<Transaction>> {
        Ok(queries::list_transactions(&self.pool, scope).await?)
    }
}

/// 某个作用域的一次交易快照
///
/// 汇总结果绑定在快照上, 首次读取时计算, 刷新会整体替换快照。
#[derive(Debug)]
pub struct LedgerSnapshot {
    transactions: Vec<Transaction>,
    fetched_at: DateTime<Utc>,
    summary: OnceLock<TransactionSummary>,
}

impl LedgerSnapshot {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            fetched_at: Utc::now(),
            summary: OnceLock::new(),
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn summary(&self) -> &TransactionSummary {
        self.summary
            .get_or_init(|| aggregator::summarize(&self.transactions))
    }
}

/// 交易账本服务: 按作用域缓存快照, 显式刷新
///
/// 同一作用域的拉取由作用域锁串行化: 并发冷读只拉取一次,
/// 重叠的刷新按加锁顺序落地, 旧数据不会覆盖新数据。
pub struct LedgerService {
    source: Arc<dyn TransactionSource>,
    snapshots: DashMap<TransactionScope, Arc<LedgerSnapshot>>,
    fetch_locks: DashMap<TransactionScope, Arc<Mutex<()>>>,
}

impl LedgerService {
    pub fn new(source: Arc<dyn TransactionSource>) -> Self {
        Self {
            source,
            snapshots: DashMap::new(),
            fetch_locks: DashMap::new(),
        }
    }

    fn fetch_lock(&self, scope: &TransactionScope) -> Arc<Mutex<()>> {
        // 先克隆出 Arc 再释放分片锁, 不能跨 await 持有 DashMap 引用
        Arc::clone(self.fetch_locks.entry(scope.clone()).or_default().value())
    }

    /// 获取作用域快照, 未缓存时从数据源拉取
    pub async fn snapshot(&self, scope: &TransactionScope) -> Result<Arc<LedgerSnapshot>> {
        if let Some(existing) = self.cached(scope) {
            return Ok(existing);
        }

        let lock = self.fetch_lock(scope);
        let _guard = lock.lock().await;
        // 等锁期间可能已有其他请求完成拉取
        if let Some(existing) = self.cached(scope) {
            return Ok(existing);
        }
        self.fetch_and_store(scope).await
    }

    fn cached(&self, scope: &TransactionScope) -> Option<Arc<LedgerSnapshot>> {
        self.snapshots.get(scope).map(|entry| Arc::clone(entry.value()))
    }

    pub async fn transactions(&self, scope: &TransactionScope) -> Result<Vec<Transaction>> {
        Ok(self.snapshot(scope).await?.transactions().to_vec())
    }

    pub async fn summary(&self, scope: &TransactionScope) -> Result<TransactionSummary> {
        Ok(self.snapshot(scope).await?.summary().clone())
    }

    /// 重新拉取并替换快照
    pub async fn refresh(&self, scope: &TransactionScope) -> Result<Arc<LedgerSnapshot>> {
        let lock = self.fetch_lock(scope);
        let _guard = lock.lock().await;
        self.fetch_and_store(scope).await
    }

    async fn fetch_and_store(&self, scope: &TransactionScope) -> Result<Arc<LedgerSnapshot>> {
        let transactions = self.source.fetch(scope).await?;
        tracing::info!("Fetched {} transactions for {}", transactions.len(), scope);

        let snapshot = Arc::new(LedgerSnapshot::new(transactions));
        self.snapshots.insert(scope.clone(), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// 并发刷新所有已缓存的作用域, 返回成功刷新的数量
    pub async fn refresh_all(&self) -> usize {
        let scopes: Vec<TransactionScope> =
            self.snapshots.iter().map(|entry| entry.key().clone()).collect();

        let results = join_all(scopes.iter().map(|scope| self.refresh(scope))).await;

        let mut refreshed = 0;
        for (scope, result) in scopes.iter().zip(results) {
            match result {
                Ok(_) => refreshed += 1,
                Err(e) => tracing::warn!("Refresh failed for {}: {}", scope, e),
            }
        }
        tracing::info!("Refreshed {}/{} cached scopes", refreshed, scopes.len());
        refreshed
    }

    pub fn evict(&self, scope: &TransactionScope) -> bool {
        self.snapshots.remove(scope).is_some()
    }

    pub fn cached_scopes(&self) -> usize {
        self.snapshots.len()
    }
}
