//! 记忆后端契约与进程内实现
//!
//! query(query, filters, limit) 检索相关上下文；get_all 按过滤列出；summarize 默认由 get_all 推导。
//! InMemoryProvider 按关键词命中检索（无向量），适合原型与测试。

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Metadata, ProviderResult};

/// 记忆返回的一条上下文；只读，无独立身份
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// 置信度，构造时钳制到 [0, 1]
    pub confidence: f64,
}

impl Context {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
            confidence: 1.0,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// metadata 是否精确匹配全部过滤条件
    fn matches(&self, filters: Option<&Metadata>) -> bool {
        filters.map_or(true, |f| {
            f.iter().all(|(k, v)| self.metadata.get(k) == Some(v))
        })
    }
}

/// 记忆后端 trait
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    /// 后端名称（summarize / 日志用）
    fn name(&self) -> &str;

    /// 按查询检索相关上下文
    async fn query(
        &self,
        query: &str,
        filters: Option<&Metadata>,
        limit: usize,
    ) -> ProviderResult<Vec<Context>>;

    /// 列出全部（可过滤）
    async fn get_all(&self, filters: Option<&Metadata>, limit: usize) -> ProviderResult<Vec<Context>>;

    /// 统计摘要；默认实现基于 get_all，后端可覆盖
    async fn summarize(&self) -> ProviderResult<Value> {
        let items = self.get_all(None, 50).await?;
        Ok(json!({
            "total_items": items.len(),
            "provider": self.name(),
        }))
    }
}

/// 进程内记忆：按插入顺序保存，关键词检索
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    data: RwLock<Vec<Context>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        tracing::info!("Initialized in-memory memory provider");
        Self::default()
    }

    pub fn add(&self, content: impl Into<String>, metadata: Option<Metadata>) {
        let ctx = Context::new(content).with_metadata(metadata.unwrap_or_default());
        tracing::debug!(content = %preview(&ctx.content), "Memory item added");
        self.write().push(ctx);
    }

    pub fn add_many<I, S>(&self, items: I)
    where
        I: IntoIterator<Item = (S, Option<Metadata>)>,
        S: Into<String>,
    {
        for (content, metadata) in items {
            self.add(content, metadata);
        }
    }

    /// 存入完整 Context，返回其下标 id
    pub fn store(&self, context: Context) -> String {
        let mut data = self.write();
        data.push(context);
        (data.len() - 1).to_string()
    }

    /// 按 store 返回的 id 取回
    pub fn retrieve(&self, id: &str) -> Option<Context> {
        let found = id
            .parse::<usize>()
            .ok()
            .and_then(|idx| self.read().get(idx).cloned());
        if found.is_none() {
            tracing::warn!(id, "Memory item not found");
        }
        found
    }

    pub fn clear(&self) {
        let mut data = self.write();
        let n = data.len();
        data.clear();
        tracing::info!(cleared = n, "Memory cleared");
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Context>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Context>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn preview(s: &str) -> String {
    s.chars().take(50).collect()
}

/// 命中规则：整个查询是内容子串，或任一查询词出现在内容中（均忽略大小写）
fn keyword_hit(content: &str, query_lower: &str) -> bool {
    let content_lower = content.to_lowercase();
    content_lower.contains(query_lower)
        || query_lower
            .split_whitespace()
            .any(|word| content_lower.contains(word))
}

#[async_trait]
impl MemoryProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "InMemoryProvider"
    }

    async fn query(
        &self,
        query: &str,
        filters: Option<&Metadata>,
        limit: usize,
    ) -> ProviderResult<Vec<Context>> {
        let query_lower = query.to_lowercase();
        let results: Vec<Context> = self
            .read()
            .iter()
            .filter(|c| keyword_hit(&c.content, &query_lower) && c.matches(filters))
            .take(limit)
            .cloned()
            .collect();
        tracing::debug!(query, found = results.len(), "Memory query");
        Ok(results)
    }

    async fn get_all(&self, filters: Option<&Metadata>, limit: usize) -> ProviderResult<Vec<Context>> {
        Ok(self
            .read()
            .iter()
            .filter(|c| c.matches(filters))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(k: &str, v: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert(k.to_string(), json!(v));
        m
    }

    #[tokio::test]
    async fn test_query_keyword_and_filters() {
        let mem = InMemoryProvider::new();
        mem.add("Python is a programming language", Some(meta("lang", "py")));
        mem.add("JavaScript runs in browsers", Some(meta("lang", "js")));
        mem.add("Rust programming without GC", Some(meta("lang", "rs")));

        let hits = mem.query("programming", None, 10).await.unwrap();
        assert_eq!(hits.len(), 2);

        let filtered = mem
            .query("programming", Some(&meta("lang", "rs")), 10)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].content.starts_with("Rust"));

        let limited = mem.query("programming", None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert!(limited[0].content.starts_with("Python"));
    }

    #[tokio::test]
    async fn test_summarize_default_uses_get_all() {
        let mem = InMemoryProvider::new();
        mem.add_many(vec![("a one", None), ("b two", None)]);
        let summary = mem.summarize().await.unwrap();
        assert_eq!(summary["total_items"], 2);
        assert_eq!(summary["provider"], "InMemoryProvider");
    }

    #[test]
    fn test_store_retrieve_clear() {
        let mem = InMemoryProvider::new();
        let id = mem.store(Context::new("x").with_confidence(3.0));
        let got = mem.retrieve(&id).unwrap();
        assert_eq!(got.confidence, 1.0);
        assert!(mem.retrieve("nope").is_none());
        mem.clear();
        assert!(mem.is_empty());
    }
}
