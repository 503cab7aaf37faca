//! 投放选择
//!
//! 无状态，每次请求重新计算：筛选候选 -> 按权重排序 -> 取前 K 个 -> 均匀随机挑一个。
//! 不做频次控制，也不保证会话内轮换。

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::Result;
use crate::storage::{Campaign, EventStore};
use crate::tracking::{CampaignType, Placement, RandomSource};

/// 选择请求
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub placement: Placement,
    pub recipe_id: Option<String>,
    pub category: Option<String>,
}

pub struct SelectionEngine {
    store: Arc<dyn EventStore>,
    random: Arc<dyn RandomSource>,
    top_k: usize,
}

impl SelectionEngine {
    pub fn new(store: Arc<dyn EventStore>, random: Arc<dyn RandomSource>, top_k: usize) -> Self {
        Self {
            store,
            random,
            top_k: top_k.max(1),
        }
    }

    /// 选出一个实体，候选为空时返回 `None`
    pub async fn select(
        &self,
        campaign_type: CampaignType,
        request: &SelectionRequest,
    ) -> Result<Option<Campaign>> {
        let candidates = self.store.list_active_campaigns(campaign_type).await?;
        let ranked = rank_candidates(candidates, request, Utc::now(), self.top_k);
        if ranked.is_empty() {
            debug!(
                "No eligible {} for placement {}",
                campaign_type, request.placement
            );
            return Ok(None);
        }

        let index = self.random.next_index(ranked.len());
        Ok(ranked.into_iter().nth(index))
    }
}

/// 按资格过滤并按权重降序（同权重按 id 升序）保留前 `top_k` 个
pub fn rank_candidates(
    candidates: Vec<Campaign>,
    request: &SelectionRequest,
    now: DateTime<Utc>,
    top_k: usize,
) -> Vec<Campaign> {
    let mut eligible: Vec<Campaign> = candidates
        .into_iter()
        .filter(|c| {
            c.is_live_at(now)
                && c.serves_placement(request.placement)
                && c.targets_recipe(request.recipe_id.as_deref())
                && c.targets_category(request.category.as_deref())
        })
        .collect();

    eligible.sort_by(|a, b| {
        b.selection_weight()
            .partial_cmp(&a.selection_weight())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    eligible.truncate(top_k);
    eligible
}
