use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::models::{MembershipTier, ParsedDocument, ResolvedImages};
use crate::services::document_parser::{MAX_PRICE, MIN_PRICE};

/// 发布模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// 保存为草稿
    Draft,
    /// 直接发布
    #[default]
    Published,
}

impl PublishMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "draft" | "下書き" => Some(PublishMode::Draft),
            "published" | "publish" | "public" => Some(PublishMode::Published),
            _ => None,
        }
    }
}

/// 任务级覆盖设置，优先于 front matter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOverrides {
    pub price: Option<u32>,
    pub collection_name: Option<String>,
    pub membership_tier: Option<MembershipTier>,
    pub cross_post: Option<bool>,
}

/// 单篇文章的发布任务
#[derive(Debug, Clone)]
pub struct PublishJob {
    /// 任务标识（文档路径），用于进度记录
    pub id: String,
    pub source_path: Option<PathBuf>,
    pub document: ParsedDocument,
    pub images: ResolvedImages,
    pub mode: PublishMode,
    pub overrides: JobOverrides,
    /// 文档未指定价格时使用的默认价格
    pub default_price: Option<u32>,
}

impl PublishJob {
    /// 创建新的发布任务
    pub fn new(
        id: impl Into<String>,
        document: ParsedDocument,
        images: ResolvedImages,
        mode: PublishMode,
    ) -> Self {
        Self {
            id: id.into(),
            source_path: None,
            document,
            images,
            mode,
            overrides: JobOverrides::default(),
            default_price: None,
        }
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: JobOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_default_price(mut self, price: Option<u32>) -> Self {
        self.default_price = price;
        self
    }

    /// 实际使用的价格：覆盖设置 → 文档 → 默认价格
    pub fn effective_price(&self) -> Option<u32> {
        valid_price(self.overrides.price, "覆盖价格")
            .or(self.document.price)
            .or_else(|| valid_price(self.default_price, "默认价格"))
    }

    pub fn effective_collection(&self) -> Option<&str> {
        self.overrides
            .collection_name
            .as_deref()
            .or(self.document.collection_name.as_deref())
    }

    pub fn effective_membership(&self) -> Option<MembershipTier> {
        self.overrides
            .membership_tier
            .or(self.document.membership_tier)
    }

    pub fn effective_cross_post(&self) -> bool {
        self.overrides
            .cross_post
            .or(self.document.cross_post)
            .unwrap_or(false)
    }
}

fn valid_price(price: Option<u32>, source: &str) -> Option<u32> {
    let price = price?;
    if (MIN_PRICE..=MAX_PRICE).contains(&price) {
        Some(price)
    } else {
        warn!("{} {} 超出范围 [{}, {}]，已忽略", source, price, MIN_PRICE, MAX_PRICE);
        None
    }
}
