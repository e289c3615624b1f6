use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::MembershipTier;

/// 解析后的文章
///
/// 由解析器一次性生成，之后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub title: String,
    /// 去掉 front matter 和付费分隔标记后的正文
    pub body: String,
    pub tags: Vec<String>,
    /// 价格，仅在 [100, 50000] 范围内有效
    pub price: Option<u32>,
    /// 付费分隔线之前那一段的序号（从 1 开始）
    pub paywall_paragraph_index: Option<usize>,
    /// 付费分隔线之前那一段的前 30 个字符
    pub paywall_search_text: Option<String>,
    pub collection_name: Option<String>,
    pub membership_tier: Option<MembershipTier>,
    pub cross_post: Option<bool>,
}

impl Default for ParsedDocument {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            body: String::new(),
            tags: Vec::new(),
            price: None,
            paywall_paragraph_index: None,
            paywall_search_text: None,
            collection_name: None,
            membership_tier: None,
            cross_post: None,
        }
    }
}

impl ParsedDocument {
    /// 是否为付费文章
    pub fn is_monetized(&self) -> bool {
        self.price.is_some()
    }

    /// 是否显式标记了付费分隔线
    pub fn has_paywall_marker(&self) -> bool {
        self.paywall_paragraph_index.map_or(false, |index| index > 0)
    }
}

/// 图片角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    /// 封面图
    Cover,
    /// 正文图片
    Inline,
}

/// 图片引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub alt_text: String,
    /// 文档中书写的原始路径
    pub source_path: String,
    /// 已确认存在的绝对路径
    pub resolved_path: PathBuf,
    pub role: ImageRole,
    /// 文件名中的数字后缀
    pub ordinal: Option<u32>,
}

/// 一篇文章解析出的全部图片
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedImages {
    pub cover: Option<ImageReference>,
    pub inline: Vec<ImageReference>,
}

impl ResolvedImages {
    pub fn is_empty(&self) -> bool {
        self.cover.is_none() && self.inline.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inline.len() + usize::from(self.cover.is_some())
    }

    /// 按 封面 → 正文 的顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &ImageReference> {
        self.cover.iter().chain(self.inline.iter())
    }
}
