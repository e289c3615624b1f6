/// 会员档位枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTier {
    /// 基础档
    Basic,
    /// 标准档
    Standard,
    /// 高级档
    Premium,
}

impl MembershipTier {
    /// 获取编辑器中显示的档位名称
    pub fn label(self) -> &'static str {
        match self {
            MembershipTier::Basic => "ベーシック",
            MembershipTier::Standard => "スタンダード",
            MembershipTier::Premium => "プレミアム",
        }
    }

    /// 从 front matter 中的标记解析档位（不区分大小写）
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "basic" | "ベーシック" | "1" => Some(MembershipTier::Basic),
            "standard" | "スタンダード" | "2" => Some(MembershipTier::Standard),
            "premium" | "プレミアム" | "3" => Some(MembershipTier::Premium),
            _ => None,
        }
    }
}

impl std::fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
