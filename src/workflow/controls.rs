//! 编辑器控件定义
//!
//! 每个控件的策略按"越具体越靠前"排列。页面改版时只需要改这里。

use crate::models::MembershipTier;
use crate::services::Target;

/// 发布流程用到的全部控件
#[derive(Debug, Clone)]
pub struct EditorControls {
    pub title: Target,
    pub body: Target,
    pub cover_button: Target,
    pub inline_image_button: Target,
    pub image_input: Target,
    pub save_draft: Target,
    pub draft_saved_notice: Target,
    pub proceed: Target,
    pub tag_input: Target,
    pub paid_toggle: Target,
    pub price_input: Target,
    pub paid_area_entry: Target,
    pub paragraphs: Target,
    pub paywall_controls: Target,
    pub collection_tab: Target,
    pub membership_tab: Target,
    pub cross_post_toggle: Target,
    pub submit: Target,
    pub confirm_dialog: Target,
    pub success_notice: Target,
}

impl Default for EditorControls {
    fn default() -> Self {
        Self {
            title: Target::new("标题输入框")
                .attribute(r#"textarea[placeholder="記事タイトル"]"#)
                .attribute(r#"textarea[placeholder*="タイトル"]"#)
                .role("textbox", Some("記事タイトル")),
            body: Target::new("正文编辑器")
                .attribute(r#"div.ProseMirror[contenteditable="true"]"#)
                .attribute(r#"[role="textbox"][contenteditable="true"]"#)
                .role("textbox", Some("本文")),
            cover_button: Target::new("封面图按钮")
                .attribute(r#"button[aria-label="画像を追加"]"#)
                .partial_text("button", "画像を追加"),
            inline_image_button: Target::new("正文插图按钮")
                .exact_text("button", "画像")
                .attribute(r#"button[aria-label="画像"]"#),
            image_input: Target::new("图片文件框")
                .attribute(r#"input[type="file"][accept*="image"]"#)
                .attribute(r#"input[type="file"]"#)
                .include_hidden(),
            save_draft: Target::new("下書き保存按钮")
                .exact_text("button", "下書き保存")
                .partial_text("button", "下書き"),
            draft_saved_notice: Target::new("草稿已保存提示")
                .partial_text(r#"[role="alert"], [role="status"]"#, "保存しました")
                .partial_text("div, p, span", "下書きを保存しました"),
            proceed: Target::new("公開に進む按钮")
                .exact_text("button", "公開に進む")
                .role("button", Some("公開に進む"))
                .partial_text("button", "公開に進む"),
            tag_input: Target::new("标签输入框")
                .attribute(r#"input[placeholder*="ハッシュタグ"]"#)
                .role("combobox", Some("ハッシュタグ")),
            paid_toggle: Target::new("有料切换")
                .exact_text("label", "有料")
                .partial_text(r#"label, button, [role="radio"]"#, "有料"),
            price_input: Target::new("价格输入框")
                .attribute(r#"input[name="price"]"#)
                .attribute(r#"input[placeholder*="価格"]"#)
                .role("spinbutton", None),
            paid_area_entry: Target::new("有料エリア设置按钮")
                .exact_text("button", "有料エリア設定")
                .partial_text("button", "有料エリア"),
            paragraphs: Target::new("正文段落")
                .attribute(".ProseMirror > p")
                .attribute(r#"[contenteditable] p"#),
            paywall_controls: Target::new("付费分隔线按钮")
                .exact_text("button", "ラインをこの場所に変更")
                .partial_text("button", "この場所に変更"),
            collection_tab: Target::new("マガジン标签页")
                .exact_text(r#"button, [role="tab"]"#, "マガジン")
                .role("tab", Some("マガジン")),
            membership_tab: Target::new("メンバーシップ标签页")
                .exact_text(r#"button, [role="tab"]"#, "メンバーシップ")
                .role("tab", Some("メンバーシップ")),
            cross_post_toggle: Target::new("X 同步发布开关")
                .partial_text("label", "X(Twitter)")
                .partial_text("label", "Twitter")
                .role("checkbox", Some("X")),
            submit: Target::new("投稿する按钮")
                .exact_text("button", "投稿する")
                .role("button", Some("投稿する"))
                .partial_text("button", "投稿"),
            confirm_dialog: Target::new("确认对话框按钮")
                .exact_text(r#"[role="dialog"] button, dialog button"#, "投稿する")
                .exact_text(r#"[role="dialog"] button, dialog button"#, "OK"),
            success_notice: Target::new("发布成功提示")
                .partial_text(r#"[role="dialog"], [role="alert"]"#, "公開されました")
                .partial_text("div, p, h2", "記事が公開されました"),
        }
    }
}

impl EditorControls {
    /// 合集列表中的条目
    pub fn collection_entry(&self, name: &str) -> Target {
        Target::new(format!("合集 '{}'", name))
            .exact_text(r#"li, label, [role="option"]"#, name)
            .partial_text(r#"li, label, [role="option"]"#, name)
    }

    /// 会员档位条目
    pub fn membership_entry(&self, tier: MembershipTier) -> Target {
        Target::new(format!("会员档位 '{}'", tier))
            .partial_text(r#"li, label, [role="option"]"#, tier.label())
    }
}
