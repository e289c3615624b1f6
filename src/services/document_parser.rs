//! 文档解析服务 - 业务能力层
//!
//! 把原始 Markdown 文本解析为 `ParsedDocument`。
//! 解析器从不返回错误：格式不对时退回默认值（标题 `Untitled`、无标签、无价格）。

use tracing::{debug, warn};

use crate::models::{MembershipTier, ParsedDocument};

/// 最低价格
pub const MIN_PRICE: u32 = 100;
/// 最高价格
pub const MAX_PRICE: u32 = 50_000;
/// 付费分隔线定位文本的长度
pub const PAYWALL_SEARCH_CHARS: usize = 30;

const FRONT_MATTER_DELIMITER: &str = "---";
const PAYWALL_SENTINEL: &str = "paid";
const DEFAULT_TITLE: &str = "Untitled";

/// 文档解析服务
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentParser;

/// front matter 中识别出的字段
#[derive(Debug, Default)]
struct FrontMatter {
    title: Option<String>,
    price: Option<u32>,
    tags: Vec<String>,
    collection_name: Option<String>,
    membership_tier: Option<MembershipTier>,
    cross_post: Option<bool>,
}

/// 正文扫描结果
#[derive(Debug, Default)]
struct BodyScan {
    heading_title: Option<String>,
    body: String,
    paywall_paragraph_index: Option<usize>,
    paywall_search_text: Option<String>,
}

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// 解析文档
    pub fn parse(&self, raw: &str) -> ParsedDocument {
        let lines: Vec<&str> = raw.lines().collect();
        let (front_lines, body_lines) = split_front_matter(&lines);

        let front = front_lines.map(parse_front_matter).unwrap_or_default();
        let scan = scan_body(body_lines, front.title.is_none());

        let title = front
            .title
            .or(scan.heading_title)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        debug!(
            "解析完成: 标题 '{}', 标签 {} 个, 价格 {:?}, 分隔段落 {:?}",
            title,
            front.tags.len(),
            front.price,
            scan.paywall_paragraph_index
        );

        ParsedDocument {
            title,
            body: scan.body,
            tags: front.tags,
            price: front.price,
            paywall_paragraph_index: scan.paywall_paragraph_index,
            paywall_search_text: scan.paywall_search_text,
            collection_name: front.collection_name,
            membership_tier: front.membership_tier,
            cross_post: front.cross_post,
        }
    }
}

/// 解析文档的便捷函数
pub fn parse_document(raw: &str) -> ParsedDocument {
    DocumentParser::new().parse(raw)
}

/// 判断一行是否为付费分隔标记 `<!-- paid -->`
pub fn is_paywall_marker(line: &str) -> bool {
    let trimmed = line.trim().to_lowercase();
    trimmed
        .strip_prefix("<!--")
        .and_then(|rest| rest.strip_suffix("-->"))
        .map_or(false, |inner| inner.trim() == PAYWALL_SENTINEL)
}

/// 拆分 front matter 和正文
///
/// 没有闭合的 `---` 时整篇都视为正文。
fn split_front_matter<'a>(lines: &'a [&'a str]) -> (Option<&'a [&'a str]>, &'a [&'a str]) {
    let opens = lines
        .first()
        .map_or(false, |line| line.trim_end() == FRONT_MATTER_DELIMITER);
    if !opens {
        return (None, lines);
    }

    match lines[1..]
        .iter()
        .position(|line| line.trim_end() == FRONT_MATTER_DELIMITER)
    {
        Some(offset) => {
            let close = offset + 1;
            (Some(&lines[1..close]), &lines[close + 1..])
        }
        None => {
            debug!("front matter 未闭合，按普通正文处理");
            (None, lines)
        }
    }
}

fn parse_front_matter(lines: &[&str]) -> FrontMatter {
    let mut front = FrontMatter::default();
    let mut in_tag_list = false;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if in_tag_list {
            if let Some(item) = trimmed.strip_prefix('-') {
                push_tag(&mut front.tags, item);
                continue;
            }
        }

        // 列表模式只在遇到下一个 `key:` 时结束
        let Some((key, value)) = split_key(trimmed) else {
            continue;
        };
        in_tag_list = false;

        match key.to_lowercase().as_str() {
            "title" => {
                let title = unquote(value);
                if !title.is_empty() {
                    front.title = Some(title.to_string());
                }
            }
            "price" => front.price = parse_price(value),
            "tags" => {
                if value.is_empty() {
                    in_tag_list = true;
                } else {
                    let inline = value
                        .strip_prefix('[')
                        .map(|rest| rest.strip_suffix(']').unwrap_or(rest))
                        .unwrap_or(value);
                    for item in inline.split(',') {
                        push_tag(&mut front.tags, item);
                    }
                }
            }
            "magazine" | "collection" => {
                let name = unquote(value);
                if !name.is_empty() {
                    front.collection_name = Some(name.to_string());
                }
            }
            "membership" => {
                let token = unquote(value);
                front.membership_tier = MembershipTier::from_token(token);
                if front.membership_tier.is_none() && !token.is_empty() {
                    warn!("无法识别的会员档位: {}", token);
                }
            }
            "twitter" | "crosspost" | "cross_post" | "x" => {
                front.cross_post = parse_flag(unquote(value));
            }
            other => debug!("忽略未知的 front matter 字段: {}", other),
        }
    }

    front
}

/// 拆分 `key: value`，key 只允许字母、数字、`_` 和 `-`
///
/// `scheme://` 形式的 URL 不算键值对。
fn split_key(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim_end();
    let valid = !key.is_empty()
        && !value.starts_with("//")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then(|| (key, value.trim()))
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    value
}

fn push_tag(tags: &mut Vec<String>, raw: &str) {
    let tag = unquote(raw);
    let tag = tag.trim_start_matches('#').trim();
    if !tag.is_empty() {
        tags.push(tag.to_string());
    }
}

fn parse_price(value: &str) -> Option<u32> {
    let raw = unquote(value);
    match raw.parse::<i64>() {
        Ok(price) if (i64::from(MIN_PRICE)..=i64::from(MAX_PRICE)).contains(&price) => {
            u32::try_from(price).ok()
        }
        Ok(price) => {
            warn!(
                "价格 {} 超出范围 [{}, {}]，按免费文章处理",
                price, MIN_PRICE, MAX_PRICE
            );
            None
        }
        Err(_) => {
            warn!("无法解析价格: '{}'", raw);
            None
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn heading_title(line: &str) -> Option<&str> {
    let title = line.trim_start().strip_prefix("# ")?.trim();
    (!title.is_empty()).then_some(title)
}

/// 扫描正文：取一级标题、剥离付费标记、统计段落
fn scan_body(lines: &[&str], take_heading: bool) -> BodyScan {
    let mut scan = BodyScan::default();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());

    let mut in_fence = false;
    let mut in_blank = true;
    let mut paragraph_count = 0usize;
    let mut current_paragraph: Vec<&str> = Vec::new();
    let mut marker_seen = false;
    let mut skip_blank = false;

    for &line in lines {
        if !in_fence && is_paywall_marker(line) {
            if !marker_seen {
                marker_seen = true;
                if paragraph_count > 0 {
                    let text = current_paragraph.join("\n");
                    let anchor: String = text.trim().chars().take(PAYWALL_SEARCH_CHARS).collect();
                    scan.paywall_paragraph_index = Some(paragraph_count);
                    scan.paywall_search_text = Some(anchor.trim().to_string());
                }
            }
            // 标记行本身是段落边界
            if out.last().map_or(false, |prev| !prev.trim().is_empty()) {
                out.push("");
            }
            skip_blank = true;
            in_blank = true;
            continue;
        }

        if !in_fence && take_heading && scan.heading_title.is_none() {
            if let Some(title) = heading_title(line) {
                scan.heading_title = Some(title.to_string());
                continue;
            }
        }

        if is_fence(line) {
            in_fence = !in_fence;
        }

        if line.trim().is_empty() {
            in_blank = true;
            if !skip_blank {
                out.push(line);
            }
            continue;
        }

        skip_blank = false;
        if in_blank {
            paragraph_count += 1;
            current_paragraph.clear();
            in_blank = false;
        }
        current_paragraph.push(line.trim());
        out.push(line);
    }

    let first_content = out
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(out.len());
    scan.body = out[first_content..].join("\n").trim_end().to_string();
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_matching_ignores_case_and_spacing() {
        assert!(is_paywall_marker("<!-- paid -->"));
        assert!(is_paywall_marker("  <!--PAID-->  "));
        assert!(is_paywall_marker("<!--   Paid   -->"));
        assert!(!is_paywall_marker("<!-- paid later -->"));
        assert!(!is_paywall_marker("paid"));
    }

    #[test]
    fn split_key_rejects_urls_and_prose() {
        assert_eq!(split_key("title: Hello"), Some(("title", "Hello")));
        assert_eq!(split_key("https://example.com"), None);
        assert_eq!(split_key("some words: here"), None);
        assert_eq!(split_key("link: https://example.com"), Some(("link", "https://example.com")));
    }

    #[test]
    fn tag_list_survives_stray_lines_until_next_key() {
        let front = parse_front_matter(&["tags:", "  - a", "  stray text", "  - b", "title: T"]);
        assert_eq!(front.tags, vec!["a", "b"]);
        assert_eq!(front.title.as_deref(), Some("T"));
    }

    #[test]
    fn flags_accept_common_tokens() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
