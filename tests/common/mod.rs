//! 测试用假页面与假会话工厂
//!
//! 页面由一组 `FakeElement` 组成；文本类策略按选择器中的标签名匹配，
//! 属性策略按完整选择器字符串匹配。

#![allow(dead_code)]

use async_trait::async_trait;
use note_publisher::infrastructure::{ElementRef, PageDriver, SessionFactory, Strategy};
use note_publisher::models::PublishJob;
use note_publisher::services::{MemoryEventSink, PollPolicy};
use note_publisher::workflow::{EditorControls, FlowOptions};
use note_publisher::{PublishError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const EDITOR_URL: &str = "https://editor.note.com/new";
pub const SETTINGS_URL: &str = "https://editor.note.com/notes/n1/publish";
pub const PUBLISHED_URL: &str = "https://note.com/demo/n/n1";

/// 点击元素后的页面变化
#[derive(Debug, Clone)]
pub enum Effect {
    SetUrl(String),
    Show(String),
    Hide(String),
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub id: String,
    pub tag: String,
    pub attrs: Vec<String>,
    pub role: Option<String>,
    pub text: String,
    pub visible: bool,
    /// 页面累计查询次数达到该值后才出现
    pub appear_after: usize,
    /// 任何操作都会断开会话
    pub breaks_session: bool,
    /// 前 N 次操作返回临时错误
    pub flaky: u32,
    pub on_click: Vec<Effect>,
}

impl FakeElement {
    pub fn new(id: &str, tag: &str) -> Self {
        Self {
            id: id.to_string(),
            tag: tag.to_string(),
            attrs: Vec::new(),
            role: None,
            text: String::new(),
            visible: true,
            appear_after: 0,
            breaks_session: false,
            flaky: 0,
            on_click: Vec::new(),
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, selector: &str) -> Self {
        self.attrs.push(selector.to_string());
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn appear_after(mut self, queries: usize) -> Self {
        self.appear_after = queries;
        self
    }

    pub fn breaks_session(mut self) -> Self {
        self.breaks_session = true;
        self
    }

    pub fn flaky(mut self, failures: u32) -> Self {
        self.flaky = failures;
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.on_click.push(effect);
        self
    }

    fn is_visible(&self, queries: usize) -> bool {
        self.visible && queries >= self.appear_after
    }

    fn matches(&self, strategy: &Strategy) -> bool {
        match strategy {
            Strategy::ExactText { selector, text } => self.tag_in(selector) && self.text.trim() == text,
            Strategy::PartialText { selector, text } => self.tag_in(selector) && self.text.contains(text.as_str()),
            Strategy::Role { role, name } => {
                self.role.as_deref() == Some(role.as_str())
                    && name.as_ref().map_or(true, |n| self.text.contains(n.as_str()))
            }
            Strategy::Attribute { selector } => self.attrs.iter().any(|a| a == selector),
        }
    }

    fn tag_in(&self, selector: &str) -> bool {
        selector.split(',').any(|part| part.trim() == self.tag)
    }
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    elements: Vec<FakeElement>,
    actions: Vec<String>,
    queries: usize,
    broken: bool,
    closed: bool,
    /// goto 目标被重定向到的地址
    redirect: Option<String>,
}

/// 内存中的假页面；克隆后共享同一状态
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    pub fn new(elements: Vec<FakeElement>) -> Self {
        let page = Self::default();
        page.state.lock().unwrap().elements = elements;
        page
    }

    pub fn redirect_to(self, url: &str) -> Self {
        self.state.lock().unwrap().redirect = Some(url.to_string());
        self
    }

    pub fn add(&self, element: FakeElement) {
        self.state.lock().unwrap().elements.push(element);
    }

    pub fn remove(&self, id: &str) {
        self.state.lock().unwrap().elements.retain(|e| e.id != id);
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.actions().iter().filter(|a| a.starts_with(prefix)).count()
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions().iter().any(|a| a == action)
    }

    pub fn url(&self) -> String {
        self.state.lock().unwrap().url.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// 对元素执行操作前的检查
    fn touch(&self, element: &ElementRef, action: String) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if state.broken {
            return Err(PublishError::SessionBroken {
                reason: "websocket closed".to_string(),
            });
        }
        let Some(found) = state.elements.iter_mut().find(|e| e.id == element.handle) else {
            return Err(PublishError::Browser(format!("元素已失效: {}", element.handle)));
        };
        if found.breaks_session {
            state.broken = true;
            return Err(PublishError::SessionBroken {
                reason: "websocket closed".to_string(),
            });
        }
        if found.flaky > 0 {
            found.flaky -= 1;
            return Err(PublishError::Browser("element is detached".to_string()));
        }
        state.actions.push(action);
        Ok(())
    }

    fn check_alive(&self) -> Result<()> {
        if self.state.lock().unwrap().broken {
            return Err(PublishError::SessionBroken {
                reason: "websocket closed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.check_alive()?;
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.actions.push(format!("goto:{}", url));
        state.url = state.redirect.clone().unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.check_alive()?;
        Ok(self.url())
    }

    async fn query(&self, strategy: &Strategy, visible_only: bool) -> Result<Vec<ElementRef>> {
        self.check_alive()?;
        let mut state = self.state.lock().unwrap();
        state.queries += 1;
        let queries = state.queries;
        Ok(state
            .elements
            .iter()
            .filter(|e| e.matches(strategy))
            .filter(|e| !visible_only || e.is_visible(queries))
            .map(|e| ElementRef {
                handle: e.id.clone(),
                text: e.text.clone(),
            })
            .collect())
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.touch(element, format!("click:{}", element.handle))?;
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let effects = state
            .elements
            .iter()
            .find(|e| e.id == element.handle)
            .map(|e| e.on_click.clone())
            .unwrap_or_default();
        for effect in effects {
            match effect {
                Effect::SetUrl(url) => state.url = url,
                Effect::Show(id) => state.elements.iter_mut().filter(|e| e.id == id).for_each(|e| e.visible = true),
                Effect::Hide(id) => state.elements.iter_mut().filter(|e| e.id == id).for_each(|e| e.visible = false),
            }
        }
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.touch(element, format!("type:{}={}", element.handle, text))
    }

    async fn press_enter(&self, element: &ElementRef) -> Result<()> {
        self.touch(element, format!("enter:{}", element.handle))
    }

    async fn fill(&self, element: &ElementRef, value: &str) -> Result<()> {
        self.touch(element, format!("fill:{}={}", element.handle, value))
    }

    async fn paste_html(&self, element: &ElementRef, html: &str, _plain: &str) -> Result<()> {
        self.touch(element, format!("paste:{}={}", element.handle, html))
    }

    async fn upload_files(&self, element: &ElementRef, files: &[PathBuf]) -> Result<()> {
        let names: Vec<String> = files
            .iter()
            .filter_map(|f| f.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        self.touch(element, format!("upload:{}={}", element.handle, names.join(",")))
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.check_alive()?;
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("screenshot:{}", path.display()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.actions.push("close".to_string());
        Ok(())
    }
}

// ========== note 编辑器页面 ==========

/// 正文段落文本
pub const PARAGRAPHS: [&str; 3] = ["Intro paragraph.", "Second paragraph here.", "Paid content."];

/// 完整的编辑器 + 发布设置页面，所有控件都存在
pub fn note_editor() -> FakePage {
    let mut elements = vec![
        FakeElement::new("title", "textarea").attr(r#"textarea[placeholder="記事タイトル"]"#),
        FakeElement::new("body", "div").attr(r#"div.ProseMirror[contenteditable="true"]"#),
        FakeElement::new("cover", "button").text("画像を追加"),
        FakeElement::new("inline-image", "button").text("画像"),
        FakeElement::new("file", "input")
            .attr(r#"input[type="file"][accept*="image"]"#)
            .hidden(),
        FakeElement::new("save-draft", "button")
            .text("下書き保存")
            .on_click(Effect::Show("draft-notice".to_string())),
        FakeElement::new("draft-notice", "div").text("下書きを保存しました").hidden(),
        FakeElement::new("proceed", "button")
            .text("公開に進む")
            .on_click(Effect::SetUrl(SETTINGS_URL.to_string())),
        FakeElement::new("tags", "input").attr(r#"input[placeholder*="ハッシュタグ"]"#),
        FakeElement::new("paid", "label").text("有料"),
        FakeElement::new("price", "input").attr(r#"input[name="price"]"#),
        FakeElement::new("paid-area", "button").text("有料エリア設定"),
        FakeElement::new("magazine-tab", "button").text("マガジン"),
        FakeElement::new("magazine-entry", "li").text("Weekly"),
        FakeElement::new("membership-tab", "button").text("メンバーシップ"),
        FakeElement::new("membership-entry", "li").text("スタンダード"),
        FakeElement::new("cross-post", "label").text("X(Twitter)に投稿"),
        FakeElement::new("submit", "button")
            .text("投稿する")
            .on_click(Effect::SetUrl(PUBLISHED_URL.to_string())),
    ];
    for (i, text) in PARAGRAPHS.iter().enumerate() {
        elements.push(FakeElement::new(&format!("p{}", i), "p").attr(".ProseMirror > p").text(text));
        elements.push(FakeElement::new(&format!("line{}", i), "button").text("ラインをこの場所に変更"));
    }
    FakePage::new(elements)
}

/// 流程测试用的短超时参数
pub fn fast_options(screenshot_dir: &Path) -> FlowOptions {
    FlowOptions {
        editor_url: EDITOR_URL.to_string(),
        step_timeout: Duration::from_millis(40),
        navigation_timeout: Duration::from_millis(60),
        confirm_timeout: Duration::from_millis(60),
        step_retries: 1,
        retry_backoff: Duration::from_millis(1),
        poll: PollPolicy::fixed(Duration::from_millis(5)),
        screenshot_dir: screenshot_dir.to_path_buf(),
        ..FlowOptions::default()
    }
}

pub fn controls() -> EditorControls {
    EditorControls::default()
}

pub fn memory_sink() -> Arc<MemoryEventSink> {
    Arc::new(MemoryEventSink::new())
}

/// 由 Markdown 文本构建任务（不解析图片）
pub fn job_from_markdown(id: &str, markdown: &str) -> PublishJob {
    let document = note_publisher::parse_document(markdown);
    PublishJob::new(id, document, Default::default(), Default::default())
}

// ========== 会话工厂 ==========

type PageBuilder = dyn Fn(u64) -> Result<FakePage> + Send + Sync;

/// 按会话代数构建假页面的工厂
pub struct FakeSessionFactory {
    builder: Box<PageBuilder>,
    opened: AtomicU64,
    pages: Mutex<Vec<FakePage>>,
}

impl FakeSessionFactory {
    pub fn new(builder: impl Fn(u64) -> Result<FakePage> + Send + Sync + 'static) -> Self {
        Self {
            builder: Box::new(builder),
            opened: AtomicU64::new(0),
            pages: Mutex::new(Vec::new()),
        }
    }

    /// 每次都返回完整的编辑器页面
    pub fn healthy() -> Self {
        Self::new(|_| Ok(note_editor()))
    }

    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> Vec<FakePage> {
        self.pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for FakeSessionFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>> {
        let generation = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let page = (self.builder)(generation)?;
        self.pages.lock().unwrap().push(page.clone());
        Ok(Box::new(page))
    }
}
