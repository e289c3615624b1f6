//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，对上只暴露 `PageDriver` 能力

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{PublishError, Result};
use crate::infrastructure::driver::{ElementRef, PageDriver, Strategy};

const HANDLE_ATTR: &str = "data-np-handle";

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源（以及可选的 Browser）
/// - 把定位策略翻译成页面内执行的 JS
/// - 不认识文章 / 批次
pub struct JsExecutor {
    page: Page,
    browser: Option<Browser>,
    owns_browser: bool,
    handler: Option<JoinHandle<()>>,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self {
            page,
            browser: None,
            owns_browser: false,
            handler: None,
        }
    }

    /// 同时接管浏览器和事件处理任务
    ///
    /// `owns_browser` 为 true 时，关闭会话会一并关闭浏览器进程。
    pub fn with_browser(page: Page, browser: Browser, handler: JoinHandle<()>, owns_browser: bool) -> Self {
        Self {
            page,
            browser: Some(browser),
            owns_browser,
            handler: Some(handler),
        }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    async fn element(&self, element: &ElementRef) -> Result<Element> {
        let selector = handle_selector(&element.handle);
        self.page
            .find_element(selector)
            .await
            .map_err(|e| match PublishError::from(e) {
                PublishError::Browser(reason) => {
                    PublishError::Browser(format!("元素 {} 已失效: {}", element.handle, reason))
                }
                other => other,
            })
    }

    /// 在元素上执行一段 JS（`el` 为目标元素），返回是否成功
    async fn with_element(&self, element: &ElementRef, body: &str) -> Result<()> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector});
                if (!el) return false;
                {body}
                return true;
            }})()
            "#,
            selector = serde_json::to_string(&handle_selector(&element.handle))?,
            body = body
        );

        if self.eval_as::<bool>(js_code).await? {
            Ok(())
        } else {
            Err(PublishError::Browser(format!(
                "元素 {} 已从页面移除",
                element.handle
            )))
        }
    }
}

#[async_trait]
impl PageDriver for JsExecutor {
    async fn goto(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn query(&self, strategy: &Strategy, visible_only: bool) -> Result<Vec<ElementRef>> {
        let js_code = query_script(strategy, visible_only)?;
        self.eval_as(js_code).await
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.element(element).await?.click().await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<()> {
        let el = self.element(element).await?;
        el.click().await?;
        el.type_str(text).await?;
        Ok(())
    }

    async fn press_enter(&self, element: &ElementRef) -> Result<()> {
        self.element(element).await?.press_key("Enter").await?;
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, value: &str) -> Result<()> {
        let body = format!(
            r#"
                const value = {value};
                el.focus();
                if (el.isContentEditable) {{
                    el.textContent = value;
                }} else {{
                    const proto = el instanceof HTMLTextAreaElement
                        ? HTMLTextAreaElement.prototype
                        : HTMLInputElement.prototype;
                    Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, value);
                }}
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            "#,
            value = serde_json::to_string(value)?
        );
        self.with_element(element, &body).await
    }

    async fn paste_html(&self, element: &ElementRef, html: &str, plain: &str) -> Result<()> {
        let body = format!(
            r#"
                el.focus();
                const data = new DataTransfer();
                data.setData('text/html', {html});
                data.setData('text/plain', {plain});
                el.dispatchEvent(new ClipboardEvent('paste', {{
                    clipboardData: data,
                    bubbles: true,
                    cancelable: true
                }}));
            "#,
            html = serde_json::to_string(html)?,
            plain = serde_json::to_string(plain)?
        );
        self.with_element(element, &body).await
    }

    async fn upload_files(&self, element: &ElementRef, files: &[PathBuf]) -> Result<()> {
        let el = self.element(element).await?;
        let params = SetFileInputFilesParams::builder()
            .files(files.iter().map(|p| p.to_string_lossy().to_string()))
            .backend_node_id(el.backend_node_id)
            .build()
            .map_err(PublishError::Browser)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let result = match (self.owns_browser, self.browser.as_mut()) {
            (true, Some(browser)) => {
                let closed = browser.close().await;
                if let Err(e) = browser.wait().await {
                    warn!("等待浏览器进程退出失败: {}", e);
                }
                closed.map(|_| ()).map_err(PublishError::from)
            }
            _ => self.page.clone().close().await.map_err(PublishError::from),
        };

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        result
    }
}

impl Drop for JsExecutor {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

fn handle_selector(handle: &str) -> String {
    format!("[{}=\"{}\"]", HANDLE_ATTR, handle)
}

/// 生成按策略查询元素的 JS
///
/// 命中的元素会被打上 `data-np-handle` 标记，后续操作通过该标记重新定位。
fn query_script(strategy: &Strategy, visible_only: bool) -> Result<String> {
    Ok(format!(
        r#"
        (() => {{
            const strategy = {strategy};
            const visibleOnly = {visible_only};
            const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
            const textOf = (el) => norm(el.innerText || el.value || el.getAttribute('aria-label') || '');
            const isVisible = (el) => {{
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                return rect.width > 0 && rect.height > 0
                    && style.visibility !== 'hidden' && style.display !== 'none';
            }};
            const implicitRoles = {{
                button: 'button, input[type="button"], input[type="submit"]',
                textbox: 'input:not([type]), input[type="text"], textarea, [contenteditable="true"]',
                checkbox: 'input[type="checkbox"]',
                link: 'a[href]',
                tab: '[role="tab"]',
                dialog: 'dialog'
            }};
            const all = (selector) => Array.from(document.querySelectorAll(selector));

            let nodes = [];
            switch (strategy.kind) {{
                case 'exact_text':
                    nodes = all(strategy.selector).filter((el) => textOf(el) === norm(strategy.text));
                    break;
                case 'partial_text':
                    nodes = all(strategy.selector).filter((el) => textOf(el).includes(norm(strategy.text)));
                    break;
                case 'role': {{
                    const implicit = implicitRoles[strategy.role];
                    const selector = `[role="${{strategy.role}}"]` + (implicit ? `, ${{implicit}}` : '');
                    nodes = all(selector);
                    if (strategy.name) {{
                        const name = norm(strategy.name);
                        nodes = nodes.filter((el) => norm(el.getAttribute('aria-label')) === name
                            || textOf(el).includes(name));
                    }}
                    break;
                }}
                case 'attribute':
                    nodes = all(strategy.selector);
                    break;
            }}

            if (visibleOnly) nodes = nodes.filter(isVisible);
            return nodes.map((el) => {{
                if (!el.hasAttribute('{attr}')) {{
                    window.__npHandleSeq = (window.__npHandleSeq || 0) + 1;
                    el.setAttribute('{attr}', 'h' + window.__npHandleSeq);
                }}
                return {{ handle: el.getAttribute('{attr}'), text: textOf(el) }};
            }});
        }})()
        "#,
        strategy = serde_json::to_string(strategy)?,
        visible_only = visible_only,
        attr = HANDLE_ATTR
    ))
}
