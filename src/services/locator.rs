//! 控件定位服务 - 业务能力层
//!
//! 目标页面的结构不受我们控制，所以每个控件都用一组按优先级排列的策略描述，
//! 返回第一个可见的匹配；超时后返回 `None` 而不是报错，由调用方决定是否致命。

use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::infrastructure::{ElementRef, PageDriver, Strategy};
use crate::services::wait::{poll_until, PollPolicy};

/// 逻辑控件：名称 + 按优先级排列的策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub strategies: Vec<Strategy>,
    pub visible_only: bool,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
            visible_only: true,
        }
    }

    pub fn exact_text(mut self, selector: &str, text: &str) -> Self {
        self.strategies.push(Strategy::exact_text(selector, text));
        self
    }

    pub fn partial_text(mut self, selector: &str, text: &str) -> Self {
        self.strategies.push(Strategy::partial_text(selector, text));
        self
    }

    pub fn role(mut self, role: &str, name: Option<&str>) -> Self {
        self.strategies.push(Strategy::role(role, name));
        self
    }

    pub fn attribute(mut self, selector: &str) -> Self {
        self.strategies.push(Strategy::attribute(selector));
        self
    }

    /// 允许匹配不可见元素（例如隐藏的文件输入框）
    pub fn include_hidden(mut self) -> Self {
        self.visible_only = false;
        self
    }
}

/// 控件定位服务
#[derive(Debug, Clone, Copy, Default)]
pub struct LocatorResolver {
    poll: PollPolicy,
}

impl LocatorResolver {
    pub fn new(poll: PollPolicy) -> Self {
        Self { poll }
    }

    /// 在超时内查找第一个可见匹配
    pub async fn find(
        &self,
        driver: &dyn PageDriver,
        target: &Target,
        timeout: Duration,
    ) -> Result<Option<ElementRef>> {
        let found = poll_until(timeout, self.poll, || self.probe(driver, target)).await?;
        if found.is_none() {
            debug!("控件 '{}' 在 {:?} 内未出现", target.name, timeout);
        }
        Ok(found)
    }

    /// 在超时内查找第一个命中策略的全部匹配
    pub async fn find_all(
        &self,
        driver: &dyn PageDriver,
        target: &Target,
        timeout: Duration,
    ) -> Result<Vec<ElementRef>> {
        let found = poll_until(timeout, self.poll, || self.probe_all(driver, target)).await?;
        Ok(found.unwrap_or_default())
    }

    /// 只探测一轮
    pub async fn probe(&self, driver: &dyn PageDriver, target: &Target) -> Result<Option<ElementRef>> {
        Ok(self
            .probe_all(driver, target)
            .await?
            .and_then(|all| all.into_iter().next()))
    }

    async fn probe_all(&self, driver: &dyn PageDriver, target: &Target) -> Result<Option<Vec<ElementRef>>> {
        for (rank, strategy) in target.strategies.iter().enumerate() {
            let matches = driver.query(strategy, target.visible_only).await?;
            if !matches.is_empty() {
                debug!(
                    "控件 '{}' 由第 {} 个策略命中 ({} 个匹配)",
                    target.name,
                    rank + 1,
                    matches.len()
                );
                return Ok(Some(matches));
            }
        }
        Ok(None)
    }
}
