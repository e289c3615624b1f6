mod common;

use common::*;
use note_publisher::error::FailureKind;
use note_publisher::models::{
    ImageReference, ImageRole, MembershipTier, PaywallPlacement, PublishJob, PublishMode, PublishResult,
    ResolvedImages, TerminalState,
};
use note_publisher::services::{MemoryEventSink, PublishEvent};
use note_publisher::workflow::{FlowOptions, JobCtx, PublishFlow};
use std::path::Path;
use std::sync::Arc;

const DEMO: &str = "---
title: Demo
price: 500
tags: [rust, note]
magazine: Weekly
membership: standard
twitter: true
---
Intro paragraph.

Second paragraph here.

<!-- paid -->

Paid content.
";

async fn publish_with(
    page: &FakePage,
    job: &PublishJob,
    options: FlowOptions,
) -> (PublishResult, Arc<MemoryEventSink>) {
    let sink = memory_sink();
    let flow = PublishFlow::new(options, sink.clone());
    let ctx = JobCtx::new(&job.id, 1, 1, 1);
    let result = flow.run(page, job, &ctx).await;
    (result, sink)
}

async fn publish(page: &FakePage, job: &PublishJob, dir: &Path) -> (PublishResult, Arc<MemoryEventSink>) {
    publish_with(page, job, fast_options(dir)).await
}

fn position(page: &FakePage, action: &str) -> usize {
    page.actions()
        .iter()
        .position(|a| a.starts_with(action))
        .unwrap_or_else(|| panic!("未执行操作 {}: {:?}", action, page.actions()))
}

#[tokio::test]
async fn publishes_a_monetized_article_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    let job = job_from_markdown("demo.md", DEMO);

    let (result, sink) = publish(&page, &job, dir.path()).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.terminal, TerminalState::Published);
    assert_eq!(result.final_url.as_deref(), Some(PUBLISHED_URL));
    assert_eq!(result.applied_price, Some(500));
    assert_eq!(result.tags_applied, vec!["rust", "note"]);
    assert_eq!(result.paywall, PaywallPlacement::Anchored { ordinal: 1 });
    assert_eq!(result.applied_collection.as_deref(), Some("Weekly"));
    assert_eq!(result.applied_membership, Some(MembershipTier::Standard));
    assert!(result.cross_post_applied);
    assert!(!result.submission_uncertain);
    assert!(result.skipped_steps.is_empty(), "{:?}", result.skipped_steps);

    assert!(page.has_action("fill:title=Demo"));
    assert!(page.has_action("fill:price=500"));
    assert!(page.has_action("type:tags=rust"));
    assert!(page.has_action("click:line1"));
    assert_eq!(page.count("click:submit"), 1);

    // 标题 → 正文 → 设置 → 提交
    assert!(position(&page, "fill:title") < position(&page, "paste:body"));
    assert!(position(&page, "paste:body") < position(&page, "click:proceed"));
    assert!(position(&page, "click:proceed") < position(&page, "type:tags"));
    assert!(position(&page, "click:line1") < position(&page, "click:submit"));

    let events = sink.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, PublishEvent::PaywallPlaced { placement: PaywallPlacement::Anchored { ordinal: 1 }, .. })));
    assert!(matches!(
        events.last(),
        Some(PublishEvent::JobFinished { success: true, terminal: TerminalState::Published, .. })
    ));
}

#[tokio::test]
async fn body_is_pasted_as_html_without_the_marker() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    let job = job_from_markdown("demo.md", DEMO);

    publish(&page, &job, dir.path()).await;

    let paste = page
        .actions()
        .into_iter()
        .find(|a| a.starts_with("paste:body="))
        .unwrap();
    assert!(paste.contains("<p>Intro paragraph.</p>"));
    assert!(paste.contains("<p>Paid content.</p>"));
    assert!(!paste.contains("paid -->"));
}

#[tokio::test]
async fn free_article_skips_monetization() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    let job = job_from_markdown("free.md", "# Free\n\nJust text.");

    let (result, _) = publish(&page, &job, dir.path()).await;

    assert!(result.success);
    assert_eq!(result.applied_price, None);
    assert_eq!(result.paywall, PaywallPlacement::NotApplicable);
    assert_eq!(page.count("click:paid"), 0);
    assert_eq!(page.count("type:tags"), 0);
}

#[tokio::test]
async fn missing_optional_control_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    page.remove("tags");
    page.remove("magazine-tab");
    let job = job_from_markdown("demo.md", DEMO);

    let (result, sink) = publish(&page, &job, dir.path()).await;

    assert!(result.success, "{}", result.message);
    assert!(result.tags_applied.is_empty());
    assert_eq!(result.applied_collection, None);
    assert!(result.skipped_steps.contains(&"标签输入框".to_string()));
    assert!(result.skipped_steps.contains(&"マガジン标签页".to_string()));
    // 标签输入框缺失后不再尝试剩余标签
    assert_eq!(
        sink.events()
            .iter()
            .filter(|e| matches!(e, PublishEvent::OptionalStepSkipped { control, .. } if control == "标签输入框"))
            .count(),
        1
    );
}

#[tokio::test]
async fn missing_required_control_fails_with_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    page.remove("submit");
    let job = job_from_markdown("demo.md", DEMO);

    let (result, _) = publish(&page, &job, dir.path()).await;

    assert!(!result.success);
    assert_eq!(result.terminal, TerminalState::Failed);
    assert_eq!(result.failure, Some(FailureKind::RequiredControlNotFound));
    assert!(result.message.contains("投稿する按钮"));
    let shot = result.screenshot_path.expect("失败时应截图");
    assert!(shot.starts_with(dir.path()));
    assert!(shot.to_string_lossy().contains("demo_failed_"));
    assert_eq!(page.count("screenshot:"), 1);
}

#[tokio::test]
async fn unconfirmed_submission_is_marked_uncertain_and_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    page.remove("submit");
    page.add(FakeElement::new("submit", "button").text("投稿する"));
    let job = job_from_markdown("demo.md", DEMO);

    let (result, sink) = publish(&page, &job, dir.path()).await;

    assert!(result.success);
    assert!(result.submission_uncertain);
    assert_eq!(result.final_url.as_deref(), Some(SETTINGS_URL));
    assert!(result.screenshot_path.is_some());
    assert_eq!(page.count("click:submit"), 1);
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, PublishEvent::SubmissionUncertain { .. })));
}

#[tokio::test]
async fn confirmation_dialog_is_clicked_once() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    page.remove("submit");
    page.add(
        FakeElement::new("submit", "button")
            .text("投稿する")
            .on_click(Effect::Show("dialog-ok".to_string())),
    );
    page.add(
        FakeElement::new("dialog-ok", "dialog button")
            .text("投稿する")
            .hidden()
            .on_click(Effect::SetUrl(PUBLISHED_URL.to_string())),
    );
    let job = job_from_markdown("demo.md", DEMO);

    let (result, _) = publish(&page, &job, dir.path()).await;

    assert!(result.success);
    assert!(!result.submission_uncertain);
    assert_eq!(result.final_url.as_deref(), Some(PUBLISHED_URL));
    assert_eq!(page.count("click:dialog-ok"), 1);
}

#[tokio::test]
async fn dry_run_stops_before_submit() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    let job = job_from_markdown("demo.md", DEMO);
    let options = FlowOptions {
        dry_run: true,
        ..fast_options(dir.path())
    };

    let (result, _) = publish_with(&page, &job, options).await;

    assert!(result.success);
    assert_eq!(result.terminal, TerminalState::DryRun);
    assert_eq!(result.applied_price, Some(500));
    assert_eq!(page.count("click:submit"), 0);
}

#[tokio::test]
async fn draft_mode_saves_without_opening_settings() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    let mut job = job_from_markdown("demo.md", DEMO);
    job.mode = PublishMode::Draft;

    let (result, _) = publish(&page, &job, dir.path()).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.terminal, TerminalState::DraftSaved);
    assert!(!result.submission_uncertain);
    assert_eq!(page.count("click:save-draft"), 1);
    assert_eq!(page.count("click:proceed"), 0);
    assert_eq!(page.count("click:submit"), 0);
}

#[tokio::test]
async fn dry_run_in_draft_mode_does_not_save_a_draft() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    let mut job = job_from_markdown("demo.md", DEMO);
    job.mode = PublishMode::Draft;
    let options = FlowOptions {
        dry_run: true,
        ..fast_options(dir.path())
    };

    let (result, _) = publish_with(&page, &job, options).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.terminal, TerminalState::DryRun);
    assert_eq!(page.count("click:save-draft"), 0);
    assert_eq!(page.count("click:submit"), 0);
}

#[tokio::test]
async fn login_redirect_is_an_authentication_failure() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor().redirect_to("https://note.com/login?redirectPath=%2Fnew");
    let job = job_from_markdown("demo.md", DEMO);

    let (result, _) = publish(&page, &job, dir.path()).await;

    assert!(!result.success);
    assert_eq!(result.failure, Some(FailureKind::AuthenticationExpired));
    assert!(result.is_batch_fatal());
    assert_eq!(page.count("fill:"), 0);
}

#[tokio::test]
async fn transient_errors_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    page.remove("title");
    page.add(
        FakeElement::new("title", "textarea")
            .attr(r#"textarea[placeholder="記事タイトル"]"#)
            .flaky(1),
    );
    let job = job_from_markdown("demo.md", DEMO);

    let (result, _) = publish(&page, &job, dir.path()).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(page.count("fill:title="), 1);
}

#[tokio::test]
async fn paywall_falls_back_to_paragraph_index() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    let job = job_from_markdown(
        "fallback.md",
        "---\nprice: 300\n---\nAlpha.\n\nBeta.\n\n<!-- paid -->\n\nGamma.",
    );

    let (result, sink) = publish(&page, &job, dir.path()).await;

    assert!(result.success);
    assert_eq!(result.paywall, PaywallPlacement::IndexFallback { ordinal: 1 });
    assert!(page.has_action("click:line1"));
    assert!(sink.events().iter().any(|e| matches!(
        e,
        PublishEvent::PaywallLowConfidence { search_text: Some(text), .. } if text == "Beta."
    )));
}

#[tokio::test]
async fn paywall_beyond_available_positions_is_not_placed() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    let job = job_from_markdown(
        "long.md",
        "---\nprice: 300\n---\nOne.\n\nTwo.\n\nThree.\n\nFour.\n\n<!-- paid -->\n\nFive.",
    );

    let (result, _) = publish(&page, &job, dir.path()).await;

    assert!(result.success);
    assert_eq!(result.paywall, PaywallPlacement::NotPlaced);
    assert_eq!(page.count("click:line"), 0);
}

#[tokio::test]
async fn images_are_uploaded_cover_first() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    let image = |name: &str, role: ImageRole, ordinal: Option<u32>| ImageReference {
        alt_text: String::new(),
        source_path: format!("images/{}", name),
        resolved_path: dir.path().join(name),
        role,
        ordinal,
    };
    let images = ResolvedImages {
        cover: Some(image("thumbnail.png", ImageRole::Cover, None)),
        inline: vec![image("fig1.png", ImageRole::Inline, Some(1))],
    };
    let mut job = job_from_markdown("demo.md", DEMO);
    job.images = images;

    let (result, _) = publish(&page, &job, dir.path()).await;

    assert!(result.success, "{}", result.message);
    assert!(position(&page, "upload:file=thumbnail.png") < position(&page, "upload:file=fig1.png"));
    assert!(position(&page, "click:cover") < position(&page, "upload:file=thumbnail.png"));
    assert!(position(&page, "click:inline-image") < position(&page, "upload:file=fig1.png"));
}

#[tokio::test]
async fn broken_session_is_reported_as_such() {
    let dir = tempfile::tempdir().unwrap();
    let page = note_editor();
    page.remove("body");
    page.add(
        FakeElement::new("body", "div")
            .attr(r#"div.ProseMirror[contenteditable="true"]"#)
            .breaks_session(),
    );
    let job = job_from_markdown("demo.md", DEMO);

    let (result, _) = publish(&page, &job, dir.path()).await;

    assert!(!result.success);
    assert!(result.is_session_broken());
    assert_eq!(result.screenshot_path, None);
}
