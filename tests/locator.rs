mod common;

use common::{FakeElement, FakePage};
use note_publisher::services::{LocatorResolver, PollPolicy, Target};
use std::time::Duration;

fn resolver() -> LocatorResolver {
    LocatorResolver::new(PollPolicy::fixed(Duration::from_millis(2)))
}

const SHORT: Duration = Duration::from_millis(30);

#[tokio::test]
async fn first_matching_strategy_wins() {
    let page = FakePage::new(vec![
        FakeElement::new("by-text", "button").text("公開に進む"),
        FakeElement::new("by-attr", "button").attr("button.publish"),
    ]);
    let target = Target::new("publish")
        .attribute("button.publish")
        .exact_text("button", "公開に進む");

    let found = resolver().find(&page, &target, SHORT).await.unwrap().unwrap();

    assert_eq!(found.handle, "by-attr");
}

#[tokio::test]
async fn later_strategies_are_tried_in_order() {
    let page = FakePage::new(vec![FakeElement::new("partial", "button").text("次へ: 公開に進む")]);
    let target = Target::new("publish")
        .attribute("button.publish")
        .exact_text("button", "公開に進む")
        .partial_text("button", "公開に進む");

    let found = resolver().find(&page, &target, SHORT).await.unwrap().unwrap();

    assert_eq!(found.handle, "partial");
    assert_eq!(found.text, "次へ: 公開に進む");
}

#[tokio::test]
async fn hidden_elements_are_ignored_unless_requested() {
    let page = FakePage::new(vec![FakeElement::new("file", "input").attr("input[type=file]").hidden()]);
    let visible = Target::new("file").attribute("input[type=file]");
    let hidden = visible.clone().include_hidden();

    assert!(resolver().find(&page, &visible, SHORT).await.unwrap().is_none());
    assert!(resolver().find(&page, &hidden, SHORT).await.unwrap().is_some());
}

#[tokio::test]
async fn waits_for_late_elements() {
    let page = FakePage::new(vec![FakeElement::new("late", "button").text("OK").appear_after(4)]);
    let target = Target::new("ok").exact_text("button", "OK");

    let found = resolver()
        .find(&page, &target, Duration::from_millis(500))
        .await
        .unwrap();

    assert_eq!(found.map(|e| e.handle).as_deref(), Some("late"));
}

#[tokio::test]
async fn timeout_returns_none_instead_of_error() {
    let page = FakePage::new(Vec::new());
    let target = Target::new("missing").exact_text("button", "nope");

    let found = resolver().find(&page, &target, SHORT).await;

    assert!(matches!(found, Ok(None)));
}

#[tokio::test]
async fn role_strategy_filters_by_name() {
    let page = FakePage::new(vec![
        FakeElement::new("tab-a", "div").role("tab").text("記事"),
        FakeElement::new("tab-b", "div").role("tab").text("マガジン"),
    ]);
    let target = Target::new("magazine").role("tab", Some("マガジン"));

    let found = resolver().find(&page, &target, SHORT).await.unwrap().unwrap();

    assert_eq!(found.handle, "tab-b");
}

#[tokio::test]
async fn find_all_returns_every_match_of_the_first_strategy() {
    let page = FakePage::new(vec![
        FakeElement::new("l0", "button").text("ラインをこの場所に変更"),
        FakeElement::new("l1", "button").text("ラインをこの場所に変更"),
        FakeElement::new("other", "button").text("この場所に変更する"),
    ]);
    let target = Target::new("lines")
        .exact_text("button", "ラインをこの場所に変更")
        .partial_text("button", "この場所に変更");

    let all = resolver().find_all(&page, &target, SHORT).await.unwrap();

    let handles: Vec<&str> = all.iter().map(|e| e.handle.as_str()).collect();
    assert_eq!(handles, ["l0", "l1"]);
}

#[tokio::test]
async fn driver_errors_propagate() {
    let page = FakePage::new(vec![FakeElement::new("bomb", "button").text("x").breaks_session()]);
    let target = Target::new("bomb").exact_text("button", "x");
    let element = resolver().find(&page, &target, SHORT).await.unwrap().unwrap();

    use note_publisher::infrastructure::PageDriver;
    assert!(page.click(&element).await.is_err());
    let err = resolver().find(&page, &target, SHORT).await.unwrap_err();
    assert_eq!(err.kind(), note_publisher::FailureKind::SessionBroken);
}
