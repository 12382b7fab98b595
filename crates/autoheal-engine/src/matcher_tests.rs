use autoheal_protocols::{FramePath, NodeHandle, WindowId};

use super::*;
use crate::mock_driver::MockDriver;

fn doc() -> SearchContext {
    SearchContext::document(WindowId::new("main"))
}

fn candidates(matcher: &ElementMatcher, nodes: Vec<NodeSnapshot>) -> Vec<Candidate> {
    let mut found = matcher.matches(&doc(), 0, nodes);
    rank_candidates(&mut found, matcher.action());
    found
}

#[test]
fn test_normalize_and_words() {
    assert_eq!(normalize("  Sign \n  In "), "sign in");
    assert!(contains_word("please sign in now", "sign in"));
    assert!(!contains_word("signing", "sign"));
    assert!(contains_word("log-in", "log"));
    assert!(!contains_word("anything", ""));
}

#[test]
fn test_pools() {
    assert!(is_interactive(&NodeSnapshot::new("a", "a")));
    assert!(is_interactive(&NodeSnapshot::new("d", "div").with_attr("role", "tab")));
    assert!(is_interactive(&NodeSnapshot::new("d", "div").with_cursor_pointer()));
    assert!(!is_interactive(
        &NodeSnapshot::new("i", "input").with_attr("type", "hidden")
    ));
    assert!(!is_interactive(&NodeSnapshot::new("p", "p")));

    assert!(is_fillable(&NodeSnapshot::new("i", "input")));
    assert!(is_fillable(&NodeSnapshot::new("t", "textarea")));
    assert!(is_fillable(&NodeSnapshot::new("d", "div").with_attr("contenteditable", "true")));
    assert!(!is_fillable(&NodeSnapshot::new("c", "input").with_attr("type", "checkbox")));

    assert!(is_selectable(&NodeSnapshot::new("s", "select")));
    assert!(is_selectable(&NodeSnapshot::new("d", "div").with_attr("role", "combobox")));
}

#[test]
fn test_score_ranks() {
    let matcher = ElementMatcher::new("Submit", Action::Click);

    let exact = NodeSnapshot::new("a", "button").with_text("  submit ");
    assert_eq!(matcher.score(&exact), Some((MatchRank::Exact, MatchSource::Text)));

    let word = NodeSnapshot::new("b", "button").with_text("Submit order");
    assert_eq!(matcher.score(&word), Some((MatchRank::WholeWord, MatchSource::Text)));

    let attr = NodeSnapshot::new("c", "button").with_attr("aria-label", "Submit");
    assert_eq!(matcher.score(&attr), Some((MatchRank::Exact, MatchSource::Attribute)));

    let sub = NodeSnapshot::new("d", "button").with_attr("class", "btn-submitting");
    assert_eq!(matcher.score(&sub), Some((MatchRank::Substring, MatchSource::Text)));

    let none = NodeSnapshot::new("e", "button").with_text("Cancel");
    assert_eq!(matcher.score(&none), None);

    assert_eq!(ElementMatcher::new("   ", Action::Click).score(&exact), None);
}

#[test]
fn test_labels_only_count_for_form_controls() {
    let input = NodeSnapshot::new("email", "input").with_wrapping_label("Email");

    let fill = ElementMatcher::new("Email", Action::Fill);
    assert_eq!(fill.score(&input), Some((MatchRank::Exact, MatchSource::Label)));

    // Clicks still see labels through the substring haystack.
    let click = ElementMatcher::new("Email", Action::Click);
    assert_eq!(click.score(&input), Some((MatchRank::Substring, MatchSource::Text)));
}

#[test]
fn test_exact_beats_substring_regardless_of_order() {
    let matcher = ElementMatcher::new("Save", Action::Click);
    let nodes = vec![
        NodeSnapshot::new("s1", "button").with_attr("id", "autosave-toggle").at_order(1),
        NodeSnapshot::new("s2", "button").with_attr("class", "saved-items").at_order(2),
        NodeSnapshot::new("s3", "button").with_attr("title", "savepoint").at_order(3),
        NodeSnapshot::new("exact", "button").with_text("Save").at_order(4),
    ];

    let ranked = candidates(&matcher, nodes);
    assert_eq!(ranked.len(), 4);
    assert_eq!(ranked[0].node.handle.as_str(), "exact");
    assert_eq!(ranked[0].rank, MatchRank::Exact);
    assert!(ranked[1..].iter().all(|c| c.rank == MatchRank::Substring));
    assert_eq!(ranked[1].node.handle.as_str(), "s1");
}

#[test]
fn test_fill_prefers_label_over_attribute() {
    let matcher = ElementMatcher::new("Email", Action::Fill);
    let nodes = vec![
        NodeSnapshot::new("by-attr", "input").with_attr("name", "email").at_order(1),
        NodeSnapshot::new("by-label", "input").with_explicit_label("Email").at_order(2),
    ];

    let ranked = candidates(&matcher, nodes);
    assert_eq!(ranked[0].node.handle.as_str(), "by-label");
    assert_eq!(ranked[0].source, MatchSource::Label);
}

#[test]
fn test_context_order_breaks_ties() {
    let matcher = ElementMatcher::new("Next", Action::Click);
    let frame = SearchContext::frame(WindowId::new("main"), FramePath(vec![0]));

    let mut found = matcher.matches(
        &frame,
        1,
        vec![NodeSnapshot::new("f", "button").with_text("Next").at_order(1)],
    );
    found.extend(matcher.matches(
        &doc(),
        0,
        vec![NodeSnapshot::new("m", "button").with_text("Next").at_order(9)],
    ));
    rank_candidates(&mut found, Action::Click);

    assert_eq!(found[0].node.handle.as_str(), "m");
}

#[test]
fn test_relaxed_accepts_any_click_node() {
    let text = NodeSnapshot::new("span", "span").with_text("Continue");
    let strict = ElementMatcher::new("Continue", Action::Click);
    assert!(strict.matches(&doc(), 0, vec![text.clone()]).is_empty());
    assert_eq!(strict.clone().relaxed().matches(&doc(), 0, vec![text]).len(), 1);

    // Relaxing never widens fill pools.
    let div = NodeSnapshot::new("d", "div").with_text("Email");
    assert!(
        ElementMatcher::new("Email", Action::Fill)
            .relaxed()
            .matches(&doc(), 0, vec![div])
            .is_empty()
    );
}

#[test]
fn test_duplicate_handles_removed() {
    let matcher = ElementMatcher::new("OK", Action::Click);
    let node = NodeSnapshot::new("ok", "button").with_text("OK");
    let overlay = SearchContext::overlay(WindowId::new("main"), NodeHandle::new("modal"));

    let mut found = matcher.matches(&overlay, 0, vec![node.clone()]);
    found.extend(matcher.matches(&doc(), 1, vec![node]));
    rank_candidates(&mut found, Action::Click);

    assert_eq!(found.len(), 1);
    assert!(found[0].context.is_overlay());
}

#[tokio::test]
async fn test_match_context_skips_unreadable_frame() {
    let driver = MockDriver::with_window("main", "");
    let w = WindowId::new("main");
    driver.add_cross_origin_frame(&w, FramePath(vec![0]));
    let matcher = ElementMatcher::new("Pay", Action::Click);

    let found = matcher
        .match_context(&driver, &SearchContext::frame(w.clone(), FramePath(vec![0])), 0)
        .await
        .unwrap();
    assert!(found.is_empty());

    driver.close_window(&w);
    let err = matcher.match_context(&driver, &doc(), 0).await.unwrap_err();
    assert!(matches!(err, DriverError::WindowClosed(_)));
}
