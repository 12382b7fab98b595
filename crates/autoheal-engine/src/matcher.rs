//! Element Matcher.
//!
//! Scores nodes of one context against a target descriptor. The candidate
//! pool depends on the action; visibility is deliberately not checked here,
//! the executor decides whether a node can be acted on.

use std::collections::HashSet;

use autoheal_protocols::{Action, BrowserDriver, DriverError, NodeQuery, NodeRef, NodeSnapshot};
use serde::Serialize;
use tracing::debug;

use crate::context::{SearchContext, aborts_walk};

/// How well a node matched. Ordered best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRank {
    Exact,
    WholeWord,
    Substring,
}

impl MatchRank {
    pub fn name(&self) -> &'static str {
        match self {
            MatchRank::Exact => "exact",
            MatchRank::WholeWord => "whole word",
            MatchRank::Substring => "substring",
        }
    }
}

/// Which facts of the node produced the match. Ordered by association strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Label,
    Text,
    Attribute,
}

/// Attributes compared for exact and whole-word matches.
const PRIMARY_ATTRS: [&str; 10] = [
    "aria-label",
    "placeholder",
    "value",
    "title",
    "alt",
    "name",
    "id",
    "data-testid",
    "data-test-id",
    "data-test",
];

/// Attributes folded into the substring haystack.
const SEARCHABLE_ATTRS: [&str; 9] = [
    "title",
    "aria-label",
    "data-testid",
    "id",
    "class",
    "name",
    "value",
    "placeholder",
    "alt",
];

const CLICK_TAGS: [&str; 6] = ["button", "a", "input", "select", "textarea", "summary"];
const CLICK_ROLES: [&str; 10] = [
    "button",
    "tab",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "link",
    "option",
    "checkbox",
    "radio",
    "switch",
];
const NON_TEXT_INPUTS: [&str; 10] = [
    "hidden", "button", "submit", "reset", "checkbox", "radio", "image", "file", "range", "color",
];

/// A matched node. Lives for one resolution attempt only.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: NodeSnapshot,
    pub context: SearchContext,
    pub rank: MatchRank,
    pub source: MatchSource,
    /// Position of `context` in its search phase.
    pub context_index: usize,
}

impl Candidate {
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.context.window().clone(), self.node.handle.clone())
    }

    fn sort_key(&self, action: Action) -> (MatchRank, MatchSource, usize, usize) {
        // Label association only breaks ties for form controls.
        let source = match action {
            Action::Fill | Action::Select => self.source,
            _ => MatchSource::Text,
        };
        (self.rank, source, self.context_index, self.node.order)
    }
}

/// Lower-cased, whitespace-collapsed form used for every comparison.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `needle` occurs in `hay` delimited by non-word characters.
pub fn contains_word(hay: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    hay.match_indices(needle).any(|(i, m)| {
        let before = hay[..i].chars().next_back();
        let after = hay[i + m.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

pub fn is_interactive(node: &NodeSnapshot) -> bool {
    if node.tag == "input" && node.input_type() == "hidden" {
        return false;
    }
    CLICK_TAGS.contains(&node.tag.as_str())
        || node.role().is_some_and(|r| CLICK_ROLES.contains(&r.as_str()))
        || node.has_attr("onclick")
        || node.has_click_handler
        || node.cursor_pointer
}

pub fn is_fillable(node: &NodeSnapshot) -> bool {
    match node.tag.as_str() {
        "textarea" => true,
        "input" => !NON_TEXT_INPUTS.contains(&node.input_type().as_str()),
        _ => {
            node.attr("contenteditable")
                .is_some_and(|v| v.is_empty() || v.eq_ignore_ascii_case("true"))
                || matches!(node.role().as_deref(), Some("textbox" | "searchbox"))
        }
    }
}

pub fn is_selectable(node: &NodeSnapshot) -> bool {
    node.tag == "select" || matches!(node.role().as_deref(), Some("listbox" | "combobox"))
}

/// Matches nodes against one target descriptor for one action.
#[derive(Debug, Clone)]
pub struct ElementMatcher {
    action: Action,
    needle: String,
    relaxed: bool,
}

impl ElementMatcher {
    pub fn new(target: &str, action: Action) -> Self {
        Self {
            action,
            needle: normalize(target),
            relaxed: false,
        }
    }

    /// Accept any node for clicks, for structure-agnostic scan results.
    pub fn relaxed(mut self) -> Self {
        self.relaxed = true;
        self
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Driver pre-filter for this action.
    pub fn query(&self) -> NodeQuery {
        match self.action {
            Action::Fill => NodeQuery::Fillable,
            Action::Select => NodeQuery::Selectable,
            _ => NodeQuery::Interactive,
        }
    }

    pub fn in_pool(&self, node: &NodeSnapshot) -> bool {
        match self.action {
            Action::Fill => is_fillable(node),
            Action::Select => is_selectable(node),
            _ => self.relaxed || is_interactive(node),
        }
    }

    /// Best rank of `node`, or `None` below substring relevance.
    pub fn score(&self, node: &NodeSnapshot) -> Option<(MatchRank, MatchSource)> {
        if self.needle.is_empty() {
            return None;
        }

        let mut fields: Vec<(MatchSource, String)> = Vec::new();
        if matches!(self.action, Action::Fill | Action::Select) {
            fields.extend(node.labels.iter().map(|l| (MatchSource::Label, normalize(l))));
        }
        fields.push((MatchSource::Text, normalize(&node.text)));
        for name in PRIMARY_ATTRS {
            if let Some(v) = node.attr(name) {
                fields.push((MatchSource::Attribute, normalize(v)));
            }
        }

        let best = fields
            .iter()
            .filter_map(|(source, value)| {
                if *value == self.needle {
                    Some((MatchRank::Exact, *source))
                } else if contains_word(value, &self.needle) {
                    Some((MatchRank::WholeWord, *source))
                } else {
                    None
                }
            })
            .min();
        if best.is_some() {
            return best;
        }

        let mut hay = normalize(&node.text);
        for name in SEARCHABLE_ATTRS {
            if let Some(v) = node.attr(name) {
                hay.push(' ');
                hay.push_str(&normalize(v));
            }
        }
        for label in node.labels.iter() {
            hay.push(' ');
            hay.push_str(&normalize(label));
        }
        hay.contains(&self.needle)
            .then_some((MatchRank::Substring, MatchSource::Text))
    }

    /// Score `nodes` found in `context`.
    pub fn matches(
        &self,
        context: &SearchContext,
        context_index: usize,
        nodes: Vec<NodeSnapshot>,
    ) -> Vec<Candidate> {
        nodes
            .into_iter()
            .filter(|n| self.in_pool(n))
            .filter_map(|node| {
                let (rank, source) = self.score(&node)?;
                Some(Candidate {
                    node,
                    context: context.clone(),
                    rank,
                    source,
                    context_index,
                })
            })
            .collect()
    }

    /// Query `context` and score what comes back.
    ///
    /// An unreadable context yields no candidates.
    pub async fn match_context(
        &self,
        driver: &dyn BrowserDriver,
        context: &SearchContext,
        context_index: usize,
    ) -> Result<Vec<Candidate>, DriverError> {
        match driver.query(&context.scope, self.query()).await {
            Ok(nodes) => Ok(self.matches(context, context_index, nodes)),
            Err(e) if aborts_walk(&e) => Err(e),
            Err(e) => {
                debug!(context = %context.describe(), "Context not searchable: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

/// Order candidates best first and drop repeated handles.
pub fn rank_candidates(candidates: &mut Vec<Candidate>, action: Action) {
    candidates.sort_by_key(|c| c.sort_key(action));
    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.node_ref()));
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
