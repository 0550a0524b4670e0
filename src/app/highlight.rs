use std::collections::HashSet;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::layout::PositionedGraph;
use crate::sim::Snapshot;

#[derive(Debug, Default)]
pub(super) struct HighlightState {
    pub anchor: Option<usize>,
    pub route: HashSet<usize>,
    pub flashing: HashSet<usize>,
}

impl HighlightState {
    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

pub(super) fn search_matches(graph: &PositionedGraph, query: &str) -> HashSet<usize> {
    let query = query.trim();
    if query.is_empty() {
        return HashSet::new();
    }

    let matcher = SkimMatcherV2::default();
    graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| {
            fuzzy_match_score(&matcher, &node.label, query).is_some()
                || fuzzy_match_score(&matcher, &node.id, query).is_some()
        })
        .map(|(index, _)| index)
        .collect()
}

/// Selected task's anchor plus both of its endpoints, and nodes with a
/// running flash timer.
pub(super) fn build_highlight_state<'a>(
    graph: &PositionedGraph,
    snapshot: &Snapshot,
    selected_task: Option<&str>,
    flashing: impl Iterator<Item = &'a String>,
) -> HighlightState {
    let mut state = HighlightState {
        flashing: flashing.filter_map(|id| graph.index_of(id)).collect(),
        ..HighlightState::default()
    };

    let Some(task) = selected_task.and_then(|id| snapshot.task(id)) else {
        return state;
    };

    state.anchor = graph.index_of(task.anchor_node());
    state.route.extend(graph.index_of(&task.pickup_node));
    state.route.extend(graph.index_of(&task.dropoff_node));
    state
}
