//! Reducing a merged result set to a single device

use strsim::jaro_winkler;

use crate::device::{DeviceGraph, DeviceIndex};
use crate::matching::{MatchResult, Results};

/// Lowest difference wins. Among equal differences the handler seen first
/// wins; several results of that handler at the minimum are separated by
/// Jaro-Winkler similarity of their user agent to the query, earlier
/// results winning on equal similarity.
pub fn closest(graph: &DeviceGraph, results: &Results, user_agent: &str) -> Option<MatchResult> {
    if results.len() <= 1 {
        return results.iter().next().copied();
    }

    let mut sorted = results.clone();
    sorted.sort();
    let first = *sorted.iter().next()?;

    let mut tied: Vec<MatchResult> = Vec::new();
    for result in sorted
        .iter()
        .take_while(|r| r.difference == first.difference)
        .filter(|r| r.handler == first.handler)
    {
        if !tied.iter().any(|t| t.device == result.device) {
            tied.push(*result);
        }
    }
    if tied.len() == 1 {
        return Some(first);
    }

    let mut best = first;
    let mut best_similarity = similarity(graph, first.device, user_agent);
    for candidate in tied.into_iter().skip(1) {
        let score = similarity(graph, candidate.device, user_agent);
        if score > best_similarity {
            best = candidate;
            best_similarity = score;
        }
    }
    Some(best)
}

fn similarity(graph: &DeviceGraph, device: DeviceIndex, user_agent: &str) -> f64 {
    graph
        .user_agent(device)
        .map_or(0.0, |candidate| jaro_winkler(candidate, user_agent))
}

/// Closest ancestor (inclusive) shared by every candidate's fallback chain.
pub fn shared_parent(graph: &DeviceGraph, results: &Results) -> Option<DeviceIndex> {
    let mut candidates: Vec<DeviceIndex> = Vec::new();
    for result in results {
        if !candidates.contains(&result.device) {
            candidates.push(result.device);
        }
    }
    if candidates.len() <= 1 {
        return candidates.first().copied();
    }

    candidates.iter().find_map(|&candidate| {
        graph
            .ancestors(candidate)
            .find(|&ancestor| candidates.iter().all(|&other| graph.is_ancestor(ancestor, other)))
    })
}

/// First configured default id that exists in the graph
pub fn default_device<S: AsRef<str>>(graph: &DeviceGraph, ids: &[S]) -> Option<DeviceIndex> {
    ids.iter().find_map(|id| graph.find(id.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;
    use crate::strings::StringTable;

    // generic
    // ├── phone
    // │   ├── phone_a   "Phone/1.0 Alpha"
    // │   └── phone_b   "Phone/1.0 Beta"
    // └── tablet        "Tablet/2.0"
    fn graph() -> DeviceGraph {
        let mut graph = DeviceGraph::new(StringTable::new());
        let ids: Vec<_> = ["generic", "phone", "phone_a", "phone_b", "tablet"]
            .into_iter()
            .map(|id| graph.strings_mut().add(id))
            .collect();
        let ua_a = graph.strings_mut().add("Phone/1.0 Alpha");
        let ua_b = graph.strings_mut().add("Phone/1.0 Beta");
        let ua_t = graph.strings_mut().add("Tablet/2.0");

        let generic = graph.push(DeviceInfo::new(ids[0]));
        let phone = graph.push(DeviceInfo::new(ids[1]).with_fallback(generic));
        graph.push(DeviceInfo::new(ids[2]).with_fallback(phone).with_user_agent(ua_a));
        graph.push(DeviceInfo::new(ids[3]).with_fallback(phone).with_user_agent(ua_b));
        graph.push(DeviceInfo::new(ids[4]).with_fallback(generic).with_user_agent(ua_t));
        graph
    }

    fn results(items: &[(DeviceIndex, u32, usize)]) -> Results {
        items
            .iter()
            .map(|&(d, diff, h)| MatchResult::new(d, diff, h))
            .collect()
    }

    #[test]
    fn single_result_returned_as_is() {
        let graph = graph();
        let r = results(&[(4, 9, 0)]);
        assert_eq!(closest(&graph, &r, "x").unwrap().device, 4);
        assert!(closest(&graph, &Results::new(), "x").is_none());
    }

    #[test]
    fn lowest_difference_wins() {
        let graph = graph();
        let r = results(&[(2, 5, 0), (4, 1, 1)]);
        assert_eq!(closest(&graph, &r, "x").unwrap().device, 4);
    }

    #[test]
    fn first_handler_wins_equal_difference() {
        let graph = graph();
        // handler 1 was consulted first (higher confidence)
        let r = results(&[(4, 2, 1), (3, 2, 0)]);
        assert_eq!(closest(&graph, &r, "Phone/1.0 Beta").unwrap().device, 4);
    }

    #[test]
    fn similarity_breaks_ties_within_a_handler() {
        let graph = graph();
        let r = results(&[(2, 3, 0), (3, 3, 0)]);
        assert_eq!(closest(&graph, &r, "Phone/1.0 Betamax").unwrap().device, 3);
        assert_eq!(closest(&graph, &r, "Phone/1.0 Alphabet").unwrap().device, 2);
    }

    #[test]
    fn shared_parent_of_siblings() {
        let graph = graph();
        assert_eq!(shared_parent(&graph, &results(&[(2, 1, 0), (3, 1, 0)])), Some(1));
        assert_eq!(shared_parent(&graph, &results(&[(2, 1, 0), (4, 1, 0)])), Some(0));
        assert_eq!(shared_parent(&graph, &results(&[(2, 1, 0), (1, 1, 0)])), Some(1));
        assert_eq!(shared_parent(&graph, &results(&[(3, 0, 0)])), Some(3));
        assert_eq!(shared_parent(&graph, &Results::new()), None);
    }

    #[test]
    fn defaults_in_order() {
        let graph = graph();
        assert_eq!(default_device(&graph, &["missing", "tablet", "generic"]), Some(4));
        assert_eq!(default_device(&graph, &["missing"]), None);
        assert_eq!(default_device::<&str>(&graph, &[]), None);
    }
}
