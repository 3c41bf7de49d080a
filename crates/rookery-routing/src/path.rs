use std::collections::{HashSet, VecDeque};

use rookery_core::{NestName, TopologyTable};

/// First hop on a shortest path from `from` to `to`
///
/// Breadth-first over `table`, visiting neighbors in the order each nest
/// reported them, so ties go to the earlier neighbor. A nest missing from
/// the table counts as having no neighbors. Returns `None` if `to` cannot
/// be reached.
pub fn find_route(from: &NestName, to: &NestName, table: &TopologyTable) -> Option<NestName> {
    // Worklist of (nest, first hop taken to reach it)
    let mut queue: VecDeque<(&NestName, Option<&NestName>)> = VecDeque::new();
    let mut enqueued: HashSet<&NestName> = HashSet::new();
    queue.push_back((from, None));
    enqueued.insert(from);

    while let Some((at, via)) = queue.pop_front() {
        for next in table.neighbors_of(at.as_str()) {
            let hop = via.unwrap_or(next);
            if next == to {
                return Some(hop.clone());
            }
            if enqueued.insert(next) {
                queue.push_back((next, Some(hop)));
            }
        }
    }
    None
}
