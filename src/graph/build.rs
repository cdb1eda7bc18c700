use std::collections::HashMap;

use crate::data::{Connection, HopConnection};

use super::{EdgeDirection, GraphEdge, GraphNode, GraphSnapshot, NodeType};

/// Related-page caps: a sparse graph shows more related pages so the view
/// stays useful.
const RELATED_CAP_CONNECTED: usize = 5;
const RELATED_CAP_SPARSE: usize = 10;

#[derive(Clone, Copy)]
pub struct BuildInput<'a> {
    pub center_id: &'a str,
    pub center_title: &'a str,
    pub incoming: &'a [Connection],
    pub outgoing: &'a [Connection],
    pub second_hop: &'a [HopConnection],
    pub third_hop: &'a [HopConnection],
    pub related: &'a [Connection],
    pub viewer_username: Option<&'a str>,
}

/// Pure builder: raw connection lists in, deduplicated classified
/// snapshot out. Dedup priority is lowest hop level; result order is
/// insertion order (center, hop 1, hop 2, hop 3, related).
pub fn build(input: BuildInput<'_>) -> GraphSnapshot {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut hop_by_id: HashMap<String, u8> = HashMap::new();

    nodes.push(GraphNode {
        id: input.center_id.to_owned(),
        title: input.center_title.to_owned(),
        username: None,
        hop_level: 0,
        node_type: NodeType::Center,
        is_center: true,
    });
    hop_by_id.insert(input.center_id.to_owned(), 0);

    let hop1_ids = collect_hop1(input, &mut nodes, &mut edges, &mut hop_by_id);
    let hop2_ids = collect_deeper_hop(
        input.second_hop,
        2,
        &hop1_ids,
        &mut nodes,
        &mut edges,
        &mut hop_by_id,
    );
    collect_deeper_hop(
        input.third_hop,
        3,
        &hop2_ids,
        &mut nodes,
        &mut edges,
        &mut hop_by_id,
    );

    collect_related(input, &mut nodes, &hop_by_id);

    GraphSnapshot { nodes, edges }
}

fn is_malformed(connection: &Connection) -> bool {
    connection.id.is_empty() || connection.title.is_empty()
}

fn collect_hop1(
    input: BuildInput<'_>,
    nodes: &mut Vec<GraphNode>,
    edges: &mut Vec<GraphEdge>,
    hop_by_id: &mut HashMap<String, u8>,
) -> Vec<String> {
    let incoming_ids = input
        .incoming
        .iter()
        .map(|connection| connection.id.as_str())
        .collect::<Vec<_>>();
    let outgoing_ids = input
        .outgoing
        .iter()
        .map(|connection| connection.id.as_str())
        .collect::<Vec<_>>();

    let mut hop1_ids = Vec::new();
    for connection in input.incoming.iter().chain(input.outgoing.iter()) {
        if is_malformed(connection) {
            log::warn!("dropping malformed connection in hop-1 input");
            continue;
        }
        if hop_by_id.contains_key(&connection.id) {
            continue;
        }

        let in_incoming = incoming_ids.contains(&connection.id.as_str());
        let in_outgoing = outgoing_ids.contains(&connection.id.as_str());
        let direction = if in_incoming && in_outgoing {
            EdgeDirection::Bidirectional
        } else if in_outgoing {
            EdgeDirection::Outgoing
        } else {
            EdgeDirection::Incoming
        };

        hop_by_id.insert(connection.id.clone(), 1);
        hop1_ids.push(connection.id.clone());
        nodes.push(GraphNode {
            id: connection.id.clone(),
            title: connection.title.clone(),
            username: connection.username.clone(),
            hop_level: 1,
            node_type: NodeType::Connected,
            is_center: false,
        });
        edges.push(GraphEdge {
            source_id: input.center_id.to_owned(),
            target_id: connection.id.clone(),
            direction,
        });
    }

    hop1_ids
}

/// Places hop-2 or hop-3 entries, attaching each to the first `via`
/// parent present at the previous hop. Entries with no placeable parent
/// fall back to the first previous-hop node; with no previous hop at all
/// they are dropped (an edge needs both endpoints in the snapshot).
fn collect_deeper_hop(
    entries: &[HopConnection],
    hop_level: u8,
    previous_hop_ids: &[String],
    nodes: &mut Vec<GraphNode>,
    edges: &mut Vec<GraphEdge>,
    hop_by_id: &mut HashMap<String, u8>,
) -> Vec<String> {
    let mut placed_ids = Vec::new();

    for entry in entries {
        let connection = &entry.connection;
        if is_malformed(connection) {
            log::warn!("dropping malformed connection in hop-{hop_level} input");
            continue;
        }
        if hop_by_id.contains_key(&connection.id) {
            continue;
        }

        let parent_id = entry
            .via
            .iter()
            .find(|via| previous_hop_ids.contains(via))
            .or_else(|| previous_hop_ids.first())
            .cloned();
        let Some(parent_id) = parent_id else {
            continue;
        };

        hop_by_id.insert(connection.id.clone(), hop_level);
        placed_ids.push(connection.id.clone());
        nodes.push(GraphNode {
            id: connection.id.clone(),
            title: connection.title.clone(),
            username: connection.username.clone(),
            hop_level,
            node_type: NodeType::Connected,
            is_center: false,
        });
        edges.push(GraphEdge {
            source_id: parent_id,
            target_id: connection.id.clone(),
            direction: EdgeDirection::Outgoing,
        });
    }

    placed_ids
}

fn collect_related(
    input: BuildInput<'_>,
    nodes: &mut Vec<GraphNode>,
    hop_by_id: &HashMap<String, u8>,
) {
    let has_connections = nodes.len() > 1;
    let cap = if has_connections {
        RELATED_CAP_CONNECTED
    } else {
        RELATED_CAP_SPARSE
    };

    let mut taken = 0usize;
    for connection in input.related {
        if taken >= cap {
            break;
        }
        if is_malformed(connection) {
            log::warn!("dropping malformed connection in related input");
            continue;
        }
        if hop_by_id.contains_key(&connection.id)
            || nodes.iter().any(|node| node.id == connection.id)
        {
            continue;
        }
        if let (Some(viewer), Some(author)) =
            (input.viewer_username, connection.username.as_deref())
            && viewer == author
        {
            continue;
        }

        taken += 1;
        nodes.push(GraphNode {
            id: connection.id.clone(),
            title: connection.title.clone(),
            username: connection.username.clone(),
            hop_level: 4,
            node_type: NodeType::Related,
            is_center: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn connection(id: &str) -> Connection {
        Connection {
            id: id.to_owned(),
            title: format!("Title {id}"),
            username: None,
            last_modified: None,
            is_public: None,
        }
    }

    fn authored(id: &str, username: &str) -> Connection {
        Connection {
            username: Some(username.to_owned()),
            ..connection(id)
        }
    }

    fn hop(id: &str, via: &[&str]) -> HopConnection {
        HopConnection {
            connection: connection(id),
            via: via.iter().map(|v| (*v).to_owned()).collect(),
        }
    }

    fn input<'a>(
        incoming: &'a [Connection],
        outgoing: &'a [Connection],
        second_hop: &'a [HopConnection],
        third_hop: &'a [HopConnection],
        related: &'a [Connection],
    ) -> BuildInput<'a> {
        BuildInput {
            center_id: "A",
            center_title: "Center Page",
            incoming,
            outgoing,
            second_hop,
            third_hop,
            related,
            viewer_username: None,
        }
    }

    #[test]
    fn exactly_one_center_node_at_hop_zero() {
        let incoming = [connection("B")];
        let outgoing = [connection("C")];
        let snapshot = build(input(&incoming, &outgoing, &[], &[], &[]));

        let centers = snapshot
            .nodes
            .iter()
            .filter(|node| node.is_center)
            .collect::<Vec<_>>();
        assert_eq!(centers.len(), 1);
        assert_eq!(centers[0].hop_level, 0);
        assert_eq!(centers[0].node_type, NodeType::Center);
    }

    #[test]
    fn direction_classification_follows_membership() {
        // Spec example: B in both lists, C only outgoing.
        let incoming = [connection("B")];
        let outgoing = [connection("B"), connection("C")];
        let snapshot = build(input(&incoming, &outgoing, &[], &[], &[]));

        assert_eq!(snapshot.nodes.len(), 3);
        let b_edge = snapshot
            .edges
            .iter()
            .find(|edge| edge.target_id == "B")
            .unwrap();
        assert_eq!(b_edge.direction, EdgeDirection::Bidirectional);
        let c_edge = snapshot
            .edges
            .iter()
            .find(|edge| edge.target_id == "C")
            .unwrap();
        assert_eq!(c_edge.direction, EdgeDirection::Outgoing);
    }

    #[test]
    fn incoming_only_nodes_classify_incoming() {
        let incoming = [connection("B")];
        let snapshot = build(input(&incoming, &[], &[], &[], &[]));
        assert_eq!(snapshot.edges[0].direction, EdgeDirection::Incoming);
    }

    #[test]
    fn node_ids_unique_and_edges_reference_present_nodes() {
        let incoming = [connection("B"), connection("C")];
        let outgoing = [connection("B"), connection("D")];
        let second_hop = [hop("E", &["B"]), hop("F", &["ghost"])];
        let third_hop = [hop("G", &["E"])];
        let related = [connection("R")];
        let snapshot = build(input(&incoming, &outgoing, &second_hop, &third_hop, &related));

        let ids = snapshot
            .nodes
            .iter()
            .map(|node| node.id.as_str())
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), snapshot.nodes.len());
        for edge in &snapshot.edges {
            assert!(ids.contains(edge.source_id.as_str()));
            assert!(ids.contains(edge.target_id.as_str()));
        }
    }

    #[test]
    fn deeper_hops_attach_to_evidenced_parent() {
        let incoming = [connection("B")];
        let outgoing = [connection("C")];
        let second_hop = [hop("E", &["C", "B"])];
        let snapshot = build(input(&incoming, &outgoing, &second_hop, &[], &[]));

        let e_edge = snapshot
            .edges
            .iter()
            .find(|edge| edge.target_id == "E")
            .unwrap();
        assert_eq!(e_edge.source_id, "C");
    }

    #[test]
    fn unevidenced_hop_entries_fall_back_to_first_parent() {
        let incoming = [connection("B")];
        let second_hop = [hop("E", &["unknown"])];
        let snapshot = build(input(&incoming, &[], &second_hop, &[], &[]));

        let e_edge = snapshot
            .edges
            .iter()
            .find(|edge| edge.target_id == "E")
            .unwrap();
        assert_eq!(e_edge.source_id, "B");
    }

    #[test]
    fn hop_entries_without_any_previous_hop_are_dropped() {
        let second_hop = [hop("E", &["B"])];
        let snapshot = build(input(&[], &[], &second_hop, &[], &[]));
        assert!(snapshot.is_empty_connections());
    }

    #[test]
    fn lowest_hop_level_wins_on_duplicates() {
        let incoming = [connection("B")];
        let second_hop = [hop("B", &["B"]), hop("A", &["B"])];
        let snapshot = build(input(&incoming, &[], &second_hop, &[], &[]));

        assert_eq!(snapshot.nodes.len(), 2);
        let b_node = snapshot.nodes.iter().find(|node| node.id == "B").unwrap();
        assert_eq!(b_node.hop_level, 1);
    }

    #[test]
    fn related_nodes_carry_no_edges_and_skip_existing_ids() {
        let incoming = [connection("B")];
        let related = [connection("B"), connection("R")];
        let snapshot = build(input(&incoming, &[], &[], &[], &related));

        let related_nodes = snapshot
            .nodes
            .iter()
            .filter(|node| node.node_type == NodeType::Related)
            .collect::<Vec<_>>();
        assert_eq!(related_nodes.len(), 1);
        assert_eq!(related_nodes[0].id, "R");
        assert_eq!(related_nodes[0].hop_level, 4);
        for edge in &snapshot.edges {
            assert_ne!(edge.source_id, "R");
            assert_ne!(edge.target_id, "R");
        }
    }

    #[test]
    fn related_cap_is_five_when_connected_ten_when_sparse() {
        let related = (0..12).map(|i| connection(&format!("R{i}"))).collect::<Vec<_>>();

        let incoming = [connection("B")];
        let connected = build(input(&incoming, &[], &[], &[], &related));
        let connected_related = connected
            .nodes
            .iter()
            .filter(|node| node.node_type == NodeType::Related)
            .count();
        assert_eq!(connected_related, 5);

        let sparse = build(input(&[], &[], &[], &[], &related));
        let sparse_related = sparse
            .nodes
            .iter()
            .filter(|node| node.node_type == NodeType::Related)
            .count();
        assert_eq!(sparse_related, 10);
    }

    #[test]
    fn related_excludes_viewer_authored_pages() {
        let related = [authored("R1", "viewer"), authored("R2", "someone")];
        let snapshot = build(BuildInput {
            viewer_username: Some("viewer"),
            ..input(&[], &[], &[], &[], &related)
        });

        let related_ids = snapshot
            .nodes
            .iter()
            .filter(|node| node.node_type == NodeType::Related)
            .map(|node| node.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(related_ids, vec!["R2"]);
    }

    #[test]
    fn empty_inputs_yield_single_center_empty_connections() {
        let snapshot = build(input(&[], &[], &[], &[], &[]));
        assert_eq!(snapshot.nodes.len(), 1);
        assert!(snapshot.is_empty_connections());
        assert!(snapshot.edges.is_empty());
    }

    #[test]
    fn malformed_entries_are_dropped_without_aborting() {
        let incoming = [
            Connection {
                id: String::new(),
                title: "No Id".to_owned(),
                username: None,
                last_modified: None,
                is_public: None,
            },
            connection("B"),
        ];
        let snapshot = build(input(&incoming, &[], &[], &[], &[]));
        assert_eq!(snapshot.nodes.len(), 2);
    }

    #[test]
    fn result_order_is_center_then_hops_then_related() {
        let incoming = [connection("B")];
        let second_hop = [hop("E", &["B"])];
        let third_hop = [hop("F", &["E"])];
        let related = [connection("R")];
        let snapshot = build(input(&incoming, &[], &second_hop, &third_hop, &related));

        let hop_levels = snapshot
            .nodes
            .iter()
            .map(|node| node.hop_level)
            .collect::<Vec<_>>();
        assert_eq!(hop_levels, vec![0, 1, 2, 3, 4]);
    }
}
