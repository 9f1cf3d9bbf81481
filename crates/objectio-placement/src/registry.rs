//! Static node registry and region-preferring placement (spec §4.2).

use objectio_common::{Error, NodeId, Result};
use std::collections::HashMap;

/// One entry in the node registry: id, base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeEntry {
    pub node_id: NodeId,
    pub base_url: String,
}

/// A read-only, config-loaded fleet of storage nodes plus their region
/// grouping. Built once at startup; `select_nodes` never mutates it.
#[derive(Clone, Debug)]
pub struct NodeRegistry {
    nodes: Vec<NodeEntry>,
    regions: HashMap<String, Vec<NodeId>>,
}

impl NodeRegistry {
    #[must_use]
    pub fn new(nodes: Vec<NodeEntry>, regions: HashMap<String, Vec<NodeId>>) -> Self {
        Self { nodes, regions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn all_nodes(&self) -> &[NodeEntry] {
        &self.nodes
    }

    #[must_use]
    pub fn get(&self, node_id: &NodeId) -> Option<&NodeEntry> {
        self.nodes.iter().find(|n| &n.node_id == node_id)
    }

    /// Select `count` nodes, region-preferring (spec §4.2 step 2).
    ///
    /// If `preferred_region` is set and known, that region's nodes come
    /// first (in declared order), then remaining nodes from other
    /// regions fill the rest (in declared order). If unset or unknown,
    /// the first `count` nodes in global declared order are returned.
    /// Fails with `CapacityError` if `count` exceeds the fleet size.
    pub fn select_nodes(
        &self,
        count: usize,
        preferred_region: Option<&str>,
    ) -> Result<Vec<NodeEntry>> {
        if count > self.nodes.len() {
            return Err(Error::CapacityError {
                available: self.nodes.len(),
                required: count,
            });
        }

        let preferred_ids: Option<&Vec<NodeId>> =
            preferred_region.and_then(|r| self.regions.get(r));

        let Some(preferred_ids) = preferred_ids else {
            return Ok(self.nodes.iter().take(count).cloned().collect());
        };

        let mut selected = Vec::with_capacity(count);
        for entry in &self.nodes {
            if selected.len() == count {
                break;
            }
            if preferred_ids.contains(&entry.node_id) {
                selected.push(entry.clone());
            }
        }
        if selected.len() < count {
            for entry in &self.nodes {
                if selected.len() == count {
                    break;
                }
                if !selected.iter().any(|s| s.node_id == entry.node_id) {
                    selected.push(entry.clone());
                }
            }
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> NodeRegistry {
        let nodes = vec![
            NodeEntry {
                node_id: NodeId::new("n1"),
                base_url: "http://n1".into(),
            },
            NodeEntry {
                node_id: NodeId::new("n2"),
                base_url: "http://n2".into(),
            },
            NodeEntry {
                node_id: NodeId::new("n3"),
                base_url: "http://n3".into(),
            },
            NodeEntry {
                node_id: NodeId::new("n4"),
                base_url: "http://n4".into(),
            },
        ];
        let mut regions = HashMap::new();
        regions.insert(
            "us".to_string(),
            vec![NodeId::new("n3"), NodeId::new("n4")],
        );
        NodeRegistry::new(nodes, regions)
    }

    #[test]
    fn select_without_region_is_global_order() {
        let reg = registry();
        let selected = reg.select_nodes(2, None).unwrap();
        assert_eq!(selected[0].node_id, NodeId::new("n1"));
        assert_eq!(selected[1].node_id, NodeId::new("n2"));
    }

    #[test]
    fn select_prefers_region_then_fills() {
        let reg = registry();
        let selected = reg.select_nodes(3, Some("us")).unwrap();
        let ids: Vec<_> = selected.iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(ids, vec!["n3", "n4", "n1"]);
    }

    #[test]
    fn select_unknown_region_falls_back_to_global() {
        let reg = registry();
        let selected = reg.select_nodes(2, Some("eu")).unwrap();
        assert_eq!(selected[0].node_id, NodeId::new("n1"));
        assert_eq!(selected[1].node_id, NodeId::new("n2"));
    }

    #[test]
    fn select_more_than_fleet_fails() {
        let reg = registry();
        let err = reg.select_nodes(10, None).unwrap_err();
        assert!(matches!(err, Error::CapacityError { .. }));
    }

    #[test]
    fn selection_is_deterministic() {
        let reg = registry();
        let a = reg.select_nodes(3, Some("us")).unwrap();
        let b = reg.select_nodes(3, Some("us")).unwrap();
        assert_eq!(
            a.iter().map(|n| n.node_id.as_str()).collect::<Vec<_>>(),
            b.iter().map(|n| n.node_id.as_str()).collect::<Vec<_>>()
        );
    }
}
