// Graph projection of sitemap trees and recorded pages

use crate::data::{PageSession, PageUrl};
use crate::model::{Graph, GraphEdge, GraphNode, NodeKind};
use crate::sitemap::{Endpoint, EndpointSource, ROOT_PATH, TreeNode};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{debug, warn};

/// Opaque id for a method + path pair. Slashes become underscores so the id
/// can never collide with a folder id.
pub fn endpoint_id(method: &str, path: &str) -> String {
    format!("{}_{}", method, path.replace('/', "_"))
}

pub fn page_id(id: i64) -> String {
    format!("page-{}", id)
}

/// Accumulates nodes (deduplicated by id, first write wins) and edges (never deduplicated).
#[derive(Debug, Default)]
struct MapBuilder {
    nodes: BTreeMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
}

impl MapBuilder {
    fn insert_or_get_node(&mut self, node: GraphNode) -> String {
        let id = node.id.clone();
        self.nodes.entry(id.clone()).or_insert(node);
        id
    }

    fn insert_edge(&mut self, source: &str, target: &str, label: &str) {
        self.edges.push(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: label.to_string(),
        });
    }

    fn finish(self) -> Graph {
        Graph {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges,
        }
    }

    /// Pre-order walk from `root`, one folder node per tree node.
    fn process_tree(&mut self, root: &TreeNode) {
        let mut pending: Vec<(&TreeNode, Option<String>)> = vec![(root, None)];

        while let Some((node, parent)) = pending.pop() {
            let id = self.insert_or_get_node(GraphNode::new(
                node.full_path.as_str(),
                node.name.as_str(),
                NodeKind::Folder,
            ));

            if let Some(parent) = parent {
                self.insert_edge(&parent, &id, "");
            }

            for endpoint in &node.endpoints {
                let target = self.insert_or_get_node(endpoint_node(endpoint));
                self.insert_edge(&id, &target, &endpoint.method);
            }

            for child in node.children.iter().rev() {
                pending.push((child, Some(id.clone())));
            }
        }
    }
}

fn endpoint_node(endpoint: &Endpoint) -> GraphNode {
    let mut node = GraphNode::new(
        endpoint_id(&endpoint.method, &endpoint.path),
        format!("{} {}", endpoint.method, endpoint.path),
        NodeKind::Endpoint,
    )
    .with_attribute("method", endpoint.method.as_str())
    .with_attribute("path", endpoint.path.as_str())
    .with_attribute("is_favorite", endpoint.is_favorite);

    match endpoint.source {
        EndpointSource::Logged { log_id } => {
            node = node.with_attribute("log_id", log_id);
        }
        EndpointSource::Manual {
            entry_id,
            source_log_id,
            ..
        } => {
            node = node.with_attribute("manual_entry_id", entry_id);
            if let Some(log_id) = source_log_id {
                node = node.with_attribute("log_id", log_id);
            }
        }
    }

    if let Some(status) = endpoint.status_code {
        node = node.with_attribute("status_code", status);
    }
    if let Some(size) = endpoint.response_size {
        node = node.with_attribute("response_size", size);
    }

    node
}

/// Project a sorted sitemap tree into folder and endpoint nodes.
///
/// A `/` folder node is always present, even for an empty tree.
pub fn project_graph(roots: &[TreeNode]) -> Graph {
    let mut builder = MapBuilder::default();
    builder.insert_or_get_node(GraphNode::new(ROOT_PATH, ROOT_PATH, NodeKind::Folder));

    for root in roots {
        builder.process_tree(root);
    }

    let graph = builder.finish();
    debug!(
        "Projected sitemap graph: {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );
    graph
}

/// Project recorded pages and the distinct urls each one touched.
///
/// `lookup` fetches a page's urls; a page whose lookup fails is skipped.
pub fn project_page_graph<F, E>(pages: &[PageSession], mut lookup: F) -> Graph
where
    F: FnMut(&PageSession) -> Result<Vec<PageUrl>, E>,
    E: Display,
{
    let mut builder = MapBuilder::default();

    for page in pages {
        let urls = match lookup(page) {
            Ok(urls) => urls,
            Err(e) => {
                warn!("Skipping page {} ('{}'): {}", page.id, page.name, e);
                continue;
            }
        };

        let mut page_node = GraphNode::new(page_id(page.id), page.name.as_str(), NodeKind::Page)
            .with_attribute("start_time", page.start_time);
        if let Some(ref description) = page.description {
            page_node = page_node.with_attribute("description", description.as_str());
        }
        if let Some(end_time) = page.end_time {
            page_node = page_node.with_attribute("end_time", end_time);
        }
        let source = builder.insert_or_get_node(page_node);

        for url in urls {
            let url_node = GraphNode::new(
                endpoint_id(&url.method, &url.url),
                format!("{} {}", url.method, url.url),
                NodeKind::Url,
            )
            .with_attribute("log_id", url.log_id)
            .with_attribute("method", url.method.as_str())
            .with_attribute("url", url.url.as_str());

            let target = builder.insert_or_get_node(url_node);
            builder.insert_edge(&source, &target, &url.method);
        }
    }

    let graph = builder.finish();
    debug!(
        "Projected page graph: {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );
    graph
}
