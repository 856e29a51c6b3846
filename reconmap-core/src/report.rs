// Sitemap views and report rendering from the database

use crate::data::Database;
use crate::error::Result;
use crate::map::{project_graph, project_page_graph};
use crate::model::Graph;
use crate::sitemap::{Endpoint, EndpointSource, TreeNode, build_sorted_tree};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Fetch a target's captured requests and manual entries and build the sorted tree.
///
/// A failed fetch is returned as-is; no partial tree is produced.
pub fn gather_sitemap(db: &Database, target_id: i64) -> Result<Vec<TreeNode>> {
    let records = db.get_request_summaries(target_id)?;
    let manual_entries = db.get_manual_entries(target_id)?;

    let roots = build_sorted_tree(&records, &manual_entries);
    info!(
        "Sitemap for target {}: {} folders, {} endpoints",
        target_id,
        roots.iter().map(TreeNode::node_count).sum::<usize>(),
        roots.iter().map(TreeNode::endpoint_count).sum::<usize>()
    );
    Ok(roots)
}

pub fn gather_sitemap_graph(db: &Database, target_id: i64) -> Result<Graph> {
    let roots = gather_sitemap(db, target_id)?;
    Ok(project_graph(&roots))
}

/// Project every recorded page of a target. Pages whose url lookup fails are skipped.
pub fn gather_page_graph(db: &Database, target_id: i64) -> Result<Graph> {
    let pages = db.list_pages(target_id)?;
    Ok(project_page_graph(&pages, |page| {
        db.get_distinct_page_urls(page.id)
    }))
}

pub fn generate_text_tree(roots: &[TreeNode]) -> String {
    if roots.is_empty() {
        return "  (empty)\n".to_string();
    }

    let mut result = String::new();
    for root in roots {
        result.push_str(&format!("{}\n", root.full_path));

        // (node, indent of its own line, whether it is the last sibling); roots have no line
        let mut pending: Vec<(&TreeNode, String, Option<bool>)> = vec![(root, String::new(), None)];
        while let Some((node, indent, is_last)) = pending.pop() {
            let body_indent = match is_last {
                Some(last) => {
                    result.push_str(&format!("{}{}{}/\n", indent, branch(last), node.name));
                    format!("{}{}", indent, if last { "    " } else { "│   " })
                }
                None => indent,
            };

            let total = node.endpoints.len() + node.children.len();
            for (position, endpoint) in node.endpoints.iter().enumerate() {
                let last = position + 1 == total;
                result.push_str(&format!(
                    "{}{}{}\n",
                    body_indent,
                    branch(last),
                    format_endpoint(endpoint)
                ));
            }

            let last_child = node.children.len().saturating_sub(1);
            for (position, child) in node.children.iter().enumerate().rev() {
                pending.push((child, body_indent.clone(), Some(position == last_child)));
            }
        }
    }
    result
}

fn branch(is_last: bool) -> &'static str {
    if is_last { "└── " } else { "├── " }
}

fn format_endpoint(endpoint: &Endpoint) -> String {
    let mut line = format!("{} {}", endpoint.method, endpoint.path);

    if let Some(status) = endpoint.status_code {
        let indicator = match status {
            200..=299 => "✓",
            300..=399 => "→",
            400..=499 => "⚠",
            500..=599 => "✗",
            _ => "?",
        };
        line.push_str(&format!("  [{} {}]", indicator, status));
    }
    if endpoint.is_favorite {
        line.push_str(" ★");
    }
    if let EndpointSource::Manual { ref notes, .. } = endpoint.source {
        line.push_str(" (manual)");
        if let Some(notes) = notes {
            line.push_str(&format!(" - {}", notes));
        }
    }

    line
}

pub fn generate_json_tree(target: &str, roots: &[TreeNode]) -> Result<String> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": metadata("sitemap"),
            "target": target,
            "summary": {
                "folders": roots.iter().map(TreeNode::node_count).sum::<usize>(),
                "endpoints": roots.iter().map(TreeNode::endpoint_count).sum::<usize>(),
            },
            "sitemap": roots,
        }
    });

    Ok(serde_json::to_string_pretty(&json_report)?)
}

pub fn generate_json_graph(target: &str, graph: &Graph) -> Result<String> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": metadata("graph"),
            "target": target,
            "summary": {
                "nodes": graph.nodes.len(),
                "edges": graph.edges.len(),
            },
            "graph": graph,
        }
    });

    Ok(serde_json::to_string_pretty(&json_report)?)
}

fn metadata(kind: &str) -> serde_json::Value {
    serde_json::json!({
        "generator": "Reconmap",
        "version": env!("CARGO_PKG_VERSION"),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "kind": kind,
    })
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
