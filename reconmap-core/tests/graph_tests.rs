// Tests for graph projection

use reconmap_core::data::{CapturedRecord, ManualEntry, PageSession, PageUrl};
use reconmap_core::map::{endpoint_id, page_id, project_graph, project_page_graph};
use reconmap_core::model::{Graph, NodeKind};
use reconmap_core::sitemap::build_sorted_tree;
use std::collections::HashSet;

fn record(id: i64, method: &str, url: &str) -> CapturedRecord {
    CapturedRecord {
        id,
        method: method.to_string(),
        url: url.to_string(),
        status_code: Some(200),
        response_size: Some(64),
        is_favorite: false,
    }
}

fn page(id: i64, name: &str) -> PageSession {
    PageSession {
        id,
        name: name.to_string(),
        description: Some(format!("{} flow", name)),
        start_time: 1_700_000_000,
        end_time: Some(1_700_000_060),
    }
}

fn page_url(log_id: i64, method: &str, url: &str) -> PageUrl {
    PageUrl {
        log_id,
        method: method.to_string(),
        url: url.to_string(),
    }
}

fn assert_unique_ids(graph: &Graph) {
    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids.len(), graph.nodes.len(), "duplicate node ids");
}

// ============================================================================
// Sitemap Projection Tests
// ============================================================================

#[test]
fn test_endpoint_id_replaces_separators() {
    assert_eq!(endpoint_id("GET", "/api/users"), "GET__api_users");
    assert_eq!(endpoint_id("GET", "/api/users?id=5"), "GET__api_users?id=5");
    assert!(!endpoint_id("POST", "/a/b/c").contains('/'));
}

#[test]
fn test_page_id_format() {
    assert_eq!(page_id(12), "page-12");
}

#[test]
fn test_empty_tree_still_has_root() {
    let graph = project_graph(&[]);

    assert_eq!(graph.nodes.len(), 1);
    assert_eq!(graph.nodes[0].id, "/");
    assert_eq!(graph.nodes[0].kind, NodeKind::Folder);
    assert!(graph.edges.is_empty());
}

#[test]
fn test_folder_and_endpoint_nodes() {
    let roots = build_sorted_tree(&[record(1, "GET", "https://h/api/users?id=5")], &[]);
    let graph = project_graph(&roots);

    let folder = graph.node("/api").unwrap();
    assert_eq!(folder.kind, NodeKind::Folder);
    assert_eq!(folder.label, "api");

    let id = endpoint_id("GET", "/api/users?id=5");
    let endpoint = graph.node(&id).unwrap();
    assert_eq!(endpoint.kind, NodeKind::Endpoint);
    assert_eq!(endpoint.label, "GET /api/users?id=5");
    assert_eq!(endpoint.attributes["log_id"], 1);
    assert_eq!(endpoint.attributes["status_code"], 200);
    assert_eq!(endpoint.attributes["response_size"], 64);
    assert_eq!(endpoint.attributes["is_favorite"], false);
    assert!(!endpoint.attributes.contains_key("manual_entry_id"));

    // Root has no incoming edge
    assert!(graph.edges.iter().all(|e| e.target != "/"));
    assert!(graph.edges.iter().all(|e| !e.source.is_empty()));

    let root_edges: Vec<_> = graph.edges_from("/").collect();
    assert_eq!(root_edges.len(), 1);
    assert_eq!(root_edges[0].target, "/api");
    assert_eq!(root_edges[0].label, "");

    let api_edges: Vec<_> = graph.edges_from("/api").collect();
    assert_eq!(api_edges.len(), 1);
    assert_eq!(api_edges[0].target, id);
    assert_eq!(api_edges[0].label, "GET");
}

#[test]
fn test_manual_endpoint_attributes() {
    let entry = ManualEntry {
        id: 4,
        folder_path: "/admin".to_string(),
        method: "POST".to_string(),
        path: "/admin/reset".to_string(),
        notes: Some("needs auth".to_string()),
        source_log_id: Some(11),
    };
    let roots = build_sorted_tree(&[], &[entry]);
    let graph = project_graph(&roots);

    let node = graph.node(&endpoint_id("POST", "/admin/reset")).unwrap();
    assert_eq!(node.attributes["manual_entry_id"], 4);
    assert_eq!(node.attributes["log_id"], 11);
    assert!(!node.attributes.contains_key("status_code"));
}

#[test]
fn test_duplicate_endpoints_yield_one_node_many_edges() {
    let records = vec![
        record(1, "GET", "https://h/login"),
        record(2, "GET", "https://h/login"),
    ];
    let roots = build_sorted_tree(&records, &[]);
    let graph = project_graph(&roots);

    assert_unique_ids(&graph);

    let id = endpoint_id("GET", "/login");
    let matching_nodes = graph.nodes.iter().filter(|n| n.id == id).count();
    assert_eq!(matching_nodes, 1);

    let matching_edges = graph.edges.iter().filter(|e| e.target == id).count();
    assert_eq!(matching_edges, 2);

    // First write wins
    assert_eq!(graph.node(&id).unwrap().attributes["log_id"], 1);
}

#[test]
fn test_graph_is_deterministic() {
    let records = vec![
        record(1, "GET", "https://h/a/b/c"),
        record(2, "POST", "https://h/a/x"),
        record(3, "GET", "https://h/z"),
    ];
    let mut reversed = records.clone();
    reversed.reverse();

    let a = project_graph(&build_sorted_tree(&records, &[]));
    let b = project_graph(&build_sorted_tree(&reversed, &[]));

    assert_eq!(a, b);
    assert_unique_ids(&a);

    let ids: Vec<&str> = a.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn test_graph_serializes_empty_edges_as_array() {
    let json = serde_json::to_value(project_graph(&[])).unwrap();
    assert_eq!(json["edges"], serde_json::json!([]));
    assert_eq!(json["nodes"][0]["kind"], "folder");
    assert_eq!(json["nodes"][0]["attributes"], serde_json::json!({}));
}

// ============================================================================
// Page Projection Tests
// ============================================================================

#[test]
fn test_page_graph_nodes_and_edges() {
    let pages = vec![page(1, "login"), page(2, "checkout")];

    let graph = project_page_graph(&pages, |p| -> Result<Vec<PageUrl>, String> {
        Ok(match p.id {
            1 => vec![
                page_url(10, "GET", "https://h/login"),
                page_url(11, "POST", "https://h/login"),
            ],
            _ => vec![page_url(20, "GET", "https://h/login")],
        })
    });

    assert_unique_ids(&graph);

    let login = graph.node("page-1").unwrap();
    assert_eq!(login.kind, NodeKind::Page);
    assert_eq!(login.label, "login");
    assert_eq!(login.attributes["description"], "login flow");
    assert_eq!(login.attributes["start_time"], 1_700_000_000i64);
    assert_eq!(login.attributes["end_time"], 1_700_000_060i64);

    let shared = endpoint_id("GET", "https://h/login");
    let url_node = graph.node(&shared).unwrap();
    assert_eq!(url_node.kind, NodeKind::Url);
    assert_eq!(url_node.label, "GET https://h/login");
    assert_eq!(url_node.attributes["log_id"], 10);

    // 2 pages + 2 distinct urls
    assert_eq!(graph.nodes.len(), 4);
    assert_eq!(graph.edges.len(), 3);
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.source == "page-2" && e.target == shared && e.label == "GET")
    );
}

#[test]
fn test_page_with_failed_lookup_is_skipped() {
    let pages = vec![page(1, "broken"), page(2, "fine")];

    let graph = project_page_graph(&pages, |p| {
        if p.id == 1 {
            Err("database is locked".to_string())
        } else {
            Ok(vec![page_url(5, "GET", "https://h/")])
        }
    });

    assert!(graph.node("page-1").is_none());
    assert!(graph.node("page-2").is_some());
    assert_eq!(graph.edges.len(), 1);
}

#[test]
fn test_page_without_urls_is_still_a_node() {
    let pages = vec![PageSession {
        id: 3,
        name: "idle".to_string(),
        description: None,
        start_time: 1,
        end_time: None,
    }];

    let graph = project_page_graph(&pages, |_| Ok::<_, String>(Vec::new()));

    assert_eq!(graph.nodes.len(), 1);
    let node = graph.node("page-3").unwrap();
    assert!(!node.attributes.contains_key("description"));
    assert!(!node.attributes.contains_key("end_time"));
    assert!(graph.edges.is_empty());
}

#[test]
fn test_no_pages_is_empty_graph() {
    let graph = project_page_graph(&[], |_| Ok::<_, String>(Vec::new()));
    assert!(graph.nodes.is_empty());
    assert!(graph.edges.is_empty());
}
