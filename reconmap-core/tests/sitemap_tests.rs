// Tests for sitemap tree construction and sorting

use reconmap_core::data::{CapturedRecord, ManualEntry};
use reconmap_core::map::project_graph;
use reconmap_core::report::generate_text_tree;
use reconmap_core::sitemap::{
    EndpointSource, MAX_FOLDER_DEPTH, NodeRegistry, TreeNode, build_sorted_tree, build_tree,
    sort_tree,
};

fn record(id: i64, method: &str, url: &str, status: u16) -> CapturedRecord {
    CapturedRecord {
        id,
        method: method.to_string(),
        url: url.to_string(),
        status_code: Some(status),
        response_size: None,
        is_favorite: false,
    }
}

fn manual(id: i64, folder: &str, method: &str, path: &str, notes: Option<&str>) -> ManualEntry {
    ManualEntry {
        id,
        folder_path: folder.to_string(),
        method: method.to_string(),
        path: path.to_string(),
        notes: notes.map(str::to_string),
        source_log_id: None,
    }
}

fn count_paths(nodes: &[TreeNode], path: &str) -> usize {
    nodes
        .iter()
        .map(|n| usize::from(n.full_path == path) + count_paths(&n.children, path))
        .sum()
}

// ============================================================================
// Node Registry Tests
// ============================================================================

#[test]
fn test_registry_empty_segments_resolve_to_root() {
    let mut registry = NodeRegistry::new();

    let a = registry.ensure_node(&[]);
    let b = registry.ensure_node(&[""]);
    let c = registry.ensure_node(&["/"]);

    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(registry.full_path(a), "/");
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_reuses_existing_nodes() {
    let mut registry = NodeRegistry::new();

    let first = registry.ensure_node(&["api", "v1"]);
    let second = registry.ensure_node(&["/", "api", "v1"]);
    let via_path = registry.ensure_path("api/v1/");

    assert_eq!(first, second);
    assert_eq!(first, via_path);
    assert_eq!(registry.full_path(first), "/api/v1");
    // root, /api, /api/v1
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.lookup("/api/"), registry.lookup("/api"));
}

#[test]
fn test_registry_single_root() {
    let mut registry = NodeRegistry::new();
    registry.ensure_root();
    registry.ensure_path("/");
    registry.ensure_path("/a");
    registry.ensure_root();

    let roots = registry.into_roots();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].full_path, "/");
    assert_eq!(roots[0].children.len(), 1);
}

#[test]
fn test_registry_parent_is_path_minus_last_segment() {
    let mut registry = NodeRegistry::new();
    registry.ensure_path("/a/b/c");
    registry.ensure_path("/a/d");

    fn check(node: &TreeNode) {
        for child in &node.children {
            let parent = match child.full_path.rfind('/') {
                Some(0) => "/",
                Some(i) => &child.full_path[..i],
                None => panic!("non-absolute path {}", child.full_path),
            };
            assert_eq!(parent, node.full_path);
            check(child);
        }
    }

    let roots = registry.into_roots();
    check(&roots[0]);
}

// ============================================================================
// Tree Builder Tests
// ============================================================================

#[test]
fn test_build_tree_empty_input() {
    let roots = build_tree(&[], &[]);
    assert!(roots.is_empty());
}

#[test]
fn test_query_strings_share_one_folder() {
    let records = vec![
        record(1, "GET", "https://h/a/b?x=1", 200),
        record(2, "GET", "https://h/a/b?y=2", 200),
    ];

    let roots = build_sorted_tree(&records, &[]);

    assert_eq!(roots.len(), 1);
    assert_eq!(count_paths(&roots, "/a"), 1);
    assert_eq!(count_paths(&roots, "/a/b"), 0);

    let folder = roots[0].find("/a").unwrap();
    let paths: Vec<&str> = folder.endpoints.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/a/b?x=1", "/a/b?y=2"]);
}

#[test]
fn test_endpoint_at_site_root_attaches_to_root() {
    let records = vec![
        record(1, "GET", "https://h/", 200),
        record(2, "GET", "https://h", 200),
        record(3, "GET", "https://h/login", 200),
    ];

    let roots = build_sorted_tree(&records, &[]);

    assert_eq!(roots.len(), 1);
    let root = &roots[0];
    assert_eq!(root.full_path, "/");
    assert!(root.children.is_empty());
    let paths: Vec<&str> = root.endpoints.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/", "/", "/login"]);
}

#[test]
fn test_trailing_slash_url_lives_in_its_own_folder() {
    let roots = build_sorted_tree(&[record(1, "GET", "https://h/admin/", 403)], &[]);

    let admin = roots[0].find("/admin").unwrap();
    assert_eq!(admin.name, "admin");
    assert_eq!(admin.endpoints[0].path, "/admin/");
}

#[test]
fn test_malformed_url_is_skipped() {
    let records = vec![
        record(1, "GET", "::not a url::", 0),
        record(2, "GET", "https://h/ok/page", 200),
    ];

    let roots = build_sorted_tree(&records, &[]);

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].endpoint_count(), 1);
    let ok = roots[0].find("/ok").unwrap();
    assert_eq!(
        ok.endpoints[0].source,
        EndpointSource::Logged { log_id: 2 }
    );
}

#[test]
fn test_only_malformed_urls_yield_no_tree() {
    let roots = build_tree(&[record(1, "GET", "nope", 0)], &[]);
    assert!(roots.is_empty());
}

#[test]
fn test_method_is_kept_verbatim() {
    let roots = build_sorted_tree(&[record(1, "get", "https://h/x", 200)], &[]);
    assert_eq!(roots[0].endpoints[0].method, "get");
}

#[test]
fn test_logged_and_manual_merge_into_one_node() {
    let records = vec![CapturedRecord {
        id: 1,
        method: "GET".to_string(),
        url: "https://x.test/api/users?id=5".to_string(),
        status_code: Some(200),
        response_size: Some(512),
        is_favorite: true,
    }];
    let entries = vec![manual(7, "/api", "POST", "/api/users", Some("manual test"))];

    let roots = build_sorted_tree(&records, &entries);

    assert_eq!(roots.len(), 1);
    let root = &roots[0];
    assert_eq!(root.full_path, "/");
    assert_eq!(root.children.len(), 1);

    let api = &root.children[0];
    assert_eq!(api.full_path, "/api");
    assert_eq!(api.name, "api");
    assert_eq!(api.endpoints.len(), 2);

    let get = &api.endpoints[0];
    assert_eq!(get.method, "GET");
    assert_eq!(get.path, "/api/users?id=5");
    assert_eq!(get.status_code, Some(200));
    assert_eq!(get.response_size, Some(512));
    assert!(get.is_favorite);
    assert_eq!(get.source, EndpointSource::Logged { log_id: 1 });

    let post = &api.endpoints[1];
    assert_eq!(post.method, "POST");
    assert_eq!(post.path, "/api/users");
    assert!(post.is_manual());
    assert_eq!(
        post.source,
        EndpointSource::Manual {
            entry_id: 7,
            notes: Some("manual test".to_string()),
            source_log_id: None,
        }
    );
}

#[test]
fn test_manual_folder_is_normalized() {
    let entries = vec![
        manual(1, "api/", "GET", "/api/a", None),
        manual(2, "/api", "GET", "/api/b", None),
        manual(3, "", "GET", "/", None),
    ];

    let roots = build_sorted_tree(&[], &entries);

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].endpoints.len(), 1);
    assert_eq!(count_paths(&roots, "/api"), 1);
    assert_eq!(roots[0].find("/api").unwrap().endpoints.len(), 2);
}

#[test]
fn test_manual_entry_keeps_source_log_reference() {
    let mut entry = manual(1, "/admin", "DELETE", "/admin/users/1", None);
    entry.source_log_id = Some(42);

    let roots = build_sorted_tree(&[], &[entry]);
    let endpoint = &roots[0].find("/admin").unwrap().endpoints[0];

    assert!(matches!(
        endpoint.source,
        EndpointSource::Manual {
            source_log_id: Some(42),
            ..
        }
    ));
}

#[test]
fn test_exactly_one_root() {
    let records = vec![
        record(1, "GET", "https://a.test/x/y/z", 200),
        record(2, "GET", "https://b.test/", 200),
    ];
    let entries = vec![manual(1, "/", "GET", "/robots.txt", None)];

    let roots = build_sorted_tree(&records, &entries);

    assert_eq!(roots.len(), 1);
    assert_eq!(count_paths(&roots, "/"), 1);
    assert_eq!(roots[0].full_path, "/");
}

#[test]
fn test_deeply_nested_url_is_skipped() {
    let deep = format!("https://h/{}x", "a/".repeat(5000));
    let records = vec![
        record(1, "GET", &deep, 200),
        record(2, "GET", "https://h/ok/page", 200),
    ];

    let roots = build_sorted_tree(&records, &[]);

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].endpoint_count(), 1);
    assert!(roots[0].find("/a").is_none());
    assert!(roots[0].find("/ok").is_some());
}

#[test]
fn test_deeply_nested_manual_folder_is_skipped() {
    let folder = "/b".repeat(MAX_FOLDER_DEPTH + 1);
    let entries = vec![
        manual(1, &folder, "GET", "/b", None),
        manual(2, "/", "GET", "/robots.txt", None),
    ];

    let roots = build_sorted_tree(&[], &entries);

    assert_eq!(roots[0].endpoint_count(), 1);
    assert!(roots[0].children.is_empty());
}

#[test]
fn test_folder_at_depth_limit_is_kept() {
    let url = format!("https://h/{}x", "a/".repeat(MAX_FOLDER_DEPTH));
    let roots = build_sorted_tree(&[record(1, "GET", &url, 200)], &[]);

    assert_eq!(roots[0].endpoint_count(), 1);
    assert_eq!(roots[0].node_count(), MAX_FOLDER_DEPTH + 1);

    let graph = project_graph(&roots);
    assert_eq!(graph.nodes.len(), MAX_FOLDER_DEPTH + 2);
    assert!(generate_text_tree(&roots).contains("GET /"));
}

#[test]
fn test_registry_handles_deep_chains() {
    let mut registry = NodeRegistry::new();
    let folder = "/d".repeat(5000);
    registry.ensure_path(&folder);

    let mut roots = registry.into_roots();
    sort_tree(&mut roots);

    assert_eq!(roots[0].node_count(), 5001);
    assert!(roots[0].find(&folder).is_some());

    let graph = project_graph(&roots);
    assert_eq!(graph.nodes.len(), 5001);
    assert_eq!(graph.edges.len(), 5000);

    let text = generate_text_tree(&roots);
    assert_eq!(text.lines().count(), 5001);
    drop(roots);
}

// ============================================================================
// Tree Sorter Tests
// ============================================================================

#[test]
fn test_children_sorted_case_sensitive() {
    let records = vec![
        record(1, "GET", "https://h/beta/x", 200),
        record(2, "GET", "https://h/Alpha/x", 200),
        record(3, "GET", "https://h/alpha/x", 200),
    ];

    let roots = build_sorted_tree(&records, &[]);
    let names: Vec<&str> = roots[0].children.iter().map(|c| c.name.as_str()).collect();

    assert_eq!(names, vec!["Alpha", "alpha", "beta"]);
}

#[test]
fn test_endpoints_sorted_by_method_then_path() {
    let records = vec![
        record(1, "POST", "https://h/b", 200),
        record(2, "GET", "https://h/z", 200),
        record(3, "GET", "https://h/a", 200),
        record(4, "DELETE", "https://h/a", 200),
    ];

    let roots = build_sorted_tree(&records, &[]);
    let order: Vec<(&str, &str)> = roots[0]
        .endpoints
        .iter()
        .map(|e| (e.method.as_str(), e.path.as_str()))
        .collect();

    assert_eq!(
        order,
        vec![("DELETE", "/a"), ("GET", "/a"), ("GET", "/z"), ("POST", "/b")]
    );
}

#[test]
fn test_reversed_input_produces_identical_tree() {
    let records = vec![
        record(1, "GET", "https://h/api/users", 200),
        record(2, "GET", "https://h/api/users", 200),
        record(3, "POST", "https://h/api/login", 401),
        record(4, "GET", "https://h/static/app.js", 200),
        record(5, "GET", "https://h/", 200),
    ];
    let entries = vec![
        manual(1, "/api", "GET", "/api/users", Some("also via manual")),
        manual(2, "/hidden", "GET", "/hidden/panel", None),
    ];

    let forward = build_sorted_tree(&records, &entries);

    let mut rev_records = records.clone();
    rev_records.reverse();
    let mut rev_entries = entries.clone();
    rev_entries.reverse();
    let backward = build_sorted_tree(&rev_records, &rev_entries);

    assert_eq!(forward, backward);
    assert_eq!(
        serde_json::to_string(&forward).unwrap(),
        serde_json::to_string(&backward).unwrap()
    );
}

#[test]
fn test_sort_is_idempotent() {
    let records = vec![
        record(1, "PUT", "https://h/b/c/d", 200),
        record(2, "GET", "https://h/a/c", 200),
        record(3, "GET", "https://h/b/a", 200),
    ];

    let mut roots = build_sorted_tree(&records, &[]);
    let once = roots.clone();
    sort_tree(&mut roots);

    assert_eq!(roots, once);
}

// ============================================================================
// Serialization Tests
// ============================================================================

#[test]
fn test_empty_collections_serialize_as_arrays() {
    let roots = build_sorted_tree(&[record(1, "GET", "https://h/a/b", 200)], &[]);
    let json = serde_json::to_value(&roots).unwrap();

    let leaf = &json[0]["children"][0];
    assert_eq!(leaf["full_path"], "/a");
    assert_eq!(leaf["children"], serde_json::json!([]));
    assert_eq!(json[0]["endpoints"], serde_json::json!([]));
}

#[test]
fn test_endpoint_serializes_provenance_tag() {
    let roots = build_sorted_tree(
        &[record(9, "GET", "https://h/x", 200)],
        &[manual(3, "/", "POST", "/x", Some("n"))],
    );
    let json = serde_json::to_value(&roots[0].endpoints).unwrap();

    assert_eq!(json[0]["source"], "logged");
    assert_eq!(json[0]["log_id"], 9);
    assert_eq!(json[1]["source"], "manual");
    assert_eq!(json[1]["entry_id"], 3);
    assert_eq!(json[1]["notes"], "n");
}
