// Sitemap tree construction: captured requests and manual entries merged into
// one folder tree keyed by canonical path

use crate::data::{CapturedRecord, ManualEntry};
use crate::path::{directory_of, join_path, normalize_path, path_with_query, split_segments};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

pub const ROOT_PATH: &str = "/";

/// Folders nested deeper than this are skipped by [`build_tree`].
pub const MAX_FOLDER_DEPTH: usize = 128;

/// Where an endpoint came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EndpointSource {
    Logged {
        log_id: i64,
    },
    Manual {
        entry_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source_log_id: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_size: Option<i64>,
    pub is_favorite: bool,
    #[serde(flatten)]
    pub source: EndpointSource,
}

impl Endpoint {
    pub fn from_record(record: &CapturedRecord, url: &Url) -> Self {
        Self {
            method: record.method.clone(),
            path: path_with_query(url),
            status_code: record.status_code,
            response_size: record.response_size,
            is_favorite: record.is_favorite,
            source: EndpointSource::Logged { log_id: record.id },
        }
    }

    pub fn from_manual(entry: &ManualEntry) -> Self {
        Self {
            method: entry.method.clone(),
            path: entry.path.clone(),
            status_code: None,
            response_size: None,
            is_favorite: false,
            source: EndpointSource::Manual {
                entry_id: entry.id,
                notes: entry.notes.clone(),
                source_log_id: entry.source_log_id,
            },
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.source, EndpointSource::Manual { .. })
    }

    // Logged endpoints first, then by their own id
    fn provenance_key(&self) -> (u8, i64) {
        match self.source {
            EndpointSource::Logged { log_id } => (0, log_id),
            EndpointSource::Manual { entry_id, .. } => (1, entry_id),
        }
    }

    fn sort_order(&self, other: &Self) -> Ordering {
        self.method
            .cmp(&other.method)
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.provenance_key().cmp(&other.provenance_key()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub full_path: String,
    pub children: Vec<TreeNode>,
    pub endpoints: Vec<Endpoint>,
}

impl TreeNode {
    pub fn new(name: &str, full_path: &str) -> Self {
        Self {
            name: name.to_string(),
            full_path: full_path.to_string(),
            children: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    /// Pre-order walk over this node and everything below it.
    pub fn walk(&self) -> impl Iterator<Item = &TreeNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Depth-first lookup by canonical path.
    pub fn find(&self, full_path: &str) -> Option<&TreeNode> {
        self.walk().find(|node| node.full_path == full_path)
    }

    pub fn node_count(&self) -> usize {
        self.walk().count()
    }

    pub fn endpoint_count(&self) -> usize {
        self.walk().map(|node| node.endpoints.len()).sum()
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Index of a node inside the registry arena.
pub type NodeHandle = usize;

#[derive(Debug)]
struct ArenaNode {
    name: String,
    full_path: String,
    children: Vec<NodeHandle>,
    endpoints: Vec<Endpoint>,
}

/// Tracks every folder node by canonical path so each path maps to exactly one node.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    arena: Vec<ArenaNode>,
    by_path: HashMap<String, NodeHandle>,
    roots: Vec<NodeHandle>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn lookup(&self, full_path: &str) -> Option<NodeHandle> {
        self.by_path.get(&normalize_path(full_path)).copied()
    }

    pub fn full_path(&self, handle: NodeHandle) -> &str {
        &self.arena[handle].full_path
    }

    fn insert(&mut self, name: &str, full_path: String) -> NodeHandle {
        let handle = self.arena.len();
        self.arena.push(ArenaNode {
            name: name.to_string(),
            full_path: full_path.clone(),
            children: Vec::new(),
            endpoints: Vec::new(),
        });
        self.by_path.insert(full_path, handle);
        handle
    }

    fn attach(&mut self, parent: NodeHandle, child: NodeHandle) {
        if !self.arena[parent].children.contains(&child) {
            self.arena[parent].children.push(child);
        }
    }

    /// The root node, created and registered on first use.
    pub fn ensure_root(&mut self) -> NodeHandle {
        if let Some(&handle) = self.by_path.get(ROOT_PATH) {
            return handle;
        }
        let handle = self.insert(ROOT_PATH, ROOT_PATH.to_string());
        self.roots.push(handle);
        handle
    }

    /// Resolve (creating as needed) the node for a chain of path segments.
    ///
    /// The walk always starts at root, so `[]`, `[""]` and `["/"]` all resolve
    /// to root and `["/", "api"]` is the same chain as `["api"]`.
    pub fn ensure_node(&mut self, segments: &[&str]) -> NodeHandle {
        let mut current = self.ensure_root();

        for segment in segments.iter().flat_map(|s| split_segments(s)) {
            let full_path = join_path(&self.arena[current].full_path, segment);
            let handle = match self.by_path.get(&full_path) {
                Some(&existing) => existing,
                None => self.insert(segment, full_path),
            };
            self.attach(current, handle);
            current = handle;
        }

        current
    }

    /// Resolve the node for a folder path such as `/api/v1`.
    pub fn ensure_path(&mut self, folder: &str) -> NodeHandle {
        let folder = normalize_path(folder);
        self.ensure_node(&split_segments(&folder))
    }

    pub fn add_endpoint(&mut self, handle: NodeHandle, endpoint: Endpoint) {
        self.arena[handle].endpoints.push(endpoint);
    }

    /// Consume the registry and return the owned root list.
    ///
    /// A child is always inserted after its parent, so walking the arena
    /// backwards finishes every subtree before its parent needs it.
    pub fn into_roots(self) -> Vec<TreeNode> {
        let NodeRegistry { arena, roots, .. } = self;
        let mut built: Vec<Option<TreeNode>> = Vec::with_capacity(arena.len());
        built.resize_with(arena.len(), || None);

        for (handle, node) in arena.into_iter().enumerate().rev() {
            let children = node
                .children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            built[handle] = Some(TreeNode {
                name: node.name,
                full_path: node.full_path,
                children,
                endpoints: node.endpoints,
            });
        }

        roots
            .into_iter()
            .filter_map(|handle| built[handle].take())
            .collect()
    }
}

fn too_deep(folder: &str) -> bool {
    split_segments(folder).len() > MAX_FOLDER_DEPTH
}

/// Merge captured requests and manual entries into one unsorted folder tree.
///
/// Records whose URL cannot be parsed, and records or entries whose folder is
/// deeper than [`MAX_FOLDER_DEPTH`], are skipped with a warning.
pub fn build_tree(records: &[CapturedRecord], manual_entries: &[ManualEntry]) -> Vec<TreeNode> {
    let mut registry = NodeRegistry::new();
    let mut skipped = 0usize;

    for record in records {
        let url = match Url::parse(&record.url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping log {} with unparseable URL '{}': {}", record.id, record.url, e);
                skipped += 1;
                continue;
            }
        };

        let path = if url.path().is_empty() { ROOT_PATH } else { url.path() };
        let folder = directory_of(path);
        if too_deep(&folder) {
            warn!("Skipping log {}: folder nests deeper than {} levels", record.id, MAX_FOLDER_DEPTH);
            skipped += 1;
            continue;
        }
        let handle = registry.ensure_path(&folder);
        registry.add_endpoint(handle, Endpoint::from_record(record, &url));
    }

    for entry in manual_entries {
        if too_deep(&entry.folder_path) {
            warn!(
                "Skipping manual entry {}: folder nests deeper than {} levels",
                entry.id, MAX_FOLDER_DEPTH
            );
            skipped += 1;
            continue;
        }
        let handle = registry.ensure_path(&entry.folder_path);
        registry.add_endpoint(handle, Endpoint::from_manual(entry));
    }

    debug!(
        "Built sitemap: {} folders from {} records and {} manual entries ({} skipped)",
        registry.len(),
        records.len(),
        manual_entries.len(),
        skipped
    );

    registry.into_roots()
}

/// Sort children by name and endpoints by method then path, at every level.
pub fn sort_tree(nodes: &mut [TreeNode]) {
    let mut pending = vec![nodes];
    while let Some(level) = pending.pop() {
        level.sort_by(|a, b| a.name.cmp(&b.name));
        for node in level {
            node.endpoints.sort_by(Endpoint::sort_order);
            pending.push(node.children.as_mut_slice());
        }
    }
}

/// Build and sort in one step.
pub fn build_sorted_tree(
    records: &[CapturedRecord],
    manual_entries: &[ManualEntry],
) -> Vec<TreeNode> {
    let mut roots = build_tree(records, manual_entries);
    sort_tree(&mut roots);
    roots
}
