//! Collection hierarchy traversal.
//!
//! Collections may reference each other, so the hierarchy is a graph. The
//! traversal is depth-first and keeps the set of collections on the current
//! root-to-node path; meeting one of them again yields a back-reference leaf
//! instead of recursing. The same collection may still appear under several
//! different paths.

use std::collections::HashSet;
use std::fmt::Write;

use futures::future::{BoxFuture, FutureExt};

use crate::error::{Error, Result};
use crate::model::Handle;
use crate::objects::registry::ObjectRegistry;

/// One node of an expanded collection hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionTreeNode {
    pub handle: Handle,
    pub children: Vec<CollectionTreeNode>,
    /// Set when `handle` already appears among this node's ancestors.
    /// Back-references have no children.
    pub is_back_reference: bool,
}

impl CollectionTreeNode {
    fn leaf(handle: Handle, is_back_reference: bool) -> Self {
        Self {
            handle,
            children: Vec::new(),
            is_back_reference,
        }
    }

    /// Documents below this node in depth-first order.
    pub fn documents(&self) -> Vec<&Handle> {
        let mut out = Vec::new();
        self.walk(&mut Vec::new(), &mut |_, handle| out.push(handle));
        out
    }

    /// Documents below this node with the collections leading to them,
    /// excluding this node itself.
    pub fn document_paths(&self) -> Vec<(Vec<&Handle>, &Handle)> {
        let mut out = Vec::new();
        self.walk(&mut Vec::new(), &mut |path, handle| {
            out.push((path.to_vec(), handle))
        });
        out
    }

    fn walk<'a>(
        &'a self,
        path: &mut Vec<&'a Handle>,
        visit: &mut dyn FnMut(&[&'a Handle], &'a Handle),
    ) {
        for child in &self.children {
            if child.handle.is_document() {
                visit(path, &child.handle);
            } else if !child.is_back_reference {
                path.push(&child.handle);
                child.walk(path, visit);
                path.pop();
            }
        }
    }

    /// Number of nodes in this subtree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(CollectionTreeNode::node_count).sum::<usize>()
    }

    /// Render as an indented listing labelled by handle.
    pub fn render(&self) -> String {
        self.render_with(|handle| handle.to_string())
    }

    /// Render as an indented listing using `label` for each node.
    pub fn render_with(&self, label: impl Fn(&Handle) -> String) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", label(&self.handle));
        self.render_children(&label, "", &mut out);
        out
    }

    fn render_children(&self, label: &dyn Fn(&Handle) -> String, prefix: &str, out: &mut String) {
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            let last = i + 1 == count;
            let branch = if last { "└── " } else { "├── " };
            let marker = if child.is_back_reference { " (back-reference)" } else { "" };
            let _ = writeln!(out, "{}{}{}{}", prefix, branch, label(&child.handle), marker);
            let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
            child.render_children(label, &next, out);
        }
    }
}

/// Expand the hierarchy below the collection `root`.
///
/// Dropping the returned future stops the traversal; listings already
/// fetched stay cached.
pub async fn build_tree(registry: &ObjectRegistry, root: &Handle) -> Result<CollectionTreeNode> {
    if !root.is_collection() {
        return Err(Error::InvalidHandle(format!("{} (expected a Collection)", root)));
    }
    let mut ancestors = HashSet::new();
    expand(registry, root.clone(), &mut ancestors).await
}

fn expand<'a>(
    registry: &'a ObjectRegistry,
    handle: Handle,
    ancestors: &'a mut HashSet<Handle>,
) -> BoxFuture<'a, Result<CollectionTreeNode>> {
    async move {
        if !handle.is_collection() {
            return Ok(CollectionTreeNode::leaf(handle, false));
        }
        if ancestors.contains(&handle) {
            tracing::debug!("{} is its own ancestor, not descending", handle);
            return Ok(CollectionTreeNode::leaf(handle, true));
        }

        let child_handles = registry.list_children(&handle).await?;
        ancestors.insert(handle.clone());
        let mut children = Vec::with_capacity(child_handles.len());
        for child in child_handles.iter() {
            children.push(expand(registry, child.clone(), ancestors).await?);
        }
        ancestors.remove(&handle);

        Ok(CollectionTreeNode {
            handle,
            children,
            is_back_reference: false,
        })
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Handle {
        s.parse().unwrap()
    }

    fn node(handle: &str, children: Vec<CollectionTreeNode>) -> CollectionTreeNode {
        CollectionTreeNode {
            handle: h(handle),
            children,
            is_back_reference: false,
        }
    }

    fn sample() -> CollectionTreeNode {
        node(
            "Collection-1",
            vec![
                node("Document-10", vec![]),
                node(
                    "Collection-2",
                    vec![
                        node("Document-20", vec![]),
                        CollectionTreeNode::leaf(h("Collection-1"), true),
                    ],
                ),
                node("Document-11", vec![]),
            ],
        )
    }

    #[test]
    fn test_documents_in_depth_first_order() {
        let tree = sample();
        let docs: Vec<String> = tree.documents().iter().map(|d| d.to_string()).collect();
        assert_eq!(docs, vec!["Document-10", "Document-20", "Document-11"]);
    }

    #[test]
    fn test_document_paths_exclude_root() {
        let tree = sample();
        let paths = tree.document_paths();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].0.is_empty());
        assert_eq!(paths[1].0, vec![&h("Collection-2")]);
        assert_eq!(paths[1].1, &h("Document-20"));
    }

    #[test]
    fn test_node_count_includes_back_references() {
        assert_eq!(sample().node_count(), 6);
    }

    #[test]
    fn test_render() {
        let expected = "\
Collection-1
├── Document-10
├── Collection-2
│   ├── Document-20
│   └── Collection-1 (back-reference)
└── Document-11
";
        assert_eq!(sample().render(), expected);
    }
}
