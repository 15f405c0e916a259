//! Named-interface seam for a WebDAV adapter, per the "external
//! collaborators get a named interface, not a full implementation"
//! contract: a read-only directory tree built from an archive's member
//! list, plus a guard type that rejects the mutating WebDAV verbs.
//!
//! There is no HTTP server here, no request routing, and no `dav-server`
//! trait implementation. An external crate wraps [`Node`] the way it would
//! wrap any other read-only filesystem tree.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::member::Member;
use crate::path;

const DIR_MODE: u32 = 0o555;
const FILE_MODE: u32 = 0o444;

/// One entry in the directory tree: either a directory with children keyed
/// by path segment, or a leaf referencing the archive member it came from.
#[derive(Debug)]
pub enum Node {
    Dir {
        mode: u32,
        children: BTreeMap<String, Node>,
    },
    File {
        mode: u32,
        member: Member,
    },
}

impl Node {
    fn empty_dir() -> Self {
        Node::Dir {
            mode: DIR_MODE,
            children: BTreeMap::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Dir { .. })
    }

    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Dir { children, .. } => Some(children),
            Node::File { .. } => None,
        }
    }

    pub fn member(&self) -> Option<&Member> {
        match self {
            Node::File { member, .. } => Some(member),
            Node::Dir { .. } => None,
        }
    }

    /// Look up `path` (slash-separated, no leading slash) from this node.
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        if path.is_empty() {
            return Some(self);
        }
        let mut node = self;
        for segment in path::split(path) {
            node = node.children()?.get(segment)?;
        }
        Some(node)
    }
}

/// Build a directory tree from an archive's member list. Explicit
/// directory members set the tree node's mode from their on-disk mode;
/// directories implied only by a file's path (no matching directory
/// member) get the default `0o555`.
pub fn build_tree(members: &[Member]) -> Node {
    let mut root = Node::empty_dir();
    for member in members {
        if member.mode.is_dir() {
            insert_dir(&mut root, &member.name, member.mode.permissions() | DIR_MODE);
        } else {
            insert_file(&mut root, member.clone());
        }
    }
    root
}

fn insert_dir(root: &mut Node, name: &str, mode: u32) {
    let segments: Vec<&str> = path::split(name).into_iter().filter(|s| !s.is_empty()).collect();
    let mut node = root;
    for (i, segment) in segments.iter().enumerate() {
        let children = match node {
            Node::Dir { children, .. } => children,
            Node::File { .. } => return,
        };
        let is_last = i == segments.len() - 1;
        let entry = children
            .entry(segment.to_string())
            .or_insert_with(Node::empty_dir);
        if is_last {
            if let Node::Dir { mode: m, .. } = entry {
                *m = mode;
            }
        }
        node = entry;
    }
}

fn insert_file(root: &mut Node, member: Member) {
    let segments: Vec<&str> = path::split(&member.name)
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };
    let mut node = root;
    for segment in parents {
        let children = match node {
            Node::Dir { children, .. } => children,
            Node::File { .. } => return,
        };
        node = children
            .entry(segment.to_string())
            .or_insert_with(Node::empty_dir);
    }
    if let Node::Dir { children, .. } = node {
        children.insert(
            leaf.to_string(),
            Node::File {
                mode: FILE_MODE,
                member,
            },
        );
    }
}

/// Rejects every mutating WebDAV verb. A real adapter calls through to this
/// guard before touching the tree; none of these can ever succeed against
/// a QuickTar archive, which is read-only once closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebDavGuard;

impl WebDavGuard {
    pub fn mkcol(&self, _path: &str) -> Result<()> {
        Err(Error::Permission("WebDAV MKCOL is not supported"))
    }

    pub fn put(&self, _path: &str) -> Result<()> {
        Err(Error::Permission("WebDAV PUT is not supported"))
    }

    pub fn delete(&self, _path: &str) -> Result<()> {
        Err(Error::Permission("WebDAV DELETE is not supported"))
    }

    pub fn mv(&self, _from: &str, _to: &str) -> Result<()> {
        Err(Error::Permission("WebDAV MOVE is not supported"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Mode;

    fn member(name: &str, mode: Mode) -> Member {
        Member {
            name: name.to_string(),
            offset: 0,
            size: 0,
            mode,
            mod_sec: 0,
            mod_nsec: 0,
        }
    }

    #[test]
    fn builds_nested_tree_from_file_paths() {
        let members = vec![
            member("a/b.txt", Mode::regular(0o644)),
            member("a/c/d.txt", Mode::regular(0o644)),
        ];
        let tree = build_tree(&members);
        assert!(tree.lookup("a").unwrap().is_dir());
        assert!(tree.lookup("a/c").unwrap().is_dir());
        assert!(!tree.lookup("a/b.txt").unwrap().is_dir());
        assert!(tree.lookup("a/c/d.txt").unwrap().member().is_some());
        assert!(tree.lookup("missing").is_none());
    }

    #[test]
    fn explicit_directory_member_sets_mode() {
        let members = vec![member("docs/", Mode::directory(0o700))];
        let tree = build_tree(&members);
        let docs = tree.lookup("docs").unwrap();
        match docs {
            Node::Dir { mode, .. } => assert_eq!(*mode & 0o700, 0o700),
            Node::File { .. } => panic!("expected directory"),
        }
    }

    #[test]
    fn guard_rejects_all_mutations() {
        let guard = WebDavGuard;
        assert!(guard.mkcol("x").is_err());
        assert!(guard.put("x").is_err());
        assert!(guard.delete("x").is_err());
        assert!(guard.mv("x", "y").is_err());
    }
}
