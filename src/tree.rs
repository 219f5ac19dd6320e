//! Device tree mutation interface and an in-memory implementation.
//!
//! The rule evaluator is a pure client of [`DeviceTree`]; whatever serves the
//! tree to clients owns the real structure. [`MemTree`] is a self-contained
//! tree used by the offline checker and the tests.

use std::collections::BTreeMap;
use std::fmt;

use crate::DeviceKind;

pub const S_IFMT: u32 = 0o170_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFLNK: u32 = 0o120_000;

/// Operations the evaluator needs from the device tree.
///
/// Handles are cheap copies; the tree owns the nodes.
pub trait DeviceTree {
    type Node: Copy;

    fn root(&self) -> Self::Node;

    fn get_child(&self, dir: Self::Node, name: &str) -> Option<Self::Node>;

    fn make_directory(&mut self, dir: Self::Node, name: &str) -> Self::Node;

    fn make_device(
        &mut self,
        dir: Self::Node,
        name: &str,
        kind: DeviceKind,
        major: u32,
        minor: u32,
    ) -> Self::Node;

    fn set_owner(&mut self, node: Self::Node, user: &str, group: &str);

    /// Full `st_mode` of the node, type bits included.
    fn mode(&self, node: Self::Node) -> u32;

    /// Replace the full `st_mode` of the node.
    fn set_mode(&mut self, node: Self::Node, bits: u32);

    fn set_major_minor(&mut self, device: Self::Node, major: u32, minor: u32);

    fn set_kind(&mut self, device: Self::Node, kind: DeviceKind);

    fn is_directory(&self, node: Self::Node) -> bool;

    fn is_device(&self, node: Self::Node) -> bool;
}

/// Handle into a [`MemTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory(BTreeMap<String, NodeId>),
    Device {
        kind: DeviceKind,
        major: u32,
        minor: u32,
    },
    Symlink(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    user: String,
    group: String,
    mode: u32,
    kind: EntryKind,
}

impl Entry {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Full `st_mode`, type bits included.
    #[must_use]
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Permission bits only.
    #[must_use]
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    #[must_use]
    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// `(kind, major, minor)` for device entries.
    #[must_use]
    pub fn device(&self) -> Option<(DeviceKind, u32, u32)> {
        match self.kind {
            EntryKind::Device { kind, major, minor } => Some((kind, major, minor)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory(_))
    }

    fn children(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.kind {
            EntryKind::Directory(children) => Some(children),
            _ => None,
        }
    }
}

/// Arena-backed device tree.
#[derive(Debug, Clone)]
pub struct MemTree {
    entries: Vec<Entry>,
}

impl Default for MemTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTree {
    /// A tree holding only the root directory.
    #[must_use]
    pub fn new() -> Self {
        let root = Entry {
            name: String::new(),
            user: "root".to_owned(),
            group: "root".to_owned(),
            mode: S_IFDIR | 0o755,
            kind: EntryKind::Directory(BTreeMap::new()),
        };
        Self {
            entries: vec![root],
        }
    }

    #[must_use]
    pub fn entry(&self, node: NodeId) -> &Entry {
        &self.entries[node.0]
    }

    /// Resolve a `/`-separated path from the root. Empty components are
    /// ignored, so `""` and `"/"` name the root.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|c| !c.is_empty())
            .try_fold(self.root(), |dir, name| self.get_child(dir, name))
    }

    /// Lookup returning the entry directly.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.lookup(path).map(|node| self.entry(node))
    }

    /// Create a symbolic link. Replaces nothing: an existing child of the
    /// same name is returned unchanged.
    pub fn make_symlink(&mut self, dir: NodeId, name: &str, target: &str) -> NodeId {
        if let Some(existing) = self.get_child(dir, name) {
            return existing;
        }
        self.insert(
            dir,
            name,
            S_IFLNK | 0o777,
            EntryKind::Symlink(target.to_owned()),
        )
    }

    /// Number of entries, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    fn insert(&mut self, dir: NodeId, name: &str, mode: u32, kind: EntryKind) -> NodeId {
        let id = NodeId(self.entries.len());
        self.entries.push(Entry {
            name: name.to_owned(),
            user: "root".to_owned(),
            group: "root".to_owned(),
            mode,
            kind,
        });
        if let EntryKind::Directory(children) = &mut self.entries[dir.0].kind {
            children.insert(name.to_owned(), id);
        }
        id
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, node: NodeId, depth: usize) -> fmt::Result {
        let Some(children) = self.entry(node).children() else {
            return Ok(());
        };
        for &child in children.values() {
            let e = self.entry(child);
            write!(
                f,
                "{:indent$}{} {:o} {}:{}",
                "",
                e.name,
                e.mode,
                e.user,
                e.group,
                indent = depth * 2
            )?;
            match &e.kind {
                EntryKind::Directory(_) => writeln!(f, "/")?,
                EntryKind::Device { kind, major, minor } => {
                    writeln!(f, " {kind} {major},{minor}")?;
                }
                EntryKind::Symlink(target) => writeln!(f, " -> {target}")?,
            }
            self.render(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl DeviceTree for MemTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn get_child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.entry(dir).children()?.get(name).copied()
    }

    fn make_directory(&mut self, dir: NodeId, name: &str) -> NodeId {
        self.insert(
            dir,
            name,
            S_IFDIR | 0o644,
            EntryKind::Directory(BTreeMap::new()),
        )
    }

    fn make_device(
        &mut self,
        dir: NodeId,
        name: &str,
        kind: DeviceKind,
        major: u32,
        minor: u32,
    ) -> NodeId {
        self.insert(
            dir,
            name,
            kind.type_bits() | 0o600,
            EntryKind::Device { kind, major, minor },
        )
    }

    fn set_owner(&mut self, node: NodeId, user: &str, group: &str) {
        let entry = &mut self.entries[node.0];
        user.clone_into(&mut entry.user);
        group.clone_into(&mut entry.group);
    }

    fn mode(&self, node: NodeId) -> u32 {
        self.entry(node).mode
    }

    fn set_mode(&mut self, node: NodeId, bits: u32) {
        self.entries[node.0].mode = bits;
    }

    fn set_major_minor(&mut self, device: NodeId, major: u32, minor: u32) {
        if let EntryKind::Device {
            major: ma,
            minor: mi,
            ..
        } = &mut self.entries[device.0].kind
        {
            *ma = major;
            *mi = minor;
        }
    }

    fn set_kind(&mut self, device: NodeId, kind: DeviceKind) {
        let entry = &mut self.entries[device.0];
        if let EntryKind::Device { kind: k, .. } = &mut entry.kind {
            *k = kind;
            entry.mode = (entry.mode & !S_IFMT) | kind.type_bits();
        }
    }

    fn is_directory(&self, node: NodeId) -> bool {
        self.entry(node).is_directory()
    }

    fn is_device(&self, node: NodeId) -> bool {
        self.entry(node).device().is_some()
    }
}

impl fmt::Display for MemTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "/")?;
        self.render(f, self.root(), 1)
    }
}
