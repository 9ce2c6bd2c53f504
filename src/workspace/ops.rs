//! Tree mutation operations
//!
//! Every operation takes a `MutationSource`. Local intents come back with the
//! protocol event to announce; remote events never do, which is what keeps a
//! peer's change from echoing back onto the transport.

use super::state::Workspace;
use crate::error::WorkspaceError;
use crate::sync::protocol::{
    DirectoryCreated, DirectoryDeleted, DirectoryRenamed, DirectoryUpdated, FileCreated,
    FileDeleted, FileRenamed, FileUpdated, ProtocolEvent,
};
use crate::tree::naming::disambiguate;
use crate::tree::{Node, NodeKind};
use crate::types::NodeId;
use std::collections::HashSet;
use tracing::debug;

/// Where a mutation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationSource {
    /// A user action on this client; the change is announced to the room
    LocalIntent,
    /// An inbound event from a peer or the backend; applied silently
    RemoteEvent,
}

impl MutationSource {
    pub fn announces(self) -> bool {
        matches!(self, MutationSource::LocalIntent)
    }

    fn announce<F>(self, event: F) -> Option<ProtocolEvent>
    where
        F: FnOnce() -> ProtocolEvent,
    {
        if self.announces() {
            Some(event())
        } else {
            None
        }
    }
}

/// What to create: a bare name (fresh id, disambiguated) or a complete node
#[derive(Debug, Clone)]
pub enum NewEntry {
    Name(String),
    Node(Node),
}

impl From<&str> for NewEntry {
    fn from(name: &str) -> Self {
        NewEntry::Name(name.to_string())
    }
}

impl From<String> for NewEntry {
    fn from(name: String) -> Self {
        NewEntry::Name(name)
    }
}

impl From<Node> for NewEntry {
    fn from(node: Node) -> Self {
        NewEntry::Node(node)
    }
}

/// Result of an applied mutation plus the event to announce, if any
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub value: T,
    pub announcement: Option<ProtocolEvent>,
}

impl<T> Applied<T> {
    fn silent(value: T) -> Self {
        Self {
            value,
            announcement: None,
        }
    }
}

impl Workspace {
    /// Create a file under `parent`.
    ///
    /// A bare name is disambiguated against sibling files (`app.ts`,
    /// `app(1).ts`, ...). The parent is expanded and the new file becomes the
    /// active open file.
    pub fn create_file(
        &mut self,
        parent: &NodeId,
        entry: impl Into<NewEntry>,
        source: MutationSource,
    ) -> Result<Applied<NodeId>, WorkspaceError> {
        let parent_record = self
            .tree
            .require_directory(parent)
            .map_err(|_| WorkspaceError::ParentNotFound(parent.clone()))?;

        let node = match entry.into() {
            NewEntry::Name(name) => {
                let siblings: HashSet<&str> = parent_record
                    .children
                    .iter()
                    .filter_map(|child| self.tree.get(child))
                    .filter(|child| child.is_file())
                    .map(|child| child.name.as_str())
                    .collect();
                let name = disambiguate(&name, |candidate| siblings.contains(candidate));
                Node::file(name, "")
            }
            NewEntry::Node(node) if node.kind == NodeKind::File => node,
            NewEntry::Node(node) => {
                return Err(WorkspaceError::InvalidNode(format!(
                    "'{}' is not a file",
                    node.name
                )))
            }
        };

        let id = self.tree.attach(parent, node.clone())?;
        self.tree.set_open(parent, true)?;
        if !self.is_open(&id) {
            self.open_files.push(node.clone());
        }
        self.active_file = Some(id.clone());
        debug!(file_id = %id, parent_id = %parent, name = %node.name, ?source, "Created file");

        Ok(Applied {
            value: id,
            announcement: source.announce(|| {
                ProtocolEvent::FileCreated(FileCreated {
                    parent_dir_id: parent.clone(),
                    new_file: node,
                })
            }),
        })
    }

    /// Create a directory under `parent`.
    ///
    /// A bare name creates an empty, closed directory and fails with
    /// `NameConflict` if a sibling directory already uses it. A complete node
    /// is attached as given.
    pub fn create_directory(
        &mut self,
        parent: &NodeId,
        entry: impl Into<NewEntry>,
        source: MutationSource,
    ) -> Result<Applied<NodeId>, WorkspaceError> {
        self.tree
            .require_directory(parent)
            .map_err(|_| WorkspaceError::ParentNotFound(parent.clone()))?;

        let node = match entry.into() {
            NewEntry::Name(name) => {
                if self.sibling_directory_named(parent, &name, None) {
                    return Err(WorkspaceError::NameConflict { name });
                }
                Node::directory(name, Vec::new())
            }
            NewEntry::Node(node) if node.kind == NodeKind::Directory => node,
            NewEntry::Node(node) => {
                return Err(WorkspaceError::InvalidNode(format!(
                    "'{}' is not a directory",
                    node.name
                )))
            }
        };

        let id = self.tree.attach(parent, node.clone())?;
        debug!(dir_id = %id, parent_id = %parent, name = %node.name, ?source, "Created directory");

        Ok(Applied {
            value: id,
            announcement: source.announce(|| {
                ProtocolEvent::DirectoryCreated(DirectoryCreated {
                    parent_dir_id: parent.clone(),
                    new_directory: node,
                })
            }),
        })
    }

    /// Rename a file. No collision check is made.
    pub fn rename_file(
        &mut self,
        id: &NodeId,
        new_name: &str,
        source: MutationSource,
    ) -> Result<Applied<bool>, WorkspaceError> {
        self.tree.require_file(id)?;
        self.tree.rename(id, new_name)?;
        self.refresh_buffer(id, |buffer| buffer.name = new_name.to_string());
        debug!(file_id = %id, new_name, ?source, "Renamed file");

        Ok(Applied {
            value: true,
            announcement: source.announce(|| {
                ProtocolEvent::FileRenamed(FileRenamed {
                    file_id: id.clone(),
                    new_name: new_name.to_string(),
                })
            }),
        })
    }

    /// Rename a directory.
    ///
    /// Returns `false` (and announces nothing) when a sibling directory
    /// already has `new_name`.
    pub fn rename_directory(
        &mut self,
        id: &NodeId,
        new_name: &str,
        source: MutationSource,
    ) -> Result<Applied<bool>, WorkspaceError> {
        let record = self.tree.require_directory(id)?;
        let Some(parent) = record.parent.clone() else {
            return Err(WorkspaceError::RootImmutable("renamed"));
        };
        if self.sibling_directory_named(&parent, new_name, Some(id)) {
            debug!(dir_id = %id, new_name, "Directory rename rejected, name taken");
            return Ok(Applied::silent(false));
        }
        self.tree.rename(id, new_name)?;
        debug!(dir_id = %id, new_name, ?source, "Renamed directory");

        Ok(Applied {
            value: true,
            announcement: source.announce(|| {
                ProtocolEvent::DirectoryRenamed(DirectoryRenamed {
                    dir_id: id.clone(),
                    new_dir_name: new_name.to_string(),
                })
            }),
        })
    }

    /// Delete a file and close it if open
    pub fn delete_file(
        &mut self,
        id: &NodeId,
        source: MutationSource,
    ) -> Result<Applied<()>, WorkspaceError> {
        self.tree.require_file(id)?;
        let removed: HashSet<NodeId> = self.tree.detach(id)?.into_iter().collect();
        self.evict(&removed);
        debug!(file_id = %id, ?source, "Deleted file");

        Ok(Applied {
            value: (),
            announcement: source.announce(|| {
                ProtocolEvent::FileDeleted(FileDeleted { file_id: id.clone() })
            }),
        })
    }

    /// Delete a directory with its whole subtree, closing every open file
    /// inside it.
    pub fn delete_directory(
        &mut self,
        id: &NodeId,
        source: MutationSource,
    ) -> Result<Applied<()>, WorkspaceError> {
        self.tree.require_directory(id)?;
        let removed: HashSet<NodeId> = self.tree.detach(id)?.into_iter().collect();
        self.evict(&removed);
        debug!(dir_id = %id, removed = removed.len(), ?source, "Deleted directory");

        Ok(Applied {
            value: (),
            announcement: source.announce(|| {
                ProtocolEvent::DirectoryDeleted(DirectoryDeleted { dir_id: id.clone() })
            }),
        })
    }

    /// Replace the children of one directory wholesale.
    ///
    /// Always closes every open file and clears the active file for the whole
    /// client, whichever directory was touched.
    pub fn update_directory(
        &mut self,
        id: &NodeId,
        children: Vec<Node>,
        source: MutationSource,
    ) -> Result<Applied<()>, WorkspaceError> {
        let announced = source.announces().then(|| children.clone());
        let removed = self.tree.replace_children(id, children)?;
        self.clear_open_files();
        debug!(dir_id = %id, removed = removed.len(), ?source, "Replaced directory children");

        Ok(Applied {
            value: (),
            announcement: announced.map(|children| {
                ProtocolEvent::DirectoryUpdated(DirectoryUpdated {
                    dir_id: id.clone(),
                    children,
                })
            }),
        })
    }

    /// Replace a file's content, keeping its open buffer in step
    pub fn update_file_content(
        &mut self,
        id: &NodeId,
        content: &str,
        source: MutationSource,
    ) -> Result<Applied<()>, WorkspaceError> {
        self.tree.set_content(id, content)?;
        self.refresh_buffer(id, |buffer| buffer.content = Some(content.to_string()));
        debug!(file_id = %id, bytes = content.len(), ?source, "Updated file content");

        Ok(Applied {
            value: (),
            announcement: source.announce(|| {
                ProtocolEvent::FileUpdated(FileUpdated {
                    file_id: id.clone(),
                    new_content: content.to_string(),
                })
            }),
        })
    }

    fn sibling_directory_named(&self, parent: &NodeId, name: &str, except: Option<&NodeId>) -> bool {
        self.tree
            .children(parent)
            .map(|children| {
                children
                    .iter()
                    .any(|c| c.is_directory() && c.name == name && Some(&c.id) != except)
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MutationSource::{LocalIntent, RemoteEvent};

    #[test]
    fn duplicate_file_names_are_numbered() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        let src = ws.create_directory(&root, "src", LocalIntent).unwrap().value;
        let first = ws.create_file(&src, "app.ts", LocalIntent).unwrap().value;
        let second = ws.create_file(&src, "app.ts", LocalIntent).unwrap().value;
        assert_eq!(ws.tree().get(&first).unwrap().name, "app.ts");
        assert_eq!(ws.tree().get(&second).unwrap().name, "app(1).ts");
        assert_eq!(ws.tree().children(&src).unwrap().len(), 2);
    }

    #[test]
    fn created_file_is_active_and_parent_expanded() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        let src = ws.create_directory(&root, "src", LocalIntent).unwrap().value;
        assert!(!ws.tree().get(&src).unwrap().is_open);
        let file = ws.create_file(&src, "a.ts", LocalIntent).unwrap().value;
        assert_eq!(ws.active_file_id(), Some(&file));
        assert!(ws.is_open(&file));
        assert!(ws.tree().get(&src).unwrap().is_open);
    }

    #[test]
    fn create_file_in_missing_parent_fails() {
        let mut ws = Workspace::new("root");
        let ghost = NodeId::from("ghost");
        assert_eq!(
            ws.create_file(&ghost, "a.ts", LocalIntent).unwrap_err(),
            WorkspaceError::ParentNotFound(ghost)
        );
    }

    #[test]
    fn local_intent_announces_and_remote_event_does_not() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        let local = ws.create_file(&root, "a.ts", LocalIntent).unwrap();
        assert!(matches!(local.announcement, Some(ProtocolEvent::FileCreated(_))));
        let remote = ws
            .create_file(&root, Node::file("b.ts", ""), RemoteEvent)
            .unwrap();
        assert!(remote.announcement.is_none());
    }

    #[test]
    fn directory_name_conflicts_are_reported() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        ws.create_directory(&root, "src", LocalIntent).unwrap();
        let lib = ws.create_directory(&root, "lib", LocalIntent).unwrap().value;
        assert_eq!(
            ws.create_directory(&root, "src", LocalIntent).unwrap_err(),
            WorkspaceError::NameConflict {
                name: "src".to_string()
            }
        );
        let rejected = ws.rename_directory(&lib, "src", LocalIntent).unwrap();
        assert!(!rejected.value);
        assert!(rejected.announcement.is_none());
        assert_eq!(ws.tree().get(&lib).unwrap().name, "lib");
    }

    #[test]
    fn renaming_directory_to_its_own_name_succeeds() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        let src = ws.create_directory(&root, "src", LocalIntent).unwrap().value;
        assert!(ws.rename_directory(&src, "src", LocalIntent).unwrap().value);
    }

    #[test]
    fn root_cannot_be_renamed_or_deleted() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        assert!(matches!(
            ws.rename_directory(&root, "x", LocalIntent),
            Err(WorkspaceError::RootImmutable(_))
        ));
        assert!(matches!(
            ws.delete_directory(&root, LocalIntent),
            Err(WorkspaceError::RootImmutable(_))
        ));
    }

    #[test]
    fn rename_file_updates_open_buffer() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        let file = ws.create_file(&root, "a.ts", LocalIntent).unwrap().value;
        ws.rename_file(&file, "b.ts", RemoteEvent).unwrap();
        assert_eq!(ws.active_file().unwrap().name, "b.ts");
    }

    #[test]
    fn deleting_active_file_clears_it() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        let file = ws.create_file(&root, "a.ts", LocalIntent).unwrap().value;
        ws.delete_file(&file, LocalIntent).unwrap();
        assert!(ws.active_file_id().is_none());
        assert!(!ws.is_open(&file));
        assert!(matches!(
            ws.delete_file(&file, LocalIntent),
            Err(WorkspaceError::NotFound(_))
        ));
    }

    #[test]
    fn deleting_directory_closes_files_inside() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        let docs = ws.create_directory(&root, "docs", LocalIntent).unwrap().value;
        let outside = ws.create_file(&root, "keep.md", LocalIntent).unwrap().value;
        let inside = ws.create_file(&docs, "guide.md", LocalIntent).unwrap().value;
        ws.delete_directory(&docs, RemoteEvent).unwrap();
        assert!(!ws.is_open(&inside));
        assert!(ws.is_open(&outside));
        assert!(ws.active_file_id().is_none());
        assert_eq!(ws.tree().len(), 2);
    }

    #[test]
    fn update_directory_clears_all_open_files() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        let a = ws.create_directory(&root, "a", LocalIntent).unwrap().value;
        let b = ws.create_directory(&root, "b", LocalIntent).unwrap().value;
        ws.create_file(&a, "x.ts", LocalIntent).unwrap();
        let applied = ws
            .update_directory(&b, vec![Node::file("y.ts", "")], LocalIntent)
            .unwrap();
        assert!(matches!(
            applied.announcement,
            Some(ProtocolEvent::DirectoryUpdated(_))
        ));
        assert!(ws.open_files().is_empty());
        assert!(ws.active_file_id().is_none());
        assert_eq!(ws.tree().children(&b).unwrap().len(), 1);
    }

    #[test]
    fn update_file_content_refreshes_buffer() {
        let mut ws = Workspace::new("root");
        let root = ws.root_id().clone();
        let file = ws.create_file(&root, "a.ts", LocalIntent).unwrap().value;
        ws.update_file_content(&file, "let x = 1;", RemoteEvent)
            .unwrap();
        assert_eq!(
            ws.active_file().unwrap().content.as_deref(),
            Some("let x = 1;")
        );
        assert_eq!(
            ws.tree().get(&file).unwrap().content.as_deref(),
            Some("let x = 1;")
        );
    }
}
