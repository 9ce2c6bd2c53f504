//! Property tests over random mutation sequences

use coshell::sync::notice::notice_channel;
use coshell::sync::{RecordingTransport, SyncBroadcaster};
use coshell::tree::{Node, TreeModel};
use coshell::types::{NodeId, SocketId};
use coshell::workspace::{MutationSource, Workspace};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    CreateFile { dir: usize, name: String },
    CreateDir { dir: usize, name: String },
    RenameFile { file: usize, name: String },
    RenameDir { dir: usize, name: String },
    DeleteFile { file: usize },
    DeleteDir { dir: usize },
    Edit { file: usize, content: String },
    Open { file: usize },
    UpdateDir { dir: usize, names: Vec<String> },
}

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["app.ts", "index.js", "README", "lib", "src", "a.b.c"])
        .prop_map(str::to_string)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<usize>(), name()).prop_map(|(dir, name)| Op::CreateFile { dir, name }),
        3 => (any::<usize>(), name()).prop_map(|(dir, name)| Op::CreateDir { dir, name }),
        1 => (any::<usize>(), name()).prop_map(|(file, name)| Op::RenameFile { file, name }),
        1 => (any::<usize>(), name()).prop_map(|(dir, name)| Op::RenameDir { dir, name }),
        1 => any::<usize>().prop_map(|file| Op::DeleteFile { file }),
        1 => any::<usize>().prop_map(|dir| Op::DeleteDir { dir }),
        1 => (any::<usize>(), "[a-z ]{0,12}").prop_map(|(file, content)| Op::Edit { file, content }),
        2 => any::<usize>().prop_map(|file| Op::Open { file }),
        1 => (any::<usize>(), prop::collection::vec(name(), 0..4))
            .prop_map(|(dir, names)| Op::UpdateDir { dir, names }),
    ]
}

fn pick(ids: &[NodeId], index: usize) -> Option<NodeId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()].clone())
    }
}

fn ids(tree: &TreeModel, dirs: bool) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = tree
        .iter()
        .filter(|record| record.is_directory() == dirs)
        .map(|record| record.id.clone())
        .collect();
    ids.sort();
    ids
}

/// Apply one op as a local intent through the broadcaster; errors are expected
/// for ops that target the root or a vanished node.
fn apply(sync: &SyncBroadcaster, op: &Op) {
    let (dirs, files) = {
        let ws = sync.workspace().read();
        (ids(ws.tree(), true), ids(ws.tree(), false))
    };
    let _ = match op {
        Op::CreateFile { dir, name } => pick(&dirs, *dir)
            .map(|d| sync.create_file(&d, name.as_str()).map(|_| ())),
        Op::CreateDir { dir, name } => pick(&dirs, *dir)
            .map(|d| sync.create_directory(&d, name.as_str()).map(|_| ())),
        Op::RenameFile { file, name } => {
            pick(&files, *file).map(|f| sync.rename_file(&f, name).map(|_| ()))
        }
        Op::RenameDir { dir, name } => {
            pick(&dirs, *dir).map(|d| sync.rename_directory(&d, name).map(|_| ()))
        }
        Op::DeleteFile { file } => pick(&files, *file).map(|f| sync.delete_file(&f)),
        Op::DeleteDir { dir } => pick(&dirs, *dir).map(|d| sync.delete_directory(&d)),
        Op::Edit { file, content } => {
            pick(&files, *file).map(|f| sync.update_file_content(&f, content))
        }
        Op::Open { file } => pick(&files, *file).map(|f| sync.workspace().write().open_file(&f)),
        Op::UpdateDir { dir, names } => pick(&dirs, *dir).map(|d| {
            let children = names.iter().map(|n| Node::file(n.clone(), "")).collect();
            sync.update_directory(&d, children)
        }),
    };
}

fn broadcaster(workspace: Workspace, transport: Arc<RecordingTransport>, socket: &str) -> SyncBroadcaster {
    SyncBroadcaster::new(
        workspace.into_shared(),
        transport,
        SocketId::new(socket),
        notice_channel(),
    )
}

proptest! {
    #[test]
    fn created_siblings_have_unique_names(ops in prop::collection::vec(op(), 0..40)) {
        let sync = broadcaster(Workspace::new("root"), Arc::new(RecordingTransport::new()), "a");
        for op in ops.iter().filter(|op| matches!(op, Op::CreateFile { .. } | Op::CreateDir { .. })) {
            apply(&sync, op);
        }
        let ws = sync.workspace().read();
        let tree = ws.tree();
        for dir in ids(tree, true) {
            let mut files = HashSet::new();
            let mut subdirs = HashSet::new();
            for child in tree.children(&dir).unwrap() {
                let seen = if child.is_directory() { &mut subdirs } else { &mut files };
                prop_assert!(seen.insert(child.name.clone()), "duplicate sibling {}", child.name);
            }
        }
    }

    #[test]
    fn tree_stays_well_formed(ops in prop::collection::vec(op(), 0..60)) {
        let sync = broadcaster(Workspace::new("root"), Arc::new(RecordingTransport::new()), "a");
        for op in &ops {
            apply(&sync, op);
        }
        let ws = sync.workspace().read();
        prop_assert!(ws.tree().check_integrity().is_ok());
        for open in ws.open_files() {
            prop_assert!(ws.tree().require_file(&open.id).is_ok());
        }
        if let Some(active) = ws.active_file_id() {
            prop_assert!(ws.is_open(active));
        }
    }

    #[test]
    fn snapshot_round_trip_is_lossless(ops in prop::collection::vec(op(), 0..40)) {
        let sync = broadcaster(Workspace::new("root"), Arc::new(RecordingTransport::new()), "a");
        for op in &ops {
            apply(&sync, op);
        }
        let before = sync.workspace().read().tree().snapshot();
        let json = serde_json::to_string(&before).unwrap();
        let decoded: Node = serde_json::from_str(&json).unwrap();
        let rebuilt = TreeModel::from_node(&decoded).unwrap();
        prop_assert_eq!(rebuilt.len(), before.count());
        prop_assert_eq!(rebuilt.snapshot(), before);
    }

    #[test]
    fn replayed_announcements_converge(ops in prop::collection::vec(op(), 0..40)) {
        let seed = Workspace::new("root");
        let transport = Arc::new(RecordingTransport::new());
        let local = broadcaster(seed.clone(), transport.clone(), "a");
        let peer = broadcaster(seed, Arc::new(RecordingTransport::new()), "b");

        for op in &ops {
            apply(&local, op);
            for envelope in transport.take() {
                let _ = peer.apply_remote(&envelope.event);
            }
        }
        prop_assert_eq!(
            peer.workspace().read().tree().snapshot(),
            local.workspace().read().tree().snapshot()
        );
    }
}

#[test]
fn root_is_immutable() {
    let mut ws = Workspace::new("root");
    let root = ws.root_id().clone();
    assert!(ws.delete_directory(&root, MutationSource::LocalIntent).is_err());
    assert!(ws
        .rename_directory(&root, "other", MutationSource::LocalIntent)
        .is_err());
    assert!(ws.tree().contains(&root));
}
