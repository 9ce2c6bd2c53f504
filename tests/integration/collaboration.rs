use super::support::{host, joiner, settle};
use coshell::sync::protocol::StructureUpdate;
use coshell::sync::{LocalRoom, Notice, ProtocolEvent, SyncState};
use coshell::tree::Node;
use coshell::workspace::Workspace;
use std::collections::BTreeMap;

fn project() -> Workspace {
    let root = Node::directory(
        "root",
        vec![
            Node::directory(
                "docs",
                vec![Node::file("guide.md", "# Guide"), Node::file("faq.md", "")],
            ),
            Node::directory("src", vec![Node::file("app.ts", "export {}")]),
            Node::file("README.md", "hello"),
        ],
    );
    Workspace::from_snapshot(&root, &[], None).unwrap()
}

#[test]
fn late_joiner_receives_identical_tree() {
    let room = LocalRoom::new();
    let mut a = host(&room, "a", project());
    let mut b = joiner(&room, "b", "bob");
    let mut a_notices = a.client.subscribe_notices();

    settle(&mut [&mut a, &mut b]);

    assert_eq!(b.client.session().state(), SyncState::Synced);
    assert_eq!(
        a.client.workspace().read().tree().snapshot(),
        b.client.workspace().read().tree().snapshot()
    );
    assert_eq!(
        a_notices.try_recv().unwrap(),
        Notice::UserJoined {
            username: "bob".to_string()
        }
    );
}

#[test]
fn snapshot_carries_open_and_active_files() {
    let room = LocalRoom::new();
    let workspace = project();
    let readme = workspace
        .tree()
        .child_named(workspace.root_id(), "README.md")
        .unwrap()
        .id
        .clone();
    let mut a = host(&room, "a", workspace);
    a.client.workspace().write().open_file(&readme).unwrap();

    let mut b = joiner(&room, "b", "bob");
    settle(&mut [&mut a, &mut b]);

    let b_ws = b.client.workspace().read();
    assert_eq!(b_ws.active_file_id(), Some(&readme));
    assert_eq!(b_ws.open_files().len(), 1);
}

#[test]
fn deleting_directory_evicts_open_file_on_peer() {
    let room = LocalRoom::new();
    let mut a = host(&room, "a", project());
    let mut b = joiner(&room, "b", "bob");
    settle(&mut [&mut a, &mut b]);

    let (docs, guide) = {
        let ws = b.client.workspace().read();
        let docs = ws.tree().child_named(ws.root_id(), "docs").unwrap().id.clone();
        let guide = ws.tree().child_named(&docs, "guide.md").unwrap().id.clone();
        (docs, guide)
    };
    b.client.workspace().write().open_file(&guide).unwrap();
    assert_eq!(b.client.workspace().read().active_file_id(), Some(&guide));

    a.client.sync().delete_directory(&docs).unwrap();
    settle(&mut [&mut a, &mut b]);

    let b_ws = b.client.workspace().read();
    assert!(!b_ws.tree().contains(&docs));
    assert!(b_ws.open_files().is_empty());
    assert_eq!(b_ws.active_file_id(), None);
}

#[test]
fn duplicate_file_names_are_disambiguated_everywhere() {
    let room = LocalRoom::new();
    let mut a = host(&room, "a", project());
    let mut b = joiner(&room, "b", "bob");
    settle(&mut [&mut a, &mut b]);

    let src = {
        let ws = a.client.workspace().read();
        ws.tree().child_named(ws.root_id(), "src").unwrap().id.clone()
    };
    let second = a.client.sync().create_file(&src, "app.ts").unwrap();
    settle(&mut [&mut a, &mut b]);

    assert_eq!(
        b.client.workspace().read().tree().require(&second).unwrap().name,
        "app(1).ts"
    );
}

#[test]
fn remote_mutations_are_not_echoed() {
    let room = LocalRoom::new();
    let mut a = host(&room, "a", project());
    let mut b = joiner(&room, "b", "bob");
    settle(&mut [&mut a, &mut b]);

    let root = a.client.workspace().read().root_id().clone();
    a.client.sync().create_directory(&root, "assets").unwrap();
    assert_eq!(b.pump(), 1);
    // b applied silently, so nothing comes back to a
    assert_eq!(a.pump(), 0);
}

#[test]
fn rename_and_edit_propagate() {
    let room = LocalRoom::new();
    let mut a = host(&room, "a", project());
    let mut b = joiner(&room, "b", "bob");
    settle(&mut [&mut a, &mut b]);

    let readme = {
        let ws = a.client.workspace().read();
        ws.tree().child_named(ws.root_id(), "README.md").unwrap().id.clone()
    };
    a.client.sync().rename_file(&readme, "INTRO.md").unwrap();
    a.client.sync().update_file_content(&readme, "welcome").unwrap();
    settle(&mut [&mut a, &mut b]);

    let b_ws = b.client.workspace().read();
    let record = b_ws.tree().require(&readme).unwrap();
    assert_eq!(record.name, "INTRO.md");
    assert_eq!(record.content.as_deref(), Some("welcome"));
}

#[test]
fn stray_snapshot_after_sync_is_ignored() {
    let room = LocalRoom::new();
    let mut a = host(&room, "a", project());
    let mut b = joiner(&room, "b", "bob");
    settle(&mut [&mut a, &mut b]);

    let before = b.client.workspace().read().tree().snapshot();
    let other = Workspace::new("other").snapshot_for(b.client.socket_id().clone());
    b.client
        .handle_event(ProtocolEvent::SyncFileStructure(other))
        .unwrap();
    assert_eq!(b.client.workspace().read().tree().snapshot(), before);
}

#[test]
fn backend_scaffold_reaches_every_member() {
    let room = LocalRoom::new();
    let mut a = host(&room, "a", project());
    let mut b = joiner(&room, "b", "bob");
    settle(&mut [&mut a, &mut b]);

    let mut templates = BTreeMap::new();
    templates.insert(
        "package.json".to_string(),
        serde_json::json!({ "name": "web" }),
    );
    templates.insert(
        "src/index.ts".to_string(),
        serde_json::Value::String("console.log(1)".to_string()),
    );
    room.broadcast_from_backend(ProtocolEvent::StructureUpdate(
        StructureUpdate::ProjectCreated {
            path: "web".to_string(),
            parent_path: None,
            root_id: "web-root".into(),
            templates,
        },
    ))
    .unwrap();
    settle(&mut [&mut a, &mut b]);

    for participant in [&a, &b] {
        let ws = participant.client.workspace().read();
        let web = ws.tree().require(&"web-root".into()).unwrap();
        assert_eq!(web.name, "web");
        assert!(ws.tree().child_named(&web.id, "package.json").is_some());
    }
    assert_eq!(
        a.client.workspace().read().tree().snapshot(),
        b.client.workspace().read().tree().snapshot()
    );

    let index = coshell::types::NodeId::from("web-root/src/index.ts");
    let mut b_notices = b.client.subscribe_notices();
    a.client
        .sync()
        .update_file_content(&index, "console.log(2)")
        .unwrap();
    settle(&mut [&mut a, &mut b]);

    assert!(b_notices.try_recv().is_err());
    assert_eq!(
        b.client
            .workspace()
            .read()
            .tree()
            .require(&index)
            .unwrap()
            .content
            .as_deref(),
        Some("console.log(2)")
    );
}

#[test]
fn listing_additions_share_ids_across_members() {
    let room = LocalRoom::new();
    let mut a = host(&room, "a", project());
    let mut b = joiner(&room, "b", "bob");
    settle(&mut [&mut a, &mut b]);

    room.broadcast_from_backend(ProtocolEvent::StructureUpdate(
        StructureUpdate::DirectoryUpdated {
            path: "/src".to_string(),
            children: vec!["app.ts".to_string(), "main.ts".to_string()],
        },
    ))
    .unwrap();
    settle(&mut [&mut a, &mut b]);

    let main = {
        let ws = a.client.workspace().read();
        let src = ws.tree().child_named(ws.root_id(), "src").unwrap().id.clone();
        ws.tree().child_named(&src, "main.ts").unwrap().id.clone()
    };
    b.client.sync().rename_file(&main, "index.ts").unwrap();
    settle(&mut [&mut a, &mut b]);

    assert_eq!(
        a.client.workspace().read().tree().require(&main).unwrap().name,
        "index.ts"
    );
    assert_eq!(
        a.client.workspace().read().tree().snapshot(),
        b.client.workspace().read().tree().snapshot()
    );
}

#[test]
fn joiners_arriving_together_both_get_the_host_tree() {
    let room = LocalRoom::new();
    let mut a = host(&room, "a", project());
    let mut b = joiner(&room, "b", "bob");
    let mut c = joiner(&room, "c", "carol");

    // b sees carol's announcement while still waiting for its own snapshot
    b.pump();
    c.pump();
    settle(&mut [&mut a, &mut b, &mut c]);

    let expected = a.client.workspace().read().tree().snapshot();
    for participant in [&b, &c] {
        assert_eq!(participant.client.session().state(), SyncState::Synced);
        assert_eq!(participant.client.workspace().read().tree().snapshot(), expected);
    }
}

#[test]
fn missing_node_becomes_problem_notice() {
    let room = LocalRoom::new();
    let a = host(&room, "a", project());
    let mut notices = a.client.subscribe_notices();
    a.client
        .handle_json(
            r#"{"from":"z","to":{"kind":"room"},"event":{"event":"file-deleted","payload":{"fileId":"nope"}}}"#,
        )
        .unwrap();
    assert!(matches!(notices.try_recv().unwrap(), Notice::Problem { .. }));
}
