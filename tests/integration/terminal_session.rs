use super::support::host;
use coshell::error::TerminalError;
use coshell::sync::protocol::{Signal, TerminalOutput, TerminalReady};
use coshell::sync::{BackendEvent, LocalRoom, ProtocolEvent, Recipient};
use coshell::terminal::{Submission, TerminalRuntime};
use coshell::tree::Node;
use coshell::workspace::Workspace;
use std::time::Duration;

fn project() -> Workspace {
    let root = Node::directory(
        "root",
        vec![
            Node::directory(
                "src",
                vec![Node::directory("components", vec![]), Node::file("main.ts", "")],
            ),
            Node::file("package.json", "{}"),
        ],
    );
    Workspace::from_snapshot(&root, &[], None).unwrap()
}

#[test]
fn remote_command_round_trip_through_relay() {
    let room = LocalRoom::new();
    let mut backend = room.attach_backend();
    let mut a = host(&room, "a", project());
    let terminal = a.client.terminal().clone();

    assert_eq!(terminal.lock().submit("cd src").unwrap(), Submission::Completed);
    assert_eq!(terminal.lock().submit("npm run build").unwrap(), Submission::Forwarded);
    assert!(!terminal.lock().is_idle());

    let sent = backend.try_recv().unwrap();
    assert_eq!(sent.to, Recipient::Backend);
    match sent.event {
        ProtocolEvent::TerminalCommand(cmd) => {
            assert_eq!(cmd.command, "npm run build");
            assert_eq!(cmd.cwd, "/src");
        }
        other => panic!("unexpected event {:?}", other),
    }

    let socket = a.client.socket_id().clone();
    room.reply_from_backend(
        &socket,
        ProtocolEvent::TerminalOutput(TerminalOutput {
            data: "built in 2s\r\n".to_string(),
        }),
    )
    .unwrap();
    room.reply_from_backend(&socket, ProtocolEvent::TerminalReady(TerminalReady {}))
        .unwrap();
    a.pump();

    let mut dispatcher = terminal.lock();
    assert!(dispatcher.is_idle());
    assert!(dispatcher.sink_mut().take().contains("built in 2s"));
}

#[test]
fn lines_queue_behind_command_in_flight() {
    let room = LocalRoom::new();
    let mut backend = room.attach_backend();
    let mut a = host(&room, "a", project());
    let terminal = a.client.terminal().clone();

    terminal.lock().submit("npm install").unwrap();
    assert_eq!(
        terminal.lock().submit("git status").unwrap(),
        Submission::Queued { position: 1 }
    );
    assert_eq!(terminal.lock().pending(), 1);

    room.reply_from_backend(a.client.socket_id(), ProtocolEvent::TerminalReady(TerminalReady {}))
        .unwrap();
    a.pump();

    let commands: Vec<String> = std::iter::from_fn(|| backend.try_recv().ok())
        .filter_map(|envelope| match envelope.event {
            ProtocolEvent::TerminalCommand(cmd) => Some(cmd.command),
            _ => None,
        })
        .collect();
    assert_eq!(commands, vec!["npm install", "git status"]);
    assert_eq!(terminal.lock().pending(), 0);
}

#[test]
fn interrupt_is_forwarded_and_clears_queue() {
    let room = LocalRoom::new();
    let mut backend = room.attach_backend();
    let a = host(&room, "a", project());
    let terminal = a.client.terminal().clone();

    terminal.lock().submit("sleep 100").unwrap();
    terminal.lock().submit("ls").unwrap();
    assert!(terminal.lock().interrupt());
    assert!(terminal.lock().is_idle());
    assert_eq!(terminal.lock().pending(), 0);

    let signal = std::iter::from_fn(|| backend.try_recv().ok())
        .find_map(|envelope| match envelope.event {
            ProtocolEvent::TerminalSignal(signal) => Some(signal),
            _ => None,
        })
        .unwrap();
    assert_eq!(signal.signal, Signal::Interrupt);
}

#[test]
fn remote_command_without_backend_fails_visibly() {
    let room = LocalRoom::new();
    let a = host(&room, "a", project());
    let terminal = a.client.terminal().clone();
    let mut dispatcher = terminal.lock();
    // The room transport itself is connected; the relay has no backend to take the command.
    let result = dispatcher.submit("ls -la");
    assert!(matches!(result, Err(TerminalError::TransportUnavailable)));
    assert!(dispatcher.is_idle());
    assert!(dispatcher.sink_mut().take().contains("not connected"));
}

#[test]
fn location_survives_peer_rename_and_falls_back_on_delete() {
    let room = LocalRoom::new();
    let a = host(&room, "a", project());
    let terminal = a.client.terminal().clone();
    terminal.lock().submit("cd src/components").unwrap();
    assert_eq!(terminal.lock().prompt(), "$ src/components > ");

    let (src, components) = {
        let ws = a.client.workspace().read();
        let src = ws.tree().child_named(ws.root_id(), "src").unwrap().id.clone();
        let components = ws.tree().child_named(&src, "components").unwrap().id.clone();
        (src, components)
    };

    a.client
        .handle_event(ProtocolEvent::DirectoryRenamed(
            coshell::sync::protocol::DirectoryRenamed {
                dir_id: src.clone(),
                new_dir_name: "app".to_string(),
            },
        ))
        .unwrap();
    assert_eq!(terminal.lock().prompt(), "$ app/components > ");

    a.client
        .handle_event(ProtocolEvent::DirectoryDeleted(
            coshell::sync::protocol::DirectoryDeleted {
                dir_id: components,
            },
        ))
        .unwrap();
    assert_eq!(terminal.lock().prompt(), "$ > ");
}

#[test]
fn cd_onto_file_then_up() {
    let room = LocalRoom::new();
    let a = host(&room, "a", project());
    let terminal = a.client.terminal().clone();
    let mut dispatcher = terminal.lock();
    dispatcher.submit("cd src/main.ts").unwrap();
    assert!(dispatcher.location().file_id.is_some());
    assert_eq!(dispatcher.location().path, "/src/main.ts");
    dispatcher.submit("cd ..").unwrap();
    assert_eq!(dispatcher.location().path, "/src");
    assert!(dispatcher.location().file_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn runtime_times_out_silent_backend_and_drains_queue() {
    let room = LocalRoom::new();
    let mut backend = room.attach_backend();
    let a = host(&room, "a", project());
    let runtime = TerminalRuntime::new(a.client.terminal().clone(), Duration::from_millis(250));
    let (handle, task) = runtime.spawn();

    handle.submit("npm start").unwrap();
    handle.submit("pwd").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!a.client.terminal().lock().is_idle());

    tokio::time::sleep(Duration::from_secs(120)).await;
    {
        let mut dispatcher = a.client.terminal().lock();
        assert!(dispatcher.is_idle());
        let output = dispatcher.sink_mut().take();
        assert!(output.contains("timed out"));
        assert!(output.ends_with("/\r\n"));
    }

    handle
        .backend(BackendEvent::Output("late".to_string()))
        .unwrap();
    drop(handle);
    task.await.unwrap();
    assert!(backend.try_recv().is_ok());
}
