use std::fs;
use std::path::PathBuf;

use coshell::config::CoshellConfig;
use coshell::sync::ProtocolEvent;
use coshell::tooling::cli::{CliContext, Commands};
use coshell::tree::Node;
use coshell::types::SocketId;
use coshell::workspace::Workspace;
use tempfile::TempDir;

fn sample() -> Workspace {
    let root = Node::directory(
        "root",
        vec![
            Node::directory("docs", vec![Node::file("guide.md", "# Guide")]),
            Node::file("README.md", "hello"),
        ],
    );
    Workspace::from_snapshot(&root, &[], None).unwrap()
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn cli() -> CliContext {
    CliContext::with_config(CoshellConfig::default())
}

#[test]
fn validate_json_contract_has_required_fields() {
    let temp_dir = TempDir::new().unwrap();
    let sync = sample().snapshot_for(SocketId::new("b"));
    let path = write(&temp_dir, "sync.json", &serde_json::to_string(&sync).unwrap());

    let output = cli()
        .execute(&Commands::Validate {
            snapshot: path,
            format: "json".to_string(),
        })
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed.get("valid").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(parsed.get("node_count").and_then(|v| v.as_u64()), Some(4));
    assert!(parsed.get("errors").and_then(|v| v.as_array()).is_some());
    assert!(parsed.get("warnings").and_then(|v| v.as_array()).is_some());
}

#[test]
fn validate_reports_files_with_children() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(
        &temp_dir,
        "bad.json",
        r#"{"id":"r","name":"root","type":"directory","children":[
            {"id":"f","name":"a.ts","type":"file","content":"","children":[
                {"id":"g","name":"b.ts","type":"file","content":""}
            ]}
        ]}"#,
    );

    let output = cli()
        .execute(&Commands::Validate {
            snapshot: path,
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["valid"], false);
    assert!(!parsed["errors"].as_array().unwrap().is_empty());
}

#[test]
fn stats_json_contract_has_required_fields() {
    let temp_dir = TempDir::new().unwrap();
    let event = ProtocolEvent::SyncFileStructure(sample().snapshot_for(SocketId::new("b")));
    let path = write(&temp_dir, "event.json", &serde_json::to_string(&event).unwrap());

    let output = cli()
        .execute(&Commands::Stats {
            snapshot: path,
            format: "json".to_string(),
            breakdown: true,
        })
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["root_name"], "root");
    assert_eq!(parsed["total_nodes"], 4);
    assert_eq!(parsed["files"], 2);
    assert_eq!(parsed["directories"], 2);
    assert_eq!(parsed["depth"], 2);
    let breakdown = parsed["breakdown"].as_array().unwrap();
    assert_eq!(breakdown[0]["path"], "docs/");
}

#[test]
fn exec_without_snapshot_uses_configured_root() {
    let mut config = CoshellConfig::default();
    config.workspace.root_name = "scratch".to_string();
    let output = CliContext::with_config(config)
        .execute(&Commands::Exec {
            snapshot: None,
            lines: vec!["pwd".to_string(), "cd nowhere".to_string()],
        })
        .unwrap();
    assert!(output.starts_with("$ > pwd\n/"));
    assert!(output.contains("Error: No such file or directory: nowhere"));
}

#[test]
fn context_reads_project_config() {
    let temp_dir = TempDir::new().unwrap();
    write(
        &temp_dir,
        ".coshell.toml",
        "[workspace]\nroot_name = \"from-file\"\n",
    );
    let context = CliContext::new(temp_dir.path().to_path_buf(), None).unwrap();
    assert_eq!(context.config().workspace.root_name, "from-file");
}
