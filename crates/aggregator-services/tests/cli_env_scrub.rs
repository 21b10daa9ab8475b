//! The bitrise wrapper must not leak the parent's environment into the tool.
//!
//! Lives in its own test binary: it sets a process-wide variable, which would
//! race with the stub spawns of any other test running alongside it.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;

use aggregator_core::TriggerCheck;
use aggregator_services::{BitriseCli, ServiceConfig};

#[tokio::test]
async fn bitrise_cli_does_not_inherit_debug() {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("bitrise");
    std::fs::write(
        &program,
        "#!/bin/sh\nif [ -n \"$DEBUG\" ]; then echo 'debug noise'; else echo '{\"workflow\":\"ci\"}'; fi\n",
    )
    .unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

    std::env::set_var("DEBUG", "true");
    let cli = BitriseCli::new(&ServiceConfig::default().with_bitrise_program(&program));
    let check = TriggerCheck {
        source_branch: "whatever".to_string(),
        target_branch: "master".to_string(),
        config_base64: "Y2ZnCg==".to_string(),
    };

    let output = cli.run(&check).await.unwrap();
    assert_eq!(output.trim(), r#"{"workflow":"ci"}"#);
}
