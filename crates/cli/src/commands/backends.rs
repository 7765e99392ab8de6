use anyhow::Result;
use serde::Serialize;

use codescan_core::services::default_scanner_registry;

#[derive(Debug, Serialize)]
pub struct BackendInfo {
    pub name: String,
    pub description: String,
}

/// List scanner backends compiled into this binary.
pub fn list_backends_command(json: bool) -> Result<()> {
    let registry = default_scanner_registry();
    let entries: Vec<BackendInfo> = registry
        .names()
        .into_iter()
        .map(|name| {
            let description = match name.as_str() {
                "codescan" => {
                    "Native scanner helper (CODESCAN_BIN or `codescanner` on PATH)".to_string()
                }
                "replay" => "Recorded scanner output from the workspace recordings dir".to_string(),
                other => format!("Backend '{}'", other),
            };
            BackendInfo { name, description }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Backends: (none)");
        return Ok(());
    }

    println!("Backends:");
    for entry in entries {
        println!("- {}: {}", entry.name, entry.description);
    }

    Ok(())
}
