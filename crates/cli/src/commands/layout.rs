use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use codescan_core::analysis::{analyze, compare};
use codescan_core::render::{ColorBar, ColorMap};
use codescan_core::services::default_scanner_registry;

use crate::commands::{resolve_binary_path, ScanSetup};

/// Options for `codescan layout`.
#[derive(Debug, Clone, Default)]
pub struct LayoutOptions {
    pub root: String,
    pub path: PathBuf,
    pub start: u64,
    pub end: u64,
    pub backend: Option<String>,
    /// Plot reconciled code and alien code instead of the plain scan.
    pub alien: bool,
    /// Write the layout JSON here. Defaults to the workspace reports dir, or
    /// stdout outside a workspace.
    pub output: Option<PathBuf>,
}

/// Emit colour-map layout data for one file as JSON.
pub fn layout_command(options: LayoutOptions) -> Result<()> {
    let setup = ScanSetup::load(&options.root, options.backend.as_deref())?;
    let registry = default_scanner_registry();
    let mut handle = setup.open_scanner(&registry)?;
    let path = resolve_binary_path(&options.path);

    let bar = if options.alien {
        let report = compare(&mut handle, &path)?;
        let regions = &report.reconciliation.regions;
        let name = file_label(&report.path);
        let code_label = regions.code_label();
        ColorMap::new(name, report.file_size, regions)
            .with_code_label(code_label.as_deref())
            .with_alien_label(Some(report.reconciliation.alien_label.as_str()))
            .with_sections(&report.sections)
            .build()?
    } else {
        let report = analyze(
            &mut handle,
            &path,
            options.start,
            options.end,
            setup.analysis.aggressive,
        )?;
        ColorMap::from_report(&report).build()?
    };
    handle.shutdown();

    let Some(bar) = bar else {
        println!("No regions to visualize");
        return Ok(());
    };

    let output = options.output.clone().or_else(|| {
        setup.workspace.as_ref().map(|ctx| {
            let suffix = if options.alien { ".alien" } else { "" };
            ctx.layout.report_path(&format!("{}{suffix}", file_label(&path)))
        })
    });
    write_layout(&bar, output.as_ref())
}

fn write_layout(bar: &ColorBar, output: Option<&PathBuf>) -> Result<()> {
    let body = serde_json::to_string_pretty(bar)?;
    match output {
        Some(out) => {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(out, body)
                .with_context(|| format!("Failed to write layout to {}", out.display()))?;
            println!("Wrote layout: {}", out.display());
        }
        None => println!("{}", body),
    }
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
