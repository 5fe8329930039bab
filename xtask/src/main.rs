//! Build automation tasks for BONNIE-PHYS
//!
//! Usage:
//!   cargo xtask build-web       # Build the sandbox for the browser
//!   cargo xtask ci              # fmt check, clippy, and tests

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;

const SANDBOX_BIN: &str = "bonnie-phys-sandbox";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for BONNIE-PHYS")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the sandbox as WASM for web deployment
    BuildWeb {
        /// Mark as dev build (adds DEV to the page title)
        #[arg(long)]
        dev: bool,
    },
    /// Run the checks CI runs: rustfmt, clippy, tests
    Ci,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildWeb { dev } => build_web(dev),
        Commands::Ci => ci(),
    }
}

/// Get the project root directory
fn project_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask must live one level below the project root")
}

/// Run a command and check for success
fn run_cmd(cmd: &mut Command) -> Result<()> {
    let status = cmd.status().context("Failed to execute command")?;
    if !status.success() {
        anyhow::bail!("Command failed with status: {}", status);
    }
    Ok(())
}

/// Download a file from URL to destination
fn download_file(url: &str, dest: &Path) -> Result<()> {
    println!("Downloading {}...", url);
    run_cmd(
        Command::new("curl")
            .args(["-L", "-o"])
            .arg(dest)
            .arg(url),
    )
}

fn index_html(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        html, body, canvas {{ margin: 0; padding: 0; width: 100%; height: 100%; overflow: hidden; background: #14141c; }}
    </style>
</head>
<body>
    <canvas id="glcanvas" tabindex="1"></canvas>
    <script src="mq_js_bundle.js"></script>
    <script>load("{wasm}.wasm");</script>
</body>
</html>
"#,
        title = title,
        wasm = SANDBOX_BIN,
    )
}

/// Build the sandbox for the browser
fn build_web(dev: bool) -> Result<()> {
    let root = project_root()?;
    let dist = root.join("dist/web");

    println!("Building WASM...");
    run_cmd(
        Command::new("cargo")
            .current_dir(&root)
            .args(["build", "--release", "--target", "wasm32-unknown-unknown", "--bin", SANDBOX_BIN]),
    )?;

    // Clean and create dist folder
    if dist.exists() {
        std::fs::remove_dir_all(&dist)?;
    }
    std::fs::create_dir_all(&dist)?;

    println!("Copying files to dist/web...");
    let wasm = format!("{}.wasm", SANDBOX_BIN);
    std::fs::copy(
        root.join("target/wasm32-unknown-unknown/release").join(&wasm),
        dist.join(&wasm),
    )
    .with_context(|| format!("missing build output {}", wasm))?;

    let title = if dev {
        "[DEV] BONNIE-PHYS Sandbox"
    } else {
        "BONNIE-PHYS Sandbox"
    };
    std::fs::write(dist.join("index.html"), index_html(title))?;

    // Download macroquad JS bundle
    download_file(
        "https://raw.githubusercontent.com/not-fl3/macroquad/v0.4.14/js/mq_js_bundle.js",
        &dist.join("mq_js_bundle.js"),
    )?;

    println!("Web build complete: dist/web/");
    Ok(())
}

/// Formatting, lints, and the test suite, in that order
fn ci() -> Result<()> {
    let root = project_root()?;

    println!("Checking formatting...");
    run_cmd(
        Command::new("cargo")
            .current_dir(&root)
            .args(["fmt", "--all", "--", "--check"]),
    )?;

    println!("Running clippy...");
    run_cmd(
        Command::new("cargo")
            .current_dir(&root)
            .args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]),
    )?;

    println!("Running tests...");
    run_cmd(
        Command::new("cargo")
            .current_dir(&root)
            .args(["test", "--workspace"]),
    )?;

    println!("CI checks passed");
    Ok(())
}
