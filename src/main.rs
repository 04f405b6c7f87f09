//! Minimal newline-delimited-JSON demonstration loop around the tool
//! registry. Framing is explicitly out of scope for the core (§1) — this
//! binary exists so the crate is runnable, not as the contract itself.

use anyhow::{Context, Result};
use clap::Parser;
use ctxopt_core::config::CoreConfig;
use ctxopt_core::tools::build_default_registry;
use serde::Deserialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ctxopt-core",
    about = "Context-compression engine for LLM coding assistants",
    long_about = None
)]
struct Args {
    /// Directory tool calls are rooted at; defaults to the current directory.
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Run a single `{"tool": "...", "args": {...}}` request from argv instead
    /// of reading a newline-delimited-JSON stream from stdin.
    #[arg(long)]
    request: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Request {
    tool: String,
    #[serde(default)]
    args: serde_json::Value,
}

fn main() -> Result<()> {
    install_tracing();
    let args = Args::parse();
    let _config = CoreConfig::load();

    let working_dir = args
        .working_dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let registry = build_default_registry(working_dir);

    if let Some(request) = &args.request {
        let response = handle_line(&registry, request)?;
        println!("{response}");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading request line")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&registry, &line)?;
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_line(registry: &ctxopt_core::registry::ToolRegistry, line: &str) -> Result<String> {
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return Ok(serde_json::json!({"is_error": true, "content": [format!("invalid request: {e}")]}).to_string());
        }
    };
    let result = registry.dispatch(&request.tool, request.args);
    Ok(serde_json::to_string(&result)?)
}

fn install_tracing() {
    let filter = EnvFilter::try_from_env("CTXOPT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
