//! Calculator Example
//!
//! Exposes a greeting controller with a float and an int calculator through
//! objgate. Each invocation handles one request and prints the payload.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package calculator -- 'attr=greet&user=me'
//! cargo run --package calculator -- 'attr=fcalc.compute&x=5&y=3&op=/'
//! cargo run --package calculator -- 'attr=icalc.compute&x=5&y=3&op=/'
//! cargo run --package calculator -- 'attr=icalc.compute&_help=1'
//! cargo run --package calculator -- --body '{"x": 5, "y": 3, "op": "x"}' 'attr=fcalc.compute'
//! ```
//!
//! `attr=fcalc.compute&op=%2B` is how `+` is spelled in a query string.
//! `attr=do_not_give_access_to_this` is refused with a 403 payload.

mod controller;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use objgate::prelude::*;
use tracing::debug;

/// Dispatch one request to the calculator controller.
#[derive(Debug, Parser)]
#[command(name = "calculator", version, about)]
struct Cli {
    /// URL-encoded query string, e.g. `attr=fcalc.compute&x=5&y=3&op=-`.
    query: String,

    /// JSON object sent as the request body.
    #[arg(long)]
    body: Option<String>,

    /// Route argument as `name=value`; may be repeated.
    #[arg(long = "route", value_parser = parse_route)]
    routes: Vec<(String, String)>,

    /// Configuration file replacing the bundled `objgate.toml`.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(long)]
    profile: Option<String>,

    /// Print the status code before the payload.
    #[arg(long, short)]
    status: bool,
}

fn parse_route(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

impl Cli {
    fn request(&self) -> Result<Request> {
        let mut request = Request::new();
        if let Some(body) = &self.body {
            let body: Value = serde_json::from_str(body).context("--body is not valid JSON")?;
            request = request.json_body(body)?;
        }
        request = request.query_string(&self.query)?;
        for (name, value) in &self.routes {
            request = request.route_arg(name.clone(), value.clone());
        }
        Ok(request)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut builder = Gateway::builder()
        .config_file(cli.config.clone().unwrap_or_else(|| controller::CONFIG_FILE.into()))
        .registry(controller::coercions())
        .root(Root::constructor(controller::build));
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    let gateway = builder.build().context("Failed to set up the gateway")?;

    let request = cli.request()?;
    debug!(?request, "Dispatching");
    let response = gateway.respond(&request);

    if cli.status {
        println!("{}", response.status);
    }
    match &response.body {
        Value::String(text) => println!("{text}"),
        body => println!("{}", serde_json::to_string_pretty(body)?),
    }

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
