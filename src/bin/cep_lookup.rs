//! Resolves CEPs from the command line through the same provider chain as the server.
//!
//! Usage: `cep-lookup 01310-100 20040-002 ...`
//!
//! Prints one JSON line per CEP. Nothing is written to Bitrix24.

use cep_crm_sync::config::ProviderConfig;
use cep_crm_sync::models::normalize_cep;
use cep_crm_sync::resolver::AddressResolver;
use serde_json::{json, Value};
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cep_crm_sync=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let ceps: Vec<String> = env::args().skip(1).collect();
    if ceps.is_empty() {
        eprintln!("Usage: cep-lookup <CEP> [CEP...]");
        return Ok(ExitCode::from(2));
    }

    let config = ProviderConfig::from_env()?;
    let resolver = AddressResolver::from_config(&config)?;

    let mut failures = 0;
    for cep in &ceps {
        let (ok, line) = lookup_line(&resolver, cep).await;
        if !ok {
            failures += 1;
        }
        println!("{}", line);
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Resolves one CEP into its output line. Blank CEPs never reach the providers.
async fn lookup_line(resolver: &AddressResolver, cep: &str) -> (bool, Value) {
    if normalize_cep(cep).is_empty() {
        return (
            false,
            json!({ "cep": cep, "error": "CEP is empty after removing hyphens and whitespace" }),
        );
    }

    match resolver.resolve(cep).await {
        Ok(address) => (true, json!({ "cep": cep, "address": address })),
        Err(e) => (false, json!({ "cep": cep, "error": e.to_string() })),
    }
}
