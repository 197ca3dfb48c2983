//! AI Config CLI：离线渲染厂商请求载荷、从响应中提取 Token 用量
//!
//! Usage:
//!   ai-config-cli render <store.yaml> [<key>] [--provider <kind>] [--var k=v]...
//!   ai-config-cli usage <response.json> --provider <kind> [--skip N]
//!   ai-config-cli providers
//!
//! Nothing here talks to a provider; `render` is a dry run.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use ai_config_bridge::config::{AiConfig, ConfigResolver, ConfigStore};
use ai_config_bridge::normalize::PROVIDER_ALIASES;
use ai_config_bridge::transport::HttpProviderClient;
use ai_config_bridge::{
    build_request, extract_usage, EvaluationContext, Message, ProviderKind, ProviderResponse,
    Settings, UsageWindow,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "render" => cmd_render(&args[2..]),
        "usage" => cmd_usage(&args[2..]),
        "providers" => {
            cmd_providers();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"ai-config-cli: AI 配置命令行工具

USAGE:
    ai-config-cli <COMMAND> [OPTIONS]

COMMANDS:
    render <store.yaml> [key]   Resolve a config and print the provider request
                                (key defaults to AI_CONFIG_KEY or sample-ai-config)
        --settings <file>       Settings YAML; environment variables still override it
        --provider <kind>       Provider family (default: config provider or AI_PROVIDER)
        --var <name=value>      Template variable (repeatable)
        --context <key>         Evaluation context key (default: cli-user)
        --user <text>           Append a user turn
    usage <response.json>       Extract token usage from a saved response
        --provider <kind>       Provider family that produced the response
        --skip <N>              Ignore the first N messages of an agent result
    providers                   List provider families and aliases
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    AI_CONFIG_KEY               Default config key for render
    AI_PROVIDER                 Default provider family
    AI_ROLE_POLICY              drop | reject (unrecognized message roles)
    RUST_LOG                    Log filter (default: info)"#
    );
}

fn cmd_version() {
    println!(
        "ai-config-cli {} (ai-config-bridge {})",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_VERSION"),
    );
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn flag_values<'a>(args: &'a [String], name: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == name)
        .map(|w| w[1].as_str())
        .collect()
}

fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i].starts_with("--") {
            i += 2;
        } else {
            out.push(args[i].as_str());
            i += 1;
        }
    }
    out
}

fn parse_vars(args: &[String]) -> Result<HashMap<String, Value>> {
    let mut vars = HashMap::new();
    for pair in flag_values(args, "--var") {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--var expects name=value, got '{pair}'"))?;
        // numbers and booleans stay typed; anything else is a string
        let value = serde_json::from_str::<Value>(value)
            .ok()
            .filter(|v| !v.is_object() && !v.is_array())
            .unwrap_or_else(|| Value::String(value.to_string()));
        vars.insert(name.to_string(), value);
    }
    Ok(vars)
}

fn load_settings(args: &[String]) -> Result<Settings> {
    let settings = match flag_value(args, "--settings") {
        Some(path) => Settings::from_yaml_file(path)
            .with_context(|| format!("loading settings from {path}"))?
            .with_env_overrides()?,
        None => Settings::from_env()?,
    };
    Ok(settings)
}

fn cmd_render(args: &[String]) -> Result<()> {
    let settings = load_settings(args)?;
    let pos = positional(args);
    let (path, key) = match pos.as_slice() {
        [path] => (*path, settings.config_key.as_str()),
        [path, key, ..] => (*path, *key),
        [] => bail!("render expects <store.yaml> [<key>]"),
    };

    let store = ConfigStore::from_file(path).with_context(|| format!("loading {path}"))?;
    let context = EvaluationContext::builder(flag_value(args, "--context").unwrap_or("cli-user"))
        .build()?;
    let resolved = store.config(key, &context, AiConfig::disabled(), &parse_vars(args)?)?;
    if !resolved.config.enabled {
        bail!("config '{key}' is disabled (or missing from {path})");
    }

    let kind = match flag_value(args, "--provider") {
        Some(name) => ProviderKind::from_str(name)?,
        None => match (settings.provider, resolved.config.provider_name()) {
            (Some(kind), _) => kind,
            (None, Some(name)) => ProviderKind::from_name(name)?,
            (None, None) => bail!("no provider: pass --provider or set AI_PROVIDER"),
        },
    };

    let extra: Vec<Message> = flag_values(args, "--user")
        .into_iter()
        .map(Message::user)
        .collect();
    let request = build_request(kind, &resolved.config, &extra, settings.role_policy)?;

    let endpoint = if kind.is_http_native() {
        Some(HttpProviderClient::from_settings(&settings)?.endpoint(&request)?)
    } else {
        None
    };

    let out = json!({
        "key": resolved.key,
        "provider": kind,
        "model": request.model,
        "endpoint": endpoint,
        "body": request.body,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_usage(args: &[String]) -> Result<()> {
    let pos = positional(args);
    let path = pos
        .first()
        .copied()
        .ok_or_else(|| anyhow!("usage expects <response.json>"))?;
    let kind = flag_value(args, "--provider")
        .ok_or_else(|| anyhow!("--provider is required"))
        .and_then(|name| Ok(ProviderKind::from_str(name)?))?;
    let skip = match flag_value(args, "--skip") {
        Some(n) => n
            .parse::<usize>()
            .with_context(|| format!("--skip expects a count, got '{n}'"))?,
        None => 0,
    };

    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let body: Value = serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
    let response = ProviderResponse::new(kind, body);
    let shape = ai_config_bridge::usage::UsageSource::response_shape(&response);

    match extract_usage(&shape, UsageWindow::skip(skip)) {
        Some(usage) => println!("{}", serde_json::to_string_pretty(&usage)?),
        None => println!("no usage"),
    }
    Ok(())
}

fn cmd_providers() {
    println!("{:<12} {:<6}", "PROVIDER", "HTTP");
    for kind in ProviderKind::ALL {
        println!(
            "{:<12} {:<6}",
            kind.as_str(),
            if kind.is_http_native() { "yes" } else { "no" }
        );
    }
    println!();
    println!("Aliases:");
    for (from, to) in PROVIDER_ALIASES {
        println!("  {from} -> {to}");
    }
}
