use std::path::PathBuf;

use anyhow::{anyhow, Context};
use colored::Colorize;
use pnet_filter::ParsedFilter;
use pnet_network::{Network, NetworkConfig};
use pnet_types::Key;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let (filter, config) = load_filter(&cli)?;
    let format = cli.format;

    if let Command::Check = cli.command {
        return cmd_check(&filter, format);
    }

    let network = Network::from_filter(filter, &config);
    let result = match cli.command {
        Command::Check => Ok(()),
        Command::Route(args) => cmd_route(&network, &args.key, format),
        Command::Get(args) => cmd_get(&network, &args.key, format),
        Command::Set(args) => cmd_set(&network, &args.key, &args.value, format),
        Command::Rm(args) => cmd_rm(&network, &args.key, format),
        Command::Namespace(args) => cmd_namespace(&network, &args.prefix, format),
    };
    network.dispose().context("closing stores")?;
    result
}

/// Resolve configuration and compile the filter file it names.
fn load_filter(cli: &Cli) -> anyhow::Result<(ParsedFilter, NetworkConfig)> {
    let mut config = match &cli.config {
        Some(path) => NetworkConfig::load(path)?,
        None => NetworkConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    let path: PathBuf = cli
        .filter
        .clone()
        .or_else(|| config.filter.clone())
        .ok_or_else(|| anyhow!("no filter file: pass --filter or set `filter` in the config"))?;

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading filter {}", path.display()))?;
    let filter = pnet_filter::compile(&text)
        .with_context(|| format!("compiling filter {}", path.display()))?;
    tracing::debug!(path = %path.display(), rules = filter.rules().len(), "filter loaded");
    Ok((filter, config))
}

fn cmd_check(filter: &ParsedFilter, format: OutputFormat) -> anyhow::Result<()> {
    let rules = filter.rules_by_specificity();
    if format == OutputFormat::Json {
        let rules: Vec<_> = rules
            .iter()
            .map(|r| json!({ "line": r.line(), "pattern": r.pattern().as_str(), "template": r.template().as_str() }))
            .collect();
        let aliases: serde_json::Map<_, _> = filter
            .aliases()
            .iter()
            .map(|(name, t)| (name.clone(), json!(t.as_str())))
            .collect();
        println!("{}", json!({ "rules": rules, "aliases": aliases }));
        return Ok(());
    }

    println!(
        "{} {} rule(s), {} alias(es)",
        "✓".green().bold(),
        rules.len(),
        filter.aliases().len()
    );
    for rule in rules {
        println!(
            "  {:>4}  {} → {}",
            rule.line().to_string().dimmed(),
            rule.pattern().as_str().yellow(),
            rule.template().as_str().cyan()
        );
    }
    for (name, template) in filter.aliases() {
        println!("  alias  ${} = {}", name.bold(), template.as_str().cyan());
    }
    Ok(())
}

fn cmd_route(network: &Network, key: &str, format: OutputFormat) -> anyhow::Result<()> {
    let key = Key::parse(key)?;
    let best = network.get_connection(&key)?;
    let all = network.get_all_connections(&key)?;
    if format == OutputFormat::Json {
        let all: Vec<_> = all.iter().map(|l| l.as_str()).collect();
        println!("{}", json!({ "key": key.to_string(), "best": best.as_str(), "all": all }));
        return Ok(());
    }
    println!("{} → {}", key.to_string().bold(), best.as_str().green());
    for locator in all.iter().filter(|l| **l != best) {
        println!("  also matches {}", locator.as_str().dimmed());
    }
    Ok(())
}

fn cmd_get(network: &Network, key: &str, format: OutputFormat) -> anyhow::Result<()> {
    let key = Key::parse(key)?;
    let value = network.get(&key)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "key": key.to_string(), "value": value })),
        OutputFormat::Text => println!("{value}"),
    }
    Ok(())
}

fn cmd_set(network: &Network, key: &str, value: &str, format: OutputFormat) -> anyhow::Result<()> {
    let key = Key::parse(key)?;
    network.set(&key, value)?;
    let locator = network.get_connection(&key)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "key": key.to_string(), "value": value, "locator": locator.as_str() })
        ),
        OutputFormat::Text => println!(
            "{} {} = {} ({})",
            "✓".green(),
            key.to_string().bold(),
            value,
            locator.as_str().dimmed()
        ),
    }
    Ok(())
}

fn cmd_rm(network: &Network, key: &str, format: OutputFormat) -> anyhow::Result<()> {
    let key = Key::parse(key)?;
    let removed = network.clear_key(&key)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "key": key.to_string(), "removed": removed })),
        OutputFormat::Text if removed => println!("{} Removed {}", "✓".green(), key.to_string().bold()),
        OutputFormat::Text => println!("{} was not set", key.to_string().bold()),
    }
    Ok(())
}

fn cmd_namespace(network: &Network, prefix: &str, format: OutputFormat) -> anyhow::Result<()> {
    let prefix = Key::parse(prefix)?;
    let pairs = network.get_namespace(&prefix)?;
    if format == OutputFormat::Json {
        let map: serde_json::Map<_, _> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        println!("{}", serde_json::Value::Object(map));
        return Ok(());
    }
    if pairs.is_empty() {
        println!("No keys under {}.", prefix.to_string().bold());
    }
    for (key, value) in &pairs {
        println!("{} = {}", key.to_string().yellow(), value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pnet").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn filter_comes_from_config_when_not_given() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("rules.filter"), "**=mem://all\n").unwrap();
        let config = dir.path().join("pnet.toml");
        std::fs::write(&config, "filter = \"rules.filter\"\nroot = \"data\"\n").unwrap();

        let (filter, config) = load_filter(&cli(&["--config", config.to_str().unwrap(), "check"])).unwrap();
        assert_eq!(filter.rules().len(), 1);
        assert_eq!(config.root, dir.path().join("data"));
    }

    #[test]
    fn root_flag_overrides_config() {
        let dir = TempDir::new().unwrap();
        let filter = dir.path().join("f");
        std::fs::write(&filter, "**=mem://all\n").unwrap();
        let (_, config) =
            load_filter(&cli(&["--filter", filter.to_str().unwrap(), "--root", "/tmp/elsewhere", "check"]))
                .unwrap();
        assert_eq!(config.root, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn missing_filter_is_an_error() {
        assert!(load_filter(&cli(&["check"])).is_err());
    }

    #[test]
    fn malformed_filter_is_an_error() {
        let dir = TempDir::new().unwrap();
        let filter = dir.path().join("bad.filter");
        std::fs::write(&filter, "$1bad=mem://x\n").unwrap();
        let err = load_filter(&cli(&["--filter", filter.to_str().unwrap(), "check"])).unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }

    #[test]
    fn set_then_get_through_files() {
        let dir = TempDir::new().unwrap();
        let filter = dir.path().join("rules.filter");
        std::fs::write(&filter, "**=yml://store.yml\n").unwrap();
        let filter = filter.to_str().unwrap();
        let root = dir.path().to_str().unwrap();

        run_command(cli(&["--filter", filter, "--root", root, "set", "a.b", "v"])).unwrap();
        assert!(dir.path().join("store.yml").exists());
        run_command(cli(&["--filter", filter, "--root", root, "get", "a.b"])).unwrap();
        run_command(cli(&["--filter", filter, "--root", root, "rm", "a.b"])).unwrap();
        assert!(run_command(cli(&["--filter", filter, "--root", root, "get", "a.b"])).is_err());
    }
}
