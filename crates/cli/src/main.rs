use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use sieve_core::config::{ResolvedKind, SieveConfig};
use sieve_core::{Extractor, FilterValue};
use sieve_search::{filter_items, parse, parse_strict, serialize, toggle_filter, FilterAccordion};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sievectl", version, about = "Facet counts and filter strings for inventory listings")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Config file with per-kind overrides (default: $SIEVE_CONFIG)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show filter sections with value counts for an item list
    Facets {
        /// Record kind, e.g. "machines", "controllers", "devices"
        kind: String,
        /// JSON array of items ("-" for stdin)
        #[arg(long = "items")]
        items: PathBuf,
        /// Current filter string
        #[arg(long = "filter")]
        filter: Option<String>,
    },
    /// Decode a filter string
    Parse {
        filter: String,
        /// Fail on malformed fragments instead of dropping them
        #[arg(long = "strict", action = ArgAction::SetTrue)]
        strict: bool,
    },
    /// Print the filter string after toggling one value
    Toggle {
        key: String,
        value: String,
        /// Current filter string
        #[arg(long = "filter")]
        filter: Option<String>,
        /// Toggle a contains-match term instead of an exact one
        #[arg(long = "loose", action = ArgAction::SetTrue)]
        loose: bool,
    },
    /// List items passing a filter string
    Filter {
        kind: String,
        #[arg(long = "items")]
        items: PathBuf,
        #[arg(long = "filter")]
        filter: String,
    },
}

fn init_tracing() {
    let env = std::env::var("SIEVE_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn load_config(path: Option<&Path>) -> Result<SieveConfig> {
    let cfg = match path {
        Some(p) => SieveConfig::load(p)?,
        None => SieveConfig::from_env()?,
    };
    Ok(cfg)
}

fn load_items(path: &Path) -> Result<Vec<Value>> {
    let body = if path == Path::new("-") {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s).context("reading items from stdin")?;
        s
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading items from {}", path.display()))?
    };
    match serde_json::from_str::<Value>(&body).with_context(|| format!("parsing {}", path.display()))? {
        Value::Array(items) => Ok(items),
        other => bail!("expected a JSON array of items, got {}", json_kind(&other)),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn max_facet_values() -> Option<usize> {
    std::env::var("SIEVE_MAX_FACET_VALUES").ok().and_then(|s| s.parse::<usize>().ok())
}

fn item_label(kind: &ResolvedKind, item: &Value, idx: usize) -> String {
    for ptr in ["/hostname", "/fqdn", "/system_id", "/name"] {
        if let Some(s) = item.pointer(ptr).and_then(|v| v.as_str()) { return s.to_string(); }
    }
    kind.extractor.text(item).unwrap_or_else(|| format!("#{}", idx))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Facets { kind, items, filter } => {
            let cfg = load_config(cli.config.as_deref())?;
            let resolved = cfg.resolve(&kind)?;
            let items = load_items(&items)?;
            info!(kind = %kind, items = items.len(), filter = ?filter, "facets invoked");
            let acc = FilterAccordion::for_kind(&resolved, filter.as_deref());
            let sections = acc.sections(&items, &resolved.extractor);
            match cli.output {
                Output::Human => {
                    let cap = max_facet_values();
                    for s in sections.iter() {
                        println!("{}", s.title.as_deref().unwrap_or(&s.key));
                        let shown = cap.unwrap_or(s.entries.len()).min(s.entries.len());
                        for e in s.entries.iter().take(shown) {
                            let mark = if e.active { "*" } else { " " };
                            println!("  {} {} ({})", mark, e.value, e.count);
                        }
                        if shown < s.entries.len() {
                            println!("    … {} more", s.entries.len() - shown);
                        }
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&sections)?),
            }
        }
        Commands::Parse { filter, strict } => {
            let active = if strict { parse_strict(&filter)? } else { parse(Some(&filter)) };
            match cli.output {
                Output::Human => {
                    for (key, terms) in active.iter() {
                        let vals: Vec<String> = terms.iter().map(|t| if t.is_sentinel() { format!("{}<any>", if t.negated { "!" } else { "" }) } else { t.to_string() }).collect();
                        println!("{}: {}", key, vals.join(", "));
                    }
                    if !active.free_text().is_empty() {
                        println!("text: {}", active.free_text().join(" "));
                    }
                    println!("canonical: {}", serialize(&active));
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&active)?),
            }
        }
        Commands::Toggle { key, value, filter, loose } => {
            let value = FilterValue::Text(value);
            let next = if loose {
                serialize(&toggle_filter(&parse(filter.as_deref()), &key, &value, false))
            } else {
                let acc = FilterAccordion::new(Vec::new(), Default::default(), filter.as_deref());
                acc.next_filter_string(&key, &value)
            };
            match cli.output {
                Output::Human => println!("{}", next),
                Output::Json => println!("{}", serde_json::to_string(&serde_json::json!({ "filter": next }))?),
            }
        }
        Commands::Filter { kind, items, filter } => {
            let cfg = load_config(cli.config.as_deref())?;
            let resolved = cfg.resolve(&kind)?;
            let items = load_items(&items)?;
            let active = parse(Some(&filter));
            if active.is_empty() && !filter.trim().is_empty() {
                warn!(filter = %filter, "filter string had no usable fragments; listing everything");
            }
            let shown = filter_items(&items, &active, &resolved.extractor);
            info!(kind = %kind, total = items.len(), matched = shown.len(), "filter invoked");
            match cli.output {
                Output::Human => {
                    for (i, item) in shown.iter().enumerate() {
                        println!("{}", item_label(&resolved, item, i));
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
            }
        }
    }
    Ok(())
}
