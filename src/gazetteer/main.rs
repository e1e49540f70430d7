//! Gazetteer command-line tool.
//!
//! Parses a heading-structured gazetteer document into a region tree and
//! links each region to its administrative code and boundary.

mod config;
mod report;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jiuyu::link::{link, LinkReport};
use jiuyu::models::RegionTree;
use jiuyu::parse_document;
use jiuyu::reference::GeoReference;

use crate::config::Config;

/// Shortest accepted search query, in characters
const MIN_QUERY_CHARS: usize = 2;

#[derive(Parser, Debug)]
#[command(name = "gazetteer")]
#[command(about = "Parse a gazetteer document and link regions to administrative codes")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Gazetteer document (overrides config)
    #[arg(long, global = true)]
    document: Option<PathBuf>,

    /// Reference data directory (overrides config)
    #[arg(long, global = true)]
    maps_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse the document and print its outline
    Parse {
        #[arg(long)]
        json: bool,
    },
    /// Parse, link against reference data and print the result
    Link {
        #[arg(long)]
        json: bool,
    },
    /// List regions whose name contains QUERY
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Show details of the first region matching QUERY
    Show { query: String },
    /// Export the heading inventory as CSV
    Headings {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report reference collection state
    Status,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(document) = args.document {
        config.document = document;
    }
    if let Some(maps_dir) = args.maps_dir {
        config.maps_dir = maps_dir;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Parse { json } => {
            let tree = load_tree(&config)?;
            if json {
                serde_json::to_writer_pretty(&mut out, &tree)?;
                writeln!(out)?;
            } else {
                report::write_outline(&mut out, &tree)?;
            }
        }
        Command::Link { json } => {
            let (tree, link_report) = load_linked(&config)?;
            if json {
                serde_json::to_writer_pretty(
                    &mut out,
                    &json!({ "report": link_report, "regions": tree }),
                )?;
                writeln!(out)?;
            } else {
                if let Some(link_report) = &link_report {
                    report::write_link_report(&mut out, link_report)?;
                    writeln!(out)?;
                }
                report::write_outline(&mut out, &tree)?;
            }
        }
        Command::Search { query, json } => {
            check_query(&query)?;
            let (tree, _) = load_linked(&config)?;
            let matches = tree.search(&query);
            info!("{} regions match '{}'", matches.len(), query);
            if json {
                serde_json::to_writer_pretty(&mut out, &matches)?;
                writeln!(out)?;
            } else {
                report::write_matches(&mut out, &matches)?;
            }
        }
        Command::Show { query } => {
            check_query(&query)?;
            let (tree, _) = load_linked(&config)?;
            let node = tree
                .search(&query)
                .first()
                .copied()
                .with_context(|| format!("No region matches '{}'", query))?;
            report::write_region(&mut out, node)?;
        }
        Command::Headings { output } => {
            let tree = load_tree(&config)?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    report::write_headings(BufWriter::new(file), &tree)?;
                    info!("Wrote {} headings to {}", tree.len(), path.display());
                }
                None => report::write_headings(&mut out, &tree)?,
            }
        }
        Command::Status => {
            let reference = GeoReference::load(&config.level_sources());
            report::write_status(&mut out, &reference)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn check_query(query: &str) -> Result<()> {
    if query.trim().chars().count() < MIN_QUERY_CHARS {
        anyhow::bail!(
            "Search query must be at least {} characters",
            MIN_QUERY_CHARS
        );
    }
    Ok(())
}

fn load_tree(config: &Config) -> Result<RegionTree> {
    parse_document(&config.document).context("Failed to parse gazetteer document")
}

/// Parse and link. Reference failures leave the tree unlinked with a
/// warning; only a document failure is returned as an error.
fn load_linked(config: &Config) -> Result<(RegionTree, Option<LinkReport>)> {
    let mut tree = load_tree(config)?;
    let reference = GeoReference::load(&config.level_sources());
    match link(&mut tree, &reference) {
        Ok(link_report) => Ok((tree, Some(link_report))),
        Err(e) => {
            warn!("Continuing without codes: {}", e);
            Ok((tree, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_queries_are_rejected() {
        assert!(check_query("河").is_err());
        assert!(check_query(" 河 ").is_err());
        assert!(check_query("河北").is_ok());
    }

    #[test]
    fn test_args_parse_subcommands() {
        let args = Args::try_parse_from([
            "gazetteer",
            "--maps-dir",
            "/data/maps",
            "search",
            "石家庄",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.maps_dir, Some(PathBuf::from("/data/maps")));
        assert!(matches!(
            args.command,
            Command::Search { ref query, json: true } if query == "石家庄"
        ));

        let args = Args::try_parse_from(["gazetteer", "headings", "-o", "titles.csv", "-v"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Command::Headings { output: Some(_) }));
    }
}
