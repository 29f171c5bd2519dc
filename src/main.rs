//! Dyson Sphere Program production calculator
//!
//! Command line front end over the chain calculator.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use dsp_calculator::{Catalog, ChainNode, SortKey, Total, UsageIndex, builtin_catalog, expand, load_dir};

#[derive(Parser)]
#[command(name = "dsp-calculator")]
#[command(about = "Production chain calculator for Dyson Sphere Program")]
struct Cli {
    /// Directory of *.recipes files to use instead of the built-in dataset
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the production chain of an item
    Chain {
        /// Item to produce (e.g., "Magnetic_Coil", "processor")
        item: String,

        /// Target production rate per second; one factory when omitted
        #[arg(short, long)]
        rate: Option<f64>,

        /// Only show this many levels below the item
        #[arg(short, long)]
        depth: Option<usize>,

        /// List each node's inputs before detailing them
        #[arg(short, long)]
        summarized: bool,
    },

    /// Total factories per item for one or more chains
    Total {
        /// Targets as ITEM, ITEM@RATE or ITEM@RATE:DEPTH
        #[arg(required = true)]
        targets: Vec<Target>,

        /// Order of the listing
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,

        #[arg(long)]
        descending: bool,
    },

    /// List the items that use an item
    Uses {
        item: String,

        /// Include items that need it anywhere in their chain
        #[arg(short, long)]
        indirect: bool,
    },

    /// List the items that can be produced without an item
    Without { item: String },

    /// List all items in the dataset
    List,

    /// Show the recipe of an item
    Recipe { item: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Rate,
    Factories,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortKey::Name,
            SortArg::Rate => SortKey::Rate,
            SortArg::Factories => SortKey::Factories,
        }
    }
}

/// A chain request on the command line: `ITEM[@RATE[:DEPTH]]`.
#[derive(Debug, Clone, PartialEq)]
struct Target {
    item: String,
    rate: Option<f64>,
    depth: Option<usize>,
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (item, rest) = match s.split_once('@') {
            Some((item, rest)) => (item, Some(rest)),
            None => (s, None),
        };
        if item.trim().is_empty() {
            return Err(format!("missing item name in '{s}'"));
        }

        let (rate, depth) = match rest {
            None => (None, None),
            Some(rest) => {
                let (rate, depth) = match rest.split_once(':') {
                    Some((rate, depth)) => (rate, Some(depth)),
                    None => (rest, None),
                };
                let rate = rate
                    .parse::<f64>()
                    .map_err(|e| format!("invalid rate '{rate}': {e}"))?;
                let depth = depth
                    .map(|d| d.parse::<usize>().map_err(|e| format!("invalid depth '{d}': {e}")))
                    .transpose()?;
                (Some(rate), depth)
            }
        };

        Ok(Target {
            item: item.to_string(),
            rate,
            depth,
        })
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(data: Option<&PathBuf>) -> Result<Catalog> {
    match data {
        Some(dir) => {
            let (catalog, stats) = load_dir(dir)
                .with_context(|| format!("Failed to load recipes from {}", dir.display()))?;
            tracing::info!(%stats, "dataset loaded");
            Ok(catalog)
        }
        None => builtin_catalog().context("Built-in dataset is invalid"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let catalog = load_catalog(cli.data.as_ref())?;

    match cli.command {
        Commands::Chain {
            item,
            rate,
            depth,
            summarized,
        } => {
            let chain = expand(&catalog, &item, rate)?;
            for line in chain.lines(depth, summarized) {
                println!("{}", line);
            }
        }

        Commands::Total {
            targets,
            sort,
            descending,
        } => {
            let nodes = targets
                .iter()
                .map(|t| expand(&catalog, &t.item, t.rate))
                .collect::<Result<Vec<ChainNode>, _>>()?;
            let depths: Vec<Option<usize>> = targets.iter().map(|t| t.depth).collect();
            let total = Total::sum_of(&nodes, Some(depths.as_slice()))?;

            for entry in total.sorted(sort.into(), descending) {
                println!("{}", entry);
            }
        }

        Commands::Uses { item, indirect } => {
            if !catalog.contains(&item) {
                bail!("Item '{}' not found", item);
            }
            let index = UsageIndex::new(&catalog);
            let users = if indirect {
                index.indirect_users(&item)?
            } else {
                index.direct_users(&item)
            };

            if users.is_empty() {
                println!("Nothing uses {}", item);
            } else {
                for name in users {
                    println!("  {}", name);
                }
            }
        }

        Commands::Without { item } => {
            if !catalog.contains(&item) {
                bail!("Item '{}' not found", item);
            }
            let index = UsageIndex::new(&catalog);
            for name in index.producible_without(&item)? {
                println!("  {}", name);
            }
        }

        Commands::List => {
            if catalog.is_empty() {
                println!("No recipes in dataset.");
            } else {
                println!("{:<34} {:>10} {:>8}", "Item", "Rate (/s)", "Inputs");
                println!("{}", "-".repeat(54));
                for r in catalog.recipes() {
                    println!("{:<34} {:>10.2} {:>8}", r.name, r.output_rate, r.requirements.len());
                }
            }
        }

        Commands::Recipe { item } => {
            let recipe = catalog.lookup(&item)?;
            println!("Recipe: {}", recipe.name);
            println!("  Output: {} per {}s ({:.2}/sec)", recipe.units_per_cycle, recipe.cycle_time_s, recipe.output_rate);

            if !recipe.requirements.is_empty() {
                println!("  Inputs per factory:");
                for req in &recipe.requirements {
                    println!("    {} @ {:.2}/sec", req.item, req.rate_per_s);
                }
            }

            let users = UsageIndex::new(&catalog).direct_users(&recipe.name);
            if !users.is_empty() {
                println!("  Used by:");
                for name in users {
                    println!("    {}", name);
                }
            }
        }
    }

    Ok(())
}
