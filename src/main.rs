// Fri Oct 16 2026 - Alex

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use remote_vm::config::{Config, OutputFormat};
use remote_vm::memory::{Address, RegionDescriptor, RegionState};
use remote_vm::utils::{self, logging, LoggingUtils};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Allocate memory in and walk the address space of another process", long_about = None)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every region of the target's address space
    Regions {
        #[arg(short, long)]
        pid: Option<u32>,
        /// Include free regions
        #[arg(short, long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Describe the region containing an address
    Query {
        #[arg(short, long)]
        pid: Option<u32>,
        /// Address in hex (0x...) or decimal
        address: String,
        #[arg(long)]
        json: bool,
    },
    /// Allocate RWX memory in the target, show it, then release it
    Alloc {
        #[arg(short, long)]
        pid: Option<u32>,
        #[arg(short, long)]
        size: Option<u64>,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::new(),
    };
    if let Err(e) = config.validate() {
        bail!("invalid config: {}", e);
    }

    let level = if args.verbose > 0 {
        LoggingUtils::level_from_verbosity(args.verbose)
    } else {
        LoggingUtils::level_from_str(&config.log_level).unwrap_or(log::LevelFilter::Warn)
    };
    logging::init(level);

    match args.command {
        Command::Regions { pid, all, json } => {
            if let Some(pid) = pid {
                config = config.with_pid(pid);
            }
            if all {
                config = config.with_include_free(true);
            }
            if json {
                config = config.with_output(OutputFormat::Json);
            }
            platform::regions(&config)
        }
        Command::Query { pid, address, json } => {
            if let Some(pid) = pid {
                config = config.with_pid(pid);
            }
            if json {
                config = config.with_output(OutputFormat::Json);
            }
            let address = utils::parse_address(&address).with_context(|| format!("bad address '{}'", address))?;
            platform::query(&config, Address::new(address))
        }
        Command::Alloc { pid, size } => {
            if let Some(pid) = pid {
                config = config.with_pid(pid);
            }
            if let Some(size) = size {
                config = config.with_alloc_size(size);
            }
            platform::alloc(&config)
        }
    }
}

fn print_region(region: &RegionDescriptor) {
    let state = match region.state() {
        RegionState::Free => region.state().to_string().dimmed(),
        RegionState::Reserved => region.state().to_string().yellow(),
        RegionState::Committed => region.state().to_string().green(),
    };
    let kind = region.kind().map(|k| k.to_string()).unwrap_or_default();
    let group = region
        .allocation_base()
        .map(|base| base.to_string())
        .unwrap_or_default();
    println!(
        "  {} {:>12} {} {:<9} {:<7} {}",
        region.base().to_string().cyan(),
        utils::format_bytes(region.size()),
        region.protection(),
        state,
        kind,
        group.dimmed()
    );
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
mod platform {
    use super::*;
    use remote_vm::memory::{enumerate, query as query_region, Process, RemoteAllocator};

    fn open(config: &Config) -> Result<Process> {
        match config.pid {
            Some(pid) => Ok(Process::open(pid)?),
            None => Ok(Process::current()),
        }
    }

    pub fn regions(config: &Config) -> Result<()> {
        let process = open(config)?;
        let _timer = logging::scoped_timer("region walk");

        let mut regions = Vec::new();
        for region in enumerate(&process) {
            let region = region.with_context(|| format!("walking pid {}", process.pid()))?;
            if config.include_free || !region.is_free() {
                regions.push(region);
            }
        }

        if config.output == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&regions)?);
            return Ok(());
        }

        println!("{} Regions of pid {}", "[*]".blue(), process.pid());
        for region in &regions {
            print_region(region);
        }
        let committed: u64 = regions.iter().filter(|r| r.is_committed()).map(|r| r.size()).sum();
        println!(
            "{} {} regions, {} committed",
            "[+]".green(),
            regions.len(),
            utils::format_bytes(committed)
        );
        Ok(())
    }

    pub fn query(config: &Config, address: Address) -> Result<()> {
        let process = open(config)?;
        let region = query_region(&process, address)?;
        if config.output == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&region)?);
        } else {
            println!("{} Region containing {} in pid {}", "[*]".blue(), address, process.pid());
            print_region(&region);
        }
        Ok(())
    }

    pub fn alloc(config: &Config) -> Result<()> {
        let process = open(config)?;
        let mut allocation = RemoteAllocator::acquire(&process, config.default_alloc_size)?;
        let base = allocation.base().context("allocator is empty after acquire")?;
        println!(
            "{} Allocated {} at {} in pid {}",
            "[+]".green(),
            utils::format_bytes(config.default_alloc_size),
            base,
            process.pid()
        );
        print_region(&query_region(&process, base)?);

        allocation.release()?;
        println!("{} Released {}", "[+]".green(), base);
        Ok(())
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod platform {
    use super::*;

    pub fn regions(_config: &Config) -> Result<()> {
        bail!("no process backend for this platform")
    }

    pub fn query(_config: &Config, _address: Address) -> Result<()> {
        bail!("no process backend for this platform")
    }

    pub fn alloc(_config: &Config) -> Result<()> {
        bail!("no process backend for this platform")
    }
}
