//! embedrt - host simulator CLI
//!
//! Calls the library the way a host application does, through the C entry
//! points, and reports what hardening did.

use std::ffi::{CStr, CString};
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use embedrt::util::{config, logger};
use embedrt::{ffi, initialize, RuntimeHardening, NAME, VERSION};

/// Exercise the embedded runtime from the command line
#[derive(Parser, Debug)]
#[command(name = "embedrt")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Hardening config file (defaults to the standard lookup)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply hardening and print the report as JSON
    Probe {
        /// Also redirect stdout/stderr to the discard target
        #[arg(long)]
        redirect: bool,

        /// Write the report here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the effective hardening configuration as TOML
    Config {
        /// Also write it to the config file lookup location
        #[arg(long)]
        save: bool,
    },

    /// Add two numbers
    Add { a: i32, b: i32 },

    /// Build a greeting
    Hello { name: String },

    /// Compute a factorial
    Factorial {
        #[arg(allow_negative_numbers = true)]
        n: i32,
    },

    /// Fan tasks out over the worker pool and sum the results
    Fanout {
        #[arg(allow_negative_numbers = true)]
        count: i32,
        #[arg(allow_negative_numbers = true)]
        workload: i32,
    },

    /// Print version information
    Version,
}

fn load_config(path: Option<&PathBuf>) -> Result<RuntimeHardening> {
    match path {
        Some(path) => config::load_hardening_config_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => config::load_hardening_config().context("Failed to load config"),
    }
}

/// Initialize like a host would, but keep our own streams.
fn init_as_host(hardening: &RuntimeHardening) {
    let hardening = RuntimeHardening {
        redirect_streams: false,
        ..hardening.clone()
    };
    embedrt::ensure_initialized_with(&hardening);
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli(args.verbose);

    if args.verbose {
        eprintln!("{} version: {}", NAME, VERSION);
        eprintln!("Host: {}", std::env::consts::OS);
    }

    let hardening = load_config(args.config.as_ref())?;

    match args.command {
        Commands::Probe { redirect, output } => {
            let hardening = RuntimeHardening {
                redirect_streams: redirect && hardening.redirect_streams,
                ..hardening
            };
            let report = initialize(&hardening);
            let json = serde_json::to_string_pretty(&report).context("Failed to render report")?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("Failed to write report: {}", path.display()))?,
                None => println!("{}", json),
            }
        }
        Commands::Config { save } => {
            print!("{}", config::render_hardening_config(&hardening)?);
            if save {
                let path = config::save_hardening_config(&hardening)
                    .context("Failed to save config")?;
                eprintln!("Saved to {}", path.display());
            }
        }
        Commands::Add { a, b } => {
            init_as_host(&hardening);
            println!("{}", ffi::simple(a, b));
        }
        Commands::Hello { name } => {
            init_as_host(&hardening);
            let name = CString::new(name).context("Name contains a NUL byte")?;
            // SAFETY: `name` is NUL-terminated; the result is ours to free.
            let greeting = unsafe {
                let raw = ffi::hello(name.as_ptr());
                anyhow::ensure!(!raw.is_null(), "Hello returned NULL");
                let text = CStr::from_ptr(raw).to_string_lossy().into_owned();
                libc::free(raw as *mut libc::c_void);
                text
            };
            println!("{}", greeting);
        }
        Commands::Factorial { n } => {
            init_as_host(&hardening);
            println!("{}", ffi::calculate_factorial(n));
        }
        Commands::Fanout { count, workload } => {
            init_as_host(&hardening);
            println!("{}", ffi::test_goroutines(count, workload));
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
