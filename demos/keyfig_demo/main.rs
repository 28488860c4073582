//! # keyfig demo application
//!
//! A sample CLI tool that shows how to integrate keyfig into an application.
//! It exists to demonstrate and manually verify keyfig's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example keyfig_demo -- echo
//! cargo run --example keyfig_demo -- config list
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                  | How to exercise it                                                      |
//! |--------------------------|-------------------------------------------------------------------------|
//! | Type defaults            | `cargo run --example keyfig_demo -- echo`                               |
//! | Config file              | Create `keyfig-demo.yml` in cwd, then run `echo`                        |
//! | Env file                 | Put `DISPLAY_COLOR=red` in `.env` in cwd, then run `echo`               |
//! | Env var                  | `DISPLAY_COLOR=red cargo run --example keyfig_demo -- echo`             |
//! | Explicit env key         | `PORT=9999 cargo run --example keyfig_demo -- echo`                     |
//! | Config flags             | `cargo run --example keyfig_demo -- echo -- --demo.server.port 9000`    |
//! | Auto-matched flag        | `cargo run --example keyfig_demo -- --verbose echo`                     |
//! | Mapped flag              | `cargo run --example keyfig_demo -- --color blue echo`                  |
//! | Array of objects         | `UPSTREAMS="url=http://a;weight=2,url=http://b" ... -- echo`            |
//! | Validation               | `PORT=80 cargo run --example keyfig_demo -- echo`                       |
//! | `config get`             | `cargo run --example keyfig_demo -- config get server.port`             |
//! | `config schema`          | `cargo run --example keyfig_demo -- config schema`                      |
//! | `config doc`             | `cargo run --example keyfig_demo -- config doc --source env`            |
//! | Single key echo          | `cargo run --example keyfig_demo -- echo --key display.color`           |

mod config;

use clap::{Parser, Subcommand};
use serde::Serialize;

use keyfig::{ConfigArgs, Keyfig, KeyfigBuilder};

use config::DemoConfig;

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// A sample CLI app for showcasing keyfig integration.
#[derive(Parser, Debug)]
#[command(name = "keyfig-demo")]
struct Cli {
    /// Enable verbose output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Override the display color (red, green, yellow, blue, magenta, cyan).
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print resolved configuration values (colored by display.color).
    Echo {
        /// Print only this dotted field path instead of all values.
        #[arg(long)]
        key: Option<String>,

        /// Config flags after `--`, e.g. `-- --demo.server.port 9000`.
        #[arg(last = true)]
        flags: Vec<String>,
    },
    /// Inspect the configuration (list, get, schema, doc).
    Config(ConfigArgs),
}

/// Serializable projection of CLI flags for
/// [`KeyfigBuilder::cli_overrides_from`].
///
/// `verbose` matches `DemoConfig::verbose` by field path and is kept.
/// `color` matches nothing (the field path is `display.color`), so it is
/// wired with [`KeyfigBuilder::cli_override`] instead.
#[derive(Serialize)]
struct CliOverrides {
    verbose: Option<bool>,
}

// ---------------------------------------------------------------------------
// Builder helper
// ---------------------------------------------------------------------------

/// Create a [`KeyfigBuilder`] wired up for the demo app.
///
/// Sources: `keyfig-demo.yml` in cwd, then `.env` under the process
/// environment, then config flags and overrides.
fn make_builder(cli: &Cli, flags: &[String]) -> KeyfigBuilder<DemoConfig> {
    let overrides = CliOverrides {
        verbose: cli.verbose.then_some(true),
    };

    Keyfig::builder::<DemoConfig>()
        .add_file("keyfig-demo.yml")
        .env_files([".env"])
        .args(flags.iter().cloned())
        .doc_title("keyfig-demo configuration")
        // Auto-match by field path.
        .cli_overrides_from(&overrides)
        // Map a flag whose name differs from its CLI key.
        .cli_override("display.color", cli.color.clone())
}

// ---------------------------------------------------------------------------
// ANSI color helpers
// ---------------------------------------------------------------------------

fn ansi_color_code(name: &str) -> &str {
    match name {
        "red" => "\x1b[31m",
        "green" => "\x1b[32m",
        "yellow" => "\x1b[33m",
        "blue" => "\x1b[34m",
        "magenta" => "\x1b[35m",
        "cyan" => "\x1b[36m",
        "white" => "\x1b[37m",
        _ => "\x1b[0m",
    }
}

const RESET: &str = "\x1b[0m";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn entries(config: &DemoConfig) -> Vec<(String, String)> {
    let mut entries = vec![
        ("name".to_string(), config.name.clone()),
        ("verbose".to_string(), config.verbose.to_string()),
        ("server.host".to_string(), config.server.host.clone()),
        ("server.port".to_string(), config.server.port.to_string()),
        (
            "server.max_connections".to_string(),
            config.server.max_connections.to_string(),
        ),
        ("display.color".to_string(), config.display.color.clone()),
        ("display.format".to_string(), config.display.format.clone()),
    ];
    for (i, upstream) in config.upstreams.iter().enumerate() {
        entries.push((
            format!("upstreams[{i}]"),
            format!("{} (weight {})", upstream.url, upstream.weight),
        ));
    }
    entries
}

fn echo_all(config: &DemoConfig) {
    let color = ansi_color_code(&config.display.color);

    if config.verbose {
        println!(
            "{color}[verbose] Resolved configuration for {:?}{RESET}",
            config.name
        );
        println!();
    }

    let entries = entries(config);
    if config.display.format == "plain" {
        for (key, value) in &entries {
            println!("{key}={value}");
        }
    } else {
        let max_key_len = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in &entries {
            println!("{color}{key:<max_key_len$}{RESET}  {value}");
        }
    }
}

fn echo_key(config: &DemoConfig, key: &str) {
    let color = ansi_color_code(&config.display.color);
    match entries(config).into_iter().find(|(k, _)| k == key) {
        Some((key, value)) => println!("{color}{key}{RESET}  {value}"),
        None => {
            eprintln!("Unknown key: {key}");
            std::process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Echo { key, flags } => {
            let config = make_builder(&cli, flags).load().unwrap_or_else(|e| {
                eprintln!("Failed to load config:\n{e}");
                std::process::exit(1);
            });
            match key {
                Some(k) => echo_key(&config, k),
                None => echo_all(&config),
            }
        }
        Commands::Config(args) => {
            let action = args.clone().into_action();
            make_builder(&cli, &[])
                .handle_and_print(&action)
                .unwrap_or_else(|e| {
                    eprintln!("Config error:\n{e}");
                    std::process::exit(1);
                });
        }
    }
}
