use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dev9::{Config, Dev9Error, Framing, MemTree, RuleSet, UeventChannel, DEFAULT_RULES_PATH};

/// Replay a NUL-separated uevent dump through a rule file and print the
/// device tree it produces.
#[derive(Parser)]
#[command(name = "dev9-check", version, about)]
struct Cli {
    /// Rule files to load, in order.
    #[arg(default_value = DEFAULT_RULES_PATH)]
    rules: Vec<PathBuf>,

    /// Uevent dump to replay; standard input when omitted.
    #[arg(long)]
    events: Option<PathBuf>,

    /// Default permission bits, in octal.
    #[arg(long, value_parser = parse_mode)]
    mode: Option<u32>,

    /// Default owner.
    #[arg(long)]
    user: Option<String>,

    /// Default group for events without a SUBSYSTEM.
    #[arg(long)]
    group: Option<String>,
}

fn parse_mode(text: &str) -> Result<u32, String> {
    u32::from_str_radix(text, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| format!("'{text}' is not an octal permission mode"))
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::new();
        if let Some(user) = &self.user {
            config = config.user(user);
        }
        if let Some(group) = &self.group {
            config = config.group(group);
        }
        if let Some(mode) = self.mode {
            config = config.mode(mode);
        }
        config
    }
}

fn run(cli: &Cli) -> Result<(), Dev9Error> {
    let mut rules = RuleSet::with_config(cli.config());
    for path in &cli.rules {
        rules.load_file(path)?;
    }
    log::info!("{rules}");

    let source: Box<dyn Read> = match &cli.events {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    };
    let mut channel = UeventChannel::new(source, Framing::Stream);
    let mut tree = MemTree::new();
    let status = channel.pump(&rules, &mut tree)?;

    print!("{tree}");
    println!(
        "{} events, {} nodes, {}",
        status.events,
        tree.len() - 1,
        rules
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dev9-check: {err}");
            ExitCode::FAILURE
        }
    }
}
