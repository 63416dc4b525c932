mod aggregate;
mod cli;
mod error;
mod export;
mod filter;
mod fmt;
mod loader;
mod models;
mod pages;
mod settings;
mod tui;

use std::io::IsTerminal;

use clap::Parser;

use cli::{Cli, Commands, FilterArgs, Session};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let interactive = std::io::stdout().is_terminal();
    if !interactive {
        colored::control::set_override(false);
    }

    let result = match cli.command {
        Some(Commands::Pages) => cli::page::list(),
        Some(Commands::Config { init }) => cli::config::run(init),
        command => Session::open(cli.data.as_deref()).and_then(|session| match command {
            Some(Commands::Page { page, filters }) => cli::page::run(&session, &page, &filters),
            Some(Commands::Export { filters, output }) => {
                cli::export::run(&session, &filters, output).map(|_| ())
            }
            Some(Commands::Dashboard) => cli::dashboard::run(&session),
            // Without a terminal, fall back to printing the default page.
            None if !interactive => {
                cli::page::run(&session, &session.settings.default_page, &FilterArgs::default())
            }
            _ => cli::dashboard::run(&session),
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
