use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use reconmap::handlers::*;
use reconmap_core::print_banner;

mod commands;

fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    let level = if chosen_command.get_flag("verbose") {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // Keep stdout clean when it carries JSON
    if !quiet && !writes_machine_output(&chosen_command) {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    if let Err(e) = run(&chosen_command) {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

fn writes_machine_output(matches: &ArgMatches) -> bool {
    match matches.subcommand() {
        Some(("sitemap", sub)) => {
            sub.get_one::<String>("format").map(String::as_str) == Some("json")
                && sub.get_one::<std::path::PathBuf>("output").is_none()
        }
        Some(("graph", sub)) => sub.get_one::<std::path::PathBuf>("output").is_none(),
        _ => false,
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let raw_db_path = matches
        .get_one::<String>("db")
        .map(String::as_str)
        .unwrap_or("~/.config/reconmap/reconmap.db");
    let db_path = resolve_db_path(raw_db_path);

    if let Some(("init", primary_command)) = matches.subcommand() {
        return handle_init(&db_path, primary_command);
    }

    let db = open_database(&db_path)?;

    match matches.subcommand() {
        Some(("target", primary_command)) => match primary_command.subcommand() {
            Some(("create", secondary_command)) => handle_target_create(&db, secondary_command),
            Some(("list", _)) => handle_target_list(&db),
            Some(("remove", secondary_command)) => handle_target_remove(&db, secondary_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("log", primary_command)) => match primary_command.subcommand() {
            Some(("add", secondary_command)) => handle_log_add(&db, secondary_command),
            Some(("import", secondary_command)) => handle_log_import(&db, secondary_command),
            Some(("list", secondary_command)) => handle_log_list(&db, secondary_command),
            Some(("favorite", secondary_command)) => handle_log_favorite(&db, secondary_command),
            Some(("remove", secondary_command)) => handle_log_remove(&db, secondary_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("manual", primary_command)) => match primary_command.subcommand() {
            Some(("add", secondary_command)) => handle_manual_add(&db, secondary_command),
            Some(("list", secondary_command)) => handle_manual_list(&db, secondary_command),
            Some(("notes", secondary_command)) => handle_manual_notes(&db, secondary_command),
            Some(("remove", secondary_command)) => handle_manual_remove(&db, secondary_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("page", primary_command)) => match primary_command.subcommand() {
            Some(("start", secondary_command)) => handle_page_start(&db, secondary_command),
            Some(("end", secondary_command)) => handle_page_end(&db, secondary_command),
            Some(("list", secondary_command)) => handle_page_list(&db, secondary_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("sitemap", primary_command)) => handle_sitemap(&db, primary_command),
        Some(("graph", primary_command)) => handle_graph(&db, primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
