use anyhow::{Context as _, Result};
use clap::{Arg, ArgMatches, Command};
use lectern_config::ConfigManager;
use std::path::PathBuf;

mod commands;

use commands::{Context, ShelfAction};

fn key_arg() -> Arg {
    Arg::new("key")
        .required(true)
        .value_name("BOOK_KEY")
        .help("Book key, or a unique prefix of it")
}

fn build_cli() -> Command {
    Command::new("lectern")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Audiobook library and listening state")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Use this config directory instead of the platform default")
                .global(true),
        )
        .subcommand(
            Command::new("scan")
                .about("Scan library paths for books")
                .arg(
                    Arg::new("paths")
                        .value_name("PATH")
                        .num_args(0..)
                        .help("Directories to add to the library before scanning"),
                ),
        )
        .subcommand(
            Command::new("list").about("List books on a shelf").arg(
                Arg::new("shelf")
                    .short('s')
                    .long("shelf")
                    .value_name("SHELF")
                    .help("Shelf name, or Pinned, All Books, Finished"),
            ),
        )
        .subcommand(
            Command::new("search")
                .about("Search books by title")
                .arg(Arg::new("query").required(true).value_name("QUERY").help("Search query")),
        )
        .subcommand(
            Command::new("history").about("Show recently played books").arg(
                Arg::new("limit")
                    .short('n')
                    .long("limit")
                    .value_name("N")
                    .value_parser(clap::value_parser!(usize))
                    .help("Number of books to show"),
            ),
        )
        .subcommand(
            Command::new("info")
                .about("Show detailed information about a book")
                .arg(key_arg()),
        )
        .subcommand(
            Command::new("shelf")
                .about("Manage shelves")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List user shelves"))
                .subcommand(
                    Command::new("create")
                        .about("Create a shelf")
                        .arg(Arg::new("name").required(true).value_name("NAME")),
                )
                .subcommand(
                    Command::new("rename")
                        .about("Rename a shelf")
                        .arg(Arg::new("from").required(true).value_name("OLD"))
                        .arg(Arg::new("to").required(true).value_name("NEW")),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Remove a shelf. Its books stay in the library.")
                        .arg(Arg::new("name").required(true).value_name("NAME")),
                )
                .subcommand(
                    Command::new("assign")
                        .about("Put a book on a shelf")
                        .arg(key_arg())
                        .arg(Arg::new("name").required(true).value_name("SHELF")),
                )
                .subcommand(
                    Command::new("unassign")
                        .about("Take a book off a shelf")
                        .arg(key_arg())
                        .arg(Arg::new("name").required(true).value_name("SHELF")),
                ),
        )
        .subcommand(Command::new("pin").about("Pin a book").arg(key_arg()))
        .subcommand(Command::new("unpin").about("Unpin a book").arg(key_arg()))
        .subcommand(
            Command::new("state")
                .about("Print the saved listening state of a book")
                .arg(key_arg()),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a book from the library")
                .arg(key_arg())
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .help("Skip confirmation prompt")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("stats").about("Show library statistics"))
        .subcommand(Command::new("config").about("Show config and data locations"))
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} is required", name))
}

fn run_shelf(ctx: &mut Context, matches: &ArgMatches) -> Result<()> {
    let action = match matches.subcommand() {
        Some(("create", sub)) => ShelfAction::Create(required(sub, "name")?),
        Some(("rename", sub)) => ShelfAction::Rename(required(sub, "from")?, required(sub, "to")?),
        Some(("remove", sub)) => ShelfAction::Remove(required(sub, "name")?),
        Some(("assign", sub)) => ShelfAction::Assign {
            key: required(sub, "key")?,
            shelf: required(sub, "name")?,
        },
        Some(("unassign", sub)) => ShelfAction::Unassign {
            key: required(sub, "key")?,
            shelf: required(sub, "name")?,
        },
        _ => ShelfAction::List,
    };
    commands::manage_shelf(ctx, action)
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let manager = match matches.get_one::<String>("config-dir") {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    }
    .context("Failed to locate config directory")?;

    let config = manager.load_or_default();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.app.log_level.to_string()),
    )
    .init();

    let mut ctx = Context::open(manager)?;

    match matches.subcommand() {
        Some(("scan", sub)) => {
            let paths: Vec<PathBuf> = sub
                .get_many::<String>("paths")
                .map(|values| values.map(PathBuf::from).collect())
                .unwrap_or_default();
            commands::scan(&mut ctx, &paths)
        }
        Some(("list", sub)) => {
            commands::list_books(&ctx, sub.get_one::<String>("shelf").map(String::as_str))
        }
        Some(("search", sub)) => commands::search_books(&ctx, required(sub, "query")?),
        Some(("history", sub)) => {
            commands::show_history(&ctx, sub.get_one::<usize>("limit").copied())
        }
        Some(("info", sub)) => commands::show_book_info(&ctx, required(sub, "key")?),
        Some(("shelf", sub)) => run_shelf(&mut ctx, sub),
        Some(("pin", sub)) => commands::set_pinned(&mut ctx, required(sub, "key")?, true),
        Some(("unpin", sub)) => commands::set_pinned(&mut ctx, required(sub, "key")?, false),
        Some(("state", sub)) => commands::show_state(&ctx, required(sub, "key")?),
        Some(("remove", sub)) => {
            commands::remove_book(&mut ctx, required(sub, "key")?, sub.get_flag("force"))
        }
        Some(("stats", _)) => commands::show_stats(&ctx),
        Some(("config", _)) => commands::show_config(&ctx),
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
