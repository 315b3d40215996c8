use anyhow::{bail, Context as _, Result};
use console::style;
use lectern_config::{Config, ConfigManager};
use lectern_core::{format_clock, Book, BookKey, Shelf, Timestamp};
use lectern_library::LibraryManager;
use lectern_store::{sidecar_path, SidecarStore, StateStore};
use std::path::PathBuf;

/// Everything a command needs: the loaded config, the library and the
/// sidecar store
pub struct Context {
    pub config: Config,
    pub manager: ConfigManager,
    pub library: LibraryManager,
    pub store: SidecarStore,
}

impl Context {
    pub fn open(manager: ConfigManager) -> Result<Self> {
        let config = manager.load_or_default();
        let data_dir = manager
            .ensure_data_dir(&config.app)
            .context("Failed to create data directory")?;
        let library = LibraryManager::open(&config.library, &data_dir);

        Ok(Self {
            config,
            manager,
            library,
            store: SidecarStore::new(),
        })
    }

    fn save(&mut self) -> Result<()> {
        for event in self.library.drain_events() {
            log::debug!("{:?}", event);
        }
        self.library
            .save_catalog()
            .context("Failed to save library catalog")
    }

    /// Finds a book by full key or unique key prefix
    pub fn resolve(&self, key_or_prefix: &str) -> Result<BookKey> {
        let wanted = key_or_prefix.trim().to_lowercase();
        if wanted.is_empty() {
            bail!("Book key is required");
        }

        let mut matches = self
            .library
            .index()
            .books()
            .filter(|b| b.key.as_str().starts_with(&wanted))
            .map(|b| b.key.clone());

        match (matches.next(), matches.next()) {
            (Some(key), None) => Ok(key),
            (None, _) => bail!("No book matches '{}'", key_or_prefix),
            (Some(_), Some(_)) => bail!("'{}' matches more than one book", key_or_prefix),
        }
    }

    fn book(&self, key: &BookKey) -> Result<&Book> {
        self.library
            .index()
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("Book not found: {}", key))
    }
}

/// Scan library roots, optionally adding new ones to the config first
pub fn scan(ctx: &mut Context, new_roots: &[PathBuf]) -> Result<()> {
    for root in new_roots {
        if !root.exists() {
            bail!("Path not found: {}", root.display());
        }
        if ctx.library.add_root(root.clone()) {
            ctx.config.library.library_paths.push(root.clone());
        }
    }
    if !new_roots.is_empty() {
        ctx.manager
            .save(&ctx.config)
            .context("Failed to save library paths")?;
    }

    if ctx.library.roots().is_empty() {
        println!("No library paths configured. Run 'scan <PATH>' to add one.");
        return Ok(());
    }

    let report = ctx.library.rescan();
    let hydrated = ctx.library.hydrate(&ctx.store);
    ctx.save()?;

    println!(
        "{} Scan complete: {} added, {} updated, {} unchanged",
        style("✓").green().bold(),
        style(report.added.len()).bold(),
        report.updated.len(),
        report.unchanged
    );
    log::debug!("Refreshed {} books from session records", hydrated);
    Ok(())
}

/// List the books on a shelf (All Books by default)
pub fn list_books(ctx: &Context, shelf: Option<&str>) -> Result<()> {
    let shelf = shelf.map(Shelf::parse).unwrap_or(Shelf::AllBooks);
    let books = ctx
        .library
        .index()
        .list_by_shelf(&shelf)
        .context("Failed to list books")?;

    if books.is_empty() {
        println!("No books on '{}'.", shelf);
        return Ok(());
    }

    println!("\n{} {}", style(books.len()).bold().cyan(), style(&shelf).bold());
    println!("{}", "=".repeat(80));
    for book in books {
        print_book_summary(book);
    }
    Ok(())
}

pub fn search_books(ctx: &Context, query: &str) -> Result<()> {
    let mut results: Vec<&Book> = ctx.library.index().search(query).collect();
    results.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));

    if results.is_empty() {
        println!("No books found matching '{}'", query);
        return Ok(());
    }

    println!(
        "\n{} Search Results for '{}'",
        style(results.len()).bold().cyan(),
        query
    );
    println!("{}", "=".repeat(80));
    for book in results {
        print_book_summary(book);
    }
    Ok(())
}

/// Recently played books, newest first
pub fn show_history(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(ctx.config.app.history_limit);
    let books = ctx.library.index().history(limit);

    if books.is_empty() {
        println!("Nothing played yet.");
        return Ok(());
    }

    let now = Timestamp::now();
    println!("\n{}", style("Recently Played").bold().cyan());
    println!("{}", "=".repeat(80));
    for book in books {
        let when = book
            .last_played
            .map(|t| format_age(now.secs_since(t)))
            .unwrap_or_default();
        println!("{}  {}", style(&book.title).bold(), style(when).dim());
    }
    Ok(())
}

/// Detailed view of one book, including its saved session
pub fn show_book_info(ctx: &Context, key: &str) -> Result<()> {
    let key = ctx.resolve(key)?;
    let book = ctx.book(&key)?;

    println!("\n{}", style("Book Information").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("Key: {}", book.key);
    println!("Title: {}", style(&book.title).bold());
    println!("Root: {}", book.root.display());
    println!("Duration: {}", describe_duration(book));

    println!("\nFiles:");
    for file in &book.files {
        let duration = file.duration.map(format_clock).unwrap_or_else(|| "?".into());
        println!("  {} ({})", file.path.display(), duration);
    }

    if !book.chapters.is_empty() {
        println!("\nChapters:");
        for chapter in &book.chapters {
            println!("  {}  {}", format_clock(chapter.start), chapter.title);
        }
    }

    if !book.shelves.is_empty() {
        let shelves: Vec<&str> = book.shelves.iter().map(String::as_str).collect();
        println!("\nShelves: {}", shelves.join(", "));
    }
    Ok(())
}

/// Print the saved session record of a book as JSON
pub fn show_state(ctx: &Context, key: &str) -> Result<()> {
    let key = ctx.resolve(key)?;
    let locator = ctx.book(&key)?.locator();

    match ctx
        .store
        .load(&locator)
        .context("Failed to read session record")?
    {
        Some(state) => {
            println!("{}", style(sidecar_path(&locator).display()).dim());
            let json =
                serde_json::to_string_pretty(&state).context("Failed to encode session")?;
            println!("{}", json);
        }
        None => println!("No saved state for {}", key),
    }
    Ok(())
}

/// Forget a book. Its media and session record stay on disk.
pub fn remove_book(ctx: &mut Context, key: &str, force: bool) -> Result<()> {
    let key = ctx.resolve(key)?;
    let title = ctx.book(&key)?.title.clone();

    if !force {
        println!("Are you sure you want to remove '{}'? (y/N)", title);
        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Removal cancelled.");
            return Ok(());
        }
    }

    ctx.library.index_mut().remove(&key)?;
    ctx.save()?;
    println!("{} Book removed: {}", style("✓").green().bold(), title);
    Ok(())
}

pub fn set_pinned(ctx: &mut Context, key: &str, pinned: bool) -> Result<()> {
    let key = ctx.resolve(key)?;
    if pinned {
        ctx.library.index_mut().pin(&key)?;
    } else {
        ctx.library.index_mut().unpin(&key)?;
    }
    ctx.save()?;

    let title = &ctx.book(&key)?.title;
    if pinned {
        println!("{} Pinned '{}'", style("✓").green().bold(), title);
    } else {
        println!("{} Unpinned '{}'", style("✓").green().bold(), title);
    }
    Ok(())
}

/// Shelf subcommands
pub enum ShelfAction<'a> {
    List,
    Create(&'a str),
    Rename(&'a str, &'a str),
    Remove(&'a str),
    Assign { key: &'a str, shelf: &'a str },
    Unassign { key: &'a str, shelf: &'a str },
}

pub fn manage_shelf(ctx: &mut Context, action: ShelfAction<'_>) -> Result<()> {
    let done = style("✓").green().bold();
    match action {
        ShelfAction::List => {
            for name in ctx.library.index().shelves() {
                let count = ctx
                    .library
                    .index()
                    .books()
                    .filter(|b| b.is_on_shelf(name))
                    .count();
                println!("{} ({})", style(name).bold(), count);
            }
            return Ok(());
        }
        ShelfAction::Create(name) => {
            ctx.library.index_mut().create_shelf(name)?;
            println!("{} Created shelf '{}'", done, name);
        }
        ShelfAction::Rename(from, to) => {
            ctx.library.index_mut().rename_shelf(from, to)?;
            println!("{} Renamed '{}' to '{}'", done, from, to);
        }
        ShelfAction::Remove(name) => {
            ctx.library.index_mut().remove_shelf(name)?;
            println!("{} Removed shelf '{}'", done, name);
        }
        ShelfAction::Assign { key, shelf } => {
            let key = ctx.resolve(key)?;
            if !ctx
                .library
                .index_mut()
                .assign_shelf(&key, &Shelf::parse(shelf))?
            {
                println!("Already on '{}'", shelf);
                return Ok(());
            }
            println!("{} Added to '{}'", done, shelf);
        }
        ShelfAction::Unassign { key, shelf } => {
            let key = ctx.resolve(key)?;
            if !ctx.library.index_mut().unassign_shelf(&key, shelf)? {
                println!("Not on '{}'", shelf);
                return Ok(());
            }
            println!("{} Removed from '{}'", done, shelf);
        }
    }
    ctx.save()
}

pub fn show_stats(ctx: &Context) -> Result<()> {
    let index = ctx.library.index();
    let total = index.len();
    let finished = index.books().filter(|b| b.finished).count();
    let pinned = index.books().filter(|b| b.pinned).count();
    let known: Vec<f64> = index.books().filter_map(Book::total_duration).collect();
    let total_secs: f64 = known.iter().sum();

    println!("\n{}", style("Library Statistics").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("Total Books: {}", style(total).bold());
    println!("Finished: {}", style(finished).bold());
    println!("Pinned: {}", style(pinned).bold());
    println!("Shelves: {}", index.shelves().count());
    println!("Total Duration: {}", format_duration(total_secs as u64));
    if known.len() < total {
        println!("  ({} books not yet probed)", total - known.len());
    }
    Ok(())
}

/// Show where config and data live, then the effective config
pub fn show_config(ctx: &Context) -> Result<()> {
    println!("Config file: {}", ctx.manager.config_path().display());
    println!("Data directory: {}", ctx.manager.data_dir(&ctx.config.app).display());
    if ctx.manager.is_portable() {
        println!("{}", style("Portable mode").yellow());
    }
    println!();
    let text = toml::to_string_pretty(&ctx.config).context("Failed to encode config")?;
    println!("{}", text);
    Ok(())
}

fn print_book_summary(book: &Book) {
    println!("\n{}", style(&book.title).bold());
    println!(
        "  Key: {} | Duration: {} | Files: {}",
        truncate(book.key.as_str(), 8),
        describe_duration(book),
        book.files.len()
    );
    if book.pinned {
        print!("  {}", style("★ Pinned").yellow());
    }
    if book.finished {
        print!("  {}", style("Finished").green());
    }
    println!();
}

fn describe_duration(book: &Book) -> String {
    book.total_duration()
        .map(format_clock)
        .unwrap_or_else(|| "unknown".to_string())
}

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

fn format_age(secs: f64) -> String {
    let secs = secs.max(0.0) as u64;
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => plural(secs / 60, "minute"),
        3600..=86_399 => plural(secs / 3600, "hour"),
        _ => plural(secs / 86_400, "day"),
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len])
    }
}

#[cfg(test)]
mod tests;
