use super::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_book(root: &Path, name: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("01.mp3"), vec![0u8; 4096]).unwrap();
    fs::write(dir.join("02.mp3"), vec![0u8; 4096]).unwrap();
}

fn setup() -> (Context, TempDir, TempDir) {
    let config_dir = TempDir::new().unwrap();
    let media = TempDir::new().unwrap();
    write_book(media.path(), "Great Expectations");
    write_book(media.path(), "The Great Gatsby");
    write_book(media.path(), "Moby Dick");

    let manager = ConfigManager::with_directory(config_dir.path().to_path_buf()).unwrap();
    let mut config = Config::default();
    config.library.extract_metadata = false;
    manager.save(&config).unwrap();

    let mut ctx = Context::open(manager).unwrap();
    scan(&mut ctx, &[media.path().to_path_buf()]).unwrap();
    (ctx, config_dir, media)
}

fn reopen(config_dir: &TempDir) -> Context {
    let manager = ConfigManager::with_directory(config_dir.path().to_path_buf()).unwrap();
    Context::open(manager).unwrap()
}

fn key_of(ctx: &Context, title: &str) -> BookKey {
    ctx.library
        .index()
        .books()
        .find(|b| b.title == title)
        .map(|b| b.key.clone())
        .unwrap()
}

#[test]
fn test_scan_adds_books_and_remembers_the_root() {
    let (ctx, config_dir, media) = setup();
    assert_eq!(ctx.library.index().len(), 3);

    let ctx = reopen(&config_dir);
    assert_eq!(ctx.library.index().len(), 3);
    assert_eq!(ctx.config.library.library_paths, vec![media.path().to_path_buf()]);
}

#[test]
fn test_scan_rejects_missing_path() {
    let (mut ctx, _config_dir, media) = setup();
    let missing = media.path().join("nowhere");
    assert!(scan(&mut ctx, &[missing]).is_err());
}

#[test]
fn test_resolve_by_prefix() {
    let (ctx, _config_dir, _media) = setup();
    let key = key_of(&ctx, "Moby Dick");

    assert_eq!(ctx.resolve(key.as_str()).unwrap(), key);
    assert_eq!(ctx.resolve(&key.as_str()[..12]).unwrap(), key);
    assert_eq!(ctx.resolve(&key.as_str().to_uppercase()).unwrap(), key);
    assert!(ctx.resolve("").is_err());
    assert!(ctx.resolve("not-a-key").is_err());
}

#[test]
fn test_pin_persists_across_runs() {
    let (mut ctx, config_dir, _media) = setup();
    let key = key_of(&ctx, "The Great Gatsby");

    set_pinned(&mut ctx, key.as_str(), true).unwrap();

    let mut ctx = reopen(&config_dir);
    let pinned = ctx.library.index().list_by_shelf(&Shelf::Pinned).unwrap();
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned[0].key, key);

    set_pinned(&mut ctx, key.as_str(), false).unwrap();
    set_pinned(&mut ctx, key.as_str(), false).unwrap();
    assert!(ctx.library.index().list_by_shelf(&Shelf::Pinned).unwrap().is_empty());
}

#[test]
fn test_shelf_lifecycle() {
    let (mut ctx, config_dir, _media) = setup();
    let key = key_of(&ctx, "Moby Dick");

    manage_shelf(&mut ctx, ShelfAction::Create("Later")).unwrap();
    manage_shelf(
        &mut ctx,
        ShelfAction::Assign {
            key: key.as_str(),
            shelf: "Later",
        },
    )
    .unwrap();
    manage_shelf(&mut ctx, ShelfAction::Rename("Later", "Soon")).unwrap();

    let mut ctx = reopen(&config_dir);
    let soon = ctx.library.index().list_by_shelf(&Shelf::user("Soon")).unwrap();
    assert_eq!(soon.len(), 1);
    assert_eq!(soon[0].key, key);

    assert!(manage_shelf(&mut ctx, ShelfAction::Create("Finished")).is_err());
    manage_shelf(&mut ctx, ShelfAction::Remove("Soon")).unwrap();
    assert!(!ctx.library.index().has_shelf("Soon"));
    assert_eq!(ctx.library.index().len(), 3);
}

#[test]
fn test_remove_forgets_book() {
    let (mut ctx, config_dir, _media) = setup();
    let key = key_of(&ctx, "Great Expectations");

    remove_book(&mut ctx, key.as_str(), true).unwrap();

    let ctx = reopen(&config_dir);
    assert_eq!(ctx.library.index().len(), 2);
    assert!(ctx.library.index().get(&key).is_none());
}

#[test]
fn test_search_and_listing_commands_succeed() {
    let (ctx, _config_dir, _media) = setup();
    assert_eq!(ctx.library.index().search("great").count(), 2);
    assert!(search_books(&ctx, "great").is_ok());
    assert!(list_books(&ctx, None).is_ok());
    assert!(list_books(&ctx, Some("No Such Shelf")).is_err());
    assert!(show_history(&ctx, None).is_ok());
    assert!(show_stats(&ctx).is_ok());
}

#[test]
fn test_state_of_unplayed_book() {
    let (ctx, _config_dir, _media) = setup();
    let key = key_of(&ctx, "Moby Dick");
    assert!(show_state(&ctx, key.as_str()).is_ok());
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(3661), "1h 1m");
    assert_eq!(format_duration(120), "2m");
    assert_eq!(format_duration(3600), "1h 0m");
}

#[test]
fn test_format_age() {
    assert_eq!(format_age(5.0), "just now");
    assert_eq!(format_age(-3.0), "just now");
    assert_eq!(format_age(60.0), "1 minute ago");
    assert_eq!(format_age(7200.0), "2 hours ago");
    assert_eq!(format_age(3.0 * 86_400.0), "3 days ago");
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("12345678", 8), "12345678");
    assert_eq!(truncate("123456789", 8), "12345678...");
}
