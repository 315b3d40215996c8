//! In-memory library: books by key, user shelves and the computed views

use crate::error::{LibraryError, LibraryResult};
use lectern_core::{Book, BookKey, Event, Shelf, Timestamp};
use lectern_store::StateStore;
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Direction for reordering a pinned book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMove {
    Up,
    Down,
}

/// Outcome of merging a scan into the index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub added: Vec<BookKey>,
    pub updated: Vec<BookKey>,
    pub unchanged: usize,
}

impl MergeReport {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty()
    }
}

/// Owns every known book and the user shelf list.
///
/// Mutations queue library events; the owner drains them with
/// [`LibraryIndex::drain_events`] and publishes them.
#[derive(Debug, Default)]
pub struct LibraryIndex {
    books: BTreeMap<BookKey, Book>,
    shelves: BTreeSet<String>,
    events: Vec<Event>,
}

fn title_order(a: &Book, b: &Book) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.key.cmp(&b.key))
}

/// Most recent first; never-played books last, by title
fn recency_order(a: &Book, b: &Book) -> Ordering {
    match (a.last_played, b.last_played) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| title_order(a, b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => title_order(a, b),
    }
}

fn pin_order(a: &Book, b: &Book) -> Ordering {
    a.pin_order
        .cmp(&b.pin_order)
        .then_with(|| title_order(a, b))
}

fn validate_shelf_name(name: &str) -> LibraryResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::InvalidShelfName(name.to_string()));
    }
    if Shelf::is_reserved_name(trimmed) {
        return Err(LibraryError::VirtualShelf(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds an index from persisted parts. Memberships naming unknown
    /// shelves recreate those shelves; pin orders are renumbered.
    pub fn from_parts(books: Vec<Book>, shelves: Vec<String>) -> Self {
        let mut index = Self::new();
        for name in shelves {
            match validate_shelf_name(&name) {
                Ok(name) => {
                    index.shelves.insert(name);
                }
                Err(e) => warn!("Dropping stored shelf: {}", e),
            }
        }
        for mut book in books {
            book.shelves.retain(|s| validate_shelf_name(s).is_ok());
            index.shelves.extend(book.shelves.iter().cloned());
            if book.pinned != book.pin_order.is_some() {
                book.pinned = true;
                book.pin_order = Some(u32::MAX);
            }
            index.books.insert(book.key.clone(), book);
        }
        index.compact_pins();
        index
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, key: &BookKey) -> Option<&Book> {
        self.books.get(key)
    }

    /// All books in key order
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// User shelf names, sorted
    pub fn shelves(&self) -> impl Iterator<Item = &str> {
        self.shelves.iter().map(String::as_str)
    }

    pub fn has_shelf(&self, name: &str) -> bool {
        self.shelves.contains(name)
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn book_mut(&mut self, key: &BookKey) -> LibraryResult<&mut Book> {
        self.books
            .get_mut(key)
            .ok_or_else(|| LibraryError::BookNotFound(key.clone()))
    }

    /// Folds freshly scanned books into the index.
    ///
    /// Known books only take the scanned title, file list and chapters;
    /// shelves, pins, finished and last-played are left alone. Books missing
    /// from the scan stay in the index.
    pub fn merge(&mut self, scanned: Vec<Book>) -> MergeReport {
        let mut report = MergeReport::default();

        for fresh in scanned {
            match self.books.get_mut(&fresh.key) {
                Some(existing) => {
                    let changed = existing.title != fresh.title
                        || existing.kind != fresh.kind
                        || existing.files != fresh.files
                        || existing.chapters != fresh.chapters;
                    if changed {
                        existing.title = fresh.title;
                        existing.kind = fresh.kind;
                        existing.files = fresh.files;
                        existing.chapters = fresh.chapters;
                        self.events.push(Event::BookUpdated {
                            key: existing.key.clone(),
                        });
                        report.updated.push(existing.key.clone());
                    } else {
                        report.unchanged += 1;
                    }
                }
                None => {
                    self.events.push(Event::BookAdded {
                        key: fresh.key.clone(),
                        title: fresh.title.clone(),
                    });
                    report.added.push(fresh.key.clone());
                    self.books.insert(fresh.key.clone(), fresh);
                }
            }
        }

        info!(
            "Merged scan: {} added, {} updated, {} unchanged",
            report.added.len(),
            report.updated.len(),
            report.unchanged
        );
        report
    }

    /// Copies finished and last-played from each book's session record.
    /// Returns how many books changed.
    pub fn hydrate(&mut self, store: &dyn StateStore) -> usize {
        let mut changed = 0;
        for book in self.books.values_mut() {
            let state = match store.load(&book.locator()) {
                Ok(Some(state)) => state,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Could not read session for '{}': {}", book.title, e);
                    continue;
                }
            };

            if book.finished != state.finished || book.last_played != state.last_played {
                book.finished = state.finished;
                book.last_played = state.last_played;
                self.events.push(Event::BookUpdated {
                    key: book.key.clone(),
                });
                changed += 1;
            }
        }
        debug!("Hydrated {} books from session records", changed);
        changed
    }

    /// Drops a book from the library. Media and session record stay on disk.
    pub fn remove(&mut self, key: &BookKey) -> LibraryResult<Book> {
        let book = self
            .books
            .remove(key)
            .ok_or_else(|| LibraryError::BookNotFound(key.clone()))?;
        if book.pinned {
            self.compact_pins();
        }
        self.events.push(Event::BookRemoved { key: key.clone() });
        Ok(book)
    }

    // Shelves

    pub fn create_shelf(&mut self, name: &str) -> LibraryResult<()> {
        let name = validate_shelf_name(name)?;
        if self.shelves.contains(&name) {
            return Err(LibraryError::ShelfExists(name));
        }
        self.shelves.insert(name.clone());
        self.events.push(Event::ShelfCreated { name });
        Ok(())
    }

    pub fn rename_shelf(&mut self, old: &str, new: &str) -> LibraryResult<()> {
        let old = old.trim();
        if Shelf::is_reserved_name(old) {
            return Err(LibraryError::VirtualShelf(old.to_string()));
        }
        if !self.shelves.contains(old) {
            return Err(LibraryError::ShelfNotFound(old.to_string()));
        }
        let new = validate_shelf_name(new)?;
        if new == old {
            return Ok(());
        }
        if self.shelves.contains(&new) {
            return Err(LibraryError::ShelfExists(new));
        }

        self.shelves.remove(old);
        self.shelves.insert(new.clone());
        for book in self.books.values_mut() {
            if book.shelves.remove(old) {
                book.shelves.insert(new.clone());
            }
        }
        self.events.push(Event::ShelfRenamed {
            from: old.to_string(),
            to: new,
        });
        Ok(())
    }

    /// Deletes a shelf and every membership in it. Books stay.
    pub fn remove_shelf(&mut self, name: &str) -> LibraryResult<()> {
        let name = name.trim();
        if Shelf::is_reserved_name(name) {
            return Err(LibraryError::VirtualShelf(name.to_string()));
        }
        if !self.shelves.remove(name) {
            return Err(LibraryError::ShelfNotFound(name.to_string()));
        }
        for book in self.books.values_mut() {
            book.shelves.remove(name);
        }
        self.events.push(Event::ShelfRemoved {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Puts a book on a user shelf, creating the shelf if needed.
    /// Returns false if the book was already on it.
    pub fn assign_shelf(&mut self, key: &BookKey, shelf: &Shelf) -> LibraryResult<bool> {
        let name = match shelf {
            Shelf::User(name) => validate_shelf_name(name)?,
            virtual_shelf => return Err(LibraryError::VirtualShelf(virtual_shelf.to_string())),
        };
        if !self.books.contains_key(key) {
            return Err(LibraryError::BookNotFound(key.clone()));
        }

        if self.shelves.insert(name.clone()) {
            self.events.push(Event::ShelfCreated { name: name.clone() });
        }
        let book = self.book_mut(key)?;
        if !book.shelves.insert(name.clone()) {
            return Ok(false);
        }
        self.events.push(Event::ShelfAssigned {
            key: key.clone(),
            shelf: name,
        });
        Ok(true)
    }

    pub fn unassign_shelf(&mut self, key: &BookKey, name: &str) -> LibraryResult<bool> {
        let name = name.trim();
        if Shelf::is_reserved_name(name) {
            return Err(LibraryError::VirtualShelf(name.to_string()));
        }
        let book = self.book_mut(key)?;
        if !book.shelves.remove(name) {
            return Ok(false);
        }
        self.events.push(Event::ShelfUnassigned {
            key: key.clone(),
            shelf: name.to_string(),
        });
        Ok(true)
    }

    // Views

    /// Books on a shelf in that shelf's display order
    pub fn list_by_shelf(&self, shelf: &Shelf) -> LibraryResult<Vec<&Book>> {
        let mut books: Vec<&Book> = match shelf {
            Shelf::User(name) => {
                if !self.shelves.contains(name.as_str()) {
                    return Err(LibraryError::ShelfNotFound(name.clone()));
                }
                self.books.values().filter(|b| b.is_on_shelf(name)).collect()
            }
            Shelf::Pinned => self.books.values().filter(|b| b.pinned).collect(),
            Shelf::Finished => self.books.values().filter(|b| b.finished).collect(),
            Shelf::AllBooks => self.books.values().collect(),
        };

        match shelf {
            Shelf::User(_) | Shelf::Finished => books.sort_by(|a, b| title_order(a, b)),
            Shelf::Pinned => books.sort_by(|a, b| pin_order(a, b)),
            Shelf::AllBooks => books.sort_by(|a, b| recency_order(a, b)),
        }
        Ok(books)
    }

    /// Played books, most recent first
    pub fn history(&self, limit: usize) -> Vec<&Book> {
        let mut played: Vec<&Book> = self.books.values().filter(|b| b.has_played()).collect();
        played.sort_by(|a, b| recency_order(a, b));
        played.truncate(limit);
        played
    }

    /// Case-insensitive title match. An empty query matches every book.
    pub fn search<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Book> + 'a {
        let needle = query.trim().to_lowercase();
        self.books
            .values()
            .filter(move |b| needle.is_empty() || b.title.to_lowercase().contains(&needle))
    }

    // Flags

    /// Pins a book at the end of the pin order. No-op if already pinned.
    pub fn pin(&mut self, key: &BookKey) -> LibraryResult<()> {
        let next = self
            .books
            .values()
            .filter_map(|b| b.pin_order)
            .max()
            .map_or(0, |max| max + 1);
        let book = self.book_mut(key)?;
        if book.pinned {
            return Ok(());
        }
        book.pinned = true;
        book.pin_order = Some(next);
        self.events.push(Event::PinChanged {
            key: key.clone(),
            pinned: true,
        });
        Ok(())
    }

    pub fn unpin(&mut self, key: &BookKey) -> LibraryResult<()> {
        let book = self.book_mut(key)?;
        if !book.pinned {
            return Ok(());
        }
        book.pinned = false;
        book.pin_order = None;
        self.compact_pins();
        self.events.push(Event::PinChanged {
            key: key.clone(),
            pinned: false,
        });
        Ok(())
    }

    /// Swaps a pinned book with its neighbour. Returns false at either end.
    pub fn move_pin(&mut self, key: &BookKey, direction: PinMove) -> LibraryResult<bool> {
        let pinned: Vec<BookKey> = self
            .list_by_shelf(&Shelf::Pinned)?
            .into_iter()
            .map(|b| b.key.clone())
            .collect();
        let position = match pinned.iter().position(|k| k == key) {
            Some(position) => position,
            None if self.books.contains_key(key) => {
                return Err(LibraryError::NotPinned(key.clone()))
            }
            None => return Err(LibraryError::BookNotFound(key.clone())),
        };

        let neighbour = match direction {
            PinMove::Up if position > 0 => position - 1,
            PinMove::Down if position + 1 < pinned.len() => position + 1,
            _ => return Ok(false),
        };

        let mine = self.book_mut(key)?.pin_order;
        let theirs = self.book_mut(&pinned[neighbour])?.pin_order;
        self.book_mut(key)?.pin_order = theirs;
        self.book_mut(&pinned[neighbour])?.pin_order = mine;
        self.compact_pins();
        self.events.push(Event::BookUpdated { key: key.clone() });
        Ok(true)
    }

    /// Renumbers pin orders to 0..n keeping their relative order
    fn compact_pins(&mut self) {
        let mut pinned: Vec<(Option<u32>, String, BookKey)> = self
            .books
            .values()
            .filter(|b| b.pinned)
            .map(|b| (b.pin_order, b.title.to_lowercase(), b.key.clone()))
            .collect();
        pinned.sort();
        for (order, (_, _, key)) in pinned.into_iter().enumerate() {
            if let Some(book) = self.books.get_mut(&key) {
                book.pin_order = Some(order as u32);
            }
        }
    }

    pub fn set_finished(&mut self, key: &BookKey, finished: bool) -> LibraryResult<()> {
        let book = self.book_mut(key)?;
        if book.finished == finished {
            return Ok(());
        }
        book.finished = finished;
        self.events.push(Event::FinishedChanged {
            key: key.clone(),
            finished,
        });
        Ok(())
    }

    pub fn record_played(&mut self, key: &BookKey, at: Timestamp) -> LibraryResult<()> {
        let book = self.book_mut(key)?;
        book.last_played = Some(at);
        self.events.push(Event::BookUpdated { key: key.clone() });
        Ok(())
    }
}
