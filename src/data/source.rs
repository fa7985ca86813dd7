//! Paged access to a game library, wherever it lives.

use tracing::debug;

use super::Game;
use crate::error::Result;

/// Number of records requested per page
pub const PAGE_SIZE: usize = 500;

/// A library that can be read in offset/limit pages
pub trait GameSource {
    /// Human-readable origin, for logs
    fn describe(&self) -> String;

    /// Fetch up to `limit` games starting at `offset`, in a stable order
    fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Game>>;
}

/// Read every page until the source returns a short one
pub fn fetch_all(source: &dyn GameSource, page_size: usize) -> Result<Vec<Game>> {
    let page_size = page_size.max(1);
    let mut games = Vec::new();
    let mut offset = 0;

    loop {
        let page = source.fetch_page(offset, page_size)?;
        let fetched = page.len();
        debug!(offset, fetched, "Fetched page from {}", source.describe());

        games.extend(page);
        if fetched < page_size {
            break;
        }
        offset += fetched;
    }

    Ok(games)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::Error;

    /// In-memory source that records the pages it was asked for
    pub(crate) struct VecSource {
        pub games: Vec<Game>,
        pub requests: RefCell<Vec<(usize, usize)>>,
    }

    impl VecSource {
        pub(crate) fn new(games: Vec<Game>) -> Self {
            VecSource {
                games,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl GameSource for VecSource {
        fn describe(&self) -> String {
            "memory".to_string()
        }

        fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Game>> {
            self.requests.borrow_mut().push((offset, limit));
            Ok(self.games.iter().skip(offset).take(limit).cloned().collect())
        }
    }

    pub(crate) fn make_games(count: usize) -> Vec<Game> {
        (0..count)
            .map(|i| Game {
                igdb_id: i as i64 + 1,
                title: format!("Game {i}"),
                ..Game::default()
            })
            .collect()
    }

    #[test]
    fn test_fetch_all_follows_pages_in_order() {
        let source = VecSource::new(make_games(7));
        let games = fetch_all(&source, 3).unwrap();

        let ids: Vec<i64> = games.iter().map(|g| g.igdb_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(*source.requests.borrow(), vec![(0, 3), (3, 3), (6, 3)]);
    }

    #[test]
    fn test_fetch_all_exact_multiple_needs_empty_page() {
        let source = VecSource::new(make_games(6));
        let games = fetch_all(&source, 3).unwrap();

        assert_eq!(games.len(), 6);
        assert_eq!(source.requests.borrow().len(), 3);
    }

    #[test]
    fn test_fetch_all_empty_library() {
        let source = VecSource::new(Vec::new());
        assert!(fetch_all(&source, PAGE_SIZE).unwrap().is_empty());
        assert_eq!(source.requests.borrow().len(), 1);
    }

    #[test]
    fn test_fetch_all_zero_page_size_still_progresses() {
        let source = VecSource::new(make_games(2));
        assert_eq!(fetch_all(&source, 0).unwrap().len(), 2);
    }

    struct FailingSource;

    impl GameSource for FailingSource {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        fn fetch_page(&self, _offset: usize, _limit: usize) -> Result<Vec<Game>> {
            Err(Error::auth("game API", "token rejected"))
        }
    }

    #[test]
    fn test_fetch_all_propagates_errors() {
        let err = fetch_all(&FailingSource, PAGE_SIZE).unwrap_err();
        assert!(err.is_auth());
    }
}
