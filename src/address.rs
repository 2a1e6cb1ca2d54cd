//! Restorable address state
//!
//! The browsable address of the original viewer becomes a query-string
//! fragment (`slide=<id>&page=<n>`) kept in sync with viewer state. Page
//! turns use replace semantics: the entry list never grows from them, so
//! back/forward-style history is not polluted. The current fragment is
//! persisted to a JSON session file so a relaunch restores position.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One parsed address fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressFragment {
    pub slide: Option<String>,
    pub page: Option<usize>,
}

impl AddressFragment {
    /// Parse a `key=value&key=value` query string. Unknown keys are kept out
    /// of the model but survive nothing; the viewer only owns these two.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let mut fragment = Self::default();
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "slide" => fragment.slide = Some(value.to_string()),
                "page" => fragment.page = value.parse().ok(),
                _ => {}
            }
        }
        fragment
    }

    #[must_use]
    pub fn to_query(&self) -> String {
        let mut parts = Vec::new();
        if let Some(slide) = &self.slide {
            parts.push(format!("slide={slide}"));
        }
        if let Some(page) = self.page {
            parts.push(format!("page={page}"));
        }
        parts.join("&")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    query: String,
}

/// The address "bar": an entry list with a current position.
///
/// The core only ever calls [`AddressState::replace_page`], which rewrites
/// the current entry in place.
pub struct AddressState {
    entries: Vec<AddressFragment>,
    current: usize,
    session_file: Option<PathBuf>,
}

impl AddressState {
    #[must_use]
    pub fn new(initial: AddressFragment) -> Self {
        Self {
            entries: vec![initial],
            current: 0,
            session_file: None,
        }
    }

    /// Restore from the session file if it exists, else start from the given
    /// fragment. Parse failures fall back silently; the address is a
    /// convenience, never a fatal input.
    pub fn load_or_new(session_file: PathBuf, fallback: AddressFragment) -> Self {
        let restored = fs::read_to_string(&session_file)
            .ok()
            .and_then(|content| serde_json::from_str::<SessionRecord>(&content).ok())
            .map(|record| AddressFragment::parse(&record.query));

        let initial = match restored {
            Some(fragment) => {
                log::info!("restored address fragment: {}", fragment.to_query());
                fragment
            }
            None => fallback,
        };

        let mut state = Self::new(initial);
        state.session_file = Some(session_file);
        state
    }

    #[must_use]
    pub fn current(&self) -> &AddressFragment {
        &self.entries[self.current]
    }

    /// Page recorded in the current fragment, read once at startup.
    #[must_use]
    pub fn page(&self) -> Option<usize> {
        self.current().page
    }

    /// History-neutral update: rewrite the page of the current entry without
    /// appending. Persists the fragment as a side effect.
    pub fn replace_page(&mut self, page: usize) {
        self.entries[self.current].page = Some(page);
        self.persist();
    }

    /// History-appending update, for collaborators that navigate across
    /// decks. Page turns never use this.
    pub fn push(&mut self, fragment: AddressFragment) {
        self.entries.truncate(self.current + 1);
        self.entries.push(fragment);
        self.current += 1;
        self.persist();
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn persist(&self) {
        let Some(path) = &self.session_file else {
            return;
        };
        let record = SessionRecord {
            query: self.current().to_query(),
        };
        match serde_json::to_string_pretty(&record) {
            Ok(content) => {
                if let Err(e) = fs::write(path, content) {
                    log::error!("failed to persist address to {}: {e}", path.display());
                }
            }
            Err(e) => log::error!("failed to serialize address: {e}"),
        }
    }
}

/// Session file location: next to the slide folder, one per deck.
#[must_use]
pub fn session_file_for(slide_folder: &Path) -> PathBuf {
    slide_folder.join(".deckview-session.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slide_and_page() {
        let f = AddressFragment::parse("slide=001&page=4");
        assert_eq!(f.slide.as_deref(), Some("001"));
        assert_eq!(f.page, Some(4));
    }

    #[test]
    fn ignores_malformed_pairs() {
        let f = AddressFragment::parse("slide=001&page=abc&junk");
        assert_eq!(f.slide.as_deref(), Some("001"));
        assert_eq!(f.page, None);
    }

    #[test]
    fn query_round_trips() {
        let f = AddressFragment::parse("slide=003&page=12");
        assert_eq!(AddressFragment::parse(&f.to_query()), f);
    }

    #[test]
    fn replace_page_never_grows_history() {
        let mut state = AddressState::new(AddressFragment::parse("slide=001&page=1"));
        for page in 2..=20 {
            state.replace_page(page);
        }
        assert_eq!(state.entry_count(), 1);
        assert_eq!(state.page(), Some(20));
    }

    #[test]
    fn push_appends_an_entry() {
        let mut state = AddressState::new(AddressFragment::default());
        state.push(AddressFragment::parse("slide=002&page=1"));
        assert_eq!(state.entry_count(), 2);
        assert_eq!(state.current().slide.as_deref(), Some("002"));
    }

    #[test]
    fn session_file_round_trips_position() {
        let dir = tempfile::tempdir().unwrap();
        let file = session_file_for(dir.path());

        let mut state =
            AddressState::load_or_new(file.clone(), AddressFragment::parse("slide=001&page=1"));
        state.replace_page(9);
        drop(state);

        let restored = AddressState::load_or_new(file, AddressFragment::default());
        assert_eq!(restored.page(), Some(9));
        assert_eq!(restored.current().slide.as_deref(), Some("001"));
    }
}
