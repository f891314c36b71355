//! Cassette deck: the cassette a viewer is currently playing.
//!
//! A replacement is decoded off to the side and swapped in only once it is
//! complete, so readers always see either the old cassette or the new one.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use log::{info, warn};

use super::player::Cassette;
use crate::cancel::CancelToken;
use crate::error::Result;

/// Holder of the active cassette, shareable across threads.
#[derive(Debug)]
pub struct CassetteDeck {
    active: RwLock<Arc<Cassette>>,
}

impl Default for CassetteDeck {
    fn default() -> Self {
        Self::new()
    }
}

impl CassetteDeck {
    /// Deck holding the blank cassette.
    pub fn new() -> Self {
        Self {
            active: RwLock::new(Arc::new(Cassette::blank())),
        }
    }

    /// Snapshot of the active cassette.
    ///
    /// The snapshot stays valid even if another cassette is loaded later.
    pub fn cassette(&self) -> Arc<Cassette> {
        let guard = self.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Make `cassette` the active one, returning the previous cassette.
    pub fn insert(&self, cassette: Cassette) -> Arc<Cassette> {
        self.swap(Arc::new(cassette))
    }

    fn swap(&self, cassette: Arc<Cassette>) -> Arc<Cassette> {
        let mut guard = self.active.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, cassette)
    }

    /// Replace the active cassette with the blank one.
    pub fn eject(&self) -> Arc<Cassette> {
        self.insert(Cassette::blank())
    }

    /// Decode a cassette from `reader` and make it active.
    ///
    /// On any error, including cancellation, the previous cassette stays
    /// active and untouched.
    pub fn load<R: Read>(&self, reader: R, cancel: &CancelToken) -> Result<Arc<Cassette>> {
        match Cassette::read_with_cancel(reader, cancel) {
            Ok(cassette) => {
                let loaded = Arc::new(cassette);
                self.swap(Arc::clone(&loaded));
                info!(
                    "Deck loaded {:?} ({} frames)",
                    loaded.title(),
                    loaded.frame_count()
                );
                Ok(loaded)
            }
            Err(e) => {
                warn!("Load failed, keeping current cassette: {}", e);
                Err(e)
            }
        }
    }

    /// Open a cassette file and make it active.
    pub fn load_file<P: AsRef<Path>>(&self, path: P, cancel: &CancelToken) -> Result<Arc<Cassette>> {
        let file = File::open(path)?;
        self.load(BufReader::new(file), cancel)
    }
}
