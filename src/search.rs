//! Search results shared between whoever searches and whoever picks.
//!
//! A [`Publisher`] puts the latest results on a watch channel together with
//! a version that increases with every publication. A [`Selection`] lists
//! them as options and turns a chosen option into a play request. To find
//! out whether anything changed, compare versions; there is nothing to poll
//! on a timer.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    catalog::{Catalog, Request},
    error::{Error, Result},
    track::Track,
};

/// Option shown before anything was searched.
pub const NO_RESULTS: &str = "no search results";

/// One publication of search results.
#[derive(Clone, Debug, Default)]
pub struct Results {
    pub version: u64,
    pub keyword: String,
    pub tracks: Vec<Track>,
}

#[derive(Debug)]
pub struct Publisher {
    results_tx: watch::Sender<Arc<Results>>,
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher {
    #[must_use]
    pub fn new() -> Self {
        let (results_tx, _) = watch::channel(Arc::new(Results::default()));
        Self { results_tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> Selection {
        Selection::new(self.results_tx.subscribe())
    }

    /// Publishes `tracks` found for `keyword` and returns the new version.
    pub fn publish(&self, keyword: &str, tracks: Vec<Track>) -> u64 {
        let version = self.results_tx.borrow().version + 1;
        info!("{} search results for \"{keyword}\"", tracks.len());

        self.results_tx.send_replace(Arc::new(Results {
            version,
            keyword: keyword.to_owned(),
            tracks,
        }));
        version
    }

    /// Searches `catalog` for `keyword` and publishes what was found.
    ///
    /// # Errors
    ///
    /// Returns the catalog's error; nothing is published then.
    pub async fn search(&self, catalog: &dyn Catalog, keyword: &str) -> Result<u64> {
        let tracks = catalog.search(keyword).await?;
        Ok(self.publish(keyword, tracks))
    }
}

/// The options a user picks a track from.
#[derive(Debug)]
pub struct Selection {
    results_rx: watch::Receiver<Arc<Results>>,
    results: Arc<Results>,
    options: Vec<String>,
}

impl Selection {
    fn new(results_rx: watch::Receiver<Arc<Results>>) -> Self {
        let mut selection = Self {
            results_rx,
            results: Arc::new(Results::default()),
            options: vec![NO_RESULTS.to_owned()],
        };
        selection.refresh();
        selection
    }

    /// Takes the latest results if their version is newer than the one
    /// shown. Returns whether the options changed.
    pub fn refresh(&mut self) -> bool {
        let latest = Arc::clone(&self.results_rx.borrow_and_update());
        if latest.version <= self.results.version {
            return false;
        }

        self.options = if latest.tracks.is_empty() {
            vec![format!("no results for \"{}\"", latest.keyword)]
        } else {
            latest.tracks.iter().map(Track::label).collect()
        };
        self.results = latest;
        debug!("search options updated to version {}", self.results.version);
        true
    }

    /// Waits for a publication and takes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the publisher is gone.
    pub async fn changed(&mut self) -> Result<()> {
        self.results_rx
            .changed()
            .await
            .map_err(|_| Error::cancelled("search publisher has gone away"))?;
        self.refresh();
        Ok(())
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.results.version
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Turns `option` into a request that queues all results, starting at
    /// the chosen one.
    ///
    /// # Errors
    ///
    /// Returns `FailedPrecondition` for a placeholder option and `NotFound`
    /// for an option that is not listed.
    pub fn select(&self, option: &str) -> Result<Request> {
        if self.results.tracks.is_empty() {
            return Err(Error::failed_precondition(format!(
                "\"{option}\" is not a track"
            )));
        }

        let start = self
            .options
            .iter()
            .position(|candidate| candidate == option)
            .ok_or_else(|| Error::not_found(format!("no track listed as \"{option}\"")))?;

        info!("selected {}", self.results.tracks[start]);
        Ok(Request::Tracks {
            tracks: self.results.tracks.clone(),
            start,
        })
    }
}
