//! Per-request ranking inputs: signals and viewer preferences.
//!
//! Both bundles are resolved by the caller before ranking (follow lists,
//! saved searches, view history flattened into string sets) and are
//! read-only for the engine. Missing data contributes nothing to a score;
//! it is never an error.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::taste::TasteModel;

/// Read-only signal bundle for one ranking request.
///
/// # Examples
/// ```
/// use gigwise_core::Signals;
///
/// let signals = Signals::default()
///     .with_followed_venues(["village-vanguard"])
///     .with_saved_search_tags(["jazz"]);
/// assert!(signals.followed_venues.contains("village-vanguard"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    /// Venue slugs the viewer follows.
    pub followed_venues: HashSet<String>,
    /// Artist slugs the viewer follows.
    pub followed_artists: HashSet<String>,
    /// Free-text terms from the viewer's saved searches.
    pub saved_search_terms: Vec<String>,
    /// Tags from the viewer's saved searches.
    pub saved_search_tags: HashSet<String>,
    /// Terms from recently viewed items.
    pub recent_view_terms: Vec<String>,
    /// Whether the viewer has a usable location.
    pub viewer_has_location: bool,
    /// Snapshot of the viewer's taste model, decayed by the caller.
    pub taste: TasteModel,
}

impl Signals {
    /// Add followed venue slugs while returning `self` for chaining.
    #[must_use]
    pub fn with_followed_venues<I, S>(mut self, venues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.followed_venues.extend(venues.into_iter().map(Into::into));
        self
    }

    /// Add followed artist slugs.
    #[must_use]
    pub fn with_followed_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.followed_artists
            .extend(artists.into_iter().map(Into::into));
        self
    }

    /// Add saved-search free-text terms.
    #[must_use]
    pub fn with_saved_search_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.saved_search_terms
            .extend(terms.into_iter().map(Into::into));
        self
    }

    /// Add saved-search tags.
    #[must_use]
    pub fn with_saved_search_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.saved_search_tags
            .extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add recently viewed terms.
    #[must_use]
    pub fn with_recent_view_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recent_view_terms
            .extend(terms.into_iter().map(Into::into));
        self
    }

    /// Mark the viewer as having a usable location.
    #[must_use]
    pub fn with_viewer_location(mut self) -> Self {
        self.viewer_has_location = true;
        self
    }

    /// Attach a taste model snapshot.
    #[must_use]
    pub fn with_taste(mut self, taste: TasteModel) -> Self {
        self.taste = taste;
        self
    }
}

/// Explicit viewer preferences applied at ranking time.
///
/// Hidden items are excluded before scoring; downranked slugs receive a
/// fixed negative score term but remain in the list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// `{entity}:{slug}` keys excluded from ranking output entirely.
    pub hidden_items: HashSet<String>,
    /// Venue slugs to downrank.
    pub downranked_venues: HashSet<String>,
    /// Artist slugs to downrank.
    pub downranked_artists: HashSet<String>,
    /// Tags to downrank.
    pub downranked_tags: HashSet<String>,
}

impl Preferences {
    /// Hide an item by its `{entity}:{slug}` key.
    #[must_use]
    pub fn with_hidden(mut self, key: impl Into<String>) -> Self {
        self.hidden_items.insert(key.into());
        self
    }

    /// Downrank a venue slug.
    #[must_use]
    pub fn with_downranked_venue(mut self, venue: impl Into<String>) -> Self {
        self.downranked_venues.insert(venue.into());
        self
    }

    /// Downrank an artist slug.
    #[must_use]
    pub fn with_downranked_artist(mut self, artist: impl Into<String>) -> Self {
        self.downranked_artists.insert(artist.into());
        self
    }

    /// Downrank a tag.
    #[must_use]
    pub fn with_downranked_tag(mut self, tag: impl Into<String>) -> Self {
        self.downranked_tags.insert(tag.into());
        self
    }
}
