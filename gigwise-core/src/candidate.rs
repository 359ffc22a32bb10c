//! Candidate items eligible for ranking in one request.
//!
//! Candidates are transient: the caller constructs them fresh per request
//! from already-filtered storage queries, with source categories and
//! location flags precomputed. The ranking engine never queries storage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of entity a candidate represents.
///
/// # Examples
/// ```
/// use gigwise_core::EntityType;
///
/// assert_eq!(EntityType::Event.as_str(), "event");
/// assert_eq!(EntityType::Venue.to_string(), "venue");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// A dated happening at a venue.
    Event,
    /// A performer or group.
    Artist,
    /// A place that hosts events.
    Venue,
}

impl EntityType {
    /// Return the entity type as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Artist => "artist",
            Self::Venue => "venue",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an [`EntityType`] from a string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown entity type: {0}")]
pub struct EntityTypeParseError(pub String);

impl FromStr for EntityType {
    type Err = EntityTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(Self::Event),
            "artist" => Ok(Self::Artist),
            "venue" => Ok(Self::Venue),
            other => Err(EntityTypeParseError(other.to_owned())),
        }
    }
}

/// Origin bucket a candidate was recalled from.
///
/// Used by the diversity pass to keep any single recall source from
/// monopolising the head of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    /// Recalled because the viewer follows the venue or artist.
    Follow,
    /// Recalled from global trending signals.
    Trending,
    /// Recalled by proximity to the viewer.
    Nearby,
}

impl SourceCategory {
    /// Return the category as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Trending => "trending",
            Self::Nearby => "nearby",
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single item eligible for ranking.
///
/// # Examples
/// ```
/// use gigwise_core::{Candidate, EntityType};
///
/// let candidate = Candidate::new(EntityType::Event, "smoke-jazz-night", "Smoke Jazz Night")
///     .with_venue("village-vanguard")
///     .with_tags(["jazz", "live"]);
/// assert_eq!(candidate.key().as_deref(), Some("event:smoke-jazz-night"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable identifier within the entity type; may be empty for
    /// not-yet-persisted items, which are then unkeyed.
    pub slug: String,
    /// Display title; participates in text matching.
    pub title: String,
    /// Kind of entity.
    pub entity: EntityType,
    /// Hosting venue, when known.
    pub venue_slug: Option<String>,
    /// Performing artists, when known.
    pub artist_slugs: Vec<String>,
    /// Free-form tags (genres, scene labels).
    pub tags: Vec<String>,
    /// The single tag used for consecutive-run diversity checks.
    pub primary_tag: Option<String>,
    /// Whether the item carries a resolvable location.
    pub has_location: bool,
    /// Recall source, when known.
    pub source_category: Option<SourceCategory>,
    /// Event start time; `None` for undated entities.
    pub start_at: Option<DateTime<Utc>>,
    /// Flagged upstream as deliberately under-exposed content.
    pub is_exploration_candidate: bool,
}

impl Candidate {
    /// Construct a minimal candidate.
    #[must_use]
    pub fn new(entity: EntityType, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            entity,
            venue_slug: None,
            artist_slugs: Vec::new(),
            tags: Vec::new(),
            primary_tag: None,
            has_location: false,
            source_category: None,
            start_at: None,
            is_exploration_candidate: false,
        }
    }

    /// Set the hosting venue while returning `self` for chaining.
    #[must_use]
    pub fn with_venue(mut self, venue_slug: impl Into<String>) -> Self {
        self.venue_slug = Some(venue_slug.into());
        self
    }

    /// Set the performing artists.
    #[must_use]
    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artist_slugs = artists.into_iter().map(Into::into).collect();
        self
    }

    /// Set the free-form tags. The first tag becomes the primary tag unless
    /// one was set explicitly.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        if self.primary_tag.is_none() {
            self.primary_tag = self.tags.first().cloned();
        }
        self
    }

    /// Set the primary tag used by diversity checks.
    #[must_use]
    pub fn with_primary_tag(mut self, tag: impl Into<String>) -> Self {
        self.primary_tag = Some(tag.into());
        self
    }

    /// Mark the candidate as carrying a resolvable location.
    #[must_use]
    pub fn with_location(mut self) -> Self {
        self.has_location = true;
        self
    }

    /// Set the recall source category.
    #[must_use]
    pub fn with_source(mut self, source: SourceCategory) -> Self {
        self.source_category = Some(source);
        self
    }

    /// Set the event start time.
    #[must_use]
    pub fn with_start_at(mut self, start_at: DateTime<Utc>) -> Self {
        self.start_at = Some(start_at);
        self
    }

    /// Flag the candidate as exploration-eligible.
    #[must_use]
    pub fn exploration_candidate(mut self) -> Self {
        self.is_exploration_candidate = true;
        self
    }

    /// Stable `{entity}:{slug}` key, or `None` when the slug is empty.
    ///
    /// Unkeyed candidates are never hidden and never deduplicated.
    #[must_use]
    pub fn key(&self) -> Option<String> {
        if self.slug.trim().is_empty() {
            return None;
        }
        Some(format!("{}:{}", self.entity.as_str(), self.slug))
    }

    /// Lowercased title and tags, used for term matching.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut text = self.title.to_lowercase();
        for tag in &self.tags {
            text.push(' ');
            text.push_str(&tag.to_lowercase());
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("event", Ok(EntityType::Event))]
    #[case("artist", Ok(EntityType::Artist))]
    #[case("venue", Ok(EntityType::Venue))]
    #[case("Event", Err(()))]
    #[case("", Err(()))]
    fn entity_type_round_trip(#[case] input: &str, #[case] expected: Result<EntityType, ()>) {
        match expected {
            Ok(entity) => {
                assert_eq!(input.parse::<EntityType>(), Ok(entity));
                assert_eq!(entity.as_str(), input);
            }
            Err(()) => assert!(input.parse::<EntityType>().is_err()),
        }
    }

    #[rstest]
    fn empty_slug_yields_no_key() {
        let candidate = Candidate::new(EntityType::Event, "", "Untitled");
        assert!(candidate.key().is_none());
        let blank = Candidate::new(EntityType::Event, "   ", "Untitled");
        assert!(blank.key().is_none());
    }

    #[rstest]
    fn tags_seed_primary_tag() {
        let candidate =
            Candidate::new(EntityType::Event, "a", "A").with_tags(["jazz", "late-night"]);
        assert_eq!(candidate.primary_tag.as_deref(), Some("jazz"));

        let explicit = Candidate::new(EntityType::Event, "b", "B")
            .with_primary_tag("metal")
            .with_tags(["jazz"]);
        assert_eq!(explicit.primary_tag.as_deref(), Some("metal"));
    }

    #[rstest]
    fn search_text_lowercases_title_and_tags() {
        let candidate =
            Candidate::new(EntityType::Event, "a", "Smoke Jazz NIGHT").with_tags(["Jazz"]);
        assert_eq!(candidate.search_text(), "smoke jazz night jazz");
    }
}
