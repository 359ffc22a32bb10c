//! Feedback vocabulary used to update the taste model.
//!
//! The caller maps raw UI actions into this fixed vocabulary; the wire
//! strings (`click`, `save`, `follow`, `hide`, `show_less`) are part of the
//! telemetry contract and must not be renamed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candidate::EntityType;

/// A user action fed back into the taste model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    /// Viewer opened the item.
    Click,
    /// Viewer saved the item.
    Save,
    /// Viewer followed the entity.
    Follow,
    /// Viewer hid the item.
    Hide,
    /// Viewer asked to see less like this.
    ShowLess,
}

impl FeedbackAction {
    /// Return the contract wire string for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Save => "save",
            Self::Follow => "follow",
            Self::Hide => "hide",
            Self::ShowLess => "show_less",
        }
    }

    /// Whether the action expresses negative intent.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::Hide | Self::ShowLess)
    }
}

impl fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`FeedbackAction`] from a string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown feedback action: {0}")]
pub struct FeedbackActionParseError(pub String);

impl FromStr for FeedbackAction {
    type Err = FeedbackActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "click" => Ok(Self::Click),
            "save" => Ok(Self::Save),
            "follow" => Ok(Self::Follow),
            "hide" => Ok(Self::Hide),
            "show_less" => Ok(Self::ShowLess),
            other => Err(FeedbackActionParseError(other.to_owned())),
        }
    }
}

/// One feedback event against an entity, carrying the context needed to
/// update every matching taste weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    /// What the viewer did.
    pub action: FeedbackAction,
    /// Kind of entity acted on.
    pub entity: EntityType,
    /// Slug of the entity acted on, when known.
    pub slug: Option<String>,
    /// Hosting venue of the item, when known.
    pub venue_slug: Option<String>,
    /// Artists on the item.
    pub artist_slugs: Vec<String>,
    /// Tags on the item.
    pub tags: Vec<String>,
    /// When the action happened; `None` means "now" at apply time.
    pub occurred_at: Option<DateTime<Utc>>,
}

impl FeedbackEvent {
    /// Construct an event with no context beyond the action and entity.
    #[must_use]
    pub fn new(action: FeedbackAction, entity: EntityType) -> Self {
        Self {
            action,
            entity,
            slug: None,
            venue_slug: None,
            artist_slugs: Vec::new(),
            tags: Vec::new(),
            occurred_at: None,
        }
    }

    /// Set the acted-on entity slug.
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Set the hosting venue.
    #[must_use]
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue_slug = Some(venue.into());
        self
    }

    /// Set the artists.
    #[must_use]
    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artist_slugs = artists.into_iter().map(Into::into).collect();
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the action timestamp.
    #[must_use]
    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}
