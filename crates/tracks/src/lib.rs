use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

mod catalog;

pub use catalog::CatalogProvider;

pub const MIN_SLOT: u8 = 1;
pub const MAX_SLOT: u8 = 8;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("track service unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read catalog {path}: {source}")]
    CatalogIo { path: PathBuf, source: std::io::Error },

    #[error("malformed catalog {path}: {source}")]
    CatalogFormat { path: PathBuf, source: serde_json::Error },

    #[error("unknown track: {0}")]
    UnknownTrack(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackType {
    National,
    Supercross,
    FreeRide,
}

impl TrackType {
    pub const ALL: [TrackType; 3] = [TrackType::National, TrackType::Supercross, TrackType::FreeRide];

    pub fn label(self) -> &'static str {
        match self {
            TrackType::National => "National",
            TrackType::Supercross => "Supercross",
            TrackType::FreeRide => "FreeRide",
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// Immutable snapshot of a track as reported by the track service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub name: String,
    pub slot: u8,
    #[serde(rename = "type")]
    pub track_type: TrackType,
    pub author: String,
    pub date: String,
    #[serde(default)]
    pub installs: u32,
    #[serde(default)]
    pub my_installs: u32,
    #[serde(default)]
    pub favorite: bool,
    pub image: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TrackTypeFilter {
    #[default]
    All,
    Only(TrackType),
}

impl TrackTypeFilter {
    pub const ALL: [TrackTypeFilter; 4] = [
        TrackTypeFilter::All,
        TrackTypeFilter::Only(TrackType::National),
        TrackTypeFilter::Only(TrackType::Supercross),
        TrackTypeFilter::Only(TrackType::FreeRide),
    ];

    pub fn label(self) -> &'static str {
        match self {
            TrackTypeFilter::All => "All Track Types",
            TrackTypeFilter::Only(t) => t.label(),
        }
    }

    pub fn matches(self, track_type: TrackType) -> bool {
        match self {
            TrackTypeFilter::All => true,
            TrackTypeFilter::Only(t) => t == track_type,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SlotFilter {
    #[default]
    All,
    Slot(u8),
}

impl SlotFilter {
    pub const ALL: [SlotFilter; 9] = [
        SlotFilter::All,
        SlotFilter::Slot(1),
        SlotFilter::Slot(2),
        SlotFilter::Slot(3),
        SlotFilter::Slot(4),
        SlotFilter::Slot(5),
        SlotFilter::Slot(6),
        SlotFilter::Slot(7),
        SlotFilter::Slot(8),
    ];

    pub fn label(self) -> &'static str {
        const SLOTS: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "8"];
        match self {
            SlotFilter::All => "All Slots",
            SlotFilter::Slot(n) if (MIN_SLOT..=MAX_SLOT).contains(&n) => SLOTS[(n - 1) as usize],
            SlotFilter::Slot(_) => "?",
        }
    }

    pub fn matches(self, slot: u8) -> bool {
        match self {
            SlotFilter::All => true,
            SlotFilter::Slot(n) => n == slot,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SortBy {
    Name,
    #[default]
    Slot,
    Type,
    Author,
    DateCreated,
    Downloads,
    Favorite,
}

impl SortBy {
    pub const ALL: [SortBy; 7] = [
        SortBy::Name,
        SortBy::Slot,
        SortBy::Type,
        SortBy::Author,
        SortBy::DateCreated,
        SortBy::Downloads,
        SortBy::Favorite,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SortBy::Name => "Name",
            SortBy::Slot => "Slot",
            SortBy::Type => "Type",
            SortBy::Author => "Author",
            SortBy::DateCreated => "Date Created",
            SortBy::Downloads => "Downloads",
            SortBy::Favorite => "Favorite",
        }
    }
}

/// The three independent selections sent with every track request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct TrackFilter {
    pub track_type: TrackTypeFilter,
    pub slot: SlotFilter,
    pub sort_by: SortBy,
}

impl TrackFilter {
    pub const fn new(track_type: TrackTypeFilter, slot: SlotFilter, sort_by: SortBy) -> Self {
        Self { track_type, slot, sort_by }
    }

    pub fn accepts(&self, track: &Track) -> bool {
        self.track_type.matches(track.track_type) && self.slot.matches(track.slot)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
}

impl LogSeverity {
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Info => "Info",
            LogSeverity::Warning => "Warning",
            LogSeverity::Error => "Error",
        }
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogMessage {
    pub severity: LogSeverity,
    pub text: String,
}

impl LogMessage {
    pub fn new(severity: LogSeverity, text: impl Into<String>) -> Self {
        Self { severity, text: text.into() }
    }
}

/// Source of track listings and target of install commands.
///
/// Calls are synchronous and made from the render thread.
pub trait TrackProvider {
    /// Fetch the track list for `filter`, already filtered and sorted.
    fn get_tracks(&mut self, filter: &TrackFilter) -> Result<Vec<Track>, ProviderError>;

    /// Install a random selection of tracks of `category`.
    fn install_random(&mut self, category: TrackType) -> Result<(), ProviderError>;

    /// Install the track named `name` into its slot.
    fn install_selected(&mut self, name: &str) -> Result<(), ProviderError>;
}

/// Source of log messages shown in the overlay's log window.
pub trait LogProvider {
    /// Drain every pending message. Returns an empty batch when nothing is queued.
    fn drain_log_messages(&mut self) -> Result<Vec<LogMessage>, ProviderError>;
}

impl<T: TrackProvider + ?Sized> TrackProvider for &mut T {
    fn get_tracks(&mut self, filter: &TrackFilter) -> Result<Vec<Track>, ProviderError> { (**self).get_tracks(filter) }
    fn install_random(&mut self, category: TrackType) -> Result<(), ProviderError> { (**self).install_random(category) }
    fn install_selected(&mut self, name: &str) -> Result<(), ProviderError> { (**self).install_selected(name) }
}

impl<T: LogProvider + ?Sized> LogProvider for &mut T {
    fn drain_log_messages(&mut self) -> Result<Vec<LogMessage>, ProviderError> { (**self).drain_log_messages() }
}
