//! Track provider backed by a JSON catalog file on disk.
//!
//! The catalog stands in for the remote track-management service: it answers
//! filtered/sorted track queries and records installs. Commands are reported
//! through `tracing`, which the overlay mirrors into its log window.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{ProviderError, SortBy, Track, TrackFilter, TrackProvider, TrackType, MAX_SLOT, MIN_SLOT};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tracks: Vec<Track>,
}

pub struct CatalogProvider {
    path: Option<PathBuf>,
    tracks: Vec<Track>,
    installed: HashMap<(TrackType, u8), String>,
    rng: StdRng,
}

impl CatalogProvider {
    /// Load a catalog file. Relative image paths resolve against the catalog's directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref().to_path_buf();
        let tracks = read_catalog(&path)?;
        info!("loaded {} tracks from {}", tracks.len(), path.display());
        let mut provider = Self::from_tracks(tracks);
        provider.path = Some(path);
        Ok(provider)
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self {
            path: None,
            tracks,
            installed: HashMap::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Re-read the catalog file, keeping install state for tracks that still exist.
    pub fn reload(&mut self) -> Result<(), ProviderError> {
        let Some(path) = self.path.clone() else { return Ok(()) };
        let tracks = read_catalog(&path)?;
        self.installed.retain(|_, name| tracks.iter().any(|t| &t.name == name));
        self.tracks = tracks;
        debug!("reloaded catalog {}", path.display());
        Ok(())
    }

    pub fn tracks(&self) -> &[Track] { &self.tracks }

    pub fn installed_in(&self, track_type: TrackType, slot: u8) -> Option<&str> {
        self.installed.get(&(track_type, slot)).map(String::as_str)
    }

    fn install(&mut self, index: usize) {
        let track = &mut self.tracks[index];
        track.installs += 1;
        track.my_installs += 1;
        let (key, name, slot) = ((track.track_type, track.slot), track.name.clone(), track.slot);
        self.installed.insert(key, name.clone());
        info!("Installed {} into {} slot {}", name, key.0, slot);
    }
}

impl TrackProvider for CatalogProvider {
    fn get_tracks(&mut self, filter: &TrackFilter) -> Result<Vec<Track>, ProviderError> {
        let mut out: Vec<Track> = self.tracks.iter().filter(|t| filter.accepts(t)).cloned().collect();
        sort_tracks(&mut out, filter.sort_by);
        debug!(count = out.len(), "catalog query {:?}", filter);
        Ok(out)
    }

    fn install_random(&mut self, category: TrackType) -> Result<(), ProviderError> {
        let mut picks = Vec::new();
        for slot in MIN_SLOT..=MAX_SLOT {
            let candidates: Vec<usize> = self
                .tracks
                .iter()
                .enumerate()
                .filter(|(_, t)| t.track_type == category && t.slot == slot)
                .map(|(i, _)| i)
                .collect();
            if let Some(&i) = candidates.choose(&mut self.rng) {
                picks.push(i);
            }
        }
        if picks.is_empty() {
            warn!("No {} tracks available", category);
            return Ok(());
        }
        for i in picks {
            self.install(i);
        }
        Ok(())
    }

    fn install_selected(&mut self, name: &str) -> Result<(), ProviderError> {
        match self.tracks.iter().position(|t| t.name == name) {
            Some(i) => {
                self.install(i);
                Ok(())
            }
            None => Err(ProviderError::UnknownTrack(name.to_string())),
        }
    }
}

fn read_catalog(path: &Path) -> Result<Vec<Track>, ProviderError> {
    let bytes = fs::read(path).map_err(|source| ProviderError::CatalogIo { path: path.to_path_buf(), source })?;
    let file: CatalogFile =
        serde_json::from_slice(&bytes).map_err(|source| ProviderError::CatalogFormat { path: path.to_path_buf(), source })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tracks = Vec::with_capacity(file.tracks.len());
    for mut track in file.tracks {
        if !(MIN_SLOT..=MAX_SLOT).contains(&track.slot) {
            warn!("skipping {}: slot {} out of range", track.name, track.slot);
            continue;
        }
        if track.image.is_relative() {
            track.image = base.join(&track.image);
        }
        tracks.push(track);
    }
    Ok(tracks)
}

fn sort_tracks(tracks: &mut [Track], sort_by: SortBy) {
    let by_name = |a: &Track, b: &Track| a.name.to_lowercase().cmp(&b.name.to_lowercase());
    tracks.sort_by(|a, b| {
        let primary = match sort_by {
            SortBy::Name => Ordering::Equal,
            SortBy::Slot => a.slot.cmp(&b.slot),
            SortBy::Type => a.track_type.cmp(&b.track_type),
            SortBy::Author => a.author.to_lowercase().cmp(&b.author.to_lowercase()),
            // newest first; dates are ISO-8601 so lexical order is chronological
            SortBy::DateCreated => b.date.cmp(&a.date),
            SortBy::Downloads => b.installs.cmp(&a.installs),
            SortBy::Favorite => b.favorite.cmp(&a.favorite),
        };
        primary.then_with(|| by_name(a, b))
    });
}
