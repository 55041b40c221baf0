use std::time::{Duration, Instant};

use preview::{TextureCache, TextureUploader};
use tracing::{debug, warn};
use tracks::{Track, TrackFilter, TrackProvider, TrackType};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryReason {
    /// The refresh interval elapsed.
    Scheduled,
    /// The filter differs from the one used for the last successful query.
    FilterChanged,
    /// Nothing to show yet, keep asking.
    EmptyList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Idle,
    Fetched { reason: QueryReason, count: usize },
    Failed { reason: QueryReason },
}

impl RefreshOutcome {
    pub fn queried(self) -> bool { !matches!(self, RefreshOutcome::Idle) }
}

/// Track list, filter, and selection for the track selection window.
///
/// Per render pass the front end calls, in order: [`refresh`](Self::refresh),
/// [`update_preview`](Self::update_preview) (or [`take_preview_reload`](Self::take_preview_reload)),
/// any number of [`select`](Self::select) calls from the table, then
/// [`finish_pass`](Self::finish_pass).
pub struct TrackBrowserState {
    filter: TrackFilter,
    /// Filter of the last successful query.
    baseline: Option<TrackFilter>,
    tracks: Vec<Track>,
    selected_name: String,
    /// Last record found for `selected_name`; kept when a refresh drops it.
    selected: Option<Track>,
    /// `selected_name` as it was at the end of the previous pass.
    previous_name: String,
    reload_preview: bool,
    next_refresh: Option<Instant>,
    refresh_interval: Duration,
}

impl Default for TrackBrowserState {
    fn default() -> Self { Self::new(DEFAULT_REFRESH_INTERVAL) }
}

impl TrackBrowserState {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            filter: TrackFilter::default(),
            baseline: None,
            tracks: Vec::new(),
            selected_name: String::new(),
            selected: None,
            previous_name: String::new(),
            reload_preview: false,
            next_refresh: None,
            refresh_interval,
        }
    }

    pub fn filter(&self) -> TrackFilter { self.filter }

    /// Combo boxes edit the filter in place; the change is picked up by the next refresh.
    pub fn filter_mut(&mut self) -> &mut TrackFilter { &mut self.filter }

    pub fn set_filter(&mut self, filter: TrackFilter) { self.filter = filter; }

    pub fn tracks(&self) -> &[Track] { &self.tracks }

    pub fn selected_name(&self) -> &str { &self.selected_name }

    /// Record shown in the preview pane and used for installs.
    pub fn selected(&self) -> Option<&Track> { self.selected.as_ref() }

    /// The selected entry of the current list, if it is in the list.
    pub fn selection_in_list(&self) -> Option<&Track> {
        if self.selected_name.is_empty() {
            return None;
        }
        self.tracks.iter().find(|t| t.name == self.selected_name)
    }

    pub fn is_selected(&self, track: &Track) -> bool { track.name == self.selected_name }

    pub fn select(&mut self, name: &str) {
        if self.selected_name != name {
            debug!("selected {}", name);
            self.selected_name = name.to_string();
        }
    }

    /// Decide whether to query `provider` this pass and apply the result.
    ///
    /// Issues at most one query. A failed query changes nothing except the
    /// scheduled refresh time.
    pub fn refresh<P: TrackProvider + ?Sized>(&mut self, provider: &mut P, now: Instant) -> RefreshOutcome {
        let filter_changed = self.baseline != Some(self.filter);
        let reason = if self.next_refresh.map_or(true, |at| now >= at) {
            self.next_refresh = Some(now + self.refresh_interval);
            QueryReason::Scheduled
        } else if filter_changed {
            QueryReason::FilterChanged
        } else if self.tracks.is_empty() {
            QueryReason::EmptyList
        } else {
            return RefreshOutcome::Idle;
        };

        let filter = self.filter;
        match provider.get_tracks(&filter) {
            Ok(tracks) => {
                let count = tracks.len();
                debug!(?reason, count, "track list refreshed");
                self.tracks = tracks;
                if filter_changed {
                    if let Some(first) = self.tracks.first() {
                        self.selected_name = first.name.clone();
                        self.selected = Some(first.clone());
                        self.previous_name.clear();
                    }
                    self.baseline = Some(filter);
                }
                RefreshOutcome::Fetched { reason, count }
            }
            Err(e) => {
                warn!(?reason, "track query failed: {e}");
                RefreshOutcome::Failed { reason }
            }
        }
    }

    /// Resolve the selection against the current list and arm the preview
    /// reload when the selected name changed since the previous pass.
    pub fn finish_pass(&mut self) {
        if let Some(track) = self.tracks.iter().find(|t| t.name == self.selected_name) {
            self.selected = Some(track.clone());
            if self.previous_name != self.selected_name {
                self.reload_preview = true;
            }
        }
        self.previous_name.clone_from(&self.selected_name);
    }

    /// Consume the reload flag, returning the track whose image should be loaded.
    pub fn take_preview_reload(&mut self) -> Option<&Track> {
        if !std::mem::take(&mut self.reload_preview) {
            return None;
        }
        self.selected.as_ref()
    }

    /// Reload `cache` from the selected track if the selection changed.
    /// Returns whether a load was attempted.
    pub fn update_preview<U: TextureUploader>(&mut self, cache: &mut TextureCache<U>) -> bool {
        let Some(track) = self.take_preview_reload() else { return false };
        let image = track.image.clone();
        if let Err(e) = cache.load(&image) {
            if e.is_soft() {
                debug!("no preview for {}: {e}", image.display());
            } else {
                warn!("preview for {} unavailable: {e}", image.display());
            }
        }
        true
    }

    /// Recreate the preview after the graphics device was reset.
    pub fn restore_preview<U: TextureUploader>(&self, cache: &mut TextureCache<U>) {
        cache.invalidate();
        if let Some(track) = &self.selected {
            if let Err(e) = cache.restore(&track.image) {
                debug!("preview restore failed: {e}");
            }
        }
    }

    pub fn install_selected<P: TrackProvider + ?Sized>(&self, provider: &mut P) {
        if self.selected_name.is_empty() {
            debug!("install requested with no track selected");
            return;
        }
        if let Err(e) = provider.install_selected(&self.selected_name) {
            warn!("install of {} failed: {e}", self.selected_name);
        }
    }

    pub fn install_random<P: TrackProvider + ?Sized>(&self, provider: &mut P, category: TrackType) {
        if let Err(e) = provider.install_random(category) {
            warn!("random {} install failed: {e}", category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use preview::{PixelBuffer, UploadError};
    use std::path::{Path, PathBuf};
    use tracks::{ProviderError, SlotFilter, SortBy, TrackTypeFilter};

    #[derive(Default)]
    struct FakeProvider {
        tracks: Vec<Track>,
        fail: bool,
        queries: usize,
        installed: Vec<String>,
        random: Vec<TrackType>,
    }

    impl TrackProvider for FakeProvider {
        fn get_tracks(&mut self, filter: &TrackFilter) -> Result<Vec<Track>, ProviderError> {
            self.queries += 1;
            if self.fail {
                return Err(ProviderError::Unavailable("connection refused".into()));
            }
            Ok(self.tracks.iter().filter(|t| filter.accepts(t)).cloned().collect())
        }

        fn install_random(&mut self, category: TrackType) -> Result<(), ProviderError> {
            self.random.push(category);
            Ok(())
        }

        fn install_selected(&mut self, name: &str) -> Result<(), ProviderError> {
            self.installed.push(name.to_string());
            Ok(())
        }
    }

    fn track(name: &str, track_type: TrackType) -> Track {
        Track {
            name: name.into(),
            slot: 1,
            track_type,
            author: "author".into(),
            date: "2020-01-01".into(),
            installs: 0,
            my_installs: 0,
            favorite: false,
            image: PathBuf::from(format!("{}.jpg", name)),
        }
    }

    fn provider() -> FakeProvider {
        FakeProvider {
            tracks: vec![
                track("S1", TrackType::Supercross),
                track("T1", TrackType::National),
                track("T2", TrackType::National),
            ],
            ..FakeProvider::default()
        }
    }

    fn national() -> TrackFilter {
        TrackFilter::new(TrackTypeFilter::Only(TrackType::National), SlotFilter::All, SortBy::Slot)
    }

    fn pass<P: TrackProvider>(state: &mut TrackBrowserState, p: &mut P, now: Instant) -> (RefreshOutcome, Option<String>) {
        let outcome = state.refresh(p, now);
        let reload = state.take_preview_reload().map(|t| t.name.clone());
        state.finish_pass();
        (outcome, reload)
    }

    #[test]
    fn first_pass_selects_first_track_and_reloads_next_pass() {
        let mut p = provider();
        let mut state = TrackBrowserState::default();
        let t0 = Instant::now();
        let (outcome, reload) = pass(&mut state, &mut p, t0);
        assert_eq!(outcome, RefreshOutcome::Fetched { reason: QueryReason::Scheduled, count: 3 });
        assert_eq!(reload, None);
        assert_eq!(state.selected_name(), "S1");
        let (outcome, reload) = pass(&mut state, &mut p, t0 + Duration::from_secs(1));
        assert_eq!(outcome, RefreshOutcome::Idle);
        assert_eq!(reload.as_deref(), Some("S1"));
    }

    #[test]
    fn filter_change_selects_first_result_and_flags_reload() {
        let mut p = provider();
        let mut state = TrackBrowserState::default();
        let t0 = Instant::now();
        pass(&mut state, &mut p, t0);
        pass(&mut state, &mut p, t0 + Duration::from_secs(1));
        assert_eq!(state.filter(), TrackFilter::default());

        state.set_filter(national());
        let (outcome, _) = pass(&mut state, &mut p, t0 + Duration::from_secs(2));
        assert_eq!(outcome, RefreshOutcome::Fetched { reason: QueryReason::FilterChanged, count: 2 });
        assert_eq!(state.selected_name(), "T1");
        assert_eq!(state.selected().map(|t| t.name.as_str()), Some("T1"));

        let (_, reload) = pass(&mut state, &mut p, t0 + Duration::from_secs(3));
        assert_eq!(reload.as_deref(), Some("T1"));
        assert_eq!(p.queries, 2);
    }

    #[test]
    fn unchanged_filter_within_interval_does_not_query() {
        let mut p = provider();
        let mut state = TrackBrowserState::default();
        let t0 = Instant::now();
        pass(&mut state, &mut p, t0);
        for s in 1..10 {
            let (outcome, _) = pass(&mut state, &mut p, t0 + Duration::from_secs(s));
            assert_eq!(outcome, RefreshOutcome::Idle);
        }
        assert_eq!(p.queries, 1);
        let (outcome, _) = pass(&mut state, &mut p, t0 + Duration::from_secs(10));
        assert_eq!(outcome, RefreshOutcome::Fetched { reason: QueryReason::Scheduled, count: 3 });
        assert_eq!(p.queries, 2);
    }

    #[test]
    fn empty_list_is_requeried_once_per_pass() {
        let mut p = FakeProvider::default();
        let mut state = TrackBrowserState::default();
        let t0 = Instant::now();
        pass(&mut state, &mut p, t0);
        let (outcome, _) = pass(&mut state, &mut p, t0 + Duration::from_millis(16));
        assert_eq!(outcome, RefreshOutcome::Fetched { reason: QueryReason::EmptyList, count: 0 });
        assert_eq!(p.queries, 2);

        p.tracks = vec![track("Late", TrackType::FreeRide)];
        pass(&mut state, &mut p, t0 + Duration::from_millis(32));
        assert_eq!(state.tracks().len(), 1);
        // the baseline was recorded on the first, empty answer; no automatic selection
        assert_eq!(state.selected_name(), "");
        assert_eq!(p.queries, 3);
    }

    #[test]
    fn failed_query_leaves_list_and_selection_untouched() {
        let mut p = provider();
        let mut state = TrackBrowserState::default();
        let t0 = Instant::now();
        pass(&mut state, &mut p, t0);
        state.select("T2");
        state.finish_pass();

        p.fail = true;
        state.set_filter(national());
        let (outcome, _) = pass(&mut state, &mut p, t0 + Duration::from_secs(1));
        assert_eq!(outcome, RefreshOutcome::Failed { reason: QueryReason::FilterChanged });
        assert_eq!(state.tracks().len(), 3);
        assert_eq!(state.selected_name(), "T2");

        // baseline unchanged, so the filter change is retried
        p.fail = false;
        let (outcome, _) = pass(&mut state, &mut p, t0 + Duration::from_secs(2));
        assert_eq!(outcome, RefreshOutcome::Fetched { reason: QueryReason::FilterChanged, count: 2 });
        assert_eq!(state.selected_name(), "T1");
    }

    #[test]
    fn vanished_selection_keeps_displayed_record() {
        let mut p = provider();
        let mut state = TrackBrowserState::default();
        let t0 = Instant::now();
        pass(&mut state, &mut p, t0);
        state.select("T2");
        state.finish_pass();
        assert_eq!(state.selected().map(|t| t.name.as_str()), Some("T2"));

        p.tracks.retain(|t| t.name != "T2");
        pass(&mut state, &mut p, t0 + Duration::from_secs(10));
        assert_eq!(state.selected().map(|t| t.name.as_str()), Some("T2"));
        assert!(state.selection_in_list().is_none());
    }

    #[test]
    fn reload_is_edge_triggered() {
        let mut p = provider();
        let mut state = TrackBrowserState::default();
        let t0 = Instant::now();
        pass(&mut state, &mut p, t0);
        assert!(state.take_preview_reload().is_some());
        for _ in 0..3 {
            state.finish_pass();
            assert!(state.take_preview_reload().is_none());
        }
        state.select("T1");
        state.finish_pass();
        assert_eq!(state.take_preview_reload().map(|t| t.name.clone()).as_deref(), Some("T1"));
        state.finish_pass();
        assert!(state.take_preview_reload().is_none());
    }

    #[test]
    fn selecting_a_name_outside_the_list_does_not_reload() {
        let mut p = provider();
        let mut state = TrackBrowserState::default();
        pass(&mut state, &mut p, Instant::now());
        state.take_preview_reload();
        state.select("Ghost");
        state.finish_pass();
        assert!(state.take_preview_reload().is_none());
        assert_eq!(state.selected().map(|t| t.name.as_str()), Some("S1"));
    }

    #[test]
    fn filter_churn_never_issues_more_than_one_query_per_pass() {
        let mut p = provider();
        let mut state = TrackBrowserState::default();
        let t0 = Instant::now();
        let filters = [TrackFilter::default(), national(), national(), TrackFilter::default()];
        for step in 0..40u64 {
            if step % 3 == 0 {
                state.set_filter(filters[(step as usize / 3) % filters.len()]);
            }
            let before = p.queries;
            let changed = state.baseline != Some(state.filter);
            let previous = state.selected_name().to_string();
            let (outcome, _) = pass(&mut state, &mut p, t0 + Duration::from_secs(step));
            assert!(p.queries - before <= 1);
            match outcome {
                RefreshOutcome::Fetched { count, .. } if changed && count > 0 => {
                    assert_eq!(state.selected_name(), state.tracks()[0].name, "step {step}");
                }
                _ => assert_eq!(state.selected_name(), previous, "step {step}"),
            }
            assert!(state.selection_in_list().is_some(), "step {step}");
        }
    }

    #[test]
    fn installs_forward_to_provider() {
        let mut p = provider();
        let mut state = TrackBrowserState::default();
        state.install_selected(&mut p);
        assert!(p.installed.is_empty());

        pass(&mut state, &mut p, Instant::now());
        state.install_selected(&mut p);
        state.install_random(&mut p, TrackType::Supercross);
        assert_eq!(p.installed, vec!["S1".to_string()]);
        assert_eq!(p.random, vec![TrackType::Supercross]);
    }

    #[test]
    fn each_command_reaches_the_log_window_once() {
        use crate::LogPanel;
        use tracing_subscriber::layer::SubscriberExt;

        let (tx, mut rx) = logfeed::channel();
        let subscriber = tracing_subscriber::registry().with(logfeed::LogFeedLayer::new(tx));
        let mut catalog = tracks::CatalogProvider::from_tracks(vec![track("A", TrackType::National)]).with_seed(1);
        let mut state = TrackBrowserState::default();
        let mut panel = LogPanel::new();

        tracing::subscriber::with_default(subscriber, || {
            pass(&mut state, &mut catalog, Instant::now());
            state.install_selected(&mut catalog);
            panel.poll(&mut rx);
            assert_eq!(panel.buffer().as_str(), "[Info] Installed A into National slot 1\n");

            panel.clear();
            state.select("Ghost");
            state.install_selected(&mut catalog);
            state.install_random(&mut catalog, TrackType::Supercross);
            panel.poll(&mut rx);
        });
        assert_eq!(
            panel.buffer().lines().collect::<Vec<_>>(),
            vec!["[Warning] install of Ghost failed: unknown track: Ghost", "[Warning] No Supercross tracks available"]
        );
    }

    #[derive(Default)]
    struct CountingUploader {
        live: i32,
        uploads: u32,
    }

    impl TextureUploader for CountingUploader {
        type Texture = u32;

        fn upload(&mut self, _pixels: &PixelBuffer) -> Result<u32, UploadError> {
            self.live += 1;
            self.uploads += 1;
            Ok(self.uploads)
        }

        fn release(&mut self, _texture: u32) { self.live -= 1; }
    }

    fn jpeg(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save_with_format(&path, ImageFormat::Jpeg).unwrap();
        path
    }

    #[test]
    fn update_preview_loads_selected_image_once_per_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut s1 = track("S1", TrackType::Supercross);
        s1.image = jpeg(dir.path(), "s1.jpg");
        let mut t1 = track("T1", TrackType::National);
        t1.image = jpeg(dir.path(), "t1.jpg");
        let mut p = FakeProvider { tracks: vec![s1.clone(), t1.clone()], ..FakeProvider::default() };
        let mut state = TrackBrowserState::default();
        let mut cache = TextureCache::new(CountingUploader::default());
        let t0 = Instant::now();

        state.refresh(&mut p, t0);
        assert!(!state.update_preview(&mut cache));
        state.finish_pass();

        state.refresh(&mut p, t0);
        assert!(state.update_preview(&mut cache));
        assert_eq!(cache.current().map(|t| t.source.clone()), Some(s1.image.clone()));
        state.select("T1");
        state.finish_pass();

        assert!(state.update_preview(&mut cache));
        state.finish_pass();
        assert!(!state.update_preview(&mut cache));
        assert_eq!(cache.current().map(|t| t.source.clone()), Some(t1.image.clone()));
        assert_eq!(cache.uploader().live, 1);
        assert_eq!(cache.uploader().uploads, 2);

        state.restore_preview(&mut cache);
        assert_eq!(cache.uploader().live, 1);
        assert_eq!(cache.uploader().uploads, 3);
    }

    #[test]
    fn missing_preview_image_leaves_cache_empty() {
        let dir = tempfile::tempdir().unwrap();
        let good = jpeg(dir.path(), "good.jpg");
        let mut a = track("A", TrackType::National);
        a.image = good;
        let b = track("B", TrackType::National);
        let mut p = FakeProvider { tracks: vec![a, b], ..FakeProvider::default() };
        let mut state = TrackBrowserState::default();
        let mut cache = TextureCache::new(CountingUploader::default());
        let t0 = Instant::now();

        state.refresh(&mut p, t0);
        state.finish_pass();
        state.update_preview(&mut cache);
        assert!(!cache.is_empty());
        state.select("B");
        state.finish_pass();
        state.update_preview(&mut cache);
        assert!(cache.is_empty());
        assert_eq!(cache.uploader().live, 0);
    }
}
