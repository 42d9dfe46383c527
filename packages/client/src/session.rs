//! One dashboard session: the shared filter store plus the views that
//! follow it.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use roadwatch_analytics_models::MergeOptions;
use roadwatch_filter::FilterStore;
use roadwatch_filter_models::{FilterState, QueryOverrides};

use crate::api::DashboardApi;
use crate::views::{CatalogLoader, RefreshOutcome, SegmentView, TrendView};

/// Result of one [`DashboardSession::refresh_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Filter version both views were refreshed from.
    pub version: u64,
    /// Outcome of the KM distribution refresh.
    pub segments: RefreshOutcome,
    /// Outcome of the forecast refresh.
    pub trend: RefreshOutcome,
}

/// Session-wide state and views.
///
/// Filters live in the [`FilterStore`]; road/KM overrides and forecast
/// knobs are local to their view and never enter the store.
pub struct DashboardSession {
    api: Arc<dyn DashboardApi>,
    store: Arc<FilterStore>,
    segments: SegmentView,
    trend: TrendView,
    catalog: CatalogLoader,
    segment_overrides: Mutex<QueryOverrides>,
    trend_overrides: Mutex<QueryOverrides>,
    merge_options: Mutex<MergeOptions>,
}

impl DashboardSession {
    /// Creates a session with a fresh store.
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self::with_store(api, Arc::new(FilterStore::new()))
    }

    /// Creates a session over an existing store.
    #[must_use]
    pub fn with_store(api: Arc<dyn DashboardApi>, store: Arc<FilterStore>) -> Self {
        Self {
            segments: SegmentView::new(Arc::clone(&api)),
            trend: TrendView::new(Arc::clone(&api)),
            catalog: CatalogLoader::new(Arc::clone(&api)),
            api,
            store,
            segment_overrides: Mutex::new(QueryOverrides::new()),
            trend_overrides: Mutex::new(QueryOverrides::new()),
            merge_options: Mutex::new(MergeOptions::default()),
        }
    }

    /// The data service.
    #[must_use]
    pub const fn api(&self) -> &Arc<dyn DashboardApi> {
        &self.api
    }

    /// The shared filter store.
    #[must_use]
    pub const fn store(&self) -> &Arc<FilterStore> {
        &self.store
    }

    /// The KM distribution view.
    #[must_use]
    pub const fn segments(&self) -> &SegmentView {
        &self.segments
    }

    /// The forecast view.
    #[must_use]
    pub const fn trend(&self) -> &TrendView {
        &self.trend
    }

    /// Sets the road/KM overrides used by the KM distribution view.
    pub fn set_segment_overrides(&self, overrides: QueryOverrides) {
        *self
            .segment_overrides
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = overrides;
    }

    /// Sets the road override used by the forecast view.
    pub fn set_trend_overrides(&self, overrides: QueryOverrides) {
        *self
            .trend_overrides
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = overrides;
    }

    /// Sets the reduction factor and uncertainty margin for the forecast.
    pub fn set_merge_options(&self, options: MergeOptions) {
        *self
            .merge_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = options;
    }

    /// Loads the option catalog into the store.
    pub async fn load_catalog(&self) -> bool {
        self.catalog.load(&self.store).await
    }

    /// Replaces the filter state; returns the new version.
    pub fn apply(&self, filters: FilterState) -> u64 {
        self.store.replace(filters)
    }

    /// Refreshes both views concurrently from the current snapshot.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let snapshot = self.store.snapshot();
        let segment_overrides = self
            .segment_overrides
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let trend_overrides = self
            .trend_overrides
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let options = *self
            .merge_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        log::debug!("Refreshing views for filter version {}", snapshot.version);
        let (segments, trend) = tokio::join!(
            self.segments.refresh(&snapshot.filters, &segment_overrides),
            self.trend
                .refresh(&snapshot.filters, &trend_overrides, options),
        );
        RefreshSummary {
            version: snapshot.version,
            segments,
            trend,
        }
    }

    /// Refreshes both views now and again after every filter replacement,
    /// calling `on_refresh` with the version that was rendered. Several
    /// replacements during one refresh coalesce into a single follow-up.
    ///
    /// Returns when `shutdown` resolves.
    pub async fn follow<F, S>(&self, mut on_refresh: F, shutdown: S)
    where
        F: FnMut(u64) + Send,
        S: Future<Output = ()> + Send,
    {
        let mut rx = self.store.subscribe();
        tokio::pin!(shutdown);

        let mut version;
        loop {
            version = self.refresh_all().await.version;
            on_refresh(version);

            tokio::select! {
                () = &mut shutdown => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        log::debug!("Stopped following filter changes at version {version}");
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::{mpsc, oneshot};

    use super::*;
    use crate::endpoint::Endpoint;
    use crate::test_support::{ScriptedApi, segments_body};

    fn scripted() -> Arc<ScriptedApi> {
        Arc::new(
            ScriptedApi::default()
                .with(Endpoint::KmDistribution, segments_body("0-10"))
                .with(
                    Endpoint::Forecast,
                    json!({ "historical": [{ "date": "2024-01", "value": 3.0 }], "forecast": [] }),
                ),
        )
    }

    #[tokio::test]
    async fn overrides_stay_local_to_their_view() {
        let api = scripted();
        let session = DashboardSession::new(Arc::clone(&api) as Arc<dyn DashboardApi>);
        session.apply(FilterState::new().with_year("2024"));
        session.set_segment_overrides(QueryOverrides::new().road("116").km_range("10", "50"));
        session.set_trend_overrides(QueryOverrides::new().road("101"));

        let summary = session.refresh_all().await;
        assert_eq!(summary.segments, RefreshOutcome::Applied);
        assert_eq!(summary.trend, RefreshOutcome::Applied);
        assert_eq!(summary.version, 1);

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.contains(&(
            Endpoint::KmDistribution,
            "ano=2024&br=116&km_fim=50&km_inicio=10".to_string()
        )));
        assert!(calls.contains(&(Endpoint::Forecast, "ano=2024&br=101".to_string())));
    }

    #[tokio::test]
    async fn follow_refreshes_on_every_version() {
        let api = scripted();
        let session = DashboardSession::new(Arc::clone(&api) as Arc<dyn DashboardApi>);
        let (rendered_tx, mut rendered) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let driver = async {
            assert_eq!(rendered.recv().await, Some(0));
            session.apply(FilterState::new().with_phase("Noite"));
            assert_eq!(rendered.recv().await, Some(1));
            stop_tx.send(()).unwrap();
        };
        let follower = session.follow(
            move |version| {
                let _ = rendered_tx.send(version);
            },
            async {
                let _ = stop_rx.await;
            },
        );
        tokio::join!(follower, driver);

        assert_eq!(
            session.segments().applied_query().as_deref(),
            Some("fase_dia=Noite")
        );
        assert_eq!(api.calls().len(), 4);
    }

    #[tokio::test]
    async fn follow_reports_the_version_it_rendered() {
        let api = scripted();
        let session = DashboardSession::new(Arc::clone(&api) as Arc<dyn DashboardApi>);
        let (rendered_tx, mut rendered) = mpsc::unbounded_channel::<(u64, Option<String>)>();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        // Both replacements land before the first refresh.
        session.apply(FilterState::new().with_year("2023"));
        session.apply(FilterState::new().with_year("2024"));

        let driver = async {
            let (version, query) = rendered.recv().await.unwrap();
            assert_eq!(version, 2);
            assert_eq!(query.as_deref(), Some("ano=2024"));
            stop_tx.send(()).unwrap();
        };
        let follower = session.follow(
            |version| {
                let _ = rendered_tx.send((version, session.segments().applied_query()));
            },
            async {
                let _ = stop_rx.await;
            },
        );
        tokio::join!(follower, driver);
    }

    #[tokio::test]
    async fn catalog_loads_into_the_store() {
        let api = ScriptedApi::default().with(
            Endpoint::Options,
            json!({ "anos": [2024], "condicoes_meteorologicas": ["Chuva"], "tipos_acidente": [], "fases_dia": [] }),
        );
        let session = DashboardSession::new(Arc::new(api));
        assert!(session.load_catalog().await);
        assert_eq!(session.store().catalog().conditions, vec!["Chuva"]);
    }
}
