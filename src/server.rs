//! Web server for the gempawatch dashboard.
//!
//! Provides the interactive earthquake map using:
//! - Axum for the HTTP server
//! - A JSON view endpoint the page polls on every filter change
//! - Leaflet (plus markercluster and heat plugins) for the map layers
//!
//! The server owns the shared [`FeedCache`] and one [`FilterState`] per
//! process session; the page sends the user's selections as query
//! parameters and renders whatever the view endpoint returns.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Query, State},
    response::Html,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::cache::FeedCache;
use crate::client::{BmkgClient, FeedSource};
use crate::config::FeedConfig;
use crate::errors::FetchError;
use crate::filters::{FilterState, SortKey, apply_filters};
use crate::layers::{LayerSet, LayerToggles, OverlayScaling, compose_layers};
use crate::models::EarthquakeEvent;
use crate::normalize::normalize_feed;
use crate::stats::{Stats, compute_stats};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Source the dashboard shows before the user picks one.
    pub initial_source: FeedSource,
    pub feed: FeedConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            initial_source: FeedSource::FeltReports,
            feed: FeedConfig::default(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    client: Arc<BmkgClient>,
    cache: Arc<FeedCache>,
    /// The session's filter selections. One active viewer per session; the
    /// cache is what is shared across concurrent viewers.
    filter: Arc<Mutex<Option<FilterState>>>,
    config: Arc<ServerConfig>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/view", get(view_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the listener
/// fails to bind.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    // The blocking HTTP client is created and used off the async workers.
    let feed_config = config.feed.clone();
    let client = tokio::task::spawn_blocking(move || BmkgClient::new(&feed_config)).await??;
    let cache = FeedCache::new(config.feed.cache_ttl);

    let state = AppState {
        client: Arc::new(client),
        cache: Arc::new(cache),
        filter: Arc::new(Mutex::new(None)),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("gempawatch dashboard starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Query parameters for the view endpoint. Absent range parameters mean
/// "keep the session's current selection".
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub source: Option<String>,
    pub min_mag: Option<f64>,
    pub max_mag: Option<f64>,
    pub min_depth: Option<f64>,
    pub max_depth: Option<f64>,
    pub sort: Option<String>,
    pub clustering: Option<bool>,
    pub heatmap: Option<bool>,
    pub overlay: Option<bool>,
    /// Reset both ranges to the dataset extent before applying anything.
    pub reset: Option<bool>,
}

/// Everything one dashboard render needs, or the reason there is nothing
/// to render. A feed that fetched fine but matched no filters still comes
/// back as `Ok` with empty `events`, which the page messages differently
/// from `Unavailable`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ViewResponse {
    Ok {
        source: FeedSource,
        source_label: &'static str,
        /// Size of the normalized dataset before filtering; zero means the
        /// feed itself was empty.
        feed_count: usize,
        state: FilterState,
        events: Vec<EarthquakeEvent>,
        layers: LayerSet,
        stats: Option<Stats>,
        warning: Option<String>,
    },
    Unavailable {
        kind: &'static str,
        message: String,
    },
}

/// Main page handler - serves the embedded dashboard.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// View endpoint: fetch (through the cache), filter, compose, summarize.
async fn view_handler(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Json<ViewResponse> {
    let source = query
        .source
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(state.config.initial_source);

    // The blocking fetch runs off the async worker threads.
    let fetch_state = state.clone();
    let fetched = tokio::task::spawn_blocking(move || fetch_events(&fetch_state, source)).await;

    let events = match fetched {
        Ok(Ok(events)) => events,
        Ok(Err(e)) => {
            tracing::warn!("feed fetch failed: {}", e);
            let kind = if e.is_transport() { "transport" } else { "parse" };
            return Json(ViewResponse::Unavailable { kind, message: e.to_string() });
        }
        Err(e) => {
            tracing::warn!("fetch task failed: {}", e);
            return Json(ViewResponse::Unavailable {
                kind: "transport",
                message: "fetch task failed".to_string(),
            });
        }
    };

    let filter_state = reconcile_filter(&state, source, &events, &query);

    let filtered = apply_filters(&events, &filter_state);
    let toggles = LayerToggles {
        clustering: query.clustering.unwrap_or(true),
        heatmap: query.heatmap.unwrap_or(false),
        image_overlay: query.overlay.unwrap_or(false),
    };
    let layers = compose_layers(&filtered, toggles, OverlayScaling::default());
    let stats = compute_stats(&filtered);
    let warning = stats.as_ref().and_then(Stats::strong_event_warning);

    Json(ViewResponse::Ok {
        source,
        source_label: source.label(),
        feed_count: events.len(),
        state: filter_state,
        events: filtered,
        layers,
        stats,
        warning,
    })
}

/// Fetch one source through the shared cache.
fn fetch_events(
    state: &AppState,
    source: FeedSource,
) -> Result<Arc<Vec<EarthquakeEvent>>, FetchError> {
    let client = Arc::clone(&state.client);
    let asset_base = state.config.feed.asset_base_url.clone();
    state.cache.get_or_fetch(source, move || {
        let payload = client.fetch_feed(source)?;
        Ok(normalize_feed(&payload, &asset_base))
    })
}

/// Run the session's filter-state transitions for this request.
fn reconcile_filter(
    state: &AppState,
    source: FeedSource,
    events: &[EarthquakeEvent],
    query: &ViewQuery,
) -> FilterState {
    let mut guard = match state.filter.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    let filter = guard.get_or_insert_with(|| FilterState::for_events(source, events));
    filter.sync(source, events);

    if query.reset.unwrap_or(false) {
        filter.reset_ranges(events);
    }

    if query.min_mag.is_some() || query.max_mag.is_some() {
        let lo = query.min_mag.unwrap_or(filter.magnitude.lo);
        let hi = query.max_mag.unwrap_or(filter.magnitude.hi);
        filter.magnitude.select(lo, hi);
    }
    if query.min_depth.is_some() || query.max_depth.is_some() {
        let lo = query.min_depth.unwrap_or(filter.depth.lo);
        let hi = query.max_depth.unwrap_or(filter.depth.hi);
        filter.depth.select(lo, hi);
    }
    if let Some(key) = query.sort.as_deref().and_then(|s| s.parse::<SortKey>().ok()) {
        filter.sort_key = key;
    }

    filter.clone()
}

/// Manual refresh: drop every cached feed so the next view refetches.
async fn refresh_handler(State(state): State<AppState>) -> &'static str {
    state.cache.clear();
    tracing::info!("cache cleared via dashboard refresh");
    "refreshed"
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>GempaWatch — BMKG Earthquake Monitor</title>

    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css" />
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css" />
    <script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>
    <script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>

    <style>
        :root {
            --bg: #0f1115;
            --panel: #181b21;
            --border: #2a2e37;
            --text: #e8eaed;
            --text-dim: #9aa0a8;
            --accent: #f97316;
            --low: #10b981;
            --moderate: #f97316;
            --high: #ef4444;
        }
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: 'Segoe UI', Roboto, sans-serif;
            background: var(--bg);
            color: var(--text);
        }
        .topbar {
            display: flex;
            align-items: center;
            justify-content: space-between;
            padding: 0.75rem 1.25rem;
            border-bottom: 1px solid var(--border);
        }
        .topbar h1 { font-size: 1.1rem; font-weight: 600; }
        .topbar .sub { color: var(--text-dim); font-size: 0.8rem; }
        .layout { display: flex; height: calc(100vh - 53px); }
        .sidebar {
            width: 280px;
            padding: 1rem;
            border-right: 1px solid var(--border);
            background: var(--panel);
            overflow-y: auto;
        }
        .sidebar h2 {
            font-size: 0.75rem;
            text-transform: uppercase;
            letter-spacing: 0.05em;
            color: var(--text-dim);
            margin: 1rem 0 0.5rem;
        }
        .sidebar h2:first-child { margin-top: 0; }
        select, input[type="number"], button {
            width: 100%;
            padding: 0.4rem 0.5rem;
            margin-bottom: 0.5rem;
            background: var(--bg);
            color: var(--text);
            border: 1px solid var(--border);
            border-radius: 6px;
            font-size: 0.85rem;
        }
        input:disabled { opacity: 0.4; }
        label.toggle {
            display: flex;
            align-items: center;
            gap: 0.5rem;
            font-size: 0.85rem;
            margin-bottom: 0.4rem;
        }
        label.toggle input { width: auto; margin: 0; }
        button { cursor: pointer; }
        button.primary { background: var(--accent); border-color: var(--accent); color: #fff; }
        .range-row { display: flex; gap: 0.5rem; }
        .main { flex: 1; display: flex; flex-direction: column; }
        #map { flex: 1; }
        .stats {
            display: flex;
            gap: 1.5rem;
            padding: 0.6rem 1.25rem;
            border-bottom: 1px solid var(--border);
            font-size: 0.85rem;
        }
        .stats .stat b { display: block; font-size: 1.05rem; }
        .stats .stat span { color: var(--text-dim); font-size: 0.7rem; }
        #message {
            padding: 0.5rem 1.25rem;
            font-size: 0.85rem;
            display: none;
        }
        #message.error { display: block; color: var(--high); }
        #message.empty { display: block; color: var(--text-dim); }
        #message.warning { display: block; color: var(--moderate); }
    </style>
</head>
<body>
    <header class="topbar">
        <div>
            <h1>🌋 GempaWatch</h1>
            <div class="sub">BMKG earthquake feeds · data.bmkg.go.id</div>
        </div>
        <div class="sub" id="source-label"></div>
    </header>

    <div class="layout">
        <aside class="sidebar">
            <h2>Source</h2>
            <select id="source">
                <option value="felt">Felt earthquakes</option>
                <option value="m5">Recent M5.0+</option>
                <option value="realtime">Real-time (automatic)</option>
            </select>
            <button id="refresh" class="primary">🔄 Refresh data</button>

            <h2>Magnitude</h2>
            <div class="range-row">
                <input type="number" id="min-mag" step="0.1">
                <input type="number" id="max-mag" step="0.1">
            </div>

            <h2>Depth (km)</h2>
            <div class="range-row">
                <input type="number" id="min-depth" step="1">
                <input type="number" id="max-depth" step="1">
            </div>

            <h2>Sort</h2>
            <select id="sort">
                <option value="newest">Newest first</option>
                <option value="strongest">Strongest first</option>
                <option value="shallowest">Shallowest first</option>
            </select>
            <button id="reset">Reset filters</button>

            <h2>Layers</h2>
            <label class="toggle"><input type="checkbox" id="clustering" checked> Cluster markers</label>
            <label class="toggle"><input type="checkbox" id="heatmap"> Heatmap</label>
            <label class="toggle"><input type="checkbox" id="overlay"> Shakemap overlay</label>
        </aside>

        <div class="main">
            <div class="stats" id="stats"></div>
            <div id="message"></div>
            <div id="map"></div>
        </div>
    </div>

    <script>
        const map = L.map('map').setView([-2.5, 118.0], 5);
        L.tileLayer('https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png', {
            attribution: '&copy; OpenStreetMap, &copy; CARTO'
        }).addTo(map);

        let markerLayer = null, heatLayer = null, overlayLayer = null;
        let lastSource = null;

        const el = id => document.getElementById(id);
        const severityColor = s => ({ low: '#10b981', moderate: '#f97316', high: '#ef4444' })[s];

        function params(withRanges) {
            const p = new URLSearchParams();
            p.set('source', el('source').value);
            p.set('sort', el('sort').value);
            p.set('clustering', el('clustering').checked);
            p.set('heatmap', el('heatmap').checked);
            p.set('overlay', el('overlay').checked);
            if (withRanges) {
                if (el('min-mag').value !== '') p.set('min_mag', el('min-mag').value);
                if (el('max-mag').value !== '') p.set('max_mag', el('max-mag').value);
                if (el('min-depth').value !== '') p.set('min_depth', el('min-depth').value);
                if (el('max-depth').value !== '') p.set('max_depth', el('max-depth').value);
            }
            return p;
        }

        function showMessage(kind, text) {
            const box = el('message');
            box.className = kind || '';
            box.textContent = text || '';
        }

        function renderRanges(state) {
            for (const [dim, lo, hi] of [[state.magnitude, 'min-mag', 'max-mag'],
                                         [state.depth, 'min-depth', 'max-depth']]) {
                el(lo).value = dim.lo; el(hi).value = dim.hi;
                el(lo).min = el(hi).min = dim.min;
                el(lo).max = el(hi).max = dim.max;
                el(lo).disabled = el(hi).disabled = !(dim.min < dim.max);
            }
        }

        function renderStats(stats, feedCount, eventCount) {
            const box = el('stats');
            if (!stats) { box.innerHTML = ''; return; }
            const latest = new Date(stats.latest).toLocaleString();
            box.innerHTML = `
                <div class="stat"><b>${stats.count}</b><span>events</span></div>
                <div class="stat"><b>M ${stats.max_magnitude.toFixed(1)}</b><span>strongest</span></div>
                <div class="stat"><b>M ${stats.mean_magnitude.toFixed(2)}</b><span>mean</span></div>
                <div class="stat"><b>${stats.min_depth_km.toFixed(0)} km</b><span>shallowest</span></div>
                <div class="stat"><b>${stats.max_depth_km.toFixed(0)} km</b><span>deepest</span></div>
                <div class="stat"><b>${latest}</b><span>latest</span></div>`;
        }

        function renderLayers(layers) {
            if (markerLayer) map.removeLayer(markerLayer);
            if (heatLayer) { map.removeLayer(heatLayer); heatLayer = null; }
            if (overlayLayer) { map.removeLayer(overlayLayer); overlayLayer = null; }

            markerLayer = layers.markers.clustered ? L.markerClusterGroup() : L.layerGroup();
            for (const m of layers.markers.markers) {
                const marker = L.circleMarker([m.latitude, m.longitude], {
                    radius: 7,
                    fillColor: severityColor(m.severity),
                    color: 'rgba(255,255,255,0.7)',
                    weight: 1,
                    fillOpacity: 0.85
                }).bindPopup(`<b>${m.region}</b><br>M ${m.magnitude} · ${m.depth_km} km`);
                markerLayer.addLayer(marker);
            }
            markerLayer.addTo(map);

            if (layers.heatmap) {
                heatLayer = L.heatLayer(
                    layers.heatmap.map(p => [p.latitude, p.longitude, p.weight]),
                    { radius: 30 }
                ).addTo(map);
            }

            if (layers.overlay) {
                const b = layers.overlay.bounds;
                overlayLayer = L.imageOverlay(layers.overlay.url,
                    [[b.south, b.west], [b.north, b.east]],
                    { opacity: layers.overlay.opacity }).addTo(map);
            }
        }

        async function refreshView(opts) {
            const p = params(!(opts && opts.sourceChanged));
            if (opts && opts.reset) p.set('reset', 'true');

            const response = await fetch('/api/view?' + p.toString());
            const view = await response.json();

            if (view.status === 'unavailable') {
                showMessage('error', 'Feed unavailable (' + view.kind + '): ' + view.message);
                return;
            }

            lastSource = view.source;
            el('source-label').textContent = view.source_label;
            renderRanges(view.state);
            renderStats(view.stats, view.feed_count, view.events.length);
            renderLayers(view.layers);

            if (view.feed_count === 0) {
                showMessage('empty', 'The feed returned no data.');
            } else if (view.events.length === 0) {
                showMessage('empty', 'No events match the current filters.');
            } else if (view.warning) {
                showMessage('warning', '⚠ ' + view.warning);
            } else {
                showMessage('', '');
            }
        }

        el('source').addEventListener('change', () => refreshView({ sourceChanged: true }));
        el('sort').addEventListener('change', () => refreshView());
        for (const id of ['min-mag', 'max-mag', 'min-depth', 'max-depth'])
            el(id).addEventListener('change', () => refreshView());
        for (const id of ['clustering', 'heatmap', 'overlay'])
            el(id).addEventListener('change', () => refreshView());
        el('reset').addEventListener('click', () => refreshView({ reset: true, sourceChanged: true }));
        el('refresh').addEventListener('click', async () => {
            await fetch('/api/refresh', { method: 'POST' });
            refreshView();
        });

        refreshView({ sourceChanged: true });
    </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn event(magnitude: f64, depth_km: f64) -> EarthquakeEvent {
        EarthquakeEvent {
            occurred_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            latitude: -6.0,
            longitude: 130.0,
            magnitude,
            depth_km,
            region: "Laut Banda".into(),
            felt_reports: None,
            shakemap_url: None,
            potential: None,
        }
    }

    fn test_state() -> AppState {
        let config = ServerConfig::default();
        AppState {
            client: Arc::new(BmkgClient::new(&config.feed).unwrap()),
            cache: Arc::new(FeedCache::new(Duration::from_secs(60))),
            filter: Arc::new(Mutex::new(None)),
            config: Arc::new(config),
        }
    }

    #[test]
    fn test_reconcile_keeps_session_state_across_requests() {
        let state = test_state();
        let events = vec![event(3.0, 10.0), event(7.0, 90.0)];

        let narrowed = reconcile_filter(
            &state,
            FeedSource::FeltReports,
            &events,
            &ViewQuery { min_mag: Some(5.0), max_mag: Some(6.0), ..ViewQuery::default() },
        );
        assert!((narrowed.magnitude.lo - 5.0).abs() < 1e-9);

        // A follow-up request without range params keeps the selection.
        let kept = reconcile_filter(&state, FeedSource::FeltReports, &events, &ViewQuery::default());
        assert!((kept.magnitude.lo - 5.0).abs() < 1e-9);
        assert!((kept.magnitude.hi - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_reconcile_resets_on_source_switch() {
        let state = test_state();
        let dataset_a = vec![event(3.0, 10.0), event(7.0, 90.0)];
        let dataset_b = vec![event(1.0, 5.0), event(4.0, 40.0)];

        reconcile_filter(
            &state,
            FeedSource::FeltReports,
            &dataset_a,
            &ViewQuery { min_mag: Some(5.0), max_mag: Some(6.0), ..ViewQuery::default() },
        );
        let switched =
            reconcile_filter(&state, FeedSource::RecentM5, &dataset_b, &ViewQuery::default());

        assert!((switched.magnitude.lo - 1.0).abs() < 1e-9);
        assert!((switched.magnitude.hi - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_reconcile_reset_restores_full_extent() {
        let state = test_state();
        let events = vec![event(3.0, 10.0), event(7.0, 90.0)];

        reconcile_filter(
            &state,
            FeedSource::FeltReports,
            &events,
            &ViewQuery { min_mag: Some(5.0), ..ViewQuery::default() },
        );
        let reset = reconcile_filter(
            &state,
            FeedSource::FeltReports,
            &events,
            &ViewQuery { reset: Some(true), ..ViewQuery::default() },
        );

        assert!((reset.magnitude.lo - 3.0).abs() < 1e-9);
        assert!((reset.magnitude.hi - 7.0).abs() < 1e-9);
    }
}
