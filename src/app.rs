use crate::data::boundaries::{total_bounds, Bounds, Municipality};
use crate::data::cases::CaseIndex;
use crate::data::BaseMap;
use crate::loader::{LoadEvent, Loader};
use crate::map::{MapLayers, MapRenderer, Viewport};
use crate::scale;
use crate::uf::StateCode;
use crate::ui;
use ratatui::layout::{Position, Rect};
use ratatui::style::Color;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Lifecycle of the map for the selected state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Unloaded,
    Loading,
    Rendered,
}

/// Pointer interaction on a municipality (index into the loaded boundaries)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    Hover(usize),
    HoverOut,
    Click(usize),
    DoubleClick(usize),
    Unlock,
}

/// Everything tied to the selected state. Replaced wholesale on reload.
#[derive(Default)]
pub struct MapView {
    /// `None` until the case fetch succeeds
    pub cases: Option<CaseIndex>,
    pub municipalities: Vec<Municipality>,
    pub hovered: Option<usize>,
    pub locked: Option<usize>,
    pub cases_pending: bool,
    pub boundaries_pending: bool,
    pub cases_error: Option<String>,
    pub boundaries_error: Option<String>,
}

/// Detects two clicks on the same municipality in quick succession
#[derive(Default)]
struct ClickTracker {
    last: Option<(usize, Instant)>,
}

impl ClickTracker {
    const WINDOW: Duration = Duration::from_millis(400);

    /// Record a click; true when it completes a double-click
    fn register(&mut self, idx: usize, at: Instant) -> bool {
        match self.last {
            Some((prev, when)) if prev == idx && at.duration_since(when) <= Self::WINDOW => {
                self.last = None;
                true
            }
            _ => {
                self.last = Some((idx, at));
                false
            }
        }
    }
}

/// Application state
pub struct App {
    pub state: StateCode,
    pub phase: Phase,
    pub view: MapView,
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    loader: Loader,
    /// Bumped whenever the municipality set changes, keys the raster cache
    scene: u64,
    screen: Rect,
    dragged: bool,
    clicks: ClickTracker,
}

impl App {
    pub fn new(state: StateCode, loader: Loader, base_map: BaseMap, width: u16, height: u16) -> Self {
        let screen = Rect::new(0, 0, width, height);
        let mut app = Self {
            state,
            phase: Phase::Unloaded,
            view: MapView::default(),
            viewport: Viewport::new(0.0, 0.0, 1.0, 1, 1),
            map_renderer: MapRenderer::new(base_map),
            should_quit: false,
            last_mouse: None,
            loader,
            scene: 0,
            screen,
            dragged: false,
            clicks: ClickTracker::default(),
        };
        app.sync_viewport_size();
        app.frame_state();
        app
    }

    /// Map area in terminal coordinates (inside the border)
    pub fn map_area(&self) -> Rect {
        ui::layout(self.screen).map_inner
    }

    fn sync_viewport_size(&mut self) {
        // Braille gives 2x4 resolution per character
        let area = self.map_area();
        self.viewport.width = area.width as usize * 2;
        self.viewport.height = area.height as usize * 4;
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.screen = Rect::new(0, 0, width, height);
        self.sync_viewport_size();
    }

    /// Switch to `state`: tear down the current map and fetch everything again
    pub fn select_state(&mut self, state: StateCode) {
        info!(from = %self.state, to = %state, "state selected");
        self.state = state;
        self.teardown();

        let generation = self.loader.request(state);
        self.view.cases_pending = true;
        self.view.boundaries_pending = true;
        self.phase = Phase::Loading;
        info!(%state, generation, "loading");
    }

    /// Reload whatever state is selected
    pub fn reload(&mut self) {
        self.select_state(self.state);
    }

    fn teardown(&mut self) {
        self.view = MapView::default();
        self.map_renderer.reset();
        self.scene += 1;
        self.clicks = ClickTracker::default();
        self.last_mouse = None;
        self.dragged = false;
        self.frame_state();
    }

    /// Apply every finished fetch
    pub fn pump(&mut self) {
        for event in self.loader.poll() {
            self.apply(event);
        }
    }

    /// Block up to `timeout` for one fetch to finish and apply it
    pub fn pump_blocking(&mut self, timeout: Duration) -> bool {
        match self.loader.wait(timeout) {
            Some(event) => self.apply(event),
            None => false,
        }
    }

    /// Apply a fetch result. Results from an earlier request are dropped.
    /// Returns whether the event was applied.
    pub fn apply(&mut self, event: LoadEvent) -> bool {
        let current = self.loader.generation();
        if event.generation() != current || event.state() != self.state {
            warn!(
                stale = event.generation(),
                current,
                state = %event.state(),
                "discarding result of superseded request"
            );
            return false;
        }

        match event {
            LoadEvent::Cases { state, result, .. } => {
                self.view.cases_pending = false;
                match result {
                    Ok(records) => {
                        let index = CaseIndex::from_records(records);
                        info!(%state, municipalities = index.len(), "case index rebuilt");
                        self.view.cases = Some(index);
                        self.view.cases_error = None;
                    }
                    Err(e) => {
                        error!(%state, error = %e, source = ?std::error::Error::source(&e), "case fetch failed");
                        self.view.cases = None;
                        self.view.cases_error = Some(e.summary());
                    }
                }
            }
            LoadEvent::Boundaries { state, result, .. } => {
                self.view.boundaries_pending = false;
                match result {
                    Ok(municipalities) => {
                        info!(%state, municipalities = municipalities.len(), "boundaries ready");
                        self.view.municipalities = municipalities;
                        self.view.boundaries_error = None;
                        self.scene += 1;
                        self.frame_state();
                    }
                    Err(e) => {
                        error!(%state, error = %e, source = ?std::error::Error::source(&e), "boundary fetch failed");
                        self.view.boundaries_error = Some(e.summary());
                    }
                }
                self.phase = Phase::Rendered;
            }
        }
        true
    }

    /// Dispatch a pointer interaction
    pub fn dispatch(&mut self, interaction: Interaction) {
        let count = self.view.municipalities.len();
        match interaction {
            Interaction::Hover(idx) if idx < count => {
                self.view.hovered = Some(idx);
            }
            Interaction::HoverOut => {
                self.view.hovered = None;
            }
            Interaction::Click(idx) if idx < count => {
                // Locking a new municipality releases the previous one.
                self.view.locked = Some(idx);
                self.view.hovered = Some(idx);
            }
            Interaction::DoubleClick(idx) if idx < count => {
                let bounds = self.view.municipalities[idx].bounds;
                self.viewport.fit_bounds(&bounds, 0.1);
            }
            Interaction::Unlock => {
                self.view.locked = None;
            }
            _ => {}
        }
    }

    /// Fit the view to the loaded boundaries, or to the state's center
    pub fn frame_state(&mut self) {
        let bounds = total_bounds(&self.view.municipalities).unwrap_or_else(|| {
            let (lat, lon) = self.state.center();
            Bounds::around(lon, lat, 4.0)
        });
        self.viewport.fit_bounds(&bounds, 0.05);
    }

    /// Rebuild the raster if the view changed
    pub fn prepare_frame(&mut self) -> &MapLayers {
        let area = self.map_area();
        self.map_renderer.prepare(
            &self.view.municipalities,
            self.scene,
            &self.viewport,
            area.width as usize,
            area.height as usize,
        )
    }

    /// Municipality under a terminal position
    pub fn hit_test(&self, col: u16, row: u16) -> Option<usize> {
        let area = self.map_area();
        if !area.contains(Position::new(col, row)) {
            return None;
        }
        self.map_renderer
            .layers()
            .and_then(|l| l.owner_at((col - area.x) as usize, (row - area.y) as usize))
            .filter(|&idx| idx < self.view.municipalities.len())
    }

    /// Pointer moved: emits HoverOut / Hover as the municipality under it changes
    pub fn on_mouse_move(&mut self, col: u16, row: u16) {
        let under = self.hit_test(col, row);
        if under == self.view.hovered {
            return;
        }
        if self.view.hovered.is_some() {
            self.dispatch(Interaction::HoverOut);
        }
        if let Some(idx) = under {
            self.dispatch(Interaction::Hover(idx));
        }
    }

    pub fn on_left_down(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Drag pans the map
    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - col as i32;
            let dy = last_y as i32 - row as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
                self.pan(dx * 2, dy * 4);
            }
        }
        self.last_mouse = Some((col, row));
    }

    /// Button released: a press without drag is a click
    pub fn on_left_up(&mut self, col: u16, row: u16, at: Instant) {
        let was_drag = self.dragged;
        self.last_mouse = None;
        self.dragged = false;
        if was_drag {
            return;
        }

        if let Some(state) = self.selector_hit(col, row) {
            self.select_state(state);
            return;
        }

        if let Some(idx) = self.hit_test(col, row) {
            self.dispatch(Interaction::Click(idx));
            if self.clicks.register(idx, at) {
                self.dispatch(Interaction::DoubleClick(idx));
            }
        }
    }

    /// State listed at a terminal position of the selector
    pub fn selector_hit(&self, col: u16, row: u16) -> Option<StateCode> {
        let list = ui::layout(self.screen).selector_inner;
        if !list.contains(Position::new(col, row)) {
            return None;
        }
        let offset = ui::selector_offset(self.state.index(), list.height as usize);
        StateCode::ALL.get(offset + (row - list.y) as usize).copied()
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = self.to_pixels(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = self.to_pixels(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    /// Terminal cell to braille pixel, relative to the map area
    fn to_pixels(&self, col: u16, row: u16) -> (i32, i32) {
        let area = self.map_area();
        let px = (col as i32 - area.x as i32) * 2 + 1;
        let py = (row as i32 - area.y as i32) * 4 + 2;
        (px, py)
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Municipality whose details the info panel shows. Only hovering fills
    /// the panel; a lock keeps its outline but not the text.
    pub fn info_target(&self) -> Option<&Municipality> {
        self.view
            .hovered
            .and_then(|idx| self.view.municipalities.get(idx))
    }

    /// Municipalities drawn with the highlight outline
    pub fn highlighted(&self) -> impl Iterator<Item = &Municipality> {
        let locked = self.view.locked.filter(|&l| Some(l) != self.view.hovered);
        [locked, self.view.hovered]
            .into_iter()
            .flatten()
            .filter_map(move |idx| self.view.municipalities.get(idx))
    }

    /// Confirmed cases of a municipality, 0 when unknown
    pub fn confirmed(&self, idx: usize) -> u64 {
        match (self.view.cases.as_ref(), self.view.municipalities.get(idx)) {
            (Some(cases), Some(m)) => cases.confirmed(&m.name),
            _ => 0,
        }
    }

    fn case_count(&self, idx: usize) -> i64 {
        i64::try_from(self.confirmed(idx)).unwrap_or(i64::MAX)
    }

    pub fn band(&self, idx: usize) -> usize {
        scale::band_for(self.case_count(idx))
    }

    pub fn fill_color(&self, idx: usize) -> Color {
        scale::color_for(self.case_count(idx))
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.2}°{}, {:.2}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Short description of load progress for the status bar
    pub fn load_status(&self) -> String {
        match self.phase {
            Phase::Unloaded => "sem dados".to_string(),
            Phase::Loading => "carregando".to_string(),
            Phase::Rendered if self.view.cases_pending => "carregando casos".to_string(),
            Phase::Rendered => {
                let errors: Vec<&str> = [&self.view.boundaries_error, &self.view.cases_error]
                    .into_iter()
                    .flatten()
                    .map(String::as_str)
                    .collect();
                if errors.is_empty() {
                    format!("{} municípios", self.view.municipalities.len())
                } else {
                    format!("erro: {}", errors.join("; "))
                }
            }
        }
    }
}
