use std::sync::Arc;

use serde::Serialize;

use crate::application::config::EngineConfig;
use crate::domain::chart::{CanvasGeometry, CoordinateMapper, DisplayId, HorizontalLayout};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Symbol, SymbolState};
use crate::domain::state::SnapshotCell;
use crate::log_debug;
use crate::time_utils::format_age;

/// Drawing collaborator. Receives finished frames only.
pub trait DrawingSink {
    fn draw(&mut self, frame: &RenderFrame);
}

impl<F: FnMut(&RenderFrame)> DrawingSink for F {
    fn draw(&mut self, frame: &RenderFrame) {
        self(frame)
    }
}

/// Everything a drawing collaborator needs for one frame of one display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    pub display_id: DisplayId,
    pub symbol: Symbol,
    pub width: f64,
    pub height: f64,
    pub visual_low: f64,
    pub visual_high: f64,
    pub scale_factor: f64,
    pub distance_fraction: f64,
    pub current_price: f64,
    pub daily_open: f64,
    pub session_high: f64,
    pub session_low: f64,
    pub current_y: f64,
    pub open_y: f64,
    pub high_y: f64,
    pub low_y: f64,
    pub axis_x: f64,
    pub float_width: f64,
    pub is_stale: bool,
    pub session: u64,
    pub generation: u64,
    pub rendered_at: u64,
    #[serde(skip)]
    mapper: CoordinateMapper,
}

impl RenderFrame {
    fn build(
        display_id: &DisplayId,
        state: &SymbolState,
        geometry: CanvasGeometry,
        layout: &HorizontalLayout,
        is_stale: bool,
        now: u64,
    ) -> Self {
        let visual = state.visual_range();
        let mapper = CoordinateMapper::new(visual, geometry);
        Self {
            display_id: display_id.clone(),
            symbol: state.symbol.clone(),
            width: geometry.width,
            height: geometry.height,
            visual_low: visual.low,
            visual_high: visual.high,
            scale_factor: state.visual_scale_factor,
            distance_fraction: state.distance_fraction(),
            current_price: state.current_price.value(),
            daily_open: state.daily_open.value(),
            session_high: state.session_high.value(),
            session_low: state.session_low.value(),
            current_y: mapper.y_for_price(state.current_price.value()),
            open_y: mapper.y_for_price(state.daily_open.value()),
            high_y: mapper.y_for_price(state.session_high.value()),
            low_y: mapper.y_for_price(state.session_low.value()),
            axis_x: mapper.axis_x(layout),
            float_width: mapper.float_width(layout),
            is_stale,
            session: state.session,
            generation: state.generation,
            rendered_at: now,
            mapper,
        }
    }

    pub fn y_for_price(&self, price: f64) -> f64 {
        self.mapper.y_for_price(price)
    }

    pub fn x_for_fraction(&self, fraction: f64) -> f64 {
        self.mapper.x_for_fraction(fraction)
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameKey {
    generation: u64,
    geometry: CanvasGeometry,
    is_stale: bool,
}

/// Per-display scheduler sampling the newest snapshot at a bounded rate.
///
/// Intermediate snapshots are never queued: each poll reads whatever the cell
/// holds at that moment.
#[derive(Debug)]
pub struct RenderCoordinator {
    display_id: DisplayId,
    cell: Arc<SnapshotCell>,
    geometry: CanvasGeometry,
    layout: HorizontalLayout,
    min_interval_ms: u64,
    stale_after_ms: u64,
    last_frame_at: Option<u64>,
    last_key: Option<FrameKey>,
    frames_rendered: u64,
    cancelled: bool,
}

impl RenderCoordinator {
    pub fn new(
        display_id: DisplayId,
        cell: Arc<SnapshotCell>,
        geometry: CanvasGeometry,
        config: &EngineConfig,
    ) -> Self {
        Self {
            display_id,
            cell,
            geometry,
            layout: config.layout,
            min_interval_ms: config.min_frame_interval_ms(),
            stale_after_ms: config.stale_after_ms,
            last_frame_at: None,
            last_key: None,
            frames_rendered: 0,
            cancelled: false,
        }
    }

    pub fn display_id(&self) -> &DisplayId {
        &self.display_id
    }

    pub fn symbol(&self) -> &Symbol {
        self.cell.symbol()
    }

    pub fn geometry(&self) -> CanvasGeometry {
        self.geometry
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Stale when the feed is down or no snapshot arrived for `stale_after_ms`.
    pub fn is_stale(&self, state: &SymbolState, now: u64) -> bool {
        !self.cell.is_feed_connected() || state.is_quiet_for(now, self.stale_after_ms)
    }

    /// Next frame, if the cadence allows one and something visible changed.
    pub fn poll(&mut self, now: u64) -> Option<RenderFrame> {
        if self.cancelled {
            return None;
        }
        if let Some(last) = self.last_frame_at {
            if now < last.saturating_add(self.min_interval_ms) {
                return None;
            }
        }
        let state = self.cell.load()?;
        let is_stale = self.is_stale(&state, now);
        let key = FrameKey { generation: state.generation, geometry: self.geometry, is_stale };
        if self.last_key == Some(key) {
            return None;
        }
        if self.last_key.is_some_and(|last| last.is_stale != is_stale) {
            log_debug!(
                LogComponent::Application("RenderCoordinator"),
                "Display {} on {} {} (last snapshot {} ago)",
                self.display_id,
                state.symbol,
                if is_stale { "went stale" } else { "is live again" },
                format_age(state.received_at.elapsed_until(now))
            );
        }

        let frame = RenderFrame::build(
            &self.display_id,
            &state,
            self.geometry,
            &self.layout,
            is_stale,
            now,
        );
        self.last_frame_at = Some(now);
        self.last_key = Some(key);
        self.frames_rendered += 1;
        Some(frame)
    }

    /// Poll and hand the frame to `sink`. Returns whether anything was drawn.
    pub fn render_to<S: DrawingSink + ?Sized>(&mut self, now: u64, sink: &mut S) -> bool {
        match self.poll(now) {
            Some(frame) => {
                sink.draw(&frame);
                true
            }
            None => false,
        }
    }

    pub fn resize(&mut self, geometry: CanvasGeometry) {
        self.geometry = geometry;
    }

    /// Point this display at another symbol's cell; the next poll redraws.
    pub fn switch_symbol(&mut self, cell: Arc<SnapshotCell>) {
        self.cell = cell;
        self.last_key = None;
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}
