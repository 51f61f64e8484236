use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::application::render_coordinator::{DrawingSink, RenderFrame};
use crate::domain::logging::{LogComponent, get_logger};

const BACKGROUND: &str = "#1a1a1a";
const OPEN_LINE: &str = "#8888aa";
const RANGE_BAND: &str = "rgba(120, 160, 255, 0.12)";
const LIVE_PRICE: &str = "#4caf50";
const STALE_PRICE: &str = "#9e9e9e";
const AXIS: &str = "#444444";

/// Canvas 2D drawing sink. A display's id is the id of its `<canvas>` element.
#[derive(Debug, Default)]
pub struct CanvasRenderer;

impl CanvasRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Get canvas element and context
    fn get_canvas_context(frame: &RenderFrame) -> Result<CanvasRenderingContext2d, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("Document not available"))?;
        let canvas = document
            .get_element_by_id(frame.display_id.value())
            .ok_or_else(|| JsValue::from_str(&format!("Canvas '{}' not found", frame.display_id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("Failed to get canvas element"))?;

        let (width, height) = (frame.width.max(0.0) as u32, frame.height.max(0.0) as u32);
        if canvas.width() != width || canvas.height() != height {
            canvas.set_width(width);
            canvas.set_height(height);
        }

        canvas
            .get_context("2d")
            .map_err(|_| JsValue::from_str("Failed to get 2D context"))?
            .ok_or_else(|| JsValue::from_str("2D context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| JsValue::from_str("Failed to cast to 2D context"))
    }

    pub fn render_frame(&self, frame: &RenderFrame) -> Result<(), JsValue> {
        let context = Self::get_canvas_context(frame)?;
        let (width, height) = (frame.width, frame.height);

        context.set_fill_style(&JsValue::from(BACKGROUND));
        context.fill_rect(0.0, 0.0, width, height);

        // Session range band
        context.set_fill_style(&JsValue::from(RANGE_BAND));
        context.fill_rect(0.0, frame.high_y, width, (frame.low_y - frame.high_y).max(1.0));

        Self::horizontal_line(&context, frame.open_y, width, OPEN_LINE, &[4.0, 4.0])?;

        context.set_stroke_style(&JsValue::from(AXIS));
        context.begin_path();
        context.move_to(frame.axis_x, 0.0);
        context.line_to(frame.axis_x, height);
        context.stroke();

        let price_color = if frame.is_stale { STALE_PRICE } else { LIVE_PRICE };
        Self::horizontal_line(&context, frame.current_y, frame.axis_x, price_color, &[])?;

        // Price float to the right of the axis
        context.set_fill_style(&JsValue::from(price_color));
        context.fill_rect(frame.axis_x, frame.current_y - 9.0, frame.float_width, 18.0);
        context.set_fill_style(&JsValue::from(BACKGROUND));
        context.set_font("12px monospace");
        context.fill_text(&format!("{}", frame.current_price), frame.axis_x + 4.0, frame.current_y + 4.0)?;

        if frame.is_stale {
            context.set_fill_style(&JsValue::from(STALE_PRICE));
            context.fill_text("STALE", 8.0, 16.0)?;
        }
        Ok(())
    }

    fn horizontal_line(
        context: &CanvasRenderingContext2d,
        y: f64,
        to_x: f64,
        color: &str,
        dash: &[f64],
    ) -> Result<(), JsValue> {
        let pattern = js_sys::Array::new();
        for segment in dash {
            pattern.push(&JsValue::from(*segment));
        }
        context.set_line_dash(&pattern)?;
        context.set_stroke_style(&JsValue::from(color));
        context.begin_path();
        context.move_to(0.0, y);
        context.line_to(to_x, y);
        context.stroke();
        context.set_line_dash(&js_sys::Array::new())
    }
}

impl DrawingSink for CanvasRenderer {
    fn draw(&mut self, frame: &RenderFrame) {
        if let Err(e) = self.render_frame(frame) {
            get_logger().error(
                LogComponent::Infrastructure("CanvasRenderer"),
                &format!("❌ Failed to draw {}: {:?}", frame.display_id, e),
            );
        }
    }
}
