use live_price_canvas::domain::chart::{CanvasGeometry, CoordinateMapper, VisualRange};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

fn window(low_cents: i32, span_cents: u16) -> VisualRange {
    let low = f64::from(low_cents) / 100.0;
    VisualRange::new(low, low + f64::from(span_cents) / 100.0)
}

#[quickcheck]
fn same_inputs_same_pixels(low: i32, span: u16, height: u16, price: i32) -> bool {
    let range = window(low, span);
    let geometry = CanvasGeometry::new(640.0, f64::from(height));
    let price = f64::from(price) / 100.0;
    let a = CoordinateMapper::new(range, geometry).y_for_price(price);
    let b = CoordinateMapper::new(range, geometry).y_for_price(price);
    a.to_bits() == b.to_bits()
}

#[quickcheck]
fn output_stays_on_canvas(low: i32, span: u16, height: u16, price: f64) -> bool {
    let height = f64::from(height);
    let mapper = CoordinateMapper::new(window(low, span), CanvasGeometry::new(100.0, height));
    let y = mapper.y_for_price(price);
    y.is_finite() && (0.0..=height).contains(&y)
}

#[quickcheck]
fn resize_preserves_relative_height(
    low: i32,
    span: u16,
    offset: u16,
    h1: u16,
    h2: u16,
) -> TestResult {
    if span == 0 || h1 == 0 || h2 == 0 {
        return TestResult::discard();
    }
    let range = window(low, span);
    let step = f64::from(u32::from(offset) % (u32::from(span) + 1));
    let price = range.low + range.span() * step / f64::from(span);
    let small = CoordinateMapper::new(range, CanvasGeometry::new(300.0, f64::from(h1)));
    let large = CoordinateMapper::new(range, CanvasGeometry::new(1200.0, f64::from(h2)));
    let r1 = small.y_for_price(price) / f64::from(h1);
    let r2 = large.y_for_price(price) / f64::from(h2);
    TestResult::from_bool((r1 - r2).abs() < 1e-9)
}

#[test]
fn degenerate_canvas_never_panics() {
    let range = VisualRange::new(90.0, 110.0);
    for (w, h) in [(0.0, 0.0), (-10.0, 200.0), (300.0, -5.0), (f64::NAN, f64::INFINITY)] {
        let mapper = CoordinateMapper::new(range, CanvasGeometry::new(w, h));
        let expected_y = if h > 0.0 && h.is_finite() { h / 2.0 } else { 0.0 };
        assert_eq!(mapper.y_for_price(100.0), expected_y);
        let expected_x = if w > 0.0 && w.is_finite() { w * 0.5 } else { 0.0 };
        assert_eq!(mapper.x_for_fraction(0.5), expected_x);
    }
    assert!(CoordinateMapper::new(range, CanvasGeometry::new(300.0, 0.0)).is_degenerate());
}

#[test]
fn non_finite_price_sits_mid_canvas() {
    let mapper = CoordinateMapper::new(VisualRange::new(90.0, 110.0), CanvasGeometry::new(400.0, 300.0));
    assert_eq!(mapper.y_for_price(f64::NAN), 150.0);
    assert_eq!(mapper.y_for_price(f64::INFINITY), 150.0);
}
