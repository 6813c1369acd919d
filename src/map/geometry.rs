use crate::braille::BrailleCanvas;
use crate::map::projection::Viewport;

/// Stroke width for outlines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pen {
    Thin,
    /// One extra dot right and below, for the highlighted outline
    Bold,
}

/// Dots of the segment `a -> b`, both ends included (Bresenham)
fn segment(a: (i32, i32), b: (i32, i32)) -> impl Iterator<Item = (i32, i32)> {
    let dx = (b.0 - a.0).abs();
    let dy = -(b.1 - a.1).abs();
    let step = ((b.0 - a.0).signum(), (b.1 - a.1).signum());
    let mut err = dx + dy;
    let mut cursor = Some(a);

    std::iter::from_fn(move || {
        let p = cursor?;
        cursor = (p != b).then(|| {
            let mut next = p;
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                next.0 += step.0;
            }
            if e2 <= dx {
                err += dx;
                next.1 += step.1;
            }
            next
        });
        Some(p)
    })
}

pub fn stroke(canvas: &mut BrailleCanvas, a: (i32, i32), b: (i32, i32), pen: Pen) {
    for (x, y) in segment(a, b) {
        canvas.plot(x, y);
        if pen == Pen::Bold {
            canvas.plot(x + 1, y);
            canvas.plot(x, y + 1);
        }
    }
}

/// Project a lon/lat polyline and stroke the visible segments.
///
/// Segments longer than the canvas are dropped: they only appear when a
/// ring crosses far outside the view and would smear across the map.
pub fn draw_polyline(canvas: &mut BrailleCanvas, line: &[(f64, f64)], viewport: &Viewport, pen: Pen) {
    let max_jump = (viewport.width + viewport.height) as i32 * 4;
    let projected: Vec<(i32, i32)> = line
        .iter()
        .map(|&(lon, lat)| viewport.project(lon, lat))
        .collect();

    for pair in projected.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let jump = (b.0 - a.0).abs() + (b.1 - a.1).abs();
        if jump < max_jump && viewport.line_might_be_visible(a, b) {
            stroke(canvas, a, b, pen);
        }
    }
}
