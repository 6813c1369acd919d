use crate::braille::BrailleCanvas;
use crate::data::boundaries::Municipality;
use crate::data::BaseMap;
use crate::map::geometry::{draw_polyline, Pen};
use crate::map::projection::Viewport;
use rayon::prelude::*;
use tracing::debug;

/// Rasterized map, one entry per terminal cell
pub struct MapLayers {
    pub cols: usize,
    pub rows: usize,
    /// Municipality index covering each cell (fill color and hit testing)
    owners: Vec<Option<u32>>,
    /// Base map outlines
    pub base: BrailleCanvas,
    /// Default municipality outlines
    pub outlines: BrailleCanvas,
}

impl MapLayers {
    fn empty(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            owners: vec![None; cols * rows],
            base: BrailleCanvas::new(cols, rows),
            outlines: BrailleCanvas::new(cols, rows),
        }
    }

    /// Municipality under a cell, relative to the map's top-left corner
    pub fn owner_at(&self, col: usize, row: usize) -> Option<usize> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.owners[row * self.cols + col].map(|i| i as usize)
    }
}

#[derive(Clone, PartialEq)]
struct RasterKey {
    viewport: Viewport,
    cols: usize,
    rows: usize,
    scene: u64,
}

/// Choropleth renderer: caches the raster until the view or the scene changes
pub struct MapRenderer {
    pub base_map: BaseMap,
    cache: Option<(RasterKey, MapLayers)>,
}

impl MapRenderer {
    pub fn new(base_map: BaseMap) -> Self {
        Self {
            base_map,
            cache: None,
        }
    }

    /// Drop the cached raster so the next frame rebuilds from scratch
    pub fn reset(&mut self) {
        self.cache = None;
    }

    /// Raster for the current view, rebuilt only when something changed.
    /// `scene` must change whenever `municipalities` does.
    pub fn prepare(
        &mut self,
        municipalities: &[Municipality],
        scene: u64,
        viewport: &Viewport,
        cols: usize,
        rows: usize,
    ) -> &MapLayers {
        let key = RasterKey {
            viewport: viewport.clone(),
            cols,
            rows,
            scene,
        };

        let layers = match self.cache.take() {
            Some((cached, layers)) if cached == key => layers,
            _ => {
                debug!(cols, rows, zoom = viewport.zoom, count = municipalities.len(), "rebuilding raster");
                self.build(municipalities, viewport, cols, rows)
            }
        };

        &self.cache.insert((key, layers)).1
    }

    /// Last prepared raster
    pub fn layers(&self) -> Option<&MapLayers> {
        self.cache.as_ref().map(|(_, layers)| layers)
    }

    fn build(
        &self,
        municipalities: &[Municipality],
        viewport: &Viewport,
        cols: usize,
        rows: usize,
    ) -> MapLayers {
        let mut layers = MapLayers::empty(cols, rows);

        for line in &self.base_map.lines {
            draw_polyline(&mut layers.base, line, viewport, Pen::Thin);
        }

        layers.owners = rasterize(municipalities, viewport, cols, rows);

        for m in municipalities {
            for ring in m.rings() {
                draw_polyline(&mut layers.outlines, ring, viewport, Pen::Thin);
            }
        }

        layers
    }
}

/// Outline of a single municipality, drawn on its own canvas so it can sit
/// above every other outline
pub fn highlight_canvas(m: &Municipality, viewport: &Viewport, cols: usize, rows: usize) -> BrailleCanvas {
    let mut canvas = BrailleCanvas::new(cols, rows);
    for ring in m.rings() {
        draw_polyline(&mut canvas, ring, viewport, Pen::Bold);
    }
    canvas
}

/// Assign each cell to the municipality containing its center.
///
/// Later municipalities win on overlap. A municipality too small to cover
/// any cell center claims the cell holding its center if that cell is free,
/// so every visible municipality stays hoverable.
pub fn rasterize(
    municipalities: &[Municipality],
    viewport: &Viewport,
    cols: usize,
    rows: usize,
) -> Vec<Option<u32>> {
    let mut owners = vec![None; cols * rows];
    if cols == 0 || rows == 0 {
        return owners;
    }

    let covered: Vec<(usize, Vec<usize>, Option<usize>)> = municipalities
        .par_iter()
        .enumerate()
        .filter_map(|(idx, m)| {
            let (x0, y0) = viewport.project(m.bounds.min_lon, m.bounds.max_lat);
            let (x1, y1) = viewport.project(m.bounds.max_lon, m.bounds.min_lat);
            if x1 < 0 || y1 < 0 || x0 >= (cols * 2) as i32 || y0 >= (rows * 4) as i32 {
                return None;
            }

            let col_range = (x0.max(0) as usize / 2)..=((x1.max(0) as usize / 2).min(cols - 1));
            let row_range = (y0.max(0) as usize / 4)..=((y1.max(0) as usize / 4).min(rows - 1));

            let mut cells = Vec::new();
            for row in row_range {
                for col in col_range.clone() {
                    let (lon, lat) =
                        viewport.unproject_f(col as f64 * 2.0 + 1.0, row as f64 * 4.0 + 2.0);
                    if m.contains(lon, lat) {
                        cells.push(row * cols + col);
                    }
                }
            }

            let center_cell = {
                let (lon, lat) = m.bounds.center();
                let (px, py) = viewport.project(lon, lat);
                let (col, row) = (px.div_euclid(2), py.div_euclid(4));
                (col >= 0 && row >= 0 && (col as usize) < cols && (row as usize) < rows)
                    .then(|| row as usize * cols + col as usize)
            };

            Some((idx, cells, center_cell))
        })
        .collect();

    for (idx, cells, _) in &covered {
        for &cell in cells {
            owners[cell] = Some(*idx as u32);
        }
    }
    for (idx, cells, center_cell) in &covered {
        if let (true, Some(cell)) = (cells.is_empty(), center_cell) {
            if owners[*cell].is_none() {
                owners[*cell] = Some(*idx as u32);
            }
        }
    }

    owners
}
