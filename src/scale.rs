use ratatui::style::Color;

/// Ascending case-count thresholds separating the nine color bands.
pub const THRESHOLDS: [i64; 8] = [0, 1, 2, 5, 10, 20, 50, 100];

/// Band colors, lightest first.
pub const PALETTE: [&str; 9] = [
    "#FFFFCC", "#FFEDA0", "#FED976", "#FEB24C", "#FD8D3C", "#FC4E2A", "#E31A1C", "#BD0026",
    "#800026",
];

const LABELS: [&str; 9] = ["0", "1", "2", "3-5", "6-10", "11-20", "21-50", "51-99", "100+"];

pub const BAND_COUNT: usize = PALETTE.len();

/// Band index for a case count.
///
/// Counts the thresholds strictly exceeded, except the top one which is
/// reached at equality: 0 is band 0 and anything from 100 up is band 8.
/// Negative counts are treated as zero.
#[inline]
pub fn band_for(count: i64) -> usize {
    let count = count.max(0);
    let (last, rest) = match THRESHOLDS.split_last() {
        Some(split) => split,
        None => return 0,
    };
    if count >= *last {
        return BAND_COUNT - 1;
    }
    rest.iter().take_while(|&&t| count > t).count()
}

pub fn color_for(count: i64) -> Color {
    band_color(band_for(count))
}

/// Terminal color of a band
pub fn band_color(band: usize) -> Color {
    parse_hex(PALETTE[band.min(BAND_COUNT - 1)])
}

fn parse_hex(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0)
    };
    Color::Rgb(channel(0), channel(2), channel(4))
}

/// One row of the legend panel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegendEntry {
    pub color: Color,
    pub label: &'static str,
}

pub fn legend() -> [LegendEntry; BAND_COUNT] {
    std::array::from_fn(|band| LegendEntry {
        color: band_color(band),
        label: LABELS[band],
    })
}
