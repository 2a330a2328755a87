/// Glyphs in order of increasing density.
pub const TICKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Peaks at or below this many bytes draw as a flat line.
pub const LOW_MAXIMUM: u64 = 10_000;

/// Render one glyph per value, scaled against the run-wide `maximum`.
///
/// When `maximum` is at or below [`LOW_MAXIMUM`] every value maps to the
/// lowest glyph and at least one glyph is produced, so a near-idle process
/// does not show up as noise.
pub fn sparkline(maximum: u64, values: &[u64]) -> String {
    if maximum <= LOW_MAXIMUM {
        return TICKS[0].to_string().repeat(values.len().max(1));
    }

    let top = (TICKS.len() - 1) as u128;
    values
        .iter()
        .map(|&v| {
            let idx = (top * v as u128 / maximum as u128).min(top);
            TICKS[idx as usize]
        })
        .collect()
}
