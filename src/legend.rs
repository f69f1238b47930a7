use crate::scale::{ColorScale, LinearScale};

pub const LEGEND_WIDTH: f64 = 200.0;
pub const LEGEND_HEIGHT: f64 = 10.0;
pub const TICK_SIZE: f64 = 13.0;
const RIGHT_MARGIN: f64 = 220.0;
const BOTTOM_MARGIN: f64 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LegendRect {
    pub x: f64,
    pub width: f64,
    pub fill: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendTick {
    pub x: f64,
    pub label: String,
}

/// Horizontal color strip with a tick axis underneath, positioned near the
/// bottom-right of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub origin: (f64, f64),
    pub width: f64,
    pub height: f64,
    pub tick_size: f64,
    pub rects: Vec<LegendRect>,
    pub ticks: Vec<LegendTick>,
}

pub fn build_legend(scale: &ColorScale, canvas_width: f64, canvas_height: f64) -> Legend {
    let axis = LinearScale::new(scale.domain(), (0.0, LEGEND_WIDTH));

    let extents: Vec<(f64, f64)> = (0..scale.range().len())
        .filter_map(|i| scale.invert_extent(i))
        .collect();

    let rects = extents
        .iter()
        .zip(scale.range())
        .map(|(&(lo, hi), &color)| LegendRect {
            x: axis.apply(lo),
            width: axis.apply(hi) - axis.apply(lo),
            fill: scale.apply(lo).copied().unwrap_or(color),
        })
        .collect();

    let mut tick_values: Vec<f64> = extents.iter().map(|e| e.0).collect();
    if let Some(last) = extents.last() {
        tick_values.push(last.1);
    }
    let ticks = tick_values
        .into_iter()
        .map(|value| LegendTick {
            x: axis.apply(value),
            label: percent_label(value),
        })
        .collect();

    Legend {
        origin: (
            canvas_width - LEGEND_WIDTH - RIGHT_MARGIN,
            canvas_height - BOTTOM_MARGIN,
        ),
        width: LEGEND_WIDTH,
        height: LEGEND_HEIGHT,
        tick_size: TICK_SIZE,
        rects,
        ticks,
    }
}

/// Whole-percent label, rounding halves up.
fn percent_label(value: f64) -> String {
    format!("{}%", (value + 0.5).floor() as i64)
}
