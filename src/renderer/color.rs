/// Blue-White-Red diverging colormap: deep blue -> blue -> white -> red -> deep red.
/// Blue = negative charge, white = neutral, red = positive charge.
pub(crate) const DIVERGING_STOPS: [(f64, f64, f64); 5] = [
    (0.0, 0.0, 76.0),      // deep blue   (0.00)
    (60.0, 90.0, 255.0),   // blue        (0.25)
    (255.0, 255.0, 255.0), // white       (0.50)
    (255.0, 70.0, 50.0),   // red         (0.75)
    (128.0, 0.0, 0.0),     // deep red    (1.00)
];

/// Convert a [0.0, 1.0] value to RGBA on the diverging map.
pub fn map_to_rgba(t: f64) -> [u8; 4] {
    let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
    let seg = t * 4.0;
    let i = (seg as usize).min(3);
    let s = seg - i as f64;

    let (r0, g0, b0) = DIVERGING_STOPS[i];
    let (r1, g1, b1) = DIVERGING_STOPS[i + 1];

    [
        (r0 + s * (r1 - r0)) as u8,
        (g0 + s * (g1 - g0)) as u8,
        (b0 + s * (b1 - b0)) as u8,
        255,
    ]
}

/// Maps data values onto [0, 1] for the colormap, with zero pinned at 0.5.
///
/// The negative side scales by `|vmin|` and the positive side by `vmax`, so
/// the neutral color always means zero charge and each sign reaches its
/// deepest color at the frame's own extreme.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DivergingNorm {
    pub vmin: f64,
    pub vmax: f64,
}

impl DivergingNorm {
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    pub fn normalize(&self, v: f64) -> f64 {
        let t = if v >= 0.0 {
            let pos = self.vmax.max(0.0);
            if pos > 0.0 { 0.5 + 0.5 * v / pos } else { 0.5 }
        } else {
            let neg = (-self.vmin).max(0.0);
            if neg > 0.0 { 0.5 + 0.5 * v / neg } else { 0.5 }
        };
        t.clamp(0.0, 1.0)
    }

    pub fn color(&self, v: f64) -> [u8; 4] {
        map_to_rgba(self.normalize(v))
    }
}

/// Color bar tick label: only the sign of the value is shown.
pub fn sign_label(v: f64) -> &'static str {
    if v > 0.0 {
        "+"
    } else if v < 0.0 {
        "-"
    } else {
        "0"
    }
}

/// Color bar layout constants.
pub(crate) const BAR_GAP: usize = 6;
pub(crate) const BAR_WIDTH: usize = 20;
pub(crate) const TICK_LEN: usize = 4;
pub(crate) const LABEL_GAP: usize = 3;
pub(crate) const LABEL_WIDTH: usize = 24;
pub(crate) const BAR_TOTAL: usize = BAR_GAP + BAR_WIDTH + TICK_LEN + LABEL_GAP + LABEL_WIDTH;
