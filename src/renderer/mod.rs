mod color;
mod font;

// Re-export public API
pub use color::{sign_label, DivergingNorm};
pub use font::render_status;

use color::{BAR_GAP, BAR_TOTAL, BAR_WIDTH, LABEL_GAP, TICK_LEN};
use font::{draw_text, draw_text_centered, draw_text_right, CHAR_STEP, FONT_HEIGHT, STATUS_BAR_HEIGHT};

use crate::loader::Dataset;
use crate::playback::{frame_limits, FrameLimits};

/// Room left of each panel for y tick labels.
const AXIS_LABEL_WIDTH: usize = 8 * CHAR_STEP + TICK_LEN + 2;
/// Title row above each panel.
const TITLE_HEIGHT: usize = FONT_HEIGHT + 8;
/// Ticks and tick labels below each panel.
const X_AXIS_HEIGHT: usize = TICK_LEN + 3 + FONT_HEIGHT + 4;
const MIN_PANEL: usize = 16;

const BACKGROUND: [u8; 3] = [0x14, 0x14, 0x18];
const AXIS_COLOR: [u8; 3] = [0x66, 0x66, 0x66];
const TEXT_COLOR: [u8; 3] = [0xAA, 0xAA, 0xAA];
const LABEL_COLOR: [u8; 3] = [0x88, 0x88, 0x88];
const LINE_COLOR: [u8; 3] = [0xE6, 0x28, 0x28];

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    pub fn right(&self) -> usize {
        self.x + self.w
    }

    pub fn bottom(&self) -> usize {
        self.y + self.h
    }
}

/// Two-panel layout computed from window pixel size.
pub struct RenderConfig {
    pub frame_width: usize,
    pub frame_height: usize,
    /// Charge density image (upper panel).
    pub heatmap: Rect,
    /// Color bar right of the heatmap.
    pub colorbar: Rect,
    /// Electric field line plot (lower panel).
    pub plot: Rect,
    /// First row of the status bar.
    pub status_y: usize,
}

impl RenderConfig {
    /// Compute layout to fit the given pixel dimensions.
    /// Both panels share the horizontal extent; the color bar sits in the
    /// right margin next to the heatmap.
    pub fn fit(pixel_width: usize, pixel_height: usize) -> Self {
        let min_width = AXIS_LABEL_WIDTH + MIN_PANEL + BAR_TOTAL;
        let min_height = STATUS_BAR_HEIGHT + 2 * (TITLE_HEIGHT + MIN_PANEL + X_AXIS_HEIGHT);
        let frame_width = pixel_width.max(min_width);
        let frame_height = pixel_height.max(min_height);

        let content_h = frame_height - STATUS_BAR_HEIGHT;
        let upper_h = content_h / 2;
        let lower_h = content_h - upper_h;
        let panel_w = frame_width - AXIS_LABEL_WIDTH - BAR_TOTAL;

        let heatmap = Rect {
            x: AXIS_LABEL_WIDTH,
            y: TITLE_HEIGHT,
            w: panel_w,
            h: upper_h - TITLE_HEIGHT - X_AXIS_HEIGHT,
        };
        let colorbar = Rect {
            x: heatmap.right() + BAR_GAP,
            y: heatmap.y,
            w: BAR_WIDTH,
            h: heatmap.h,
        };
        let plot = Rect {
            x: AXIS_LABEL_WIDTH,
            y: upper_h + TITLE_HEIGHT,
            w: panel_w,
            h: lower_h - TITLE_HEIGHT - X_AXIS_HEIGHT,
        };

        Self {
            frame_width,
            frame_height,
            heatmap,
            colorbar,
            plot,
            status_y: content_h,
        }
    }
}

/// Color bar tick values: the limits, plus zero when it lies between them.
pub fn colorbar_ticks(vmin: f64, vmax: f64) -> Vec<f64> {
    let mut ticks = vec![vmax];
    if vmin < 0.0 && vmax > 0.0 {
        ticks.push(0.0);
    }
    if vmin != vmax {
        ticks.push(vmin);
    }
    ticks
}

/// Compact tick label for axis values.
fn format_tick(v: f64) -> String {
    let abs = v.abs();
    if abs == 0.0 {
        "0".to_string()
    } else if abs >= 1e4 || abs < 1e-2 {
        format!("{:.1e}", v)
    } else if abs >= 100.0 {
        format!("{:.0}", v)
    } else if abs >= 1.0 {
        format!("{:.2}", v)
    } else {
        format!("{:.3}", v)
    }
}

#[inline]
fn put_pixel(buf: &mut [u8], frame_width: usize, x: usize, y: usize, color: [u8; 3]) {
    let off = (y * frame_width + x) * 4;
    if off + 3 < buf.len() {
        buf[off] = color[0];
        buf[off + 1] = color[1];
        buf[off + 2] = color[2];
        buf[off + 3] = 255;
    }
}

fn hline(buf: &mut [u8], frame_width: usize, x0: usize, x1: usize, y: usize, color: [u8; 3]) {
    for x in x0..x1 {
        put_pixel(buf, frame_width, x, y, color);
    }
}

fn vline(buf: &mut [u8], frame_width: usize, x: usize, y0: usize, y1: usize, color: [u8; 3]) {
    for y in y0..y1 {
        put_pixel(buf, frame_width, x, y, color);
    }
}

/// One-pixel frame just outside `r`.
fn draw_box(buf: &mut [u8], frame_width: usize, r: Rect, color: [u8; 3]) {
    let x0 = r.x.saturating_sub(1);
    let y0 = r.y.saturating_sub(1);
    hline(buf, frame_width, x0, r.right() + 1, y0, color);
    hline(buf, frame_width, x0, r.right() + 1, r.bottom(), color);
    vline(buf, frame_width, x0, y0, r.bottom() + 1, color);
    vline(buf, frame_width, r.right(), y0, r.bottom() + 1, color);
}

/// Bresenham line from (x0,y0) to (x1,y1), clipped to `clip`.
fn draw_line(
    buf: &mut [u8], frame_width: usize,
    x0: isize, y0: isize, x1: isize, y1: isize,
    clip: Rect, color: [u8; 3],
) {
    let mut cx = x0;
    let mut cy = y0;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx: isize = if x0 < x1 { 1 } else { -1 };
    let sy: isize = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if cx >= clip.x as isize && cx < clip.right() as isize
            && cy >= clip.y as isize && cy < clip.bottom() as isize
        {
            put_pixel(buf, frame_width, cx as usize, cy as usize, color);
        }
        if cx == x1 && cy == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; cx += sx; }
        if e2 <= dx { err += dx; cy += sy; }
    }
}

/// Ticks and labels under a panel for the horizontal range [lo, hi].
fn draw_x_axis(buf: &mut [u8], frame_width: usize, r: Rect, lo: f64, hi: f64) {
    let tick_y = r.bottom() + 1;
    let label_y = tick_y + TICK_LEN + 2;
    for k in 0..3 {
        let px = r.x + k * (r.w - 1) / 2;
        vline(buf, frame_width, px, tick_y, tick_y + TICK_LEN, AXIS_COLOR);
        let v = lo + (hi - lo) * k as f64 / 2.0;
        draw_text_centered(buf, frame_width, px, label_y, &format_tick(v), LABEL_COLOR);
    }
    draw_text(buf, frame_width, r.right() + 4, label_y, "x", TEXT_COLOR);
}

/// Map `v` in [lo, hi] to a pixel row in `r`; a flat range maps to the middle row.
fn value_to_row(v: f64, lo: f64, hi: f64, r: Rect) -> isize {
    let span = hi - lo;
    let t = if span > 0.0 { (v - lo) / span } else { 0.5 };
    r.y as isize + ((1.0 - t) * (r.h - 1) as f64).round() as isize
}

fn render_heatmap(buf: &mut [u8], dataset: &Dataset, index: usize, cfg: &RenderConfig, norm: DivergingNorm) {
    let fw = cfg.frame_width;
    let r = cfg.heatmap;
    let expanded = dataset.expanded_density(index);
    let (rows, cols) = expanded.shape();
    if rows == 0 {
        return;
    }

    // Nearest-neighbour sampling, image stretched over the whole panel.
    for screen_y in 0..r.h {
        let Some(row) = expanded.row(screen_y * rows / r.h) else { continue };
        for screen_x in 0..r.w {
            let v = row[screen_x * cols / r.w];
            let rgba = norm.color(v);
            put_pixel(buf, fw, r.x + screen_x, r.y + screen_y, [rgba[0], rgba[1], rgba[2]]);
        }
    }

    draw_box(buf, fw, r, AXIS_COLOR);
    draw_x_axis(buf, fw, r, 0.0, 1.0);
    draw_text_centered(buf, fw, r.x + r.w / 2, (TITLE_HEIGHT - FONT_HEIGHT) / 2, "charge density", TEXT_COLOR);
}

fn render_colorbar(buf: &mut [u8], cfg: &RenderConfig, norm: DivergingNorm) {
    let fw = cfg.frame_width;
    let bar = cfg.colorbar;
    let (vmin, vmax) = (norm.vmin, norm.vmax);

    // Gradient runs linearly in value from vmin (bottom) to vmax (top).
    for y in 0..bar.h {
        let t = 1.0 - y as f64 / (bar.h.max(2) - 1) as f64;
        let rgba = norm.color(vmin + (vmax - vmin) * t);
        hline(buf, fw, bar.x, bar.right(), bar.y + y, [rgba[0], rgba[1], rgba[2]]);
    }
    draw_box(buf, fw, bar, AXIS_COLOR);

    let tick_x = bar.right();
    let label_x = tick_x + TICK_LEN + LABEL_GAP;
    for v in colorbar_ticks(vmin, vmax) {
        let y = value_to_row(v, vmin, vmax, bar) as usize;
        hline(buf, fw, tick_x, tick_x + TICK_LEN, y, [0xFF, 0xFF, 0xFF]);
        let label_y = y.saturating_sub(FONT_HEIGHT / 2).min(bar.bottom().saturating_sub(FONT_HEIGHT));
        draw_text(buf, fw, label_x, label_y, sign_label(v), TEXT_COLOR);
    }

    draw_text(buf, fw, bar.x, (TITLE_HEIGHT - FONT_HEIGHT) / 2, "rho", TEXT_COLOR);
}

fn render_line_plot(buf: &mut [u8], dataset: &Dataset, index: usize, cfg: &RenderConfig, domain: (f64, f64), limits: (f64, f64)) {
    let fw = cfg.frame_width;
    let r = cfg.plot;
    let (x_min, x_max) = domain;
    let (y_min, y_max) = limits;

    // y ticks at both limits and the midpoint
    for k in 0..3 {
        let v = y_min + (y_max - y_min) * k as f64 / 2.0;
        let y = if y_max > y_min {
            value_to_row(v, y_min, y_max, r) as usize
        } else {
            r.y + (r.h - 1) * (2 - k) / 2
        };
        hline(buf, fw, r.x.saturating_sub(TICK_LEN + 1), r.x - 1, y, AXIS_COLOR);
        let label_y = y.saturating_sub(FONT_HEIGHT / 2);
        draw_text_right(buf, fw, r.x.saturating_sub(TICK_LEN + 3), label_y, &format_tick(v), LABEL_COLOR);
    }
    draw_box(buf, fw, r, AXIS_COLOR);
    draw_x_axis(buf, fw, r, x_min, x_max);
    draw_text_centered(buf, fw, r.x + r.w / 2, r.y - TITLE_HEIGHT + (TITLE_HEIGHT - FONT_HEIGHT) / 2, "electric field", TEXT_COLOR);
    draw_text(buf, fw, 4, r.y - TITLE_HEIGHT + (TITLE_HEIGHT - FONT_HEIGHT) / 2, "E", TEXT_COLOR);

    let samples = dataset.field_frame(index);
    let n = samples.len();
    let x_span = (r.w - 1) as f64;
    let to_px = |j: usize| -> isize {
        if n < 2 {
            r.x as isize
        } else {
            // grid point j sits at x_min + j * (x_max - x_min) / (n - 1)
            r.x as isize + (j as f64 / (n - 1) as f64 * x_span).round() as isize
        }
    };

    let mut prev: Option<(isize, isize)> = None;
    for (j, &v) in samples.iter().enumerate() {
        if !v.is_finite() {
            prev = None;
            continue;
        }
        let p = (to_px(j), value_to_row(v, y_min, y_max, r));
        let (x0, y0) = prev.unwrap_or(p);
        draw_line(buf, fw, x0, y0, p.0, p.1, r, LINE_COLOR);
        prev = Some(p);
    }
}

/// Render frame `index` into a pre-allocated RGBA buffer and return the
/// limits used. The buffer is resized as needed.
pub fn render_into(buf: &mut Vec<u8>, dataset: &Dataset, index: usize, domain: (f64, f64), cfg: &RenderConfig) -> FrameLimits {
    buf.resize(cfg.frame_width * cfg.frame_height * 4, 0);
    for px in buf.chunks_exact_mut(4) {
        px.copy_from_slice(&[BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255]);
    }

    let limits = frame_limits(dataset, index);
    let norm = DivergingNorm::new(limits.density.0, limits.density.1);

    render_heatmap(buf, dataset, index, cfg, norm);
    render_colorbar(buf, cfg, norm);
    render_line_plot(buf, dataset, index, cfg, domain, limits.field);

    limits
}

/// Render frame `index` to a new RGBA buffer (test convenience wrapper).
#[cfg(test)]
pub fn render(dataset: &Dataset, index: usize, cfg: &RenderConfig) -> (Vec<u8>, FrameLimits) {
    let mut buf = Vec::new();
    let limits = render_into(&mut buf, dataset, index, (0.0, 1.0), cfg);
    (buf, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::color::map_to_rgba;
    use crate::loader::Matrix;
    use crate::playback::{value_range, PlaybackState};

    fn dataset(field: Vec<Vec<f64>>, density: Vec<Vec<f64>>) -> Dataset {
        Dataset::new(
            Matrix::from_rows(field).unwrap(),
            Matrix::from_rows(density).unwrap(),
        )
        .unwrap()
    }

    fn scenario() -> Dataset {
        dataset(
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            vec![vec![0.0, -1.0], vec![2.0, 2.0]],
        )
    }

    fn pixel(buf: &[u8], cfg: &RenderConfig, x: usize, y: usize) -> [u8; 3] {
        let off = (y * cfg.frame_width + x) * 4;
        [buf[off], buf[off + 1], buf[off + 2]]
    }

    fn rgb(c: [u8; 4]) -> [u8; 3] {
        [c[0], c[1], c[2]]
    }

    #[test]
    fn test_render_config_fit() {
        let cfg = RenderConfig::fit(960, 720);
        assert_eq!(cfg.frame_width, 960);
        assert_eq!(cfg.frame_height, 720);
        assert_eq!(cfg.heatmap.w, cfg.plot.w);
        assert_eq!(cfg.heatmap.x, cfg.plot.x);
        assert!(cfg.heatmap.bottom() < cfg.plot.y);
        assert!(cfg.plot.bottom() + X_AXIS_HEIGHT <= cfg.status_y);
        assert_eq!(cfg.status_y + STATUS_BAR_HEIGHT, cfg.frame_height);
        assert!(cfg.colorbar.right() + TICK_LEN + LABEL_GAP <= cfg.frame_width);
    }

    #[test]
    fn test_render_config_tiny_window_is_clamped() {
        let cfg = RenderConfig::fit(10, 10);
        assert!(cfg.heatmap.w >= MIN_PANEL);
        assert!(cfg.heatmap.h >= MIN_PANEL);
        assert!(cfg.plot.h >= MIN_PANEL);
    }

    #[test]
    fn test_render_buffer_size() {
        let cfg = RenderConfig::fit(400, 300);
        let (buf, _) = render(&scenario(), 0, &cfg);
        assert_eq!(buf.len(), cfg.frame_width * cfg.frame_height * 4);
    }

    #[test]
    fn test_render_into_reuses_buffer() {
        let ds = scenario();
        let cfg = RenderConfig::fit(400, 300);
        let mut buf = vec![7u8; 3];
        render_into(&mut buf, &ds, 1, (0.0, 1.0), &cfg);
        assert_eq!(buf.len(), cfg.frame_width * cfg.frame_height * 4);
        assert!(buf.chunks_exact(4).all(|p| p[3] == 255), "every pixel should be opaque");
    }

    #[test]
    fn test_heatmap_columns_follow_density() {
        let ds = scenario();
        let cfg = RenderConfig::fit(400, 300);
        let (buf, limits) = render(&ds, 0, &cfg);
        let norm = DivergingNorm::new(limits.density.0, limits.density.1);
        let r = cfg.heatmap;
        let left = r.x + r.w / 4;
        let right = r.x + 3 * r.w / 4;
        for y in [r.y, r.y + r.h / 2, r.bottom() - 1] {
            assert_eq!(pixel(&buf, &cfg, left, y), rgb(norm.color(0.0)));
            assert_eq!(pixel(&buf, &cfg, right, y), rgb(norm.color(-1.0)));
        }
        // Zero is the neutral color.
        assert_eq!(pixel(&buf, &cfg, left, r.y), [255, 255, 255]);
    }

    #[test]
    fn test_limits_are_current_frame_extrema() {
        let ds = dataset(
            vec![vec![0.0, 1.0, 2.0], vec![-10.0, 0.0, 10.0], vec![3.0, 3.5, 4.0]],
            vec![vec![-1.0, 1.0], vec![0.25, 0.5], vec![-4.0, -2.0]],
        );
        let cfg = RenderConfig::fit(320, 240);
        for i in 0..ds.frame_count() {
            let (_, limits) = render(&ds, i, &cfg);
            assert_eq!(limits.density, value_range(ds.density_frame(i)));
            assert_eq!(limits.field, value_range(ds.field_frame(i)));
        }
        let (_, last) = render(&ds, 2, &cfg);
        assert_eq!(last.field, (3.0, 4.0));
        assert_eq!(last.density, (-4.0, -2.0));
    }

    #[test]
    fn test_every_frame_renders_once_per_pass() {
        let n = 6;
        let field: Vec<Vec<f64>> = (0..n).map(|i| (0..50).map(|j| (i * j) as f64).collect()).collect();
        let density: Vec<Vec<f64>> = (0..n).map(|i| (0..20).map(|j| j as f64 - i as f64).collect()).collect();
        let ds = dataset(field, density);
        let cfg = RenderConfig::fit(320, 240);
        let mut pb = PlaybackState::new(ds.frame_count(), 1.0, 0.0, false);
        let mut rendered = Vec::new();
        let mut buf = Vec::new();
        render_into(&mut buf, &ds, pb.current_frame, (0.0, 1.0), &cfg);
        rendered.push(pb.current_frame);
        while !pb.is_finished() {
            if pb.tick(1.0) {
                render_into(&mut buf, &ds, pb.current_frame, (0.0, 1.0), &cfg);
                rendered.push(pb.current_frame);
            }
        }
        assert_eq!(rendered, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_line_plot_spans_limits() {
        // Increasing ramp: first sample at the bottom-left, last at the top-right.
        let ds = dataset(vec![vec![0.0, 1.0, 2.0, 3.0, 4.0]], vec![vec![0.0]]);
        let cfg = RenderConfig::fit(320, 240);
        let (buf, limits) = render(&ds, 0, &cfg);
        assert_eq!(limits.field, (0.0, 4.0));
        let r = cfg.plot;
        assert_eq!(pixel(&buf, &cfg, r.x, r.bottom() - 1), LINE_COLOR);
        assert_eq!(pixel(&buf, &cfg, r.right() - 1, r.y), LINE_COLOR);
    }

    #[test]
    fn test_line_plot_flat_frame_draws_middle_row() {
        let ds = dataset(vec![vec![2.0; 10]], vec![vec![1.0, 1.0]]);
        let cfg = RenderConfig::fit(320, 240);
        let (buf, _) = render(&ds, 0, &cfg);
        let r = cfg.plot;
        let mid = value_to_row(2.0, 2.0, 2.0, r) as usize;
        assert_eq!(pixel(&buf, &cfg, r.x + r.w / 2, mid), LINE_COLOR);
    }

    #[test]
    fn test_colorbar_ticks() {
        assert_eq!(colorbar_ticks(-1.0, 0.0), vec![0.0, -1.0]);
        assert_eq!(colorbar_ticks(-2.0, 3.0), vec![3.0, 0.0, -2.0]);
        assert_eq!(colorbar_ticks(2.0, 2.0), vec![2.0]);
        assert_eq!(colorbar_ticks(1.0, 5.0), vec![5.0, 1.0]);
    }

    #[test]
    fn test_colorbar_labels_for_scenario_frame() {
        let ds = scenario();
        let limits = frame_limits(&ds, 0);
        let labels: Vec<&str> = colorbar_ticks(limits.density.0, limits.density.1)
            .into_iter()
            .map(sign_label)
            .collect();
        assert_eq!(labels, vec!["0", "-"]);
    }

    #[test]
    fn test_colorbar_gradient_ends() {
        let ds = dataset(vec![vec![0.0, 1.0]], vec![vec![-3.0, 5.0]]);
        let cfg = RenderConfig::fit(400, 300);
        let (buf, _) = render(&ds, 0, &cfg);
        let bar = cfg.colorbar;
        let cx = bar.x + bar.w / 2;
        assert_eq!(pixel(&buf, &cfg, cx, bar.y), rgb(map_to_rgba(1.0)));
        assert_eq!(pixel(&buf, &cfg, cx, bar.bottom() - 1), rgb(map_to_rgba(0.0)));
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(0.5), "0.500");
        assert_eq!(format_tick(1.0), "1.00");
        assert_eq!(format_tick(-250.0), "-250");
        assert_eq!(format_tick(0.0001), "1.0e-4");
    }
}
