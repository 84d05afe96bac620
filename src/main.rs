mod config;
mod iterm2;
mod loader;
mod playback;
mod renderer;
mod reshape;

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::{debug, info};

use config::Config;
use loader::Dataset;
use playback::{FrameLimits, Phase, PlaybackState};
use renderer::RenderConfig;

struct Defaults;

impl Defaults {
    const HEADLESS_WIDTH: usize = 960;
    const HEADLESS_HEIGHT: usize = 720;
    /// Polling interval once playback has ended, or when fps gives no usable interval.
    const HEADLESS_IDLE_MS: u64 = 50;
}

#[derive(Parser, Debug)]
#[command(name = "chargeview")]
#[command(about = "Animate charge density and electric field snapshots")]
#[command(version)]
struct Args {
    /// Electric field samples, one frame per line
    #[arg(long)]
    field: Option<PathBuf>,

    /// Charge density samples, one frame per line
    #[arg(long)]
    density: Option<PathBuf>,

    /// YAML config file
    #[arg(long, default_value = config::DEFAULT_PATH)]
    config: PathBuf,

    /// Stream frames to the terminal as iTerm2 inline images
    #[arg(long)]
    headless: bool,
}

/// Convert RGBA &[u8] buffer to 0RGB &[u32] buffer for minifb.
fn rgba_to_argb(rgba: &[u8], out: &mut [u32]) {
    for (i, pixel) in rgba.chunks_exact(4).enumerate() {
        out[i] = (pixel[0] as u32) << 16 | (pixel[1] as u32) << 8 | pixel[2] as u32;
    }
}

fn format_status(playback: &PlaybackState, limits: &FrameLimits) -> String {
    let state = match playback.phase {
        Phase::Init => "wait",
        Phase::Playing => "play",
        Phase::Finished => "end",
    };
    format!(
        "frame {}/{} {state} | rho {:.2e} {:.2e} | E {:.2e} {:.2e} | q=quit",
        playback.current_frame + 1,
        playback.frame_count(),
        limits.density.0,
        limits.density.1,
        limits.field.0,
        limits.field.1,
    )
}

/// Render the current frame plus status bar into `buf`.
fn draw_frame(buf: &mut Vec<u8>, dataset: &Dataset, playback: &PlaybackState, domain: (f64, f64), cfg: &RenderConfig) {
    let limits = renderer::render_into(buf, dataset, playback.current_frame, domain, cfg);
    renderer::render_status(buf, cfg, &format_status(playback, &limits));
    debug!(frame = playback.current_frame, ?limits, "rendered");
}

/// Sleep between headless frames. Rates with no representable period fall
/// back to the idle interval.
fn frame_interval(fps: f64) -> Duration {
    let idle = Duration::from_millis(Defaults::HEADLESS_IDLE_MS);
    if fps > 0.0 {
        Duration::try_from_secs_f64(1.0 / fps).unwrap_or(idle)
    } else {
        idle
    }
}

/// Record the window size reported by minifb. Returns true when it differs
/// from the last report, independent of any clamping applied by the layout.
fn window_resized(last: &mut (usize, usize), now: (usize, usize)) -> bool {
    if *last == now {
        return false;
    }
    *last = now;
    true
}

fn new_playback(config: &Config, dataset: &Dataset) -> PlaybackState {
    PlaybackState::new(
        dataset.frame_count(),
        config.playback.fps,
        config.playback.start_delay,
        config.playback.repeat,
    )
}

fn run_gui(config: &Config, dataset: &Dataset, running: &AtomicBool) -> Result<()> {
    let domain = (config.domain.x_min, config.domain.x_max);
    let mut render_cfg = RenderConfig::fit(config.display.width, config.display.height);
    let mut w = render_cfg.frame_width;
    let mut h = render_cfg.frame_height;

    let mut window = Window::new(
        "chargeview",
        w,
        h,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )
    .context("failed to create window")?;
    window.set_target_fps(config.display.target_fps);

    let mut playback = new_playback(config, dataset);
    let mut framebuf = vec![0u32; w * h];
    let mut rgba_buf: Vec<u8> = Vec::new();
    let mut needs_redraw = true;
    let mut last_tick = Instant::now();
    let mut window_size = window.get_size();

    while window.is_open() && running.load(Ordering::SeqCst) {
        if window.is_key_pressed(Key::Escape, KeyRepeat::No) || window.is_key_pressed(Key::Q, KeyRepeat::No) {
            break;
        }

        let now = Instant::now();
        let phase = playback.phase;
        if playback.tick(now.duration_since(last_tick).as_secs_f64()) || playback.phase != phase {
            needs_redraw = true;
        }
        last_tick = now;

        // --- Check for window resize ---
        if window_resized(&mut window_size, window.get_size()) {
            render_cfg = RenderConfig::fit(window_size.0, window_size.1);
            w = render_cfg.frame_width;
            h = render_cfg.frame_height;
            framebuf = vec![0u32; w * h];
            needs_redraw = true;
        }

        if needs_redraw {
            draw_frame(&mut rgba_buf, dataset, &playback, domain, &render_cfg);
            rgba_to_argb(&rgba_buf, &mut framebuf);
            needs_redraw = false;
        }

        window
            .update_with_buffer(&framebuf, w, h)
            .context("failed to update window")?;
    }

    info!(frames_shown = playback.frames_shown(), "window closed");
    Ok(())
}

fn run_headless(config: &Config, dataset: &Dataset, running: &AtomicBool) -> Result<()> {
    let domain = (config.domain.x_min, config.domain.x_max);
    let render_cfg = RenderConfig::fit(Defaults::HEADLESS_WIDTH, Defaults::HEADLESS_HEIGHT);
    let play_interval = frame_interval(config.playback.fps);
    let idle_interval = Duration::from_millis(Defaults::HEADLESS_IDLE_MS);

    // Terminal setup
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::with_capacity(4 * 1024 * 1024, stdout.lock());
    write!(out, "\x1b[?1049h\x1b[?25l\x1b[2J").context("failed to set up terminal")?;
    out.flush().context("failed to set up terminal")?;

    let mut encoder = iterm2::Iterm2Encoder::new();
    let mut rgba_buf: Vec<u8> = Vec::new();
    let mut playback = new_playback(config, dataset);
    let mut needs_redraw = true;
    let mut last_tick = Instant::now();

    let result = (|| -> Result<()> {
        while running.load(Ordering::SeqCst) {
            let frame_start = Instant::now();

            let phase = playback.phase;
            if playback.tick(frame_start.duration_since(last_tick).as_secs_f64()) || playback.phase != phase {
                needs_redraw = true;
            }
            last_tick = frame_start;

            if needs_redraw {
                draw_frame(&mut rgba_buf, dataset, &playback, domain, &render_cfg);
                let seq = encoder
                    .encode(
                        &rgba_buf,
                        render_cfg.frame_width,
                        render_cfg.frame_height,
                        render_cfg.frame_width,
                        render_cfg.frame_height,
                    )
                    .context("failed to encode frame")?;
                out.write_all(b"\x1b[H").context("failed to write frame")?;
                out.write_all(seq).context("failed to write frame")?;
                out.flush().context("failed to write frame")?;
                needs_redraw = false;
            }

            let interval = if playback.is_finished() { idle_interval } else { play_interval };
            let elapsed = frame_start.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        Ok(())
    })();

    // Terminal restore
    let _ = write!(out, "\x1b[?25h\x1b[?1049l");
    let _ = out.flush();

    info!(frames_shown = playback.frames_shown(), "headless playback stopped");
    result
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = config::load(&args.config);
    if let Some(field) = args.field {
        config.input.field = field;
    }
    if let Some(density) = args.density {
        config.input.density = density;
    }

    let dataset = Dataset::load(&config.input.field, &config.input.density)
        .context("failed to load input data")?;
    info!(
        frames = dataset.frame_count(),
        field_points = dataset.field_len(),
        density_points = dataset.density_len(),
        "loaded {} and {}",
        config.input.field.display(),
        config.input.density.display(),
    );

    // Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    if args.headless {
        run_headless(&config, &dataset, &running)
    } else {
        run_gui(&config, &dataset, &running)
    }
}
