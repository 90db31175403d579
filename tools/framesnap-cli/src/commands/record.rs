//! Record a screen region, then hand the buffer to the review prompt.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;

use framesnap_capture_engine::{backend, CaptureEvent, Recorder};
use framesnap_common::clock::RecordingClock;
use framesnap_common::config::AppConfig;
use framesnap_frame_model::{FrameBuffer, Region};

use crate::commands::review;
use crate::terminal::{self, TerminalPresenter};

pub struct RecordArgs {
    pub region: String,
    pub fps: Option<u32>,
    pub duration: Option<f64>,
    pub countdown: bool,
    pub output: Option<PathBuf>,
}

pub async fn run(mut config: AppConfig, args: RecordArgs) -> anyhow::Result<()> {
    if let Some(fps) = args.fps {
        config.recording.fps = fps;
    }
    config.validate()?;

    let Some(region) = parse_region(&args.region, config.recording.min_region_size)? else {
        println!(
            "Selection is not larger than {0}x{0} pixels; nothing to record.",
            config.recording.min_region_size
        );
        return Ok(());
    };
    let output_dir = args
        .output
        .or_else(|| config.export.output_dir.clone())
        .unwrap_or_else(default_output_dir);

    let buffer = match config.recording.max_frames {
        Some(limit) => FrameBuffer::with_limit(limit),
        None => FrameBuffer::new(),
    };

    println!("Recording region {region} at {} fps", config.recording.fps);
    println!("  Output: {}", output_dir.display());
    println!();

    if args.countdown {
        for remaining in (1..=config.recording.countdown_secs).rev() {
            println!("Starting in {remaining}...");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let mut recorder = Recorder::new(
        buffer.clone(),
        config.recording.fps,
        Box::new(backend::default_grabber),
    )
    .with_presenter(Arc::new(TerminalPresenter::new("Recording")))
    .with_events(events_tx);

    let mut input = terminal::stdin_lines();

    recorder.on_start_confirmed(region).await?;
    println!("Type p + Enter to pause/resume, s + Enter (or Ctrl+C) to stop.");

    let deadline = args
        .duration
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs_f64(secs));
    let auto_stop = async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(auto_stop);

    loop {
        tokio::select! {
            line = input.next_line() => match line?.as_deref().map(str::trim) {
                Some("p") => match recorder.toggle_pause() {
                    Ok(true) => println!("\nPaused."),
                    Ok(false) => println!("\nResumed."),
                    Err(e) => println!("\n{e}"),
                },
                Some("s") | None => break,
                Some(_) => {}
            },
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut auto_stop => {
                println!("\nDuration reached.");
                break;
            }
            Some(event) = events.recv() => {
                if let CaptureEvent::Failed { message } = event {
                    println!("\nCapture failed: {message}");
                    break;
                }
            }
        }
    }

    println!();
    match recorder.on_stop_requested().await {
        Ok(Some(stats)) => println!(
            "Captured {} frames ({} ticks skipped while paused, {} overran).",
            stats.frames_captured, stats.paused_ticks, stats.overrun_ticks
        ),
        Ok(None) => {}
        Err(e) if e.is_fatal_to_session() => {
            tracing::error!(error = %e, "Recording ended with an error");
            println!("Recording ended with an error: {e}");
            println!("Frames captured before the failure are kept.");
        }
        Err(e) => return Err(e.into()),
    }

    let Some(last) = buffer.len().checked_sub(1) else {
        println!("No frames were captured.");
        return Ok(());
    };
    let span = buffer.get(last)?.captured_at_ns();
    println!(
        "Buffer holds {} frames, last captured {:.1}s into its session.",
        buffer.len(),
        RecordingClock::ns_to_secs(span)
    );

    review::run(buffer, &config, output_dir, &mut input).await
}

/// Parse `LEFT,TOP,WIDTH,HEIGHT`. Returns `None` when the rectangle is too
/// small to count as a selection.
fn parse_region(spec: &str, min_size: u32) -> anyhow::Result<Option<Region>> {
    let parts = spec
        .split(',')
        .map(|p| p.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid region '{spec}', expected LEFT,TOP,WIDTH,HEIGHT"))?;
    let [left, top, width, height] = parts[..] else {
        anyhow::bail!("Invalid region '{spec}', expected four comma-separated numbers");
    };
    if width <= 0 || height <= 0 {
        anyhow::bail!("Region width and height must be positive");
    }

    let corner = |x: i64, y: i64| -> anyhow::Result<(i32, i32)> {
        Ok((
            i32::try_from(x).context("Region exceeds the desktop coordinate range")?,
            i32::try_from(y).context("Region exceeds the desktop coordinate range")?,
        ))
    };
    let start = corner(left, top)?;
    let end = corner(left.saturating_add(width), top.saturating_add(height))?;
    Ok(Region::from_drag(start, end, min_size))
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(format!(
        "framesnap_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}
