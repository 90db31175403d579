//! Interactive review of a recorded buffer.

use std::path::PathBuf;
use std::sync::Arc;

use framesnap_common::config::AppConfig;
use framesnap_export_engine::{
    export_frames, ExportProgress, ExportSelector, ProgressCallback, SnapshotSaver,
};
use framesnap_frame_model::FrameBuffer;
use framesnap_playback_engine::{PlaybackController, SPEED_PRESETS};

use crate::terminal::{Input, TerminalPresenter};

const HELP: &str = "\
Playback:  play | pause | next | prev | +10 | -10 | seek N | start | end | speed X
Selection: select N | bookmark | stride [N] | all | none
Export:    save | save-bookmarks | snap
Other:     status | clear | help | quit
Frame numbers are 1-based.";

#[derive(Debug, Clone, PartialEq)]
enum ReviewCommand {
    Play,
    Pause,
    Step(i64),
    Seek(i64),
    Start,
    End,
    Speed(f64),
    Select(usize),
    Bookmark,
    Stride(Option<usize>),
    SelectAll,
    SelectNone,
    Save,
    SaveBookmarks,
    Snap,
    Status,
    Clear,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<ReviewCommand, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(ReviewCommand::Status);
    };
    let arg = words.next();
    let number = |what: &str| -> Result<i64, String> {
        arg.ok_or_else(|| format!("{verb} needs {what}"))?
            .parse::<i64>()
            .map_err(|e| format!("Invalid {what}: {e}"))
    };

    let command = match verb {
        "play" | "p" => ReviewCommand::Play,
        "pause" => ReviewCommand::Pause,
        "next" | "n" => ReviewCommand::Step(1),
        "prev" | "b" => ReviewCommand::Step(-1),
        "+10" => ReviewCommand::Step(10),
        "-10" => ReviewCommand::Step(-10),
        "seek" => ReviewCommand::Seek(number("a frame number")? - 1),
        "start" => ReviewCommand::Start,
        "end" => ReviewCommand::End,
        "speed" => {
            let speed = arg
                .ok_or_else(|| format!("speed needs one of {SPEED_PRESETS:?}"))?
                .trim_end_matches('x')
                .parse::<f64>()
                .map_err(|e| format!("Invalid speed: {e}"))?;
            ReviewCommand::Speed(speed)
        }
        "select" => {
            let frame = number("a frame number")?;
            if frame < 1 {
                return Err("Frame numbers start at 1".to_string());
            }
            ReviewCommand::Select(frame as usize - 1)
        }
        "bookmark" | "m" => ReviewCommand::Bookmark,
        "stride" => match arg {
            Some(_) => {
                let n = number("a stride")?;
                if n < 1 {
                    return Err("Stride must be at least 1".to_string());
                }
                ReviewCommand::Stride(Some(n as usize))
            }
            None => ReviewCommand::Stride(None),
        },
        "all" => ReviewCommand::SelectAll,
        "none" => ReviewCommand::SelectNone,
        "save" => ReviewCommand::Save,
        "save-bookmarks" => ReviewCommand::SaveBookmarks,
        "snap" | "s" => ReviewCommand::Snap,
        "status" => ReviewCommand::Status,
        "clear" => ReviewCommand::Clear,
        "help" | "?" => ReviewCommand::Help,
        "quit" | "q" | "exit" => ReviewCommand::Quit,
        other => return Err(format!("Unknown command '{other}'; type help")),
    };
    Ok(command)
}

pub async fn run(
    buffer: FrameBuffer,
    config: &AppConfig,
    output_dir: PathBuf,
    input: &mut Input,
) -> anyhow::Result<()> {
    let controller = PlaybackController::new(
        buffer.clone(),
        Arc::new(TerminalPresenter::new("Frame")),
        &config.playback,
    )?;
    let mut selector = ExportSelector::new();
    let mut snapshots = SnapshotSaver::new(output_dir.join("screenshots"));

    let mut updates = controller.subscribe();
    let watcher = tokio::spawn(async move {
        let mut was_playing = false;
        while updates.changed().await.is_ok() {
            let state = *updates.borrow_and_update();
            if was_playing && !state.playing {
                println!("\nStopped at #{}", state.current_index + 1);
            }
            was_playing = state.playing;
        }
    });

    println!("Reviewing {} frames.", buffer.len());
    println!("{HELP}");
    controller.refresh();

    while let Some(line) = input.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        let current = controller.state().current_index;

        match command {
            ReviewCommand::Play => controller.play(),
            ReviewCommand::Pause => controller.pause(),
            ReviewCommand::Step(delta) => controller.step(delta),
            ReviewCommand::Seek(index) => controller.seek(index),
            ReviewCommand::Start => controller.jump_to_start(),
            ReviewCommand::End => controller.jump_to_end(),
            ReviewCommand::Speed(speed) => match controller.set_speed(speed) {
                Ok(()) => println!("Speed {speed}x, {:?} per frame", controller.tick_interval()),
                Err(e) => println!("{e}"),
            },
            ReviewCommand::Select(index) => {
                if index >= buffer.len() {
                    println!("Frame #{} does not exist", index + 1);
                } else {
                    let on = selector.toggle_selected(index);
                    println!("Frame #{} {}", index + 1, if on { "selected" } else { "deselected" });
                }
            }
            ReviewCommand::Bookmark => {
                if !buffer.is_empty() {
                    let on = selector.toggle_bookmark(current);
                    println!("Frame #{} {}", current + 1, if on { "bookmarked" } else { "unbookmarked" });
                }
            }
            ReviewCommand::Stride(n) => {
                let n = n.unwrap_or(config.export.stride);
                let picked = selector.apply_stride(n, buffer.len());
                println!("Selected every {n}th frame plus the last: {picked} frames");
            }
            ReviewCommand::SelectAll => selector.select_all(buffer.len()),
            ReviewCommand::SelectNone => selector.deselect_all(),
            ReviewCommand::Save => {
                save(&buffer, selector.selected().collect(), output_dir.clone(), "selected").await
            }
            ReviewCommand::SaveBookmarks => {
                save(&buffer, selector.bookmarks().collect(), output_dir.clone(), "bookmarked").await
            }
            ReviewCommand::Snap => {
                if !buffer.is_empty() {
                    match snapshots.save(&buffer, current) {
                        Ok(path) => println!("\nSnapshot {} saved to {}", snapshots.count(), path.display()),
                        Err(e) => println!("\nSnapshot failed: {e}"),
                    }
                }
            }
            ReviewCommand::Status => print_status(&controller, &selector, &buffer),
            ReviewCommand::Clear => {
                controller.reset();
                buffer.clear();
                selector.clear();
                println!("Buffer cleared.");
            }
            ReviewCommand::Help => println!("{HELP}"),
            ReviewCommand::Quit => break,
        }
    }

    controller.pause();
    watcher.abort();
    println!();
    Ok(())
}

async fn save(buffer: &FrameBuffer, indices: Vec<usize>, dir: PathBuf, label: &str) {
    if indices.is_empty() {
        println!("No {label} frames to save.");
        return;
    }
    let buffer = buffer.clone();
    let progress: ProgressCallback = Box::new(|p: ExportProgress| {
        tracing::debug!(saved = p.frames_saved, total = p.total_frames, stage = ?p.stage, "Export progress");
    });
    let result =
        tokio::task::spawn_blocking(move || export_frames(&buffer, indices, &dir, Some(progress)))
            .await;

    match result {
        Ok(Ok(summary)) => println!(
            "\nSaved {} {label} frames to {}",
            summary.saved,
            summary.output_dir.display()
        ),
        Ok(Err(e)) => println!("\nExport failed: {e}"),
        Err(e) => println!("\nExport task failed: {e}"),
    }
}

fn print_status(controller: &PlaybackController, selector: &ExportSelector, buffer: &FrameBuffer) {
    let state = controller.state();
    println!(
        "\n#{}/{} {} at {}x | selected: {} | bookmarks: {}",
        (state.current_index + 1).min(buffer.len()),
        buffer.len(),
        if state.playing { "playing" } else { "paused" },
        state.speed_multiplier,
        selector.selected_count(),
        selector.bookmark_count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_commands_parse() {
        assert_eq!(parse_command("next"), Ok(ReviewCommand::Step(1)));
        assert_eq!(parse_command("-10"), Ok(ReviewCommand::Step(-10)));
        assert_eq!(parse_command("seek 20"), Ok(ReviewCommand::Seek(19)));
        assert_eq!(parse_command("seek -3"), Ok(ReviewCommand::Seek(-4)));
        assert_eq!(parse_command("speed 2x"), Ok(ReviewCommand::Speed(2.0)));
        assert_eq!(parse_command("  "), Ok(ReviewCommand::Status));
    }

    #[test]
    fn selection_commands_are_one_based() {
        assert_eq!(parse_command("select 1"), Ok(ReviewCommand::Select(0)));
        assert!(parse_command("select 0").is_err());
        assert_eq!(parse_command("stride"), Ok(ReviewCommand::Stride(None)));
        assert_eq!(parse_command("stride 3"), Ok(ReviewCommand::Stride(Some(3))));
        assert!(parse_command("stride 0").is_err());
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(parse_command("seek").is_err());
        assert!(parse_command("speed fast").is_err());
        assert!(parse_command("rewind").is_err());
    }
}
