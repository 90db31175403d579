//! Terminal presentation and input helpers.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use framesnap_frame_model::{Frame, Presenter};

/// Line reader over stdin shared by the capture and review phases.
pub type Input = Lines<BufReader<Stdin>>;

pub fn stdin_lines() -> Input {
    BufReader::new(tokio::io::stdin()).lines()
}

/// Prints a one-line status for each presented frame.
pub struct TerminalPresenter {
    label: &'static str,
}

impl TerminalPresenter {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Presenter for TerminalPresenter {
    fn present(&self, frame: &Frame, index: usize, total: usize) {
        let mut out = std::io::stdout().lock();
        let _ = write!(
            out,
            "\r{} #{}/{} ({}x{})   ",
            self.label,
            index + 1,
            total,
            frame.width(),
            frame.height()
        );
        let _ = out.flush();
    }
}
