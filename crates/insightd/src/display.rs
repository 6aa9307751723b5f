//! Terminal display driven by controller views.
//!
//! Shows a thinking bar while a request is outstanding and a one-line status
//! when an insight lands. Display failures never touch the controller.
//!
//! Only draws when stderr is a TTY and NO_COLOR is unset; otherwise changes
//! are printed as plain lines.

use crate::render::render_view;
use indicatif::{ProgressBar, ProgressStyle};
use insight_common::{ControllerView, ModeFlag};
use std::io::IsTerminal;
use tokio::sync::watch;

pub struct TerminalDisplay {
    bar: Option<ProgressBar>,
    interactive: bool,
    last_line: Option<String>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        let interactive = std::io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err();
        Self {
            bar: None,
            interactive,
            last_line: None,
        }
    }

    /// Follow the view channel until the controller is dropped.
    pub async fn run(mut self, mut views: watch::Receiver<ControllerView>) {
        loop {
            let view = views.borrow_and_update().clone();
            self.show(&view);
            if views.changed().await.is_err() {
                break;
            }
        }
        self.clear();
    }

    fn show(&mut self, view: &ControllerView) {
        match view.mode {
            ModeFlag::Analyzing => self.show_thinking(view),
            ModeFlag::Neutral => {
                self.clear();
                self.print_line(render_view(view, self.interactive));
            }
        }
    }

    fn show_thinking(&mut self, view: &ControllerView) {
        if !self.interactive {
            // One line per request is enough for logs
            if view.progress == 0.0 {
                self.print_line(render_view(view, false));
            }
            return;
        }

        let bar = self.bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(100);
            let style = ProgressStyle::default_bar()
                .template("{spinner} {msg} [{bar:30}] {pos:>3}%")
                .map(|s| s.progress_chars("=> "));
            if let Ok(style) = style {
                pb.set_style(style);
            }
            pb.set_message("analyzing");
            pb.enable_steady_tick(std::time::Duration::from_millis(80));
            pb
        });
        bar.set_position(view.progress.clamp(0.0, 100.0) as u64);
    }

    fn print_line(&mut self, line: String) {
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        eprintln!("{}", line);
        self.last_line = Some(line);
    }

    fn clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}
