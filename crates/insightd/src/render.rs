//! Status-line projection of controller state.
//!
//! Pure: takes the mode, progress and insight and returns text. Nothing in
//! here feeds back into the controller.

use insight_common::{ControllerView, Insight, ModeFlag};
use owo_colors::OwoColorize;

/// Render without colors
pub fn render(mode: ModeFlag, progress: f64, insight: Option<&Insight>) -> String {
    let head = match mode {
        ModeFlag::Neutral => "[insight] idle".to_string(),
        ModeFlag::Analyzing => format!("[insight] analyzing {:>3.0}%", progress.clamp(0.0, 100.0)),
    };
    match insight {
        Some(insight) => format!("{}  |  {}", head, insight_text(insight)),
        None => head,
    }
}

/// Render with ANSI colors
pub fn render_colored(mode: ModeFlag, progress: f64, insight: Option<&Insight>) -> String {
    let head = match mode {
        ModeFlag::Neutral => format!("{} {}", "[insight]".bright_cyan(), "idle".dimmed()),
        ModeFlag::Analyzing => format!(
            "{} {} {}",
            "[insight]".bright_cyan(),
            "analyzing".bright_yellow(),
            format!("{:>3.0}%", progress.clamp(0.0, 100.0)).bold()
        ),
    };
    match insight {
        Some(insight) => {
            let alert = insight.alert.as_deref().unwrap_or("no alert");
            let rec = insight.recommendation.as_deref().unwrap_or("no recommendation");
            format!("{}  |  {} -> {}", head, alert.bright_red(), rec.bright_green())
        }
        None => head,
    }
}

/// Convenience over a whole view
pub fn render_view(view: &ControllerView, color: bool) -> String {
    let insight = view.insight.as_ref().map(|p| &p.insight);
    if color {
        render_colored(view.mode, view.progress, insight)
    } else {
        render(view.mode, view.progress, insight)
    }
}

fn insight_text(insight: &Insight) -> String {
    format!(
        "{} -> {}",
        insight.alert.as_deref().unwrap_or("no alert"),
        insight.recommendation.as_deref().unwrap_or("no recommendation")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_idle() {
        assert_eq!(render(ModeFlag::Neutral, 0.0, None), "[insight] idle");
    }

    #[test]
    fn test_render_analyzing_with_insight() {
        let insight = Insight::new("Flux spike", "Stabilize");
        assert_eq!(
            render(ModeFlag::Analyzing, 42.4, Some(&insight)),
            "[insight] analyzing  42%  |  Flux spike -> Stabilize"
        );
    }

    #[test]
    fn test_render_partial_insight() {
        let insight = Insight {
            alert: None,
            recommendation: Some("Hold".to_string()),
        };
        assert_eq!(
            render(ModeFlag::Neutral, 0.0, Some(&insight)),
            "[insight] idle  |  no alert -> Hold"
        );
    }

    #[test]
    fn test_render_view_uses_published_insight() {
        let view = ControllerView {
            insight: Some(insight_common::PublishedInsight::now(Insight::new("a", "b"))),
            ..ControllerView::default()
        };
        assert!(render_view(&view, false).ends_with("a -> b"));
        assert!(render_view(&view, true).contains("a"));
    }
}
