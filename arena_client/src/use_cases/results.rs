// Formats the terminal match result for the results screen.

use crate::domain::{MatchResult, PlayerResult, ResultSummary};
use tracing::warn;

const WIN_BANNER: &str = "You Win, Congratulations!";
const LOSS_BANNER: &str = "You Lost, Better Luck Next Time!";
const TIE_BANNER: &str = "It's a Tie!";
const ERROR_BANNER: &str = "Game ended due to error in player code.";

/// Presents a match result at most once per match.
#[derive(Debug, Default)]
pub struct ResultPresenter {
    presented: bool,
}

impl ResultPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> bool {
        self.presented
    }

    /// Returns the summary on the first call; later calls return None.
    pub fn present(&mut self, result: &MatchResult) -> Option<ResultSummary> {
        if self.presented {
            warn!("match result already presented; ignoring duplicate");
            return None;
        }
        self.presented = true;
        Some(summarize(result))
    }
}

pub fn summarize(result: &MatchResult) -> ResultSummary {
    let banner = if result.is_tie {
        TIE_BANNER
    } else if result.winner_declared {
        WIN_BANNER
    } else {
        LOSS_BANNER
    };

    ResultSummary {
        banner: banner.to_string(),
        error_banner: result
            .terminated_by_error
            .then(|| ERROR_BANNER.to_string()),
        lines: result.players.iter().map(player_line).collect(),
    }
}

fn player_line(player: &PlayerResult) -> String {
    match player.survival_time_seconds {
        Some(seconds) => format!(
            "{} survived {} seconds",
            player.class_name,
            format_seconds(seconds)
        ),
        None => format!("{} survived the entire game!", player.class_name),
    }
}

// Two decimals at most, without trailing zeros.
fn format_seconds(seconds: f64) -> String {
    let fixed = format!("{seconds:.2}");
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
