//! Command classification for text addressed to the bot.

use std::sync::LazyLock;

use rand::seq::SliceRandom;
use regex::Regex;
use strum::Display;

static HELP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)help$").expect("valid help pattern"));
static COMIC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)xkcd").expect("valid comic pattern"));
static REPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)show number of (.+?) in (\w+)$").expect("valid report pattern")
});
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug pattern"));

const PLEASANTRIES: [&str; 8] = [
    "Certainly",
    "Of course",
    "Sure",
    "No problem",
    "Happy to help",
    "Yes",
    "Sounds good",
    "Sounds great",
];

/// What the bot was asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Command {
    Help,
    Comic,
    /// `show number of <metric> in <campaign>`
    Report { metric: String, campaign: String },
    /// Anything else, forwarded verbatim to the intent service.
    Converse(String),
}

/// Applies the ordered pattern checks; the first match wins.
pub fn classify(text: &str) -> Command {
    if HELP_PATTERN.is_match(text) {
        return Command::Help;
    }
    if COMIC_PATTERN.is_match(text) {
        return Command::Comic;
    }
    if let Some(captures) = REPORT_PATTERN.captures(text) {
        return Command::Report {
            metric: captures[1].trim().to_string(),
            campaign: captures[2].to_string(),
        };
    }
    Command::Converse(text.to_string())
}

/// Chart name passed to the chart script for a metric, e.g. `conversions-over-time`.
pub fn chart_name(metric: &str) -> String {
    let lowered = metric.to_lowercase();
    let slug = NON_WORD.replace_all(&lowered, "-");
    format!("{}-over-time", slug.trim_matches('-'))
}

pub fn random_pleasantry() -> &'static str {
    PLEASANTRIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Sure")
}

pub fn help_menu() -> &'static str {
    r" ```
    Possible Commands are:
        help

        Coey:
            show number of <metric> in <campaign id>

        About the Coeybot:
            who are you?
            how old are you?
            xkcd

        Examples:
            '@Coey who are you?'
            '@Coey show number of conversions in 23409864'
            '@Coey xkcd'

    ```"
}
