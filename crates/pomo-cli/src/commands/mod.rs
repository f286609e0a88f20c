pub mod config;
pub mod timer;

use std::time::Duration;

use clap::Args;
use pomo_core::storage::Backend;
use pomo_core::{IntervalConfig, Settings};

/// Per-run overrides of the settings file.
///
/// Durations accept `25`, `25m`, `90s` or `1h30m`; a bare number is minutes.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Pomodoro length
    #[arg(long, global = true, value_parser = parse_duration)]
    pub pomodoro: Option<Duration>,
    /// Short break length
    #[arg(long, global = true, value_parser = parse_duration)]
    pub short_break: Option<Duration>,
    /// Long break length
    #[arg(long, global = true, value_parser = parse_duration)]
    pub long_break: Option<Duration>,
    /// Keep intervals in memory for this run only
    #[arg(long, global = true)]
    pub memory: bool,
}

impl RunArgs {
    pub fn interval_config(&self) -> Result<IntervalConfig, Box<dyn std::error::Error>> {
        let mut settings = Settings::load()?;
        if self.memory {
            settings.storage.backend = Backend::Memory;
        }

        let (pomodoro, short_break, long_break) = settings.durations()?;
        Ok(IntervalConfig::new(
            settings.open_storage()?,
            self.pomodoro.unwrap_or(pomodoro),
            self.short_break.unwrap_or(short_break),
            self.long_break.unwrap_or(long_break),
        ))
    }
}

/// Parse a duration like "25m", "1h30m" or "90s".
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    let too_long = || format!("duration {s:?} is too long");

    if let Ok(minutes) = s.parse::<u64>() {
        return minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(too_long);
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let n: u64 = digits
            .parse()
            .map_err(|_| format!("invalid duration {s:?}"))?;
        digits.clear();
        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(format!("invalid duration {s:?}: unknown unit '{c}'")),
        };
        total = n
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(too_long)?;
    }
    if !digits.is_empty() {
        return Err(format!("invalid duration {s:?}: missing unit after {digits}"));
    }
    Ok(Duration::from_secs(total))
}
