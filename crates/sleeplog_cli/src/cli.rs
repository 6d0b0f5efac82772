use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sleeplog")]
#[command(about = "Personal sleep log: record sessions, keep a profile, chart the week")]
#[command(version)]
pub struct Args {
    /// JSON config file (defaults apply when absent)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a finished sleep session
    Record {
        /// Elapsed sleep: seconds, `7h 30m` or `7:30`
        #[arg(long, short)]
        duration: String,
        /// Free-text memo
        #[arg(long, short, default_value = "")]
        memo: String,
    },
    /// List every stored session, oldest first
    List,
    /// Chart the Sunday-first week containing a date
    Week {
        /// Any day of the week to show (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Sleep score entries as `YYYY-MM-DD=SCORE`
        #[arg(long = "score")]
        scores: Vec<String>,
    },
    /// Profile management
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the current user
    Show {
        /// App-state snapshot JSON consulted when no user is stored
        #[arg(long)]
        app_state: Option<PathBuf>,
    },
    /// Make a user current and add it to the known users
    Use {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Update fields of the current user
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Extra field as `key=value`; value is parsed as JSON when possible
        #[arg(long)]
        set: Vec<String>,
        /// App-state snapshot JSON consulted when no user is stored
        #[arg(long)]
        app_state: Option<PathBuf>,
    },
    /// Forget the current user
    SignOut,
    /// Recompute average hours and day count from stored sessions
    RefreshStats {
        #[arg(long)]
        app_state: Option<PathBuf>,
    },
}

/// Parses `YYYY-MM-DD=SCORE`.
pub fn parse_score_entry(entry: &str) -> Result<(NaiveDate, f64)> {
    let (date, score) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("score entry `{entry}` must look like YYYY-MM-DD=SCORE"))?;
    let date = date
        .trim()
        .parse::<NaiveDate>()
        .with_context(|| format!("invalid date in score entry `{entry}`"))?;
    let score = score
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid score in score entry `{entry}`"))?;
    Ok((date, score))
}

/// Parses `key=value`; non-JSON values are kept as strings.
pub fn parse_extra_entry(entry: &str) -> Result<(String, Value)> {
    let (key, raw) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("field `{entry}` must look like key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("field `{entry}` has an empty key"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
