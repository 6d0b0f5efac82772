//! SleepLog command-line front end.
//!
//! # Responsibility
//! - Parse commands and call the core record/profile/chart contracts.
//! - Render weekly charts as text bars.

mod cli;
mod render;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use cli::{Args, Commands, ProfileCommands};
use rusqlite::Connection;
use sleeplog_core::db::open_db;
use sleeplog_core::{
    build_series, init_logging_from_config, parse_elapsed, week_duration_values, week_values,
    AppStateSnapshot, CoreConfig, MetricKind, ProfilePatch, ProfileService, RecordStore,
    SessionError, SessionRecorder, SqliteProfileRepository, SqliteRecordStore, UserProfile,
};
use std::path::Path;

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = CoreConfig::load(args.config.as_deref()).context("failed to load config")?;
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;

    match args.command {
        Commands::Record { duration, memo } => {
            let duration_secs = parse_elapsed(&duration)
                .with_context(|| format!("cannot read sleep duration `{duration}`"))?;
            let recorder = SessionRecorder::new(SqliteRecordStore::try_new(&conn)?);
            match recorder.record(duration_secs, memo, Utc::now()) {
                Ok(record) => println!(
                    "saved {} ({})",
                    record.date,
                    render::format_hours(record.duration_secs)
                ),
                Err(err @ SessionError::StorageUnavailable(_)) => {
                    eprintln!("warning: {}", err.user_message());
                    log::warn!("event=cli_record module=cli status=error error={err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::List => {
            let records = SqliteRecordStore::try_new(&conn)?.read_all();
            if records.is_empty() {
                println!("no sleep records yet");
            }
            for record in records {
                println!(
                    "{}  {:>8}  {}",
                    record.date,
                    render::format_hours(record.duration_secs),
                    record.memo
                );
            }
        }
        Commands::Week { date, scores } => {
            let reference = date.unwrap_or_else(|| Utc::now().date_naive());
            let records = SqliteRecordStore::try_new(&conn)?.read_all();
            let durations = build_series(
                &week_duration_values(&records, reference),
                config.chart.duration_minimum_scale_secs,
                &MetricKind::Duration,
            );
            println!("hours slept, week of {reference}");
            print!("{}", render::render_series(&durations));

            if !scores.is_empty() {
                let points = scores
                    .iter()
                    .map(|entry| cli::parse_score_entry(entry))
                    .collect::<Result<Vec<(NaiveDate, f64)>>>()?;
                let series = build_series(
                    &week_values(points, reference),
                    config.chart.score_minimum_scale,
                    &config.chart.score_kind(),
                );
                println!("sleep score");
                print!("{}", render::render_series(&series));
            }
        }
        Commands::Profile { command } => run_profile(&conn, command)?,
    }
    Ok(())
}

fn run_profile(conn: &Connection, command: ProfileCommands) -> Result<()> {
    let service = ProfileService::new(SqliteProfileRepository::try_new(conn)?);
    match command {
        ProfileCommands::Show { app_state } => {
            let snapshot = load_snapshot(app_state.as_deref())?;
            match service.current_profile(snapshot.as_ref()) {
                Some((profile, _)) => println!("{}", to_pretty_json(&profile)?),
                None => println!("no signed-in user"),
            }
        }
        ProfileCommands::Use {
            id,
            email,
            name,
            avatar,
        } => {
            let profile = UserProfile {
                id,
                email,
                display_name: name,
                avatar_token: avatar,
                updated_at: Some(Utc::now()),
                ..UserProfile::default()
            };
            if profile.identity_key().is_none() {
                anyhow::bail!("a profile needs --id or --email");
            }
            service.adopt_user(&profile)?;
            println!("now signed in as {}", profile.identity_key().unwrap_or_default());
        }
        ProfileCommands::Update {
            name,
            avatar,
            email,
            set,
            app_state,
        } => {
            let mut patch = ProfilePatch {
                display_name: name,
                avatar_token: avatar,
                email,
                ..ProfilePatch::default()
            };
            for entry in &set {
                let (key, value) = cli::parse_extra_entry(entry)?;
                patch.extra.insert(key, value);
            }
            let snapshot = load_snapshot(app_state.as_deref())?;
            let updated = service
                .update_profile(&patch, snapshot.as_ref())
                .map_err(|err| anyhow::anyhow!("{} ({err})", err.user_message()))?;
            println!("{}", to_pretty_json(&updated)?);
        }
        ProfileCommands::SignOut => {
            service.sign_out()?;
            println!("signed out");
        }
        ProfileCommands::RefreshStats { app_state } => {
            let records = SqliteRecordStore::try_new(conn)?.read_all();
            let snapshot = load_snapshot(app_state.as_deref())?;
            let updated = service
                .refresh_sleep_stats(&records, snapshot.as_ref())
                .map_err(|err| anyhow::anyhow!("{} ({err})", err.user_message()))?;
            println!(
                "{} days, {:.1} h average",
                updated.total_days.unwrap_or(0),
                updated.average_sleep_hours.unwrap_or(0.0)
            );
        }
    }
    Ok(())
}

fn load_snapshot(path: Option<&Path>) -> Result<Option<AppStateSnapshot>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read app state {}", path.display()))?;
    let snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("invalid app state {}", path.display()))?;
    Ok(Some(snapshot))
}

fn to_pretty_json(profile: &UserProfile) -> Result<String> {
    Ok(serde_json::to_string_pretty(profile)?)
}
