use std::time::Duration;

mod app;
mod clock;
mod config;
mod db;
mod error;
mod models;
mod provider;
mod services;
#[cfg(test)]
mod testing;

use app::App;
use config::Config;
use error::{AppError, Result};
use models::{AiringEpisode, EpisodeRecord, Reminder, SearchResult, TrackedItem};
use services::{Dashboard, SyncReport};

const USAGE: &str = "usage: series-tracker [--search <title> | --subscribe <tmdb id> | --unsubscribe <item id> | \
--refresh <tmdb id> | --sync | --watch | --complete <reminder id> | --postpone <reminder id> | \
--label <item id> <label> | --list | --episodes <tmdb id> | --week]";

#[derive(Debug, PartialEq)]
enum Command {
    Dashboard,
    List,
    Week,
    Episodes(i64),
    Search(String),
    Subscribe(i64),
    Unsubscribe(i64),
    Refresh(i64),
    Sync,
    Watch,
    Complete(i64),
    Postpone(i64),
    Label(i64, String),
}

fn parse_id(flag: &str, value: Option<&String>) -> Result<i64> {
    let value = value.ok_or_else(|| AppError::Config(format!("{flag} needs an id\n{USAGE}")))?;
    value
        .parse()
        .map_err(|_| AppError::Config(format!("{flag}: '{value}' is not a valid id")))
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(flag) = args.get(1) else {
        return Ok(Command::Dashboard);
    };

    let command = match flag.as_str() {
        "--list" => Command::List,
        "--week" => Command::Week,
        "--search" => {
            let query = args[2..].join(" ");
            if query.trim().is_empty() {
                return Err(AppError::Config(format!("--search needs a title\n{USAGE}")));
            }
            Command::Search(query)
        }
        "--episodes" => Command::Episodes(parse_id(flag, args.get(2))?),
        "--subscribe" => Command::Subscribe(parse_id(flag, args.get(2))?),
        "--unsubscribe" => Command::Unsubscribe(parse_id(flag, args.get(2))?),
        "--refresh" => Command::Refresh(parse_id(flag, args.get(2))?),
        "--sync" => Command::Sync,
        "--watch" => Command::Watch,
        "--complete" => Command::Complete(parse_id(flag, args.get(2))?),
        "--postpone" => Command::Postpone(parse_id(flag, args.get(2))?),
        "--label" => {
            let item_id = parse_id(flag, args.get(2))?;
            let label = args[3..].join(" ");
            if label.trim().is_empty() {
                return Err(AppError::Config(format!("--label needs a label\n{USAGE}")));
            }
            Command::Label(item_id, label)
        }
        other => return Err(AppError::Config(format!("unknown flag '{other}'\n{USAGE}"))),
    };
    Ok(command)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;

    let config = Config::load()?;
    let app = App::new(&config).await?;

    match command {
        Command::Dashboard => {
            let dashboard = app.dashboard().await?;
            let airing = app.airing_today().await?;
            print_dashboard(&dashboard, &airing);
        }
        Command::List => {
            for item in app.items().await? {
                print_item(&item);
            }
        }
        Command::Week => {
            for day in app.airing_this_week().await? {
                println!("{}", day.date.format("%a %Y-%m-%d"));
                day.episodes.iter().for_each(print_airing);
            }
        }
        Command::Search(query) => {
            let results = app.search(&query).await?;
            if results.is_empty() {
                println!("No series found for '{}'", query.trim());
            }
            results.iter().for_each(print_search_result);
        }
        Command::Episodes(catalog_id) => {
            for episode in app.episodes(catalog_id).await? {
                print_episode(&episode);
            }
        }
        Command::Subscribe(catalog_id) => {
            let (item, existed) = app.subscribe(catalog_id).await?;
            if existed {
                println!("Already subscribed to {} (item {})", item.name, item.id);
            } else {
                println!(
                    "Subscribed to {} (item {}, available {})",
                    item.name, item.id, item.availability_label
                );
            }
        }
        Command::Unsubscribe(item_id) => {
            app.unsubscribe(item_id).await?;
            println!("Unsubscribed item {}", item_id);
        }
        Command::Refresh(catalog_id) => {
            let report = app.refresh_show(catalog_id).await?;
            print_report(&report);
        }
        Command::Sync => {
            let report = app.sync().await?;
            print_report(&report);
        }
        Command::Watch => watch(&app, config.sync_interval_minutes).await?,
        Command::Complete(reminder_id) => {
            let reminder = app.complete(reminder_id).await?;
            println!("Done: {} - {}", reminder.item_name, reminder.summary());
        }
        Command::Postpone(reminder_id) => {
            let reminder = app.postpone(reminder_id).await?;
            println!(
                "Postponed: {} - {} (now {}, id {})",
                reminder.item_name,
                reminder.summary(),
                reminder.created_at.format("%Y-%m-%d %H:%M"),
                reminder.id
            );
        }
        Command::Label(item_id, label) => {
            app.set_label(item_id, &label).await?;
            println!("Item {} is now available at {}", item_id, label.trim());
        }
    }

    Ok(())
}

/// Syncs on a fixed interval until interrupted. A failed pass is logged and
/// retried on the next tick.
async fn watch(app: &App, interval_minutes: u32) -> Result<()> {
    let period = Duration::from_secs(u64::from(interval_minutes) * 60);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    println!("Syncing every {} minutes, Ctrl-C to stop", interval_minutes);
    loop {
        tokio::select! {
            _ = ticker.tick() => match app.sync().await {
                Ok(report) => print_report(&report),
                Err(e) => tracing::error!("Sync failed: {}", e),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping watch loop");
                return Ok(());
            }
        }
    }
}

fn print_report(report: &SyncReport) {
    println!(
        "{} new episode, {} series ended, {} skipped, {} errors",
        report.new_episode_reminders,
        report.series_ended_reminders,
        report.skipped,
        report.errors
    );
}

fn print_reminder(reminder: &Reminder) {
    println!(
        "  [{}] {} ({}) {}",
        reminder.id,
        reminder.item_name,
        reminder.availability_label,
        reminder.summary()
    );
}

fn print_item(item: &TrackedItem) {
    let state = if item.is_archived { "archived" } else { item.status.as_str() };
    println!(
        "[{}] {} (tmdb {}, {} seasons, {}, {})",
        item.id, item.name, item.catalog_id, item.season_count, item.availability_label, state
    );
}

fn print_episode(episode: &EpisodeRecord) {
    let air_date = episode
        .air_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "TBA".to_string());
    println!(
        "  tmdb {} S{:02}E{:02} {} {}",
        episode.catalog_id, episode.season, episode.episode, air_date, episode.title
    );
}

fn print_airing(airing: &AiringEpisode) {
    println!(
        "  {} S{:02}E{:02} {} ({})",
        airing.show_name,
        airing.episode.season,
        airing.episode.episode,
        airing.episode.title,
        airing.availability_label
    );
}

fn print_search_result(result: &SearchResult) {
    let year = result.year().unwrap_or("????");
    let country = result.origin_country.join("/");
    println!("[{}] {} ({}) {}", result.id, result.name, year, country);
}

fn print_dashboard(dashboard: &Dashboard, airing: &[AiringEpisode]) {
    if dashboard.is_empty() && airing.is_empty() {
        println!("Nothing to do");
        return;
    }

    if !dashboard.new_episodes.is_empty() {
        println!("New episodes:");
        dashboard.new_episodes.iter().for_each(print_reminder);
    }
    if !dashboard.series_ended.is_empty() {
        println!("Series ended:");
        dashboard.series_ended.iter().for_each(print_reminder);
    }
    if !airing.is_empty() {
        println!("Airing today:");
        airing.iter().for_each(print_airing);
    }
    println!("{} pending", dashboard.len());
}
