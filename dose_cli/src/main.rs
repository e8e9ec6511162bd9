use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dose_core::engine::{plan_next_injection, NextDoseStatus};
use dose_core::export::{self, ExportBundle};
use dose_core::history::{entries_on, group_by_month};
use dose_core::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "doselog")]
#[command(about = "Medication shot and wellness journal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log, list or delete injections
    Shot {
        #[command(subcommand)]
        action: ShotAction,
    },

    /// Log, list or delete wellness observations
    Wellness {
        #[command(subcommand)]
        action: WellnessAction,
    },

    /// Show streak, next shot and weight trend (default)
    Summary,

    /// Show weigh-ins and doses on one timeline
    Timeline,

    /// Show everything recorded on one day (YYYY-MM-DD)
    Day { date: NaiveDate },

    /// Export all data
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output file or directory (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Raise the shot reminder if it is due
    Remind,

    /// Delete all shots, wellness data and reminders
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

impl Commands {
    fn mutates(&self) -> bool {
        match self {
            Commands::Shot { action } => !matches!(action, ShotAction::List),
            Commands::Wellness { action } => !matches!(action, WellnessAction::List),
            Commands::Remind | Commands::Clear { .. } => true,
            Commands::Summary | Commands::Timeline | Commands::Day { .. } => false,
            Commands::Export { .. } => false,
        }
    }
}

#[derive(Subcommand)]
enum ShotAction {
    /// Log an injection
    Log(ShotArgs),
    /// List injections by month
    List,
    /// Change fields of a logged injection
    Edit {
        id: Uuid,
        #[command(flatten)]
        changes: ShotArgs,
    },
    /// Delete an injection by id
    Delete { id: Uuid },
}

#[derive(Args)]
struct ShotArgs {
    /// Dose in mg (new shots default to the configured dose)
    #[arg(long)]
    dose: Option<f64>,

    #[arg(long)]
    medication: Option<String>,

    /// Injection site
    #[arg(long)]
    site: Option<String>,

    #[arg(long)]
    notes: Option<String>,

    /// Side effect (repeatable)
    #[arg(long = "side-effect")]
    side_effects: Vec<String>,

    /// When the shot was taken (RFC 3339 or YYYY-MM-DD; default now)
    #[arg(long, value_parser = parse_when)]
    at: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum WellnessAction {
    /// Record wellness metrics
    Log(WellnessArgs),
    /// List wellness observations
    List,
    /// Change fields of an observation; metrics are merged
    Edit {
        id: Uuid,
        #[command(flatten)]
        changes: WellnessArgs,
    },
    /// Delete an observation by id
    Delete { id: Uuid },
}

#[derive(Args)]
struct WellnessArgs {
    #[arg(long)]
    weight: Option<f64>,

    /// Protein in grams
    #[arg(long)]
    protein: Option<f64>,

    /// Water in ounces
    #[arg(long)]
    water: Option<f64>,

    #[arg(long)]
    calories: Option<f64>,

    #[arg(long)]
    notes: Option<String>,

    /// Custom metric as NAME=VALUE (repeatable)
    #[arg(long = "metric", value_parser = parse_metric)]
    metrics: Vec<(String, MetricValue)>,

    /// When the metrics were taken (RFC 3339 or YYYY-MM-DD; default now)
    #[arg(long, value_parser = parse_when)]
    at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

fn main() -> Result<()> {
    // Initialize logging
    dose_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let errors = config.validate();
    if !errors.is_empty() {
        eprintln!("Configuration errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Config("Invalid configuration".into()));
    }

    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let mut journal = Journal::new(JsonFileStore::new(&data_dir), config);
    let now = Utc::now();

    // Writers hold the store lock for the whole load-modify-save cycle
    let _lock = match &cli.command {
        Some(command) if command.mutates() => {
            let lock = journal.store().lock()?;
            tracing::debug!("Holding store lock for {:?}", data_dir);
            Some(lock)
        }
        _ => None,
    };

    tracing::debug!("Running with data in {:?}", data_dir);
    match cli.command {
        Some(Commands::Shot { action }) => match action {
            ShotAction::Log(args) => cmd_shot_log(&mut journal, args, now),
            ShotAction::List => cmd_shot_list(&journal, now),
            ShotAction::Edit { id, changes } => cmd_shot_edit(&mut journal, id, changes),
            ShotAction::Delete { id } => {
                let removed = journal.delete_injection(id)?;
                println!("✓ Deleted shot from {}", format_when(removed.timestamp));
                Ok(())
            }
        },
        Some(Commands::Wellness { action }) => match action {
            WellnessAction::Log(args) => cmd_wellness_log(&mut journal, args, now),
            WellnessAction::List => cmd_wellness_list(&journal),
            WellnessAction::Edit { id, changes } => cmd_wellness_edit(&mut journal, id, changes),
            WellnessAction::Delete { id } => {
                let removed = journal.delete_observation(id)?;
                println!(
                    "✓ Deleted wellness entry from {}",
                    format_when(removed.timestamp)
                );
                Ok(())
            }
        },
        Some(Commands::Summary) | None => cmd_summary(&journal, now),
        Some(Commands::Timeline) => cmd_timeline(&journal),
        Some(Commands::Day { date }) => cmd_day(&journal, date),
        Some(Commands::Export { format, out }) => cmd_export(&journal, format, out, now),
        Some(Commands::Remind) => cmd_remind(&mut journal, now),
        Some(Commands::Clear { yes }) => cmd_clear(&mut journal, yes),
    }
}

fn cmd_shot_log(
    journal: &mut Journal<JsonFileStore>,
    args: ShotArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let shot = journal.add_injection(
        NewInjection {
            timestamp: args.at,
            medication: args.medication,
            dose_mg: args.dose,
            site: args.site,
            notes: args.notes,
            side_effects: args.side_effects,
        },
        now,
    )?;

    let shots = journal.injections()?;
    println!("✓ Shot logged!");
    println!(
        "  {} {}mg on {}",
        shot.medication,
        shot.dose_mg,
        format_when(shot.timestamp)
    );
    println!("  Streak: {}", adherence_streak(&shots));
    println!(
        "  Next shot: {}",
        format_when(next_injection_date(&shots, now))
    );
    println!("  id: {}", shot.id);
    Ok(())
}

fn cmd_shot_edit(journal: &mut Journal<JsonFileStore>, id: Uuid, changes: ShotArgs) -> Result<()> {
    let mut shot = journal
        .injections()?
        .into_iter()
        .find(|s| s.id == id)
        .ok_or(Error::NotFound(id))?;

    if let Some(at) = changes.at {
        shot.timestamp = at;
    }
    if let Some(dose) = changes.dose {
        shot.dose_mg = dose;
    }
    if let Some(medication) = changes.medication {
        shot.medication = medication;
    }
    // An empty value clears the field
    if let Some(site) = changes.site {
        shot.site = Some(site).filter(|s| !s.trim().is_empty());
    }
    if let Some(notes) = changes.notes {
        shot.notes = Some(notes).filter(|n| !n.trim().is_empty());
    }
    if !changes.side_effects.is_empty() {
        shot.side_effects = changes.side_effects;
    }

    tracing::debug!("Editing shot {}", id);
    journal.update_injection(shot.clone())?;

    println!("✓ Shot updated");
    println!(
        "  {} {}mg on {}",
        shot.medication,
        shot.dose_mg,
        format_when(shot.timestamp)
    );
    Ok(())
}

fn cmd_shot_list(journal: &Journal<JsonFileStore>, now: DateTime<Utc>) -> Result<()> {
    let shots = journal.injections()?;
    let plan = plan_next_injection(&shots, &journal.config().medication, now);

    println!("Next shot #{}", plan.sequence_number);
    println!(
        "  {}  {} {}mg{}",
        format_when(plan.at),
        plan.medication,
        plan.dose_mg,
        plan.site.map(|s| format!(" • {}", s)).unwrap_or_default()
    );

    if shots.is_empty() {
        println!("\nNo shots logged yet.");
        return Ok(());
    }

    for group in group_by_month(&shots, &Local) {
        println!("\n{}", group.label());
        for shot in group.injections {
            println!(
                "  Shot {:<4} {}  {} {}mg{}  [{}]",
                shot.sequence_number
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
                format_when(shot.timestamp),
                shot.medication,
                shot.dose_mg,
                shot.site
                    .as_ref()
                    .map(|s| format!(" • {}", s))
                    .unwrap_or_default(),
                shot.id
            );
        }
    }
    Ok(())
}

fn cmd_wellness_log(
    journal: &mut Journal<JsonFileStore>,
    args: WellnessArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let known = &journal.config().display.custom_metrics;
    for (name, _) in &args.metrics {
        if !known.is_empty() && !known.contains(name) {
            eprintln!("Note: '{}' is not one of your configured metrics", name);
        }
    }

    let observation = journal.add_observation(
        NewObservation {
            timestamp: args.at,
            weight: args.weight,
            protein_grams: args.protein,
            water_ounces: args.water,
            calories: args.calories,
            notes: args.notes,
            custom_metrics: args.metrics.into_iter().collect::<BTreeMap<_, _>>(),
        },
        now,
    )?;

    println!("✓ Wellness data saved");
    print_observation(&observation, journal.config());
    Ok(())
}

fn cmd_wellness_edit(
    journal: &mut Journal<JsonFileStore>,
    id: Uuid,
    changes: WellnessArgs,
) -> Result<()> {
    let mut observation = journal
        .observations()?
        .into_iter()
        .find(|o| o.id == id)
        .ok_or(Error::NotFound(id))?;

    if let Some(at) = changes.at {
        observation.timestamp = at;
    }
    if changes.weight.is_some() {
        observation.weight = changes.weight;
    }
    if changes.protein.is_some() {
        observation.protein_grams = changes.protein;
    }
    if changes.water.is_some() {
        observation.water_ounces = changes.water;
    }
    if changes.calories.is_some() {
        observation.calories = changes.calories;
    }
    if let Some(notes) = changes.notes {
        observation.notes = Some(notes).filter(|n| !n.trim().is_empty());
    }
    observation.custom_metrics.extend(changes.metrics);

    tracing::debug!("Editing wellness observation {}", id);
    journal.update_observation(observation.clone())?;

    println!("✓ Wellness data updated");
    print_observation(&observation, journal.config());
    Ok(())
}

fn cmd_wellness_list(journal: &Journal<JsonFileStore>) -> Result<()> {
    let mut observations = journal.observations()?;
    if observations.is_empty() {
        println!("No wellness data recorded yet.");
        return Ok(());
    }

    observations.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    for observation in &observations {
        println!();
        print_observation(observation, journal.config());
    }
    Ok(())
}

fn cmd_summary(journal: &Journal<JsonFileStore>, now: DateTime<Utc>) -> Result<()> {
    let snapshot = journal.snapshot(now, &Local)?;
    let shots = journal.injections()?;
    let config = journal.config();
    let unit = config.display.weight_unit();

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  DOSE SUMMARY");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Shots logged: {}", snapshot.injection_count);
    println!("  Streak: {}", snapshot.streak);
    println!("  {}", status_message(snapshot.status));

    if !shots.is_empty() {
        let plan = plan_next_injection(&shots, &config.medication, now);
        println!(
            "  Next shot #{}: {} {}mg on {}",
            plan.sequence_number,
            plan.medication,
            plan.dose_mg,
            format_when(plan.at)
        );
    }

    println!();
    match snapshot.weight_trend {
        WeightTrend::Change(change) => {
            println!(
                "  Weight: {} → {}",
                format_weight(change.first_weight, unit),
                format_weight(change.last_weight, unit)
            );
            println!("  Total change: {}{}", signed(change.total_change), unit);
            println!("  Percent change: {}%", signed(change.percent_change));
            println!("  Weekly average: {}{}/wk", signed(change.weekly_average), unit);
        }
        WeightTrend::InsufficientData => {
            println!("  Weight: log at least two weigh-ins to see your trend");
        }
    }
    println!();
    Ok(())
}

fn cmd_timeline(journal: &Journal<JsonFileStore>) -> Result<()> {
    let shots = journal.injections()?;
    let observations = journal.observations()?;
    let timeline = merge_timeline(&shots, &observations);
    let unit = journal.config().display.weight_unit();

    if timeline.is_empty() {
        println!("Nothing to chart yet.");
        return Ok(());
    }

    for point in &timeline {
        let weight = point
            .weight
            .map(|w| format_weight(w, unit))
            .unwrap_or_else(|| "-".into());
        let dose = match (&point.medication, point.dose_mg) {
            (Some(medication), Some(dose)) => format!("{}: {}mg", medication, dose),
            _ => String::new(),
        };
        println!("{}  {:>10}  {}", format_when(point.timestamp), weight, dose);
    }
    Ok(())
}

fn cmd_day(journal: &Journal<JsonFileStore>, date: NaiveDate) -> Result<()> {
    let shots = journal.injections()?;
    let observations = journal.observations()?;
    let entries = entries_on(&shots, &observations, date, &Local);

    println!("Data for {}", date.format("%B %-d, %Y"));
    if entries.is_empty() {
        println!("  Nothing logged on this day.");
        return Ok(());
    }

    for shot in &entries.injections {
        println!(
            "  Shot  {}  {} {}mg{}",
            shot.timestamp.with_timezone(&Local).format("%-I:%M %p"),
            shot.medication,
            shot.dose_mg,
            shot.site
                .as_ref()
                .map(|s| format!(" • {}", s))
                .unwrap_or_default()
        );
        if let Some(notes) = &shot.notes {
            println!("        {}", notes);
        }
    }
    for observation in &entries.observations {
        println!();
        print_observation(observation, journal.config());
    }
    Ok(())
}

fn cmd_export(
    journal: &Journal<JsonFileStore>,
    format: ExportFormat,
    out: Option<PathBuf>,
    now: DateTime<Utc>,
) -> Result<()> {
    let shots = journal.injections()?;
    let observations = journal.observations()?;

    match format {
        ExportFormat::Csv => match out {
            Some(path) => {
                let path = resolve_out(path, "doselog_data.csv");
                let count = export::write_csv_file(&shots, &observations, &path)?;
                println!("✓ Exported {} rows to {}", count, path.display());
            }
            None => {
                export::write_csv(&shots, &observations, std::io::stdout().lock())?;
            }
        },
        ExportFormat::Json => {
            let bundle = ExportBundle {
                shots,
                wellness: observations,
                reminders: journal.reminders()?,
                export_date: now,
            };
            let json = bundle.to_json_pretty()?;
            match out {
                Some(path) => {
                    let path = resolve_out(path, &export::export_file_name(now));
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, json)?;
                    println!("✓ Exported data to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }
    Ok(())
}

/// A directory target gets the default file name
fn resolve_out(path: PathBuf, default_name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(default_name)
    } else {
        path
    }
}

fn cmd_remind(journal: &mut Journal<JsonFileStore>, now: DateTime<Utc>) -> Result<()> {
    match journal.check_reminder(now, &Local)? {
        Some(reminder) => {
            println!("🔔 {}", reminder.message);
            println!(
                "  Next shot: {}",
                format_when(next_injection_date(&journal.injections()?, now))
            );
        }
        None => {
            let unread: Vec<Reminder> = journal
                .reminders()?
                .into_iter()
                .filter(|r| !r.read)
                .collect();
            if unread.is_empty() {
                println!("No reminders due.");
            }
            for reminder in unread {
                println!("🔔 {} ({})", reminder.message, format_when(reminder.date));
                journal.mark_reminder_read(reminder.id)?;
            }
        }
    }
    Ok(())
}

fn cmd_clear(journal: &mut Journal<JsonFileStore>, yes: bool) -> Result<()> {
    if !yes {
        eprintln!("This deletes all shots, wellness data and reminders.");
        eprintln!("Re-run with --yes to confirm.");
        return Err(Error::Other("Refusing to clear data without --yes".into()));
    }

    journal.clear_all()?;
    println!("✓ All data cleared from {}", journal.store().dir().display());
    Ok(())
}

fn print_observation(observation: &WellnessObservation, config: &Config) {
    let unit = config.display.weight_unit();
    println!("  {}", format_when(observation.timestamp));
    if let Some(weight) = observation.weight {
        println!("    Weight: {}", format_weight(weight, unit));
    }
    if let Some(water) = observation.water_ounces {
        println!("    Water: {}oz", water);
    }
    if let Some(protein) = observation.protein_grams {
        println!("    Protein: {}g", protein);
    }
    if let Some(calories) = observation.calories {
        println!("    Calories: {}", calories);
    }
    for (name, value) in &observation.custom_metrics {
        println!("    {}: {}", name, value);
    }
    if let Some(notes) = &observation.notes {
        println!("    {}", notes);
    }
    println!("    id: {}", observation.id);
}

fn status_message(status: NextDoseStatus) -> String {
    match status {
        NextDoseStatus::NoHistory => "Log your first shot to start tracking".into(),
        NextDoseStatus::DueToday => "Your shot is scheduled for today".into(),
        NextDoseStatus::Overdue { days } => format!("Shot overdue by {} {}", days, plural_days(days)),
        NextDoseStatus::DueIn { days } => format!("Next shot in {} {}", days, plural_days(days)),
    }
}

fn plural_days(days: i64) -> &'static str {
    if days == 1 {
        "day"
    } else {
        "days"
    }
}

fn format_when(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%a, %b %-d %Y at %-I:%M %p")
        .to_string()
}

fn format_weight(weight: f64, unit: &str) -> String {
    format!("{:.1}{}", weight, unit)
}

/// Explicit sign with one decimal, e.g. "-4.0" or "+1.5"
fn signed(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "+" };
    format!("{}{:.1}", sign, value.abs())
}

/// Parse `--at`: RFC 3339, or a bare date meaning local noon
fn parse_when(input: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| format!("expected RFC 3339 or YYYY-MM-DD, got '{}'", input))?;
    let noon = date.and_time(NaiveTime::MIN) + chrono::Duration::hours(12);
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| format!("'{}' is not a valid local time", input))
}

/// Parse `--metric NAME=VALUE`
fn parse_metric(input: &str) -> std::result::Result<(String, MetricValue), String> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", input))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("metric name is empty".into());
    }
    Ok((name.to_string(), MetricValue::parse(value)))
}
