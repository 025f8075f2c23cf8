use std::collections::BTreeMap;
use std::fmt;

use learnpath_core::filter::{ContentFilter, FilterValue};
use learnpath_core::model::{
    ContentId, ContentKind, ElementType, IdType, ItemStatus, SaveStatusProgress, UserId,
};
use serde::Serialize;
use services::{AppConfig, AppServices, Clock, ContentSourceConfig, ExerciseFilter, StatsScope};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_LOG_FILTER: &str = "learnpath=info,services=info";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidValue { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  learnpath progress        --user <id> --id <id> --id-type <topicId|themeId>");
    eprintln!("  learnpath themes-progress --user <id> [--ids <id,id,...>]");
    eprintln!("  learnpath status          --user <id> --item <id>");
    eprintln!("  learnpath statuses        --user <id> --id <id> [--id-type <topicId|themeId>]");
    eprintln!(
        "  learnpath save            --user <id> --item <id> --status <s> --element <e> --topic <id> --theme <id>"
    );
    eprintln!(
        "  learnpath content <themes|topics|exercises|all> [--id <id>] [--theme <id>] [--topic <id>] [--type <t>]"
    );
    eprintln!("  learnpath stats [--theme <id> | --topic <id>]");
    eprintln!(
        "  learnpath fetch <Themes|Topics|Exercises> [--operator <op> --column <c> --value <v>]"
    );
    eprintln!();
    eprintln!("Global options:");
    eprintln!("  --db <sqlite_url>       overrides LEARNPATH_DB_URL");
    eprintln!("  --content-dir <path>    overrides CONTENT_DIR (file content source)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARNPATH_DB_URL, CONTENT_SOURCE, CONTENT_DIR, STACKBY_BASE_URL,");
    eprintln!("  STACKBY_SECRET_KEY, CACHE_ENABLED, CACHE_TTL, REDIS_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Progress,
    ThemesProgress,
    Status,
    Statuses,
    Save,
    Content,
    Stats,
    Fetch,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "progress" => Some(Self::Progress),
            "themes-progress" => Some(Self::ThemesProgress),
            "status" => Some(Self::Status),
            "statuses" => Some(Self::Statuses),
            "save" => Some(Self::Save),
            "content" => Some(Self::Content),
            "stats" => Some(Self::Stats),
            "fetch" => Some(Self::Fetch),
            _ => None,
        }
    }

    fn flags(self) -> &'static [&'static str] {
        match self {
            Self::Progress => &["--user", "--id", "--id-type"],
            Self::ThemesProgress => &["--user", "--ids"],
            Self::Status => &["--user", "--item"],
            Self::Statuses => &["--user", "--id", "--id-type"],
            Self::Save => &[
                "--user",
                "--item",
                "--status",
                "--element",
                "--topic",
                "--theme",
            ],
            Self::Content => &["--id", "--theme", "--topic", "--type"],
            Self::Stats => &["--theme", "--topic"],
            Self::Fetch => &["--operator", "--column", "--value"],
        }
    }
}

const GLOBAL_FLAGS: &[&str] = &["--db", "--content-dir"];

/// Flags and positionals after the subcommand.
#[derive(Debug, Default)]
struct Args {
    flags: BTreeMap<&'static str, String>,
    positional: Vec<String>,
}

impl Args {
    fn parse(
        command: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            if !arg.starts_with("--") {
                parsed.positional.push(arg);
                continue;
            }
            let flag = GLOBAL_FLAGS
                .iter()
                .chain(command.flags())
                .copied()
                .find(|known| *known == arg)
                .ok_or_else(|| ArgsError::UnknownArg(arg.clone()))?;
            let value = require_value(args, flag)?;
            parsed.flags.insert(flag, value);
        }
        Ok(parsed)
    }

    fn get(&self, flag: &'static str) -> Option<&str> {
        self.flags.get(flag).map(String::as_str)
    }

    fn parsed<T: std::str::FromStr>(&self, flag: &'static str) -> Result<Option<T>, ArgsError> {
        self.get(flag)
            .map(|raw| {
                raw.parse().map_err(|_| ArgsError::InvalidValue {
                    flag,
                    raw: raw.to_string(),
                })
            })
            .transpose()
    }

    fn required_parsed<T: std::str::FromStr>(&self, flag: &'static str) -> Result<T, ArgsError> {
        self.parsed(flag)?.ok_or(ArgsError::MissingFlag { flag })
    }

    fn user(&self) -> Result<UserId, ArgsError> {
        self.required_parsed("--user")
    }

    fn content_id(&self, flag: &'static str) -> Result<Option<ContentId>, ArgsError> {
        self.parsed(flag)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Args) -> Result<(), ArgsError> {
    if let Some(db) = args.get("--db") {
        if db.trim().is_empty() {
            return Err(ArgsError::InvalidDbUrl { raw: db.to_string() });
        }
        config.database_url = db.to_string();
    }
    if let Some(dir) = args.get("--content-dir") {
        config.content = ContentSourceConfig::Files { root: dir.into() };
    }
    config.database_url = normalize_sqlite_url(config.database_url.clone());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_kind(raw: Option<&str>) -> Result<Option<ContentKind>, ArgsError> {
    match raw {
        None | Some("all") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ArgsError::InvalidValue {
                flag: "content kind",
                raw: raw.to_string(),
            }),
    }
}

/// Collection and upstream filter of a `fetch` invocation.
fn fetch_request(
    args: &Args,
) -> Result<(ContentKind, Option<ContentFilter>), learnpath_core::Error> {
    let kind = args
        .positional
        .first()
        .map_or("", String::as_str)
        .parse::<ContentKind>()?;
    let filter = ContentFilter::from_params(
        args.get("--operator"),
        args.get("--column"),
        args.get("--value").map(FilterValue::from),
    )?;
    Ok((kind, filter))
}

#[derive(Serialize)]
struct Data<T> {
    data: T,
}

async fn execute(
    command: Command,
    args: &Args,
    app: &AppServices,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Progress => {
            let id: ContentId = args.required_parsed("--id")?;
            let id_type: IdType = args.required_parsed("--id-type")?;
            let result = app.reports().progress_by_id(args.user()?, id, id_type).await?;
            print_json(&result)
        }
        Command::ThemesProgress => {
            let ids: Option<Vec<ContentId>> = args.get("--ids").map(|raw| {
                raw.split(',')
                    .filter(|id| !id.is_empty())
                    .map(ContentId::from)
                    .collect()
            });
            let result = app
                .reports()
                .themes_progress(args.user()?, ids.as_deref())
                .await?;
            print_json(&result)
        }
        Command::Status => {
            let item: ContentId = args.required_parsed("--item")?;
            let record = app
                .progress()
                .get_single_status_progress_by_item_id(&item, args.user()?)
                .await?;
            print_json(&record)
        }
        Command::Statuses => {
            let id: ContentId = args.required_parsed("--id")?;
            let id_type = args.parsed("--id-type")?.unwrap_or(IdType::TopicId);
            let query = learnpath_core::model::ProgressQuery::new(args.user()?, id, id_type);
            let records = app.progress().get_all_status_progress_by_id(&query).await?;
            print_json(&records)
        }
        Command::Save => {
            let request = SaveStatusProgress {
                item_id: args.required_parsed("--item")?,
                user_id: args.user()?,
                item_status: args.required_parsed::<ItemStatus>("--status")?,
                element_type: args.required_parsed::<ElementType>("--element")?,
                topic_id: args.required_parsed("--topic")?,
                theme_id: args.required_parsed("--theme")?,
            };
            let saved = app.progress().save_status_progress(request).await?;
            print_json(&saved)
        }
        Command::Content => {
            let content = app.content();
            let kind = parse_kind(args.positional.first().map(String::as_str))?;
            let id = args.get("--id");
            match (kind, id) {
                (None, _) => print_json(&content.full_content().await?),
                (Some(ContentKind::Themes), Some(id)) => print_json(&content.theme_by_id(id).await?),
                (Some(ContentKind::Topics), Some(id)) => print_json(&content.topic_by_id(id).await?),
                (Some(ContentKind::Exercises), Some(id)) => {
                    print_json(&content.exercise_by_id(id).await?)
                }
                (Some(ContentKind::Themes), None) => print_json(&content.themes().await?),
                (Some(ContentKind::Topics), None) => {
                    let theme = args.content_id("--theme")?;
                    print_json(&content.topics(theme.as_ref()).await?)
                }
                (Some(ContentKind::Exercises), None) => {
                    let filter = match (args.content_id("--topic")?, args.get("--type")) {
                        (Some(topic), _) => ExerciseFilter::Topic(topic),
                        (None, Some(item_type)) => ExerciseFilter::Type(item_type.to_string()),
                        (None, None) => ExerciseFilter::All,
                    };
                    print_json(&content.exercises(&filter).await?)
                }
            }
        }
        Command::Stats => {
            let scope = match (args.content_id("--theme")?, args.content_id("--topic")?) {
                (Some(theme), _) => StatsScope::Theme(theme),
                (None, Some(topic)) => StatsScope::Topic(topic),
                (None, None) => StatsScope::All,
            };
            let stats = app.content().stats(&scope).await?;
            print_json(&Data { data: stats })
        }
        Command::Fetch => {
            let (kind, filter) = fetch_request(args)?;
            print_json(&app.content().fetch_filtered(kind, filter.as_ref()).await?)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let command = match argv.next() {
        None => {
            print_usage();
            return Err(ArgsError::MissingFlag { flag: "subcommand" }.into());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            print_usage();
            ArgsError::UnknownCommand(first.clone())
        })?,
    };

    let args = Args::parse(command, &mut argv).inspect_err(|_| print_usage())?;

    let mut config = AppConfig::from_env()?;
    apply_overrides(&mut config, &args)?;
    prepare_sqlite_file(&config.database_url)?;
    debug!(?command, db = %config.database_url, "starting");

    let app = AppServices::from_config(&config, Clock::default()).await?;
    execute(command, &args, &app).await
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("error processing the request: {err}");
        std::process::exit(2);
    }
}
