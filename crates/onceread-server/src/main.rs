//! onceread command-line front end.
//!
//! # Usage
//!
//! ```bash
//! # Seal a text secret behind a link key (printed link carries the key)
//! onceread seal "the wifi password is hunter2"
//!
//! # Seal a file behind a password, expiring in an hour
//! onceread seal --file scan.png --kind photo --password --expires 1h
//!
//! # Open it (consumes it)
//! onceread open 'http://localhost:3000/secret/<id>#<key>'
//! ```

use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use clap::{Parser, Subcommand, ValueEnum};
use onceread_core::{
    FileKind, Protection, RevealedSecret, SecretInput, ShareLink, limits::Expiration,
    payload::DEFAULT_FILE_NAME,
};
use onceread_server::{RedbStorage, SecretService, ServerError, ServiceConfig, SystemEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// One-time secret links
#[derive(Parser, Debug)]
#[command(name = "onceread")]
#[command(about = "Share secrets that can be read exactly once")]
#[command(version)]
struct Args {
    /// Path to the secret database
    #[arg(long, global = true, default_value = "onceread.redb")]
    db: PathBuf,

    /// Base URL share links are built on
    #[arg(long, global = true, default_value = onceread_server::DEFAULT_BASE_URL)]
    base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seal a secret and print its share link
    Seal {
        /// Text to seal (read from stdin when omitted)
        text: Option<String>,

        /// Seal a file instead of text
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// How the file is presented to the recipient
        #[arg(long, value_enum, default_value_t = KindArg::Document, requires = "file")]
        kind: KindArg,

        /// Content type of the file (guessed from the extension for photos)
        #[arg(long = "type", requires = "file")]
        file_type: Option<String>,

        /// Lifetime: 1h, 1d, 1w or milliseconds
        #[arg(long, default_value = "1d", value_parser = parse_ttl)]
        expires: Duration,

        /// Protect with a password (prompted) instead of a link key
        #[arg(long)]
        password: bool,
    },

    /// Open a share link, consuming the secret
    Open {
        /// Full share link, including any `#key` fragment
        link: String,

        /// Password for a protected secret (prompted when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Directory revealed files are written to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Check whether a secret is still available, without consuming it
    Exists {
        /// Secret id
        id: String,
    },

    /// Remove expired secrets from the database
    Sweep,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Photo,
    Document,
}

impl From<KindArg> for FileKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Photo => Self::Photo,
            KindArg::Document => Self::Document,
        }
    }
}

fn parse_ttl(value: &str) -> Result<Duration, String> {
    if let Ok(preset) = value.parse::<Expiration>() {
        return Ok(preset.as_duration());
    }
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("expected 1h, 1d, 1w or milliseconds, got {value:?}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = match &err {
                ServerError::Secret(secret) if secret.is_unavailable() => {
                    "this secret is no longer available".to_string()
                },
                other => other.to_string(),
            };
            let _ = writeln!(io::stderr(), "error: {message}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let base_url = Url::parse(&args.base_url)
        .map_err(|e| ServerError::Config(format!("invalid base URL {:?}: {e}", args.base_url)))?;
    let config = ServiceConfig { base_url, ..ServiceConfig::default() };

    tracing::debug!(db = %args.db.display(), "opening secret database");
    let storage = RedbStorage::open(&args.db)?;
    let service = SecretService::new(SystemEnv::new(), storage, config);

    let mut stdout = io::stdout();
    match args.command {
        Command::Seal { text, file, kind, file_type, expires, password } => {
            let input = match file {
                Some(path) => read_file_input(&path, kind.into(), file_type)?,
                None => SecretInput::Text(match text {
                    Some(text) => text,
                    None => read_stdin()?,
                }),
            };
            let protection = if password {
                Protection::password(prompt_password("Choose a password: ")?)
            } else {
                Protection::LinkKey
            };

            let (id, link) = service.seal(input, protection, expires).await?;
            tracing::info!(%id, "secret sealed");
            writeln!(stdout, "{link}")?;
        },
        Command::Open { link, password, out } => {
            let link = ShareLink::parse(&link)?;
            let secret = service
                .reveal(&link, move || match password {
                    Some(password) => Ok(password),
                    None => prompt_password("Password: "),
                })
                .await?;
            write_revealed(&mut stdout, secret, &out)?;
        },
        Command::Exists { id } => {
            let available = service.exists(&id)?;
            writeln!(stdout, "{}", if available { "available" } else { "unavailable" })?;
        },
        Command::Sweep => {
            let removed = service.sweep()?;
            writeln!(stdout, "removed {removed} expired secret(s)")?;
        },
    }
    Ok(())
}

fn read_stdin() -> Result<String, ServerError> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    Ok(text)
}

fn prompt_password(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}

fn read_file_input(
    path: &Path,
    kind: FileKind,
    file_type: Option<String>,
) -> Result<SecretInput, ServerError> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_FILE_NAME)
        .to_string();
    let file_type = file_type
        .or_else(|| {
            path.extension().and_then(|ext| ext.to_str()).and_then(image_type).map(str::to_string)
        })
        .unwrap_or_default();

    Ok(SecretInput::File { kind, file_name, file_type, bytes })
}

fn image_type(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn write_revealed(
    stdout: &mut impl Write,
    secret: RevealedSecret,
    out: &Path,
) -> Result<(), ServerError> {
    match secret {
        RevealedSecret::Text(text) => writeln!(stdout, "{}", text.as_str())?,
        RevealedSecret::File { kind, file_name, file_type, bytes } => {
            // Only the final component, so a hostile name cannot escape `out`
            let name = Path::new(&file_name)
                .file_name()
                .map_or_else(|| PathBuf::from(DEFAULT_FILE_NAME), PathBuf::from);
            let path = out.join(name);
            std::fs::write(&path, bytes.as_slice())?;
            writeln!(stdout, "{kind:?} ({file_type}) written to {}", path.display())?;
        },
    }
    Ok(())
}
