use std::fmt;
use std::path::PathBuf;

use hub_core::model::Category;
use services::ExportFormat;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidCategory { raw: String },
    InvalidFormat { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidCategory { raw } => write!(f, "invalid --category value: {raw}"),
            ArgsError::InvalidFormat { raw } => write!(f, "invalid --format value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --local-db value: {raw}"),
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

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app config-server [--addr <host:port>]");
    eprintln!("  app render <path> [--config-url <url>] [--local-db <sqlite_url>]");
    eprintln!("                    [--email <email> --password <password>]");
    eprintln!("  app export --email <email> --password <password> --category <category>");
    eprintln!("             [--format json|csv] [--out <file>] [--config-url <url>] [--local-db <sqlite_url>]");
    eprintln!("  app flush [--config-url <url>] [--local-db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --addr {DEFAULT_ADDR}");
    eprintln!("  --format json");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  HUB_SUPABASE_URL, HUB_SUPABASE_ANON_KEY, HUB_LOCAL_DB, HUB_SITE_ORIGIN, RUST_LOG");
}

/// Where backend parameters come from and which local database to open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    /// Fetch `{url, anonKey}` from this endpoint instead of the environment.
    pub config_url: Option<String>,
    pub local_db: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ConfigServer {
        addr: String,
    },
    Render {
        path: String,
        connection: Connection,
        credentials: Option<Credentials>,
    },
    Export {
        connection: Connection,
        credentials: Credentials,
        category: Category,
        format: ExportFormat,
        out: Option<PathBuf>,
    },
    Flush {
        connection: Connection,
    },
    Help,
}

/// Flags shared by every subcommand; each one rejects what it does not use.
#[derive(Default)]
struct Flags {
    positional: Vec<String>,
    addr: Option<String>,
    connection: Connection,
    email: Option<String>,
    password: Option<String>,
    category: Option<Category>,
    format: Option<ExportFormat>,
    out: Option<PathBuf>,
}

impl Flags {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut flags = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--addr" => flags.addr = Some(require_value(args, "--addr")?),
                "--config-url" => {
                    flags.connection.config_url = Some(require_value(args, "--config-url")?);
                }
                "--local-db" => {
                    let value = require_value(args, "--local-db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    flags.connection.local_db = Some(normalize_sqlite_url(value));
                }
                "--email" => flags.email = Some(require_value(args, "--email")?),
                "--password" => flags.password = Some(require_value(args, "--password")?),
                "--category" => {
                    let value = require_value(args, "--category")?;
                    let category = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCategory { raw: value.clone() })?;
                    flags.category = Some(category);
                }
                "--format" => {
                    let value = require_value(args, "--format")?;
                    let format = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidFormat { raw: value.clone() })?;
                    flags.format = Some(format);
                }
                "--out" => flags.out = Some(PathBuf::from(require_value(args, "--out")?)),
                "--help" | "-h" => flags.positional.push(arg),
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => flags.positional.push(arg),
            }
        }
        Ok(flags)
    }

    fn credentials(&mut self) -> Result<Option<Credentials>, ArgsError> {
        match (self.email.take(), self.password.take()) {
            (None, None) => Ok(None),
            (Some(email), Some(password)) => Ok(Some(Credentials { email, password })),
            (Some(_), None) => Err(ArgsError::MissingFlag { flag: "--password" }),
            (None, Some(_)) => Err(ArgsError::MissingFlag { flag: "--email" }),
        }
    }

    fn reject_extra(&self, allowed: usize) -> Result<(), ArgsError> {
        match self.positional.get(allowed) {
            Some(extra) => Err(ArgsError::UnknownArg(extra.clone())),
            None => Ok(()),
        }
    }
}

impl Command {
    /// Parse everything after the program name.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Ok(Command::Help);
        };
        if matches!(name.as_str(), "--help" | "-h" | "help") {
            return Ok(Command::Help);
        }

        let mut flags = Flags::parse(&mut args)?;
        if flags.positional.iter().any(|p| p == "--help" || p == "-h") {
            return Ok(Command::Help);
        }

        match name.as_str() {
            "config-server" => {
                flags.reject_extra(0)?;
                Ok(Command::ConfigServer {
                    addr: flags.addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
                })
            }
            "render" => {
                flags.reject_extra(1)?;
                let path = flags.positional.first().cloned().unwrap_or_else(|| "/".into());
                let credentials = flags.credentials()?;
                Ok(Command::Render {
                    path,
                    connection: flags.connection,
                    credentials,
                })
            }
            "export" => {
                flags.reject_extra(0)?;
                let credentials = flags
                    .credentials()?
                    .ok_or(ArgsError::MissingFlag { flag: "--email" })?;
                let category = flags
                    .category
                    .ok_or(ArgsError::MissingFlag { flag: "--category" })?;
                Ok(Command::Export {
                    connection: flags.connection,
                    credentials,
                    category,
                    format: flags.format.unwrap_or(ExportFormat::Json),
                    out: flags.out,
                })
            }
            "flush" => {
                flags.reject_extra(0)?;
                Ok(Command::Flush {
                    connection: flags.connection,
                })
            }
            other => Err(ArgsError::UnknownCommand(other.to_string())),
        }
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
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
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}
