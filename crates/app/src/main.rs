use std::fmt;
use std::sync::Arc;

use quiz_core::model::{Level, TopicId};
use remote::{AccountType, Backend, BackendConfig, HttpBackend, QuizContext};
use services::{AuthService, Clock, QuizLoader, QuizRunner, TokioTimer, TopicService, TutorChat};

mod config;
mod telemetry;
mod terminal;

use config::{InvalidSetting, Settings, parse_seconds};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTopicId { raw: String },
    InvalidLevel { raw: String },
    InvalidAccountType { raw: String },
    MissingTopic,
    MissingValueFor(&'static str),
    EmptyMessage,
    Setting(InvalidSetting),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTopicId { raw } => write!(f, "invalid --topic value: {raw}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid --level value: {raw}"),
            ArgsError::InvalidAccountType { raw } => {
                write!(f, "invalid --account-type value: {raw}")
            }
            ArgsError::MissingTopic => write!(f, "quiz requires --topic <id>"),
            ArgsError::MissingValueFor(what) => write!(f, "this command requires {what}"),
            ArgsError::EmptyMessage => write!(f, "ask requires a message"),
            ArgsError::Setting(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<InvalidSetting> for ArgsError {
    fn from(err: InvalidSetting) -> Self {
        ArgsError::Setting(err)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz topics [--base-url <url>] [--token <token>]");
    eprintln!(
        "  quiz quiz --topic <id> [--level beginner|intermediate|advanced] [--seconds <n>] [--base-url <url>] [--token <token>]"
    );
    eprintln!("  quiz ask <message...> [--base-url <url>] [--token <token>]");
    eprintln!(
        "  quiz register --username <name> --password <pw> --email <addr> [--full-name <name>] [--account-type student|administrator]"
    );
    eprintln!("  quiz login --username <name> --password <pw>");
    eprintln!("  quiz logout --token <token>");
    eprintln!("  quiz reset-password --email <addr>");
    eprintln!();
    eprintln!("Without --token, --username and --password sign in first.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --base-url {}", config::DEFAULT_BASE_URL);
    eprintln!("  --level beginner");
    eprintln!("  --seconds {}", config::DEFAULT_TOTAL_SECONDS);
    eprintln!();
    eprintln!("Environment (a .env file is read too):");
    eprintln!(
        "  QUIZ_BASE_URL, QUIZ_TOKEN, QUIZ_USERNAME, QUIZ_PASSWORD, QUIZ_TOTAL_SECONDS, QUIZ_LOG, RUST_LOG"
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Topics,
    Quiz,
    Ask,
    Register,
    Login,
    Logout,
    ResetPassword,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "topics" => Some(Self::Topics),
            "quiz" => Some(Self::Quiz),
            "ask" => Some(Self::Ask),
            "register" => Some(Self::Register),
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "reset-password" => Some(Self::ResetPassword),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    settings: Settings,
    topic: Option<TopicId>,
    level: Level,
    words: Vec<String>,
    email: Option<String>,
    full_name: String,
    account_type: AccountType,
}

impl Args {
    fn parse(
        cmd: Command,
        settings: Settings,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            settings,
            topic: None,
            level: Level::default(),
            words: Vec::new(),
            email: None,
            full_name: String::new(),
            account_type: AccountType::default(),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--base-url" => parsed.settings.base_url = require_value(args, "--base-url")?,
                "--token" => {
                    let value = require_value(args, "--token")?;
                    parsed.settings.access_token = Some(value).filter(|v| !v.trim().is_empty());
                }
                "--username" => {
                    parsed.settings.username = Some(require_value(args, "--username")?);
                }
                "--password" => {
                    parsed.settings.password = Some(require_value(args, "--password")?);
                }
                "--email" if matches!(cmd, Command::Register | Command::ResetPassword) => {
                    parsed.email = Some(require_value(args, "--email")?);
                }
                "--full-name" if cmd == Command::Register => {
                    parsed.full_name = require_value(args, "--full-name")?;
                }
                "--account-type" if cmd == Command::Register => {
                    let value = require_value(args, "--account-type")?;
                    parsed.account_type = match value.to_ascii_lowercase().as_str() {
                        "student" => AccountType::Student,
                        "administrator" | "admin" => AccountType::Administrator,
                        _ => return Err(ArgsError::InvalidAccountType { raw: value }),
                    };
                }
                "--topic" if cmd == Command::Quiz => {
                    let value = require_value(args, "--topic")?;
                    let topic = value
                        .parse::<TopicId>()
                        .map_err(|_| ArgsError::InvalidTopicId { raw: value.clone() })?;
                    parsed.topic = Some(topic);
                }
                "--level" if cmd == Command::Quiz => {
                    let value = require_value(args, "--level")?;
                    parsed.level = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLevel { raw: value.clone() })?;
                }
                "--seconds" if cmd == Command::Quiz => {
                    let value = require_value(args, "--seconds")?;
                    parsed.settings.total_seconds = parse_seconds("--seconds", value)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if cmd == Command::Ask && !arg.starts_with("--") => parsed.words.push(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        match cmd {
            Command::Quiz if parsed.topic.is_none() => Err(ArgsError::MissingTopic),
            Command::Ask if parsed.words.is_empty() => Err(ArgsError::EmptyMessage),
            Command::Register | Command::ResetPassword if parsed.email.is_none() => {
                Err(ArgsError::MissingValueFor("--email"))
            }
            Command::Register | Command::Login if parsed.settings.credentials().is_none() => {
                Err(ArgsError::MissingValueFor("--username and --password"))
            }
            Command::Logout if parsed.settings.access_token.is_none() => {
                Err(ArgsError::MissingValueFor("--token"))
            }
            _ => Ok(parsed),
        }
    }
}

fn backend(settings: &Settings) -> Result<Backend, Box<dyn std::error::Error>> {
    let mut config = BackendConfig::new(&settings.base_url)?;
    if let Some(token) = &settings.access_token {
        config = config.with_access_token(token.clone());
    }
    Ok(Backend::http(HttpBackend::new(config)?))
}

/// Build the backend, signing in first when credentials are configured but
/// no access token is.
async fn connect(settings: &mut Settings) -> Result<Backend, Box<dyn std::error::Error>> {
    if settings.access_token.is_some() {
        return backend(settings);
    }
    if let Some(credentials) = settings.credentials() {
        let anonymous = backend(settings)?;
        let session = AuthService::new(Arc::clone(&anonymous.auth))
            .login(&credentials)
            .await?;
        settings.access_token = Some(session.token);
    }
    backend(settings)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; variables may come from the shell.
    let _ = dotenvy::dotenv();
    let settings = Settings::from_env()?;
    telemetry::init_tracing(&settings.log)?;

    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut parsed = Args::parse(cmd, settings, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if matches!(
        cmd,
        Command::Register | Command::Login | Command::Logout | Command::ResetPassword
    ) {
        return account(cmd, &parsed).await;
    }
    let backend = connect(&mut parsed.settings).await?;
    let clock = Clock::system();
    tracing::debug!(command = ?cmd, base_url = %parsed.settings.base_url, "starting");

    match cmd {
        Command::Topics => {
            let topics = TopicService::new(Arc::clone(&backend.topics));
            let levels = topics
                .levels()
                .iter()
                .map(|level| level.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            for topic in topics.list().await? {
                println!("{:>4}  {}", topic.id().value(), topic.name());
            }
            println!("levels: {levels}");
            Ok(())
        }
        Command::Quiz => {
            let topic = parsed.topic.ok_or(ArgsError::MissingTopic)?;
            let loader = QuizLoader::from_backend(clock, &backend);
            let runner = QuizRunner::spawn(
                loader,
                topic,
                parsed.level,
                parsed.settings.total_seconds,
                Arc::new(TokioTimer),
            );
            let tutor = TutorChat::new(Arc::clone(&backend.tutor), clock)
                .with_signed_in(parsed.settings.access_token.is_some());
            terminal::run_quiz(runner, tutor).await
        }
        Command::Ask => {
            let mut tutor = TutorChat::new(Arc::clone(&backend.tutor), clock)
                .with_signed_in(parsed.settings.access_token.is_some());
            let message = parsed.words.join(" ");
            if let Some(reply) = tutor.send(&message, QuizContext::default()).await {
                println!("{}", reply.text);
            }
            Ok(())
        }
        Command::Register | Command::Login | Command::Logout | Command::ResetPassword => {
            account(cmd, &parsed).await
        }
    }
}

async fn account(cmd: Command, parsed: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let auth = AuthService::new(Arc::clone(&backend(&parsed.settings)?.auth));
    let email = parsed.email.as_deref().unwrap_or_default();
    match cmd {
        Command::Register => {
            let credentials = parsed
                .settings
                .credentials()
                .ok_or(ArgsError::MissingValueFor("--username and --password"))?;
            auth.register(&parsed.full_name, email, parsed.account_type, &credentials)
                .await?;
            println!("account {} created; sign in with `quiz login`", credentials.username);
        }
        Command::Login => {
            let credentials = parsed
                .settings
                .credentials()
                .ok_or(ArgsError::MissingValueFor("--username and --password"))?;
            let session = auth.login(&credentials).await?;
            println!("QUIZ_TOKEN={}", session.token);
        }
        Command::Logout => {
            let token = parsed
                .settings
                .access_token
                .as_deref()
                .ok_or(ArgsError::MissingValueFor("--token"))?;
            auth.logout(token).await?;
            println!("signed out");
        }
        Command::ResetPassword => {
            auth.request_password_reset(email).await?;
            println!("if {email} is registered, a reset link is on its way");
        }
        Command::Topics | Command::Quiz | Command::Ask => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_owned());
        Args::parse(cmd, Settings::default(), &mut iter)
    }

    #[test]
    fn quiz_flags_are_parsed() {
        let args = parse(
            Command::Quiz,
            &["--topic", "4", "--level", "Advanced", "--seconds", "120"],
        )
        .unwrap();
        assert_eq!(args.topic, Some(TopicId::new(4)));
        assert_eq!(args.level, Level::Advanced);
        assert_eq!(args.settings.total_seconds, 120);
    }

    #[test]
    fn quiz_requires_a_topic() {
        assert!(matches!(
            parse(Command::Quiz, &["--level", "beginner"]),
            Err(ArgsError::MissingTopic)
        ));
    }

    #[test]
    fn ask_collects_free_words() {
        let args = parse(Command::Ask, &["what", "is", "--token", "t", "a byte"]).unwrap();
        assert_eq!(args.words, ["what", "is", "a byte"]);
        assert_eq!(args.settings.access_token.as_deref(), Some("t"));
    }

    #[test]
    fn topic_flag_is_rejected_outside_quiz() {
        assert!(matches!(
            parse(Command::Topics, &["--topic", "1"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn register_needs_email_and_credentials() {
        assert!(matches!(
            parse(Command::Register, &["--username", "ada", "--password", "engine"]),
            Err(ArgsError::MissingValueFor("--email"))
        ));

        let args = parse(
            Command::Register,
            &[
                "--username",
                "ada",
                "--password",
                "engine",
                "--email",
                "ada@example.org",
                "--account-type",
                "Administrator",
            ],
        )
        .unwrap();
        assert_eq!(args.account_type, AccountType::Administrator);
        assert_eq!(args.email.as_deref(), Some("ada@example.org"));
    }

    #[test]
    fn logout_needs_a_token() {
        assert!(matches!(
            parse(Command::Logout, &[]),
            Err(ArgsError::MissingValueFor("--token"))
        ));
        assert!(parse(Command::Logout, &["--token", "abc"]).is_ok());
    }

    #[test]
    fn login_reads_credentials_from_flags() {
        let args = parse(Command::Login, &["--username", "ada", "--password", "engine"]).unwrap();
        assert!(args.settings.credentials().is_some());
        assert!(matches!(
            parse(Command::Login, &["--username", "ada"]),
            Err(ArgsError::MissingValueFor(_))
        ));
    }
}
