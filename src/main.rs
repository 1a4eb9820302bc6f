use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use tracing_subscriber::EnvFilter;

use skitwriter::config::{self, Config};
use skitwriter::controller::Controller;
use skitwriter::genai::{GenError, GEMINI_API_KEY_ENV};
use skitwriter::render::render_view;
use skitwriter::repl;
use skitwriter::script::Language;

/// Parse a language name (case-insensitive)
fn parse_language(s: &str) -> Result<Language, String> {
    s.parse()
}

#[derive(Parser)]
#[command(name = "skitwriter")]
#[command(version, about = "Generate short comedy skits with AI and translate them", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one script and optionally translate it
    #[command(after_help = "EXAMPLES:
    skitwriter generate \"a cat who orders pizza\"
    skitwriter generate \"monsoon traffic\" --language bangla
    skitwriter generate \"wedding buffet\" --translate hindi --translate bangla

ENVIRONMENT:
    GEMINI_API_KEY    Required unless set in the config file.")]
    Generate {
        /// What the skit should be about
        topic: String,
        /// Language for the script (default from config, else Hinglish)
        #[arg(long, short, value_parser = parse_language)]
        language: Option<Language>,
        /// Translate the script into this language (repeatable)
        #[arg(long, short, value_parser = parse_language)]
        translate: Vec<Language>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive session (default)
    Repl {
        /// Language for new scripts (default from config, else Hinglish)
        #[arg(long, short, value_parser = parse_language)]
        language: Option<Language>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
    /// Print the config file path
    Path,
}

/// Load .env file without overriding existing environment variables.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

/// Route `log` records through a tracing fmt subscriber on stderr.
///
/// Defaults to `warn`; override with `RUST_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    load_env();
    init_logging();

    let cli = Cli::parse();
    let config_path = cli.config.clone();

    let result = match cli.command {
        Some(Commands::Config { action }) => run_config(action, config_path),
        Some(Commands::Generate {
            topic,
            language,
            translate,
            json,
        }) => run_generate(config_path, topic, language, translate, json),
        Some(Commands::Repl { language }) => run_repl(config_path, language),
        None => run_repl(config_path, None),
    };

    if let Err(e) = result {
        if !e.is_empty() {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config, String> {
    Config::load(path.as_deref()).map_err(|e| e.to_string())
}

fn build_controller(config: &Config, language: Option<Language>) -> Result<Controller, String> {
    let client = config.gemini_client().map_err(|e| match e {
        GenError::MissingApiKey => format!(
            "{} is not set.\n\n\
            Add your API key to a .env file:\n    \
                echo '{}=your-api-key-here' >> .env\n\n\
            Or set api_key under [api] in {}",
            GEMINI_API_KEY_ENV,
            GEMINI_API_KEY_ENV,
            config::default_path().display()
        ),
        _ => format!("Failed to create Gemini client: {}", e),
    })?;

    Ok(Controller::new(
        Arc::new(client),
        language.unwrap_or(config.defaults.language),
    ))
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create async runtime: {}", e))
}

fn run_generate(
    config_path: Option<PathBuf>,
    topic: String,
    language: Option<Language>,
    translate: Vec<Language>,
    json: bool,
) -> Result<(), String> {
    let config = load_config(config_path)?;
    let controller = build_controller(&config, language)?;

    runtime()?.block_on(async {
        controller.set_topic(topic);
        if !json {
            eprintln!("Writing your script...");
        }
        controller.generate().await;

        if controller.state().current_script.is_some() && !translate.is_empty() {
            join_all(translate.iter().map(|l| controller.translate(*l))).await;
        }
    });

    let state = controller.state();
    if json {
        let output = serde_json::json!({
            "topic": state.topic,
            "language": state.script_language,
            "script": state.current_script,
            "translations": state.translations,
            "error": state.last_error,
        });
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| format!("Failed to encode JSON: {}", e))?;
        println!("{}", text);
    } else {
        print!("{}", render_view(&state));
    }

    generate_result(state.last_error, json)
}

/// Map the final `last_error` to the command result.
///
/// The rendered view already shows the error, so outside JSON mode the
/// returned message is empty and `main` only sets the exit code.
fn generate_result(last_error: Option<String>, json: bool) -> Result<(), String> {
    match last_error {
        Some(error) if json => Err(error),
        Some(_) => Err(String::new()),
        None => Ok(()),
    }
}

fn run_repl(config_path: Option<PathBuf>, language: Option<Language>) -> Result<(), String> {
    let config = load_config(config_path)?;
    let controller = build_controller(&config, language)?;

    println!("skitwriter - writing in {}", controller.state().language);
    println!("{}", repl::HELP_TEXT);

    runtime()?.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        repl::run(&controller, stdin, &mut stdout)
            .await
            .map_err(|e| format!("Terminal I/O failed: {}", e))
    })
}

fn run_config(action: ConfigAction, config_path: Option<PathBuf>) -> Result<(), String> {
    let path = config_path.unwrap_or_else(config::default_path);
    match action {
        ConfigAction::Show => {
            let config = load_config(Some(path.clone()))?;
            println!("# {}", path.display());
            print!("{}", config.to_toml().map_err(|e| e.to_string())?);
        }
        ConfigAction::Init => {
            Config::write_default(&path).map_err(|e| e.to_string())?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_args_parse() {
        let cli = Cli::try_parse_from([
            "skitwriter",
            "generate",
            "a cat who orders pizza",
            "--language",
            "hindi",
            "-t",
            "bangla",
            "-t",
            "hinglish",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Generate {
                topic,
                language,
                translate,
                json,
            }) => {
                assert_eq!(topic, "a cat who orders pizza");
                assert_eq!(language, Some(Language::Hindi));
                assert_eq!(translate, vec![Language::Bangla, Language::Hinglish]);
                assert!(!json);
            }
            _ => panic!("expected generate command"),
        }
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let result = Cli::try_parse_from(["skitwriter", "generate", "x", "--language", "elvish"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_generate_result_reports_failure_without_exiting() {
        assert_eq!(generate_result(None, false), Ok(()));
        assert_eq!(generate_result(None, true), Ok(()));
        assert_eq!(
            generate_result(Some("Failed to translate to Hindi.".to_string()), true),
            Err("Failed to translate to Hindi.".to_string())
        );
        assert_eq!(
            generate_result(Some("Failed to translate to Hindi.".to_string()), false),
            Err(String::new())
        );
    }

    #[test]
    fn test_no_subcommand_defaults_to_repl() {
        let cli = Cli::try_parse_from(["skitwriter"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["skitwriter", "config", "path", "--config", "/tmp/s.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Path
            })
        ));
    }
}
