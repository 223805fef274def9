//! CLI entry point for `imapdump`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use imapdump::config::Config;
use imapdump::error::ArchiveError;
use imapdump::export::archive::ArchiveWriter;
use imapdump::i18n;
use imapdump::model::account::{self, Account};
use imapdump::model::message::MessageId;
use imapdump::processor::{AccountProcessor, AccountReport, Outcome, ProgressObserver};
use imapdump::session::eml::EmlConnector;
use imapdump::session::imap::ImapConnector;

#[derive(Parser)]
#[command(name = "imapdump", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Account list, one `login;password` per line
    #[arg(short, long, global = true, value_name = "FILE")]
    accounts: Option<PathBuf>,

    /// Root directory of the archive
    #[arg(short, long, global = true, value_name = "DIR")]
    output: Option<PathBuf>,

    /// IMAPS server host
    #[arg(long, global = true, env = "IMAPDUMP_HOST")]
    host: Option<String>,

    /// IMAPS server port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Language (en, ru). Defaults to system locale.
    #[arg(long, global = true, value_name = "LANG")]
    lang: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive every account
    Run,
    /// Archive local .eml files
    Import {
        /// `.eml` files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Account directory name under the output root
        #[arg(long, default_value = "local")]
        account: String,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Effective settings: config file values overridden by flags.
struct Settings {
    host: String,
    port: u16,
    output_dir: PathBuf,
    accounts_file: PathBuf,
}

impl Settings {
    fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            host: cli.host.clone().unwrap_or_else(|| config.imap.host.clone()),
            port: cli.port.unwrap_or(config.imap.port),
            output_dir: cli
                .output
                .clone()
                .unwrap_or_else(|| config.archive.output_dir.clone()),
            accounts_file: cli
                .accounts
                .clone()
                .unwrap_or_else(|| config.archive.accounts_file.clone()),
        }
    }
}

/// Detect language early from --lang, the config file or the system, before clap processes --help.
fn detect_lang_early(config: &Config) -> i18n::Lang {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--lang" {
            if let Some(lang) = args.get(i + 1).and_then(|c| i18n::Lang::from_code(c)) {
                return lang;
            }
        }
        if let Some(lang) = args[i]
            .strip_prefix("--lang=")
            .and_then(i18n::Lang::from_code)
        {
            return lang;
        }
    }
    config
        .general
        .language
        .as_deref()
        .and_then(i18n::Lang::from_code)
        .unwrap_or_else(i18n::detect_system_lang)
}

/// Build a localized clap Command using i18n strings.
fn build_localized_command() -> clap::Command {
    let mut cmd = Cli::command()
        .about(i18n::app_about())
        .after_help(i18n::app_after_help());

    let subcommands: Vec<clap::Command> = cmd
        .get_subcommands()
        .map(|sub| {
            let s = sub.clone();
            match s.get_name() {
                "run" => s.about(i18n::help_cmd_run()),
                "import" => s.about(i18n::help_cmd_import()),
                "completions" => s.about(i18n::help_cmd_completions()),
                "manpage" => s.about(i18n::help_cmd_manpage()),
                _ => s,
            }
        })
        .collect();

    for sub in subcommands {
        cmd = cmd.mut_subcommand(sub.get_name(), |_| sub.clone());
    }

    cmd
}

fn main() -> anyhow::Result<()> {
    let config = imapdump::config::load_config();

    // Language must be known BEFORE clap parsing so --help is localized
    i18n::set_lang(detect_lang_early(&config));

    let matches = build_localized_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let settings = Settings::resolve(&cli, &config);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(&settings),
        Commands::Import { paths, account } => cmd_import(&paths, &account, &settings),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = imapdump::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "imapdump.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Archive every account from the credential list (or one typed in).
fn cmd_run(settings: &Settings) -> anyhow::Result<()> {
    let mut accounts = account::load_accounts(&settings.accounts_file)?;
    if accounts.is_empty() {
        println!("{}", i18n::msg_no_credentials_file());
        accounts.push(prompt_account()?);
    }

    let connector = ImapConnector::new(&settings.host, settings.port);
    let writer = ArchiveWriter::new(&settings.output_dir);
    let mut processor = AccountProcessor::new(connector, writer, ConsoleReporter::default());

    let reports = processor.process_all(&accounts);
    print_summary(&reports, &settings.output_dir);
    Ok(())
}

/// Archive local `.eml` files through the same pipeline as a real inbox.
fn cmd_import(paths: &[PathBuf], account: &str, settings: &Settings) -> anyhow::Result<()> {
    let connector = EmlConnector::from_paths(paths)?;
    if connector.files().is_empty() {
        anyhow::bail!("{}", i18n::err_no_files());
    }

    let writer = ArchiveWriter::new(&settings.output_dir);
    let mut processor = AccountProcessor::new(connector, writer, ConsoleReporter::default());

    let report = processor.process(account, "");
    print_summary(&[report], &settings.output_dir);
    Ok(())
}

fn prompt_account() -> Result<Account, ArchiveError> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    account::prompt_account(&mut input, &mut output)
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "imapdump", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Console progress: message counts, a progress bar per account, diagnostics.
#[derive(Default)]
struct ConsoleReporter {
    bar: Option<ProgressBar>,
}

impl ProgressObserver for ConsoleReporter {
    fn listed(&mut self, account: &str, count: usize) {
        println!("{} {account}: {count}", i18n::msg_total_messages());

        let pb = ProgressBar::new(count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        pb.set_message(format!("{} {account}", i18n::msg_saving()));
        self.bar = Some(pb);
    }

    fn message_done(&mut self, _account: &str, _id: MessageId) {
        if let Some(pb) = &self.bar {
            pb.inc(1);
        }
    }

    fn auth_failed(&mut self, account: &str, error: &ArchiveError) {
        eprintln!(
            "{} {account}: {}\n  ({error})\n",
            i18n::err_auth_failed(),
            i18n::err_auth_hint()
        );
    }

    fn list_failed(&mut self, account: &str, error: &ArchiveError) {
        eprintln!("{} {account}.\n  ({error})\n", i18n::err_list_failed());
    }

    fn finished(&mut self, report: &AccountReport) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
        println!("{} {}.\n", i18n::msg_account_done(), report.account);
    }
}

/// Print totals over every processed account.
fn print_summary(reports: &[AccountReport], output: &Path) {
    use humansize::{format_size, BINARY};

    let completed = reports
        .iter()
        .filter(|r| r.outcome == Outcome::Completed)
        .count();
    let archived: usize = reports.iter().map(|r| r.archived).sum();
    let failed: usize = reports.iter().map(|r| r.failed).sum();
    let attachments: usize = reports.iter().map(|r| r.attachments).sum();
    let bytes: u64 = reports.iter().map(|r| r.bytes_written).sum();

    println!("  {}:", i18n::msg_summary());
    println!(
        "  {:<25} {completed}/{}",
        i18n::msg_accounts(),
        reports.len()
    );
    println!("  {:<25} {archived}", i18n::msg_archived());
    if failed > 0 {
        println!("  {:<25} {failed}", i18n::msg_failed());
    }
    println!("  {:<25} {attachments}", i18n::msg_attachments());
    println!("  {:<25} {}", i18n::msg_written(), format_size(bytes, BINARY));
    println!("  {:<25} {}", i18n::msg_output(), output.display());
    println!();
}
