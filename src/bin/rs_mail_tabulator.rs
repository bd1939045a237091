use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};

use rs_mail_tabulator::auth::token_store::{self, SecretName};
use rs_mail_tabulator::config::{Credentials, load_config, load_config_from};
use rs_mail_tabulator::llm::client::OpenAiClient;
use rs_mail_tabulator::llm::extraction::ExtractionClient;
use rs_mail_tabulator::mail::imap_client::ImapClient;
use rs_mail_tabulator::pipeline::{Pipeline, RunMode, SourceOptions};
use rs_mail_tabulator::sheet::TableWriter;

#[derive(Parser)]
#[command(name = "rs_mail_tabulator")]
#[command(about = "Turn tabular email content into spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch messages (or read a file) and extract their tables
    Run(RunArgs),

    /// Store a secret in the OS keyring (value read from stdin)
    SetSecret {
        #[arg(long, value_enum)]
        name: SecretName,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mailbox to search: inbox, sent, drafts, archive, spam or trash
    #[arg(long, default_value = "inbox")]
    mailbox: String,

    /// Header or body field to filter on: subject, from, to or body
    #[arg(long)]
    filter_by: Option<String>,

    /// Text the filter field must contain; only the newest match is used
    #[arg(long)]
    filter_value: Option<String>,

    /// Read a .txt file from the source directory instead of the mailbox
    #[arg(long)]
    file: Option<String>,

    /// First day to include (dd-mm-yyyy)
    #[arg(long)]
    start_date: Option<String>,

    /// Day after the last one to include (dd-mm-yyyy)
    #[arg(long)]
    end_date: Option<String>,

    /// Stop after this many extracted records
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::SetSecret { name } => {
            eprintln!("Paste the value for {} (end with Ctrl-D):", name.key());
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            let secret = secret.trim();
            if secret.is_empty() {
                return Err(anyhow!("empty value; nothing stored"));
            }
            token_store::save_secret(name, secret)?;
            println!("Saved {} into the keyring", name.key());
            Ok(())
        }

        Command::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let cfg = match &args.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .map_err(|e| anyhow!("Configuration error: {e}"))?;

    let opts = SourceOptions {
        mailbox: args.mailbox,
        filter_by: args.filter_by,
        filter_value: args.filter_value,
        file: args.file,
        start_date: args.start_date,
        end_date: args.end_date,
        limit: args.limit,
    };
    let mode = RunMode::from_options(&opts, &cfg.source_dir)?;
    let creds = Credentials::resolve(&cfg, mode.needs_mailbox())?;

    let records = mode.collect(|| {
        let mb = creds
            .mailbox
            .as_ref()
            .ok_or_else(|| anyhow!("mailbox credentials were not resolved"))?;
        let imap = ImapClient::new(cfg.imap_server.clone(), cfg.imap_port, mb.user_email.clone());
        Ok(imap.connect(&mb.app_password, &cfg.connect_retry())?)
    })?;

    if records.is_empty() {
        println!("No messages with a plain-text body found");
        return Ok(());
    }

    let service = OpenAiClient::new(
        creds.api_key.clone(),
        cfg.model.clone(),
        cfg.api_base.clone(),
        cfg.request_timeout(),
    )?;
    let client = ExtractionClient::new(service, cfg.extraction_retry());
    let pipeline = Pipeline::new(client, TableWriter::new(cfg.results_dir.clone()));

    let summary = pipeline.run(&records);
    println!(
        "Processed {} record(s): {} saved, {} not tabular, {} failed",
        summary.records,
        summary.written.len(),
        summary.declined,
        summary.failed
    );
    Ok(())
}
