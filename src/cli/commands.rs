use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;

use crate::config::{CONFIG_ENV_VAR, ExportFormat, Settings};
use crate::importer::{
    ImportContext, ImportResult, ImportState, import_chatgpt_export, import_claude_export,
    parse_chatgpt_export, parse_claude_export,
};
use crate::io::{FsExportPath, FsExportSource, FsVault, PosixVaultPath};
use crate::models::ConversationRecord;
use crate::rendering::MarkdownTemplateRenderer;
use crate::utils::{format_date_label, format_path_with_tilde, parse_timestamp};

#[derive(Parser)]
#[command(name = "ai-history-importer")]
#[command(version = "0.1.0")]
#[command(about = "Import ChatGPT and Claude conversation exports into a Markdown vault", long_about = None)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import an unpacked export into a vault
    Import(ImportArgs),
    /// Print the parsed conversations as JSON
    Parse(ExportArgs),
    /// Show statistics about an export
    Stats(ExportArgs),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(value_enum)]
    pub format: ExportFormat,

    /// Unpacked export directory (contains conversations.json)
    #[arg(long)]
    pub export_dir: String,

    #[command(flatten)]
    pub filters: FilterArgs,
}

/// Each toggle comes as an on/off pair; an unset pair keeps the settings-file value
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    #[arg(long, conflicts_with = "exclude_system")]
    pub include_system: bool,

    #[arg(long)]
    pub exclude_system: bool,

    #[arg(long, conflicts_with = "exclude_hidden")]
    pub include_hidden: bool,

    #[arg(long)]
    pub exclude_hidden: bool,

    /// Drop ChatGPT reasoning blocks
    #[arg(long, conflicts_with = "include_reasoning")]
    pub exclude_reasoning: bool,

    #[arg(long)]
    pub include_reasoning: bool,

    /// Drop ChatGPT messages that are raw tool-call JSON
    #[arg(long, conflicts_with = "include_tool_calls")]
    pub exclude_tool_calls: bool,

    #[arg(long)]
    pub include_tool_calls: bool,

    /// Drop ChatGPT "Thought time: 12s" lines
    #[arg(long, conflicts_with = "include_thought_durations")]
    pub exclude_thought_durations: bool,

    #[arg(long)]
    pub include_thought_durations: bool,

    /// Drop Claude thinking blocks
    #[arg(long, conflicts_with = "include_thinking")]
    pub exclude_thinking: bool,

    #[arg(long)]
    pub include_thinking: bool,

    #[arg(long, value_name = "TEXT")]
    pub thinking_separator: Option<String>,

    /// How many directory levels below the export root to search for attachments
    #[arg(long, value_name = "N")]
    pub scan_depth: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[command(flatten)]
    pub export: ExportArgs,

    /// Vault root directory
    #[arg(long)]
    pub vault: Option<PathBuf>,

    /// Notes folder inside the vault
    #[arg(long, value_name = "DIR")]
    pub notes_dir: Option<String>,

    /// Attachments folder inside the vault
    #[arg(long, value_name = "DIR")]
    pub attachments_dir: Option<String>,

    /// Custom template file
    #[arg(long, value_name = "FILE")]
    pub template: Option<String>,

    /// Replace notes that already exist
    #[arg(long, conflicts_with = "no_overwrite")]
    pub overwrite: bool,

    /// Leave notes that already exist untouched
    #[arg(long)]
    pub no_overwrite: bool,

    /// Neither read nor write the import state file
    #[arg(long)]
    pub no_state: bool,
}

/// `Some(true)` for the "on" flag, `Some(false)` for the "off" flag, `None` when neither is given
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

impl FilterArgs {
    pub fn apply(&self, settings: &mut Settings) {
        let parse = &mut settings.parse;
        let toggles = [
            (&mut parse.include_system_messages, flag_pair(self.include_system, self.exclude_system)),
            (&mut parse.include_hidden_messages, flag_pair(self.include_hidden, self.exclude_hidden)),
            (&mut parse.exclude_reasoning, flag_pair(self.exclude_reasoning, self.include_reasoning)),
            (&mut parse.exclude_tool_calls, flag_pair(self.exclude_tool_calls, self.include_tool_calls)),
            (
                &mut parse.exclude_thought_durations,
                flag_pair(self.exclude_thought_durations, self.include_thought_durations),
            ),
            (&mut parse.exclude_thinking, flag_pair(self.exclude_thinking, self.include_thinking)),
        ];
        for (option, value) in toggles {
            if let Some(value) = value {
                *option = value;
            }
        }
        if let Some(separator) = &self.thinking_separator {
            parse.thinking_separator = separator.clone();
        }
        if let Some(depth) = self.scan_depth {
            settings.attachment_scan_depth = depth;
        }
    }
}

impl ImportArgs {
    pub fn apply(&self, settings: &mut Settings) {
        self.export.filters.apply(settings);
        if let Some(vault) = &self.vault {
            settings.vault = Some(vault.clone());
        }
        if let Some(notes_dir) = &self.notes_dir {
            let format_settings = match self.export.format {
                ExportFormat::ChatGpt => &mut settings.chatgpt,
                ExportFormat::Claude => &mut settings.claude,
            };
            format_settings.notes_directory = Some(notes_dir.clone());
        }
        if let Some(attachments_dir) = &self.attachments_dir {
            settings.attachments_directory = attachments_dir.clone();
        }
        if let Some(template) = &self.template {
            settings.custom_template_path = Some(template.clone());
        }
        if let Some(overwrite) = flag_pair(self.overwrite, self.no_overwrite) {
            settings.overwrite_on_reimport = overwrite;
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Import(args) => {
            args.apply(&mut settings);
            run_import(args, &settings)
        }
        Commands::Parse(args) => {
            args.filters.apply(&mut settings);
            let records = parse_export(args, &settings)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
        Commands::Stats(args) => {
            args.filters.apply(&mut settings);
            let records = parse_export(args, &settings)?;
            show_stats(args, &records);
            Ok(())
        }
    }
}

fn parse_export(args: &ExportArgs, settings: &Settings) -> Result<Vec<ConversationRecord>> {
    match args.format {
        ExportFormat::ChatGpt => parse_chatgpt_export(
            &FsExportSource,
            &FsExportPath,
            &args.export_dir,
            &settings.parse,
            settings.attachment_scan_depth,
        ),
        ExportFormat::Claude => {
            parse_claude_export(&FsExportSource, &FsExportPath, &args.export_dir, &settings.parse)
        }
    }
}

fn run_import(args: &ImportArgs, settings: &Settings) -> Result<()> {
    let format = args.export.format;
    let vault_root = settings
        .vault
        .clone()
        .context("No vault given (use --vault or set `vault` in the settings file)")?;
    if !vault_root.is_dir() {
        bail!("Vault directory not found: {}", vault_root.display());
    }

    let options = settings.export_options(format, &args.export.export_dir);
    let vault = FsVault::new(&vault_root);
    let ctx = ImportContext {
        source: &FsExportSource,
        export_path: &FsExportPath,
        target: &vault,
        vault_path: &PosixVaultPath,
    };

    let state_path = settings.state_path(&vault_root);
    let mut state = if args.no_state { None } else { Some(ImportState::load(&state_path)?) };

    info!("Importing {} export into {}", format, format_path_with_tilde(&vault_root));
    let result = match format {
        ExportFormat::ChatGpt => {
            import_chatgpt_export(&options, &ctx, &MarkdownTemplateRenderer, state.as_mut())?
        }
        ExportFormat::Claude => {
            import_claude_export(&options, &ctx, &MarkdownTemplateRenderer, state.as_mut())?
        }
    };

    if let Some(state) = &state {
        state.save(&state_path)?;
    }

    print_result(format, &vault_root, &result);
    Ok(())
}

fn print_result(format: ExportFormat, vault_root: &Path, result: &ImportResult) {
    println!("{} import into {}", format, format_path_with_tilde(vault_root));
    println!("Imported: {}", result.imported);
    println!("Skipped: {}", result.skipped);
    println!("Errors: {}", result.errors.len());
    for error in &result.errors {
        println!("  {}", error);
    }
}

fn show_stats(args: &ExportArgs, records: &[ConversationRecord]) {
    let messages: usize = records.iter().map(|r| r.messages.len()).sum();
    let (resolved, unresolved) = records
        .iter()
        .flat_map(ConversationRecord::attachments)
        .fold((0usize, 0usize), |(resolved, unresolved), attachment| {
            if attachment.source_path.is_some() {
                (resolved + 1, unresolved)
            } else {
                (resolved, unresolved + 1)
            }
        });

    let mut created: Vec<_> =
        records.iter().filter_map(|r| r.created_at.as_deref().and_then(parse_timestamp)).collect();
    created.sort();

    println!("{} Export Statistics", args.format);
    println!("================================");
    println!("Conversations: {}", records.len());
    println!("Messages: {}", messages);
    println!("Attachments: {}", resolved + unresolved);
    println!("  Resolved: {}", resolved);
    println!("  Unresolved: {}", unresolved);
    println!();
    println!("Export directory: {}", format_path_with_tilde(Path::new(args.export_dir.trim())));

    if let Some(oldest) = created.first() {
        println!("Oldest conversation: {}", format_date_label(oldest));
    }
    if let Some(newest) = created.last() {
        println!("Newest conversation: {}", format_date_label(newest));
    }
}
