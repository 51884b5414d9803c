use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use invitation_wizard::api::{
    CardDetails, LocalEntityStore, LocalPaymentService, LogNavigator, StaticCatalog,
    TemplateCatalog,
};
use invitation_wizard::config::Config;
use invitation_wizard::drafts::{DraftPolicy, DraftStore, FileDraftStore, SystemClock};
use invitation_wizard::logging;
use invitation_wizard::package::{PackageGate, PackageTier};
use invitation_wizard::session::SaveAction;
use invitation_wizard::types::{Category, InvitationId, TemplateId};
use invitation_wizard::wizard::{
    DisposeMode, MountOutcome, SubmitOutcome, WizardController, WizardDeps, WizardError,
    WizardSettings,
};

#[derive(Parser)]
#[command(name = "invite-wizard")]
#[command(about = "Step-by-step invitation builder with draft recovery")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List templates for a category
    Templates {
        #[arg(short, long)]
        category: Category,

        /// Only templates usable with this package
        #[arg(short, long)]
        tier: Option<PackageTier>,
    },

    /// Create an invitation, walking every wizard step
    Create {
        /// Event category (wedding, birthday, baby-shower, ...)
        #[arg(short, long)]
        category: Option<Category>,

        /// Template id (see `templates`)
        #[arg(short, long)]
        template: Option<String>,

        /// Detail field as key=value; values that parse as JSON are kept typed
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,

        /// Package for this invitation
        #[arg(short, long)]
        package: Option<PackageTier>,

        /// Continue from the saved draft instead of discarding it
        #[arg(short, long)]
        resume: bool,
    },

    /// Edit an existing invitation
    Edit {
        /// Invitation id (see `list`)
        id: String,

        #[arg(short, long)]
        template: Option<String>,

        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },

    /// Inspect or clear the unsaved draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },

    /// Buy the gold package
    Upgrade {
        /// Name on the card
        #[arg(long)]
        holder: String,

        /// Card number
        #[arg(long)]
        card: String,
    },

    /// List saved invitations
    List,

    /// Show or write the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write the effective configuration to .invite-wizard/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum DraftAction {
    /// Show the recoverable draft, if any
    Show,
    /// Delete the draft
    Clear,
}

/// Parse `key=value`, keeping JSON values typed and everything else as a string
fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;
    let logging_handle = logging::init_logging(&config, cli.debug)?;

    let result = match cli.command {
        Commands::Templates { category, tier } => cmd_templates(&config, category, tier).await,
        Commands::Create {
            category,
            template,
            fields,
            package,
            resume,
        } => cmd_create(&config, category, template, fields, package, resume).await,
        Commands::Edit {
            id,
            template,
            fields,
        } => cmd_edit(&config, id, template, fields).await,
        Commands::Draft { action } => cmd_draft(&config, action),
        Commands::Upgrade { holder, card } => cmd_upgrade(&config, holder, card).await,
        Commands::List => cmd_list(&config),
        Commands::Config { action } => cmd_config(&config, action),
    };

    print_log_location(logging_handle.log_file_path);
    result
}

fn print_log_location(log_file_path: Option<PathBuf>) {
    if let Some(log_path) = log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }
}

/// File-backed collaborators rooted in the configured state directory
struct Services {
    store: Arc<LocalEntityStore>,
    catalog: Arc<StaticCatalog>,
    drafts: Arc<FileDraftStore>,
}

impl Services {
    fn new(config: &Config) -> Result<Self> {
        let catalog = Arc::new(StaticCatalog::builtin());
        let store = Arc::new(LocalEntityStore::new(
            config.invitations_path(),
            catalog.clone(),
            config.quota_limits(),
        ));
        let policy = DraftPolicy::new(config.freshness()?, Arc::new(SystemClock));
        let drafts = Arc::new(FileDraftStore::new(config.draft_path(), policy));
        Ok(Self {
            store,
            catalog,
            drafts,
        })
    }

    fn deps(&self) -> WizardDeps {
        WizardDeps {
            entities: self.store.clone(),
            catalog: self.catalog.clone(),
            payments: Arc::new(LocalPaymentService::new()),
            navigator: Arc::new(LogNavigator),
            drafts: self.drafts.clone(),
        }
    }

    fn settings(&self, config: &Config) -> Result<WizardSettings> {
        Ok(WizardSettings {
            debounce: config.debounce_window(),
            initial_tier: self
                .store
                .account_tier()
                .context("Failed to read account tier")?,
            upgrade_price: config.upgrade_price(),
        })
    }
}

async fn cmd_templates(config: &Config, category: Category, tier: Option<PackageTier>) -> Result<()> {
    let services = Services::new(config)?;
    let account_tier = services.store.account_tier()?;
    let templates = services.catalog.templates(category, tier).await?;

    if templates.is_empty() {
        println!("No templates for {}", category.label());
        return Ok(());
    }

    println!("{} templates ({} account)", category.label(), account_tier);
    println!("{}", "─".repeat(50));
    for template in templates {
        let lock = if template.required_tier > account_tier {
            "🔒"
        } else {
            "  "
        };
        println!(
            "{} {:<18} {:<18} [{}]",
            lock, template.id, template.name, template.required_tier
        );
    }
    Ok(())
}

async fn cmd_create(
    config: &Config,
    category: Option<Category>,
    template: Option<String>,
    fields: Vec<(String, Value)>,
    package: Option<PackageTier>,
    resume: bool,
) -> Result<()> {
    let services = Services::new(config)?;
    let mut controller = WizardController::new(services.deps(), services.settings(config)?);

    match controller.mount().await? {
        MountOutcome::RecoveryOffered(prompt) if resume => {
            controller.restore()?;
            println!("Resumed draft from {}: {}", prompt.saved_at, prompt.summary);
        }
        MountOutcome::RecoveryOffered(prompt) => {
            controller.discard()?;
            println!("Discarded draft from {} (use --resume to keep it)", prompt.saved_at);
        }
        MountOutcome::Fresh if resume => println!("No recoverable draft, starting fresh"),
        _ => {}
    }

    if let Some(category) = category {
        controller.select_category(category)?;
    }
    for (key, value) in fields {
        controller.set_field(key, value)?;
    }
    if let Some(template) = template {
        let selection = controller.select_template(TemplateId::new(template)).await?;
        if selection.requires_upgrade {
            println!(
                "Template {} needs the {} package",
                selection.template, selection.tier
            );
        }
    }
    if let Some(package) = package {
        if !controller.select_package(package)? {
            controller.dispose(DisposeMode::FlushPending);
            bail!("the {} package needs an upgrade first (see `invite-wizard upgrade`); draft saved", package);
        }
    }

    walk_to_preview(&mut controller)?;
    submit_and_report(&mut controller).await
}

/// Advance step by step, persisting the draft at each boundary
fn walk_to_preview(controller: &mut WizardController) -> Result<()> {
    controller.flush_draft();
    loop {
        match controller.advance() {
            Ok(step) => {
                println!("  → {}", step);
                controller.flush_draft();
            }
            Err(WizardError::AtLastStep) => return Ok(()),
            Err(err @ WizardError::StepLocked { .. }) => {
                controller.dispose(DisposeMode::FlushPending);
                bail!("{}; draft saved, rerun with --resume to continue", err);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

async fn submit_and_report(controller: &mut WizardController) -> Result<()> {
    // Edits are not kept as drafts; the user reruns the edit instead
    let editing = matches!(controller.save_action(), SaveAction::EditUpdate(_));
    let retry_hint = if editing {
        "rerun the edit"
    } else {
        "rerun with --resume"
    };

    match controller.submit().await {
        Ok(SubmitOutcome::Saved { invitation, action }) => {
            let verb = if action.is_create() {
                "Created"
            } else {
                "Updated"
            };
            println!(
                "{} invitation {} ({}, template {})",
                verb,
                invitation.id,
                invitation.category.label(),
                invitation.template_id
            );
            if let Some(share) = controller.share_intent() {
                println!("Share it with: invite-wizard edit {}", share.invitation_id);
            }
            controller.dispose(DisposeMode::DiscardPending);
            Ok(())
        }
        Ok(SubmitOutcome::UpgradeRequired(kind)) => {
            let price = controller.gate().price().clone();
            controller.dispose(DisposeMode::FlushPending);
            bail!(
                "save needs the gold package ({:?}); upgrade for {}.{:02} {} with `invite-wizard upgrade`, then {}",
                kind,
                price.amount_cents / 100,
                price.amount_cents % 100,
                price.currency,
                retry_hint
            );
        }
        Err(err) => {
            controller.dispose(DisposeMode::FlushPending);
            let message = if editing {
                "Invitation was not updated; no changes were saved"
            } else {
                "Invitation was not saved; your draft is kept"
            };
            Err(err).context(message)
        }
    }
}

async fn cmd_edit(
    config: &Config,
    id: String,
    template: Option<String>,
    fields: Vec<(String, Value)>,
) -> Result<()> {
    let services = Services::new(config)?;
    let mut controller = WizardController::editing(
        services.deps(),
        services.settings(config)?,
        InvitationId::new(id),
    );
    controller.mount().await?;

    for (key, value) in fields {
        controller.set_field(key, value)?;
    }
    if let Some(template) = template {
        controller.select_template(TemplateId::new(template)).await?;
    }

    submit_and_report(&mut controller).await
}

fn cmd_draft(config: &Config, action: DraftAction) -> Result<()> {
    let services = Services::new(config)?;
    match action {
        DraftAction::Show => match services.drafts.load_if_recoverable() {
            Some(record) => {
                println!("Draft saved {}", record.saved_at);
                println!("  {}", record.snapshot.summary());
                println!("{}", serde_json::to_string_pretty(&record.snapshot)?);
            }
            None => println!("No recoverable draft"),
        },
        DraftAction::Clear => {
            services.drafts.clear();
            println!("Draft cleared");
        }
    }
    Ok(())
}

async fn cmd_upgrade(config: &Config, holder: String, card: String) -> Result<()> {
    let services = Services::new(config)?;
    let mut gate = PackageGate::new(services.store.account_tier()?, config.upgrade_price());

    if !gate.requires_upgrade(PackageTier::Gold) {
        println!("Account already has the gold package");
        return Ok(());
    }

    gate.show_upgrade_dialog();
    let outcome = gate
        .confirm_payment(&LocalPaymentService::new(), CardDetails { holder, number: card })
        .await;

    if !outcome.success {
        bail!(
            "payment failed: {}",
            gate.payment_error().unwrap_or("unknown error")
        );
    }

    services.store.set_account_tier(gate.current())?;
    println!(
        "Upgraded to gold (reference {})",
        outcome.reference.unwrap_or_default()
    );
    Ok(())
}

fn cmd_config(config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Init { force } => {
            let path = Config::local_config_path();
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            config.save()?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn cmd_list(config: &Config) -> Result<()> {
    let services = Services::new(config)?;
    let invitations = services.store.list()?;

    if invitations.is_empty() {
        println!("No invitations yet");
        return Ok(());
    }

    println!("Invitations ({})", invitations.len());
    println!("{}", "─".repeat(60));
    for invitation in invitations {
        println!(
            "{} {:<12} {:<16} [{}] updated {}",
            invitation.id,
            invitation.category.label(),
            invitation.template_id,
            invitation.package,
            invitation.updated_at.format("%Y-%m-%d %H:%M")
        );
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
    fn test_parse_field_keeps_json_types() {
        assert_eq!(
            parse_field("guests=120").unwrap(),
            ("guests".to_string(), serde_json::json!(120))
        );
        assert_eq!(
            parse_field("bride=Ada Lovelace").unwrap(),
            ("bride".to_string(), serde_json::json!("Ada Lovelace"))
        );
        assert_eq!(
            parse_field("note=a=b").unwrap(),
            ("note".to_string(), serde_json::json!("a=b"))
        );
    }

    #[test]
    fn test_parse_field_rejects_malformed() {
        assert!(parse_field("no-separator").is_err());
        assert!(parse_field("=value").is_err());
    }

    #[test]
    fn test_create_args() {
        let cli = Cli::try_parse_from([
            "invite-wizard",
            "create",
            "--category",
            "baby-shower",
            "--field",
            "parent=Sam",
            "--field",
            "date=\"2026-06-01\"",
            "--resume",
        ])
        .unwrap();

        match cli.command {
            Commands::Create {
                category,
                fields,
                resume,
                ..
            } => {
                assert_eq!(category, Some(Category::BabyShower));
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1].1, serde_json::json!("2026-06-01"));
                assert!(resume);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_config_init_args() {
        let cli = Cli::try_parse_from(["invite-wizard", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }
}
