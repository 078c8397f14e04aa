//! Backup CLI commands
//!
//! Bridges the parsed command line to the orchestration layer: builds the
//! collaborators from settings, runs the command and prints the outcome.

use std::io::IsTerminal;
use std::path::Path;

use tracing::{info, warn};

use crate::archive::TarArchiver;
use crate::backup::{BackupRunner, RestoreManager};
use crate::config::paths::ServicePaths;
use crate::config::settings::{Settings, StorageBackend};
use crate::crypto::{GpgCipher, SecureString};
use crate::display;
use crate::error::{BackupError, BackupResult};
use crate::notify::{self, Notifier, NullNotifier};
use crate::services::{Deadline, RetentionEngine};
use crate::storage::{ArtifactStore, ObjectArtifactStore};

/// Everything a command needs, resolved once from the config file
pub struct ServiceContext {
    pub settings: Settings,
    pub paths: ServicePaths,
}

impl ServiceContext {
    /// Load settings from `config` and resolve local paths
    pub fn load(config: &Path) -> BackupResult<Self> {
        let settings = Settings::load(config)?;
        let paths = ServicePaths::new()?;
        Ok(Self { settings, paths })
    }

    fn store(&self) -> BackupResult<ObjectArtifactStore> {
        ObjectArtifactStore::from_settings(&self.settings.storage)
    }

    fn archiver(&self) -> TarArchiver {
        TarArchiver::new(self.settings.work_dir())
    }

    fn deadline(&self) -> Deadline {
        Deadline::from_timeout(self.settings.run_timeout)
    }
}

/// Run every job, rotate, notify
pub fn handle_backup(ctx: &ServiceContext, full: bool) -> BackupResult<()> {
    ctx.paths.ensure_directories()?;
    let store = ctx.store()?;
    let archiver = ctx.archiver();
    let cipher = GpgCipher::default();
    // A broken notifier or a missing passphrase fails jobs, never the whole run
    let notifier: Box<dyn Notifier> = match notify::from_settings(&ctx.settings.telegram) {
        Ok(notifier) => notifier,
        Err(e) => {
            warn!("Notifications disabled: {}", e);
            Box::new(NullNotifier)
        }
    };

    let mut runner = BackupRunner::new(&ctx.settings, &ctx.paths, &store, &archiver)
        .with_notifier(notifier.as_ref());
    match resolve_passphrase(&ctx.settings) {
        Ok(Some(passphrase)) => runner = runner.with_encryption(&cipher, passphrase),
        Ok(None) => {}
        Err(e) => warn!("{}", e),
    }

    info!("Starting backup process...");
    let report = runner.run(full, &ctx.deadline());

    for key in &report.uploaded {
        println!("Uploaded {}", key);
    }
    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }
    if let Some(rotation) = &report.rotation {
        println!(
            "Retention: kept {}, deleted {}",
            rotation.kept,
            rotation.deleted.len()
        );
    }

    report.into_result()?;
    println!("Backup process completed successfully");
    Ok(())
}

/// Print the artifacts in storage
pub fn handle_list(ctx: &ServiceContext) -> BackupResult<()> {
    let listing = ctx
        .store()?
        .list()
        .map_err(|e| BackupError::ListingUnavailable(e.to_string()))?;
    print!("{}", display::format_artifact_list(&listing));
    Ok(())
}

/// Restore `key` and everything it depends on into `target_dir`
pub fn handle_restore(ctx: &ServiceContext, key: &str, target_dir: &Path) -> BackupResult<()> {
    let store = ctx.store()?;
    let archiver = ctx.archiver();
    let cipher = GpgCipher::default();

    let mut manager = RestoreManager::new(&store, &archiver, ctx.settings.work_dir());
    if let Some(passphrase) = resolve_passphrase(&ctx.settings)? {
        manager = manager.with_decryption(&cipher, passphrase);
    }

    let result = manager.restore(key, target_dir, &ctx.deadline())?;
    println!("Restore completed successfully");
    println!("{}", result.summary());
    Ok(())
}

/// Print the chain a restore of `key` would apply
pub fn handle_chain(ctx: &ServiceContext, key: &str) -> BackupResult<()> {
    let store = ctx.store()?;
    let archiver = ctx.archiver();
    let chain = RestoreManager::new(&store, &archiver, ctx.settings.work_dir()).resolve(key)?;

    println!("Restore chain for {}:", chain.target());
    print!("{}", display::format_chain(&chain));
    Ok(())
}

/// Run retention on its own
pub fn handle_prune(ctx: &ServiceContext, dry_run: bool) -> BackupResult<()> {
    let store = ctx.store()?;
    let engine = RetentionEngine::new(&store, &ctx.settings.retention);
    let plan = engine.plan()?;

    print!(
        "{}",
        display::format_retention_plan(&plan, &ctx.settings.retention)
    );

    if dry_run {
        println!("Dry run, nothing deleted.");
        return Ok(());
    }

    let report = engine.apply(&plan, &ctx.deadline());
    println!("Deleted {} backup(s).", report.deleted.len());

    let failures = report.failure_messages();
    if failures.is_empty() {
        Ok(())
    } else {
        Err(BackupError::RunFailed { failures })
    }
}

/// Print the resolved configuration with secrets redacted
pub fn handle_config(ctx: &ServiceContext, config_path: &Path) {
    let settings = &ctx.settings;
    let redact = |value: &str| if value.is_empty() { "(unset)" } else { "[REDACTED]" };

    println!("backup-service configuration");
    println!("============================");
    println!("Config file:    {}", config_path.display());
    println!("Data directory: {}", ctx.paths.base_dir().display());
    println!("State files:    {}", ctx.paths.state_dir().display());
    println!("Work directory: {}", settings.work_dir().display());
    println!();

    println!("Storage:");
    match settings.storage.backend {
        StorageBackend::S3 => {
            println!("  Backend:  s3");
            println!("  Bucket:   {}", settings.storage.bucket);
            if !settings.storage.region.is_empty() {
                println!("  Region:   {}", settings.storage.region);
            }
            if !settings.storage.endpoint.is_empty() {
                println!("  Endpoint: {}", settings.storage.endpoint);
            }
            println!("  Access key: {}", redact(&settings.storage.access_key_id));
            println!(
                "  Secret key: {}",
                redact(&settings.storage.secret_access_key)
            );
        }
        StorageBackend::Local => {
            println!("  Backend:  local");
            if let Some(dir) = &settings.storage.local_dir {
                println!("  Directory: {}", dir.display());
            }
        }
    }
    if !settings.storage.prefix.is_empty() {
        println!("  Prefix:   {}", settings.storage.prefix);
    }
    println!();

    println!("Backups:");
    for job in &settings.backups {
        let folders: Vec<String> = job
            .folders
            .iter()
            .map(|f| f.display().to_string())
            .collect();
        println!("  {}: {}", job.name, folders.join(", "));
        if !job.exclude.is_empty() {
            println!("    exclude: {}", job.exclude.join(", "));
        }
    }
    println!();

    println!("Encryption: {}", enabled(settings.encryption.enabled));
    if settings.encryption.enabled {
        let passphrase = match &settings.encryption.passphrase {
            Some(p) if !p.is_empty() => "[REDACTED]",
            _ => "(prompted)",
        };
        println!("  Passphrase: {}", passphrase);
    }
    println!(
        "Retention:  {} daily, {} monthly, scope {:?}, protect chains {}",
        settings.retention.daily_count,
        settings.retention.monthly_count,
        settings.retention.scope,
        settings.retention.protect_chains
    );
    println!("Telegram:   {}", enabled(settings.telegram.enabled));
    if settings.telegram.enabled {
        println!("  Bot token: {}", redact(&settings.telegram.bot_token));
        println!("  Chat id:   {}", settings.telegram.chat_id);
    }
    println!("Schedule:   {}", settings.schedule);
    match settings.run_timeout {
        Some(timeout) => println!("Run timeout: {}s", timeout.as_secs()),
        None => println!("Run timeout: none"),
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

/// Passphrase to encrypt or decrypt with, prompting when none is configured
///
/// `None` when encryption is disabled.
fn resolve_passphrase(settings: &Settings) -> BackupResult<Option<SecureString>> {
    if !settings.encryption.enabled {
        return Ok(None);
    }
    match &settings.encryption.passphrase {
        Some(passphrase) if !passphrase.is_empty() => Ok(Some(passphrase.clone())),
        _ => prompt_passphrase("Encryption passphrase: ").map(Some),
    }
}

/// Prompt for a passphrase (hidden input)
///
/// Fails without prompting when stdin is not a terminal, as under cron.
fn prompt_passphrase(prompt: &str) -> BackupResult<SecureString> {
    if !std::io::stdin().is_terminal() {
        return Err(BackupError::Encryption(
            "no passphrase configured and no terminal to prompt on".into(),
        ));
    }
    let passphrase = rpassword::prompt_password(prompt)
        .map(SecureString::new)
        .map_err(|e| BackupError::Encryption(format!("Failed to read passphrase: {}", e)))?;
    if passphrase.is_empty() {
        return Err(BackupError::Encryption("Empty passphrase".into()));
    }
    Ok(passphrase)
}
