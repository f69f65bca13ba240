//! Config and history commands

use crate::audit::AuditLogger;
use crate::error::SealResult;

use super::AppContext;

/// Show paths and effective settings; `init` writes the settings file
pub fn handle_config(ctx: &AppContext, init: bool) -> SealResult<()> {
    let settings_file = ctx.paths.settings_file();

    if init {
        if settings_file.exists() {
            println!("Settings file already exists: {}", settings_file.display());
        } else {
            ctx.settings.save(&ctx.paths)?;
            println!("Wrote default settings to {}", settings_file.display());
        }
    }

    let encryption = &ctx.settings.encryption;
    println!("sealzip configuration");
    println!("=====================");
    println!("Base directory: {}", ctx.paths.base_dir().display());
    println!("Settings file:  {}", settings_file.display());
    println!("Journal:        {}", ctx.paths.audit_log().display());
    println!();
    println!("Encryption defaults:");
    println!("  Cipher:      {}", encryption.cipher);
    println!("  Compression: {}", encryption.compression);
    println!("  Armor:       {}", encryption.armor);
    println!("  Integrity:   {}", encryption.integrity);
    println!("  Key policy:  {:?}", encryption.key_policy);
    println!("Journal enabled: {}", ctx.settings.audit.enabled);
    Ok(())
}

/// Print the most recent journal entries
pub fn handle_history(ctx: &AppContext, count: usize) -> SealResult<()> {
    let logger = AuditLogger::new(ctx.paths.audit_log());
    let entries = logger.read_recent(count)?;

    if entries.is_empty() {
        println!("No operations recorded.");
        return Ok(());
    }

    for entry in entries {
        println!("{}", entry.format_human_readable());
    }
    Ok(())
}
