use clap::{Args, Subcommand};

use paygate_manager::PaywallManager;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Print the cached rule set.
    Show,
    /// Remove the cached documents and every budget ledger entry.
    Clear,
}

pub fn run(manager: &PaywallManager, args: &CacheArgs, format: &OutputFormat) -> anyhow::Result<()> {
    match args.command {
        CacheCommand::Show => run_show(manager, format),
        CacheCommand::Clear => {
            manager.clear_paywall_cache()?;
            println!("Paywall cache cleared.");
            Ok(())
        }
    }
}

fn run_show(manager: &PaywallManager, format: &OutputFormat) -> anyhow::Result<()> {
    let Some(raw) = manager.get_paywall_cache() else {
        println!("No cached paywall.");
        return Ok(());
    };
    match format {
        OutputFormat::Json => println!("{raw}"),
        OutputFormat::Text => {
            let rules: paygate_core::RuleSet = serde_json::from_str(&raw)?;
            println!("{} cached rules:", rules.len());
            for rule in &rules {
                let limit = rule
                    .limit
                    .map_or_else(|| "unlimited".to_owned(), |l| l.to_string());
                println!(
                    "  #{id} {kind:?} | limit {limit} | campaign {campaign}",
                    id = rule.id,
                    kind = rule.rule_type,
                    campaign = rule.campaign_code.as_deref().unwrap_or("-"),
                );
            }
        }
    }
    Ok(())
}
