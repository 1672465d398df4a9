//! Service-level actions: restart, reset and the firewall listing.

use tundash_core::{Command as CoreCommand, Dashboard, FirewallRules};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn restart(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    dashboard.execute(CoreCommand::Restart).await?;
    if !global.quiet {
        eprintln!("Service restarted");
    }
    Ok(())
}

pub async fn reset(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let count = dashboard.store().snapshot().len();
    let prompt = format!("Replace the configuration and drop all {count} instances?");
    if !util::confirm(&prompt, "reset", global.yes)? {
        return Ok(());
    }

    dashboard.execute(CoreCommand::ResetConfiguration).await?;
    if !global.quiet {
        eprintln!("Configuration reset, {count} instances removed");
    }
    Ok(())
}

fn rules_detail(rules: &FirewallRules) -> String {
    if rules.rules.is_empty() {
        if rules.raw.trim().is_empty() {
            return "No firewall rules".into();
        }
        return rules.raw.trim_end().to_owned();
    }
    rules.rules.join("\n")
}

pub async fn firewall(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let rules = dashboard.firewall_rules().await?;
    let out = output::render_single(&global.output, &rules, rules_detail, |r| {
        r.rules.join("\n")
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_rules_win_over_raw_dump() {
        let rules = FirewallRules {
            raw: "-A POSTROUTING ...".into(),
            rules: vec!["MASQUERADE tun0".into(), "DNAT 4567".into()],
        };
        assert_eq!(rules_detail(&rules), "MASQUERADE tun0\nDNAT 4567");
    }

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(rules_detail(&FirewallRules::default()), "No firewall rules");
    }
}
