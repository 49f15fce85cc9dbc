// Onboarding story over an in-process network

use anyhow::{bail, Context};
use bnms_core::effects::PhysicalTimeEffects;
use bnms_core::NodeConfig;
use bnms_effects::SystemTimeHandler;
use bnms_testkit::{role, role_of, TestNetwork};
use std::path::Path;

/// Run the demo with `members` participants (at least two).
///
/// # Arguments
/// * `config_path` - Optional TOML file layered under `BNMS_*` variables
/// * `members` - Number of participants to onboard
pub async fn run(config_path: Option<&Path>, members: usize) -> anyhow::Result<()> {
    if members < 2 {
        bail!("the demo needs at least two members, got {members}");
    }
    let config = NodeConfig::load(config_path).context("failed to load configuration")?;
    let start_ms = SystemTimeHandler::new().physical_time().await.ts_ms;

    let mut net = TestNetwork::builder()
        .participants(members)
        .config(config)
        .start_ms(start_ms)
        .build();
    let bno = net.authority_party().clone();
    tracing::info!(
        authority = %bno,
        members,
        notifications = net.config.authority.notifications_enabled,
        "network started"
    );

    // Onboarding
    for index in 0..members {
        let record = net.request(index, role("DEFAULT")).await?;
        tracing::info!(member = %record.member(), status = %record.status(), "membership requested");
    }
    for index in 0..members {
        let record = net.authority.service().activate(&net.party(index)).await?;
        tracing::info!(member = %record.member(), ledger_ref = %record.ledger_ref, "membership activated");
    }

    let directory = net.sync(0, true).await?;
    println!("\nDirectory as seen by {}:", net.party(0));
    for (member, record) in &directory {
        println!(
            "  {:<40} {:<10} role={}",
            member.to_string(),
            record.status().to_string(),
            role_of(record).unwrap_or_default()
        );
    }

    // Outsiders are refused
    let outsider = net.add_participant("O=Outsider,L=Paris,C=FR");
    match outsider.memberships(&bno, true).await {
        Ok(_) => bail!("outsider was served the directory"),
        Err(err) => tracing::info!(error = %err, "outsider refused as expected"),
    }

    // Self-service amendment
    let amended = net
        .participant(0)
        .amend_metadata(&bno, role("roleB"))
        .await?;
    tracing::info!(
        member = %amended.member(),
        role = %role_of(&amended).unwrap_or_default(),
        "metadata amended"
    );

    // Suspension
    let subject = net.party(0);
    net.authority.service().suspend(&subject).await?;
    net.settle().await;
    net.sync(1, true).await?;
    match net.participant(1).guard(&bno).require_active_member(&subject) {
        Ok(_) => bail!("guard admitted a suspended member"),
        Err(err) => tracing::info!(error = %err, "guard refused suspended counterparty"),
    }
    match net.sync(0, true).await {
        Ok(_) => bail!("suspended member was served the directory"),
        Err(err) => tracing::info!(error = %err, "suspended member refused as expected"),
    }

    // Re-activation
    net.authority.service().activate(&subject).await?;
    net.settle().await;
    net.sync(1, true).await?;
    let record = net
        .participant(1)
        .guard(&bno)
        .require_active_member(&subject)?;
    tracing::info!(member = %record.member(), "guard admits re-activated counterparty");

    // Version reporting
    net.participant(1)
        .report_version(&bno, "net.corda", "bnms-demo", env!("CARGO_PKG_VERSION"))
        .await?;
    let versions = net.authority.versions().versions().await?;

    println!("\nReported versions:");
    for (reporter, rows) in &versions {
        for row in rows {
            println!("  {reporter}: {}:{} {}", row.group, row.name, row.version);
        }
    }
    println!("\nDemo complete: {} records issued", net.authority.service().memberships().await?.len());
    Ok(())
}
