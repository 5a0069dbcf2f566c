use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use match_client::{check_services_health, ScoringClient};
use server::{MatchingCoordinator, ServerConfig};
use std::sync::Arc;
use std::time::Instant;
use store::MatchStore;

/// SupperMatch - dinner group-matching pipeline
#[derive(Parser)]
#[command(name = "supper-match")]
#[command(about = "Run the dinner group-matching pipeline against the scoring services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the demo time slot and run the full matching pipeline
    Match,

    /// Probe the health of all collaborator services
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::from_env();

    match cli.command {
        Commands::Match => handle_match(config).await?,
        Commands::Health => handle_health(config).await?,
    }

    Ok(())
}

/// Handle the 'match' command
async fn handle_match(config: ServerConfig) -> Result<()> {
    let store = Arc::new(MatchStore::new());
    let (slot_id, roster) = roster::demo::seed_demo(&store).await;
    println!(
        "{} Seeded demo slot {} with {} confirmed signups",
        "✓".green(),
        slot_id,
        roster.len()
    );

    let scoring = ScoringClient::new(config.services.clone(), config.matching.request_timeout)
        .context("Failed to build scoring client")?;
    let coordinator = MatchingCoordinator::new(store.clone(), scoring, config.matching.clone());

    let start = Instant::now();
    let outcome = coordinator
        .run_complete_matching(slot_id)
        .await
        .context("Matching run failed")?;
    println!(
        "{} Matched {} users into {} groups in {:.2?}",
        "✓".green(),
        outcome.matched_user_ids.len(),
        outcome.groups.len(),
        start.elapsed()
    );

    for group in &outcome.groups {
        println!(
            "{} (score {:.2}, {} members)",
            group.id.bold().blue(),
            group.compatibility_score,
            group.size
        );
        for member in store.members_for_group(&group.id).await {
            let name = store
                .profile(member.user_id)
                .await
                .map(|p| p.name)
                .unwrap_or_else(|_| member.user_id.to_string());
            println!("  {} {}", "•".cyan(), name);
        }
        match &group.restaurant {
            Some(assignment) => println!(
                "  {} {} (similarity {:.2})",
                "→".green(),
                assignment.restaurant_name,
                assignment.similarity_score
            ),
            None => println!("  {} no venue assigned", "→".yellow()),
        }
    }

    if outcome.unmatched_group_count > 0 {
        println!(
            "{} {} group(s) found no restaurant within range",
            "!".yellow(),
            outcome.unmatched_group_count
        );
    }
    for dropped in &outcome.dropped_users {
        println!(
            "{} Dropped {}: {}",
            "!".yellow(),
            dropped.user_id,
            dropped.reason
        );
    }
    Ok(())
}

/// Handle the 'health' command
async fn handle_health(config: ServerConfig) -> Result<()> {
    let scoring = ScoringClient::new(config.services.clone(), config.matching.request_timeout)
        .context("Failed to build scoring client")?;
    let statuses = check_services_health(
        scoring.http(),
        scoring.endpoints(),
        config.matching.health_timeout,
    )
    .await;

    let mut names: Vec<_> = statuses.keys().cloned().collect();
    names.sort();
    println!("{}", "Service health:".bold().blue());
    for name in names {
        if statuses[&name] {
            println!("  {} {}", "✓".green(), name);
        } else {
            println!("  {} {}", "✗".red(), name);
        }
    }
    Ok(())
}
