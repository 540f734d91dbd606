use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tally_ledger::{AuditReport, LedgerConfig, TallyAuditor, VoteCaster, VoteLedger};
use tally_server::{ServerConfig, TallyServer};
use tally_store::{InMemoryStore, StoreSnapshot};
use tally_types::{Direction, TargetId, TargetRef, TargetType, UserId};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Simulate(args) => cmd_simulate(args, format),
        Command::Audit(args) => cmd_audit(args, format),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(p) => ServerConfig::load(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse().with_context(|| format!("invalid bind address {bind}"))?;
    }
    if let Some(snapshot) = args.snapshot {
        config.snapshot_path = Some(snapshot);
    }
    let server = TallyServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    votes_cast: usize,
    reports: Vec<AuditReport>,
}

impl SimulationSummary {
    fn is_consistent(&self) -> bool {
        self.reports.iter().all(AuditReport::is_consistent)
    }
}

fn simulate(args: &SimulateArgs) -> anyhow::Result<SimulationSummary> {
    if args.targets == 0 {
        bail!("--targets must be at least 1");
    }
    let target_type: TargetType = args.target_type.parse()?;
    let store = Arc::new(InMemoryStore::new());
    let targets = (0..args.targets)
        .map(|i| TargetId::parse(format!("{target_type}-{i}")).map(|id| TargetRef::new(target_type, id)))
        .collect::<Result<Vec<_>, _>>()?;
    for target in &targets {
        store.register_target(target.clone())?;
    }
    let ledger = VoteLedger::new(store.clone(), LedgerConfig::default());
    let base_seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed = base_seed, voters = args.voters, "starting simulation");

    let cast: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..args.voters)
            .map(|voter| {
                let (ledger, targets) = (&ledger, &targets);
                s.spawn(move || -> anyhow::Result<usize> {
                    let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(voter as u64));
                    let user = UserId::parse(format!("voter-{voter}"))?;
                    let mut cast = 0;
                    for _ in 0..args.rounds {
                        let target = &targets[rng.gen_range(0..targets.len())];
                        let direction = if rng.gen_bool(0.7) { Direction::Up } else { Direction::Down };
                        match ledger.cast(&user, target, direction) {
                            Ok(_) => cast += 1,
                            Err(e) => tracing::warn!(error = %e, "simulated vote failed"),
                        }
                    }
                    Ok(cast)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow::anyhow!("voter thread panicked"))?)
            .sum::<anyhow::Result<usize>>()
    })?;

    let reports =
        TallyAuditor::audit_all(store.as_ref(), target_type, false, ledger.config().attempts())?;
    Ok(SimulationSummary {
        votes_cast: cast,
        reports,
    })
}

fn cmd_simulate(args: SimulateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let summary = simulate(&args)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            println!("{} votes cast by {} voters", summary.votes_cast.to_string().bold(), args.voters);
            print_reports(&summary.reports);
        }
    }
    if !summary.is_consistent() {
        bail!("counter drift detected after simulation");
    }
    Ok(())
}

fn audit_snapshot(path: &Path, repair: bool, attempts: u32) -> anyhow::Result<Vec<AuditReport>> {
    let snapshot =
        StoreSnapshot::load(path).with_context(|| format!("reading snapshot {}", path.display()))?;
    let store = InMemoryStore::from_snapshot(snapshot)?;
    let mut reports = Vec::new();
    for target_type in TargetType::ALL {
        reports.extend(TallyAuditor::audit_all(&store, target_type, repair, attempts)?);
    }
    if repair && reports.iter().any(|r| r.repaired) {
        store.snapshot()?.save(path)?;
    }
    Ok(reports)
}

fn cmd_audit(args: AuditArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let reports = audit_snapshot(&args.snapshot, args.repair, config.ledger.attempts())?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => print_reports(&reports),
    }
    let unresolved = reports.iter().filter(|r| !r.is_consistent() && !r.repaired).count();
    if unresolved > 0 {
        bail!("{unresolved} target(s) with counter drift; rerun with --repair");
    }
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn print_reports(reports: &[AuditReport]) {
    if reports.is_empty() {
        println!("No targets.");
        return;
    }
    for report in reports {
        let status = if report.repaired {
            "repaired".yellow().bold()
        } else if report.is_consistent() {
            "ok".green()
        } else {
            "drift".red().bold()
        };
        println!(
            "  {:<24} {:>6} up {:>6} down  score {:>6}  [{}]",
            report.target.to_string(),
            report.recounted.upvotes,
            report.recounted.downvotes,
            report.recounted.vote_count(),
            status
        );
        for d in &report.discrepancies {
            println!("      {:?}: stored {} expected {}", d.kind, d.stored, d.expected);
        }
    }
}
