//! Arbor - Spanning Tree Simulation
//!
//! Runs a scenario (built-in or JSON file), drops the scripted switches
//! and prints one log line per surviving switch.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use arbor_logging::{ArborSubscriberBuilder, LogConfig};
use arbor_simulation::{
    ActorNetwork, Scenario, SimConfig, Simulation, SwitchId, Topology, TopologyBuilder,
    run_narrated, verify,
};

/// Upper bound on how long an actor run may take to settle
const SETTLE_LIMIT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(
    name = "arbor",
    about = "Spanning tree protocol simulation with scripted switch drops",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write a JSONL log of the run to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print the final log lines
    Run {
        /// Built-in scenario name or path to a scenario file
        scenario: String,

        /// Override the scenario TTL
        #[arg(short, long)]
        ttl: Option<u32>,

        /// Override the drop list (comma-separated IDs, empty for none)
        #[arg(short, long)]
        drops: Option<String>,

        /// Write the log lines to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full run report as JSON
        #[arg(long)]
        json: bool,

        /// Run every switch as its own tokio task
        #[arg(long)]
        actors: bool,

        /// Check the final state for convergence
        #[arg(long)]
        verify: bool,
    },

    /// Run a scenario phase by phase with commentary
    Demo {
        /// Built-in scenario name or path to a scenario file
        scenario: String,
    },

    /// List the built-in scenarios
    List,

    /// Show a scenario topology, or generate one
    Topology {
        /// Built-in scenario name or path to a scenario file
        scenario: Option<String>,

        /// Shape of a generated topology
        #[arg(short, long, value_enum, default_value = "ring")]
        kind: TopologyKind,

        /// Number of switches to generate
        #[arg(short, long, default_value = "6")]
        switches: u32,

        /// Extra link probability for random topologies
        #[arg(short, long, default_value = "0.3")]
        probability: f64,

        /// RNG seed for random topologies
        #[arg(long)]
        seed: Option<u64>,

        /// Print as a scenario file instead of a diagram
        #[arg(long)]
        json: bool,
    },

    /// Step through a scenario interactively
    Interactive {
        /// Built-in scenario name or path to a scenario file
        #[arg(default_value = "line")]
        scenario: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TopologyKind {
    Line,
    Ring,
    Star,
    Full,
    Grid,
    Random,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match (cli.verbose, cli.log_dir.clone()) {
        (true, None) => LogConfig::verbose(),
        (true, Some(dir)) => LogConfig::verbose().with_run_log(dir),
        // The run log records info and up while the console stays silent
        (false, Some(dir)) => LogConfig::default().without_console().with_run_log(dir),
        (false, None) => LogConfig::quiet(),
    };
    let _guard = ArborSubscriberBuilder::new()
        .with_config(config)
        .try_init()
        .context("failed to set up logging")?;

    match cli.command {
        Commands::Run {
            scenario,
            ttl,
            drops,
            output,
            json,
            actors,
            verify,
        } => {
            let mut scenario = Scenario::resolve(&scenario)?;
            if let Some(ttl) = ttl {
                scenario = scenario.with_ttl(ttl);
            }
            if let Some(drops) = drops {
                scenario = scenario.with_drop_list(&drops)?;
            }
            scenario.validate()?;
            run(&scenario, output, json, actors, verify)?;
        }
        Commands::Demo { scenario } => {
            run_narrated(&Scenario::resolve(&scenario)?, SimConfig::default())?;
        }
        Commands::List => {
            for name in Scenario::builtin_names() {
                let scenario = Scenario::builtin(name)?;
                println!(
                    "{:<20} switches={:<3} ttl={:<3} drops={:?}",
                    name,
                    scenario.topology.switch_count(),
                    scenario.ttl,
                    scenario.drops
                );
            }
        }
        Commands::Topology {
            scenario,
            kind,
            switches,
            probability,
            seed,
            json,
        } => {
            let scenario = match scenario {
                Some(name) => Scenario::resolve(&name)?,
                None => {
                    let topology = generate(kind, switches, probability, seed)?;
                    let ttl = topology.diameter() + 1;
                    Scenario::new(format!("{:?}", kind).to_lowercase(), topology, ttl)
                }
            };
            if json {
                println!("{}", scenario.to_json_string()?);
            } else {
                println!("{}", scenario.topology.visualize());
            }
        }
        Commands::Interactive { scenario } => {
            run_interactive(Scenario::resolve(&scenario)?)?;
        }
    }

    Ok(())
}

fn generate(
    kind: TopologyKind,
    switches: u32,
    probability: f64,
    seed: Option<u64>,
) -> anyhow::Result<Topology> {
    if switches == 0 {
        bail!("a topology needs at least one switch");
    }
    let builder = TopologyBuilder::new(switches);
    Ok(match kind {
        TopologyKind::Line => builder.line(),
        TopologyKind::Ring => builder.ring(),
        TopologyKind::Star => builder.star(),
        TopologyKind::Full => builder.full_mesh(),
        TopologyKind::Grid => {
            let columns = (switches as f64).sqrt().ceil() as u32;
            builder.grid(columns.max(1))
        }
        TopologyKind::Random => builder.random(probability, seed),
    })
}

fn run(
    scenario: &Scenario,
    output: Option<PathBuf>,
    json: bool,
    actors: bool,
    check: bool,
) -> anyhow::Result<()> {
    info!(scenario = %scenario.name, ttl = scenario.ttl, actors, "Running scenario");

    let (lines, snapshots, topology, report) = if actors {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let network = tokio::time::timeout(SETTLE_LIMIT, ActorNetwork::run_scenario(scenario))
                .await
                .context("actor network did not settle")??;
            let snapshots = network.snapshots().await?;
            let lines = snapshots.iter().map(|s| s.log_line.clone()).collect::<Vec<_>>();
            let topology = network.topology().clone();
            let report = serde_json::json!({
                "run_id": network.run_id(),
                "ttl": scenario.ttl,
                "log_lines": lines,
                "switches": snapshots,
                "stats": network.stats(),
            });
            network.shutdown().await?;
            anyhow::Ok((lines, snapshots, topology, report))
        })?
    } else {
        let sim = arbor_simulation::run_scenario(scenario, SimConfig::default())?;
        let report = serde_json::to_value(sim.report())?;
        (sim.log_lines(), sim.snapshots(), sim.topology().clone(), report)
    };

    let text = if json {
        serde_json::to_string_pretty(&report)?
    } else {
        lines.join("\n")
    };

    match output {
        Some(path) => std::fs::write(&path, text + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", text),
    }

    if check {
        let convergence = verify(&snapshots, &topology);
        eprintln!("{}", convergence);
        if !convergence.is_converged() {
            bail!("scenario {} did not converge", scenario.name);
        }
    }
    Ok(())
}

fn run_interactive(scenario: Scenario) -> anyhow::Result<()> {
    println!("{}", scenario.topology.visualize());

    let config = SimConfig::default().with_message_trace(true);
    let mut sim = Simulation::from_scenario(&scenario, config)?;
    sim.seed();
    println!("Seeded with TTL {}. {}", scenario.ttl, sim.state_summary());

    println!("\nInteractive mode. Commands:");
    println!("  step [n]        - Deliver n messages (default 1)");
    println!("  run             - Deliver until quiescent");
    println!("  drop <switch>   - Drop a switch (e.g., 'drop 1')");
    println!("  status          - Show every switch's view");
    println!("  logs            - Show log lines");
    println!("  stats           - Show statistics");
    println!("  events          - Show event log");
    println!("  verify          - Check convergence");
    println!("  quit            - Exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();

        let Some(command) = parts.first() else {
            continue;
        };

        match *command {
            "step" => {
                let n: usize = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
                let delivered = (0..n).take_while(|_| sim.step().is_some()).count();
                println!("  Delivered {} message(s). {}", delivered, sim.state_summary());
            }
            "run" => {
                let delivered = sim.run_until_quiescent();
                println!("  Delivered {} message(s). {}", delivered, sim.state_summary());
            }
            "drop" => match parts.get(1).map(|s| s.parse::<SwitchId>()) {
                Some(Ok(id)) => match sim.drop_switch(id) {
                    Ok(notified) => println!("  Dropped {}, notified {:?}", id, notified),
                    Err(e) => println!("  {}", e),
                },
                Some(Err(e)) => println!("  {}", e),
                None => println!("  Usage: drop <switch>"),
            },
            "status" => {
                println!("  {}", sim.state_summary());
                for switch in sim.switches() {
                    println!(
                        "    {}: root {} distance {} via {}",
                        switch.id(),
                        switch.root(),
                        switch.distance(),
                        switch.next_hop()
                    );
                }
            }
            "logs" => {
                for line in sim.log_lines() {
                    println!("  {}", line);
                }
            }
            "stats" => {
                println!("  Messages sent: {}", sim.stats.messages_sent);
                println!("  Messages delivered: {}", sim.stats.messages_delivered);
                println!("  Messages discarded: {}", sim.stats.messages_discarded);
                println!("  Improvements: {}", sim.stats.improvements);
                println!("  Resets: {}", sim.stats.resets);
                println!("  Replies: {}", sim.stats.replies);
            }
            "events" => {
                println!("  Event log ({} events):", sim.event_log.len());
                for event in sim.event_log.iter().rev().take(20) {
                    println!("    {:?}", event);
                }
                if sim.event_log.len() > 20 {
                    println!("    ... ({} more)", sim.event_log.len() - 20);
                }
            }
            "verify" => {
                print!("  {}", verify(&sim.snapshots(), sim.topology()));
                println!();
            }
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            other => {
                println!("  Unknown command: {}", other);
            }
        }
    }

    Ok(())
}
