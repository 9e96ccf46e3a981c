//! Command-line runner for island scenarios.

mod scenario;
mod telemetry;

use anyhow::{Context, Result};
use biosim_core::{Error, IslandSnapshot, Species};
use clap::Parser;
use scenario::Scenario;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use telemetry::LogFormat;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "biosim")]
#[command(version)]
#[command(about = "Herbivore and carnivore population dynamics on a simulated island")]
struct Args {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Override the scenario's random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Years between population log lines
    #[arg(long, default_value_t = 1)]
    log_every: u32,

    /// Years between written snapshots; must be a multiple of --log-every
    #[arg(long)]
    snapshot_every: Option<u32>,

    /// Snapshot output file (JSON lines); stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Args::parse();

    telemetry::init_telemetry(args.log_format)?;

    let snapshot_every = args.snapshot_every.unwrap_or(args.log_every);
    check_intervals(args.log_every, snapshot_every)?;

    let json = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("failed to read scenario {}", args.scenario.display()))?;
    let scenario = Scenario::from_json(&json)
        .with_context(|| format!("failed to parse scenario {}", args.scenario.display()))?;

    let mut sim = scenario.build(args.seed).context("failed to set up simulation")?;

    info!(
        scenario = %args.scenario.display(),
        seed = sim.config().seed,
        stages = scenario.stages.len(),
        years = scenario.total_years(),
        "Starting BioSim runner"
    );

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    for (index, stage) in scenario.stages.iter().enumerate() {
        sim.add_population(&stage.add_population)
            .with_context(|| format!("stage {}: invalid population", index + 1))?;
        debug!(stage = index + 1, years = stage.years, "Running stage");

        let mut write_error = None;
        sim.simulate_with(stage.years, args.log_every, |snapshot| {
            info!(
                year = snapshot.year,
                herbivores = snapshot.counts.herbivores,
                carnivores = snapshot.counts.carnivores,
                "Population"
            );
            log_species_summaries(snapshot);
            if snapshot.year % snapshot_every == 0 && write_error.is_none() {
                write_error = write_snapshot(&mut out, snapshot).err();
            }
        })?;

        if let Some(err) = write_error {
            return Err(err).context("failed to write snapshot");
        }
    }

    out.flush().context("failed to flush snapshots")?;

    let counts = sim.num_animals_per_species();
    info!(
        year = sim.year(),
        herbivores = counts.herbivores,
        carnivores = counts.carnivores,
        "Scenario complete"
    );
    Ok(())
}

fn log_species_summaries(snapshot: &IslandSnapshot) {
    for species in Species::all() {
        let samples = snapshot.samples(species);
        if samples.is_empty() {
            continue;
        }
        let weight = samples.weight_summary();
        debug!(
            year = snapshot.year,
            species = %species,
            count = snapshot.counts.get(species),
            occupied_cells = occupied_cells(snapshot.density(species)),
            mean_age = samples.age_summary().mean,
            mean_weight = weight.mean,
            max_weight = weight.max,
            mean_fitness = samples.fitness_summary().mean,
            "Species summary"
        );
    }
}

fn occupied_cells(density: &[Vec<usize>]) -> usize {
    density.iter().flatten().filter(|&&count| count > 0).count()
}

fn check_intervals(log_every: u32, snapshot_every: u32) -> Result<(), Error> {
    if log_every == 0 || snapshot_every == 0 {
        return Err(Error::Configuration(
            "log and snapshot intervals must be at least one year".to_string(),
        ));
    }
    if snapshot_every % log_every != 0 {
        return Err(Error::Configuration(format!(
            "snapshot interval {} is not a multiple of log interval {}",
            snapshot_every, log_every
        )));
    }
    Ok(())
}

fn write_snapshot<W: Write + ?Sized>(out: &mut W, snapshot: &IslandSnapshot) -> Result<(), Error> {
    serde_json::to_writer(&mut *out, snapshot)?;
    writeln!(out)?;
    Ok(())
}
