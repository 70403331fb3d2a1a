//! Command line harness running the code generator on sample inputs.

mod run;
mod telemetry;

use anyhow::{Context, Result};
use chrono::Utc;
use evocg_ga::TracingObserver;
use evocg_ir::AssemblyRenderer;
use evocg_select::CodeGenerator;
use tracing::{info, warn};

use crate::run::RunConfig;

fn main() -> Result<()> {
    telemetry::init_telemetry()?;

    let config = match std::env::args().nth(1) {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };

    let started = Utc::now();
    let mut generator = CodeGenerator::new(config.codegen.clone());
    let run_id = generator.run_id();
    info!(
        event = "run_started",
        %run_id,
        machine = %config.machine,
        program = ?config.program,
        unroll = config.unroll,
        seed = config.codegen.seed,
        started = %started.to_rfc3339(),
    );

    generator
        .initialize(config.machine.build(), config.program.build(config.unroll))
        .context("cannot prepare code generation")?;
    let outcome = generator
        .optimize(&mut TracingObserver)
        .context("code generation failed")?;

    let elapsed = Utc::now() - started;
    info!(
        event = "run_finished",
        %run_id,
        valid = outcome.is_valid,
        objective = outcome.objective,
        generations = outcome.generations,
        scheduler_runs = outcome.scheduler_runs,
        elapsed_ms = elapsed.num_milliseconds(),
    );
    if !outcome.is_valid {
        warn!(event = "no_valid_solution", %run_id);
    }

    let Some(context) = generator.context() else {
        anyhow::bail!("code generator lost its context");
    };
    let machine = context.machine();
    let solution = &outcome.solution;
    let renderer = AssemblyRenderer::new(machine, &solution.instruction_graph, &solution.register_assignment);

    println!("; run {run_id} at {}", started.to_rfc3339());
    println!(
        "; {} steps, objective {}, {}",
        solution.schedule.len(),
        outcome.objective,
        if outcome.is_valid { "valid" } else { "invalid" }
    );
    for (step, line) in renderer.render_schedule(&solution.schedule).iter().enumerate() {
        println!("{step:>4}: {line}");
    }
    println!(";");
    for (value, register) in solution.register_assignment.iter() {
        println!("; {value} -> {}", machine.register(register).mnemonic);
    }
    Ok(())
}
