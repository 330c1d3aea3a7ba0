//! `airportctl` - CLI for airport-ops
//!
//! This binary drives the control tower: state change requests, position
//! reports, history, status and the ground crew.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use airport_ops::cli::{
    outcome_exit_code, render_aircraft, render_logs, render_outcome, Cli, Command, ConfigCommand,
    GroundCrewCommand, IntentCommand, LogsCommand, StatusReport,
};
use airport_ops::{init_logging, Config, ControlTower, GroundCrew};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    let open_tower = || {
        ControlTower::open(&config).with_context(|| {
            format!(
                "opening airport database {}",
                config.database_path().display()
            )
        })
    };

    match cli.command {
        Command::Intent(cmd) => return handle_intent(&open_tower()?, &cmd),
        Command::Location(cmd) => {
            open_tower()?
                .report_position(&cmd.call_sign, cmd.position())
                .with_context(|| format!("reporting position of {}", cmd.call_sign))?;
            println!("{}: position updated", cmd.call_sign);
        }
        Command::Aircraft(cmd) => {
            let aircraft = open_tower()?.list_aircraft()?;
            print!("{}", render_aircraft(&aircraft, cmd.format)?);
        }
        Command::Logs(cmd) => handle_logs(&open_tower()?, &cmd)?,
        Command::Status(cmd) => {
            let tower = open_tower()?;
            let report = StatusReport::new(
                config.database_path(),
                tower.stats()?,
                tower.limits(),
                &tower.occupancy()?,
            );
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }
        Command::Sweep => match open_tower()?.sweep_landed_to_parked()? {
            Some(call_sign) => println!("{call_sign}: LANDED -> PARKED (ground crew)"),
            None => println!("No landed aircraft."),
        },
        Command::GroundCrew(cmd) => handle_ground_crew(open_tower()?, &config, &cmd)?,
        Command::Reset(cmd) => {
            if !cmd.yes {
                println!("This deletes every aircraft and the whole state change history.");
                println!("Use --yes to confirm.");
                return Ok(ExitCode::FAILURE);
            }
            let summary = open_tower()?.reset()?;
            println!(
                "Removed {} aircraft and {} log entries.",
                summary.aircraft_removed, summary.logs_removed
            );
        }
        Command::Config(cmd) => handle_config(&config, cmd)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_intent(tower: &ControlTower, cmd: &IntentCommand) -> anyhow::Result<ExitCode> {
    let outcome = tower.request_transition(&cmd.to_request())?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", render_outcome(&outcome));
    }
    Ok(ExitCode::from(outcome_exit_code(&outcome)))
}

fn handle_logs(tower: &ControlTower, cmd: &LogsCommand) -> anyhow::Result<()> {
    let entries = match &cmd.call_sign {
        Some(call_sign) => tower.state_logs_for(call_sign, cmd.limit)?,
        None => tower.state_logs(cmd.limit, cmd.offset)?,
    };
    print!("{}", render_logs(&entries, cmd.format)?);
    Ok(())
}

fn handle_ground_crew(
    tower: ControlTower,
    config: &Config,
    cmd: &GroundCrewCommand,
) -> anyhow::Result<()> {
    let interval = match cmd.interval {
        Some(0) => bail!("--interval must be greater than 0"),
        Some(secs) => Duration::from_secs(secs),
        None => config.sweep_interval(),
    };

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async move {
        let crew = GroundCrew::new(Arc::new(tower), interval);
        let handle = crew.handle();
        let task = tokio::spawn(crew.run());

        tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl-C")?;
        handle.stop();
        task.await.context("ground crew task")?;

        println!("Ground crew parked {} aircraft.", handle.parked_count());
        Ok(())
    })
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Busy timeout (ms):  {}", config.storage.busy_timeout_ms);
                println!();
                println!("[Capacity]");
                println!("  Runway:             {}", config.capacity.runway_capacity);
                println!(
                    "  Airliner parking:   {}",
                    config.capacity.airliner_parking_capacity
                );
                println!(
                    "  Private parking:    {}",
                    config.capacity.private_parking_capacity
                );
                println!();
                println!("[Ground crew]");
                println!(
                    "  Sweep interval (s): {}",
                    config.ground_crew.sweep_interval_secs
                );
                println!();
                println!("[Validation]");
                println!(
                    "  Call sign pattern:  {}",
                    config.validation.call_sign_pattern
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
