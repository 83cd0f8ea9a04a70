// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Foot test stand controller on the simulated rig.
//!
//! Usage: `footstand [config.json]`. Operator commands are read from stdin, one per line; end of
//! input quits the test. The process exits with the quit reason code.

use std::env;
use std::io::{self, Read};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use footstand::config::RigConfig;
use footstand::control::{self, QuitReason, TestMachine};
use footstand::error::GatewayError;
use footstand::hw::{SimPlant, SimRig};
use footstand::logging::{log_queue, DataLogger, LogSink};
use footstand::protocol::{command_channel, Command, CommandGateway, Parser};

/// Exit code for an unusable configuration or startup failure.
const EXIT_CONFIG: u8 = 78;

fn main() -> ExitCode {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();

    let config = match env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => match RigConfig::load(&path) {
            Ok(config) => {
                info!("loaded {}", path.display());
                config
            }
            Err(e) => {
                error!("{}: {}", path.display(), e);
                return ExitCode::from(EXIT_CONFIG);
            }
        },
        None => RigConfig::default(),
    };

    // Peripherals
    let rig = SimRig::new();
    let mut plant = SimPlant::new(
        rig.clone(),
        config.calibration.clone(),
        config.pins.clone(),
        config.regulator.clone(),
    );

    // Data logger
    let (producer, consumer) = log_queue(config.logging.queue_capacity);
    let sink = LogSink::new(&config.logging.dir);
    let log_period = Duration::from_millis(config.logging.period_ms as u64);
    let logger = match DataLogger::spawn(consumer, sink, log_period) {
        Ok(logger) => logger,
        Err(e) => {
            error!("could not start data logger: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // Operator console
    let (gateway, slot) = command_channel(config.limits());
    if let Err(e) = thread::Builder::new()
        .name("console".into())
        .spawn(move || console(gateway))
    {
        error!("could not start console: {}", e);
        return ExitCode::from(EXIT_CONFIG);
    }

    let period = Duration::from_millis(config.control.tick_ms as u64);
    let mut machine = match TestMachine::new(
        config,
        rig.adc(),
        rig.pwm(),
        rig.gpio(),
        slot,
        producer,
    ) {
        Ok(machine) => machine,
        Err(e) => {
            error!("hardware init failed: {}", e);
            return ExitCode::from(QuitReason::HardwareFault.code() as u8);
        }
    };

    machine.init_test(0);
    let dt = period.as_secs_f32();
    let stats = control::run(&mut machine, period, |_| {
        plant.step(dt);
        ControlFlow::Continue(())
    });

    let reason = machine.quit_reason().unwrap_or(QuitReason::OperatorAbort);
    let log_stats = logger.shutdown();
    info!(
        "{}; {} ticks, {} missed deadlines; {} rows logged to {} file(s)",
        reason,
        stats.ticks,
        stats.missed_deadlines,
        log_stats.written,
        log_stats.files.len()
    );
    ExitCode::from(reason.code() as u8)
}

/// Feed stdin through the command parser until end of input, then quit.
fn console(gateway: CommandGateway) {
    let mut parser = Parser::new();
    for byte in io::stdin().lock().bytes() {
        let byte = match byte {
            Ok(byte) => byte,
            Err(e) => {
                warn!("console read failed: {}", e);
                break;
            }
        };
        match parser.push(byte) {
            Some(Ok(command)) => match gateway.submit(command) {
                Ok(()) => {}
                Err(GatewayError::Disconnected) => return,
                Err(e) => warn!("{}", e),
            },
            Some(Err(e)) => warn!("{}", e),
            None => {}
        }
    }

    info!("console closed, quitting test");
    if let Err(e) = gateway.submit(Command::Quit) {
        if e != GatewayError::Disconnected {
            warn!("{}", e);
        }
    }
}
