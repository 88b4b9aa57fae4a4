use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use switchcfg::{cli, configure, inspect, logger, port, proto, test};

fn main() -> Result<ExitCode> {
    let args = cli::Cli::parse();
    logger::init_logger(args.verbose, args.quiet);
    let ok = match args.cmd {
        cli::Cmd::Ports => ports()?,
        cli::Cmd::Configure(opts) => configure::run(opts)?,
        cli::Cmd::Status(ser) => status(&ser)?,
        cli::Cmd::Test(opts) => test::run(opts)?,
        cli::Cmd::Sequence(opts) => test::run_batch(opts)?,
        cli::Cmd::Inspect(opts) => inspect::run(opts)?,
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn ports() -> Result<bool> {
    let ports = port::list_available_ports()?;
    if ports.is_empty() {
        eprintln!("no serial ports found");
    }
    for p in &ports {
        println!("{}", p);
    }
    Ok(!ports.is_empty())
}

fn status(ser: &cli::SerialOpts) -> Result<bool> {
    let mut conn = port::Connection::open(ser).with_context(|| format!("opening {}", ser.dev))?;
    let alive = proto::command::check_device_status(&mut conn);
    conn.close();
    println!("{}: {}", ser.dev, if alive { "responding" } else { "no response" });
    Ok(alive)
}
