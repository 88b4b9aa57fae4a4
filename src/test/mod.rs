use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::{SequenceOpts, TestOpts},
    device::DeviceConfiguration,
    port::{Connection, Link},
    stats::Session,
    test::{
        runner::{TestType, Verdict, check},
        sequence::{SequenceReport, run_sequence_with},
    },
};


/// Run one named test. Returns whether it passed.
pub fn run(opts: TestOpts) -> Result<bool> {
    let mut conn = Connection::open(&opts.ser)
        .with_context(|| format!("opening {}", opts.ser.dev))?;
    let result = check_named(&opts.name, &mut conn);
    conn.close();
    println!("{}", result_row(&opts.name, &result));
    Ok(result.is_ok())
}

/// Unknown names fail the same way a device error does.
fn check_named<L: Link>(name: &str, conn: &mut Connection<L>) -> Result<(), String> {
    let test = name.parse::<TestType>().map_err(|e| e.to_string())?;
    match check(Some(conn), test) {
        Ok(()) => {
            info!("[test] {} {}", test, Verdict::Pass);
            Ok(())
        }
        Err(e) => {
            warn!("[test] {} {}: {}", test, Verdict::Fail, e);
            Err(e.to_string())
        }
    }
}

fn result_row(name: &str, result: &Result<(), String>) -> String {
    match result {
        Ok(()) => format!("{} {}", name, Verdict::Pass),
        Err(why) => format!("{} {}  {}", name, Verdict::Fail, why),
    }
}

/// Run the test sequence `opts.rounds` times. Ctrl-C stops after the test in
/// flight. Returns whether every test that ran passed.
pub fn run_batch(opts: SequenceOpts) -> Result<bool> {
    let tests = if opts.tests.is_empty() {
        TestType::ALL.to_vec()
    } else {
        opts.tests.clone()
    };
    let config = match &opts.config {
        Some(path) => DeviceConfiguration::load(path)?,
        None => DeviceConfiguration::default(),
    };
    let mut session = Session::new(config);

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("installing Ctrl-C handler")?;
    }

    let mut conn = Connection::open(&opts.ser)
        .with_context(|| format!("opening {}", opts.ser.dev))?;
    info!(
        "[seq] {} test(s) x {} round(s) on {}",
        tests.len(),
        opts.rounds,
        conn.name()
    );

    for round in 1..=opts.rounds {
        let report = run_sequence_with(
            &mut conn,
            &tests,
            &mut |outcome| session.record(outcome),
            Some(&*cancel),
        );
        print_report(round, &report);
        if report.summary.cancelled {
            warn!("[seq] stopped by operator in round {}", round);
            break;
        }
    }
    conn.close();

    print_session(&session);
    let overall = session.overall();
    Ok(overall.failed == 0)
}

fn print_report(round: u32, report: &SequenceReport) {
    println!("== round {round}");
    for o in &report.outcomes {
        println!(
            "{:<16} {:<4} {}  {}",
            o.test.name(),
            o.verdict,
            o.at.format("%Y-%m-%d %H:%M:%S"),
            o.error.as_deref().unwrap_or("-")
        );
    }
    let s = &report.summary;
    println!(
        "total={} pass={} fail={} rate={:.2}% start={} end={} elapsed={:.2}s{}",
        s.total,
        s.passed,
        s.failed,
        s.pass_rate,
        s.started.format("%H:%M:%S"),
        s.finished.format("%H:%M:%S"),
        s.elapsed.as_secs_f64(),
        if s.cancelled { " (cancelled)" } else { "" }
    );
}

fn print_session(session: &Session) {
    let cfg = &session.config;
    println!(
        "== session: product={:?} light={} outlet={} dimming={:?}, {} result(s)",
        cfg.product_type,
        cfg.light_circuits,
        cfg.outlet_circuits,
        cfg.dimming_type,
        session.history().len()
    );
    for (test, tally) in session.by_test() {
        println!(
            "{:<16} {:<14} pass={} fail={} rate={:.1}%",
            test.name(),
            test.floor_label(),
            tally.passed,
            tally.failed,
            tally.pass_rate()
        );
    }
    for (day, tally) in session.by_day() {
        println!(
            "{}  total={} rate={:.1}%",
            day,
            tally.total(),
            tally.pass_rate()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{ETX, STX};
    use crate::port::mock::ScriptedLink;

    fn reply(code: u8) -> Vec<u8> {
        let mut r = vec![0u8; 40];
        r[0] = STX;
        r[2] = code;
        r[39] = ETX;
        r
    }

    #[test]
    fn failure_reason_lands_on_the_row() {
        let mut conn = Connection::from_link("mock", ScriptedLink::with_replies(vec![reply(2)]));
        let result = check_named("touch", &mut conn);
        assert_eq!(
            result_row("touch", &result),
            "touch FAIL  device reported error code 2"
        );
    }

    #[test]
    fn passing_and_unknown_rows() {
        let mut conn = Connection::from_link("mock", ScriptedLink::with_replies(vec![reply(0)]));
        let result = check_named("buzzer", &mut conn);
        assert_eq!(result_row("buzzer", &result), "buzzer PASS");

        let result = check_named("laser", &mut conn);
        assert_eq!(
            result_row("laser", &result),
            "laser FAIL  unknown test type: laser"
        );
    }

    #[test]
    fn silent_device_reports_why() {
        let mut conn = Connection::from_link("mock", ScriptedLink::default());
        conn.close();
        let result = check_named("led", &mut conn);
        assert_eq!(result_row("led", &result), "led FAIL  serial port is not open");
    }
}
