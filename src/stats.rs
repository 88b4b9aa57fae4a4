use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;

use crate::device::DeviceConfiguration;
use crate::test::runner::{TestType, Verdict};
use crate::test::sequence::{TestOutcome, pass_rate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: u64,
    pub failed: u64,
}

impl Tally {
    pub fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Pass => self.passed += 1,
            Verdict::Fail => self.failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.passed + self.failed
    }

    pub fn pass_rate(&self) -> f64 {
        pass_rate(self.passed as usize, self.total() as usize)
    }
}

/// Operator session state: the configuration being applied and everything
/// the tests produced so far. Lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub config: DeviceConfiguration,
    history: Vec<TestOutcome>,
    by_test: BTreeMap<TestType, Tally>,
    by_day: BTreeMap<NaiveDate, Tally>,
}

impl Session {
    pub fn new(config: DeviceConfiguration) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: &TestOutcome) {
        self.by_test.entry(outcome.test).or_default().add(outcome.verdict);
        self.by_day
            .entry(outcome.at.date_naive())
            .or_default()
            .add(outcome.verdict);
        self.history.push(outcome.clone());
        debug!(
            "[stats] {} now {:?}",
            outcome.test,
            self.by_test.get(&outcome.test)
        );
    }

    pub fn history(&self) -> &[TestOutcome] {
        &self.history
    }

    pub fn by_test(&self) -> impl Iterator<Item = (TestType, Tally)> + '_ {
        self.by_test.iter().map(|(t, tally)| (*t, *tally))
    }

    pub fn by_day(&self) -> impl Iterator<Item = (NaiveDate, Tally)> + '_ {
        self.by_day.iter().map(|(d, tally)| (*d, *tally))
    }

    pub fn overall(&self) -> Tally {
        self.by_test.values().fold(Tally::default(), |acc, t| Tally {
            passed: acc.passed + t.passed,
            failed: acc.failed + t.failed,
        })
    }
}
