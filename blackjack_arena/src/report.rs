use serde::Serialize;

use crate::tournament::Standings;

/// One point of a competitor's balance history. Hand 0 is the starting
/// balance, before any round was played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceRecord<'a> {
    pub competitor: &'a str,
    pub hand_index: u32,
    pub balance: f64,
}

/// Receives the balance stream of a tournament, in the order it is produced.
pub trait Reporter {
    fn report(&mut self, record: &BalanceRecord<'_>);

    /// Called once after the last hand.
    fn finish(&mut self, _standings: &Standings) {}
}

impl Reporter for () {
    fn report(&mut self, _: &BalanceRecord<'_>) {}
}

impl<A: Reporter, B: Reporter> Reporter for (A, B) {
    fn report(&mut self, record: &BalanceRecord<'_>) {
        self.0.report(record);
        self.1.report(record);
    }

    fn finish(&mut self, standings: &Standings) {
        self.0.finish(standings);
        self.1.finish(standings);
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, record: &BalanceRecord<'_>) {
        (**self).report(record);
    }

    fn finish(&mut self, standings: &Standings) {
        (**self).finish(standings);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalancePoint {
    pub hand_index: u32,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub competitor: String,
    pub points: Vec<BalancePoint>,
}

impl Series {
    pub fn last_balance(&self) -> Option<f64> {
        self.points.last().map(|point| point.balance)
    }
}

/// Collects the whole stream in memory, one series per competitor in the
/// order competitors first appeared.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryReporter {
    series: Vec<Series>,
}

impl HistoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn history_of(&self, competitor: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.competitor == competitor)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl Reporter for HistoryReporter {
    fn report(&mut self, record: &BalanceRecord<'_>) {
        let point = BalancePoint {
            hand_index: record.hand_index,
            balance: record.balance,
        };
        match self
            .series
            .iter_mut()
            .find(|s| s.competitor == record.competitor)
        {
            Some(series) => series.points.push(point),
            None => self.series.push(Series {
                competitor: record.competitor.to_string(),
                points: vec![point],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(competitor: &str, hand_index: u32, balance: f64) -> BalanceRecord<'_> {
        BalanceRecord {
            competitor,
            hand_index,
            balance,
        }
    }

    #[test]
    fn history_keeps_one_series_per_competitor() {
        let mut history = HistoryReporter::new();
        assert!(history.is_empty());
        history.report(&record("alice", 0, 1000.0));
        history.report(&record("bob", 0, 1000.0));
        history.report(&record("alice", 1, 1010.0));
        history.report(&record("bob", 1, 990.0));
        history.report(&record("alice", 2, 1025.0));

        assert_eq!(history.series().len(), 2);
        assert_eq!(history.series()[0].competitor, "alice");
        let alice = history.history_of("alice").unwrap();
        assert_eq!(
            alice.points.iter().map(|p| p.balance).collect::<Vec<_>>(),
            vec![1000.0, 1010.0, 1025.0]
        );
        assert_eq!(alice.last_balance(), Some(1025.0));
        assert_eq!(history.history_of("bob").unwrap().points.len(), 2);
        assert!(history.history_of("carol").is_none());
    }

    #[test]
    fn pair_of_reporters_sees_the_same_stream() {
        let mut pair = (HistoryReporter::new(), HistoryReporter::new());
        pair.report(&record("alice", 0, 1000.0));
        pair.report(&record("alice", 1, 980.0));
        assert_eq!(pair.0.series(), pair.1.series());
        assert_eq!(pair.1.history_of("alice").unwrap().last_balance(), Some(980.0));
    }
}
