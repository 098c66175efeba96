use std::io::Write;

use blackjack_arena::{
    report::Series, BalanceRecord, HistoryReporter, Reporter, Standings,
};

const GLYPHS: [char; 10] = ['*', 'o', '+', 'x', '#', '@', '%', '&', '=', '~'];

/// Draws every competitor's balance history as a text chart, with a dashed
/// line at the starting balance and a legend ordered by current balance.
pub fn render(series: &[Series], starting_balance: f64, width: usize, height: usize) -> String {
    let width = width.max(2);
    let height = height.max(2);

    let points = || series.iter().flat_map(|s| s.points.iter());
    let max_hand = points().map(|p| p.hand_index).max().unwrap_or(0);
    let (mut low, mut high) = points()
        .map(|p| p.balance)
        .fold((starting_balance, starting_balance), |(low, high), balance| {
            (low.min(balance), high.max(balance))
        });
    if low == high {
        low -= 1.0;
        high += 1.0;
    }

    let row_of = |balance: f64| {
        let row = (high - balance) * (height - 1) as f64 / (high - low);
        (row as usize).min(height - 1)
    };
    let col_of = |hand_index: u32| {
        if max_hand == 0 {
            0
        } else {
            (hand_index as u64 * (width as u64 - 1) / max_hand as u64) as usize
        }
    };

    let mut grid = vec![vec![' '; width]; height];
    let reference = row_of(starting_balance);
    grid[reference].iter_mut().for_each(|cell| *cell = '-');
    for (i, s) in series.iter().enumerate() {
        let glyph = GLYPHS[i % GLYPHS.len()];
        for point in &s.points {
            grid[row_of(point.balance)][col_of(point.hand_index)] = glyph;
        }
    }

    let mut out = String::new();
    for (row, cells) in grid.iter().enumerate() {
        let label = if row == 0 {
            high.to_string()
        } else if row == height - 1 {
            low.to_string()
        } else if row == reference {
            starting_balance.to_string()
        } else {
            String::new()
        };
        out.push_str(&format!(
            "{:>9} |{}\n",
            label,
            cells.iter().collect::<String>()
        ));
    }
    out.push_str(&format!("{:>9} +{}\n", "", "-".repeat(width)));
    out.push_str(&format!(
        "{:>9}  0{:>w$}\n",
        "",
        max_hand,
        w = width - 1
    ));

    let mut legend: Vec<(char, &str, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            (
                GLYPHS[i % GLYPHS.len()],
                s.competitor.as_str(),
                s.last_balance().unwrap_or(starting_balance),
            )
        })
        .collect();
    legend.sort_by(|a, b| b.2.total_cmp(&a.2));
    for (glyph, name, balance) in legend {
        out.push_str(&format!("  {} {} ({})\n", glyph, name, balance));
    }
    out
}

/// Reporter that keeps the history and redraws the chart to `out` every
/// `refresh_every` hands and once more when the tournament finishes.
pub struct ChartReporter<W: Write> {
    out: W,
    history: HistoryReporter,
    starting_balance: f64,
    refresh_every: u32,
    width: usize,
    height: usize,
    current_hand: u32,
}

impl<W: Write> ChartReporter<W> {
    pub fn new(out: W, starting_balance: f64, refresh_every: u32) -> Self {
        ChartReporter {
            out,
            history: HistoryReporter::new(),
            starting_balance,
            refresh_every: refresh_every.max(1),
            width: 72,
            height: 20,
            current_hand: 0,
        }
    }

    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn history(&self) -> &HistoryReporter {
        &self.history
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, title: &str) {
        let chart = render(
            self.history.series(),
            self.starting_balance,
            self.width,
            self.height,
        );
        if let Err(error) = write!(self.out, "{}\n{}\n", title, chart).and_then(|_| self.out.flush())
        {
            tracing::warn!(%error, "cannot draw the balance chart");
        }
    }
}

impl<W: Write> Reporter for ChartReporter<W> {
    fn report(&mut self, record: &BalanceRecord<'_>) {
        // The first record of a hand means every competitor finished the one
        // before it.
        if record.hand_index > self.current_hand {
            let finished = self.current_hand;
            self.current_hand = record.hand_index;
            if finished > 0 && finished % self.refresh_every == 0 {
                self.draw(&format!("Balances after hand {}", finished));
            }
        }
        self.history.report(record);
    }

    fn finish(&mut self, _standings: &Standings) {
        self.draw(&format!("Final balances after hand {}", self.current_hand));
    }
}
