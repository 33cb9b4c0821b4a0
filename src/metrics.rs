//! Operation counters for the table engine, rendered in Prometheus text format

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct TableMetrics {
    start_time: Instant,
    tables_created: AtomicU64,
    tables_closed: AtomicU64,
    bets_accepted: AtomicU64,
    spins: AtomicU64,
    claims_won: AtomicU64,
    claims_lost: AtomicU64,
    total_wagered: AtomicU64,
    total_paid_out: AtomicU64,
    house_funded: AtomicU64,
    rejections: DashMap<&'static str, u64>,
}

impl Default for TableMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TableMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            tables_created: AtomicU64::new(0),
            tables_closed: AtomicU64::new(0),
            bets_accepted: AtomicU64::new(0),
            spins: AtomicU64::new(0),
            claims_won: AtomicU64::new(0),
            claims_lost: AtomicU64::new(0),
            total_wagered: AtomicU64::new(0),
            total_paid_out: AtomicU64::new(0),
            house_funded: AtomicU64::new(0),
            rejections: DashMap::new(),
        }
    }

    pub fn record_table_created(&self) {
        self.tables_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_table_closed(&self) {
        self.tables_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bet(&self, amount: u64) {
        self.bets_accepted.fetch_add(1, Ordering::Relaxed);
        self.total_wagered.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn record_spin(&self) {
        self.spins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_claim(&self, payout: u64) {
        if payout > 0 {
            self.claims_won.fetch_add(1, Ordering::Relaxed);
            self.total_paid_out.fetch_add(payout, Ordering::Relaxed);
        } else {
            self.claims_lost.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_funding(&self, amount: u64) {
        self.house_funded.fetch_add(amount, Ordering::Relaxed);
    }

    /// Count a rejected request under its error code
    pub fn record_rejection(&self, code: &'static str) {
        *self.rejections.entry(code).or_insert(0) += 1;
    }

    pub fn bets_accepted(&self) -> u64 {
        self.bets_accepted.load(Ordering::Relaxed)
    }

    pub fn rejections_for(&self, code: &str) -> u64 {
        self.rejections.get(code).map(|c| *c).unwrap_or(0)
    }

    pub fn total_rejections(&self) -> u64 {
        self.rejections.iter().map(|c| *c.value()).sum()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn render_prometheus(&self) -> String {
        let mut output = String::new();

        let counters = [
            ("roulette_tables_created_total", "Tables created", &self.tables_created),
            ("roulette_tables_closed_total", "Tables closed", &self.tables_closed),
            ("roulette_bets_accepted_total", "Bets accepted", &self.bets_accepted),
            ("roulette_spins_total", "Spins completed", &self.spins),
            ("roulette_claims_won_total", "Claims settled as a win", &self.claims_won),
            ("roulette_claims_lost_total", "Claims settled as a loss", &self.claims_lost),
            ("roulette_wagered_total", "Value staked on accepted bets", &self.total_wagered),
            ("roulette_paid_out_total", "Value paid out to winners", &self.total_paid_out),
            ("roulette_house_funded_total", "House liquidity added to tables", &self.house_funded),
        ];

        for (name, help, value) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {}\n\n",
                value.load(Ordering::Relaxed)
            ));
        }

        output.push_str(
            "# HELP roulette_rejections_total Rejected requests by error code\n\
             # TYPE roulette_rejections_total counter\n",
        );
        let mut rejections: Vec<(&'static str, u64)> =
            self.rejections.iter().map(|e| (*e.key(), *e.value())).collect();
        rejections.sort();
        for (code, count) in rejections {
            output.push_str(&format!("roulette_rejections_total{{code=\"{}\"}} {}\n", code, count));
        }
        output.push('\n');

        output.push_str(&format!(
            "# HELP roulette_uptime_seconds Process uptime\n# TYPE roulette_uptime_seconds gauge\nroulette_uptime_seconds {}\n",
            self.uptime_seconds()
        ));

        output
    }
}
