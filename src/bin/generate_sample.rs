use chrono::{Duration, NaiveDate};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (district, price per m² on day 0, daily drift)
const DISTRICTS: [(&str, f64, f64); 4] = [
    ("Old Town", 6200.0, 0.9),
    ("Riverside", 4800.0, 0.6),
    ("Harbour", 5400.0, 1.1),
    ("Suburbs", 3100.0, 0.3),
];

const TRANSACTIONS: usize = 2000;
const SPAN_DAYS: i64 = 5 * 365;

fn main() {
    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2010, 1, 1).expect("valid start date");

    let output_path = "sample_transactions.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");
    writer
        .write_record(["Date", "District", "Area", "Price", "PricePerUnit"])
        .expect("Failed to write header");

    for _ in 0..TRANSACTIONS {
        let day = (rng.next_f64() * SPAN_DAYS as f64) as i64;
        let (district, base, drift) = DISTRICTS[(rng.next_u64() % DISTRICTS.len() as u64) as usize];

        let area = rng.gauss(65.0, 20.0).clamp(18.0, 250.0).round();
        let per_unit = (base + drift * day as f64 + rng.gauss(0.0, base * 0.08)).max(500.0);
        let date = start + Duration::days(day);

        writer
            .write_record([
                date.format("%Y-%m-%d").to_string(),
                district.to_string(),
                format!("{area:.0}"),
                format!("{:.2}", per_unit * area),
                format!("{per_unit:.2}"),
            ])
            .expect("Failed to write row");
    }
    writer.flush().expect("Failed to flush output");

    println!("Wrote {TRANSACTIONS} transactions over {SPAN_DAYS} days to {output_path}");
}
