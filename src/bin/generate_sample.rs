use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;

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

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

const ROWS: u32 = 200;
const HEADERS: [&str; 6] = ["Name", "Email", "Phone", "Fax", "Balance", "Active"];

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let first = ["Ada", "Brook", "Cyril", "Dana", "Eli", "Fay", "Gus", "Hana"];
    let last = ["Moss", "Reyes", "Okafor", "Lind", "Varga", "Chen"];

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Contacts")?;

    for (col, name) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }

    let mut blanks = 0usize;
    for row in 1..=ROWS {
        let name = format!("{} {}", rng.pick(&first), rng.pick(&last));
        sheet.write_string(row, 0, &name)?;

        // Contact columns are blank often enough to make null filters interesting.
        let handle = name.to_ascii_lowercase().replace(' ', ".");
        if rng.chance(0.7) {
            sheet.write_string(row, 1, format!("{handle}{row}@example.com"))?;
        } else {
            blanks += 1;
        }
        if rng.chance(0.6) {
            sheet.write_string(row, 2, format!("+1 555 {:04}", rng.next_u64() % 10_000))?;
        } else {
            blanks += 1;
        }
        if rng.chance(0.25) {
            sheet.write_string(row, 3, format!("+1 555 {:04}", rng.next_u64() % 10_000))?;
        } else {
            blanks += 1;
        }
        if rng.chance(0.9) {
            let cents = (rng.next_f64() * 1_000_000.0).round() / 100.0;
            sheet.write_number(row, 4, cents)?;
        } else {
            blanks += 1;
        }
        sheet.write_boolean(row, 5, rng.chance(0.8))?;
    }

    let output_path = "sample_sheet.xlsx";
    workbook
        .save(output_path)
        .with_context(|| format!("writing {output_path}"))?;

    println!("Wrote {ROWS} rows ({blanks} blank cells) to {output_path}");
    Ok(())
}
