use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

use credit_dashboard::data::model::{Schema as Columns, DATE_DISPLAY_FORMAT};
use credit_dashboard::report::format_brl;

const ROWS: usize = 240;

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

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

struct Request {
    broker: &'static str,
    unit: &'static str,
    purpose: &'static str,
    status: &'static str,
    amount: Option<f64>,
    date: Option<NaiveDate>,
}

fn generate(rng: &mut SimpleRng) -> Result<Vec<Request>> {
    let brokers = ["Ana Souza", "Bruno Lima", "Carla Dias", "Diego Alves", "Elisa Rocha"];
    let units = ["Hellu's Prime", "MyBroker Centro", "MyBroker Sul"];
    let purposes = ["Imóvel", "Veículo", "Capital de giro", "Reforma", "Consórcio"];
    let statuses = ["Aprovado", "Em análise", "Pendente", "Recusado"];
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).context("invalid start date")?;

    Ok((0..ROWS)
        .map(|i| {
            let purpose = rng.pick(&purposes);
            let base = match purpose {
                "Imóvel" => 350_000.0,
                "Veículo" => 80_000.0,
                "Reforma" => 45_000.0,
                _ => 120_000.0,
            };
            let amount = (base * (0.3 + rng.next_f64() * 1.4) * 100.0).round() / 100.0;
            let date = start + Duration::days((rng.next_u64() % 120) as i64);
            Request {
                broker: rng.pick(&brokers),
                unit: rng.pick(&units),
                purpose,
                status: rng.pick(&statuses),
                // Every 37th amount and every 53rd date are left unreadable.
                amount: (i % 37 != 36).then_some(amount),
                date: (i % 53 != 52).then_some(date),
            }
        })
        .collect())
}

fn write_csv(path: &str, columns: &Columns, requests: &[Request]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(columns.all_columns())?;
    for r in requests {
        let amount = r.amount.map(format_brl).unwrap_or_else(|| "a combinar".to_string());
        let date = r
            .date
            .map(|d| d.format(DATE_DISPLAY_FORMAT).to_string())
            .unwrap_or_else(|| "31/02/2024".to_string());
        writer.write_record([r.broker, r.unit, r.purpose, r.status, amount.as_str(), date.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, columns: &Columns, requests: &[Request]) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("invalid epoch")?;
    let text = |f: fn(&Request) -> &'static str| -> ArrayRef {
        Arc::new(StringArray::from(requests.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new(&columns.broker, DataType::Utf8, false),
        Field::new(&columns.unit, DataType::Utf8, false),
        Field::new(&columns.purpose, DataType::Utf8, false),
        Field::new(&columns.status, DataType::Utf8, false),
        Field::new(&columns.amount, DataType::Float64, true),
        Field::new(&columns.date, DataType::Date32, true),
    ]));

    let amounts = Float64Array::from(requests.iter().map(|r| r.amount).collect::<Vec<_>>());
    let dates = Date32Array::from(
        requests
            .iter()
            .map(|r| r.date.map(|d| (d - epoch).num_days() as i32))
            .collect::<Vec<_>>(),
    );

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(|r| r.broker),
            text(|r| r.unit),
            text(|r| r.purpose),
            text(|r| r.status),
            Arc::new(amounts),
            Arc::new(dates),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let columns = Columns::default();
    let requests = generate(&mut rng)?;

    write_csv("dados.csv", &columns, &requests)?;
    write_parquet("dados.parquet", &columns, &requests)?;

    println!("Wrote {} credit requests to dados.csv and dados.parquet", requests.len());
    Ok(())
}
