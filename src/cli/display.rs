use super::Format;
use super::output::{self, Stats};
use navcfg::mapping::{Entry, update};
use navcfg::{DataId, RecordTable, Sample};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// How replayed records are shown
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Nothing but the final statistics
    Quiet,
    /// Latest copy of every record, redrawn in place
    #[default]
    Pretty,
    /// One line per record
    Scroll,
    /// Record counts and rates, redrawn in place
    Stats,
}

const REFRESH: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct Counter {
    name: &'static str,
    count: u64,
    first: Option<f64>,
    last: Option<f64>,
}

impl Counter {
    /// Rate in record time, zero when the records carry no time.
    fn rate(&self) -> f64 {
        match (self.first, self.last) {
            (Some(first), Some(last)) if last > first => (self.count - 1) as f64 / (last - first),
            _ => 0.0,
        }
    }
}

/// Replay display
pub struct Display {
    mode: Mode,
    format: Format,
    drawn: Option<Instant>,
    latest: BTreeMap<DataId, (&'static str, Vec<Entry>)>,
    counters: BTreeMap<DataId, Counter>,
}

impl Display {
    pub fn new(mode: Mode, format: Format) -> Self {
        Self {
            mode,
            format,
            drawn: None,
            latest: BTreeMap::new(),
            counters: BTreeMap::new(),
        }
    }

    fn count(&mut self, table: &RecordTable, sample: &Sample) {
        let counter = self.counters.entry(sample.id).or_default();
        counter.name = table.name();
        counter.count += 1;
        if let Some(time) = sample.time {
            counter.first.get_or_insert(time);
            counter.last = Some(time);
        }
    }

    fn due(&mut self) -> bool {
        let now = Instant::now();
        match self.drawn {
            Some(drawn) if now.duration_since(drawn) < REFRESH => false,
            _ => {
                self.drawn = Some(now);
                true
            }
        }
    }

    /// Shows one replayed record.
    pub fn show(&mut self, table: &RecordTable, sample: &Sample) -> anyhow::Result<()> {
        self.count(table, sample);
        match self.mode {
            Mode::Quiet => {}
            Mode::Scroll => self.scroll(table, sample)?,
            Mode::Pretty => {
                let entries = update::display(table, &sample.record)?;
                self.latest.insert(sample.id, (table.name(), entries));
                if self.due() {
                    self.pretty()?;
                }
            }
            Mode::Stats => {
                if self.due() {
                    clearscreen::clear()?;
                    output::emit(Format::Table, &self.stats())?;
                }
            }
        }
        Ok(())
    }

    fn scroll(&self, table: &RecordTable, sample: &Sample) -> anyhow::Result<()> {
        let entries = update::display(table, &sample.record)?;
        match self.format {
            Format::Json => {
                let values = entries
                    .into_iter()
                    .map(|entry| (entry.name, entry.value))
                    .collect::<BTreeMap<_, _>>();
                let line = serde_json::json!({ "record": table.name(), "values": values });
                println!("{}", line);
            }
            _ => {
                let values = entries
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("{}: {}", table.name(), values);
            }
        }
        Ok(())
    }

    fn pretty(&self) -> anyhow::Result<()> {
        clearscreen::clear()?;
        for (id, (name, entries)) in &self.latest {
            println!("{} ({})", name, id.as_u32());
            for entry in entries {
                println!("    {}", entry);
            }
        }
        Ok(())
    }

    fn stats(&self) -> Vec<Stats> {
        self.counters
            .iter()
            .map(|(id, counter)| Stats::new(counter.name, *id, counter.count, counter.rate()))
            .collect()
    }

    /// Draws the final state and the statistics.
    pub fn finish(&mut self) -> anyhow::Result<()> {
        if self.mode == Mode::Pretty && !self.latest.is_empty() {
            self.pretty()?;
        }
        if self.mode == Mode::Stats {
            clearscreen::clear()?;
        }
        output::emit(self.format, &self.stats())
    }
}
