use super::Format;
use navcfg::mapping::{Entry, Field, Update};
use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use std::fmt::{Display, Formatter, Result};
use tabled::derive::display;
use tabled::{Table, Tabled};

/// Prints rows in the requested format.
pub fn emit<T: Serialize + Tabled + Display>(format: Format, rows: &[T]) -> anyhow::Result<()> {
    match format {
        Format::Text => {
            for row in rows {
                print!("{}", row);
            }
        }
        Format::Table => println!("{}", Table::new(rows)),
        Format::Json => println!("{}", serde_json::to_string_pretty(rows)?),
    }
    Ok(())
}

#[derive(Serialize, Tabled, Debug)]
pub struct Value {
    name: &'static str,
    value: String,
}

impl From<Entry> for Value {
    fn from(entry: Entry) -> Self {
        Self {
            name: entry.name,
            value: entry.value,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "{} = {}", self.name, self.value)
    }
}

#[derive(Serialize, Tabled, Debug)]
pub struct Change {
    key: String,
    value: String,
    #[tabled(display("display::option", ""))]
    error: Option<String>,
}

impl Change {
    /// Lists applied pairs first, then rejected ones.
    pub fn from_update(update: &Update) -> Vec<Self> {
        let applied = update.applied().iter().map(|pair| Self {
            key: pair.key.clone(),
            value: pair.value.clone(),
            error: None,
        });
        let rejected = update.diagnostics().iter().map(|e| Self {
            key: e.key().unwrap_or_default().to_string(),
            value: String::new(),
            error: Some(e.to_string()),
        });
        applied.chain(rejected).collect()
    }
}

impl Change {
    /// Gets the line reported for a rejected pair.
    pub fn rejection(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        Some(match self.key.is_empty() {
            true => format!("rejected: {}", error),
            false => format!("rejected `{}`: {}", self.key, error),
        })
    }
}

impl Display for Change {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.error {
            None => writeln!(f, "{} set to {}", self.key, self.value),
            // Reported on stderr by `emit_changes`.
            Some(_) => Ok(()),
        }
    }
}

/// Prints the outcome of an update.
///
/// In text format rejected pairs go to stderr, one line each.
pub fn emit_changes(format: Format, update: &Update) -> anyhow::Result<()> {
    let changes = Change::from_update(update);
    emit(format, &changes)?;
    if format.is_text() {
        for line in changes.iter().filter_map(Change::rejection) {
            eprintln!("{}", line);
        }
    }
    Ok(())
}

#[derive(Serialize, Tabled, Debug)]
pub struct Schema {
    name: &'static str,
    offset: usize,
    size: usize,
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    kind: String,
    count: usize,
}

impl From<&Field> for Schema {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name(),
            offset: field.offset(),
            size: field.size(),
            kind: field.element_type().to_string(),
            count: field.count(),
        }
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.count {
            1 => write!(f, "{}: {}", self.name, self.kind)?,
            n => write!(f, "{}: {}[{}]", self.name, self.kind, n)?,
        }
        writeln!(f, " @ {} ({} bytes)", self.offset, self.size)
    }
}

#[derive(Serialize, Tabled, Debug)]
pub struct Record {
    id: u32,
    name: &'static str,
    size: usize,
    fields: usize,
}

impl Record {
    pub fn new(id: navcfg::DataId, table: &navcfg::RecordTable) -> Self {
        Self {
            id: id.as_u32(),
            name: table.name(),
            size: table.size(),
            fields: table.len(),
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(
            f,
            "{:>4}  {:<14}{:>4} bytes  {} fields",
            self.id, self.name, self.size, self.fields
        )
    }
}

#[derive(Serialize, Tabled, Debug)]
pub struct Port {
    name: String,
    kind: String,
    #[tabled(display("display::option", "N/A"))]
    product: Option<String>,
    #[tabled(display("display::option", ""))]
    status: Option<String>,
}

impl Port {
    pub fn new(name: String, info: Option<&SerialPortInfo>) -> Self {
        let (kind, product) = match info.map(|info| &info.port_type) {
            Some(SerialPortType::UsbPort(usb)) => (
                format!("usb {:04x}:{:04x}", usb.vid, usb.pid),
                usb.product.clone(),
            ),
            Some(SerialPortType::PciPort) => ("pci".to_string(), None),
            Some(SerialPortType::BluetoothPort) => ("bluetooth".to_string(), None),
            Some(SerialPortType::Unknown) => ("unknown".to_string(), None),
            None => ("unlisted".to_string(), None),
        };
        Self {
            name,
            kind,
            product,
            status: None,
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }
}

impl Display for Port {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}\t{}", self.name, self.kind)?;
        if let Some(product) = &self.product {
            write!(f, "\t{}", product)?;
        }
        if let Some(status) = &self.status {
            write!(f, "\t{}", status)?;
        }
        writeln!(f)
    }
}

#[derive(Serialize, Tabled, Debug, Clone)]
pub struct Stats {
    record: &'static str,
    id: u32,
    count: u64,
    #[tabled(display("rate"))]
    rate: f64,
}

fn rate(rate: &f64) -> String {
    format!("{:.1} Hz", rate)
}

impl Stats {
    pub fn new(record: &'static str, id: navcfg::DataId, count: u64, rate: f64) -> Self {
        Self {
            record,
            id: id.as_u32(),
            count,
            rate,
        }
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(
            f,
            "{:<14}({:>3}) {:>8} records {:>8.1} Hz",
            self.record, self.id, self.count, self.rate
        )
    }
}
