use super::{Format, output};
use anyhow::anyhow;
use navcfg::device::Device;
use navcfg::mapping::{Outcome, update};
use navcfg::{DataId, ImageDevice, RecordTable, registry};
use std::borrow::Cow;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use clap::Parser;

pub struct Shell {
    device: ImageDevice,
    current: DataId,
    format: Format,
    no_prompt: bool,
}

#[derive(Parser, Debug, Clone)]
#[clap(
    no_binary_name = true,
    help_template = "{all-args}",
    disable_help_flag = true
)]
enum Command {
    /// Clear messages
    Clear,
    /// List known records
    Records,
    /// Select the record to work on
    Use {
        /// Record name
        record: String,
    },
    /// Describe the fields of the current record
    Fields,
    /// Show the current record
    Show,
    /// Update the current record with `key=value|key=value`
    Set {
        #[clap(required = true, num_args = 1..)]
        update: Vec<String>,
    },
    /// Leave the shell
    Exit,
}

impl Shell {
    pub fn new(device: ImageDevice, format: Format, no_prompt: bool) -> Self {
        Self {
            device,
            current: DataId::FLASH_CONFIG,
            format,
            no_prompt,
        }
    }

    fn prompt(&self) -> Cow<'_, str> {
        if self.no_prompt {
            "".into()
        } else {
            format!("navcfg ({})> ", self.current).into()
        }
    }

    fn table(&self) -> anyhow::Result<&'static RecordTable> {
        registry()
            .get(self.current)
            .ok_or(anyhow!("no layout for record {}", self.current))
    }

    /// Gets the current record, zeroed if the image does not hold it yet.
    fn record(&self, table: &RecordTable) -> anyhow::Result<Vec<u8>> {
        match self.device.get_record(self.current) {
            Ok(record) => Ok(record),
            Err(e) if e.is_missing_record() => Ok(vec![0u8; table.size()]),
            Err(e) => Err(e.into()),
        }
    }

    fn apply(&mut self, input: &str) -> anyhow::Result<()> {
        let table = self.table()?;
        let record = self.record(table)?;
        match update::run(table, &record, input)? {
            Outcome::Display(entries) => {
                let values = entries
                    .into_iter()
                    .map(output::Value::from)
                    .collect::<Vec<_>>();
                output::emit(self.format, &values)?;
            }
            Outcome::Update(update) => {
                output::emit_changes(self.format, &update)?;
                if !update.applied().is_empty() {
                    self.device.set_record(self.current, update.record())?;
                }
            }
        }
        Ok(())
    }

    /// Returns `false` once the shell should stop.
    fn execute(&mut self, command: &Command) -> anyhow::Result<bool> {
        match command {
            Command::Clear => {
                clearscreen::clear()?;
            }
            Command::Records => {
                let rows = registry()
                    .iter()
                    .map(|(id, table)| output::Record::new(id, table))
                    .collect::<Vec<_>>();
                output::emit(self.format, &rows)?;
            }
            Command::Use { record } => {
                let (id, _) = registry()
                    .find(record)
                    .ok_or(anyhow!("unknown record `{}`", record))?;
                self.current = id;
            }
            Command::Fields => {
                let rows = self
                    .table()?
                    .fields()
                    .iter()
                    .map(output::Schema::from)
                    .collect::<Vec<_>>();
                output::emit(self.format, &rows)?;
            }
            Command::Show => self.apply("")?,
            Command::Set { update } => self.apply(&update.join(" "))?,
            Command::Exit => return Ok(false),
        }
        Ok(true)
    }

    fn dispatch(&mut self, line: &str) -> anyhow::Result<bool> {
        use clap::error::ContextKind;
        let segments = line.split_ascii_whitespace().collect::<Vec<_>>();
        if segments.is_empty() {
            return Ok(true);
        }
        let command = Command::try_parse_from(segments).map_err(|mut e| {
            e.remove(ContextKind::Usage);
            e
        })?;
        let command = match command {
            // Values may hold runs of spaces the word split would lose.
            Command::Set { .. } => Command::Set {
                update: vec![set_input(line).to_string()],
            },
            command => command,
        };
        self.execute(&command)
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut editor = DefaultEditor::new()?;
        if !self.no_prompt {
            println!(
                "navcfg ({}) on {}\n\
                 Type \"help\" for more information.",
                env!("CARGO_PKG_VERSION"),
                self.device.name(),
            );
        }
        loop {
            let line = editor.readline(self.prompt().as_ref());
            match line {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    match self.dispatch(line.as_ref()) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => eprintln!("{}", e),
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("{:?}", e);
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Gets the text after the `set` command word, as typed.
fn set_input(line: &str) -> &str {
    let rest = line.trim_start();
    let rest = rest.strip_prefix("set").unwrap_or(rest);
    rest.strip_prefix(|c: char| c.is_ascii_whitespace())
        .unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> Shell {
        Shell::new(ImageDevice::new(), Format::Json, true)
    }

    #[test]
    fn set_updates_current_record() {
        let mut shell = shell();
        assert!(shell.dispatch("set ser1BaudRate=230400|nope=1").unwrap());
        let record = shell.device.get_record(DataId::FLASH_CONFIG).unwrap();
        let config = navcfg::FlashConfig::from_bytes(&record).unwrap();
        assert_eq!(config.ser1_baud_rate, 230_400);
    }

    #[test]
    fn use_selects_records() {
        let mut shell = shell();
        shell.dispatch("use Barometer").unwrap();
        assert_eq!(shell.current, DataId::BAROMETER);
        assert!(shell.dispatch("use nothing").is_err());

        shell.dispatch("set bar=1013.25").unwrap();
        let record = shell.device.get_record(DataId::BAROMETER).unwrap();
        assert_eq!(record.len(), 24);
        assert_eq!(&record[8..12], &1013.25f32.to_le_bytes());
    }

    #[test]
    fn set_keeps_spaces_in_values() {
        let mut shell = shell();
        shell.dispatch("use devInfo").unwrap();
        shell.dispatch("set manufacturer=Acme  Inertial ").unwrap();
        let record = shell.device.get_record(DataId::DEV_INFO).unwrap();
        assert_eq!(&record[28..45], b"Acme  Inertial \0\0");
        assert_eq!(set_input("  set a=1 |  b=x  y"), "a=1 |  b=x  y");
    }

    #[test]
    fn exit_and_errors() {
        let mut shell = shell();
        assert!(shell.dispatch("   ").unwrap());
        assert!(!shell.dispatch("exit").unwrap());
        assert!(shell.dispatch("frobnicate").is_err());
    }
}
