mod display;
mod output;
mod shell;

use anyhow::{Context, anyhow, bail};
pub use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use display::Display;
use log::{info, warn};
use navcfg::device::Device;
use navcfg::logger::{self, LogType, LoggerConfig};
use navcfg::mapping::{Outcome, update};
use navcfg::ports::{self, Baudrate, DEFAULT_BAUDRATE};
use navcfg::{DataId, ImageDevice, Link, LogReader, PortSelection, Replay, registry};
use shell::Shell;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Image file used when none is given.
pub const DEFAULT_IMAGE: &str = "device.img";

const EXAMPLES: &str = "\
Examples:
  navcfg flash-config
  navcfg flash-config \"ser0BaudRate=115200|insDynModel=automotive\"
  navcfg replay IS_logs --speed 2 --scroll
  navcfg replay IS_logs --lon --lt csv --lp converted
  navcfg ports -c '*2' --open";

#[derive(Parser)]
#[clap(about, author, version, arg_required_else_help = true, after_help = EXAMPLES)]
pub struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Output format
    #[clap(long, global = true, default_value = "text")]
    format: Format,

    /// Log more (-v debug, -vv trace)
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Default, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Format {
    /// Normal output
    #[default]
    Text,

    /// Table output
    Table,

    /// JSON output
    Json,
}

impl Format {
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Show or update the flash configuration
    FlashConfig(FlashConfigOptions),
    /// Replay recorded logs
    Replay(ReplayOptions),
    /// List serial ports
    Ports(PortsOptions),
    /// Describe record layouts
    Fields(FieldsOptions),
    /// Enter interactive shell
    Shell(ShellOptions),
}

#[derive(Args)]
pub struct ImageOptions {
    /// Device image file, created with defaults when missing
    #[clap(long, value_name = "PATH", default_value = DEFAULT_IMAGE)]
    image: PathBuf,
}

impl ImageOptions {
    pub fn open(&self) -> anyhow::Result<ImageDevice> {
        ImageDevice::open_or_create(&self.image)
            .with_context(|| format!("cannot open image {}", self.image.display()))
    }
}

#[derive(Args)]
pub struct FlashConfigOptions {
    #[clap(flatten)]
    image: ImageOptions,

    /// Time to let the device apply a change before reading it back
    #[clap(long, value_name = "MS", default_value_t = 1000)]
    settle_ms: u64,

    /// Changes as `key=value|key=value`; shows the configuration if omitted
    update: Option<String>,
}

#[derive(Args)]
#[clap(next_help_heading = "Display")]
pub struct DisplayOptions {
    /// Show nothing but the final statistics
    #[clap(short, long, conflicts_with_all = ["scroll", "stats"])]
    quiet: bool,

    /// Print one line per record instead of redrawing
    #[clap(short, long, conflicts_with = "stats")]
    scroll: bool,

    /// Show record counts and rates
    #[clap(long)]
    stats: bool,
}

impl DisplayOptions {
    pub fn mode(&self) -> display::Mode {
        match (self.quiet, self.scroll, self.stats) {
            (true, _, _) => display::Mode::Quiet,
            (_, true, _) => display::Mode::Scroll,
            (_, _, true) => display::Mode::Stats,
            _ => display::Mode::Pretty,
        }
    }
}

#[derive(Args)]
#[clap(next_help_heading = "Logging")]
pub struct LogOptions {
    /// Size limit of one log file
    #[clap(long = "lmf", value_name = "BYTES")]
    max_file_size: Option<u32>,

    /// Memory the logger may buffer
    #[clap(long = "lmm", value_name = "BYTES")]
    max_memory: Option<u32>,

    /// Share of free disk space logs may use, 0 for unlimited
    #[clap(long = "lms", value_name = "RATIO")]
    max_space_percent: Option<f32>,

    /// Time the logger may take to flush on close
    #[clap(long = "log-flush-timeout", value_name = "SECONDS")]
    flush_timeout: Option<u64>,

    /// Enable logging
    #[clap(long = "lon")]
    enabled: bool,

    /// Log directory
    #[clap(id = "log_path", long = "lp", value_name = "PATH")]
    path: Option<PathBuf>,

    /// Log type: dat, sdat, kml or csv
    #[clap(long = "lt", value_name = "TYPE")]
    log_type: Option<LogType>,

    /// Log sub-folder; 1 or true names it after the current time
    #[clap(long = "lts", value_name = "NAME")]
    sub_folder: Option<String>,

    /// Stream the post processing data preset
    #[clap(long = "msg-ppd")]
    stream_ppd: bool,
}

impl LogOptions {
    pub fn build_config(&self) -> LoggerConfig {
        let mut builder = LoggerConfig::builder();
        builder.enabled(self.enabled).stream_ppd(self.stream_ppd);
        if let Some(path) = &self.path {
            builder.path(path);
        }
        if let Some(log_type) = self.log_type {
            builder.log_type(log_type);
        }
        if let Some(percent) = self.max_space_percent {
            builder.max_space_percent(percent);
        }
        if let Some(bytes) = self.max_file_size {
            builder.max_file_size(bytes);
        }
        if let Some(bytes) = self.max_memory {
            builder.max_memory(bytes);
        }
        if let Some(sub) = &self.sub_folder {
            builder.sub_folder(logger::parse_sub_folder(sub));
        }
        if let Some(seconds) = self.flush_timeout {
            builder.flush_timeout(Duration::from_secs(seconds));
        }
        builder.build()
    }
}

#[derive(Args)]
pub struct ReplayOptions {
    /// Directory of recorded `.dat` files
    #[clap(value_name = "DIR", default_value = logger::DEFAULT_LOGS_DIRECTORY)]
    path: PathBuf,

    /// Records to show, by name; all if omitted
    #[clap(long, value_name = "RECORD", value_delimiter = ',')]
    msg: Vec<String>,

    /// Replay speed relative to real time, 0 for as fast as possible
    #[clap(long, default_value_t = 1.0)]
    speed: f64,

    #[clap(flatten)]
    display: DisplayOptions,

    #[clap(flatten)]
    log: LogOptions,
}

impl ReplayOptions {
    fn filter(&self) -> anyhow::Result<Option<BTreeSet<DataId>>> {
        if self.msg.is_empty() {
            return Ok(None);
        }
        self.msg
            .iter()
            .map(|name| {
                registry()
                    .find(name)
                    .map(|(id, _)| id)
                    .ok_or_else(|| anyhow!("unknown record `{}`", name))
            })
            .collect::<anyhow::Result<_>>()
            .map(Some)
    }
}

#[derive(Args)]
pub struct PortsOptions {
    /// Baudrate used with --open
    #[clap(long, default_value_t = DEFAULT_BAUDRATE)]
    baud: Baudrate,

    /// Ports: `*` for all, `*N` for the first N, or a port name
    #[clap(short, long, default_value = "*")]
    com: PortSelection,

    /// Try opening every selected port
    #[clap(long)]
    open: bool,
}

#[derive(Args)]
pub struct FieldsOptions {
    /// Record name; lists every record if omitted
    record: Option<String>,
}

#[derive(Args)]
pub struct ShellOptions {
    #[clap(flatten)]
    image: ImageOptions,

    /// Do not print the banner and prompt
    #[clap(long)]
    no_prompt: bool,
}

impl Cli {
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    fn show_flash_config(&self, device: &ImageDevice) -> anyhow::Result<()> {
        let table = registry()
            .get(DataId::FLASH_CONFIG)
            .ok_or(navcfg::Error::UnknownRecord(DataId::FLASH_CONFIG))?;
        let record = device.get_record(DataId::FLASH_CONFIG)?;
        let values = update::display(table, &record)?
            .into_iter()
            .map(output::Value::from)
            .collect::<Vec<_>>();
        output::emit(self.format, &values)
    }

    fn flash_config(&self, options: &FlashConfigOptions) -> anyhow::Result<()> {
        let mut device = options.image.open()?;
        let table = registry()
            .get(DataId::FLASH_CONFIG)
            .ok_or(navcfg::Error::UnknownRecord(DataId::FLASH_CONFIG))?;
        let record = device.get_record(DataId::FLASH_CONFIG)?;
        let input = options.update.as_deref().unwrap_or_default();
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
                if update.applied().is_empty() {
                    warn!("no changes applied");
                    return Ok(());
                }
                device.set_record(DataId::FLASH_CONFIG, update.record())?;
                std::thread::sleep(Duration::from_millis(options.settle_ms));
                if self.format.is_text() {
                    self.show_flash_config(&device)?;
                }
            }
        }
        Ok(())
    }

    fn replay(&self, options: &ReplayOptions) -> anyhow::Result<()> {
        let registry = registry();
        let filter = options.filter()?;
        let config = options.log.build_config();
        let reader = LogReader::load(&options.path)
            .with_context(|| format!("cannot replay {}", options.path.display()))?;
        let mut writer = match config.enabled() {
            true => {
                if reader.reads_from(config.directory()) {
                    bail!(
                        "refusing to log into {}: it holds the replayed files",
                        config.directory().display()
                    );
                }
                info!("logging {} to {}", config.log_type(), config.directory().display());
                Some(logger::open_writer(&config, registry)?)
            }
            false => None,
        };
        let mut replay = Replay::new(registry, options.speed);
        let mut display = Display::new(options.display.mode(), self.format);
        for frame in reader {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("skipping unreadable log file: {}", e);
                    continue;
                }
            };
            let Some(sample) = replay.feed(frame) else {
                continue;
            };
            if filter.as_ref().is_some_and(|ids| !ids.contains(&sample.id)) {
                continue;
            }
            let Some(table) = registry.get(sample.id) else {
                continue;
            };
            replay.pace(&sample);
            if let Some(writer) = writer.as_mut() {
                writer.write(sample.id, &sample.record)?;
            }
            display.show(table, &sample)?;
        }
        if let Some(mut writer) = writer {
            writer.finish()?;
        }
        display.finish()
    }

    fn ports(&self, options: &PortsOptions) -> anyhow::Result<()> {
        if !ports::is_supported_baudrate(options.baud) {
            warn!("baudrate {} is not supported by devices", options.baud);
        }
        let available = ports::available_ports()?;
        let names = available
            .iter()
            .map(|info| info.port_name.clone())
            .collect::<Vec<_>>();
        let mut builder = Link::builder();
        builder.baudrate(options.baud);
        let link = builder.build();
        let mut rows = Vec::new();
        for name in options.com.select(&names) {
            let info = available.iter().find(|info| info.port_name == name);
            let mut row = output::Port::new(name.clone(), info);
            if options.open {
                match link.open(name.as_str()) {
                    Ok(_) => row.set_status("ok"),
                    Err(e) => row.set_status(e.to_string()),
                }
            }
            rows.push(row);
        }
        if rows.is_empty() && self.format.is_text() {
            eprintln!("No serial ports found");
        }
        output::emit(self.format, &rows)
    }

    fn fields(&self, options: &FieldsOptions) -> anyhow::Result<()> {
        match &options.record {
            None => {
                let rows = registry()
                    .iter()
                    .map(|(id, table)| output::Record::new(id, table))
                    .collect::<Vec<_>>();
                output::emit(self.format, &rows)
            }
            Some(name) => {
                let (_, table) = registry()
                    .find(name)
                    .ok_or_else(|| anyhow!("unknown record `{}`", name))?;
                let rows = table
                    .fields()
                    .iter()
                    .map(output::Schema::from)
                    .collect::<Vec<_>>();
                output::emit(self.format, &rows)
            }
        }
    }

    fn shell(&self, options: &ShellOptions) -> anyhow::Result<()> {
        let device = options.image.open()?;
        let mut shell = Shell::new(device, self.format, options.no_prompt);
        shell.run()
    }

    pub fn execute(&self) -> anyhow::Result<()> {
        match &self.command {
            Command::FlashConfig(options) => self.flash_config(options),
            Command::Replay(options) => self.replay(options),
            Command::Ports(options) => self.ports(options),
            Command::Fields(options) => self.fields(options),
            Command::Shell(options) => self.shell(options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::collections::BTreeMap;

    fn assert_sorted(command: &clap::Command) {
        let mut sections = BTreeMap::<Option<String>, Vec<String>>::new();
        for arg in command.get_arguments() {
            if let Some(long) = arg.get_long() {
                sections
                    .entry(arg.get_help_heading().map(str::to_string))
                    .or_default()
                    .push(long.to_string());
            }
        }
        for (heading, longs) in sections {
            let mut sorted = longs.clone();
            sorted.sort();
            assert_eq!(
                longs,
                sorted,
                "options of `{}` under {:?} are out of order",
                command.get_name(),
                heading
            );
        }
        for sub in command.get_subcommands() {
            assert_sorted(sub);
        }
    }

    #[test]
    fn options_are_alphabetic() {
        Cli::command().debug_assert();
        assert_sorted(&Cli::command());
    }

    #[test]
    fn log_options() {
        let cli = Cli::try_parse_from([
            "navcfg", "replay", "logs", "--lon", "--lt", "csv", "--lp", "out", "--lts", "run1",
            "--lmf", "1024",
        ])
        .unwrap();
        let Command::Replay(options) = &cli.command else {
            panic!("expected replay");
        };
        let config = options.log.build_config();
        assert!(config.enabled());
        assert_eq!(config.log_type(), LogType::Csv);
        assert_eq!(config.directory(), PathBuf::from("out").join("run1"));
        assert_eq!(config.max_file_size(), 1024);
        assert_eq!(config.max_memory(), LoggerConfig::default().max_memory());
        assert_eq!(options.path, PathBuf::from("logs"));
    }

    #[test]
    fn rejects_unknown_log_type() {
        assert!(Cli::try_parse_from(["navcfg", "replay", "--lt", "xml"]).is_err());
    }

    #[test]
    fn replay_defaults() {
        let cli = Cli::try_parse_from(["navcfg", "replay", "--msg", "ins1,barometer", "-s"]).unwrap();
        let Command::Replay(options) = &cli.command else {
            panic!("expected replay");
        };
        assert_eq!(options.path, PathBuf::from(logger::DEFAULT_LOGS_DIRECTORY));
        assert_eq!(options.speed, 1.0);
        assert_eq!(options.display.mode(), display::Mode::Scroll);
        let filter = options.filter().unwrap().unwrap();
        assert!(filter.contains(&DataId::INS_1));
        assert!(filter.contains(&DataId::BAROMETER));
        assert!(!options.log.build_config().enabled());
    }

    #[test]
    fn display_modes_conflict() {
        assert!(Cli::try_parse_from(["navcfg", "replay", "-q", "--stats"]).is_err());
    }

    #[test]
    fn flash_config_update() {
        let cli = Cli::try_parse_from([
            "navcfg",
            "--format",
            "json",
            "flash-config",
            "--settle-ms",
            "0",
            "ser0BaudRate=115200",
        ])
        .unwrap();
        assert_eq!(cli.format, Format::Json);
        let Command::FlashConfig(options) = &cli.command else {
            panic!("expected flash-config");
        };
        assert_eq!(options.update.as_deref(), Some("ser0BaudRate=115200"));
        assert_eq!(options.settle_ms, 0);
        assert_eq!(options.image.image, PathBuf::from(DEFAULT_IMAGE));
    }

    #[test]
    fn port_selection() {
        let cli = Cli::try_parse_from(["navcfg", "ports", "-c", "*2"]).unwrap();
        let Command::Ports(options) = &cli.command else {
            panic!("expected ports");
        };
        assert_eq!(options.com, PortSelection::First(2));
        assert_eq!(options.baud, DEFAULT_BAUDRATE);
    }
}
