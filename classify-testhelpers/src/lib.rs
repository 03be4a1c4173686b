//! Test helpers: a colored stderr logger so `trace!` output from the
//! walkers and drivers shows up in failing tests.

use std::io::Write;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::{OwoColorize, Style};

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let level_style = match record.level() {
            Level::Error => Style::new().red(),
            Level::Warn => Style::new().yellow(),
            Level::Info => Style::new().green(),
            Level::Debug => Style::new().blue(),
            Level::Trace => Style::new().cyan(),
        };
        eprintln!(
            "{} - {}: {}",
            record.level().style(level_style),
            record.target().style(Style::new().blue()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: SimpleLogger = SimpleLogger;
static INIT: Once = Once::new();

/// Install the test logger. Safe to call from every test.
pub fn setup() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });
}
