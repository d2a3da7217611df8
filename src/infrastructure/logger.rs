// Logger setup built on env_logger
//
// Library code only talks to the `log` facade. Binaries, benches and tests
// call `setup_logger` once to get compact, aligned output.

use std::fmt;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

use env_logger::fmt::{Color, Style, StyledValue};
use log::Level;

use crate::types::BufferPoolConfig;

const PKG_NAME: &str = env!("CARGO_PKG_NAME");

static MAX_TARGET_WIDTH: AtomicUsize = AtomicUsize::new(0);

static SETUP_LOGS: Once = Once::new();

/// Installs the global logger. `RUST_LOG` overrides the default `info` level.
/// Only the first call has an effect.
pub fn setup_logger() {
    SETUP_LOGS.call_once(|| {
        let _ = build_logger(None).is_test(cfg!(test)).try_init();
    });
}

/// Installs the global logger with the level from `config`, or a logger that
/// drops everything when `config.enable_log` is false. `RUST_LOG` still wins.
pub fn setup_logger_with(config: &BufferPoolConfig) {
    SETUP_LOGS.call_once(|| {
        let level = if config.enable_log {
            config.log_level.to_filter()
        } else {
            log::LevelFilter::Off
        };
        let _ = build_logger(Some(level)).is_test(cfg!(test)).try_init();
    });
}

fn build_logger(level: Option<log::LevelFilter>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();

    builder.format(move |f, record| {
        use std::io::Write;
        let target = short_target(record.target());
        let width = max_target_width(target);

        let mut style = f.style();
        let level = colored_level(&mut style, record.level());

        let mut style = f.style();
        let target = style.set_bold(true).value(Padded {
            value: target,
            width,
        });

        let time = f.timestamp_micros().to_string();
        // skip the date
        let time = time.get(11..).unwrap_or(&time);
        writeln!(f, "{time} {level} {target} > {}", record.args())
    });

    builder.filter_level(level.unwrap_or(log::LevelFilter::Info));
    builder.parse_env("RUST_LOG");

    builder
}

/// Strips the crate prefix from a module path target
fn short_target(target: &str) -> &str {
    match target.strip_prefix(PKG_NAME) {
        Some("") => "pool",
        Some(rest) => rest.trim_start_matches("::"),
        None => target,
    }
}

struct Padded<T> {
    value: T,
    width: usize,
}

impl<T: fmt::Display> fmt::Display for Padded<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{: <width$}", self.value, width = self.width)
    }
}

fn max_target_width(target: &str) -> usize {
    let previous = MAX_TARGET_WIDTH.fetch_max(target.len(), Ordering::Relaxed);
    previous.max(target.len())
}

fn colored_level<'a>(style: &'a mut Style, level: Level) -> StyledValue<'a, &'static str> {
    match level {
        Level::Trace => style.set_color(Color::Magenta).value("TRACE"),
        Level::Debug => style.set_color(Color::Blue).value("DEBUG"),
        Level::Info => style.set_color(Color::Green).value("INFO "),
        Level::Warn => style.set_color(Color::Yellow).value("WARN "),
        Level::Error => style.set_color(Color::Red).value("ERROR"),
    }
}
