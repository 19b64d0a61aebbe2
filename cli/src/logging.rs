use log::{LevelFilter, Metadata, Record};

const LOG_ENV: &str = "EXCEL_ROWDIFF_LOG";

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the stderr logger. `-v` flags raise the level above whatever
/// `EXCEL_ROWDIFF_LOG` asks for.
pub fn init(verbose: u8) {
    static LOGGER: SimpleLogger = SimpleLogger;
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level_for(std::env::var(LOG_ENV).ok().as_deref(), verbose));
}

fn level_for(env_value: Option<&str>, verbose: u8) -> LevelFilter {
    let from_env = match env_value {
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("info") => LevelFilter::Info,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        Some("off") => LevelFilter::Off,
        _ => LevelFilter::Warn,
    };
    let from_flags = match verbose {
        0 => LevelFilter::Off,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    from_env.max(from_flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_level_defaults_to_warn() {
        assert_eq!(level_for(None, 0), LevelFilter::Warn);
        assert_eq!(level_for(Some("bogus"), 0), LevelFilter::Warn);
        assert_eq!(level_for(Some("off"), 0), LevelFilter::Off);
    }

    #[test]
    fn verbose_flags_raise_the_level() {
        assert_eq!(level_for(None, 1), LevelFilter::Info);
        assert_eq!(level_for(Some("error"), 2), LevelFilter::Debug);
        assert_eq!(level_for(Some("trace"), 1), LevelFilter::Trace);
    }
}
