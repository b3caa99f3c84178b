use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::LevelFilter;
use log::Level;
use env_logger::{Builder, Env, fmt::Color};
use std::io::Write;
use once_cell::sync::OnceCell;

static INSTANCE: OnceCell<Logger> = OnceCell::new();

/// Environment variable used to override the verbosity of specific modules, e.g. `POPGEN_LOG=popstats=trace`
pub const LOG_ENV_VAR: &str = "POPGEN_LOG";

const PROGRESS_TEMPLATE: &str = "{msg} [{elapsed_precise}] {wide_bar} {pos:>7}/{len:7} ({eta})";

#[derive(Debug)]
pub struct Logger {
    multi_pg: MultiProgress,
}

impl Logger {

    /// Initialize the global logger. Subsequent calls are no-ops, apart from updating the max level.
    pub fn init(verbosity: u8) {
        let log_level = Self::u8_to_loglevel(verbosity);
        if INSTANCE.get().is_some() {
            log::set_max_level(log_level);
            return
        }

        let env = Env::default().filter(LOG_ENV_VAR);

        let logger = Builder::new().filter_level(log_level)
            .format(|buf, record| {
                let (traceback, set_intensity) = match record.level() {
                    Level::Error => (format!("(@ {}:{}) ", record.file().unwrap_or("unknown"), record.line().unwrap_or(0)), true),
                    _            => (String::new(), false),
                };

                let mut arg_style = buf.style();
                arg_style.set_intense(set_intensity);

                let mut level_style = buf.style();
                let color = match record.level() {
                    Level::Error => Color::Red,
                    Level::Warn  => Color::Yellow,
                    Level::Info  => Color::Green,
                    Level::Debug => Color::Blue,
                    Level::Trace => Color::Cyan
                };
                level_style.set_color(color).set_bold(true);

                writeln!(
                    buf,
                    "[{} {: <5} {}] {traceback}{}",
                    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                    level_style.value(record.level()),
                    record.target(),
                    arg_style.value(record.args())
                )
            })
            .parse_env(env)
            .build();

        // Progress bar support.
        let multi_pg = MultiProgress::new();
        if LogWrapper::new(multi_pg.clone(), logger).try_init().is_err() {
            // Another logger was already installed (e.g. by a test harness): keep it.
            log::set_max_level(log_level);
        }
        let _ = INSTANCE.set(Self{multi_pg});
    }

    fn u8_to_loglevel(verbosity: u8) -> LevelFilter {
        match verbosity {
            0            => LevelFilter::Error,
            1            => LevelFilter::Warn,
            2            => LevelFilter::Info,
            3            => LevelFilter::Debug,
            4..= u8::MAX => LevelFilter::Trace
        }
    }

    pub fn set_level(verbosity: u8) {
        log::set_max_level(Self::u8_to_loglevel(verbosity));
    }

    /// Access the shared `MultiProgress`, if the logger was initialized.
    pub fn multi() -> Option<&'static MultiProgress> {
        INSTANCE.get().map(|logger| &logger.multi_pg)
    }

    /// Create a progress bar of `len` steps, bound to the logger's `MultiProgress`.
    ///
    /// Returns a hidden progress bar when the logger was never initialized (library use, tests),
    /// or when the current verbosity hides `Info` records.
    pub fn progress_bar(len: u64, message: &str) -> ProgressBar {
        let visible = log::max_level() >= LevelFilter::Info;
        match (Self::multi(), visible) {
            (Some(multi), true) => {
                let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                let bar = multi.add(ProgressBar::new(len));
                bar.set_style(style);
                bar.set_message(message.to_string());
                bar
            },
            _ => ProgressBar::hidden(),
        }
    }
}
