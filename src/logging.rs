// Log output setup and device-tagged log lines
use std::io::Write;

/// Install the `env_logger` backend.
///
/// `RUST_LOG` wins when set; otherwise `info`, raised to `debug` for this
/// crate when `debug` is true.
pub fn init(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug && std::env::var_os("RUST_LOG").is_none() {
        builder.filter_module(env!("CARGO_CRATE_NAME"), log::LevelFilter::Debug);
    }
    builder.format(|buf, record| {
        let style = buf.default_level_style(record.level());
        writeln!(
            buf,
            "{} {style}[{}]{style:#} {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });
    // A second init (tests, embedding) keeps the first logger
    let _ = builder.try_init();
}

/// Log a line tagged with the device it concerns: `[<device id>] message`
macro_rules! device_log {
    ($level:ident, $device:expr, $($arg:tt)+) => {
        log::$level!("[{}] {}", $device, format_args!($($arg)+))
    };
}

pub(crate) use device_log;
