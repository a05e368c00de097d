// Logs go to stderr so that stdout only carries trajectory records.
pub fn setup_logging() {
  env_logger::Builder::new()
    .filter_level(log::LevelFilter::Info)
    .parse_default_env()
    .target(env_logger::Target::Stderr)
    .format(format_log)
    .init();
}

pub fn format_log(
  buf: &mut env_logger::fmt::Formatter,
  record: &log::Record,
) -> std::io::Result<()> {
  use std::io::Write;
  let mut style = buf.style();
  use env_logger::fmt::Color::*;
  use log::Level::*;
  style.set_color(match record.level() {
    Error => Red,
    Warn => Yellow,
    Info => Green,
    Debug => Magenta,
    Trace => Blue,
  });

  let location = format!("{}:{}",
    record.file().unwrap_or("?"),
    record.line().unwrap_or(0),
  );
  let s = format!("{:5} {:28}{}", record.level(), location, record.args());
  writeln!(buf, "{}", style.value(s))
}
