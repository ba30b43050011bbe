use std::io::Write;

use env_logger::fmt::Formatter;

/// 彩色日志格式：`[时间] LEVEL [file:line] message`
fn format_record(buf: &mut Formatter, record: &log::Record) -> std::io::Result<()> {
    let info_style = buf
        .default_level_style(log::Level::Info)
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green)));
    let warn_style = buf
        .default_level_style(log::Level::Warn)
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow)));
    let error_style = buf
        .default_level_style(log::Level::Error)
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red)));

    let level_style = match record.level() {
        log::Level::Info => info_style,
        log::Level::Warn => warn_style,
        log::Level::Error => error_style,
        _ => buf.default_level_style(record.level()),
    };
    let grey_style = info_style.fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(110, 110, 110))));

    let line = record.line().unwrap_or(!0);
    let file = record.file().unwrap_or("").rsplit(['\\', '/']).next().unwrap_or("");
    let time = chrono::Local::now().format("%H:%M:%S%.3f");
    let level = record.level();

    writeln!(
        buf,
        "{level_style}[{time}] {level}{level_style:#} {grey_style}[{file}:{line}]{grey_style:#} {}",
        record.args()
    )
}

/// 初始化全局 logger，默认级别 Info，可通过 `RUST_LOG` 覆盖
///
/// 只能调用一次，重复调用会 panic
pub fn init_log() {
    env_logger::Builder::new()
        .format(format_record)
        .filter(None, log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// 测试用的 logger 初始化
///
/// 每个测试都可以调用；输出交给 test harness 捕获，默认 Debug 级别。
pub fn init_test_log() {
    let _ = env_logger::Builder::new()
        .format(format_record)
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .is_test(true)
        .try_init();
}
