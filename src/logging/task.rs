//! 日志维护任务: 零点翻滚, 历史文件 gzip 压缩, 超期删除.

use super::{LoggingConfig, build_current_log_path};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, TimeZone, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, error};

pub(super) fn spawn_log_maintenance_task(
    handle: &tokio::runtime::Handle,
    config: LoggingConfig,
    rotate_requested: Arc<AtomicBool>,
) {
    handle.spawn(async move {
        let period = Duration::from_secs(config.cleanup_interval_seconds.max(1));
        let mut cleanup_interval = tokio::time::interval(period);

        if let Err(err) = touch_current_log(&config, Local::now().date_naive()) {
            error!("初始化当前日志文件失败: {:#}", err);
        }

        let mut next_rollover_at = next_rollover_instant(Local::now());
        loop {
            tokio::select! {
                _ = cleanup_interval.tick() => {
                    if let Err(err) = cleanup_logs(&config, Local::now().date_naive()) {
                        error!("清理日志失败: {:#}", err);
                    }
                }
                _ = tokio::time::sleep_until(next_rollover_at) => {
                    let today = Local::now().date_naive();
                    match touch_current_log(&config, today) {
                        Ok(_) => rotate_requested.store(true, Ordering::Release),
                        Err(err) => error!("日志翻滚失败: {:#}", err),
                    }
                    if let Err(err) = cleanup_logs(&config, today) {
                        error!("翻滚后清理日志失败: {:#}", err);
                    }
                    next_rollover_at = next_rollover_instant(Local::now());
                }
            }
        }
    });
}

/// 确保 `date` 对应的日志文件存在
fn touch_current_log(config: &LoggingConfig, date: NaiveDate) -> Result<PathBuf> {
    let directory = Path::new(&config.directory);
    fs::create_dir_all(directory)?;
    let current_path = build_current_log_path(directory, &config.file_prefix, date);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&current_path)
        .with_context(|| format!("创建当前日志文件失败, path={}", current_path.display()))?;
    Ok(current_path)
}

/// 删除早于保留期的文件, 压缩今天以前未压缩的文件
fn cleanup_logs(config: &LoggingConfig, today: NaiveDate) -> Result<()> {
    let directory = Path::new(&config.directory);
    if !directory.exists() {
        return Ok(());
    }

    let cutoff = today - ChronoDuration::days(config.retention_days);
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some((date, compressed)) = parse_log_name(&file_name, &config.file_prefix) else {
            continue;
        };

        let file_path = entry.path();
        if date < cutoff {
            debug!("删除过期日志 {}", file_path.display());
            if let Err(err) = fs::remove_file(&file_path) {
                error!("删除过期日志失败, path={}: {}", file_path.display(), err);
            }
        } else if config.compress_history && !compressed && date < today {
            if let Err(err) = compress_to_gz(&file_path) {
                error!("压缩日志失败: {:#}", err);
            }
        }
    }
    Ok(())
}

fn compress_to_gz(path: &Path) -> Result<PathBuf> {
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    if gz_path.exists() {
        return Ok(gz_path);
    }

    let mut input = File::open(path).with_context(|| format!("打开待压缩日志失败, path={}", path.display()))?;
    let output = File::create(&gz_path).with_context(|| format!("创建压缩日志失败, path={}", gz_path.display()))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    std::io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path).with_context(|| format!("删除已压缩日志失败, path={}", path.display()))?;
    Ok(gz_path)
}

/// 解析 `<prefix>.<YYYY-MM-DD>.log[.gz]`, 返回 (日期, 是否已压缩)
fn parse_log_name(file_name: &str, prefix: &str) -> Option<(NaiveDate, bool)> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('.')?;
    let (date_part, compressed) = match rest.strip_suffix(".log.gz") {
        Some(date_part) => (date_part, true),
        None => (rest.strip_suffix(".log")?, false),
    };
    if date_part.len() != 10 {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some((date, compressed))
}

/// 下一个本地零点; 无法换算时一秒后重试
fn next_rollover_instant(now: DateTime<Local>) -> tokio::time::Instant {
    let fallback = tokio::time::Instant::now() + Duration::from_secs(1);
    let next_midnight = match (now.date_naive() + ChronoDuration::days(1)).and_hms_opt(0, 0, 0) {
        Some(midnight) => midnight,
        None => return fallback,
    };
    let Some(next_local) = Local.from_local_datetime(&next_midnight).earliest() else {
        return fallback;
    };
    let system_time = SystemTime::from(next_local.with_timezone(&Utc));
    let duration = system_time.duration_since(SystemTime::now()).unwrap_or_default();
    tokio::time::Instant::now() + duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> LoggingConfig {
        LoggingConfig {
            level: "info".to_string(),
            console_level: None,
            directory: dir.path().to_string_lossy().to_string(),
            file_prefix: "m4v".to_string(),
            retention_days: 7,
            compress_history: true,
            cleanup_interval_seconds: 60,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        match NaiveDate::from_ymd_opt(y, m, d) {
            Some(date) => date,
            None => panic!("非法测试日期"),
        }
    }

    #[test]
    fn test_解析日志文件名() {
        assert_eq!(parse_log_name("m4v.2026-10-16.log", "m4v"), Some((date(2026, 10, 16), false)));
        assert_eq!(parse_log_name("m4v.2026-10-16.log.gz", "m4v"), Some((date(2026, 10, 16), true)));
        assert_eq!(parse_log_name("m4v.log", "m4v"), None);
        assert_eq!(parse_log_name("other.2026-10-16.log", "m4v"), None);
    }

    #[test]
    fn test_清理压缩与删除() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(err) => panic!("创建临时目录失败: {}", err),
        };
        let config = config_in(&dir);
        let today = date(2026, 10, 16);

        let old = touch_current_log(&config, date(2026, 9, 1)).expect("创建过期日志失败");
        let yesterday = touch_current_log(&config, date(2026, 10, 15)).expect("创建昨日日志失败");
        fs::write(&yesterday, "解码日志\n").expect("写入日志失败");
        let current = touch_current_log(&config, today).expect("创建当前日志失败");

        cleanup_logs(&config, today).expect("清理失败");

        assert!(!old.exists(), "过期日志应被删除");
        assert!(!yesterday.exists(), "昨日日志应被压缩");
        assert!(current.exists(), "当天日志保留");

        let gz_path = PathBuf::from(format!("{}.gz", yesterday.display()));
        let file = File::open(&gz_path).expect("压缩文件不存在");
        let mut text = String::new();
        flate2::read::GzDecoder::new(file)
            .read_to_string(&mut text)
            .expect("解压失败");
        assert_eq!(text, "解码日志\n");
    }
}
