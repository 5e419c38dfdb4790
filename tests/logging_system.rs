//! 日志系统集成测试.
//!
//! tracing 的全局订阅器只能安装一次, 涉及 `init()` 的测试需要单独运行:
//! `cargo test --test logging_system <名称> -- --ignored`

use std::fs;
use std::path::{Path, PathBuf};

use m4v::codec::decoders::mpeg4::synth::StreamBuilder;
use m4v::codec::{DecodeFlags, Mpeg4Decoder};
use m4v::logging::{LoggingConfig, init};
use m4v::TracingSink;

fn config_for(dir: &Path, level: &str, prefix: &str) -> LoggingConfig {
    LoggingConfig {
        level: level.to_string(),
        console_level: Some("warn".to_string()),
        directory: dir.to_string_lossy().to_string(),
        file_prefix: prefix.to_string(),
        retention_days: 7,
        compress_history: false,
        cleanup_interval_seconds: 3600,
    }
}

fn today_log_path(dir: &Path, prefix: &str) -> PathBuf {
    let today = chrono::Local::now().date_naive();
    dir.join(format!("{}.{}.log", prefix, today.format("%Y-%m-%d")))
}

fn read_log_eventually(path: &Path, needle: &str) -> String {
    // 非阻塞写入器在后台线程落盘
    for _ in 0..20 {
        if let Ok(content) = fs::read_to_string(path) {
            if content.contains(needle) {
                return content;
            }
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    fs::read_to_string(path).unwrap_or_default()
}

#[tokio::test]
#[ignore]
async fn test_日志初始化创建目录与文件() {
    let root = tempfile::tempdir().expect("创建临时目录失败");
    let dir = root.path().join("nested").join("logs");
    assert!(!dir.exists());

    init(config_for(&dir, "info", "m4v-test")).expect("日志初始化失败");
    assert!(dir.exists(), "日志目录应被创建");
    assert!(today_log_path(&dir, "m4v-test").exists(), "当天日志文件应被创建");
}

#[tokio::test]
#[ignore]
async fn test_日志级别过滤() {
    let root = tempfile::tempdir().expect("创建临时目录失败");
    init(config_for(root.path(), "info", "level")).expect("日志初始化失败");

    tracing::warn!("警告_WARN_MSG");
    tracing::info!("信息_INFO_MSG");
    tracing::debug!("调试_DEBUG_MSG");

    let content = read_log_eventually(&today_log_path(root.path(), "level"), "信息_INFO_MSG");
    assert!(content.contains("警告_WARN_MSG"));
    assert!(content.contains("信息_INFO_MSG"));
    assert!(content.contains("INFO"), "应包含级别标记");
    assert!(!content.contains("调试_DEBUG_MSG"), "debug 日志应被过滤");
}

#[tokio::test]
#[ignore]
async fn test_解码诊断进入日志文件() {
    let root = tempfile::tempdir().expect("创建临时目录失败");
    init(config_for(root.path(), "trace", "diag")).expect("日志初始化失败");

    let mut builder = StreamBuilder::new(32, 32).low_delay(true);
    let vol = builder.vol().take();
    let mut picture = builder.intra_vop(0, 100).take();
    picture.truncate(13);

    let mut decoder = Mpeg4Decoder::new();
    decoder.set_diagnostics(Box::new(TracingSink));
    decoder.decode(&vol, DecodeFlags::empty()).unwrap();
    decoder.decode(&picture, DecodeFlags::empty()).unwrap();

    let content = read_log_eventually(&today_log_path(root.path(), "diag"), "宏块已隐藏");
    assert!(content.contains("宏块已隐藏"), "诊断事件应写入日志:\n{}", content);
    // log 门面的消息经桥接进入同一文件
    assert!(content.contains("m4v_codec"), "应包含解码库的日志:\n{}", content);
}

#[test]
fn test_日志配置默认值() {
    let config = LoggingConfig::default();
    assert_eq!(config.retention_days, 30);
    assert!(config.compress_history);
    assert_eq!(config.cleanup_interval_seconds, 3600);
    assert_eq!(config.file_prefix, "m4v");
}
