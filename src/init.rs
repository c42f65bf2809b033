use log::{LevelFilter, debug};

/// 初始化日誌，`RUST_LOG` 有設定時優先使用
///
/// 重複呼叫時沿用已安裝的日誌器。
pub fn init(level: LevelFilter) {
    if let Err(e) = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init()
    {
        debug!("日誌已初始化，略過: {e}");
    }
}
