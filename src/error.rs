//! 錯誤型別
//!
//! 核心演算法（死區、網格、分配）一律回傳 [`MontageError`]，
//! 由呼叫端決定要中止程式或改用其他輸入。

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MontageError>;

#[derive(Debug, Error)]
pub enum MontageError {
    /// 設定不合法：網格少於 2 格、格數超過影格數、字串格式錯誤等
    #[error("設定錯誤: {message}")]
    Configuration { message: String },

    /// 在可用影格預算內找不到任何網格
    #[error("找不到可用網格（可用影格: {available}）")]
    InvalidGrid { available: u64 },

    /// 死區佔滿整個範圍，兩側都沒有可移入的空間
    #[error("死區 {start}:{end} 兩側沒有可用空間，無法重新安置圖片")]
    UnsatisfiableLayout { start: u64, end: u64 },

    /// 死區檔案中有無法解析的行
    #[error("死區檔案第 {line_number} 行格式錯誤: {line:?}")]
    DataFormat { line_number: usize, line: String },

    #[error("I/O 錯誤: {0}")]
    Io(#[from] std::io::Error),
}

impl MontageError {
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
