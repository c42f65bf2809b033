use crate::error::MontageError;
use log::LevelFilter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// 網格字串：`RxC`、`Rx`、`xC`
static REGEX_GRID_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d*)\s*[xX]\s*(\d*)\s*$").expect("Invalid regex"));

/// 目標長寬比，字串格式 `W:H`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    #[must_use]
    pub fn ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            width: 16,
            height: 9,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = MontageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MontageError::configuration(format!("長寬比格式錯誤（應為 W:H）: {s:?}"));
        let (width, height) = s.trim().split_once(':').ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = MontageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(value: AspectRatio) -> Self {
        value.to_string()
    }
}

/// 使用者指定的網格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GridSpec {
    /// `RxC`：固定列數與欄數
    Exact { rows: usize, cols: usize },
    /// `Rx`：固定列數，搜尋欄數
    Rows(usize),
    /// `xC`：固定欄數，搜尋列數
    Cols(usize),
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact { rows, cols } => write!(f, "{rows}x{cols}"),
            Self::Rows(rows) => write!(f, "{rows}x"),
            Self::Cols(cols) => write!(f, "x{cols}"),
        }
    }
}

impl FromStr for GridSpec {
    type Err = MontageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            MontageError::configuration(format!("網格格式錯誤（應為 RxC、Rx 或 xC）: {s:?}"))
        };
        let captures = REGEX_GRID_SPEC.captures(s).ok_or_else(invalid)?;
        let parse = |index: usize| -> Result<Option<usize>, MontageError> {
            match captures.get(index).map(|m| m.as_str()).filter(|v| !v.is_empty()) {
                None => Ok(None),
                Some(value) => match value.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(Some(n)),
                    _ => Err(invalid()),
                },
            }
        };

        match (parse(1)?, parse(2)?) {
            (Some(rows), Some(cols)) => Ok(Self::Exact { rows, cols }),
            (Some(rows), None) => Ok(Self::Rows(rows)),
            (None, Some(cols)) => Ok(Self::Cols(cols)),
            (None, None) => Err(invalid()),
        }
    }
}

impl TryFrom<String> for GridSpec {
    type Error = MontageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GridSpec> for String {
    fn from(value: GridSpec) -> Self {
        value.to_string()
    }
}

/// 死區內圖片左右分配的演算法，設定檔中以數字表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Algorithm {
    /// 1：以理想間距直接估算
    ClosedForm,
    /// 2：窮舉所有分配，取左右密度最接近者
    #[default]
    ExhaustiveBalance,
}

impl Algorithm {
    pub const ALL: [Self; 2] = [Self::ClosedForm, Self::ExhaustiveBalance];

    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::ClosedForm => 1,
            Self::ExhaustiveBalance => 2,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = MontageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::ClosedForm),
            2 => Ok(Self::ExhaustiveBalance),
            other => Err(MontageError::configuration(format!(
                "未知的演算法: {other}（可用 1 或 2）"
            ))),
        }
    }
}

impl FromStr for Algorithm {
    type Err = MontageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number: u8 = s.trim().parse().map_err(|_| {
            MontageError::configuration(format!("未知的演算法: {s:?}（可用 1 或 2）"))
        })?;
        Self::try_from(number)
    }
}

impl From<Algorithm> for u8 {
    fn from(value: Algorithm) -> Self {
        value.number()
    }
}

/// 每次遞迴要檢查多少個候選死區
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateScan {
    /// 依優先順序檢查，處理第一個含有圖片的死區
    #[default]
    FirstOccupied,
    /// 只檢查優先順序最高的死區
    LargestOnly,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub aspect_ratio: Option<AspectRatio>,
    pub grid: Option<GridSpec>,
    pub algorithm: Algorithm,
    pub candidate_scan: CandidateScan,
    /// 0: 一般, 1: 顯示分配決策, 2: 追蹤每次遞迴
    pub verbosity: u8,
}

impl UserSettings {
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: UserSettings,
}
