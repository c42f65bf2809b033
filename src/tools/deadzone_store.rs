use crate::error::{MontageError, Result};
use log::{debug, info};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

/// 閉區間 `[start, end]`，代表一段不可選取的影格
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// 建立區間，若 `start > end` 則自動對調
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    #[must_use]
    pub const fn single(frame: u64) -> Self {
        Self {
            start: frame,
            end: frame,
        }
    }

    /// 區間涵蓋的影格數
    #[must_use]
    pub const fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    #[must_use]
    pub const fn midpoint(&self) -> u64 {
        self.start + (self.end - self.start) / 2
    }

    #[must_use]
    pub const fn contains(&self, frame: u64) -> bool {
        self.start <= frame && frame <= self.end
    }

    #[must_use]
    pub const fn overlaps(&self, lo: u64, hi: u64) -> bool {
        lo <= self.end && self.start <= hi
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for Interval {
    type Err = MontageError;

    /// 解析 `start:end` 或單一影格 `frame`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || MontageError::configuration(format!("無法解析死區: {s:?}"));
        match s.split_once(':') {
            Some((start, end)) => {
                let start: u64 = start.trim().parse().map_err(|_| invalid())?;
                let end: u64 = end.trim().parse().map_err(|_| invalid())?;
                Ok(Self::new(start, end))
            }
            None => s.parse().map(Self::single).map_err(|_| invalid()),
        }
    }
}

/// 解析死區檔案中的一行，必須是 `int:int` 且 `start <= end`
fn parse_persisted_line(line: &str) -> Option<Interval> {
    let (start, end) = line.split_once(':')?;
    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = end.trim().parse().ok()?;
    (start <= end).then_some(Interval { start, end })
}

/// 依影片路徑推導死區檔案路徑：`<影片主檔名>_deadzones.txt`
#[must_use]
pub fn deadzone_path_for(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map_or_else(|| "video".to_string(), |s| s.to_string_lossy().to_string());
    video_path.with_file_name(format!("{stem}_deadzones.txt"))
}

/// 死區集合
///
/// 內部區間依起點排序、互不重疊且不相鄰（相鄰即合併）。
/// 若綁定檔案，每次 `add` 後會整份重寫檔案。
#[derive(Debug, Clone, Default)]
pub struct DeadzoneStore {
    intervals: Vec<Interval>,
    path: Option<PathBuf>,
}

impl DeadzoneStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 從區間清單建立（會排序並合併）
    #[must_use]
    pub fn from_intervals(intervals: impl IntoIterator<Item = Interval>) -> Self {
        Self {
            intervals: normalize(intervals.into_iter().collect()),
            path: None,
        }
    }

    /// 開啟綁定檔案的死區集合，檔案不存在時視為空集合
    pub fn open(path: &Path) -> Result<Self> {
        let mut store = Self::load_from_file(path)?;
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("死區檔案不存在，使用空集合: {}", path.display());
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let store = Self::parse(&content)?;
        info!(
            "已載入 {} 個死區: {}",
            store.intervals.len(),
            path.display()
        );
        Ok(store)
    }

    /// 解析死區檔案內容，一行一個 `start:end`
    pub fn parse(content: &str) -> Result<Self> {
        let mut intervals = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let interval =
                parse_persisted_line(trimmed).ok_or_else(|| MontageError::DataFormat {
                    line_number: index + 1,
                    line: line.to_string(),
                })?;
            intervals.push(interval);
        }
        Ok(Self::from_intervals(intervals))
    }

    /// 整份重寫死區檔案（先寫入同目錄暫存檔再改名）
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(directory)?;

        let mut temp_file = NamedTempFile::new_in(directory)?;
        temp_file.write_all(self.to_string().as_bytes())?;
        temp_file.flush()?;
        temp_file.persist(path).map_err(|e| e.error)?;

        debug!("死區檔案已更新: {}", path.display());
        Ok(())
    }

    /// 新增死區（`end` 省略時為單一影格），合併後若有綁定檔案則寫回
    pub fn add(&mut self, start: u64, end: Option<u64>) -> Result<()> {
        let interval = Interval::new(start, end.unwrap_or(start));
        let mut intervals = std::mem::take(&mut self.intervals);
        intervals.push(interval);
        self.intervals = normalize(intervals);

        info!("新增死區 {interval}，目前共 {} 個", self.intervals.len());

        if let Some(path) = &self.path {
            self.save_to_file(path)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// 影格是否落在任何死區內
    #[must_use]
    pub fn contains(&self, frame: u64) -> bool {
        let index = self.intervals.partition_point(|iv| iv.end < frame);
        self.intervals
            .get(index)
            .is_some_and(|iv| iv.contains(frame))
    }

    /// 與 `[lo, hi]` 有交集的死區
    pub fn intersecting(&self, lo: u64, hi: u64) -> impl Iterator<Item = Interval> + '_ {
        self.intervals
            .iter()
            .copied()
            .filter(move |iv| iv.overlaps(lo, hi))
    }

    /// 扣除所有死區後剩餘的影格數（網格搜尋的上限）
    #[must_use]
    pub fn available_frames(&self, total: u64) -> u64 {
        let dead = self
            .intervals
            .iter()
            .map(Interval::len)
            .fold(0, u64::saturating_add);
        total.saturating_sub(dead)
    }

    /// `[lo, hi]` 內不屬於任何死區的影格數
    #[must_use]
    pub fn count_available(&self, lo: u64, hi: u64) -> u64 {
        if lo > hi {
            return 0;
        }
        let covered: u128 = self
            .intersecting(lo, hi)
            .map(|iv| u128::from(iv.end.min(hi) - iv.start.max(lo)) + 1)
            .sum();
        u64::try_from(u128::from(hi - lo) + 1 - covered).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for DeadzoneStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for interval in &self.intervals {
            writeln!(f, "{interval}")?;
        }
        Ok(())
    }
}

/// 排序並合併重疊或相鄰的區間
fn normalize(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_unstable();
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_merges_overlapping_and_adjacent() {
        let mut store = DeadzoneStore::new();
        store.add(10, Some(20)).unwrap();
        store.add(30, Some(40)).unwrap();
        // 相鄰（21 緊接 20）也要合併
        store.add(21, Some(25)).unwrap();
        assert_eq!(
            store.intervals(),
            &[Interval::new(10, 25), Interval::new(30, 40)]
        );

        // 跨越兩段，合併為一段
        store.add(24, Some(31)).unwrap();
        assert_eq!(store.intervals(), &[Interval::new(10, 40)]);
    }

    #[test]
    fn test_add_single_frame_and_swapped_bounds() {
        let mut store = DeadzoneStore::new();
        store.add(7, None).unwrap();
        store.add(50, Some(45)).unwrap();
        assert_eq!(
            store.intervals(),
            &[Interval::single(7), Interval::new(45, 50)]
        );
    }

    #[test]
    fn test_add_contained_interval_is_noop() {
        let mut store = DeadzoneStore::from_intervals([Interval::new(100, 200)]);
        store.add(120, Some(150)).unwrap();
        assert_eq!(store.intervals(), &[Interval::new(100, 200)]);
    }

    #[test]
    fn test_available_frames() {
        let store = DeadzoneStore::from_intervals([Interval::new(0, 9), Interval::new(50, 59)]);
        assert_eq!(store.available_frames(100), 80);
        assert_eq!(DeadzoneStore::new().available_frames(100), 100);
    }

    #[test]
    fn test_count_available_partial_overlap() {
        let store = DeadzoneStore::from_intervals([Interval::new(10, 19), Interval::new(40, 60)]);
        assert_eq!(store.count_available(0, 99), 100 - 10 - 21);
        // 只重疊死區的一部分
        assert_eq!(store.count_available(15, 45), 31 - 5 - 6);
        assert_eq!(store.count_available(40, 60), 0);
        assert_eq!(store.count_available(20, 39), 20);
        assert_eq!(store.count_available(5, 4), 0);
    }

    #[test]
    fn test_contains() {
        let store = DeadzoneStore::from_intervals([Interval::new(10, 19), Interval::new(40, 60)]);
        assert!(!store.contains(9));
        assert!(store.contains(10));
        assert!(store.contains(19));
        assert!(!store.contains(20));
        assert!(store.contains(50));
        assert!(!store.contains(61));
    }

    #[test]
    fn test_parse_normalizes_and_skips_blank_lines() {
        let store = DeadzoneStore::parse("40:60\n\n10:19\n20:25\n").unwrap();
        assert_eq!(
            store.intervals(),
            &[Interval::new(10, 25), Interval::new(40, 60)]
        );
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        let err = DeadzoneStore::parse("10:20\nabc\n").unwrap_err();
        match err {
            MontageError::DataFormat { line_number, line } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "abc");
            }
            other => panic!("預期 DataFormat，得到 {other:?}"),
        }

        assert!(matches!(
            DeadzoneStore::parse("30:20"),
            Err(MontageError::DataFormat { line_number: 1, .. })
        ));
        assert!(matches!(
            DeadzoneStore::parse("5"),
            Err(MontageError::DataFormat { .. })
        ));
    }

    #[test]
    fn test_interval_from_str() {
        assert_eq!("3:9".parse::<Interval>().unwrap(), Interval::new(3, 9));
        assert_eq!("9:3".parse::<Interval>().unwrap(), Interval::new(3, 9));
        assert_eq!(" 12 ".parse::<Interval>().unwrap(), Interval::single(12));
        assert!("x:1".parse::<Interval>().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip_deadzones.txt");

        let store = DeadzoneStore::from_intervals([Interval::new(40, 60), Interval::new(0, 4)]);
        store.save_to_file(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "0:4\n40:60\n");

        let loaded = DeadzoneStore::load_from_file(&path).unwrap();
        assert_eq!(loaded.intervals(), store.intervals());
    }

    #[test]
    fn test_open_persists_every_add() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip_deadzones.txt");

        let mut store = DeadzoneStore::open(&path).unwrap();
        assert!(store.is_empty());

        store.add(5, Some(8)).unwrap();
        store.add(9, None).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "5:9\n");

        let reopened = DeadzoneStore::open(&path).unwrap();
        assert_eq!(reopened.intervals(), &[Interval::new(5, 9)]);
        assert_eq!(reopened.path(), Some(path.as_path()));
    }

    #[test]
    fn test_deadzone_reaching_u64_max() {
        let mut store = DeadzoneStore::new();
        store.add(50, Some(u64::MAX)).unwrap();
        // 總長超過影片長度，扣到 0 為止
        assert_eq!(store.available_frames(100), 0);
        assert_eq!(store.count_available(0, 99), 50);
        assert_eq!(store.count_available(0, u64::MAX), 50);
        assert!(store.contains(u64::MAX));

        store.add(0, Some(u64::MAX)).unwrap();
        let whole = store.intervals()[0];
        assert_eq!(whole.len(), u64::MAX);
        assert_eq!(whole.midpoint(), u64::MAX / 2);
        assert_eq!(store.available_frames(100), 0);
        assert_eq!(store.count_available(0, u64::MAX), 0);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let store = DeadzoneStore::load_from_file(Path::new("/nonexistent/x_deadzones.txt")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_deadzone_path_for() {
        let path = deadzone_path_for(Path::new("/videos/holiday.mp4"));
        assert_eq!(path, PathBuf::from("/videos/holiday_deadzones.txt"));
    }
}
