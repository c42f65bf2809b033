//! 網格最佳化
//!
//! 在可用影格預算內搜尋列數與欄數，使整張預覽圖的長寬比最接近目標。

use crate::error::{MontageError, Result};
use log::{debug, trace};
use std::fmt;

/// 預覽圖網格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid {
    pub cols: usize,
    pub rows: usize,
}

impl Grid {
    #[must_use]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { cols, rows }
    }

    /// 總格數
    #[must_use]
    pub const fn slots(&self) -> usize {
        self.cols * self.rows
    }

    /// 以單張影格尺寸計算整張網格的長寬比
    #[must_use]
    pub fn ratio(&self, frame_width: u32, frame_height: u32) -> f64 {
        (self.cols as f64 * f64::from(frame_width)) / (self.rows as f64 * f64::from(frame_height))
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// 目前找到的最佳候選
#[derive(Debug, Default)]
struct Best {
    diff: Option<f64>,
    grid: Option<Grid>,
}

impl Best {
    /// 嚴格小於才取代，平手時保留先找到的
    fn offer(&mut self, grid: Grid, diff: f64) -> bool {
        if self.diff.is_none_or(|best| diff < best) {
            self.diff = Some(diff);
            self.grid = Some(grid);
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GridOptimizer {
    target_ratio: f64,
    frame_width: u32,
    frame_height: u32,
}

impl GridOptimizer {
    #[must_use]
    pub const fn new(target_ratio: f64, frame_width: u32, frame_height: u32) -> Self {
        Self {
            target_ratio,
            frame_width,
            frame_height,
        }
    }

    fn diff(&self, grid: Grid) -> f64 {
        (grid.ratio(self.frame_width, self.frame_height) - self.target_ratio).powi(2)
    }

    /// 某列數下，使長寬比由下方最接近目標的欄數（至少 1）
    fn start_cols(&self, rows: usize) -> usize {
        let cols = (rows as f64 * self.target_ratio * f64::from(self.frame_height))
            / f64::from(self.frame_width);
        (cols.floor() as usize).max(1)
    }

    /// 搜尋最佳網格
    ///
    /// 可固定列數或欄數；兩者都固定時只檢查該網格是否在預算內。
    /// 沿著非固定軸遞增時，一旦差值在下降後回升即停止（已過局部最小值）。
    pub fn find_grid(
        &self,
        available: u64,
        fixed_rows: Option<usize>,
        fixed_cols: Option<usize>,
    ) -> Result<Grid> {
        let budget = usize::try_from(available).unwrap_or(usize::MAX);
        let mut best = Best::default();

        match (fixed_rows, fixed_cols) {
            (Some(0), _) | (_, Some(0)) => {}
            (Some(rows), Some(cols)) => {
                let grid = Grid::new(rows, cols);
                if grid.slots() <= budget {
                    best.offer(grid, self.diff(grid));
                }
            }
            (Some(rows), None) => {
                self.scan(self.start_cols(rows), |cols| Grid::new(rows, cols), budget, &mut best);
            }
            (None, Some(cols)) => {
                self.scan(1, |rows| Grid::new(rows, cols), budget, &mut best);
            }
            (None, None) => {
                for rows in 1..=budget {
                    let start_cols = self.start_cols(rows);
                    // 列數越多只會更超出預算
                    if start_cols.saturating_mul(rows) > budget {
                        break;
                    }
                    self.scan(start_cols, |cols| Grid::new(rows, cols), budget, &mut best);
                }
            }
        }

        let grid = best.grid.ok_or(MontageError::InvalidGrid { available })?;
        debug!(
            "最佳網格 {grid}（{} 格），長寬比 {:.4}，目標 {:.4}",
            grid.slots(),
            grid.ratio(self.frame_width, self.frame_height),
            self.target_ratio
        );
        Ok(grid)
    }

    /// 從 `start` 開始沿非固定軸遞增掃描，超出預算或越過局部最小值即停止
    fn scan(&self, start: usize, make: impl Fn(usize) -> Grid, budget: usize, best: &mut Best) {
        let mut last_diff = f64::INFINITY;
        for value in start.. {
            let grid = make(value);
            if grid.slots() > budget {
                break;
            }
            let diff = self.diff(grid);
            if best.offer(grid, diff) {
                trace!("BEST! {grid} diff={diff:.10}");
            } else if last_diff < diff {
                trace!("{grid} diff={diff:.10} - 停止");
                break;
            } else {
                trace!("{grid} diff={diff:.10}");
            }
            last_diff = diff;
        }
    }
}
