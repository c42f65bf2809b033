use super::frame_distributor::{FrameDistributor, SlotAssignment};
use super::grid_optimizer::{Grid, GridOptimizer};
use super::strategy_comparison::{StrategyComparison, compare_strategies};
use crate::config::{GridSpec, UserSettings};
use crate::error::{MontageError, Result};
use crate::tools::DeadzoneStore;
use log::info;

/// 未指定網格與長寬比時固定使用的列數
pub const DEFAULT_GRID_ROWS: usize = 2;

/// 影片的影格數與單張影格尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoGeometry {
    pub total_frames: u64,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl VideoGeometry {
    /// # Errors
    ///
    /// 影格數或尺寸為 0 時回傳 [`MontageError::Configuration`]。
    pub fn new(total_frames: u64, frame_width: u32, frame_height: u32) -> Result<Self> {
        if total_frames == 0 {
            return Err(MontageError::configuration("影格數必須大於 0"));
        }
        if frame_width == 0 || frame_height == 0 {
            return Err(MontageError::configuration(format!(
                "影格尺寸不合法: {frame_width}x{frame_height}"
            )));
        }
        Ok(Self {
            total_frames,
            frame_width,
            frame_height,
        })
    }
}

/// 交給擷取與拼接流程的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MontagePlan {
    pub grid: Grid,
    pub assignment: SlotAssignment,
}

impl MontagePlan {
    /// `(格位, 影格)` 清單
    pub fn pairs(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.assignment.pairs()
    }
}

/// 預覽圖規劃器
///
/// 負責決定網格、維護死區，並產生每個格位要擷取的影格。
#[derive(Debug, Clone)]
pub struct MontagePlanner {
    settings: UserSettings,
    video: VideoGeometry,
    deadzones: DeadzoneStore,
}

impl MontagePlanner {
    #[must_use]
    pub const fn new(settings: UserSettings, video: VideoGeometry, deadzones: DeadzoneStore) -> Self {
        Self {
            settings,
            video,
            deadzones,
        }
    }

    #[must_use]
    pub const fn deadzones(&self) -> &DeadzoneStore {
        &self.deadzones
    }

    /// 新增死區，下一次 [`plan`](Self::plan) 會套用
    pub fn add_deadzone(&mut self, start: u64, end: Option<u64>) -> Result<()> {
        self.deadzones.add(start, end)
    }

    fn optimizer(&self) -> GridOptimizer {
        let ratio = self.settings.aspect_ratio.unwrap_or_default().ratio();
        GridOptimizer::new(ratio, self.video.frame_width, self.video.frame_height)
    }

    /// 依設定決定網格
    ///
    /// 指定 `RxC` 直接使用；`Rx`、`xC` 固定一軸搜尋另一軸；
    /// 只指定長寬比時完整搜尋；都沒指定時固定 2 列。
    pub fn resolve_grid(&self) -> Result<Grid> {
        let available = self.deadzones.available_frames(self.video.total_frames);
        let optimizer = self.optimizer();

        let grid = match (self.settings.grid, self.settings.aspect_ratio) {
            (Some(GridSpec::Exact { rows, cols }), _) => Grid::new(rows, cols),
            (Some(GridSpec::Rows(rows)), _) => optimizer.find_grid(available, Some(rows), None)?,
            (Some(GridSpec::Cols(cols)), _) => optimizer.find_grid(available, None, Some(cols))?,
            (None, Some(_)) => optimizer.find_grid(available, None, None)?,
            (None, None) => {
                info!("未指定網格或長寬比，使用預設 {DEFAULT_GRID_ROWS} 列");
                optimizer.find_grid(available, Some(DEFAULT_GRID_ROWS), None)?
            }
        };

        validate_grid(grid, self.video.total_frames)?;
        info!("網格: {grid}（{} 張圖片）", grid.slots());
        Ok(grid)
    }

    /// 決定網格並分配整段影片的影格
    pub fn plan(&self) -> Result<MontagePlan> {
        let grid = self.resolve_grid()?;
        let assignment = FrameDistributor::new(&self.deadzones, self.settings.algorithm)
            .with_candidate_scan(self.settings.candidate_scan)
            .run(self.video.total_frames, grid.slots())?;
        Ok(MontagePlan { grid, assignment })
    }

    /// 預覽 `[start, end]` 之間的影格，不考慮死區
    ///
    /// 以區間長度重新搜尋網格，並等距選取影格。
    pub fn preview(&self, start: u64, end: u64) -> Result<MontagePlan> {
        if start > end || end >= self.video.total_frames {
            return Err(MontageError::configuration(format!(
                "預覽範圍 {start}:{end} 超出影片（共 {} 影格）",
                self.video.total_frames
            )));
        }

        let frame_count = end - start + 1;
        let grid = self.optimizer().find_grid(frame_count, None, None)?;
        validate_grid(grid, frame_count)?;

        let step = (end - start) as f64 / (grid.slots() - 1) as f64;
        let frames = (0..grid.slots())
            .map(|i| (start as f64 + i as f64 * step + 0.5).floor() as u64)
            .collect();
        info!("預覽 {start}:{end}，網格 {grid}，間隔 {step:.2}");

        Ok(MontagePlan {
            grid,
            assignment: SlotAssignment::from_frames(frames),
        })
    }

    /// 以單列網格比較兩種分配演算法
    pub fn compare_strategies(&self, slot_counts: &[usize]) -> Result<StrategyComparison> {
        compare_strategies(
            self.video.total_frames,
            &self.deadzones,
            self.settings.candidate_scan,
            slot_counts,
        )
    }
}

/// 網格至少 2 格，且不可超過影格數
fn validate_grid(grid: Grid, total_frames: u64) -> Result<()> {
    let slots = grid.slots();
    if slots < 2 {
        return Err(MontageError::configuration(format!(
            "網格 {grid} 至少需要 2 張圖片"
        )));
    }
    if slots as u64 > total_frames {
        return Err(MontageError::configuration(format!(
            "網格 {grid} 需要 {slots} 張圖片，超過影格數 {total_frames}"
        )));
    }
    Ok(())
}
