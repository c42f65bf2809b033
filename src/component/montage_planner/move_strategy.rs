//! 死區內圖片左右分配策略
//!
//! 當死區中有圖片時，要決定其中幾張移到死區左側、幾張移到右側。
//! 兩種策略並存，可由設定切換，也方便在測試中直接比較。

use crate::config::Algorithm;

/// 一次分配決策的輸入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitProblem {
    /// 落在死區內的圖片數
    pub dead_count: usize,
    /// 死區左側既有圖片數
    pub images_left: usize,
    /// 死區右側既有圖片數
    pub images_right: usize,
    /// 左側空間（原始影格距離，不扣除其他死區）
    pub spaces_left: u64,
    /// 右側空間
    pub spaces_right: u64,
}

impl SplitProblem {
    #[must_use]
    pub const fn total_images(&self) -> usize {
        self.dead_count + self.images_left + self.images_right
    }
}

/// 決定死區內有幾張圖片移到左側，回傳值必須落在 `0..=dead_count`
pub trait MoveSplitStrategy: Send + Sync {
    fn choose_move_split(&self, problem: &SplitProblem) -> usize;
}

/// 以合併後的理想間距直接推算左側應有的圖片數
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosedFormEstimate;

impl MoveSplitStrategy for ClosedFormEstimate {
    fn choose_move_split(&self, problem: &SplitProblem) -> usize {
        let total_spaces = (problem.spaces_left + problem.spaces_right) as f64;
        let total_images = problem.total_images();
        let ideal_step = if total_images > 1 {
            total_spaces / (total_images - 1) as f64
        } else {
            total_spaces
        };
        if ideal_step <= 0.0 {
            return 0;
        }

        let estimate =
            (problem.spaces_left as f64 / ideal_step - problem.images_left as f64 + 0.5).floor();
        if estimate <= 0.0 {
            0
        } else {
            (estimate as usize).min(problem.dead_count)
        }
    }
}

/// 窮舉每一種分配，取左右密度差平方最小者；平手保留較小的 `move_left`
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveBalance;

impl ExhaustiveBalance {
    fn density_diff(problem: &SplitProblem, move_left: usize) -> f64 {
        let move_right = problem.dead_count - move_left;
        let left = (problem.images_left + move_left) as f64 / problem.spaces_left as f64;
        let right = (problem.images_right + move_right) as f64 / problem.spaces_right as f64;
        (left - right).powi(2)
    }
}

impl MoveSplitStrategy for ExhaustiveBalance {
    fn choose_move_split(&self, problem: &SplitProblem) -> usize {
        let mut best_move_left = 0;
        let mut best_diff = f64::INFINITY;
        for move_left in 0..=problem.dead_count {
            let diff = Self::density_diff(problem, move_left);
            if diff < best_diff {
                best_diff = diff;
                best_move_left = move_left;
            }
        }
        best_move_left
    }
}

impl Algorithm {
    /// 對應的分配策略
    #[must_use]
    pub fn strategy(self) -> &'static dyn MoveSplitStrategy {
        match self {
            Self::ClosedForm => &ClosedFormEstimate,
            Self::ExhaustiveBalance => &ExhaustiveBalance,
        }
    }
}
