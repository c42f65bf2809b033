//! 分配策略比較
//!
//! 對一系列圖片數量分別以兩種演算法分配，比較間距的變異數，
//! 用來檢查兩種策略在實際死區下的表現差異。

use super::frame_distributor::{FrameDistributor, SlotAssignment};
use crate::config::{Algorithm, CandidateScan};
use crate::error::Result;
use crate::tools::DeadzoneStore;
use log::{debug, info};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::fmt;

/// 預設比較的圖片數量：21 張遞減到 2 張（單列網格）
pub const DEFAULT_SLOT_COUNTS: [usize; 20] = [
    21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Algorithm(Algorithm),
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Algorithm(algorithm) => write!(f, "{algorithm}"),
            Self::Tie => write!(f, "="),
        }
    }
}

/// 單一圖片數量的比較結果
#[derive(Debug, Clone)]
pub struct ComparisonRow {
    pub slots: usize,
    pub closed_form: SlotAssignment,
    pub exhaustive: SlotAssignment,
}

impl ComparisonRow {
    #[must_use]
    pub fn assignment(&self, algorithm: Algorithm) -> &SlotAssignment {
        match algorithm {
            Algorithm::ClosedForm => &self.closed_form,
            Algorithm::ExhaustiveBalance => &self.exhaustive,
        }
    }

    /// 間距變異數較小者勝出
    #[must_use]
    pub fn winner(&self) -> Winner {
        let closed_form = self.closed_form.gap_variance();
        let exhaustive = self.exhaustive.gap_variance();
        match closed_form.total_cmp(&exhaustive) {
            Ordering::Less => Winner::Algorithm(Algorithm::ClosedForm),
            Ordering::Greater => Winner::Algorithm(Algorithm::ExhaustiveBalance),
            Ordering::Equal => Winner::Tie,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrategyComparison {
    pub rows: Vec<ComparisonRow>,
}

impl StrategyComparison {
    #[must_use]
    pub fn wins(&self, algorithm: Algorithm) -> usize {
        self.rows
            .iter()
            .filter(|row| row.winner() == Winner::Algorithm(algorithm))
            .count()
    }

    #[must_use]
    pub fn ties(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.winner() == Winner::Tie)
            .count()
    }
}

impl fmt::Display for StrategyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(
                f,
                "{:>3} 張 | 1: {:>10.2} | 2: {:>10.2} | 勝出: {}",
                row.slots,
                row.closed_form.gap_variance(),
                row.exhaustive.gap_variance(),
                row.winner()
            )?;
        }
        write!(
            f,
            "演算法 1 勝 {} 次，演算法 2 勝 {} 次，平手 {} 次",
            self.wins(Algorithm::ClosedForm),
            self.wins(Algorithm::ExhaustiveBalance),
            self.ties()
        )
    }
}

/// 平行比較兩種演算法，結果依 `slot_counts` 的順序排列
///
/// # Errors
///
/// 任一次分配失敗即回傳該錯誤。
pub fn compare_strategies(
    total_frames: u64,
    store: &DeadzoneStore,
    scan: CandidateScan,
    slot_counts: &[usize],
) -> Result<StrategyComparison> {
    info!(
        "比較分配演算法: {} 影格、{} 個死區、{} 種圖片數量",
        total_frames,
        store.len(),
        slot_counts.len()
    );

    let rows = slot_counts
        .par_iter()
        .map(|&slots| -> Result<ComparisonRow> {
            let run = |algorithm: Algorithm| {
                FrameDistributor::new(store, algorithm)
                    .with_candidate_scan(scan)
                    .run(total_frames, slots)
            };
            let row = ComparisonRow {
                slots,
                closed_form: run(Algorithm::ClosedForm)?,
                exhaustive: run(Algorithm::ExhaustiveBalance)?,
            };
            debug!("{slots} 張: 勝出 {}", row.winner());
            Ok(row)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(StrategyComparison { rows })
}
