//! 預覽圖規劃元件
//!
//! 流程：
//! A. 依長寬比或指定網格決定列數與欄數
//! B. 將圖片平均分配到影格上
//! C. 把落在死區內的圖片移到兩側，並遞迴重新分配
//! D. 輸出 `(格位, 影格)` 清單交給擷取與拼接流程

mod frame_distributor;
mod grid_optimizer;
mod main;
mod move_strategy;
mod strategy_comparison;
mod timeline;

pub use frame_distributor::{FrameDistributor, SlotAssignment};
pub use grid_optimizer::{Grid, GridOptimizer};
pub use main::{DEFAULT_GRID_ROWS, MontagePlan, MontagePlanner, VideoGeometry};
pub use move_strategy::{ClosedFormEstimate, ExhaustiveBalance, MoveSplitStrategy, SplitProblem};
pub use strategy_comparison::{
    ComparisonRow, DEFAULT_SLOT_COUNTS, StrategyComparison, Winner, compare_strategies,
};
pub use timeline::render_timeline;
