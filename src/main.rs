use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use log::info;
use std::path::PathBuf;
use std::str::FromStr;
use video_montage::MontageError;
use video_montage::component::montage_planner::{
    DEFAULT_SLOT_COUNTS, MontagePlanner, VideoGeometry, render_timeline,
};
use video_montage::config::{Algorithm, AspectRatio, Config, GridSpec, UserSettings};
use video_montage::init;
use video_montage::tools::{DeadzoneStore, Interval, deadzone_path_for};

/// 單張影格尺寸，格式 `寬x高`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameSize {
    width: u32,
    height: u32,
}

impl FromStr for FrameSize {
    type Err = MontageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || MontageError::configuration(format!("影格尺寸格式錯誤（應為 寬x高）: {s:?}"));
        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        Ok(Self {
            width: width.trim().parse().map_err(|_| invalid())?,
            height: height.trim().parse().map_err(|_| invalid())?,
        })
    }
}

#[derive(Debug, Parser)]
#[command(name = "video_montage", version)]
#[command(about = "依死區規劃影片縮圖的網格與影格")]
struct Args {
    /// 影片路徑，死區檔案放在同一目錄
    video: PathBuf,

    /// 影片總影格數
    total_frames: u64,

    /// 單張影格尺寸，例如 1920x1080
    frame_size: FrameSize,

    /// 新增死區 `起:訖`，只給一個數字時為單一影格，可重複指定
    #[arg(long = "add", value_name = "起:訖")]
    additions: Vec<Interval>,

    /// 以 21 到 2 張圖片比較兩種分配演算法
    #[arg(long)]
    algo_test: bool,

    /// 分配演算法：1 直接估算，2 窮舉平衡
    #[arg(long)]
    algorithm: Option<Algorithm>,

    /// 網格：RxC、Rx 或 xC
    #[arg(long)]
    grid: Option<GridSpec>,

    /// 目標長寬比 W:H
    #[arg(long)]
    ratio: Option<AspectRatio>,

    /// 0: 一般, 1: 顯示分配決策, 2: 追蹤每次遞迴
    #[arg(short, long)]
    verbosity: Option<u8>,
}

impl Args {
    /// 命令列有指定的項目覆蓋設定檔
    fn apply_overrides(&self, settings: &mut UserSettings) {
        if let Some(algorithm) = self.algorithm {
            settings.algorithm = algorithm;
        }
        if let Some(grid) = self.grid {
            settings.grid = Some(grid);
        }
        if let Some(ratio) = self.ratio {
            settings.aspect_ratio = Some(ratio);
        }
        if let Some(verbosity) = self.verbosity {
            settings.verbosity = verbosity;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::new()?;
    args.apply_overrides(&mut config.settings);
    init::init(config.settings.log_level());

    let video = VideoGeometry::new(
        args.total_frames,
        args.frame_size.width,
        args.frame_size.height,
    )?;

    let deadzone_path = deadzone_path_for(&args.video);
    let store = DeadzoneStore::open(&deadzone_path)
        .with_context(|| format!("無法載入死區檔案: {}", deadzone_path.display()))?;
    let mut planner = MontagePlanner::new(config.settings, video, store);

    for interval in &args.additions {
        planner.add_deadzone(interval.start, Some(interval.end))?;
    }
    info!(
        "影片 {}：{} 影格，{} 個死區，可用 {} 影格",
        args.video.display(),
        video.total_frames,
        planner.deadzones().len(),
        planner.deadzones().available_frames(video.total_frames)
    );

    if args.algo_test {
        let comparison = planner.compare_strategies(&DEFAULT_SLOT_COUNTS)?;
        println!("{}", style("=== 分配演算法比較 ===").cyan().bold());
        for row in &comparison.rows {
            for (number, assignment) in [(1, &row.closed_form), (2, &row.exhaustive)] {
                println!(
                    "{}",
                    render_timeline(video.total_frames, planner.deadzones(), assignment.frames())
                );
                println!(
                    "{} 張 演算法 {number} 變異數 {:.4} 間距: {:?}",
                    row.slots,
                    assignment.gap_variance(),
                    assignment.gaps()
                );
            }
        }
        println!("\n{}", style(comparison.to_string()).green());
        return Ok(());
    }

    let plan = planner.plan()?;
    println!(
        "{}",
        style(format!("網格 {}（{} 張圖片）", plan.grid, plan.grid.slots()))
            .cyan()
            .bold()
    );
    println!(
        "{}",
        render_timeline(
            video.total_frames,
            planner.deadzones(),
            plan.assignment.frames()
        )
    );
    for (slot, frame) in plan.pairs() {
        println!("{slot}\t{frame}");
    }

    Ok(())
}
