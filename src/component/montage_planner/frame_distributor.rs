//! 影格分配
//!
//! 先把圖片平均分散在影格範圍內，再找出落在死區中的圖片，
//! 依左右兩側的密度決定移往哪一側，並對兩側分別遞迴重新分配。

use super::move_strategy::{MoveSplitStrategy, SplitProblem};
use crate::config::{Algorithm, CandidateScan};
use crate::error::{MontageError, Result};
use crate::tools::{DeadzoneStore, Interval};
use log::{debug, trace};

/// 一次完整分配的結果：每個圖片格位對應的影格
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotAssignment {
    frames: Vec<u64>,
    /// 最後放置該格位的遞迴呼叫編號（1 為最上層）
    zones: Vec<u32>,
}

impl SlotAssignment {
    /// 由現成的影格清單建立，所有格位視為最上層放置
    #[must_use]
    pub fn from_frames(frames: Vec<u64>) -> Self {
        let zones = vec![1; frames.len()];
        Self { frames, zones }
    }

    #[must_use]
    pub fn frames(&self) -> &[u64] {
        &self.frames
    }

    #[must_use]
    pub fn zones(&self) -> &[u32] {
        &self.zones
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn frame(&self, slot: usize) -> Option<u64> {
        self.frames.get(slot).copied()
    }

    /// `(格位, 影格)` 清單，交給擷取與拼接流程
    pub fn pairs(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.frames.iter().copied().enumerate()
    }

    /// 相鄰兩張圖片之間略過的影格數
    #[must_use]
    pub fn gaps(&self) -> Vec<i64> {
        self.frames
            .windows(2)
            .map(|pair| pair[1] as i64 - pair[0] as i64 - 1)
            .collect()
    }

    /// 間距的母體變異數，越小代表分配越平均
    #[must_use]
    pub fn gap_variance(&self) -> f64 {
        let gaps = self.gaps();
        if gaps.is_empty() {
            return 0.0;
        }
        let count = gaps.len() as f64;
        let mean = gaps.iter().map(|&g| g as f64).sum::<f64>() / count;
        gaps.iter().map(|&g| (g as f64 - mean).powi(2)).sum::<f64>() / count
    }

    #[must_use]
    pub fn into_frames(self) -> Vec<u64> {
        self.frames
    }
}

/// 影格分配器
///
/// 每次 [`run`](Self::run) 都使用自己的狀態，分配期間只讀取死區集合。
#[derive(Debug, Clone, Copy)]
pub struct FrameDistributor<'a> {
    store: &'a DeadzoneStore,
    algorithm: Algorithm,
    scan: CandidateScan,
}

impl<'a> FrameDistributor<'a> {
    #[must_use]
    pub fn new(store: &'a DeadzoneStore, algorithm: Algorithm) -> Self {
        Self {
            store,
            algorithm,
            scan: CandidateScan::default(),
        }
    }

    #[must_use]
    pub const fn with_candidate_scan(mut self, scan: CandidateScan) -> Self {
        self.scan = scan;
        self
    }

    /// 將 `slots` 張圖片分配到 `0..total_frames` 的影格上
    ///
    /// # Errors
    ///
    /// 影格數為 0 時回傳 [`MontageError::Configuration`]；
    /// 死區兩側都沒有空間時回傳 [`MontageError::UnsatisfiableLayout`]。
    pub fn run(&self, total_frames: u64, slots: usize) -> Result<SlotAssignment> {
        if total_frames == 0 {
            return Err(MontageError::configuration("影格數必須大於 0"));
        }
        if slots == 0 {
            return Ok(SlotAssignment::default());
        }

        let last_frame = total_frames - 1;
        let mut context = DistributionContext {
            store: self.store,
            strategy: self.algorithm.strategy(),
            scan: self.scan,
            last_frame,
            frames: vec![last_frame; slots],
            zones: vec![1; slots],
            zone_counter: 0,
        };
        context.distribute(0, last_frame, 0, slots - 1)?;

        debug!(
            "演算法 {} 分配完成（{} 次遞迴）: {:?}",
            self.algorithm, context.zone_counter, context.frames
        );
        Ok(SlotAssignment {
            frames: context.frames,
            zones: context.zones,
        })
    }
}

/// 一次 `distribute` 呼叫的回報，供上層修正另一側的邊界
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Walk {
    /// 第一個非零的影格位移
    jump: i64,
    /// 每張圖片間隔的影格數
    step: f64,
}

/// 某個死區對範圍內圖片的分類結果
#[derive(Debug, Clone, Copy)]
struct Census {
    images_left: usize,
    images_right: usize,
    dead_count: usize,
    last_left: Option<usize>,
    first_dead: usize,
    last_dead: usize,
}

/// 單次分配的狀態，於遞迴間傳遞
struct DistributionContext<'a> {
    store: &'a DeadzoneStore,
    strategy: &'static dyn MoveSplitStrategy,
    scan: CandidateScan,
    last_frame: u64,
    frames: Vec<u64>,
    zones: Vec<u32>,
    zone_counter: u32,
}

impl DistributionContext<'_> {
    /// 在 `frame_start..frame_end` 間分配 `slot_start..slot_end` 的圖片
    ///
    /// 兩端都可以是遞減方向。
    fn distribute(
        &mut self,
        frame_start: u64,
        frame_end: u64,
        slot_start: usize,
        slot_end: usize,
    ) -> Result<Walk> {
        self.zone_counter += 1;
        let zone = self.zone_counter;
        trace!("[{zone}] 影格 {frame_start}->{frame_end}，圖片 {slot_start}->{slot_end}");

        let walk = if slot_start == slot_end {
            self.recenter(frame_start, frame_end, slot_start, zone)
        } else {
            self.spread(frame_start, frame_end, slot_start, slot_end, zone)
        };
        trace!("[{zone}] 平均分配後: {:?}", self.frames);

        let (min_frame, max_frame) = (frame_start.min(frame_end), frame_start.max(frame_end));
        let (min_slot, max_slot) = (slot_start.min(slot_end), slot_start.max(slot_end));
        let center = (frame_start + frame_end) / 2;

        match self.find_occupied_deadzone(min_frame, max_frame, center, min_slot, max_slot) {
            Some((dead, census)) => {
                self.rehome(dead, census, min_frame, max_frame, min_slot, max_slot)?;
            }
            None => trace!("[{zone}] {min_frame}:{max_frame} 內沒有需要移動的圖片"),
        }

        trace!(
            "[{zone}] 結束 {min_frame}:{max_frame} jump={} step={:.2}",
            walk.jump, walk.step
        );
        Ok(walk)
    }

    /// 單張圖片移到範圍中點；位於整段影片端點且不在死區內時保持不動
    fn recenter(&mut self, frame_start: u64, frame_end: u64, slot: usize, zone: u32) -> Walk {
        let current = self.frames[slot];
        let at_endpoint = current == 0 || current == self.last_frame;
        if at_endpoint && !self.store.contains(current) {
            trace!("圖片 {slot} 位於端點 {current}，保持不動");
            return Walk::default();
        }

        let target = (frame_start + frame_end + 1) / 2;
        self.frames[slot] = target;
        self.zones[slot] = zone;
        trace!("圖片 {slot}: {current} -> {target}（{frame_start}:{frame_end} 的中點）");
        Walk {
            jump: target as i64 - current as i64,
            step: 0.0,
        }
    }

    /// 從 `slot_start` 往 `slot_end` 等距分配，`slot_end` 本身已在範圍邊界上
    fn spread(
        &mut self,
        frame_start: u64,
        frame_end: u64,
        slot_start: usize,
        slot_end: usize,
        zone: u32,
    ) -> Walk {
        let step = (frame_end as f64 - frame_start as f64) / (slot_end as f64 - slot_start as f64);
        let slots: Vec<usize> = if slot_start < slot_end {
            (slot_start..slot_end).collect()
        } else {
            ((slot_end + 1)..=slot_start).rev().collect()
        };

        let mut walk = Walk { jump: 0, step };
        for slot in slots {
            let offset = slot as f64 - slot_start as f64;
            let frame = (frame_start as f64 + offset * step + 0.5).floor() as u64;
            let previous = self.frames[slot];
            if walk.jump == 0 {
                walk.jump = frame as i64 - previous as i64;
            }
            trace!("圖片 {slot}: {previous} -> {frame}");
            self.frames[slot] = frame;
            self.zones[slot] = zone;
        }
        walk
    }

    /// 依優先順序找出第一個含有圖片的死區
    ///
    /// 優先順序：長度大者優先，其次是中點離範圍中心較近者。
    fn find_occupied_deadzone(
        &self,
        min_frame: u64,
        max_frame: u64,
        center: u64,
        min_slot: usize,
        max_slot: usize,
    ) -> Option<(Interval, Census)> {
        let mut candidates: Vec<Interval> = self.store.intersecting(min_frame, max_frame).collect();
        candidates.sort_by(|a, b| {
            b.len().cmp(&a.len()).then_with(|| {
                a.midpoint()
                    .abs_diff(center)
                    .cmp(&b.midpoint().abs_diff(center))
            })
        });

        let limit = match self.scan {
            CandidateScan::FirstOccupied => candidates.len(),
            CandidateScan::LargestOnly => 1,
        };
        candidates.into_iter().take(limit).find_map(|dead| {
            trace!("檢查死區 {dead}");
            self.census(dead, min_slot, max_slot).map(|census| (dead, census))
        })
    }

    /// 依目前影格把圖片分成死區左側、死區內、死區右側；死區內沒有圖片時回傳 None
    fn census(&self, dead: Interval, min_slot: usize, max_slot: usize) -> Option<Census> {
        let mut images_left = 0;
        let mut images_right = 0;
        let mut dead_count = 0;
        let mut last_left = None;
        let mut first_dead = None;
        let mut last_dead = None;

        for slot in min_slot..=max_slot {
            let frame = self.frames[slot];
            if frame < dead.start {
                images_left += 1;
                last_left = Some(slot);
            } else if frame <= dead.end {
                dead_count += 1;
                first_dead.get_or_insert(slot);
                last_dead = Some(slot);
            } else {
                images_right += 1;
            }
        }
        debug!("死區 {dead}: 左側 {images_left} 張、死區內 {dead_count} 張、右側 {images_right} 張");

        let (first_dead, last_dead) = first_dead.zip(last_dead)?;
        Some(Census {
            images_left,
            images_right,
            dead_count,
            last_left,
            first_dead,
            last_dead,
        })
    }

    /// 將死區內的圖片移到兩側並重新分配
    fn rehome(
        &mut self,
        dead: Interval,
        census: Census,
        min_frame: u64,
        max_frame: u64,
        min_slot: usize,
        max_slot: usize,
    ) -> Result<()> {
        // 以原始影格距離計算，不扣除其他死區
        let spaces_left = dead.start.saturating_sub(min_frame);
        let spaces_right = max_frame.saturating_sub(dead.end);

        let move_left = match (spaces_left > 0, spaces_right > 0) {
            (true, true) => {
                let problem = SplitProblem {
                    dead_count: census.dead_count,
                    images_left: census.images_left,
                    images_right: census.images_right,
                    spaces_left,
                    spaces_right,
                };
                self.strategy
                    .choose_move_split(&problem)
                    .min(census.dead_count)
            }
            (true, false) => census.dead_count,
            (false, true) => 0,
            (false, false) => {
                return Err(MontageError::UnsatisfiableLayout {
                    start: dead.start,
                    end: dead.end,
                });
            }
        };
        let move_right = census.dead_count - move_left;
        debug!(
            "重新安置死區 {dead} 的 {} 張圖片: 左移 {move_left}、右移 {move_right}（左側空間 {spaces_left}、右側空間 {spaces_right}）",
            census.dead_count
        );

        if move_left > 0 {
            let left_boundary = census.last_left.map_or(census.first_dead, |slot| slot + 1);
            self.distribute(
                dead.start - 1,
                min_frame,
                left_boundary + move_left - 1,
                min_slot,
            )?;
        }

        let right_start = (census.last_dead + 1)
            .saturating_sub(move_right)
            .max(min_slot);
        let has_right_work = move_right > 0 || census.images_right > 0;
        if has_right_work && spaces_right > 0 && right_start <= max_slot {
            let right = self.distribute(dead.end + 1, max_frame, right_start, max_slot)?;

            // 左側沒有移入圖片時，依右側實際的位移重新對齊左側
            if move_left == 0 && spaces_left > 0 {
                if let Some(last_left) = census.last_left {
                    self.realign_left(dead, right, min_frame, min_slot, last_left)?;
                }
            }
        }
        Ok(())
    }

    /// 以右側第一張圖片的位置推算左側的新邊界，再重新分配左側
    fn realign_left(
        &mut self,
        dead: Interval,
        right: Walk,
        min_frame: u64,
        min_slot: usize,
        last_left: usize,
    ) -> Result<()> {
        let upper = dead.start - 1;
        let estimate = (dead.end as f64 + 1.0 - right.step
            + self.frames[last_left] as f64
            + right.jump as f64)
            / 2.0;
        let estimate = (estimate + 0.5).floor();

        let mut boundary = if estimate <= min_frame as f64 {
            min_frame
        } else {
            (estimate as u64).min(upper)
        };
        if self.store.count_available(min_frame, boundary) == 0 {
            boundary = upper;
        }
        debug!(
            "重新對齊左側: 邊界 {boundary}（右側 jump={} step={:.2}，圖片 {min_slot}..={last_left}）",
            right.jump, right.step
        );

        self.distribute(boundary, min_frame, last_left, min_slot)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(intervals: &[(u64, u64)]) -> DeadzoneStore {
        DeadzoneStore::from_intervals(intervals.iter().map(|&(s, e)| Interval::new(s, e)))
    }

    fn run(store: &DeadzoneStore, algorithm: Algorithm, total: u64, slots: usize) -> Vec<u64> {
        FrameDistributor::new(store, algorithm)
            .run(total, slots)
            .unwrap()
            .into_frames()
    }

    #[test]
    fn test_even_spacing_without_deadzones() {
        let empty = DeadzoneStore::new();
        for algorithm in Algorithm::ALL {
            // 99 / 4 * 3 = 74.25，四捨五入為 74
            assert_eq!(run(&empty, algorithm, 100, 5), vec![0, 25, 50, 74, 99]);
        }
    }

    #[test]
    fn test_exhaustive_moves_dead_slot_left() {
        let store = store(&[(40, 60)]);
        let frames = run(&store, Algorithm::ExhaustiveBalance, 100, 5);
        assert_eq!(frames, vec![0, 20, 39, 61, 99]);
    }

    #[test]
    fn test_closed_form_moves_right_then_realigns_left() {
        let store = store(&[(40, 60)]);
        let frames = run(&store, Algorithm::ClosedForm, 100, 5);
        assert_eq!(frames, vec![0, 39, 61, 80, 99]);
    }

    #[test]
    fn test_full_range_deadzone_is_unsatisfiable() {
        let store = store(&[(0, 99)]);
        let result = FrameDistributor::new(&store, Algorithm::ExhaustiveBalance).run(100, 5);
        assert!(matches!(
            result,
            Err(MontageError::UnsatisfiableLayout { start: 0, end: 99 })
        ));
    }

    #[test]
    fn test_deadzone_past_end_of_video() {
        let store = store(&[(50, u64::MAX)]);
        for algorithm in Algorithm::ALL {
            assert_eq!(run(&store, algorithm, 100, 4), vec![0, 16, 33, 49]);
        }
    }

    #[test]
    fn test_dead_last_frame_is_not_pinned() {
        let store = store(&[(90, 99)]);
        let frames = run(&store, Algorithm::ExhaustiveBalance, 100, 5);
        assert_eq!(frames, vec![0, 22, 45, 67, 89]);
    }

    #[test]
    fn test_candidate_scan_variants() {
        // 最大的死區 30:45 內沒有圖片，較小的 73:76 內有一張
        let store = store(&[(30, 45), (73, 76)]);
        let distributor = FrameDistributor::new(&store, Algorithm::ExhaustiveBalance);

        let largest_only = distributor
            .with_candidate_scan(CandidateScan::LargestOnly)
            .run(100, 5)
            .unwrap();
        assert_eq!(largest_only.frames(), &[0, 25, 50, 74, 99]);

        let first_occupied = distributor.run(100, 5).unwrap();
        assert_eq!(first_occupied.frames(), &[0, 24, 48, 72, 99]);
        assert!(first_occupied.frames().iter().all(|&f| !store.contains(f)));
    }

    #[test]
    fn test_zone_ids_follow_recursive_calls() {
        let store = store(&[(40, 60)]);
        let assignment = FrameDistributor::new(&store, Algorithm::ExhaustiveBalance)
            .run(100, 5)
            .unwrap();
        // 1: 最上層，2: 左側，3: 右側
        assert_eq!(assignment.zones(), &[1, 2, 2, 3, 1]);
    }

    #[test]
    fn test_deterministic() {
        let store = store(&[(5, 9), (40, 60), (200, 260)]);
        for algorithm in Algorithm::ALL {
            let first = run(&store, algorithm, 300, 12);
            let second = run(&store, algorithm, 300, 12);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_monotonic_without_deadzones() {
        let empty = DeadzoneStore::new();
        for total in [2, 7, 100, 1001] {
            for slots in 1..=20 {
                let frames = run(&empty, Algorithm::ExhaustiveBalance, total, slots);
                assert!(frames.windows(2).all(|w| w[0] <= w[1]), "{total}/{slots}: {frames:?}");
                assert_eq!(frames.last(), Some(&(total - 1)));
            }
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let empty = DeadzoneStore::new();
        let distributor = FrameDistributor::new(&empty, Algorithm::ClosedForm);
        assert!(distributor.run(100, 0).unwrap().is_empty());
        assert_eq!(distributor.run(100, 1).unwrap().frames(), &[99]);
        assert!(matches!(
            distributor.run(0, 5),
            Err(MontageError::Configuration { .. })
        ));
    }

    #[test]
    fn test_slot_assignment_gaps() {
        let even = SlotAssignment::from_frames(vec![0, 10, 20, 30]);
        assert_eq!(even.gaps(), vec![9, 9, 9]);
        assert!(even.gap_variance().abs() < f64::EPSILON);

        let uneven = SlotAssignment::from_frames(vec![0, 5, 20]);
        assert_eq!(uneven.gaps(), vec![4, 14]);
        assert!((uneven.gap_variance() - 25.0).abs() < 1e-9);
        assert_eq!(
            uneven.pairs().collect::<Vec<_>>(),
            vec![(0, 0), (1, 5), (2, 20)]
        );
        assert_eq!(uneven.frame(2), Some(20));
        assert_eq!(uneven.frame(3), None);
    }
}
