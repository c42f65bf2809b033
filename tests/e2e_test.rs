//! 端對端測試 - 分配演算法比較
//!
//! 以單列網格、21 到 2 張圖片分別執行兩種演算法，比對勝負統計。

use video_montage::component::montage_planner::{
    DEFAULT_SLOT_COUNTS, MontagePlanner, VideoGeometry, Winner, render_timeline,
};
use video_montage::config::{Algorithm, UserSettings};
use video_montage::tools::{DeadzoneStore, Interval};

fn planner(total_frames: u64, deadzones: &[(u64, u64)]) -> MontagePlanner {
    let store =
        DeadzoneStore::from_intervals(deadzones.iter().map(|&(s, e)| Interval::new(s, e)));
    let geometry = VideoGeometry::new(total_frames, 1920, 1080).unwrap();
    MontagePlanner::new(UserSettings::default(), geometry, store)
}

#[test]
fn test_algo_comparison_single_deadzone_e2e() {
    let planner = planner(100, &[(40, 60)]);
    let comparison = planner.compare_strategies(&DEFAULT_SLOT_COUNTS).unwrap();

    assert_eq!(comparison.rows.len(), DEFAULT_SLOT_COUNTS.len());
    assert_eq!(
        comparison.rows.iter().map(|r| r.slots).collect::<Vec<_>>(),
        DEFAULT_SLOT_COUNTS.to_vec()
    );

    for row in &comparison.rows {
        for algorithm in Algorithm::ALL {
            let assignment = row.assignment(algorithm);
            assert_eq!(assignment.len(), row.slots);
            assert!(
                assignment
                    .frames()
                    .iter()
                    .all(|&f| !planner.deadzones().contains(f)),
                "{} 張、演算法 {algorithm} 仍有影格落在死區: {:?}",
                row.slots,
                assignment.frames()
            );
        }
    }

    let five = comparison.rows.iter().find(|r| r.slots == 5).unwrap();
    assert_eq!(five.winner(), Winner::Algorithm(Algorithm::ExhaustiveBalance));

    assert_eq!(comparison.wins(Algorithm::ClosedForm), 0);
    assert_eq!(comparison.wins(Algorithm::ExhaustiveBalance), 9);
    assert_eq!(comparison.ties(), 11);

    let report = comparison.to_string();
    assert!(report.ends_with("演算法 1 勝 0 次，演算法 2 勝 9 次，平手 11 次"));

    println!("{report}");
}

#[test]
fn test_algo_comparison_intro_outro_e2e() {
    let planner = planner(3000, &[(0, 120), (1400, 1460), (2850, 2999)]);
    let comparison = planner.compare_strategies(&DEFAULT_SLOT_COUNTS).unwrap();

    assert_eq!(comparison.wins(Algorithm::ClosedForm), 2);
    assert_eq!(comparison.wins(Algorithm::ExhaustiveBalance), 0);
    assert_eq!(comparison.ties(), 18);

    for row in &comparison.rows {
        let frames = row.exhaustive.frames();
        assert!(frames.iter().all(|&f| !planner.deadzones().contains(f)));
        assert_eq!(frames.first(), Some(&121));
        assert_eq!(frames.last(), Some(&2849));
    }
}

#[test]
fn test_timeline_of_compared_assignment_e2e() {
    let planner = planner(100, &[(40, 60)]);
    let comparison = planner.compare_strategies(&[5]).unwrap();
    let row = &comparison.rows[0];

    let timeline = render_timeline(100, planner.deadzones(), row.exhaustive.frames());
    assert_eq!(timeline.chars().count(), 100);
    assert_eq!(timeline.matches('x').count(), 5);
    assert_eq!(timeline.matches('#').count(), 21);
    assert!(!timeline.contains('X'));
}
