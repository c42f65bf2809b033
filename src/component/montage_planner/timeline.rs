use crate::tools::DeadzoneStore;
use std::collections::HashMap;

const LIVE: char = '-';
const DEAD: char = '#';
const SELECTED: char = 'x';
const CONFLICT: char = 'X';

/// 以一個字元代表一個影格，畫出死區與被選取的影格
///
/// `-` 可用、`#` 死區、`x` 選取、`X` 選取但落在死區內或被重複選取。
/// 超出影片範圍的影格會被忽略。
#[must_use]
pub fn render_timeline(total_frames: u64, store: &DeadzoneStore, frames: &[u64]) -> String {
    let mut selected: HashMap<u64, usize> = HashMap::new();
    for &frame in frames.iter().filter(|&&f| f < total_frames) {
        *selected.entry(frame).or_default() += 1;
    }

    (0..total_frames)
        .map(|frame| {
            let dead = store.contains(frame);
            match selected.get(&frame) {
                Some(&count) if dead || count > 1 => CONFLICT,
                Some(_) => SELECTED,
                None if dead => DEAD,
                None => LIVE,
            }
        })
        .collect()
}
