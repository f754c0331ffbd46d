//! Adjacent-swap reordering for user-ordered lists.

use serde::{Deserialize, Serialize};

/// Direction for a single-step move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Swaps `items[index]` with its neighbour in `direction`.
///
/// Returns `false` (and leaves the slice untouched) at either boundary or
/// when `index` is out of range.
pub fn move_adjacent<T>(items: &mut [T], index: usize, direction: MoveDirection) -> bool {
    if index >= items.len() {
        return false;
    }
    let target = match direction {
        MoveDirection::Up => match index.checked_sub(1) {
            Some(target) => target,
            None => return false,
        },
        MoveDirection::Down => index + 1,
    };
    if target >= items.len() {
        return false;
    }
    items.swap(index, target);
    true
}

#[cfg(test)]
mod tests {
    use super::{move_adjacent, MoveDirection};

    #[test]
    fn swaps_with_neighbour() {
        let mut items = vec!['a', 'b', 'c'];
        assert!(move_adjacent(&mut items, 1, MoveDirection::Up));
        assert_eq!(items, vec!['b', 'a', 'c']);
        assert!(move_adjacent(&mut items, 1, MoveDirection::Down));
        assert_eq!(items, vec!['b', 'c', 'a']);
    }

    #[test]
    fn boundaries_are_no_ops() {
        let mut items = vec![1, 2];
        assert!(!move_adjacent(&mut items, 0, MoveDirection::Up));
        assert!(!move_adjacent(&mut items, 1, MoveDirection::Down));
        assert!(!move_adjacent(&mut items, 7, MoveDirection::Down));
        assert_eq!(items, vec![1, 2]);
    }
}
