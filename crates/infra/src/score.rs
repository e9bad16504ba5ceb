//! Set-score validation and match statistics.
//!
//! Everything here is pure so the same code rejects malformed submissions
//! before they are stored and recomputes standings on read without trusting
//! cached aggregates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultType {
    Normal,
    Walkover,
    Retirement,
    Injury,
}

/// One set as submitted: games won by each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    #[serde(rename = "teamA")]
    pub team_a: u32,
    #[serde(rename = "teamB")]
    pub team_b: u32,
}

impl SetScore {
    pub fn new(team_a: u32, team_b: u32) -> Self {
        Self { team_a, team_b }
    }
}

/// Scoring configuration for one category. All fields are clamped to safe
/// bounds on normalization so malformed stored config cannot crash validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoreRules {
    pub sets_to_win: u32,
    pub max_sets: u32,
    pub games_to_win_set: u32,
    /// Game count at which a classic tie-break is played; `None` disables
    /// tie-break scoring entirely (advantage sets only).
    pub tie_break_at: Option<u32>,
    pub tie_break_to: Option<u32>,
    pub allow_super_tie_break: bool,
    pub super_tie_break_to: u32,
    pub super_tie_break_win_by: u32,
    pub super_tie_break_only_decider: bool,
    pub allow_extended_games: bool,
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self {
            sets_to_win: 2,
            max_sets: 3,
            games_to_win_set: 6,
            tie_break_at: Some(6),
            tie_break_to: Some(7),
            allow_super_tie_break: true,
            super_tie_break_to: 10,
            super_tie_break_win_by: 2,
            super_tie_break_only_decider: true,
            allow_extended_games: false,
        }
    }
}

impl ScoreRules {
    /// Clamp every field into its safe range. `max_sets` is lifted to at
    /// least the minimum number of sets a `sets_to_win` match can take.
    pub fn clamped(mut self) -> Self {
        self.sets_to_win = self.sets_to_win.clamp(1, 5);
        let min_sets = self.sets_to_win * 2 - 1;
        self.max_sets = self.max_sets.clamp(self.sets_to_win, 9).max(min_sets).min(9);
        self.games_to_win_set = self.games_to_win_set.clamp(1, 9);
        self.tie_break_at = self.tie_break_at.map(|v| v.clamp(1, 12));
        self.tie_break_to = match self.tie_break_at {
            None => None,
            Some(at) => Some(self.tie_break_to.unwrap_or(at + 1).clamp(at + 1, 15)),
        };
        self.super_tie_break_to = self.super_tie_break_to.clamp(5, 20);
        self.super_tie_break_win_by = self.super_tie_break_win_by.clamp(1, 5);
        self
    }

    /// Parse rules from stored JSON, falling back to defaults for missing
    /// fields and clamping the rest. Never fails.
    pub fn from_json(raw: Option<&serde_json::Value>) -> Self {
        match raw {
            Some(value) => serde_json::from_value::<ScoreRules>(value.clone())
                .unwrap_or_default()
                .clamped(),
            None => Self::default(),
        }
    }
}

/// Derived numbers for one match. Recomputed on read, never stored as truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub sets: Vec<SetScore>,
    pub a_sets: u32,
    pub b_sets: u32,
    pub a_games: u32,
    pub b_games: u32,
    pub winner: Side,
    pub result_type: ResultType,
}

/// Parse a raw JSON score list, dropping entries that are not two
/// non-negative integers. `serialize` then `normalize_sets` round-trips any
/// valid list.
pub fn normalize_sets(raw: &serde_json::Value) -> Vec<SetScore> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let team_a = item.get("teamA")?.as_u64()?;
            let team_b = item.get("teamB")?.as_u64()?;
            Some(SetScore::new(u32::try_from(team_a).ok()?, u32::try_from(team_b).ok()?))
        })
        .collect()
}

fn winner_loser(set: &SetScore) -> (u32, u32) {
    (set.team_a.max(set.team_b), set.team_a.min(set.team_b))
}

fn is_valid_regular_set(set: &SetScore, rules: &ScoreRules) -> bool {
    let (winner, loser) = winner_loser(set);
    let diff = winner - loser;
    if winner < rules.games_to_win_set {
        return false;
    }
    if winner == rules.games_to_win_set {
        return diff >= 2;
    }
    // Advantage set: exactly one game past the target with a 2-game margin.
    if winner == rules.games_to_win_set + 1 && diff >= 2 {
        return true;
    }
    if let (Some(at), Some(to)) = (rules.tie_break_at, rules.tie_break_to) {
        if winner == to && loser == at {
            return true;
        }
    }
    if rules.allow_extended_games || rules.tie_break_at.is_none() || rules.tie_break_to.is_none() {
        return diff >= 2;
    }
    false
}

fn is_valid_super_tie_break(set: &SetScore, rules: &ScoreRules) -> bool {
    let (winner, loser) = winner_loser(set);
    winner >= rules.super_tie_break_to && winner - loser >= rules.super_tie_break_win_by
}

/// Validate an ordered set list against the rules and derive statistics.
///
/// Returns `None` for anything that is not a complete, well-formed match:
/// empty input, too many sets, tied sets, unrecognized set shapes, sets
/// played after the match was already decided, or neither side reaching
/// `sets_to_win`.
pub fn compute_match_stats(sets: &[SetScore], rules: &ScoreRules) -> Option<MatchStats> {
    if sets.is_empty() || sets.len() > rules.max_sets as usize {
        return None;
    }

    let mut a_sets = 0u32;
    let mut b_sets = 0u32;
    let mut a_games = 0u32;
    let mut b_games = 0u32;

    for (idx, set) in sets.iter().enumerate() {
        if set.team_a == set.team_b {
            return None;
        }
        let is_last = idx == sets.len() - 1;
        let super_allowed = rules.allow_super_tie_break
            && is_last
            && (!rules.super_tie_break_only_decider || a_sets == b_sets);
        let valid_super = super_allowed && is_valid_super_tie_break(set, rules);
        if !valid_super && !is_valid_regular_set(set, rules) {
            return None;
        }

        a_games += set.team_a;
        b_games += set.team_b;
        if set.team_a > set.team_b {
            a_sets += 1;
        } else {
            b_sets += 1;
        }

        // No extra sets once the match is decided.
        if (a_sets == rules.sets_to_win || b_sets == rules.sets_to_win) && !is_last {
            return None;
        }
    }

    if a_sets == b_sets {
        return None;
    }
    if a_sets != rules.sets_to_win && b_sets != rules.sets_to_win {
        return None;
    }

    let winner = if a_sets > b_sets { Side::A } else { Side::B };
    Some(MatchStats {
        sets: sets.to_vec(),
        a_sets,
        b_sets,
        a_games,
        b_games,
        winner,
        result_type: ResultType::Normal,
    })
}

/// Canonical clean score for a walkover: the winner takes `sets_to_win`
/// shutout sets at the nominal games-to-win. Used only for derived stats;
/// never persisted as the submitted score.
pub fn walkover_sets(winner: Side, rules: &ScoreRules) -> Vec<SetScore> {
    let count = rules.sets_to_win.max(1) as usize;
    let set = match winner {
        Side::A => SetScore::new(rules.games_to_win_set, 0),
        Side::B => SetScore::new(0, rules.games_to_win_set),
    };
    vec![set; count]
}

/// Resolve stats for a submitted result: raw sets first; when those do not
/// validate and the result carries a declared winner with a walkover-like
/// result type, synthesize the canonical score instead.
pub fn resolve_match_stats(
    sets: &[SetScore],
    result_type: ResultType,
    declared_winner: Option<Side>,
    rules: &ScoreRules,
) -> Option<MatchStats> {
    if let Some(stats) = compute_match_stats(sets, rules) {
        if result_type == ResultType::Normal {
            return Some(stats);
        }
        return Some(MatchStats { result_type, ..stats });
    }
    if result_type == ResultType::Normal {
        return None;
    }
    let winner = declared_winner?;
    let synthesized = walkover_sets(winner, rules);
    let stats = compute_match_stats(&synthesized, rules)?;
    Some(MatchStats { result_type, ..stats })
}
