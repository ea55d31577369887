use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{
    errors::ValidationError,
    models::{Player, RawScore, SessionSubmission, ValidatedSession, ROUND_OFFSET},
};

/// Amount by which a session misses its required total of `-100 * round`
pub fn session_imbalance(scores: impl IntoIterator<Item = i64>, round: i32) -> i64 {
    let total: i128 = scores.into_iter().map(i128::from).sum::<i128>()
        + i128::from(ROUND_OFFSET) * i128::from(round);
    i64::try_from(total).unwrap_or(if total > 0 { i64::MAX } else { i64::MIN })
}

/// Parses a typed score. Only an optional minus sign followed by digits is accepted.
pub fn parse_score(raw: &RawScore) -> Option<i64> {
    match raw {
        RawScore::Number(value) => Some(*value),
        RawScore::Text(text) => {
            let digits = text.strip_prefix('-').unwrap_or(text);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            text.parse().ok()
        }
    }
}

/// Checks a submission against the known players. Rules run in order and the
/// first failure is returned.
pub fn validate(
    submission: &SessionSubmission,
    players: &[Player],
    max_rounds: i32,
) -> Result<ValidatedSession, ValidationError> {
    let round = match submission.round {
        Some(round) if round > 0 => round,
        _ => return Err(ValidationError::RoundNotSelected),
    };
    if round > max_rounds {
        return Err(ValidationError::RoundOutOfRange {
            round,
            max: max_rounds,
        });
    }

    if submission.scores.is_empty() {
        return Err(ValidationError::NoParticipants);
    }

    let by_id: HashMap<&str, &Player> = players.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut seen = HashSet::new();
    let mut participants = Vec::with_capacity(submission.scores.len());
    for input in &submission.scores {
        let player = by_id
            .get(input.player_id.as_str())
            .ok_or_else(|| ValidationError::UnknownPlayer(input.player_id.clone()))?;
        if !seen.insert(player.id.as_str()) {
            return Err(ValidationError::DuplicatePlayer(player.name.clone()));
        }
        participants.push((*player, input));
    }

    let mut scores = Vec::with_capacity(participants.len());
    for (player, input) in participants {
        let score = input
            .score
            .as_ref()
            .and_then(parse_score)
            .ok_or_else(|| ValidationError::InvalidScore {
                player: player.name.clone(),
            })?;
        scores.push((player.id.clone(), score));
    }

    let imbalance = session_imbalance(scores.iter().map(|(_, score)| *score), round);
    if imbalance != 0 {
        debug!(imbalance, round, "Rejecting unbalanced session");
        return Err(ValidationError::Unbalanced { imbalance });
    }

    Ok(ValidatedSession { round, scores })
}
