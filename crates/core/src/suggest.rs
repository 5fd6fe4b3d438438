// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Edit-distance suggestions for "command not found" errors (§4.4, §7).

/// Returns up to `limit` candidates from `known` ordered by increasing
/// Levenshtein distance to `name`, excluding exact matches and anything
/// further than half of `name`'s length away.
pub fn suggest<'a>(name: &str, known: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let max_distance = (name.len() / 2).max(1);
    let mut scored: Vec<(usize, &str)> = known
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (levenshtein(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= max_distance)
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            let deletion = row[j] + 1;
            let insertion = row[j + 1] + 1;
            let substitution = prev_diag + cost;
            prev_diag = row[j + 1];
            row[j + 1] = deletion.min(insertion).min(substitution);
        }
    }
    row[b.len()]
}
