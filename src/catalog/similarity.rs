// Name similarity for "did you mean" suggestions

/// Levenshtein distance between two strings, two rows of the DP table at a time
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let (short, long) = if a_len < b_len { (a, b) } else { (b, a) };
    let short_chars: Vec<char> = short.chars().collect();

    let mut prev_row: Vec<usize> = (0..=short_chars.len()).collect();
    let mut curr_row = vec![0; short_chars.len() + 1];

    for (i, long_char) in long.chars().enumerate() {
        curr_row[0] = i + 1;
        for (j, &short_char) in short_chars.iter().enumerate() {
            let cost = if long_char == short_char { 0 } else { 1 };
            curr_row[j + 1] = (curr_row[j] + 1).min(prev_row[j + 1] + 1).min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[short_chars.len()]
}

/// Largest edit distance still worth suggesting for a name of `len` characters
fn max_suggestion_distance(len: usize) -> usize {
    (len / 3).max(1)
}

/// Closest candidate to `target` within the suggestion cutoff. Ties go to the
/// lexicographically smallest name.
pub fn most_similar<'a, I>(target: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let target_len = target.chars().count();
    let cutoff = max_suggestion_distance(target_len);
    candidates
        .into_iter()
        .map(|candidate| (levenshtein_distance(target, candidate), candidate))
        // rewriting the whole name is not a suggestion
        .filter(|&(distance, _)| distance <= cutoff && distance < target_len)
        .min()
        .map(|(_, candidate)| candidate)
}
