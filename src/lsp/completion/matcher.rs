/// Case-insensitive fuzzy matcher for the identifier being typed.
///
/// Scores fall in `[0, 1]`: zero means the pattern is not a subsequence of
/// the candidate, one means an exact match. Matches on word starts and in
/// consecutive runs score higher.
#[derive(Clone, Debug)]
pub struct Matcher {
    pattern: Vec<char>,
}

fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

fn is_word_start(chars: &[char], idx: usize) -> bool {
    if idx == 0 {
        return true;
    }
    let (prev, cur) = (chars[idx - 1], chars[idx]);
    !prev.is_alphanumeric() || (prev.is_lowercase() && cur.is_uppercase()) || (!prev.is_numeric() && cur.is_numeric())
}

impl Matcher {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.chars().map(fold).collect(),
        }
    }

    pub fn score(&self, candidate: &str) -> f64 {
        if self.pattern.is_empty() {
            return 1.0;
        }
        let chars: Vec<char> = candidate.chars().collect();
        if chars.len() < self.pattern.len() {
            return 0.0;
        }
        if chars.len() == self.pattern.len() && chars.iter().map(|c| fold(*c)).eq(self.pattern.iter().copied()) {
            return 1.0;
        }

        let mut total = 0.0;
        let mut next = 0;
        let mut last: Option<usize> = None;
        for want in &self.pattern {
            let found = (next..chars.len())
                .filter(|idx| fold(chars[*idx]) == *want)
                .find(|idx| Some(*idx) == last.map(|l| l + 1) || is_word_start(&chars, *idx))
                .or_else(|| (next..chars.len()).find(|idx| fold(chars[*idx]) == *want));
            let Some(idx) = found else {
                return 0.0;
            };
            total += if Some(idx) == last.map(|l| l + 1) || is_word_start(&chars, idx) {
                1.0
            } else {
                0.5
            };
            last = Some(idx);
            next = idx + 1;
        }

        let coverage = self.pattern.len() as f64 / chars.len() as f64;
        let quality = total / self.pattern.len() as f64;
        // Strictly below an exact match.
        (quality * (0.7 + 0.3 * coverage)).min(0.99)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_rank_prefixes_over_scattered_matches() {
        let m = Matcher::new("pri");
        assert_eq!(m.score("Pri"), 1.0);
        let prefix = m.score("Println");
        let scattered = m.score("openReadIn");
        assert!(prefix > scattered, "{prefix} <= {scattered}");
        assert!(scattered > 0.0);
        assert_eq!(m.score("Close"), 0.0);
        assert_eq!(m.score("pr"), 0.0);
        assert_eq!(Matcher::new("").score("anything"), 1.0);
    }

    #[test]
    fn word_starts_count_as_strong_matches() {
        let m = Matcher::new("rf");
        assert!(m.score("readFile") > m.score("rafter"));
        assert!(Matcher::new("mi").score("make.int") > 0.0);
        assert!(Matcher::new("make").score("make.int") > 0.0);
    }
}
