// 📏 Similarity Measures - character and token level comparisons of normalized keys
//
// `sequence_ratio` is the Ratcliff/Obershelp "gestalt" ratio: repeatedly take the
// longest common block, recurse on both sides, and score 2*M/T.

use std::collections::HashMap;

/// Sequences at least this long get popular elements pruned from the index
const AUTOJUNK_MIN_LEN: usize = 200;

/// Similarity ratio in [0, 1]; 1.0 means identical (two empty strings included)
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched: usize = SequenceMatcher::new(&a, &b)
        .matching_blocks()
        .iter()
        .map(|block| block.size)
        .sum();

    2.0 * matched as f64 / total as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchBlock {
    pub a_start: usize,
    pub b_start: usize,
    pub size: usize,
}

struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each element of `b`, ascending
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(j);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let threshold = n / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= threshold);
        }

        SequenceMatcher { a, b, b2j }
    }

    /// Longest matching block in a[alo..ahi] x b[blo..bhi]; earliest in `a`, then in `b`, wins ties
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchBlock {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0usize);

        // j2len[j] = length of the match ending at a[i-1], b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Extend across elements the index pruned as popular
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        MatchBlock {
            a_start: best_i,
            b_start: best_j,
            size: best_size,
        }
    }

    fn matching_blocks(&self) -> Vec<MatchBlock> {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let block = self.find_longest_match(alo, ahi, blo, bhi);
            if block.size == 0 {
                continue;
            }
            let (i, j, k) = (block.a_start, block.b_start, block.size);
            blocks.push(block);
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        blocks.sort();

        // Collapse adjacent blocks
        let mut collapsed: Vec<MatchBlock> = Vec::with_capacity(blocks.len());
        for block in blocks {
            match collapsed.last_mut() {
                Some(last)
                    if last.a_start + last.size == block.a_start
                        && last.b_start + last.size == block.b_start =>
                {
                    last.size += block.size;
                }
                _ => collapsed.push(block),
            }
        }
        collapsed
    }
}

/// Token cost for a same-length pair of token lists.
///
/// Exact token match costs 0, a trailing-"s" plural difference costs `plural_cost`,
/// anything else costs 1.0. Returns `None` when the token counts differ.
pub fn token_plural_cost(a: &str, b: &str, plural_cost: f64) -> Option<f64> {
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();

    if tokens_a.len() != tokens_b.len() {
        return None;
    }

    let cost = tokens_a
        .iter()
        .zip(tokens_b.iter())
        .map(|(ta, tb)| {
            if ta == tb {
                0.0
            } else if is_plural_pair(ta, tb) {
                plural_cost
            } else {
                1.0
            }
        })
        .sum();

    Some(cost)
}

fn is_plural_pair(a: &str, b: &str) -> bool {
    b.strip_suffix('s') == Some(a) || a.strip_suffix('s') == Some(b)
}
