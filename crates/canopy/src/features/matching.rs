use super::{Descriptor, Match};

/// Number of differing bits between two descriptors.
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Index and distance of the nearest descriptor in `pool`; ties go to the
/// lowest index.
fn nearest(d: &Descriptor, pool: &[Descriptor]) -> Option<(usize, u32)> {
    let mut best: Option<(usize, u32)> = None;
    for (i, p) in pool.iter().enumerate() {
        let dist = hamming_distance(d, p);
        match best {
            Some((_, b)) if dist >= b => {}
            _ => best = Some((i, dist)),
        }
    }
    best
}

/// Brute-force mutual nearest-neighbour matching under Hamming distance.
///
/// A pair `(q, t)` is kept only when `t` is the nearest train descriptor of
/// `q` and `q` is the nearest query descriptor of `t`. The result is sorted
/// ascending by distance; equal distances keep query order.
pub fn match_cross_checked(query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
    if query.is_empty() || train.is_empty() {
        return Vec::new();
    }

    let backward: Vec<usize> = train
        .iter()
        .filter_map(|t| nearest(t, query).map(|(i, _)| i))
        .collect();

    let mut matches: Vec<Match> = query
        .iter()
        .enumerate()
        .filter_map(|(q, d)| {
            let (t, distance) = nearest(d, train)?;
            (backward[t] == q).then_some(Match {
                query_idx: q,
                train_idx: t,
                distance,
            })
        })
        .collect();
    matches.sort_by_key(|m| m.distance);
    matches
}
