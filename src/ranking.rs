//! Display ordering of scored customers.
//!
//! # Algorithm
//!
//! Three-way partition quicksort, descending:
//!
//! 1. Pivot on the middle element of the current slice.
//! 2. Split into `{score > pivot}`, `{score == pivot}`, `{score < pivot}`.
//! 3. Recurse on the two strict partitions only; emit
//!    `greater + equal + lesser`.
//!
//! Items with equal scores keep their input relative order, so callers
//! control tie-breaking through the order they pass in.
//!
//! # Complexity
//! Average O(n log n). Worst case O(n²) when every pivot is an extremum
//! (distinct, adversarially ordered scores). The input is bounded by the
//! people physically waiting at one counter.

/// Ranks `(id, score)` pairs, highest score first.
///
/// # Example
/// ```
/// use walkin_queue::ranking::rank;
///
/// let order = rank(&[("a", 5), ("b", 5), ("c", 9), ("d", 1)]);
/// assert_eq!(order, vec!["c", "a", "b", "d"]);
/// ```
pub fn rank<K: Clone>(items: &[(K, i64)]) -> Vec<K> {
    rank_by(items.to_vec(), |(_, score)| *score)
        .into_iter()
        .map(|(id, _)| id)
        .collect()
}

/// Ranks arbitrary values by the score `score_of` extracts.
pub fn rank_by<T, F>(items: Vec<T>, score_of: F) -> Vec<T>
where
    F: Fn(&T) -> i64 + Copy,
{
    if items.len() <= 1 {
        return items;
    }

    let pivot = score_of(&items[items.len() / 2]);
    let mut greater = Vec::new();
    let mut equal = Vec::new();
    let mut lesser = Vec::new();

    for item in items {
        let score = score_of(&item);
        if score > pivot {
            greater.push(item);
        } else if score == pivot {
            equal.push(item);
        } else {
            lesser.push(item);
        }
    }

    let mut ranked = rank_by(greater, score_of);
    ranked.extend(equal);
    ranked.extend(rank_by(lesser, score_of));
    ranked
}
