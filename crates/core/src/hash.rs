//! Consistent hashing for rollouts and variant selection
//!
//! Buckets must be stable across processes, hosts and restarts because
//! they determine user cohorts: the same `(flag, user)` pair always
//! lands in the same bucket. MurmurHash3 (x86, 32-bit, seed 0) is the
//! reference hash; changing it would silently reshuffle every cohort.

use murmurhash3::murmurhash3_x86_32;

/// Number of rollout buckets.
pub const BUCKET_COUNT: u32 = 100;

fn hash(input: &str) -> u32 {
    murmurhash3_x86_32(input.as_bytes(), 0)
}

/// Bucket in `[0, 100)` for a `(flag, user)` pair.
pub fn bucket(flag_key: &str, user_id: &str) -> u32 {
    hash(&format!("{flag_key}:{user_id}")) % BUCKET_COUNT
}

/// Whether a user falls inside a percentage rollout.
///
/// `percentage <= 0` excludes everyone and `percentage >= 100` includes
/// everyone without consulting the hash.
pub fn is_in_percentage(flag_key: &str, user_id: &str, percentage: f64) -> bool {
    if percentage <= 0.0 {
        return false;
    }
    if percentage >= 100.0 {
        return true;
    }
    f64::from(bucket(flag_key, user_id)) < percentage
}

/// Uniformly select a variant for a user.
///
/// Zero variants yield the empty string; a single variant is returned
/// directly.
pub fn select_variant(flag_key: &str, user_id: &str, variants: &[String]) -> String {
    match variants.len() {
        0 => String::new(),
        1 => variants[0].clone(),
        len => {
            let index = hash(&format!("{flag_key}:variant:{user_id}")) as usize % len;
            variants[index].clone()
        }
    }
}

/// Select a variant according to relative weights.
///
/// Falls back to uniform selection when the weight list does not match
/// the variant list or no weight is positive. Non-positive weights are
/// skipped in the cumulative walk; the last positive-weight variant
/// absorbs any remainder.
pub fn select_weighted_variant(
    flag_key: &str,
    user_id: &str,
    variants: &[String],
    weights: &[i64],
) -> String {
    if variants.is_empty() {
        return String::new();
    }

    let total: i64 = weights.iter().filter(|weight| **weight > 0).sum();
    if variants.len() != weights.len() || total <= 0 {
        return select_variant(flag_key, user_id, variants);
    }

    let position = i64::from(hash(&format!("{flag_key}:variant:{user_id}"))) % total;

    let mut cumulative = 0;
    let mut last_positive = &variants[0];
    for (variant, weight) in variants.iter().zip(weights) {
        if *weight <= 0 {
            continue;
        }
        cumulative += weight;
        last_positive = variant;
        if position < cumulative {
            return variant.clone();
        }
    }
    last_positive.clone()
}
