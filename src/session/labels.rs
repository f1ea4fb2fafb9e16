// src/session/labels.rs
// =============================================================================
// Human readable names for generations.
//
//   -1 -> "profile"   (nothing expanded yet)
//    0 -> "parent"
//    1 -> "grand parent"
//    2 -> "great grandparent"
//    3 -> "2nd great grandparent"
//   13 -> "12th great grandparent"
// =============================================================================

/// Stage shown before the first wave has been labelled
pub const DEFAULT_STAGE: &str = "parent's family";

pub fn generation_label(generation: i64) -> String {
    match generation {
        g if g < 0 => "profile".to_string(),
        0 => "parent".to_string(),
        1 => "grand parent".to_string(),
        2 => "great grandparent".to_string(),
        g => format!("{} great grandparent", ordinal(g - 1)),
    }
}

/// The stage label shown while a generation is being crawled
pub fn stage_label(generation: i64) -> String {
    format!("{}'s family", generation_label(generation))
}

/// Label attached to a generation's ancestor count
pub fn count_label(generation: i64) -> String {
    format!("{}s", generation_label(generation))
}

// English ordinal: 1st, 2nd, 3rd, 4th ... 11th, 12th, 13th ... 21st, 22nd
fn ordinal(n: i64) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}
