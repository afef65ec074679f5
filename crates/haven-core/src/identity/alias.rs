//! Display alias generation.
//!
//! Aliases are display-only: `{Adjective}{Noun}{0-999}` from fixed word
//! lists. They carry no cryptographic meaning and collisions are
//! acceptable; the public commitment is the real identifier.

use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Silent", "Brave", "Gentle", "Wise", "Kind", "Strong", "Calm", "Bright",
];

const NOUNS: &[&str] = &[
    "Fox", "Wolf", "Eagle", "Bear", "Owl", "Lion", "Dove", "Hawk",
];

/// Generate a random display alias.
pub fn generate_alias() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    let number: u16 = rng.gen_range(0..1000);
    format!("{}{}{}", adjective, noun, number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_format() {
        for _ in 0..100 {
            let alias = generate_alias();
            let digits: String = alias.chars().filter(|c| c.is_ascii_digit()).collect();
            let number: u16 = digits.parse().expect("alias ends in a number");
            assert!(number < 1000);

            let word = &alias[..alias.len() - digits.len()];
            assert!(ADJECTIVES.iter().any(|a| word.starts_with(a)));
            assert!(NOUNS.iter().any(|n| word.ends_with(n)));
        }
    }
}
