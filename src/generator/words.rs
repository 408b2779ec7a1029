//! Embedded word lists used by the text generators.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Charles", "Karen", "Christopher", "Lisa", "Daniel", "Nancy", "Matthew", "Betty", "Anthony",
    "Margaret", "Mark", "Sandra", "Donald", "Ashley", "Steven", "Kimberly", "Paul", "Emily",
    "Andrew", "Donna", "Joshua", "Michelle", "Kenneth", "Carol", "Kevin", "Amanda", "Brian",
    "Melissa", "George", "Deborah", "Timothy", "Stephanie", "Ronald", "Rebecca", "Jason", "Laura",
    "Edward", "Sharon", "Jeffrey", "Cynthia", "Ryan", "Kathleen", "Jacob", "Amy", "Gary", "Angela",
    "Nicholas", "Shirley", "Eric", "Anna", "Jonathan", "Brenda", "Stephen", "Pamela", "Larry",
    "Emma", "Justin", "Nicole", "Scott", "Helen", "Brandon", "Samantha", "Benjamin", "Katherine",
];

pub const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson", "Walker", "Young", "Allen", "King", "Wright", "Scott",
    "Torres", "Nguyen", "Hill", "Flores", "Green", "Adams", "Nelson", "Baker", "Hall", "Rivera",
    "Campbell", "Mitchell", "Carter", "Roberts", "Gomez", "Phillips", "Evans", "Turner", "Diaz",
    "Parker", "Cruz", "Edwards", "Collins", "Reyes", "Stewart", "Morris", "Morales", "Murphy",
    "Cook", "Rogers", "Gutierrez", "Ortiz", "Morgan", "Cooper", "Peterson", "Bailey", "Reed",
];

pub const NAME_SUFFIXES: &[&str] = &["Jr", "Sr", "II", "III", "IV", "Esq", "PhD", "RN", ""];

pub const TITLES: &[&str] = &["Mr", "Mrs", "Ms", "Miss", "Dr", "Sir", "Dame", "Hon", ""];

pub const STREET_TYPES: &[&str] = &[
    "Lane", "Road", "Rd", "Ln", "Street", "St", "Way", "Place", "Pl", "",
];

pub const UNIT_TYPES: &[&str] = &["Apt.", "Apartment", "Unit", "Suite", "Room", "Rm."];

pub const BUSINESS_SUFFIXES: &[&str] = &[
    "Inc.",
    "LLC",
    "LLP",
    "Co.",
    "Ltd.",
    "Company",
    "Limited",
    "Incorporated",
    "Partners",
    "& Co.",
    "& Company",
    "Solutions",
    "Group",
    "& Associates",
    "",
];

pub const STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC", "PR", "VI", "AS", "GU", "MP",
];

pub const GENDERS: &[&str] = &[
    "Male",
    "Female",
    "Non-binary",
    "Transgender",
    "Intersex",
    "Agender",
    "Genderfluid",
    "Two-spirit",
    "Other",
    "Prefer not to say",
];

pub const EMAIL_TLDS: &[&str] = &["com", "net", "org", "gov", "mil", "co", "edu", "us", "biz"];

pub const WORDS: &[&str] = &[
    "amber", "anchor", "apple", "arrow", "aspen", "autumn", "badge", "bamboo", "banner", "basin",
    "beacon", "birch", "blossom", "bolt", "breeze", "brook", "cabin", "canyon", "cedar", "cliff",
    "clover", "comet", "copper", "coral", "crane", "crest", "crystal", "cypress", "dawn", "delta",
    "dune", "eagle", "echo", "ember", "falcon", "fern", "field", "flint", "forest", "fox",
    "garnet", "glacier", "granite", "grove", "harbor", "hawk", "hazel", "heron", "hollow",
    "horizon", "indigo", "iris", "island", "ivory", "jade", "juniper", "kestrel", "lake",
    "lantern", "laurel", "lemon", "lily", "maple", "marble", "meadow", "mesa", "willow", "mist",
    "moss", "neon", "north", "oak", "ocean", "olive", "onyx", "orchid", "otter", "pebble", "pine",
    "pioneer", "plain", "prairie", "quail", "quartz", "rain", "raven", "reed", "ridge", "river",
    "robin", "rock", "rose", "sage", "shadow", "shore", "sierra", "silver", "sky", "slate",
    "spring", "spruce", "star", "stone", "summit", "sun", "swift", "thistle", "thunder", "timber",
    "topaz", "trail", "tulip", "valley", "velvet", "violet", "vista", "walnut", "wave", "west",
    "wheat", "winter", "wolf", "wren", "yarrow", "zephyr",
];

const PLACE_PREFIXES: &[&str] = &[
    "Spring", "Oak", "Maple", "Cedar", "River", "Lake", "Green", "Fair", "Clear", "Rock",
    "Pine", "Bright", "Silver", "Elm", "Wood", "Stone", "Glen", "Bridge", "Ash", "Brook",
];

const PLACE_SUFFIXES: &[&str] = &[
    "field", "ville", "ton", "wood", "dale", "port", "view", "ford", "burg", "haven", "side",
    " Falls", " Heights", " Springs", " City", " Grove", "mont", "land",
];

/// Picks a uniformly random entry of a non-empty list.
pub fn pick<'a>(rng: &mut ChaCha8Rng, list: &[&'a str]) -> &'a str {
    list[rng.random_range(0..list.len())]
}

/// Capitalizes the first character of a word.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Builds a place name such as "Cedarville" or "Pine Falls".
pub fn place_name(rng: &mut ChaCha8Rng) -> String {
    let mut name = String::from(pick(rng, PLACE_PREFIXES));
    name.push_str(pick(rng, PLACE_SUFFIXES));
    if rng.random_range(0..8) == 0 {
        name = format!("{} {}", pick(rng, &["North", "South", "East", "West", "New"]), name);
    }
    name
}

/// Random string of ASCII digits of exactly `len` characters.
pub fn digits(rng: &mut ChaCha8Rng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_list_size() {
        assert_eq!(STATES.len(), 56);
        assert!(STATES.iter().all(|s| s.len() == 2));
    }

    #[test]
    fn test_digits_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let value = digits(&mut rng, 9);
        assert_eq!(value.len(), 9);
        assert!(value.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("maple"), "Maple");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_place_name_is_not_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(!place_name(&mut rng).is_empty());
        }
    }
}
