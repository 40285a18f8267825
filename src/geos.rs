// src/geos.rs

/// Postal abbreviation -> canonical full name, for the 50 states plus the
/// territories that show up in recall distribution lists.
pub const US_STATES: [(&str, &str); 54] = [
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
    ("PR", "Puerto Rico"),
    ("VI", "Virgin Islands"),
    ("GU", "Guam"),
];

const NEW_ENGLAND: &[&str] = &[
    "Connecticut",
    "Maine",
    "Massachusetts",
    "New Hampshire",
    "Rhode Island",
    "Vermont",
];

const NORTHEAST: &[&str] = &[
    "Connecticut",
    "Maine",
    "Massachusetts",
    "New Hampshire",
    "New Jersey",
    "New York",
    "Pennsylvania",
    "Rhode Island",
    "Vermont",
];

const MIDWEST: &[&str] = &[
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Michigan",
    "Minnesota",
    "Missouri",
    "Nebraska",
    "North Dakota",
    "Ohio",
    "South Dakota",
    "Wisconsin",
];

const SOUTH: &[&str] = &[
    "Alabama",
    "Arkansas",
    "Delaware",
    "Florida",
    "Georgia",
    "Kentucky",
    "Louisiana",
    "Maryland",
    "Mississippi",
    "North Carolina",
    "Oklahoma",
    "South Carolina",
    "Tennessee",
    "Texas",
    "Virginia",
    "West Virginia",
];

const WEST: &[&str] = &[
    "Alaska",
    "Arizona",
    "California",
    "Colorado",
    "Hawaii",
    "Idaho",
    "Montana",
    "Nevada",
    "New Mexico",
    "Oregon",
    "Utah",
    "Washington",
    "Wyoming",
];

const WEST_COAST: &[&str] = &["California", "Oregon", "Washington"];

const EAST_COAST: &[&str] = &[
    "Connecticut",
    "Delaware",
    "Florida",
    "Georgia",
    "Maine",
    "Maryland",
    "Massachusetts",
    "New Hampshire",
    "New Jersey",
    "New York",
    "North Carolina",
    "Rhode Island",
    "South Carolina",
    "Virginia",
];

/// Named multi-state regions, keyed by their lowercase name.
pub const REGIONS: [(&str, &[&str]); 7] = [
    ("new england", NEW_ENGLAND),
    ("northeast", NORTHEAST),
    ("midwest", MIDWEST),
    ("south", SOUTH),
    ("west", WEST),
    ("west coast", WEST_COAST),
    ("east coast", EAST_COAST),
];

pub fn state_name_for_abbr(abbr: &str) -> Option<&'static str> {
    US_STATES
        .iter()
        .find(|(a, _)| *a == abbr)
        .map(|(_, name)| *name)
}

/// Canonical full name for a user-supplied state, given either as a name
/// (any case) or a postal abbreviation (any case).
pub fn canonical_state(input: &str) -> Option<&'static str> {
    let input = input.trim();
    US_STATES
        .iter()
        .find(|(abbr, name)| abbr.eq_ignore_ascii_case(input) || name.eq_ignore_ascii_case(input))
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_region_member_is_a_known_state() {
        for (region, members) in REGIONS {
            for name in members {
                assert_eq!(canonical_state(name), Some(*name), "{name} in {region} is not a state");
            }
        }
    }

    #[test]
    fn abbreviation_lookup_is_case_sensitive() {
        assert_eq!(state_name_for_abbr("IN"), Some("Indiana"));
        assert_eq!(state_name_for_abbr("in"), None);
        assert_eq!(state_name_for_abbr("US"), None);
    }

    #[test]
    fn canonical_state_accepts_names_and_abbreviations() {
        assert_eq!(canonical_state("oh"), Some("Ohio"));
        assert_eq!(canonical_state(" new york "), Some("New York"));
        assert_eq!(canonical_state("Atlantis"), None);
    }
}
