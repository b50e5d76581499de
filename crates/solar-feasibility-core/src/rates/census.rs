/// US Census division for a two-letter state code. Unknown codes map to
/// "Pacific".
pub fn census_division(state: &str) -> &'static str {
    match state.trim().to_ascii_uppercase().as_str() {
        "CT" | "ME" | "MA" | "NH" | "RI" | "VT" => "New England",
        "NJ" | "NY" | "PA" => "Middle Atlantic",
        "IL" | "IN" | "MI" | "OH" | "WI" => "East North Central",
        "IA" | "KS" | "MN" | "MO" | "NE" | "ND" | "SD" => "West North Central",
        "DE" | "FL" | "GA" | "MD" | "NC" | "SC" | "VA" | "DC" | "WV" => "South Atlantic",
        "AL" | "KY" | "MS" | "TN" => "East South Central",
        "AR" | "LA" | "OK" | "TX" => "West South Central",
        "AZ" | "CO" | "ID" | "MT" | "NV" | "NM" | "UT" | "WY" => "Mountain",
        _ => "Pacific",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_states() {
        assert_eq!(census_division("MA"), "New England");
        assert_eq!(census_division("TX"), "West South Central");
        assert_eq!(census_division("dc"), "South Atlantic");
        assert_eq!(census_division("WA"), "Pacific");
    }

    #[test]
    fn test_unknown_defaults_to_pacific() {
        assert_eq!(census_division("PR"), "Pacific");
        assert_eq!(census_division(""), "Pacific");
    }
}
