//! US state identity by whole normalized token.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsState {
    pub code: &'static str,
    pub name: &'static str,
}

const fn st(code: &'static str, name: &'static str) -> UsState {
    UsState { code, name }
}

pub const US_STATES: &[UsState] = &[
    st("AL", "Alabama"),
    st("AK", "Alaska"),
    st("AZ", "Arizona"),
    st("AR", "Arkansas"),
    st("CA", "California"),
    st("CO", "Colorado"),
    st("CT", "Connecticut"),
    st("DE", "Delaware"),
    st("DC", "District of Columbia"),
    st("FL", "Florida"),
    st("GA", "Georgia"),
    st("HI", "Hawaii"),
    st("ID", "Idaho"),
    st("IL", "Illinois"),
    st("IN", "Indiana"),
    st("IA", "Iowa"),
    st("KS", "Kansas"),
    st("KY", "Kentucky"),
    st("LA", "Louisiana"),
    st("ME", "Maine"),
    st("MD", "Maryland"),
    st("MA", "Massachusetts"),
    st("MI", "Michigan"),
    st("MN", "Minnesota"),
    st("MS", "Mississippi"),
    st("MO", "Missouri"),
    st("MT", "Montana"),
    st("NE", "Nebraska"),
    st("NV", "Nevada"),
    st("NH", "New Hampshire"),
    st("NJ", "New Jersey"),
    st("NM", "New Mexico"),
    st("NY", "New York"),
    st("NC", "North Carolina"),
    st("ND", "North Dakota"),
    st("OH", "Ohio"),
    st("OK", "Oklahoma"),
    st("OR", "Oregon"),
    st("PA", "Pennsylvania"),
    st("PR", "Puerto Rico"),
    st("RI", "Rhode Island"),
    st("SC", "South Carolina"),
    st("SD", "South Dakota"),
    st("TN", "Tennessee"),
    st("TX", "Texas"),
    st("UT", "Utah"),
    st("VT", "Vermont"),
    st("VA", "Virginia"),
    st("WA", "Washington"),
    st("WV", "West Virginia"),
    st("WI", "Wisconsin"),
    st("WY", "Wyoming"),
];

/// Lowercase, keep letters only, single spaces between tokens.
pub fn normalize_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphabetic())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn name_tokens(state: &UsState) -> Vec<String> {
    normalize_tokens(state.name)
}

/// Resolve free text naming a state ("VA", "Virginia", "West Virginia 25301",
/// "Commonwealth of Virginia, USA") to a state. Matching is on whole tokens:
/// the trailing tokens must equal a full state name, or the text must be
/// exactly a USPS code, so "West Virginia" never resolves to VA.
pub fn resolve_state(text: &str) -> Option<&'static UsState> {
    let mut tokens = normalize_tokens(text);
    while matches!(tokens.last().map(String::as_str), Some("usa" | "us" | "america")) {
        tokens.pop();
    }
    if tokens.ends_with(&["united".to_string(), "states".to_string()]) && tokens.len() > 2 {
        tokens.truncate(tokens.len() - 2);
    }
    if tokens.is_empty() {
        return None;
    }

    if tokens.len() == 1 && tokens[0].len() == 2 {
        return US_STATES
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(&tokens[0]));
    }

    // Longest full name that is a token suffix of the text.
    US_STATES
        .iter()
        .filter(|s| tokens.ends_with(&name_tokens(s)))
        .max_by_key(|s| name_tokens(s).len())
}

pub fn is_state_code(text: &str) -> bool {
    US_STATES.iter().any(|s| s.code == text.trim())
}

/// Regex alternation of full state names, longest first so that compound
/// names ("West Virginia") win over their suffixes ("Virginia").
pub fn state_name_alternation() -> String {
    let mut names: Vec<&str> = US_STATES.iter().map(|s| s.name).collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    names
        .iter()
        .map(|n| n.replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|")
}

/// Regex alternation of USPS codes.
pub fn state_code_alternation() -> String {
    US_STATES.iter().map(|s| s.code).collect::<Vec<_>>().join("|")
}
