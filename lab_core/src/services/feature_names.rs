//! Display names for feature identifiers.

/// Category prefixes hidden in display names.
const DISPLAY_PREFIXES: [&str; 4] = ["sleep_", "cosinor_", "physical_activity_", "nonparam_"];

fn title_word(word: &str) -> String {
    if word.eq_ignore_ascii_case("mesor") {
        return "MESOR".to_string();
    }
    if word != word.to_lowercase() {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Human-readable name of a feature, as used for panel titles.
///
/// ```
/// use cosinor_lab::services::display_name;
///
/// assert_eq!(display_name("cosinor_mesor"), "MESOR");
/// assert_eq!(display_name("physical_activity_light_minutes"), "Light Minutes");
/// assert_eq!(display_name("sleep_TST"), "TST");
/// ```
pub fn display_name(feature: &str) -> String {
    match feature {
        "cosinorage" | "cosinor_cosinorage" => return "Cosinorage".to_string(),
        "cosinorage_advance" => return "Cosinorage\nAdvance".to_string(),
        _ => {}
    }

    let stripped = DISPLAY_PREFIXES
        .iter()
        .find_map(|prefix| feature.strip_prefix(prefix))
        .unwrap_or(feature);
    let spaced = stripped.replace('_', " ");
    let lower = spaced.to_lowercase();

    if lower == "mesor" {
        return "MESOR".to_string();
    }
    if lower.contains("acrophase") && lower.contains("time") {
        return "Acrophase\nTime".to_string();
    }

    spaced.split(' ').map(title_word).collect::<Vec<_>>().join(" ")
}
