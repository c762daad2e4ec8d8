use std::sync::LazyLock;

use regex::Regex;

static CC_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{9,})\b").expect("CC number pattern"));

/// Collapse all whitespace runs (including line breaks) to single spaces and trim.
pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Lowercase alphanumeric reduction used for structural comparisons, so a
/// header cell matches a label regardless of spacing, case, or punctuation.
pub fn normalize_label(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|character| character.to_ascii_lowercase())
        .collect()
}

/// Like [`clean_text`], but keeps line breaks that are intentional in the PDF
/// (multi-line header cells). Spaces collapse within each line; blank lines
/// are dropped.
pub fn clean_text_keep_newlines(input: &str) -> String {
    let normalized = input.replace('\r', "\n");
    let mut lines = Vec::<String>::new();
    for line in normalized.lines() {
        let collapsed = clean_text(line);
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }
    lines.join("\n")
}

/// Format a color column header for display: the CC number (first >=9-digit
/// token) moves to its own trailing line, and " - " becomes " -\n" so a
/// trailing hyphen survives the break (e.g. "NY Athl Div -").
pub fn format_color_header(input: &str) -> String {
    let text = clean_text_keep_newlines(input);
    if text.is_empty() {
        return text;
    }

    if let Some(found) = CC_NUMBER.find(&text) {
        let code = found.as_str();
        let before = text[..found.start()].trim_end().replace(" - ", " -\n");
        format!("{before}\n{code}").trim().to_string()
    } else {
        text.replace(" - ", " -\n").trim().to_string()
    }
}

/// First CC number (>=9 consecutive digits) embedded in the text, if any.
pub fn extract_cc_number(text: &str) -> Option<String> {
    CC_NUMBER
        .captures(&clean_text(text))
        .map(|captures| captures[1].to_string())
}
