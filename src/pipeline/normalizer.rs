//! Strips framing from raw model text so it can be handed to a JSON parser.

/// Spaces substituted for a literal `\t` found outside string literals.
const TAB_INDENT: &str = "  ";

/// Removes a surrounding markdown fence, converts literal `\n` / `\t`
/// escape sequences that sit between tokens into real whitespace, and
/// trims the result.
///
/// String literals are copied verbatim, so key names and values are never
/// altered. Text without a fence passes through apart from trimming.
pub fn clean_json_string(raw: &str) -> String {
    let unfenced = strip_fence(raw.trim());
    convert_structural_escapes(unfenced).trim().to_string()
}

/// Only a fence that opens the text is framing; a closing fence alone is
/// left for the extractor's fenced-block strategy.
fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    let body = match rest.find('\n') {
        Some(newline) if is_fence_tag(&rest[..newline]) => &rest[newline + 1..],
        _ => rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn is_fence_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn convert_structural_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '\\' => match chars.peek() {
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('t') => {
                    chars.next();
                    out.push_str(TAB_INDENT);
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(clean_json_string(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence_and_outer_whitespace() {
        let raw = "  \n```\n[1, 2]\n```\n ";
        assert_eq!(clean_json_string(raw), "[1, 2]");
    }

    #[test]
    fn strips_fence_without_newline_after_tag() {
        assert_eq!(clean_json_string("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn converts_literal_escapes_between_tokens() {
        let raw = r#"{\n\t"a": 1,\n\t"b": 2\n}"#;
        let cleaned = clean_json_string(raw);
        assert_eq!(cleaned, "{\n  \"a\": 1,\n  \"b\": 2\n}");
        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn leaves_escapes_inside_strings_alone() {
        let raw = r#"{"steps": "mix\nbake", "quote": "say \"hi\"\t"}"#;
        assert_eq!(clean_json_string(raw), raw);
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "```json\n{\"a\": [1, 2, 3]}\n```",
            "{\"a\": \"x\\ny\"}",
            "plain prose without json",
            r#"{\n"k": "v"\n}"#,
        ];
        for input in inputs {
            let once = clean_json_string(input);
            assert_eq!(clean_json_string(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn closing_fence_without_opening_is_kept() {
        let raw = "Output:\n```\n{\"a\": 1}\n```";
        assert_eq!(clean_json_string(raw), raw);
    }

    #[test]
    fn prose_passes_through() {
        assert_eq!(clean_json_string("  no json here  "), "no json here");
    }
}
