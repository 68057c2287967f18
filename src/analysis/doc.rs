use super::AnalysisError;
use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{space0, space1},
    combinator::eof,
    sequence::{delimited, preceded, terminated},
    IResult,
};

/// `# Analyzer <name>` on a line of its own.
fn heading(input: &str) -> IResult<&str, &str> {
    terminated(
        preceded(
            tag("# Analyzer"),
            delimited(space1, take_while1(|c: char| c.is_alphanumeric() || c == '_'), space0),
        ),
        eof,
    )(input)
}

/// Extracts the section of `content` that documents analyzer `name`.
///
/// The section starts after its `# Analyzer name` heading and runs to the
/// next `#` heading. Its first line must read `name: summary`.
pub fn extract_doc(content: &str, name: &str) -> Result<String, AnalysisError> {
    let missing = |message: &str| AnalysisError::Doc {
        analyzer: name.to_string(),
        message: message.to_string(),
    };
    let mut lines = content.lines();
    lines
        .by_ref()
        .find(|line| matches!(heading(line.trim_end()), Ok((_, found)) if found == name))
        .ok_or_else(|| missing("no `# Analyzer` heading"))?;
    let body: Vec<&str> = lines.take_while(|line| !line.starts_with("# ")).collect();
    let text = body.join("\n").trim().to_string();
    if !text.starts_with(&format!("{name}:")) {
        return Err(missing("section must begin with `name:`"));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "Package checks.

# Analyzer first

first: report first things

More detail.

# Analyzer second

wrong: header
";

    #[test]
    fn sections_run_to_the_next_heading() {
        let doc = extract_doc(DOC, "first").expect("documented");
        assert_eq!(doc, "first: report first things\n\nMore detail.");
    }

    #[test]
    fn missing_or_malformed_sections_fail() {
        assert!(matches!(extract_doc(DOC, "third"), Err(AnalysisError::Doc { .. })));
        assert!(extract_doc(DOC, "second").is_err());
        assert!(heading("# Analyzer first extra").is_err());
    }
}
