//! LSP snippet text with numbered tabstops.

use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Builder {
    text: String,
    tabstop: u32,
}

fn escape(out: &mut String, s: &str) {
    for ch in s.chars() {
        if matches!(ch, '\\' | '}' | '$') {
            out.push('\\');
        }
        out.push(ch);
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends literal text, escaping snippet syntax.
    pub fn write_text(&mut self, s: &str) {
        escape(&mut self.text, s);
    }

    pub fn prepend_text(&mut self, s: &str) {
        let mut text = String::with_capacity(s.len() + self.text.len());
        escape(&mut text, s);
        text.push_str(&self.text);
        self.text = text;
    }

    /// Writes `${n:...}` with the next tabstop number, letting `fill`
    /// supply the default text.
    pub fn write_placeholder(&mut self, fill: Option<&dyn Fn(&mut Builder)>) {
        self.tabstop += 1;
        self.text.push_str(&format!("${{{}:", self.tabstop));
        if let Some(fill) = fill {
            fill(self);
        }
        self.text.push('}');
    }

    pub fn write_final_tabstop(&mut self) {
        self.text.push_str("$0");
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_and_text_is_escaped() {
        let mut snip = Builder::new();
        snip.write_text("f(");
        snip.write_placeholder(Some(&|b: &mut Builder| b.write_text("a $x")));
        snip.write_text(", ");
        snip.write_placeholder(None);
        snip.write_text(") {}");
        snip.write_final_tabstop();
        snip.prepend_text("&");
        assert_eq!(snip.as_str(), "&f(${1:a \\$x}, ${2:}) {\\}$0");
    }
}
