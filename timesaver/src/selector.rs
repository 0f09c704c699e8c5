use crate::errors::AutomationError;

/// Represents ways to locate an element on the rendered page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select by the element's `id` attribute
    Id(String),
    /// Select by the element's `name` attribute (form fields)
    Name(String),
    /// Select using a CSS selector
    Css(String),
    /// Select using an XPath expression
    XPath(String),
    /// Select by tag name
    Tag(String),
    /// Select an anchor by its exact visible text
    LinkText(String),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl Selector {
    /// Resolve into a W3C WebDriver `(using, value)` locator pair.
    pub fn strategy(&self) -> Result<(&'static str, String), AutomationError> {
        match self {
            Selector::Id(id) => Ok(("css selector", format!("[id=\"{}\"]", escape_css(id)))),
            Selector::Name(name) => Ok((
                "css selector",
                format!("[name=\"{}\"]", escape_css(name)),
            )),
            Selector::Css(css) => Ok(("css selector", css.clone())),
            Selector::XPath(xpath) => Ok(("xpath", xpath.clone())),
            Selector::Tag(tag) => Ok(("tag name", tag.clone())),
            Selector::LinkText(text) => Ok(("link text", text.clone())),
            Selector::Invalid(reason) => Err(AutomationError::InvalidSelector(reason.clone())),
        }
    }
}

fn escape_css(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Id(v) => write!(f, "#{v}"),
            Selector::Name(v) => write!(f, "name:{v}"),
            Selector::Css(v) => write!(f, "css:{v}"),
            Selector::XPath(v) => write!(f, "xpath:{v}"),
            Selector::Tag(v) => write!(f, "tag:{v}"),
            Selector::LinkText(v) => write!(f, "link:{v}"),
            Selector::Invalid(v) => write!(f, "invalid({v})"),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let s = s.trim();
        let lower = s.to_lowercase();
        match s {
            "" => Selector::Invalid("Empty selector".to_string()),
            _ if s.starts_with('#') && s.len() > 1 => Selector::Id(s[1..].to_string()),
            _ if lower.starts_with("id:") => Selector::Id(s[3..].trim().to_string()),
            _ if lower.starts_with("name:") => Selector::Name(s[5..].trim().to_string()),
            _ if lower.starts_with("css:") => Selector::Css(s[4..].trim().to_string()),
            _ if lower.starts_with("xpath:") => Selector::XPath(s[6..].trim().to_string()),
            _ if lower.starts_with("tag:") => Selector::Tag(s[4..].trim().to_string()),
            _ if lower.starts_with("link:") => Selector::LinkText(s[5..].to_string()),
            _ if s.starts_with('/') || s.starts_with("(/") => Selector::XPath(s.to_string()),
            _ => Selector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use '#id' or prefixes like 'id:', 'name:', 'css:', 'xpath:', 'tag:' or 'link:' to specify the selector type."
            )),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}
