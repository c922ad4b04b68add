/// Replaces sensitive substrings with fixed placeholders before text is logged.
pub trait Redact {
    fn redact(&self, text: &str) -> String;
}

/// Mapping of sensitive values to placeholder labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redactor {
    entries: Vec<(String, String)>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` to be replaced by `<label>`. Empty values are ignored.
    pub fn add(&mut self, value: &str, label: &str) {
        if value.is_empty() || self.entries.iter().any(|(v, _)| v == value) {
            return;
        }
        self.entries.push((value.to_string(), format!("<{}>", label)));
        // Longest first so a value containing another is replaced whole.
        self.entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Register every entry of `other`, keeping the ones already known.
    pub fn merge(&mut self, other: &Redactor) {
        for (value, placeholder) in &other.entries {
            if self.entries.iter().any(|(v, _)| v == value) {
                continue;
            }
            self.entries.push((value.clone(), placeholder.clone()));
        }
        self.entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Redact for Redactor {
    fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (value, placeholder) in &self.entries {
            if result.contains(value.as_str()) {
                result = result.replace(value.as_str(), placeholder);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_occurrence() {
        let mut r = Redactor::new();
        r.add("5551234", "phone number");
        assert_eq!(
            r.redact("/rec/5551234_x/5551234.wav"),
            "/rec/<phone number>_x/<phone number>.wav"
        );
    }

    #[test]
    fn longer_values_win() {
        let mut r = Redactor::new();
        r.add("Ann", "caller name");
        r.add("Ann Smith", "contact name");
        assert_eq!(r.redact("call_Ann Smith"), "call_<contact name>");
    }

    #[test]
    fn merge_keeps_earlier_values() {
        let mut r = Redactor::new();
        r.add("Alice", "caller name");
        let mut next = Redactor::new();
        next.add("Bob", "caller name");
        next.add("Alice", "contact name");
        r.merge(&next);
        assert_eq!(r.redact("Alice_Bob"), "<caller name>_<caller name>");
    }

    #[test]
    fn ignores_empty_values() {
        let mut r = Redactor::new();
        r.add("", "caller name");
        assert!(r.is_empty());
        assert_eq!(r.redact("abc"), "abc");
    }
}
