// content-surface command decoding
//
// the page talks to the shell by setting document.title to a one-line command.
// the literal tokens are what unmodified content sends, keep them stable.

/// A decoded command. Unknown lines decode to `None` and are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentCommand {
    Close,
    Minimize,
    Reset,
    EnableLauncher,
    DisableLauncher,
    EnableDrag,
    DisableDrag,
    Notify(String),
    Height(i32),
    Opacity(f64),
    Count(i64),
}

impl ContentCommand {
    pub fn parse(line: &str) -> Option<Self> {
        // alert text is passed through as sent
        if let Some(text) = line.trim_start().strip_prefix("notify:") {
            return Some(Self::Notify(text.to_string()));
        }

        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let exact = match line {
            "close" => Some(Self::Close),
            "minimize" => Some(Self::Minimize),
            "reset" => Some(Self::Reset),
            "enable_launcher" => Some(Self::EnableLauncher),
            "disable_launcher" => Some(Self::DisableLauncher),
            "enabledrag" => Some(Self::EnableDrag),
            "disabledrag" => Some(Self::DisableDrag),
            _ => None,
        };
        if exact.is_some() {
            return exact;
        }

        if let Some(height) = line.strip_prefix("height=") {
            return height.trim().parse().ok().map(Self::Height);
        }
        // an "o" line is opacity or nothing, never a count
        if let Some(opacity) = line.strip_prefix('o') {
            return opacity
                .parse::<f64>()
                .ok()
                .filter(|o| o.is_finite())
                .map(Self::Opacity);
        }

        parse_count(line).map(Self::Count)
    }
}

// one optional sign, then ascii digits only
fn parse_count(line: &str) -> Option<i64> {
    let digits = line.strip_prefix(&['+', '-'][..]).unwrap_or(line);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    line.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_tokens() {
        assert_eq!(ContentCommand::parse("close"), Some(ContentCommand::Close));
        assert_eq!(ContentCommand::parse("minimize"), Some(ContentCommand::Minimize));
        assert_eq!(ContentCommand::parse("reset"), Some(ContentCommand::Reset));
        assert_eq!(ContentCommand::parse("enable_launcher"), Some(ContentCommand::EnableLauncher));
        assert_eq!(ContentCommand::parse("disable_launcher"), Some(ContentCommand::DisableLauncher));
        assert_eq!(ContentCommand::parse("enabledrag"), Some(ContentCommand::EnableDrag));
        assert_eq!(ContentCommand::parse(" disabledrag\n"), Some(ContentCommand::DisableDrag));
    }

    #[test]
    fn test_prefixed_payloads() {
        assert_eq!(
            ContentCommand::parse("notify:Heavy rain at 18:00"),
            Some(ContentCommand::Notify("Heavy rain at 18:00".to_string()))
        );
        assert_eq!(ContentCommand::parse("notify:"), Some(ContentCommand::Notify(String::new())));
        assert_eq!(
            ContentCommand::parse("notify:  Gusts to 90 km/h "),
            Some(ContentCommand::Notify("  Gusts to 90 km/h ".to_string()))
        );
        assert_eq!(ContentCommand::parse("height=640"), Some(ContentCommand::Height(640)));
        assert_eq!(ContentCommand::parse("o0.75"), Some(ContentCommand::Opacity(0.75)));
        assert_eq!(ContentCommand::parse("o1"), Some(ContentCommand::Opacity(1.0)));
    }

    #[test]
    fn test_bad_opacity_never_becomes_count() {
        assert_eq!(ContentCommand::parse("o"), None);
        assert_eq!(ContentCommand::parse("oops"), None);
        assert_eq!(ContentCommand::parse("o12x"), None);
        assert_eq!(ContentCommand::parse("oNaN"), None);
        assert_eq!(ContentCommand::parse("oinf"), None);
    }

    #[test]
    fn test_counts() {
        assert_eq!(ContentCommand::parse("5"), Some(ContentCommand::Count(5)));
        assert_eq!(ContentCommand::parse("-3"), Some(ContentCommand::Count(-3)));
        assert_eq!(ContentCommand::parse("+12"), Some(ContentCommand::Count(12)));
        assert_eq!(ContentCommand::parse("0"), Some(ContentCommand::Count(0)));
    }

    #[test]
    fn test_unrecognized_lines_are_ignored() {
        for line in ["", "   ", "Typhoon", "height=tall", "height=", "--3", "+", "3.5", "1e3", "CLOSE"] {
            assert_eq!(ContentCommand::parse(line), None, "{line:?}");
        }
        // too large for the badge count
        assert_eq!(ContentCommand::parse("99999999999999999999"), None);
    }
}
