use std::fmt::{self, Display};

/// Longest prefix printed by [`truncate_long!`], in bytes.
pub const TRUNCATE_AT: usize = 497;

/// Text printed up to [`TRUNCATE_AT`] bytes, cut on a char boundary.
pub struct Truncated<'a>(pub &'a str);

impl Display for Truncated<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0;
        if text.len() <= TRUNCATE_AT {
            return writeln!(f, "{}", text.trim_end());
        }
        let end = text
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= TRUNCATE_AT)
            .last()
            .unwrap_or_default();
        writeln!(f, "{}...", text[..end].trim_end())
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        $crate::Truncated(::std::convert::AsRef::<str>::as_ref(&$query))
    };
}

/// Attaches the context to the error and logs it.
#[macro_export]
macro_rules! log_context {
    ($error:expr, $($context:tt)+) => {{
        let error = $crate::Error::from($error).context(format!($($context)+));
        ::log::error!("{:#}", error);
        error
    }};
}

/// Writes `name` as a double quoted sql identifier.
pub fn write_identifier(out: &mut String, name: &str) {
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}
