//! Localized message lookup.

/// Source of localized, user-facing strings.
///
/// Templates use positional placeholders (`{0}`, `{1}`, ...).
pub trait Localizer: Send + Sync {
    /// Look up `key` and substitute `args` into it.
    fn get_string(&self, key: &str, args: &[&str]) -> String;

    /// Look up `key` within `scope` (`"{scope}.{key}"`).
    fn get_scoped_string(&self, scope: &str, key: &str, args: &[&str]) -> String {
        self.get_string(&format!("{scope}.{key}"), args)
    }
}

/// Localizer without resources: the key itself is the template.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLocalizer;

impl Localizer for NoopLocalizer {
    fn get_string(&self, key: &str, args: &[&str]) -> String {
        format_template(key, args)
    }
}

/// Replace every `{n}` placeholder in `template` with `args[n]`.
///
/// The template is scanned once, so placeholders inside arguments are not
/// expanded. Placeholders without a matching argument are left untouched.
///
/// ```rust
/// use memento_core::ports::format_template;
///
/// assert_eq!(format_template("{0} has no {1}", &["Note", "Title"]), "Note has no Title");
/// assert_eq!(format_template("missing {2}", &["a"]), "missing {2}");
/// ```
pub fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let arg = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            args.get(index).map(|arg| (close, *arg))
        });

        match arg {
            Some((close, arg)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
