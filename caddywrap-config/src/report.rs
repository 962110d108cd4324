//! Annotated error reports
//!
//! Errors from lexing, parsing and unmarshaling carry byte spans into the
//! Caddyfile; [`render`] turns one into a plain-text report with the
//! offending source line underlined.

use crate::parser::Location;
use ariadne::{Config, Label, Report, ReportKind, Source};
use std::ops::Range;

/// Render `message` against `source`. Without a span only the message is
/// shown.
pub fn render(file: &str, source: &str, message: &str, span: Option<Location>) -> String {
    let range: Range<usize> = match span {
        Some(loc) => clamp(loc, source.len()),
        None => return format!("Error: {}", message),
    };

    let mut out = Vec::new();
    let written = Report::build(ReportKind::Error, (file, range.clone()))
        .with_config(Config::default().with_color(false))
        .with_message(message)
        .with_label(Label::new((file, range)).with_message("here"))
        .finish()
        .write((file, Source::from(source)), &mut out);

    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(e) => {
            tracing::warn!("Failed to render report: {}", e);
            format!("Error: {}", message)
        }
    }
}

fn clamp(loc: Location, len: usize) -> Range<usize> {
    let start = loc.start.min(len);
    let end = loc.end.clamp(start, len);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unmarshal::{UnmarshalError, from_str};
    use crate::directive_fields;

    #[derive(Debug, Default)]
    struct Limits {
        max: u32,
    }

    directive_fields!(Limits { max });

    #[test]
    fn test_render_points_at_token() {
        let source = "limits {\n  max lots\n}";
        let err = from_str::<Limits>(source).unwrap_err();
        assert!(matches!(err, UnmarshalError::Parse { .. }));

        let report = render("Caddyfile", source, &err.to_string(), err.location());
        assert!(report.contains("Caddyfile"), "{}", report);
        assert!(report.contains("max lots"), "{}", report);
        assert!(report.contains("cannot use 'lots' as integer"), "{}", report);
    }

    #[test]
    fn test_render_without_span() {
        assert_eq!(render("f", "", "boom", None), "Error: boom");
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(Location { start: 5, end: 50 }, 10), 5..10);
        assert_eq!(clamp(Location { start: 20, end: 30 }, 10), 10..10);
    }
}
