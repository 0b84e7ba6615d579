//! Filename extraction from `Content-Disposition` response headers.
//!
//! Matches the first `filename` parameter whose name runs to `=` without
//! crossing `;`, `=` or a newline. The value is either a string delimited by a
//! matching `'`/`"` pair or a bare run up to the next `;` or newline. Quote
//! characters are then removed and the result is percent-decoded; a `%` not
//! followed by two hex digits makes the value unusable.

pub const DEFAULT_PDF_FILENAME: &str = "repository_analysis.pdf";

const PARAM: &str = "filename";

pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let (suffix, raw) = filename_param(header)?;
    let raw = if suffix.trim() == "*" {
        strip_extended_prefix(raw)
    } else {
        raw
    };

    let unquoted: String = raw.chars().filter(|c| !is_quote(*c)).collect();
    if has_malformed_escape(&unquoted) {
        return None;
    }
    let decoded = urlencoding::decode(&unquoted).ok()?;
    if decoded.trim().is_empty() {
        return None;
    }
    Some(decoded.into_owned())
}

pub fn resolve_download_filename(header: Option<&str>) -> String {
    header
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| DEFAULT_PDF_FILENAME.to_string())
}

/// Returns the text between `filename` and `=` plus the raw (still quoted) value.
fn filename_param(header: &str) -> Option<(&str, &str)> {
    let mut search_from = 0;
    while let Some(offset) = header[search_from..].find(PARAM) {
        let after_name = search_from + offset + PARAM.len();
        let rest = &header[after_name..];
        let suffix_len = rest
            .find(|c: char| matches!(c, ';' | '=' | '\n'))
            .unwrap_or(rest.len());

        if rest[suffix_len..].starts_with('=') {
            let value = quoted_or_bare(&rest[suffix_len + 1..]);
            return Some((&rest[..suffix_len], value));
        }
        search_from = after_name;
    }
    None
}

fn quoted_or_bare(input: &str) -> &str {
    if let Some(quote) = input.chars().next().filter(|c| is_quote(*c)) {
        let body = &input[1..];
        if let Some(end) = body.find(|c: char| c == quote || c == '\n') {
            if body[end..].starts_with(quote) {
                return &input[..end + 2];
            }
        }
    }

    let end = input
        .find(|c: char| matches!(c, ';' | '\n'))
        .unwrap_or(input.len());
    &input[..end]
}

/// `charset'language'value` as used by `filename*=`.
fn strip_extended_prefix(raw: &str) -> &str {
    let mut parts = raw.splitn(3, '\'');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_charset), Some(_language), Some(value)) => value,
        _ => raw,
    }
}

fn has_malformed_escape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !matches!(
                (bytes.get(i + 1), bytes.get(i + 2)),
                (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
            )
    })
}

fn is_quote(c: char) -> bool {
    matches!(c, '\'' | '"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_quoted_filename() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="analysis.pdf""#).as_deref(),
            Some("analysis.pdf")
        );
    }

    #[test]
    fn quoted_value_may_contain_separator() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="a;b.pdf"; size=3"#)
                .as_deref(),
            Some("a;b.pdf")
        );
    }

    #[test]
    fn reads_single_quoted_filename() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename='a b.pdf'").as_deref(),
            Some("a b.pdf")
        );
    }

    #[test]
    fn strips_every_quote_inside_quoted_value() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="it's.pdf""#).as_deref(),
            Some("its.pdf")
        );
    }

    #[test]
    fn malformed_percent_escape_is_rejected() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=100%zz.pdf"),
            None
        );
        assert_eq!(
            filename_from_content_disposition("attachment; filename=cut%2"),
            None
        );
        assert_eq!(
            resolve_download_filename(Some("attachment; filename=100%zz.pdf")),
            DEFAULT_PDF_FILENAME
        );
        assert_eq!(
            filename_from_content_disposition("attachment; filename=100%25.pdf").as_deref(),
            Some("100%.pdf")
        );
    }

    #[test]
    fn reads_bare_filename_up_to_next_parameter() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=report.pdf; size=42")
                .as_deref(),
            Some("report.pdf")
        );
    }

    #[test]
    fn percent_decodes_filename() {
        assert_eq!(
            filename_from_content_disposition(
                "attachment; filename=%E4%BB%A3%E7%A0%81%E4%BB%93%E5%BA%93%E5%88%86%E6%9E%90.pdf"
            )
            .as_deref(),
            Some("代码仓库分析.pdf")
        );
    }

    #[test]
    fn strips_charset_from_extended_parameter() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename*=UTF-8''analyse%20depot.pdf")
                .as_deref(),
            Some("analyse depot.pdf")
        );
    }

    #[test]
    fn unterminated_quote_falls_back_to_bare_value() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=\"broken.pdf; x=1").as_deref(),
            Some("broken.pdf")
        );
    }

    #[test]
    fn skips_occurrence_interrupted_by_separator() {
        assert_eq!(
            filename_from_content_disposition("x-filename; attachment; filename=second.pdf")
                .as_deref(),
            Some("second.pdf")
        );
    }

    #[test]
    fn empty_or_missing_filename_yields_none() {
        assert_eq!(filename_from_content_disposition("attachment"), None);
        assert_eq!(filename_from_content_disposition("attachment; filename="), None);
        assert_eq!(filename_from_content_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn resolve_falls_back_to_default_name() {
        assert_eq!(resolve_download_filename(None), DEFAULT_PDF_FILENAME);
        assert_eq!(
            resolve_download_filename(Some("inline")),
            DEFAULT_PDF_FILENAME
        );
        assert_eq!(
            resolve_download_filename(Some("attachment; filename=a.pdf")),
            "a.pdf"
        );
    }
}
