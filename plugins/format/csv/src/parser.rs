use tabula_api::error::ShapeError;

// ═══════════════════════════════════════════════════════════════
//  Record reader
// ═══════════════════════════════════════════════════════════════

/// One physical record. `line` is where it starts (1-based); a quoted
/// field may carry it over several lines.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Row {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Split CSV text into records (RFC 4180 with lazy quotes).
///
/// A quote only opens a quoted field at the start of the field; anywhere
/// else it is literal, as is text between a closing quote and the next
/// delimiter. Empty lines and lines starting with `comment` are skipped.
/// A quoted field left open at the end of input is a per-row error.
pub(crate) fn read_rows(
    text: &str,
    delimiter: char,
    comment: Option<char>,
) -> Vec<Result<Row, ShapeError>> {
    let chars: Vec<char> = text.chars().collect();
    let mut rows = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let line_end = chars[i..]
            .iter()
            .position(|&c| c == '\n')
            .map_or(chars.len(), |p| i + p);
        let text_line = &chars[i..line_end];
        let content = text_line.strip_suffix(&['\r']).unwrap_or(text_line);
        if content.is_empty() || comment == Some(chars[i]) {
            i = line_end + 1;
            line += 1;
            continue;
        }

        let start_line = line;
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut at_start = true;
        let mut quoted = false;

        loop {
            let Some(&c) = chars.get(i) else {
                fields.push(std::mem::take(&mut field));
                break;
            };
            i += 1;

            if quoted {
                match c {
                    '"' if chars.get(i) == Some(&'"') => {
                        field.push('"');
                        i += 1;
                    }
                    '"' => quoted = false,
                    '\n' => {
                        line += 1;
                        field.push(c);
                    }
                    _ => field.push(c),
                }
                continue;
            }

            match c {
                '"' if at_start => {
                    quoted = true;
                    at_start = false;
                }
                c if c == delimiter => {
                    fields.push(std::mem::take(&mut field));
                    at_start = true;
                }
                '\n' => {
                    line += 1;
                    fields.push(std::mem::take(&mut field));
                    break;
                }
                '\r' if chars.get(i) == Some(&'\n') => {}
                _ => {
                    field.push(c);
                    at_start = false;
                }
            }
        }

        if quoted {
            rows.push(Err(ShapeError::invalid_input(format!(
                "record on line {start_line}: quoted field is never closed"
            ))));
        } else {
            rows.push(Ok(Row {
                line: start_line,
                fields,
            }));
        }
    }

    rows
}

// ═══════════════════════════════════════════════════════════════
//  Option helpers
// ═══════════════════════════════════════════════════════════════

pub(crate) fn parse_delimiter(s: &str) -> Result<char, ShapeError> {
    let mut chars = s.chars();
    match (s, chars.next(), chars.next()) {
        ("", _, _) => Ok(','),
        ("\\t", _, _) => Ok('\t'),
        (_, Some(c), None) if c != '"' && c != '\n' && c != '\r' => Ok(c),
        (other, _, _) => Err(ShapeError::invalid_input(format!(
            "CSV: delimiter must be a single character, got {other:?}"
        ))),
    }
}

pub(crate) fn parse_comment(s: &str) -> Result<Option<char>, ShapeError> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(c), None) => Ok(Some(c)),
        _ => Err(ShapeError::invalid_input(format!(
            "CSV: comment must be a single character, got {s:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str) -> Vec<Vec<String>> {
        read_rows(text, ',', None)
            .into_iter()
            .map(|r| r.unwrap().fields)
            .collect()
    }

    #[test]
    fn test_quoted_fields() {
        assert_eq!(
            fields("a,\"b,c\",\"say \"\"hi\"\"\"\n"),
            vec![vec!["a", "b,c", "say \"hi\""]]
        );
    }

    #[test]
    fn test_quoted_newline_keeps_start_line() {
        let rows = read_rows("h\n\"one\ntwo\"\nnext", ',', None);
        let rows: Vec<Row> = rows.into_iter().map(Result::unwrap).collect();
        assert_eq!(rows[1].fields, vec!["one\ntwo"]);
        assert_eq!(rows[1].line, 2);
        assert_eq!(rows[2].line, 4);
    }

    #[test]
    fn test_lazy_quotes() {
        assert_eq!(fields("a\"b,\"c\"d\n"), vec![vec!["a\"b", "cd"]]);
    }

    #[test]
    fn test_crlf_blank_and_comment_lines() {
        let rows = read_rows("# note\r\na,b\r\n\r\n\nc,d\r\n", ',', Some('#'));
        let rows: Vec<Vec<String>> = rows.into_iter().map(|r| r.unwrap().fields).collect();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_whitespace_line_is_not_blank() {
        assert_eq!(fields("a\n   \nb\n"), vec![vec!["a"], vec!["   "], vec!["b"]]);
    }

    #[test]
    fn test_trailing_delimiter_yields_empty_field() {
        assert_eq!(fields("a,b,\n"), vec![vec!["a", "b", ""]]);
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        let rows = read_rows("a,b\n\"open,c\n", ',', None);
        assert!(rows[0].is_ok());
        assert!(rows[1].is_err());
    }

    #[test]
    fn test_option_helpers() {
        assert_eq!(parse_delimiter("").unwrap(), ',');
        assert_eq!(parse_delimiter("\\t").unwrap(), '\t');
        assert_eq!(parse_delimiter("\t").unwrap(), '\t');
        assert_eq!(parse_delimiter(";").unwrap(), ';');
        assert!(parse_delimiter(";;").is_err());
        assert_eq!(parse_comment("").unwrap(), None);
        assert_eq!(parse_comment("#").unwrap(), Some('#'));
        assert!(parse_comment("//").is_err());
    }
}
