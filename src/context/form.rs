//! Form body decoding.
//!
//! `application/x-www-form-urlencoded` bodies become ordered field pairs.
//! `multipart/form-data` bodies are split into fields and file parts; file contents
//! are zero-copy slices of the request body.

use std::io;
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use crate::error::DecodeError;

/// An uploaded file from a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    /// Form field name the file was sent under
    pub field: String,
    /// Client-supplied file name
    pub filename: String,
    /// Part `Content-Type`, when the client sent one
    pub content_type: Option<String>,
    /// Raw file bytes
    pub content: Bytes,
}

impl FormFile {
    /// Size of the upload in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Write the file contents to `path`, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Any I/O error from the filesystem.
    pub fn save_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.content)?;
        debug!(
            field = %self.field,
            filename = %self.filename,
            size = self.content.len(),
            path = %path.display(),
            "Uploaded file saved"
        );
        Ok(())
    }
}

/// Decoded form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    /// Text fields in body order; repeated names are kept
    pub fields: Vec<(String, String)>,
    /// File parts in body order
    pub files: Vec<FormFile>,
}

impl Form {
    /// First value of the field `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First file part sent under `name`.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FormFile> {
        self.files.iter().find(|f| f.field == name)
    }
}

/// Decode an urlencoded body.
pub fn parse_urlencoded(body: &[u8]) -> Form {
    Form {
        fields: url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        files: Vec::new(),
    }
}

/// Decode a multipart body delimited by `boundary`.
///
/// # Errors
///
/// [`DecodeError::MalformedMultipart`] when the opening boundary is missing or a
/// part is never terminated by a following boundary.
pub fn parse_multipart(body: &Bytes, boundary: &str) -> Result<Form, DecodeError> {
    let opening = format!("--{boundary}");
    let separator = format!("\r\n--{boundary}");

    let start = find_bytes(body, opening.as_bytes())
        .ok_or_else(|| DecodeError::MalformedMultipart("opening boundary not found".into()))?;
    let mut remaining = &body[start + opening.len()..];
    let mut form = Form::default();

    loop {
        if remaining.starts_with(b"--") {
            break;
        }
        remaining = skip_line_end(trim_padding(remaining));
        let end = find_delimiter(remaining, separator.as_bytes()).ok_or_else(|| {
            DecodeError::MalformedMultipart("part is not terminated by a boundary".into())
        })?;
        let part = &remaining[..end];
        remaining = &remaining[end + separator.len()..];

        let (headers, content) = split_headers_body(part);
        let disposition = parse_content_disposition(headers);
        let Some(field) = disposition.name else {
            continue;
        };

        match disposition.filename {
            Some(filename) if !filename.is_empty() => form.files.push(FormFile {
                field,
                filename,
                content_type: header_value(headers, "content-type"),
                content: body.slice_ref(content),
            }),
            _ => form
                .fields
                .push((field, String::from_utf8_lossy(content).into_owned())),
        }
    }

    debug!(
        fields = form.fields.len(),
        files = form.files.len(),
        "Multipart body parsed"
    );
    Ok(form)
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Find a boundary delimiter: the separator followed by `--`, or by optional
/// padding and a line end. Boundary text inside content does not count.
fn find_delimiter(data: &[u8], separator: &[u8]) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = find_bytes(&data[offset..], separator) {
        let at = offset + pos;
        let after = &data[at + separator.len()..];
        let padded = trim_padding(after);
        if after.starts_with(b"--")
            || padded.is_empty()
            || padded.starts_with(b"\r\n")
            || padded.starts_with(b"\n")
        {
            return Some(at);
        }
        offset = at + 1;
    }
    None
}

fn trim_padding(data: &[u8]) -> &[u8] {
    let skip = data
        .iter()
        .take_while(|b| **b == b' ' || **b == b'\t')
        .count();
    &data[skip..]
}

fn skip_line_end(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n")
        .or_else(|| data.strip_prefix(b"\n"))
        .unwrap_or(data)
}

/// Split a part at the blank line; a part starting with CRLF has no headers.
fn split_headers_body(part: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = part.strip_prefix(b"\r\n") {
        return (&[], body);
    }
    match find_bytes(part, b"\r\n\r\n") {
        Some(pos) => (&part[..pos], &part[pos + 4..]),
        None => (part, &[]),
    }
}

fn header_value(headers: &[u8], name: &str) -> Option<String> {
    String::from_utf8_lossy(headers).split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

#[derive(Debug, Default)]
struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

fn parse_content_disposition(headers: &[u8]) -> ContentDisposition {
    let mut disposition = ContentDisposition::default();
    let Some(value) = header_value(headers, "content-disposition") else {
        return disposition;
    };
    for param in split_params(&value).into_iter().skip(1) {
        let Some((key, val)) = param.split_once('=') else {
            continue;
        };
        let val = unquote(val.trim());
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => disposition.name = Some(val),
            "filename" => disposition.filename = Some(val),
            _ => {}
        }
    }
    disposition
}

/// Split on `;` outside of double quotes.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "X-BOUNDARY";

    fn body() -> Bytes {
        Bytes::from(
            "--X-BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"game\"\r\n\r\n\
             Street Fighter 6\r\n\
             --X-BOUNDARY\r\n\
             Content-Disposition: form-data; filename=\"chunli.txt\"; name=\"file\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             spinning bird kick\r\n--X-BOUNDARY inside\r\n\
             --X-BOUNDARY--\r\n",
        )
    }

    #[test]
    fn test_parse_multipart_fields_and_files() {
        let form = parse_multipart(&body(), BOUNDARY).unwrap();
        assert_eq!(form.value("game"), Some("Street Fighter 6"));
        let file = form.file("file").unwrap();
        assert_eq!(file.filename, "chunli.txt");
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));
        assert_eq!(
            file.content,
            Bytes::from_static(b"spinning bird kick\r\n--X-BOUNDARY inside")
        );
    }

    #[test]
    fn test_unterminated_part_is_rejected() {
        let body = Bytes::from_static(
            b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue",
        );
        assert!(matches!(
            parse_multipart(&body, BOUNDARY),
            Err(DecodeError::MalformedMultipart(_))
        ));
        assert!(parse_multipart(&Bytes::from_static(b"junk"), BOUNDARY).is_err());
    }

    #[test]
    fn test_empty_filename_is_a_text_field() {
        let body = Bytes::from_static(
            b"--X-BOUNDARY\r\n\
              Content-Disposition: form-data; name=\"file\"; filename=\"\"\r\n\r\n\
              \r\n\
              --X-BOUNDARY--\r\n",
        );
        let form = parse_multipart(&body, BOUNDARY).unwrap();
        assert!(form.file("file").is_none());
        assert_eq!(form.value("file"), Some(""));
    }

    #[test]
    fn test_quoted_semicolon_in_filename() {
        let params = split_params("form-data; name=\"f\"; filename=\"a;b.txt\"");
        assert_eq!(params.len(), 3);
        assert_eq!(unquote(params[2].trim().trim_start_matches("filename=")), "a;b.txt");
    }

    #[test]
    fn test_parse_urlencoded() {
        let form = parse_urlencoded(b"name=Chun-Li&game=Street+Fighter+6");
        assert_eq!(form.value("name"), Some("Chun-Li"));
        assert_eq!(form.value("game"), Some("Street Fighter 6"));
        assert!(form.files.is_empty());
    }
}
