//! Request Line Parsing
//!
//! Only the method and path of the first line are read. Headers, query
//! strings and bodies are ignored.

use sensor_protocol::Kind;

/// Method and path of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
}

/// Parse `<METHOD> <PATH>[ ...]` from the first line of a raw request
///
/// The method is a run of uppercase ASCII letters and must be followed by
/// whitespace. The path stops at whitespace or `?`.
pub fn parse_request_line(raw: &str) -> Option<RequestLine<'_>> {
    let line = raw.lines().next()?;

    let method_end = line
        .find(|c: char| !c.is_ascii_uppercase())
        .unwrap_or(line.len());
    if method_end == 0 {
        return None;
    }
    let (method, rest) = line.split_at(method_end);

    let target = rest.trim_start();
    if target.len() == rest.len() {
        return None;
    }

    let path_end = target
        .find(|c: char| c.is_whitespace() || c == '?')
        .unwrap_or(target.len());
    if path_end == 0 {
        return None;
    }

    Some(RequestLine {
        method,
        path: &target[..path_end],
    })
}

/// Map a request to the kind it asks for
pub fn route(request: &RequestLine<'_>) -> Option<Kind> {
    if request.method != "GET" {
        return None;
    }
    Kind::from_path(request.path)
}
