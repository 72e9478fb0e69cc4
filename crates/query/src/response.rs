//! Response Rendering

/// Fixed response for every unmatched request
pub const NOT_FOUND_RESPONSE: &str =
    "HTTP/1.1 404 Not Found\r\nContent-Length: 13\r\nContent-Type: text/plain\r\n\r\n404 Not Found\r\n";

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
        }
    }
}

/// A complete response, written once then the connection closes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Rendered readings
    Ok {
        content_type: &'static str,
        body: String,
    },
    /// The fixed not-found reply
    NotFound,
}

impl Response {
    pub fn ok(content_type: &'static str, body: String) -> Self {
        Response::Ok { content_type, body }
    }

    pub fn status(&self) -> Status {
        match self {
            Response::Ok { .. } => Status::Ok,
            Response::NotFound => Status::NotFound,
        }
    }

    /// Serialize status line, headers and body
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Response::Ok { content_type, body } => {
                let status = Status::Ok;
                let mut out = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: {}\r\n\r\n",
                    status.code(),
                    status.reason(),
                    body.len(),
                    content_type
                )
                .into_bytes();
                out.extend_from_slice(body.as_bytes());
                out
            }
            Response::NotFound => NOT_FOUND_RESPONSE.as_bytes().to_vec(),
        }
    }
}
