use serde_json::Value as Json;
use skiff_core::{BatchPart, BatchReply, Error, Result};
use std::fmt::Write;

/// Render the multipart body of a `$batch` submission.
///
/// Every part becomes an `application/http` section with its position (one
/// based) as the correlation id; `base_path` is the database root the part
/// paths are relative to.
pub(crate) fn render_batch(boundary: &str, base_path: &str, parts: &[BatchPart]) -> String {
    let mut out = String::with_capacity(512);
    for (index, part) in parts.iter().enumerate() {
        let _ = write!(out, "--{boundary}\r\n");
        out.push_str("Content-Type: application/http\r\n");
        out.push_str("Content-Transfer-Encoding: binary\r\n");
        let _ = write!(out, "Content-ID: {}\r\n\r\n", index + 1);
        let _ = write!(
            out,
            "{} {}/{} HTTP/1.1\r\n",
            part.method,
            base_path,
            part.path.trim_start_matches('/')
        );
        for (name, value) in &part.headers {
            let _ = write!(out, "{name}: {value}\r\n");
        }
        match &part.body {
            Some(body) => {
                out.push_str("Content-Type: application/json\r\n\r\n");
                out.push_str(&body.to_string());
                out.push_str("\r\n");
            }
            None => out.push_str("\r\n"),
        }
    }
    let _ = write!(out, "--{boundary}--\r\n");
    out
}

/// Boundary parameter of a `multipart/mixed` content type.
pub(crate) fn boundary_of(content_type: Option<&str>) -> Option<String> {
    content_type?.split(';').find_map(|part| {
        part.trim()
            .strip_prefix("boundary=")
            .map(|b| b.trim_matches('"').to_owned())
    })
}

/// Split a multipart batch response into ordered decoded sub-responses.
pub(crate) fn parse_batch(content_type: Option<&str>, body: &str) -> Result<Vec<BatchReply>> {
    let boundary = boundary_of(content_type)
        .ok_or_else(|| Error::protocol("batch response carries no multipart boundary"))?;
    let marker = format!("--{boundary}");
    let mut replies = Vec::new();
    for chunk in body.split(marker.as_str()).skip(1) {
        let chunk = chunk.trim_start_matches("\r\n");
        if chunk.starts_with("--") {
            break;
        }
        replies.push(parse_part(chunk)?);
    }
    Ok(replies)
}

fn parse_part(chunk: &str) -> Result<BatchReply> {
    let content_id = chunk
        .lines()
        .take_while(|line| !line.trim().is_empty())
        .find_map(|line| {
            line.trim()
                .strip_prefix("Content-ID:")
                .map(|v| v.trim().to_owned())
        });
    let status_pos = chunk
        .find("HTTP/1.1 ")
        .ok_or_else(|| Error::protocol("batch part carries no status line"))?;
    let embedded = &chunk[status_pos..];
    let status = embedded["HTTP/1.1 ".len()..]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| Error::protocol("batch part carries a malformed status line"))?;
    let body_text = embedded
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.trim())
        .unwrap_or("");
    let (body, text) = if body_text.is_empty() {
        (None, None)
    } else {
        match serde_json::from_str::<Json>(body_text) {
            Ok(json) => (Some(json), None),
            Err(_) => (None, Some(body_text.to_owned())),
        }
    };
    Ok(BatchReply {
        content_id,
        status,
        body,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skiff_core::BatchPart;

    #[test]
    fn render_assigns_positional_correlation_ids() {
        let parts = [
            BatchPart::get("Customers?$top=1"),
            BatchPart::patch("Customers('C1')", json!({"name": "Ada"})),
        ];
        let body = render_batch("batch_x", "/odata/v4/crm", &parts);
        assert!(body.contains("--batch_x\r\n"));
        assert!(body.contains("Content-ID: 1\r\n"));
        assert!(body.contains("Content-ID: 2\r\n"));
        assert!(body.contains("GET /odata/v4/crm/Customers?$top=1 HTTP/1.1\r\n"));
        assert!(body.contains("PATCH /odata/v4/crm/Customers('C1') HTTP/1.1\r\n"));
        assert!(body.contains("{\"name\":\"Ada\"}"));
        assert!(body.ends_with("--batch_x--\r\n"));
    }

    #[test]
    fn boundary_is_read_from_the_content_type() {
        assert_eq!(
            boundary_of(Some("multipart/mixed; boundary=batch_abc")).as_deref(),
            Some("batch_abc")
        );
        assert_eq!(
            boundary_of(Some("multipart/mixed; boundary=\"quoted\"")).as_deref(),
            Some("quoted")
        );
        assert_eq!(boundary_of(Some("application/json")), None);
        assert_eq!(boundary_of(None), None);
    }

    #[test]
    fn parse_decodes_ordered_sub_responses() {
        let body = concat!(
            "--b\r\n",
            "Content-Type: application/http\r\n",
            "Content-ID: 1\r\n",
            "\r\n",
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: application/json\r\n",
            "\r\n",
            "{\"value\":[]}\r\n",
            "--b\r\n",
            "Content-Type: application/http\r\n",
            "Content-ID: 2\r\n",
            "\r\n",
            "HTTP/1.1 500 Internal Server Error\r\n",
            "\r\n",
            "not json\r\n",
            "--b--\r\n",
        );
        let replies = parse_batch(Some("multipart/mixed; boundary=b"), body).unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].status, 200);
        assert_eq!(replies[0].body, Some(json!({"value": []})));
        assert_eq!(replies[1].status, 500);
        assert_eq!(replies[1].text.as_deref(), Some("not json"));
        assert_eq!(replies[1].content_id.as_deref(), Some("2"));
    }

    #[test]
    fn parse_rejects_a_missing_boundary() {
        assert!(parse_batch(Some("application/json"), "{}").is_err());
    }
}
