mod common;

#[cfg(test)]
mod tests {
    use crate::common::*;
    use serde_json::json;
    use skiff::BatchPart;

    #[tokio::test]
    async fn batch_submits_one_multipart_request_and_orders_the_replies() {
        let boundary = "batch_response";
        let body = format!(
            concat!(
                "--{b}\r\n",
                "Content-Type: application/http\r\n",
                "Content-ID: 1\r\n",
                "\r\n",
                "HTTP/1.1 200 OK\r\n",
                "Content-Type: application/json\r\n",
                "\r\n",
                "{{\"value\":[{{\"code\":\"C1\"}}]}}\r\n",
                "--{b}\r\n",
                "Content-Type: application/http\r\n",
                "Content-ID: 2\r\n",
                "\r\n",
                "HTTP/1.1 404 Not Found\r\n",
                "Content-Type: application/json\r\n",
                "\r\n",
                "{{\"error\":{{\"code\":\"404\",\"message\":\"gone\"}}}}\r\n",
                "--{b}--\r\n",
            ),
            b = boundary
        );
        let stub = StubTransport::with_responses([text_response(
            200,
            &format!("multipart/mixed; boundary={boundary}"),
            &body,
        )]);
        let db = database(stub.clone());

        let replies = db
            .batch(&[
                BatchPart::get("Customers?$top=1"),
                BatchPart::post("Customers", json!({"name": "Ada"})),
            ])
            .await
            .unwrap();

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].content_id.as_deref(), Some("1"));
        assert_eq!(replies[0].status, 200);
        assert!(replies[0].is_success());
        assert_eq!(replies[0].body, Some(json!({"value": [{"code": "C1"}]})));
        assert_eq!(replies[1].status, 404);
        assert!(!replies[1].is_success());

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.url.path(), "/odata/v4/crm/$batch");
        let content_type = header(request, "Content-Type").unwrap();
        assert!(
            content_type.starts_with("multipart/mixed; boundary=batch_"),
            "content type was `{content_type}`"
        );

        let sent = String::from_utf8(request.body.clone().unwrap()).unwrap();
        assert!(sent.contains("GET /odata/v4/crm/Customers?$top=1 HTTP/1.1"));
        assert!(sent.contains("POST /odata/v4/crm/Customers HTTP/1.1"));
        assert!(sent.contains("Content-ID: 1"));
        assert!(sent.contains("Content-ID: 2"));
        assert!(sent.contains(r#"{"name":"Ada"}"#));
        // The terminal boundary closes the submission.
        assert!(sent.trim_end().ends_with("--"));
    }

    #[tokio::test]
    async fn batch_parts_without_bodies_render_no_content_type() {
        let boundary = "batch_x";
        let body = format!(
            concat!(
                "--{b}\r\n",
                "Content-Type: application/http\r\n",
                "Content-ID: 1\r\n",
                "\r\n",
                "HTTP/1.1 204 No Content\r\n",
                "\r\n",
                "\r\n",
                "--{b}--\r\n",
            ),
            b = boundary
        );
        let stub = StubTransport::with_responses([text_response(
            200,
            &format!("multipart/mixed; boundary={boundary}"),
            &body,
        )]);
        let db = database(stub.clone());

        let replies = db
            .batch(&[BatchPart::delete("Customers('C1')")])
            .await
            .unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].status, 204);
        assert_eq!(replies[0].body, None);

        let sent = String::from_utf8(stub.requests()[0].body.clone().unwrap()).unwrap();
        assert!(sent.contains("DELETE /odata/v4/crm/Customers('C1') HTTP/1.1"));
    }
}
