mod common;

#[cfg(test)]
mod tests {
    use crate::common::*;
    use indoc::indoc;
    use serde_json::json;
    use skiff::{ErrorKind, QueryState, WireResponse};

    fn csdl() -> WireResponse {
        let body = indoc! {r#"
            {
              "$Version": "4.0",
              "crm": {
                "Customers": {
                  "$Kind": "EntityType",
                  "code": {},
                  "Orders": { "$Kind": "NavigationProperty", "$Collection": true }
                },
                "Orders": {
                  "$Kind": "EntityType",
                  "number": {}
                }
              }
            }
        "#};
        text_response(200, "application/json", body)
    }

    #[tokio::test]
    async fn expand_rejects_undeclared_relations_before_any_wire_call() {
        let stub = StubTransport::with_responses([]);
        let schema = customers();
        let db = database(stub.clone());

        let error = db
            .table(&schema)
            .query()
            .expand("Ghost")
            .list()
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn expand_is_confirmed_by_the_service_metadata() {
        let stub = StubTransport::with_responses([
            csdl(),
            json_response(200, json!({"value": [], "@odata.count": 0})),
        ]);
        let schema = customers();
        let db = database(stub.clone());

        db.table(&schema)
            .query()
            .expand("Orders")
            .list()
            .await
            .unwrap();

        let requests = stub.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url.path(), "/odata/v4/crm/$metadata");
        assert_eq!(requests[0].url.query(), Some("$format=json"));
        let query = requests[1].url.query().unwrap().to_owned();
        assert!(query.contains("$expand=Orders"), "query was `{query}`");
    }

    #[tokio::test]
    async fn expand_fails_when_the_service_does_not_know_the_relation() {
        // Declared locally, absent from the service metadata.
        let stub = StubTransport::with_responses([csdl()]);
        let schema = skiff::TableSchema::declare("Customers")
            .field("code", skiff::FieldDef::text().primary_key())
            .relation("Invoices")
            .build()
            .unwrap();
        let db = database(stub.clone());

        let error = db
            .table(&schema)
            .query()
            .expand("Invoices")
            .list()
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn navigate_traverses_the_relation_path() {
        let stub = StubTransport::with_responses([
            csdl(),
            json_response(200, json!({"value": [{"number": 7}, {"number": 8}]})),
        ]);
        let schema = customers();
        let db = database(stub.clone());

        let related = db
            .table(&schema)
            .navigate_query("C1", "Orders", QueryState::default().top(5))
            .await
            .unwrap();
        assert_eq!(related.len(), 2);
        assert_eq!(related[0].get("number"), Some(&json!(7)));

        let requests = stub.requests();
        assert_eq!(requests[1].url.path(), "/odata/v4/crm/Customers('C1')/Orders");
        assert_eq!(requests[1].url.query(), Some("$top=5"));
    }

    #[tokio::test]
    async fn update_references_posts_one_ref_per_target() {
        let stub = StubTransport::with_responses([
            csdl(),
            empty_response(204),
            empty_response(204),
        ]);
        let schema = customers();
        let db = database(stub.clone());

        db.table(&schema)
            .update_references("C1", "Orders", &["Orders(1)".into(), "Orders(2)".into()])
            .await
            .unwrap();

        let requests = stub.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].method, "POST");
        assert_eq!(
            requests[1].url.path(),
            "/odata/v4/crm/Customers('C1')/Orders/$ref"
        );
        let body: serde_json::Value =
            serde_json::from_slice(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"@odata.id": "Orders(1)"}));
        let body: serde_json::Value =
            serde_json::from_slice(requests[2].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"@odata.id": "Orders(2)"}));
    }
}
