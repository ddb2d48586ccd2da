mod common;

#[cfg(test)]
mod tests {
    use crate::common::*;
    use serde_json::json;
    use skiff::QueryState;

    #[tokio::test]
    async fn create_table_posts_to_the_system_collection() {
        let stub = StubTransport::with_responses([empty_response(201)]);
        let schema = customers();
        let db = database(stub.clone());

        db.create_table(&schema).await.unwrap();

        let requests = stub.requests();
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.url.path(), "/odata/v4/crm/SystemTables");
        let body: serde_json::Value =
            serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "tableName": "Customers",
                "fields": [
                    {"name": "code", "type": "string", "nullable": false, "primary": true},
                    {"name": "name", "type": "string", "nullable": false, "primary": false},
                    {"name": "balance", "type": "numeric", "nullable": true, "primary": false},
                ]
            })
        );
    }

    #[tokio::test]
    async fn add_fields_patches_the_table_sub_path() {
        let stub = StubTransport::with_responses([empty_response(204)]);
        let schema = customers();
        let db = database(stub.clone());

        let extra = skiff::TableSchema::declare("Customers")
            .field("city", skiff::FieldDef::text())
            .build()
            .unwrap();
        db.table(&schema)
            .add_fields(&extra.field_specs())
            .await
            .unwrap();

        let requests = stub.requests();
        assert_eq!(requests[0].method, "PATCH");
        assert_eq!(
            requests[0].url.path(),
            "/odata/v4/crm/SystemTables/Customers"
        );
        let body: serde_json::Value =
            serde_json::from_slice(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"fields": [{"name": "city", "type": "string", "nullable": true, "primary": false}]})
        );
    }

    #[tokio::test]
    async fn drop_table_and_field_use_delete_on_sub_paths() {
        let stub = StubTransport::with_responses([empty_response(204), empty_response(204)]);
        let schema = customers();
        let db = database(stub.clone());

        db.drop_table("Customers").await.unwrap();
        db.table(&schema).drop_field("balance").await.unwrap();

        let requests = stub.requests();
        assert_eq!(requests[0].method, "DELETE");
        assert_eq!(
            requests[0].url.path(),
            "/odata/v4/crm/SystemTables/Customers"
        );
        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(
            requests[1].url.path(),
            "/odata/v4/crm/SystemTables/Customers/balance"
        );
    }

    #[tokio::test]
    async fn list_tables_decodes_the_service_root_document() {
        let stub = StubTransport::with_responses([json_response(
            200,
            json!({"value": [
                {"name": "Customers", "kind": "EntitySet", "url": "Customers"},
                {"name": "Orders", "url": "Orders"},
            ]}),
        )]);
        let db = database(stub.clone());

        let tables = db.list_tables().await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "Customers");
        assert_eq!(tables[0].kind.as_deref(), Some("EntitySet"));
        assert_eq!(tables[1].kind, None);
        assert_eq!(stub.requests()[0].url.path(), "/odata/v4/crm/");
    }

    #[tokio::test]
    async fn call_procedure_posts_the_parameters() {
        let stub = StubTransport::with_responses([json_response(
            200,
            json!({"value": "done"}),
        )]);
        let db = database(stub.clone());

        let result = db
            .call_procedure("RebuildIndex", json!({"table": "Customers"}))
            .await
            .unwrap();
        assert_eq!(result, json!({"value": "done"}));

        let requests = stub.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url.path(), "/odata/v4/crm/RebuildIndex");
        let body: serde_json::Value =
            serde_json::from_slice(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"table": "Customers"}));
    }

    #[tokio::test]
    async fn cross_join_addresses_every_table() {
        let stub = StubTransport::with_responses([json_response(
            200,
            json!({"value": [{"a": 1, "b": 2}]}),
        )]);
        let db = database(stub.clone());

        let rows = db
            .cross_join(&["Customers", "Orders"], QueryState::default().top(3))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let requests = stub.requests();
        assert_eq!(
            requests[0].url.path(),
            "/odata/v4/crm/$crossjoin(Customers,Orders)"
        );
        assert_eq!(requests[0].url.query(), Some("$top=3"));
    }
}
