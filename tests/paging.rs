mod common;

#[cfg(test)]
mod tests {
    use crate::common::*;
    use serde_json::{Value as Json, json};
    use skiff::WireResponse;

    fn page(codes: &[&str]) -> WireResponse {
        let records: Vec<Json> = codes
            .iter()
            .map(|code| json!({"code": code, "name": code, "balance": 0}))
            .collect();
        json_response(200, json!({"value": records, "@odata.count": 7}))
    }

    fn skip_of(request: &skiff::WireRequest) -> Option<String> {
        request
            .url
            .query_pairs()
            .find_map(|(k, v)| (k == "$skip").then(|| v.into_owned()))
    }

    #[tokio::test]
    async fn list_all_advances_skip_until_the_found_count_is_reached() {
        let _ = env_logger::builder().is_test(true).try_init();
        let stub = StubTransport::with_responses([
            page(&["C1", "C2"]),
            page(&["C3", "C4"]),
            page(&["C5", "C6"]),
            page(&["C7"]),
        ]);
        let schema = customers();
        let db = database(stub.clone());

        let records = db.table(&schema).query().list_all().await.unwrap();
        assert_eq!(records.len(), 7);

        let requests = stub.requests();
        assert_eq!(requests.len(), 4);
        let skips: Vec<_> = requests.iter().filter_map(skip_of).collect();
        assert_eq!(skips, ["0", "2", "4", "6"]);
    }

    #[tokio::test]
    async fn list_all_stops_defensively_on_an_empty_page() {
        let stub = StubTransport::with_responses([
            page(&["C1", "C2"]),
            json_response(200, json!({"value": [], "@odata.count": 7})),
        ]);
        let schema = customers();
        let db = database(stub.clone());

        let records = db.table(&schema).query().list_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(stub.requests().len(), 2);
    }

    #[tokio::test]
    async fn list_returns_the_single_page_and_requests_the_count() {
        // The truncated result only warns, it does not fail the call.
        let _ = env_logger::builder().is_test(true).try_init();
        let stub = StubTransport::with_responses([page(&["C1", "C2"])]);
        let schema = customers();
        let db = database(stub.clone());

        let records = db.table(&schema).query().list().await.unwrap();
        assert_eq!(records.len(), 2);

        let query = stub.requests()[0].url.query().unwrap().to_owned();
        assert!(query.contains("$count=true"), "query was `{query}`");
    }

    #[tokio::test]
    async fn explicit_pagination_is_passed_through() {
        let stub = StubTransport::with_responses([page(&["C3", "C4"])]);
        let schema = customers();
        let db = database(stub.clone());

        let records = db
            .table(&schema)
            .query()
            .top(2)
            .skip(2)
            .list()
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        let query = stub.requests()[0].url.query().unwrap().to_owned();
        assert!(query.contains("$top=2"), "query was `{query}`");
        assert!(query.contains("$skip=2"), "query was `{query}`");
    }
}
