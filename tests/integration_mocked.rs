/// Integration tests with a mocked validation endpoint
/// Exercises the client, normalizer and batch enrichment without hitting the real service
use billing_address_validator::address_client::AddressValidationClient;
use billing_address_validator::config::Config;
use billing_address_validator::dataset::{Cell, Dataset, Row};
use billing_address_validator::enrichment::enrich;
use billing_address_validator::errors::AppError;
use billing_address_validator::models::{AddressInput, FieldValue};
use billing_address_validator::normalizer::normalize;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1:validateAddress";

/// Helper function to create test config
fn create_test_config(base_url: String) -> Config {
    Config {
        validation_url: format!("{}{}", base_url, ENDPOINT),
        api_key: "test_key".to_string(),
        concurrency: 4,
        timeout_secs: 5,
    }
}

fn request_for(address: &str) -> Value {
    json!({"address": {"addressLines": [address]}})
}

fn response_for(formatted: &str, route: &str) -> Value {
    json!({
        "result": {
            "verdict": {
                "inputGranularity": "PREMISE",
                "validationGranularity": "PREMISE",
                "geocodeGranularity": "PREMISE",
                "addressComplete": true
            },
            "address": {
                "formattedAddress": formatted,
                "addressComponents": [
                    {"componentName": {"text": route}, "componentType": "route"},
                    {"componentName": {"text": "4B"}, "componentType": "subpremise",
                     "inferred": true},
                    {"componentName": {"text": "USA"}, "componentType": "country",
                     "inferred": true}
                ]
            }
        }
    })
}

fn billing_row(address: &str, city: &str, state: Cell, zip: Cell) -> Row {
    [
        ("BILLTOADDRESS1".to_string(), Cell::from(address)),
        ("BILLTOCITY".to_string(), Cell::from(city)),
        ("BILLTOSTATE".to_string(), state),
        ("BILLTOZIPCODE".to_string(), zip),
    ]
    .into_iter()
    .collect()
}

fn billing_dataset(rows: Vec<Row>) -> Dataset {
    let columns = ["BILLTOADDRESS1", "BILLTOCITY", "BILLTOSTATE", "BILLTOZIPCODE"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    Dataset::from_rows(columns, rows)
}

#[tokio::test]
async fn test_validate_sends_envelope_with_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "test_key"))
        .and(body_json(request_for("1600 Amphitheatre Pkwy, Mountain View, CA 94043")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(response_for("1600 Amphitheatre Pkwy", "Amphitheatre Parkway")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = AddressValidationClient::new(&create_test_config(mock_server.uri())).unwrap();
    let response = client
        .validate("1600 Amphitheatre Pkwy, Mountain View, CA 94043")
        .await
        .unwrap();

    assert_eq!(
        response.result.address.formatted_address,
        "1600 Amphitheatre Pkwy"
    );
    assert_eq!(response.result.address.address_components.len(), 3);
}

#[tokio::test]
async fn test_validate_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&mock_server)
        .await;

    let client = AddressValidationClient::new(&create_test_config(mock_server.uri())).unwrap();
    let result = client.validate("anything").await;

    match result {
        Err(AppError::ExternalApiError(msg)) => {
            assert!(msg.contains("403"));
            assert!(!msg.contains("test_key"));
        }
        other => panic!("expected ExternalApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validate_non_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = AddressValidationClient::new(&create_test_config(mock_server.uri())).unwrap();
    assert!(matches!(
        client.validate_raw("anything").await,
        Err(AppError::ExternalApiError(_))
    ));
}

#[tokio::test]
async fn test_normalize_free_text_calls_service() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_json(request_for("1 Main St")))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_for("1 Main St", "Main St")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = AddressValidationClient::new(&create_test_config(mock_server.uri())).unwrap();
    let record = normalize(&client, AddressInput::from("1 Main St"))
        .await
        .unwrap();

    assert_eq!(record["formattedAddress"], FieldValue::Text("1 Main St".into()));
    assert_eq!(record["hasInferredComponents"], FieldValue::Bool(false));
    assert_eq!(record["country_inferred"], FieldValue::Bool(true));
}

#[tokio::test]
async fn test_enrich_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_json(request_for("123 Main St, Springfield, IL 62704")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(response_for("123 Main St, Springfield, IL 62704, USA", "Main Street")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_json(request_for("400 Broad St, Seattle, WA 98109")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(response_for("400 Broad St, Seattle, WA 98109, USA", "Broad Street")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dataset = billing_dataset(vec![
        billing_row("123 Main St", "Springfield", Cell::from("IL"), Cell::from(62704_i64)),
        billing_row("9 Nowhere Rd", "Ghost Town", Cell::Empty, Cell::from(10001_i64)),
        billing_row("400 Broad St", "Seattle", Cell::from("WA"), Cell::from("98109")),
    ]);

    let client = AddressValidationClient::new(&create_test_config(mock_server.uri())).unwrap();
    let enriched = enrich(&client, dataset, 2).await.unwrap();

    assert_eq!(enriched.len(), 2);
    assert_eq!(enriched.rows()[0]["route"], Cell::from("Main Street"));
    assert_eq!(enriched.rows()[1]["route"], Cell::from("Broad Street"));
    assert_eq!(
        enriched.rows()[0]["full_address"],
        Cell::from("123 Main St, Springfield, IL 62704")
    );
    assert_eq!(enriched.rows()[1]["country_inferred"], Cell::Bool(true));

    let columns = enriched.columns();
    assert_eq!(&columns[..4], &["BILLTOADDRESS1", "BILLTOCITY", "BILLTOSTATE", "BILLTOZIPCODE"]);
    assert_eq!(&columns[4..6], &["full_address", "json_data"]);
    assert!(!enriched.has_column("subpremise"));
    assert!(!enriched.has_column("subpremise_inferred"));

    mock_server.verify().await;
}

#[tokio::test]
async fn test_enrich_schema_failure_makes_no_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_for("x", "y")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let row: Row = [
        ("BILLTOSTATE".to_string(), Cell::from("IL")),
        ("BILLTOZIPCODE".to_string(), Cell::from(62704_i64)),
    ]
    .into_iter()
    .collect();
    let dataset = Dataset::from_rows(vec![], vec![row]);

    let client = AddressValidationClient::new(&create_test_config(mock_server.uri())).unwrap();
    let result = enrich(&client, dataset, 4).await;

    assert!(matches!(result, Err(AppError::SchemaError(_))));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_enrich_failing_row_aborts_batch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let dataset = billing_dataset(vec![billing_row(
        "123 Main St",
        "Springfield",
        Cell::from("IL"),
        Cell::from(62704_i64),
    )]);

    let client = AddressValidationClient::new(&create_test_config(mock_server.uri())).unwrap();
    let err = enrich(&client, dataset, 1).await.unwrap_err();

    assert!(matches!(err.root(), AppError::ExternalApiError(_)));
    assert!(err.to_string().contains("row 0"));
}

#[tokio::test]
async fn test_enrich_missing_formatted_address_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": {"address": {"addressComponents": []}}})),
        )
        .mount(&mock_server)
        .await;

    let dataset = billing_dataset(vec![billing_row(
        "123 Main St",
        "Springfield",
        Cell::from("IL"),
        Cell::from(62704_i64),
    )]);

    let client = AddressValidationClient::new(&create_test_config(mock_server.uri())).unwrap();
    let err = enrich(&client, dataset, 1).await.unwrap_err();

    assert!(matches!(err.root(), AppError::MalformedResponse(_)));
}
