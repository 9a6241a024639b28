use shipquote::AppCommand;
use shipquote::core::{Estimate, RateLookup, RateProvider};
use std::fs;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const FEED_PATH: &str = "/scripts/XML_daily.asp";

    pub fn feed(eur: &str, cny: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="windows-1251"?>
<ValCurs Date="03.09.2026" name="Foreign Currency Market">
<Valute ID="R01239"><NumCode>978</NumCode><CharCode>EUR</CharCode><Nominal>1</Nominal><Name>Евро</Name><Value>{eur}</Value></Valute>
<Valute ID="R01375"><NumCode>156</NumCode><CharCode>CNY</CharCode><Nominal>1</Nominal><Name>Китайский юань</Name><Value>{cny}</Value></Valute>
</ValCurs>"#
        );
        encoding_rs::WINDOWS_1251.encode(&xml).0.into_owned()
    }

    pub async fn create_feed_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(response)
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub fn feed_response(eur: &str, cny: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(feed(eur, cny), "application/xml")
    }

    pub fn write_config(dir: &tempfile::TempDir, feed_url: &str) -> std::path::PathBuf {
        let config_path = dir.path().join("config.yaml");
        let config_content = format!(
            r#"
feed:
  url: "{feed_url}"
  timeout_secs: 2
pricing:
  fixed_fee: 1500
  markup_factor: 1.2
"#
        );
        std::fs::write(&config_path, config_content).expect("Failed to write config file");
        config_path
    }
}

#[test_log::test(tokio::test)]
async fn test_estimate_against_mock_feed() {
    let mock_server =
        test_utils::create_feed_server(test_utils::feed_response("95,0000", "12,5000")).await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = test_utils::write_config(
        &dir,
        &format!("{}{}", mock_server.uri(), test_utils::FEED_PATH),
    );

    let config = shipquote::load_config(config_path.to_str()).unwrap();
    let estimator = shipquote::build_estimator(&config);

    match estimator.estimate(2000.0).await {
        Estimate::Priced { snapshot, result } => {
            info!(?snapshot, ?result, "Received estimate");
            assert_eq!(snapshot.published, "3 сентября 2026");
            assert!(result.tax_applied);
            assert_eq!(result.total.round(), 33150.0);
        }
        Estimate::RatesUnavailable => panic!("Expected rates to be available"),
    }

    // Every estimate goes back to the feed
    let _ = estimator.estimate(10.0).await;
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[test_log::test(tokio::test)]
async fn test_quote_and_rates_commands() {
    let mock_server =
        test_utils::create_feed_server(test_utils::feed_response("90,1234", "11,9876")).await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = test_utils::write_config(
        &dir,
        &format!("{}{}", mock_server.uri(), test_utils::FEED_PATH),
    );
    let config_path = config_path.to_str();

    let result = shipquote::run_command(AppCommand::Quote("499,90".to_string()), config_path).await;
    assert!(result.is_ok(), "Quote failed with: {:?}", result.err());

    let result = shipquote::run_command(AppCommand::Rates, config_path).await;
    assert!(result.is_ok(), "Rates failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_invalid_amount_never_reaches_feed() {
    let mock_server =
        test_utils::create_feed_server(test_utils::feed_response("95,0", "12,5")).await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = test_utils::write_config(
        &dir,
        &format!("{}{}", mock_server.uri(), test_utils::FEED_PATH),
    );

    for amount in ["abc", "-5", "0", ""] {
        let result =
            shipquote::run_command(AppCommand::Quote(amount.to_string()), config_path.to_str())
                .await;
        let err = result.expect_err("Expected invalid amount to be rejected");
        assert!(err.to_string().contains("Invalid amount"));
    }

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_unavailable_feed_is_not_an_error() {
    let mock_server =
        test_utils::create_feed_server(wiremock::ResponseTemplate::new(503)).await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = test_utils::write_config(
        &dir,
        &format!("{}{}", mock_server.uri(), test_utils::FEED_PATH),
    );

    let config = shipquote::load_config(config_path.to_str()).unwrap();
    let provider = shipquote::providers::CbrRateProvider::new(config.feed.clone());
    assert_eq!(provider.fetch_rates().await, RateLookup::Unavailable);

    let result =
        shipquote::run_command(AppCommand::Quote("500".to_string()), config_path.to_str()).await;
    assert!(result.is_ok());
}

#[test_log::test(tokio::test)]
async fn test_bot_requires_token() {
    if std::env::var(shipquote::core::config::TOKEN_ENV_VAR).is_ok() {
        return;
    }
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, "bot:\n  operator_username: someone\n").unwrap();

    let result = shipquote::run_command(AppCommand::Bot, config_path.to_str()).await;
    let err = result.expect_err("Expected missing token to be fatal");
    assert!(err.to_string().contains("Bot token is not set"));
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("absent.yaml");
    let result = shipquote::run_command(AppCommand::Rates, config_path.to_str()).await;
    assert!(result.is_err());
}
