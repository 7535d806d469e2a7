use aqi_forecast::config::{AcceptanceBand, ForecastConfig, LagStrategy, DEFAULT_MODEL_NAME};
use aqi_forecast::error::ForecastError;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_default_band() {
    let band = AcceptanceBand::default();
    assert_eq!(band.min_r2(), 0.60);
    assert_eq!(band.max_r2(), 0.90);
    assert_eq!(band.to_string(), "0.60 <= R² <= 0.90");
}

#[rstest]
#[case(0.59, false)]
#[case(0.60, true)]
#[case(0.75, true)]
#[case(0.90, true)]
#[case(0.91, false)]
fn test_band_contains(#[case] r2: f64, #[case] expected: bool) {
    assert_eq!(AcceptanceBand::default().contains(r2), expected);
}

#[rstest]
#[case("persistence", "persistence")]
#[case("Decay", "decay")]
#[case(" constant ", "persistence")]
fn test_lag_strategy_parsing(#[case] input: &str, #[case] label: &str) {
    let strategy: LagStrategy = input.parse().unwrap();
    assert_eq!(strategy.label(), label);
}

#[test]
fn test_unknown_lag_strategy_is_rejected() {
    let result = "linear".parse::<LagStrategy>();
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_default_config_uses_persistence() {
    let config = ForecastConfig::default();
    assert_eq!(config.model_name(), DEFAULT_MODEL_NAME);
    assert_eq!(config.lag_strategy(), &LagStrategy::Persistence);
    assert_eq!(config.band(), AcceptanceBand::default());
    assert_eq!(config.seed(), None);
}

#[test]
fn test_config_validation() {
    let empty_name = ForecastConfig::new("  ", AcceptanceBand::default(), LagStrategy::Persistence, None);
    assert!(matches!(empty_name, Err(ForecastError::InvalidParameter(_))));

    let mut strategy = LagStrategy::decay();
    if let LagStrategy::Decay { noise_std, .. } = &mut strategy {
        *noise_std = -1.0;
    }
    let negative_noise = ForecastConfig::new(DEFAULT_MODEL_NAME, AcceptanceBand::default(), strategy, Some(7));
    assert!(matches!(negative_noise, Err(ForecastError::InvalidParameter(_))));

    let valid = ForecastConfig::new(DEFAULT_MODEL_NAME, AcceptanceBand::default(), LagStrategy::decay(), Some(7));
    assert_eq!(valid.unwrap().seed(), Some(7));
}
