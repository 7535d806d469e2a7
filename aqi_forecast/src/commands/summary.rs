//! Summary command - prints the dashboard view of the published forecast.

use aqi_forecast::config::Settings;
use aqi_forecast::dashboard::DashboardView;

/// Runs the summary command. Missing artifacts are reported, not raised.
pub fn run(settings: &Settings) {
    match DashboardView::load(
        settings.forecast_path(),
        settings.model_info_path(),
        settings.history_path(),
    ) {
        DashboardView::Available(summary) => print!("{}", summary),
        DashboardView::Unavailable(reason) => println!("{}", reason),
    }
}
