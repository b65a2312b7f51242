use clap::Parser;

/// Bus Manager - desktop client for the bus company management game
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Settings {
    /// Base URL of the game API server
    #[clap(
        long,
        value_name = "URL",
        env = "BUS_MANAGER_API_URL",
        default_value = "http://localhost:8080"
    )]
    pub api_url: String,

    /// Initial map center latitude (defaults to Java, Indonesia)
    #[clap(long, default_value = "-7.2575")]
    pub center_lat: f64,

    /// Initial map center longitude
    #[clap(long, default_value = "112.7521")]
    pub center_lng: f64,

    /// Initial map zoom level
    #[clap(long, default_value = "7")]
    pub zoom: f64,
}

impl Settings {
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(settings) => settings,
            Err(err) => err.exit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_java() {
        let settings = Settings::parse_from(["bus-manager"]);
        assert_eq!(settings.api_url, "http://localhost:8080");
        assert!((settings.center_lat - -7.2575).abs() < 1e-9);
        assert!((settings.center_lng - 112.7521).abs() < 1e-9);
        assert_eq!(settings.zoom, 7.0);
    }

    #[test]
    fn test_api_url_flag_overrides_default() {
        let settings =
            Settings::parse_from(["bus-manager", "--api-url", "https://play.example.com/api"]);
        assert_eq!(settings.api_url, "https://play.example.com/api");
    }
}
